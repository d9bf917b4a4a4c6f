use crate::decompose::{Dot, DotKind};
use crate::models::{Mode, Scope};
use crate::session::{CategoryRow, SessionView};
use std::fmt::Write;

const CONFIRMED: char = '●';
const PENDING: char = '◌';
const EMPTY: char = '○';
const EXCESS_CONFIRMED: char = '◆';
const EXCESS_PENDING: char = '◇';
const MAX_DOTS: usize = 40;

pub fn render_view(view: &SessionView) -> String {
    match view {
        SessionView::Loading => "loading...\n".to_string(),
        SessionView::Error(message) => format!("error: could not load counters ({message})\n"),
        SessionView::Ready { mode, scope, rows } => {
            let mut out = render_header(*mode, scope);
            let width = rows
                .iter()
                .map(|row| row.category.as_str().chars().count())
                .max()
                .unwrap_or(0);
            for row in rows {
                out.push_str(&render_row(row, width));
                out.push('\n');
            }
            out
        }
    }
}

fn render_header(mode: Mode, scope: &Scope) -> String {
    match (mode, scope) {
        (Mode::Portions, Scope::Day(day)) => format!("portions for {}\n", day.to_key()),
        _ => "goals\n".to_string(),
    }
}

pub fn render_row(row: &CategoryRow, width: usize) -> String {
    let mut dots: String = row.decomposition.dots().take(MAX_DOTS).map(glyph).collect();
    if row.decomposition.dots().nth(MAX_DOTS).is_some() {
        dots.push('…');
    }
    let mut line = format!("{:<width$}  {}", row.category.as_str(), dots);
    if row.goal > 0 {
        let _ = write!(line, "  {}/{}", row.committed, row.goal);
    } else {
        let _ = write!(line, "  {}", row.committed);
    }
    if row.pending != 0 {
        let _ = write!(line, " ({:+} pending)", row.pending);
    }
    line
}

pub fn glyph(dot: Dot) -> char {
    match (dot.kind, dot.excess) {
        (DotKind::Confirmed, false) => CONFIRMED,
        (DotKind::Confirmed, true) => EXCESS_CONFIRMED,
        (DotKind::Pending, false) => PENDING,
        (DotKind::Pending, true) => EXCESS_PENDING,
        (DotKind::Empty, _) => EMPTY,
    }
}
