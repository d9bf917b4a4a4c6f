use clap::{Args, Parser, Subcommand, ValueEnum};
use portions_client::{
    CategoryKey, Config, DateCursor, Direction, HttpTransport, Mode, MutationReconciler, Session,
    Settlement, errors::AppError, ui::render_view,
};
use std::{process::ExitCode, sync::Arc};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

/// Record daily nutrient portions and edit the goals they are measured against.
#[derive(Parser, Debug)]
#[command(name = "portions")]
struct Cli {
    /// Base URL of the portions backend (overrides PORTIONS_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the portions of a day, or the goals
    Show {
        /// Day to show, defaults to today
        #[arg(long, conflicts_with = "goals")]
        date: Option<DateCursor>,

        #[arg(long)]
        goals: bool,
    },
    /// Record eaten portions
    Consume(AdjustArgs),
    /// Take back recorded portions
    Unconsume(AdjustArgs),
    /// Raise or lower a goal
    Goal {
        #[arg(value_enum)]
        action: GoalAction,

        category: String,

        #[arg(long, default_value_t = 1)]
        times: u32,
    },
}

#[derive(Args, Debug)]
struct AdjustArgs {
    category: String,

    /// Day to adjust, defaults to today
    #[arg(long)]
    date: Option<DateCursor>,

    /// Number of adjustments to send concurrently
    #[arg(long, default_value_t = 1)]
    times: u32,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum GoalAction {
    Inc,
    Dec,
}

impl GoalAction {
    fn direction(self) -> Direction {
        match self {
            GoalAction::Inc => Direction::Increase,
            GoalAction::Dec => Direction::Decrease,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let mut config = Config::from_env()?;
    if let Some(url) = cli.api_url.as_deref() {
        config = config.with_api_url(url)?;
    }
    info!(api_url = %config.api_url, "using backend");

    let transport = HttpTransport::new(&config.api_url, config.request_timeout)?;
    let reconciler = MutationReconciler::new(Arc::new(transport))
        .with_refresh_after_settle(config.refresh_after_settle);
    let mut session = Session::new(reconciler, config.categories);

    match cli.command {
        Command::Show { date, goals } => {
            if goals {
                session.set_mode(Mode::Goals);
            } else if let Some(date) = date {
                session.go_to(date);
            }
            load(&session).await
        }
        Command::Consume(args) => adjust_day(&mut session, args, Direction::Increase).await,
        Command::Unconsume(args) => adjust_day(&mut session, args, Direction::Decrease).await,
        Command::Goal {
            action,
            category,
            times,
        } => {
            session.set_mode(Mode::Goals);
            adjust(&session, &category, action.direction(), times).await
        }
    }
}

async fn adjust_day(
    session: &mut Session,
    args: AdjustArgs,
    direction: Direction,
) -> Result<(), AppError> {
    if let Some(date) = args.date {
        session.go_to(date);
    }
    adjust(session, &args.category, direction, args.times).await
}

async fn load(session: &Session) -> Result<(), AppError> {
    let loaded = session.load().await;
    print!("{}", render_view(&session.view()));
    loaded.map_err(|_| AppError::Unavailable(session.active_scope().to_string()))
}

async fn adjust(
    session: &Session,
    category: &str,
    direction: Direction,
    times: u32,
) -> Result<(), AppError> {
    let category = resolve_category(session, category)?;
    load(session).await?;

    let mut notices = session.reconciler().notices();
    let mut adjustments = Vec::new();
    for _ in 0..times {
        if direction == Direction::Decrease && !session.can_decrease(&category) {
            println!("{category} is already at zero");
            break;
        }
        adjustments.push(session.apply(&category, direction));
    }
    if adjustments.is_empty() {
        return Ok(());
    }
    print!("{}", render_view(&session.view()));

    let mut rolled_back = 0usize;
    for adjustment in adjustments {
        if adjustment.settled().await == Settlement::RolledBack {
            rolled_back += 1;
        }
    }
    while let Ok(notice) = notices.try_recv() {
        println!("{notice}");
    }
    if rolled_back > 0 {
        info!(rolled_back, "some adjustments were rolled back");
    }

    load(session).await
}

fn resolve_category(session: &Session, raw: &str) -> Result<CategoryKey, AppError> {
    let key: CategoryKey = raw.parse()?;
    if session.categories().contains(&key) {
        Ok(key)
    } else {
        Err(AppError::UnknownCategory(raw.to_string()))
    }
}
