use crate::errors::TransportError;
use crate::models::{CategoryKey, CounterMap, Direction, Scope};
use async_trait::async_trait;
use reqwest::{Client, Response};
use std::{collections::BTreeMap, time::Duration};
use tracing::debug;

/// Access to the authoritative counter store.
#[async_trait]
pub trait CounterTransport: Send + Sync {
    async fn fetch_counters(&self, scope: &Scope) -> Result<CounterMap, TransportError>;

    async fn adjust_counter(
        &self,
        scope: &Scope,
        key: &CategoryKey,
        direction: Direction,
    ) -> Result<(), TransportError>;
}

/// REST client for the portions backend.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, TransportError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn snapshot_url(&self, scope: &Scope) -> String {
        match scope {
            Scope::Day(day) => format!("{}/days/{}/portions", self.base_url, day.to_key()),
            Scope::Goals => format!("{}/goals", self.base_url),
        }
    }

    fn adjust_url(&self, scope: &Scope, key: &CategoryKey, direction: Direction) -> String {
        match (scope, direction) {
            (Scope::Day(day), Direction::Increase) => format!(
                "{}/days/{}/portions/{key}/consume",
                self.base_url,
                day.to_key()
            ),
            (Scope::Day(day), Direction::Decrease) => format!(
                "{}/days/{}/portions/{key}/unconsume",
                self.base_url,
                day.to_key()
            ),
            (Scope::Goals, Direction::Increase) => {
                format!("{}/goals/portions/{key}/inc", self.base_url)
            }
            (Scope::Goals, Direction::Decrease) => {
                format!("{}/goals/portions/{key}/dec", self.base_url)
            }
        }
    }
}

#[async_trait]
impl CounterTransport for HttpTransport {
    async fn fetch_counters(&self, scope: &Scope) -> Result<CounterMap, TransportError> {
        let url = self.snapshot_url(scope);
        debug!(%url, "fetching counters");
        let response = ensure_success(self.client.get(&url).send().await?).await?;
        let raw: BTreeMap<String, i64> = response
            .json()
            .await
            .map_err(|err| TransportError::InvalidSnapshot(err.to_string()))?;
        parse_snapshot(raw)
    }

    async fn adjust_counter(
        &self,
        scope: &Scope,
        key: &CategoryKey,
        direction: Direction,
    ) -> Result<(), TransportError> {
        let url = self.adjust_url(scope, key, direction);
        debug!(%url, "adjusting counter");
        ensure_success(self.client.post(&url).send().await?).await?;
        Ok(())
    }
}

async fn ensure_success(response: Response) -> Result<Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(TransportError::status(status, message))
}

/// Validates a wire snapshot. Counters are never negative.
pub fn parse_snapshot(raw: BTreeMap<String, i64>) -> Result<CounterMap, TransportError> {
    raw.into_iter()
        .map(|(key, value)| {
            let count = u32::try_from(value).map_err(|_| {
                TransportError::InvalidSnapshot(format!("{key} has out-of-range count {value}"))
            })?;
            let key = CategoryKey::new(key)
                .map_err(|err| TransportError::InvalidSnapshot(err.to_string()))?;
            Ok((key, count))
        })
        .collect()
}
