use crate::errors::ConfigError;
use crate::models::CategoryKey;
use reqwest::Url;
use std::{env, time::Duration};

pub const DEFAULT_API_URL: &str = "http://localhost:3000";

pub const API_URL_VAR: &str = "PORTIONS_API_URL";
pub const CATEGORIES_VAR: &str = "PORTIONS_CATEGORIES";
pub const REFRESH_AFTER_SETTLE_VAR: &str = "PORTIONS_REFRESH_AFTER_SETTLE";
pub const REQUEST_TIMEOUT_VAR: &str = "PORTIONS_REQUEST_TIMEOUT_MS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_url: String,
    pub categories: Vec<CategoryKey>,
    pub refresh_after_settle: bool,
    /// Unset means an adjustment may stay in flight indefinitely.
    pub request_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            categories: CategoryKey::defaults(),
            refresh_after_settle: true,
            request_timeout: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(url) = lookup(API_URL_VAR) {
            config.api_url = validate_url(&url)?;
        }

        if let Some(raw) = lookup(CATEGORIES_VAR) {
            config.categories = parse_categories(&raw)?;
        }

        if let Some(raw) = lookup(REFRESH_AFTER_SETTLE_VAR) {
            config.refresh_after_settle = parse_bool(REFRESH_AFTER_SETTLE_VAR, &raw)?;
        }

        if let Some(raw) = lookup(REQUEST_TIMEOUT_VAR) {
            let millis = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|millis| *millis > 0)
                .ok_or(ConfigError::InvalidValue {
                    name: REQUEST_TIMEOUT_VAR,
                    value: raw.clone(),
                })?;
            config.request_timeout = Some(Duration::from_millis(millis));
        }

        Ok(config)
    }

    pub fn with_api_url(mut self, url: &str) -> Result<Self, ConfigError> {
        self.api_url = validate_url(url)?;
        Ok(self)
    }
}

fn validate_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim();
    match Url::parse(trimmed) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(trimmed.to_string()),
        _ => Err(ConfigError::InvalidUrl(raw.to_string())),
    }
}

fn parse_categories(raw: &str) -> Result<Vec<CategoryKey>, ConfigError> {
    let mut categories: Vec<CategoryKey> = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|part| !part.is_empty()) {
        let key = CategoryKey::new(part)?;
        if !categories.contains(&key) {
            categories.push(key);
        }
    }
    if categories.is_empty() {
        return Err(ConfigError::NoCategories);
    }
    Ok(categories)
}

fn parse_bool(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            name,
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.categories.len(), 4);
        assert!(config.refresh_after_settle);
        assert_eq!(config.request_timeout, None);
    }

    #[test]
    fn reads_overrides() {
        let config = Config::from_lookup(lookup(&[
            (API_URL_VAR, "https://portions.example.com/api"),
            (CATEGORIES_VAR, "protein, fiber,,protein"),
            (REFRESH_AFTER_SETTLE_VAR, "off"),
            (REQUEST_TIMEOUT_VAR, "2500"),
        ]))
        .unwrap();
        assert_eq!(config.api_url, "https://portions.example.com/api");
        let names: Vec<&str> = config.categories.iter().map(CategoryKey::as_str).collect();
        assert_eq!(names, ["protein", "fiber"]);
        assert!(!config.refresh_after_settle);
        assert_eq!(config.request_timeout, Some(Duration::from_millis(2500)));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            Config::from_lookup(lookup(&[(API_URL_VAR, "ftp://host")])),
            Err(ConfigError::InvalidUrl(_))
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[(CATEGORIES_VAR, " , ")])),
            Err(ConfigError::NoCategories)
        ));
        assert!(Config::from_lookup(lookup(&[(CATEGORIES_VAR, "a/b")])).is_err());
        assert!(Config::from_lookup(lookup(&[(REQUEST_TIMEOUT_VAR, "0")])).is_err());
        assert!(Config::from_lookup(lookup(&[(REFRESH_AFTER_SETTLE_VAR, "maybe")])).is_err());
    }
}
