use config::ConfigError;
use serde::Deserialize;
use std::collections::HashMap;

const ENV_PREFIX: &str = "THREADS_";

#[derive(Deserialize, Clone, Debug)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub feed: FeedSettings,
    pub log: LogSettings,
}

#[derive(Deserialize, Clone, Debug)]
pub struct DatabaseSettings {
    pub url: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct FeedSettings {
    pub page_size: u32,
}

#[derive(Deserialize, Clone, Debug)]
pub struct LogSettings {
    /// `tracing_subscriber::EnvFilter` directive, overridden by `RUST_LOG`.
    pub filter: String,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());
        Self::load(&run_mode, collect_env_vars(std::env::vars()))
    }

    fn load(run_mode: &str, env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let env_json =
            serde_json::to_string(&env_map).map_err(|e| ConfigError::Foreign(Box::new(e)))?;

        let s = config::Config::builder()
            .set_default("database.url", "sqlite://data/threads.db")?
            .set_default("feed.page_size", i64::from(session::DEFAULT_PAGE_SIZE))?
            .set_default("log.filter", "info")?
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::File::with_name(&format!("config.{}", run_mode)).required(false),
            )
            .add_source(config::File::from_str(&env_json, config::FileFormat::Json))
            .build()?;

        let settings: Settings = s.try_deserialize()?;
        if settings.feed.page_size == 0 {
            return Err(ConfigError::Message(
                "feed.page_size must be greater than zero".to_string(),
            ));
        }
        Ok(settings)
    }
}

/// `THREADS_DATABASE__URL=...` becomes `database.url`.
fn collect_env_vars(vars: impl Iterator<Item = (String, String)>) -> HashMap<String, String> {
    vars.filter(|(k, _)| k.starts_with(ENV_PREFIX))
        .map(|(k, v)| {
            let new_key = k
                .trim_start_matches(ENV_PREFIX)
                .replace("__", ".")
                .to_lowercase();
            (new_key, v)
        })
        .collect()
}
