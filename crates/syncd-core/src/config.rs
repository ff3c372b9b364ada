use serde::Deserialize;

use crate::error::SyncError;

fn default_batch_size() -> usize {
    200
}

fn default_resync_window_minutes() -> i64 {
    10
}

fn default_ledger_schema() -> String {
    "edges_raw".to_string()
}

/// The site/list identity this process instance serves. `site_id` accepts
/// either a bare GUID or the composite `host,guid,guid` form the Source
/// uses; `syncd` treats both as opaque strings and never inspects them.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub site_id: String,
    pub list_id: String,
    pub watched_path: String,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_resync_window_minutes")]
    pub resync_window_minutes: i64,

    #[serde(default = "default_ledger_schema")]
    pub ledger_schema: String,

    pub db_connection: String,
    pub queue_connection: String,
    pub source_credentials: String,
    /// Base URL of the Source's REST API. Opaque to this crate beyond being
    /// a URL prefix; the wire dialect behind it is an external collaborator
    /// (spec §1).
    pub source_base_url: String,

    /// Bound on concurrent in-flight queue messages (the "configured
    /// fan-out" of spec §5).
    #[serde(default = "default_worker_concurrency")]
    pub worker_concurrency: usize,

    /// Per-run deadline in seconds for every suspension point (spec §5).
    #[serde(default = "default_run_timeout_secs")]
    pub run_timeout_secs: u64,
}

fn default_worker_concurrency() -> usize {
    8
}

fn default_run_timeout_secs() -> u64 {
    120
}

impl AppConfig {
    /// Loads configuration layered as: built-in defaults → optional
    /// `config/*.toml` file → `SYNCD_`-prefixed environment variables
    /// (highest precedence), then validates the required fields.
    ///
    /// A missing required field or a malformed value is
    /// `SyncError::ConfigError`, which is fatal at start-up (spec §6 exit
    /// codes).
    pub fn load() -> Result<Self, SyncError> {
        let raw = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("SYNCD")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| SyncError::ConfigError(e.to_string()))?;

        let cfg: AppConfig = raw
            .try_deserialize()
            .map_err(|e| SyncError::ConfigError(e.to_string()))?;

        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), SyncError> {
        if self.site_id.trim().is_empty() {
            return Err(SyncError::ConfigError("site_id must not be empty".into()));
        }
        if self.list_id.trim().is_empty() {
            return Err(SyncError::ConfigError("list_id must not be empty".into()));
        }
        if self.watched_path.trim().is_empty() {
            return Err(SyncError::ConfigError(
                "watched_path must not be empty".into(),
            ));
        }
        if self.batch_size == 0 {
            return Err(SyncError::ConfigError("batch_size must be > 0".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AppConfig {
        AppConfig {
            site_id: "host,guid1,guid2".into(),
            list_id: "11111111-1111-1111-1111-111111111111".into(),
            watched_path: "/docs/watched".into(),
            batch_size: 200,
            resync_window_minutes: 10,
            ledger_schema: "edges_raw".into(),
            db_connection: "postgres://localhost/db".into(),
            queue_connection: "kafka://localhost:9092".into(),
            source_credentials: "opaque".into(),
            source_base_url: "https://graph.example.com/v1.0".into(),
            worker_concurrency: 8,
            run_timeout_secs: 120,
        }
    }

    #[test]
    fn rejects_empty_site_id() {
        let mut cfg = sample();
        cfg.site_id.clear();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_zero_batch_size() {
        let mut cfg = sample();
        cfg.batch_size = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn accepts_well_formed_config() {
        assert!(sample().validate().is_ok());
    }
}
