//! Configuration types.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::pipeline::batch::{BatchOptions, DEFAULT_BATCH_LIMIT, DEFAULT_SLEEP_BETWEEN};
use crate::pipeline::types::ProcessingMode;
use crate::store::StoreLocations;

/// Where the batch reads messages from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    /// The inbox snapshot document in the data directory.
    Snapshot,
    /// A directory of `.eml` files.
    Maildir(PathBuf),
}

/// Triage run configuration.
#[derive(Debug, Clone)]
pub struct TriageConfig {
    /// Root directory for all JSON documents.
    pub data_dir: PathBuf,
    pub source: SourceKind,
    pub mode: ProcessingMode,
    pub query: Option<String>,
    pub limit: usize,
    pub mark_processed: bool,
    /// Pause between messages in a batch.
    pub sleep_between: Duration,
    pub locations: StoreLocations,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            source: SourceKind::Snapshot,
            mode: ProcessingMode::Heuristic,
            query: None,
            limit: DEFAULT_BATCH_LIMIT,
            mark_processed: true,
            sleep_between: DEFAULT_SLEEP_BETWEEN,
            locations: StoreLocations::default(),
        }
    }
}

impl TriageConfig {
    /// Read `MAIL_TRIAGE_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let data_dir = get("MAIL_TRIAGE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let source = match get("MAIL_TRIAGE_SOURCE").as_deref().map(str::trim) {
            None | Some("snapshot") => SourceKind::Snapshot,
            Some("maildir") => {
                let path = get("MAIL_TRIAGE_MAILDIR")
                    .ok_or_else(|| ConfigError::MissingEnvVar("MAIL_TRIAGE_MAILDIR".into()))?;
                SourceKind::Maildir(PathBuf::from(path))
            }
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "MAIL_TRIAGE_SOURCE".into(),
                    message: format!("expected snapshot or maildir, got '{other}'"),
                });
            }
        };

        let mode = match get("MAIL_TRIAGE_MODE") {
            Some(value) => value.parse()?,
            None => defaults.mode,
        };

        let limit = parse_var(&get, "MAIL_TRIAGE_LIMIT")?.unwrap_or(defaults.limit);
        let mark_processed =
            parse_bool(&get, "MAIL_TRIAGE_MARK_PROCESSED")?.unwrap_or(defaults.mark_processed);
        let sleep_between = parse_var::<u64>(&get, "MAIL_TRIAGE_SLEEP_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.sleep_between);

        Ok(Self {
            data_dir,
            source,
            mode,
            query: get("MAIL_TRIAGE_QUERY"),
            limit,
            mark_processed,
            sleep_between,
            locations: defaults.locations,
        })
    }

    /// Options for one batch run.
    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            query: self.query.clone(),
            limit: self.limit,
            mode: self.mode,
            mark_processed: self.mark_processed,
            sleep_between: self.sleep_between,
        }
    }
}

fn parse_var<T>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get(key)
        .map(|value| {
            value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })
        })
        .transpose()
}

fn parse_bool(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<bool>, ConfigError> {
    get(key)
        .map(|value| match value.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("expected a boolean, got '{other}'"),
            }),
        })
        .transpose()
}
