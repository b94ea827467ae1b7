use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context};
use wfcat_catalog::builder::DEFAULT_PAGE_SIZE;
use wfcat_catalog::dependencies::DEFAULT_CONCURRENCY;
use wfcat_core::health::DEFAULT_STUCK_AFTER_HOURS;
use wfcat_core::{ClassifierConfig, SimpleApprovalRule};
use wfcat_db::DEFAULT_MAX_CONNECTIONS;
use wfcat_report::ReportFormat;

/// Where definitions and enrichment data are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    Postgres {
        database_url: String,
        max_connections: u32,
    },
    /// In-memory store seeded from a JSON fixture file.
    Memory { fixture: PathBuf },
}

/// Runtime configuration of the `wfcat` binary.
#[derive(Debug, Clone, PartialEq)]
pub struct CliConfig {
    pub store: StoreConfig,
    pub batch_start: u64,
    pub batch_size: u64,
    pub concurrency: usize,
    pub format: ReportFormat,
    /// Report destination; stdout when unset.
    pub output: Option<PathBuf>,
    pub classifier: ClassifierConfig,
}

impl CliConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                         | Default        |
    /// |---------------------------------|----------------|
    /// | `WFCAT_STORE`                   | `postgres`     |
    /// | `DATABASE_URL`                  | required for `postgres` |
    /// | `DB_MAX_CONNECTIONS`            | `20`           |
    /// | `WFCAT_MEMORY_FIXTURE`          | required for `memory` |
    /// | `WFCAT_BATCH_START`             | `0`            |
    /// | `WFCAT_BATCH_SIZE`              | `50`           |
    /// | `WFCAT_CONCURRENCY`             | `4`            |
    /// | `WFCAT_FORMAT`                  | `csv-summary`  |
    /// | `WFCAT_OUTPUT`                  | stdout         |
    /// | `WFCAT_SIMPLE_APPROVAL_RULE`    | `grouped`      |
    /// | `WFCAT_EMPTY_NOTIFICATION_ONLY` | `false`        |
    /// | `WFCAT_STUCK_AFTER_HOURS`       | `24`           |
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let store = match var("WFCAT_STORE").as_deref().unwrap_or("postgres") {
            "postgres" => StoreConfig::Postgres {
                database_url: var("DATABASE_URL")
                    .ok_or_else(|| anyhow!("DATABASE_URL must be set"))?,
                max_connections: parse_or(&var, "DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?,
            },
            "memory" => StoreConfig::Memory {
                fixture: var("WFCAT_MEMORY_FIXTURE").map(PathBuf::from).ok_or_else(|| {
                    anyhow!("WFCAT_MEMORY_FIXTURE must be set when WFCAT_STORE=memory")
                })?,
            },
            other => bail!("Invalid WFCAT_STORE '{other}'. Must be one of: postgres, memory"),
        };

        let batch_size = parse_or(&var, "WFCAT_BATCH_SIZE", DEFAULT_PAGE_SIZE)?;
        if batch_size == 0 {
            bail!("WFCAT_BATCH_SIZE must be at least 1");
        }
        let concurrency = parse_or(&var, "WFCAT_CONCURRENCY", DEFAULT_CONCURRENCY)?;
        if concurrency == 0 {
            bail!("WFCAT_CONCURRENCY must be at least 1");
        }

        let format = match var("WFCAT_FORMAT") {
            Some(raw) => ReportFormat::from_str_value(&raw)?,
            None => ReportFormat::CsvSummary,
        };

        let simple_approval = match var("WFCAT_SIMPLE_APPROVAL_RULE") {
            Some(raw) => SimpleApprovalRule::from_str_value(&raw)?,
            None => SimpleApprovalRule::Grouped,
        };
        let stuck_after_hours: i64 =
            parse_or(&var, "WFCAT_STUCK_AFTER_HOURS", DEFAULT_STUCK_AFTER_HOURS)?;
        if stuck_after_hours < 0 {
            bail!("WFCAT_STUCK_AFTER_HOURS must not be negative");
        }
        let stuck_after = chrono::TimeDelta::try_hours(stuck_after_hours)
            .ok_or_else(|| anyhow!("WFCAT_STUCK_AFTER_HOURS is out of range"))?;

        Ok(Self {
            store,
            batch_start: parse_or(&var, "WFCAT_BATCH_START", 0)?,
            batch_size,
            concurrency,
            format,
            output: var("WFCAT_OUTPUT").map(PathBuf::from),
            classifier: ClassifierConfig {
                simple_approval,
                empty_is_notification_only: parse_or(&var, "WFCAT_EMPTY_NOTIFICATION_ONLY", false)?,
                stuck_after,
            },
        })
    }
}

fn parse_or<T, F>(var: &F, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has invalid value '{raw}'")),
        None => Ok(default),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use assert_matches::assert_matches;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<CliConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        CliConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_with_database_url() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/wf")]).unwrap();
        assert_eq!(
            config.store,
            StoreConfig::Postgres {
                database_url: "postgres://localhost/wf".to_string(),
                max_connections: 20,
            }
        );
        assert_eq!(config.batch_start, 0);
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.format, ReportFormat::CsvSummary);
        assert_eq!(config.output, None);
        assert_eq!(config.classifier, ClassifierConfig::default());
    }

    #[test]
    fn postgres_requires_database_url() {
        let err = load(&[]).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn memory_store_uses_fixture() {
        let config = load(&[
            ("WFCAT_STORE", "memory"),
            ("WFCAT_MEMORY_FIXTURE", "fixtures/wf.json"),
            ("WFCAT_FORMAT", "json"),
            ("WFCAT_SIMPLE_APPROVAL_RULE", "literal"),
            ("WFCAT_EMPTY_NOTIFICATION_ONLY", "true"),
            ("WFCAT_STUCK_AFTER_HOURS", "6"),
        ])
        .unwrap();
        assert_matches!(
            config.store,
            StoreConfig::Memory { fixture } if fixture == PathBuf::from("fixtures/wf.json")
        );
        assert_eq!(config.format, ReportFormat::Json);
        assert_eq!(config.classifier.simple_approval, SimpleApprovalRule::Literal);
        assert!(config.classifier.empty_is_notification_only);
        assert_eq!(config.classifier.stuck_after, chrono::Duration::hours(6));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let base = ("DATABASE_URL", "postgres://localhost/wf");
        assert!(load(&[base, ("WFCAT_BATCH_SIZE", "0")]).is_err());
        assert!(load(&[base, ("WFCAT_BATCH_SIZE", "many")]).is_err());
        assert!(load(&[base, ("WFCAT_CONCURRENCY", "0")]).is_err());
        assert!(load(&[base, ("WFCAT_FORMAT", "xlsx")]).is_err());
        assert!(load(&[base, ("WFCAT_STORE", "sqlite")]).is_err());
    }

    #[test]
    fn oversized_stuck_threshold_is_rejected() {
        let base = ("DATABASE_URL", "postgres://localhost/wf");
        let err =
            load(&[base, ("WFCAT_STUCK_AFTER_HOURS", "9223372036854775807")]).unwrap_err();
        assert!(err.to_string().contains("WFCAT_STUCK_AFTER_HOURS"));
        assert!(load(&[base, ("WFCAT_STUCK_AFTER_HOURS", "-1")]).is_err());
    }
}
