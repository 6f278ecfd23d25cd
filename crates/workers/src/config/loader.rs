use std::path::Path;

use super::schema::{SmtpSettings, WorkerConfig};

/// Names the optional YAML file read before environment overrides.
pub const CONFIG_ENV: &str = "PULSE_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid {key}: {value}")]
    Env { key: &'static str, value: String },
    #[error("validation: {0}")]
    Validation(String),
}

/// File named by `PULSE_CONFIG` if set, then process environment overrides.
pub fn load() -> Result<WorkerConfig, ConfigError> {
    let cfg = match std::env::var(CONFIG_ENV) {
        Ok(path) => {
            let contents = std::fs::read_to_string(&path)?;
            serde_yaml::from_str(&contents)?
        }
        Err(_) => WorkerConfig::default(),
    };
    let cfg = apply_overrides(cfg, |key| std::env::var(key).ok())?;
    validate(&cfg)?;
    Ok(cfg)
}

pub fn load_from_file(path: &Path) -> Result<WorkerConfig, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    load_from_str(&contents)
}

pub fn load_from_str(yaml: &str) -> Result<WorkerConfig, ConfigError> {
    let cfg: WorkerConfig = serde_yaml::from_str(yaml)?;
    validate(&cfg)?;
    Ok(cfg)
}

pub fn apply_overrides<F>(mut cfg: WorkerConfig, lookup: F) -> Result<WorkerConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("DATABASE_URL") {
        cfg.database_url = v;
    }
    if let Some(v) = lookup("NATS_URL") {
        cfg.nats_url = v;
    }
    if let Some(v) = lookup("WORKER_API_ADDR") {
        cfg.api_addr = v;
    }
    if let Some(v) = lookup("PROBE_CONCURRENCY") {
        cfg.probe.concurrency = v.parse().map_err(|_| ConfigError::Env {
            key: "PROBE_CONCURRENCY",
            value: v,
        })?;
    }
    if let Some(v) = lookup("CONSUMER_NAME") {
        cfg.stream.consumer_name = v;
    }

    if let Some(host) = lookup("SMTP_HOST") {
        let mut smtp = cfg.smtp.take().unwrap_or(SmtpSettings {
            host: String::new(),
            port: 587,
            username: None,
            password: None,
            from: "pulse@localhost".into(),
        });
        smtp.host = host;
        if let Some(v) = lookup("SMTP_PORT") {
            smtp.port = v.parse().map_err(|_| ConfigError::Env {
                key: "SMTP_PORT",
                value: v,
            })?;
        }
        if let Some(v) = lookup("SMTP_USERNAME") {
            smtp.username = Some(v);
        }
        if let Some(v) = lookup("SMTP_PASSWORD") {
            smtp.password = Some(v);
        }
        if let Some(v) = lookup("SMTP_FROM") {
            smtp.from = v;
        }
        cfg.smtp = Some(smtp);
    }
    Ok(cfg)
}

fn validate(cfg: &WorkerConfig) -> Result<(), ConfigError> {
    if cfg.database_url.is_empty() {
        return Err(ConfigError::Validation("database_url must not be empty".into()));
    }
    if cfg.nats_url.is_empty() {
        return Err(ConfigError::Validation("nats_url must not be empty".into()));
    }
    if cfg.probe.concurrency == 0 {
        return Err(ConfigError::Validation("probe.concurrency must be > 0".into()));
    }
    if cfg.probe.attempts == 0 {
        return Err(ConfigError::Validation("probe.attempts must be > 0".into()));
    }
    if cfg.stream.batch_size == 0 {
        return Err(ConfigError::Validation("stream.batch_size must be > 0".into()));
    }
    if let Some(smtp) = &cfg.smtp {
        if smtp.host.is_empty() {
            return Err(ConfigError::Validation("smtp.host must not be empty".into()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn environment_wins_over_file() {
        let cfg = load_from_str("nats_url: nats://file:4222\nprobe:\n  concurrency: 4\n").unwrap();
        let cfg = apply_overrides(
            cfg,
            env(&[("NATS_URL", "nats://env:4222"), ("PROBE_CONCURRENCY", "32")]),
        )
        .unwrap();
        assert_eq!(cfg.nats_url, "nats://env:4222");
        assert_eq!(cfg.probe.concurrency, 32);
    }

    #[test]
    fn bad_number_in_env_is_reported() {
        let err = apply_overrides(WorkerConfig::default(), env(&[("PROBE_CONCURRENCY", "many")]))
            .unwrap_err();
        assert!(err.to_string().contains("PROBE_CONCURRENCY"));
    }

    #[test]
    fn smtp_is_built_from_env() {
        let cfg = apply_overrides(
            WorkerConfig::default(),
            env(&[
                ("SMTP_HOST", "mail.example.com"),
                ("SMTP_PORT", "2525"),
                ("SMTP_FROM", "ops@example.com"),
            ]),
        )
        .unwrap();
        let smtp = cfg.smtp.unwrap();
        assert_eq!(smtp.host, "mail.example.com");
        assert_eq!(smtp.port, 2525);
        assert_eq!(smtp.from, "ops@example.com");
    }

    #[test]
    fn zero_concurrency_rejected() {
        let err = load_from_str("probe:\n  concurrency: 0\n").unwrap_err();
        assert!(err.to_string().contains("concurrency"));
    }

    #[test]
    fn empty_database_url_rejected() {
        let err = load_from_str("database_url: \"\"\n").unwrap_err();
        assert!(err.to_string().contains("database_url"));
    }

    #[test]
    fn load_from_file_works() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("worker.yml");
        std::fs::write(&path, "api_addr: 127.0.0.1:9999\nstream:\n  batch_size: 5\n").unwrap();
        let cfg = load_from_file(&path).unwrap();
        assert_eq!(cfg.api_addr, "127.0.0.1:9999");
        assert_eq!(cfg.stream.batch_size, 5);
    }
}
