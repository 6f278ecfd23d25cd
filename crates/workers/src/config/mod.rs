mod loader;
mod schema;

pub use loader::{apply_overrides, load, load_from_file, load_from_str, ConfigError, CONFIG_ENV};
pub use schema::{DeliveryConfig, ProbeConfig, SmtpSettings, StreamSettings, WorkerConfig};
