pub const STREAM_NAME: &str = "PULSE_OUTCOMES";
pub const SUBJECT: &str = "pulse.outcomes.>";
pub const SUBJECT_PREFIX: &str = "pulse.outcomes";
pub const CONSUMER_NAME: &str = "pulse-db-writers";

pub fn subject_for_monitor(monitor_id: &uuid::Uuid) -> String {
    format!("{SUBJECT_PREFIX}.{monitor_id}")
}

#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub name: String,
    pub subjects: Vec<String>,
    pub max_bytes: i64,
    pub max_age_secs: u64,
    pub duplicate_window_secs: u64,
    pub retention: RetentionPolicy,
    pub storage: StorageType,
    pub num_replicas: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RetentionPolicy {
    Limits,
    WorkQueue,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StorageType {
    File,
    Memory,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            name: STREAM_NAME.into(),
            subjects: vec![SUBJECT.into()],
            max_bytes: 536_870_912,
            max_age_secs: 86400,
            duplicate_window_secs: 120,
            retention: RetentionPolicy::WorkQueue,
            storage: StorageType::File,
            num_replicas: 1,
        }
    }
}

impl StreamConfig {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_for_monitor_format() {
        let id = uuid::Uuid::nil();
        assert_eq!(
            subject_for_monitor(&id),
            "pulse.outcomes.00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn default_stream_config() {
        let cfg = StreamConfig::default();
        assert_eq!(cfg.name, "PULSE_OUTCOMES");
        assert_eq!(cfg.retention, RetentionPolicy::WorkQueue);
        assert_eq!(cfg.subjects, vec!["pulse.outcomes.>".to_string()]);
    }

    #[test]
    fn named_keeps_defaults() {
        let cfg = StreamConfig::named("OTHER");
        assert_eq!(cfg.name, "OTHER");
        assert_eq!(cfg.duplicate_window_secs, 120);
    }
}
