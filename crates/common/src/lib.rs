pub mod crypto;
pub mod nats_config;
pub mod outcome;
pub mod retry;
