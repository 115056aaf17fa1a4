//! Process-level plumbing shared by the binaries: layered configuration
//! and logging initialisation.

pub mod config;
pub mod logging;

pub use config::{
    absolutize_sqlite_dsn, default_logging_config, AppConfig, CliArgs, LoggingConfig,
    Section, ServerConfig,
};
pub use logging::init_logging_from_config;
