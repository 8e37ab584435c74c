//! Configuration, file system paths, and logging for auth session persistence.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{Config, SessionPersistence, DEFAULT_LOG_LEVEL};
pub use error::{ConfigError, ConfigResult};
pub use logging::{init_logging, parse_level};
pub use paths::Paths;
