//! Built-in defaults registered ahead of every other source.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};

/// Start a builder with the lowest-precedence defaults.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("cache.enabled", true)?
        .set_default("cache.queue_capacity", 1024_i64)?
        .set_default("cache.fence_stale_writes", true)?
        .set_default("transport.timeout_secs", 30_i64)?
        .set_default("transport.max_concurrent_body_loads", 4_i64)
}
