//! Environment variable source: ARTIFACT_VAULT__ prefix with __ separator

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::Environment;

/// Environment prefix for config overrides
pub const ENV_PREFIX: &str = "ARTIFACT_VAULT";

/// Add environment variable overlay to builder.
///
/// `ARTIFACT_VAULT__CACHE__ENABLED=false` maps to `cache.enabled`.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );
    Ok(builder)
}
