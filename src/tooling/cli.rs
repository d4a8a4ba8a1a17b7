//! CLI Tooling
//!
//! Command-line interface over the artifact vault. The vault core is async;
//! each command drives it through a dedicated tokio runtime with `block_on`.

use crate::config::{ConfigLoader, VaultConfig};
use crate::crypto::CryptoAdapter;
use crate::error::VaultError;
use crate::keys::{EnvKeyProvider, KeyProvider};
use crate::logging::LoggingConfig;
use crate::store::{Classification, Record};
use crate::tooling::format::{self, OutputFormat};
use crate::transport::{DisconnectedTransport, HttpRecordTransport, RecordTransport};
use crate::vault::ArtifactVault;
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::{info, warn};

/// Artifact Vault CLI - browse encrypted artifacts with an offline cache
#[derive(Parser)]
#[command(name = "artifact-vault")]
#[command(about = "Browse end-to-end encrypted artifacts with an offline cache")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (layered over the global config)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr, both)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// Fold command-line logging flags into the loaded configuration
    pub fn apply_logging_overrides(&self, logging: &mut LoggingConfig) {
        if self.verbose {
            logging.level = "debug".to_string();
        }
        if let Some(level) = &self.log_level {
            logging.level = level.clone();
        }
        if let Some(format) = &self.log_format {
            logging.format = format.clone();
        }
        if let Some(output) = &self.log_output {
            logging.output = output.clone();
        }
        if let Some(file) = &self.log_file {
            logging.file = Some(file.clone());
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch and decrypt every artifact in a scope, refreshing the cache
    Fetch {
        /// Scope (session) to fetch; defaults to transport.default_scope
        #[arg(long)]
        scope: Option<String>,
    },
    /// List artifacts, newest first
    List {
        #[arg(long)]
        scope: Option<String>,
        /// Case-insensitive search over title, path, and language
        #[arg(long)]
        query: Option<String>,
        /// Only artifacts of this kind (code, image, document, data, other)
        #[arg(long)]
        kind: Option<String>,
        /// Only artifacts attached to this session, in sequence order
        #[arg(long)]
        session: Option<String>,
        /// Read from the offline cache without contacting the remote
        #[arg(long)]
        offline: bool,
        /// Group every artifact by kind instead of listing (ignores --query and --kind)
        #[arg(long)]
        grouped: bool,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Show artifacts as a directory tree
    Tree {
        #[arg(long)]
        scope: Option<String>,
        #[arg(long)]
        query: Option<String>,
        #[arg(long)]
        offline: bool,
    },
    /// Show one artifact with its content
    Show {
        /// Artifact id
        id: String,
        #[arg(long)]
        scope: Option<String>,
        #[arg(long)]
        offline: bool,
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Load every missing body into the cache
    Prefetch {
        #[arg(long)]
        scope: Option<String>,
    },
    /// Offline cache commands
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
    /// Encrypt a file into the base64 envelope form (for fixtures)
    Seal {
        /// File to encrypt
        file: PathBuf,
        /// Write the envelope here instead of printing it
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print the effective configuration as TOML
    Config,
}

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Show cache statistics
    Stats {
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// List cached artifacts
    List {
        #[arg(long)]
        session: Option<String>,
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Remove every cached artifact
    Clear,
}

/// Where the records shown by a command came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Live,
    Offline,
}

/// CLI context owning the runtime, configuration, and vault
pub struct CliContext {
    config: VaultConfig,
    runtime: Runtime,
    vault: Arc<ArtifactVault>,
    keys: Arc<dyn KeyProvider>,
}

impl CliContext {
    /// Create a context from configuration files and environment
    pub fn new(config_path: Option<&Path>) -> Result<Self, VaultError> {
        Self::from_config(ConfigLoader::load(config_path)?)
    }

    /// Create a context using the HTTP transport and the environment key
    pub fn from_config(config: VaultConfig) -> Result<Self, VaultError> {
        let transport: Arc<dyn RecordTransport> = if config.transport.base_url.is_some() {
            Arc::new(HttpRecordTransport::new(&config.transport)?)
        } else {
            Arc::new(DisconnectedTransport)
        };
        Self::with_parts(config, transport, Arc::new(EnvKeyProvider::new()))
    }

    /// Create a context around an explicit transport and key provider
    pub fn with_parts(
        config: VaultConfig,
        transport: Arc<dyn RecordTransport>,
        keys: Arc<dyn KeyProvider>,
    ) -> Result<Self, VaultError> {
        let runtime = Runtime::new()
            .map_err(|e| VaultError::ConfigError(format!("Failed to create runtime: {}", e)))?;
        // The cache worker is spawned on this runtime.
        let vault = {
            let _guard = runtime.enter();
            ArtifactVault::from_config(&config, transport, Arc::clone(&keys))?
        };
        Ok(Self {
            config,
            runtime,
            vault: Arc::new(vault),
            keys,
        })
    }

    pub fn vault(&self) -> &ArtifactVault {
        &self.vault
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// Execute a CLI command
    pub fn execute(&self, command: &Commands) -> Result<String, VaultError> {
        let result = self.execute_inner(command);
        if let Err(e) = self.runtime.block_on(self.vault.flush_cache()) {
            warn!(error = %e, "Failed to flush offline cache");
        }
        result
    }

    /// Drain pending cache writes and stop the worker
    pub fn shutdown(&self) {
        self.runtime.block_on(self.vault.shutdown());
    }

    fn execute_inner(&self, command: &Commands) -> Result<String, VaultError> {
        match command {
            Commands::Fetch { scope } => {
                let scope = self.resolve_scope(scope.as_deref())?;
                let count = self.runtime.block_on(self.vault.fetch_records(&scope))?;
                Ok(format!("Fetched {} artifacts for scope {}", count, scope))
            }
            Commands::List {
                scope,
                query,
                kind,
                session,
                offline,
                grouped,
                format,
            } => {
                let format = OutputFormat::parse(format)?;
                let source = self.load_records(scope.as_deref(), *offline)?;
                if *grouped {
                    return self.render_grouped(source, format);
                }
                self.apply_filter(query.as_deref(), kind.as_deref())?;
                let records = match session {
                    Some(session) => self.vault.records_for_session(session),
                    None => self.vault.records(),
                };
                self.render_records(&records, source, format)
            }
            Commands::Tree {
                scope,
                query,
                offline,
            } => {
                let source = self.load_records(scope.as_deref(), *offline)?;
                self.apply_filter(query.as_deref(), None)?;
                Ok(with_banner(source, format::format_hierarchy(&self.vault.hierarchy())))
            }
            Commands::Show {
                id,
                scope,
                offline,
                format,
            } => {
                let format = OutputFormat::parse(format)?;
                let source = self.load_records(scope.as_deref(), *offline)?;
                self.handle_show(id, source, format)
            }
            Commands::Prefetch { scope } => {
                let scope = self.resolve_scope(scope.as_deref())?;
                self.runtime.block_on(self.vault.fetch_records(&scope))?;
                let pending: Vec<String> = self
                    .vault
                    .records()
                    .into_iter()
                    .filter(|r| !r.is_body_loaded())
                    .map(|r| r.id)
                    .collect();
                let requested = pending.len();
                let loaded = self.runtime.block_on(self.vault.prefetch_bodies(pending));
                Ok(format!("Prefetched {} of {} artifact bodies", loaded, requested))
            }
            Commands::Cache { command } => self.handle_cache_command(command),
            Commands::Seal { file, output } => self.handle_seal(file, output.as_deref()),
            Commands::Config => toml::to_string_pretty(&self.config)
                .map_err(|e| VaultError::ConfigError(format!("Failed to render config: {}", e))),
        }
    }

    fn resolve_scope(&self, scope: Option<&str>) -> Result<String, VaultError> {
        scope
            .map(str::to_string)
            .or_else(|| self.config.transport.default_scope.clone())
            .ok_or_else(|| {
                VaultError::ConfigError(
                    "No scope given (pass --scope or set transport.default_scope)".to_string(),
                )
            })
    }

    /// Populate the vault live, falling back to the offline cache
    fn load_records(&self, scope: Option<&str>, offline: bool) -> Result<Source, VaultError> {
        if offline {
            self.vault.load_from_cache(None);
            return Ok(Source::Offline);
        }
        let scope = self.resolve_scope(scope)?;
        match self.runtime.block_on(self.vault.fetch_records(&scope)) {
            Ok(_) => Ok(Source::Live),
            Err(e) => {
                if self.vault.load_from_cache(None) > 0 {
                    info!(error = %e, "Using offline cache after fetch failure");
                    Ok(Source::Offline)
                } else {
                    Err(e)
                }
            }
        }
    }

    fn apply_filter(&self, query: Option<&str>, kind: Option<&str>) -> Result<(), VaultError> {
        let classification = kind.map(str::parse::<Classification>).transpose()?;
        self.vault.set_search_query(query.unwrap_or_default());
        self.vault.set_classification_filter(classification);
        Ok(())
    }

    fn render_records(
        &self,
        records: &[Record],
        source: Source,
        format: OutputFormat,
    ) -> Result<String, VaultError> {
        match format {
            OutputFormat::Json => format::to_json(records),
            OutputFormat::Text => Ok(with_banner(source, format::format_record_table(records))),
        }
    }

    fn render_grouped(&self, source: Source, format: OutputFormat) -> Result<String, VaultError> {
        let groups = self.vault.grouped_records();
        match format {
            OutputFormat::Json => {
                let keyed: BTreeMap<&str, &Vec<Record>> =
                    groups.iter().map(|(tag, records)| (tag.as_str(), records)).collect();
                format::to_json(&keyed)
            }
            OutputFormat::Text => Ok(with_banner(source, format::format_grouped_counts(&groups))),
        }
    }

    fn handle_show(
        &self,
        id: &str,
        source: Source,
        format: OutputFormat,
    ) -> Result<String, VaultError> {
        if self.vault.record(id).is_none() {
            return Err(VaultError::RecordNotFound(id.to_string()));
        }
        self.runtime.block_on(self.vault.select(Some(id)));
        let record = self
            .vault
            .record(id)
            .ok_or_else(|| VaultError::RecordNotFound(id.to_string()))?;
        match format {
            OutputFormat::Json => format::to_json(&record),
            OutputFormat::Text => Ok(with_banner(source, format::format_record_detail(&record))),
        }
    }

    fn handle_cache_command(&self, command: &CacheCommands) -> Result<String, VaultError> {
        match command {
            CacheCommands::Stats { format } => {
                let format = OutputFormat::parse(format)?;
                let Some(stats) = self.vault.cache_stats() else {
                    return Ok("Offline cache is disabled.".to_string());
                };
                match format {
                    OutputFormat::Json => format::to_json(&stats),
                    OutputFormat::Text => Ok(format::format_cache_stats(&stats)),
                }
            }
            CacheCommands::List { session, format } => {
                let format = OutputFormat::parse(format)?;
                self.vault.clear();
                self.vault.load_from_cache(session.as_deref());
                let records = match session {
                    Some(session) => self.vault.records_for_session(session),
                    None => self.vault.records(),
                };
                self.render_records(&records, Source::Offline, format)
            }
            CacheCommands::Clear => {
                self.runtime.block_on(self.vault.clear_cache())?;
                Ok("Offline cache cleared.".to_string())
            }
        }
    }

    fn handle_seal(&self, file: &Path, output: Option<&Path>) -> Result<String, VaultError> {
        let key = self.keys.current_key()?;
        let plaintext = std::fs::read(file).map_err(|e| {
            VaultError::ConfigError(format!("Failed to read {}: {}", file.display(), e))
        })?;
        let envelope = CryptoAdapter::new().seal_envelope(&plaintext, &key)?;
        match output {
            Some(path) => {
                std::fs::write(path, &envelope).map_err(|e| {
                    VaultError::ConfigError(format!("Failed to write {}: {}", path.display(), e))
                })?;
                Ok(format!("Sealed {} into {}", file.display(), path.display()))
            }
            None => Ok(envelope),
        }
    }
}

fn with_banner(source: Source, body: String) -> String {
    match source {
        Source::Live => body,
        Source::Offline => format!("{}\n\n{}", format::format_offline_banner(), body),
    }
}
