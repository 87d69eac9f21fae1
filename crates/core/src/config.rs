//! Configuration management for the Fathom engine.
//!
//! Configuration is merged from three layers, lowest precedence first:
//! built-in defaults, an optional YAML file (`fathom.yaml`), and environment
//! variables. CLI flags are applied on top via [`AppConfig::with_overrides`].

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Routing thresholds and cache tuning
    pub routing: RoutingConfig,

    /// Source endpoints and timeouts
    pub sources: SourcesConfig,

    /// Circuit breaker tuning
    pub circuit: CircuitConfig,
}

/// Thresholds and cache tuning for the router.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Minimum composite score for a source to be selected.
    pub inclusion_threshold: f32,

    /// Complexity above which at least two sources are force-included.
    pub high_complexity_threshold: f32,

    /// Time-to-live for cached routing decisions, in seconds.
    pub decision_cache_ttl_secs: u64,

    /// Time-to-live for cached fused results, in seconds.
    pub result_cache_ttl_secs: u64,

    /// Maximum number of fused results kept in the cache.
    pub result_cache_capacity: usize,

    /// Parent deadline for one whole fan-out, in milliseconds.
    pub parent_deadline_ms: u64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            inclusion_threshold: 0.45,
            high_complexity_threshold: 0.70,
            decision_cache_ttl_secs: 300,
            result_cache_ttl_secs: 3600,
            result_cache_capacity: 100,
            parent_deadline_ms: 8_000,
        }
    }
}

impl RoutingConfig {
    pub fn decision_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.decision_cache_ttl_secs)
    }

    pub fn result_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.result_cache_ttl_secs)
    }

    pub fn parent_deadline(&self) -> Duration {
        Duration::from_millis(self.parent_deadline_ms)
    }
}

/// Endpoint and timeout for one remote source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub endpoint: String,
    pub timeout_ms: u64,
}

impl EndpointConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Configuration for the external source adapters.
///
/// The knowledge base is in-memory and needs no endpoint or timeout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub internal_index: EndpointConfig,
    pub web_search: EndpointConfig,

    /// Freshness score for internal index content, in `[0, 1]`. Depends on
    /// how often the deployment re-syncs its document store.
    pub index_freshness: f32,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            internal_index: EndpointConfig {
                endpoint: "http://localhost:7700".to_string(),
                timeout_ms: 3_000,
            },
            web_search: EndpointConfig {
                endpoint: "http://localhost:8080".to_string(),
                timeout_ms: 5_000,
            },
            index_freshness: 0.55,
        }
    }
}

/// Circuit breaker tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitConfig {
    /// Rolling error rate at which a closed circuit opens.
    pub error_rate_threshold: f32,

    /// Minimum number of observed calls before the circuit may open.
    pub min_samples: u64,

    /// How long an open circuit waits before allowing a probe, in seconds.
    pub cooldown_secs: u64,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            error_rate_threshold: 0.5,
            min_samples: 4,
            cooldown_secs: 30,
        }
    }
}

impl CircuitConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigFile {
    routing: Option<RoutingConfig>,
    sources: Option<SourcesConfig>,
    circuit: Option<CircuitConfig>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_file: None,
            log_level: None,
            verbose: false,
            no_color: false,
            routing: RoutingConfig::default(),
            sources: SourcesConfig::default(),
            circuit: CircuitConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the YAML file, and the environment.
    ///
    /// Environment variables:
    /// - `FATHOM_CONFIG`: path to the config file (default: `./fathom.yaml`)
    /// - `FATHOM_INDEX_ENDPOINT`: internal index base URL
    /// - `FATHOM_SEARCH_ENDPOINT`: web search base URL
    /// - `RUST_LOG`: log level
    /// - `NO_COLOR`: disable colored output
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(config_file) = std::env::var("FATHOM_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| PathBuf::from("fathom.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override the YAML file
        if let Ok(endpoint) = std::env::var("FATHOM_INDEX_ENDPOINT") {
            config.sources.internal_index.endpoint = endpoint;
        }

        if let Ok(endpoint) = std::env::var("FATHOM_SEARCH_ENDPOINT") {
            config.sources.web_search.endpoint = endpoint;
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        config.validate()?;
        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    ///
    /// Sections present in the file replace the corresponding section
    /// wholesale; absent sections keep their current values.
    fn merge_yaml(&self, path: &PathBuf) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(routing) = config_file.routing {
            result.routing = routing;
        }

        if let Some(sources) = config_file.sources {
            result.sources = sources;
        }

        if let Some(circuit) = config_file.circuit {
            result.circuit = circuit;
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        Ok(result)
    }

    /// Apply CLI overrides, giving precedence to flags over everything else.
    pub fn with_overrides(
        mut self,
        config_file: Option<PathBuf>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Validate threshold ranges.
    pub fn validate(&self) -> AppResult<()> {
        let r = &self.routing;

        if !(0.0..=1.0).contains(&r.inclusion_threshold) {
            return Err(AppError::Config(format!(
                "inclusion_threshold must be in [0, 1], got {}",
                r.inclusion_threshold
            )));
        }

        if !(0.0..=1.0).contains(&r.high_complexity_threshold) {
            return Err(AppError::Config(format!(
                "high_complexity_threshold must be in [0, 1], got {}",
                r.high_complexity_threshold
            )));
        }

        if !(0.0..=1.0).contains(&self.circuit.error_rate_threshold) {
            return Err(AppError::Config(format!(
                "error_rate_threshold must be in [0, 1], got {}",
                self.circuit.error_rate_threshold
            )));
        }

        if !(0.0..=1.0).contains(&self.sources.index_freshness) {
            return Err(AppError::Config(format!(
                "index_freshness must be in [0, 1], got {}",
                self.sources.index_freshness
            )));
        }

        if r.parent_deadline_ms == 0 {
            return Err(AppError::Config(
                "parent_deadline_ms must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}
