//! Configuration for topicpath paths and services.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (TOPICPATH_HOME, TOPICPATH_CONTENT_ROOT, TOPICPATH_CATALOG)
//! 2. Config file (.topicpath/config.yaml)
//! 3. Defaults (~/.topicpath)
//!
//! Config file discovery:
//! - Searches current directory and parents for .topicpath/config.yaml
//! - Paths in config file are relative to the project root (the directory
//!   containing .topicpath/)

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub scan: Option<ScanConfig>,
    #[serde(default)]
    pub reconcile: Option<ReconcileConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory (job queue, availability records)
    pub home: Option<String>,
    /// Directory holding video files
    pub content_root: Option<String>,
    /// Catalog descriptor (topics.json)
    pub catalog: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScanConfig {
    pub extensions: Option<Vec<String>>,
    pub stability_delay_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReconcileConfig {
    pub channel_capacity: Option<usize>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// State directory
    pub home: PathBuf,
    /// Video file directory
    pub content_root: PathBuf,
    /// Catalog descriptor file
    pub catalog: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    /// Scanner settings
    pub scan: ScanSettings,
    /// Capacity of the reconcile request channel
    pub reconcile_capacity: usize,
}

#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub extensions: Vec<String>,
    pub stability_delay_secs: u64,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            extensions: vec!["mp4".to_string()],
            stability_delay_secs: 5,
        }
    }
}

const DEFAULT_RECONCILE_CAPACITY: usize = 64;

impl ResolvedConfig {
    /// Job queue log ($TOPICPATH_HOME/jobs.jsonl)
    pub fn job_queue_path(&self) -> PathBuf {
        self.home.join("jobs.jsonl")
    }

    /// Availability records ($TOPICPATH_HOME/video_files.json)
    pub fn records_path(&self) -> PathBuf {
        self.home.join("video_files.json")
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".topicpath").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's project root
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Pick env var, then config value, then default
fn pick_path(env_key: &str, base: &Path, configured: Option<&str>, default: PathBuf) -> PathBuf {
    if let Ok(value) = std::env::var(env_key) {
        PathBuf::from(value)
    } else if let Some(configured) = configured {
        resolve_path(base, configured)
    } else {
        default
    }
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".topicpath");

    let config_file = find_config_file();
    let config = config_file.as_deref().map(load_config_file).transpose()?;

    // Base directory is the parent of .topicpath/ (i.e., grandparent of config.yaml)
    let base_dir = config_file
        .as_deref()
        .and_then(Path::parent)
        .and_then(Path::parent)
        .unwrap_or(Path::new("."))
        .to_path_buf();

    let paths = config.as_ref().map(|c| c.paths.clone()).unwrap_or_default();

    let home = pick_path("TOPICPATH_HOME", &base_dir, paths.home.as_deref(), default_home);
    let content_root = pick_path(
        "TOPICPATH_CONTENT_ROOT",
        &base_dir,
        paths.content_root.as_deref(),
        home.join("content"),
    );
    let catalog = pick_path(
        "TOPICPATH_CATALOG",
        &base_dir,
        paths.catalog.as_deref(),
        home.join("topics.json"),
    );

    let defaults = ScanSettings::default();
    let scan_config = config.as_ref().and_then(|c| c.scan.clone());
    let scan = ScanSettings {
        extensions: scan_config
            .as_ref()
            .and_then(|s| s.extensions.clone())
            .unwrap_or(defaults.extensions),
        stability_delay_secs: scan_config
            .as_ref()
            .and_then(|s| s.stability_delay_secs)
            .unwrap_or(defaults.stability_delay_secs),
    };

    let reconcile_capacity = config
        .as_ref()
        .and_then(|c| c.reconcile.as_ref())
        .and_then(|r| r.channel_capacity)
        .unwrap_or(DEFAULT_RECONCILE_CAPACITY);

    Ok(ResolvedConfig {
        home,
        content_root,
        catalog,
        config_file,
        scan,
        reconcile_capacity,
    })
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}

// ============================================================================
// Convenience functions
// ============================================================================

/// Get the job queue path ($TOPICPATH_HOME/jobs.jsonl)
pub fn job_queue_path() -> Result<PathBuf> {
    Ok(config()?.job_queue_path())
}
