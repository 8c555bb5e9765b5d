//! Application configuration for LeadMerge.
//!
//! User config lives at `~/.leadmerge/leadmerge.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LeadMergeError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "leadmerge.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".leadmerge";

// ---------------------------------------------------------------------------
// Config structs (matching leadmerge.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Which record fields carry identity.
    #[serde(default)]
    pub keys: KeysConfig,

    /// Deduplication behavior.
    #[serde(default)]
    pub dedup: DedupConfig,

    /// Reference-set (exclusion list) parsing.
    #[serde(default)]
    pub reference: ReferenceConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Directory merged output lands in when `--out` is not given.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Whether to write a run report next to the merged output.
    #[serde(default = "default_true")]
    pub write_report: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            write_report: true,
        }
    }
}

fn default_output_dir() -> String {
    "output".into()
}
fn default_true() -> bool {
    true
}

/// `[keys]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeysConfig {
    /// Field holding the email address.
    #[serde(default = "default_email_field")]
    pub email_field: String,

    /// Field holding the person's display name.
    #[serde(default = "default_name_field")]
    pub name_field: String,

    /// Organization fields, tried in order. Each may be a flat string or
    /// an object with a `name` sub-field.
    #[serde(default = "default_org_fields")]
    pub org_fields: Vec<String>,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            email_field: default_email_field(),
            name_field: default_name_field(),
            org_fields: default_org_fields(),
        }
    }
}

fn default_email_field() -> String {
    "email".into()
}
fn default_name_field() -> String {
    "name".into()
}
fn default_org_fields() -> Vec<String> {
    vec!["company_name".into(), "org_name".into()]
}

/// `[dedup]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DedupConfig {
    /// Fold name+org entities into a matching email entity after ingest.
    #[serde(default)]
    pub reconcile_tiers: bool,
}

/// `[reference]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceConfig {
    /// Accepted spellings of the email column, first match wins.
    #[serde(default = "default_email_columns")]
    pub email_columns: Vec<String>,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            email_columns: default_email_columns(),
        }
    }
}

fn default_email_columns() -> Vec<String> {
    vec!["Email".into(), "email".into(), "EMAIL".into()]
}

// ---------------------------------------------------------------------------
// Runtime key/dedup options (derived from config + CLI flags)
// ---------------------------------------------------------------------------

/// Field names the identity resolver reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyFields {
    pub email: String,
    pub name: String,
    pub org: Vec<String>,
}

impl Default for KeyFields {
    fn default() -> Self {
        Self::from(&KeysConfig::default())
    }
}

impl From<&KeysConfig> for KeyFields {
    fn from(keys: &KeysConfig) -> Self {
        Self {
            email: keys.email_field.clone(),
            name: keys.name_field.clone(),
            org: keys.org_fields.clone(),
        }
    }
}

/// Runtime deduplication options, immutable for the length of a run.
#[derive(Debug, Clone, Default)]
pub struct DedupOptions {
    /// Identity field names.
    pub keys: KeyFields,
    /// Enable the post-ingest name+org → email reconciliation pass.
    pub reconcile_tiers: bool,
}

impl From<&AppConfig> for DedupOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            keys: KeyFields::from(&config.keys),
            reconcile_tiers: config.dedup.reconcile_tiers,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.leadmerge/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| LeadMergeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.leadmerge/leadmerge.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| LeadMergeError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        LeadMergeError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    validate_config(&config)?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| LeadMergeError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| LeadMergeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| LeadMergeError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Reject configs that would make identity resolution meaningless.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    if config.keys.email_field.trim().is_empty() {
        return Err(LeadMergeError::config("keys.email_field must not be empty"));
    }
    if config.keys.name_field.trim().is_empty() {
        return Err(LeadMergeError::config("keys.name_field must not be empty"));
    }
    if config.keys.org_fields.iter().all(|f| f.trim().is_empty()) {
        return Err(LeadMergeError::config(
            "keys.org_fields must name at least one field",
        ));
    }
    if config.reference.email_columns.is_empty() {
        return Err(LeadMergeError::config(
            "reference.email_columns must name at least one column",
        ));
    }
    Ok(())
}
