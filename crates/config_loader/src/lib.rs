//! # Config Loader
//!
//! Manifest loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON manifest files
//! - Validate manifest legality
//! - Produce a `FanoutManifest`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let manifest = ConfigLoader::load_from_path(Path::new("jobs.toml")).unwrap();
//! println!("Jobs: {}", manifest.jobs.len());
//! ```

mod parser;
mod validator;

pub use contracts::FanoutManifest;
pub use parser::ConfigFormat;
pub use validator::warnings;

use contracts::ContractError;
use std::path::Path;

/// Manifest loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load a manifest from a file path
    ///
    /// The format is detected from the file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<FanoutManifest, ContractError> {
        let format = ConfigFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load a manifest from a string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<FanoutManifest, ContractError> {
        let manifest = parser::parse(content, format)?;
        validator::validate(&manifest)?;
        Ok(manifest)
    }

    /// Serialize a manifest to a TOML string
    pub fn to_toml(manifest: &FanoutManifest) -> Result<String, ContractError> {
        parser::render(manifest, ConfigFormat::Toml)
    }

    /// Serialize a manifest to a JSON string
    pub fn to_json(manifest: &FanoutManifest) -> Result<String, ContractError> {
        parser::render(manifest, ConfigFormat::Json)
    }
}
