//! mortar build configuration
//!
//! Provides the configuration value consumed by the planner:
//! - Typed build options (cpu, compilation mode, OS and SDK versions, bitcode,
//!   coverage and feature toggles)
//! - Loading from `mortar.toml`
//! - Environment and flag-style overrides
//! - Validation of version strings and cpu values
//!
//! # Configuration Hierarchy
//!
//! Options are loaded and merged in the following order (later overrides earlier):
//! 1. Built-in defaults
//! 2. Project file (`./mortar.toml`, searched upwards)
//! 3. Environment variables (`MORTAR_*`)
//! 4. Caller overrides (`BuildOptions::set`)
//!
//! # Example
//!
//! ```no_run
//! use mortar_config::ConfigLoader;
//! use std::path::Path;
//!
//! let loader = ConfigLoader::new();
//! let options = loader.load_from_directory(Path::new(".")).unwrap();
//! println!("planning for {}", options.cpu);
//! ```

pub mod loader;
pub mod options;

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Unknown option '{0}'")]
    UnknownOption(String),

    #[error("Unsupported cpu '{0}': expected ios_<arch>, tvos_<arch>, watchos_<arch> or darwin[_<arch>]")]
    UnsupportedCpu(String),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

// Re-export main types
pub use loader::ConfigLoader;
pub use options::{BitcodeMode, BuildOptions, CompilationMode, CoverageMode, PlatformType};
