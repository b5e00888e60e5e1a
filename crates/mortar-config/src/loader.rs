//! Configuration Loader
//!
//! Handles loading build options from `mortar.toml` and applying overrides
//! with proper precedence.

use crate::options::{BitcodeMode, BuildOptions, CompilationMode};
use crate::ConfigResult;
use std::env;
use std::path::{Path, PathBuf};

/// Name of the project configuration file
pub const CONFIG_FILE_NAME: &str = "mortar.toml";

/// Configuration loader
///
/// Loads build options from multiple sources and merges them with proper precedence:
/// 1. Built-in defaults - lowest priority
/// 2. Project file (./mortar.toml) - overrides defaults
/// 3. Environment variables (MORTAR_*) - overrides the file
/// 4. Caller overrides - highest priority (`BuildOptions::set`, applied by the caller)
pub struct ConfigLoader {
    /// Whether `MORTAR_*` environment variables are consulted
    read_env: bool,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self { read_env: true }
    }

    /// Disable environment overrides
    pub fn without_env(mut self) -> Self {
        self.read_env = false;
        self
    }

    /// Load options starting from the given directory
    ///
    /// Walks up the directory tree to find mortar.toml. A missing file yields
    /// the default options.
    pub fn load_from_directory(&self, start_dir: &Path) -> ConfigResult<BuildOptions> {
        let options = match Self::find_config_file(start_dir) {
            Some(path) => BuildOptions::load_from_file(&path)?,
            None => BuildOptions::default(),
        };
        self.finish(options)
    }

    /// Load options from a specific file
    pub fn load_from_file(&self, config_path: &Path) -> ConfigResult<BuildOptions> {
        let options = BuildOptions::load_from_file(config_path)?;
        self.finish(options)
    }

    /// Find the nearest mortar.toml at or above `start_dir`
    pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Some(config_path);
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return None,
            }
        }
    }

    fn finish(&self, options: BuildOptions) -> ConfigResult<BuildOptions> {
        let options = if self.read_env {
            self.apply_env_overrides(options)?
        } else {
            options
        };
        options.validate()?;
        Ok(options)
    }

    /// Apply environment variable overrides
    ///
    /// Environment variables follow the pattern: MORTAR_<OPTION>
    /// Example: MORTAR_COMPILATION_MODE=opt
    fn apply_env_overrides(&self, mut options: BuildOptions) -> ConfigResult<BuildOptions> {
        if let Ok(cpu) = env::var("MORTAR_CPU") {
            options.cpu = cpu;
        }

        if let Ok(mode) = env::var("MORTAR_COMPILATION_MODE") {
            options.compilation_mode = CompilationMode::from_str(&mode)?;
        }

        if let Ok(version) = env::var("MORTAR_XCODE_VERSION") {
            options.set("xcode_version", &version)?;
        }

        if let Ok(bitcode) = env::var("MORTAR_APPLE_BITCODE") {
            options.apple_bitcode = BitcodeMode::from_str(&bitcode)?;
        }

        Ok(options)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
