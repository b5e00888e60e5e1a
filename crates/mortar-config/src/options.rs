//! Build options (mortar.toml)
//!
//! The immutable configuration value a planning run is evaluated against.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Apple platform family selected by the cpu prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformType {
    Ios,
    Macos,
    Tvos,
    Watchos,
}

impl PlatformType {
    /// SDK version assumed when none is configured
    pub fn default_sdk_version(&self) -> &'static str {
        match self {
            Self::Ios => "8.4",
            Self::Macos => "10.10",
            Self::Tvos => "9.0",
            Self::Watchos => "2.0",
        }
    }

    /// Whether `arch` is a simulator architecture on this platform
    pub fn is_simulator_arch(&self, arch: &str) -> bool {
        match self {
            Self::Macos => false,
            Self::Ios | Self::Tvos | Self::Watchos => matches!(arch, "i386" | "x86_64"),
        }
    }
}

impl std::fmt::Display for PlatformType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ios => write!(f, "ios"),
            Self::Macos => write!(f, "macos"),
            Self::Tvos => write!(f, "tvos"),
            Self::Watchos => write!(f, "watchos"),
        }
    }
}

/// Compilation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CompilationMode {
    /// Debug build with full debug info
    Dbg,
    /// Unoptimized build without extra debug settings (default)
    #[default]
    Fastbuild,
    /// Optimized build
    Opt,
}

impl CompilationMode {
    /// Parse a compilation mode name
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> ConfigResult<Self> {
        match s.to_lowercase().as_str() {
            "dbg" => Ok(Self::Dbg),
            "fastbuild" => Ok(Self::Fastbuild),
            "opt" => Ok(Self::Opt),
            other => Err(ConfigError::InvalidValue {
                field: "compilation_mode".to_string(),
                reason: format!("'{}' is not one of dbg, fastbuild, opt", other),
            }),
        }
    }

    /// Mode name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Dbg => "dbg",
            Self::Fastbuild => "fastbuild",
            Self::Opt => "opt",
        }
    }
}

impl std::fmt::Display for CompilationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Bitcode embedding mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BitcodeMode {
    #[default]
    None,
    EmbeddedMarkers,
    Embedded,
}

impl BitcodeMode {
    /// Parse a bitcode mode name
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> ConfigResult<Self> {
        match s {
            "none" => Ok(Self::None),
            "embedded_markers" => Ok(Self::EmbeddedMarkers),
            "embedded" => Ok(Self::Embedded),
            other => Err(ConfigError::InvalidValue {
                field: "apple_bitcode".to_string(),
                reason: format!("'{}' is not one of none, embedded_markers, embedded", other),
            }),
        }
    }

    /// Compiler flag for this mode, if any
    pub fn compile_flag(&self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::EmbeddedMarkers => Some("-fembed-bitcode-marker"),
            Self::Embedded => Some("-fembed-bitcode"),
        }
    }
}

/// Code coverage instrumentation flavor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoverageMode {
    /// gcov-style `-fprofile-arcs -ftest-coverage`
    Gcov,
    /// Source-based `-fprofile-instr-generate -fcoverage-mapping`
    LlvmCovmap,
}

impl CoverageMode {
    /// Instrumentation flags for this mode
    pub fn compile_flags(&self) -> &'static [&'static str] {
        match self {
            Self::Gcov => &["-fprofile-arcs", "-ftest-coverage"],
            Self::LlvmCovmap => &["-fprofile-instr-generate", "-fcoverage-mapping"],
        }
    }
}

/// Build options for one configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(default, deny_unknown_fields)]
pub struct BuildOptions {
    /// Target cpu, `<family>_<arch>`
    pub cpu: String,
    /// Compilation mode
    pub compilation_mode: CompilationMode,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ios_minimum_os: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub macos_minimum_os: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tvos_minimum_os: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watchos_minimum_os: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ios_sdk_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub macos_sdk_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tvos_sdk_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watchos_sdk_version: Option<String>,

    /// Raw Xcode version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xcode_version: Option<String>,
    /// Requested bitcode mode (before the simulator override)
    pub apple_bitcode: BitcodeMode,
    /// Instrument compilations for coverage collection
    pub collect_code_coverage: bool,
    /// Use source-based coverage instead of gcov
    pub use_llvm_covmap: bool,
    /// Options appended to every Objective-C compilation
    pub objccopts: Vec<String>,
    /// Pass module maps to compile actions
    pub enable_module_maps: bool,
    /// Narrow compile inputs from compiler-emitted dependency files
    pub use_dotd_pruning: bool,
    /// Reject resource attributes on library declarations
    pub disable_objc_library_resources: bool,
    /// Keep debug info in optimized builds
    pub generate_dsym: bool,
    /// Root of all output trees
    pub output_base: String,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            cpu: "ios_x86_64".to_string(),
            compilation_mode: CompilationMode::default(),
            ios_minimum_os: None,
            macos_minimum_os: None,
            tvos_minimum_os: None,
            watchos_minimum_os: None,
            ios_sdk_version: None,
            macos_sdk_version: None,
            tvos_sdk_version: None,
            watchos_sdk_version: None,
            xcode_version: None,
            apple_bitcode: BitcodeMode::default(),
            collect_code_coverage: false,
            use_llvm_covmap: false,
            objccopts: Vec::new(),
            enable_module_maps: false,
            use_dotd_pruning: false,
            disable_objc_library_resources: false,
            generate_dsym: false,
            output_base: "mortar-out".to_string(),
        }
    }
}

impl BuildOptions {
    /// Load build options from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let options: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        options.validate()?;
        Ok(options)
    }

    /// Validate the options
    pub fn validate(&self) -> ConfigResult<()> {
        self.split_cpu()?;

        let versions = [
            ("ios_minimum_os", &self.ios_minimum_os),
            ("macos_minimum_os", &self.macos_minimum_os),
            ("tvos_minimum_os", &self.tvos_minimum_os),
            ("watchos_minimum_os", &self.watchos_minimum_os),
            ("ios_sdk_version", &self.ios_sdk_version),
            ("macos_sdk_version", &self.macos_sdk_version),
            ("tvos_sdk_version", &self.tvos_sdk_version),
            ("watchos_sdk_version", &self.watchos_sdk_version),
            ("xcode_version", &self.xcode_version),
        ];
        for (field, value) in versions {
            if let Some(version) = value {
                validate_version(field, version)?;
            }
        }

        if self.output_base.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "output_base".to_string(),
                reason: "output base cannot be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Apply a single `key=value` override, the way a command-line flag would
    pub fn set(&mut self, key: &str, value: &str) -> ConfigResult<()> {
        match key {
            "cpu" => {
                self.cpu = value.to_string();
                self.split_cpu()?;
            }
            "compilation_mode" => self.compilation_mode = CompilationMode::from_str(value)?,
            "ios_minimum_os" => self.ios_minimum_os = Some(parse_version(key, value)?),
            "macos_minimum_os" => self.macos_minimum_os = Some(parse_version(key, value)?),
            "tvos_minimum_os" => self.tvos_minimum_os = Some(parse_version(key, value)?),
            "watchos_minimum_os" => self.watchos_minimum_os = Some(parse_version(key, value)?),
            "ios_sdk_version" => self.ios_sdk_version = Some(parse_version(key, value)?),
            "macos_sdk_version" => self.macos_sdk_version = Some(parse_version(key, value)?),
            "tvos_sdk_version" => self.tvos_sdk_version = Some(parse_version(key, value)?),
            "watchos_sdk_version" => self.watchos_sdk_version = Some(parse_version(key, value)?),
            "xcode_version" => self.xcode_version = Some(parse_version(key, value)?),
            "apple_bitcode" => self.apple_bitcode = BitcodeMode::from_str(value)?,
            "collect_code_coverage" => self.collect_code_coverage = parse_bool(key, value)?,
            "use_llvm_covmap" => self.use_llvm_covmap = parse_bool(key, value)?,
            // Repeatable, like the flag it mirrors
            "objccopt" | "objccopts" => self.objccopts.push(value.to_string()),
            "enable_module_maps" => self.enable_module_maps = parse_bool(key, value)?,
            "use_dotd_pruning" => self.use_dotd_pruning = parse_bool(key, value)?,
            "disable_objc_library_resources" => {
                self.disable_objc_library_resources = parse_bool(key, value)?
            }
            "generate_dsym" => self.generate_dsym = parse_bool(key, value)?,
            "output_base" => self.output_base = value.to_string(),
            other => return Err(ConfigError::UnknownOption(other.to_string())),
        }
        Ok(())
    }

    /// Platform family of the configured cpu
    pub fn platform_type(&self) -> ConfigResult<PlatformType> {
        self.split_cpu().map(|(platform, _)| platform)
    }

    /// Architecture of the configured cpu
    pub fn arch(&self) -> ConfigResult<String> {
        self.split_cpu().map(|(_, arch)| arch)
    }

    /// Minimum OS version for a platform, falling back to its SDK version
    pub fn minimum_os(&self, platform: PlatformType) -> String {
        let configured = match platform {
            PlatformType::Ios => &self.ios_minimum_os,
            PlatformType::Macos => &self.macos_minimum_os,
            PlatformType::Tvos => &self.tvos_minimum_os,
            PlatformType::Watchos => &self.watchos_minimum_os,
        };
        configured
            .clone()
            .unwrap_or_else(|| self.sdk_version(platform))
    }

    /// SDK version for a platform
    pub fn sdk_version(&self, platform: PlatformType) -> String {
        let configured = match platform {
            PlatformType::Ios => &self.ios_sdk_version,
            PlatformType::Macos => &self.macos_sdk_version,
            PlatformType::Tvos => &self.tvos_sdk_version,
            PlatformType::Watchos => &self.watchos_sdk_version,
        };
        configured
            .clone()
            .unwrap_or_else(|| platform.default_sdk_version().to_string())
    }

    /// Requested coverage instrumentation, if any
    pub fn coverage_mode(&self) -> Option<CoverageMode> {
        if !self.collect_code_coverage {
            return None;
        }
        if self.use_llvm_covmap {
            Some(CoverageMode::LlvmCovmap)
        } else {
            Some(CoverageMode::Gcov)
        }
    }

    /// Name of this configuration's output directory (`<cpu>-<mode>`)
    pub fn output_dir_name(&self) -> String {
        format!("{}-{}", self.cpu, self.compilation_mode)
    }

    /// Root for compiled outputs
    pub fn bin_dir(&self) -> PathBuf {
        PathBuf::from(&self.output_base)
            .join(self.output_dir_name())
            .join("bin")
    }

    /// Root for generated sources
    pub fn genfiles_dir(&self) -> PathBuf {
        PathBuf::from(&self.output_base)
            .join(self.output_dir_name())
            .join("genfiles")
    }

    fn split_cpu(&self) -> ConfigResult<(PlatformType, String)> {
        let cpu = self.cpu.as_str();
        if cpu == "darwin" {
            return Ok((PlatformType::Macos, "x86_64".to_string()));
        }

        let (prefix, arch) = cpu
            .split_once('_')
            .ok_or_else(|| ConfigError::UnsupportedCpu(cpu.to_string()))?;
        if arch.is_empty() {
            return Err(ConfigError::UnsupportedCpu(cpu.to_string()));
        }

        let platform = match prefix {
            "ios" => PlatformType::Ios,
            "tvos" => PlatformType::Tvos,
            "watchos" => PlatformType::Watchos,
            "darwin" => PlatformType::Macos,
            _ => return Err(ConfigError::UnsupportedCpu(cpu.to_string())),
        };
        Ok((platform, arch.to_string()))
    }
}

/// Dotted numeric version check ("7", "7.3", "9.10.11")
fn is_valid_version(version: &str) -> bool {
    !version.is_empty()
        && version
            .split('.')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
}

fn validate_version(field: &str, version: &str) -> ConfigResult<()> {
    if version.is_empty() {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: "version cannot be empty".to_string(),
        });
    }
    if !is_valid_version(version) {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: format!("'{}' is not a dotted version", version),
        });
    }
    Ok(())
}

fn parse_version(field: &str, value: &str) -> ConfigResult<String> {
    validate_version(field, value)?;
    Ok(value.to_string())
}

fn parse_bool(field: &str, value: &str) -> ConfigResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: format!("'{}' is not a boolean", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_options() {
        let options: BuildOptions = toml::from_str(r#"cpu = "ios_i386""#).unwrap();
        assert_eq!(options.cpu, "ios_i386");
        assert_eq!(options.compilation_mode, CompilationMode::Fastbuild);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_parse_full_options() {
        let toml = r#"
cpu = "ios_arm64"
compilation_mode = "opt"
ios_minimum_os = "9.0"
ios_sdk_version = "9.3"
xcode_version = "7.3.1"
apple_bitcode = "embedded_markers"
collect_code_coverage = true
use_llvm_covmap = true
objccopts = ["-foo"]
enable_module_maps = true
"#;
        let options: BuildOptions = toml::from_str(toml).unwrap();
        assert!(options.validate().is_ok());
        assert_eq!(options.apple_bitcode, BitcodeMode::EmbeddedMarkers);
        assert_eq!(options.coverage_mode(), Some(CoverageMode::LlvmCovmap));
        assert_eq!(options.minimum_os(PlatformType::Ios), "9.0");
        assert_eq!(options.objccopts, vec!["-foo".to_string()]);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: Result<BuildOptions, _> = toml::from_str(r#"bogus = 1"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_version_validation() {
        assert!(is_valid_version("5"));
        assert!(is_valid_version("7.3"));
        assert!(is_valid_version("9.10.11"));
        assert!(!is_valid_version(""));
        assert!(!is_valid_version("7."));
        assert!(!is_valid_version("beta"));
    }

    #[test]
    fn test_cpu_split() {
        let mut options = BuildOptions::default();
        assert_eq!(options.platform_type().unwrap(), PlatformType::Ios);
        assert_eq!(options.arch().unwrap(), "x86_64");

        options.cpu = "darwin".to_string();
        assert_eq!(options.platform_type().unwrap(), PlatformType::Macos);
        assert_eq!(options.arch().unwrap(), "x86_64");

        options.cpu = "watchos_armv7k".to_string();
        assert_eq!(options.platform_type().unwrap(), PlatformType::Watchos);
        assert_eq!(options.arch().unwrap(), "armv7k");

        options.cpu = "k8".to_string();
        assert!(matches!(
            options.platform_type(),
            Err(ConfigError::UnsupportedCpu(_))
        ));
    }

    #[test]
    fn test_minimum_os_defaults_to_sdk_version() {
        let mut options = BuildOptions::default();
        assert_eq!(options.minimum_os(PlatformType::Ios), "8.4");
        options.ios_sdk_version = Some("9.0".to_string());
        assert_eq!(options.minimum_os(PlatformType::Ios), "9.0");
        assert_eq!(options.minimum_os(PlatformType::Macos), "10.10");
    }

    #[test]
    fn test_output_dirs() {
        let options = BuildOptions {
            cpu: "ios_i386".to_string(),
            compilation_mode: CompilationMode::Dbg,
            ..BuildOptions::default()
        };
        assert_eq!(options.output_dir_name(), "ios_i386-dbg");
        assert_eq!(options.bin_dir(), PathBuf::from("mortar-out/ios_i386-dbg/bin"));
        assert_eq!(
            options.genfiles_dir(),
            PathBuf::from("mortar-out/ios_i386-dbg/genfiles")
        );
    }

    #[test]
    fn test_coverage_mode_requires_collection() {
        let options = BuildOptions {
            use_llvm_covmap: true,
            ..BuildOptions::default()
        };
        assert_eq!(options.coverage_mode(), None);
    }
}
