//! Platform resolution
//!
//! Maps build options and a toolchain registry to the concrete facts the
//! planners need: tool paths, SDK root, framework search roots, the min-OS
//! flag and the effective bitcode mode.

use crate::error::{BuildError, BuildResult};
use crate::toolchain::ToolchainRegistry;
use indexmap::IndexSet;
use mortar_config::{
    BitcodeMode, BuildOptions, CompilationMode, ConfigError, CoverageMode, PlatformType,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Execution requirement carried by every tool action
pub const REQUIRES_DARWIN: &str = "requires-darwin";

/// Concrete Apple platform: a family plus simulator or device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplePlatform {
    IosSimulator,
    IosDevice,
    Macos,
    TvosSimulator,
    TvosDevice,
    WatchosSimulator,
    WatchosDevice,
}

impl ApplePlatform {
    /// Platform for a family and architecture
    pub fn for_arch(platform_type: PlatformType, arch: &str) -> Self {
        let simulator = platform_type.is_simulator_arch(arch);
        match (platform_type, simulator) {
            (PlatformType::Ios, true) => Self::IosSimulator,
            (PlatformType::Ios, false) => Self::IosDevice,
            (PlatformType::Macos, _) => Self::Macos,
            (PlatformType::Tvos, true) => Self::TvosSimulator,
            (PlatformType::Tvos, false) => Self::TvosDevice,
            (PlatformType::Watchos, true) => Self::WatchosSimulator,
            (PlatformType::Watchos, false) => Self::WatchosDevice,
        }
    }

    pub fn platform_type(&self) -> PlatformType {
        match self {
            Self::IosSimulator | Self::IosDevice => PlatformType::Ios,
            Self::Macos => PlatformType::Macos,
            Self::TvosSimulator | Self::TvosDevice => PlatformType::Tvos,
            Self::WatchosSimulator | Self::WatchosDevice => PlatformType::Watchos,
        }
    }

    pub fn is_simulator(&self) -> bool {
        matches!(
            self,
            Self::IosSimulator | Self::TvosSimulator | Self::WatchosSimulator
        )
    }

    /// Name of the platform bundle in Xcode (`iPhoneSimulator.platform`)
    pub fn plist_name(&self) -> &'static str {
        match self {
            Self::IosSimulator => "iPhoneSimulator",
            Self::IosDevice => "iPhoneOS",
            Self::Macos => "MacOSX",
            Self::TvosSimulator => "AppleTVSimulator",
            Self::TvosDevice => "AppleTVOS",
            Self::WatchosSimulator => "WatchSimulator",
            Self::WatchosDevice => "WatchOS",
        }
    }

    /// Compiler flag prefix selecting the minimum OS version
    pub fn min_os_flag_prefix(&self) -> &'static str {
        match self {
            Self::IosSimulator => "-mios-simulator-version-min=",
            Self::IosDevice => "-miphoneos-version-min=",
            Self::Macos => "-mmacosx-version-min=",
            Self::TvosSimulator => "-mtvos-simulator-version-min=",
            Self::TvosDevice => "-mtvos-version-min=",
            Self::WatchosSimulator => "-mwatchos-simulator-version-min=",
            Self::WatchosDevice => "-mwatchos-version-min=",
        }
    }

    /// Preprocessor define naming the OS family
    pub fn os_define(&self) -> &'static str {
        match self.platform_type() {
            PlatformType::Ios => "-DOS_IOS",
            PlatformType::Macos => "-DOS_MACOSX",
            PlatformType::Tvos => "-DOS_TVOS",
            PlatformType::Watchos => "-DOS_WATCHOS",
        }
    }

    /// Directory of the platform's wrapped tools under the crosstool root
    pub fn crosstool_dir(&self) -> &'static str {
        match self {
            Self::IosSimulator => "iossim",
            Self::IosDevice => "ios",
            Self::Macos => "mac",
            Self::TvosSimulator => "tvsim",
            Self::TvosDevice => "tvos",
            Self::WatchosSimulator => "watchsim",
            Self::WatchosDevice => "watchos",
        }
    }
}

impl std::fmt::Display for ApplePlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.plist_name())
    }
}

/// Resolved, per-configuration platform facts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformFacts {
    /// Configured cpu (`ios_i386`)
    pub cpu: String,
    pub arch: String,
    pub platform: ApplePlatform,
    pub minimum_os: String,
    pub sdk_version: String,
    /// Normalized `major.minor` Xcode version
    pub xcode_version: Option<String>,
    /// Effective bitcode mode after the simulator override
    pub bitcode: BitcodeMode,
    pub compilation_mode: CompilationMode,
    pub generate_dsym: bool,
    pub coverage: Option<CoverageMode>,
    pub compiler: PathBuf,
    pub archiver: PathBuf,
    pub sdk_root: String,
    /// Framework search roots, deduplicated, system root first
    pub framework_roots: Vec<String>,
    pub bin_dir: PathBuf,
    pub genfiles_dir: PathBuf,
    /// Configuration-wide Objective-C options
    pub objccopts: Vec<String>,
    pub enable_module_maps: bool,
    pub use_dotd_pruning: bool,
    pub disable_resources: bool,
}

impl PlatformFacts {
    /// `-m<platform>-version-min=<version>`
    pub fn min_os_flag(&self) -> String {
        format!("{}{}", self.platform.min_os_flag_prefix(), self.minimum_os)
    }

    /// Feature names enabled by this configuration
    pub fn features(&self) -> Vec<String> {
        self.xcode_version
            .iter()
            .map(|version| format!("xcode_{}", version))
            .collect()
    }

    /// Environment for compile actions
    pub fn compile_env(&self) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();
        env.insert(
            "APPLE_SDK_PLATFORM".to_string(),
            self.platform.plist_name().to_string(),
        );
        env.insert(
            "APPLE_SDK_VERSION_OVERRIDE".to_string(),
            self.sdk_version.clone(),
        );
        if let Some(xcode) = &self.xcode_version {
            env.insert("XCODE_VERSION_OVERRIDE".to_string(), xcode.clone());
        }
        env
    }
}

/// Resolve build options into platform facts
pub fn resolve(
    options: &BuildOptions,
    toolchain: &dyn ToolchainRegistry,
) -> BuildResult<PlatformFacts> {
    options.validate()?;

    let platform_type = options.platform_type()?;
    let arch = options.arch()?;
    let platform = ApplePlatform::for_arch(platform_type, &arch);
    let sdk_version = options.sdk_version(platform_type);
    let xcode_version = options
        .xcode_version
        .as_deref()
        .map(normalize_xcode_version)
        .transpose()?;

    let bitcode = if platform.is_simulator() {
        BitcodeMode::None
    } else {
        options.apple_bitcode
    };

    let sdk_root = toolchain.sdk_root(platform);
    let framework_roots = framework_roots(platform, &sdk_version, &sdk_root, toolchain)?;

    Ok(PlatformFacts {
        cpu: options.cpu.clone(),
        arch,
        platform,
        minimum_os: options.minimum_os(platform_type),
        sdk_version,
        xcode_version,
        bitcode,
        compilation_mode: options.compilation_mode,
        generate_dsym: options.generate_dsym,
        coverage: options.coverage_mode(),
        compiler: toolchain.compiler(platform),
        archiver: toolchain.archiver(platform),
        sdk_root,
        framework_roots,
        bin_dir: options.bin_dir(),
        genfiles_dir: options.genfiles_dir(),
        objccopts: options.objccopts.clone(),
        enable_module_maps: options.enable_module_maps,
        use_dotd_pruning: options.use_dotd_pruning,
        disable_resources: options.disable_objc_library_resources,
    })
}

/// Truncate or zero-fill an Xcode version to `major.minor`
pub fn normalize_xcode_version(raw: &str) -> BuildResult<String> {
    let invalid = |reason: &str| {
        BuildError::Configuration(ConfigError::InvalidValue {
            field: "xcode_version".to_string(),
            reason: reason.to_string(),
        })
    };

    if raw.is_empty() {
        return Err(invalid("version cannot be empty"));
    }
    let mut parts = raw.split('.');
    let major = parts.next().unwrap_or_default();
    let minor = parts.next().unwrap_or("0");
    for part in [major, minor] {
        if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid(&format!("'{}' is not a dotted version", raw)));
        }
    }
    Ok(format!("{}.{}", major, minor))
}

fn framework_roots(
    platform: ApplePlatform,
    sdk_version: &str,
    sdk_root: &str,
    toolchain: &dyn ToolchainRegistry,
) -> BuildResult<Vec<String>> {
    let system = if platform.platform_type() == PlatformType::Ios
        && version_major(sdk_version)? < 9
    {
        format!("{}/Developer/Library/Frameworks", sdk_root)
    } else {
        format!("{}/System/Library/Frameworks", sdk_root)
    };
    let developer = format!(
        "{}/Platforms/{}.platform/Developer/Library/Frameworks",
        toolchain.developer_dir(),
        platform.plist_name()
    );

    let roots: IndexSet<String> = [system, developer].into_iter().collect();
    Ok(roots.into_iter().collect())
}

fn version_major(version: &str) -> BuildResult<u32> {
    version
        .split('.')
        .next()
        .and_then(|major| major.parse().ok())
        .ok_or_else(|| {
            BuildError::Configuration(ConfigError::InvalidValue {
                field: "sdk_version".to_string(),
                reason: format!("'{}' is not a dotted version", version),
            })
        })
}
