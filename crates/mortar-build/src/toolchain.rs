/// Toolchain registry: where the compiler, archiver and SDK live
use crate::platform::ApplePlatform;
use std::path::PathBuf;

/// Placeholder substituted with the SDK root when the action runs
pub const SDKROOT_PLACEHOLDER: &str = "__XCODE_SDKROOT__";

/// Placeholder substituted with the Xcode developer directory
pub const DEVELOPER_DIR_PLACEHOLDER: &str = "__XCODE_DEVELOPER_DIR__";

/// Locates tools for a platform
///
/// Passed to the planner explicitly; there is no global registry.
pub trait ToolchainRegistry: Send + Sync {
    /// Compiler driver for the platform
    fn compiler(&self, platform: ApplePlatform) -> PathBuf;

    /// Static archiver for the platform
    fn archiver(&self, platform: ApplePlatform) -> PathBuf;

    /// SDK root passed as `-isysroot` and `-syslibroot`
    fn sdk_root(&self, platform: ApplePlatform) -> String;

    /// Xcode developer directory
    fn developer_dir(&self) -> String;

    /// Stable identity folded into analysis cache keys
    fn identity(&self) -> String;
}

/// Wrapped Xcode tools under a crosstool root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XcodeToolchain {
    crosstool_root: PathBuf,
}

impl XcodeToolchain {
    pub fn new(crosstool_root: impl Into<PathBuf>) -> Self {
        Self {
            crosstool_root: crosstool_root.into(),
        }
    }

    fn tool(&self, platform: ApplePlatform, name: &str) -> PathBuf {
        self.crosstool_root.join(platform.crosstool_dir()).join(name)
    }
}

impl Default for XcodeToolchain {
    fn default() -> Self {
        Self::new("tools/osx/crosstool")
    }
}

impl ToolchainRegistry for XcodeToolchain {
    fn compiler(&self, platform: ApplePlatform) -> PathBuf {
        self.tool(platform, "wrapped_clang")
    }

    fn archiver(&self, platform: ApplePlatform) -> PathBuf {
        self.tool(platform, "libtool")
    }

    fn sdk_root(&self, _platform: ApplePlatform) -> String {
        SDKROOT_PLACEHOLDER.to_string()
    }

    fn developer_dir(&self) -> String {
        DEVELOPER_DIR_PLACEHOLDER.to_string()
    }

    fn identity(&self) -> String {
        format!("xcode:{}", self.crosstool_root.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_paths() {
        let toolchain = XcodeToolchain::default();
        assert_eq!(
            toolchain.compiler(ApplePlatform::IosDevice),
            PathBuf::from("tools/osx/crosstool/ios/wrapped_clang")
        );
        assert_eq!(
            toolchain.archiver(ApplePlatform::WatchosSimulator),
            PathBuf::from("tools/osx/crosstool/watchsim/libtool")
        );
    }

    #[test]
    fn test_custom_root_changes_identity() {
        let a = XcodeToolchain::default();
        let b = XcodeToolchain::new("/opt/crosstool");
        assert_ne!(a.identity(), b.identity());
        assert_eq!(b.sdk_root(ApplePlatform::Macos), SDKROOT_PLACEHOLDER);
    }
}
