//! Configuration loading, override and validation tests

use mortar_config::{
    BitcodeMode, BuildOptions, CompilationMode, ConfigError, ConfigLoader, PlatformType,
};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn create_config_file(dir: &Path, content: &str) -> std::path::PathBuf {
    let config_path = dir.join("mortar.toml");
    fs::write(&config_path, content).unwrap();
    config_path
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn test_load_options_basic() {
    let temp_dir = TempDir::new().unwrap();
    create_config_file(
        temp_dir.path(),
        r#"
cpu = "ios_i386"
compilation_mode = "dbg"
ios_minimum_os = "9.10.11"
"#,
    );

    let options = ConfigLoader::new()
        .without_env()
        .load_from_directory(temp_dir.path())
        .unwrap();

    assert_eq!(options.cpu, "ios_i386");
    assert_eq!(options.compilation_mode, CompilationMode::Dbg);
    assert_eq!(options.minimum_os(PlatformType::Ios), "9.10.11");
}

#[test]
fn test_load_with_empty_file_gives_defaults() {
    let temp_dir = TempDir::new().unwrap();
    create_config_file(temp_dir.path(), "");

    let options = ConfigLoader::new()
        .without_env()
        .load_from_directory(temp_dir.path())
        .unwrap();

    assert_eq!(options, BuildOptions::default());
}

#[test]
fn test_load_specific_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let result = ConfigLoader::new()
        .without_env()
        .load_from_file(&temp_dir.path().join("missing.toml"));

    assert!(matches!(result, Err(ConfigError::NotFound(_))));
}

#[test]
fn test_invalid_toml_reports_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = create_config_file(temp_dir.path(), "cpu = ");

    let err = ConfigLoader::new()
        .without_env()
        .load_from_file(&path)
        .unwrap_err();

    match err {
        ConfigError::TomlParseError { file, .. } => assert_eq!(file, path),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_empty_sdk_version_in_file_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = create_config_file(temp_dir.path(), r#"ios_sdk_version = """#);

    let err = ConfigLoader::new()
        .without_env()
        .load_from_file(&path)
        .unwrap_err();

    assert!(err.to_string().contains("ios_sdk_version"));
}

#[test]
fn test_unsupported_cpu_in_file_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = create_config_file(temp_dir.path(), r#"cpu = "k8""#);

    let err = ConfigLoader::new()
        .without_env()
        .load_from_file(&path)
        .unwrap_err();

    assert!(matches!(err, ConfigError::UnsupportedCpu(cpu) if cpu == "k8"));
}

// ============================================================================
// Flag-style overrides
// ============================================================================

#[rstest]
#[case("ios_sdk_version")]
#[case("ios_minimum_os")]
#[case("macos_minimum_os")]
#[case("xcode_version")]
fn test_set_rejects_empty_versions(#[case] key: &str) {
    let mut options = BuildOptions::default();
    let err = options.set(key, "").unwrap_err();
    assert!(err.to_string().contains(key), "{err}");
}

#[test]
fn test_set_overrides_in_order() {
    let mut options = BuildOptions::default();
    options.set("cpu", "ios_arm64").unwrap();
    options.set("apple_bitcode", "embedded").unwrap();
    options.set("objccopt", "-foo").unwrap();
    options.set("objccopt", "-bar").unwrap();
    options.set("enable_module_maps", "true").unwrap();

    assert_eq!(options.arch().unwrap(), "arm64");
    assert_eq!(options.apple_bitcode, BitcodeMode::Embedded);
    assert_eq!(options.objccopts, vec!["-foo".to_string(), "-bar".to_string()]);
    assert!(options.enable_module_maps);
}

#[test]
fn test_set_unknown_option() {
    let mut options = BuildOptions::default();
    assert!(matches!(
        options.set("crosstool_top", "//tools"),
        Err(ConfigError::UnknownOption(_))
    ));
}

#[rstest]
#[case("ios_i386", PlatformType::Ios, "i386", true)]
#[case("ios_x86_64", PlatformType::Ios, "x86_64", true)]
#[case("ios_armv7", PlatformType::Ios, "armv7", false)]
#[case("ios_arm64", PlatformType::Ios, "arm64", false)]
#[case("tvos_x86_64", PlatformType::Tvos, "x86_64", true)]
#[case("watchos_armv7k", PlatformType::Watchos, "armv7k", false)]
#[case("darwin_x86_64", PlatformType::Macos, "x86_64", false)]
fn test_cpu_resolution(
    #[case] cpu: &str,
    #[case] platform: PlatformType,
    #[case] arch: &str,
    #[case] simulator: bool,
) {
    let mut options = BuildOptions::default();
    options.set("cpu", cpu).unwrap();
    assert_eq!(options.platform_type().unwrap(), platform);
    assert_eq!(options.arch().unwrap(), arch);
    assert_eq!(platform.is_simulator_arch(arch), simulator);
}
