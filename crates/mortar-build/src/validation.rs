//! Declaration validation
//!
//! Cross-attribute checks run before any action is planned. Every check is a
//! function of the declaration alone plus an explicit [`ValidationPolicy`];
//! all findings are collected rather than stopping at the first error.

use crate::error::{BuildError, BuildResult};
use crate::file_type::{FileKind, SourceAttribute};
use crate::targets::ObjcLibrary;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

/// Container suffixes accepted for asset catalog entries
pub const ASSET_CATALOG_CONTAINERS: &[&str] = &[".xcassets"];

/// Container suffixes accepted for data model entries
pub const DATAMODEL_CONTAINERS: &[&str] = &[".xcdatamodel", ".xcdatamodeld"];

/// Copt that the planner supplies itself
pub const MODULES_CACHE_PATH_COPT: &str = "-fmodules-cache-path";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A validation finding attached to an attribute
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub attribute: String,
    pub message: String,
}

impl Diagnostic {
    pub fn error(attribute: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            attribute: attribute.into(),
            message: message.into(),
        }
    }

    pub fn warning(attribute: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            attribute: attribute.into(),
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let severity = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{} in {}: {}", severity, self.attribute, self.message)
    }
}

/// Switches that change which declarations are accepted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationPolicy {
    /// Reject resource attributes on library declarations
    pub disable_resources: bool,
}

/// Run every check and return all findings
pub fn validate(target: &ObjcLibrary, policy: ValidationPolicy) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    check_file_kinds(target, SourceAttribute::Srcs, &target.srcs, &mut diagnostics);
    check_file_kinds(
        target,
        SourceAttribute::NonArcSrcs,
        &target.non_arc_srcs,
        &mut diagnostics,
    );
    check_overlaps(target, &mut diagnostics);
    check_module_attributes(target, &mut diagnostics);
    check_includes(target, &mut diagnostics);
    check_resources(target, policy, &mut diagnostics);
    check_copts(target, &mut diagnostics);

    diagnostics
}

/// Validate and split the findings: errors abort, warnings are returned
pub fn check(target: &ObjcLibrary, policy: ValidationPolicy) -> BuildResult<Vec<Diagnostic>> {
    let (errors, warnings): (Vec<_>, Vec<_>) = validate(target, policy)
        .into_iter()
        .partition(Diagnostic::is_error);

    if errors.is_empty() {
        Ok(warnings)
    } else {
        Err(BuildError::InvalidDeclaration {
            label: target.label.clone(),
            diagnostics: errors,
        })
    }
}

fn check_file_kinds(
    target: &ObjcLibrary,
    attribute: SourceAttribute,
    files: &[PathBuf],
    diagnostics: &mut Vec<Diagnostic>,
) {
    for file in files {
        if !attribute.allows(FileKind::of(file)) {
            diagnostics.push(Diagnostic::error(
                attribute.name(),
                format!(
                    "'{}' does not produce any objc_library {} files (expected {})",
                    target.label.file_label(file),
                    attribute.name(),
                    attribute.expected()
                ),
            ));
        }
    }
}

fn check_overlaps(target: &ObjcLibrary, diagnostics: &mut Vec<Diagnostic>) {
    let non_arc: HashSet<&PathBuf> = target.non_arc_srcs.iter().collect();
    let hdrs: HashSet<&PathBuf> = target.hdrs.iter().collect();

    for src in &target.srcs {
        if non_arc.contains(src) {
            diagnostics.push(Diagnostic::error(
                "srcs",
                format!(
                    "File '{}' is present in both srcs and non_arc_srcs which is forbidden.",
                    target.label.exec_path(src).display()
                ),
            ));
        }
    }

    for src in target.srcs.iter().chain(&target.non_arc_srcs) {
        if hdrs.contains(src) {
            diagnostics.push(Diagnostic::warning(
                "srcs",
                format!(
                    "File '{}' is in both srcs and hdrs.",
                    target.label.exec_path(src).display()
                ),
            ));
        }
    }
}

fn check_module_attributes(target: &ObjcLibrary, diagnostics: &mut Vec<Diagnostic>) {
    if target.module_name.is_some() && target.module_map.is_some() {
        diagnostics.push(Diagnostic::error(
            "module_name",
            "Specifying both module_name and module_map is invalid, please remove one of them.",
        ));
    }
}

fn check_includes(target: &ObjcLibrary, diagnostics: &mut Vec<Diagnostic>) {
    for include in &target.includes {
        if include.is_absolute() || include.has_root() {
            diagnostics.push(Diagnostic::error(
                "includes",
                format!(
                    "The path '{}' is absolute, but only relative paths are allowed.",
                    include.display()
                ),
            ));
        }
    }
}

fn check_resources(
    target: &ObjcLibrary,
    policy: ValidationPolicy,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if policy.disable_resources {
        for (attribute, _) in target.resources.set_attributes() {
            diagnostics.push(Diagnostic::error(
                attribute,
                "objc_library resource attributes are not allowed. \
                 Please use the 'data' attribute instead.",
            ));
        }
    }

    let containers = [
        (
            "asset_catalogs",
            &target.resources.asset_catalogs,
            ASSET_CATALOG_CONTAINERS,
        ),
        (
            "datamodels",
            &target.resources.datamodels,
            DATAMODEL_CONTAINERS,
        ),
    ];
    for (attribute, files, suffixes) in containers {
        for file in files.iter().flatten() {
            if container_of(file, suffixes).is_none() {
                diagnostics.push(Diagnostic::error(
                    attribute,
                    format!(
                        "File '{}' is not in a directory of one of these type(s): [{}]",
                        target.label.exec_path(file).display(),
                        suffixes.join(", ")
                    ),
                ));
            }
        }
    }
}

fn check_copts(target: &ObjcLibrary, diagnostics: &mut Vec<Diagnostic>) {
    if target
        .copts
        .iter()
        .any(|copt| copt.starts_with(MODULES_CACHE_PATH_COPT))
    {
        diagnostics.push(Diagnostic::warning(
            "copts",
            format!(
                "setting '{}' manually in copts is unsupported",
                MODULES_CACHE_PATH_COPT
            ),
        ));
    }
}

/// Innermost ancestor directory of `file` whose name ends with one of
/// `suffixes`
pub fn container_of(file: &Path, suffixes: &[&str]) -> Option<PathBuf> {
    let mut container = None;
    let mut current = PathBuf::new();
    for component in file.parent()?.components() {
        if let Component::Normal(part) = component {
            current.push(part);
            let name = part.to_string_lossy();
            if suffixes.iter().any(|suffix| name.ends_with(suffix)) {
                container = Some(current.clone());
            }
        }
    }
    container
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::Label;
    use crate::targets::ResourceAttributes;
    use pretty_assertions::assert_eq;

    fn lib() -> ObjcLibrary {
        ObjcLibrary::new(Label::parse("//x:x").unwrap())
    }

    fn messages(diagnostics: &[Diagnostic]) -> Vec<&str> {
        diagnostics.iter().map(|d| d.message.as_str()).collect()
    }

    #[test]
    fn test_valid_target_has_no_findings() {
        let target = lib().with_srcs(["a.m", "b.m", "private.h"]).with_hdrs(["c.h"]);
        assert!(validate(&target, ValidationPolicy::default()).is_empty());
    }

    #[test]
    fn test_non_arc_srcs_kind_error() {
        let target = lib().with_non_arc_srcs(["cc.cc"]);
        let diagnostics = validate(&target, ValidationPolicy::default());
        assert_eq!(
            messages(&diagnostics),
            vec!["'//x:cc.cc' does not produce any objc_library non_arc_srcs files (expected .m, .mm)"]
        );
    }

    #[test]
    fn test_srcs_and_non_arc_srcs_overlap() {
        let target = lib().with_srcs(["foo.m"]).with_non_arc_srcs(["foo.m"]);
        let err = check(&target, ValidationPolicy::default()).unwrap_err();
        assert_eq!(
            messages(err.diagnostics()),
            vec!["File 'x/foo.m' is present in both srcs and non_arc_srcs which is forbidden."]
        );
    }

    #[test]
    fn test_srcs_and_hdrs_overlap_is_warning() {
        let target = lib().with_srcs(["foo.m", "foo.h"]).with_hdrs(["foo.h"]);
        let warnings = check(&target, ValidationPolicy::default()).unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].severity, Severity::Warning);
        assert_eq!(warnings[0].message, "File 'x/foo.h' is in both srcs and hdrs.");
    }

    #[test]
    fn test_module_name_and_map_exclusive() {
        let target = lib().with_module_name("x").with_module_map("x.modulemap");
        let err = check(&target, ValidationPolicy::default()).unwrap_err();
        assert!(err
            .to_string()
            .contains("Specifying both module_name and module_map is invalid"));

        let only_name = lib().with_module_name("x");
        assert!(check(&only_name, ValidationPolicy::default()).is_ok());
    }

    #[test]
    fn test_absolute_include_rejected() {
        let target = lib().with_includes(["/usr/include/foo", "relative"]);
        let diagnostics = validate(&target, ValidationPolicy::default());
        assert_eq!(
            messages(&diagnostics),
            vec!["The path '/usr/include/foo' is absolute, but only relative paths are allowed."]
        );
    }

    #[test]
    fn test_resources_rejected_when_disabled() {
        let target = lib().with_resources(ResourceAttributes {
            strings: Some(vec![]),
            xibs: Some(vec![PathBuf::from("a.xib")]),
            ..ResourceAttributes::default()
        });
        let policy = ValidationPolicy {
            disable_resources: true,
        };
        let diagnostics = validate(&target, policy);
        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics
            .iter()
            .all(|d| d.message.contains("Please use the 'data' attribute instead.")));

        assert!(validate(&target, ValidationPolicy::default()).is_empty());
    }

    #[test]
    fn test_asset_catalog_container() {
        let target = lib().with_resources(ResourceAttributes {
            asset_catalogs: Some(vec![
                PathBuf::from("ac/foo.xcassets/isinxcassets"),
                PathBuf::from("ac/notinxcassets2"),
            ]),
            ..ResourceAttributes::default()
        });
        let diagnostics = validate(&target, ValidationPolicy::default());
        assert_eq!(
            messages(&diagnostics),
            vec!["File 'x/ac/notinxcassets2' is not in a directory of one of these type(s): [.xcassets]"]
        );
    }

    #[test]
    fn test_datamodel_containers() {
        let target = lib().with_resources(ResourceAttributes {
            datamodels: Some(vec![
                PathBuf::from("xcd/notinxcdatamodel1"),
                PathBuf::from("xcd/foo.xcdatamodel/isinxcdatamodel"),
                PathBuf::from("xcd/bar.xcdatamodeld/isinxcdatamodeld"),
            ]),
            ..ResourceAttributes::default()
        });
        let diagnostics = validate(&target, ValidationPolicy::default());
        assert_eq!(
            messages(&diagnostics),
            vec!["File 'x/xcd/notinxcdatamodel1' is not in a directory of one of these type(s): [.xcdatamodel, .xcdatamodeld]"]
        );
    }

    #[test]
    fn test_modules_cache_path_copt_warning() {
        let target = lib()
            .with_srcs(["a.m"])
            .with_copts(["-fmodules", "-fmodules-cache-path=foobar"]);
        let warnings = check(&target, ValidationPolicy::default()).unwrap();
        assert_eq!(
            messages(&warnings),
            vec!["setting '-fmodules-cache-path' manually in copts is unsupported"]
        );
    }

    #[test]
    fn test_collects_all_errors() {
        let target = lib()
            .with_non_arc_srcs(["a.c"])
            .with_module_name("x")
            .with_module_map("x.modulemap")
            .with_includes(["/abs"]);
        let err = check(&target, ValidationPolicy::default()).unwrap_err();
        assert_eq!(err.diagnostics().len(), 3);
    }

    #[test]
    fn test_container_of() {
        assert_eq!(
            container_of(Path::new("lib1/ac.xcassets/foo"), ASSET_CATALOG_CONTAINERS),
            Some(PathBuf::from("lib1/ac.xcassets"))
        );
        assert_eq!(
            container_of(Path::new("lib1/foo"), ASSET_CATALOG_CONTAINERS),
            None
        );
    }
}
