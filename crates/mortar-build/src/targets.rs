/// Target declarations: Objective-C libraries and foreign cc libraries
use crate::file_type::FileKind;
use crate::label::Label;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Resource-bearing attributes of a library declaration
///
/// `None` means the attribute was not set. `Some(vec![])` is a set but empty
/// attribute, which still counts as set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceAttributes {
    pub asset_catalogs: Option<Vec<PathBuf>>,
    pub datamodels: Option<Vec<PathBuf>>,
    pub storyboards: Option<Vec<PathBuf>>,
    pub strings: Option<Vec<PathBuf>>,
    pub xibs: Option<Vec<PathBuf>>,
    pub structured_resources: Option<Vec<PathBuf>>,
    pub resources: Option<Vec<PathBuf>>,
}

impl ResourceAttributes {
    /// Attributes that are set, with their contents, in declaration order
    pub fn set_attributes(&self) -> Vec<(&'static str, &[PathBuf])> {
        [
            ("asset_catalogs", &self.asset_catalogs),
            ("datamodels", &self.datamodels),
            ("storyboards", &self.storyboards),
            ("strings", &self.strings),
            ("xibs", &self.xibs),
            ("structured_resources", &self.structured_resources),
            ("resources", &self.resources),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_deref().map(|files| (name, files)))
        .collect()
    }
}

/// An `objc_library` declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjcLibrary {
    /// Target label
    pub label: Label,
    /// ARC-compiled sources, private headers and precompiled objects
    #[serde(default)]
    pub srcs: Vec<PathBuf>,
    /// Sources compiled without ARC
    #[serde(default)]
    pub non_arc_srcs: Vec<PathBuf>,
    /// Public headers
    #[serde(default)]
    pub hdrs: Vec<PathBuf>,
    /// Package-relative include directories
    #[serde(default)]
    pub includes: Vec<PathBuf>,
    /// Preprocessor defines, `KEY` or `KEY=VALUE`
    #[serde(default)]
    pub defines: Vec<String>,
    /// Extra compiler options
    #[serde(default)]
    pub copts: Vec<String>,
    #[serde(default)]
    pub sdk_frameworks: Vec<String>,
    #[serde(default)]
    pub weak_sdk_frameworks: Vec<String>,
    #[serde(default)]
    pub sdk_dylibs: Vec<String>,
    /// Precompiled header
    #[serde(default)]
    pub pch: Option<PathBuf>,
    #[serde(default)]
    pub module_name: Option<String>,
    /// Custom module map, replacing the generated one
    #[serde(default)]
    pub module_map: Option<PathBuf>,
    #[serde(default)]
    pub resources: ResourceAttributes,
    /// Dependencies, in declaration order
    #[serde(default)]
    pub deps: Vec<Label>,
}

impl ObjcLibrary {
    /// Create an empty declaration
    pub fn new(label: Label) -> Self {
        Self {
            label,
            srcs: Vec::new(),
            non_arc_srcs: Vec::new(),
            hdrs: Vec::new(),
            includes: Vec::new(),
            defines: Vec::new(),
            copts: Vec::new(),
            sdk_frameworks: Vec::new(),
            weak_sdk_frameworks: Vec::new(),
            sdk_dylibs: Vec::new(),
            pch: None,
            module_name: None,
            module_map: None,
            resources: ResourceAttributes::default(),
            deps: Vec::new(),
        }
    }

    pub fn with_srcs<P: Into<PathBuf>>(mut self, srcs: impl IntoIterator<Item = P>) -> Self {
        self.srcs = srcs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_non_arc_srcs<P: Into<PathBuf>>(
        mut self,
        srcs: impl IntoIterator<Item = P>,
    ) -> Self {
        self.non_arc_srcs = srcs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_hdrs<P: Into<PathBuf>>(mut self, hdrs: impl IntoIterator<Item = P>) -> Self {
        self.hdrs = hdrs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_includes<P: Into<PathBuf>>(
        mut self,
        includes: impl IntoIterator<Item = P>,
    ) -> Self {
        self.includes = includes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_defines<S: Into<String>>(mut self, defines: impl IntoIterator<Item = S>) -> Self {
        self.defines = defines.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_copts<S: Into<String>>(mut self, copts: impl IntoIterator<Item = S>) -> Self {
        self.copts = copts.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_sdk_frameworks<S: Into<String>>(
        mut self,
        frameworks: impl IntoIterator<Item = S>,
    ) -> Self {
        self.sdk_frameworks = frameworks.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_weak_sdk_frameworks<S: Into<String>>(
        mut self,
        frameworks: impl IntoIterator<Item = S>,
    ) -> Self {
        self.weak_sdk_frameworks = frameworks.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_sdk_dylibs<S: Into<String>>(mut self, dylibs: impl IntoIterator<Item = S>) -> Self {
        self.sdk_dylibs = dylibs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_pch(mut self, pch: impl Into<PathBuf>) -> Self {
        self.pch = Some(pch.into());
        self
    }

    pub fn with_module_name(mut self, name: impl Into<String>) -> Self {
        self.module_name = Some(name.into());
        self
    }

    pub fn with_module_map(mut self, module_map: impl Into<PathBuf>) -> Self {
        self.module_map = Some(module_map.into());
        self
    }

    pub fn with_resources(mut self, resources: ResourceAttributes) -> Self {
        self.resources = resources;
        self
    }

    /// Set dependencies
    pub fn with_deps(mut self, deps: impl IntoIterator<Item = Label>) -> Self {
        self.deps = deps.into_iter().collect();
        self
    }

    /// Compilable sources paired with their ARC setting, in declaration order
    /// (`srcs` first, then `non_arc_srcs`)
    pub fn compiled_sources(&self) -> Vec<(&Path, bool)> {
        let arc = self
            .srcs
            .iter()
            .filter(|src| FileKind::of(src).language().is_some())
            .map(|src| (src.as_path(), true));
        let non_arc = self
            .non_arc_srcs
            .iter()
            .filter(|src| FileKind::of(src).language().is_some())
            .map(|src| (src.as_path(), false));
        arc.chain(non_arc).collect()
    }

    /// Headers and textual includes listed in `srcs`
    pub fn private_headers(&self) -> impl Iterator<Item = &PathBuf> {
        self.srcs
            .iter()
            .filter(|src| matches!(FileKind::of(src), FileKind::Header | FileKind::Textual))
    }

    /// Precompiled object files listed in `srcs`
    pub fn precompiled_objects(&self) -> impl Iterator<Item = &PathBuf> {
        self.srcs
            .iter()
            .filter(|src| FileKind::of(src) == FileKind::Object)
    }

    /// Whether this target produces an archive
    pub fn has_objects(&self) -> bool {
        !self.compiled_sources().is_empty() || self.precompiled_objects().next().is_some()
    }
}

/// Compilation facts exported by a foreign (non-objc) compiled library
///
/// These are registered alongside library declarations and contribute only
/// headers, cc libraries, include paths and defines to dependents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CcLibraryInfo {
    pub label: Label,
    /// Archives to link, in link order
    #[serde(default)]
    pub libraries: Vec<PathBuf>,
    /// Exec paths of exported headers
    #[serde(default)]
    pub headers: Vec<PathBuf>,
    #[serde(default)]
    pub system_includes: Vec<PathBuf>,
    #[serde(default)]
    pub quote_includes: Vec<PathBuf>,
    #[serde(default)]
    pub defines: Vec<String>,
}

impl CcLibraryInfo {
    /// Create an empty foreign library
    pub fn new(label: Label) -> Self {
        Self {
            label,
            libraries: Vec::new(),
            headers: Vec::new(),
            system_includes: Vec::new(),
            quote_includes: Vec::new(),
            defines: Vec::new(),
        }
    }

    pub fn with_libraries<P: Into<PathBuf>>(mut self, libs: impl IntoIterator<Item = P>) -> Self {
        self.libraries = libs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_headers<P: Into<PathBuf>>(mut self, hdrs: impl IntoIterator<Item = P>) -> Self {
        self.headers = hdrs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_system_includes<P: Into<PathBuf>>(
        mut self,
        includes: impl IntoIterator<Item = P>,
    ) -> Self {
        self.system_includes = includes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_quote_includes<P: Into<PathBuf>>(
        mut self,
        includes: impl IntoIterator<Item = P>,
    ) -> Self {
        self.quote_includes = includes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_defines<S: Into<String>>(mut self, defines: impl IntoIterator<Item = S>) -> Self {
        self.defines = defines.into_iter().map(Into::into).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(s: &str) -> Label {
        Label::parse(s).unwrap()
    }

    #[test]
    fn test_compiled_sources_order() {
        let lib = ObjcLibrary::new(label("//objc:lib"))
            .with_srcs(["a.m", "private.h", "b.c", "pre.o"])
            .with_non_arc_srcs(["non_arc.m"]);

        let sources: Vec<_> = lib
            .compiled_sources()
            .into_iter()
            .map(|(p, arc)| (p.to_string_lossy().to_string(), arc))
            .collect();
        assert_eq!(
            sources,
            vec![
                ("a.m".to_string(), true),
                ("b.c".to_string(), true),
                ("non_arc.m".to_string(), false),
            ]
        );
        assert_eq!(lib.private_headers().count(), 1);
        assert_eq!(lib.precompiled_objects().count(), 1);
        assert!(lib.has_objects());
    }

    #[test]
    fn test_header_only_has_no_objects() {
        let lib = ObjcLibrary::new(label("//objc:hdrs")).with_hdrs(["a.h"]);
        assert!(!lib.has_objects());
    }

    #[test]
    fn test_resource_attributes_set_even_if_empty() {
        let resources = ResourceAttributes {
            xibs: Some(vec![]),
            ..ResourceAttributes::default()
        };
        let set = resources.set_attributes();
        assert_eq!(set.len(), 1);
        assert_eq!(set[0].0, "xibs");
        assert!(ResourceAttributes::default().set_attributes().is_empty());
    }

    #[test]
    fn test_declaration_from_json() {
        let lib: ObjcLibrary = serde_json::from_str(
            r#"{"label": "//x:x", "srcs": ["a.m"], "deps": ["//y:y"]}"#,
        )
        .unwrap();
        assert_eq!(lib.srcs, vec![PathBuf::from("a.m")]);
        assert_eq!(lib.deps, vec![label("//y:y")]);
        assert!(lib.module_name.is_none());
    }
}
