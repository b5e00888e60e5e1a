//! Module map generation
//!
//! Public headers come from `hdrs`, filtered to real header extensions.
//! Private headers are always empty: headers listed in `srcs` stay out of
//! the module's surface.

use crate::action::FileWrite;
use crate::file_type::FileKind;
use crate::targets::ObjcLibrary;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Component, Path, PathBuf};

/// A module map, either generated or supplied by the target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleMap {
    /// Module name; `None` for custom maps
    pub name: Option<String>,
    /// Exec path of the map file
    pub path: PathBuf,
    pub public_headers: Vec<PathBuf>,
    pub private_headers: Vec<PathBuf>,
    /// Whether the planner writes this map
    pub generated: bool,
}

impl ModuleMap {
    /// Compile flags referencing this map
    pub fn compile_flags(&self) -> Vec<String> {
        let mut flags = vec![
            "-fmodule-maps".to_string(),
            format!("-fmodule-map-file={}", self.path.display()),
        ];
        if let Some(name) = &self.name {
            flags.push(format!("-fmodule-name={}", name));
        }
        flags
    }

    /// Rendered `module.modulemap` contents
    pub fn content(&self) -> String {
        let dir = self.path.parent().unwrap_or_else(|| Path::new(""));
        let up = "../".repeat(
            dir.components()
                .filter(|c| matches!(c, Component::Normal(_)))
                .count(),
        );

        let mut out = String::new();
        let name = self.name.as_deref().unwrap_or_default();
        let _ = writeln!(out, "module \"{}\" {{", name);
        let _ = writeln!(out, "  export *");
        for header in &self.public_headers {
            let _ = writeln!(out, "  header \"{}{}\"", up, header.display());
        }
        for header in &self.private_headers {
            let _ = writeln!(out, "  private header \"{}{}\"", up, header.display());
        }
        out.push_str("}\n");
        out
    }

    /// File-write action producing a generated map
    pub fn write_action(&self) -> Option<FileWrite> {
        self.generated
            .then(|| FileWrite::new(self.path.clone(), self.content()))
    }
}

/// Module map of a target: the custom map if one is declared, otherwise a
/// generated one under `<genfiles>/<package>/<name>.modulemaps/`
pub fn generate(target: &ObjcLibrary, genfiles_dir: &Path) -> ModuleMap {
    if let Some(custom) = &target.module_map {
        return ModuleMap {
            name: None,
            path: target.label.exec_path(custom),
            public_headers: Vec::new(),
            private_headers: Vec::new(),
            generated: false,
        };
    }

    let name = target
        .module_name
        .clone()
        .unwrap_or_else(|| target.label.derived_module_name());
    let path = genfiles_dir
        .join(target.label.package_path())
        .join(format!("{}.modulemaps", target.label.name()))
        .join("module.modulemap");
    let public_headers = target
        .hdrs
        .iter()
        .filter(|hdr| FileKind::of(hdr) == FileKind::Header)
        .map(|hdr| target.label.exec_path(hdr))
        .collect();

    ModuleMap {
        name: Some(name),
        path,
        public_headers,
        private_headers: Vec::new(),
        generated: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::Label;
    use pretty_assertions::assert_eq;

    fn target() -> ObjcLibrary {
        ObjcLibrary::new(Label::parse("//x:x").unwrap())
            .with_srcs(["a.m", "b.m", "private.h", "private.inc"])
            .with_hdrs(["a.h", "x.inc", "foo.m", "bar.mm"])
    }

    #[test]
    fn test_filters_headers() {
        let map = generate(&target(), Path::new("out/genfiles"));
        assert_eq!(map.public_headers, vec![PathBuf::from("x/a.h")]);
        assert!(map.private_headers.is_empty());
        assert_eq!(map.name.as_deref(), Some("x_x"));
        assert_eq!(
            map.path,
            PathBuf::from("out/genfiles/x/x.modulemaps/module.modulemap")
        );
    }

    #[test]
    fn test_module_name_overrides_derived() {
        let map = generate(&target().with_module_name("foo"), Path::new("g"));
        assert_eq!(map.name.as_deref(), Some("foo"));
        assert_eq!(map.compile_flags().last().unwrap(), "-fmodule-name=foo");
    }

    #[test]
    fn test_content_relative_paths() {
        let map = generate(&target(), Path::new("out/genfiles"));
        assert_eq!(
            map.content(),
            "module \"x_x\" {\n  export *\n  header \"../../../../x/a.h\"\n}\n"
        );
        let write = map.write_action().unwrap();
        assert_eq!(write.output, map.path);
    }

    #[test]
    fn test_custom_map_is_not_written() {
        let map = generate(
            &ObjcLibrary::new(Label::parse("//x:x").unwrap()).with_module_map("x.modulemap"),
            Path::new("g"),
        );
        assert!(!map.generated);
        assert!(map.write_action().is_none());
        assert_eq!(
            map.compile_flags(),
            vec!["-fmodule-maps", "-fmodule-map-file=x/x.modulemap"]
        );
    }
}
