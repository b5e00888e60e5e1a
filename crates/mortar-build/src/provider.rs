//! Provider propagation
//!
//! A [`ProviderSet`] is the transitively merged, immutable set of compilation
//! facts a target exposes to its dependents. Each target folds its own
//! contribution with the already-merged sets of its direct dependencies;
//! nothing is mutated after the fold.
//!
//! Every key has a fixed [`MergeOrder`]. Link-order keys list the target's own
//! values before its dependencies' (archives, defines, include paths and copts
//! are consumed most-specific first). Build-order keys list dependencies first
//! (headers, frameworks, module maps and resources). Both orders keep the
//! first occurrence of a duplicate.

use crate::targets::CcLibraryInfo;
use crate::label::Label;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::hash::Hash;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Typed keys of a provider set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProviderKey {
    Header,
    Library,
    CcLibrary,
    SdkFramework,
    WeakSdkFramework,
    SdkDylib,
    Define,
    Include,
    Copt,
    ModuleMap,
    AssetCatalog,
    XcassetsDir,
    Xcdatamodel,
    Storyboard,
    Strings,
    Xib,
    GeneralResourceFile,
}

/// Position of a target's own values relative to its dependencies'
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOrder {
    /// Own values first, then dependencies in declaration order
    Link,
    /// Dependencies in declaration order, then own values
    Build,
}

impl ProviderKey {
    pub const ALL: [ProviderKey; 17] = [
        Self::Header,
        Self::Library,
        Self::CcLibrary,
        Self::SdkFramework,
        Self::WeakSdkFramework,
        Self::SdkDylib,
        Self::Define,
        Self::Include,
        Self::Copt,
        Self::ModuleMap,
        Self::AssetCatalog,
        Self::XcassetsDir,
        Self::Xcdatamodel,
        Self::Storyboard,
        Self::Strings,
        Self::Xib,
        Self::GeneralResourceFile,
    ];

    pub fn merge_order(&self) -> MergeOrder {
        match self {
            Self::Library | Self::CcLibrary | Self::Define | Self::Include | Self::Copt => {
                MergeOrder::Link
            }
            Self::Header
            | Self::SdkFramework
            | Self::WeakSdkFramework
            | Self::SdkDylib
            | Self::ModuleMap
            | Self::AssetCatalog
            | Self::XcassetsDir
            | Self::Xcdatamodel
            | Self::Storyboard
            | Self::Strings
            | Self::Xib
            | Self::GeneralResourceFile => MergeOrder::Build,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Header => "HEADER",
            Self::Library => "LIBRARY",
            Self::CcLibrary => "CC_LIBRARY",
            Self::SdkFramework => "SDK_FRAMEWORK",
            Self::WeakSdkFramework => "WEAK_SDK_FRAMEWORK",
            Self::SdkDylib => "SDK_DYLIB",
            Self::Define => "DEFINE",
            Self::Include => "INCLUDE",
            Self::Copt => "COPT",
            Self::ModuleMap => "MODULE_MAP",
            Self::AssetCatalog => "ASSET_CATALOG",
            Self::XcassetsDir => "XCASSETS_DIR",
            Self::Xcdatamodel => "XCDATAMODEL",
            Self::Storyboard => "STORYBOARD",
            Self::Strings => "STRINGS",
            Self::Xib => "XIB",
            Self::GeneralResourceFile => "GENERAL_RESOURCE_FILE",
        }
    }
}

impl std::fmt::Display for ProviderKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A header search path and how it is searched
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "path", rename_all = "snake_case")]
pub enum IncludePath {
    /// `-I<path>`
    Angle(PathBuf),
    /// `-iquote <path>`
    Quote(PathBuf),
    /// `-isystem <path>`
    System(PathBuf),
}

impl IncludePath {
    /// Compiler arguments for this search path
    pub fn to_args(&self) -> Vec<String> {
        match self {
            Self::Angle(path) => vec![format!("-I{}", path.display())],
            Self::Quote(path) => vec!["-iquote".to_string(), path.display().to_string()],
            Self::System(path) => vec!["-isystem".to_string(), path.display().to_string()],
        }
    }
}

/// Compiler options declared by one target
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CoptGroup {
    pub owner: Label,
    pub flags: Vec<String>,
}

/// Transitively merged compilation facts of a target
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSet {
    header: IndexSet<PathBuf>,
    library: IndexSet<PathBuf>,
    cc_library: IndexSet<PathBuf>,
    sdk_framework: IndexSet<String>,
    weak_sdk_framework: IndexSet<String>,
    sdk_dylib: IndexSet<String>,
    define: IndexSet<String>,
    include: IndexSet<IncludePath>,
    copt: IndexSet<CoptGroup>,
    module_map: IndexSet<PathBuf>,
    asset_catalog: IndexSet<PathBuf>,
    xcassets_dir: IndexSet<PathBuf>,
    xcdatamodel: IndexSet<PathBuf>,
    storyboard: IndexSet<PathBuf>,
    strings: IndexSet<PathBuf>,
    xib: IndexSet<PathBuf>,
    general_resource_file: IndexSet<PathBuf>,
}

macro_rules! accessors {
    ($($field:ident => $ty:ty),* $(,)?) => {
        $(
            pub fn $field(&self) -> &IndexSet<$ty> {
                &self.$field
            }
        )*
    };
}

macro_rules! adders {
    ($($method:ident => $field:ident: $ty:ty),* $(,)?) => {
        $(
            pub fn $method<T: Into<$ty>>(mut self, values: impl IntoIterator<Item = T>) -> Self {
                self.$field.extend(values.into_iter().map(Into::into));
                self
            }
        )*
    };
}

impl ProviderSet {
    pub fn new() -> Self {
        Self::default()
    }

    accessors! {
        header => PathBuf,
        library => PathBuf,
        cc_library => PathBuf,
        sdk_framework => String,
        weak_sdk_framework => String,
        sdk_dylib => String,
        define => String,
        include => IncludePath,
        copt => CoptGroup,
        module_map => PathBuf,
        asset_catalog => PathBuf,
        xcassets_dir => PathBuf,
        xcdatamodel => PathBuf,
        storyboard => PathBuf,
        strings => PathBuf,
        xib => PathBuf,
        general_resource_file => PathBuf,
    }

    adders! {
        with_headers => header: PathBuf,
        with_libraries => library: PathBuf,
        with_cc_libraries => cc_library: PathBuf,
        with_sdk_frameworks => sdk_framework: String,
        with_weak_sdk_frameworks => weak_sdk_framework: String,
        with_sdk_dylibs => sdk_dylib: String,
        with_defines => define: String,
        with_includes => include: IncludePath,
        with_copts => copt: CoptGroup,
        with_module_maps => module_map: PathBuf,
        with_asset_catalogs => asset_catalog: PathBuf,
        with_xcassets_dirs => xcassets_dir: PathBuf,
        with_xcdatamodels => xcdatamodel: PathBuf,
        with_storyboards => storyboard: PathBuf,
        with_strings => strings: PathBuf,
        with_xibs => xib: PathBuf,
        with_general_resource_files => general_resource_file: PathBuf,
    }

    /// Values under `key`, rendered as strings in merged order
    pub fn values(&self, key: ProviderKey) -> Vec<String> {
        fn paths(set: &IndexSet<PathBuf>) -> Vec<String> {
            set.iter().map(|p| p.display().to_string()).collect()
        }
        fn names(set: &IndexSet<String>) -> Vec<String> {
            set.iter().cloned().collect()
        }

        match key {
            ProviderKey::Header => paths(&self.header),
            ProviderKey::Library => paths(&self.library),
            ProviderKey::CcLibrary => paths(&self.cc_library),
            ProviderKey::SdkFramework => names(&self.sdk_framework),
            ProviderKey::WeakSdkFramework => names(&self.weak_sdk_framework),
            ProviderKey::SdkDylib => names(&self.sdk_dylib),
            ProviderKey::Define => names(&self.define),
            ProviderKey::Include => self
                .include
                .iter()
                .map(|include| include.to_args().join(" "))
                .collect(),
            ProviderKey::Copt => self
                .copt
                .iter()
                .flat_map(|group| group.flags.iter().cloned())
                .collect(),
            ProviderKey::ModuleMap => paths(&self.module_map),
            ProviderKey::AssetCatalog => paths(&self.asset_catalog),
            ProviderKey::XcassetsDir => paths(&self.xcassets_dir),
            ProviderKey::Xcdatamodel => paths(&self.xcdatamodel),
            ProviderKey::Storyboard => paths(&self.storyboard),
            ProviderKey::Strings => paths(&self.strings),
            ProviderKey::Xib => paths(&self.xib),
            ProviderKey::GeneralResourceFile => paths(&self.general_resource_file),
        }
    }

    /// Whether `key` holds no values
    pub fn is_empty(&self, key: ProviderKey) -> bool {
        self.values(key).is_empty()
    }

    /// Copt groups declared by dependencies of `owner`, in merged order
    pub fn dependency_copts<'a>(&'a self, owner: &'a Label) -> impl Iterator<Item = &'a CoptGroup> {
        self.copt.iter().filter(move |group| &group.owner != owner)
    }

    /// Append `other`'s values under `key`, skipping values already present
    fn extend_key(&mut self, key: ProviderKey, other: &ProviderSet) {
        fn extend<T: Clone + Eq + Hash>(into: &mut IndexSet<T>, from: &IndexSet<T>) {
            into.extend(from.iter().cloned());
        }

        match key {
            ProviderKey::Header => extend(&mut self.header, &other.header),
            ProviderKey::Library => extend(&mut self.library, &other.library),
            ProviderKey::CcLibrary => extend(&mut self.cc_library, &other.cc_library),
            ProviderKey::SdkFramework => extend(&mut self.sdk_framework, &other.sdk_framework),
            ProviderKey::WeakSdkFramework => {
                extend(&mut self.weak_sdk_framework, &other.weak_sdk_framework)
            }
            ProviderKey::SdkDylib => extend(&mut self.sdk_dylib, &other.sdk_dylib),
            ProviderKey::Define => extend(&mut self.define, &other.define),
            ProviderKey::Include => extend(&mut self.include, &other.include),
            ProviderKey::Copt => extend(&mut self.copt, &other.copt),
            ProviderKey::ModuleMap => extend(&mut self.module_map, &other.module_map),
            ProviderKey::AssetCatalog => extend(&mut self.asset_catalog, &other.asset_catalog),
            ProviderKey::XcassetsDir => extend(&mut self.xcassets_dir, &other.xcassets_dir),
            ProviderKey::Xcdatamodel => extend(&mut self.xcdatamodel, &other.xcdatamodel),
            ProviderKey::Storyboard => extend(&mut self.storyboard, &other.storyboard),
            ProviderKey::Strings => extend(&mut self.strings, &other.strings),
            ProviderKey::Xib => extend(&mut self.xib, &other.xib),
            ProviderKey::GeneralResourceFile => {
                extend(&mut self.general_resource_file, &other.general_resource_file)
            }
        }
    }

    /// Append a foreign library's contribution under `key`
    ///
    /// Foreign archives land under CC_LIBRARY and never under LIBRARY.
    fn extend_foreign(&mut self, key: ProviderKey, info: &CcLibraryInfo) {
        match key {
            ProviderKey::Header => self.header.extend(info.headers.iter().cloned()),
            ProviderKey::CcLibrary => self.cc_library.extend(info.libraries.iter().cloned()),
            ProviderKey::Define => self.define.extend(info.defines.iter().cloned()),
            ProviderKey::Include => {
                self.include
                    .extend(info.quote_includes.iter().cloned().map(IncludePath::Quote));
                self.include
                    .extend(info.system_includes.iter().cloned().map(IncludePath::System));
            }
            ProviderKey::Library
            | ProviderKey::SdkFramework
            | ProviderKey::WeakSdkFramework
            | ProviderKey::SdkDylib
            | ProviderKey::Copt
            | ProviderKey::ModuleMap
            | ProviderKey::AssetCatalog
            | ProviderKey::XcassetsDir
            | ProviderKey::Xcdatamodel
            | ProviderKey::Storyboard
            | ProviderKey::Strings
            | ProviderKey::Xib
            | ProviderKey::GeneralResourceFile => {}
        }
    }

    fn extend_from(&mut self, key: ProviderKey, dependency: &Dependency) {
        match dependency {
            Dependency::Objc { providers, .. } => self.extend_key(key, providers),
            Dependency::Cc(info) => self.extend_foreign(key, info),
        }
    }
}

/// An already-analyzed direct dependency
#[derive(Debug, Clone)]
pub enum Dependency {
    /// Another library of this rule kind
    Objc {
        label: Label,
        providers: Arc<ProviderSet>,
    },
    /// A foreign compiled library
    Cc(Arc<CcLibraryInfo>),
}

impl Dependency {
    pub fn label(&self) -> &Label {
        match self {
            Self::Objc { label, .. } => label,
            Self::Cc(info) => &info.label,
        }
    }
}

/// Fold a target's own contribution with its direct dependencies' merged sets
pub fn compute_providers(own: ProviderSet, dependencies: &[Dependency]) -> ProviderSet {
    let mut merged = ProviderSet::default();

    for key in ProviderKey::ALL {
        match key.merge_order() {
            MergeOrder::Link => {
                merged.extend_key(key, &own);
                for dependency in dependencies {
                    merged.extend_from(key, dependency);
                }
            }
            MergeOrder::Build => {
                for dependency in dependencies {
                    merged.extend_from(key, dependency);
                }
                merged.extend_key(key, &own);
            }
        }
    }

    merged
}

/// Parent directories of `files` that carry one of `suffixes`, deduplicated
pub fn containers<'a>(
    files: impl IntoIterator<Item = &'a Path>,
    suffixes: &[&str],
) -> IndexSet<PathBuf> {
    files
        .into_iter()
        .filter_map(|file| crate::validation::container_of(file, suffixes))
        .collect()
}
