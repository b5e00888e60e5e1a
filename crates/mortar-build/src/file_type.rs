//! Source file classification by extension
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Extensions compiled from `srcs`
pub const COMPILABLE_EXTENSIONS: &[&str] = &[
    "m", "mm", "c", "cc", "cpp", "cxx", "c++", "C", "s", "S", "asm",
];

/// Extensions that count as headers for module maps
pub const HEADER_EXTENSIONS: &[&str] = &["h", "hh", "hpp", "hxx", "h++", "ipp"];

/// Header-like files that are only ever textually included
pub const TEXTUAL_EXTENSIONS: &[&str] = &["inc", "inl"];

/// Extensions allowed in `non_arc_srcs`
pub const NON_ARC_EXTENSIONS: &[&str] = &["m", "mm"];

/// Source language of a compilable file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    Objc,
    Objcpp,
    C,
    Cpp,
    Assembly,
}

impl Language {
    /// Whether ARC flags apply to this language
    pub fn uses_arc(&self) -> bool {
        matches!(self, Self::Objc | Self::Objcpp)
    }

    /// Whether the C++ standard library flags apply
    pub fn is_cxx(&self) -> bool {
        matches!(self, Self::Objcpp | Self::Cpp)
    }
}

/// What a file in a target declaration is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    Source(Language),
    Header,
    Textual,
    Object,
    Other,
}

impl FileKind {
    /// Classify a path by its extension. Extensions are case-sensitive
    /// (`.C` is C++, `.c` is C).
    pub fn of(path: &Path) -> Self {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return Self::Other;
        };
        match ext {
            "m" => Self::Source(Language::Objc),
            "mm" => Self::Source(Language::Objcpp),
            "c" => Self::Source(Language::C),
            "cc" | "cpp" | "cxx" | "c++" | "C" => Self::Source(Language::Cpp),
            "s" | "S" | "asm" => Self::Source(Language::Assembly),
            "o" => Self::Object,
            e if HEADER_EXTENSIONS.contains(&e) => Self::Header,
            e if TEXTUAL_EXTENSIONS.contains(&e) => Self::Textual,
            _ => Self::Other,
        }
    }

    /// Language, for compilable files
    pub fn language(&self) -> Option<Language> {
        match self {
            Self::Source(language) => Some(*language),
            _ => None,
        }
    }
}

/// Allowed file kinds of a sources-like attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceAttribute {
    Srcs,
    NonArcSrcs,
}

impl SourceAttribute {
    /// Attribute name as written in declarations
    pub fn name(&self) -> &'static str {
        match self {
            Self::Srcs => "srcs",
            Self::NonArcSrcs => "non_arc_srcs",
        }
    }

    /// Whether a file of this kind may appear in the attribute
    pub fn allows(&self, kind: FileKind) -> bool {
        match self {
            Self::Srcs => !matches!(kind, FileKind::Other),
            Self::NonArcSrcs => matches!(
                kind,
                FileKind::Source(Language::Objc) | FileKind::Source(Language::Objcpp)
            ),
        }
    }

    /// Extension list used in error messages
    pub fn expected(&self) -> String {
        let extensions: Vec<&str> = match self {
            Self::Srcs => COMPILABLE_EXTENSIONS
                .iter()
                .chain(HEADER_EXTENSIONS)
                .chain(TEXTUAL_EXTENSIONS)
                .chain(&["o"])
                .copied()
                .collect(),
            Self::NonArcSrcs => NON_ARC_EXTENSIONS.to_vec(),
        };
        extensions
            .iter()
            .map(|e| format!(".{}", e))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
