//! Target labels
//!
//! A label names a target as `//package/path:name`. The short form
//! `//package/path` names the target whose name is the last path component.

use crate::error::{BuildError, BuildResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};

/// Target identity within a workspace
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Label {
    package: String,
    name: String,
}

impl Label {
    /// Create a label from an already-split package and name
    pub fn new(package: impl Into<String>, name: impl Into<String>) -> BuildResult<Self> {
        let package = package.into();
        let name = name.into();
        let display = format!("//{}:{}", package, name);
        check_package(&display, &package)?;
        check_name(&display, &name)?;
        Ok(Self { package, name })
    }

    /// Parse an absolute label
    pub fn parse(text: &str) -> BuildResult<Self> {
        let rest = text
            .strip_prefix("//")
            .ok_or_else(|| BuildError::invalid_label(text, "labels must start with '//'"))?;

        match rest.split_once(':') {
            Some((package, name)) => {
                check_package(text, package)?;
                check_name(text, name)?;
                Ok(Self {
                    package: package.to_string(),
                    name: name.to_string(),
                })
            }
            None => {
                check_package(text, rest)?;
                let name = rest.rsplit('/').next().unwrap_or(rest);
                if name.is_empty() {
                    return Err(BuildError::invalid_label(
                        text,
                        "the root package needs an explicit target name",
                    ));
                }
                Ok(Self {
                    package: rest.to_string(),
                    name: name.to_string(),
                })
            }
        }
    }

    /// Parse a label that may be relative to this label's package (`:name`)
    pub fn resolve(&self, text: &str) -> BuildResult<Self> {
        match text.strip_prefix(':') {
            Some(name) => Self::new(self.package.clone(), name),
            None => Self::parse(text),
        }
    }

    /// Package path, without the leading `//`
    pub fn package(&self) -> &str {
        &self.package
    }

    /// Target name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Package path as a relative filesystem path
    pub fn package_path(&self) -> PathBuf {
        PathBuf::from(&self.package)
    }

    /// Exec path of a package-relative file (`package/file`)
    pub fn exec_path(&self, file: &Path) -> PathBuf {
        self.package_path().join(file)
    }

    /// Label-style name of a package-relative file (`//package:file`)
    pub fn file_label(&self, file: &Path) -> String {
        format!("//{}:{}", self.package, file.display())
    }

    /// Module name derived from package and name (`//x:x` -> `x_x`)
    ///
    /// Package and name are joined by `_` and every other non-identifier
    /// character becomes `_`. That rewrite loses information (`//a/b:c` and
    /// `//a:b_c` both read `a_b_c`), so any label using characters beyond a
    /// single alphanumeric package and name gets a digest of the full label
    /// appended. Plain names carry at most one `_` and suffixed names at
    /// least two, so the two forms never meet.
    pub fn derived_module_name(&self) -> String {
        let joined = if self.package.is_empty() {
            self.name.clone()
        } else {
            format!("{}_{}", self.package, self.name)
        };
        let plain = [&self.package, &self.name]
            .iter()
            .all(|part| part.chars().all(|c| c.is_ascii_alphanumeric()));
        let readable: String = joined
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        if plain {
            return readable;
        }

        let digest = Sha256::digest(self.to_string().as_bytes());
        let suffix: String = digest[..MODULE_NAME_DIGEST_BYTES]
            .iter()
            .map(|byte| format!("{:02x}", byte))
            .collect();
        format!("{}_{}", readable, suffix)
    }
}

/// Digest bytes appended to derived module names that need disambiguation
const MODULE_NAME_DIGEST_BYTES: usize = 8;

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "//{}:{}", self.package, self.name)
    }
}

impl TryFrom<String> for Label {
    type Error = BuildError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Label> for String {
    fn from(label: Label) -> Self {
        label.to_string()
    }
}

fn check_package(text: &str, package: &str) -> BuildResult<()> {
    if package.starts_with('/') || package.ends_with('/') || package.contains("//") {
        return Err(BuildError::invalid_label(text, "malformed package path"));
    }
    if package.split('/').any(|part| part == "." || part == "..") {
        return Err(BuildError::invalid_label(
            text,
            "package path may not contain '.' or '..'",
        ));
    }
    if package.chars().any(|c| c.is_whitespace() || c == ':') {
        return Err(BuildError::invalid_label(text, "invalid character in package"));
    }
    Ok(())
}

fn check_name(text: &str, name: &str) -> BuildResult<()> {
    if name.is_empty() {
        return Err(BuildError::invalid_label(text, "target name cannot be empty"));
    }
    if name.chars().any(|c| c.is_whitespace() || c == ':') {
        return Err(BuildError::invalid_label(text, "invalid character in target name"));
    }
    Ok(())
}
