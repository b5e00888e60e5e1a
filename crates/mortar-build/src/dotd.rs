//! Header discovery from compiler-emitted dependency files
//!
//! A `.d` file is a Makefile fragment: `target: dep dep \` with backslash
//! continuations and `\ `-escaped spaces. Parsing it narrows a compile
//! action's recorded inputs to the headers the compiler actually read.

use crate::action::Action;
use crate::error::{BuildError, BuildResult};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Malformed dependency file
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DotdError {
    #[error("error while parsing .d file: file is empty")]
    Empty,

    #[error("error while parsing .d file: line {line} has no target separator")]
    MissingSeparator { line: usize },

    #[error("error while parsing .d file: rule on line {line} has no target")]
    MissingTarget { line: usize },

    #[error("error while parsing .d file: unterminated line continuation")]
    UnterminatedContinuation,
}

/// One `target: deps` rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DotdRule {
    pub target: PathBuf,
    pub dependencies: Vec<PathBuf>,
}

/// Parse dependency file contents into rules
pub fn parse(contents: &str) -> Result<Vec<DotdRule>, DotdError> {
    let mut rules = Vec::new();
    let mut logical = String::new();
    let mut start_line = 0;
    let mut pending = false;

    for (index, raw) in contents.lines().enumerate() {
        if !pending {
            start_line = index + 1;
            logical.clear();
        }
        match raw.strip_suffix('\\') {
            Some(head) => {
                logical.push_str(head);
                logical.push(' ');
                pending = true;
            }
            None => {
                logical.push_str(raw);
                pending = false;
                if let Some(rule) = parse_rule(&logical, start_line)? {
                    rules.push(rule);
                }
            }
        }
    }

    if pending {
        return Err(DotdError::UnterminatedContinuation);
    }
    if rules.is_empty() {
        return Err(DotdError::Empty);
    }
    Ok(rules)
}

fn parse_rule(line: &str, line_number: usize) -> Result<Option<DotdRule>, DotdError> {
    let words = split_words(line);
    if words.is_empty() {
        return Ok(None);
    }

    let separator = words
        .iter()
        .position(|w| w.ends_with(':') && !w.ends_with("\\:"))
        .ok_or(DotdError::MissingSeparator { line: line_number })?;
    let target = words[separator].trim_end_matches(':');
    if target.is_empty() {
        return Err(DotdError::MissingTarget { line: line_number });
    }

    Ok(Some(DotdRule {
        target: PathBuf::from(target),
        dependencies: words[separator + 1..].iter().map(PathBuf::from).collect(),
    }))
}

/// Split on unescaped whitespace, unescaping `\ `
fn split_words(line: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&' ') => {
                current.push(' ');
                chars.next();
            }
            c if c.is_whitespace() => {
                if !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Input refinement for compile actions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderDiscovery {
    pub enabled: bool,
}

impl HeaderDiscovery {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Declared inputs the compiler actually read, in declared order
    ///
    /// The source file is always kept and paths outside `declared` are
    /// ignored. When discovery is disabled the refinement is empty and the
    /// declared inputs stand.
    pub fn discover_inputs(
        &self,
        contents: &str,
        declared: &IndexSet<PathBuf>,
        source: &Path,
    ) -> Result<IndexSet<PathBuf>, DotdError> {
        if !self.enabled {
            return Ok(IndexSet::new());
        }

        let used: IndexSet<PathBuf> = parse(contents)?
            .into_iter()
            .flat_map(|rule| rule.dependencies)
            .collect();

        Ok(declared
            .iter()
            .filter(|input| input.as_path() == source || used.contains(*input))
            .cloned()
            .collect())
    }

    /// Narrow a compile action's inputs after it ran
    ///
    /// A malformed dependency file fails the action.
    pub fn refine(&self, action: &Action, source: &Path, contents: &str) -> BuildResult<Action> {
        let discovered = self
            .discover_inputs(contents, &action.inputs, source)
            .map_err(|error| BuildError::ActionExecution {
                action: action.mnemonic.clone(),
                source: error,
            })?;

        let mut refined = action.clone();
        if self.enabled {
            refined.inputs = discovered;
        }
        Ok(refined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_continuations() {
        let rules = parse("lib/a.o: lib/a.m \\\n  lib/a.h \\\n  dep/b.h\n").unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].target, PathBuf::from("lib/a.o"));
        assert_eq!(
            rules[0].dependencies,
            vec![
                PathBuf::from("lib/a.m"),
                PathBuf::from("lib/a.h"),
                PathBuf::from("dep/b.h"),
            ]
        );
    }

    #[test]
    fn test_parse_escaped_spaces() {
        let rules = parse("a.o: my\\ dir/a.h b.h\n").unwrap();
        assert_eq!(
            rules[0].dependencies,
            vec![PathBuf::from("my dir/a.h"), PathBuf::from("b.h")]
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse(""), Err(DotdError::Empty));
        assert_eq!(
            parse("a.o b.h\n"),
            Err(DotdError::MissingSeparator { line: 1 })
        );
        assert_eq!(parse("a.o: b.h \\"), Err(DotdError::UnterminatedContinuation));
        assert_eq!(parse(": b.h"), Err(DotdError::MissingTarget { line: 1 }));
    }

    #[test]
    fn test_error_message() {
        assert!(DotdError::Empty
            .to_string()
            .contains("error while parsing .d file"));
    }

    #[test]
    fn test_discover_keeps_source_and_declared_only() {
        let declared: IndexSet<PathBuf> = ["lib/a.m", "lib/a.h", "lib/unused.h"]
            .into_iter()
            .map(PathBuf::from)
            .collect();
        let discovery = HeaderDiscovery::new(true);
        let found = discovery
            .discover_inputs(
                "lib/a.o: lib/a.h /usr/include/stdio.h\n",
                &declared,
                Path::new("lib/a.m"),
            )
            .unwrap();
        assert_eq!(
            found.into_iter().collect::<Vec<_>>(),
            vec![PathBuf::from("lib/a.m"), PathBuf::from("lib/a.h")]
        );
    }

    #[test]
    fn test_disabled_discovery_is_empty() {
        let declared: IndexSet<PathBuf> = [PathBuf::from("a.m")].into_iter().collect();
        let found = HeaderDiscovery::new(false)
            .discover_inputs("garbage", &declared, Path::new("a.m"))
            .unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_refine_malformed_is_action_failure() {
        let action = Action::new("ObjcCompile", "clang")
            .with_inputs(vec![PathBuf::from("lib/a.m")]);
        let err = HeaderDiscovery::new(true)
            .refine(&action, Path::new("lib/a.m"), "")
            .unwrap_err();
        assert!(matches!(err, BuildError::ActionExecution { .. }));
        assert!(err.to_string().contains("error while parsing .d file"));
    }
}
