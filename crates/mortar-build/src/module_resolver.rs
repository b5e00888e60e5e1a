//! Dependency resolution
//!
//! As targets are analyzed in dependency order, their results are registered
//! here. When a dependent is analyzed, the resolver hands back its direct
//! dependencies' already-computed providers; nothing is re-derived.

use crate::analysis::AnalyzedLibrary;
use crate::error::{BuildError, BuildResult};
use crate::label::Label;
use crate::provider::Dependency;
use crate::targets::{CcLibraryInfo, ObjcLibrary};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Tracks analyzed libraries, foreign libraries and failed targets
pub struct DependencyResolver {
    libraries: HashMap<Label, Arc<AnalyzedLibrary>>,
    foreign: HashMap<Label, Arc<CcLibraryInfo>>,
    failed: HashSet<Label>,
}

impl DependencyResolver {
    /// Create a new empty resolver
    pub fn new() -> Self {
        Self {
            libraries: HashMap::new(),
            foreign: HashMap::new(),
            failed: HashSet::new(),
        }
    }

    /// Register an analyzed library
    pub fn register_library(&mut self, library: Arc<AnalyzedLibrary>) {
        self.libraries.insert(library.label.clone(), library);
    }

    /// Register a foreign compiled library
    pub fn register_foreign(&mut self, info: Arc<CcLibraryInfo>) {
        self.foreign.insert(info.label.clone(), info);
    }

    /// Record that a target failed analysis
    pub fn register_failure(&mut self, label: Label) {
        self.failed.insert(label);
    }

    /// Direct dependencies of `target`, in declaration order
    ///
    /// A failed dependency is a hard failure, never an empty contribution.
    pub fn resolve(&self, target: &ObjcLibrary) -> BuildResult<Vec<Dependency>> {
        target
            .deps
            .iter()
            .map(|dep| {
                if let Some(library) = self.libraries.get(dep) {
                    Ok(library.as_dependency())
                } else if let Some(info) = self.foreign.get(dep) {
                    Ok(Dependency::Cc(Arc::clone(info)))
                } else if self.failed.contains(dep) {
                    Err(BuildError::DependencyFailed {
                        target: target.label.clone(),
                        dependency: dep.clone(),
                    })
                } else {
                    Err(BuildError::dependency_not_found(&target.label, dep))
                }
            })
            .collect()
    }

    /// Check if a library has been registered
    pub fn has_library(&self, label: &Label) -> bool {
        self.libraries.contains_key(label)
    }

    /// Get a registered library
    pub fn get_library(&self, label: &Label) -> Option<&Arc<AnalyzedLibrary>> {
        self.libraries.get(label)
    }

    /// Whether a target failed analysis
    pub fn has_failed(&self, label: &Label) -> bool {
        self.failed.contains(label)
    }
}

impl Default for DependencyResolver {
    fn default() -> Self {
        Self::new()
    }
}
