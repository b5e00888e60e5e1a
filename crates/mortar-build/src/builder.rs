//! Workspace planning
//!
//! Evaluates a [`TargetGraph`] bottom-up: targets in one parallel group only
//! depend on earlier groups, so each group is analyzed concurrently with
//! rayon and registered before the next group starts.

use crate::analysis::{self, AnalyzedLibrary};
use crate::build_order::TargetGraph;
use crate::cache::{inputs_digest, AnalysisCache, ConfigFingerprint};
use crate::error::{BuildError, BuildResult};
use crate::label::Label;
use crate::module_resolver::DependencyResolver;
use crate::platform::{self, PlatformFacts};
use crate::toolchain::{ToolchainRegistry, XcodeToolchain};
use mortar_config::BuildOptions;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Planning configuration
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Analyze independent targets concurrently
    pub parallel: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self { parallel: true }
    }
}

/// Planning statistics
#[derive(Debug, Clone, Default)]
pub struct BuildStats {
    /// Number of library declarations
    pub total_targets: usize,
    /// Targets analyzed in this run
    pub analyzed: usize,
    /// Targets reused from the cache
    pub cached: usize,
    /// Targets that failed analysis
    pub failed: usize,
    /// Number of analysis groups
    pub parallel_groups: usize,
    pub total_time: Duration,
}

/// A target that failed analysis
#[derive(Debug, Serialize)]
pub struct TargetFailure {
    #[serde(skip)]
    pub error: BuildError,
    pub message: String,
}

impl TargetFailure {
    fn new(error: BuildError) -> Self {
        Self {
            message: error.to_string(),
            error,
        }
    }
}

/// The planned actions of a whole workspace
#[derive(Debug, Serialize)]
pub struct WorkspacePlan {
    pub facts: PlatformFacts,
    pub libraries: BTreeMap<Label, Arc<AnalyzedLibrary>>,
    pub failures: BTreeMap<Label, TargetFailure>,
    #[serde(skip)]
    pub stats: BuildStats,
}

impl WorkspacePlan {
    /// Analysis result of a library
    pub fn library(&self, label: &Label) -> Option<&AnalyzedLibrary> {
        self.libraries.get(label).map(Arc::as_ref)
    }

    /// Failure of a library
    pub fn failure(&self, label: &Label) -> Option<&BuildError> {
        self.failures.get(label).map(|failure| &failure.error)
    }

    /// Whether every library was planned
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Serialized plan for the execution engine
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Main planner for a workspace
pub struct Builder {
    options: BuildOptions,
    toolchain: Arc<dyn ToolchainRegistry>,
    config: BuildConfig,
    cache: Arc<AnalysisCache>,
}

impl Builder {
    /// Create a planner for the given options with the default Xcode toolchain
    pub fn new(options: BuildOptions) -> Self {
        Self {
            options,
            toolchain: Arc::new(XcodeToolchain::default()),
            config: BuildConfig::default(),
            cache: Arc::new(AnalysisCache::new()),
        }
    }

    /// Set the toolchain registry
    pub fn with_toolchain(mut self, toolchain: Arc<dyn ToolchainRegistry>) -> Self {
        self.toolchain = toolchain;
        self
    }

    /// Set planning configuration
    pub fn with_config(mut self, config: BuildConfig) -> Self {
        self.config = config;
        self
    }

    /// Enable/disable parallel analysis
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.config.parallel = parallel;
        self
    }

    /// Share an analysis cache between planners
    pub fn with_cache(mut self, cache: Arc<AnalysisCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Build options in use
    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Plan every library in the graph
    ///
    /// Configuration errors and dependency cycles abort planning. A target
    /// that fails analysis is recorded and its dependents fail with
    /// [`BuildError::DependencyFailed`].
    pub fn plan(&self, graph: &TargetGraph) -> BuildResult<WorkspacePlan> {
        let start = Instant::now();

        let facts = platform::resolve(&self.options, self.toolchain.as_ref())?;
        let fingerprint = ConfigFingerprint::new(&facts, &self.toolchain.identity())?;

        let groups = if self.config.parallel {
            graph.parallel_build_groups()?
        } else {
            graph
                .compute_build_order()?
                .into_iter()
                .map(|label| vec![label])
                .collect()
        };

        info!(
            targets = graph.len(),
            groups = groups.len(),
            cpu = %facts.cpu,
            mode = facts.compilation_mode.name(),
            "planning workspace"
        );

        let mut resolver = DependencyResolver::new();
        for info in graph.foreign_libraries().values() {
            resolver.register_foreign(Arc::new(info.clone()));
        }

        let mut libraries = BTreeMap::new();
        let mut failures = BTreeMap::new();
        let mut stats = BuildStats {
            total_targets: graph.len(),
            parallel_groups: groups.len(),
            ..BuildStats::default()
        };

        for (index, group) in groups.iter().enumerate() {
            debug!(group = index + 1, size = group.len(), "analyzing group");

            let analyze = |label: &Label| {
                (
                    label.clone(),
                    self.analyze_target(graph, &resolver, &facts, &fingerprint, label),
                )
            };
            let results: Vec<_> = if self.config.parallel {
                group.par_iter().map(analyze).collect()
            } else {
                group.iter().map(analyze).collect()
            };

            for (label, result) in results {
                match result {
                    Ok((library, cached)) => {
                        if cached {
                            stats.cached += 1;
                        } else {
                            stats.analyzed += 1;
                        }
                        resolver.register_library(Arc::clone(&library));
                        libraries.insert(label, library);
                    }
                    Err(error) => {
                        warn!(target = %label, %error, "analysis failed");
                        stats.failed += 1;
                        resolver.register_failure(label.clone());
                        failures.insert(label, TargetFailure::new(error));
                    }
                }
            }
        }

        stats.total_time = start.elapsed();
        info!(
            analyzed = stats.analyzed,
            cached = stats.cached,
            failed = stats.failed,
            "planning finished in {:.2}s",
            stats.total_time.as_secs_f64()
        );

        Ok(WorkspacePlan {
            facts,
            libraries,
            failures,
            stats,
        })
    }

    /// Analyze one target, reusing a cached result when its inputs match
    fn analyze_target(
        &self,
        graph: &TargetGraph,
        resolver: &DependencyResolver,
        facts: &PlatformFacts,
        fingerprint: &ConfigFingerprint,
        label: &Label,
    ) -> BuildResult<(Arc<AnalyzedLibrary>, bool)> {
        let target = graph
            .get_library(label)
            .ok_or_else(|| BuildError::dependency_not_found(label, label))?;
        let dependencies = resolver.resolve(target)?;

        let digest = inputs_digest(target, &dependencies)?;
        if let Some(library) = self.cache.get(label, fingerprint, &digest) {
            debug!(target = %label, "reusing cached analysis");
            return Ok((library, true));
        }

        let library = Arc::new(analysis::analyze(target, &dependencies, facts)?);
        self.cache.insert(fingerprint, digest, Arc::clone(&library));
        Ok((library, false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_config_default() {
        let config = BuildConfig::default();
        assert!(config.parallel);
    }

    #[test]
    fn test_build_stats_default() {
        let stats = BuildStats::default();
        assert_eq!(stats.total_targets, 0);
        assert_eq!(stats.analyzed, 0);
        assert_eq!(stats.parallel_groups, 0);
    }

    #[test]
    fn test_empty_graph_plans_nothing() {
        let plan = Builder::new(BuildOptions::default())
            .plan(&TargetGraph::new())
            .unwrap();
        assert!(plan.libraries.is_empty());
        assert!(plan.is_success());
    }
}
