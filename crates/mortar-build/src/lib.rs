//! Action planning for Objective-C library targets
//!
//! Turns `objc_library` declarations into a graph of planned actions for an
//! external executor:
//! - Declaration validation
//! - Transitive provider propagation
//! - Compile, module map and archive actions
//! - Platform and toolchain resolution
//! - Compiler dependency-file header pruning
//! - Parallel, cached analysis of whole workspaces

pub mod action;
pub mod analysis;
pub mod archive;
pub mod build_order;
pub mod builder;
pub mod cache;
pub mod compile;
pub mod dotd;
pub mod error;
pub mod file_type;
pub mod label;
pub mod module_map;
pub mod module_resolver;
pub mod platform;
pub mod profile;
pub mod provider;
pub mod targets;
pub mod toolchain;
pub mod validation;

// Re-export main types
pub use action::{Action, FileWrite};
pub use analysis::{analyze, AnalyzedLibrary};
pub use archive::{ArchivePlan, FullyLinkedPlan};
pub use build_order::TargetGraph;
pub use builder::{BuildConfig, BuildStats, Builder, TargetFailure, WorkspacePlan};
pub use cache::{AnalysisCache, CacheStats, ConfigFingerprint};
pub use compile::{CompilationPlanner, CompilePlanEntry};
pub use dotd::{DotdError, HeaderDiscovery};
pub use error::{BuildError, BuildResult};
pub use file_type::{FileKind, Language};
pub use label::Label;
pub use module_map::ModuleMap;
pub use module_resolver::DependencyResolver;
pub use platform::{ApplePlatform, PlatformFacts};
pub use profile::Profile;
pub use provider::{Dependency, IncludePath, ProviderKey, ProviderSet};
pub use targets::{CcLibraryInfo, ObjcLibrary, ResourceAttributes};
pub use toolchain::{ToolchainRegistry, XcodeToolchain};
pub use validation::{Diagnostic, Severity, ValidationPolicy};

// Re-export configuration for convenience
pub use mortar_config::BuildOptions;
