//! Single-target analysis
//!
//! Validation, provider propagation, module map, compile and archive planning
//! for one declaration, given its dependencies' already-merged providers.

use crate::action::{Action, FileWrite};
use crate::archive::{self, ArchivePlan, FullyLinkedPlan};
use crate::compile::{expand_make_variables, CompilationPlanner, CompilePlanEntry};
use crate::error::BuildResult;
use crate::label::Label;
use crate::module_map::{self, ModuleMap};
use crate::platform::PlatformFacts;
use crate::provider::{self, CoptGroup, Dependency, IncludePath, ProviderSet};
use crate::targets::ObjcLibrary;
use crate::validation::{self, Diagnostic, ValidationPolicy, ASSET_CATALOG_CONTAINERS};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Everything planned for one target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzedLibrary {
    pub label: Label,
    /// Merged providers exposed to dependents
    pub providers: Arc<ProviderSet>,
    pub module_map: ModuleMap,
    pub compiles: Vec<CompilePlanEntry>,
    pub archive: Option<ArchivePlan>,
    pub fully_linked: Option<FullyLinkedPlan>,
    /// Non-fatal declaration findings
    pub warnings: Vec<Diagnostic>,
}

impl AnalyzedLibrary {
    /// This target as a dependency of another
    pub fn as_dependency(&self) -> Dependency {
        Dependency::Objc {
            label: self.label.clone(),
            providers: Arc::clone(&self.providers),
        }
    }

    /// Every tool action, in planning order
    pub fn actions(&self) -> Vec<&Action> {
        self.compiles
            .iter()
            .map(|entry| &entry.action)
            .chain(self.archive.iter().map(|plan| &plan.action))
            .chain(self.fully_linked.iter().map(|plan| &plan.action))
            .collect()
    }

    /// Every generated file
    pub fn file_writes(&self) -> Vec<FileWrite> {
        self.module_map
            .write_action()
            .into_iter()
            .chain(self.archive.iter().map(|plan| plan.objlist.clone()))
            .collect()
    }

    /// Compile entry whose object file is named `object_name`
    pub fn compile_for(&self, object_name: &str) -> Option<&CompilePlanEntry> {
        self.compiles.iter().find(|entry| {
            entry
                .object
                .file_name()
                .is_some_and(|name| name == object_name)
        })
    }
}

/// Analyze one target against its direct dependencies, in declaration order
pub fn analyze(
    target: &ObjcLibrary,
    dependencies: &[Dependency],
    facts: &PlatformFacts,
) -> BuildResult<AnalyzedLibrary> {
    let policy = ValidationPolicy {
        disable_resources: facts.disable_resources,
    };
    let warnings = validation::check(target, policy)?;
    for warning in &warnings {
        warn!(target = %target.label, attribute = %warning.attribute, "{}", warning.message);
    }

    let module_map = module_map::generate(target, &facts.genfiles_dir);
    let own_archive = target
        .has_objects()
        .then(|| archive::archive_path(&target.label, facts));

    let own = own_contribution(target, own_archive.as_ref(), &module_map, facts);
    let providers = provider::compute_providers(own, dependencies);

    let mut planner = CompilationPlanner::new(target, &providers, facts);
    if facts.enable_module_maps {
        planner = planner.with_module_map(&module_map);
    }
    let compiles = planner.plan();

    let archive = archive::plan_archive(target, &compiles, facts);
    let fully_linked =
        archive::plan_fully_linked(&target.label, own_archive.as_ref(), &providers, facts);

    debug!(
        target = %target.label,
        sources = compiles.len(),
        actions = compiles.len()
            + usize::from(archive.is_some())
            + usize::from(fully_linked.is_some()),
        "planned library"
    );

    Ok(AnalyzedLibrary {
        label: target.label.clone(),
        providers: Arc::new(providers),
        module_map,
        compiles,
        archive,
        fully_linked,
        warnings,
    })
}

/// A target's own values for every provider key
pub fn own_contribution(
    target: &ObjcLibrary,
    own_archive: Option<&PathBuf>,
    module_map: &ModuleMap,
    facts: &PlatformFacts,
) -> ProviderSet {
    let label = &target.label;
    let exec = |files: &[PathBuf]| -> Vec<PathBuf> {
        files.iter().map(|file| label.exec_path(file)).collect()
    };

    let includes = target.includes.iter().flat_map(|include| {
        let rooted = normalize(&label.exec_path(include));
        [
            IncludePath::Angle(rooted.clone()),
            IncludePath::Angle(facts.genfiles_dir.join(rooted)),
        ]
    });
    let defines = target
        .defines
        .iter()
        .map(|define| expand_make_variables(define, &facts.cpu));
    let copts = (!target.copts.is_empty()).then(|| CoptGroup {
        owner: label.clone(),
        flags: target.copts.clone(),
    });

    let resources = &target.resources;
    let asset_catalogs = exec(resources.asset_catalogs.as_deref().unwrap_or_default());
    let xcassets_dirs = provider::containers(
        asset_catalogs.iter().map(PathBuf::as_path),
        ASSET_CATALOG_CONTAINERS,
    );
    let general_resources = resources
        .resources
        .iter()
        .chain(resources.structured_resources.iter())
        .flat_map(|files| exec(files));

    ProviderSet::new()
        .with_headers(exec(&target.hdrs))
        .with_libraries(own_archive.cloned())
        .with_sdk_frameworks(target.sdk_frameworks.iter().cloned())
        .with_weak_sdk_frameworks(target.weak_sdk_frameworks.iter().cloned())
        .with_sdk_dylibs(target.sdk_dylibs.iter().cloned())
        .with_defines(defines)
        .with_includes(includes)
        .with_copts(copts)
        .with_module_maps([module_map.path.clone()])
        .with_asset_catalogs(asset_catalogs)
        .with_xcassets_dirs(xcassets_dirs)
        .with_xcdatamodels(exec(resources.datamodels.as_deref().unwrap_or_default()))
        .with_storyboards(exec(resources.storyboards.as_deref().unwrap_or_default()))
        .with_strings(exec(resources.strings.as_deref().unwrap_or_default()))
        .with_xibs(exec(resources.xibs.as_deref().unwrap_or_default()))
        .with_general_resource_files(general_resources)
}

/// Lexically resolve `.` and `..` (`lib/../third_party/foo` -> `third_party/foo`)
fn normalize(path: &Path) -> PathBuf {
    let mut parts: Vec<Component> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }
    parts.iter().collect()
}
