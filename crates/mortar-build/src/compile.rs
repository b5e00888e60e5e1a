//! Compilation planning
//!
//! One compile action per compilable source. Argument order is fixed:
//!
//! 1. default warnings, default compiler flags, C++ flags, mode flags,
//!    simulator flags
//! 2. min-OS flag, `-arch`, `-isysroot`, framework search roots
//! 3. include search paths, genfiles `-iquote`, `-include <pch>`
//! 4. module map flags, coverage flags, bitcode flag
//! 5. defines, configuration objccopts, dependency copts, own copts,
//!    modules cache path, ARC flag
//! 6. `-c <src> -o <obj> -MD -MF <dotd>`

use crate::action::Action;
use crate::dotd::HeaderDiscovery;
use crate::error::BuildResult;
use crate::file_type::{FileKind, Language};
use crate::module_map::ModuleMap;
use crate::platform::PlatformFacts;
use crate::profile;
use crate::provider::ProviderSet;
use crate::targets::ObjcLibrary;
use crate::validation::MODULES_CACHE_PATH_COPT;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const COMPILE_MNEMONIC: &str = "ObjcCompile";

/// Make variable expanded in defines and copts
pub const TARGET_CPU_VARIABLE: &str = "$(TARGET_CPU)";

/// Directory under genfiles holding the shared modules cache
pub const MODULES_CACHE_DIR: &str = "_objc_module_cache";

/// A planned compilation of one source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilePlanEntry {
    /// Exec path of the source
    pub source: PathBuf,
    pub language: Language,
    /// Declared in `srcs` (ARC) rather than `non_arc_srcs`
    pub arc: bool,
    pub object: PathBuf,
    pub dotd: PathBuf,
    pub action: Action,
    /// Input refinement applied once the action has run
    pub discovery: HeaderDiscovery,
}

impl CompilePlanEntry {
    /// The action with inputs narrowed to what the `.d` file lists
    pub fn refine(&self, dotd_contents: &str) -> BuildResult<Action> {
        self.discovery.refine(&self.action, &self.source, dotd_contents)
    }
}

/// Plans compile actions for one target
pub struct CompilationPlanner<'a> {
    target: &'a ObjcLibrary,
    providers: &'a ProviderSet,
    facts: &'a PlatformFacts,
    module_map: Option<&'a ModuleMap>,
}

impl<'a> CompilationPlanner<'a> {
    pub fn new(
        target: &'a ObjcLibrary,
        providers: &'a ProviderSet,
        facts: &'a PlatformFacts,
    ) -> Self {
        Self {
            target,
            providers,
            facts,
            module_map: None,
        }
    }

    /// Module map referenced when module maps are enabled
    pub fn with_module_map(mut self, module_map: &'a ModuleMap) -> Self {
        self.module_map = Some(module_map);
        self
    }

    /// One entry per compilable source, in declaration order
    pub fn plan(&self) -> Vec<CompilePlanEntry> {
        let sources = self.target.compiled_sources();
        let objects = object_paths(self.target, &self.facts.bin_dir);

        sources
            .into_iter()
            .zip(objects)
            .filter_map(|((source, arc), object)| {
                let language = FileKind::of(source).language()?;
                Some(self.plan_source(source, arc, language, object))
            })
            .collect()
    }

    fn plan_source(
        &self,
        source: &Path,
        arc: bool,
        language: Language,
        object: PathBuf,
    ) -> CompilePlanEntry {
        let source = self.target.label.exec_path(source);
        let dotd = object.with_extension("d");

        let arguments = self.arguments(&source, language, arc, &object, &dotd);
        let action = Action::new(COMPILE_MNEMONIC, &self.facts.compiler)
            .with_arguments(arguments)
            .with_inputs(self.inputs(&source))
            .with_outputs(vec![object.clone(), dotd.clone()])
            .with_env(self.facts.compile_env());

        CompilePlanEntry {
            source,
            language,
            arc,
            object,
            dotd,
            action,
            discovery: HeaderDiscovery::new(self.facts.use_dotd_pruning),
        }
    }

    /// Full argument list for one source
    pub fn arguments(
        &self,
        source: &Path,
        language: Language,
        arc: bool,
        object: &Path,
        dotd: &Path,
    ) -> Vec<String> {
        let facts = self.facts;
        let mut args = profile::base_flags(facts, language);

        args.push(facts.min_os_flag());
        args.push("-arch".to_string());
        args.push(facts.arch.clone());
        args.push("-isysroot".to_string());
        args.push(facts.sdk_root.clone());
        args.extend(facts.framework_roots.iter().map(|root| format!("-F{}", root)));

        args.extend(self.providers.include().iter().flat_map(|i| i.to_args()));
        args.push("-iquote".to_string());
        args.push(facts.genfiles_dir.display().to_string());

        if let Some(pch) = &self.target.pch {
            args.push("-include".to_string());
            args.push(self.target.label.exec_path(pch).display().to_string());
        }

        if facts.enable_module_maps {
            if let Some(module_map) = self.module_map {
                args.extend(module_map.compile_flags());
            }
        }

        if let Some(coverage) = facts.coverage {
            args.extend(coverage.compile_flags().iter().map(|f| f.to_string()));
        }

        if let Some(flag) = facts.bitcode.compile_flag() {
            args.push(flag.to_string());
        }

        args.extend(
            self.providers
                .define()
                .iter()
                .map(|define| format!("-D{}", self.expand(define))),
        );

        args.extend(facts.objccopts.iter().map(|copt| self.expand(copt)));
        for group in self.providers.dependency_copts(&self.target.label) {
            args.extend(self.user_copts(&group.flags));
        }
        args.extend(self.user_copts(&self.target.copts));

        if self.target.copts.iter().any(|copt| copt == "-fmodules") {
            args.push(format!(
                "{}={}",
                MODULES_CACHE_PATH_COPT,
                facts.genfiles_dir.join(MODULES_CACHE_DIR).display()
            ));
        }

        if language.uses_arc() {
            args.push(if arc { "-fobjc-arc" } else { "-fno-objc-arc" }.to_string());
        }

        args.push("-c".to_string());
        args.push(source.display().to_string());
        args.push("-o".to_string());
        args.push(object.display().to_string());
        args.push("-MD".to_string());
        args.push("-MF".to_string());
        args.push(dotd.display().to_string());

        args
    }

    /// Declared inputs: source, transitive headers, private headers, pch and
    /// module maps when enabled
    pub fn inputs(&self, source: &Path) -> IndexSet<PathBuf> {
        let mut inputs = IndexSet::new();
        inputs.insert(source.to_path_buf());
        inputs.extend(self.providers.header().iter().cloned());
        inputs.extend(
            self.target
                .private_headers()
                .map(|hdr| self.target.label.exec_path(hdr)),
        );
        if let Some(pch) = &self.target.pch {
            inputs.insert(self.target.label.exec_path(pch));
        }
        if self.facts.enable_module_maps {
            if let Some(module_map) = self.module_map {
                inputs.insert(module_map.path.clone());
            }
            inputs.extend(self.providers.module_map().iter().cloned());
        }
        inputs
    }

    fn expand(&self, value: &str) -> String {
        expand_make_variables(value, &self.facts.cpu)
    }

    /// Expanded user copts without the modules cache path the planner owns
    fn user_copts<'b>(&'b self, copts: &'b [String]) -> impl Iterator<Item = String> + 'b {
        copts
            .iter()
            .filter(|copt| !copt.starts_with(MODULES_CACHE_PATH_COPT))
            .map(move |copt| self.expand(copt))
    }
}

/// Substitute `$(TARGET_CPU)`
pub fn expand_make_variables(value: &str, cpu: &str) -> String {
    value.replace(TARGET_CPU_VARIABLE, cpu)
}

/// Object file paths for a target's compiled sources, in
/// [`ObjcLibrary::compiled_sources`] order
///
/// Objects live at `<bin>/<package>/_objs/<name>/<arc|non_arc>/<stem>.o`.
/// When a stem repeats within one bucket, every occurrence gets a numbered
/// directory (`arc/0/a.o`, `arc/1/a.o`) in declaration order.
pub fn object_paths(target: &ObjcLibrary, bin_dir: &Path) -> Vec<PathBuf> {
    let sources = target.compiled_sources();
    let objs_dir = bin_dir
        .join(target.label.package_path())
        .join("_objs")
        .join(target.label.name());

    let stem = |path: &Path| -> String {
        path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    };

    let mut counts: HashMap<(bool, String), usize> = HashMap::new();
    for (source, arc) in &sources {
        *counts.entry((*arc, stem(source))).or_default() += 1;
    }

    let mut next_index: HashMap<(bool, String), usize> = HashMap::new();
    sources
        .iter()
        .map(|(source, arc)| {
            let key = (*arc, stem(source));
            let bucket = objs_dir.join(if *arc { "arc" } else { "non_arc" });
            let dir = if counts.get(&key).copied().unwrap_or_default() > 1 {
                let index = next_index.entry(key.clone()).or_default();
                let dir = bucket.join(index.to_string());
                *index += 1;
                dir
            } else {
                bucket
            };
            dir.join(format!("{}.o", key.1))
        })
        .collect()
}
