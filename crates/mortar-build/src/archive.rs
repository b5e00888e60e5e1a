//! Archive planning
use crate::action::{Action, FileWrite};
use crate::compile::CompilePlanEntry;
use crate::label::Label;
use crate::platform::PlatformFacts;
use crate::provider::ProviderSet;
use crate::targets::ObjcLibrary;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const ARCHIVE_MNEMONIC: &str = "ObjcArchive";
pub const FULLY_LINK_MNEMONIC: &str = "ObjcFullyLink";

/// Static library of one target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivePlan {
    /// `lib<name>.a`
    pub archive: PathBuf,
    /// Objects in source order, then precompiled objects
    pub inputs: Vec<PathBuf>,
    /// Newline-separated list of `inputs`, passed with `-filelist`
    pub objlist: FileWrite,
    pub action: Action,
}

/// Aggregate archive of a target and its transitive libraries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullyLinkedPlan {
    pub archive: PathBuf,
    pub inputs: Vec<PathBuf>,
    pub action: Action,
}

/// Output path of a target's archive
pub fn archive_path(label: &Label, facts: &PlatformFacts) -> PathBuf {
    facts
        .bin_dir
        .join(label.package_path())
        .join(format!("lib{}.a", label.name()))
}

/// Plan the static archive, or `None` for a target with no objects
pub fn plan_archive(
    target: &ObjcLibrary,
    compiles: &[CompilePlanEntry],
    facts: &PlatformFacts,
) -> Option<ArchivePlan> {
    let inputs: Vec<PathBuf> = compiles
        .iter()
        .map(|entry| entry.object.clone())
        .chain(
            target
                .precompiled_objects()
                .map(|object| target.label.exec_path(object)),
        )
        .collect();
    if inputs.is_empty() {
        return None;
    }

    let label = &target.label;
    let archive = archive_path(label, facts);
    let objlist_path = facts
        .bin_dir
        .join(label.package_path())
        .join(format!("{}-archive.objlist", label.name()));
    let objlist = FileWrite::new(
        objlist_path.clone(),
        inputs
            .iter()
            .map(|p| format!("{}\n", p.display()))
            .collect::<String>(),
    );

    let arguments = vec![
        "-static".to_string(),
        "-filelist".to_string(),
        objlist_path.display().to_string(),
        "-arch_only".to_string(),
        facts.arch.clone(),
        "-syslibroot".to_string(),
        facts.sdk_root.clone(),
        "-o".to_string(),
        archive.display().to_string(),
    ];
    let action = Action::new(ARCHIVE_MNEMONIC, &facts.archiver)
        .with_arguments(arguments)
        .with_inputs(inputs.iter().cloned().chain(std::iter::once(objlist_path)))
        .with_outputs(vec![archive.clone()]);

    Some(ArchivePlan {
        archive,
        inputs,
        objlist,
        action,
    })
}

/// Plan the fully linked archive: own archive, then the merged LIBRARY set,
/// each once. `None` when there is no library to link.
pub fn plan_fully_linked(
    label: &Label,
    own_archive: Option<&PathBuf>,
    providers: &ProviderSet,
    facts: &PlatformFacts,
) -> Option<FullyLinkedPlan> {
    let inputs: IndexSet<PathBuf> = own_archive
        .into_iter()
        .chain(providers.library().iter())
        .cloned()
        .collect();
    if inputs.is_empty() {
        return None;
    }
    let archive = facts
        .bin_dir
        .join(label.package_path())
        .join(format!("{}_fully_linked.a", label.name()));

    let mut arguments = vec![
        "-static".to_string(),
        "-arch_only".to_string(),
        facts.arch.clone(),
        "-syslibroot".to_string(),
        facts.sdk_root.clone(),
        "-o".to_string(),
        archive.display().to_string(),
    ];
    arguments.extend(inputs.iter().map(|p| p.display().to_string()));

    let action = Action::new(FULLY_LINK_MNEMONIC, &facts.archiver)
        .with_arguments(arguments)
        .with_inputs(inputs.iter().cloned())
        .with_outputs(vec![archive.clone()]);

    Some(FullyLinkedPlan {
        archive,
        inputs: inputs.into_iter().collect(),
        action,
    })
}
