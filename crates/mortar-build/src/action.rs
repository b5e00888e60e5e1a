/// Action descriptions handed to the execution engine
use crate::platform::REQUIRES_DARWIN;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// A tool invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Short kind name (`ObjcCompile`, `ObjcArchive`)
    pub mnemonic: String,
    pub executable: PathBuf,
    pub arguments: Vec<String>,
    /// Declared inputs, in a stable order
    pub inputs: IndexSet<PathBuf>,
    pub outputs: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub execution_requirements: BTreeSet<String>,
}

impl Action {
    /// Create an action that must run on a Darwin host
    pub fn new(mnemonic: impl Into<String>, executable: impl Into<PathBuf>) -> Self {
        let mut execution_requirements = BTreeSet::new();
        execution_requirements.insert(REQUIRES_DARWIN.to_string());
        Self {
            mnemonic: mnemonic.into(),
            executable: executable.into(),
            arguments: Vec::new(),
            inputs: IndexSet::new(),
            outputs: Vec::new(),
            env: BTreeMap::new(),
            execution_requirements,
        }
    }

    pub fn with_arguments(mut self, arguments: Vec<String>) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn with_inputs(mut self, inputs: impl IntoIterator<Item = PathBuf>) -> Self {
        self.inputs.extend(inputs);
        self
    }

    pub fn with_outputs(mut self, outputs: Vec<PathBuf>) -> Self {
        self.outputs = outputs;
        self
    }

    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Full command line, executable first
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.executable.display().to_string())
            .chain(self.arguments.iter().cloned())
            .collect()
    }
}

/// A generated file with known contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileWrite {
    pub output: PathBuf,
    pub content: String,
}

impl FileWrite {
    pub fn new(output: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            content: content.into(),
        }
    }
}
