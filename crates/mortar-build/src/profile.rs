//! Compilation profiles
//!
//! Flag sets selected by compilation mode and platform, plus the fixed
//! defaults every Objective-C compile action starts with.

use crate::file_type::Language;
use crate::platform::PlatformFacts;
use mortar_config::CompilationMode;

/// Warnings enabled for every compilation
pub const DEFAULT_WARNINGS: &[&str] = &[
    "-Wshorten-64-to-32",
    "-Wbool-conversion",
    "-Wconstant-conversion",
    "-Wduplicate-method-match",
    "-Wempty-body",
    "-Wenum-conversion",
    "-Wint-conversion",
    "-Wunreachable-code",
    "-Wmismatched-return-types",
    "-Wundeclared-selector",
    "-Wuninitialized",
    "-Wunused-function",
    "-Wunused-variable",
];

/// Flags added only when targeting a simulator
pub const SIMULATOR_FLAGS: &[&str] = &[
    "-fexceptions",
    "-fasm-blocks",
    "-fobjc-abi-version=2",
    "-fobjc-legacy-dispatch",
];

/// C++ standard library selection for Objective-C++ and C++ sources
pub const CXX_FLAGS: &[&str] = &["-stdlib=libc++", "-std=gnu++11"];

pub const DBG_FLAGS: &[&str] = &[
    "-O0",
    "-DDEBUG=1",
    "-fstack-protector",
    "-fstack-protector-all",
    "-g",
];

pub const FASTBUILD_FLAGS: &[&str] = &["-O0", "-DDEBUG=1"];

pub const OPT_FLAGS: &[&str] = &[
    "-Os",
    "-DNDEBUG=1",
    "-Wno-unused-variable",
    "-Winit-self",
    "-Wno-extra",
];

/// Flag set for one compilation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Profile {
    pub mode: CompilationMode,
    /// Keep debug symbols in optimized builds
    pub generate_dsym: bool,
}

impl Profile {
    pub fn new(mode: CompilationMode, generate_dsym: bool) -> Self {
        Self {
            mode,
            generate_dsym,
        }
    }

    /// Mode-specific flags; exactly one mode's set is ever emitted
    pub fn flags(&self) -> Vec<&'static str> {
        match self.mode {
            CompilationMode::Dbg => DBG_FLAGS.to_vec(),
            CompilationMode::Fastbuild => FASTBUILD_FLAGS.to_vec(),
            CompilationMode::Opt => {
                let mut flags = OPT_FLAGS.to_vec();
                flags.push(if self.generate_dsym { "-g" } else { "-g0" });
                flags
            }
        }
    }
}

/// Flags every compilation on this platform begins with, up to and
/// including the mode and simulator flags
pub fn base_flags(facts: &PlatformFacts, language: Language) -> Vec<String> {
    let mut flags: Vec<String> = DEFAULT_WARNINGS.iter().map(|f| f.to_string()).collect();

    flags.push(facts.platform.os_define().to_string());
    flags.push("-fno-autolink".to_string());

    if language.is_cxx() {
        flags.extend(CXX_FLAGS.iter().map(|f| f.to_string()));
    }

    let profile = Profile::new(facts.compilation_mode, facts.generate_dsym);
    flags.extend(profile.flags().into_iter().map(String::from));

    if facts.platform.is_simulator() {
        flags.extend(SIMULATOR_FLAGS.iter().map(|f| f.to_string()));
    }

    flags
}
