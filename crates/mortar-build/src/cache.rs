//! Analysis cache
//!
//! Analyzed libraries are cached per (label, configuration fingerprint). An
//! entry is only reused when the declaration and its dependencies' providers
//! hash to the same digest as when it was stored.

use crate::analysis::AnalyzedLibrary;
use crate::error::{BuildError, BuildResult};
use crate::label::Label;
use crate::platform::PlatformFacts;
use crate::provider::Dependency;
use crate::targets::ObjcLibrary;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::warn;

/// SHA-256 of a configuration's resolved facts and toolchain identity
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConfigFingerprint(String);

impl ConfigFingerprint {
    pub fn new(facts: &PlatformFacts, toolchain_identity: &str) -> BuildResult<Self> {
        let mut hasher = Sha256::new();
        update_json(&mut hasher, facts)?;
        hasher.update(toolchain_identity.as_bytes());
        Ok(Self(format!("{:x}", hasher.finalize())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Digest of everything a single analysis reads besides the configuration
pub fn inputs_digest(target: &ObjcLibrary, dependencies: &[Dependency]) -> BuildResult<String> {
    let mut hasher = Sha256::new();
    update_json(&mut hasher, target)?;
    for dependency in dependencies {
        match dependency {
            Dependency::Objc { label, providers } => {
                update_json(&mut hasher, label)?;
                update_json(&mut hasher, providers.as_ref())?;
            }
            Dependency::Cc(info) => update_json(&mut hasher, info.as_ref())?,
        }
    }
    Ok(format!("{:x}", hasher.finalize()))
}

fn update_json<T: Serialize + ?Sized>(hasher: &mut Sha256, value: &T) -> BuildResult<()> {
    let bytes = serde_json::to_vec(value).map_err(|error| BuildError::Cache(error.to_string()))?;
    hasher.update(&bytes);
    hasher.update([0u8]);
    Ok(())
}

#[derive(Debug, Clone)]
struct CacheEntry {
    digest: String,
    library: Arc<AnalyzedLibrary>,
}

/// Cache hit and miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: usize,
    pub misses: usize,
}

/// Thread-safe analysis cache shared across planning runs
#[derive(Debug, Default)]
pub struct AnalysisCache {
    entries: RwLock<HashMap<(Label, ConfigFingerprint), CacheEntry>>,
    stats: RwLock<CacheStats>,
}

impl AnalysisCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached analysis for `label` if its inputs are unchanged
    pub fn get(
        &self,
        label: &Label,
        fingerprint: &ConfigFingerprint,
        digest: &str,
    ) -> Option<Arc<AnalyzedLibrary>> {
        let hit = read_lock(&self.entries)
            .get(&(label.clone(), fingerprint.clone()))
            .filter(|entry| entry.digest == digest)
            .map(|entry| Arc::clone(&entry.library));

        let mut stats = write_lock(&self.stats);
        if hit.is_some() {
            stats.hits += 1;
        } else {
            stats.misses += 1;
        }
        hit
    }

    /// Store an analysis
    pub fn insert(
        &self,
        fingerprint: &ConfigFingerprint,
        digest: String,
        library: Arc<AnalyzedLibrary>,
    ) {
        write_lock(&self.entries).insert(
            (library.label.clone(), fingerprint.clone()),
            CacheEntry { digest, library },
        );
    }

    /// Drop every entry
    pub fn clear(&self) {
        write_lock(&self.entries).clear();
    }

    pub fn stats(&self) -> CacheStats {
        let mut stats = *read_lock(&self.stats);
        stats.entries = read_lock(&self.entries).len();
        stats
    }
}

// Writes are single inserts or clears, so a poisoned map is still consistent
fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| {
        warn!("analysis cache lock poisoned, recovering");
        poisoned.into_inner()
    })
}

fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| {
        warn!("analysis cache lock poisoned, recovering");
        poisoned.into_inner()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze;
    use crate::platform;
    use crate::provider::ProviderSet;
    use crate::toolchain::XcodeToolchain;
    use mortar_config::BuildOptions;
    use pretty_assertions::assert_eq;
    use std::thread;

    fn facts() -> PlatformFacts {
        platform::resolve(&BuildOptions::default(), &XcodeToolchain::default()).unwrap()
    }

    fn library(name: &str) -> Arc<AnalyzedLibrary> {
        let target = ObjcLibrary::new(Label::parse(name).unwrap()).with_srcs(["a.m"]);
        Arc::new(analyze(&target, &[], &facts()).unwrap())
    }

    #[test]
    fn test_fingerprint_tracks_toolchain_identity() {
        let facts = facts();
        let first = ConfigFingerprint::new(&facts, "xcode-15").unwrap();
        assert_eq!(first, ConfigFingerprint::new(&facts, "xcode-15").unwrap());
        assert_ne!(first, ConfigFingerprint::new(&facts, "xcode-16").unwrap());
    }

    #[test]
    fn test_inputs_digest_tracks_dependency_providers() {
        let target = ObjcLibrary::new(Label::parse("//x:x").unwrap());
        let dep = |defines: &[&str]| Dependency::Objc {
            label: Label::parse("//dep:dep").unwrap(),
            providers: Arc::new(ProviderSet::new().with_defines(defines.iter().copied())),
        };

        let before = inputs_digest(&target, &[dep(&["A"])]).unwrap();
        assert_eq!(before, inputs_digest(&target, &[dep(&["A"])]).unwrap());
        assert_ne!(before, inputs_digest(&target, &[dep(&["B"])]).unwrap());
    }

    #[test]
    fn test_get_counts_hits_and_misses() {
        let cache = AnalysisCache::new();
        let fingerprint = ConfigFingerprint::new(&facts(), "xcode").unwrap();
        let label = Label::parse("//x:x").unwrap();

        assert!(cache.get(&label, &fingerprint, "d1").is_none());
        cache.insert(&fingerprint, "d1".to_string(), library("//x:x"));
        assert!(cache.get(&label, &fingerprint, "d1").is_some());
        assert!(cache.get(&label, &fingerprint, "d2").is_none());

        assert_eq!(
            cache.stats(),
            CacheStats {
                entries: 1,
                hits: 1,
                misses: 2,
            }
        );
        cache.clear();
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn test_poisoned_cache_keeps_working() {
        let cache = Arc::new(AnalysisCache::new());
        let fingerprint = ConfigFingerprint::new(&facts(), "xcode").unwrap();
        cache.insert(&fingerprint, "d".to_string(), library("//x:x"));

        let poisoner = Arc::clone(&cache);
        let outcome = thread::spawn(move || {
            let _entries = poisoner.entries.write().unwrap();
            let _stats = poisoner.stats.write().unwrap();
            panic!("analysis panicked while holding the cache");
        })
        .join();
        assert!(outcome.is_err());
        assert!(cache.entries.is_poisoned());
        assert!(cache.stats.is_poisoned());

        let label = Label::parse("//x:x").unwrap();
        assert!(cache.get(&label, &fingerprint, "d").is_some());
        cache.insert(&fingerprint, "d".to_string(), library("//y:y"));
        assert_eq!(cache.stats().entries, 2);
        assert_eq!(cache.stats().hits, 1);

        cache.clear();
        assert_eq!(cache.stats().entries, 0);
    }
}
