//! Property-based tests for provider propagation
//!
//! Merged provider values must equal a first-occurrence dedup of the
//! concatenation in each key's merge order, for any dependency shape.

use mortar_build::provider::{compute_providers, Dependency, ProviderKey, ProviderSet};
use mortar_build::{analyze, BuildOptions, Label, ObjcLibrary, XcodeToolchain};
use proptest::collection::vec;
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;

fn dep(index: usize, providers: ProviderSet) -> Dependency {
    Dependency::Objc {
        label: Label::parse(&format!("//dep:d{}", index)).unwrap(),
        providers: Arc::new(providers),
    }
}

fn dedup(values: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|value| seen.insert(value.clone()))
        .collect()
}

fn names() -> impl Strategy<Value = Vec<String>> {
    vec("[A-D](=[0-2])?", 0..6)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Defines list the target's own values first
    #[test]
    fn defines_follow_link_order(own in names(), deps in vec(names(), 0..4)) {
        let dependencies: Vec<Dependency> = deps
            .iter()
            .enumerate()
            .map(|(i, defines)| dep(i, ProviderSet::new().with_defines(defines.clone())))
            .collect();
        let merged = compute_providers(ProviderSet::new().with_defines(own.clone()), &dependencies);

        let expected = dedup(own.into_iter().chain(deps.into_iter().flatten()));
        prop_assert_eq!(merged.values(ProviderKey::Define), expected);
    }

    /// Frameworks list dependencies first, in declaration order
    #[test]
    fn frameworks_follow_build_order(own in names(), deps in vec(names(), 0..4)) {
        let dependencies: Vec<Dependency> = deps
            .iter()
            .enumerate()
            .map(|(i, frameworks)| dep(i, ProviderSet::new().with_sdk_frameworks(frameworks.clone())))
            .collect();
        let merged =
            compute_providers(ProviderSet::new().with_sdk_frameworks(own.clone()), &dependencies);

        let expected = dedup(deps.into_iter().flatten().chain(own));
        prop_assert_eq!(merged.values(ProviderKey::SdkFramework), expected);
    }

    /// No key ever holds a duplicate, however deep the chain
    #[test]
    fn chains_never_duplicate(layers in vec(names(), 1..6)) {
        let mut providers = ProviderSet::new();
        for (i, layer) in layers.iter().enumerate() {
            let own = ProviderSet::new()
                .with_defines(layer.clone())
                .with_sdk_dylibs(layer.clone())
                .with_libraries([format!("lib{}.a", i)]);
            providers = compute_providers(own, &[dep(i, providers)]);
        }

        for key in ProviderKey::ALL {
            let values = providers.values(key);
            let unique: HashSet<&String> = values.iter().collect();
            prop_assert_eq!(unique.len(), values.len(), "duplicate under {}", key);
        }
        prop_assert_eq!(providers.values(ProviderKey::Library).len(), layers.len());
    }

    /// Planning the same declaration twice yields identical actions
    #[test]
    fn analysis_is_deterministic(
        srcs in vec("[a-c]{1,2}/[a-c]\\.(m|mm|c)", 1..6),
        defines in names(),
    ) {
        let options = BuildOptions::default();
        let facts = mortar_build::platform::resolve(&options, &XcodeToolchain::default()).unwrap();
        let target = ObjcLibrary::new(Label::parse("//pkg:lib").unwrap())
            .with_srcs(srcs)
            .with_defines(defines);

        let first = analyze(&target, &[], &facts).unwrap();
        let second = analyze(&target, &[], &facts).unwrap();
        prop_assert_eq!(&first, &second);

        // Colliding stems are numbered, so objects never clash
        let objects: HashSet<_> = first.compiles.iter().map(|c| &c.object).collect();
        prop_assert_eq!(objects.len(), first.compiles.len());
    }
}
