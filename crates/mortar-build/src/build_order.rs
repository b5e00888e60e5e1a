//! Analysis order for library targets using topological sort
use crate::error::{BuildError, BuildResult};
use crate::label::Label;
use crate::targets::{CcLibraryInfo, ObjcLibrary};
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

/// Declared targets of a workspace
///
/// Library declarations are analyzed here; foreign libraries are already
/// built and only contribute providers.
#[derive(Debug, Clone, Default)]
pub struct TargetGraph {
    /// Library declarations by label
    libraries: BTreeMap<Label, ObjcLibrary>,
    /// Foreign libraries by label
    foreign: BTreeMap<Label, CcLibraryInfo>,
}

impl TargetGraph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a library declaration
    pub fn add_library(&mut self, library: ObjcLibrary) -> BuildResult<()> {
        if self.contains(&library.label) {
            return Err(BuildError::DuplicateTarget(library.label));
        }
        self.libraries.insert(library.label.clone(), library);
        Ok(())
    }

    /// Add a foreign library
    pub fn add_cc_library(&mut self, info: CcLibraryInfo) -> BuildResult<()> {
        if self.contains(&info.label) {
            return Err(BuildError::DuplicateTarget(info.label));
        }
        self.foreign.insert(info.label.clone(), info);
        Ok(())
    }

    /// Whether any target has this label
    pub fn contains(&self, label: &Label) -> bool {
        self.libraries.contains_key(label) || self.foreign.contains_key(label)
    }

    /// Get a library declaration
    pub fn get_library(&self, label: &Label) -> Option<&ObjcLibrary> {
        self.libraries.get(label)
    }

    /// All library declarations
    pub fn libraries(&self) -> &BTreeMap<Label, ObjcLibrary> {
        &self.libraries
    }

    /// All foreign libraries
    pub fn foreign_libraries(&self) -> &BTreeMap<Label, CcLibraryInfo> {
        &self.foreign
    }

    /// Library count
    pub fn len(&self) -> usize {
        self.libraries.len()
    }

    /// Check if graph has no libraries
    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
    }

    /// Check that every dependency names a declared target
    pub fn validate(&self) -> BuildResult<()> {
        for (label, library) in &self.libraries {
            for dep in &library.deps {
                if !self.contains(dep) {
                    return Err(BuildError::dependency_not_found(label, dep));
                }
            }
        }
        Ok(())
    }

    /// Library dependencies of a library (foreign dependencies are always ready)
    fn library_deps<'a>(&'a self, library: &'a ObjcLibrary) -> impl Iterator<Item = &'a Label> {
        library
            .deps
            .iter()
            .filter(|dep| self.libraries.contains_key(*dep))
    }

    /// Compute analysis order using Kahn's algorithm
    /// Returns labels in the order they should be analyzed
    pub fn compute_build_order(&self) -> BuildResult<Vec<Label>> {
        if self.libraries.is_empty() {
            return Ok(Vec::new());
        }

        let mut in_degree = self.compute_in_degrees();
        let mut queue = VecDeque::new();
        let mut result = Vec::new();

        // Start with libraries that have no library dependencies
        for (label, degree) in &in_degree {
            if *degree == 0 {
                queue.push_back(label.clone());
            }
        }

        while let Some(label) = queue.pop_front() {
            result.push(label.clone());

            // For each library that depends on the current one
            for (dependent, library) in &self.libraries {
                if library.deps.contains(&label) {
                    if let Some(degree) = in_degree.get_mut(dependent) {
                        *degree -= 1;
                        if *degree == 0 {
                            queue.push_back(dependent.clone());
                        }
                    }
                }
            }
        }

        if result.len() != self.libraries.len() {
            return Err(BuildError::CircularDependency(self.find_cycle()));
        }

        Ok(result)
    }

    /// In-degree = number of distinct library dependencies
    fn compute_in_degrees(&self) -> BTreeMap<Label, usize> {
        self.libraries
            .iter()
            .map(|(label, library)| {
                let distinct: BTreeSet<&Label> = self.library_deps(library).collect();
                (label.clone(), distinct.len())
            })
            .collect()
    }

    /// Find libraries that can be analyzed in parallel
    /// Returns groups where each group only depends on earlier groups
    pub fn parallel_build_groups(&self) -> BuildResult<Vec<Vec<Label>>> {
        if self.libraries.is_empty() {
            return Ok(Vec::new());
        }

        let mut groups = Vec::new();
        let mut built = HashSet::new();

        loop {
            let group: Vec<Label> = self
                .libraries
                .iter()
                .filter(|(label, _)| !built.contains(*label))
                .filter(|(_, library)| self.library_deps(library).all(|d| built.contains(d)))
                .map(|(label, _)| label.clone())
                .collect();

            if group.is_empty() {
                break;
            }

            for label in &group {
                built.insert(label.clone());
            }
            groups.push(group);
        }

        if built.len() != self.libraries.len() {
            return Err(BuildError::CircularDependency(self.find_cycle()));
        }

        Ok(groups)
    }

    /// Find a cycle in the graph (for error reporting)
    fn find_cycle(&self) -> String {
        let mut visited = HashSet::new();
        let mut rec_stack = HashSet::new();
        let mut path = Vec::new();

        for label in self.libraries.keys() {
            if let Some(cycle) = self.dfs_find_cycle(label, &mut visited, &mut rec_stack, &mut path)
            {
                return cycle;
            }
        }

        "unknown cycle".to_string()
    }

    /// DFS to find a cycle
    fn dfs_find_cycle(
        &self,
        label: &Label,
        visited: &mut HashSet<Label>,
        rec_stack: &mut HashSet<Label>,
        path: &mut Vec<Label>,
    ) -> Option<String> {
        if rec_stack.contains(label) {
            path.push(label.clone());
            let start = path.iter().position(|l| l == label).unwrap_or(0);
            let cycle = path[start..]
                .iter()
                .map(|l| l.to_string())
                .collect::<Vec<_>>()
                .join(" -> ");
            return Some(cycle);
        }

        if visited.contains(label) {
            return None;
        }

        visited.insert(label.clone());
        rec_stack.insert(label.clone());
        path.push(label.clone());

        if let Some(library) = self.libraries.get(label) {
            for dep in self.library_deps(library) {
                if let Some(cycle) = self.dfs_find_cycle(dep, visited, rec_stack, path) {
                    return Some(cycle);
                }
            }
        }

        rec_stack.remove(label);
        path.pop();
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(s: &str) -> Label {
        Label::parse(s).unwrap()
    }

    fn lib(name: &str, deps: &[&str]) -> ObjcLibrary {
        ObjcLibrary::new(label(name)).with_deps(deps.iter().map(|d| label(d)))
    }

    fn names(labels: &[Label]) -> Vec<String> {
        labels.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn test_empty_graph() {
        let graph = TargetGraph::new();
        assert!(graph.is_empty());
        assert_eq!(graph.len(), 0);
        assert!(graph.compute_build_order().unwrap().is_empty());
    }

    #[test]
    fn test_linear_dependency_chain() {
        let mut graph = TargetGraph::new();
        graph.add_library(lib("//a:a", &["//b:b"])).unwrap();
        graph.add_library(lib("//b:b", &["//c:c"])).unwrap();
        graph.add_library(lib("//c:c", &[])).unwrap();

        let order = graph.compute_build_order().unwrap();
        assert_eq!(names(&order), vec!["//c:c", "//b:b", "//a:a"]);
    }

    #[test]
    fn test_diamond_dependency() {
        let mut graph = TargetGraph::new();
        graph.add_library(lib("//a:a", &["//b:b", "//c:c"])).unwrap();
        graph.add_library(lib("//b:b", &["//d:d"])).unwrap();
        graph.add_library(lib("//c:c", &["//d:d"])).unwrap();
        graph.add_library(lib("//d:d", &[])).unwrap();

        let order = graph.compute_build_order().unwrap();
        assert_eq!(names(&order), vec!["//d:d", "//b:b", "//c:c", "//a:a"]);

        let groups = graph.parallel_build_groups().unwrap();
        assert_eq!(groups.len(), 3);
        assert_eq!(names(&groups[0]), vec!["//d:d"]);
        assert_eq!(names(&groups[1]), vec!["//b:b", "//c:c"]);
        assert_eq!(names(&groups[2]), vec!["//a:a"]);
    }

    #[test]
    fn test_duplicate_dep_entries_counted_once() {
        let mut graph = TargetGraph::new();
        graph.add_library(lib("//a:a", &["//b:b", "//b:b"])).unwrap();
        graph.add_library(lib("//b:b", &[])).unwrap();
        assert_eq!(names(&graph.compute_build_order().unwrap()), vec!["//b:b", "//a:a"]);
    }

    #[test]
    fn test_foreign_dependencies_are_ready() {
        let mut graph = TargetGraph::new();
        graph.add_cc_library(CcLibraryInfo::new(label("//cc:cc"))).unwrap();
        graph.add_library(lib("//a:a", &["//cc:cc"])).unwrap();

        assert!(graph.validate().is_ok());
        assert_eq!(names(&graph.compute_build_order().unwrap()), vec!["//a:a"]);
        assert_eq!(graph.parallel_build_groups().unwrap().len(), 1);
    }

    #[test]
    fn test_circular_dependency_detection() {
        let mut graph = TargetGraph::new();
        graph.add_library(lib("//a:a", &["//b:b"])).unwrap();
        graph.add_library(lib("//b:b", &["//a:a"])).unwrap();

        match graph.compute_build_order() {
            Err(BuildError::CircularDependency(cycle)) => {
                assert_eq!(cycle, "//a:a -> //b:b -> //a:a");
            }
            other => panic!("Expected CircularDependency error, got {:?}", other),
        }
        assert!(graph.parallel_build_groups().is_err());
    }

    #[test]
    fn test_missing_dependency() {
        let mut graph = TargetGraph::new();
        graph.add_library(lib("//a:a", &["//nonexistent:x"])).unwrap();

        match graph.validate() {
            Err(BuildError::DependencyNotFound { dependency, .. }) => {
                assert_eq!(dependency, label("//nonexistent:x"));
            }
            other => panic!("Expected DependencyNotFound error, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_target() {
        let mut graph = TargetGraph::new();
        graph.add_library(lib("//a:a", &[])).unwrap();
        assert!(matches!(
            graph.add_cc_library(CcLibraryInfo::new(label("//a:a"))),
            Err(BuildError::DuplicateTarget(_))
        ));
    }
}
