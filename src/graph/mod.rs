//! The Build Object Graph (BOG): targets, custom commands, generators,
//! configuration data, dependency objects, subproject records, install
//! rules. Frozen once the interpreter finishes walking a project's
//! files; Backend Lowering only ever reads it.
//!
//! No build-graph concept exists upstream of this crate; the
//! newtype-id-plus-`IndexMap`-registry idiom and bounded-DFS cycle
//! check are borrowed from `examples/jpmacdonald-apl/crates/apl-core/
//! src/package.rs` and `apl-core/src/resolver.rs`.

pub mod configuration_data;
pub mod custom_command;
pub mod dependency;
pub mod file_ref;
pub mod generator;
pub mod include_dirs;
pub mod subproject;
pub mod target;

pub use configuration_data::ConfigurationData;
pub use custom_command::CustomCommand;
pub use dependency::Dependency;
pub use file_ref::FileRef;
pub use generator::{GeneratedList, Generator};
pub use include_dirs::IncludeDirs;
pub use subproject::Subproject;
pub use target::{Target, TargetKind};

use crate::value::HolderRef;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("target '{0}' is already defined in this (sub)project")]
    DuplicateTarget(String),
    #[error("circular link_with dependency involving target '{0}'")]
    LinkCycle(String),
}

#[derive(Debug, Clone)]
pub struct InstalledFile {
    pub source: String,
    pub dest: String,
    pub mode: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct TestRegistration {
    pub name: String,
    pub target_or_command: String,
    pub args: Vec<String>,
    pub is_benchmark: bool,
}

/// One `configure_file()` rendering, queued for Backend Lowering to
/// write under the build directory once the configure pass completes.
#[derive(Debug, Clone)]
pub struct ConfiguredFile {
    pub output: String,
    pub content: String,
}

/// The frozen (at Backend Lowering time) collection of everything the
/// interpreter built while walking the top-level project and every
/// subproject it entered. Targets/custom commands/generators are
/// reference-counted holders (see [`crate::value::HolderRef`]); the
/// BOG just remembers insertion order and provides lookup by
/// `(subproject, name)`.
#[derive(Debug, Default)]
pub struct BuildObjectGraph {
    pub project_name: String,
    pub project_version: String,
    targets: Vec<(String, String, HolderRef)>,
    /// Shadow adjacency list of `link_with` edges by `(subproject,
    /// name)`, kept alongside the opaque target holders so cycle
    /// detection doesn't need to reach through the holder trait
    /// object for structural data.
    link_edges: indexmap::IndexMap<(String, String), Vec<(String, String)>>,
    pub custom_commands: Vec<HolderRef>,
    pub generators: Vec<HolderRef>,
    pub configuration_datas: Vec<HolderRef>,
    pub dependencies: Vec<HolderRef>,
    pub subprojects: Vec<HolderRef>,
    pub installed_files: Vec<InstalledFile>,
    pub tests: Vec<TestRegistration>,
    pub configured_files: Vec<ConfiguredFile>,
}

impl BuildObjectGraph {
    pub fn new(project_name: impl Into<String>, project_version: impl Into<String>) -> Self {
        Self { project_name: project_name.into(), project_version: project_version.into(), ..Default::default() }
    }

    pub fn add_target(&mut self, subproject: &str, name: &str, handle: HolderRef) -> Result<(), GraphError> {
        if self.targets.iter().any(|(sp, n, _)| sp == subproject && n == name) {
            return Err(GraphError::DuplicateTarget(name.to_string()));
        }
        self.targets.push((subproject.to_string(), name.to_string(), handle));
        self.link_edges.insert((subproject.to_string(), name.to_string()), Vec::new());
        Ok(())
    }

    pub fn targets(&self) -> impl Iterator<Item = &HolderRef> {
        self.targets.iter().map(|(_, _, h)| h)
    }

    pub fn find_target(&self, subproject: &str, name: &str) -> Option<&HolderRef> {
        self.targets.iter().find(|(sp, n, _)| sp == subproject && n == name).map(|(_, _, h)| h)
    }

    /// Record `link_with` edges for a target and check for cycles
    /// reachable from it via bounded DFS. Called every time a
    /// `link_with` edge is added so cycles are caught at the point
    /// they're introduced rather than during backend lowering.
    pub fn record_link_with(
        &mut self,
        subproject: &str,
        name: &str,
        targets: Vec<(String, String)>,
    ) -> Result<(), GraphError> {
        self.link_edges.insert((subproject.to_string(), name.to_string()), targets);
        self.check_no_link_cycle(subproject, name)
    }

    fn check_no_link_cycle(&self, start_subproject: &str, start_name: &str) -> Result<(), GraphError> {
        let start = (start_subproject.to_string(), start_name.to_string());
        let mut visited = HashSet::new();
        let mut stack: Vec<(String, String)> =
            self.link_edges.get(&start).cloned().unwrap_or_default();
        while let Some(node) = stack.pop() {
            if node == start {
                return Err(GraphError::LinkCycle(start_name.to_string()));
            }
            if !visited.insert(node.clone()) {
                continue;
            }
            if let Some(edges) = self.link_edges.get(&node) {
                stack.extend(edges.iter().cloned());
            }
        }
        Ok(())
    }
}
