use crate::options::OptionValue;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("reading '{0}': {1}")]
    Read(String, String),
    #[error("writing '{0}': {1}")]
    Write(String, String),
    #[error("parsing persisted state '{0}': {1}")]
    Parse(String, String),
}

/// Everything persisted under `<builddir>/meson-private/coredata.json`
/// resolved options, the tracked-input-file hash
/// table reconfiguration compares against, and the toolchain descriptor
/// paths that produced this configuration (so a bare `--reconfigure`
/// re-parses the same cross/native files without the caller repeating
/// them).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoreData {
    pub project_name: String,
    pub project_version: String,
    pub options: IndexMap<String, OptionValue>,
    pub tracked_file_hashes: IndexMap<String, String>,
    pub cross_files: Vec<String>,
    pub native_files: Vec<String>,
    pub cli_option_overrides: IndexMap<String, String>,
}

impl CoreData {
    pub fn new(project_name: impl Into<String>, project_version: impl Into<String>) -> Self {
        Self { project_name: project_name.into(), project_version: project_version.into(), ..Default::default() }
    }
}
