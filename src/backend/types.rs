use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("target '{0}': malformed snapshot field '{1}'")]
    MalformedSnapshot(String, String),
    #[error("custom target '{0}' output '{1}' escapes its private output directory")]
    OutputEscapesPrivateDir(String, String),
}

#[derive(Debug, Clone, Serialize)]
pub struct CompileCommand {
    pub target: String,
    pub subproject: String,
    pub source: String,
    pub output: String,
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkCommand {
    pub target: String,
    pub subproject: String,
    pub output: String,
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomBuildStatement {
    pub name: String,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub command: Vec<String>,
    pub depfile: Option<String>,
    pub build_by_default: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct InstallAction {
    pub source: String,
    pub dest: String,
    pub mode: Option<u32>,
    pub strip: bool,
    pub follow_symlinks: bool,
}

/// The complete lowering of a frozen BOG: per-source compile commands,
/// per-target link commands, one build statement per custom-target
/// output, and the install manifest. Orderings are exactly declaration
/// order throughout.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoweredBuild {
    pub compile_commands: Vec<CompileCommand>,
    pub link_commands: Vec<LinkCommand>,
    pub custom_build_statements: Vec<CustomBuildStatement>,
    pub install_actions: Vec<InstallAction>,
    /// Sources whose language has no discovered compiler, or custom
    /// target outputs that were skipped; never silently dropped.
    pub warnings: Vec<String>,
}
