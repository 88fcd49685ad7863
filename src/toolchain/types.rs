use indexmap::IndexMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolchainError {
    #[error("reading '{0}': {1}")]
    Io(String, String),
    #[error("{0}:{1}: {2}")]
    Syntax(String, usize, String),
}

/// A scalar or single-level-list value from a descriptor file, typed
/// the same way `toml::Value` distinguishes string/int/bool/array
/// even though the descriptor syntax itself is
/// hand-parsed, not TOML.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolchainValue {
    Str(String),
    Int(i64),
    Bool(bool),
    List(Vec<String>),
}

impl ToolchainValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ToolchainValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Vec<String> {
        match self {
            ToolchainValue::List(items) => items.clone(),
            ToolchainValue::Str(s) => vec![s.clone()],
            ToolchainValue::Int(n) => vec![n.to_string()],
            ToolchainValue::Bool(b) => vec![b.to_string()],
        }
    }
}

/// One parsed (or merged) cross/native descriptor file.
/// The same shape serves both `--cross-file` and `--native-file`; the
/// distinction of which machine it describes is carried by the caller,
/// not this type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolchainFile {
    pub binaries: IndexMap<String, ToolchainValue>,
    pub host_machine: IndexMap<String, ToolchainValue>,
    pub target_machine: IndexMap<String, ToolchainValue>,
    pub build_machine: IndexMap<String, ToolchainValue>,
    pub properties: IndexMap<String, ToolchainValue>,
    pub built_in_options: IndexMap<String, ToolchainValue>,
    pub project_options: IndexMap<String, ToolchainValue>,
}

impl ToolchainFile {
    /// Merge `other` on top of `self`: later files win
    /// for overlapping keys within the same section.
    pub fn merge(&mut self, other: ToolchainFile) {
        self.binaries.extend(other.binaries);
        self.host_machine.extend(other.host_machine);
        self.target_machine.extend(other.target_machine);
        self.build_machine.extend(other.build_machine);
        self.properties.extend(other.properties);
        self.built_in_options.extend(other.built_in_options);
        self.project_options.extend(other.project_options);
    }

    pub fn binary(&self, name: &str) -> Option<&str> {
        self.binaries.get(name).and_then(ToolchainValue::as_str)
    }
}
