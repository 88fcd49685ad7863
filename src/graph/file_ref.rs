use crate::value::{HolderKind, HolderObject, MethodError, Value};
use indexmap::IndexMap;

/// A source-tree-relative or build-tree-relative file reference
/// returned by `files(...)`. Kept distinct from a plain string so the
/// interpreter's argument schema can require "a file, not an
/// arbitrary string" where the DSL does.
#[derive(Debug, Clone)]
pub struct FileRef {
    pub path: String,
    pub is_build_dir_relative: bool,
}

impl HolderObject for FileRef {
    fn kind(&self) -> HolderKind {
        HolderKind::FileRef
    }

    fn call_method(&self, method: &str, _args: &[Value], _named: &IndexMap<String, Value>) -> Result<Value, MethodError> {
        match method {
            "full_path" => Ok(Value::Str(self.path.clone())),
            other => Err(MethodError(format!("file has no method '{other}'"))),
        }
    }
}
