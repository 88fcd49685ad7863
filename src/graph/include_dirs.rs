use crate::value::{HolderKind, HolderObject, MethodError, Value};
use indexmap::IndexMap;

#[derive(Debug, Clone)]
pub struct IncludeDirs {
    pub dirs: Vec<String>,
    pub is_system: bool,
}

impl HolderObject for IncludeDirs {
    fn kind(&self) -> HolderKind {
        HolderKind::IncludeDirs
    }

    fn call_method(&self, method: &str, _args: &[Value], _named: &IndexMap<String, Value>) -> Result<Value, MethodError> {
        match method {
            "get_paths" => Ok(Value::List(self.dirs.iter().cloned().map(Value::Str).collect())),
            other => Err(MethodError(format!("inc has no method '{other}'"))),
        }
    }
}
