use crate::value::{HolderKind, HolderObject, MethodError, Value};
use indexmap::IndexMap;

/// Result of `subproject(name, ...)`: a reference to a nested
/// project's isolated interpreter scope, letting the parent call
/// `.get_variable(name)` to read a declared return value.
#[derive(Debug, Clone)]
pub struct Subproject {
    pub name: String,
    pub found: bool,
    pub variables: IndexMap<String, Value>,
}

impl HolderObject for Subproject {
    fn kind(&self) -> HolderKind {
        HolderKind::Subproject
    }

    fn call_method(&self, method: &str, args: &[Value], _named: &IndexMap<String, Value>) -> Result<Value, MethodError> {
        match method {
            "found" => Ok(Value::Bool(self.found)),
            "get_variable" => {
                let name = args.get(0).and_then(Value::as_str).ok_or_else(|| MethodError("get_variable(name) requires a string".into()))?;
                self.variables
                    .get(name)
                    .cloned()
                    .ok_or_else(|| MethodError(format!("subproject '{}' has no variable '{name}'", self.name)))
            }
            other => Err(MethodError(format!("subproject has no method '{other}'"))),
        }
    }
}
