use crate::value::{HolderKind, HolderObject, MethodError, Value};
use indexmap::IndexMap;

/// Outcome of `dependency(name, ...)`: a found dependency with link/
/// compile flags, or a not-found holder a project can branch on via
/// `.found()` ("Outcome: a dependency holder or a
/// not-found holder").
#[derive(Debug, Clone)]
pub struct Dependency {
    pub name: String,
    pub found: bool,
    pub version: Option<String>,
    pub compile_args: Vec<String>,
    pub link_args: Vec<String>,
}

impl Dependency {
    pub fn not_found(name: impl Into<String>) -> Self {
        Self { name: name.into(), found: false, version: None, compile_args: Vec::new(), link_args: Vec::new() }
    }

    pub fn found(name: impl Into<String>, version: impl Into<String>, compile_args: Vec<String>, link_args: Vec<String>) -> Self {
        Self { name: name.into(), found: true, version: Some(version.into()), compile_args, link_args }
    }
}

impl HolderObject for Dependency {
    fn kind(&self) -> HolderKind {
        HolderKind::Dependency
    }

    fn call_method(&self, method: &str, _args: &[Value], _named: &IndexMap<String, Value>) -> Result<Value, MethodError> {
        match method {
            "found" => Ok(Value::Bool(self.found)),
            "name" => Ok(Value::Str(self.name.clone())),
            "version" => Ok(Value::Str(self.version.clone().unwrap_or_else(|| "unknown".to_string()))),
            "compile_args" => Ok(Value::List(self.compile_args.iter().cloned().map(Value::Str).collect())),
            "link_args" => Ok(Value::List(self.link_args.iter().cloned().map(Value::Str).collect())),
            other => Err(MethodError(format!("dep has no method '{other}'"))),
        }
    }
}
