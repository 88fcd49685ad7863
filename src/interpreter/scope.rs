use crate::value::Value;
use indexmap::IndexMap;

/// A stack of lexical scopes. The outermost is the project scope of
/// the currently-interpreted (sub)project; `if`/`foreach` bodies do
/// **not** push their own scope in this DSL (there is no block
/// scoping, only variable rebinding), so this is a single-frame stack
/// per subproject rather than one frame per nested block.
#[derive(Debug, Default)]
pub struct Scope {
    vars: IndexMap<String, Value>,
}

impl Scope {
    pub fn new() -> Self {
        Self { vars: IndexMap::new() }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.vars.insert(name.into(), value);
    }

    /// Captured when a subproject scope is popped, so the parent
    /// project can look up its exported variables via
    /// `subproject(...).get_variable(name)`.
    pub fn snapshot(&self) -> IndexMap<String, Value> {
        self.vars.clone()
    }
}
