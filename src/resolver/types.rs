use crate::value::Value;

/// Whether a missing dependency is a hard error, an allowed absence, or
/// gated by a `feature` option (`auto` defers to whatever the resolver
/// finds, same as `required: false` but recorded differently for
/// introspection).
#[derive(Debug, Clone, PartialEq)]
pub enum RequiredSpec {
    Always,
    Never,
    Feature(crate::options::FeatureState),
}

impl RequiredSpec {
    pub fn from_value(v: &Value) -> Self {
        match v {
            Value::Bool(true) => RequiredSpec::Always,
            Value::Bool(false) => RequiredSpec::Never,
            Value::Holder(h) => {
                if let Ok(Value::Bool(true)) = h.call_method("enabled", &[], &indexmap::IndexMap::new()) {
                    RequiredSpec::Always
                } else if let Ok(Value::Bool(true)) = h.call_method("disabled", &[], &indexmap::IndexMap::new()) {
                    RequiredSpec::Never
                } else {
                    RequiredSpec::Feature(crate::options::FeatureState::Auto)
                }
            }
            _ => RequiredSpec::Always,
        }
    }

    pub fn is_hard_error_if_missing(&self) -> bool {
        matches!(self, RequiredSpec::Always)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncludeType {
    Preserve,
    System,
    NonSystem,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Machine {
    Build,
    Host,
}

/// Everything `dependency(name, ...)` can be called with, per
/// the dependency-resolution option list.
#[derive(Debug, Clone)]
pub struct DependencySpec {
    pub name: String,
    pub required: RequiredSpec,
    pub version_constraints: Vec<String>,
    pub is_static: Option<bool>,
    pub machine: Machine,
    pub method: Option<String>,
    pub modules: Vec<String>,
    pub include_type: IncludeType,
    pub fallback: Option<(String, String)>,
}

impl DependencySpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: RequiredSpec::Always,
            version_constraints: Vec::new(),
            is_static: None,
            machine: Machine::Host,
            method: None,
            modules: Vec::new(),
            include_type: IncludeType::Preserve,
            fallback: None,
        }
    }
}
