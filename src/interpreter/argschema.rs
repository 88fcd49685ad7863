//! The calling convention every built-in
//! declares positional/optional/variadic/named parameter types, type
//! coercion is disallowed, and a mismatch names the function,
//! argument position/name, expected type, and got type.

use crate::ast::Position;
use crate::interpreter::types::InterpreterError;
use crate::value::{HolderKind, Value};
use indexmap::IndexMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    Bool,
    Int,
    Str,
    List,
    Dict,
    Holder(HolderKind),
    Any,
}

impl ParamType {
    fn matches(&self, v: &Value) -> bool {
        match (self, v) {
            (ParamType::Any, _) => true,
            (ParamType::Bool, Value::Bool(_)) => true,
            (ParamType::Int, Value::Int(_)) => true,
            (ParamType::Str, Value::Str(_)) => true,
            (ParamType::List, Value::List(_)) => true,
            (ParamType::Dict, Value::Dict(_)) => true,
            (ParamType::Holder(k), Value::Holder(h)) => h.kind() == *k,
            _ => false,
        }
    }

    fn name(&self) -> String {
        match self {
            ParamType::Bool => "bool".to_string(),
            ParamType::Int => "int".to_string(),
            ParamType::Str => "str".to_string(),
            ParamType::List => "list".to_string(),
            ParamType::Dict => "dict".to_string(),
            ParamType::Holder(k) => k.type_name().to_string(),
            ParamType::Any => "any".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NamedParam {
    pub name: &'static str,
    pub ty: ParamType,
    pub required: bool,
    pub default: Option<Value>,
}

#[derive(Debug, Clone, Default)]
pub struct ArgSchema {
    pub positional: Vec<ParamType>,
    pub optional: Vec<ParamType>,
    pub variadic: Option<ParamType>,
    pub named: Vec<NamedParam>,
}

impl ArgSchema {
    /// Validates positional arity/types and named-argument presence,
    /// returning the named map with defaults filled in for any
    /// optional parameter the caller omitted.
    pub fn validate(
        &self,
        function: &str,
        positional: &[Value],
        named: &IndexMap<String, Value>,
        pos: Position,
    ) -> Result<IndexMap<String, Value>, InterpreterError> {
        let min = self.positional.len();
        let max_fixed = min + self.optional.len();

        if positional.len() < min {
            return Err(InterpreterError::MissingArgument {
                function: function.to_string(),
                name: format!("positional #{}", positional.len() + 1),
                pos,
            });
        }
        if self.variadic.is_none() && positional.len() > max_fixed {
            return Err(InterpreterError::TooManyArguments { function: function.to_string(), pos });
        }

        for (i, ty) in self.positional.iter().chain(self.optional.iter()).enumerate() {
            if let Some(v) = positional.get(i) {
                if !ty.matches(v) {
                    return Err(InterpreterError::ArgTypeMismatch {
                        function: function.to_string(),
                        which: format!("#{}", i + 1),
                        expected: ty.name(),
                        got: v.type_name().to_string(),
                        pos,
                    });
                }
            }
        }
        if let Some(variadic_ty) = &self.variadic {
            for (i, v) in positional.iter().enumerate().skip(max_fixed) {
                if !variadic_ty.matches(v) {
                    return Err(InterpreterError::ArgTypeMismatch {
                        function: function.to_string(),
                        which: format!("#{}", i + 1),
                        expected: variadic_ty.name(),
                        got: v.type_name().to_string(),
                        pos,
                    });
                }
            }
        }

        for key in named.keys() {
            if !self.named.iter().any(|p| p.name == key) {
                return Err(InterpreterError::UnknownNamedArgument {
                    function: function.to_string(),
                    name: key.clone(),
                    pos,
                });
            }
        }

        let mut resolved = named.clone();
        for param in &self.named {
            match named.get(param.name) {
                Some(v) => {
                    if !param.ty.matches(v) {
                        return Err(InterpreterError::ArgTypeMismatch {
                            function: function.to_string(),
                            which: param.name.to_string(),
                            expected: param.ty.name(),
                            got: v.type_name().to_string(),
                            pos,
                        });
                    }
                }
                None => {
                    if param.required {
                        return Err(InterpreterError::MissingArgument {
                            function: function.to_string(),
                            name: param.name.to_string(),
                            pos,
                        });
                    }
                    if let Some(default) = &param.default {
                        resolved.insert(param.name.to_string(), default.clone());
                    }
                }
            }
        }
        Ok(resolved)
    }
}

/// A call whose positional or named arguments contain a disabler
/// short-circuits before the built-in body runs and produces a
/// disabler itself.
pub fn any_disabler(positional: &[Value], named: &IndexMap<String, Value>) -> bool {
    positional.iter().any(Value::is_disabler) || named.values().any(Value::is_disabler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Position;

    #[test]
    fn missing_required_positional_errors() {
        let schema = ArgSchema { positional: vec![ParamType::Str], ..Default::default() };
        let err = schema.validate("executable", &[], &IndexMap::new(), Position::default()).unwrap_err();
        assert!(matches!(err, InterpreterError::MissingArgument { .. }));
    }

    #[test]
    fn wrong_type_reports_position_and_types() {
        let schema = ArgSchema { positional: vec![ParamType::Str], ..Default::default() };
        let err =
            schema.validate("executable", &[Value::Int(1)], &IndexMap::new(), Position::default()).unwrap_err();
        match err {
            InterpreterError::ArgTypeMismatch { expected, got, .. } => {
                assert_eq!(expected, "str");
                assert_eq!(got, "int");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn variadic_tail_is_checked() {
        let schema = ArgSchema { positional: vec![ParamType::Str], variadic: Some(ParamType::Str), ..Default::default() };
        let args = vec![Value::Str("a".into()), Value::Str("b".into()), Value::Int(3)];
        let err = schema.validate("executable", &args, &IndexMap::new(), Position::default()).unwrap_err();
        assert!(matches!(err, InterpreterError::ArgTypeMismatch { .. }));
    }

    #[test]
    fn unknown_named_argument_errors() {
        let schema = ArgSchema {
            named: vec![NamedParam { name: "install", ty: ParamType::Bool, required: false, default: Some(Value::Bool(false)) }],
            ..Default::default()
        };
        let mut named = IndexMap::new();
        named.insert("instal".to_string(), Value::Bool(true));
        let err = schema.validate("executable", &[], &named, Position::default()).unwrap_err();
        assert!(matches!(err, InterpreterError::UnknownNamedArgument { name, .. } if name == "instal"));
    }

    #[test]
    fn named_default_is_filled_in() {
        let schema = ArgSchema {
            named: vec![NamedParam { name: "install", ty: ParamType::Bool, required: false, default: Some(Value::Bool(false)) }],
            ..Default::default()
        };
        let resolved = schema.validate("executable", &[], &IndexMap::new(), Position::default()).unwrap();
        assert_eq!(resolved.get("install"), Some(&Value::Bool(false)));
    }
}
