//! `feature`-typed option values: the `enabled`/`disabled`/`auto`
//! tri-state holder returned from `get_option()` for feature-typed options.

use crate::value::{HolderKind, HolderObject, MethodError, Value};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureState {
    Enabled,
    Disabled,
    Auto,
}

#[derive(Debug, Clone, Copy)]
pub struct FeatureValue {
    state: FeatureState,
}

impl FeatureValue {
    pub fn new(state: FeatureState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> FeatureState {
        self.state
    }

    fn require_bool(args: &[Value], index: usize, method: &str) -> Result<bool, MethodError> {
        args.get(index)
            .and_then(Value::as_bool)
            .ok_or_else(|| MethodError(format!("{method}() expects a bool argument at position {index}")))
    }

    fn error_message(named: &IndexMap<String, Value>) -> std::string::String {
        named
            .get("error_message")
            .and_then(Value::as_str)
            .unwrap_or("feature requirement not met")
            .to_string()
    }
}

impl HolderObject for FeatureValue {
    fn kind(&self) -> HolderKind {
        HolderKind::OptionValue
    }

    fn call_method(&self, method: &str, args: &[Value], named: &IndexMap<String, Value>) -> Result<Value, MethodError> {
        use FeatureState::*;
        match method {
            "enabled" => Ok(Value::Bool(self.state == Enabled)),
            "disabled" => Ok(Value::Bool(self.state == Disabled)),
            "auto" => Ok(Value::Bool(self.state == Auto)),
            "allowed" => Ok(Value::Bool(self.state != Disabled)),
            "disable_auto_if" => {
                let cond = Self::require_bool(args, 0, "disable_auto_if")?;
                let next = if self.state == Auto && cond { Disabled } else { self.state };
                Ok(Value::Holder(crate::value::HolderRef::new(FeatureValue::new(next))))
            }
            "disable_if" => {
                let cond = Self::require_bool(args, 0, "disable_if")?;
                if cond && self.state == Enabled {
                    return Err(MethodError(Self::error_message(named)));
                }
                let next = if cond { Disabled } else { self.state };
                Ok(Value::Holder(crate::value::HolderRef::new(FeatureValue::new(next))))
            }
            "enable_if" => {
                let cond = Self::require_bool(args, 0, "enable_if")?;
                if cond && self.state == Disabled {
                    return Err(MethodError(Self::error_message(named)));
                }
                let next = if cond { Enabled } else { self.state };
                Ok(Value::Holder(crate::value::HolderRef::new(FeatureValue::new(next))))
            }
            "require" => {
                let cond = Self::require_bool(args, 0, "require")?;
                if !cond && self.state == Enabled {
                    return Err(MethodError(Self::error_message(named)));
                }
                let next = if !cond && self.state == Auto { Disabled } else { self.state };
                Ok(Value::Holder(crate::value::HolderRef::new(FeatureValue::new(next))))
            }
            other => Err(MethodError(format!("feature has no method '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(fv: &FeatureValue, method: &str, args: &[Value]) -> Value {
        fv.call_method(method, args, &IndexMap::new()).unwrap()
    }

    #[test]
    fn auto_predicates() {
        let fv = FeatureValue::new(FeatureState::Auto);
        assert_eq!(call(&fv, "auto", &[]), Value::Bool(true));
        assert_eq!(call(&fv, "allowed", &[]), Value::Bool(true));
    }

    #[test]
    fn require_enabled_and_unmet_errors() {
        let fv = FeatureValue::new(FeatureState::Enabled);
        let err = fv.call_method("require", &[Value::Bool(false)], &IndexMap::new()).unwrap_err();
        assert!(err.0.contains("feature requirement"));
    }

    #[test]
    fn require_auto_and_unmet_disables() {
        let fv = FeatureValue::new(FeatureState::Auto);
        let result = fv.call_method("require", &[Value::Bool(false)], &IndexMap::new()).unwrap();
        match result {
            Value::Holder(h) => assert_eq!(h.kind(), HolderKind::OptionValue),
            other => panic!("unexpected {other:?}"),
        }
    }
}
