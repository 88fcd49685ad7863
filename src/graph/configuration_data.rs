//! Mutable string->value holder and the `configure_file` substitution
//! logic that consumes it.

use crate::value::{HolderKind, HolderObject, MethodError, Value};
use indexmap::IndexMap;
use std::cell::RefCell;

#[derive(Debug, Clone, PartialEq)]
pub enum CfgValue {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl CfgValue {
    fn to_value(&self) -> Value {
        match self {
            CfgValue::Str(s) => Value::Str(s.clone()),
            CfgValue::Int(n) => Value::Int(*n),
            CfgValue::Bool(b) => Value::Bool(*b),
        }
    }

    fn from_value(value: &Value) -> Option<CfgValue> {
        match value {
            Value::Str(s) => Some(CfgValue::Str(s.clone())),
            Value::Int(n) => Some(CfgValue::Int(*n)),
            Value::Bool(b) => Some(CfgValue::Bool(*b)),
            _ => None,
        }
    }

    fn mesondefine_line(&self, name: &str) -> String {
        match self {
            CfgValue::Bool(true) => format!("#define {name}"),
            CfgValue::Bool(false) => format!("/* #undef {name} */"),
            CfgValue::Int(n) => format!("#define {name} {n}"),
            CfgValue::Str(s) => format!("#define {name} {s}"),
        }
    }

    fn substituted(&self) -> String {
        match self {
            CfgValue::Str(s) => format!("\"{s}\""),
            CfgValue::Int(n) => n.to_string(),
            CfgValue::Bool(b) => if *b { "1" } else { "0" }.to_string(),
        }
    }
}

/// Values are mutated in place via `.set`/`.set10`/`.set_quoted` until
/// first consumed by `configure_file`, at which point the data is
/// read-finalized and further mutation is
/// rejected — this is the one opaque holder whose internal state is
/// builder-style rather than immutable.
#[derive(Debug)]
pub struct ConfigurationData {
    entries: RefCell<IndexMap<String, CfgValue>>,
    frozen: RefCell<bool>,
}

impl ConfigurationData {
    pub fn new() -> Self {
        Self { entries: RefCell::new(IndexMap::new()), frozen: RefCell::new(false) }
    }

    pub fn freeze(&self) {
        *self.frozen.borrow_mut() = true;
    }

    pub fn entries(&self) -> IndexMap<String, CfgValue> {
        self.entries.borrow().clone()
    }

    fn set(&self, key: String, value: CfgValue) -> Result<(), MethodError> {
        if *self.frozen.borrow() {
            return Err(MethodError(format!(
                "configuration_data is frozen after first configure_file() use, cannot set '{key}'"
            )));
        }
        self.entries.borrow_mut().insert(key, value);
        Ok(())
    }
}

impl Default for ConfigurationData {
    fn default() -> Self {
        Self::new()
    }
}

impl HolderObject for ConfigurationData {
    fn kind(&self) -> HolderKind {
        HolderKind::ConfigurationData
    }

    fn call_method(&self, method: &str, args: &[Value], _named: &IndexMap<String, Value>) -> Result<Value, MethodError> {
        match method {
            "set" => {
                let key = args.get(0).and_then(Value::as_str).ok_or_else(|| MethodError("set(key, value) requires a string key".into()))?;
                let value = match args.get(1) {
                    Some(Value::Str(s)) => CfgValue::Str(s.clone()),
                    Some(Value::Int(n)) => CfgValue::Int(*n),
                    Some(Value::Bool(b)) => CfgValue::Bool(*b),
                    _ => return Err(MethodError("set(key, value) requires a bool/int/string value".into())),
                };
                self.set(key.to_string(), value)?;
                Ok(Value::Unset)
            }
            "set10" => {
                let key = args.get(0).and_then(Value::as_str).ok_or_else(|| MethodError("set10(key, value) requires a string key".into()))?;
                let value = args.get(1).and_then(Value::as_bool).ok_or_else(|| MethodError("set10(key, value) requires a bool value".into()))?;
                self.set(key.to_string(), CfgValue::Bool(value))?;
                Ok(Value::Unset)
            }
            "set_quoted" => {
                let key = args.get(0).and_then(Value::as_str).ok_or_else(|| MethodError("set_quoted(key, value) requires a string key".into()))?;
                let value = args.get(1).and_then(Value::as_str).ok_or_else(|| MethodError("set_quoted(key, value) requires a string value".into()))?;
                self.set(key.to_string(), CfgValue::Str(value.to_string()))?;
                Ok(Value::Unset)
            }
            "has" => {
                let key = args.get(0).and_then(Value::as_str).unwrap_or_default();
                Ok(Value::Bool(self.entries.borrow().contains_key(key)))
            }
            "get" => {
                let key = args.get(0).and_then(Value::as_str).unwrap_or_default();
                match self.entries.borrow().get(key) {
                    Some(CfgValue::Str(s)) => Ok(Value::Str(s.clone())),
                    Some(CfgValue::Int(n)) => Ok(Value::Int(*n)),
                    Some(CfgValue::Bool(b)) => Ok(Value::Bool(*b)),
                    None => match args.get(1) {
                        Some(default) => Ok(default.clone()),
                        None => Err(MethodError(format!("no such configuration key '{key}'"))),
                    },
                }
            }
            "keys" => Ok(Value::List(self.entries.borrow().keys().cloned().map(Value::Str).collect())),
            "snapshot" => {
                let dict = self.entries.borrow().iter().map(|(k, v)| (k.clone(), v.to_value())).collect();
                Ok(Value::Dict(dict))
            }
            "render_template" => {
                let template = args.get(0).and_then(Value::as_str).ok_or_else(|| MethodError("render_template(template, format) requires a string template".into()))?;
                let format = args.get(1).and_then(Value::as_str).unwrap_or("");
                let rendered = if format == "mesondefine" {
                    rewrite_mesondefine_lines(template, self)
                } else {
                    substitute_at_vars(template, self)
                };
                Ok(Value::Str(rendered))
            }
            "merge_from" => {
                let Some(Value::Holder(other)) = args.first() else {
                    return Err(MethodError("merge_from(other) requires a configuration_data argument".into()));
                };
                if other.kind() != HolderKind::ConfigurationData {
                    return Err(MethodError(format!(
                        "merge_from(other) requires a configuration_data argument, got '{}'",
                        other.kind().type_name()
                    )));
                }
                let snapshot = other.call_method("snapshot", &[], &IndexMap::new())?;
                if let Value::Dict(dict) = snapshot {
                    let mut entries = self.entries.borrow_mut();
                    for (key, value) in dict {
                        if let Some(cfg_value) = CfgValue::from_value(&value) {
                            entries.insert(key, cfg_value);
                        }
                    }
                }
                Ok(Value::Unset)
            }
            other => Err(MethodError(format!("cfg_data has no method '{other}'"))),
        }
    }
}

/// `configure_file(input, output, configuration, format?)`: either
/// straight `@var@` substitution, or (`format == "mesondefine"`-style)
/// C-preprocessor `#mesondefine NAME` line rewriting.
pub fn substitute_at_vars(template: &str, data: &ConfigurationData) -> String {
    let entries = data.entries();
    let mut out = String::with_capacity(template.len());
    let chars: Vec<char> = template.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '@' {
            if let Some(end) = chars[i + 1..].iter().position(|&c| c == '@') {
                let name: String = chars[i + 1..i + 1 + end].iter().collect();
                if let Some(value) = entries.get(&name) {
                    out.push_str(&value.substituted());
                    i = i + 1 + end + 1;
                    continue;
                }
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    data.freeze();
    out
}

pub fn rewrite_mesondefine_lines(template: &str, data: &ConfigurationData) -> String {
    let entries = data.entries();
    let result = template
        .lines()
        .map(|line| {
            if let Some(rest) = line.trim_start().strip_prefix("#mesondefine ") {
                let name = rest.trim();
                match entries.get(name) {
                    Some(value) => value.mesondefine_line(name),
                    None => format!("/* #undef {name} */"),
                }
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n");
    data.freeze();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_var_substitution() {
        let data = ConfigurationData::new();
        data.call_method("set_quoted", &[Value::Str("NAME".into()), Value::Str("hello".into())], &IndexMap::new()).unwrap();
        let out = substitute_at_vars("#define PKG @NAME@", &data);
        assert_eq!(out, "#define PKG \"hello\"");
    }

    #[test]
    fn mesondefine_true_false_int() {
        let data = ConfigurationData::new();
        data.call_method("set", &[Value::Str("HAVE_FOO".into()), Value::Bool(true)], &IndexMap::new()).unwrap();
        data.call_method("set", &[Value::Str("HAVE_BAR".into()), Value::Bool(false)], &IndexMap::new()).unwrap();
        data.call_method("set", &[Value::Str("VERSION".into()), Value::Int(3)], &IndexMap::new()).unwrap();
        let template = "#mesondefine HAVE_FOO\n#mesondefine HAVE_BAR\n#mesondefine VERSION\n";
        let out = rewrite_mesondefine_lines(template, &data);
        assert_eq!(out, "#define HAVE_FOO\n/* #undef HAVE_BAR */\n#define VERSION 3");
    }

    #[test]
    fn merge_from_copies_other_entries() {
        let d1 = ConfigurationData::new();
        let d2 = ConfigurationData::new();
        d1.call_method("set", &[Value::Str("FROM_D1".into()), Value::Bool(true)], &IndexMap::new()).unwrap();
        d2.call_method("set", &[Value::Str("FROM_D2".into()), Value::Int(42)], &IndexMap::new()).unwrap();
        let d2_ref = crate::value::HolderRef::new(d2);
        d1.call_method("merge_from", &[Value::Holder(d2_ref)], &IndexMap::new()).unwrap();
        assert_eq!(d1.entries().get("FROM_D1"), Some(&CfgValue::Bool(true)));
        assert_eq!(d1.entries().get("FROM_D2"), Some(&CfgValue::Int(42)));
    }

    #[test]
    fn merge_from_rejects_non_configuration_data_holder() {
        use crate::graph::custom_command::CustomCommand;
        let d1 = ConfigurationData::new();
        let not_cfg = crate::value::HolderRef::new(CustomCommand::new("x"));
        let err = d1.call_method("merge_from", &[Value::Holder(not_cfg)], &IndexMap::new()).unwrap_err();
        assert!(err.0.contains("configuration_data"));
    }

    #[test]
    fn set_after_freeze_errors() {
        let data = ConfigurationData::new();
        substitute_at_vars("", &data);
        let err = data
            .call_method("set", &[Value::Str("X".into()), Value::Bool(true)], &IndexMap::new())
            .unwrap_err();
        assert!(err.0.contains("frozen"));
    }
}
