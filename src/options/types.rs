use crate::options::feature::FeatureState;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Machine {
    Build,
    Host,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionSource {
    Default,
    ProjectDefault,
    CommandLine,
    Environment,
    ReconfigurePreserved,
}

/// Controls whether an environment-derived setting is consulted only
/// on the very first configuration of a build directory, or on every
/// configure/reconfigure. See DESIGN.md's Open Question decision:
/// compiler/flag variables (`CC`, `CFLAGS`) are `InitialOnly` so a
/// later bare reconfigure is reproducible; `DESTDIR`-style variables
/// are `Always`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionEnvPolicy {
    InitialOnly,
    Always,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OptionType {
    Str,
    IntRange { min: i64, max: i64 },
    Bool,
    Enum(Vec<String>),
    StringArray,
    Feature,
}

impl OptionType {
    pub fn parse(&self, raw: &str) -> Result<OptionValue, String> {
        match self {
            OptionType::Str => Ok(OptionValue::Str(raw.to_string())),
            OptionType::Bool => match raw {
                "true" => Ok(OptionValue::Bool(true)),
                "false" => Ok(OptionValue::Bool(false)),
                other => Err(format!("expected 'true' or 'false', got '{other}'")),
            },
            OptionType::IntRange { min, max } => {
                let n: i64 = raw.parse().map_err(|_| format!("expected integer, got '{raw}'"))?;
                if n < *min || n > *max {
                    Err(format!("{n} is outside allowed range [{min}, {max}]"))
                } else {
                    Ok(OptionValue::Int(n))
                }
            }
            OptionType::Enum(choices) => {
                if choices.iter().any(|c| c == raw) {
                    Ok(OptionValue::Enum(raw.to_string()))
                } else {
                    Err(format!("'{raw}' is not one of {choices:?}"))
                }
            }
            OptionType::StringArray => {
                let items = if raw.is_empty() {
                    Vec::new()
                } else {
                    raw.split(',').map(|s| s.to_string()).collect()
                };
                Ok(OptionValue::StringArray(items))
            }
            OptionType::Feature => match raw {
                "enabled" => Ok(OptionValue::Feature(FeatureState::Enabled)),
                "disabled" => Ok(OptionValue::Feature(FeatureState::Disabled)),
                "auto" => Ok(OptionValue::Feature(FeatureState::Auto)),
                other => Err(format!("expected 'enabled'/'disabled'/'auto', got '{other}'")),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OptionValue {
    Str(String),
    Int(i64),
    Bool(bool),
    Enum(String),
    StringArray(Vec<String>),
    Feature(FeatureState),
}

impl OptionValue {
    pub fn to_value(&self) -> Value {
        match self {
            OptionValue::Str(s) => Value::Str(s.clone()),
            OptionValue::Int(n) => Value::Int(*n),
            OptionValue::Bool(b) => Value::Bool(*b),
            OptionValue::Enum(s) => Value::Str(s.clone()),
            OptionValue::StringArray(items) => Value::List(items.iter().cloned().map(Value::Str).collect()),
            OptionValue::Feature(_) => unreachable!("feature options are converted via get_option's holder path"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OptionSpec {
    pub name: String,
    pub ty: OptionType,
    pub default: OptionValue,
    pub env_policy: OptionEnvPolicy,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct Option {
    pub name: String,
    pub ty: OptionType,
    pub value: OptionValue,
    pub source: OptionSource,
    pub env_policy: OptionEnvPolicy,
    pub description: String,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum OptionError {
    #[error("unknown option '{0}'")]
    UnknownOption(String),
    #[error("option '{0}' is already declared")]
    AlreadyDeclared(String),
    #[error("invalid value for option '{0}': {1}")]
    InvalidValue(String, String),
    #[error("option '{0}' cannot be set via this channel")]
    WrongChannel(String),
}
