use crate::value::{HolderKind, HolderObject, HolderRef, MethodError, Value};
use indexmap::IndexMap;

/// A generator: a reusable command template (`generator(exe, output:
/// [...], arguments: [...])`) applied to a set of source files via
/// `.process(sources...)`, which returns a [`GeneratedList`].
#[derive(Debug, Clone)]
pub struct Generator {
    pub command: Vec<String>,
    pub output_template: Vec<String>,
    pub arguments: Vec<String>,
}

impl HolderObject for Generator {
    fn kind(&self) -> HolderKind {
        HolderKind::Generator
    }

    fn call_method(&self, method: &str, args: &[Value], _named: &IndexMap<String, Value>) -> Result<Value, MethodError> {
        match method {
            "process" => {
                let sources: Vec<String> =
                    args.iter().filter_map(Value::as_str).map(|s| s.to_string()).collect();
                let outputs = sources
                    .iter()
                    .flat_map(|src| {
                        let plain = src.rsplit('/').next().unwrap_or(src);
                        let base = plain.rsplit_once('.').map(|(b, _)| b).unwrap_or(plain);
                        self.output_template.iter().map(move |tmpl| tmpl.replace("@BASENAME@", base))
                    })
                    .collect();
                Ok(Value::Holder(HolderRef::new(GeneratedList { outputs })))
            }
            other => Err(MethodError(format!("generator has no method '{other}'"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeneratedList {
    pub outputs: Vec<String>,
}

impl HolderObject for GeneratedList {
    fn kind(&self) -> HolderKind {
        HolderKind::GeneratedList
    }

    fn call_method(&self, method: &str, _args: &[Value], _named: &IndexMap<String, Value>) -> Result<Value, MethodError> {
        match method {
            "get_outputs" => Ok(Value::List(self.outputs.iter().cloned().map(Value::Str).collect())),
            other => Err(MethodError(format!("generated_list has no method '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_expands_basename_template() {
        let gen = Generator {
            command: vec!["protoc".to_string()],
            output_template: vec!["@BASENAME@.pb.cc".to_string(), "@BASENAME@.pb.h".to_string()],
            arguments: Vec::new(),
        };
        let result = gen.call_method("process", &[Value::Str("a/b.proto".to_string())], &IndexMap::new()).unwrap();
        match result {
            Value::Holder(h) => {
                let outputs = h.call_method("get_outputs", &[], &IndexMap::new()).unwrap();
                assert_eq!(outputs, Value::List(vec![Value::Str("b.pb.cc".into()), Value::Str("b.pb.h".into())]));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
