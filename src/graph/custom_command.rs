use crate::value::{HolderKind, HolderObject, MethodError, Value};
use indexmap::IndexMap;

/// Attributes of a custom command record: input files/
/// targets, output names (relative to the target's build subdir),
/// command template with `@INPUT@`/`@OUTPUT@`-style placeholders,
/// optional depfile, and the capture/feed/console/build-by-default
/// flags.
#[derive(Debug, Clone)]
pub struct CustomCommand {
    pub name: String,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub command: Vec<String>,
    pub depfile: Option<String>,
    pub capture: bool,
    pub feed: bool,
    pub console: bool,
    pub build_by_default: bool,
    pub env: IndexMap<String, String>,
}

impl CustomCommand {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            command: Vec::new(),
            depfile: None,
            capture: false,
            feed: false,
            console: false,
            build_by_default: false,
            env: IndexMap::new(),
        }
    }

    /// Substitute the placeholders a custom command recognizes for a single
    /// output index: `@INPUT@`/`@INPUTn@`, `@OUTPUT@`/`@OUTPUTn@`,
    /// `@OUTDIR@`, `@DEPFILE@`, `@BASENAME@`, `@PLAINNAME@`,
    /// `@CURRENT_SOURCE_DIR@`, `@PRIVATE_DIR@`.
    pub fn substitute(&self, out_dir: &str, source_dir: &str, private_dir: &str) -> Vec<String> {
        self.command
            .iter()
            .map(|tok| {
                let mut s = tok.clone();
                s = s.replace("@INPUT@", &self.inputs.join(" "));
                for (i, input) in self.inputs.iter().enumerate() {
                    s = s.replace(&format!("@INPUT{i}@"), input);
                }
                s = s.replace("@OUTPUT@", &self.outputs.join(" "));
                for (i, output) in self.outputs.iter().enumerate() {
                    s = s.replace(&format!("@OUTPUT{i}@"), output);
                }
                s = s.replace("@OUTDIR@", out_dir);
                s = s.replace("@CURRENT_SOURCE_DIR@", source_dir);
                s = s.replace("@PRIVATE_DIR@", private_dir);
                if let Some(dep) = &self.depfile {
                    s = s.replace("@DEPFILE@", dep);
                }
                if let Some(first) = self.inputs.first() {
                    let plain = first.rsplit('/').next().unwrap_or(first);
                    let base = plain.rsplit_once('.').map(|(b, _)| b).unwrap_or(plain);
                    s = s.replace("@PLAINNAME@", plain);
                    s = s.replace("@BASENAME@", base);
                }
                s
            })
            .collect()
    }
}

impl HolderObject for CustomCommand {
    fn kind(&self) -> HolderKind {
        HolderKind::CustomTarget
    }

    fn call_method(&self, method: &str, args: &[Value], _named: &IndexMap<String, Value>) -> Result<Value, MethodError> {
        match method {
            "full_path" => Ok(Value::Str(self.name.clone())),
            "found" => Ok(Value::Bool(true)),
            "snapshot" => {
                let mut dict = IndexMap::new();
                dict.insert("name".to_string(), Value::Str(self.name.clone()));
                dict.insert("inputs".to_string(), Value::List(self.inputs.iter().cloned().map(Value::Str).collect()));
                dict.insert("outputs".to_string(), Value::List(self.outputs.iter().cloned().map(Value::Str).collect()));
                dict.insert("command".to_string(), Value::List(self.command.iter().cloned().map(Value::Str).collect()));
                dict.insert("depfile".to_string(), self.depfile.clone().map(Value::Str).unwrap_or(Value::Unset));
                dict.insert("capture".to_string(), Value::Bool(self.capture));
                dict.insert("build_by_default".to_string(), Value::Bool(self.build_by_default));
                Ok(Value::Dict(dict))
            }
            // Backend Lowering has no access to the concrete type
            // (same "no downcasting" constraint as `snapshot`), so the
            // placeholder substitution this holder already implements
            // is exposed as a method rather than duplicated in
            // `backend`.
            "render" => {
                let out_dir = args.get(0).and_then(Value::as_str).unwrap_or("");
                let source_dir = args.get(1).and_then(Value::as_str).unwrap_or("");
                let private_dir = args.get(2).and_then(Value::as_str).unwrap_or("");
                let rendered = self.substitute(out_dir, source_dir, private_dir);
                Ok(Value::List(rendered.into_iter().map(Value::Str).collect()))
            }
            other => Err(MethodError(format!("custom_tgt has no method '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_input_output_placeholders() {
        let mut cc = CustomCommand::new("gen");
        cc.inputs = vec!["a.y".to_string()];
        cc.outputs = vec!["a.c".to_string()];
        cc.command = vec!["bison".to_string(), "-o".to_string(), "@OUTPUT@".to_string(), "@INPUT@".to_string()];
        let out = cc.substitute("build", "src", "build/priv");
        assert_eq!(out, vec!["bison", "-o", "a.c", "a.y"]);
    }

    #[test]
    fn substitutes_basename_and_plainname() {
        let mut cc = CustomCommand::new("gen");
        cc.inputs = vec!["dir/foo.proto".to_string()];
        cc.command = vec!["@PLAINNAME@".to_string(), "@BASENAME@".to_string()];
        let out = cc.substitute("build", "src", "build/priv");
        assert_eq!(out, vec!["foo.proto", "foo"]);
    }
}
