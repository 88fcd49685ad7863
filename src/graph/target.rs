use crate::value::{HolderKind, HolderObject, MethodError, Value};
use indexmap::IndexMap;

impl TargetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TargetKind::Executable => "executable",
            TargetKind::StaticLibrary => "static_library",
            TargetKind::SharedLibrary => "shared_library",
            TargetKind::SharedModule => "shared_module",
            TargetKind::Custom => "custom",
            TargetKind::Run => "run",
            TargetKind::Jar => "jar",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Executable,
    StaticLibrary,
    SharedLibrary,
    SharedModule,
    Custom,
    Run,
    Jar,
}

/// A build target: the central BOG record. Identity key is
/// `(subproject, name)`; `link_with`/`link_whole` are stored as
/// `(subproject, name)` pairs rather than holder references so the
/// shadow adjacency list in [`super::BuildObjectGraph`] can walk them
/// without going through the holder trait object.
#[derive(Debug, Clone)]
pub struct Target {
    pub name: String,
    pub subproject: String,
    pub kind: TargetKind,
    pub sources: Vec<String>,
    pub generated_sources: Vec<String>,
    pub compile_args: IndexMap<String, Vec<String>>,
    pub link_args: Vec<String>,
    pub link_with: Vec<(String, String)>,
    pub link_whole: Vec<(String, String)>,
    pub include_dirs: Vec<String>,
    pub dependencies: Vec<String>,
    pub install: bool,
    pub install_dir: Option<String>,
    pub machine: crate::environment::MachineKind,
}

impl Target {
    pub fn new(name: impl Into<String>, subproject: impl Into<String>, kind: TargetKind) -> Self {
        Self {
            name: name.into(),
            subproject: subproject.into(),
            kind,
            sources: Vec::new(),
            generated_sources: Vec::new(),
            compile_args: IndexMap::new(),
            link_args: Vec::new(),
            link_with: Vec::new(),
            link_whole: Vec::new(),
            include_dirs: Vec::new(),
            dependencies: Vec::new(),
            install: false,
            install_dir: None,
            machine: crate::environment::MachineKind::Host,
        }
    }

    pub fn identity(&self) -> (String, String) {
        (self.subproject.clone(), self.name.clone())
    }
}

impl HolderObject for Target {
    fn kind(&self) -> HolderKind {
        HolderKind::Target
    }

    fn call_method(&self, method: &str, _args: &[Value], _named: &IndexMap<String, Value>) -> Result<Value, MethodError> {
        match method {
            "name" => Ok(Value::Str(self.name.clone())),
            "found" => Ok(Value::Bool(true)),
            "full_path" => Ok(Value::Str(format!("{}/{}", self.subproject, self.name))),
            // Structured dump of every field Backend Lowering needs.
            // There's no way to recover `&Target` from the opaque
            // holder trait object, so lowering reads it back through
            // this one dispatch-table entry instead (same pattern as
            // `configuration_data`'s `render_template`).
            "snapshot" => {
                let mut dict = IndexMap::new();
                dict.insert("name".to_string(), Value::Str(self.name.clone()));
                dict.insert("subproject".to_string(), Value::Str(self.subproject.clone()));
                dict.insert("kind".to_string(), Value::Str(self.kind.as_str().to_string()));
                dict.insert("sources".to_string(), Value::List(self.sources.iter().cloned().map(Value::Str).collect()));
                dict.insert(
                    "generated_sources".to_string(),
                    Value::List(self.generated_sources.iter().cloned().map(Value::Str).collect()),
                );
                dict.insert(
                    "compile_args".to_string(),
                    Value::Dict(
                        self.compile_args
                            .iter()
                            .map(|(lang, args)| (lang.clone(), Value::List(args.iter().cloned().map(Value::Str).collect())))
                            .collect(),
                    ),
                );
                dict.insert("link_args".to_string(), Value::List(self.link_args.iter().cloned().map(Value::Str).collect()));
                dict.insert("link_with".to_string(), Value::List(self.link_with.iter().map(identity_pair).collect()));
                dict.insert("link_whole".to_string(), Value::List(self.link_whole.iter().map(identity_pair).collect()));
                dict.insert(
                    "include_dirs".to_string(),
                    Value::List(self.include_dirs.iter().cloned().map(Value::Str).collect()),
                );
                dict.insert(
                    "dependencies".to_string(),
                    Value::List(self.dependencies.iter().cloned().map(Value::Str).collect()),
                );
                dict.insert("install".to_string(), Value::Bool(self.install));
                dict.insert(
                    "install_dir".to_string(),
                    self.install_dir.clone().map(Value::Str).unwrap_or(Value::Unset),
                );
                dict.insert(
                    "machine".to_string(),
                    Value::Str(
                        match self.machine {
                            crate::environment::MachineKind::Build => "build",
                            crate::environment::MachineKind::Host => "host",
                        }
                        .to_string(),
                    ),
                );
                Ok(Value::Dict(dict))
            }
            other => Err(MethodError(format!("target has no method '{other}'"))),
        }
    }
}

fn identity_pair(id: &(String, String)) -> Value {
    Value::List(vec![Value::Str(id.0.clone()), Value::Str(id.1.clone())])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_subproject_name_pair() {
        let t = Target::new("app", "", TargetKind::Executable);
        assert_eq!(t.identity(), (String::new(), "app".to_string()));
    }

    #[test]
    fn snapshot_reports_build_machine_and_compile_args() {
        let mut t = Target::new("gen", "", TargetKind::Executable);
        t.machine = crate::environment::MachineKind::Build;
        t.compile_args.insert("c".to_string(), vec!["-DFOR_BUILD".to_string()]);
        let snapshot = t.call_method("snapshot", &[], &IndexMap::new()).unwrap();
        let Value::Dict(dict) = snapshot else { panic!("expected dict") };
        assert_eq!(dict.get("machine"), Some(&Value::Str("build".to_string())));
        match dict.get("compile_args") {
            Some(Value::Dict(args)) => {
                assert_eq!(args.get("c"), Some(&Value::List(vec![Value::Str("-DFOR_BUILD".to_string())])));
            }
            other => panic!("expected compile_args dict, got {other:?}"),
        }
    }
}
