//! Built-in function and method dispatch tables. Each built-in is
//! validated against an [`ArgSchema`] before its body runs, mirroring
//! the per-builtin argument tables already used in
//! `legacy_src/interpreter/builtin_dispatch.rs`, generalized from a
//! fixed bash builtin set to the project DSL's open, declared set.

use super::argschema::{ArgSchema, NamedParam, ParamType};
use super::{Interpreter, InterpreterError};
use crate::ast::{MethodCallExpr, Position};
use crate::graph::{
    ConfigurationData, CustomCommand, Dependency, FileRef, Generator, IncludeDirs, Subproject, Target, TargetKind,
};
use crate::resolver::{DependencySpec, IncludeType as ResolverIncludeType, RequiredSpec};
use crate::value::{HolderKind, HolderRef, Value};
use indexmap::IndexMap;
use std::time::Duration;

fn str_arg(v: &Value, function: &str, which: &str, pos: Position) -> Result<String, InterpreterError> {
    v.as_str().map(str::to_string).ok_or_else(|| InterpreterError::ArgTypeMismatch {
        function: function.to_string(),
        which: which.to_string(),
        expected: "str".to_string(),
        got: v.type_name().to_string(),
        pos,
    })
}

fn string_list(values: &[Value]) -> Vec<String> {
    values.iter().filter_map(|v| v.as_str().map(str::to_string)).collect()
}

impl Interpreter {
    pub(super) async fn eval_meson_module_call(&mut self, call: &MethodCallExpr) -> Result<Value, InterpreterError> {
        let (positional, named) = self.eval_args(&call.args).await?;
        let pos = call.span.start;
        match call.method.as_str() {
            "project_name" => Ok(Value::Str(self.graph.project_name.clone())),
            "project_version" => Ok(Value::Str(self.graph.project_version.clone())),
            "is_cross_build" => Ok(Value::Bool(self.environment.is_cross())),
            "override_dependency" => {
                let name = str_arg(positional.first().ok_or_else(|| InterpreterError::MissingArgument {
                    function: "meson.override_dependency".to_string(),
                    name: "name".to_string(),
                    pos,
                })?, "meson.override_dependency", "name", pos)?;
                let dep_holder = positional.get(1).and_then(Value::as_holder).ok_or_else(|| InterpreterError::MissingArgument {
                    function: "meson.override_dependency".to_string(),
                    name: "dep".to_string(),
                    pos,
                })?;
                let found = matches!(dep_holder.call_method("found", &[], &IndexMap::new()), Ok(Value::Bool(true)));
                if found {
                    self.resolver.override_dependency(name.clone(), Dependency::found(name, "unknown", Vec::new(), Vec::new()));
                } else {
                    self.resolver.override_dependency(name.clone(), Dependency::not_found(name));
                }
                Ok(Value::Unset)
            }
            "get_compiler" => {
                let lang = str_arg(positional.first().ok_or_else(|| InterpreterError::MissingArgument {
                    function: "meson.get_compiler".to_string(),
                    name: "language".to_string(),
                    pos,
                })?, "meson.get_compiler", "language", pos)?;
                let path_dirs: Vec<String> = std::env::var("PATH").unwrap_or_default().split(':').map(|s| s.to_string()).collect();
                let candidates = super::candidate_compilers(&lang);
                self.environment
                    .discover_compiler(crate::environment::MachineKind::Host, &lang, &candidates, &path_dirs)
                    .await
                    .map(|record| Value::Str(record.path.clone()))
                    .map_err(|_| InterpreterError::DependencyNotFound { name: format!("{lang} compiler"), pos })
            }
            other => {
                let _ = named;
                Err(InterpreterError::UnknownMethod { method: other.to_string(), type_name: "module".to_string(), pos })
            }
        }
    }

    pub(super) async fn call_builtin(
        &mut self,
        name: &str,
        positional: Vec<Value>,
        named: IndexMap<String, Value>,
        pos: Position,
    ) -> Result<Value, InterpreterError> {
        match name {
            "project" => self.builtin_project(positional, named, pos),
            "add_languages" => {
                let langs = string_list(&positional);
                self.discover_languages(&langs).await?;
                Ok(Value::Bool(true))
            }
            "executable" => self.builtin_target(TargetKind::Executable, positional, named, pos),
            "static_library" => self.builtin_target(TargetKind::StaticLibrary, positional, named, pos),
            "shared_library" => self.builtin_target(TargetKind::SharedLibrary, positional, named, pos),
            "shared_module" => self.builtin_target(TargetKind::SharedModule, positional, named, pos),
            "dependency" => self.builtin_dependency(positional, named, pos).await,
            "declare_dependency" => self.builtin_declare_dependency(named),
            "custom_target" => self.builtin_custom_target(positional, named, pos),
            "generator" => self.builtin_generator(positional, named, pos),
            "configuration_data" => {
                let data = ConfigurationData::new();
                let holder = HolderRef::new(data);
                self.graph.configuration_datas.push(holder.clone());
                Ok(Value::Holder(holder))
            }
            "configure_file" => self.builtin_configure_file(named, pos).await,
            "include_directories" => self.builtin_include_directories(positional, named),
            "files" => Ok(Value::List(
                positional.iter().filter_map(Value::as_str).map(|p| Value::Holder(HolderRef::new(FileRef { path: p.to_string(), is_build_dir_relative: false }))).collect(),
            )),
            "subproject" => self.builtin_subproject(positional, named, pos).await,
            "get_option" => {
                let opt_name = str_arg(positional.first().ok_or_else(|| InterpreterError::MissingArgument {
                    function: "get_option".to_string(),
                    name: "name".to_string(),
                    pos,
                })?, "get_option", "name", pos)?;
                self.options.get_option(&opt_name).map_err(InterpreterError::from)
            }
            "disabler" => Ok(Value::Disabler),
            "message" => {
                tracing::info!(target: "mbuild::dsl", "{}", join_values(&positional));
                Ok(Value::Unset)
            }
            "warning" => {
                let text = join_values(&positional);
                tracing::warn!(target: "mbuild::dsl", "{}", text);
                self.warnings.push(text);
                Ok(Value::Unset)
            }
            "error" => Err(InterpreterError::Value { message: join_values(&positional), pos }),
            other => Err(InterpreterError::UnknownFunction { name: other.to_string(), pos }),
        }
    }

    fn builtin_project(&mut self, positional: Vec<Value>, named: IndexMap<String, Value>, pos: Position) -> Result<Value, InterpreterError> {
        let schema = ArgSchema {
            positional: vec![ParamType::Str],
            variadic: Some(ParamType::Str),
            named: vec![
                NamedParam { name: "version", ty: ParamType::Str, required: false, default: Some(Value::Str("undefined".to_string())) },
                NamedParam { name: "default_options", ty: ParamType::List, required: false, default: Some(Value::List(Vec::new())) },
            ],
            ..Default::default()
        };
        let named = schema.validate("project", &positional, &named, pos)?;
        self.graph.project_name = str_arg(&positional[0], "project", "name", pos)?;
        self.graph.project_version = named.get("version").and_then(Value::as_str).unwrap_or("undefined").to_string();
        if let Some(Value::List(opts)) = named.get("default_options") {
            for opt in opts.iter().filter_map(Value::as_str) {
                if let Some((key, value)) = opt.split_once('=') {
                    if let Err(e) = self.options.set_from_cli(key, value) {
                        self.warnings.push(format!("default_options: {e}"));
                    }
                }
            }
        }
        Ok(Value::Unset)
    }

    fn builtin_target(
        &mut self,
        kind: TargetKind,
        positional: Vec<Value>,
        named: IndexMap<String, Value>,
        pos: Position,
    ) -> Result<Value, InterpreterError> {
        let function = target_fn_name(kind);
        let schema = ArgSchema {
            positional: vec![ParamType::Str],
            variadic: Some(ParamType::Any),
            named: vec![
                NamedParam { name: "dependencies", ty: ParamType::List, required: false, default: Some(Value::List(Vec::new())) },
                NamedParam { name: "install", ty: ParamType::Bool, required: false, default: Some(Value::Bool(false)) },
                NamedParam { name: "install_dir", ty: ParamType::Str, required: false, default: None },
                NamedParam { name: "include_directories", ty: ParamType::List, required: false, default: Some(Value::List(Vec::new())) },
                NamedParam { name: "link_with", ty: ParamType::List, required: false, default: Some(Value::List(Vec::new())) },
                NamedParam { name: "c_args", ty: ParamType::List, required: false, default: Some(Value::List(Vec::new())) },
                NamedParam { name: "cpp_args", ty: ParamType::List, required: false, default: Some(Value::List(Vec::new())) },
                NamedParam { name: "link_args", ty: ParamType::List, required: false, default: Some(Value::List(Vec::new())) },
                NamedParam { name: "native", ty: ParamType::Bool, required: false, default: Some(Value::Bool(false)) },
            ],
            ..Default::default()
        };
        let named = schema.validate(function, &positional, &named, pos)?;
        let name = str_arg(&positional[0], function, "name", pos)?;

        let mut target = Target::new(&name, self.current_subproject().to_string(), kind);
        for src in positional.iter().skip(1) {
            match src {
                Value::Str(s) => target.sources.push(s.clone()),
                Value::Holder(h) if h.kind() == HolderKind::FileRef => {
                    if let Ok(Value::Str(p)) = h.call_method("full_path", &[], &IndexMap::new()) {
                        target.sources.push(p);
                    }
                }
                Value::Holder(h) if h.kind() == HolderKind::GeneratedList => {
                    if let Ok(Value::List(outs)) = h.call_method("get_outputs", &[], &IndexMap::new()) {
                        target.generated_sources.extend(outs.into_iter().filter_map(|v| v.as_str().map(str::to_string)));
                    }
                }
                _ => {}
            }
        }
        if let Some(Value::Bool(install)) = named.get("install") {
            target.install = *install;
        }
        if let Some(s) = named.get("install_dir").and_then(Value::as_str) {
            target.install_dir = Some(s.to_string());
        }
        if let Some(Value::List(deps)) = named.get("dependencies") {
            for dep in deps {
                if let Some(h) = dep.as_holder() {
                    if let Ok(Value::Str(n)) = h.call_method("name", &[], &IndexMap::new()) {
                        target.dependencies.push(n);
                    }
                }
            }
        }
        if let Some(Value::List(dirs)) = named.get("include_directories") {
            for dir in dirs {
                if let Some(h) = dir.as_holder() {
                    if let Ok(Value::List(paths)) = h.call_method("get_paths", &[], &IndexMap::new()) {
                        target.include_dirs.extend(paths.into_iter().filter_map(|v| v.as_str().map(str::to_string)));
                    }
                }
            }
        }
        let mut link_with_identity = Vec::new();
        if let Some(Value::List(links)) = named.get("link_with") {
            for l in links {
                if let Some(h) = l.as_holder() {
                    if let Ok(Value::Str(n)) = h.call_method("name", &[], &IndexMap::new()) {
                        let identity = (self.current_subproject().to_string(), n);
                        target.link_with.push(identity.clone());
                        link_with_identity.push(identity);
                    }
                }
            }
        }

        let native = matches!(named.get("native"), Some(Value::Bool(true)));
        target.machine =
            if native { crate::environment::MachineKind::Build } else { crate::environment::MachineKind::Host };

        if let Some(Value::List(args)) = named.get("link_args") {
            target.link_args = string_list(args);
        }

        let machine_prefix = if native { "build." } else { "" };
        for (lang, named_key) in [("c", "c_args"), ("cpp", "cpp_args")] {
            let mut args = Vec::new();
            if let Ok(Value::List(global)) = self.options.get_option(&format!("{machine_prefix}{named_key}")) {
                args.extend(string_list(&global));
            }
            if let Some(Value::List(local)) = named.get(named_key) {
                args.extend(string_list(local));
            }
            if !args.is_empty() {
                target.compile_args.insert(lang.to_string(), args);
            }
        }

        self.graph
            .add_target(self.current_subproject(), &name, HolderRef::new(target))
            .map_err(|e| InterpreterError::DuplicateTarget { name: e.to_string(), pos })?;
        if !link_with_identity.is_empty() {
            self.graph
                .record_link_with(self.current_subproject(), &name, link_with_identity)
                .map_err(|e| InterpreterError::Graph(e.to_string()))?;
        }
        Ok(self.graph.find_target(self.current_subproject(), &name).cloned().map(Value::Holder).expect("just inserted"))
    }

    async fn builtin_dependency(
        &mut self,
        positional: Vec<Value>,
        named: IndexMap<String, Value>,
        pos: Position,
    ) -> Result<Value, InterpreterError> {
        let schema = ArgSchema {
            positional: vec![ParamType::Str],
            named: vec![
                NamedParam { name: "required", ty: ParamType::Any, required: false, default: Some(Value::Bool(true)) },
                NamedParam { name: "version", ty: ParamType::Any, required: false, default: None },
                NamedParam { name: "static", ty: ParamType::Bool, required: false, default: None },
                NamedParam { name: "method", ty: ParamType::Str, required: false, default: None },
                NamedParam { name: "modules", ty: ParamType::List, required: false, default: Some(Value::List(Vec::new())) },
                NamedParam { name: "fallback", ty: ParamType::List, required: false, default: None },
            ],
            ..Default::default()
        };
        let named = schema.validate("dependency", &positional, &named, pos)?;
        let name = str_arg(&positional[0], "dependency", "name", pos)?;

        let mut spec = DependencySpec::new(&name);
        spec.required = named.get("required").map(RequiredSpec::from_value).unwrap_or(RequiredSpec::Always);
        spec.is_static = named.get("static").and_then(Value::as_bool);
        spec.method = named.get("method").and_then(Value::as_str).map(str::to_string);
        spec.modules = named.get("modules").and_then(Value::as_list).map(|l| string_list(l)).unwrap_or_default();
        spec.version_constraints = match named.get("version") {
            Some(Value::Str(s)) => vec![s.clone()],
            Some(Value::List(items)) => string_list(items),
            _ => Vec::new(),
        };
        spec.include_type = ResolverIncludeType::Preserve;
        if let Some(Value::List(fb)) = named.get("fallback") {
            if fb.len() == 2 {
                if let (Some(sub), Some(var)) = (fb[0].as_str(), fb[1].as_str()) {
                    spec.fallback = Some((sub.to_string(), var.to_string()));
                }
            }
        }

        let resolved = self.resolver.resolve(&spec, &self.environment).await;
        let dep = match resolved {
            Some(dep) => dep,
            None => match spec.fallback.clone() {
                Some((subproject_name, variable)) => {
                    self.enter_subproject(&subproject_name, pos).await?;
                    let value = self
                        .find_in_subproject(&subproject_name, &variable)
                        .ok_or_else(|| InterpreterError::DependencyNotFound { name: name.clone(), pos })?;
                    return Ok(value);
                }
                None if spec.required.is_hard_error_if_missing() => {
                    return Err(InterpreterError::DependencyNotFound { name, pos })
                }
                None => Dependency::not_found(&name),
            },
        };
        self.graph.dependencies.push(HolderRef::new(dep.clone()));
        Ok(Value::Holder(HolderRef::new(dep)))
    }

    fn builtin_declare_dependency(&mut self, named: IndexMap<String, Value>) -> Result<Value, InterpreterError> {
        let compile_args = named.get("compile_args").and_then(Value::as_list).map(|l| string_list(l)).unwrap_or_default();
        let link_args = named.get("link_args").and_then(Value::as_list).map(|l| string_list(l)).unwrap_or_default();
        let version = named.get("version").and_then(Value::as_str).unwrap_or("undefined").to_string();
        let dep = Dependency::found("declared", version, compile_args, link_args);
        let holder = HolderRef::new(dep);
        self.graph.dependencies.push(holder.clone());
        Ok(Value::Holder(holder))
    }

    fn builtin_custom_target(&mut self, positional: Vec<Value>, named: IndexMap<String, Value>, pos: Position) -> Result<Value, InterpreterError> {
        let name = positional.first().and_then(Value::as_str).unwrap_or("custom").to_string();
        let mut cc = CustomCommand::new(&name);
        if let Some(Value::List(inputs)) = named.get("input") {
            cc.inputs = string_list(inputs);
        }
        if let Some(Value::List(outputs)) = named.get("output") {
            cc.outputs = string_list(outputs);
            for output in &cc.outputs {
                if output.contains("..") || output.starts_with('/') {
                    return Err(InterpreterError::Value { message: format!("custom_target output '{output}' escapes the target's private directory"), pos });
                }
            }
        }
        if let Some(Value::List(cmd)) = named.get("command") {
            cc.command = string_list(cmd);
        }
        cc.depfile = named.get("depfile").and_then(Value::as_str).map(str::to_string);
        cc.capture = named.get("capture").and_then(Value::as_bool).unwrap_or(false);
        cc.feed = named.get("feed").and_then(Value::as_bool).unwrap_or(false);
        cc.console = named.get("console").and_then(Value::as_bool).unwrap_or(false);
        cc.build_by_default = named.get("build_by_default").and_then(Value::as_bool).unwrap_or(false);
        let holder = HolderRef::new(cc);
        self.graph.custom_commands.push(holder.clone());
        Ok(Value::Holder(holder))
    }

    fn builtin_generator(&mut self, positional: Vec<Value>, named: IndexMap<String, Value>, _pos: Position) -> Result<Value, InterpreterError> {
        let command = positional.iter().filter_map(Value::as_str).map(str::to_string).collect();
        let output_template = named.get("output").and_then(Value::as_list).map(|l| string_list(l)).unwrap_or_default();
        let arguments = named.get("arguments").and_then(Value::as_list).map(|l| string_list(l)).unwrap_or_default();
        let holder = HolderRef::new(Generator { command, output_template, arguments });
        self.graph.generators.push(holder.clone());
        Ok(Value::Holder(holder))
    }

    async fn builtin_configure_file(&mut self, named: IndexMap<String, Value>, pos: Position) -> Result<Value, InterpreterError> {
        let input = named.get("input").and_then(Value::as_str).ok_or_else(|| InterpreterError::MissingArgument {
            function: "configure_file".to_string(),
            name: "input".to_string(),
            pos,
        })?;
        let output = named.get("output").and_then(Value::as_str).ok_or_else(|| InterpreterError::MissingArgument {
            function: "configure_file".to_string(),
            name: "output".to_string(),
            pos,
        })?;
        let data_holder = named.get("configuration").and_then(Value::as_holder).ok_or_else(|| InterpreterError::MissingArgument {
            function: "configure_file".to_string(),
            name: "configuration".to_string(),
            pos,
        })?;

        let full_input = self.source_root.join(input);
        let template = crate::sandbox::read_file_bounded(&full_input, crate::sandbox::MAX_OUTPUT_BYTES, Duration::from_secs(10))
            .await
            .map_err(|e| InterpreterError::Value { message: format!("reading configure_file input '{input}': {e}"), pos })?;

        if data_holder.kind() != HolderKind::ConfigurationData {
            return Err(InterpreterError::ArgTypeMismatch {
                function: "configure_file".to_string(),
                which: "configuration".to_string(),
                expected: "cfg_data".to_string(),
                got: data_holder.kind().type_name().to_string(),
                pos,
            });
        }
        let format = named.get("format").and_then(Value::as_str).unwrap_or("").to_string();
        let content = match data_holder.call_method("render_template", &[Value::Str(template), Value::Str(format)], &IndexMap::new()) {
            Ok(Value::Str(s)) => s,
            Ok(_) | Err(_) => {
                return Err(InterpreterError::Value { message: format!("configure_file: could not render '{input}'"), pos })
            }
        };

        self.graph.configured_files.push(crate::graph::ConfiguredFile { output: output.to_string(), content });
        Ok(Value::Holder(HolderRef::new(FileRef { path: output.to_string(), is_build_dir_relative: true })))
    }

    fn builtin_include_directories(&mut self, positional: Vec<Value>, named: IndexMap<String, Value>) -> Result<Value, InterpreterError> {
        let dirs = string_list(&positional);
        let is_system = named.get("is_system").and_then(Value::as_bool).unwrap_or(false);
        Ok(Value::Holder(HolderRef::new(IncludeDirs { dirs, is_system })))
    }

    async fn builtin_subproject(&mut self, positional: Vec<Value>, named: IndexMap<String, Value>, pos: Position) -> Result<Value, InterpreterError> {
        let _ = named;
        let name = positional.first().and_then(Value::as_str).ok_or_else(|| InterpreterError::MissingArgument {
            function: "subproject".to_string(),
            name: "name".to_string(),
            pos,
        })?.to_string();
        self.enter_subproject(&name, pos).await?;
        let found = self.entered_subprojects.get(&name).copied().unwrap_or(false);
        let variables = self.subproject_exports.get(&name).cloned().unwrap_or_default();
        let holder = HolderRef::new(Subproject { name: name.clone(), found, variables });
        self.graph.subprojects.push(holder.clone());
        Ok(Value::Holder(holder))
    }

    /// Evaluates `subprojects/<name>/meson.build` at most once per
    /// configuration ("A subproject is evaluated at
    /// most once" invariant), caching its exported scope for
    /// `.get_variable`/fallback lookups.
    async fn enter_subproject(&mut self, name: &str, pos: Position) -> Result<(), InterpreterError> {
        if self.entered_subprojects.contains_key(name) {
            return Ok(());
        }
        let path = self.source_root.join("subprojects").join(name).join("meson.build");
        let source = match crate::sandbox::read_file_bounded(&path, crate::sandbox::MAX_OUTPUT_BYTES, Duration::from_secs(10)).await {
            Ok(s) => s,
            Err(_) => {
                self.entered_subprojects.insert(name.to_string(), false);
                return Ok(());
            }
        };
        let program = crate::parse(&source, 0).map_err(|e| InterpreterError::Value { message: e.to_string(), pos })?;

        self.push_subproject_scope(name);
        let result = self.eval_block(&program.statements).await;
        let scope = self.pop_subproject_scope();
        result?;

        self.entered_subprojects.insert(name.to_string(), true);
        self.subproject_exports.insert(name.to_string(), scope.snapshot());
        Ok(())
    }

    fn find_in_subproject(&self, subproject: &str, variable: &str) -> Option<Value> {
        self.subproject_exports.get(subproject).and_then(|vars| vars.get(variable)).cloned()
    }
}

fn target_fn_name(kind: TargetKind) -> &'static str {
    match kind {
        TargetKind::Executable => "executable",
        TargetKind::StaticLibrary => "static_library",
        TargetKind::SharedLibrary => "shared_library",
        TargetKind::SharedModule => "shared_module",
        TargetKind::Custom => "custom_target",
        TargetKind::Run => "run_target",
        TargetKind::Jar => "jar",
    }
}

fn join_values(values: &[Value]) -> String {
    values.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(" ")
}
