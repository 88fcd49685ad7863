//! Backend Lowering: walks the frozen Build Object Graph and produces
//! per-source compile commands, per-target link commands (with a
//! DFS-preorder first-seen `link_with` closure), one build statement
//! per custom-target output, an install manifest, and a JSON
//! introspection snapshot.
//!
//! Grounded on `apl-core/src/builder.rs` (closest pack analog: walks a
//! resolved dependency/package graph and emits concrete build actions
//! with an assembled environment) and `legacy_src/commands/registry.rs`
//! (deterministic ordered iteration over a fixed table). The emitted
//! format is a ninja-like rule/build-statement text file plus a
//! `compile_commands.json`-style array, since both fall out directly
//! of the compile commands this stage already computes.

pub mod types;

pub use types::{BackendError, CompileCommand, CustomBuildStatement, InstallAction, LinkCommand, LoweredBuild};

use crate::environment::{Environment, MachineKind};
use crate::graph::{BuildObjectGraph, TargetKind};
use crate::options::OptionStore;
use crate::value::Value;
use indexmap::IndexMap;
use std::collections::HashSet;

/// Map a source file's extension to the language name the interpreter
/// registers compilers under. Unrecognized extensions are skipped with
/// a warning rather than failing the whole lowering pass.
fn language_for_source(path: &str) -> Option<&'static str> {
    let ext = path.rsplit('.').next().unwrap_or("");
    match ext {
        "c" => Some("c"),
        "cc" | "cpp" | "cxx" => Some("cpp"),
        "m" => Some("objc"),
        "rs" => Some("rust"),
        _ => None,
    }
}

fn dict_get<'a>(dict: &'a IndexMap<String, Value>, key: &str) -> Option<&'a Value> {
    dict.get(key)
}

fn dict_str(dict: &IndexMap<String, Value>, key: &str) -> String {
    dict_get(dict, key).and_then(Value::as_str).unwrap_or_default().to_string()
}

fn dict_list_str(dict: &IndexMap<String, Value>, key: &str) -> Vec<String> {
    dict_get(dict, key)
        .and_then(Value::as_list)
        .map(|items| items.iter().filter_map(Value::as_str).map(|s| s.to_string()).collect())
        .unwrap_or_default()
}

fn dict_machine(dict: &IndexMap<String, Value>, key: &str) -> MachineKind {
    match dict_str(dict, key).as_str() {
        "build" => MachineKind::Build,
        _ => MachineKind::Host,
    }
}

fn dict_bool(dict: &IndexMap<String, Value>, key: &str) -> bool {
    dict_get(dict, key).and_then(Value::as_bool).unwrap_or(false)
}

fn dict_pairs(dict: &IndexMap<String, Value>, key: &str) -> Vec<(String, String)> {
    dict_get(dict, key)
        .and_then(Value::as_list)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_list)
                .filter_map(|pair| match pair.as_slice() {
                    [Value::Str(sp), Value::Str(name)] => Some((sp.clone(), name.clone())),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

fn snapshot_dict(holder: &crate::value::HolderRef, which: &str) -> Result<IndexMap<String, Value>, BackendError> {
    match holder.call_method("snapshot", &[], &IndexMap::new()) {
        Ok(Value::Dict(dict)) => Ok(dict),
        _ => Err(BackendError::MalformedSnapshot(which.to_string(), "snapshot".to_string())),
    }
}

/// Recursive dedup of the `link_with` graph reachable from `start`,
/// DFS-preorder, first occurrence wins. Cycles cannot occur here since
/// the BOG rejects them at edge-insertion time, but the visited set
/// still guards against revisiting shared dependencies.
fn link_closure(
    graph: &BuildObjectGraph,
    start: &[(String, String)],
    visited: &mut HashSet<(String, String)>,
    out: &mut Vec<(String, String)>,
) {
    for id in start {
        if !visited.insert(id.clone()) {
            continue;
        }
        out.push(id.clone());
        if let Some(holder) = graph.find_target(&id.0, &id.1) {
            if let Ok(dict) = snapshot_dict(holder, &id.1) {
                let nested = dict_pairs(&dict, "link_with");
                link_closure(graph, &nested, visited, out);
            }
        }
    }
}

fn output_object_path(subproject: &str, target: &str, source: &str) -> String {
    let basename = source.rsplit('/').next().unwrap_or(source);
    format!("{target}.p/{basename}.o", target = private_dir_name(subproject, target))
}

fn private_dir_name(subproject: &str, target: &str) -> String {
    if subproject.is_empty() {
        target.to_string()
    } else {
        format!("{subproject}/{target}")
    }
}

fn target_output_path(subproject: &str, name: &str, kind: TargetKind) -> String {
    match kind {
        TargetKind::StaticLibrary => format!("{}/lib{name}.a", private_dir_name(subproject, name)),
        TargetKind::SharedLibrary | TargetKind::SharedModule => format!("{}/lib{name}.so", private_dir_name(subproject, name)),
        _ => format!("{}/{name}", private_dir_name(subproject, name)),
    }
}

fn parse_target_kind(s: &str) -> TargetKind {
    match s {
        "executable" => TargetKind::Executable,
        "static_library" => TargetKind::StaticLibrary,
        "shared_library" => TargetKind::SharedLibrary,
        "shared_module" => TargetKind::SharedModule,
        "run" => TargetKind::Run,
        "jar" => TargetKind::Jar,
        _ => TargetKind::Custom,
    }
}

/// Look up a dependency by name among already-resolved dependency
/// holders, returning its compile/link args (empty for a not-found
/// dependency, which is only ever reachable here when `required:
/// false` let interpretation continue).
fn dependency_flags(graph: &BuildObjectGraph, name: &str) -> (Vec<String>, Vec<String>) {
    for holder in &graph.dependencies {
        if holder.call_method("name", &[], &IndexMap::new()).ok() == Some(Value::Str(name.to_string())) {
            let compile_args = match holder.call_method("compile_args", &[], &IndexMap::new()) {
                Ok(Value::List(items)) => items.iter().filter_map(Value::as_str).map(|s| s.to_string()).collect(),
                _ => Vec::new(),
            };
            let link_args = match holder.call_method("link_args", &[], &IndexMap::new()) {
                Ok(Value::List(items)) => items.iter().filter_map(Value::as_str).map(|s| s.to_string()).collect(),
                _ => Vec::new(),
            };
            return (compile_args, link_args);
        }
    }
    (Vec::new(), Vec::new())
}

/// Main entry point: lower the frozen graph into concrete command
/// lines. Runs after interpretation finishes, so every compiler a
/// target's sources need has already been discovered and cached on
/// `environment`.
pub fn lower(graph: &BuildObjectGraph, environment: &Environment, _options: &OptionStore) -> Result<LoweredBuild, BackendError> {
    let mut build = LoweredBuild::default();

    for holder in graph.targets() {
        let dict = snapshot_dict(holder, "target")?;
        let name = dict_str(&dict, "name");
        let subproject = dict_str(&dict, "subproject");
        let kind = parse_target_kind(&dict_str(&dict, "kind"));
        let mut sources = dict_list_str(&dict, "sources");
        sources.extend(dict_list_str(&dict, "generated_sources"));
        let include_dirs = dict_list_str(&dict, "include_dirs");
        let dependencies = dict_list_str(&dict, "dependencies");
        let own_link_args = dict_list_str(&dict, "link_args");
        let compile_args_dict = match dict_get(&dict, "compile_args") {
            Some(Value::Dict(d)) => d.clone(),
            _ => IndexMap::new(),
        };
        let target_machine = dict_machine(&dict, "machine");

        let mut object_paths = Vec::new();
        let mut languages_used: Vec<&'static str> = Vec::new();

        for source in &sources {
            let Some(lang) = language_for_source(source) else {
                build.warnings.push(format!("{name}: unrecognized source language for '{source}', skipped"));
                continue;
            };
            let Some(compiler) = environment.compiler(target_machine, lang) else {
                build.warnings.push(format!("{name}: no {lang} compiler discovered, skipping '{source}'"));
                continue;
            };
            if !languages_used.contains(&lang) {
                languages_used.push(lang);
            }

            let output = output_object_path(&subproject, &name, source);
            let mut command = vec![compiler.path.clone()];
            command.extend(compiler.default_args.iter().cloned());
            for dir in &include_dirs {
                command.push(format!("-I{dir}"));
            }
            for dep_name in &dependencies {
                let (dep_compile, _) = dependency_flags(graph, dep_name);
                command.extend(dep_compile);
            }
            if let Some(Value::List(args)) = compile_args_dict.get(lang) {
                command.extend(args.iter().filter_map(Value::as_str).map(|s| s.to_string()));
            }
            command.push("-c".to_string());
            command.push(source.clone());
            command.push("-o".to_string());
            command.push(output.clone());

            object_paths.push(output.clone());
            build.compile_commands.push(CompileCommand {
                target: name.clone(),
                subproject: subproject.clone(),
                source: source.clone(),
                output,
                command,
            });
        }

        if matches!(kind, TargetKind::Executable | TargetKind::StaticLibrary | TargetKind::SharedLibrary | TargetKind::SharedModule) {
            let link_with = dict_pairs(&dict, "link_with");
            let mut visited = HashSet::new();
            let mut closure = Vec::new();
            link_closure(graph, &link_with, &mut visited, &mut closure);

            let linker_lang = languages_used.first().copied().unwrap_or("c");
            let linker = environment.compiler(target_machine, linker_lang);
            let output = target_output_path(&subproject, &name, kind);

            let link_whole = dict_pairs(&dict, "link_whole");

            let mut command = vec![linker.map(|c| c.path.clone()).unwrap_or_else(|| "cc".to_string())];
            command.extend(object_paths);
            for (dep_sp, dep_name) in &closure {
                if let Some(dep_holder) = graph.find_target(dep_sp, dep_name) {
                    if let Ok(dep_dict) = snapshot_dict(dep_holder, dep_name) {
                        let dep_kind = parse_target_kind(&dict_str(&dep_dict, "kind"));
                        let wrapped_whole = link_whole.iter().any(|w| w == &(dep_sp.clone(), dep_name.clone()));
                        if wrapped_whole {
                            command.push("-Wl,--whole-archive".to_string());
                        }
                        command.push(target_output_path(dep_sp, dep_name, dep_kind));
                        if wrapped_whole {
                            command.push("-Wl,--no-whole-archive".to_string());
                        }
                    }
                }
            }
            for dep_name in &dependencies {
                let (_, dep_link) = dependency_flags(graph, dep_name);
                command.extend(dep_link);
            }
            command.extend(own_link_args.clone());
            if matches!(kind, TargetKind::SharedLibrary | TargetKind::SharedModule) {
                command.push("-shared".to_string());
            }
            command.push("-Wl,-rpath,$ORIGIN".to_string());
            command.push("-o".to_string());
            command.push(output.clone());

            build.link_commands.push(LinkCommand { target: name.clone(), subproject: subproject.clone(), output: output.clone(), command });

            if dict_bool(&dict, "install") {
                let dest_dir = match dict_get(&dict, "install_dir") {
                    Some(Value::Str(s)) => s.clone(),
                    _ => default_install_dir(kind).to_string(),
                };
                let basename = output.rsplit('/').next().unwrap_or(&output).to_string();
                build.install_actions.push(InstallAction {
                    source: output,
                    dest: format!("{dest_dir}/{basename}"),
                    mode: None,
                    strip: false,
                    follow_symlinks: true,
                });
            }
        }
    }

    for holder in &graph.custom_commands {
        let dict = snapshot_dict(holder, "custom_target")?;
        let name = dict_str(&dict, "name");
        let inputs = dict_list_str(&dict, "inputs");
        let outputs = dict_list_str(&dict, "outputs");
        for output in &outputs {
            if output.starts_with('/') || output.split('/').any(|seg| seg == "..") {
                return Err(BackendError::OutputEscapesPrivateDir(name, output.clone()));
            }
        }
        let private_dir = format!("{name}.p");
        let rendered_command = match holder.call_method(
            "render",
            &[Value::Str(private_dir.clone()), Value::Str(String::new()), Value::Str(private_dir.clone())],
            &IndexMap::new(),
        ) {
            Ok(Value::List(items)) => items.iter().filter_map(Value::as_str).map(|s| s.to_string()).collect(),
            _ => Vec::new(),
        };
        build.custom_build_statements.push(CustomBuildStatement {
            name,
            inputs,
            outputs,
            command: rendered_command,
            depfile: match dict_get(&dict, "depfile") {
                Some(Value::Str(s)) => Some(s.clone()),
                _ => None,
            },
            build_by_default: dict_bool(&dict, "build_by_default"),
        });
    }

    Ok(build)
}

/// Where an un-prefixed target's install destination lands relative to
/// the install prefix, absent an explicit `install_dir:`.
fn default_install_dir(kind: TargetKind) -> &'static str {
    match kind {
        TargetKind::Executable => "bin",
        _ => "lib",
    }
}

/// Convert a BOG [`Value`] into `serde_json::Value` for the
/// introspection snapshot.
fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(n) => serde_json::Value::Number((*n).into()),
        Value::Str(s) => serde_json::Value::String(s.clone()),
        Value::List(items) => serde_json::Value::Array(items.iter().map(value_to_json).collect()),
        Value::Dict(map) => serde_json::Value::Object(map.iter().map(|(k, v)| (k.clone(), value_to_json(v))).collect()),
        Value::Holder(h) => serde_json::Value::String(format!("<{}>", h.kind().type_name())),
        Value::Disabler | Value::Unset => serde_json::Value::Null,
    }
}

/// Machine-readable snapshot written to `<builddir>/meson-info/` by the
/// CLI's `introspect`/`setup` paths.
pub fn introspect(graph: &BuildObjectGraph, options: &OptionStore) -> serde_json::Value {
    let targets: Vec<serde_json::Value> = graph
        .targets()
        .filter_map(|h| snapshot_dict(h, "target").ok())
        .map(|dict| {
            serde_json::json!({
                "name": dict_str(&dict, "name"),
                "type": dict_str(&dict, "kind"),
                "subproject": dict_str(&dict, "subproject"),
                "sources": dict_list_str(&dict, "sources"),
                "generated_sources": dict_list_str(&dict, "generated_sources"),
                "compile_args": dict_get(&dict, "compile_args").map(value_to_json).unwrap_or(serde_json::Value::Null),
                "install": dict_bool(&dict, "install"),
                "install_dir": dict_get(&dict, "install_dir").map(value_to_json).unwrap_or(serde_json::Value::Null),
            })
        })
        .collect();

    let options_json: Vec<serde_json::Value> = options
        .iter()
        .map(|opt| {
            serde_json::json!({
                "name": opt.name,
                "value": options.get_option(&opt.name).ok().as_ref().map(value_to_json).unwrap_or(serde_json::Value::Null),
            })
        })
        .collect();

    serde_json::json!({
        "project_name": graph.project_name,
        "project_version": graph.project_version,
        "targets": targets,
        "options": options_json,
    })
}

/// Ninja-like rule/build statement text rendering. Deterministic:
/// targets and custom statements are emitted in the same order
/// [`lower`] produced them, which is itself declaration order.
pub fn render_ninja(build: &LoweredBuild) -> String {
    let mut out = String::new();
    out.push_str("rule cc\n  command = $CMD\n\n");
    for cmd in &build.compile_commands {
        out.push_str(&format!("build {}: cc {}\n  CMD = {}\n", cmd.output, cmd.source, cmd.command.join(" ")));
    }
    out.push('\n');
    out.push_str("rule link\n  command = $CMD\n\n");
    for cmd in &build.link_commands {
        let inputs: Vec<&str> = build
            .compile_commands
            .iter()
            .filter(|c| c.target == cmd.target && c.subproject == cmd.subproject)
            .map(|c| c.output.as_str())
            .collect();
        out.push_str(&format!("build {}: link {}\n  CMD = {}\n", cmd.output, inputs.join(" "), cmd.command.join(" ")));
    }
    out.push('\n');
    out.push_str("rule custom\n  command = $CMD\n\n");
    for stmt in &build.custom_build_statements {
        out.push_str(&format!(
            "build {}: custom {}\n  CMD = {}\n",
            stmt.outputs.join(" "),
            stmt.inputs.join(" "),
            stmt.command.join(" ")
        ));
    }
    out
}

/// Trivial compile_commands.json-style emission, falling directly out
/// of the per-source compile commands already computed.
pub fn render_compile_commands(build: &LoweredBuild, directory: &str) -> serde_json::Value {
    serde_json::Value::Array(
        build
            .compile_commands
            .iter()
            .map(|cmd| {
                serde_json::json!({
                    "directory": directory,
                    "file": cmd.source,
                    "arguments": cmd.command,
                    "output": cmd.output,
                })
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::MachineInfo;
    use crate::graph::{Target, TargetKind};
    use crate::value::HolderRef;

    #[tokio::test]
    async fn lowers_single_executable_with_one_source() {
        let mut env = Environment::native(MachineInfo::host_native());
        let path_dirs: Vec<String> = std::env::var("PATH").unwrap_or_default().split(':').map(|s| s.to_string()).collect();
        // Best-effort discovery; if the test host has no C compiler,
        // lowering still succeeds and records a warning instead.
        let _ = env.discover_compiler(MachineKind::Host, "c", &["cc", "gcc", "clang"], &path_dirs).await;

        let mut graph = BuildObjectGraph::new("demo", "1.0");
        let mut target = Target::new("app", "", TargetKind::Executable);
        target.sources = vec!["main.c".to_string()];
        target.install = true;
        graph.add_target("", "app", HolderRef::new(target)).unwrap();

        let options = OptionStore::new();
        let build = lower(&graph, &env, &options).unwrap();
        assert_eq!(build.link_commands.len(), 1);
        assert_eq!(build.link_commands[0].target, "app");
        if env.compiler(MachineKind::Host, "c").is_some() {
            assert_eq!(build.compile_commands.len(), 1);
            assert!(build.install_actions.iter().any(|a| a.dest.starts_with("bin/")));
        } else {
            assert!(build.warnings.iter().any(|w| w.contains("no c compiler")));
        }
    }

    #[test]
    fn custom_target_output_escaping_private_dir_errors() {
        use crate::graph::CustomCommand;
        let mut graph = BuildObjectGraph::new("demo", "1.0");
        let mut cc = CustomCommand::new("gen");
        cc.outputs = vec!["../escape.c".to_string()];
        graph.custom_commands.push(HolderRef::new(cc));

        let env = Environment::native(MachineInfo::host_native());
        let options = OptionStore::new();
        assert!(lower(&graph, &env, &options).is_err());
    }

    #[test]
    fn compile_commands_json_has_one_entry_per_source() {
        let build = LoweredBuild {
            compile_commands: vec![CompileCommand {
                target: "app".to_string(),
                subproject: String::new(),
                source: "main.c".to_string(),
                output: "app.p/main.c.o".to_string(),
                command: vec!["cc".to_string(), "-c".to_string(), "main.c".to_string()],
            }],
            ..Default::default()
        };
        let json = render_compile_commands(&build, "/build");
        assert_eq!(json.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn native_target_compiles_with_build_machine_args() {
        let mut env = Environment::new(MachineInfo::host_native(), MachineInfo::host_native());
        let path_dirs: Vec<String> = std::env::var("PATH").unwrap_or_default().split(':').map(|s| s.to_string()).collect();
        let _ = env.discover_compiler(MachineKind::Build, "c", &["cc", "gcc", "clang"], &path_dirs).await;

        let mut graph = BuildObjectGraph::new("demo", "1.0");
        let mut target = Target::new("gen", "", TargetKind::Executable);
        target.sources = vec!["gen.c".to_string()];
        target.machine = MachineKind::Build;
        target.compile_args.insert("c".to_string(), vec!["-DFOR_BUILD".to_string()]);
        graph.add_target("", "gen", HolderRef::new(target)).unwrap();

        let options = OptionStore::new();
        let build = lower(&graph, &env, &options).unwrap();
        if env.compiler(MachineKind::Build, "c").is_some() {
            assert!(build.compile_commands[0].command.contains(&"-DFOR_BUILD".to_string()));
        }
    }
}
