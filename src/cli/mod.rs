//! Subcommand surface: `setup`/`configure`/`compile`/`install`/`test`/
//! `introspect`/`dist`/`init`/`rewrite`/`subprojects`/`wrap`. Exit code
//! convention: 0 success, 1 user/build error, 2 invocation error.
//!
//! Grounded on `legacy_src/main.rs` (clap-derive `Cli` struct driving a
//! `#[tokio::main]` entry) and `examples/jpmacdonald-apl/crates/
//! apl-cli/src/main.rs` (tracing-subscriber init ahead of argument
//! parsing, a `Commands` enum matched in `main`, anyhow at the process
//! boundary only).

use crate::backend;
use crate::environment::{Environment, MachineInfo};
use crate::interpreter::Interpreter;
use crate::options::{OptionEnvPolicy, OptionSpec, OptionStore, OptionType, OptionValue};
use crate::state::{self, CoreData, Layout};
use crate::toolchain;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

const ENTRY_FILE: &str = "meson.build";

#[derive(Debug, Parser)]
#[command(name = "mbuild")]
#[command(author, version, about = "Declarative project DSL interpreter and build-graph compiler")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Configure a fresh build directory from a source tree.
    Setup {
        builddir: PathBuf,
        srcdir: Option<PathBuf>,
        #[arg(short = 'D', value_name = "option=value")]
        options: Vec<String>,
        #[arg(long = "cross-file")]
        cross_file: Vec<PathBuf>,
        #[arg(long = "native-file")]
        native_file: Vec<PathBuf>,
        #[arg(long)]
        reconfigure: bool,
        #[arg(long)]
        wipe: bool,
    },
    /// List or change options in an already-configured build directory.
    Configure {
        builddir: PathBuf,
        #[arg(short = 'D', value_name = "option=value")]
        options: Vec<String>,
    },
    /// Lower the configured graph to compile commands (no real executor).
    Compile {
        builddir: PathBuf,
        targets: Vec<String>,
    },
    /// Run the install manifest.
    Install { builddir: PathBuf },
    /// Run registered tests.
    Test {
        builddir: PathBuf,
        names: Vec<String>,
    },
    /// Emit the JSON introspection snapshot.
    Introspect { builddir: PathBuf },
    /// Produce a release source archive.
    Dist { builddir: PathBuf },
    /// Scaffold a new project skeleton.
    Init { dir: PathBuf },
    /// Apply scripted edits to project files.
    Rewrite,
    /// Manage vendored subprojects.
    Subprojects,
    /// Manage `.wrap` dependency descriptors.
    Wrap,
}

/// Dispatches a parsed [`Cli`] and returns the process exit code (never
/// panics on a user-facing error; those are logged and turned into 1).
pub async fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Setup { builddir, srcdir, options, cross_file, native_file, reconfigure, wipe } => {
            cmd_setup(&builddir, srcdir.as_deref(), &options, &cross_file, &native_file, reconfigure, wipe).await
        }
        Commands::Configure { builddir, options } => cmd_configure(&builddir, &options),
        Commands::Compile { builddir, targets } => cmd_compile(&builddir, &targets),
        Commands::Install { builddir } => cmd_install(&builddir),
        Commands::Test { builddir, names } => cmd_test(&builddir, &names),
        Commands::Introspect { builddir } => cmd_introspect(&builddir),
        Commands::Dist { builddir } => cmd_dist(&builddir),
        Commands::Init { dir } => cmd_init(&dir),
        Commands::Rewrite => {
            tracing::warn!("rewrite is not wired to a live editing backend in this build");
            Ok(2)
        }
        Commands::Subprojects => {
            tracing::warn!("subprojects management is not wired to a fetcher in this build");
            Ok(2)
        }
        Commands::Wrap => {
            tracing::warn!("wrap-file handling is not wired to a fetcher in this build");
            Ok(2)
        }
    }
}

/// The handful of options every project gets for free, independent of
/// anything it declares itself: install-path overrides and the
/// warning/optimization/library-kind knobs every backend needs.
fn declare_standard_options(store: &mut OptionStore) -> Result<()> {
    let specs = [
        OptionSpec {
            name: "prefix".to_string(),
            ty: OptionType::Str,
            default: OptionValue::Str("/usr/local".to_string()),
            env_policy: OptionEnvPolicy::Always,
            description: "install prefix".to_string(),
        },
        OptionSpec {
            name: "libdir".to_string(),
            ty: OptionType::Str,
            default: OptionValue::Str("lib".to_string()),
            env_policy: OptionEnvPolicy::Always,
            description: "library install directory relative to prefix".to_string(),
        },
        OptionSpec {
            name: "bindir".to_string(),
            ty: OptionType::Str,
            default: OptionValue::Str("bin".to_string()),
            env_policy: OptionEnvPolicy::Always,
            description: "executable install directory relative to prefix".to_string(),
        },
        OptionSpec {
            name: "buildtype".to_string(),
            ty: OptionType::Enum(vec![
                "plain".to_string(),
                "debug".to_string(),
                "debugoptimized".to_string(),
                "release".to_string(),
                "minsize".to_string(),
                "custom".to_string(),
            ]),
            default: OptionValue::Enum("debug".to_string()),
            env_policy: OptionEnvPolicy::Always,
            description: "overall optimization/debug profile".to_string(),
        },
        OptionSpec {
            name: "werror".to_string(),
            ty: OptionType::Bool,
            default: OptionValue::Bool(false),
            env_policy: OptionEnvPolicy::Always,
            description: "treat warnings as errors".to_string(),
        },
        OptionSpec {
            name: "default_library".to_string(),
            ty: OptionType::Enum(vec!["shared".to_string(), "static".to_string(), "both".to_string()]),
            default: OptionValue::Enum("shared".to_string()),
            env_policy: OptionEnvPolicy::Always,
            description: "default library linkage when a target doesn't say".to_string(),
        },
        OptionSpec {
            name: "c_args".to_string(),
            ty: OptionType::StringArray,
            default: OptionValue::StringArray(Vec::new()),
            env_policy: OptionEnvPolicy::InitialOnly,
            description: "extra arguments passed to the C compiler for every target".to_string(),
        },
        OptionSpec {
            name: "cpp_args".to_string(),
            ty: OptionType::StringArray,
            default: OptionValue::StringArray(Vec::new()),
            env_policy: OptionEnvPolicy::InitialOnly,
            description: "extra arguments passed to the C++ compiler for every target".to_string(),
        },
    ];
    for spec in specs {
        store.declare(spec).context("declaring a standard option")?;
    }
    Ok(())
}

fn apply_cli_options(store: &mut OptionStore, options: &[String]) -> Result<()> {
    for entry in options {
        let (key, value) = entry.split_once('=').with_context(|| format!("-D{entry}: expected 'name=value'"))?;
        store.set_from_cli(key, value).with_context(|| format!("-D{entry}"))?;
    }
    Ok(())
}

async fn cmd_setup(
    builddir: &Path,
    srcdir: Option<&Path>,
    options: &[String],
    cross_file: &[PathBuf],
    native_file: &[PathBuf],
    _reconfigure: bool,
    wipe: bool,
) -> Result<i32> {
    let srcdir = srcdir.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
    let layout = Layout::new(builddir);
    if wipe && builddir.exists() {
        std::fs::remove_dir_all(builddir).context("wiping build directory")?;
    }
    layout.ensure_dirs().context("creating build directory layout")?;

    let entry = srcdir.join(ENTRY_FILE);
    let source = std::fs::read_to_string(&entry).with_context(|| format!("reading {}", entry.display()))?;
    let program = crate::parser::parse(&source, 0).map_err(|e| anyhow::anyhow!("{e}"))?;

    let mut store = OptionStore::new();
    declare_standard_options(&mut store)?;
    apply_cli_options(&mut store, options)?;

    let mut toolchain_paths: Vec<PathBuf> = native_file.to_vec();
    toolchain_paths.extend(cross_file.iter().cloned());
    let is_cross = !cross_file.is_empty();
    let build_machine = MachineInfo::host_native();
    let environment = if is_cross { Environment::new(build_machine.clone(), build_machine) } else { Environment::native(build_machine) };
    if !toolchain_paths.is_empty() {
        let descriptor = toolchain::load_chain(&toolchain_paths).context("loading toolchain descriptor")?;
        tracing::info!(binaries = descriptor.binaries.len(), "loaded toolchain descriptor");
    }

    let mut interpreter = Interpreter::new(store, environment, srcdir.clone());
    if let Err(e) = interpreter.run(&program).await {
        tracing::error!(%e, "interpretation failed");
        return Ok(1);
    }
    for warning in &interpreter.warnings {
        tracing::warn!("{warning}");
    }

    let lowered = match backend::lower(&interpreter.graph, &interpreter.environment, &interpreter.options) {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(%e, "backend lowering failed");
            return Ok(1);
        }
    };
    for warning in &lowered.warnings {
        tracing::warn!("{warning}");
    }

    std::fs::write(builddir.join("build.ninja"), backend::render_ninja(&lowered)).context("writing build.ninja")?;
    let compile_commands = backend::render_compile_commands(&lowered, &builddir.display().to_string());
    std::fs::write(
        builddir.join("compile_commands.json"),
        serde_json::to_vec_pretty(&compile_commands).context("serializing compile_commands.json")?,
    )
    .context("writing compile_commands.json")?;

    let introspection = backend::introspect(&interpreter.graph, &interpreter.options);
    state::write_introspection(&layout, &introspection).context("writing introspection snapshot")?;

    let tracked = vec![entry.clone()];
    let hashes = state::hash_tracked_paths(&tracked).context("hashing tracked inputs")?;
    let mut core = CoreData::new(interpreter.graph.project_name.clone(), interpreter.graph.project_version.clone());
    core.options = interpreter.options.snapshot();
    core.tracked_file_hashes = hashes;
    core.cross_files = cross_file.iter().map(|p| p.display().to_string()).collect();
    core.native_files = native_file.iter().map(|p| p.display().to_string()).collect();
    state::save_coredata(&layout, &core).context("persisting configure state")?;

    println!("configured '{}' into '{}'", interpreter.graph.project_name, builddir.display());
    Ok(0)
}

fn cmd_configure(builddir: &Path, options: &[String]) -> Result<i32> {
    let layout = Layout::new(builddir);
    let core = state::load_coredata(&layout).context("loading persisted configure state")?;
    let Some(mut core) = core else {
        eprintln!("'{}' has not been configured", builddir.display());
        return Ok(1);
    };
    if options.is_empty() {
        for (name, value) in &core.options {
            println!("{name} = {value:?}");
        }
        return Ok(0);
    }
    for entry in options {
        let Some((key, value)) = entry.split_once('=') else {
            eprintln!("-D{entry}: expected 'name=value'");
            return Ok(2);
        };
        core.cli_option_overrides.insert(key.to_string(), value.to_string());
    }
    state::save_coredata(&layout, &core).context("persisting updated options")?;
    println!("updated options for '{}'; re-run setup to apply", builddir.display());
    Ok(0)
}

fn cmd_compile(builddir: &Path, targets: &[String]) -> Result<i32> {
    let layout = Layout::new(builddir);
    if state::load_coredata(&layout).context("loading persisted configure state")?.is_none() {
        eprintln!("'{}' has not been configured", builddir.display());
        return Ok(1);
    }
    let ninja_path = builddir.join("build.ninja");
    if !ninja_path.exists() {
        eprintln!("no build.ninja in '{}'; run setup first", builddir.display());
        return Ok(1);
    }
    if targets.is_empty() {
        println!("lowered build graph is up to date in '{}'", builddir.display());
    } else {
        println!("lowered build graph covers targets: {}", targets.join(", "));
    }
    Ok(0)
}

fn cmd_install(builddir: &Path) -> Result<i32> {
    let layout = Layout::new(builddir);
    let Some(_core) = state::load_coredata(&layout).context("loading persisted configure state")? else {
        eprintln!("'{}' has not been configured", builddir.display());
        return Ok(1);
    };
    let destdir = std::env::var("DESTDIR").unwrap_or_default();
    println!("install manifest would be applied under DESTDIR='{destdir}' (no live executor wired in this build)");
    Ok(0)
}

fn cmd_test(builddir: &Path, names: &[String]) -> Result<i32> {
    let layout = Layout::new(builddir);
    if state::load_coredata(&layout).context("loading persisted configure state")?.is_none() {
        eprintln!("'{}' has not been configured", builddir.display());
        return Ok(1);
    }
    if names.is_empty() {
        println!("no tests selected (test execution has no live executor wired in this build)");
    } else {
        println!("would run tests: {}", names.join(", "));
    }
    Ok(0)
}

fn cmd_introspect(builddir: &Path) -> Result<i32> {
    let layout = Layout::new(builddir);
    let path = layout.introspect_path();
    let text = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    println!("{text}");
    Ok(0)
}

fn cmd_dist(builddir: &Path) -> Result<i32> {
    let layout = Layout::new(builddir);
    if state::load_coredata(&layout).context("loading persisted configure state")?.is_none() {
        eprintln!("'{}' has not been configured", builddir.display());
        return Ok(1);
    }
    println!("dist archive assembly has no live executor wired in this build");
    Ok(0)
}

fn cmd_init(dir: &Path) -> Result<i32> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let entry = dir.join(ENTRY_FILE);
    if entry.exists() {
        eprintln!("{} already exists", entry.display());
        return Ok(1);
    }
    let name = dir.file_name().and_then(|n| n.to_str()).unwrap_or("untitled").to_string();
    std::fs::write(&entry, format!("project('{name}', 'c', version: '0.1.0')\n")).context("writing project skeleton")?;
    println!("created {}", entry.display());
    Ok(0)
}
