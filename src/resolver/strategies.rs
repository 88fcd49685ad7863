//! The strategy chain `dependency(name, ...)` walks:
//! override, package-info, framework, cmake-export, system. Each
//! strategy either produces a found [`Dependency`] or defers to the
//! next one; none of them treat "not found" as an error, since
//! `required` handling belongs one level up in the resolver itself.

use crate::environment::Environment;
use crate::graph::Dependency;
use crate::resolver::types::DependencySpec;
use crate::sandbox::{self, SandboxRequest};
use async_trait::async_trait;
use std::path::Path;

#[async_trait(?Send)]
pub trait Strategy {
    fn name(&self) -> &'static str;
    async fn try_resolve(&self, spec: &DependencySpec, env: &Environment) -> Option<Dependency>;
}

/// Queries a system package-info tool (`pkg-config`) for compile/link
/// flags and version. Grounded on `legacy_src/commands/which_cmd.rs`'s
/// pattern of shelling out and parsing first-line output, via
/// [`crate::sandbox::run`].
pub struct PackageInfoStrategy;

#[async_trait(?Send)]
impl Strategy for PackageInfoStrategy {
    fn name(&self) -> &'static str {
        "pkg-config"
    }

    async fn try_resolve(&self, spec: &DependencySpec, _env: &Environment) -> Option<Dependency> {
        let version_args = vec!["--modversion".to_string(), spec.name.clone()];
        let version_out = sandbox::run(SandboxRequest::new("pkg-config", &version_args)).await.ok()?;
        if !version_out.success() {
            return None;
        }
        let version = version_out.stdout.trim().to_string();

        let cflags_args = vec!["--cflags".to_string(), spec.name.clone()];
        let cflags_out = sandbox::run(SandboxRequest::new("pkg-config", &cflags_args)).await.ok()?;
        let compile_args = split_flags(&cflags_out.stdout);

        let libs_args = vec!["--libs".to_string(), spec.name.clone()];
        let libs_out = sandbox::run(SandboxRequest::new("pkg-config", &libs_args)).await.ok()?;
        let link_args = split_flags(&libs_out.stdout);

        Some(Dependency::found(&spec.name, version, compile_args, link_args))
    }
}

fn split_flags(s: &str) -> Vec<String> {
    s.split_whitespace().map(|t| t.to_string()).collect()
}

/// Apple-family-only framework directory search. Everywhere else this
/// strategy defers immediately.
pub struct FrameworkStrategy;

#[async_trait(?Send)]
impl Strategy for FrameworkStrategy {
    fn name(&self) -> &'static str {
        "framework"
    }

    async fn try_resolve(&self, spec: &DependencySpec, env: &Environment) -> Option<Dependency> {
        if env.host.os != crate::environment::OsFamily::Darwin {
            return None;
        }
        let framework_dirs = [
            "/System/Library/Frameworks",
            "/Library/Frameworks",
        ];
        let framework_name = format!("{}.framework", capitalize(&spec.name));
        for dir in framework_dirs {
            if Path::new(dir).join(&framework_name).is_dir() {
                return Some(Dependency::found(
                    &spec.name,
                    "unknown",
                    vec!["-F".to_string(), dir.to_string()],
                    vec!["-framework".to_string(), capitalize(&spec.name)],
                ));
            }
        }
        None
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// Would invoke a CMake-find helper subprocess and parse its
/// discovered include/link/define info; no CMake-exported config
/// packages exist in this environment's reach, so this strategy always
/// defers. Kept as a named link in the chain so `method: 'cmake'`
/// still resolves to a real (if always-empty) strategy rather than a
/// missing one.
pub struct CmakeExportStrategy;

#[async_trait(?Send)]
impl Strategy for CmakeExportStrategy {
    fn name(&self) -> &'static str {
        "cmake"
    }

    async fn try_resolve(&self, _spec: &DependencySpec, _env: &Environment) -> Option<Dependency> {
        None
    }
}

/// Hand-rolled header+library pair search over the usual system
/// include/lib directories, for platforms or packages with no
/// package-info metadata at all.
pub struct SystemStrategy;

#[async_trait(?Send)]
impl Strategy for SystemStrategy {
    fn name(&self) -> &'static str {
        "system"
    }

    async fn try_resolve(&self, spec: &DependencySpec, _env: &Environment) -> Option<Dependency> {
        let include_dirs = ["/usr/include", "/usr/local/include"];
        let lib_dirs = ["/usr/lib", "/usr/lib64", "/usr/local/lib", "/usr/lib/x86_64-linux-gnu"];

        let header = format!("{}.h", spec.name);
        let has_header = include_dirs.iter().any(|d| Path::new(d).join(&header).is_file());
        if !has_header {
            return None;
        }

        let lib_names = [format!("lib{}.so", spec.name), format!("lib{}.a", spec.name)];
        let lib_dir = lib_dirs.iter().find(|d| lib_names.iter().any(|n| Path::new(d).join(n).is_file()));
        let lib_dir = lib_dir?;

        Some(Dependency::found(
            &spec.name,
            "unknown",
            vec!["-I".to_string(), include_dirs.iter().find(|d| Path::new(d).join(&header).is_file()).unwrap().to_string()],
            vec!["-L".to_string(), lib_dir.to_string(), format!("-l{}", spec.name)],
        ))
    }
}
