use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

struct TestContext {
    temp_dir: TempDir,
}

impl TestContext {
    fn new() -> Self {
        Self { temp_dir: TempDir::new().expect("failed to create temp dir") }
    }

    fn mbuild_cmd(&self) -> Command {
        let bin_path = env!("CARGO_BIN_EXE_mbuild");
        Command::new(bin_path)
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.temp_dir.path().join(rel)
    }
}

#[test]
fn init_scaffolds_entry_file() {
    let ctx = TestContext::new();
    let dir = ctx.path("proj");
    let output = ctx.mbuild_cmd().arg("init").arg(&dir).output().expect("failed to run mbuild init");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(dir.join("meson.build").exists());
}

#[test]
fn init_refuses_to_overwrite_existing_entry_file() {
    let ctx = TestContext::new();
    let dir = ctx.path("proj");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("meson.build"), "project('existing', 'c')\n").unwrap();
    let output = ctx.mbuild_cmd().arg("init").arg(&dir).output().expect("failed to run mbuild init");
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn setup_then_introspect_roundtrips_project_name() {
    let ctx = TestContext::new();
    let srcdir = ctx.path("src");
    std::fs::create_dir_all(&srcdir).unwrap();
    std::fs::write(srcdir.join("meson.build"), "project('widget', 'c', version: '1.2.3')\n").unwrap();

    let builddir = ctx.path("build");
    let setup = ctx
        .mbuild_cmd()
        .arg("setup")
        .arg(&builddir)
        .arg(&srcdir)
        .output()
        .expect("failed to run mbuild setup");
    assert!(setup.status.success(), "stderr: {}", String::from_utf8_lossy(&setup.stderr));

    assert!(builddir.join("build.ninja").exists());
    assert!(builddir.join("compile_commands.json").exists());
    assert!(builddir.join("meson-private/coredata.json").exists());
    assert!(builddir.join("meson-info/intro.json").exists());

    let introspect = ctx.mbuild_cmd().arg("introspect").arg(&builddir).output().expect("failed to run mbuild introspect");
    assert!(introspect.status.success());
    let stdout = String::from_utf8_lossy(&introspect.stdout);
    assert!(stdout.contains("widget"));
    assert!(stdout.contains("1.2.3"));
}

#[test]
fn setup_with_option_override_persists_in_coredata() {
    let ctx = TestContext::new();
    let srcdir = ctx.path("src");
    std::fs::create_dir_all(&srcdir).unwrap();
    std::fs::write(srcdir.join("meson.build"), "project('opted', 'c')\n").unwrap();

    let builddir = ctx.path("build");
    let setup = ctx
        .mbuild_cmd()
        .arg("setup")
        .arg(&builddir)
        .arg(&srcdir)
        .arg("-Dwerror=true")
        .output()
        .expect("failed to run mbuild setup");
    assert!(setup.status.success(), "stderr: {}", String::from_utf8_lossy(&setup.stderr));

    let coredata = std::fs::read_to_string(builddir.join("meson-private/coredata.json")).unwrap();
    assert!(coredata.contains("\"werror\""));
    assert!(coredata.contains("true"));
}

#[test]
fn commands_against_unconfigured_builddir_report_exit_code_one() {
    let ctx = TestContext::new();
    let builddir = ctx.path("nope");
    let output = ctx.mbuild_cmd().arg("compile").arg(&builddir).output().expect("failed to run mbuild compile");
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn unimplemented_subcommands_report_exit_code_two() {
    let ctx = TestContext::new();
    for sub in ["rewrite", "subprojects", "wrap"] {
        let output = ctx.mbuild_cmd().arg(sub).output().expect("failed to run mbuild");
        assert_eq!(output.status.code(), Some(2), "subcommand {sub} should report exit code 2");
    }
}
