//! CLI integration tests
//!
//! These run the compiled binary and check exit codes, printed messages and
//! the script file left on disk. Builds go through a stand-in `buildah`
//! placed first on PATH, so no container tooling is needed.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn breakstep_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_breakstep"))
}

fn write_script(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("Containerfile");
    fs::write(&path, content).expect("Failed to write script");
    path
}

fn run(args: &[&str]) -> Output {
    Command::new(breakstep_bin())
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute breakstep")
}

#[test]
fn test_cli_help() {
    let output = run(&["--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("breakstep"));
    assert!(stdout.contains("set-breakpoint"));
    assert!(stdout.contains("build"));
    assert!(stdout.contains("continue"));
}

#[test]
fn test_cli_version() {
    let output = run(&["--version"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_set_breakpoint_rewrites_script() {
    let dir = TempDir::new().unwrap();
    let path = write_script(&dir, "FROM alpine\nRUN echo a\nRUN echo b\n");

    let output = run(&["set-breakpoint", path.to_str().unwrap(), "3"]);

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout.trim(),
        format!("Breakpoint set at line 3 in {}", path.display())
    );
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "FROM alpine\nRUN echo a\n# BREAKPOINT\nRUN echo b\n"
    );
}

#[test]
fn test_set_breakpoint_after_last_line() {
    let dir = TempDir::new().unwrap();
    let path = write_script(&dir, "RUN echo a\n");

    let output = run(&["set-breakpoint", path.to_str().unwrap(), "2"]);

    assert!(output.status.success());
    assert_eq!(fs::read_to_string(&path).unwrap(), "RUN echo a\n# BREAKPOINT\n");
}

#[test]
fn test_set_breakpoint_out_of_range() {
    let dir = TempDir::new().unwrap();
    let path = write_script(&dir, "RUN echo a\n");

    for line in ["0", "3"] {
        let output = run(&["set-breakpoint", path.to_str().unwrap(), line]);
        assert_eq!(output.status.code(), Some(1), "line {}", line);

        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("Invalid line number"), "stderr: {}", stderr);
    }
    assert_eq!(fs::read_to_string(&path).unwrap(), "RUN echo a\n");
}

#[test]
fn test_set_breakpoint_missing_file() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope");

    let output = run(&["set-breakpoint", missing.to_str().unwrap(), "1"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(!missing.exists());
}

#[test]
fn test_list_and_clear_breakpoints() {
    let dir = TempDir::new().unwrap();
    let path = write_script(&dir, "# BREAKPOINT\nRUN echo a\n# BREAKPOINT\n");
    let file = path.to_str().unwrap();

    let output = run(&["breakpoints", file]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("line 1"));
    assert!(stdout.contains("line 3"));

    let output = run(&["clear-breakpoints", file]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Removed 2 breakpoint(s)"));
    assert_eq!(fs::read_to_string(&path).unwrap(), "RUN echo a\n");

    let output = run(&["breakpoints", file]);
    assert!(String::from_utf8_lossy(&output.stdout).contains("No breakpoints"));
}

#[test]
fn test_continue_is_unsupported() {
    let output = run(&["continue"]);

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not supported"));
}

#[test]
fn test_build_missing_script() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope");

    let output = run(&["build", missing.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_unknown_subcommand() {
    let output = run(&["rewind"]);
    assert!(!output.status.success());
}

#[cfg(unix)]
mod fake_buildah {
    use super::*;
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;
    use std::process::Stdio;

    /// Stand-in for buildah: records each subcommand, runs `run` payloads
    /// (including `run -t` breakpoint shells) on the host and prints fixed
    /// container and image ids.
    const FAKE_BUILDAH: &str = r#"#!/bin/sh
shift 6
cmd="$1"
shift
echo "$cmd $*" >> "$FAKE_BUILDAH_LOG"
case "$cmd" in
  from) echo "fake-working-container" ;;
  run)
    [ "$1" = "-t" ] && shift
    shift 2
    exec "$@" ;;
  commit) echo "sha256:fakeimage" ;;
  rm) ;;
  *) echo "unexpected $cmd" >&2; exit 125 ;;
esac
"#;

    struct FakeBuildah {
        dir: TempDir,
    }

    impl FakeBuildah {
        fn install() -> Self {
            let dir = TempDir::new().unwrap();
            let bin = dir.path().join("buildah");
            fs::write(&bin, FAKE_BUILDAH).unwrap();
            fs::set_permissions(&bin, fs::Permissions::from_mode(0o755)).unwrap();
            Self { dir }
        }

        fn log_path(&self) -> PathBuf {
            self.dir.path().join("calls.log")
        }

        fn calls(&self) -> String {
            fs::read_to_string(self.log_path()).unwrap_or_default()
        }

        fn build(&self, script: &Path, extra: &[&str]) -> Output {
            self.command(script, extra)
                .output()
                .expect("Failed to execute breakstep")
        }

        /// Runs a build with `input` fed to the breakpoint shells on stdin
        fn build_with_input(&self, script: &Path, extra: &[&str], input: &str) -> Output {
            let mut child = self
                .command(script, extra)
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .spawn()
                .expect("Failed to execute breakstep");
            child
                .stdin
                .take()
                .unwrap()
                .write_all(input.as_bytes())
                .unwrap();
            child.wait_with_output().unwrap()
        }

        fn command(&self, script: &Path, extra: &[&str]) -> Command {
            let path = format!(
                "{}:{}",
                self.dir.path().display(),
                std::env::var("PATH").unwrap_or_default()
            );
            let mut command = Command::new(breakstep_bin());
            command
                .arg("build")
                .arg(script)
                .args(extra)
                .env("PATH", path)
                .env("FAKE_BUILDAH_LOG", self.log_path())
                .env("BREAKSTEP_ENGINE", "buildah")
                .env("BREAKSTEP_GRAPH_ROOT", self.dir.path().join("graph"))
                .env("BREAKSTEP_RUN_ROOT", self.dir.path().join("run"))
                .env_remove("BREAKSTEP_BASE_IMAGE")
                .env_remove("BREAKSTEP_ARCH")
                .env_remove("BREAKSTEP_OS")
                .env_remove("BREAKSTEP_VARIANT")
                .env_remove("BREAKSTEP_SHELL")
                .env_remove("BREAKSTEP_KEEP_FAILED")
                .env_remove("RUST_LOG");
            command
        }
    }

    #[test]
    fn test_build_commits_image() {
        let fake = FakeBuildah::install();
        let dir = TempDir::new().unwrap();
        let script = write_script(&dir, "FROM alpine\nRUN echo hello-from-step\n");

        let output = fake.build(&script, &["--tag", "localhost/test:dbg"]);

        assert_eq!(
            output.status.code(),
            Some(0),
            "stderr: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("hello-from-step"));
        assert!(stdout.contains("Build Committed"));
        assert!(stdout.contains("sha256:fakeimage"));

        let calls = fake.calls();
        assert!(calls.contains("from docker.io/library/alpine:latest"));
        assert!(calls.contains("run fake-working-container -- echo hello-from-step"));
        assert!(calls.contains("commit --rm fake-working-container localhost/test:dbg"));
    }

    #[test]
    fn test_build_json_report() {
        let fake = FakeBuildah::install();
        let dir = TempDir::new().unwrap();
        let script = write_script(&dir, "RUN true\nCOPY . /src\n");

        let output = fake.build(&script, &["-q", "--format", "json"]);

        assert!(output.status.success());
        let report: serde_json::Value =
            serde_json::from_slice(&output.stdout).expect("stdout should be a JSON report");
        assert_eq!(report["engine"], "buildah");
        assert_eq!(report["commands_executed"], 1);
        assert_eq!(report["directives"], 2);
        assert_eq!(report["image_id"], "sha256:fakeimage");
    }

    #[test]
    fn test_build_pauses_in_shell_at_breakpoint() {
        let fake = FakeBuildah::install();
        let dir = TempDir::new().unwrap();
        let script = write_script(
            &dir,
            "RUN echo before-pause\n# BREAKPOINT\nRUN echo after-pause\n",
        );

        let output = fake.build_with_input(
            &script,
            &[],
            "echo inside-breakpoint-shell\nexit 4\n",
        );

        assert_eq!(
            output.status.code(),
            Some(0),
            "stderr: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        let stdout = String::from_utf8_lossy(&output.stdout);
        let position = |needle: &str| {
            stdout
                .find(needle)
                .unwrap_or_else(|| panic!("{:?} missing from stdout: {}", needle, stdout))
        };
        assert!(position("before-pause") < position("Breakpoint at line 2"));
        assert!(position("Breakpoint at line 2") < position("inside-breakpoint-shell"));
        assert!(position("inside-breakpoint-shell") < position("Resuming after breakpoint at line 2"));
        assert!(position("Resuming after breakpoint at line 2") < position("after-pause"));

        let calls = fake.calls();
        assert!(calls.contains("run -t fake-working-container -- /bin/sh"));
        assert!(calls.contains("commit --rm fake-working-container"));
    }

    #[test]
    fn test_quiet_build_still_announces_breakpoint() {
        let fake = FakeBuildah::install();
        let dir = TempDir::new().unwrap();
        let script = write_script(&dir, "RUN true\n# BREAKPOINT\n");

        let output = fake.build_with_input(&script, &["-q", "--format", "json"], "exit\n");

        assert!(output.status.success());
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("Breakpoint at line 2"), "stderr: {}", stderr);
        assert!(stderr.contains("Entering interactive shell"));

        let report: serde_json::Value =
            serde_json::from_slice(&output.stdout).expect("stdout should be a JSON report");
        assert_eq!(report["breakpoints_hit"], 1);
    }

    #[test]
    fn test_failed_command_discards_container() {
        let fake = FakeBuildah::install();
        let dir = TempDir::new().unwrap();
        let script = write_script(&dir, "RUN false\nRUN echo never-runs\n");

        let output = fake.build(&script, &[]);

        assert_eq!(output.status.code(), Some(1));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("line 1"), "stderr: {}", stderr);

        let calls = fake.calls();
        assert!(!calls.contains("never-runs"));
        assert!(!calls.contains("commit"));
        assert!(calls.contains("rm fake-working-container"));
    }

    #[test]
    fn test_keep_failed_leaves_container() {
        let fake = FakeBuildah::install();
        let dir = TempDir::new().unwrap();
        let script = write_script(&dir, "RUN false\n");

        let output = fake.build(&script, &["--keep-failed"]);

        assert_eq!(output.status.code(), Some(1));
        assert!(!fake.calls().contains("rm fake-working-container"));
        assert!(String::from_utf8_lossy(&output.stdout).contains("kept for inspection"));
    }
}
