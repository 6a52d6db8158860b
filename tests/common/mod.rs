use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::time::{SystemTime, UNIX_EPOCH};

pub struct CmdResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub log_path: PathBuf,
}

impl CmdResult {
    pub fn code(&self) -> Option<i32> {
        self.status.code()
    }

    /// Parse stdout as a single JSON line.
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(self.stdout.trim()).unwrap_or_else(|e| {
            panic!(
                "stdout is not one JSON line ({e}); log at {}",
                self.log_path.display()
            )
        })
    }
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn resolve_bin_path() -> PathBuf {
    if let Ok(path) = std::env::var("CARGO_BIN_EXE_sticky") {
        return PathBuf::from(path);
    }

    let exe_name = if cfg!(windows) { "sticky.exe" } else { "sticky" };
    let fallback = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(PathBuf::from))
        .and_then(|deps| deps.parent().map(PathBuf::from))
        .map(|debug_dir| debug_dir.join(exe_name));

    match fallback {
        Some(path) if path.exists() => path,
        _ => panic!("unable to resolve sticky binary path for integration test"),
    }
}

/// Run the binary with `home` as `$HOME` so default config, state, and
/// activity log paths all land inside the test's temp dir.
pub fn run_cli_case(case_name: &str, home: &Path, args: &[&str]) -> CmdResult {
    let root = std::env::temp_dir().join("sticky-test-logs");
    fs::create_dir_all(&root).expect("create temp test log dir");

    let log_path = root.join(format!("{}-{}.log", sanitize(case_name), now_millis()));
    let bin_path = resolve_bin_path();

    let output = Command::new(&bin_path)
        .args(args)
        .current_dir(home)
        .env("HOME", home)
        .env_remove("STICKY_MANIFEST")
        .env_remove("STICKY_STATE_FILE")
        .env_remove("STICKY_ACTIVITY_LOG")
        .env_remove("STICKY_OUTPUT_FORMAT")
        .env("RUST_BACKTRACE", "1")
        .output()
        .expect("execute sticky command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let mut log_content = String::new();
    log_content.push_str(&format!("case={case_name}\n"));
    log_content.push_str(&format!("bin={}\n", bin_path.display()));
    log_content.push_str(&format!("args={args:?}\n"));
    log_content.push_str(&format!("status={}\n", output.status));
    log_content.push_str("----- stdout -----\n");
    log_content.push_str(&stdout);
    log_content.push('\n');
    log_content.push_str("----- stderr -----\n");
    log_content.push_str(&stderr);
    log_content.push('\n');
    fs::write(&log_path, log_content).expect("write test log");

    CmdResult {
        status: output.status,
        stdout,
        stderr,
        log_path,
    }
}

/// Write `sticky.toml` in `dir` with one entry per `(name, file, content)`.
pub fn write_manifest(dir: &Path, entries: &[(&str, &str, &str)]) -> PathBuf {
    let mut raw = String::new();
    for (name, file, content) in entries {
        raw.push_str(&format!(
            "[files.{name}]\npath = {:?}\ncontent = {content:?}\npermissions = \"0644\"\n\n",
            dir.join(file).to_string_lossy()
        ));
    }
    let path = dir.join("sticky.toml");
    fs::write(&path, raw).expect("write manifest");
    path
}
