//! CLI integration tests.
//!
//! Each test runs the built binary against a vault in its own temporary
//! directory, feeding prompts through stdin.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

const PHRASE: &str =
    "legal winner thank year wave sausage worth useful legal winner thank yellow";
const PASSWORD: &str = "Passw0rd!";

/// Temporary wallet directory with a config file at the minimum KDF cost.
struct Sandbox {
    dir: tempfile::TempDir,
}

impl Sandbox {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        std::fs::write(
            dir.path().join("config.json"),
            r#"{"wallet":{"kdf":{"m_cost":19456,"t_cost":2,"p_cost":1}}}"#,
        )
        .expect("write config");
        Self { dir }
    }

    fn wallet(&self) -> PathBuf {
        self.dir.path().join("wallet.json")
    }

    fn config(&self) -> PathBuf {
        self.dir.path().join("config.json")
    }

    /// Runs the binary; returns (exit_code, stdout, stderr).
    fn run(&self, args: &[&str], stdin: &str, password: Option<&str>) -> (i32, String, String) {
        run_cli(&self.wallet(), &self.config(), args, stdin, password)
    }

    /// Imports `PHRASE` and returns the address.
    fn import(&self) -> String {
        let (code, stdout, stderr) = self.run(
            &["--json", "import"],
            &format!("{PHRASE}\n"),
            Some(PASSWORD),
        );
        assert_eq!(code, 0, "import failed: {stderr}");
        json_field(&stdout, "address")
    }
}

fn run_cli(
    wallet: &Path,
    config: &Path,
    args: &[&str],
    stdin: &str,
    password: Option<&str>,
) -> (i32, String, String) {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_vindex-wallet"));
    cmd.arg("--wallet")
        .arg(wallet)
        .arg("--config")
        .arg(config)
        .args(args)
        .env_remove("VINDEX_WALLET_PASSWORD")
        .env_remove("VINDEX_ADDRESS_PREFIX")
        .env_remove("VINDEX_DERIVATION_PATH")
        .env("RUST_LOG", "warn")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(p) = password {
        cmd.env("VINDEX_WALLET_PASSWORD", p);
    }

    let mut child = cmd.spawn().expect("spawn vindex-wallet");
    if let Some(mut input) = child.stdin.take() {
        // The process may exit before reading everything.
        let _ = input.write_all(stdin.as_bytes());
    }
    let output = child.wait_with_output().expect("wait for vindex-wallet");

    (
        output.status.code().unwrap_or(-1),
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
    )
}

fn json_field(stdout: &str, key: &str) -> String {
    let line = stdout.lines().last().unwrap_or_default();
    let value: serde_json::Value = serde_json::from_str(line).expect("stdout is JSON");
    value[key].as_str().unwrap_or_default().to_string()
}

// -----------------------------------------------------------------------
// Clap parsing
// -----------------------------------------------------------------------

#[test]
fn help_flag_exits_zero() {
    let output = Command::new(env!("CARGO_BIN_EXE_vindex-wallet"))
        .arg("--help")
        .output()
        .expect("run --help");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("VindexChain"));
}

#[test]
fn unknown_command_fails() {
    let sb = Sandbox::new();
    let (code, _, _) = sb.run(&["frobnicate"], "", None);
    assert_ne!(code, 0);
}

#[test]
fn sign_requires_exactly_one_payload() {
    let sb = Sandbox::new();
    let (code, _, _) = sb.run(&["sign"], "", Some(PASSWORD));
    assert_ne!(code, 0);
    let (code, _, _) = sb.run(&["sign", "--hex", "00", "--text", "x"], "", Some(PASSWORD));
    assert_ne!(code, 0);
}

// -----------------------------------------------------------------------
// Wallet lifecycle
// -----------------------------------------------------------------------

#[test]
fn status_without_wallet() {
    let sb = Sandbox::new();
    let (code, stdout, _) = sb.run(&["--json", "status"], "", None);
    assert_eq!(code, 0);
    assert_eq!(json_field(&stdout, "status"), "no-wallet");
}

#[test]
fn import_then_address_and_status() {
    let sb = Sandbox::new();
    let address = sb.import();
    assert!(address.starts_with("vindex1"));
    assert!(sb.wallet().exists());

    let (code, stdout, _) = sb.run(&["--json", "address"], "", None);
    assert_eq!(code, 0);
    assert_eq!(json_field(&stdout, "address"), address);

    let (code, stdout, _) = sb.run(&["--json", "status"], "", None);
    assert_eq!(code, 0);
    assert_eq!(json_field(&stdout, "status"), "locked");
    assert_eq!(json_field(&stdout, "derivation_path"), "m/44'/118'/0'/0/0");
}

#[test]
fn import_refuses_to_overwrite_without_force() {
    let sb = Sandbox::new();
    sb.import();
    let (code, _, stderr) = sb.run(&["import"], &format!("{PHRASE}\n"), Some(PASSWORD));
    assert_ne!(code, 0);
    assert!(stderr.contains("--force"));

    let (code, _, _) = sb.run(&["import", "--force"], &format!("{PHRASE}\n"), Some(PASSWORD));
    assert_eq!(code, 0);
}

#[test]
fn import_invalid_phrase_creates_nothing() {
    let sb = Sandbox::new();
    let bad = PHRASE.replace("sausage", "sausages");
    let (code, _, stderr) = sb.run(&["import"], &format!("{bad}\n"), Some(PASSWORD));
    assert_ne!(code, 0);
    assert!(stderr.contains("invalid mnemonic"), "stderr: {stderr}");
    assert!(!sb.wallet().exists());
}

#[test]
fn import_password_mismatch_creates_nothing() {
    let sb = Sandbox::new();
    let input = format!("{PHRASE}\n{PASSWORD}\nPassw0rd?\n");
    let (code, _, stderr) = sb.run(&["import"], &input, None);
    assert_ne!(code, 0);
    assert!(stderr.contains("does not match"), "stderr: {stderr}");
    assert!(!sb.wallet().exists());
}

#[test]
fn create_with_wrong_quiz_answers_creates_nothing() {
    let sb = Sandbox::new();
    let attempt = "\nnope\nnope\nnope\n";
    let (code, _, stderr) = sb.run(&["create"], &attempt.repeat(3), Some(PASSWORD));
    assert_ne!(code, 0);
    assert!(stderr.contains("verification failed"), "stderr: {stderr}");
    assert!(!sb.wallet().exists());
}

#[test]
fn sign_then_verify() {
    let sb = Sandbox::new();
    let address = sb.import();

    let (code, stdout, stderr) = sb.run(&["--json", "sign", "--text", "hello"], "", Some(PASSWORD));
    assert_eq!(code, 0, "sign failed: {stderr}");
    assert_eq!(json_field(&stdout, "address"), address);
    let public_key = json_field(&stdout, "public_key");
    let signature = json_field(&stdout, "signature");
    assert_eq!(signature.len(), 128);

    let verify = |text: &str| {
        sb.run(
            &[
                "verify",
                "--address",
                &address,
                "--public-key",
                &public_key,
                "--signature",
                &signature,
                "--text",
                text,
            ],
            "",
            None,
        )
        .0
    };
    assert_eq!(verify("hello"), 0);
    assert_ne!(verify("hellO"), 0);
}

#[test]
fn sign_with_wrong_password_fails() {
    let sb = Sandbox::new();
    sb.import();
    let (code, _, stderr) = sb.run(&["sign", "--hex", "deadbeef"], "", Some("Wr0ng-password"));
    assert_ne!(code, 0);
    assert!(stderr.contains("authentication failed"), "stderr: {stderr}");
}

#[test]
fn change_password_round_trip() {
    let sb = Sandbox::new();
    sb.import();

    let (code, stdout, stderr) = sb.run(
        &["change-password"],
        "N3w-password\nN3w-password\n",
        Some(PASSWORD),
    );
    assert_eq!(code, 0, "change-password failed: {stderr}");
    assert!(!stdout.contains("N3w-password"));
    assert!(!stderr.contains("N3w-password"));

    let (code, _, _) = sb.run(&["sign", "--text", "x"], "", Some(PASSWORD));
    assert_ne!(code, 0);
    let (code, _, _) = sb.run(&["sign", "--text", "x"], "", Some("N3w-password"));
    assert_eq!(code, 0);
}
