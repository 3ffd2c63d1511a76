//! Interactive prompts on stdin/stderr.
//!
//! Prompts go to stderr so stdout stays clean for `--json` output.
//! Passwords typed at a terminal are not echoed; piped input is read as
//! plain lines.

use std::io::{BufRead, IsTerminal, Write};

use vindex_types::config::PasswordPolicy;
use vindex_wallet::password::{check_password, confirm_password};
use zeroize::Zeroizing;

pub const ENV_WALLET_PASSWORD: &str = "VINDEX_WALLET_PASSWORD";

/// Reads one line, without its line terminator.
pub fn read_line(prompt: &str) -> Result<Zeroizing<String>, String> {
    eprint!("{prompt}");
    let _ = std::io::stderr().flush();

    let mut input = Zeroizing::new(String::new());
    let n = std::io::stdin()
        .lock()
        .read_line(&mut input)
        .map_err(|e| format!("failed to read input: {e}"))?;
    if n == 0 {
        return Err("unexpected end of input".into());
    }

    let trimmed_len = input.trim_end_matches(['\r', '\n']).len();
    input.truncate(trimmed_len);
    Ok(input)
}

/// Reads a secret without echo when stdin is a terminal.
fn read_hidden(prompt: &str) -> Result<Zeroizing<String>, String> {
    if !std::io::stdin().is_terminal() {
        return read_line(prompt);
    }
    rpassword::prompt_password(prompt)
        .map(Zeroizing::new)
        .map_err(|e| format!("failed to read password: {e}"))
}

/// Current wallet password: `VINDEX_WALLET_PASSWORD` if set, else a prompt.
pub fn read_password(prompt: &str) -> Result<Zeroizing<String>, String> {
    if let Ok(pass) = std::env::var(ENV_WALLET_PASSWORD) {
        return Ok(Zeroizing::new(pass));
    }
    read_hidden(prompt)
}

/// A new password, entered twice and checked against `policy`.
///
/// With `allow_env`, `VINDEX_WALLET_PASSWORD` is accepted without
/// confirmation.
pub fn read_new_password(
    policy: &PasswordPolicy,
    allow_env: bool,
) -> Result<Zeroizing<String>, String> {
    if allow_env {
        if let Ok(pass) = std::env::var(ENV_WALLET_PASSWORD) {
            check_password(policy, &pass).map_err(|e| e.to_string())?;
            return Ok(Zeroizing::new(pass));
        }
    }

    let password = read_hidden("New password: ")?;
    check_password(policy, &password).map_err(|e| e.to_string())?;
    let confirmation = read_hidden("Confirm password: ")?;
    confirm_password(&password, &confirmation).map_err(|e| e.to_string())?;
    Ok(password)
}
