//! Output formatting for human-readable and JSON modes.
//!
//! Human mode uses colored terminal output.
//! JSON mode outputs pure JSON with no ANSI escapes.

use colored::Colorize;

/// Prints a success message.
pub fn print_success(msg: &str, json_mode: bool) {
    if json_mode {
        let obj = serde_json::json!({ "status": "ok", "message": msg });
        println!("{}", obj);
    } else {
        println!("{} {}", "✓".green().bold(), msg);
    }
}

/// Prints a single key-value pair (human mode only).
pub fn print_kv(key: &str, value: &str) {
    println!("{}: {}", key.bold(), value);
}

/// Prints a set of fields as one JSON object, or as aligned key-value
/// lines in human mode.
pub fn print_fields(fields: &[(&str, String)], json_mode: bool) {
    if json_mode {
        let mut obj = serde_json::Map::new();
        for (k, v) in fields {
            obj.insert((*k).to_string(), serde_json::Value::String(v.clone()));
        }
        println!("{}", serde_json::Value::Object(obj));
        return;
    }

    let width = fields.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    for (k, v) in fields {
        println!("{}  {}", format!("{k:<width$}").bold(), v);
    }
}

/// Prints an error message.
pub fn print_error(msg: &str, json_mode: bool) {
    if json_mode {
        let obj = serde_json::json!({ "error": msg });
        eprintln!("{}", obj);
    } else {
        eprintln!("{} {}", "error:".red().bold(), msg);
    }
}

/// Prints a warning in human mode. Always goes to stderr.
pub fn print_warning(msg: &str) {
    eprintln!("{} {}", "warning:".yellow().bold(), msg);
}

/// Prints the recovery phrase as a numbered grid to stderr.
pub fn print_phrase(words: &[&str]) {
    eprintln!();
    eprintln!("{}", "Write down these words in order:".bold());
    eprintln!();
    for (row, chunk) in words.chunks(4).enumerate() {
        let line: Vec<String> = chunk
            .iter()
            .enumerate()
            .map(|(col, w)| format!("{:>2}. {:<10}", row * 4 + col + 1, w))
            .collect();
        eprintln!("  {}", line.join("  "));
    }
    eprintln!();
}
