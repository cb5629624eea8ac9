//! Operator-facing output.
//!
//! Human mode prints colored lines; JSON mode emits one object per line
//! shaped `{"type": ..., "payload": ...}` so scripts can follow along.

use std::fmt::Display;

use owo_colors::OwoColorize;
use parking_lot::RwLock;
use serde_json::json;

#[derive(Debug, Clone, Copy, Default)]
pub struct OutputConfig {
    pub json: bool,
    pub quiet: bool,
}

static OUTPUT_CONFIG: RwLock<OutputConfig> = RwLock::new(OutputConfig {
    json: false,
    quiet: false,
});

/// Apply output settings from global CLI flags.
pub fn configure(config: OutputConfig) {
    *OUTPUT_CONFIG.write() = config;
}

#[must_use]
pub fn is_json() -> bool {
    OUTPUT_CONFIG.read().json
}

fn suppressed(config: OutputConfig) -> bool {
    !config.json && config.quiet
}

fn emit_json_line(kind: &str, payload: serde_json::Value) {
    println!("{}", json!({ "type": kind, "payload": payload }));
}

pub fn header(version: &str) {
    let config = *OUTPUT_CONFIG.read();
    if config.json {
        emit_json_line("header", json!({ "app": "tiltledger", "version": version }));
        return;
    }
    if suppressed(config) {
        return;
    }
    println!("{} {}", "tiltledger".bold(), version.dimmed());
}

pub fn section(title: &str) {
    let config = *OUTPUT_CONFIG.read();
    if config.json {
        emit_json_line("section", json!({ "title": title }));
        return;
    }
    if suppressed(config) {
        return;
    }
    println!();
    println!("{}", title.bold());
}

/// Print a labeled value.
pub fn field(label: &str, value: impl Display) {
    let config = *OUTPUT_CONFIG.read();
    let value = value.to_string();
    if config.json {
        emit_json_line("field", json!({ "label": label, "value": value }));
        return;
    }
    if suppressed(config) {
        return;
    }
    println!("  {:<16} {}", label.dimmed(), value);
}

pub fn success(message: &str) {
    let config = *OUTPUT_CONFIG.read();
    if config.json {
        emit_json_line("success", json!({ "message": message }));
        return;
    }
    if suppressed(config) {
        return;
    }
    println!("  {} {}", "✓".green(), message);
}

pub fn warning(message: &str) {
    if is_json() {
        emit_json_line("warning", json!({ "message": message }));
        return;
    }
    println!("  {} {}", "⚠".yellow(), message);
}

pub fn error(message: &str) {
    if is_json() {
        eprintln!("{}", json!({ "type": "error", "payload": { "message": message } }));
        return;
    }
    eprintln!("  {} {}", "×".red(), message);
}

/// One replayed scenario step.
pub fn step(index: usize, label: &str, outcome: Result<&str, &str>) {
    let config = *OUTPUT_CONFIG.read();
    if config.json {
        let payload = match outcome {
            Ok(detail) => json!({ "index": index, "step": label, "ok": true, "detail": detail }),
            Err(reason) => json!({ "index": index, "step": label, "ok": false, "reason": reason }),
        };
        emit_json_line("step", payload);
        return;
    }
    if suppressed(config) {
        return;
    }
    match outcome {
        Ok(detail) => println!("  {:>3} {} {}", index.dimmed(), label.cyan(), detail),
        Err(reason) => println!(
            "  {:>3} {} {} {}",
            index.dimmed(),
            label.cyan(),
            "rejected".red(),
            reason
        ),
    }
}

/// A JSON document for scripting; ignored in human mode.
pub fn json_document(kind: &str, payload: serde_json::Value) {
    if is_json() {
        emit_json_line(kind, payload);
    }
}
