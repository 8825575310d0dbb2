//! Output rendering: coloured status reports for terminals, JSON otherwise.

use std::io::{self, IsTerminal};

use ariadne::{Color, Fmt};
use serde::Serialize;

use bgfp_status::{DeviceStatus, Severity, StatusMessage};

// ── Output format ───────────────────────────────────────────────────────

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Format {
    /// Coloured, human-readable output.
    Pretty,
    /// Machine-readable JSON on stdout.
    Json,
}

impl Format {
    /// Explicit choice, else pretty for interactive terminals and JSON for pipes.
    pub(crate) fn resolve_or_detect(explicit: Option<&str>) -> Self {
        match explicit {
            Some("json") => Format::Json,
            Some("pretty") => Format::Pretty,
            _ => {
                if io::stdout().is_terminal() {
                    Format::Pretty
                } else {
                    Format::Json
                }
            }
        }
    }
}

// ── Severity mapping ────────────────────────────────────────────────────

fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Error => Color::Red,
        Severity::Warning => Color::Yellow,
        Severity::Info => Color::Blue,
        _ => Color::White,
    }
}

fn message_line(message: &StatusMessage) -> String {
    let kind = format!("{}", message.severity).fg(severity_color(message.severity));
    match &message.code {
        Some(code) => format!("{kind}[{code}]: {}", message.text),
        None => format!("{kind}: {}", message.text),
    }
}

// ── Rendering ───────────────────────────────────────────────────────────

/// Print the status messages, with explanations of known codes, to stderr.
pub(crate) fn render_status_pretty(status: &DeviceStatus) {
    for message in status.messages() {
        eprintln!("{}", message_line(message));
        if message.severity == Severity::Error
            && let Some(explanation) = message.explain()
        {
            eprintln!("  = help: {explanation}");
        }
    }
    if status.is_ok() && status.warnings().is_empty() {
        eprintln!("{}", "ok".fg(Color::Green));
    } else {
        print_summary(status);
    }
}

/// Render a command result.
///
/// - `Pretty`: `fields` as `name: value` lines on stdout, status on stderr.
/// - `Json`: `result` pretty-printed on stdout.
pub(crate) fn render_result<T: Serialize>(
    format: Format,
    result: &T,
    status: &DeviceStatus,
    fields: &[(&str, String)],
) -> anyhow::Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(result)?),
        Format::Pretty => {
            for (name, value) in fields {
                println!("{}: {value}", name.fg(Color::Cyan));
            }
            render_status_pretty(status);
        }
    }
    Ok(())
}

/// Print a coloured summary line, e.g. `1 error, 2 warnings`.
fn print_summary(status: &DeviceStatus) {
    let errors = status.errors().len();
    let warnings = status.warnings().len();
    if errors + warnings == 0 {
        return;
    }
    let mut parts = Vec::new();
    if errors > 0 {
        let s = if errors == 1 { "" } else { "s" };
        parts.push(format!("{}", format!("{errors} error{s}").fg(Color::Red)));
    }
    if warnings > 0 {
        let s = if warnings == 1 { "" } else { "s" };
        parts.push(format!(
            "{}",
            format!("{warnings} warning{s}").fg(Color::Yellow)
        ));
    }
    eprintln!("{}", parts.join(", "));
}
