//! Shared output formatting for todocal CLI commands.

use serde::Serialize;

use crate::error::{Error, JsonError, Result};

pub const SCHEMA_VERSION: &str = "todocal.v1";

#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub json: bool,
    pub quiet: bool,
}

#[derive(Debug, Clone)]
pub struct HumanOutput {
    header: String,
    summary: Vec<(String, String)>,
    details: Vec<String>,
    warnings: Vec<String>,
    next_steps: Vec<String>,
}

impl HumanOutput {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            summary: Vec::new(),
            details: Vec::new(),
            warnings: Vec::new(),
            next_steps: Vec::new(),
        }
    }

    pub fn push_summary(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.summary.push((key.into(), value.into()));
    }

    pub fn push_detail(&mut self, value: impl Into<String>) {
        self.details.push(value.into());
    }

    pub fn push_warning(&mut self, value: impl Into<String>) {
        self.warnings.push(value.into());
    }

    pub fn push_next_step(&mut self, value: impl Into<String>) {
        self.next_steps.push(value.into());
    }
}

pub fn emit_success<T: Serialize>(
    options: OutputOptions,
    command: &str,
    data: &T,
    human: Option<&HumanOutput>,
) -> Result<()> {
    if options.json {
        let warnings = human.map(|h| h.warnings.clone()).unwrap_or_default();
        let next_steps = human.map(|h| h.next_steps.clone()).unwrap_or_default();

        #[derive(Serialize)]
        struct Envelope<'a, T: Serialize> {
            schema_version: &'static str,
            command: &'a str,
            status: &'static str,
            data: &'a T,
            #[serde(skip_serializing_if = "Vec::is_empty")]
            warnings: Vec<String>,
            #[serde(skip_serializing_if = "Vec::is_empty")]
            next_steps: Vec<String>,
        }

        let payload = Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: "success",
            data,
            warnings,
            next_steps,
        };

        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    if options.quiet {
        return Ok(());
    }

    if let Some(human) = human {
        println!("{}", format_human(human));
    }

    Ok(())
}

pub fn emit_error(command: &str, err: &Error, json: bool) -> Result<()> {
    let next_steps = error_next_steps(err);
    if json {
        #[derive(Serialize)]
        struct Envelope<'a> {
            schema_version: &'static str,
            command: &'a str,
            status: &'static str,
            error: JsonError,
            #[serde(skip_serializing_if = "Vec::is_empty")]
            next_steps: Vec<String>,
        }

        let payload = Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: "error",
            error: JsonError::from(err),
            next_steps,
        };

        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    for line in error_lines(err, &next_steps) {
        eprintln!("{line}");
    }
    Ok(())
}

fn error_lines(err: &Error, next_steps: &[String]) -> Vec<String> {
    let mut lines = vec![format!("error: {err}")];
    if err.may_lose_change() {
        lines.push("warning: your change may not be durable".to_string());
    }
    if let Some(hint) = next_steps.first() {
        lines.push(format!("hint: {hint}"));
    }
    lines
}

pub fn format_human(output: &HumanOutput) -> String {
    let mut lines = Vec::new();
    lines.push(output.header.clone());

    push_summary(&mut lines, &output.summary);
    push_section(&mut lines, "Details", &output.details);
    push_section(&mut lines, "Warnings", &output.warnings);
    push_section(&mut lines, "Next steps", &output.next_steps);

    lines.join("\n")
}

/// First positional argument, used to label errors raised before or
/// during argument parsing.
pub fn infer_command_name_from_args() -> String {
    command_name_from(std::env::args().skip(1))
}

fn command_name_from(args: impl IntoIterator<Item = String>) -> String {
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        // Global options that take a value.
        if matches!(arg.as_str(), "--data-file" | "--config") {
            args.next();
            continue;
        }
        if arg.starts_with('-') {
            continue;
        }
        return arg;
    }
    "todocal".to_string()
}

fn error_next_steps(err: &Error) -> Vec<String> {
    match err {
        Error::TaskNotFound(_) => vec!["todocal list".to_string()],
        Error::InvalidConfig(_) => vec!["fix todocal.toml then retry".to_string()],
        Error::WriteInProgress => vec!["retry once the current save completes".to_string()],
        Error::SaveFailed { .. } | Error::LockFailed(_) => {
            vec!["check the data file location, then retry the command".to_string()]
        }
        _ => Vec::new(),
    }
}

fn push_summary(lines: &mut Vec<String>, summary: &[(String, String)]) {
    if summary.is_empty() {
        return;
    }

    lines.push(String::new());
    lines.push("Summary:".to_string());
    for (key, value) in summary {
        if value.is_empty() {
            lines.push(format!("- {key}"));
        } else {
            lines.push(format!("- {key}: {value}"));
        }
    }
}

fn push_section(lines: &mut Vec<String>, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }

    lines.push(String::new());
    lines.push(format!("{title}:"));
    for item in items {
        lines.push(format!("- {item}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn command_name_skips_global_options() {
        assert_eq!(command_name_from(args(&["--json", "add", "x"])), "add");
        assert_eq!(
            command_name_from(args(&["--data-file", "/tmp/t.json", "rm", "3"])),
            "rm"
        );
        assert_eq!(command_name_from(args(&["-q"])), "todocal");
    }

    #[test]
    fn durability_warning_only_for_failed_saves() {
        let save = Error::SaveFailed {
            path: "/data/todo_calendar.json".into(),
            source: Box::new(Error::OperationFailed("disk full".to_string())),
        };
        let lines = error_lines(&save, &error_next_steps(&save));
        assert_eq!(lines.iter().filter(|line| line.starts_with("error:")).count(), 1);
        assert_eq!(lines[1], "warning: your change may not be durable");

        let read = Error::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        let lines = error_lines(&read, &error_next_steps(&read));
        assert_eq!(lines, vec!["error: IO error: denied".to_string()]);

        let lock = Error::LockFailed("/data/todo_calendar.json.lock".into());
        assert!(error_lines(&lock, &[])
            .iter()
            .any(|line| line.contains("may not be durable")));
    }

    #[test]
    fn human_output_sections() {
        let mut out = HumanOutput::new("Added task 0");
        out.push_summary("description", "Buy milk");
        out.push_warning("Could not decode JSON");
        let text = format_human(&out);
        assert!(text.starts_with("Added task 0\n\nSummary:\n- description: Buy milk"));
        assert!(text.contains("Warnings:\n- Could not decode JSON"));
        assert!(!text.contains("Next steps"));
    }
}
