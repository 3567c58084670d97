use std::path::Path;

use {
    anyhow::{Result, bail},
    clap::Subcommand,
    sitewatch_config::validate::{self, Diagnostic, Severity, ValidationResult},
};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors/warnings.
    Validate {
        /// Show informational diagnostics in addition to errors and warnings.
        #[arg(long)]
        verbose: bool,
    },
}

pub fn handle_config(config_path: Option<&Path>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Validate { verbose } => {
            let result = validate::validate(config_path);
            print_diagnostics(&result, verbose);

            let errors = result.count(Severity::Error);
            let warnings = result.count(Severity::Warning);
            if errors == 0 && warnings == 0 {
                eprintln!("No issues found.");
            } else {
                eprintln!("{errors} error(s), {warnings} warning(s)");
            }
            if errors > 0 {
                bail!("configuration is invalid");
            }
            Ok(())
        },
    }
}

const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

/// Errors first, then warnings, then (with `verbose`) info, on stderr.
pub(crate) fn print_diagnostics(result: &ValidationResult, verbose: bool) {
    match result.config_path {
        Some(ref path) => eprintln!("Checking {}\n", path.display()),
        None => eprintln!("No config file found; checking defaults.\n"),
    }

    let mut shown: Vec<&Diagnostic> = result
        .diagnostics
        .iter()
        .filter(|d| verbose || d.severity != Severity::Info)
        .collect();
    shown.sort_by_key(|d| d.severity);

    for d in &shown {
        eprintln!("  {}", render(d));
    }
    if !shown.is_empty() {
        eprintln!();
    }
}

fn render(d: &Diagnostic) -> String {
    let color = match d.severity {
        Severity::Error => RED,
        Severity::Warning => YELLOW,
        Severity::Info => CYAN,
    };
    let location = if d.path.is_empty() {
        String::new()
    } else {
        format!("{}: ", d.path)
    };
    format!(
        "{BOLD}{color}{}{RESET} {DIM}[{}]{RESET} {location}{}",
        d.severity, d.category, d.message
    )
}
