//! Export and import commands.

use std::fs;
use std::path::PathBuf;

use clap::{Args, ValueEnum};

use crate::cli::common::{CliError, CliResult, Session};
use crate::codec::{export_full, export_keyframes, export_layout, export_template, import_string};

/// What to export
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportKind {
    /// One level (requires --level)
    Layout,
    /// Every keyframe of the spec
    Keyframes,
    /// Every stored level, keyframe flag and the slot mask
    Full,
    /// A named template (requires --name)
    Template,
}

/// Export layouts as a shareable string
#[derive(Debug, Clone, Args)]
pub struct ExportArgs {
    /// Spec index (1-5)
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=5))]
    pub spec: u8,

    /// What to export
    #[arg(short, long, value_enum, default_value_t = ExportKind::Layout)]
    pub kind: ExportKind,

    /// Level to export (for --kind layout)
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=80))]
    pub level: Option<u8>,

    /// Template name (for --kind template)
    #[arg(short, long, value_name = "NAME")]
    pub name: Option<String>,

    /// Write the string to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub out: Option<PathBuf>,
}

impl ExportArgs {
    /// Execute the export command
    pub fn execute(&self, session: &Session) -> CliResult<()> {
        let state = &session.state;
        let exported = match self.kind {
            ExportKind::Layout => {
                let level = self
                    .level
                    .ok_or_else(|| CliError::validation("--level is required for layout export"))?;
                export_layout(state, self.spec, level)?
            }
            ExportKind::Keyframes => export_keyframes(state, self.spec)?,
            ExportKind::Full => export_full(state, self.spec)?,
            ExportKind::Template => {
                let name = self
                    .name
                    .as_deref()
                    .ok_or_else(|| CliError::validation("--name is required for template export"))?;
                export_template(state, self.spec, name)?
            }
        };

        match &self.out {
            Some(path) => {
                fs::write(path, format!("{exported}\n"))
                    .map_err(|e| CliError::io(format!("Failed to write output file: {e}")))?;
                println!("Exported to {}", path.display());
            }
            None => println!("{exported}"),
        }
        Ok(())
    }
}

/// Import an export string
#[derive(Debug, Clone, Args)]
pub struct ImportArgs {
    /// Export string (omit to read --file)
    #[arg(value_name = "STRING", required_unless_present = "file")]
    pub input: Option<String>,

    /// Read the export string from a file
    #[arg(short, long, value_name = "FILE", conflicts_with = "input")]
    pub file: Option<PathBuf>,

    /// Spec index to import into (1-5)
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=5))]
    pub spec: u8,

    /// Import a single layout at this level instead of its own
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=80))]
    pub level: Option<u8>,
}

impl ImportArgs {
    /// Execute the import command
    pub fn execute(&self, session: &mut Session) -> CliResult<()> {
        let input = match (&self.input, &self.file) {
            (Some(input), _) => input.clone(),
            (None, Some(path)) => fs::read_to_string(path)
                .map_err(|e| CliError::io(format!("Failed to read {}: {e}", path.display())))?,
            (None, None) => return Err(CliError::validation("No export string given")),
        };

        let report = import_string(&mut session.state, &input, self.spec, self.level)?;
        for warning in &report.warnings {
            eprintln!("Warning: {warning}");
        }
        session.save()?;

        println!(
            "Imported {}: {} written, {} removed",
            report.kind.as_str(),
            report.written,
            report.deleted
        );
        Ok(())
    }
}
