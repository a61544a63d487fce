//! Keyframe management commands.

use clap::{Args, Subcommand};
use serde::Serialize;

use crate::cli::common::{to_json, CliResult, Session};
use crate::services::operations::set_keyframe;

/// Manage keyframe levels
#[derive(Debug, Clone, Args)]
pub struct KeyframeArgs {
    /// Keyframe subcommand
    #[command(subcommand)]
    pub command: KeyframeCommand,
}

/// Keyframe subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum KeyframeCommand {
    /// List keyframe levels of a spec
    List(ListArgs),
    /// Mark a level as keyframe
    Set(MarkArgs),
    /// Remove the keyframe mark from a level
    Unset(MarkArgs),
}

/// List keyframes
#[derive(Debug, Clone, Args)]
pub struct ListArgs {
    /// Spec index (1-5)
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=5))]
    pub spec: u8,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

/// Mark or unmark one level
#[derive(Debug, Clone, Args)]
pub struct MarkArgs {
    /// Spec index (1-5)
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=5))]
    pub spec: u8,

    /// Level to mark
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=80))]
    pub level: u8,
}

/// Keyframe list response
#[derive(Debug, Clone, Serialize)]
pub struct KeyframeListResponse {
    /// Spec index
    pub spec: u8,
    /// Keyframe levels, ascending
    pub keyframes: Vec<u8>,
}

impl KeyframeArgs {
    /// Execute the keyframe command
    pub fn execute(&self, session: &mut Session) -> CliResult<()> {
        match &self.command {
            KeyframeCommand::List(args) => args.execute(session),
            KeyframeCommand::Set(args) => args.execute(session, true),
            KeyframeCommand::Unset(args) => args.execute(session, false),
        }
    }
}

impl ListArgs {
    /// Execute the list command
    pub fn execute(&self, session: &Session) -> CliResult<()> {
        let keyframes = session.state.store.keyframes(self.spec)?;
        if self.json {
            let response = KeyframeListResponse {
                spec: self.spec,
                keyframes,
            };
            println!("{}", to_json(&response)?);
        } else if keyframes.is_empty() {
            println!("No keyframes for spec {}.", self.spec);
        } else {
            let levels: Vec<String> = keyframes.iter().map(ToString::to_string).collect();
            println!("Keyframes for spec {}: {}", self.spec, levels.join(", "));
        }
        Ok(())
    }
}

impl MarkArgs {
    /// Execute set/unset
    pub fn execute(&self, session: &mut Session, keyframe: bool) -> CliResult<()> {
        let changed = set_keyframe(&mut session.state, self.spec, self.level, keyframe)?;
        if changed {
            session.save()?;
        }
        let verb = if keyframe { "marked" } else { "unmarked" };
        if changed {
            println!("Level {} {verb} as keyframe (spec {})", self.level, self.spec);
        } else {
            println!("Level {} already {verb} (spec {})", self.level, self.spec);
        }
        Ok(())
    }
}
