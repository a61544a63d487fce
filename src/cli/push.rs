//! Push command: propagate a level to its neighbours.

use clap::{Args, ValueEnum};

use crate::cli::common::{CliResult, Session};
use crate::services::propagation::{push_level, push_targets, Direction};

/// Push direction argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DirectionArg {
    /// Towards higher levels
    Up,
    /// Towards lower levels
    Down,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Up => Self::Up,
            DirectionArg::Down => Self::Down,
        }
    }
}

/// Push a level's layout to stored levels above or below it
#[derive(Debug, Clone, Args)]
pub struct PushArgs {
    /// Spec index (1-5)
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=5))]
    pub spec: u8,

    /// Source level
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=80))]
    pub level: u8,

    /// Direction to push in
    #[arg(short, long, value_enum, default_value_t = DirectionArg::Up)]
    pub direction: DirectionArg,

    /// Last level to write (defaults to the level before the next keyframe)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=80))]
    pub limit: Option<u8>,

    /// Also clear target slots that are empty at the source
    #[arg(long)]
    pub overwrite: bool,

    /// Show which levels would be written without changing anything
    #[arg(long)]
    pub dry_run: bool,
}

impl PushArgs {
    /// Execute the push command
    pub fn execute(&self, session: &mut Session) -> CliResult<()> {
        let direction = Direction::from(self.direction);

        if self.dry_run {
            let targets = push_targets(
                &session.state.store,
                self.spec,
                self.level,
                direction,
                self.limit,
            )?;
            if targets.is_empty() {
                println!("No stored levels in range.");
            } else {
                let levels: Vec<String> = targets.iter().map(ToString::to_string).collect();
                println!("Would push to levels: {}", levels.join(", "));
            }
            return Ok(());
        }

        let affected = push_level(
            &mut session.state,
            self.spec,
            self.level,
            direction,
            self.limit,
            self.overwrite,
        )?;
        if affected > 0 {
            session.save()?;
        }
        println!(
            "Pushed level {} {}: {affected} level(s) updated",
            self.level,
            direction.as_str()
        );
        Ok(())
    }
}
