//! Template management commands.

use clap::{Args, Subcommand};
use serde::Serialize;

use crate::cli::common::{to_json, CliResult, Session};
use crate::services::operations::{apply_template, delete_template, save_template};

/// Manage named layout templates
#[derive(Debug, Clone, Args)]
pub struct TemplatesArgs {
    /// Template subcommand
    #[command(subcommand)]
    pub command: TemplateCommand,
}

/// Template subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum TemplateCommand {
    /// List templates of a spec
    List(ListArgs),
    /// Save a level as a template
    Save(SaveArgs),
    /// Write a template into a level
    Apply(ApplyArgs),
    /// Delete a template
    Delete(DeleteArgs),
}

/// List templates
#[derive(Debug, Clone, Args)]
pub struct ListArgs {
    /// Spec index (1-5)
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=5))]
    pub spec: u8,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

/// Save a level as a template
#[derive(Debug, Clone, Args)]
pub struct SaveArgs {
    /// Spec index (1-5)
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=5))]
    pub spec: u8,

    /// Level to save from
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=80))]
    pub level: u8,

    /// Template name
    #[arg(short, long, value_name = "NAME")]
    pub name: String,

    /// Description
    #[arg(short, long, default_value = "")]
    pub description: String,
}

/// Apply a template
#[derive(Debug, Clone, Args)]
pub struct ApplyArgs {
    /// Spec index (1-5)
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=5))]
    pub spec: u8,

    /// Template name
    #[arg(short, long, value_name = "NAME")]
    pub name: String,

    /// Level to write
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=80))]
    pub level: u8,
}

/// Delete a template
#[derive(Debug, Clone, Args)]
pub struct DeleteArgs {
    /// Spec index (1-5)
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=5))]
    pub spec: u8,

    /// Template name
    #[arg(short, long, value_name = "NAME")]
    pub name: String,
}

/// Template metadata for JSON output
#[derive(Debug, Clone, Serialize)]
pub struct TemplateInfo {
    /// Template name
    pub name: String,
    /// Description
    pub description: String,
    /// Level the template was saved from
    pub source_level: Option<u8>,
    /// Number of non-empty slots
    pub configured_slots: usize,
    /// Creation timestamp (RFC 3339)
    pub created: String,
}

/// Template list response
#[derive(Debug, Clone, Serialize)]
pub struct TemplateListResponse {
    /// List of templates
    pub templates: Vec<TemplateInfo>,
    /// Total number of templates
    pub count: usize,
}

impl TemplatesArgs {
    /// Execute the templates command
    pub fn execute(&self, session: &mut Session) -> CliResult<()> {
        match &self.command {
            TemplateCommand::List(args) => args.execute(session),
            TemplateCommand::Save(args) => args.execute(session),
            TemplateCommand::Apply(args) => args.execute(session),
            TemplateCommand::Delete(args) => args.execute(session),
        }
    }
}

impl ListArgs {
    /// Execute the list command
    pub fn execute(&self, session: &Session) -> CliResult<()> {
        let templates: Vec<TemplateInfo> = session
            .state
            .store
            .templates(self.spec)?
            .into_iter()
            .map(|template| TemplateInfo {
                name: template.name.clone(),
                description: template.description.clone(),
                source_level: template.source_level,
                configured_slots: template.configured_slots(),
                created: template.created.to_rfc3339(),
            })
            .collect();
        let count = templates.len();
        let response = TemplateListResponse { templates, count };

        if self.json {
            println!("{}", to_json(&response)?);
        } else if count == 0 {
            println!("No templates found for spec {}.", self.spec);
        } else {
            println!("Templates for spec {} ({count}):\n", self.spec);
            for template in &response.templates {
                println!("  {} ({} slots)", template.name, template.configured_slots);
                if !template.description.is_empty() {
                    println!("    {}", template.description);
                }
            }
        }
        Ok(())
    }
}

impl SaveArgs {
    /// Execute the save command
    pub fn execute(&self, session: &mut Session) -> CliResult<()> {
        save_template(
            &mut session.state,
            self.spec,
            self.level,
            &self.name,
            &self.description,
        )?;
        session.save()?;
        println!("Saved level {} as template '{}'", self.level, self.name);
        Ok(())
    }
}

impl ApplyArgs {
    /// Execute the apply command
    pub fn execute(&self, session: &mut Session) -> CliResult<()> {
        let changed = apply_template(&mut session.state, self.spec, &self.name, self.level)?;
        if changed {
            session.save()?;
            println!("Applied template '{}' to level {}", self.name, self.level);
        } else {
            println!("Level {} already matches template '{}'", self.level, self.name);
        }
        Ok(())
    }
}

impl DeleteArgs {
    /// Execute the delete command
    pub fn execute(&self, session: &mut Session) -> CliResult<()> {
        delete_template(&mut session.state, self.spec, &self.name)?;
        session.save()?;
        println!("Deleted template '{}'", self.name);
        Ok(())
    }
}
