use std::path::PathBuf;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use crate::config::ConfigOverrides;

fn cli_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::BrightCyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::BrightYellow.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightGreen.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::BrightMagenta.on_default())
}

#[derive(Debug, Parser)]
#[command(name = "guidechain")]
#[command(bin_name = "guidechain")]
#[command(version)]
#[command(about = "Keep guide series navigation consistent")]
#[command(styles = cli_styles())]
pub struct Cli {
    #[arg(
        short = 'C',
        long,
        env = "GUIDECHAIN_ROOT",
        default_value = ".",
        help = "Site root that contains guidechain.toml, the guides directory, and the catalog."
    )]
    pub root: PathBuf,

    #[arg(
        short = 'g',
        long = "guides-dir",
        env = "GUIDECHAIN_GUIDES_DIR",
        help = "Guides directory, relative to the root (default: _guides)."
    )]
    pub guides_dir: Option<PathBuf>,

    #[arg(
        long,
        env = "GUIDECHAIN_CATALOG",
        help = "Topic catalog JSON, relative to the root (default: topics.json)."
    )]
    pub catalog: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            guides_dir: self.guides_dir.clone(),
            catalog: self.catalog.clone(),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(about = "Check every series for structural defects.")]
    Validate(ValidateArgs),
    #[command(about = "Repair series links until nothing more can be fixed safely.")]
    Repair(ChangeArgs),
    #[command(
        name = "insert-navigation",
        about = "Point the neighbors of a newly added guide back at it."
    )]
    InsertNavigation(InsertNavigationArgs),
    #[command(about = "Add missing series sections from the topic catalog.")]
    Seed(ChangeArgs),
    #[command(about = "Print shell completions.")]
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct ValidateArgs {
    #[arg(short = 'j', long, help = "Render machine-readable JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ChangeArgs {
    #[arg(short = 'n', long = "dry-run", help = "Compute changes without writing files.")]
    pub dry_run: bool,

    #[arg(short = 'j', long, help = "Render machine-readable JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct InsertNavigationArgs {
    #[arg(help = "Id of the new guide (file name without date prefix and extension).")]
    pub id: String,

    #[command(flatten)]
    pub change: ChangeArgs,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    #[arg(value_enum, help = "Target shell.")]
    pub shell: Shell,
}

pub fn styled_command() -> clap::Command {
    Cli::command()
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
