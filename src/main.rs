mod app;
mod catalog;
mod chain;
mod cli;
mod completions;
mod config;
mod domain;
mod frontmatter;
mod reconcile;
mod store;
mod ui;
mod validate;
mod writer;

use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "GUIDECHAIN_LOG";

fn main() {
    init_tracing();
    if let Err(err) = run() {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn print_json(value: &impl serde::Serialize) -> Result<(), app::AppError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run() -> Result<(), app::AppError> {
    use clap::Parser;
    use cli::Commands;

    let cli = cli::Cli::parse();
    if let Commands::Completions(args) = &cli.command {
        completions::run_completions_command(args.shell);
        return Ok(());
    }

    let app = app::App::open(config::Config::load(&cli.root, cli.overrides())?);
    tracing::debug!(
        guides = %app.config().guides_path().display(),
        catalog = %app.config().catalog_path().display(),
        "resolved configuration"
    );

    match cli.command {
        Commands::Validate(args) => {
            let report = app.validate()?;
            if args.json {
                print_json(&report)?;
            } else {
                ui::print_validation(&report);
            }
            if !report.ok() {
                return Err(app::AppError::Unresolved(format!(
                    "validation found {} defect(s)",
                    report.defect_count()
                )));
            }
        }
        Commands::Repair(args) => {
            let report = app.repair(args.dry_run)?;
            if args.json {
                print_json(&report)?;
            } else {
                ui::print_repair(&report);
            }
            if !report.ok() {
                return Err(app::AppError::Unresolved(format!(
                    "repair left {} conflict(s) and {} unresolved defect(s)",
                    report.conflicts.len(),
                    report.remaining.defect_count()
                )));
            }
        }
        Commands::InsertNavigation(args) => {
            let report = app.insert_navigation(&args.id, args.change.dry_run)?;
            if args.change.json {
                print_json(&report)?;
            } else {
                ui::print_insertion(&report);
            }
            if !report.conflicts.is_empty() {
                return Err(app::AppError::Unresolved(format!(
                    "insert-navigation found {} conflict(s)",
                    report.conflicts.len()
                )));
            }
        }
        Commands::Seed(args) => {
            let report = app.seed(args.dry_run)?;
            if args.json {
                print_json(&report)?;
            } else {
                ui::print_seed(&report);
            }
        }
        Commands::Completions(_) => unreachable!("completions are handled before loading config"),
    }
    Ok(())
}
