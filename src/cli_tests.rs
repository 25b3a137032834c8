use std::path::PathBuf;

use clap::Parser;
use clap_complete::Shell;

use super::{styled_command, Cli, Commands};

fn parse(args: &[&str]) -> Cli {
    Cli::parse_from(args)
}

#[test]
fn validate_parses_json_flag() {
    let cli = parse(&["guidechain", "validate", "--json"]);
    match cli.command {
        Commands::Validate(args) => assert!(args.json),
        other => panic!("expected Validate, got {:?}", other),
    }
}

#[test]
fn repair_parses_dry_run() {
    let cli = parse(&["guidechain", "repair", "--dry-run"]);
    match cli.command {
        Commands::Repair(args) => {
            assert!(args.dry_run);
            assert!(!args.json);
        }
        other => panic!("expected Repair, got {:?}", other),
    }
}

#[test]
fn insert_navigation_takes_id_and_flags() {
    let cli = parse(&["guidechain", "insert-navigation", "part-2", "-n", "-j"]);
    match cli.command {
        Commands::InsertNavigation(args) => {
            assert_eq!(args.id, "part-2");
            assert!(args.change.dry_run);
            assert!(args.change.json);
        }
        other => panic!("expected InsertNavigation, got {:?}", other),
    }
}

#[test]
fn global_paths_become_overrides() {
    let cli = parse(&[
        "guidechain",
        "--root",
        "/site",
        "--guides-dir",
        "content",
        "--catalog",
        "data/topics.json",
        "seed",
    ]);
    assert_eq!(cli.root, PathBuf::from("/site"));
    let overrides = cli.overrides();
    assert_eq!(overrides.guides_dir, Some(PathBuf::from("content")));
    assert_eq!(overrides.catalog, Some(PathBuf::from("data/topics.json")));
    assert!(matches!(cli.command, Commands::Seed(_)));
}

#[test]
fn completions_parses_shell_name() {
    let cli = parse(&["guidechain", "completions", "zsh"]);
    match cli.command {
        Commands::Completions(args) => assert_eq!(args.shell, Shell::Zsh),
        other => panic!("expected Completions, got {:?}", other),
    }
}

#[test]
fn command_definition_is_consistent() {
    styled_command().debug_assert();
}
