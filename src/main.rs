use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::{Generator, generate};
use colored::Colorize;
use std::io;
use std::process;
use tracing_subscriber::EnvFilter;

use dotsync::cli::{Cli, Commands};
use dotsync::prompt::ConsolePrompt;
use dotsync::{SyncContext, commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {e:#}", "Error:".red().bold());
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Completion generation needs no repository at all.
    if let Commands::Completion { shell } = cli.command {
        print_completions(shell, &mut Cli::command());
        return Ok(());
    }

    let ctx = SyncContext::new(Box::new(ConsolePrompt))?;
    ctx.preflight(matches!(cli.command, Commands::Init))?;

    match cli.command {
        Commands::Init => commands::init::execute(&ctx),
        Commands::Add { path, category, encrypt, dry_run } => {
            commands::add::execute(&ctx, &path, category, encrypt, dry_run)
        }
        Commands::List { category } => commands::list::execute(&ctx, category),
        Commands::Update { categories, hard, dry_run } => {
            commands::update::execute(&ctx, categories, hard, dry_run)
        }
        Commands::Restore { categories, hard, dry_run } => {
            commands::restore::execute(&ctx, categories, hard, dry_run)
        }
        Commands::Diff { categories, hard: _ } => commands::diff::execute(&ctx, categories),
        Commands::Clean { categories, hard, dry_run } => {
            commands::clean::execute(&ctx, categories, hard, dry_run)
        }
        Commands::Commit => commands::commit::execute(&ctx),
        Commands::Encrypt { path, dry_run } => commands::encrypt::execute(&ctx, &path, dry_run),
        Commands::Unmanage { path, dry_run } => commands::unmanage::execute(&ctx, &path, dry_run),
        Commands::Passwd => commands::passwd::execute(&ctx),
        Commands::Completion { .. } => unreachable!("handled above"),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn print_completions<G: Generator>(g: G, cmd: &mut clap::Command) {
    generate(g, cmd, cmd.get_name().to_string(), &mut io::stdout());
}
