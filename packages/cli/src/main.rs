mod commands;
mod config;
mod page;
mod store;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{init, render, serve, InitArgs, RenderArgs, ServeArgs};

/// livepage - edit generated pages by typing into the preview
#[derive(Parser, Debug)]
#[command(name = "livepage")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a default config and a sample page
    Init(InitArgs),

    /// Print the editable surface markup for a page
    Render(RenderArgs),

    /// Start the live editor for a page
    Serve(ServeArgs),
}

fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = std::env::current_dir()
        .map_err(anyhow::Error::from)
        .and_then(|cwd| {
            let cwd = cwd.display().to_string();
            match cli.command {
                Command::Init(args) => init(args, &cwd),
                Command::Render(args) => render(args, &cwd),
                Command::Serve(args) => serve(args, &cwd),
            }
        });

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
