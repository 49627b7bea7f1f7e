use crate::config::{Config, DEFAULT_CONFIG_NAME};
use crate::page::PageFile;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_PAGE_NAME: &str = "page.json";

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Port for `livepage serve`
    #[arg(short, long, default_value = "3030")]
    pub port: u16,

    /// Debounce delay for autosave, in milliseconds
    #[arg(long, default_value = "1500")]
    pub debounce_ms: u64,

    /// Force overwrite existing files
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &str) -> Result<()> {
    let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

    // Check if config already exists
    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    println!("{}", "📝 Initializing livepage project...".bright_blue().bold());

    let mut config = Config::default();
    config.port = args.port;
    config.editor.debounce_ms = args.debounce_ms;

    fs::write(&config_path, serde_json::to_string_pretty(&config)?)?;
    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);

    let page_path = PathBuf::from(cwd).join(DEFAULT_PAGE_NAME);
    if !page_path.exists() || args.force {
        fs::write(&page_path, serde_json::to_string_pretty(&PageFile::sample())?)?;
        println!("  {} Created {}", "✓".green(), DEFAULT_PAGE_NAME);
    }

    println!();
    println!("{}", "✅ Project initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Run: livepage serve {}", DEFAULT_PAGE_NAME);
    println!("  2. Open http://localhost:{} and type into the page", config.port);
    println!("  3. Edits autosave to {}/", config.store_dir);

    Ok(())
}
