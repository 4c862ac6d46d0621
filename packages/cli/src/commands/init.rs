use anyhow::Result;
use clap::Args;
use colored::Colorize;
use pagecraft_editor::{EditorConfig, DEFAULT_CONFIG_NAME};
use std::fs;
use std::path::Path;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Grid pitch for snapping
    #[arg(short, long, default_value_t = 10.0)]
    pub grid_size: f64,

    /// Persistence debounce delay in milliseconds
    #[arg(short, long, default_value_t = 500)]
    pub debounce_ms: u64,

    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &Path) -> Result<()> {
    let config_path = cwd.join(DEFAULT_CONFIG_NAME);

    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    let config = EditorConfig {
        grid_size: args.grid_size,
        debounce_ms: args.debounce_ms,
        ..EditorConfig::default()
    };
    fs::write(&config_path, serde_json::to_string_pretty(&config)?)?;

    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);
    Ok(())
}
