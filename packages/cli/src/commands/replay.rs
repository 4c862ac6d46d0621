use crate::script::{self, Outcome, Replay};
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use pagecraft_editor::model::Page;
use pagecraft_editor::{DocumentStore, EditorConfig, InMemoryRepository, RepositoryCall};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// JSON script of editing steps
    pub script: PathBuf,

    /// Config file (defaults to pagecraft.config.json in the current directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Simulated repository latency in milliseconds
    #[arg(long, default_value_t = 0)]
    pub latency_ms: u64,

    /// Print only the final document
    #[arg(short, long)]
    pub quiet: bool,
}

pub async fn replay(args: ReplayArgs, cwd: &Path) -> Result<()> {
    let config = match &args.config {
        Some(path) => EditorConfig::from_path(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EditorConfig::load(cwd)?,
    };

    let source = fs::read_to_string(&args.script)
        .with_context(|| format!("Failed to read script {}", args.script.display()))?;
    let steps = script::parse(&source).with_context(|| format!("Invalid script {}", args.script.display()))?;

    let repository = Arc::new(InMemoryRepository::with_latency(Duration::from_millis(args.latency_ms)));
    let mut store = DocumentStore::new(config, repository.clone())?;
    store.load_page(Page::new("untitled", "Untitled"), Vec::new());

    if !args.quiet {
        eprintln!(
            "{}",
            format!("▶ Replaying {} steps...", steps.len()).bright_blue().bold()
        );
    }

    let mut replay = Replay::new(&mut store);
    let mut ignored = 0;
    let mut failed = 0;
    for (index, step) in steps.iter().enumerate() {
        match replay.run(step).await {
            Outcome::Applied => {}
            Outcome::Ignored => {
                ignored += 1;
                if !args.quiet {
                    eprintln!("  {} step {} ignored: {:?}", "•".yellow(), index, step);
                }
            }
            Outcome::Failed(e) => {
                failed += 1;
                eprintln!("  {} step {} - {}", "✗".red(), index, e);
            }
        }
    }

    store.flush().await;
    info!(steps = steps.len(), ignored, failed, "replay finished");

    println!("{}", serde_json::to_string_pretty(store.document())?);

    if !args.quiet {
        print_summary(&repository.calls(), steps.len(), ignored, failed);
    }
    Ok(())
}

fn print_summary(calls: &[RepositoryCall], steps: usize, ignored: usize, failed: usize) {
    let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    for call in calls {
        *counts.entry(call_name(call)).or_default() += 1;
    }

    eprintln!();
    eprintln!("{}", "Repository calls:".bright_white().bold());
    for (name, count) in &counts {
        eprintln!("  {} {:<16} {}", "✓".green(), name, count);
    }
    eprintln!();

    let applied = steps - ignored - failed;
    if failed > 0 {
        eprintln!(
            "{} {} applied, {} ignored, {} failed",
            "Done:".yellow().bold(),
            applied,
            ignored,
            failed
        );
    } else {
        eprintln!(
            "{} {} applied, {} ignored",
            "Done:".green().bold(),
            applied,
            ignored
        );
    }
}

fn call_name(call: &RepositoryCall) -> &'static str {
    match call {
        RepositoryCall::CreateSection { .. } => "createSection",
        RepositoryCall::UpdateSection { .. } => "updateSection",
        RepositoryCall::DeleteSection { .. } => "deleteSection",
        RepositoryCall::ReorderSections { .. } => "reorderSections",
        RepositoryCall::CreateElement { .. } => "createElement",
        RepositoryCall::UpdateElement { .. } => "updateElement",
        RepositoryCall::DeleteElement { .. } => "deleteElement",
    }
}
