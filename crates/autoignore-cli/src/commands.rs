//! CLI command implementations.

use autoignore_core::{IgnoreConfig, PatternOrigin, RuleSet, FALLBACK_DIR};
use autoignore_watcher::{IgnoreManager, IgnoreRegistry};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use walkdir::WalkDir;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

const STARTER_RULES: &str = "\
# Paths listed here are skipped by indexing and search.
# One pattern per line. A trailing / matches directories only,
# a / anywhere else anchors the pattern to the project root,
# and a leading ! re-includes a path.
#
# *.log
# tmp/
";

/// Config file looked up under the root when `--config` isn't given.
fn default_config_path(root: &Path) -> PathBuf {
    root.join(FALLBACK_DIR).join("ignore.json")
}

/// Loads the explicit config, the per-project one, or the defaults.
pub fn load_config(root: &Path, explicit: Option<&Path>) -> Result<IgnoreConfig> {
    if let Some(path) = explicit {
        return Ok(IgnoreConfig::from_file(path)?);
    }
    let project = default_config_path(root);
    if project.is_file() {
        return Ok(IgnoreConfig::from_file(&project)?);
    }
    Ok(IgnoreConfig::default())
}

/// Write a starter rules file.
pub fn init(path: &Path, config: Option<&Path>) -> Result<()> {
    let config = load_config(path, config)?;
    let rules_file = config.rules_file_path(path);

    if rules_file.exists() {
        println!("{} Already initialized ({})", "✓".green(), rules_file.display());
        return Ok(());
    }

    fs::write(&rules_file, STARTER_RULES)?;

    println!("{} Created {}", "✓".green(), rules_file.display());
    println!(
        "  Run {} to see the effective patterns",
        "autoignore rules".cyan()
    );

    Ok(())
}

/// Check a list of paths.
pub fn check(
    root: &Path,
    config: Option<&Path>,
    paths: &[PathBuf],
    explain: bool,
    json: bool,
) -> Result<()> {
    let config = load_config(root, config)?;
    let manager = IgnoreManager::new(root, config)?;

    let mut results = Vec::with_capacity(paths.len());
    for path in paths {
        let ignored = manager.should_ignore(path);
        let pattern = manager.matching_pattern(path);
        results.push((path, ignored, pattern));
    }

    if json {
        let out: Vec<_> = results
            .iter()
            .map(|(path, ignored, pattern)| {
                serde_json::json!({
                    "path": path.display().to_string(),
                    "ignored": ignored,
                    "pattern": pattern.as_ref().map(|p| p.raw().to_string()),
                    "origin": pattern.as_ref().map(|p| p.origin()),
                    "line": pattern.as_ref().and_then(|p| p.line()),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    for (path, ignored, pattern) in &results {
        let status = if *ignored {
            "ignored".yellow()
        } else {
            "kept".green()
        };
        println!("  {:>8} {}", status, path.display());

        if explain {
            if let Some(p) = pattern {
                let source = match (p.origin(), p.line()) {
                    (PatternOrigin::User, Some(line)) => format!("line {}", line),
                    (origin, _) => origin.to_string(),
                };
                println!("           {} {}", p.raw().cyan(), format!("({})", source).dimmed());
            }
        }
    }

    Ok(())
}

/// List the effective patterns in evaluation order.
pub fn rules(path: &Path, config: Option<&Path>) -> Result<()> {
    let config = load_config(path, config)?;
    let manager = IgnoreManager::new(path, config)?;
    let rules = manager.rules();

    match rules.source() {
        Some(source) => println!("Rules file: {}", source.display().to_string().cyan()),
        None => println!("Rules file: {}", "none (defaults only)".dimmed()),
    }
    println!();

    for pattern in rules.patterns() {
        let origin = match pattern.origin() {
            PatternOrigin::Default => "default".dimmed(),
            PatternOrigin::User => "user".cyan(),
        };
        println!("  {:>7}  {}", origin, pattern.raw());
    }

    print_diagnostics(&rules);
    Ok(())
}

/// Walk the root and print every file that isn't ignored.
pub fn scan(path: &Path, config: Option<&Path>) -> Result<()> {
    let config = load_config(path, config)?;
    let manager = IgnoreManager::new(path, config)?;
    let rules = manager.rules();
    let root = manager.root();

    let mut kept = 0;
    let mut skipped = 0;

    let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
        if entry.depth() == 0 {
            return true;
        }
        let rel = autoignore_core::relative_to(root, entry.path()).unwrap_or_default();
        let ignored = rules.is_ignored(&rel, entry.file_type().is_dir());
        if ignored {
            skipped += 1;
        }
        !ignored
    });

    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_file() {
            let rel = entry.path().strip_prefix(root)?;
            println!("{}", rel.display());
            kept += 1;
        }
    }

    eprintln!(
        "{} {} files kept, {} entries skipped",
        "✓".green(),
        kept.to_string().cyan(),
        skipped.to_string().cyan()
    );
    print_diagnostics(&rules);
    Ok(())
}

/// Watch the rules file and report each reload until Ctrl+C.
pub async fn watch(path: &Path, config: Option<&Path>) -> Result<()> {
    let config = load_config(path, config)?;
    let registry = IgnoreRegistry::new(IgnoreConfig {
        watch: true,
        ..config
    });
    let manager = registry.get_instance(path)?;

    if !manager.is_watching() {
        return Err("file watching is unavailable on this system".into());
    }

    println!(
        "{} Watching {}",
        "✓".green(),
        manager.rules_file().display().to_string().cyan()
    );
    println!("  Press {} to stop", "Ctrl+C".cyan());

    let mut seen = manager.generation();
    let mut tick = tokio::time::interval(Duration::from_millis(250));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            _ = tick.tick() => {
                let generation = manager.generation();
                if generation != seen {
                    seen = generation;
                    let rules = manager.rules();
                    println!(
                        "{} Reloaded: {} user patterns",
                        "↻".cyan(),
                        rules.user_patterns().count()
                    );
                    print_diagnostics(&rules);
                }
            }
        }
    }

    registry.reset_instance(manager.root());
    println!("{} Stopped", "✓".green());
    Ok(())
}

fn print_diagnostics(rules: &RuleSet) {
    if rules.diagnostics().is_empty() {
        return;
    }
    eprintln!("\n{} {} problems:", "⚠".yellow(), rules.diagnostics().len());
    for d in rules.diagnostics() {
        eprintln!("  {}", d);
    }
}
