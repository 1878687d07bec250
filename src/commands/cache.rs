use anyhow::Context;
use benchlog::BenchError;
use benchlog::git::Repository;
use benchlog::snapshot::{cache_root, clear_cache};
use benchlog::styling::{SUCCESS_EMOJI, WARNING_EMOJI};
use color_print::cformat;
use std::io::Write;

use super::color_choice;

fn current_repo() -> anyhow::Result<Repository> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    Ok(Repository::discover(&cwd)?)
}

/// Handle `benchlog cache dir`
pub fn handle_cache_dir() -> anyhow::Result<()> {
    let repo = current_repo()?;
    println!("{}", cache_root(&repo).display());
    Ok(())
}

/// Handle `benchlog cache clear [<tree>]`
pub fn handle_cache_clear(tree: Option<&str>, colored: bool) -> anyhow::Result<()> {
    if let Some(tree) = tree
        && (tree.is_empty() || !tree.chars().all(|c| c.is_ascii_hexdigit()))
    {
        return Err(BenchError::InvalidArgument {
            message: format!("'{tree}' is not a tree id"),
        }
        .into());
    }

    let repo = current_repo()?;
    let removed = clear_cache(&repo, tree)
        .with_context(|| format!("Failed to remove cache under {}", cache_root(&repo).display()))?;

    let message = match (removed, tree) {
        (true, Some(tree)) => {
            cformat!("{SUCCESS_EMOJI} <green>Removed cached results for tree <bold>{tree}</></>")
        }
        (true, None) => cformat!("{SUCCESS_EMOJI} <green>Removed all cached results</>"),
        (false, Some(tree)) => {
            cformat!("{WARNING_EMOJI} <yellow>No cached results for tree <bold>{tree}</></>")
        }
        (false, None) => cformat!("{WARNING_EMOJI} <yellow>No cached results</>"),
    };
    let mut stdout = anstream::AutoStream::new(std::io::stdout(), color_choice(colored));
    writeln!(stdout, "{message}")?;
    Ok(())
}
