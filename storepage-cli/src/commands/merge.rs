use std::path::Path;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use storepage_catalog::Catalog;

use crate::error::CliError;

/// Fold every entry of `source` into the catalog at `db`.
pub(crate) fn run_merge(source: &Path, db: &Path) -> Result<(), CliError> {
    if !source.exists() {
        return Err(CliError::other(format!(
            "{} does not exist",
            source.display()
        )));
    }

    let incoming = Catalog::load(source)?;
    let mut catalog = Catalog::load(db)?;
    let before = catalog.len();

    let mut changed = 0usize;
    for entry in incoming.entries() {
        let previous = catalog.get(entry.id()).cloned();
        let merged = catalog.merge_entry(entry.clone());
        if previous.as_ref().is_some_and(|p| p != merged) {
            changed += 1;
        }
    }
    catalog.save(db)?;

    log::info!(
        "{} Merged {} entries from {} ({} new, {} changed)",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        incoming.len(),
        source.display().if_supports_color(Stdout, |t| t.cyan()),
        catalog.len() - before,
        changed,
    );
    Ok(())
}
