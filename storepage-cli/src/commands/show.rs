use std::path::Path;

use storepage_catalog::Catalog;

use crate::error::CliError;

/// Print the entry for `id` as pretty JSON on stdout.
pub(crate) fn run_show(id: u32, db: &Path) -> Result<(), CliError> {
    let catalog = Catalog::load(db)?;
    let entry = catalog
        .get(id)
        .ok_or_else(|| CliError::NotFound(id, db.display().to_string()))?;

    let json = serde_json::to_string_pretty(entry)
        .map_err(|e| CliError::other(format!("could not serialize entry {id}: {e}")))?;
    println!("{json}");
    Ok(())
}
