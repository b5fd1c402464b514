use std::time::Duration;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use storepage_scraper::{StoreSettings, default_catalog_path, save_settings, settings_path};

use crate::error::CliError;

/// Show resolved settings and their sources.
pub(crate) fn run_config_show() -> Result<(), CliError> {
    let path = settings_path();
    let (settings, sources) = StoreSettings::load_with_sources()?;

    log::info!(
        "{}",
        "Store Settings".if_supports_color(Stdout, |t| t.bold()),
    );
    log::info!("");

    let status = if path.exists() { "(exists)" } else { "(not found)" };
    log::info!(
        "  Settings file: {} {}",
        path.display().if_supports_color(Stdout, |t| t.cyan()),
        status.if_supports_color(Stdout, |t| t.dimmed()),
    );
    log::info!(
        "  Catalog:       {}",
        default_catalog_path()
            .display()
            .if_supports_color(Stdout, |t| t.cyan()),
    );
    log::info!("");

    let fields = [
        ("base_url", settings.base_url.to_string(), sources.base_url),
        ("language", settings.language.clone(), sources.language),
        (
            "timeout_secs",
            settings.timeout.as_secs().to_string(),
            sources.timeout,
        ),
    ];
    for (name, value, source) in fields {
        log::info!(
            "  {} {} {}",
            format!("{}:", name).if_supports_color(Stdout, |t| t.cyan()),
            value,
            format!("({})", source).if_supports_color(Stdout, |t| t.dimmed()),
        );
    }
    Ok(())
}

/// Update the settings file with any values given.
pub(crate) fn run_config_set(
    base_url: Option<String>,
    language: Option<String>,
    timeout_secs: Option<u64>,
) -> Result<(), CliError> {
    if base_url.is_none() && language.is_none() && timeout_secs.is_none() {
        return Err(CliError::other(
            "nothing to set: pass --base-url, --language or --timeout-secs",
        ));
    }

    let mut settings = StoreSettings::load()?;
    if let Some(url) = base_url.as_deref() {
        settings = settings.with_base_url(url)?;
    }
    if let Some(language) = language {
        settings = settings.with_language(language);
    }
    if let Some(secs) = timeout_secs {
        if secs == 0 {
            return Err(CliError::other("timeout must be at least one second"));
        }
        settings.timeout = Duration::from_secs(secs);
    }

    save_settings(&settings)?;
    log::info!(
        "{} Settings saved to {}",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        settings_path()
            .display()
            .if_supports_color(Stdout, |t| t.cyan()),
    );
    Ok(())
}

/// Print the settings file path.
pub(crate) fn run_config_path() {
    log::info!("{}", settings_path().display());
}
