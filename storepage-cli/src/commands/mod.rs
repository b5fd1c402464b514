pub(crate) mod config;
pub(crate) mod merge;
pub(crate) mod scrape;
pub(crate) mod show;
