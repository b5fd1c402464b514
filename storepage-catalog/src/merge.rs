//! Freshness-based merge of two entries for the same identity.
//!
//! Neither source is authoritative for the whole record. Identity fields
//! (kind, name, parent) follow the metadata timestamp; store-page fields
//! follow the scrape timestamp. Empty values never overwrite populated ones.

use crate::types::CatalogEntry;

/// Which field groups of `other` win, computed from the pre-merge receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergePolicy {
    pub use_metadata_fields: bool,
    pub use_scrape_fields: bool,
    pub replace_platforms: bool,
}

impl MergePolicy {
    pub fn between(current: &CatalogEntry, other: &CatalogEntry) -> Self {
        let newer_metadata = other.last_metadata_update_time > current.last_metadata_update_time;
        let scrape_not_older = other.last_scrape_time >= current.last_scrape_time;

        Self {
            use_metadata_fields: newer_metadata
                || (current.last_metadata_update_time == 0 && scrape_not_older),
            use_scrape_fields: scrape_not_older,
            replace_platforms: scrape_not_older
                || (current.last_scrape_time == 0 && newer_metadata)
                || current.platforms.is_empty(),
        }
    }
}

impl CatalogEntry {
    /// Fold `other` into `self` and return `self`.
    ///
    /// `other` is only read. Timestamps always end up as the max of both.
    pub fn merge(&mut self, other: &CatalogEntry) -> &mut Self {
        let policy = MergePolicy::between(self, other);

        if other.kind.is_known() && (!self.kind.is_known() || policy.use_metadata_fields) {
            self.kind = other.kind;
        }

        // Wholesale replace, never union.
        if policy.replace_platforms {
            self.platforms = other.platforms;
        }

        if policy.use_metadata_fields {
            adopt_text(&mut self.name, &other.name);
            if let Some(parent) = other.parent_id.filter(|&p| p > 0) {
                self.parent_id = Some(parent);
            }
        }

        if policy.use_scrape_fields {
            self.merge_scrape_fields(other);
        }

        self.touch_scrape_time(other.last_scrape_time);
        self.touch_metadata_time(other.last_metadata_update_time);
        self
    }

    fn merge_scrape_fields(&mut self, other: &CatalogEntry) {
        adopt_list(&mut self.genres, &other.genres);
        adopt_list(&mut self.flags, &other.flags);
        adopt_list(&mut self.tags, &other.tags);
        adopt_list(&mut self.developers, &other.developers);
        adopt_list(&mut self.publishers, &other.publishers);

        adopt_list(&mut self.vr_support.headsets, &other.vr_support.headsets);
        adopt_list(&mut self.vr_support.input, &other.vr_support.input);
        adopt_list(&mut self.vr_support.play_area, &other.vr_support.play_area);

        let (ours, theirs) = (&mut self.language_support, &other.language_support);
        adopt_list(&mut ours.interface_languages, &theirs.interface_languages);
        adopt_list(&mut ours.full_audio_languages, &theirs.full_audio_languages);
        adopt_list(&mut ours.subtitle_languages, &theirs.subtitle_languages);

        adopt_text(&mut self.release_date_text, &other.release_date_text);

        if other.total_achievements != 0 {
            self.total_achievements = other.total_achievements;
        }

        // The two review numbers describe one snapshot; move them together.
        if other.review_total != 0 {
            self.review_total = other.review_total;
            self.review_positive_percentage = other.review_positive_percentage;
        }

        adopt_text(&mut self.metacritic_slug, &other.metacritic_slug);
    }
}

fn adopt_list(target: &mut Vec<String>, source: &[String]) {
    if !source.is_empty() {
        *target = source.to_vec();
    }
}

fn adopt_text(target: &mut Option<String>, source: &Option<String>) {
    if let Some(value) = source.as_deref().filter(|v| !v.is_empty()) {
        *target = Some(value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AppKind, Platforms};

    fn stamped(id: u32, metadata: i64, scrape: i64) -> CatalogEntry {
        let mut entry = CatalogEntry::new(id);
        entry.last_metadata_update_time = metadata;
        entry.last_scrape_time = scrape;
        entry
    }

    #[test]
    fn policy_for_never_populated_receiver() {
        let policy = MergePolicy::between(&stamped(1, 0, 0), &stamped(1, 0, 0));
        assert!(policy.use_metadata_fields);
        assert!(policy.use_scrape_fields);
        assert!(policy.replace_platforms);
    }

    #[test]
    fn policy_with_stale_scrape_but_newer_metadata() {
        let policy = MergePolicy::between(&stamped(1, 100, 200), &stamped(1, 150, 50));
        assert!(policy.use_metadata_fields);
        assert!(!policy.use_scrape_fields);
    }

    #[test]
    fn policy_with_everything_older() {
        let mut current = stamped(1, 100, 200);
        current.platforms = Platforms::WINDOWS;
        let policy = MergePolicy::between(&current, &stamped(1, 50, 150));
        assert!(!policy.use_metadata_fields);
        assert!(!policy.use_scrape_fields);
        assert!(!policy.replace_platforms);
    }

    #[test]
    fn platforms_replaced_when_receiver_has_none() {
        let current = stamped(1, 100, 200);
        let mut other = stamped(1, 50, 150);
        other.platforms = Platforms::MAC;
        let mut merged = current.clone();
        merged.merge(&other);
        assert_eq!(merged.platforms, Platforms::MAC);
    }

    #[test]
    fn unknown_kind_is_filled_even_from_older_source() {
        let mut current = stamped(1, 100, 200);
        let mut other = stamped(1, 50, 150);
        other.kind = AppKind::Game;
        current.merge(&other);
        assert_eq!(current.kind, AppKind::Game);
    }

    #[test]
    fn known_kind_kept_against_older_metadata() {
        let mut current = stamped(1, 100, 200);
        current.kind = AppKind::Application;
        let mut other = stamped(1, 50, 150);
        other.kind = AppKind::Game;
        current.merge(&other);
        assert_eq!(current.kind, AppKind::Application);
    }

    #[test]
    fn reviews_move_together() {
        let mut current = stamped(1, 0, 10);
        current.review_total = 900;
        current.review_positive_percentage = 80;

        let mut no_total = stamped(1, 0, 20);
        no_total.review_positive_percentage = 12;
        current.merge(&no_total);
        assert_eq!((current.review_total, current.review_positive_percentage), (900, 80));

        let mut fresh = stamped(1, 0, 30);
        fresh.review_total = 1000;
        fresh.review_positive_percentage = 91;
        current.merge(&fresh);
        assert_eq!((current.review_total, current.review_positive_percentage), (1000, 91));
    }

    #[test]
    fn non_positive_parent_is_ignored() {
        let mut current = stamped(1, 0, 0);
        current.parent_id = Some(7);
        let mut other = stamped(1, 10, 0);
        other.parent_id = Some(0);
        current.merge(&other);
        assert_eq!(current.parent_id, Some(7));
    }
}
