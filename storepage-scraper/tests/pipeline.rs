use std::collections::HashMap;
use std::sync::Mutex;

use storepage_catalog::{ACHIEVEMENTS_FLAG, AppKind, Catalog, CatalogEntry, Platforms};
use storepage_scraper::{
    AbortReason, LogEntry, MAX_REDIRECTS, ScrapeError, ScrapeEvent, ScrapeOutcome, StoreFetcher,
    StoreResponse, StoreSettings, StoreTransport, scrape_from_store_at, scrape_many,
};
use url::Url;

const NOW: i64 = 1_700_000_000;

const GAME_MARKER: &str =
    r#"<a href="https://store.steampowered.com/search/?term=&snr=1_5_9__12">All Games</a>"#;
const SOFTWARE_MARKER: &str =
    r#"<a href="https://store.steampowered.com/search/?category1=994&snr=1_5_9__12">All Software</a>"#;
const DLC_MARKER: &str = r#"<img class="category_icon" src="https://store.akamai.steamstatic.com/public/images/v6/ico/ico_dlc.png">"#;

/// Answers from a fixed script keyed by URL; unknown URLs fail like a
/// dropped connection.
#[derive(Default)]
struct ScriptedTransport {
    script: HashMap<String, (u16, Option<String>, Option<String>)>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    fn page(mut self, url: &str, body: &str) -> Self {
        self.script
            .insert(url.to_string(), (200, None, Some(body.to_string())));
        self
    }

    fn redirect(mut self, url: &str, location: &str) -> Self {
        self.script
            .insert(url.to_string(), (302, Some(location.to_string()), None));
        self
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl StoreTransport for ScriptedTransport {
    async fn get(&self, url: &Url) -> Result<StoreResponse, ScrapeError> {
        self.requests.lock().unwrap().push(url.to_string());
        let Some((status, location, body)) = self.script.get(url.as_str()).cloned() else {
            return Err(ScrapeError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                format!("no route to {url}"),
            )));
        };
        Ok(StoreResponse {
            status,
            url: url.clone(),
            location,
            body,
        })
    }
}

/// Redirects every request to the same path with a growing query.
struct EndlessRedirects {
    hops: Mutex<u32>,
}

impl StoreTransport for EndlessRedirects {
    async fn get(&self, url: &Url) -> Result<StoreResponse, ScrapeError> {
        let mut hops = self.hops.lock().unwrap();
        *hops += 1;
        Ok(StoreResponse {
            status: 302,
            url: url.clone(),
            location: Some(format!("/app/1/?hop={}", *hops)),
            body: None,
        })
    }
}

fn app_url(id: u32) -> String {
    format!("https://store.steampowered.com/app/{id}/?l=english")
}

fn fetcher<T: StoreTransport>(transport: T) -> StoreFetcher<T> {
    StoreFetcher::new(transport, StoreSettings::default())
}

fn stamped_entry(id: u32) -> CatalogEntry {
    let mut entry = CatalogEntry::with_name(id, "Known");
    entry.last_scrape_time = 100;
    entry.last_metadata_update_time = 50;
    entry.tags = vec!["Puzzle".into()];
    entry
}

fn full_page() -> String {
    format!(
        r#"<html><head><title>Portal 2 on Steam</title></head><body>
{GAME_MARKER}
<div class="details_block">
	<b>Title:</b> Portal 2<br>
	<b>Genre:</b> <a href="https://store.steampowered.com/genre/Action/?snr=1_5_9__408">Action</a>, <a href="https://store.steampowered.com/genre/Adventure/?snr=1_5_9__408">Adventure</a><br>
	<b>Developer:</b>
	<a href="https://store.steampowered.com/search/?developer=Valve&snr=1_5_9__408">Valve</a><br>
	<b>Publisher:</b>
	<a href="https://store.steampowered.com/search/?publisher=Valve&snr=1_5_9__408">Valve</a><br>
</div>
<div class="release_date">
	<div class="subtitle column">Release Date:</div>
	<div class="date">18 Apr, 2011</div>
</div>
<span class="nonresponsive_hidden responsive_reviewdesc">
	- 98% of the 301,557 user reviews for this game are positive.
</span>
<a href="https://store.steampowered.com/tags/en/Puzzle/" class="app_tag">
	Puzzle	</a>
<a href="https://store.steampowered.com/tags/en/Co-op/" class="app_tag">
	Co-op	</a>
<div class="game_area_details_specs"><div class="icon"></div><a class="name" href="https://store.steampowered.com/search/?category2=2&snr=1">Single-player</a></div>
<div class="game_area_details_specs"><div class="icon"></div><a class="name" href="https://store.steampowered.com/search/?category2=9&snr=1">Co-op</a></div>
<div id="achievement_block" class="block responsive_apppage_details_right">
	<div class="block_title">Includes 51 Steam Achievements</div>
	<div class="communitylink_achievement_images">
</div>
<table>
<tr>
	<td style="width: 94px; text-align: left" class="ellipsis">
		English	</td>
	<td class="checkcol">
		<span>&#10004;</span>	</td>
	<td class="checkcol">
		<span>&#10004;</span>	</td>
	<td class="checkcol">
		<span>&#10004;</span>	</td>
</tr>
<tr>
	<td style="width: 94px; text-align: left" class="ellipsis">
		French	</td>
	<td class="checkcol">
		<span>&#10004;</span>	</td>
	<td class="checkcol">
			</td>
	<td class="checkcol">
		<span>&#10004;</span>	</td>
</tr>
</table>
<div id="game_area_metalink">
	<a href="https://www.metacritic.com/game/pc/portal-2?ftag=MCD-06-10aaa1f" target="_blank">Read Critic Reviews</a>
</div>
<div class="game_area_purchase_platform"><span class="platform_img win"></span><span class="platform_img mac"></span><span class="platform_img linux"></span></div>
</body></html>"#
    )
}

#[tokio::test]
async fn full_page_populates_entry() {
    let transport = ScriptedTransport::default().page(&app_url(620), &full_page());
    let fetcher = fetcher(transport);

    let mut entry = CatalogEntry::new(620);
    let outcome = scrape_from_store_at(&mut entry, &fetcher, NOW).await.unwrap();

    assert_eq!(outcome, ScrapeOutcome::Updated { alias: None });
    assert_eq!(entry.kind, AppKind::Game);
    assert_eq!(entry.genres, vec!["Action", "Adventure"]);
    assert_eq!(entry.developers, vec!["Valve"]);
    assert_eq!(entry.publishers, vec!["Valve"]);
    assert_eq!(entry.tags, vec!["Puzzle", "Co-op"]);
    assert_eq!(entry.flags, vec!["Single-player", "Co-op", ACHIEVEMENTS_FLAG]);
    assert_eq!(entry.total_achievements, 51);
    assert_eq!(entry.review_positive_percentage, 98);
    assert_eq!(entry.review_total, 301_557);
    assert_eq!(entry.release_date_text.as_deref(), Some("18 Apr, 2011"));
    assert_eq!(entry.metacritic_slug.as_deref(), Some("portal-2"));
    assert_eq!(entry.platforms, Platforms::ALL);
    assert_eq!(
        entry.language_support.interface_languages,
        vec!["English", "French"]
    );
    assert_eq!(entry.language_support.full_audio_languages, vec!["English"]);
    assert_eq!(
        entry.language_support.subtitle_languages,
        vec!["English", "French"]
    );
    assert_eq!(entry.parent_id, None);
    assert_eq!(entry.last_scrape_time, NOW);
    assert_eq!(entry.last_metadata_update_time, 0);
}

#[tokio::test]
async fn rescrape_replaces_lists_from_previous_scrape() {
    let transport = ScriptedTransport::default().page(&app_url(620), &full_page());
    let fetcher = fetcher(transport);

    let mut entry = stamped_entry(620);
    entry.tags = vec!["Old Tag".into(), "Puzzle".into()];
    entry.genres = vec!["Racing".into()];
    entry.developers = vec!["Someone Else".into()];
    entry.flags = vec!["Remote Play".into(), ACHIEVEMENTS_FLAG.into()];
    entry.language_support.interface_languages = vec!["German".into()];
    entry.language_support.full_audio_languages = vec!["German".into()];
    entry.language_support.subtitle_languages = vec!["German".into(), "Polish".into()];

    scrape_from_store_at(&mut entry, &fetcher, NOW).await.unwrap();

    assert_eq!(entry.tags, vec!["Puzzle", "Co-op"]);
    assert_eq!(entry.genres, vec!["Action", "Adventure"]);
    assert_eq!(entry.developers, vec!["Valve"]);
    assert_eq!(entry.flags, vec!["Single-player", "Co-op", ACHIEVEMENTS_FLAG]);
    assert_eq!(
        entry.flags.iter().filter(|f| *f == ACHIEVEMENTS_FLAG).count(),
        1
    );
    assert_eq!(
        entry.language_support.interface_languages,
        vec!["English", "French"]
    );
    assert_eq!(entry.language_support.full_audio_languages, vec!["English"]);
    assert_eq!(
        entry.language_support.subtitle_languages,
        vec!["English", "French"]
    );
    assert_eq!(entry.name.as_deref(), Some("Known"));
    assert_eq!(entry.last_metadata_update_time, 50);
}

#[tokio::test]
async fn redirect_to_home_leaves_entry_unchanged() {
    let transport = ScriptedTransport::default()
        .redirect(&app_url(5), "https://store.steampowered.com/");
    let fetcher = fetcher(transport);

    let mut entry = stamped_entry(5);
    let before = entry.clone();
    let outcome = scrape_from_store_at(&mut entry, &fetcher, NOW).await.unwrap();

    assert_eq!(outcome, ScrapeOutcome::Aborted(AbortReason::RedirectedToHome));
    assert_eq!(entry, before);
}

#[tokio::test]
async fn self_redirect_terminates() {
    let url = app_url(7);
    let transport = ScriptedTransport::default().redirect(&url, &url);
    let fetcher = fetcher(transport);

    let mut entry = CatalogEntry::new(7);
    let outcome = scrape_from_store_at(&mut entry, &fetcher, NOW).await.unwrap();

    assert_eq!(outcome, ScrapeOutcome::Aborted(AbortReason::SelfRedirect));
    assert_eq!(entry.last_scrape_time, 0);
}

#[tokio::test]
async fn endless_redirects_stop_at_hop_limit() {
    let fetcher = fetcher(EndlessRedirects {
        hops: Mutex::new(0),
    });

    let mut entry = CatalogEntry::new(1);
    let outcome = scrape_from_store_at(&mut entry, &fetcher, NOW).await.unwrap();

    assert_eq!(outcome, ScrapeOutcome::Aborted(AbortReason::TooManyRedirects));
}

#[tokio::test]
async fn redirect_chain_counts_requests() {
    let transport = ScriptedTransport::default().redirect(&app_url(1), "/app/1/?hop=1");
    let transport = (1..=MAX_REDIRECTS).fold(transport, |t, hop| {
        t.redirect(
            &format!("https://store.steampowered.com/app/1/?hop={hop}"),
            &format!("/app/1/?hop={}", hop + 1),
        )
    });
    let fetcher = fetcher(transport);

    let mut entry = CatalogEntry::new(1);
    let outcome = scrape_from_store_at(&mut entry, &fetcher, NOW).await.unwrap();
    assert_eq!(outcome, ScrapeOutcome::Aborted(AbortReason::TooManyRedirects));

    let requests = fetcher.transport().requests();
    assert_eq!(requests.len(), usize::from(MAX_REDIRECTS) + 1);
    assert_eq!(requests[0], app_url(1));
}

#[tokio::test]
async fn age_check_redirect_records_parent() {
    let agecheck = "https://store.steampowered.com/agecheck/film/40960/";
    let transport = ScriptedTransport::default()
        .redirect(&app_url(12345), agecheck)
        .page(agecheck, &full_page());
    let fetcher = fetcher(transport);

    let mut entry = CatalogEntry::new(12345);
    let outcome = scrape_from_store_at(&mut entry, &fetcher, NOW).await.unwrap();

    assert_eq!(outcome, ScrapeOutcome::Updated { alias: Some(40960) });
    assert_eq!(entry.parent_id, Some(40960));
    assert_eq!(entry.id(), 12345);
    assert_eq!(entry.review_total, 301_557);
}

#[tokio::test]
async fn age_check_on_same_id_aborts() {
    let agecheck = "https://store.steampowered.com/agecheck/app/12345/";
    let transport = ScriptedTransport::default()
        .redirect(&app_url(12345), agecheck)
        .page(agecheck, GAME_MARKER);
    let fetcher = fetcher(transport);

    let mut entry = CatalogEntry::new(12345);
    let outcome = scrape_from_store_at(&mut entry, &fetcher, NOW).await.unwrap();
    assert_eq!(outcome, ScrapeOutcome::Aborted(AbortReason::AgeCheckNoRedirect));
}

#[tokio::test]
async fn dlc_marker_wins_over_application_marker() {
    let body = format!("<html>{SOFTWARE_MARKER}{DLC_MARKER}</html>");
    let transport = ScriptedTransport::default().page(&app_url(8), &body);
    let fetcher = fetcher(transport);

    let mut entry = CatalogEntry::new(8);
    scrape_from_store_at(&mut entry, &fetcher, NOW).await.unwrap();
    assert_eq!(entry.kind, AppKind::Dlc);
}

#[tokio::test]
async fn site_error_and_junk_pages_abort() {
    let transport = ScriptedTransport::default()
        .page(&app_url(2), &format!("<title>Site Error</title>{GAME_MARKER}"))
        .page(&app_url(3), "<html>maintenance</html>")
        .page(&app_url(4), "");
    let fetcher = fetcher(transport);

    for (id, reason) in [
        (2, AbortReason::SiteError),
        (3, AbortReason::UnrecognizedPage),
        (4, AbortReason::EmptyBody),
    ] {
        let mut entry = stamped_entry(id);
        let before = entry.clone();
        let outcome = scrape_from_store_at(&mut entry, &fetcher, NOW).await.unwrap();
        assert_eq!(outcome, ScrapeOutcome::Aborted(reason));
        assert_eq!(entry, before);
    }
}

#[tokio::test]
async fn transport_failure_is_returned() {
    let fetcher = fetcher(ScriptedTransport::default());

    let mut entry = stamped_entry(9);
    let before = entry.clone();
    let result = scrape_from_store_at(&mut entry, &fetcher, NOW).await;

    assert!(matches!(result, Err(ScrapeError::Io(_))));
    assert_eq!(entry, before);
}

#[tokio::test]
async fn scrape_time_never_moves_backwards() {
    let transport = ScriptedTransport::default().page(&app_url(620), &full_page());
    let fetcher = fetcher(transport);

    let mut entry = CatalogEntry::new(620);
    entry.last_scrape_time = NOW + 500;
    scrape_from_store_at(&mut entry, &fetcher, NOW).await.unwrap();
    assert_eq!(entry.last_scrape_time, NOW + 500);
}

#[tokio::test]
async fn batch_reports_every_id() {
    let transport = ScriptedTransport::default()
        .page(&app_url(620), &full_page())
        .redirect(&app_url(5), "https://store.steampowered.com/");
    let fetcher = fetcher(transport);
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

    let entries = vec![
        CatalogEntry::new(620),
        CatalogEntry::new(5),
        CatalogEntry::new(9),
    ];
    let result = scrape_many(&fetcher, entries, 2, tx).await;

    assert_eq!(result.entries.len(), 1);
    assert_eq!(result.entries[0].id(), 620);

    let summary = result.log.summary();
    assert_eq!(
        (summary.total_updated, summary.total_aborted, summary.total_failed),
        (1, 1, 1)
    );
    assert!(matches!(
        result.log.entries()[1],
        LogEntry::Aborted {
            id: 5,
            reason: AbortReason::RedirectedToHome
        }
    ));

    let mut started = 0;
    let mut done = false;
    while let Ok(event) = rx.try_recv() {
        match event {
            ScrapeEvent::Started { .. } => started += 1,
            ScrapeEvent::Done => done = true,
            _ => {}
        }
    }
    assert_eq!(started, 3);
    assert!(done);
}

#[tokio::test]
async fn batch_scrapes_stored_entries_in_place() {
    let agecheck = "https://store.steampowered.com/agecheck/app/400/";
    let body = format!(
        r#"<html>{GAME_MARKER}{DLC_MARKER}
<div id="achievement_block" class="block responsive_apppage_details_right">
	<div class="block_title">Includes 12 Steam Achievements</div>
	<div class="communitylink_achievement_images">
</div></html>"#
    );
    let transport = ScriptedTransport::default()
        .redirect(&app_url(12345), agecheck)
        .page(agecheck, &body);
    let fetcher = fetcher(transport);

    let mut stored = CatalogEntry::with_name(12345, "Portal: Soundtrack");
    stored.kind = AppKind::Game;
    stored.flags = vec!["Single-player".into(), ACHIEVEMENTS_FLAG.into()];
    stored.last_metadata_update_time = 50;
    stored.last_scrape_time = 100;
    let mut catalog = Catalog::new();
    catalog.insert(stored);

    let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
    let result = scrape_many(&fetcher, catalog.entries_for(&[12345]), 1, tx).await;
    for entry in result.entries {
        catalog.insert(entry);
    }

    let entry = catalog.get(12345).unwrap();
    assert_eq!(entry.parent_id, Some(400));
    assert_eq!(entry.kind, AppKind::Dlc);
    assert_eq!(entry.flags, vec!["Single-player", ACHIEVEMENTS_FLAG]);
    assert_eq!(entry.total_achievements, 12);
    assert_eq!(entry.name.as_deref(), Some("Portal: Soundtrack"));
    assert_eq!(entry.last_metadata_update_time, 50);
    assert!(entry.last_scrape_time > 100);
}
