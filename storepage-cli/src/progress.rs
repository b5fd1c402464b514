//! Progress display for a batch scrape.
//!
//! A counter bar for the whole batch, and below it one spinner line per id
//! currently being fetched. Lines are handed out when an id starts and
//! returned when its page is read, aborted or failed.

use std::collections::HashMap;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use storepage_scraper::ScrapeEvent;

const TICK: Duration = Duration::from_millis(100);

pub(crate) struct ScrapeProgress {
    #[allow(dead_code)]
    mp: MultiProgress,
    batch: ProgressBar,
    idle: Vec<ProgressBar>,
    in_flight: HashMap<u32, ProgressBar>,
}

impl ScrapeProgress {
    /// Progress for `total` ids fetched by up to `workers` at once. When
    /// `quiet` is true nothing is drawn.
    pub(crate) fn new(total: usize, workers: usize, quiet: bool) -> Self {
        let mp = if quiet {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        } else {
            MultiProgress::new()
        };

        let batch = mp.add(ProgressBar::new(total as u64));
        batch.set_style(
            ProgressStyle::with_template("  {bar:30.cyan/blue} {pos}/{len} pages")
                .expect("static pattern")
                .progress_chars("=> "),
        );

        let line_style = ProgressStyle::with_template("    {spinner:.cyan} app {msg}")
            .expect("static pattern")
            .tick_chars("/-\\|");
        let idle = (0..workers.clamp(1, total.max(1)))
            .map(|_| {
                let line = mp.add(ProgressBar::new_spinner());
                line.set_style(line_style.clone());
                line
            })
            .collect();

        Self {
            mp,
            batch,
            idle,
            in_flight: HashMap::new(),
        }
    }

    pub(crate) fn handle(&mut self, event: ScrapeEvent) {
        match event {
            ScrapeEvent::Started { id, .. } => self.start(id),
            ScrapeEvent::Completed { id, .. }
            | ScrapeEvent::Aborted { id, .. }
            | ScrapeEvent::Failed { id, .. } => self.finish(id),
            ScrapeEvent::Done => self.batch.finish(),
        }
    }

    /// Number of pages that have finished, whatever the outcome.
    pub(crate) fn finished(&self) -> u64 {
        self.batch.position()
    }

    fn start(&mut self, id: u32) {
        let Some(line) = self.idle.pop() else {
            return;
        };
        line.reset();
        line.enable_steady_tick(TICK);
        line.set_message(id.to_string());
        self.in_flight.insert(id, line);
    }

    fn finish(&mut self, id: u32) {
        self.batch.inc(1);
        if let Some(line) = self.in_flight.remove(&id) {
            line.disable_steady_tick();
            line.finish_and_clear();
            self.idle.push(line);
        }
    }

    /// Remove every line from the terminal.
    pub(crate) fn clear(self) {
        for line in self.in_flight.values().chain(&self.idle) {
            line.finish_and_clear();
        }
        self.batch.finish_and_clear();
    }
}
