//! Drive a scrape future while rendering its progress events.

use std::future::Future;

use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};

/// How long to keep draining events after the task finishes.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Run `task` to completion, calling `on_event` for each event received on
/// `event_rx`. Returns the task's result once the channel is drained (or the
/// drain times out).
pub(crate) async fn run_with_events<F, E, R>(
    task: F,
    mut event_rx: mpsc::UnboundedReceiver<E>,
    mut on_event: impl FnMut(E),
) -> R
where
    F: Future<Output = R>,
{
    tokio::pin!(task);

    let result = loop {
        tokio::select! {
            r = &mut task => break Some(r),
            event = event_rx.recv() => match event {
                Some(e) => on_event(e),
                None => break None,
            },
        }
    };

    let Some(result) = result else {
        log::debug!("run_with_events: channel closed before task finished");
        return task.await;
    };

    let deadline = Instant::now() + DRAIN_TIMEOUT;
    loop {
        match tokio::time::timeout_at(deadline, event_rx.recv()).await {
            Ok(Some(e)) => on_event(e),
            Ok(None) => break,
            Err(_) => {
                log::warn!(
                    "run_with_events: drain timed out after {}s",
                    DRAIN_TIMEOUT.as_secs()
                );
                break;
            }
        }
    }
    result
}
