//! Periodic refresh loop mirroring upstream content into the feed store.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::infra::store::FeedStore;
use crate::infra::upstream::{ContentApi, UpstreamError};

#[derive(Debug, Error)]
pub enum PollError {
    #[error("initial tag fetch failed: {0}")]
    InitialTags(#[from] UpstreamError),
}

/// Drives the two-phase refresh (tags, then posts per tag) on a fixed
/// interval.
///
/// The initial tag fetch must succeed before the periodic phase starts; that
/// failure is the one fatal outcome. Every later refresh failure keeps the
/// previous store contents and the loop alive.
pub struct Poller {
    api: Arc<dyn ContentApi>,
    store: Arc<FeedStore>,
    interval: Duration,
}

impl Poller {
    pub fn new(api: Arc<dyn ContentApi>, store: Arc<FeedStore>, interval: Duration) -> Self {
        Self {
            api,
            store,
            interval,
        }
    }

    /// Run until `shutdown` fires or the initial tag fetch fails.
    ///
    /// Ticks fire at a fixed interval from poller start; a slow cycle may be
    /// followed by a back-to-back tick, without overlap within the loop.
    /// Cancellation stops the wait for the next tick; an in-flight upstream
    /// request is left to complete or fail on its own.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), PollError> {
        info!(target = "feedrelay::poller", "polling started");

        self.refresh_tags().await?;
        self.refresh_posts().await;
        counter!("feedrelay_poll_cycles_total").increment(1);

        let mut ticker = tokio::time::interval(self.interval);
        ticker.tick().await; // the first tick completes immediately

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(err) = self.refresh_tags().await {
                        counter!("feedrelay_tag_refresh_errors_total").increment(1);
                        warn!(
                            target = "feedrelay::poller",
                            error = %err,
                            "tag refresh failed, keeping previous tag set"
                        );
                    }
                    self.refresh_posts().await;
                    counter!("feedrelay_poll_cycles_total").increment(1);
                }
                _ = shutdown.changed() => {
                    info!(target = "feedrelay::poller", "polling stopped");
                    return Ok(());
                }
            }
        }
    }

    async fn refresh_tags(&self) -> Result<(), UpstreamError> {
        debug!(target = "feedrelay::poller", "refreshing tags");
        let tags = self.api.fetch_tags().await?;
        self.store.set_tags(tags);
        Ok(())
    }

    /// Refresh posts for every currently cached active tag. Per-tag failures
    /// are reported and the remaining tags are still attempted.
    async fn refresh_posts(&self) {
        for tag in self.store.tags() {
            debug!(
                target = "feedrelay::poller",
                tag_id = %tag.id,
                tag_name = %tag.name,
                "refreshing posts"
            );
            match self.api.fetch_posts(&tag.id).await {
                Ok(posts) => self.store.set_posts_for_tag(&tag.name, posts),
                Err(err) => {
                    counter!("feedrelay_post_refresh_errors_total").increment(1);
                    error!(
                        target = "feedrelay::poller",
                        tag_name = %tag.name,
                        error = %err,
                        "post refresh failed"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use reqwest::StatusCode;

    use crate::domain::entities::{PostRecord, TagRecord};

    use super::*;

    /// Scripted upstream: optionally fails tag fetches from a given call on.
    struct ScriptedApi {
        tags_calls: AtomicUsize,
        posts_calls: AtomicUsize,
        fail_tags_from_call: Option<usize>,
    }

    impl ScriptedApi {
        fn new(fail_tags_from_call: Option<usize>) -> Self {
            Self {
                tags_calls: AtomicUsize::new(0),
                posts_calls: AtomicUsize::new(0),
                fail_tags_from_call,
            }
        }

        fn launch_tag() -> TagRecord {
            TagRecord {
                id: "42".to_string(),
                name: "launch".to_string(),
                ..TagRecord::default()
            }
        }

        fn launch_post() -> PostRecord {
            PostRecord {
                id: "1".to_string(),
                html_title: "A".to_string(),
                ..PostRecord::default()
            }
        }
    }

    #[async_trait]
    impl ContentApi for ScriptedApi {
        async fn fetch_tags(&self) -> Result<Vec<TagRecord>, UpstreamError> {
            let call = self.tags_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_tags_from_call.is_some_and(|from| call >= from) {
                return Err(UpstreamError::Status {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                });
            }
            Ok(vec![Self::launch_tag()])
        }

        async fn fetch_posts(&self, _tag_id: &str) -> Result<Vec<PostRecord>, UpstreamError> {
            self.posts_calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![Self::launch_post()])
        }
    }

    #[tokio::test]
    async fn initial_tag_fetch_failure_is_fatal_before_any_post_fetch() {
        let api = Arc::new(ScriptedApi::new(Some(0)));
        let store = Arc::new(FeedStore::new());
        let poller = Poller::new(api.clone(), store.clone(), Duration::from_secs(60));
        let (_tx, rx) = watch::channel(false);

        let result = poller.run(rx).await;

        assert!(matches!(result, Err(PollError::InitialTags(_))));
        assert_eq!(api.posts_calls.load(Ordering::SeqCst), 0);
        assert!(store.tags().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn later_tag_refresh_failure_keeps_previous_contents() {
        let api = Arc::new(ScriptedApi::new(Some(1)));
        let store = Arc::new(FeedStore::new());
        let poller = Poller::new(api.clone(), store.clone(), Duration::from_secs(60));
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(async move { poller.run(rx).await });

        // Past the first periodic tick, whose tag refresh returns HTTP 500.
        tokio::time::sleep(Duration::from_secs(61)).await;

        assert!(api.tags_calls.load(Ordering::SeqCst) >= 2);
        assert_eq!(store.tags().len(), 1);
        assert_eq!(
            store.posts_for_tag("launch").expect("cached"),
            vec![ScriptedApi::launch_post()]
        );
        assert!(!handle.is_finished());

        tx.send(true).expect("poller alive");
        let result = handle.await.expect("poller task");
        assert!(result.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_the_loop_promptly() {
        let api = Arc::new(ScriptedApi::new(None));
        let store = Arc::new(FeedStore::new());
        let poller = Poller::new(api, store, Duration::from_secs(600));
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(async move { poller.run(rx).await });
        tokio::time::sleep(Duration::from_secs(1)).await;

        tx.send(true).expect("poller alive");
        let result = handle.await.expect("poller task");
        assert!(result.is_ok());
    }
}
