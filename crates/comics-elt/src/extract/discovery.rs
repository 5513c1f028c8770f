//! Sequential discovery of new comics
//!
//! The source has no listing endpoint, so new comics are found by asking for
//! consecutive numbers until the source says there is nothing there. Fetches
//! are strictly one at a time and in order: the first "not found" is only
//! meaningful if every lower number was already asked for.
//!
//! ```text
//!             found                      not found
//!  Fetching ─────────► Found ──► Fetching ─────────► Exhausted
//!      │
//!      └── transport / decode error ─────────────────► Failed
//! ```
//!
//! `Exhausted` and `Failed` are terminal. A [`Discovery`] cannot be rewound;
//! the next run builds a new one from a freshly resolved resume point.

use tracing::{error, info};

use crate::source::{ComicSource, FetchOutcome, RawRecord};

/// Where a discovery run currently stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryState {
    /// The next call requests `cursor`
    Fetching { cursor: i64 },
    /// `num` was just returned; `next` is requested on the following call
    Found { num: i64, next: i64 },
    /// The source has no comic at `cursor`
    Exhausted { cursor: i64, status: u16 },
    /// Requesting `cursor` failed; everything before it was kept
    Failed { cursor: i64, reason: String },
}

/// Identifier requested after `current`, stepping over `skip_id`.
pub fn next_id(current: i64, skip_id: i64) -> i64 {
    if current + 1 == skip_id {
        current + 2
    } else {
        current + 1
    }
}

/// Lazy, finite walk over the source starting at a resume point
pub struct Discovery<'a> {
    source: &'a dyn ComicSource,
    skip_id: i64,
    state: DiscoveryState,
    found: usize,
}

impl<'a> Discovery<'a> {
    /// Start at `start`; a start equal to `skip_id` begins just past it.
    pub fn new(source: &'a dyn ComicSource, start: i64, skip_id: i64) -> Self {
        let cursor = if start == skip_id { start + 1 } else { start };
        Self {
            source,
            skip_id,
            state: DiscoveryState::Fetching { cursor },
            found: 0,
        }
    }

    pub fn state(&self) -> &DiscoveryState {
        &self.state
    }

    /// Identifier the next call will request, if any
    pub fn cursor(&self) -> Option<i64> {
        match self.state {
            DiscoveryState::Fetching { cursor } => Some(cursor),
            DiscoveryState::Found { next, .. } => Some(next),
            DiscoveryState::Exhausted { .. } | DiscoveryState::Failed { .. } => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.cursor().is_none()
    }

    /// Number of records returned so far
    pub fn found(&self) -> usize {
        self.found
    }

    /// Fetch the next comic, or `None` once the walk has ended.
    pub async fn next_record(&mut self) -> Option<RawRecord> {
        let cursor = self.cursor()?;
        self.state = DiscoveryState::Fetching { cursor };

        match self.source.fetch(cursor).await {
            Ok(FetchOutcome::Found(record)) => {
                info!(num = cursor, "Extracted comic");
                self.found += 1;
                self.state = DiscoveryState::Found {
                    num: cursor,
                    next: next_id(cursor, self.skip_id),
                };
                Some(record)
            },
            Ok(FetchOutcome::NotFound { status }) => {
                info!(num = cursor, status, "No comic found, stopping extraction");
                self.state = DiscoveryState::Exhausted { cursor, status };
                None
            },
            Err(e) => {
                error!(num = cursor, error = %e, "Fetching comic failed, stopping extraction");
                self.state = DiscoveryState::Failed {
                    cursor,
                    reason: e.to_string(),
                };
                None
            },
        }
    }

    /// Drain the walk into a vector, in fetch order.
    pub async fn collect_all(mut self) -> Vec<RawRecord> {
        let mut records = Vec::new();
        while let Some(record) = self.next_record().await {
            records.push(record);
        }
        info!(count = records.len(), state = ?self.state, "Discovery finished");
        records
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::source::{SourceError, SourceResult};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Comics `1..=last` exist except `missing`; `broken` fails at transport level.
    struct FakeSource {
        last: i64,
        missing: i64,
        broken: Option<i64>,
        requested: Mutex<Vec<i64>>,
    }

    impl FakeSource {
        fn new(last: i64, missing: i64) -> Self {
            Self {
                last,
                missing,
                broken: None,
                requested: Mutex::new(Vec::new()),
            }
        }

        fn requested(&self) -> Vec<i64> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ComicSource for FakeSource {
        async fn fetch(&self, num: i64) -> SourceResult<FetchOutcome> {
            self.requested.lock().unwrap().push(num);
            if Some(num) == self.broken {
                return Err(SourceError::Transport {
                    num,
                    message: "connection reset".to_string(),
                });
            }
            if num > self.last || num == self.missing {
                return Ok(FetchOutcome::NotFound { status: 404 });
            }
            let body = json!({
                "num": num, "title": format!("Comic {}", num), "month": "1", "year": "2006",
                "transcript": "", "img": "https://example.com/a.png", "alt": "alt"
            });
            Ok(FetchOutcome::Found(RawRecord::from_json(num, body).unwrap()))
        }
    }

    fn nums(records: &[RawRecord]) -> Vec<i64> {
        records.iter().map(RawRecord::num).collect()
    }

    #[test]
    fn test_next_id_steps_over_skip() {
        assert_eq!(next_id(402, 404), 403);
        assert_eq!(next_id(403, 404), 405);
        assert_eq!(next_id(405, 404), 406);
    }

    #[tokio::test]
    async fn test_stops_at_first_not_found() {
        let source = FakeSource::new(3, 404);
        let records = Discovery::new(&source, 1, 404).collect_all().await;

        assert_eq!(nums(&records), vec![1, 2, 3]);
        assert_eq!(source.requested(), vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_never_requests_skip_id() {
        let source = FakeSource::new(6, 3);
        let records = Discovery::new(&source, 1, 3).collect_all().await;

        assert_eq!(nums(&records), vec![1, 2, 4, 5, 6]);
        assert!(!source.requested().contains(&3));
    }

    #[tokio::test]
    async fn test_cursor_after_comic_before_gap() {
        let source = FakeSource::new(410, 404);
        let mut discovery = Discovery::new(&source, 402, 404);

        assert_eq!(discovery.next_record().await.unwrap().num(), 402);
        assert_eq!(discovery.cursor(), Some(403));
        assert_eq!(discovery.next_record().await.unwrap().num(), 403);
        assert_eq!(discovery.cursor(), Some(405));
        assert_eq!(
            discovery.state(),
            &DiscoveryState::Found { num: 403, next: 405 }
        );
    }

    #[tokio::test]
    async fn test_start_on_skip_id_moves_past_it() {
        let source = FakeSource::new(406, 404);
        let records = Discovery::new(&source, 404, 404).collect_all().await;

        assert_eq!(nums(&records), vec![405, 406]);
        assert!(!source.requested().contains(&404));
    }

    #[tokio::test]
    async fn test_transport_failure_keeps_collected_records() {
        let mut source = FakeSource::new(10, 404);
        source.broken = Some(3);

        let mut discovery = Discovery::new(&source, 1, 404);
        let mut records = Vec::new();
        while let Some(record) = discovery.next_record().await {
            records.push(record);
        }

        assert_eq!(nums(&records), vec![1, 2]);
        assert!(matches!(discovery.state(), DiscoveryState::Failed { cursor: 3, .. }));
        assert!(discovery.is_finished());
        assert_eq!(discovery.found(), 2);
    }

    #[tokio::test]
    async fn test_finished_discovery_does_not_fetch_again() {
        let source = FakeSource::new(0, 404);
        let mut discovery = Discovery::new(&source, 1, 404);

        assert!(discovery.next_record().await.is_none());
        assert!(discovery.next_record().await.is_none());
        assert_eq!(source.requested(), vec![1]);
        assert_eq!(
            discovery.state(),
            &DiscoveryState::Exhausted { cursor: 1, status: 404 }
        );
    }
}
