//! Bar feed - the producer end of a session
//!
//! Each period the feed serializes the [`BarSet`], caches it in the store
//! under a time-derived key with a TTL (late joiners and debugging tools can
//! fetch the latest period without replaying a queue), and publishes it on
//! the channel.

use crate::error::RunnerResult;
use log::debug;
use std::sync::Arc;
use std::time::Duration;
use stopline_broker::Publisher;
use stopline_core::{BarSet, Timestamp};
use stopline_ports::QueueStore;

/// How long a cached bar set stays fetchable
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(120);

/// Publishes one serialized bar set per period
pub struct BarFeed<S> {
    store: Arc<S>,
    publisher: Publisher<S>,
    channel: String,
    cache_ttl: Duration,
}

impl<S: QueueStore> BarFeed<S> {
    pub fn new(store: Arc<S>, publisher: Publisher<S>, channel: impl Into<String>) -> Self {
        Self {
            store,
            publisher,
            channel: channel.into(),
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }

    pub fn with_cache_ttl(mut self, cache_ttl: Duration) -> Self {
        self.cache_ttl = cache_ttl;
        self
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Cache key for the period ending at `time`
    pub fn cache_key(&self, time: Timestamp) -> String {
        format!("bars/{}/{}", self.channel, time.timestamp())
    }

    /// Cache and publish one period's bars, returning the sequence number
    pub async fn publish(&self, time: Timestamp, bars: &BarSet) -> RunnerResult<u64> {
        let payload = serde_json::to_string(bars)?;
        self.store
            .put_with_expiry(&self.cache_key(time), &payload, self.cache_ttl)
            .await
            .map_err(stopline_broker::BrokerError::from)?;

        let sequence = self.publisher.publish(&self.channel, &payload).await?;
        debug!(
            "published {} bars for {} as seq {sequence}",
            bars.len(),
            time
        );
        Ok(sequence)
    }

    /// Publish a termination token, ending every subscription on the channel
    pub async fn publish_termination(&self) -> RunnerResult<u64> {
        Ok(self.publisher.publish(&self.channel, "EXIT").await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use stopline_broker::MemoryQueueStore;
    use stopline_core::Bar;

    #[tokio::test]
    async fn test_publish_caches_payload() {
        let store = Arc::new(MemoryQueueStore::new());
        let feed = BarFeed::new(Arc::clone(&store), Publisher::new(Arc::clone(&store)), "1m");

        let time = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        let mut bars = BarSet::new();
        bars.insert(
            "000001",
            Bar::new(time, dec!(10), dec!(11), dec!(12), dec!(9), dec!(100)),
        );

        let sequence = feed.publish(time, &bars).await.unwrap();
        assert_eq!(sequence, 1);

        let cached = store.get(&feed.cache_key(time)).await.unwrap().unwrap();
        let back: BarSet = serde_json::from_str(&cached).unwrap();
        assert_eq!(back, bars);
    }
}
