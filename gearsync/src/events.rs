use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use twilight_model::gateway::payload::incoming::Ready;

use gearsync_lib::cache::{Guild, User};
use gearsync_lib::gateway::GatewayPayload;
use gearsync_lib::util::markers::GuildId;
use gearsync_lib::{ConnectionState, EventHandler};

use crate::util::Metrics;

/// Feeds gateway activity into the prometheus registry.
pub struct GatewayMetrics {
    metrics: Arc<Metrics>,
}

impl GatewayMetrics {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        GatewayMetrics { metrics }
    }
}

impl EventHandler for GatewayMetrics {
    fn raw(&self, shard: u64, payload: &GatewayPayload) {
        if let Some(name) = payload.t.as_deref() {
            self.metrics
                .gateway_events
                .with_label_values(&[&shard.to_string(), name])
                .inc();
        }
    }

    fn shard_state(&self, shard: u64, state: ConnectionState) {
        self.metrics.set_shard_state(shard, state);
    }

    fn heartbeat_ack(&self, shard: u64, latency: Option<Duration>) {
        if let Some(latency) = latency {
            self.metrics
                .shard_latency
                .with_label_values(&[&shard.to_string()])
                .set(latency.as_millis() as i64);
        }
    }

    fn ready(&self, shard: u64, ready: &Ready) {
        info!(
            "Shard {} logged in as {} and is waiting for {} guilds",
            shard,
            ready.user.name,
            ready.guilds.len()
        );
    }

    fn guild_available(&self, shard: u64, guild: &Arc<Guild>, unavailable_since: DateTime<Utc>) {
        let outage = Utc::now().signed_duration_since(unavailable_since);
        info!(
            "Guild {} on shard {} is back after {}s",
            guild.id,
            shard,
            outage.num_seconds()
        );
    }

    fn guild_unavailable(&self, shard: u64, guild_id: GuildId) {
        warn!("Guild {} on shard {} became unavailable", guild_id, shard);
    }

    fn bot_update(&self, new: &Arc<User>, _old: Option<&Arc<User>>) {
        info!("Our user got updated, we are now {}", new.name);
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn dispatches_are_counted_per_shard_and_event() {
        let metrics = Arc::new(Metrics::new());
        let handler = GatewayMetrics::new(metrics.clone());

        let dispatch = GatewayPayload {
            op: 0,
            d: Some(json!({})),
            s: Some(1),
            t: Some("GUILD_CREATE".to_string()),
        };
        let heartbeat = GatewayPayload {
            op: 11,
            d: None,
            s: None,
            t: None,
        };
        handler.raw(2, &dispatch);
        handler.raw(2, &dispatch);
        handler.raw(2, &heartbeat);

        let counted = metrics.gateway_events.with_label_values(&["2", "GUILD_CREATE"]).get();
        assert_eq!(counted, 2);
    }
}
