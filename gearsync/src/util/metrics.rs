use std::collections::HashMap;
use std::sync::Arc;

use actix_web::{HttpRequest, HttpResponse, Responder};
use prometheus::{Encoder, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder};
use tracing::error;

use gearsync_lib::ConnectionState;

use crate::util::bot_context::BotContext;

const SHARD_STATES: [ConnectionState; 6] = [
    ConnectionState::Disconnected,
    ConnectionState::Connecting,
    ConnectionState::Identifying,
    ConnectionState::Ready,
    ConnectionState::Resuming,
    ConnectionState::Reconnecting,
];

pub struct Metrics {
    pub registry: Registry,

    pub gateway_events: IntCounterVec,
    pub shard_states: IntGaugeVec,
    pub shard_latency: IntGaugeVec,

    pub guilds: IntGaugeVec,

    pub members: IntGauge,
    pub users: IntGauge,
    pub messages: IntGauge,

    pub status: IntGaugeVec,
}

impl Metrics {
    pub fn new() -> Self {
        let mut labels = HashMap::new();
        labels.insert("service".to_string(), "gearsync".to_string());
        let registry = Registry::new_custom(Some("gearsync".to_string()), Some(labels)).unwrap();

        let gateway_events = IntCounterVec::new(
            Opts::new("gateway_events", "Received gateway events"),
            &["shard", "event"],
        )
        .unwrap();
        registry.register(Box::new(gateway_events.clone())).unwrap();

        let shard_states =
            IntGaugeVec::new(Opts::new("shard_states", "States of the shards"), &["shard", "state"]).unwrap();
        registry.register(Box::new(shard_states.clone())).unwrap();

        let shard_latency = IntGaugeVec::new(
            Opts::new("shard_latency_ms", "Time between the last heartbeat and its ack"),
            &["shard"],
        )
        .unwrap();
        registry.register(Box::new(shard_latency.clone())).unwrap();

        let guilds = IntGaugeVec::new(
            Opts::new("guilds", "Cached guilds per shard and cache state"),
            &["shard", "state"],
        )
        .unwrap();
        registry.register(Box::new(guilds.clone())).unwrap();

        let members = IntGauge::new("members", "Total cached members").unwrap();
        registry.register(Box::new(members.clone())).unwrap();

        let users = IntGauge::new("users", "Total cached users").unwrap();
        registry.register(Box::new(users.clone())).unwrap();

        let messages = IntGauge::new("messages", "Total cached messages").unwrap();
        registry.register(Box::new(messages.clone())).unwrap();

        let status = IntGaugeVec::new(Opts::new("status", "Service status"), &["status"]).unwrap();
        registry.register(Box::new(status.clone())).unwrap();

        Metrics {
            registry,
            gateway_events,
            shard_states,
            shard_latency,
            guilds,
            members,
            users,
            messages,
            status,
        }
    }

    pub fn set_shard_state(&self, shard_id: u64, state: ConnectionState) {
        let shard = shard_id.to_string();
        for known in SHARD_STATES {
            let value = if known == state { 1 } else { 0 };
            self.shard_states.with_label_values(&[&shard, known.name()]).set(value);
        }
    }

    /// Cache sizes are read on scrape instead of tracked per event.
    pub fn recalculate_cache(&self, context: &BotContext) {
        let mut members = 0;
        let mut users = 0;
        let mut messages = 0;
        for (shard_id, cache) in context.cluster.caches() {
            let stats = cache.stats();
            let shard = shard_id.to_string();
            self.guilds.with_label_values(&[&shard, "cached"]).set(stats.guilds as i64);
            self.guilds
                .with_label_values(&[&shard, "unavailable"])
                .set(stats.unavailable_guilds as i64);
            members += stats.members;
            users += stats.users;
            messages += stats.messages;
        }
        self.members.set(members as i64);
        self.users.set(users as i64);
        self.messages.set(messages as i64);
    }
}

pub async fn serve_metrics(request: HttpRequest) -> impl Responder {
    let Some(context) = request.app_data::<Arc<BotContext>>() else {
        return HttpResponse::InternalServerError().finish();
    };
    context.metrics.recalculate_cache(context);

    let mut buffer = vec![];
    let encoder = TextEncoder::new();
    let metric_families = context.metrics.registry.gather();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!("Failed to encode metrics: {}", e);
        return HttpResponse::InternalServerError().finish();
    }

    HttpResponse::Ok().body(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_current_state_is_set() {
        let metrics = Metrics::new();
        metrics.set_shard_state(3, ConnectionState::Identifying);
        metrics.set_shard_state(3, ConnectionState::Ready);

        assert_eq!(metrics.shard_states.with_label_values(&["3", "ready"]).get(), 1);
        assert_eq!(metrics.shard_states.with_label_values(&["3", "identifying"]).get(), 0);
    }
}
