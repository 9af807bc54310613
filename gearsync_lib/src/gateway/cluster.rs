use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};
use twilight_http::Client;
use twilight_model::gateway::Intents;

use crate::cache::{Cache, DEFAULT_MESSAGE_CACHE_SIZE};
use crate::events::{EventEmitter, EventHandler, NoopHandler, ShardContext};
use crate::gateway::payload::IdentifyProperties;
use crate::gateway::shard::{Shard, ShardConfig, ShardInfo, HELLO_TIMEOUT};
use crate::util::error::GatewayError;
use crate::util::markers::GuildId;
use crate::util::{shard_for_guild, GatewayResult};

const IDENTIFY_DELAY: Duration = Duration::from_secs(5);

pub struct ClusterBuilder {
    token: String,
    intents: Intents,
    handler: Arc<dyn EventHandler>,
    shards: Option<(Range<u64>, u64)>,
    gateway_url: Option<String>,
    backoff_base_ms: u64,
    backoff_max_ms: u64,
    max_identify_failures: u32,
    message_cache_size: usize,
    identify_delay: Duration,
    hello_timeout: Duration,
    properties: IdentifyProperties,
}

impl ClusterBuilder {
    pub fn new(token: impl Into<String>, intents: Intents) -> Self {
        ClusterBuilder {
            token: token.into(),
            intents,
            handler: Arc::new(NoopHandler),
            shards: None,
            gateway_url: None,
            backoff_base_ms: 1_000,
            backoff_max_ms: 60_000,
            max_identify_failures: 5,
            message_cache_size: DEFAULT_MESSAGE_CACHE_SIZE,
            identify_delay: IDENTIFY_DELAY,
            hello_timeout: HELLO_TIMEOUT,
            properties: IdentifyProperties::default(),
        }
    }

    pub fn event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.handler = handler;
        self
    }

    /// Only run `shards` out of `total`. Without this the cluster runs every shard discord
    /// recommends.
    pub fn shard_scheme(mut self, shards: Range<u64>, total: u64) -> Self {
        self.shards = Some((shards, total));
        self
    }

    /// Connect here instead of asking the api for the gateway url.
    pub fn gateway_url(mut self, url: impl Into<String>) -> Self {
        self.gateway_url = Some(url.into());
        self
    }

    pub fn backoff(mut self, base_ms: u64, max_ms: u64) -> Self {
        self.backoff_base_ms = base_ms;
        self.backoff_max_ms = max_ms;
        self
    }

    pub fn max_identify_failures(mut self, failures: u32) -> Self {
        self.max_identify_failures = failures;
        self
    }

    pub fn message_cache_size(mut self, size: usize) -> Self {
        self.message_cache_size = size;
        self
    }

    pub fn identify_delay(mut self, delay: Duration) -> Self {
        self.identify_delay = delay;
        self
    }

    /// Drop a connection that hasn't sent HELLO after this long.
    pub fn hello_timeout(mut self, timeout: Duration) -> Self {
        self.hello_timeout = timeout;
        self
    }

    pub fn properties(mut self, properties: IdentifyProperties) -> Self {
        self.properties = properties;
        self
    }

    pub async fn build(self) -> GatewayResult<Cluster> {
        let (gateway_url, recommended) = match self.gateway_url.clone() {
            Some(url) => (url, None),
            None => {
                let client = Client::new(self.token.clone());
                let info = client.gateway().authed().await?.model().await?;
                info!(
                    "Gateway at {} recommends {} shards, {} identifies left",
                    info.url, info.shards, info.session_start_limit.remaining
                );
                (info.url, Some(u64::from(info.shards)))
            }
        };

        let (range, total) = match self.shards.clone() {
            Some(scheme) => scheme,
            None => {
                let total = recommended.unwrap_or(1).max(1);
                (0..total, total)
            }
        };
        if range.is_empty() || range.end > total {
            return Err(GatewayError::Protocol(format!(
                "shard range {:?} doesn't fit in {} total shards",
                range, total
            )));
        }

        let shards = range
            .map(|shard_id| ClusterShard {
                id: shard_id,
                cache: Arc::new(Cache::new(self.message_cache_size)),
                info: Arc::new(RwLock::new(ShardInfo::default())),
            })
            .collect();
        let (shutdown, _) = watch::channel(false);

        Ok(Cluster {
            config: self,
            gateway_url,
            total_shards: total,
            shards,
            shutdown,
            tasks: Mutex::new(Vec::new()),
        })
    }
}

struct ClusterShard {
    id: u64,
    cache: Arc<Cache>,
    info: Arc<RwLock<ShardInfo>>,
}

/// A set of shards sharing one handler, each with its own cache.
pub struct Cluster {
    config: ClusterBuilder,
    gateway_url: String,
    total_shards: u64,
    shards: Vec<ClusterShard>,
    shutdown: watch::Sender<bool>,
    tasks: Mutex<Vec<(u64, JoinHandle<GatewayResult<()>>)>>,
}

impl Cluster {
    /// Start every shard that isn't running yet, spacing their first connects out.
    pub fn up(&self) {
        let mut tasks = self.tasks.lock();
        if !tasks.is_empty() {
            return;
        }
        info!("Starting {} shards out of {}", self.shards.len(), self.total_shards);
        let events = EventEmitter::new(self.config.handler.clone());
        for (index, cluster_shard) in self.shards.iter().enumerate() {
            let config = ShardConfig {
                shard_id: cluster_shard.id,
                total_shards: self.total_shards,
                token: self.config.token.clone(),
                intents: self.config.intents,
                gateway_url: self.gateway_url.clone(),
                properties: self.config.properties.clone(),
                backoff_base_ms: self.config.backoff_base_ms,
                backoff_max_ms: self.config.backoff_max_ms,
                max_identify_failures: self.config.max_identify_failures,
                hello_timeout: self.config.hello_timeout,
                start_delay: self.config.identify_delay * index as u32,
            };
            let context = ShardContext::new(cluster_shard.id, cluster_shard.cache.clone(), events.clone());
            let shard = Shard::new(config, context, cluster_shard.info.clone(), self.shutdown.subscribe());
            tasks.push((cluster_shard.id, tokio::spawn(shard.run())));
        }
    }

    /// Ask every shard to close its connection. Use [`Cluster::join`] to wait for them.
    pub fn down(&self) {
        info!("Shutting down all shards");
        self.shutdown.send_replace(true);
    }

    /// Wait for all shards to stop, returning how each of them ended.
    pub async fn join(&self) -> Vec<(u64, GatewayResult<()>)> {
        let tasks = std::mem::take(&mut *self.tasks.lock());
        let mut results = Vec::with_capacity(tasks.len());
        for (shard_id, task) in tasks {
            let result = match task.await {
                Ok(result) => result,
                Err(e) => {
                    error!("Shard {} task failed: {}", shard_id, e);
                    Err(GatewayError::Protocol(format!("shard task failed: {}", e)))
                }
            };
            results.push((shard_id, result));
        }
        results
    }

    pub fn total_shards(&self) -> u64 {
        self.total_shards
    }

    pub fn shard_ids(&self) -> Vec<u64> {
        self.shards.iter().map(|shard| shard.id).collect()
    }

    pub fn gateway_url(&self) -> &str {
        &self.gateway_url
    }

    pub fn cache(&self, shard_id: u64) -> Option<Arc<Cache>> {
        self.shards
            .iter()
            .find(|shard| shard.id == shard_id)
            .map(|shard| shard.cache.clone())
    }

    /// The cache of whichever shard the guild lives on, if that shard is part of this cluster.
    pub fn cache_for_guild(&self, guild_id: GuildId) -> Option<Arc<Cache>> {
        self.cache(shard_for_guild(guild_id, self.total_shards))
    }

    pub fn caches(&self) -> Vec<(u64, Arc<Cache>)> {
        self.shards.iter().map(|shard| (shard.id, shard.cache.clone())).collect()
    }

    pub fn info(&self) -> Vec<(u64, ShardInfo)> {
        self.shards
            .iter()
            .map(|shard| (shard.id, shard.info.read().clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn offline_cluster(shards: Range<u64>, total: u64) -> Cluster {
        ClusterBuilder::new("token", Intents::GUILDS)
            .gateway_url("ws://127.0.0.1:1")
            .shard_scheme(shards, total)
            .build()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn caches_are_per_shard() {
        let cluster = offline_cluster(2..4, 4).await;
        assert_eq!(cluster.shard_ids(), vec![2, 3]);
        assert_eq!(cluster.total_shards(), 4);
        assert!(cluster.cache(0).is_none());

        let two = cluster.cache(2).unwrap();
        let three = cluster.cache(3).unwrap();
        assert!(!Arc::ptr_eq(&two, &three));

        // 3 << 22 lives on shard 3
        let guild_id = GuildId::new(3 << 22);
        assert!(Arc::ptr_eq(&cluster.cache_for_guild(guild_id).unwrap(), &three));
        assert!(cluster.cache_for_guild(GuildId::new(1 << 22)).is_none());
    }

    #[tokio::test]
    async fn rejects_ranges_outside_the_total() {
        let result = ClusterBuilder::new("token", Intents::GUILDS)
            .gateway_url("ws://127.0.0.1:1")
            .shard_scheme(0..5, 4)
            .build()
            .await;
        assert!(matches!(result, Err(GatewayError::Protocol(_))));
    }

    #[tokio::test]
    async fn down_before_up_stops_immediately() {
        let cluster = offline_cluster(0..2, 2).await;
        cluster.down();
        cluster.up();
        let results = tokio::time::timeout(Duration::from_secs(5), cluster.join()).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|(_, result)| result.is_ok()));
        assert!(cluster
            .info()
            .iter()
            .all(|(_, info)| info.state == crate::gateway::shard::ConnectionState::Disconnected));
    }
}
