pub use cluster::{Cluster, ClusterBuilder};
pub use payload::{GatewayPayload, IdentifyProperties, OpCode};
pub use shard::{ConnectionState, Shard, ShardConfig, ShardInfo};

pub mod backoff;
mod cluster;
pub mod connection;
pub mod heartbeat;
pub mod payload;
pub mod reconnect;
pub mod router;
pub mod session;
pub mod shard;
