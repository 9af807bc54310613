pub use cache::Cache;
pub use events::{EventHandler, NoopHandler};
pub use gateway::{Cluster, ClusterBuilder, ConnectionState, ShardInfo};
pub use util::error::{DispatchError, GatewayError};
pub use util::GatewayResult;

pub mod cache;
pub mod events;
pub mod gateway;
pub mod util;
