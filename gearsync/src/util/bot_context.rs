use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use gearsync_lib::Cluster;

use crate::util::metrics::Metrics;

#[derive(Clone, Copy, Eq, PartialEq)]
pub enum BotStatus {
    Starting,
    Running,
    Terminating,
}

impl BotStatus {
    pub fn name(&self) -> &str {
        match self {
            BotStatus::Starting => "STARTING",
            BotStatus::Running => "RUNNING",
            BotStatus::Terminating => "TERMINATING",
        }
    }
}

pub struct BotContext {
    pub cluster: Cluster,
    pub metrics: Arc<Metrics>,
    status: RwLock<BotStatus>,
}

impl BotContext {
    pub fn new(cluster: Cluster, metrics: Arc<Metrics>) -> Self {
        metrics
            .status
            .with_label_values(&[BotStatus::Starting.name()])
            .set(1);
        BotContext {
            cluster,
            metrics,
            status: RwLock::new(BotStatus::Starting),
        }
    }

    pub fn set_status(&self, new_status: BotStatus) {
        let mut status = self.status.write();

        info!("Status change: {} => {}", status.name(), new_status.name());

        self.metrics.status.reset();
        self.metrics.status.with_label_values(&[new_status.name()]).set(1);

        *status = new_status;
    }

    pub fn is_status(&self, status: BotStatus) -> bool {
        *self.status.read() == status
    }

    pub fn shutdown(&self) {
        if self.is_status(BotStatus::Terminating) {
            return;
        }
        self.set_status(BotStatus::Terminating);
        self.cluster.down();
    }
}
