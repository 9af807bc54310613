use std::time::{Duration, Instant};

use rand::Rng;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Beat {
    /// Send a heartbeat now.
    Send,
    /// The previous beat was never acknowledged, the connection is dead.
    Timeout,
}

/// Heartbeat bookkeeping for one connection. The timer itself lives in the shard loop, this only
/// decides what a tick means.
#[derive(Debug)]
pub struct Heartbeater {
    interval: Duration,
    awaiting_ack: bool,
    last_sent: Option<Instant>,
    latency: Option<Duration>,
}

impl Heartbeater {
    pub fn new(interval_ms: u64) -> Self {
        Heartbeater {
            interval: Duration::from_millis(interval_ms),
            awaiting_ack: false,
            last_sent: None,
            latency: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Delay before the first beat, a random fraction of the interval so shards don't all beat
    /// at the same moment.
    pub fn first_delay(&self) -> Duration {
        self.interval.mul_f64(rand::thread_rng().gen_range(0.0..1.0))
    }

    pub fn tick(&mut self) -> Beat {
        if self.awaiting_ack {
            return Beat::Timeout;
        }
        self.awaiting_ack = true;
        self.last_sent = Some(Instant::now());
        Beat::Send
    }

    pub fn ack(&mut self) {
        self.awaiting_ack = false;
        if let Some(sent) = self.last_sent.take() {
            let latency = sent.elapsed();
            trace!("Heartbeat acknowledged after {:?}", latency);
            self.latency = Some(latency);
        }
    }

    pub fn awaiting_ack(&self) -> bool {
        self.awaiting_ack
    }

    pub fn latency(&self) -> Option<Duration> {
        self.latency
    }
}
