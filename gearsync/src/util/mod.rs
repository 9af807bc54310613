pub use bot_context::{BotContext, BotStatus};
pub use metrics::{serve_metrics, Metrics};

pub mod bot_context;
pub mod metrics;
