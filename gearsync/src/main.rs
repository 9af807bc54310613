use std::env;
use std::error::Error;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use actix_web::{middleware, rt, web, App, HttpServer};
use git_version::git_version;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use twilight_model::gateway::Intents;

use gearsync_lib::ClusterBuilder;

use crate::events::GatewayMetrics;
use crate::util::{serve_metrics, BotContext, BotStatus, Metrics};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const GIT_VERSION: &str = git_version!(fallback = "unknown");

mod events;
pub mod util;

fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    info!("gearsync v{} ({}) initializing!", VERSION, GIT_VERSION);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("GearPool")
        .build()?;
    let result = runtime.block_on(async_main());

    info!("Main loop exited, giving the last tasks 5 seconds to finish cleaning up");
    runtime.shutdown_timeout(Duration::from_secs(5));
    info!("Shutdown complete!");

    result
}

async fn async_main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let token = env::var("BOT_TOKEN").map_err(|_| "BOT_TOKEN is not set")?;
    let total_shards = env::var("SHARDS").ok().map(|shards| shards.parse::<u64>()).transpose()?;
    let gateway_url = env::var("GATEWAY_URL").ok();
    let metrics_addr = env::var("METRICS_ADDR").unwrap_or_else(|_| "127.0.0.1:9091".to_string());

    let intents = Intents::GUILDS
        | Intents::GUILD_MEMBERS
        | Intents::GUILD_MODERATION
        | Intents::GUILD_EMOJIS_AND_STICKERS
        | Intents::GUILD_VOICE_STATES
        | Intents::GUILD_MESSAGES
        | Intents::GUILD_MESSAGE_REACTIONS;

    let metrics = Arc::new(Metrics::new());
    let mut builder =
        ClusterBuilder::new(token, intents).event_handler(Arc::new(GatewayMetrics::new(metrics.clone())));
    if let Some(total) = total_shards {
        builder = builder.shard_scheme(0..total, total);
    }
    if let Some(url) = gateway_url {
        builder = builder.gateway_url(url);
    }
    let cluster = builder.build().await?;

    let context = Arc::new(BotContext::new(cluster, metrics));

    let c = context.clone();
    // metrics get served from their own thread
    thread::spawn(move || {
        let c2 = c.clone();
        let sys = rt::System::new();

        let srv = HttpServer::new(move || {
            App::new()
                .app_data(c.clone())
                .wrap(middleware::Logger::default())
                .route("/metrics", web::get().to(serve_metrics))
        })
        .bind(metrics_addr)?
        .workers(1)
        .run();

        let res = sys.block_on(srv);

        // actix installs its own signal handlers, take the shards down along with it
        c2.shutdown();

        res
    });

    let c = context.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received ctrl-c, shutting down"),
            Err(e) => error!("Failed to listen for ctrl-c, shutting down: {}", e),
        }
        c.shutdown();
    });

    info!(
        "Starting shards {:?} out of {}",
        context.cluster.shard_ids(),
        context.cluster.total_shards()
    );
    context.cluster.up();
    context.set_status(BotStatus::Running);

    let mut failure = None;
    for (shard_id, result) in context.cluster.join().await {
        if let Err(e) = result {
            error!("Shard {} exited with an error: {}", shard_id, e);
            failure.get_or_insert(e);
        }
    }
    context.shutdown();

    match failure {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}
