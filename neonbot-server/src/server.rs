use anyhow::Context;
use tracing::{error, info, warn};

use neonbot_core::keepalive::start_keepalive_server;
use neonbot_core::services::DiscordEventService;
use neonbot_core::tasks::status_rotation::spawn_status_rotation;

use crate::Args;
use crate::context::ServerContext;

pub async fn run_server(args: Args) -> anyhow::Result<()> {
    let mut ctx = ServerContext::new(&args)
        .await
        .context("failed to build server context")?;

    // 1) Subscribe handlers before any gateway event can be published.
    let dispatcher = DiscordEventService::new(
        ctx.event_bus.clone(),
        ctx.handlers.clone(),
        ctx.event_context.clone(),
    )
    .start()
    .await;

    // 2) Keepalive endpoint.
    let keepalive = if args.no_keepalive {
        None
    } else {
        Some(start_keepalive_server(args.keepalive_port, ctx.sessions.clone()))
    };

    // 3) Gateway.
    ctx.platform
        .connect()
        .await
        .context("failed to connect to Discord")?;

    // 4) Presence rotation.
    let rotation = if args.no_status_rotation {
        None
    } else {
        Some(spawn_status_rotation(
            ctx.platform.shard_senders(),
            ctx.sessions.clone(),
            Some(ctx.platform.cache()),
            ctx.event_bus.clone(),
        ))
    };

    // 5) Ctrl-C => shutdown.
    let eb_for_ctrlc = ctx.event_bus.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Error waiting for ctrl_c: {:?}", e);
            return;
        }
        info!("Ctrl-C detected; shutting down...");
        eb_for_ctrlc.shutdown().await;
    });

    info!("NeonBot is running. Press Ctrl-C to stop.");
    ctx.event_bus.wait_for_shutdown().await;

    shutdown(&mut ctx, dispatcher, keepalive, rotation).await;
    info!("Server shutdown complete.");
    Ok(())
}

async fn shutdown(
    ctx: &mut ServerContext,
    dispatcher: tokio::task::JoinHandle<()>,
    keepalive: Option<neonbot_core::keepalive::KeepaliveServer>,
    rotation: Option<tokio::task::JoinHandle<()>>,
) {
    // Sessions first, so their cancellation notices still reach Discord.
    ctx.sessions.shutdown().await;

    ctx.platform.disconnect().await;

    if let Some(server) = keepalive {
        server.stop().await;
    }
    if let Some(task) = rotation {
        if let Err(e) = task.await {
            warn!("presence rotation ended abnormally: {e}");
        }
    }
    if let Err(e) = dispatcher.await {
        warn!("event dispatcher ended abnormally: {e}");
    }
}
