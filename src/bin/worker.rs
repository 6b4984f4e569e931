use std::time::Duration;

use clap::{Arg, ArgAction, Command, value_parser};
use supervision_backend::{
    cache::{self, MONITORING_STATS_KEY},
    config::{Config, MonitoringConfig},
    db::{self, DbPool},
    error::AppResult,
    init_tracing,
    services::{MonitoringService, NotificationsService, context::RequestContext},
};

async fn run_scan(pool: &DbPool, redis: &redis::Client, settings: &MonitoringConfig) -> AppResult<()> {
    let settings = settings.clone();
    let summary = db::run(pool, move |conn| {
        MonitoringService::scan(conn, &RequestContext::system(), &settings)
    })
    .await?;

    if summary.created + summary.refreshed + summary.resolved + summary.marked_overdue > 0 {
        if let Err(e) = cache::delete_cache(redis, MONITORING_STATS_KEY).await {
            tracing::warn!(error = %e, "Failed to invalidate monitoring stats cache");
        }
    }
    Ok(())
}

/// 发送到期的预约通知并清理过期通知
async fn run_notifications(pool: &DbPool) -> AppResult<()> {
    let (dispatched, expired) = db::run(pool, |conn| {
        let ctx = RequestContext::system();
        let dispatched = NotificationsService::dispatch_due(conn, &ctx)?;
        let expired = NotificationsService::cleanup_expired(conn, &ctx)?;
        Ok((dispatched, expired))
    })
    .await?;
    if dispatched.sent + dispatched.failed > 0 {
        tracing::info!(sent = dispatched.sent, failed = dispatched.failed, "Scheduled notifications dispatched");
    }
    tracing::debug!(expired, "Notification housekeeping finished");
    Ok(())
}

async fn tick(pool: &DbPool, redis: &redis::Client, settings: &MonitoringConfig) -> AppResult<()> {
    run_scan(pool, redis, settings).await?;
    run_notifications(pool).await
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = Command::new("monitor-worker")
        .about("Periodic supervision monitoring scan and notification dispatch")
        .arg(
            Arg::new("interval")
                .short('i')
                .long("interval")
                .value_name("SECONDS")
                .help("Seconds between scans, overrides MONITOR_INTERVAL_SECS")
                .value_parser(value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new("once")
                .long("once")
                .help("Run a single scan and exit")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let config = Config::from_env()?;
    init_tracing(&config);

    let settings = config.monitoring();
    let interval = matches
        .get_one::<u64>("interval")
        .copied()
        .unwrap_or(settings.interval_secs);

    let pool = db::create_pool(&config.database())?;
    let redis = redis::Client::open(config.redis_url.as_str())?;

    if matches.get_flag("once") {
        tick(&pool, &redis, &settings).await?;
        return Ok(());
    }

    tracing::info!(interval_secs = interval, "Monitoring worker started");
    let mut ticker = tokio::time::interval(Duration::from_secs(interval));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = tick(&pool, &redis, &settings).await {
                    tracing::error!(error = %e, "Monitoring cycle failed");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Monitoring worker shutting down");
                break;
            }
        }
    }
    Ok(())
}
