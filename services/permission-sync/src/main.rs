//! 权限同步对账进程
//!
//! 启动时从 `casbin_rule` 表加载策略，执行一次全量同步（可选剪枝）并重建用户角色镜像表；
//! 配置了 `sync.interval_secs` 时按间隔重复执行，直到收到关闭信号。

use std::sync::Arc;
use std::time::Duration;

use permission_sync::application::{SyncOptions, describe_metrics};
use permission_sync::infrastructure::persistence::{PostgresCasbinRuleRepository, postgres_stores};
use permission_sync::infrastructure::policy::CasbinPolicyStore;
use permission_sync::{EngineOptions, PermissionSyncEngine, SyncError, SyncResult};
use rbac_adapter_postgres::{PostgresConfig, check_connection, create_pool};
use rbac_common::{RetryConfig, with_retry};
use rbac_config::{AppConfig, SyncConfig};
use rbac_telemetry::{init_for_env, init_metrics};
use secrecy::ExposeSecret;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let config_dir = std::env::var("APP_CONFIG_DIR").unwrap_or_else(|_| "config".to_string());
    let config = AppConfig::load(&config_dir)?;

    init_for_env(config.is_production(), &config.telemetry.log_level);
    let _metrics = init_metrics()?;
    describe_metrics();

    info!(
        app_name = %config.app_name,
        app_env = %config.app_env,
        prune = config.sync.prune,
        interval_secs = ?config.sync.interval_secs,
        "Starting permission sync"
    );

    let pg_config = PostgresConfig::new(config.database.url.expose_secret())
        .with_max_connections(config.database.max_connections);
    let pool = with_retry(&RetryConfig::default(), "PostgreSQL connection", || {
        let cfg = pg_config.clone();
        async move { create_pool(&cfg).await }
    })
    .await?;
    check_connection(&pool).await?;

    let rules = Arc::new(PostgresCasbinRuleRepository::new(pool.clone()));
    let policy = CasbinPolicyStore::with_repository(config.policy.model_path.as_deref(), rules).await?;

    let engine = PermissionSyncEngine::new(
        postgres_stores(&pool),
        Arc::new(policy),
        EngineOptions::from(&config.sync),
    );

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            shutdown_signal().await;
            shutdown.cancel();
        }
    });

    match config.sync.interval_secs {
        None => run_once(&engine, &config.sync, &shutdown).await?,
        Some(secs) => {
            let interval = Duration::from_secs(secs.max(1));
            loop {
                if let Err(e) = run_once(&engine, &config.sync, &shutdown).await {
                    error!(error = %e, kind = %e.kind(), "Resync run failed");
                }

                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = shutdown.cancelled() => break,
                }
            }
        }
    }

    pool.close().await;
    info!("Permission sync stopped");
    Ok(())
}

/// 一次对账: 全量同步 + 镜像重建，整体受 `sync.timeout_secs` 限制
async fn run_once(
    engine: &PermissionSyncEngine,
    sync: &SyncConfig,
    shutdown: &CancellationToken,
) -> SyncResult<()> {
    let cancel = shutdown.child_token();
    let options = SyncOptions {
        prune: sync.prune,
        cancel: cancel.clone(),
    };

    let run = async {
        let report = engine.resync(options).await?;
        if report.failures > 0 {
            warn!(failures = report.failures, "Resync finished with policy write failures");
        }
        if sync.rebuild_user_roles {
            engine.rebuild_user_role_mirror().await?;
        }
        report.into_result().map(|_| ())
    };

    match tokio::time::timeout(Duration::from_secs(sync.timeout_secs), run).await {
        Ok(result) => result,
        Err(_) => {
            cancel.cancel();
            warn!(timeout_secs = sync.timeout_secs, "Resync timed out");
            Err(SyncError::Cancelled)
        }
    }
}

/// 等待 Ctrl+C 或 SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
