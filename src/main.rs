use anyhow::Result;
use cloudboard::backend_repo::{BackendRepo, ResourceContext};
use cloudboard::dashboard::Dashboard;
use cloudboard::registry::Registry;
use cloudboard::session::{Session, StaticToken, UserInfo};
use cloudboard::worker::{Poller, PollerConfig, PollerDeps, WidgetStore};
use cloudboard::*;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use tokio::time::Duration;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;
    tracing::info!(
        name = version::NAME,
        version = version::VERSION,
        backend = %app_config.backend.base_url,
        "starting"
    );

    let repo = Arc::new(BackendRepo::new(
        &app_config.backend.base_url,
        Duration::from_millis(app_config.backend.request_timeout_ms),
    )?);

    let token = StaticToken::from_env(&app_config.auth.token_env);
    let has_token = token.is_present();
    let session = Arc::new(Session::new(Arc::new(token)));
    if has_token {
        let user = UserInfo {
            uid: "local".into(),
            display_name: None,
        };
        session.sign_in(&repo, user).await?;
    } else {
        tracing::warn!(
            token_env = %app_config.auth.token_env,
            "no identity token; dashboard stays signed out and nothing is fetched"
        );
    }

    let mut widgets = catalog::default_widgets();
    for id in catalog::apply_overrides(&mut widgets, &app_config.metric_policy) {
        tracing::warn!(widget = %id, "metric_policy override for unknown widget ignored");
    }
    let registry = Registry::new(widgets, catalog::default_groups())?;
    let store = Arc::new(WidgetStore::new(
        registry.widgets().iter().map(|w| w.id.as_str()),
        app_config.polling.broadcast_capacity,
    ));
    let dashboard = Arc::new(Dashboard::new(registry, store.clone(), session.clone()));

    let poller = Arc::new(Poller::new(
        PollerDeps {
            repo: repo.clone(),
            session: session.clone(),
            store,
            resources: ResourceContext::from(&app_config.resources),
        },
        PollerConfig {
            auto_refresh: app_config.polling.auto_refresh,
            refresh_interval_ms: app_config.polling.refresh_interval_ms,
        },
    ));
    for descriptor in dashboard.descriptors().await {
        poller.start(descriptor).await;
    }

    let app = routes::app(
        dashboard,
        poller.clone(),
        session,
        repo,
        Arc::new(AtomicUsize::new(0)),
    );
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = shutdown_signal() => {
            tracing::info!("Received shutdown signal");
        }
    }
    poller.stop_all().await;

    Ok(())
}
