// Per-widget fetch loops and the shared widget state store.
// Each running widget owns one task: interval ticks (auto-refresh), manual refresh requests and
// a stop signal. Responses are applied through the store's sequence guard so a slow, older
// request never overwrites a newer one.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock, broadcast, mpsc, oneshot};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Duration, interval};
use tracing::Instrument;

use crate::backend_repo::{BackendRepo, ResourceContext};
use crate::models::{WidgetData, WidgetState};
use crate::registry::WidgetDescriptor;
use crate::session::Session;

/// Pushed to /ws/dashboard whenever a widget's state changes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetUpdate {
    pub id: String,
    pub seq: u64,
    pub state: WidgetState,
}

/// Widget id -> fetch state, plus the update fan-out.
pub struct WidgetStore {
    states: RwLock<HashMap<String, WidgetState>>,
    updates: broadcast::Sender<WidgetUpdate>,
}

impl WidgetStore {
    pub fn new<'a>(ids: impl IntoIterator<Item = &'a str>, capacity: usize) -> Self {
        let (updates, _) = broadcast::channel(capacity.max(1));
        Self {
            states: RwLock::new(
                ids.into_iter()
                    .map(|id| (id.to_string(), WidgetState::default()))
                    .collect(),
            ),
            updates,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WidgetUpdate> {
        self.updates.subscribe()
    }

    fn publish(&self, id: &str, state: &WidgetState) {
        let update = WidgetUpdate {
            id: id.to_string(),
            seq: state.seq,
            state: state.clone(),
        };
        if self.updates.send(update).is_err() {
            tracing::trace!(widget = id, "no dashboard subscribers");
        }
    }

    /// Marks `id` loading and returns the request's sequence number.
    pub async fn begin(&self, id: &str) -> u64 {
        let mut states = self.states.write().await;
        let state = states.entry(id.to_string()).or_default();
        let seq = state.begin();
        self.publish(id, state);
        seq
    }

    /// Applies a response; returns false when `seq` was superseded.
    pub async fn complete(&self, id: &str, seq: u64, result: Result<WidgetData, String>) -> bool {
        let mut states = self.states.write().await;
        let state = states.entry(id.to_string()).or_default();
        if !state.complete(seq, result, now_ms()) {
            tracing::debug!(
                widget = id,
                seq,
                latest = state.seq,
                "discarding stale response"
            );
            return false;
        }
        self.publish(id, state);
        true
    }

    /// Invalidates in-flight requests for `id` and leaves it idle.
    pub async fn retire(&self, id: &str) {
        let mut states = self.states.write().await;
        if let Some(state) = states.get_mut(id) {
            state.retire();
            self.publish(id, state);
        }
    }

    /// Drops a response that may no longer be shown and clears the widget, unless `seq`
    /// was already superseded.
    pub async fn discard(&self, id: &str, seq: u64) -> bool {
        let mut states = self.states.write().await;
        match states.get_mut(id) {
            Some(state) if state.seq == seq => {
                state.clear();
                self.publish(id, state);
                true
            }
            _ => false,
        }
    }

    /// Clears the given widgets: no data, no error, in-flight requests invalidated.
    pub async fn clear<'a>(&self, ids: impl IntoIterator<Item = &'a str>) {
        let mut states = self.states.write().await;
        for id in ids {
            if let Some(state) = states.get_mut(id) {
                state.clear();
                self.publish(id, state);
            }
        }
    }

    pub async fn clear_all(&self) {
        let ids: Vec<String> = self.states.read().await.keys().cloned().collect();
        self.clear(ids.iter().map(String::as_str)).await;
    }

    pub async fn snapshot(&self, id: &str) -> Option<WidgetState> {
        self.states.read().await.get(id).cloned()
    }

    pub async fn snapshot_all(&self) -> HashMap<String, WidgetState> {
        self.states.read().await.clone()
    }
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, operation = "get_timestamp", "system time error");
            0
        })
}

/// Backend, session and store shared by every widget loop.
pub struct PollerDeps {
    pub repo: Arc<BackendRepo>,
    pub session: Arc<Session>,
    pub store: Arc<WidgetStore>,
    pub resources: ResourceContext,
}

#[derive(Debug, Clone, Copy)]
pub struct PollerConfig {
    pub auto_refresh: bool,
    pub refresh_interval_ms: u64,
}

struct WidgetTask {
    refresh_tx: mpsc::Sender<()>,
    stop_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

pub struct Poller {
    deps: Arc<PollerDeps>,
    config: PollerConfig,
    tasks: Mutex<HashMap<String, WidgetTask>>,
}

impl Poller {
    pub fn new(deps: PollerDeps, config: PollerConfig) -> Self {
        Self {
            deps: Arc::new(deps),
            config,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<WidgetStore> {
        &self.deps.store
    }

    /// Starts the loop for one widget. Returns false if it is already running.
    pub async fn start(&self, descriptor: WidgetDescriptor) -> bool {
        let mut tasks = self.tasks.lock().await;
        if tasks.contains_key(&descriptor.id) {
            return false;
        }
        let (refresh_tx, refresh_rx) = mpsc::channel(1);
        let (stop_tx, stop_rx) = oneshot::channel();
        let id = descriptor.id.clone();
        let span = tracing::span!(
            tracing::Level::DEBUG,
            "widget",
            id = %descriptor.id,
            provider = %descriptor.provider
        );
        let handle = tokio::spawn(
            run_widget_loop(
                self.deps.clone(),
                self.config,
                Arc::new(descriptor),
                refresh_rx,
                stop_rx,
            )
            .instrument(span),
        );
        tasks.insert(
            id,
            WidgetTask {
                refresh_tx,
                stop_tx,
                handle,
            },
        );
        true
    }

    /// Requests an immediate fetch. A refresh already pending absorbs this one.
    pub async fn refresh(&self, id: &str) -> bool {
        let tasks = self.tasks.lock().await;
        match tasks.get(id) {
            Some(task) => {
                if task.refresh_tx.try_send(()).is_err() {
                    tracing::debug!(widget = id, "refresh already pending");
                }
                true
            }
            None => false,
        }
    }

    pub async fn is_running(&self, id: &str) -> bool {
        self.tasks.lock().await.contains_key(id)
    }

    /// Stops one widget's loop and waits for it; late responses are discarded.
    pub async fn stop(&self, id: &str) -> bool {
        let task = self.tasks.lock().await.remove(id);
        match task {
            Some(task) => {
                shutdown(task).await;
                true
            }
            None => false,
        }
    }

    pub async fn stop_all(&self) {
        let drained: Vec<WidgetTask> = self.tasks.lock().await.drain().map(|(_, t)| t).collect();
        let n = drained.len();
        for task in drained {
            shutdown(task).await;
        }
        tracing::debug!(widgets = n, "all widget loops stopped");
    }
}

async fn shutdown(task: WidgetTask) {
    let _ = task.stop_tx.send(());
    if let Err(e) = task.handle.await {
        tracing::warn!(error = %e, "widget loop ended abnormally");
    }
}

async fn run_widget_loop(
    deps: Arc<PollerDeps>,
    config: PollerConfig,
    descriptor: Arc<WidgetDescriptor>,
    mut refresh_rx: mpsc::Receiver<()>,
    mut stop_rx: oneshot::Receiver<()>,
) {
    let mut tick = interval(Duration::from_millis(config.refresh_interval_ms));
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut in_flight: JoinSet<()> = JoinSet::new();

    // Without auto-refresh the widget still loads once on mount.
    if !config.auto_refresh {
        in_flight.spawn(run_fetch(deps.clone(), descriptor.clone()));
    }

    loop {
        tokio::select! {
            _ = &mut stop_rx => break,
            _ = tick.tick(), if config.auto_refresh => {
                in_flight.spawn(run_fetch(deps.clone(), descriptor.clone()));
            }
            Some(()) = refresh_rx.recv() => {
                in_flight.spawn(run_fetch(deps.clone(), descriptor.clone()));
            }
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(e) = joined
                    && e.is_panic()
                {
                    tracing::warn!(error = %e, "fetch task panicked");
                }
            }
        }
    }

    in_flight.abort_all();
    deps.store.retire(&descriptor.id).await;
    tracing::debug!("widget loop stopped");
}

/// Bearer token for `descriptor`, or None while signed out or its provider is disconnected.
async fn fetch_token(deps: &PollerDeps, descriptor: &WidgetDescriptor) -> Option<String> {
    let token = deps.session.token().await?;
    deps.session
        .connectors()
        .await
        .is_connected(descriptor.provider)
        .then_some(token)
}

/// One fetch: needs a token and a connected provider; otherwise nothing is issued.
/// The same gate is checked again before the response is applied.
pub(crate) async fn run_fetch(deps: Arc<PollerDeps>, descriptor: Arc<WidgetDescriptor>) {
    let Some(token) = fetch_token(&deps, &descriptor).await else {
        tracing::debug!(
            widget = %descriptor.id,
            "signed out or provider not connected; skipping fetch"
        );
        return;
    };

    let seq = deps.store.begin(&descriptor.id).await;
    let result = deps
        .repo
        .fetch_widget_data(&descriptor.source, &deps.resources, &token)
        .await;

    if fetch_token(&deps, &descriptor).await.is_none() {
        tracing::debug!(
            widget = %descriptor.id,
            seq,
            "session changed during fetch; dropping response"
        );
        deps.store.discard(&descriptor.id, seq).await;
        return;
    }
    if let Err(e) = &result {
        tracing::warn!(
            widget = %descriptor.id,
            error = %e,
            operation = "fetch_widget_data",
            "widget fetch failed"
        );
    }
    deps.store
        .complete(&descriptor.id, seq, result.map_err(|e| e.to_string()))
        .await;
}
