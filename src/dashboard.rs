// Dashboard shell: owns the registry (with visibility) and the layout, and composes the
// rendered widget views from live fetch state.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;

use crate::format::{self, ChartPoint};
use crate::layout::{Layout, LayoutError};
use crate::models::{
    BillingLine, ConnectorStatus, Delta, DerivedStats, MergedRow, MetricSeries, Provider,
    StatusLevel, WidgetData, WidgetState,
};
use crate::normalizer;
use crate::registry::{Registry, RegistryError, WidgetDescriptor};
use crate::session::Session;
use crate::stats;
use crate::worker::WidgetStore;

/// Current-value summary; only computed from settled (not loading, not errored) data.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub stats: DerivedStats,
    pub delta: Option<Delta>,
    pub status: Option<StatusLevel>,
    pub current: String,
    /// e.g. "99.95%"; only for metrics tracking uptime.
    pub uptime: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberView {
    pub name: String,
    pub summary: Option<Summary>,
}

/// Chart-ready body of a card.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Panel {
    /// Nothing fetched yet.
    Empty,
    Series {
        points: Vec<ChartPoint>,
        summary: Option<Summary>,
    },
    Composite {
        members: Vec<MemberView>,
        rows: Vec<MergedRow>,
    },
    Billing {
        lines: Vec<BillingLine>,
        bars: Vec<ChartPoint>,
        summary: Option<Summary>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetView {
    pub id: String,
    pub label: String,
    pub provider: Provider,
    pub loading: bool,
    pub error: Option<String>,
    pub last_updated: Option<u64>,
    pub panel: Panel,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub signed_in: bool,
    pub connectors: ConnectorStatus,
    pub widgets: Vec<WidgetView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub id: String,
    pub label: String,
    pub provider: Provider,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupView {
    pub id: String,
    pub label: String,
    pub provider: Provider,
    pub member_ids: Vec<String>,
    pub all_visible: bool,
}

pub struct Dashboard {
    // Lock order: registry before layout.
    registry: RwLock<Registry>,
    layout: RwLock<Layout>,
    store: Arc<WidgetStore>,
    session: Arc<Session>,
}

impl Dashboard {
    /// Layout starts in registry order.
    pub fn new(registry: Registry, store: Arc<WidgetStore>, session: Arc<Session>) -> Self {
        let layout = Layout::new(registry.ids());
        Self {
            registry: RwLock::new(registry),
            layout: RwLock::new(layout),
            store,
            session,
        }
    }

    /// Descriptors in registry order (for starting pollers).
    pub async fn descriptors(&self) -> Vec<WidgetDescriptor> {
        self.registry.read().await.widgets().to_vec()
    }

    pub async fn order(&self) -> Vec<String> {
        self.layout.read().await.order().to_vec()
    }

    /// The rendered dashboard. Signed out means a login prompt: no widgets at all.
    pub async fn render(&self) -> DashboardView {
        let signed_in = self.session.is_signed_in().await;
        let connectors = self.session.connectors().await;
        if !signed_in {
            return DashboardView {
                signed_in,
                connectors,
                widgets: Vec::new(),
            };
        }
        let states = self.store.snapshot_all().await;
        let registry = self.registry.read().await;
        let layout = self.layout.read().await;
        let widgets = registry
            .render_selection(layout.order(), &connectors)
            .into_iter()
            .filter_map(|id| registry.get(id))
            .map(|desc| {
                let state = states.get(&desc.id).cloned().unwrap_or_default();
                build_view(desc, &state)
            })
            .collect();
        DashboardView {
            signed_in,
            connectors,
            widgets,
        }
    }

    pub async fn catalog(&self) -> Vec<CatalogEntry> {
        let registry = self.registry.read().await;
        registry
            .widgets()
            .iter()
            .map(|w| CatalogEntry {
                id: w.id.clone(),
                label: w.label.clone(),
                provider: w.provider,
                visible: registry.is_visible(&w.id),
            })
            .collect()
    }

    pub async fn groups(&self) -> Vec<GroupView> {
        let registry = self.registry.read().await;
        registry
            .groups()
            .iter()
            .map(|g| GroupView {
                id: g.id.clone(),
                label: g.label.clone(),
                provider: g.provider,
                member_ids: g.member_ids.clone(),
                all_visible: registry.group_all_visible(&g.id).unwrap_or(false),
            })
            .collect()
    }

    pub async fn toggle_widget(&self, id: &str) -> Result<bool, RegistryError> {
        let visible = self.registry.write().await.toggle_widget(id)?;
        tracing::debug!(widget = id, visible, "widget toggled");
        Ok(visible)
    }

    pub async fn toggle_group(&self, id: &str) -> Result<bool, RegistryError> {
        let visible = self.registry.write().await.toggle_group(id)?;
        tracing::debug!(group = id, visible, "group toggled");
        Ok(visible)
    }

    /// Ends the session and clears every widget; responses still in flight are dropped.
    pub async fn sign_out(&self) {
        self.session.sign_out().await;
        self.store.clear_all().await;
    }

    /// Marks `provider` disconnected and clears its widgets.
    pub async fn disconnect(&self, provider: Provider) {
        self.session.set_connector(provider, false).await;
        let ids: Vec<String> = self
            .registry
            .read()
            .await
            .widgets()
            .iter()
            .filter(|w| w.provider == provider)
            .map(|w| w.id.clone())
            .collect();
        self.store.clear(ids.iter().map(String::as_str)).await;
        tracing::info!(provider = %provider, widgets = ids.len(), "connector disconnected");
    }

    /// Applies a drag. With `visible`, indices refer to the rendered list; otherwise to the
    /// full order. Returns the new full order.
    pub async fn move_card(
        &self,
        drag_index: usize,
        hover_index: usize,
        visible: bool,
    ) -> Result<Vec<String>, LayoutError> {
        let connectors = self.session.connectors().await;
        let registry = self.registry.read().await;
        let mut layout = self.layout.write().await;
        if visible {
            let order = layout.order().to_vec();
            let rendered = registry.render_selection(&order, &connectors);
            layout.move_visible(&rendered, drag_index, hover_index)?;
        } else {
            layout.move_card(drag_index, hover_index)?;
        }
        Ok(layout.order().to_vec())
    }
}

/// Composes one card from its descriptor and fetch state.
pub fn build_view(desc: &WidgetDescriptor, state: &WidgetState) -> WidgetView {
    let settled = state.current_data().is_some();
    let panel = match &state.data {
        None => Panel::Empty,
        Some(WidgetData::Series { series }) => Panel::Series {
            points: format::chart_points(series),
            summary: settled.then(|| series_summary(desc, series)),
        },
        Some(WidgetData::Composite { members }) => Panel::Composite {
            members: members
                .iter()
                .map(|m| MemberView {
                    name: m.name.clone(),
                    summary: settled.then(|| series_summary(desc, &m.series)),
                })
                .collect(),
            rows: normalizer::merge_by_timestamp(members),
        },
        Some(WidgetData::Billing { lines }) => {
            let lines = normalizer::chargeable_lines(lines);
            let bars = lines
                .iter()
                .map(|l| ChartPoint {
                    label: l.service.clone(),
                    value: l.cost,
                })
                .collect();
            let summary = settled.then(|| {
                let stats = stats::derive_billing(&lines, &desc.policy);
                let current = format::format_metric(&desc.policy, stats.total.unwrap_or(0.0));
                Summary {
                    stats,
                    delta: None,
                    status: None,
                    current,
                    uptime: None,
                }
            });
            Panel::Billing {
                lines,
                bars,
                summary,
            }
        }
    };
    WidgetView {
        id: desc.id.clone(),
        label: desc.label.clone(),
        provider: desc.provider,
        loading: state.loading,
        error: state.error.clone(),
        last_updated: state.last_updated,
        panel,
    }
}

fn series_summary(desc: &WidgetDescriptor, series: &MetricSeries) -> Summary {
    let policy = &desc.policy;
    let current = series.current().unwrap_or(0.0);
    let stats = stats::derive(series, policy);
    Summary {
        stats,
        delta: Some(stats::delta(series, policy.polarity)),
        status: policy
            .status
            .filter(|_| !series.is_empty())
            .map(|rule| stats::classify(current, rule)),
        current: format::format_metric(policy, current),
        uptime: stats
            .uptime_percent()
            .map(|p| format::format_percent(p, 2)),
    }
}
