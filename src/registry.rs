// Widget registry: fixed descriptor list, static groups and the visibility map.
// Render selection = visibility filter, then connector filter; the two never write to each other.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::catalog::{MetricPolicy, MetricSource};
use crate::models::{ConnectorStatus, Provider};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("duplicate widget id: {0}")]
    DuplicateWidget(String),
    #[error("unknown widget: {0}")]
    UnknownWidget(String),
    #[error("unknown group: {0}")]
    UnknownGroup(String),
    #[error("group {group} references unknown widget {widget}")]
    UnknownMember { group: String, widget: String },
}

/// Identity and data binding of one dashboard card.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetDescriptor {
    pub id: String,
    pub label: String,
    pub provider: Provider,
    pub source: MetricSource,
    pub policy: MetricPolicy,
}

/// Static bulk-toggle group; carries no data of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetGroup {
    pub id: String,
    pub label: String,
    pub provider: Provider,
    pub member_ids: Vec<String>,
}

/// Widget id -> visible. Ids never toggled read as visible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibilityMap(HashMap<String, bool>);

impl VisibilityMap {
    pub fn all_visible<'a>(ids: impl IntoIterator<Item = &'a str>) -> Self {
        Self(ids.into_iter().map(|id| (id.to_string(), true)).collect())
    }

    pub fn is_visible(&self, id: &str) -> bool {
        self.0.get(id).copied().unwrap_or(true)
    }

    pub fn set(&mut self, id: &str, visible: bool) {
        self.0.insert(id.to_string(), visible);
    }

    /// Flips one id; returns the new value.
    pub fn toggle(&mut self, id: &str) -> bool {
        let next = !self.is_visible(id);
        self.set(id, next);
        next
    }
}

#[derive(Debug, Clone)]
pub struct Registry {
    widgets: Vec<WidgetDescriptor>,
    groups: Vec<WidgetGroup>,
    visibility: VisibilityMap,
}

impl Registry {
    /// Validates unique ids and group membership; every widget starts visible.
    pub fn new(
        widgets: Vec<WidgetDescriptor>,
        mut groups: Vec<WidgetGroup>,
    ) -> Result<Self, RegistryError> {
        let mut seen = HashSet::new();
        for w in &widgets {
            if !seen.insert(w.id.as_str()) {
                return Err(RegistryError::DuplicateWidget(w.id.clone()));
            }
        }
        for g in &mut groups {
            let mut members = HashSet::new();
            g.member_ids.retain(|m| members.insert(m.clone()));
            if let Some(m) = g.member_ids.iter().find(|m| !seen.contains(m.as_str())) {
                return Err(RegistryError::UnknownMember {
                    group: g.id.clone(),
                    widget: m.clone(),
                });
            }
        }
        let visibility = VisibilityMap::all_visible(widgets.iter().map(|w| w.id.as_str()));
        Ok(Self {
            widgets,
            groups,
            visibility,
        })
    }

    pub fn widgets(&self) -> &[WidgetDescriptor] {
        &self.widgets
    }

    pub fn groups(&self) -> &[WidgetGroup] {
        &self.groups
    }

    pub fn ids(&self) -> Vec<String> {
        self.widgets.iter().map(|w| w.id.clone()).collect()
    }

    pub fn get(&self, id: &str) -> Option<&WidgetDescriptor> {
        self.widgets.iter().find(|w| w.id == id)
    }

    pub fn group(&self, id: &str) -> Option<&WidgetGroup> {
        self.groups.iter().find(|g| g.id == id)
    }

    pub fn visibility(&self) -> &VisibilityMap {
        &self.visibility
    }

    pub fn is_visible(&self, id: &str) -> bool {
        self.visibility.is_visible(id)
    }

    /// Flips one widget; returns its new visibility.
    pub fn toggle_widget(&mut self, id: &str) -> Result<bool, RegistryError> {
        if self.get(id).is_none() {
            return Err(RegistryError::UnknownWidget(id.to_string()));
        }
        Ok(self.visibility.toggle(id))
    }

    pub fn group_all_visible(&self, group_id: &str) -> Result<bool, RegistryError> {
        let group = self
            .group(group_id)
            .ok_or_else(|| RegistryError::UnknownGroup(group_id.to_string()))?;
        Ok(group
            .member_ids
            .iter()
            .all(|id| self.visibility.is_visible(id)))
    }

    /// Sets every member to `!all_visible`: all-on/all-off, not a per-member flip.
    /// Returns the visibility applied to the members.
    pub fn toggle_group(&mut self, group_id: &str) -> Result<bool, RegistryError> {
        let target = !self.group_all_visible(group_id)?;
        let members = self
            .group(group_id)
            .map(|g| g.member_ids.clone())
            .unwrap_or_default();
        for id in &members {
            self.visibility.set(id, target);
        }
        Ok(target)
    }

    /// Whether a widget reaches the screen: toggled on and its provider connected.
    pub fn is_rendered(&self, id: &str, connectors: &ConnectorStatus) -> bool {
        self.get(id).is_some_and(|w| {
            self.visibility.is_visible(id) && connectors.is_connected(w.provider)
        })
    }

    /// Filters a layout order down to the ids that render, keeping order.
    pub fn render_selection<'a>(
        &self,
        order: &'a [String],
        connectors: &ConnectorStatus,
    ) -> Vec<&'a str> {
        order
            .iter()
            .filter(|id| self.is_rendered(id, connectors))
            .map(String::as_str)
            .collect()
    }
}
