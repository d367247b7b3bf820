// Widget registry tests: visibility toggles, group toggles, provider filtering

use cloudboard::catalog::{MetricPolicy, MetricSource, Unit, default_groups, default_widgets};
use cloudboard::models::{ConnectorStatus, Polarity, Provider};
use cloudboard::registry::{Registry, RegistryError, WidgetDescriptor, WidgetGroup};

fn widget(id: &str, provider: Provider) -> WidgetDescriptor {
    WidgetDescriptor {
        id: id.into(),
        label: id.to_uppercase(),
        provider,
        source: MetricSource::AzureStorage {
            metric_name: id.into(),
        },
        policy: MetricPolicy::new(Unit::Count, Polarity::Neutral),
    }
}

fn group(id: &str, members: &[&str]) -> WidgetGroup {
    WidgetGroup {
        id: id.into(),
        label: id.into(),
        provider: Provider::Azure,
        member_ids: members.iter().map(|s| s.to_string()).collect(),
    }
}

fn abc_registry() -> Registry {
    Registry::new(
        vec![
            widget("a", Provider::Azure),
            widget("b", Provider::Azure),
            widget("c", Provider::Azure),
            widget("x", Provider::Aws),
        ],
        vec![group("g", &["a", "b", "c"])],
    )
    .unwrap()
}

#[test]
fn test_default_catalog_builds() {
    let registry = Registry::new(default_widgets(), default_groups()).unwrap();
    assert_eq!(registry.widgets().len(), 16);
    assert!(registry.ids().iter().all(|id| registry.is_visible(id)));
    assert_eq!(registry.widgets()[0].id, "awsCpu");
}

#[test]
fn test_duplicate_widget_id_rejected() {
    let err = Registry::new(
        vec![widget("a", Provider::Aws), widget("a", Provider::Azure)],
        vec![],
    )
    .unwrap_err();
    assert_eq!(err, RegistryError::DuplicateWidget("a".into()));
}

#[test]
fn test_group_with_unknown_member_rejected() {
    let err = Registry::new(vec![widget("a", Provider::Azure)], vec![group("g", &["a", "zz"])])
        .unwrap_err();
    assert_eq!(
        err,
        RegistryError::UnknownMember {
            group: "g".into(),
            widget: "zz".into()
        }
    );
}

#[test]
fn test_duplicate_group_members_collapse() {
    let registry = Registry::new(
        vec![widget("a", Provider::Azure)],
        vec![group("g", &["a", "a"])],
    )
    .unwrap();
    assert_eq!(registry.group("g").unwrap().member_ids, vec!["a".to_string()]);
}

#[test]
fn test_toggle_widget_flips_and_unknown_errors() {
    let mut registry = abc_registry();
    assert_eq!(registry.toggle_widget("a"), Ok(false));
    assert!(!registry.is_visible("a"));
    assert_eq!(registry.toggle_widget("a"), Ok(true));
    assert_eq!(
        registry.toggle_widget("nope"),
        Err(RegistryError::UnknownWidget("nope".into()))
    );
}

#[test]
fn test_group_toggle_all_visible_hides_all_then_restores() {
    let mut registry = abc_registry();
    assert_eq!(registry.toggle_group("g"), Ok(false));
    for id in ["a", "b", "c"] {
        assert!(!registry.is_visible(id), "{id} should be hidden");
    }
    assert_eq!(registry.toggle_group("g"), Ok(true));
    for id in ["a", "b", "c"] {
        assert!(registry.is_visible(id), "{id} should be visible");
    }
}

#[test]
fn test_group_toggle_partially_visible_shows_all() {
    let mut registry = abc_registry();
    registry.toggle_widget("c").unwrap();
    assert_eq!(registry.group_all_visible("g"), Ok(false));
    assert_eq!(registry.toggle_group("g"), Ok(true));
    for id in ["a", "b", "c"] {
        assert!(registry.is_visible(id), "{id} should be visible");
    }
}

#[test]
fn test_group_toggle_leaves_non_members_alone() {
    let mut registry = abc_registry();
    registry.toggle_group("g").unwrap();
    assert!(registry.is_visible("x"));
    assert_eq!(
        registry.toggle_group("missing"),
        Err(RegistryError::UnknownGroup("missing".into()))
    );
}

#[test]
fn test_provider_filter_is_independent_of_visibility() {
    let registry = abc_registry();
    let order = registry.ids();
    let azure_only = ConnectorStatus {
        aws: false,
        azure: true,
    };
    let visibility_before = registry.visibility().clone();

    assert!(registry.is_visible("x"));
    assert!(!registry.is_rendered("x", &azure_only));
    assert_eq!(
        registry.render_selection(&order, &azure_only),
        vec!["a", "b", "c"]
    );

    let both = ConnectorStatus {
        aws: true,
        azure: true,
    };
    assert!(registry.is_rendered("x", &both));
    assert_eq!(
        registry.render_selection(&order, &both),
        vec!["a", "b", "c", "x"]
    );
    assert_eq!(registry.visibility(), &visibility_before);
}

#[test]
fn test_render_selection_keeps_layout_order_and_skips_hidden() {
    let mut registry = abc_registry();
    registry.toggle_widget("b").unwrap();
    let order: Vec<String> = ["x", "c", "b", "a"].map(String::from).to_vec();
    let both = ConnectorStatus {
        aws: true,
        azure: true,
    };
    assert_eq!(registry.render_selection(&order, &both), vec!["x", "c", "a"]);
    assert!(
        registry
            .render_selection(&order, &ConnectorStatus::default())
            .is_empty()
    );
}
