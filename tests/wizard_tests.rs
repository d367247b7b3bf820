// Connector setup wizard tests: step bounds, progress, finish rules, submit

mod common;

use cloudboard::backend_repo::FetchError;
use cloudboard::models::{ConnectorPayload, ConnectorStatus, Provider};
use cloudboard::session::{Session, StaticToken};
use cloudboard::wizard::{SetupError, SetupWizard, WIZARD_STEPS, WizardError, submit};
use common::*;
use std::sync::Arc;

fn filled_azure() -> SetupWizard {
    let mut w = SetupWizard::new(Provider::Azure);
    w.set_field("subscription_id", "sub-1").unwrap();
    w.set_field("tenant_id", "tenant-1").unwrap();
    w.set_field("client_id", "client-1").unwrap();
    w.set_field("client_secret", "hunter2").unwrap();
    w
}

#[test]
fn test_steps_are_bounded() {
    let mut w = SetupWizard::new(Provider::Aws);
    assert_eq!(w.step(), 1);
    assert_eq!(w.prev(), 1);
    for _ in 0..10 {
        w.next();
    }
    assert_eq!(w.step(), WIZARD_STEPS);
    assert_eq!(w.progress(), 1.0);
    assert_eq!(w.prev(), 4);
    assert_eq!(w.progress(), 0.8);
}

#[test]
fn test_progress_starts_at_one_fifth() {
    assert_eq!(SetupWizard::new(Provider::Azure).progress(), 0.2);
}

#[test]
fn test_finish_requires_final_step() {
    let w = filled_azure();
    assert_eq!(w.finish(), Err(WizardError::NotOnFinalStep(1)));
}

#[test]
fn test_finish_reports_missing_required_field() {
    let mut w = SetupWizard::new(Provider::Azure);
    w.set_field("subscription_id", "sub-1").unwrap();
    w.set_field("tenant_id", "  ").unwrap();
    while !w.is_final_step() {
        w.next();
    }
    assert_eq!(w.finish(), Err(WizardError::MissingField("tenant_id")));
}

#[test]
fn test_finish_builds_azure_payload() {
    let mut w = filled_azure();
    while !w.is_final_step() {
        w.next();
    }
    match w.finish().unwrap() {
        ConnectorPayload::Azure(c) => {
            assert_eq!(c.tenant_id, "tenant-1");
            assert_eq!(c.client_id, "client-1");
            assert_eq!(c.client_secret, "hunter2");
            assert_eq!(c.subscription_id, "sub-1");
        }
        other => panic!("unexpected payload {:?}", other),
    }
}

#[test]
fn test_aws_region_defaults() {
    let w = SetupWizard::from_form(
        Provider::Aws,
        [("access_key", "AKIA123"), ("secret_key", "s3cr3t")],
    )
    .unwrap();
    match w.finish().unwrap() {
        ConnectorPayload::Aws(c) => assert_eq!(c.region, "us-east-1"),
        other => panic!("unexpected payload {:?}", other),
    }
}

#[test]
fn test_unknown_field_rejected() {
    let err = SetupWizard::from_form(Provider::Azure, [("access_key", "x")]).unwrap_err();
    assert_eq!(
        err,
        WizardError::UnknownField {
            provider: Provider::Azure,
            field: "access_key".into()
        }
    );
}

#[test]
fn test_debug_redacts_secrets() {
    let debug = format!("{:?}", filled_azure());
    assert!(!debug.contains("hunter2"));
    assert!(debug.contains("tenant-1"));

    let payload = SetupWizard::from_form(
        Provider::Aws,
        [("access_key", "AKIA123"), ("secret_key", "s3cr3t")],
    )
    .unwrap()
    .finish()
    .unwrap();
    let debug = format!("{:?}", payload);
    assert!(!debug.contains("s3cr3t"));
    assert!(!debug.contains("AKIA123"));
}

#[tokio::test]
async fn test_submit_posts_credentials_and_sets_connector() {
    let (base_url, rec) = spawn_fake_backend().await;
    let session = signed_in_session(ConnectorStatus::default()).await;
    let repo = repo(&base_url);
    let w = SetupWizard::from_form(
        Provider::Aws,
        [
            ("access_key", "AKIA123"),
            ("secret_key", "s3cr3t"),
            ("region", "eu-west-1"),
        ],
    )
    .unwrap();

    submit(&repo, &session, &w).await.unwrap();

    let body = &rec.bodies_for("/api/connectors/aws")[0];
    assert_eq!(body["access_key"], "AKIA123");
    assert_eq!(body["secret_key"], "s3cr3t");
    assert_eq!(body["region"], "eu-west-1");
    assert!(session.connectors().await.aws);
    assert!(!session.connectors().await.azure);
}

#[tokio::test]
async fn test_submit_without_session_is_unauthenticated() {
    let (base_url, rec) = spawn_fake_backend().await;
    let session = Arc::new(Session::new(Arc::new(StaticToken::none())));
    let mut w = filled_azure();
    while !w.is_final_step() {
        w.next();
    }
    let err = submit(&repo(&base_url), &session, &w).await.unwrap_err();
    assert!(matches!(err, SetupError::Fetch(FetchError::Unauthenticated)));
    assert_eq!(rec.calls(), 0);
    assert!(!session.connectors().await.azure);
}
