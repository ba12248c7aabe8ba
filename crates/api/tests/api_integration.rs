//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use billing::InMemoryPaymentProcessor;
use crm_sync::{CrmError, InMemoryCrmClient};
use metrics_exporter_prometheus::PrometheusHandle;
use record_store::InMemoryRecordStore;
use serde_json::{Value, json};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

struct TestApp {
    router: Router,
    store: InMemoryRecordStore,
    crm: Arc<InMemoryCrmClient>,
}

fn setup() -> TestApp {
    let store = InMemoryRecordStore::new();
    let crm = Arc::new(InMemoryCrmClient::new());
    let processor = Arc::new(InMemoryPaymentProcessor::new());
    let state = api::create_default_state(store.clone(), crm.clone(), processor);
    let router = api::create_app(state, get_metrics_handle());
    TestApp { router, store, crm }
}

impl TestApp {
    async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    async fn create_organization(&self, name: &str) -> i64 {
        let (status, body) = self
            .send("POST", "/organizations", Some(json!({ "name": name })))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_i64().unwrap()
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = setup();

    let (status, body) = app.send("GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_create_organization_commits_to_both_stores() {
    let app = setup();

    let (status, body) = app
        .send(
            "POST",
            "/organizations",
            Some(json!({
                "name": "Acme Property Group",
                "email": "Billing@Acme.test",
                "phone": "555-0100"
            })),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "committed");
    assert_eq!(body["kind"], "organization");
    assert_eq!(body["local_effect"], "persisted");
    assert_eq!(body["inconsistent"], false);
    let remote_id = body["remote_id"].as_str().unwrap().to_string();
    assert!(remote_id.starts_with("CRM-"));
    assert_eq!(app.crm.record_count(), 1);

    let id = body["id"].as_i64().unwrap();
    let (status, org) = app.send("GET", &format!("/organizations/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(org["name"], "Acme Property Group");
    assert_eq!(org["email"], "billing@acme.test");
    assert_eq!(org["remote_id"], remote_id.as_str());
}

#[tokio::test]
async fn test_create_organization_with_blank_name_is_rejected() {
    let app = setup();

    let (status, _) = app
        .send("POST", "/organizations", Some(json!({ "name": "   " })))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.crm.call_count(), 0);
    assert_eq!(app.store.organization_count().await, 0);
}

#[tokio::test]
async fn test_duplicate_organization_fails_without_crm_call() {
    let app = setup();
    app.create_organization("Acme").await;

    let (status, body) = app
        .send("POST", "/organizations", Some(json!({ "name": "Acme" })))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "failed");
    assert_eq!(body["kind"], "organization");
    assert!(
        body["error"]
            .as_str()
            .unwrap()
            .contains("organizations_name_key")
    );
    assert_eq!(body["local_effect"], "none");
    assert_eq!(body["inconsistent"], false);
    assert_eq!(app.crm.call_count(), 1);
}

#[tokio::test]
async fn test_crm_rejection_rolls_back_as_conflict() {
    let app = setup();
    app.crm
        .set_fail_with(Some(CrmError::Permanent("name is reserved".to_string())));

    let (status, body) = app
        .send("POST", "/organizations", Some(json!({ "name": "Acme" })))
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], "rolled_back");
    assert_eq!(body["local_effect"], "undone");
    assert_eq!(body["error_class"], "permanent");
    assert!(body["error"].as_str().unwrap().contains("name is reserved"));
    assert_eq!(app.store.organization_count().await, 0);
}

#[tokio::test]
async fn test_crm_outage_rolls_back_as_bad_gateway() {
    let app = setup();
    app.crm
        .set_fail_with(Some(CrmError::Transient("connection refused".to_string())));

    let (status, body) = app
        .send("POST", "/organizations", Some(json!({ "name": "Acme" })))
        .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["status"], "rolled_back");
    assert_eq!(body["error_class"], "transient");
    assert_eq!(app.store.organization_count().await, 0);

    // Retrying once the CRM is back succeeds.
    app.crm.set_fail_with(None);
    let (status, _) = app
        .send("POST", "/organizations", Some(json!({ "name": "Acme" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(app.store.organization_count().await, 1);
}

#[tokio::test]
async fn test_failed_compensation_reports_both_errors() {
    let app = setup();
    app.crm
        .set_fail_with(Some(CrmError::Transient("upstream timeout".to_string())));
    app.store.set_fail_on_delete(true);

    let (status, body) = app
        .send("POST", "/organizations", Some(json!({ "name": "Acme" })))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "failed");
    assert_eq!(body["inconsistent"], true);
    assert_eq!(body["local_effect"], "may_remain");
    let error = body["error"].as_str().unwrap();
    assert!(error.contains("upstream timeout"));
    assert!(error.contains("compensating delete failed"));
}

#[tokio::test]
async fn test_create_contact_for_organization() {
    let app = setup();
    let org_id = app.create_organization("Acme").await;

    let (status, body) = app
        .send(
            "POST",
            "/contacts",
            Some(json!({
                "email": "jane@acme.test",
                "first_name": "Jane",
                "last_name": "Doe",
                "organization_id": org_id
            })),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["kind"], "contact");
    let id = body["id"].as_i64().unwrap();

    let (status, contact) = app.send("GET", &format!("/contacts/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(contact["full_name"], "Jane Doe");
    assert_eq!(contact["organization_id"], org_id);

    let (status, contacts) = app.send("GET", "/contacts", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(contacts.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_contact_with_invalid_email_is_rejected() {
    let app = setup();

    let (status, _) = app
        .send(
            "POST",
            "/contacts",
            Some(json!({ "email": "not-an-email", "first_name": "Jane" })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.crm.call_count(), 0);
}

#[tokio::test]
async fn test_contact_for_unknown_organization_fails_locally() {
    let app = setup();

    let (status, body) = app
        .send(
            "POST",
            "/contacts",
            Some(json!({
                "email": "jane@acme.test",
                "first_name": "Jane",
                "organization_id": 999
            })),
        )
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "failed");
    assert_eq!(body["kind"], "contact");
    assert_eq!(body["local_effect"], "none");
    assert!(
        body["error"]
            .as_str()
            .unwrap()
            .contains("contacts_organization_id_fkey")
    );
    assert_eq!(app.crm.call_count(), 0);
}

#[tokio::test]
async fn test_get_unknown_records() {
    let app = setup();

    let (status, _) = app.send("GET", "/organizations/42", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.send("GET", "/contacts/42", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.send("GET", "/organizations/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_organizations() {
    let app = setup();
    app.create_organization("Acme").await;
    app.create_organization("Globex").await;

    let (status, body) = app.send("GET", "/organizations", None).await;

    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Acme", "Globex"]);
}

#[tokio::test]
async fn test_charge_lifecycle() {
    let app = setup();
    let org_id = app.create_organization("Acme").await;

    let (status, charge) = app
        .send(
            "POST",
            "/charges",
            Some(json!({
                "organization_id": org_id,
                "amount_cents": 125_000,
                "description": "October rent"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(charge["state"], "pending");
    let charge_id = charge["id"].as_str().unwrap().to_string();

    let (status, charge) = app
        .send("POST", &format!("/charges/{charge_id}/payment-link"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(charge["state"], "quoted");
    assert_eq!(
        charge["payment_link_url"],
        "https://pay.example.test/link/PL-0001"
    );

    let (status, _) = app
        .send(
            "POST",
            &format!("/charges/{charge_id}/payments"),
            Some(json!({ "payment_reference": "TXN-1", "amount_cents": 100 })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, charge) = app
        .send(
            "POST",
            &format!("/charges/{charge_id}/payments"),
            Some(json!({ "payment_reference": "TXN-1", "amount_cents": 125_000 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(charge["state"], "paid");
    assert_eq!(charge["payment_reference"], "TXN-1");

    let (status, _) = app
        .send("POST", &format!("/charges/{charge_id}/payment-link"), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, charges) = app
        .send("GET", &format!("/organizations/{org_id}/charges"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(charges.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_charge_validation() {
    let app = setup();
    let org_id = app.create_organization("Acme").await;

    let (status, _) = app
        .send(
            "POST",
            "/charges",
            Some(json!({ "organization_id": org_id, "amount_cents": 0, "description": "Rent" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            "POST",
            "/charges",
            Some(json!({ "organization_id": 999, "amount_cents": 100, "description": "Rent" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.send("GET", "/charges/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send("GET", &format!("/charges/{}", uuid::Uuid::new_v4()), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = setup();
    app.create_organization("Acme").await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("sync_attempts_total"));
    assert!(text.contains("sync_committed_total"));
}
