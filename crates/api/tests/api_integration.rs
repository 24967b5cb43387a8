//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use api::AppState;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use event_store::InMemoryEventStore;
use metrics_exporter_prometheus::PrometheusHandle;
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
    app: Router,
    store: InMemoryEventStore,
    #[allow(dead_code)]
    state: Arc<AppState<InMemoryEventStore>>,
}

impl TestApp {
    fn new() -> Self {
        let store = InMemoryEventStore::new();
        let state = api::create_default_state(store.clone());
        let app = api::create_app(state.clone(), get_metrics_handle());
        Self { app, store, state }
    }

    async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
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

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send("GET", uri, None).await
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send("POST", uri, Some(body)).await
    }

    async fn party(&self) -> String {
        let (status, body) = self.send("POST", "/parties", None).await;
        assert_eq!(status, StatusCode::CREATED);
        body["party_id"].as_str().unwrap().to_string()
    }

    async fn list(&self, owner: &str, status: &str, cents: i64, quantity: u32) -> String {
        let (code, body) = self
            .post(
                "/products",
                json!({
                    "owner": owner,
                    "title": "Item",
                    "status": status,
                    "unit_price_cents": cents,
                    "quantity": quantity,
                }),
            )
            .await;
        assert_eq!(code, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }

    async fn propose(&self, offered: &str, requested: &str, proposer: &str) -> String {
        let (code, body) = self
            .post(
                "/exchanges",
                json!({
                    "product_offered": offered,
                    "product_requested": requested,
                    "proposer": proposer,
                }),
            )
            .await;
        assert_eq!(code, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }

    async fn request_donation(&self, product: &str, requester: &str) -> String {
        let (code, body) = self
            .post(
                "/donations",
                json!({ "product_id": product, "requester": requester, "message": "please" }),
            )
            .await;
        assert_eq!(code, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn test_health_check() {
    let t = TestApp::new();

    let (status, body) = t.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    t.store.set_unavailable(true);
    let (status, body) = t.get("/health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "unavailable");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let t = TestApp::new();
    let seller = t.party().await;
    t.list(&seller, "for_sale", 100, 1).await;

    let response = t
        .app
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("engine_operations_total"));
}

#[tokio::test]
async fn test_list_get_and_update_product() {
    let t = TestApp::new();
    let owner = t.party().await;
    let stranger = t.party().await;
    let lamp = t.list(&owner, "for_sale", 2500, 3).await;

    let (status, body) = t.get(&format!("/products/{lamp}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["owner"], owner.as_str());
    assert_eq!(body["status"], "for_sale");
    assert_eq!(body["unit_price_cents"], 2500);
    assert_eq!(body["quantity_available"], 3);

    let (status, body) = t
        .send(
            "PATCH",
            &format!("/products/{lamp}"),
            Some(json!({ "acting_party": owner, "unit_price_cents": 2000, "title": "Desk lamp" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["unit_price_cents"], 2000);
    assert_eq!(body["title"], "Desk lamp");

    let (status, body) = t
        .send(
            "PATCH",
            &format!("/products/{lamp}"),
            Some(json!({ "acting_party": stranger, "quantity": 10 })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn test_request_parsing_errors() {
    let t = TestApp::new();
    let owner = t.party().await;

    let (status, body) = t.get("/products/not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");

    let (status, _) = t
        .post(
            "/products",
            json!({
                "owner": owner,
                "title": "Item",
                "status": "for_rent",
                "unit_price_cents": 100,
                "quantity": 1,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = t.get(&format!("/products/{}", uuid::Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_listing_for_unknown_owner_is_not_found() {
    let t = TestApp::new();

    let (status, body) = t
        .post(
            "/products",
            json!({
                "owner": uuid::Uuid::new_v4(),
                "title": "Item",
                "status": "for_sale",
                "unit_price_cents": 100,
                "quantity": 1,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["details"]["entity"], "party");
}

#[tokio::test]
async fn test_two_seller_sale_and_payouts() {
    let t = TestApp::new();
    let seller_a = t.party().await;
    let seller_b = t.party().await;
    let buyer = t.party().await;
    let lamp = t.list(&seller_a, "for_sale", 2000, 5).await;
    let mug = t.list(&seller_b, "for_sale", 500, 5).await;

    let (status, body) = t
        .post(
            "/sales",
            json!({
                "buyer": buyer,
                "lines": [
                    { "product_id": lamp, "quantity": 2, "unit_price_cents": 2000 },
                    { "product_id": mug, "quantity": 1, "unit_price_cents": 500 },
                ],
                "total_cents": 4500,
                "payment_method": "online",
                "payment_status": "completed",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["sale"]["total_cents"], 4500);
    assert_eq!(body["sale"]["stock_committed"], true);
    let subtotals = body["seller_subtotals"].as_array().unwrap();
    assert_eq!(subtotals.len(), 2);
    let subtotal_of = |seller: &str| {
        subtotals
            .iter()
            .find(|s| s["seller"] == seller)
            .map(|s| s["subtotal_cents"].as_i64().unwrap())
    };
    assert_eq!(subtotal_of(&seller_a), Some(4000));
    assert_eq!(subtotal_of(&seller_b), Some(500));

    let sale_id = body["sale"]["id"].as_str().unwrap().to_string();
    let (status, sale) = t.get(&format!("/sales/{sale_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sale["payment_status"], "completed");
    assert_eq!(sale["line_items"].as_array().unwrap().len(), 2);

    let (_, product) = t.get(&format!("/products/{lamp}")).await;
    assert_eq!(product["quantity_available"], 3);

    let (status, payout) = t.get(&format!("/sellers/{seller_a}/payouts")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payout["earned_cents"], 4000);
    assert_eq!(payout["completed_sales"], 1);

    let (_, payout) = t.get(&format!("/sellers/{buyer}/payouts")).await;
    assert_eq!(payout["earned_cents"], 0);
    assert_eq!(payout["completed_sales"], 0);
}

#[tokio::test]
async fn test_insufficient_stock_is_409_with_details() {
    let t = TestApp::new();
    let seller = t.party().await;
    let buyer = t.party().await;
    let chair = t.list(&seller, "for_sale", 1000, 1).await;

    let (status, body) = t
        .post(
            "/sales",
            json!({
                "buyer": buyer,
                "lines": [{ "product_id": chair, "quantity": 3, "unit_price_cents": 1000 }],
                "total_cents": 3000,
                "payment_method": "cash",
                "payment_status": "completed",
            }),
        )
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "insufficient_stock");
    assert_eq!(body["details"]["product_id"], chair.as_str());
    assert_eq!(body["details"]["requested"], 3);
    assert_eq!(body["details"]["available"], 1);

    let (_, product) = t.get(&format!("/products/{chair}")).await;
    assert_eq!(product["quantity_available"], 1);
}

#[tokio::test]
async fn test_underpriced_line_is_409() {
    let t = TestApp::new();
    let seller = t.party().await;
    let buyer = t.party().await;
    let laptop = t.list(&seller, "for_sale", 100_000, 1).await;

    let (status, body) = t
        .post(
            "/sales",
            json!({
                "buyer": buyer,
                "lines": [{ "product_id": laptop, "quantity": 1, "unit_price_cents": 1 }],
                "total_cents": 1,
                "payment_method": "online",
                "payment_status": "completed",
            }),
        )
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    let (_, product) = t.get(&format!("/products/{laptop}")).await;
    assert_eq!(product["quantity_available"], 1);
    assert_eq!(product["status"], "for_sale");
}

#[tokio::test]
async fn test_declared_total_mismatch_is_422() {
    let t = TestApp::new();
    let seller = t.party().await;
    let buyer = t.party().await;
    let chair = t.list(&seller, "for_sale", 1000, 5).await;

    let (status, body) = t
        .post(
            "/sales",
            json!({
                "buyer": buyer,
                "lines": [{ "product_id": chair, "quantity": 2, "unit_price_cents": 1000 }],
                "total_cents": 1500,
                "payment_method": "online",
                "payment_status": "pending",
            }),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation");
}

#[tokio::test]
async fn test_payment_and_fulfillment_updates() {
    let t = TestApp::new();
    let seller = t.party().await;
    let buyer = t.party().await;
    let book = t.list(&seller, "for_sale", 800, 4).await;

    let (_, body) = t
        .post(
            "/sales",
            json!({
                "buyer": buyer,
                "lines": [{ "product_id": book, "quantity": 1, "unit_price_cents": 800 }],
                "total_cents": 800,
                "payment_method": "online",
                "payment_status": "pending",
            }),
        )
        .await;
    let sale_id = body["sale"]["id"].as_str().unwrap().to_string();
    let payment_uri = format!("/sales/{sale_id}/payment");

    for _ in 0..2 {
        let (status, sale) = t
            .post(
                &payment_uri,
                json!({ "status": "completed", "acting_party": seller }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(sale["payment_status"], "completed");
    }
    let (_, product) = t.get(&format!("/products/{book}")).await;
    assert_eq!(product["quantity_available"], 3, "stock taken once");

    let (status, body) = t
        .post(&payment_uri, json!({ "status": "failed", "acting_party": seller }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "invalid_transition");

    let (status, _) = t
        .post(
            &payment_uri,
            json!({ "status": "refunded", "acting_party": buyer }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, sale) = t
        .post(
            &format!("/sales/{sale_id}/fulfillment"),
            json!({ "status": "shipped", "acting_party": seller }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sale["fulfillment_status"], "shipped");
}

#[tokio::test]
async fn test_exchange_acceptance_cascades() {
    let t = TestApp::new();
    let alice = t.party().await;
    let bob = t.party().await;
    let carol = t.party().await;

    let guitar = t.list(&alice, "for_exchange", 0, 1).await;
    let bike = t.list(&bob, "for_exchange", 0, 1).await;
    let drone = t.list(&carol, "for_exchange", 0, 1).await;

    let accepted = t.propose(&bike, &guitar, &bob).await;
    let rival = t.propose(&drone, &guitar, &carol).await;

    let (status, body) = t
        .post(
            &format!("/exchanges/{accepted}/resolve"),
            json!({ "status": "accepted", "acting_party": alice }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["proposal"]["status"], "accepted");
    assert_eq!(body["cancelled_proposals"], json!([rival]));
    assert_eq!(body["products"].as_array().unwrap().len(), 2);

    let (_, guitar_now) = t.get(&format!("/products/{guitar}")).await;
    assert_eq!(guitar_now["owner"], bob.as_str());
    assert_eq!(guitar_now["status"], "unavailable");

    let (_, rival_now) = t.get(&format!("/exchanges/{rival}")).await;
    assert_eq!(rival_now["status"], "cancelled");
    assert_eq!(rival_now["cancellation"]["kind"], "superseded_by");

    let (status, body) = t
        .post(
            &format!("/exchanges/{rival}/resolve"),
            json!({ "status": "accepted", "acting_party": alice }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn test_only_the_recipient_accepts_an_exchange() {
    let t = TestApp::new();
    let alice = t.party().await;
    let bob = t.party().await;
    let guitar = t.list(&alice, "for_exchange", 0, 1).await;
    let bike = t.list(&bob, "for_exchange", 0, 1).await;
    let proposal = t.propose(&bike, &guitar, &bob).await;

    let (status, body) = t
        .post(
            &format!("/exchanges/{proposal}/resolve"),
            json!({ "status": "accepted", "acting_party": bob }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "unauthorized");

    let (_, current) = t.get(&format!("/exchanges/{proposal}")).await;
    assert_eq!(current["status"], "pending");
}

#[tokio::test]
async fn test_donation_acceptance_rejects_competitors() {
    let t = TestApp::new();
    let owner = t.party().await;
    let first = t.party().await;
    let second = t.party().await;
    let sofa = t.list(&owner, "for_donation", 0, 1).await;

    let winner = t.request_donation(&sofa, &first).await;
    let loser = t.request_donation(&sofa, &second).await;

    let (status, body) = t
        .post(
            &format!("/donations/{winner}/resolve"),
            json!({ "status": "accepted", "acting_party": owner }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["request"]["status"], "accepted");
    assert_eq!(body["product"]["owner"], first.as_str());
    assert_eq!(body["rejected_requests"], json!([loser]));

    let (_, loser_now) = t.get(&format!("/donations/{loser}")).await;
    assert_eq!(loser_now["status"], "rejected");
    assert_eq!(loser_now["rejection"]["kind"], "other_request_accepted");
}

#[tokio::test]
async fn test_unavailable_store_is_503() {
    let t = TestApp::new();
    let seller = t.party().await;
    t.store.set_unavailable(true);

    let (status, body) = t
        .post(
            "/products",
            json!({
                "owner": seller,
                "title": "Item",
                "status": "for_sale",
                "unit_price_cents": 100,
                "quantity": 1,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "unavailable");
}
