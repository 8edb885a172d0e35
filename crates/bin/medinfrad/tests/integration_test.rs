//! End-to-end smoke tests for the full medinfrad stack.
//!
//! Each test spins up the complete application (in-memory `SQLite`, real
//! store, real services, real axum router) and exercises the HTTP layer via
//! `tower::ServiceExt::oneshot`: no TCP port is bound.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use medinfra_adapter_http_axum::router;
use medinfra_adapter_http_axum::scope::{ACTOR_HEADER, BRANCH_HEADER};
use medinfra_adapter_http_axum::state::AppState;
use medinfra_adapter_storage_sqlite_sqlx::Config;
use medinfra_app::audit_bus::InProcessAuditBus;
use medinfra_domain::id::{ActorId, BranchId};
use serde_json::{Value, json};
use tower::ServiceExt;

/// A fully-wired router backed by an in-memory `SQLite` database, plus the
/// caller identity every request is sent with.
struct TestApp {
    router: axum::Router,
    branch: BranchId,
    actor: ActorId,
}

impl TestApp {
    async fn new() -> Self {
        let db = Config {
            database_url: "sqlite::memory:".to_string(),
        }
        .build()
        .await
        .expect("in-memory database should initialise");
        let audit = Arc::new(InProcessAuditBus::new(256));
        let state = AppState::new(db.store(), audit, 1_000);

        Self {
            router: router::build(state),
            branch: BranchId::new(),
            actor: ActorId::new(),
        }
    }

    async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(BRANCH_HEADER, self.branch.to_string())
            .header(ACTOR_HEADER, self.actor.to_string());
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let resp = self.router.clone().oneshot(request).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send("GET", uri, None).await
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send("POST", uri, Some(body)).await
    }

    async fn created(&self, uri: &str, body: Value) -> Value {
        let (status, json) = self.post(uri, body).await;
        assert_eq!(status, StatusCode::CREATED, "POST {uri} failed: {json}");
        json
    }

    /// Campus `C01`, building `B01` and floor `F01`, all effective since 2020.
    async fn seed_site(&self) -> (String, String, String) {
        let campus = self
            .created(
                "/api/locations",
                json!({"kind": "CAMPUS", "code": "C01", "name": "Main campus",
                       "effectiveFrom": "2020-01-01T00:00:00Z"}),
            )
            .await;
        let building = self
            .created(
                "/api/locations",
                json!({"kind": "BUILDING", "parentId": campus["id"], "code": "B01",
                       "name": "Tower A", "effectiveFrom": "2020-01-01T00:00:00Z"}),
            )
            .await;
        let floor = self
            .created(
                "/api/locations",
                json!({"kind": "FLOOR", "parentId": building["id"], "code": "F01",
                       "name": "Ground", "floorNumber": 0,
                       "effectiveFrom": "2020-01-01T00:00:00Z"}),
            )
            .await;
        (id_of(&campus), id_of(&building), id_of(&floor))
    }

    /// A unit of type `unit_type` on the seeded floor.
    async fn seed_unit(&self, unit_type: Value, code: &str) -> Value {
        let (campus, _, floor) = self.seed_site().await;
        let department = self
            .created(
                "/api/departments",
                json!({"code": "SURG", "name": "Surgery",
                       "locations": [{"locationNodeId": campus, "isPrimary": true}]}),
            )
            .await;
        let unit_type = self.created("/api/unit-types", unit_type).await;
        self.created(
            "/api/units",
            json!({"departmentId": department["id"], "unitTypeId": unit_type["id"],
                   "locationNodeId": floor, "code": code, "name": format!("{code} unit")}),
        )
        .await
    }

    /// An OT unit with one room holding one schedulable table.
    async fn seed_ot_table(&self) -> (Value, Value) {
        let unit = self
            .seed_unit(
                json!({"code": "OT", "name": "Operating theatre",
                       "usesRooms": true, "schedulable": true}),
                "OT1",
            )
            .await;
        let room = self
            .created(
                &format!("/api/units/{}/rooms", id_of(&unit)),
                json!({"code": "R1", "name": "Theatre 1"}),
            )
            .await;
        let table = self
            .created(
                "/api/resources",
                json!({"unitId": unit["id"], "roomId": room["id"], "code": "T1",
                       "name": "Table 1", "resourceType": "OT_TABLE", "isSchedulable": true}),
            )
            .await;
        (unit, table)
    }

    async fn book(&self, unit: &Value, table: &Value, start: &str, end: &str) -> (StatusCode, Value) {
        self.post(
            "/api/bookings",
            json!({"unitId": unit["id"], "resourceId": table["id"],
                   "startAt": start, "endAt": end,
                   "consentOk": true, "anesthesiaOk": true, "checklistOk": true}),
        )
        .await
    }
}

fn id_of(value: &Value) -> String {
    value["id"].as_str().expect("record should carry an id").to_string()
}

// ---------------------------------------------------------------------------
// Health check and scope
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_return_ok_when_health_check_called() {
    let app = TestApp::new().await;

    let resp = app
        .router
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn should_reject_request_without_branch_header() {
    let app = TestApp::new().await;

    let resp = app
        .router
        .oneshot(
            Request::builder()
                .uri("/api/locations")
                .header(ACTOR_HEADER, ActorId::new().to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// ---------------------------------------------------------------------------
// Locations
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_compose_codes_and_reconstruct_tree() {
    let app = TestApp::new().await;
    app.seed_site().await;

    let (status, tree) = app.get("/api/locations/tree").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(tree[0]["type"], "CAMPUS");
    assert_eq!(tree[0]["code"], "C01");
    assert_eq!(tree[0]["buildings"][0]["code"], "C01-B01");
    assert_eq!(tree[0]["buildings"][0]["parentId"], tree[0]["id"]);
    let floor = &tree[0]["buildings"][0]["floors"][0];
    assert_eq!(floor["type"], "FLOOR");
    assert_eq!(floor["code"], "C01-B01-F01");
    assert_eq!(floor["floorNumber"], 0);
    assert_eq!(tree[0]["buildings"][0]["floors"][0]["zones"], json!([]));
}

#[tokio::test]
async fn should_show_empty_tree_before_anything_existed() {
    let app = TestApp::new().await;
    app.seed_site().await;

    let (status, tree) = app.get("/api/locations/tree?at=2019-06-01T00:00:00Z").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(tree, json!([]));
}

#[tokio::test]
async fn should_enforce_temporal_code_uniqueness() {
    let app = TestApp::new().await;
    let campus = app
        .created(
            "/api/locations",
            json!({"kind": "CAMPUS", "code": "C01", "name": "Main campus",
                   "effectiveFrom": "2020-01-01T00:00:00Z"}),
        )
        .await;
    app.created(
        "/api/locations",
        json!({"kind": "BUILDING", "parentId": campus["id"], "code": "B01", "name": "Old wing",
               "effectiveFrom": "2020-01-01T00:00:00Z", "effectiveTo": "2021-01-01T00:00:00Z"}),
    )
    .await;

    let (overlapping, _) = app
        .post(
            "/api/locations",
            json!({"kind": "BUILDING", "parentId": campus["id"], "code": "B01",
                   "name": "Clash", "effectiveFrom": "2020-06-01T00:00:00Z"}),
        )
        .await;
    let (disjoint, later) = app
        .post(
            "/api/locations",
            json!({"kind": "BUILDING", "parentId": campus["id"], "code": "b01",
                   "name": "New wing", "effectiveFrom": "2022-01-01T00:00:00Z"}),
        )
        .await;

    assert_eq!(overlapping, StatusCode::CONFLICT);
    assert_eq!(disjoint, StatusCode::CREATED);
    assert_eq!(later["current"]["code"], "C01-B01");
}

#[tokio::test]
async fn should_reject_floor_under_campus() {
    let app = TestApp::new().await;
    let campus = app
        .created("/api/locations", json!({"kind": "CAMPUS", "code": "C01", "name": "Main"}))
        .await;

    let (status, _) = app
        .post(
            "/api/locations",
            json!({"kind": "FLOOR", "parentId": campus["id"], "code": "F01", "name": "Ground"}),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn should_keep_history_when_revising_location() {
    let app = TestApp::new().await;
    let (_, building, _) = app.seed_site().await;

    let (status, revision) = app
        .send(
            "PATCH",
            &format!("/api/locations/{building}"),
            Some(json!({"name": "Tower A (renovated)", "effectiveFrom": "2024-01-01T00:00:00Z"})),
        )
        .await;
    let (_, detail) = app.get(&format!("/api/locations/{building}")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(revision["code"], "C01-B01");
    assert_eq!(detail["current"]["name"], "Tower A (renovated)");
    assert_eq!(detail["history"].as_array().unwrap().len(), 2);
    assert_eq!(detail["history"][0]["effectiveTo"], "2024-01-01T00:00:00Z");
}

#[tokio::test]
async fn should_hide_locations_of_other_branches() {
    let app = TestApp::new().await;
    let (campus, _, _) = app.seed_site().await;
    let other = TestApp {
        router: app.router.clone(),
        branch: BranchId::new(),
        actor: ActorId::new(),
    };

    let (status, _) = other.get(&format!("/api/locations/{campus}")).await;
    let (_, tree) = other.get("/api/locations/tree").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(tree, json!([]));
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_register_unit_with_type_capabilities() {
    let app = TestApp::new().await;
    let unit = app
        .seed_unit(
            json!({"code": "OT", "name": "Operating theatre",
                   "usesRooms": true, "schedulable": true}),
            "OT1",
        )
        .await;

    let (status, units) = app.get("/api/units").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(units.as_array().unwrap().len(), 1);
    assert_eq!(unit["usesRooms"], true);
    assert_eq!(unit["isActive"], true);
}

#[tokio::test]
async fn should_require_room_for_table_in_room_based_unit() {
    let app = TestApp::new().await;
    let unit = app
        .seed_unit(
            json!({"code": "OT", "name": "Operating theatre",
                   "usesRooms": true, "schedulable": true}),
            "OT1",
        )
        .await;

    let (status, _) = app
        .post(
            "/api/resources",
            json!({"unitId": unit["id"], "code": "T1", "name": "Table 1",
                   "resourceType": "OT_TABLE"}),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Resource state machine
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_require_housekeeping_before_bed_is_available_again() {
    let app = TestApp::new().await;
    let unit = app
        .seed_unit(
            json!({"code": "ICU", "name": "Intensive care", "bedBased": true}),
            "ICU1",
        )
        .await;
    let bed = app
        .created(
            "/api/resources",
            json!({"unitId": unit["id"], "code": "BED1", "name": "Bed 1",
                   "resourceType": "ICU_BED"}),
        )
        .await;
    let state_uri = format!("/api/resources/{}/state", id_of(&bed));

    let (occupied, _) = app.post(&state_uri, json!({"state": "OCCUPIED"})).await;
    let (gated, gate_body) = app.post(&state_uri, json!({"state": "AVAILABLE"})).await;
    let (cleaning, _) = app.post(&state_uri, json!({"state": "CLEANING"})).await;
    let (available, body) = app.post(&state_uri, json!({"state": "AVAILABLE"})).await;

    assert_eq!(occupied, StatusCode::OK);
    assert_eq!(gated, StatusCode::CONFLICT);
    assert!(gate_body["error"].as_str().unwrap().contains("housekeeping"));
    assert_eq!(cleaning, StatusCode::OK);
    assert_eq!(available, StatusCode::OK);
    assert_eq!(body["state"], "AVAILABLE");
}

#[tokio::test]
async fn should_fall_back_to_transition_table_when_gate_disabled() {
    let app = TestApp::new().await;
    let (status, _) = app
        .send(
            "PUT",
            "/api/policy",
            Some(json!({"housekeepingGateEnabled": false,
                        "precheck": {"consent": "BLOCK", "anesthesia": "WARN", "checklist": "BLOCK"}})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let unit = app
        .seed_unit(
            json!({"code": "ICU", "name": "Intensive care", "bedBased": true}),
            "ICU1",
        )
        .await;
    let bed = app
        .created(
            "/api/resources",
            json!({"unitId": unit["id"], "code": "BED1", "name": "Bed 1",
                   "resourceType": "ICU_BED"}),
        )
        .await;
    let state_uri = format!("/api/resources/{}/state", id_of(&bed));

    app.post(&state_uri, json!({"state": "OCCUPIED"})).await;
    let (status, body) = app.post(&state_uri, json!({"state": "AVAILABLE"})).await;

    assert_eq!(status, StatusCode::CONFLICT);
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("OCCUPIED -> AVAILABLE is not allowed"), "{message}");
}

#[tokio::test]
async fn should_require_reason_for_blocking_resource() {
    let app = TestApp::new().await;
    let (_, table) = app.seed_ot_table().await;
    let state_uri = format!("/api/resources/{}/state", id_of(&table));

    let (status, _) = app.post(&state_uri, json!({"state": "BLOCKED"})).await;
    let (ok, body) = app
        .post(&state_uri, json!({"state": "BLOCKED", "reason": "lamp failure"}))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(ok, StatusCode::OK);
    assert_eq!(body["blockedReason"], "lamp failure");
}

// ---------------------------------------------------------------------------
// Scheduling
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_reject_overlapping_booking_but_accept_touching_one() {
    let app = TestApp::new().await;
    let (unit, table) = app.seed_ot_table().await;

    let (first, booking) = app
        .book(&unit, &table, "2030-05-01T10:00:00Z", "2030-05-01T11:00:00Z")
        .await;
    let (overlap, _) = app
        .book(&unit, &table, "2030-05-01T10:30:00Z", "2030-05-01T11:30:00Z")
        .await;
    let (touching, _) = app
        .book(&unit, &table, "2030-05-01T11:00:00Z", "2030-05-01T12:00:00Z")
        .await;

    assert_eq!(first, StatusCode::CREATED);
    assert_eq!(booking["status"], "SCHEDULED");
    assert_eq!(booking["warnings"], json!([]));
    assert_eq!(overlap, StatusCode::CONFLICT);
    assert_eq!(touching, StatusCode::CREATED);
}

#[tokio::test]
async fn should_block_booking_without_consent() {
    let app = TestApp::new().await;
    let (unit, table) = app.seed_ot_table().await;

    let (status, _) = app
        .post(
            "/api/bookings",
            json!({"unitId": unit["id"], "resourceId": table["id"],
                   "startAt": "2030-05-01T10:00:00Z", "endAt": "2030-05-01T11:00:00Z",
                   "anesthesiaOk": true, "checklistOk": true}),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn should_free_window_after_cancel_and_refuse_second_cancel() {
    let app = TestApp::new().await;
    let (unit, table) = app.seed_ot_table().await;
    let (_, booking) = app
        .book(&unit, &table, "2030-05-01T10:00:00Z", "2030-05-01T11:00:00Z")
        .await;
    let cancel_uri = format!("/api/bookings/{}/cancel", id_of(&booking));

    let (first, cancelled) = app.post(&cancel_uri, json!({"reason": "patient unwell"})).await;
    let (second, _) = app.post(&cancel_uri, json!({"reason": "again"})).await;
    let (rebooked, _) = app
        .book(&unit, &table, "2030-05-01T10:00:00Z", "2030-05-01T11:00:00Z")
        .await;

    assert_eq!(first, StatusCode::OK);
    assert_eq!(cancelled["status"], "CANCELLED");
    assert_eq!(cancelled["cancelReason"], "patient unwell");
    assert_eq!(second, StatusCode::CONFLICT);
    assert_eq!(rebooked, StatusCode::CREATED);
}

#[tokio::test]
async fn should_refuse_unit_deactivation_with_upcoming_bookings() {
    let app = TestApp::new().await;
    let (unit, table) = app.seed_ot_table().await;
    app.book(&unit, &table, "2030-05-01T10:00:00Z", "2030-05-01T11:00:00Z")
        .await;

    let (status, _) = app
        .post(
            &format!("/api/units/{}/deactivate", id_of(&unit)),
            json!({"reason": "renovation"}),
        )
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_serve_default_policy() {
    let app = TestApp::new().await;

    let (status, policy) = app.get("/api/policy").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(policy["housekeepingGateEnabled"], true);
    assert_eq!(policy["precheck"]["consent"], "BLOCK");
}
