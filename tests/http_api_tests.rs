#![cfg(feature = "http_api")]

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use chrono::{NaiveDate, Weekday};
use route_schedule::http_api::{AppState, router};
use route_schedule::{Frequency, Route, RouteBook};
use serde_json::{Value, json};
use tower::ServiceExt;

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn sample_state() -> AppState {
    let mut weekly = Route::new(1, Weekday::Mon, Frequency::Weekly, d(2024, 1, 1));
    weekly.name = "Oak Street".into();
    weekly.technician_id = Some(7);
    weekly.pool_id = Some(70);

    let mut biweekly = Route::new(2, Weekday::Mon, Frequency::Biweekly, d(2024, 1, 1));
    biweekly.technician_id = Some(7);
    biweekly.anchor_date = Some(d(2024, 1, 1));

    let mut stopped = Route::new(3, Weekday::Mon, Frequency::Weekly, d(2024, 1, 1));
    stopped.stop_after = Some(d(2024, 1, 15));

    let book = RouteBook::from_routes(vec![weekly, biweekly, stopped]).unwrap();
    AppState::new(book).with_fixed_today(d(2024, 1, 8))
}

async fn send(state: AppState, request: Request<Body>) -> (StatusCode, Value) {
    let response = router(state).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn with_json(method: &str, uri: &str, payload: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let (status, body) = send(sample_state(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn lists_routes_in_id_order() {
    let (status, body) = send(sample_state(), get("/routes")).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<i64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|route| route["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(body[0]["dayOfWeek"], "MONDAY");
}

#[tokio::test]
async fn missing_route_is_404() {
    let (status, body) = send(sample_state(), get("/routes/99")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn due_endpoint_follows_biweekly_cadence() {
    let state = sample_state();
    let (status, body) = send(state.clone(), get("/routes/2/due?date=2024-01-15")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["due"], true);

    let (_, body) = send(state, get("/routes/2/due?date=2024-01-22")).await;
    assert_eq!(body["due"], false);
}

#[tokio::test]
async fn due_endpoint_defaults_to_today() {
    // today is pinned to 2024-01-08, an off week for route 2
    let (status, body) = send(sample_state(), get("/routes/2/due")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["date"], "2024-01-08");
    assert_eq!(body["due"], false);
}

#[tokio::test]
async fn bad_date_is_rejected() {
    let (status, body) = send(sample_state(), get("/routes/1/due?date=01-08-2024")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_request");
}

#[tokio::test]
async fn next_endpoint_is_exclusive_unless_asked() {
    let state = sample_state();
    let (_, body) = send(state.clone(), get("/routes/1/next?from=2024-01-08")).await;
    assert_eq!(body["nextDue"], "2024-01-15");

    let (_, body) = send(
        state.clone(),
        get("/routes/1/next?from=2024-01-08&inclusive=true"),
    )
    .await;
    assert_eq!(body["nextDue"], "2024-01-08");

    let (_, body) = send(state, get("/routes/3/next?from=2024-01-15")).await;
    assert_eq!(body["nextDue"], Value::Null);
}

#[tokio::test]
async fn calendar_endpoint_lists_occurrences() {
    let (status, body) = send(
        sample_state(),
        get("/routes/2/calendar?start=2024-01-01&end=2024-02-05"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["occurrences"],
        json!(["2024-01-01", "2024-01-15", "2024-01-29"])
    );
}

#[tokio::test]
async fn calendar_requires_ordered_range() {
    let state = sample_state();
    let (status, _) = send(
        state.clone(),
        get("/routes/2/calendar?start=2024-02-01&end=2024-01-01"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(state, get("/routes/2/calendar?start=2024-02-01")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn technician_assignments_for_date() {
    let (status, body) = send(
        sample_state(),
        get("/technicians/7/assignments?date=2024-01-15"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let assignments = body.as_array().unwrap();
    assert_eq!(assignments.len(), 2);
    assert_eq!(assignments[0]["routeId"], 1);
    assert_eq!(assignments[0]["routeName"], "Oak Street");
    assert_eq!(assignments[0]["poolId"], 70);
    assert_eq!(assignments[1]["routeId"], 2);

    let (_, body) = send(
        sample_state(),
        get("/technicians/7/assignments?date=2024-01-22"),
    )
    .await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn create_update_delete_route() {
    let state = sample_state();
    let payload = json!({
        "id": 10,
        "name": "Cedar Court",
        "dayOfWeek": "THURSDAY",
        "frequency": "CUSTOM",
        "startOn": "2024-01-04",
        "skipWeeks": 2
    });

    let (status, body) = send(state.clone(), with_json("POST", "/routes", payload.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["frequency"], "CUSTOM");

    let (status, body) = send(state.clone(), with_json("POST", "/routes", payload)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    let (_, body) = send(
        state.clone(),
        get("/routes/10/calendar?start=2024-01-01&end=2024-02-29"),
    )
    .await;
    assert_eq!(
        body["occurrences"],
        json!(["2024-01-04", "2024-01-25", "2024-02-15"])
    );

    let update = json!({
        "id": 10,
        "name": "Cedar Court",
        "dayOfWeek": "THURSDAY",
        "frequency": "WEEKLY",
        "startOn": "2024-01-04",
        "active": false
    });
    let (status, body) = send(state.clone(), with_json("PUT", "/routes/10", update)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["active"], false);

    let delete = Request::builder()
        .method("DELETE")
        .uri("/routes/10")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(state.clone(), delete).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(state, get("/routes/10")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_payloads_are_rejected() {
    let state = sample_state();
    let negative_skip = json!({
        "id": 11,
        "dayOfWeek": "MONDAY",
        "frequency": "CUSTOM",
        "startOn": "2024-01-01",
        "skipWeeks": -1
    });
    let (status, body) = send(state.clone(), with_json("POST", "/routes", negative_skip)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .contains("invalid route configuration")
    );

    let stop_before_start = json!({
        "id": 12,
        "dayOfWeek": "MONDAY",
        "frequency": "WEEKLY",
        "startOn": "2024-02-01",
        "stopAfter": "2024-01-01"
    });
    let (status, _) = send(state.clone(), with_json("POST", "/routes", stop_before_start)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mismatched = json!({
        "id": 2,
        "dayOfWeek": "MONDAY",
        "frequency": "WEEKLY",
        "startOn": "2024-01-01"
    });
    let (status, _) = send(state, with_json("PUT", "/routes/1", mismatched)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn next_from_today_honours_inclusive_flag() {
    // today is pinned to Monday 2024-01-08, a visit day for route 1
    let state = sample_state();
    let (status, body) = send(state.clone(), get("/routes/1/next")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["from"], "2024-01-08");
    assert_eq!(body["nextDue"], "2024-01-08");

    let (_, body) = send(state, get("/routes/1/next?inclusive=false")).await;
    assert_eq!(body["nextDue"], "2024-01-15");
}

#[tokio::test]
async fn calendar_range_is_capped() {
    let state = sample_state();
    let (status, body) = send(
        state.clone(),
        get("/routes/1/calendar?start=0001-01-01&end=9999-12-31"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("728 days"));

    let (status, body) = send(
        state,
        get("/routes/1/calendar?start=2024-01-01&end=2025-12-29"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["occurrences"].as_array().unwrap().len(), 105);
}

#[tokio::test]
async fn posted_route_without_id_gets_next_free_id() {
    let state = sample_state();
    let payload = json!({
        "dayOfWeek": "FRIDAY",
        "frequency": "WEEKLY",
        "startOn": "2024-01-05"
    });
    let (status, body) = send(state.clone(), with_json("POST", "/routes", payload)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["id"], 4);

    let (status, _) = send(state, get("/routes/4")).await;
    assert_eq!(status, StatusCode::OK);
}
