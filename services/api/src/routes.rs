use crate::infra::{deserialize_day, resolve_as_of, AppState};
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Extension, Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sla_incentives::error::AppError;
use sla_incentives::service::SlaService;
use sla_incentives::workflows::bonus::{format_day_key, BonusOutcome, HeadcountLog};
use sla_incentives::workflows::ingest::EventSnapshot;
use sla_incentives::workflows::sla::{
    ClassifiedEvent, DataQuality, ExclusionStream, Exclusions, MonthlyAdjustment,
    SlaAggregateRecord, SlaScorecard,
};

#[derive(Debug, Deserialize)]
pub(crate) struct RunRequest {
    #[serde(flatten)]
    pub(crate) snapshot: EventSnapshot,
    #[serde(default)]
    pub(crate) as_of: Option<String>,
    #[serde(default)]
    pub(crate) include_events: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct RunResponse {
    pub(crate) aggregate: SlaAggregateRecord,
    pub(crate) scorecard: SlaScorecard,
    pub(crate) bonus: BonusOutcome,
    pub(crate) data_quality: DataQuality,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) events: Option<Vec<ClassifiedEvent>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExclusionRequest {
    pub(crate) stream: ExclusionStream,
    pub(crate) id: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ExclusionResponse {
    pub(crate) site: String,
    pub(crate) stream: ExclusionStream,
    pub(crate) id: String,
    pub(crate) changed: bool,
    pub(crate) exclusions: Exclusions,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HeadcountRequest {
    #[serde(deserialize_with = "deserialize_day")]
    pub(crate) date: NaiveDate,
    pub(crate) operators: u32,
}

#[derive(Debug, Serialize)]
pub(crate) struct HeadcountResponse {
    pub(crate) date: String,
    pub(crate) operators: u32,
    pub(crate) previous: Option<u32>,
    pub(crate) headcount: HeadcountLog,
}

/// Site endpoints. Health, readiness and metrics are added by
/// [`with_operational_routes`].
pub(crate) fn site_router(service: SlaService) -> Router {
    Router::new()
        .route("/api/v1/sites/:site/runs", post(run_endpoint))
        .route("/api/v1/sites/:site/aggregate", get(aggregate_endpoint))
        .route(
            "/api/v1/sites/:site/exclusions",
            get(list_exclusions_endpoint)
                .post(add_exclusion_endpoint)
                .delete(remove_exclusion_endpoint),
        )
        .route("/api/v1/sites/:site/adjustments", put(adjustments_endpoint))
        .route("/api/v1/sites/:site/headcount", put(headcount_endpoint))
        .with_state(service)
}

pub(crate) fn with_operational_routes(router: Router) -> Router {
    router
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn run_endpoint(
    State(service): State<SlaService>,
    Path(site): Path<String>,
    Json(payload): Json<RunRequest>,
) -> Result<Json<RunResponse>, AppError> {
    let RunRequest {
        snapshot,
        as_of,
        include_events,
    } = payload;

    let as_of = resolve_as_of(as_of.as_deref())?;
    let run = service.run(&site, &snapshot, as_of)?;
    let aggregate = run.aggregate_record();
    let events = include_events.then(|| run.classified.clone());

    Ok(Json(RunResponse {
        aggregate,
        scorecard: run.scorecard,
        bonus: run.bonus,
        data_quality: run.data_quality,
        events,
    }))
}

pub(crate) async fn aggregate_endpoint(
    State(service): State<SlaService>,
    Path(site): Path<String>,
) -> Result<Json<SlaAggregateRecord>, AppError> {
    Ok(Json(service.latest_aggregate(&site)?))
}

pub(crate) async fn list_exclusions_endpoint(
    State(service): State<SlaService>,
    Path(site): Path<String>,
) -> Result<Json<Exclusions>, AppError> {
    Ok(Json(service.exclusions(&site)?))
}

pub(crate) async fn add_exclusion_endpoint(
    State(service): State<SlaService>,
    Path(site): Path<String>,
    Json(payload): Json<ExclusionRequest>,
) -> Result<Json<ExclusionResponse>, AppError> {
    let changed = service.add_exclusion(&site, payload.stream, &payload.id)?;
    exclusion_response(&service, site, payload, changed)
}

pub(crate) async fn remove_exclusion_endpoint(
    State(service): State<SlaService>,
    Path(site): Path<String>,
    Json(payload): Json<ExclusionRequest>,
) -> Result<Json<ExclusionResponse>, AppError> {
    let changed = service.remove_exclusion(&site, payload.stream, &payload.id)?;
    exclusion_response(&service, site, payload, changed)
}

fn exclusion_response(
    service: &SlaService,
    site: String,
    payload: ExclusionRequest,
    changed: bool,
) -> Result<Json<ExclusionResponse>, AppError> {
    let exclusions = service.exclusions(&site)?;
    Ok(Json(ExclusionResponse {
        site,
        stream: payload.stream,
        id: payload.id,
        changed,
        exclusions,
    }))
}

pub(crate) async fn adjustments_endpoint(
    State(service): State<SlaService>,
    Path(site): Path<String>,
    Json(adjustment): Json<MonthlyAdjustment>,
) -> Result<Json<MonthlyAdjustment>, AppError> {
    Ok(Json(service.set_adjustments(&site, adjustment)?))
}

pub(crate) async fn headcount_endpoint(
    State(service): State<SlaService>,
    Path(site): Path<String>,
    Json(payload): Json<HeadcountRequest>,
) -> Result<Json<HeadcountResponse>, AppError> {
    let (previous, headcount) = service.set_headcount(&site, payload.date, payload.operators)?;
    Ok(Json(HeadcountResponse {
        date: format_day_key(payload.date),
        operators: payload.operators,
        previous,
        headcount,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use sla_incentives::config::EngineSettings;
    use sla_incentives::store::InMemorySiteStore;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn router() -> Router {
        let store = Arc::new(InMemorySiteStore::new());
        let service = SlaService::new(EngineSettings::default(), store);
        site_router(service)
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router
            .clone()
            .oneshot(request)
            .await
            .expect("router dispatch");
        let status = response.status();
        let body = to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("body");
        let payload = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, payload)
    }

    fn run_body() -> Value {
        json!({
            "as_of": "2025-05-06T18:00:00",
            "include_events": true,
            "orders": [
                {
                    "order_number": "1001",
                    "pending_at": "2025-05-05T09:00:00",
                    "shipping_date": "2025-05-05T14:00:00",
                    "picking_complete": "2025-05-05T11:00:00",
                    "carrier_name": "LOGGI",
                    "Stores__name": "Acme",
                    "status": "complete"
                }
            ],
            "receipts": [
                {
                    "id": "R-1",
                    "arrived_at": "2025-05-05T08:00:00",
                    "completed_at": "2025-05-05T16:00:00"
                }
            ]
        })
    }

    #[tokio::test]
    async fn run_returns_the_aggregate_and_stores_it() {
        let router = router();
        let (status, payload) = send(
            &router,
            json_request("POST", "/api/v1/sites/embu/runs", run_body()),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["aggregate"]["site"], json!("embu"));
        assert_eq!(payload["aggregate"]["hora_agora"], json!("18:00"));
        assert_eq!(payload["data_quality"]["orders"]["scored"], json!(1));
        let events = payload["events"].as_array().expect("events included");
        assert_eq!(events.len(), 3);

        let (status, stored) = send(
            &router,
            Request::builder()
                .method("GET")
                .uri("/api/v1/sites/embu/aggregate")
                .body(Body::empty())
                .expect("request"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stored, payload["aggregate"]);
    }

    #[tokio::test]
    async fn unknown_site_is_not_found() {
        let (status, payload) = send(
            &router(),
            json_request("POST", "/api/v1/sites/itapeva/runs", run_body()),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(payload["error"], json!("unknown site 'itapeva'"));
    }

    #[tokio::test]
    async fn bad_as_of_is_a_client_error() {
        let mut body = run_body();
        body["as_of"] = json!("tomorrow");
        let (status, _) = send(
            &router(),
            json_request("POST", "/api/v1/sites/embu/runs", body),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn exclusions_are_idempotent_over_http() {
        let router = router();
        let body = json!({ "stream": "orders", "id": "1001" });

        let (status, first) = send(
            &router,
            json_request("POST", "/api/v1/sites/embu/exclusions", body.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["changed"], json!(true));

        let (_, second) = send(
            &router,
            json_request("POST", "/api/v1/sites/embu/exclusions", body.clone()),
        )
        .await;
        assert_eq!(second["changed"], json!(false));
        assert_eq!(second["exclusions"]["orders"], json!(["1001"]));

        let (_, removed) = send(
            &router,
            json_request("DELETE", "/api/v1/sites/embu/exclusions", body),
        )
        .await;
        assert_eq!(removed["changed"], json!(true));
        assert_eq!(removed["exclusions"]["orders"], json!([]));
    }

    #[tokio::test]
    async fn adjustments_and_headcount_round_trip() {
        let router = router();
        let (status, adjustment) = send(
            &router,
            json_request(
                "PUT",
                "/api/v1/sites/extrema/adjustments",
                json!({ "ajuste_recibos": 1, "ajuste_picking": 0, "ajuste_pedidos": 2 }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(adjustment["ajuste_pedidos"], json!(2));

        let (status, headcount) = send(
            &router,
            json_request(
                "PUT",
                "/api/v1/sites/extrema/headcount",
                json!({ "date": "05-05-2025", "operators": 14 }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headcount["previous"], Value::Null);
        assert_eq!(headcount["headcount"]["05-05-2025"], json!(14));
    }

    #[tokio::test]
    async fn aggregate_before_any_run_is_not_found() {
        let (status, _) = send(
            &router(),
            Request::builder()
                .method("GET")
                .uri("/api/v1/sites/embu/aggregate")
                .body(Body::empty())
                .expect("request"),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn readiness_follows_the_startup_flag() {
        let readiness = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let metrics = metrics_exporter_prometheus::PrometheusBuilder::new()
            .build_recorder()
            .handle();
        let state = AppState {
            readiness: readiness.clone(),
            metrics: Arc::new(metrics),
        };
        let router = with_operational_routes(router()).layer(Extension(state));
        let ready = || {
            Request::builder()
                .method("GET")
                .uri("/ready")
                .body(Body::empty())
                .expect("request")
        };

        let (status, payload) = send(&router, ready()).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload["status"], json!("initializing"));

        readiness.store(true, std::sync::atomic::Ordering::Release);
        let (status, _) = send(&router, ready()).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn healthcheck_reports_ok() {
        let Json(body) = healthcheck().await;
        assert_eq!(body, json!({ "status": "ok" }));
    }
}
