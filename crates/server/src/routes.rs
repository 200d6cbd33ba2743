//! HTTP surface.
//!
//! Read endpoints never fail the request: a store problem comes back as a
//! 200 with an `"error"` key next to an empty payload. The write endpoints
//! (`/add-reading`, `/update-row`) answer with a non-2xx status instead.

use crate::service::{AddedReading, History, LedgerService, RowUpdate};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use indexmap::IndexMap;
use ledgerline_core::{CellValue, LedgerError, Reading, Record, Stats};
use ledgerline_report::{REPORT_FILE_NAME, XLSX_CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

type AppState = Arc<LedgerService>;

/// Health check response.
#[derive(Serialize, Deserialize)]
pub struct Health {
    /// Server status ("ok" when healthy).
    pub status: String,
    /// Server version from Cargo.toml.
    pub version: String,
}

/// Uniform response body: a payload, an error, or both when degraded.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Envelope<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            data: Some(data),
            error: None,
        })
    }

    fn failed(err: &LedgerError) -> Json<Self> {
        Json(Self {
            data: None,
            error: Some(err.to_string()),
        })
    }

    fn degraded(data: T, err: &LedgerError) -> Json<Self> {
        Json(Self {
            data: Some(data),
            error: Some(err.to_string()),
        })
    }
}

/// Write-path failure, rendered with a status matching its kind.
#[derive(Debug)]
pub struct ApiError(LedgerError);

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(LedgerError::validation(format!(
            "invalid request body: {}",
            rejection.body_text()
        )))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
            LedgerError::Validation(_) => StatusCode::BAD_REQUEST,
            LedgerError::Upstream(_) => StatusCode::BAD_GATEWAY,
            LedgerError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::warn!(status = %status, error = %self.0, "write request failed");
        let body = json!({ "error": self.0.to_string(), "kind": self.0.kind() });
        (status, Json(body)).into_response()
    }
}

/// Body of `POST /add-reading`.
#[derive(Debug, Deserialize)]
pub struct AddReadingRequest {
    pub project_name: String,
    #[serde(flatten)]
    pub reading: Reading,
}

/// Body of `PUT /update-row`.
#[derive(Debug, Deserialize)]
pub struct UpdateRowRequest {
    pub project_name: String,
    #[serde(alias = "date")]
    pub period_label: String,
    #[serde(alias = "fields")]
    pub updates: IndexMap<String, JsonValue>,
}

#[derive(Debug, Serialize)]
pub struct EmployeeCheck {
    pub employee_id: String,
    pub authorized: bool,
}

/// Health check endpoint handler.
pub async fn health() -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn projects(State(service): State<AppState>) -> Json<Envelope<Vec<Record>>> {
    match service.projects().await {
        Ok(table) => Envelope::ok(table.records.clone()),
        Err(err) => {
            tracing::warn!(error = %err, "projects unavailable");
            Envelope::degraded(Vec::new(), &err)
        }
    }
}

async fn columns(State(service): State<AppState>) -> Json<Envelope<Vec<String>>> {
    match service.columns().await {
        Ok(columns) => Envelope::ok(columns),
        Err(err) => {
            tracing::warn!(error = %err, "columns unavailable");
            Envelope::degraded(Vec::new(), &err)
        }
    }
}

async fn stats(State(service): State<AppState>) -> Json<Envelope<Stats>> {
    match service.stats().await {
        Ok(stats) => Envelope::ok(stats),
        Err(err) => {
            tracing::warn!(error = %err, "stats unavailable");
            Envelope::failed(&err)
        }
    }
}

async fn verify_employee(
    State(service): State<AppState>,
    Path(employee_id): Path<String>,
) -> Json<Envelope<EmployeeCheck>> {
    match service.verify_employee(&employee_id).await {
        Ok(authorized) => Envelope::ok(EmployeeCheck {
            employee_id,
            authorized,
        }),
        Err(err) => {
            tracing::warn!(error = %err, "employee whitelist unavailable");
            Envelope::degraded(
                EmployeeCheck {
                    employee_id,
                    authorized: false,
                },
                &err,
            )
        }
    }
}

async fn history(
    State(service): State<AppState>,
    Path(project_name): Path<String>,
) -> Json<Envelope<History>> {
    match service.history(&project_name).await {
        Ok(history) => Envelope::ok(history),
        Err(err) => {
            tracing::warn!(project = %project_name, error = %err, "history unavailable");
            Envelope::failed(&err)
        }
    }
}

async fn add_reading(
    State(service): State<AppState>,
    payload: Result<Json<AddReadingRequest>, JsonRejection>,
) -> Result<Json<Envelope<AddedReading>>, ApiError> {
    let Json(request) = payload?;
    let added = service
        .add_reading(&request.project_name, &request.reading)
        .await?;
    Ok(Envelope::ok(added))
}

async fn update_row(
    State(service): State<AppState>,
    payload: Result<Json<UpdateRowRequest>, JsonRejection>,
) -> Result<Json<Envelope<RowUpdate>>, ApiError> {
    let Json(request) = payload?;
    let updates: IndexMap<String, CellValue> = request
        .updates
        .into_iter()
        .map(|(name, value)| (name, json_to_cell(value)))
        .collect();
    let update = service
        .update_row(&request.project_name, &request.period_label, &updates)
        .await?;
    Ok(Envelope::ok(update))
}

async fn generate_report(
    State(service): State<AppState>,
    payload: Result<Json<Vec<String>>, JsonRejection>,
) -> Response {
    let columns = match payload {
        Ok(Json(columns)) => columns,
        Err(rejection) => return ApiError::from(rejection).into_response(),
    };
    match service.report(&columns).await {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{REPORT_FILE_NAME}\""),
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(err) => {
            tracing::warn!(error = %err, "report generation failed");
            Envelope::<()>::failed(&err).into_response()
        }
    }
}

/// Convert a JSON field value into a cell write.
fn json_to_cell(value: JsonValue) -> CellValue {
    match value {
        JsonValue::String(s) => CellValue::Text(s),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => CellValue::Int(i),
            None => CellValue::Float(n.as_f64().unwrap_or_default()),
        },
        JsonValue::Null => CellValue::Text(String::new()),
        JsonValue::Bool(b) => CellValue::Text(if b { "TRUE" } else { "FALSE" }.to_string()),
        other => CellValue::Text(other.to_string()),
    }
}

/// Create the application router.
///
/// This is separated from `main()` to allow testing.
pub fn create_router(service: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/projects", get(projects))
        .route("/columns", get(columns))
        .route("/stats", get(stats))
        .route("/verify-employee/:employee_id", get(verify_employee))
        .route("/history/:project_name", get(history))
        .route("/add-reading", post(add_reading))
        .route("/update-row", put(update_row))
        .route("/generate-report", post(generate_report))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TableNames;
    use axum::body::Body;
    use axum::http::Request;
    use ledgerline_store::MemoryStore;
    use std::time::Duration;
    use tower::ServiceExt;

    fn store() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::with_tables([
            (
                "Project_Data",
                vec![
                    vec!["", "", "", "", ""],
                    vec![
                        "Name",
                        "Plant Type",
                        "Installed Capacity (MW)",
                        "April-25 Payment",
                        "May-25 Payment",
                    ],
                    vec!["Allianz", "Solar", "10", "400", "1,000"],
                    vec!["Sunrise", "Wind", "2.5", "600", "500"],
                ],
            ),
            ("Employees", vec![vec!["E001"], vec!["E002"]]),
            (
                "Allianz Power Project",
                vec![
                    vec!["", "", "EXPORT", "", "", "", "IMPORT", "", "", "", "BILL", "", ""],
                    vec![
                        "MONTH", "MF", "Previous", "Current", "Diff", "Energy", "Previous", "Current",
                        "Diff", "Energy", "Net Export", "Rate", "Amount",
                    ],
                    vec!["Apr-25", "2", "0", "100", "0", "0", "0", "50", "0", "0", "0", "5", "0"],
                ],
            ),
            (
                "Broken Ledger",
                vec![
                    vec!["", ""],
                    vec!["MONTH", "MF"],
                    vec!["Total", "n/a", "", "", "", "", "", "", "", "", "", "", ""],
                ],
            ),
        ]))
    }

    fn app(store: &Arc<MemoryStore>) -> Router {
        let service = LedgerService::new(store.clone(), TableNames::default(), Duration::from_secs(300));
        create_router(Arc::new(service))
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, JsonValue) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn json_req(method: &str, uri: &str, body: &JsonValue) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint_body() {
        let (status, body) = send(app(&store()), get_req("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_projects_endpoint() {
        let (status, body) = send(app(&store()), get_req("/projects")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
        assert_eq!(body["data"][1]["Name"], "Sunrise");
        assert!(body.get("error").is_none());
    }

    #[tokio::test]
    async fn test_columns_endpoint() {
        let (_, body) = send(app(&store()), get_req("/columns")).await;
        assert_eq!(body["data"][2], "Installed Capacity (MW)");
        assert_eq!(body["data"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_stats_endpoint() {
        let (status, body) = send(app(&store()), get_req("/stats")).await;
        assert_eq!(status, StatusCode::OK);
        let data = &body["data"];
        assert_eq!(data["total_count"], 2);
        assert_eq!(data["total_capacity"], 12.5);
        assert_eq!(data["monthly_payments"], json!({"April-25": 1000.0, "May-25": 1500.0}));
        assert_eq!(data["available_months"], json!(["April-25", "May-25"]));
        assert_eq!(data["latest_month"], "May-25");
        assert_eq!(data["latest_payment"], 1500.0);
    }

    #[tokio::test]
    async fn test_read_endpoints_degrade_when_store_is_down() {
        let store = store();
        store.set_offline(true);

        let (status, body) = send(app(&store), get_req("/projects")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], json!([]));
        assert!(body["error"].as_str().unwrap().contains("store offline"));

        let (status, body) = send(app(&store), get_req("/stats")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.get("data").is_none());
        assert!(body["error"].is_string());

        let (status, body) = send(app(&store), get_req("/history/Allianz")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_verify_employee() {
        let (_, body) = send(app(&store()), get_req("/verify-employee/E002")).await;
        assert_eq!(body["data"], json!({"employee_id": "E002", "authorized": true}));

        let (_, body) = send(app(&store()), get_req("/verify-employee/X9")).await;
        assert_eq!(body["data"]["authorized"], false);
    }

    #[tokio::test]
    async fn test_history_endpoint_resolves_partial_name() {
        let (status, body) = send(app(&store()), get_req("/history/allianz")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["sheet"], "Allianz Power Project");
        assert_eq!(body["data"]["columns"][3], "EXPORT - Current");
        assert_eq!(body["data"]["rows"][0][0], "Apr-25");
    }

    #[tokio::test]
    async fn test_history_unknown_project_is_annotated() {
        let (status, body) = send(app(&store()), get_req("/history/Nowhere%20Farm")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["error"].as_str().unwrap().contains("Nowhere Farm"));
    }

    #[tokio::test]
    async fn test_add_reading_endpoint() {
        let store = store();
        let request = json!({
            "project_name": "Allianz",
            "date": "May-25",
            "current_export": 150,
            "current_import": 70,
            "invoice_no": "INV-7"
        });
        let (status, body) = send(app(&store), json_req("POST", "/add-reading", &request)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["bill_amount"], 300);
        assert_eq!(body["data"]["computation"]["net_export"], 60.0);

        let rows = store.rows("Allianz Power Project").await.unwrap();
        assert_eq!(rows.last().unwrap()[14], "INV-7");
    }

    #[tokio::test]
    async fn test_add_reading_unknown_project_is_404() {
        let request = json!({
            "project_name": "Nowhere",
            "date": "May-25",
            "current_export": 1,
            "current_import": 1
        });
        let (status, body) = send(app(&store()), json_req("POST", "/add-reading", &request)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["kind"], "not_found");
    }

    #[tokio::test]
    async fn test_add_reading_without_baseline_is_400() {
        let request = json!({
            "project_name": "Broken Ledger",
            "date": "May-25",
            "current_export": 1,
            "current_import": 1
        });
        let (status, body) = send(app(&store()), json_req("POST", "/add-reading", &request)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "validation");
    }

    #[tokio::test]
    async fn test_add_reading_mistyped_body_is_400() {
        let store = store();
        let request = json!({
            "project_name": "Allianz",
            "date": "May-25",
            "current_export": "150",
            "current_import": 70
        });
        let (status, body) = send(app(&store), json_req("POST", "/add-reading", &request)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "validation");
        assert!(body["error"].as_str().unwrap().starts_with("Validation error: invalid request body"));
        assert_eq!(store.rows("Allianz Power Project").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_malformed_json_body_is_400() {
        let request = Request::builder()
            .method("PUT")
            .uri("/update-row")
            .header("content-type", "application/json")
            .body(Body::from("{\"project_name\": "))
            .unwrap();
        let (status, body) = send(app(&store()), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "validation");
    }

    #[tokio::test]
    async fn test_generate_report_object_body_is_400() {
        let request = json!({"columns": ["Name"]});
        let (status, body) = send(app(&store()), json_req("POST", "/generate-report", &request)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "validation");
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_write_endpoints_store_down_is_502() {
        let store = store();
        store.set_offline(true);
        let request = json!({
            "project_name": "Allianz",
            "date": "May-25",
            "current_export": 1,
            "current_import": 1
        });
        let (status, _) = send(app(&store), json_req("PUT", "/update-row", &json!({
            "project_name": "Allianz",
            "period_label": "Apr-25",
            "updates": {}
        })))
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);

        let (status, body) = send(app(&store), json_req("POST", "/add-reading", &request)).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["kind"], "upstream");
    }

    #[tokio::test]
    async fn test_update_row_endpoint() {
        let store = store();
        let request = json!({
            "project_name": "Allianz Power Project",
            "period_label": "Apr-25",
            "updates": {"BILL - Rate": 6, "Unknown": "x"}
        });
        let (status, body) = send(app(&store), json_req("PUT", "/update-row", &request)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["updated"], 1);
        assert_eq!(body["data"]["row"], 3);
        assert_eq!(body["data"]["ignored"], json!(["Unknown"]));

        let rows = store.rows("Allianz Power Project").await.unwrap();
        assert_eq!(rows[2][11], "6");
    }

    #[tokio::test]
    async fn test_update_row_unknown_period_is_404() {
        let request = json!({
            "project_name": "Allianz",
            "period_label": "Jan-99",
            "updates": {"BILL - Rate": 6}
        });
        let (status, _) = send(app(&store()), json_req("PUT", "/update-row", &request)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_generate_report_is_attachment() {
        let request = json!(["Name", "Installed Capacity (MW)"]);
        let response = app(&store())
            .oneshot(json_req("POST", "/generate-report", &request))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], XLSX_CONTENT_TYPE);
        assert!(response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .contains(REPORT_FILE_NAME));
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(body.starts_with(b"PK"));
    }

    #[tokio::test]
    async fn test_cors_preflight_allows_any_origin() {
        let request = Request::builder()
            .method("OPTIONS")
            .uri("/add-reading")
            .header("origin", "http://dashboard.local")
            .header("access-control-request-method", "POST")
            .body(Body::empty())
            .unwrap();
        let response = app(&store()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
    }

    #[tokio::test]
    async fn test_not_found() {
        let response = app(&store()).oneshot(get_req("/nonexistent")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_json_to_cell() {
        assert_eq!(json_to_cell(json!(6)), CellValue::Int(6));
        assert_eq!(json_to_cell(json!(6.5)), CellValue::Float(6.5));
        assert_eq!(json_to_cell(json!("x")), CellValue::text("x"));
        assert_eq!(json_to_cell(JsonValue::Null), CellValue::text(""));
        assert_eq!(json_to_cell(json!(true)), CellValue::text("TRUE"));
    }
}
