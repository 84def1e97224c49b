use axum::{
    Router,
    extract::{Json, Query, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

use crate::core::{
    AssumptionOverrides, AssumptionPreset, Assumptions, CashflowReport, PropertyInput, compute,
};
use crate::error::{CashflowError, CashflowResult};
use crate::export::{ExportRecord, ExportSink};
use crate::store::{AssumptionStore, resolve_assumptions};

type SharedSink = Arc<Mutex<Box<dyn ExportSink + Send>>>;

#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn AssumptionStore>,
    sink: SharedSink,
}

impl AppState {
    pub fn new(store: Arc<dyn AssumptionStore>, sink: Box<dyn ExportSink + Send>) -> Self {
        Self {
            store,
            sink: Arc::new(Mutex::new(sink)),
        }
    }
}

/// Listing body as posted by a data source. Accepts the scraper's legacy
/// key names alongside the canonical ones.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct AnalyzePayload {
    address: Option<String>,
    url: Option<String>,
    price: Option<f64>,
    #[serde(
        alias = "monthlyRentOverride",
        alias = "zestimateRent",
        alias = "rentZestimate"
    )]
    monthly_rent: Option<f64>,
    bedrooms: Option<u32>,
    bathrooms: Option<f64>,
    #[serde(alias = "livingArea")]
    sqft: Option<f64>,
    year_built: Option<u32>,
    #[serde(alias = "hoaFee")]
    monthly_hoa: Option<f64>,
    #[serde(alias = "monthlyPropertyTaxOverride", alias = "propertyTax")]
    monthly_property_tax: Option<f64>,
    #[serde(alias = "monthlyInsuranceOverride", alias = "insurance")]
    monthly_insurance: Option<f64>,

    preset: Option<AssumptionPreset>,
    assumptions: Option<AssumptionOverrides>,
}

#[derive(Debug)]
struct AnalyzeRequest {
    input: PropertyInput,
    preset: AssumptionPreset,
    overrides: AssumptionOverrides,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AssumptionsQuery {
    preset: Option<AssumptionPreset>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AssumptionsResponse {
    preset: AssumptionPreset,
    assumptions: Assumptions,
    overrides: AssumptionOverrides,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportResponse {
    record: ExportRecord,
    report: CashflowReport,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/analyze", post(analyze_handler))
        .route(
            "/api/assumptions",
            get(get_assumptions_handler)
                .put(put_assumptions_handler)
                .delete(delete_assumptions_handler),
        )
        .route("/api/export", post(export_handler))
        .fallback(not_found_handler)
        .with_state(state)
}

pub async fn run_http_server(port: u16, state: AppState) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = router(state);

    let listener = TcpListener::bind(addr).await?;
    info!("cashflow HTTP API listening on http://{addr}");
    println!("Rental cashflow API listening on http://{addr}");
    println!("Local access: http://127.0.0.1:{port}/api/analyze");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn analyze_handler(
    State(state): State<AppState>,
    Json(payload): Json<AnalyzePayload>,
) -> Response {
    match analyze(&state, payload) {
        Ok(report) => json_response(StatusCode::OK, report),
        Err(err) => cashflow_error_response(&err),
    }
}

async fn export_handler(
    State(state): State<AppState>,
    Json(payload): Json<AnalyzePayload>,
) -> Response {
    let report = match analyze(&state, payload) {
        Ok(report) => report,
        Err(err) => return cashflow_error_response(&err),
    };
    let record = ExportRecord::from_report(&report);

    if let Err(err) = append_record(state.sink.clone(), record.clone()).await {
        return cashflow_error_response(&err);
    }

    json_response(StatusCode::OK, ExportResponse { record, report })
}

async fn get_assumptions_handler(
    State(state): State<AppState>,
    Query(query): Query<AssumptionsQuery>,
) -> Response {
    let preset = query.preset.unwrap_or_default();
    match assumptions_response(state.store.as_ref(), preset) {
        Ok(body) => json_response(StatusCode::OK, body),
        Err(err) => cashflow_error_response(&err),
    }
}

async fn put_assumptions_handler(
    State(state): State<AppState>,
    Json(overrides): Json<AssumptionOverrides>,
) -> Response {
    let preset = AssumptionPreset::default();
    let saved = overrides
        .apply_to(&preset.assumptions())
        .validate()
        .and_then(|_| state.store.save(&overrides));
    if let Err(err) = saved {
        return cashflow_error_response(&err);
    }

    info!("assumption overrides replaced");
    match assumptions_response(state.store.as_ref(), preset) {
        Ok(body) => json_response(StatusCode::OK, body),
        Err(err) => cashflow_error_response(&err),
    }
}

async fn delete_assumptions_handler(State(state): State<AppState>) -> Response {
    if let Err(err) = state.store.reset() {
        return cashflow_error_response(&err);
    }

    info!("assumption overrides reset to defaults");
    match assumptions_response(state.store.as_ref(), AssumptionPreset::default()) {
        Ok(body) => json_response(StatusCode::OK, body),
        Err(err) => cashflow_error_response(&err),
    }
}

async fn append_record(sink: SharedSink, record: ExportRecord) -> CashflowResult<()> {
    tokio::task::spawn_blocking(move || {
        let mut sink = sink
            .lock()
            .map_err(|_| CashflowError::Config("export sink lock poisoned".to_string()))?;
        sink.append(&record)
    })
    .await
    .map_err(|e| CashflowError::Config(format!("export task failed: {e}")))?
}

fn analyze(state: &AppState, payload: AnalyzePayload) -> CashflowResult<CashflowReport> {
    let request = analyze_request_from_payload(payload)?;
    let assumptions =
        resolve_assumptions(state.store.as_ref(), request.preset, &request.overrides)?;
    Ok(compute(&request.input, &assumptions))
}

fn assumptions_response(
    store: &dyn AssumptionStore,
    preset: AssumptionPreset,
) -> CashflowResult<AssumptionsResponse> {
    let overrides = store.load()?;
    Ok(AssumptionsResponse {
        preset,
        assumptions: overrides.apply_to(&preset.assumptions()),
        overrides,
    })
}

#[cfg(test)]
fn analyze_request_from_json(json: &str) -> Result<AnalyzeRequest, String> {
    let payload = serde_json::from_str::<AnalyzePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    analyze_request_from_payload(payload).map_err(|e| e.to_string())
}

fn analyze_request_from_payload(payload: AnalyzePayload) -> CashflowResult<AnalyzeRequest> {
    let Some(price) = payload.price else {
        return Err(CashflowError::MissingPrice);
    };

    let input = PropertyInput {
        price,
        monthly_rent_override: payload.monthly_rent,
        bedrooms: payload.bedrooms,
        bathrooms: payload.bathrooms,
        sqft: payload.sqft,
        year_built: payload.year_built,
        monthly_hoa: payload.monthly_hoa,
        monthly_property_tax_override: payload.monthly_property_tax,
        monthly_insurance_override: payload.monthly_insurance,
        address: payload.address,
        url: payload.url,
    };
    input.validate()?;

    Ok(AnalyzeRequest {
        input,
        preset: payload.preset.unwrap_or_default(),
        overrides: payload.assumptions.unwrap_or_default(),
    })
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

fn cashflow_error_response(err: &CashflowError) -> Response {
    let status = if err.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    warn!("request failed with {status}: {err}");
    let msg = match err {
        CashflowError::Validation(msg) => msg.clone(),
        other => other.to_string(),
    };
    error_response(status, &msg)
}
