use axum::{
    Router,
    extract::{Json, RawQuery},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::core::{
    Dependent, FirmSize, Mode, SimulationInput, SimulationOutput, WALLS, WallDetail, WallId,
    WeeklyHours, simulate, wall_detail,
};
use crate::insights::DashboardInsights;
use crate::state::{DashboardState, QueryParams, dashboard_query, parse_simulation_state};

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    monthly_income: Option<i64>,
    annual_income: Option<u64>,
    months: Option<u32>,
    firm_size: Option<FirmSize>,
    weekly: Option<WeeklyHours>,
    dependent: Option<Dependent>,
    mode: Option<Mode>,
    current_year_income: Option<u64>,
    elapsed_months: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    state: DashboardState,
    /// Query string that reproduces `state` in the dashboard URL.
    query: String,
    input: SimulationInput,
    result: SimulationOutput,
    insights: DashboardInsights,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WallResponse {
    id: WallId,
    label: &'static str,
    threshold: u64,
    modes: Option<&'static [Mode]>,
    detail: &'static WallDetail,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn build_router() -> Router {
    Router::new()
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .route("/api/walls", get(walls_handler))
        .fallback(not_found_handler)
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "tedori HTTP API listening");
    info!("local access: http://127.0.0.1:{port}/api/simulate");

    axum::serve(listener, build_router()).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn simulate_get_handler(RawQuery(query): RawQuery) -> Response {
    let params = QueryParams::parse(query.as_deref().unwrap_or_default());
    let state = parse_simulation_state(&params, &DashboardState::default());
    debug!(params = %params, "simulate via query");
    json_response(StatusCode::OK, build_simulate_response(state))
}

async fn simulate_post_handler(Json(payload): Json<SimulatePayload>) -> Response {
    match state_from_payload(payload) {
        Ok(state) => json_response(StatusCode::OK, build_simulate_response(state)),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
}

async fn walls_handler() -> Response {
    let walls: Vec<WallResponse> = WALLS
        .iter()
        .map(|wall| WallResponse {
            id: wall.id,
            label: wall.label,
            threshold: wall.threshold,
            modes: wall.modes,
            detail: wall_detail(wall.id),
        })
        .collect();
    json_response(StatusCode::OK, walls)
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

/// Overlays the payload on the dashboard defaults. Out-of-range numbers are
/// clamped; only contradictory fields are rejected.
fn state_from_payload(payload: SimulatePayload) -> Result<DashboardState, String> {
    if payload.monthly_income.is_some() && payload.annual_income.is_some() {
        return Err("monthlyIncome and annualIncome are mutually exclusive".to_string());
    }
    if payload.current_year_income.is_some() && payload.elapsed_months.is_some() {
        return Err("currentYearIncome and elapsedMonths are mutually exclusive".to_string());
    }

    let mut state = DashboardState::default();
    if let Some(v) = payload.months {
        state.months = v;
    }
    if let Some(v) = payload.firm_size {
        state.firm_size = v;
    }
    if let Some(v) = payload.weekly {
        state.weekly = v;
    }
    if let Some(v) = payload.dependent {
        state.dependent = v;
    }
    if let Some(v) = payload.mode {
        state.mode = v;
    }
    if let Some(v) = payload.current_year_income {
        state.current_year_income = v;
    }
    let mut state = state.normalized();

    if let Some(v) = payload.monthly_income {
        state = state.with_monthly_income(v);
    }
    if let Some(v) = payload.annual_income {
        state = state.with_annual_income(v);
    }
    if let Some(v) = payload.elapsed_months {
        state = state.with_elapsed_year_income(v);
    }
    Ok(state)
}

fn build_simulate_response(state: DashboardState) -> SimulateResponse {
    let input = state.simulation_input();
    let result = simulate(&input);
    let insights = DashboardInsights::from_state(&state, &result);
    SimulateResponse {
        state,
        query: dashboard_query(&state).to_string(),
        input,
        result,
        insights,
    }
}
