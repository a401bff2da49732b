use axum::{
    Router,
    extract::Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

use crate::core::{
    AllocationWeight, AssetPlanEntry, InitialConditions, InvestAllocation, QuantileTransition,
    ReturnDistribution, Simulator, TrialMatrix, YearRatio, YearRecord, achievement_ratio,
    crash_ratio, quantile_transition, totals_in_year,
};

const DEFAULT_INITIAL_YEAR: i32 = 2025;
const DEFAULT_INFLATION_PERCENT: f64 = 2.0;
const DEFAULT_SEED: u64 = 42;
const DEFAULT_TRIALS: u32 = 1_000;
const DEFAULT_THRESHOLD: f64 = 0.0;
const DEFAULT_PERCENTS: [f64; 3] = [50.0, 90.0, 99.0];

// Rates and inflation cross the API in percent; amounts are absolute currency.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    initial_year: Option<i32>,
    initial_cash: Option<f64>,
    initial_invest: Option<f64>,
    inflation_rate: Option<f64>,
    seed: Option<u64>,
    trials: Option<u32>,
    threshold: Option<f64>,
    percents: Option<Vec<f64>>,
    check_year: Option<i32>,
    plan: Vec<PlanEntryPayload>,
    allocations: Vec<Vec<WeightPayload>>,
    distributions: Vec<DistributionPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlanEntryPayload {
    cost: f64,
    income: f64,
    saving_target: f64,
    invest_target: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WeightPayload {
    asset: String,
    weight: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DistributionPayload {
    asset: String,
    outcomes: Vec<OutcomePayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OutcomePayload {
    rate: f64,
    share: f64,
}

#[derive(Debug)]
struct EnsembleOptions {
    trials: u32,
    threshold: f64,
    percents: Vec<f64>,
    check_year: Option<i32>,
}

#[derive(Debug)]
struct ApiRequest {
    simulator: Simulator,
    options: EnsembleOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TrialResponse {
    initial_year: i32,
    horizon: usize,
    records: Vec<YearRecord>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EnsembleResponse {
    trials: u32,
    threshold: f64,
    achievement_ratio: Vec<YearRatio>,
    crash_ratio: Vec<YearRatio>,
    quantile_transition: QuantileTransition,
    check_year: Option<i32>,
    totals_at_check_year: Option<Vec<f64>>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_request(payload: SimulatePayload) -> Result<ApiRequest, String> {
    if payload.plan.is_empty() {
        return Err("plan must contain at least one year".to_string());
    }

    let trials = payload.trials.unwrap_or(DEFAULT_TRIALS);
    if trials == 0 {
        return Err("trials must be > 0".to_string());
    }

    let threshold = payload.threshold.unwrap_or(DEFAULT_THRESHOLD);
    if !threshold.is_finite() {
        return Err("threshold must be a finite number".to_string());
    }

    let percents = payload
        .percents
        .unwrap_or_else(|| DEFAULT_PERCENTS.to_vec());
    if percents.is_empty() {
        return Err("percents must contain at least one entry".to_string());
    }
    for &percent in &percents {
        if !percent.is_finite() || !(0.0..=100.0).contains(&percent) {
            return Err("percents entries must be between 0 and 100".to_string());
        }
    }

    let inflation_percent = payload.inflation_rate.unwrap_or(DEFAULT_INFLATION_PERCENT);
    if !inflation_percent.is_finite() || inflation_percent <= -100.0 {
        return Err("inflationRate must be a percentage > -100".to_string());
    }

    let initial_cash = payload.initial_cash.unwrap_or(0.0);
    let initial_invest = payload.initial_invest.unwrap_or(0.0);
    if !initial_cash.is_finite() || !initial_invest.is_finite() {
        return Err("initialCash and initialInvest must be finite numbers".to_string());
    }

    let mut plan = Vec::with_capacity(payload.plan.len());
    for (index, entry) in payload.plan.iter().enumerate() {
        let amounts = [
            entry.cost,
            entry.income,
            entry.saving_target,
            entry.invest_target,
        ];
        if amounts.iter().any(|v| !v.is_finite()) {
            return Err(format!("plan entry {index}: amounts must be finite numbers"));
        }
        plan.push(AssetPlanEntry {
            cost: entry.cost,
            income: entry.income,
            saving_target: entry.saving_target,
            invest_target: entry.invest_target,
        });
    }

    let mut allocations = Vec::with_capacity(payload.allocations.len());
    for (index, weights) in payload.allocations.iter().enumerate() {
        if weights.iter().any(|w| !w.weight.is_finite()) {
            return Err(format!(
                "allocation entry {index}: weights must be finite numbers"
            ));
        }
        allocations.push(InvestAllocation::new(
            weights
                .iter()
                .map(|w| AllocationWeight {
                    asset: w.asset.clone(),
                    weight: w.weight,
                })
                .collect(),
        ));
    }

    let mut distributions = Vec::with_capacity(payload.distributions.len());
    for dist in &payload.distributions {
        let outcomes: Vec<(f64, f64)> = dist
            .outcomes
            .iter()
            .map(|o| (o.rate / 100.0, o.share))
            .collect();
        distributions
            .push(ReturnDistribution::new(&dist.asset, &outcomes).map_err(|e| e.to_string())?);
    }

    let initial = InitialConditions {
        year: payload.initial_year.unwrap_or(DEFAULT_INITIAL_YEAR),
        cash: initial_cash,
        invest: initial_invest,
        inflation_rate: 1.0 + inflation_percent / 100.0,
        seed: payload.seed.unwrap_or(DEFAULT_SEED),
    };

    let simulator = Simulator::new(distributions, plan, allocations, initial)
        .map_err(|e| e.to_string())?;

    Ok(ApiRequest {
        simulator,
        options: EnsembleOptions {
            trials,
            threshold,
            percents,
            check_year: payload.check_year,
        },
    })
}

fn trial_response(request: &ApiRequest) -> TrialResponse {
    let result = request.simulator.run_single_trial();
    TrialResponse {
        initial_year: request.simulator.initial_year(),
        horizon: request.simulator.horizon(),
        records: result.records,
    }
}

fn ensemble_response(request: &ApiRequest) -> Result<EnsembleResponse, String> {
    let matrix: TrialMatrix = request.simulator.run_ensemble(request.options.trials);

    let totals_at_check_year = match request.options.check_year {
        Some(year) => Some(
            totals_in_year(&matrix, year)
                .map(<[f64]>::to_vec)
                .map_err(|e| e.to_string())?,
        ),
        None => None,
    };

    Ok(EnsembleResponse {
        trials: request.options.trials,
        threshold: request.options.threshold,
        achievement_ratio: achievement_ratio(&matrix, request.options.threshold),
        crash_ratio: crash_ratio(&matrix),
        quantile_transition: quantile_transition(&matrix, &request.options.percents),
        check_year: request.options.check_year,
        totals_at_check_year,
    })
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/api/trial", post(trial_handler))
        .route("/api/ensemble", post(ensemble_handler))
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "asset simulation API listening");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn trial_handler(Json(payload): Json<SimulatePayload>) -> Response {
    let request = match build_request(payload) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };
    json_response(StatusCode::OK, trial_response(&request))
}

async fn ensemble_handler(Json(payload): Json<SimulatePayload>) -> Response {
    let request = match build_request(payload) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };
    match ensemble_response(&request) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
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

#[cfg(test)]
fn api_request_from_json(json: &str) -> Result<ApiRequest, String> {
    let payload = serde_json::from_str::<SimulatePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    build_request(payload)
}
