use axum::{
    Router,
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::post,
};
use chrono::{DateTime, Utc};
use clap::Parser;
use serde::Serialize;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::core::{MetricPoint, Result};

mod scenario;

pub use scenario::{Scenario, load_scenario, scenario_from_json};

#[derive(Parser, Debug, Serialize)]
#[command(
    name = "pfme",
    about = "Projects net worth forward under income, expense, tax and investment strategies"
)]
pub struct Cli {
    #[arg(
        long,
        help = "Path to a JSON scenario: time range, asset providers, strategies and metrics"
    )]
    pub config: PathBuf,
}

/// Recorded series per metric name.
pub type CapturedMetrics = BTreeMap<&'static str, Vec<MetricPoint>>;

#[derive(Debug, Serialize)]
struct RunReport<'a> {
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    args: Option<&'a Cli>,
    metrics: CapturedMetrics,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Runs a scenario to completion and collects every metric's series.
pub fn simulate(scenario: Scenario) -> Result<CapturedMetrics> {
    let metrics = scenario.into_simulation()?.run()?;

    let mut captured = CapturedMetrics::new();
    for metric in metrics {
        let name = metric.name();
        if captured.insert(name, metric.into_values()).is_some() {
            warn!(metric = name, "metric listed twice, keeping the last series");
        }
    }
    Ok(captured)
}

/// Loads the scenario named on the command line, runs it and returns the
/// single-line JSON report.
pub fn run_cli(cli: &Cli) -> Result<String> {
    let scenario = load_scenario(&cli.config)?;

    let start_time = Utc::now();
    let metrics = simulate(scenario)?;
    let end_time = Utc::now();

    let report = RunReport {
        start_time,
        end_time,
        args: Some(cli),
        metrics,
    };
    Ok(serde_json::to_string(&report)?)
}

pub fn router() -> Router {
    Router::new()
        .route("/api/simulate", post(simulate_handler))
        .fallback(not_found_handler)
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "simulation HTTP API listening");
    println!("pfme HTTP API listening on http://{addr}");

    axum::serve(listener, router()).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn simulate_handler(body: String) -> Response {
    let scenario = match scenario_from_json(&body) {
        Ok(scenario) => scenario,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    };

    let start_time = Utc::now();
    let metrics = match simulate(scenario) {
        Ok(metrics) => metrics,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    };
    let end_time = Utc::now();

    json_response(
        StatusCode::OK,
        RunReport {
            start_time,
            end_time,
            args: None,
            metrics,
        },
    )
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
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
