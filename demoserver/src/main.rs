//! The demoserver hosts the alarm controller behind the same http interface
//! the RV dashboard talks to, but runs on linux against a fake I/O board so
//! the alarm can be exercised without the real hardware. Fake inputs (buttons,
//! PIR, trip-wire voltages) are poked over a debug endpoint.

use alarmlib::board::{Board, FakeBoard};
use alarmlib::config::AlarmConfig;
use alarmlib::controller::AlarmController;
use alarmlib::types::{AlarmSnapshot, DisarmRequest};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::Html,
    routing::{get, post},
};
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const INDEX_HTML: &str = include_str!("index.html");

#[derive(Clone)]
struct AppState {
    controller: Arc<Mutex<AlarmController>>,
    // Concrete handle kept alongside the trait object so /debug/input can
    // reach the fake's input maps.
    board: Arc<Mutex<FakeBoard>>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    stderrlog::new()
        .module(module_path!())
        .module("alarmlib")
        .verbosity(log::Level::Info)
        .init()?;

    log::info!("Starting alarm demoserver...");

    let config = match std::env::args().nth(1) {
        Some(path) => AlarmConfig::from_toml_str(&std::fs::read_to_string(&path)?)?,
        None => AlarmConfig::new_with_reasonable_defaults(),
    };

    let board = Arc::new(Mutex::new(FakeBoard::new()));
    let board_dyn: Arc<Mutex<dyn Board + Send>> = board.clone();
    let controller = Arc::new(Mutex::new(AlarmController::new(
        board_dyn,
        config,
        jiff::Timestamp::now(),
    )?));

    let loop_period = {
        let ctl = controller.lock().unwrap();
        log::info!("initial state: {:?}", ctl.snapshot());
        Duration::from_secs_f64(ctl.config().loop_period_secs)
    };

    let tick_controller = controller.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(loop_period);
        loop {
            interval.tick().await;
            tick_controller.lock().unwrap().tick(jiff::Timestamp::now());
        }
    });

    let app = Router::new()
        .route("/", get(root))
        .route("/state", get(state))
        .route("/disarm", post(disarm))
        .route("/debug/input", post(debug_input))
        .with_state(AppState { controller, board });

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
    log::info!("Listening on port 3000");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn root() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn state(
    State(app): State<AppState>,
) -> Result<Json<AlarmSnapshot>, (StatusCode, String)> {
    Ok(Json(app.controller.lock().unwrap().snapshot()))
}

async fn disarm(State(app): State<AppState>, Json(req): Json<DisarmRequest>) -> StatusCode {
    log::info!("/disarm called with {req:?}");
    let honored = app
        .controller
        .lock()
        .unwrap()
        .force_off(req.zone, jiff::Timestamp::now());
    if !honored {
        log::info!("disarm for {:?} dropped by debounce", req.zone);
    }
    StatusCode::OK
}

// Sets one fake input channel, e.g.
//   {"channel": 5, "digital": true}      press the PIR
//   {"channel": 3, "analog": 3.0}        pull a trip-wire tap off its divider
#[derive(Deserialize, Debug)]
struct DebugInput {
    channel: u8,
    #[serde(default)]
    digital: Option<bool>,
    #[serde(default)]
    analog: Option<f32>,
}

async fn debug_input(State(app): State<AppState>, Json(input): Json<DebugInput>) -> StatusCode {
    log::info!("/debug/input called with {input:?}");
    let mut board = app.board.lock().unwrap();
    match (input.digital, input.analog) {
        (Some(level), None) => {
            board.digital_in.insert(input.channel, level);
        }
        (None, Some(volts)) => {
            board.analog_in.insert(input.channel, volts);
        }
        _ => {
            log::error!("/debug/input needs exactly one of digital/analog");
            return StatusCode::BAD_REQUEST;
        }
    }
    StatusCode::OK
}
