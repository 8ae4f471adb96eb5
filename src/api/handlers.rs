use crate::api::responses::{
    DistanceResponse, HealthErrorCode, HealthErrorResponse, HealthStatus, HealthSuccessResponse,
};
use crate::state::{AppState, ControlStatus, Reading, SharedState};
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use std::fmt;
use std::sync::{PoisonError, RwLockReadGuard};
use std::time::SystemTime;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{error, warn};

const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";
const INDEX_TEMPLATE: &str = include_str!("../../templates/index.html");

#[derive(Debug)]
enum TimestampError {
    Format(time::error::Format),
}

impl fmt::Display for TimestampError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimestampError::Format(err) => write!(f, "timestamp format error: {err}"),
        }
    }
}

pub async fn get_index(State(state): State<SharedState>) -> Html<String> {
    Html(render_index(latest_reading(&state)))
}

pub async fn get_distance(State(state): State<SharedState>) -> Json<DistanceResponse> {
    Json(build_distance_response(latest_reading(&state)))
}

pub enum HealthResponse {
    Success {
        status: StatusCode,
        body: HealthSuccessResponse,
    },
    Error {
        status: StatusCode,
        body: HealthErrorResponse,
    },
}

impl IntoResponse for HealthResponse {
    fn into_response(self) -> Response {
        match self {
            HealthResponse::Success { status, body } => (status, Json(body)).into_response(),
            HealthResponse::Error { status, body } => (status, Json(body)).into_response(),
        }
    }
}

pub async fn get_health(State(state): State<SharedState>) -> impl IntoResponse {
    build_health_response(&state, SystemTime::now())
}

/// The slot holds a `Copy` value replaced whole under the lock, so a
/// poisoned lock still guards a complete reading.
fn latest_reading(state: &SharedState) -> Reading {
    read_recovering(state).reading()
}

fn read_recovering(state: &SharedState) -> RwLockReadGuard<'_, AppState> {
    state.read().unwrap_or_else(|poisoned| {
        warn!("State lock poisoned, serving last stored reading");
        PoisonError::into_inner(poisoned)
    })
}

fn render_index(reading: Reading) -> String {
    let band = reading
        .band
        .map(|band| band.to_string())
        .unwrap_or_else(|| "waiting for first reading".to_string());
    INDEX_TEMPLATE
        .replace("{{ distance }}", &format!("{:.2}", reading.distance_cm))
        .replace("{{ band }}", &band)
}

fn build_distance_response(reading: Reading) -> DistanceResponse {
    DistanceResponse {
        distance: reading.distance_cm,
    }
}

fn build_health_response(state: &SharedState, now: SystemTime) -> HealthResponse {
    let guard = match state.read() {
        Ok(guard) => guard,
        Err(_) => {
            return health_internal_error("state lock poisoned while reading status");
        }
    };
    let reading = guard.reading();
    let control_status = guard.status().clone();
    drop(guard);

    let (status, reason) = match control_status {
        ControlStatus::Starting => (HealthStatus::Starting, None),
        ControlStatus::Running => (HealthStatus::Ok, None),
        ControlStatus::Faulted { reason } => (HealthStatus::Degraded, Some(reason)),
        ControlStatus::Stopped => (HealthStatus::Stopped, None),
    };

    let timestamp = match format_timestamp(now) {
        Ok(formatted) => formatted,
        Err(_) => return health_internal_error("timestamp formatting failure"),
    };
    let last_reading = match reading.timestamp.map(format_timestamp).transpose() {
        Ok(formatted) => formatted,
        Err(_) => return health_internal_error("reading timestamp formatting failure"),
    };

    let status_code = match status {
        HealthStatus::Ok | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Starting | HealthStatus::Stopped => StatusCode::SERVICE_UNAVAILABLE,
    };

    HealthResponse::Success {
        status: status_code,
        body: HealthSuccessResponse {
            status,
            timestamp,
            last_reading,
            reason,
        },
    }
}

fn format_timestamp(timestamp: SystemTime) -> Result<String, TimestampError> {
    let datetime = OffsetDateTime::from(timestamp);
    datetime.format(&Rfc3339).map_err(TimestampError::Format)
}

fn health_internal_error(message: &str) -> HealthResponse {
    error!(message = message, "Internal error while handling /health");
    let formatted = format_timestamp(SystemTime::now()).unwrap_or_else(|err| {
        error!(error = %err, "Failed to format health error timestamp");
        "1970-01-01T00:00:00Z".to_string()
    });

    HealthResponse::Error {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: HealthErrorResponse {
            error_code: HealthErrorCode::InternalError,
            error_message: INTERNAL_ERROR_MESSAGE.to_string(),
            timestamp: formatted,
        },
    }
}
