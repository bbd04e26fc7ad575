use axum::{
    debug_handler,
    extract::{Extension, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use shared::shared_wheel_game::*;
use shared::spin_limit::{SPIN_IN_PROGRESS_ERROR, SPIN_LIMIT_ERROR};
use time::OffsetDateTime;

use crate::auth::CurrentUser;
use crate::services::wheel_controller::SpinError;
use crate::AppState;

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/spin", post(spin_wheel))
        .route("/status", get(wheel_status))
        .layer(axum::middleware::from_fn(crate::auth::middleware::require_auth))
}

#[debug_handler]
async fn spin_wheel(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(_request): Json<WheelSpinRequest>,
) -> Result<Json<WheelSpinResponse>, (StatusCode, String)> {
    match state.wheel.spin(&user, OffsetDateTime::now_utc()).await {
        Ok(resolution) => {
            let message = if resolution.is_win {
                format!(
                    "Congratulations! Three {:?}s — you won this week's prize! 🎉",
                    resolution.outcome.symbols[0]
                )
            } else {
                "No match this time. Spin again!".to_string()
            };

            Ok(Json(WheelSpinResponse {
                success: true,
                is_win: resolution.is_win,
                symbols: Some(resolution.outcome.symbols),
                message: Some(message),
                remaining_spins: resolution.remaining_spins,
            }))
        }
        Err(SpinError::AlreadySpinning) => Ok(Json(WheelSpinResponse {
            success: false,
            is_win: false,
            symbols: None,
            message: Some(SPIN_IN_PROGRESS_ERROR.to_string()),
            remaining_spins: 0,
        })),
        Err(SpinError::RateLimited { reset_in }) => {
            let message = match reset_in {
                Some(seconds) => format!("Please wait {} seconds before spinning again.", seconds),
                None => SPIN_LIMIT_ERROR.to_string(),
            };
            Ok(Json(WheelSpinResponse {
                success: false,
                is_win: false,
                symbols: None,
                message: Some(message),
                remaining_spins: 0,
            }))
        }
        Err(SpinError::Session(e)) => {
            Err((StatusCode::INTERNAL_SERVER_ERROR, format!("{}", e)))
        }
    }
}

#[debug_handler]
async fn wheel_status(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<WheelStatusResponse>, (StatusCode, String)> {
    let status = state
        .wheel
        .status(user.id, OffsetDateTime::now_utc())
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("{}", e)))?;

    Ok(Json(WheelStatusResponse {
        remaining_spins: status.remaining_spins,
        reset_in_seconds: status.reset_in_seconds,
        weekly_prize_available: status.weekly_prize_available,
    }))
}
