use crate::{error::AppError, state::AppState};
use actix_web::{web, HttpResponse};
use serde_json::json;

/// Current configuration. The upstream credential is reported only as a
/// boolean; the key itself never crosses this boundary.
pub async fn get_config(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let config = state.get_config();

    Ok(HttpResponse::Ok().json(json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "config": {
            "server": {
                "host": config.server.host,
                "port": config.server.port
            },
            "openai": {
                "configured": config.openai_configured(),
                "model": config.openai.model,
                "voice": config.openai.voice,
                "transcription_model": config.openai.transcription_model,
                "spoken_responses": config.openai.spoken_responses
            },
            "vad": {
                "threshold": config.vad.threshold,
                "prefix_padding_ms": config.vad.prefix_padding_ms,
                "silence_duration_ms": config.vad.silence_duration_ms
            },
            "performance": {
                "max_concurrent_sessions": config.performance.max_concurrent_sessions
            }
        }
    })))
}

/// Partial runtime configuration update. Existing sessions keep the
/// settings they connected with; new sessions pick up the changes.
pub async fn update_config(
    state: web::Data<AppState>,
    body: web::Json<serde_json::Value>,
) -> Result<HttpResponse, AppError> {
    let json_str = serde_json::to_string(&body.into_inner())?;

    let mut current_config = state.get_config();
    current_config
        .update_from_json(&json_str)
        .map_err(|err| AppError::BadRequest(err.to_string()))?;

    state
        .update_config(current_config.clone())
        .map_err(AppError::BadRequest)?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "message": "Configuration updated successfully",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "updated_config": {
            "openai": {
                "model": current_config.openai.model,
                "voice": current_config.openai.voice,
                "transcription_model": current_config.openai.transcription_model,
                "spoken_responses": current_config.openai.spoken_responses
            },
            "vad": {
                "threshold": current_config.vad.threshold,
                "prefix_padding_ms": current_config.vad.prefix_padding_ms,
                "silence_duration_ms": current_config.vad.silence_duration_ms
            },
            "performance": {
                "max_concurrent_sessions": current_config.performance.max_concurrent_sessions
            }
        }
    })))
}
