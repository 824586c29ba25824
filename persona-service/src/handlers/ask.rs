use crate::models::{AskRequest, AskResponse};
use crate::prompt::build_prompt;
use crate::startup::AppState;
use axum::{extract::State, Json};
use service_core::error::AppError;

/// Answer one question about the persona.
///
/// Exactly one provider call per request. Any provider failure, whatever its
/// cause, becomes `LLM request failed: ...` with status 500.
pub async fn ask(
    State(state): State<AppState>,
    Json(req): Json<AskRequest>,
) -> Result<Json<AskResponse>, AppError> {
    let model = req.model_or(&state.config.gemini.default_model);
    let prompt = build_prompt(state.template, &req.question);

    let output = state
        .chat_model
        .invoke(model, &prompt)
        .await
        .inspect_err(|e| tracing::error!(model = %model, error = %e, "LLM request failed"))?;

    Ok(Json(AskResponse {
        answer: output.into_answer(),
    }))
}
