/// API token reset
///
/// # Endpoint
///
/// ```text
/// POST /token-reset
/// Authorization: Token <current key>   (or a session cookie)
/// ```
///
/// # Response
///
/// ```json
/// { "token": "<new 40-character key>" }
/// ```
///
/// The previous key stops working immediately. `GET` answers `405`; anonymous callers
/// get `401`.

use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use witness_shared::{auth::context::AuthContext, models::api_token::ApiToken};

use crate::{app::AppState, error::ApiResult};

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

pub async fn token_reset(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<TokenResponse>> {
    let token = ApiToken::regenerate(&state.db, auth.user.id).await?;

    tracing::info!(user_id = %auth.user.id, method = ?auth.method, "Issued new API token");

    Ok(Json(TokenResponse { token: token.key }))
}
