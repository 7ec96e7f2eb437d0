use axum::{body::Bytes, extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use serde::Deserialize;
use serde_json::json;

use crate::database::models::Profile;
use crate::error::ApiResult;
use crate::handlers::parse_body;
use crate::middleware::AuthContext;
use crate::services::Signup;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SignupBody {
    pub email: Option<String>,
    pub display_name: Option<String>,
}

/// POST /api/signup - create the caller's profile after client-side signup
///
/// 201 with the new profile, or 200 with the existing one. The email falls
/// back to the one in the verified token.
pub async fn signup_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    let body: SignupBody = parse_body(&body)?;
    let email = body.email.as_deref().or(auth.email.as_deref());
    let display_name = body.display_name.as_deref().unwrap_or_default();

    let response = match state.watchlists.signup(&auth.uid, email, display_name).await? {
        Signup::Created(profile) => (
            StatusCode::CREATED,
            Json(json!({ "message": "Profile created successfully", "profile": profile })),
        ),
        Signup::Existing(profile) => (
            StatusCode::OK,
            Json(json!({ "message": "Profile already exists", "profile": profile })),
        ),
    };
    Ok(response)
}

/// GET /api/profile - the caller's profile, 404 before signup
pub async fn profile_get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Profile>> {
    Ok(Json(state.watchlists.profile(&auth.uid).await?))
}
