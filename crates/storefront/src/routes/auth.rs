//! Login by one-time code.
//!
//! ```text
//! POST /api/auth/code     {phone | email}          - send a code
//! POST /api/auth/verify   {phone | email, code}    - log in
//! POST /api/auth/logout
//! GET  /api/auth/me
//! PATCH /api/auth/me      {name}
//! ```

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware::map_response,
    routing::{get, post},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use vitrina_core::{Email, Phone};

use crate::db::verification::{CODE_TTL_MINUTES, CodeCheck};
use crate::db::{Contact, UserRepository, VerificationRepository};
use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::extract::Json;
use crate::middleware::{
    RequireAuth, auth_rate_limiter, clear_current_user, rate_limit_envelope, set_current_user,
};
use crate::models::{CurrentUser, User};
use crate::services::verification::generate_verification_code;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    let limited = Router::new()
        .route("/api/auth/code", post(request_code))
        .route("/api/auth/verify", post(verify_code))
        .layer(auth_rate_limiter())
        .layer(map_response(rate_limit_envelope));

    Router::new()
        .merge(limited)
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me).patch(update_me))
}

/// Phone or email the user logs in with. Exactly one must be given.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContactBody {
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl ContactBody {
    fn contact(&self) -> Result<Contact> {
        parse_contact(self.phone.as_deref(), self.email.as_deref())
    }
}

fn parse_contact(phone: Option<&str>, email: Option<&str>) -> Result<Contact> {
    let phone = phone.map(str::trim).filter(|s| !s.is_empty());
    let email = email.map(str::trim).filter(|s| !s.is_empty());
    match (phone, email) {
        (Some(phone), None) => Phone::parse(phone)
            .map(Contact::Phone)
            .map_err(|e| AppError::Validation(e.to_string())),
        (None, Some(email)) => Email::parse(email)
            .map(Contact::Email)
            .map_err(|e| AppError::Validation(e.to_string())),
        (Some(_), Some(_)) => Err(AppError::validation("Give either phone or email, not both")),
        (None, None) => Err(AppError::validation("phone or email is required")),
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerifyBody {
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub code: String,
}

impl VerifyBody {
    fn contact(&self) -> Result<Contact> {
        parse_contact(self.phone.as_deref(), self.email.as_deref())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeSent {
    pub success: bool,
    pub channel: &'static str,
    pub destination: String,
    pub expires_in_seconds: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfile {
    pub name: Option<String>,
}

fn session_error(e: &tower_sessions::session::Error) -> AppError {
    AppError::Unexpected(format!("session error: {e}"))
}

#[instrument(skip(state, body))]
async fn request_code(
    State(state): State<AppState>,
    Json(body): Json<ContactBody>,
) -> Result<Json<CodeSent>> {
    let contact = body.contact()?;
    let code = generate_verification_code();

    VerificationRepository::new(state.pool())
        .issue(&contact, &code, Utc::now())
        .await?;

    let delivery = state.codes().send(&contact, &code).await;
    tracing::info!(
        channel = contact.channel(),
        to = %contact.masked(),
        delivery = ?delivery,
        "Login code issued"
    );

    Ok(Json(CodeSent {
        success: true,
        channel: contact.channel(),
        destination: contact.masked(),
        expires_in_seconds: CODE_TTL_MINUTES * 60,
    }))
}

#[instrument(skip(state, session, body))]
async fn verify_code(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<VerifyBody>,
) -> Result<Json<User>> {
    let contact = body.contact()?;

    let check = VerificationRepository::new(state.pool())
        .check(&contact, body.code.trim(), Utc::now())
        .await?;

    match check {
        CodeCheck::Accepted => {}
        CodeCheck::Rejected => {
            tracing::info!(to = %contact.masked(), "Wrong login code");
            return Err(AppError::validation("Invalid code"));
        }
        CodeCheck::Missing => {
            return Err(AppError::validation("Code expired or not requested"));
        }
    }

    let user = UserRepository::new(state.pool()).find_or_create(&contact).await?;
    let current = CurrentUser {
        id: user.id,
        role: user.role,
    };
    set_current_user(&session, &current)
        .await
        .map_err(|e| session_error(&e))?;
    set_sentry_user(&user.id);

    tracing::info!(user_id = %user.id, role = %user.role, "User logged in");
    Ok(Json(user))
}

#[instrument(skip(session))]
async fn logout(session: Session) -> Result<StatusCode> {
    clear_current_user(&session)
        .await
        .map_err(|e| session_error(&e))?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state), fields(user_id = %user.id))]
async fn me(RequireAuth(user): RequireAuth, State(state): State<AppState>) -> Result<Json<User>> {
    UserRepository::new(state.pool())
        .get_by_id(user.id)
        .await?
        .map(Json)
        .ok_or(AppError::Unauthenticated)
}

#[instrument(skip(state, body), fields(user_id = %user.id))]
async fn update_me(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Json(body): Json<UpdateProfile>,
) -> Result<Json<User>> {
    let name = body.name.as_deref().map(str::trim).filter(|n| !n.is_empty());
    if name.is_some_and(|n| n.chars().count() > 100) {
        return Err(AppError::validation("name must be at most 100 characters"));
    }
    let updated = UserRepository::new(state.pool())
        .set_name(user.id, name)
        .await
        .map_err(|e| super::not_found(e, "User"))?;
    Ok(Json(updated))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn body(phone: Option<&str>, email: Option<&str>) -> ContactBody {
        ContactBody {
            phone: phone.map(str::to_owned),
            email: email.map(str::to_owned),
        }
    }

    #[test]
    fn test_contact_requires_exactly_one() {
        assert!(body(None, None).contact().is_err());
        assert!(body(Some("+79161234567"), Some("a@b.ru")).contact().is_err());
        assert!(body(Some(" "), Some("a@b.ru")).contact().is_ok());
    }

    #[test]
    fn test_contact_normalizes_phone() {
        let contact = body(Some("8 (916) 123-45-67"), None).contact().unwrap();
        assert_eq!(contact.destination(), "+79161234567");
        assert_eq!(contact.channel(), "sms");
    }

    #[test]
    fn test_verify_body_reads_contact() {
        let parsed: VerifyBody =
            serde_json::from_str(r#"{"email":"anna@example.ru","code":"123456"}"#).unwrap();
        assert_eq!(parsed.code, "123456");
        assert_eq!(parsed.contact().unwrap().channel(), "email");
    }
}
