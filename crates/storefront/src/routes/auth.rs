//! Owner account route handlers.
//!
//! JSON endpoints under `/api/auth` plus the two pages reached from links in
//! outgoing mail (`/auth/verify` and `/auth/reset-password`).

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use rounds_core::tokens::TokenError;

use crate::db::{TokenRepository, UserRepository};
use crate::error::{AppError, Result, add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::middleware::{RequireAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::services::auth::{AuthError, AuthService};
use crate::services::Mailer;
use crate::state::AppState;

type Service<'a> = AuthService<'a, UserRepository<'a>, TokenRepository<'a>, Mailer>;

fn auth_service(state: &AppState) -> Service<'_> {
    AuthService::new(
        UserRepository::new(state.pool()),
        TokenRepository::new(state.pool()),
        state.mailer(),
        &state.config().base_url,
    )
}

// =============================================================================
// Request / Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body carrying a token from a mailed link.
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

/// Generic acknowledgement body.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

const FORGOT_PASSWORD_MESSAGE: &str =
    "If an account exists for that email, a password reset link has been sent";

// =============================================================================
// Templates
// =============================================================================

/// Result page for the verification link.
#[derive(Template, WebTemplate)]
#[template(path = "auth/verify_result.html")]
pub struct VerifyResultTemplate {
    pub ok: bool,
    pub message: String,
}

/// Password reset form reached from the reset email.
#[derive(Template, WebTemplate)]
#[template(path = "auth/reset_password.html")]
pub struct ResetPasswordTemplate {
    pub token: String,
    pub error: Option<String>,
    pub done: bool,
}

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordForm {
    pub token: String,
    pub password: String,
    pub password_confirm: String,
}

fn token_failure_message(err: &AuthError) -> String {
    match err {
        AuthError::Token(TokenError::TokenExpired) => {
            "This link has expired. Please request a new one.".to_owned()
        }
        AuthError::Token(TokenError::InvalidToken) => {
            "This link is invalid or has already been used.".to_owned()
        }
        AuthError::WeakPassword(msg) => msg.clone(),
        _ => "Something went wrong. Please try again.".to_owned(),
    }
}

// =============================================================================
// JSON API
// =============================================================================

/// `POST /api/auth/register`
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<impl IntoResponse> {
    let user = auth_service(&state)
        .register(&body.email, &body.password, &body.name, Utc::now())
        .await?;

    add_breadcrumb("auth", "Owner registered", &[("user_id", &user.id.to_string())]);
    Ok((StatusCode::CREATED, Json(user)))
}

/// `POST /api/auth/verify-email`
pub async fn verify_email(
    State(state): State<AppState>,
    Json(body): Json<TokenRequest>,
) -> Result<Json<MessageResponse>> {
    auth_service(&state)
        .verify_email(&body.token, Utc::now())
        .await?;
    Ok(MessageResponse::new("Email verified. You can now sign in."))
}

/// `POST /api/auth/resend-verification`
pub async fn resend_verification(
    State(state): State<AppState>,
    Json(body): Json<EmailRequest>,
) -> Result<Json<MessageResponse>> {
    auth_service(&state)
        .resend_verification(&body.email, Utc::now())
        .await?;
    Ok(MessageResponse::new("Verification email sent"))
}

/// `POST /api/auth/login`
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<LoginRequest>,
) -> Result<Json<User>> {
    let user = auth_service(&state)
        .login(&body.email, &body.password)
        .await
        .inspect_err(|e| {
            if matches!(e, AuthError::InvalidCredentials) {
                tracing::info!("Failed login attempt");
            }
        })?;

    set_current_user(&session, &CurrentUser::from(&user)).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    tracing::info!(user_id = %user.id, "Owner signed in");

    Ok(Json(user))
}

/// `POST /api/auth/logout`
pub async fn logout(session: Session) -> Result<Json<MessageResponse>> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(MessageResponse::new("Signed out"))
}

/// `GET /api/auth/me`
pub async fn me(RequireAuth(user): RequireAuth) -> Json<CurrentUser> {
    Json(user)
}

/// `POST /api/auth/forgot-password`
///
/// Answers the same way whether or not the account exists.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(body): Json<EmailRequest>,
) -> Json<MessageResponse> {
    auth_service(&state)
        .forgot_password(&body.email, Utc::now())
        .await;
    MessageResponse::new(FORGOT_PASSWORD_MESSAGE)
}

/// `POST /api/auth/reset-password`
pub async fn reset_password(
    State(state): State<AppState>,
    Json(body): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>> {
    auth_service(&state)
        .reset_password(&body.token, &body.password, Utc::now())
        .await?;
    Ok(MessageResponse::new("Password updated. You can now sign in."))
}

// =============================================================================
// Mailed-link pages
// =============================================================================

/// `GET /auth/verify?token=`
pub async fn verify_page(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> std::result::Result<VerifyResultTemplate, AppError> {
    match auth_service(&state)
        .verify_email(&query.token, Utc::now())
        .await
    {
        Ok(_) => Ok(VerifyResultTemplate {
            ok: true,
            message: "Your email address is verified. You can now sign in.".to_owned(),
        }),
        Err(e @ (AuthError::Token(_) | AuthError::InvalidEmail(_))) => Ok(VerifyResultTemplate {
            ok: false,
            message: token_failure_message(&e),
        }),
        Err(e) => Err(e.into()),
    }
}

/// `GET /auth/reset-password?token=`
pub async fn reset_password_page(Query(query): Query<TokenQuery>) -> ResetPasswordTemplate {
    ResetPasswordTemplate {
        token: query.token,
        error: None,
        done: false,
    }
}

/// `POST /auth/reset-password`
pub async fn reset_password_submit(
    State(state): State<AppState>,
    Form(form): Form<ResetPasswordForm>,
) -> std::result::Result<ResetPasswordTemplate, AppError> {
    if form.password != form.password_confirm {
        return Ok(ResetPasswordTemplate {
            token: form.token,
            error: Some("Passwords do not match".to_owned()),
            done: false,
        });
    }

    match auth_service(&state)
        .reset_password(&form.token, &form.password, Utc::now())
        .await
    {
        Ok(()) => Ok(ResetPasswordTemplate {
            token: String::new(),
            error: None,
            done: true,
        }),
        Err(e @ (AuthError::Token(_) | AuthError::WeakPassword(_) | AuthError::UserNotFound)) => {
            tracing::warn!(error = %e, "Password reset form rejected");
            Ok(ResetPasswordTemplate {
                token: form.token,
                error: Some(token_failure_message(&e)),
                done: false,
            })
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_failure_messages() {
        assert!(
            token_failure_message(&AuthError::Token(TokenError::TokenExpired)).contains("expired")
        );
        assert!(
            token_failure_message(&AuthError::Token(TokenError::InvalidToken))
                .contains("already been used")
        );
        assert_eq!(
            token_failure_message(&AuthError::WeakPassword("too short".into())),
            "too short"
        );
    }

    #[test]
    fn test_reset_template_renders_token_and_error() {
        let html = ResetPasswordTemplate {
            token: "abc123".into(),
            error: Some("Passwords do not match".into()),
            done: false,
        }
        .render()
        .unwrap_or_default();
        assert!(html.contains("abc123"));
        assert!(html.contains("Passwords do not match"));
    }
}
