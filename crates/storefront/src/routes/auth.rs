//! Authentication route handlers.
//!
//! Local email and password accounts: login, signup and logout. A `next`
//! value carried through the forms returns the user to the page that
//! required login.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::{NextQuery, PageContext, paths};
use crate::error::{Result, auth_message, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::flash;
use crate::forms::local_redirect_target;
use crate::middleware::{OptionalAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::services::AuthService;
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub next: Option<String>,
}

/// Signup form data.
#[derive(Debug, Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirm: String,
    pub next: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub ctx: PageContext,
    pub error: Option<String>,
    pub email: String,
    pub next: Option<String>,
}

/// Signup page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/signup.html")]
pub struct SignupTemplate {
    pub ctx: PageContext,
    pub error: Option<String>,
    pub email: String,
    pub next: Option<String>,
}

/// The local target to continue to after authenticating.
fn continue_to(next: Option<&str>) -> String {
    local_redirect_target(next)
        .unwrap_or(paths::HOME)
        .to_string()
}

/// Keep only a usable `next` for re-rendering forms.
fn keep_next(next: Option<&str>) -> Option<String> {
    local_redirect_target(next).map(String::from)
}

/// Store the user in the session and tag Sentry events with them.
async fn start_session(session: &Session, user: &User) -> Result<()> {
    set_current_user(session, &CurrentUser::from(user)).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
#[instrument(skip_all)]
pub async fn login_page(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<NextQuery>,
) -> Response {
    if user.is_some() {
        return Redirect::to(&continue_to(query.next.as_deref())).into_response();
    }

    LoginTemplate {
        ctx: PageContext::load(&state, &session, None).await,
        error: None,
        email: String::new(),
        next: keep_next(query.next.as_deref()),
    }
    .into_response()
}

/// Handle login form submission.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let user = match AuthService::new(state.pool())
        .login_with_password(&form.email, &form.password)
        .await
    {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!(error = %e, "Login failed");
            let page = LoginTemplate {
                ctx: PageContext::load(&state, &session, None).await,
                error: Some(auth_message(&e)),
                email: form.email,
                next: keep_next(form.next.as_deref()),
            };
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response());
        }
    };

    start_session(&session, &user).await?;
    tracing::info!(user_id = %user.id, "User logged in");
    flash::success(&session, format!("Successfully signed in as {}.", user.email)).await;

    Ok(Redirect::to(&continue_to(form.next.as_deref())).into_response())
}

// =============================================================================
// Signup Routes
// =============================================================================

/// Display the signup page.
#[instrument(skip_all)]
pub async fn signup_page(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<NextQuery>,
) -> Response {
    if user.is_some() {
        return Redirect::to(&continue_to(query.next.as_deref())).into_response();
    }

    SignupTemplate {
        ctx: PageContext::load(&state, &session, None).await,
        error: None,
        email: String::new(),
        next: keep_next(query.next.as_deref()),
    }
    .into_response()
}

/// Handle signup form submission.
///
/// A new account is logged in straight away.
#[instrument(skip_all)]
pub async fn signup(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<SignupForm>,
) -> Result<Response> {
    let registered = if form.password == form.password_confirm {
        AuthService::new(state.pool())
            .register_with_password(&form.email, &form.password)
            .await
            .map_err(|e| auth_message(&e))
    } else {
        Err("Passwords do not match".to_string())
    };

    let user = match registered {
        Ok(user) => user,
        Err(error) => {
            let page = SignupTemplate {
                ctx: PageContext::load(&state, &session, None).await,
                error: Some(error),
                email: form.email,
                next: keep_next(form.next.as_deref()),
            };
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response());
        }
    };

    start_session(&session, &user).await?;
    flash::success(&session, format!("Successfully signed in as {}.", user.email)).await;

    Ok(Redirect::to(&continue_to(form.next.as_deref())).into_response())
}

// =============================================================================
// Logout
// =============================================================================

/// Log out and return to the home page.
#[instrument(skip_all)]
pub async fn logout(session: Session) -> Result<Redirect> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    flash::info(&session, "You have signed out.").await;
    Ok(Redirect::to(paths::HOME))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, header::LOCATION},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::routes::test_support;

    #[test]
    fn test_continue_to_rejects_offsite_targets() {
        assert_eq!(continue_to(Some("/checkout/")), "/checkout/");
        assert_eq!(continue_to(Some("https://evil.example/")), "/");
        assert_eq!(continue_to(None), "/");
        assert_eq!(keep_next(Some("//evil.example")), None);
    }

    #[tokio::test]
    async fn test_signup_password_mismatch_rerenders() {
        let response = test_support::app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/accounts/signup/")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from(
                        "email=me%40example.com&password=longenough&password_confirm=different",
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains("Passwords do not match"));
        assert!(body.contains("me@example.com"));
    }

    #[tokio::test]
    async fn test_logout_redirects_home() {
        let response = test_support::app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/accounts/logout/")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[LOCATION], "/");
    }
}
