//! Refund request route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use super::{PageContext, paths};
use crate::db::RefundRepository;
use crate::error::Result;
use crate::filters;
use crate::flash;
use crate::forms::{FormErrors, RefundForm};
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// Refund request page template.
#[derive(Template, WebTemplate)]
#[template(path = "request_refund.html")]
pub struct RequestRefundTemplate {
    pub ctx: PageContext,
    pub form: RefundForm,
    pub errors: FormErrors,
}

/// Display the refund request form.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn request_refund_page(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> RequestRefundTemplate {
    let form = RefundForm {
        email: user.email.to_string(),
        ..RefundForm::default()
    };
    RequestRefundTemplate {
        ctx: PageContext::load(&state, &session, Some(user)).await,
        form,
        errors: FormErrors::default(),
    }
}

/// Record a refund request against one of the user's paid orders.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn request_refund(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Form(form): Form<RefundForm>,
) -> Result<Response> {
    let request = match form.validate() {
        Ok(request) => request,
        Err(errors) => {
            let page = RequestRefundTemplate {
                ctx: PageContext::load(&state, &session, Some(user)).await,
                form,
                errors,
            };
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response());
        }
    };

    let refund = match &request.ref_code {
        Some(ref_code) => {
            RefundRepository::new(state.pool())
                .request(user.id, ref_code, &request.message, &request.email)
                .await?
        }
        None => None,
    };

    let (Some(refund), Some(ref_code)) = (refund, request.ref_code) else {
        flash::info(&session, "This order does not exist.").await;
        return Ok(Redirect::to(paths::REQUEST_REFUND).into_response());
    };

    tracing::info!(refund_id = %refund.id, order_id = %refund.order_id, "Refund requested");

    if let Err(e) = state
        .email()
        .send_refund_received(refund.email.as_str(), ref_code.as_str(), &refund.reason)
        .await
    {
        tracing::warn!(error = %e, "Failed to send refund acknowledgement");
    }

    flash::info(&session, "Your request was received.").await;
    Ok(Redirect::to(paths::REQUEST_REFUND).into_response())
}
