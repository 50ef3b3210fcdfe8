//! Home page route handler: the paginated item list.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Query, State};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use myshop_core::{Page, PageError, PageRequest};

use super::PageContext;
use super::products::ItemView;
use crate::db::ItemRepository;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::state::AppState;

/// Pagination query parameters.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<String>,
}

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub ctx: PageContext,
    pub item_list: Vec<ItemView>,
    pub is_paginated: bool,
    pub page_number: u64,
    pub num_pages: u64,
    pub previous_page: Option<u64>,
    pub next_page: Option<u64>,
}

fn invalid_page(err: PageError) -> AppError {
    tracing::debug!(error = %err, "Invalid page requested");
    AppError::NotFound("Invalid page".to_string())
}

/// Display one page of the catalog, ten items at a time.
#[instrument(skip_all)]
pub async fn home(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<ListQuery>,
) -> Result<HomeTemplate> {
    let request = PageRequest::from_query(query.page.as_deref()).map_err(invalid_page)?;

    let items = ItemRepository::new(state.pool());
    let window = request.resolve(items.count().await?).map_err(invalid_page)?;
    let page = Page::new(items.list_page(&window).await?, window);

    let currency = state.config().stripe.currency;
    Ok(HomeTemplate {
        ctx: PageContext::load(&state, &session, user).await,
        is_paginated: page.is_paginated(),
        page_number: page.window.number,
        num_pages: page.window.num_pages,
        previous_page: page.previous_page(),
        next_page: page.next_page(),
        item_list: page
            .items
            .iter()
            .map(|item| ItemView::new(item, currency))
            .collect(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use crate::routes::test_support;

    #[tokio::test]
    async fn test_malformed_page_is_not_found() {
        let response = test_support::app()
            .oneshot(
                Request::builder()
                    .uri("/?page=two")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
