/// Error page rendering
///
/// Responses marked with [`ErrorPage`] get their body replaced with the site's HTML error
/// page. Handler panics are caught by `tower-http`'s `CatchPanicLayer` and turned into a
/// marked 500 by [`handle_panic`].

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{Html, IntoResponse, Response},
};
use std::any::Any;

use crate::{
    app::AppState,
    error::ErrorPage,
    templates::{self, PageContext},
};

pub async fn render_error_pages(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let response = next.run(req).await;

    let Some(ErrorPage(status)) = response.extensions().get::<ErrorPage>().copied() else {
        return response;
    };

    let (mut parts, _) = response.into_parts();
    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.remove(header::CONTENT_TYPE);
    let page = Html(templates::error_page(PageContext::anonymous(&state.config.site), status));

    (parts, page).into_response()
}

/// Response for a panicking handler
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic payload"
    };
    tracing::error!(panic = %detail, "Handler panicked");

    ErrorPage::response(StatusCode::INTERNAL_SERVER_ERROR)
}
