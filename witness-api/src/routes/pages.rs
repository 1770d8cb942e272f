/// Home page and the 404 fallback

use axum::{extract::State, response::Html};

use super::{current_user, MaybeAuth};
use crate::{
    app::AppState,
    error::PageError,
    templates::{self, PageContext},
};

pub async fn index(State(state): State<AppState>, auth: MaybeAuth) -> Html<String> {
    Html(templates::index(PageContext::new(
        &state.config.site,
        current_user(&auth),
    )))
}

pub async fn not_found() -> PageError {
    PageError::NotFound
}
