/// Sign-up, login, logout and account edit
///
/// # Endpoints
///
/// - `GET/POST /sign-up`: create an unconfirmed account and email the confirmation link
/// - `GET/POST /login`: email and password; sets the session cookie
/// - `POST /logout`: clears the session cookie
/// - `GET/POST /account`: profile form and API key (session required)

use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    Extension,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use witness_shared::{
    auth::context::AuthContext,
    models::{
        api_token::ApiToken,
        user::{NewUser, User},
        ModelError,
    },
};

use super::{current_user, password::send_confirmation_email, MaybeAuth};
use crate::{
    app::AppState,
    error::{PageError, PageResult},
    forms::{FormErrors, LoginForm, PageForm, UserForm},
    middleware::auth::{end_session, start_session},
    templates::{self, PageContext},
};

const DUPLICATE_EMAIL: &str = "A user with that email address already exists.";

/// Redirect target after login, if it stays on this site
///
/// Only absolute paths are accepted; scheme-relative (`//host`) and backslash tricks
/// are refused.
pub fn safe_next(next: Option<&str>) -> Option<&str> {
    let next = next?.trim();
    let on_site = next.starts_with('/')
        && !next.starts_with("//")
        && !next.contains('\\')
        && !next.chars().any(char::is_control);
    on_site.then_some(next)
}

pub async fn sign_up_form(State(state): State<AppState>, auth: MaybeAuth) -> Html<String> {
    let ctx = PageContext::new(&state.config.site, current_user(&auth));
    Html(templates::sign_up(ctx, &UserForm::default(), &FormErrors::new()))
}

pub async fn sign_up(
    State(state): State<AppState>,
    auth: MaybeAuth,
    PageForm(form): PageForm<UserForm>,
) -> PageResult<Html<String>> {
    let ctx = PageContext::new(&state.config.site, current_user(&auth));

    if let Err(errors) = form.check() {
        return Ok(Html(templates::sign_up(ctx, &form, &errors)));
    }

    let data = NewUser::new(form.email.trim()).name(form.first_name.trim(), form.last_name.trim());
    let user = match User::create(&state.db, data).await {
        Ok(user) => user,
        Err(ModelError::DuplicateEmail) => {
            let mut errors = FormErrors::new();
            errors.add("email", DUPLICATE_EMAIL);
            return Ok(Html(templates::sign_up(ctx, &form, &errors)));
        }
        Err(e) => return Err(e.into()),
    };
    tracing::info!(user_id = %user.id, "User signed up");

    send_confirmation_email(&state, &user).await?;

    Ok(Html(templates::sign_up_success(ctx)))
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

pub async fn login_form(
    State(state): State<AppState>,
    auth: MaybeAuth,
    Query(query): Query<LoginQuery>,
) -> Html<String> {
    let ctx = PageContext::new(&state.config.site, current_user(&auth));
    Html(templates::login(ctx, "", safe_next(query.next.as_deref()), false))
}

pub async fn login(
    State(state): State<AppState>,
    auth: MaybeAuth,
    jar: CookieJar,
    PageForm(form): PageForm<LoginForm>,
) -> PageResult<Response> {
    let next = safe_next(form.next.as_deref());

    let user = User::find_by_email(&state.db, &form.username)
        .await?
        .filter(|user| user.is_active && user.check_password(&form.password));

    let Some(user) = user else {
        tracing::info!("Failed login attempt");
        let ctx = PageContext::new(&state.config.site, current_user(&auth));
        return Ok(Html(templates::login(ctx, &form.username, next, true)).into_response());
    };

    User::update_last_login(&state.db, user.id).await?;
    let jar = start_session(jar, &state.config, &user).map_err(PageError::from)?;
    tracing::info!(user_id = %user.id, "User logged in");

    Ok((jar, Redirect::to(next.unwrap_or("/"))).into_response())
}

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    (end_session(jar, &state.config), Redirect::to("/"))
}

pub async fn account(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> PageResult<Html<String>> {
    let token = ApiToken::find_by_user(&state.db, auth.user.id).await?;
    let ctx = PageContext::new(&state.config.site, Some(&auth.user));

    Ok(Html(templates::account(
        ctx,
        &UserForm::from_user(&auth.user),
        &FormErrors::new(),
        token.as_ref().map(|t| t.key.as_str()),
    )))
}

/// Saves profile changes; invalid input is shown again and nothing is saved
pub async fn update_account(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    PageForm(form): PageForm<UserForm>,
) -> PageResult<Html<String>> {
    let saved = match form.check() {
        Err(errors) => Err(errors),
        Ok(()) => match User::update_profile(&state.db, auth.user.id, form.to_profile_update()).await {
            Ok(user) => Ok(user),
            Err(ModelError::DuplicateEmail) => {
                let mut errors = FormErrors::new();
                errors.add("email", DUPLICATE_EMAIL);
                Err(errors)
            }
            Err(e) => return Err(e.into()),
        },
    };

    let token = ApiToken::find_by_user(&state.db, auth.user.id).await?;
    let api_key = token.as_ref().map(|t| t.key.as_str());

    let page = match saved {
        Ok(user) => {
            tracing::info!(user_id = %user.id, "Account updated");
            let ctx = PageContext::new(&state.config.site, Some(&user));
            templates::account(ctx, &UserForm::from_user(&user), &FormErrors::new(), api_key)
        }
        Err(errors) => {
            let ctx = PageContext::new(&state.config.site, Some(&auth.user));
            templates::account(ctx, &form, &errors, api_key)
        }
    };

    Ok(Html(page))
}
