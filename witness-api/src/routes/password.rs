/// Password reset, set-password links and password change
///
/// # Endpoints
///
/// - `GET/POST /password-reset`: request a reset email
/// - `GET/POST /reset/:uid/:token`: choose a password from an emailed link
/// - `GET/POST /password-change`: change the password while logged in
///
/// Sign-up confirmation uses the same link: setting a password through it confirms the
/// email address.
///
/// The reset request page never reveals whether an address has an account. Every
/// well-formed request gets the same page; what happens behind it depends on the account:
///
/// | Account | Email sent |
/// |---|---|
/// | active, confirmed | password reset |
/// | active, unconfirmed | confirmation (again) |
/// | deactivated | none |
/// | none | none |

use axum::{
    extract::{Path, State},
    response::{Html, IntoResponse, Response},
    Extension,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use witness_shared::{
    auth::{
        context::AuthContext,
        reset_token::{self, TokenSubject},
    },
    mail::messages,
    models::user::User,
};

use super::{current_user, MaybeAuth};
use crate::{
    app::AppState,
    error::{PageError, PageResult},
    forms::{FormErrors, PageForm, PasswordChangeForm, PasswordResetForm, SetPasswordForm},
    middleware::auth::start_session,
    templates::{self, PageContext},
};

fn token_subject(user: &User) -> TokenSubject<'_> {
    TokenSubject {
        user_id: user.id,
        password_hash: &user.password_hash,
        last_login_at: user.last_login_at,
        email: &user.email,
    }
}

/// Site-relative path of a fresh set-password link for `user`
pub fn reset_path(state: &AppState, user: &User) -> String {
    let token = reset_token::make_token(state.secret(), &token_subject(user), Utc::now());
    format!("/reset/{}/{}", reset_token::encode_uid(user.id), token)
}

/// Emails the sign-up confirmation link
pub async fn send_confirmation_email(state: &AppState, user: &User) -> PageResult<()> {
    let ctx = state.mail_context();
    let link = ctx.absolute_url(&reset_path(state, user));
    state
        .mailer
        .send(messages::confirmation_email(&ctx, user, &link))
        .await?;

    tracing::info!(user_id = %user.id, "Sent confirmation email");
    Ok(())
}

async fn send_password_reset_email(state: &AppState, user: &User) -> PageResult<()> {
    let ctx = state.mail_context();
    let link = ctx.absolute_url(&reset_path(state, user));
    state
        .mailer
        .send(messages::password_reset_email(&ctx, user, &link))
        .await?;

    tracing::info!(user_id = %user.id, "Sent password reset email");
    Ok(())
}

/// The active user a link was issued for, if the link still checks out
async fn resolve_link(state: &AppState, uid: &str, token: &str) -> PageResult<Option<User>> {
    let Some(user_id) = reset_token::decode_uid(uid) else {
        return Ok(None);
    };

    let Some(user) = User::find_by_id(&state.db, user_id).await? else {
        return Ok(None);
    };

    let valid = user.is_active
        && reset_token::check_token(
            state.secret(),
            &token_subject(&user),
            token,
            state.config.session.password_reset_timeout_seconds,
            Utc::now(),
        );

    Ok(valid.then_some(user))
}

pub async fn reset_form(State(state): State<AppState>, auth: MaybeAuth) -> Html<String> {
    let ctx = PageContext::new(&state.config.site, current_user(&auth));
    Html(templates::password_reset(ctx, "", &FormErrors::new()))
}

pub async fn reset(
    State(state): State<AppState>,
    auth: MaybeAuth,
    PageForm(form): PageForm<PasswordResetForm>,
) -> PageResult<Html<String>> {
    let ctx = PageContext::new(&state.config.site, current_user(&auth));

    if let Err(errors) = form.check() {
        return Ok(Html(templates::password_reset(ctx, &form.email, &errors)));
    }

    if let Some(user) = User::find_by_email(&state.db, &form.email).await? {
        // Mail failures are logged, not shown: the response must look the same either way
        let sent = match (user.is_active, user.email_confirmed) {
            (true, true) => send_password_reset_email(&state, &user).await,
            (true, false) => send_confirmation_email(&state, &user).await,
            (false, _) => Ok(()),
        };
        if let Err(e) = sent {
            tracing::error!(user_id = %user.id, error = %e, "Failed to send password reset email");
        }
    }

    Ok(Html(templates::password_reset_done(ctx)))
}

pub async fn reset_confirm_form(
    State(state): State<AppState>,
    auth: MaybeAuth,
    Path((uid, token)): Path<(String, String)>,
) -> PageResult<Html<String>> {
    let ctx = PageContext::new(&state.config.site, current_user(&auth));
    let user = resolve_link(&state, &uid, &token).await?;

    let action = format!("/reset/{}/{}", uid, token);
    Ok(Html(templates::password_reset_confirm(
        ctx,
        user.map(|_| action.as_str()),
        &FormErrors::new(),
    )))
}

pub async fn reset_confirm(
    State(state): State<AppState>,
    auth: MaybeAuth,
    Path((uid, token)): Path<(String, String)>,
    PageForm(form): PageForm<SetPasswordForm>,
) -> PageResult<Html<String>> {
    let ctx = PageContext::new(&state.config.site, current_user(&auth));

    let Some(user) = resolve_link(&state, &uid, &token).await? else {
        return Ok(Html(templates::password_reset_confirm(ctx, None, &FormErrors::new())));
    };

    if let Err(errors) = form.check(&user) {
        let action = format!("/reset/{}/{}", uid, token);
        return Ok(Html(templates::password_reset_confirm(ctx, Some(&action), &errors)));
    }

    let user = User::set_password(&state.db, user.id, &form.new_password1).await?;
    tracing::info!(user_id = %user.id, "Password set from emailed link");

    if User::confirm_email(&state.db, user.id).await? {
        tracing::info!(user_id = %user.id, "Email address confirmed");

        let mail_ctx = state.mail_context();
        if let Err(e) = state.mailer.send(messages::welcome_email(&mail_ctx, &user)).await {
            tracing::error!(user_id = %user.id, error = %e, "Failed to send welcome email");
        }
    }

    Ok(Html(templates::password_reset_complete(ctx)))
}

pub async fn change_form(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Html<String> {
    let ctx = PageContext::new(&state.config.site, Some(&auth.user));
    Html(templates::password_change(ctx, &FormErrors::new()))
}

/// Changes the password and re-issues the session cookie
///
/// The old cookie stops working with the old hash; the new one keeps this browser logged
/// in while every other session ends.
pub async fn change(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    jar: CookieJar,
    PageForm(form): PageForm<PasswordChangeForm>,
) -> PageResult<Response> {
    if let Err(errors) = form.check(&auth.user) {
        let ctx = PageContext::new(&state.config.site, Some(&auth.user));
        return Ok(Html(templates::password_change(ctx, &errors)).into_response());
    }

    let user = User::set_password(&state.db, auth.user.id, &form.new_password1).await?;
    let jar = start_session(jar, &state.config, &user).map_err(PageError::from)?;
    tracing::info!(user_id = %user.id, "Password changed");

    let ctx = PageContext::new(&state.config.site, Some(&user));
    Ok((jar, Html(templates::password_change_done(ctx))).into_response())
}
