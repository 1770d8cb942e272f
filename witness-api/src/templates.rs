/// HTML pages
///
/// Every page shares [`layout`]: site name, navigation for the current visitor, and a
/// footer linking the accessibility policy. All interpolated values go through
/// [`escape`].

use axum::http::StatusCode;
use witness_shared::models::user::User;

use crate::config::SiteConfig;
use crate::forms::{FormErrors, UserForm};

/// What every page needs to render its frame
#[derive(Debug, Clone, Copy)]
pub struct PageContext<'a> {
    pub site: &'a SiteConfig,

    /// Logged-in user, if any
    pub user: Option<&'a User>,
}

impl<'a> PageContext<'a> {
    pub fn new(site: &'a SiteConfig, user: Option<&'a User>) -> Self {
        Self { site, user }
    }

    pub fn anonymous(site: &'a SiteConfig) -> Self {
        Self { site, user: None }
    }
}

/// Escapes text for use in HTML content and double-quoted attributes
pub fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn layout(ctx: PageContext<'_>, title: &str, content: &str) -> String {
    let nav = match ctx.user {
        Some(user) => format!(
            r#"<span class="user">{name}</span>
      <a href="/account">Account</a>
      <form method="post" action="/logout" class="inline"><button type="submit">Log out</button></form>"#,
            name = escape(&user.full_name()),
        ),
        None => r#"<a href="/login">Log in</a>
      <a href="/sign-up">Sign up</a>"#
            .to_string(),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{title} | {app}</title>
</head>
<body>
  <header>
    <a href="/" class="brand">{app}</a>
    <nav>
      {nav}
    </nav>
  </header>
  <main>
{content}
  </main>
  <footer>
    <a href="{accessibility}">Accessibility</a>
  </footer>
</body>
</html>
"#,
        title = escape(title),
        app = escape(&ctx.site.app_name),
        nav = nav,
        content = content,
        accessibility = escape(&ctx.site.accessibility_policy_url),
    )
}

fn error_list(errors: &[String]) -> String {
    if errors.is_empty() {
        return String::new();
    }

    let items: String = errors
        .iter()
        .map(|e| format!("<li>{}</li>", escape(e)))
        .collect();
    format!(r#"<ul class="errorlist">{}</ul>"#, items)
}

fn input(kind: &str, name: &str, label: &str, value: Option<&str>, errors: &FormErrors) -> String {
    let value = value
        .map(|v| format!(r#" value="{}""#, escape(v)))
        .unwrap_or_default();

    format!(
        r#"      <p>
        <label for="id_{name}">{label}</label>
        {errors}<input type="{kind}" name="{name}" id="id_{name}"{value}>
      </p>
"#,
        kind = kind,
        name = name,
        label = escape(label),
        errors = error_list(errors.field(name)),
        value = value,
    )
}

/// Home page
pub fn index(ctx: PageContext<'_>) -> String {
    let content = format!(
        r#"    <h1>Perma Eyes</h1>
    <p>{}</p>"#,
        escape("A Witness Server & Suite of Tools for Journalists and Fact Checkers"),
    );
    layout(ctx, "Home", &content)
}

pub fn sign_up(ctx: PageContext<'_>, form: &UserForm, errors: &FormErrors) -> String {
    let content = format!(
        r#"    <h1>Sign up</h1>
    {non_field}<form method="post" action="/sign-up">
{email}{first_name}{last_name}      <button type="submit">Sign up</button>
    </form>"#,
        non_field = error_list(errors.non_field()),
        email = input("email", "email", "Email address", Some(&form.email), errors),
        first_name = input("text", "first_name", "First name", Some(&form.first_name), errors),
        last_name = input("text", "last_name", "Last name", Some(&form.last_name), errors),
    );
    layout(ctx, "Sign up", &content)
}

pub fn sign_up_success(ctx: PageContext<'_>) -> String {
    let content = r#"    <h1>Thanks for signing up</h1>
    <p>Please check your email for a link to confirm your account and set your password.</p>"#;
    layout(ctx, "Sign up", content)
}

/// Login form; `failed` shows the generic credentials message
pub fn login(ctx: PageContext<'_>, username: &str, next: Option<&str>, failed: bool) -> String {
    let mut errors = FormErrors::new();
    if failed {
        errors.add(
            FormErrors::NON_FIELD,
            "Please enter a correct email address and password. Note that both fields may be case-sensitive.",
        );
    }
    let next = next
        .map(|n| format!(r#"      <input type="hidden" name="next" value="{}">"#, escape(n)))
        .unwrap_or_default();

    let content = format!(
        r#"    <h1>Log in</h1>
    {non_field}<form method="post" action="/login">
{username}{password}{next}
      <button type="submit">Log in</button>
    </form>
    <p><a href="/password-reset">Forgot your password?</a></p>"#,
        non_field = error_list(errors.non_field()),
        username = input("email", "username", "Email address", Some(username), &errors),
        password = input("password", "password", "Password", None, &errors),
        next = next,
    );
    layout(ctx, "Log in", &content)
}

pub fn password_reset(ctx: PageContext<'_>, email: &str, errors: &FormErrors) -> String {
    let content = format!(
        r#"    <h1>Reset your password</h1>
    <p>Forgotten your password? Enter your email address below, and we'll email instructions for setting a new one.</p>
    <form method="post" action="/password-reset">
{email}      <button type="submit">Reset my password</button>
    </form>"#,
        email = input("email", "email", "Email address", Some(email), errors),
    );
    layout(ctx, "Password reset", &content)
}

/// Shown after every well-formed reset request, whatever the account state
pub fn password_reset_done(ctx: PageContext<'_>) -> String {
    let content = r#"    <h1>Password reset sent</h1>
    <p>We've emailed you instructions for setting your password, if an account exists with the email you entered. You should receive them shortly.</p>
    <p>If you don't receive an email, please make sure you've entered the address you registered with, and check your spam folder.</p>"#;
    layout(ctx, "Password reset sent", content)
}

/// Set-password form reached from a reset or confirmation link
///
/// `action` is `None` when the link did not check out.
pub fn password_reset_confirm(
    ctx: PageContext<'_>,
    action: Option<&str>,
    errors: &FormErrors,
) -> String {
    let content = match action {
        Some(action) => format!(
            r#"    <h1>Enter new password</h1>
    <p>Please enter your new password twice so we can verify you typed it in correctly.</p>
    <form method="post" action="{action}">
{password1}{password2}      <button type="submit">Change my password</button>
    </form>"#,
            action = escape(action),
            password1 = input("password", "new_password1", "New password", None, errors),
            password2 = input("password", "new_password2", "Confirm password", None, errors),
        ),
        None => r#"    <h1>Password reset unsuccessful</h1>
    <p>The password reset link was invalid, possibly because it has already been used. Please <a href="/password-reset">request a new password reset</a>.</p>"#
            .to_string(),
    };
    layout(ctx, "Enter new password", &content)
}

pub fn password_reset_complete(ctx: PageContext<'_>) -> String {
    let content = r#"    <h1>Password reset complete</h1>
    <p>Your password has been set. You may go ahead and <a href="/login">log in</a> now.</p>"#;
    layout(ctx, "Password reset complete", content)
}

pub fn password_change(ctx: PageContext<'_>, errors: &FormErrors) -> String {
    let content = format!(
        r#"    <h1>Password change</h1>
    <form method="post" action="/password-change">
{old}{password1}{password2}      <button type="submit">Change my password</button>
    </form>"#,
        old = input("password", "old_password", "Old password", None, errors),
        password1 = input("password", "new_password1", "New password", None, errors),
        password2 = input("password", "new_password2", "Confirm password", None, errors),
    );
    layout(ctx, "Password change", &content)
}

pub fn password_change_done(ctx: PageContext<'_>) -> String {
    let content = r#"    <h1>Password change successful</h1>
    <p>Your password was changed.</p>
    <p><a href="/account">Back to your account</a></p>"#;
    layout(ctx, "Password change successful", content)
}

/// Account page: profile form, API key, plan placeholders
pub fn account(
    ctx: PageContext<'_>,
    form: &UserForm,
    errors: &FormErrors,
    api_key: Option<&str>,
) -> String {
    let api_key = match api_key {
        Some(key) => format!(
            r#"    <input type="text" id="api-key" readonly value="{}">"#,
            escape(key)
        ),
        None => "    <p>Confirm your email address to receive an API key.</p>".to_string(),
    };

    let content = format!(
        r#"    <h1>Your account</h1>
    <form method="post" action="/account">
{first_name}{last_name}{email}      <button type="submit">Save</button>
    </form>
    <p><a href="/password-change">Change your password</a></p>

    <h2>Your API key</h2>
{api_key}
    <form method="post" action="/token-reset">
      <button type="submit">Get a new key</button>
    </form>

    <h2>Usage Plan</h2>
    <p>Coming soon.</p>

    <h2>Membership</h2>
    <p>Coming soon.</p>"#,
        first_name = input("text", "first_name", "First name", Some(&form.first_name), errors),
        last_name = input("text", "last_name", "Last name", Some(&form.last_name), errors),
        email = input("email", "email", "Email address", Some(&form.email), errors),
        api_key = api_key,
    );
    layout(ctx, "Account", &content)
}

/// Body for 400, 403, 404 and 500 responses
pub fn error_page(ctx: PageContext<'_>, status: StatusCode) -> String {
    let (title, message) = match status {
        StatusCode::BAD_REQUEST => ("Bad Request", "Sorry, we couldn't understand that request."),
        StatusCode::FORBIDDEN => (
            "Forbidden",
            "CSRF verification failed. Request aborted. Please go back, reload the page, and try again.",
        ),
        StatusCode::NOT_FOUND => ("Page Not Found", "Sorry, we couldn't find that page."),
        _ => ("Server Error", "Sorry, something went wrong. We've been notified and will look into it."),
    };

    let content = format!(
        "    <h1>{}</h1>\n    <p>{}</p>",
        escape(title),
        escape(message)
    );
    layout(ctx, title, &content)
}
