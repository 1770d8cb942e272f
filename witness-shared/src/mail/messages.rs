/// Account email bodies
///
/// Links are absolute; the site URL comes from configuration. Each link sits on a line of
/// its own so mail clients make it clickable.

use super::EmailMessage;
use crate::models::user::User;

/// Site details shared by every message
#[derive(Debug, Clone)]
pub struct MailContext {
    pub app_name: String,
    pub site_url: String,
    pub from_email: String,
}

impl MailContext {
    /// Joins a site-relative path onto the site URL
    pub fn absolute_url(&self, path: &str) -> String {
        format!("{}{}", self.site_url.trim_end_matches('/'), path)
    }
}

/// Sent after sign-up, and again when an unconfirmed user asks for a password reset
pub fn confirmation_email(ctx: &MailContext, user: &User, link: &str) -> EmailMessage {
    let body = format!(
        "Hello,\n\
         \n\
         Thank you for signing up for {app}. To confirm your email address and choose a \
         password, please visit this link:\n\
         \n\
         {link}\n\
         \n\
         If you didn't sign up for {app}, you can safely ignore this email.\n\
         \n\
         The {app} team\n",
        app = ctx.app_name,
        link = link,
    );

    EmailMessage::new(&ctx.from_email, &user.email, "Please confirm your email address", body)
}

pub fn password_reset_email(ctx: &MailContext, user: &User, link: &str) -> EmailMessage {
    let body = format!(
        "You're receiving this email because you requested a password reset for your user \
         account at {app}.\n\
         \n\
         Please go to the following page and choose a new password:\n\
         \n\
         {link}\n\
         \n\
         Your username, in case you've forgotten: {email}\n\
         \n\
         Thanks for using {app}!\n",
        app = ctx.app_name,
        link = link,
        email = user.email,
    );

    EmailMessage::new(
        &ctx.from_email,
        &user.email,
        format!("Password Reset on {}", ctx.app_name),
        body,
    )
}

/// Sent once, when a new user first sets a password
pub fn welcome_email(ctx: &MailContext, user: &User) -> EmailMessage {
    let body = format!(
        "Hello {name},\n\
         \n\
         Here's an email full of welcome and instruction.\n\
         \n\
         You can manage your account and API key at:\n\
         \n\
         {account}\n\
         \n\
         The {app} team\n",
        name = user.full_name(),
        account = ctx.absolute_url("/account"),
        app = ctx.app_name,
    );

    EmailMessage::new(&ctx.from_email, &user.email, "Welcome!", body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn ctx() -> MailContext {
        MailContext {
            app_name: "Witness".to_string(),
            site_url: "http://localhost:8000/".to_string(),
            from_email: "noreply@example.com".to_string(),
        }
    }

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "user@example.edu".to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            password_hash: "!".to_string(),
            is_staff: false,
            is_superuser: false,
            is_active: true,
            deactivated_at: None,
            email_confirmed: false,
            last_login_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_confirmation_email_link_on_own_line() {
        let link = "http://localhost:8000/reset/abc/def";
        let message = confirmation_email(&ctx(), &user(), link);

        assert_eq!(message.subject, "Please confirm your email address");
        assert_eq!(message.to, vec!["user@example.edu".to_string()]);
        assert!(message.body.contains("Witness"));
        assert!(message.body.lines().any(|line| line == link));
    }

    #[test]
    fn test_password_reset_email_mentions_app() {
        let message = password_reset_email(&ctx(), &user(), "http://localhost:8000/reset/a/b");

        assert!(message.subject.contains("Witness"));
        assert!(message.subject.contains("Password Reset"));
        assert!(message.body.contains("Witness"));
    }

    #[test]
    fn test_welcome_email() {
        let message = welcome_email(&ctx(), &user());

        assert_eq!(message.subject, "Welcome!");
        assert!(message.body.contains("Here's an email full of welcome and instruction"));
        assert!(message.body.contains("http://localhost:8000/account"));
        assert!(message.body.starts_with("Hello Test User,"));
    }
}
