/// Form input for the HTML pages
///
/// Each form deserializes from `application/x-www-form-urlencoded` bodies with missing
/// fields defaulting to empty strings, validates with `validator`, and reports failures
/// as [`FormErrors`] keyed by field name so the page can re-render next to the inputs.

use axum::{
    async_trait,
    extract::{rejection::FormRejection, FromRequest, Request},
    Form,
};
use serde::{de::DeserializeOwned, Deserialize};
use std::collections::BTreeMap;
use validator::{Validate, ValidationErrors};
use witness_shared::auth::password::validate_password;
use witness_shared::models::user::{ProfileUpdate, User};

use crate::error::{PageError, ValidationErrorDetail};

/// Form body extractor for HTML pages
///
/// Bodies that are not urlencoded or do not deserialize (a repeated field, say) are
/// answered with the 400 error page instead of axum's plain-text rejection.
pub struct PageForm<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for PageForm<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
    Form<T>: FromRequest<S, Rejection = FormRejection>,
{
    type Rejection = PageError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Form(value) = Form::<T>::from_request(req, state).await?;
        Ok(PageForm(value))
    }
}

/// Field-keyed error messages
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    /// Key for errors that belong to the form as a whole
    pub const NON_FIELD: &'static str = "__all__";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    /// Replaces every message for `field` with `message`
    pub fn replace(&mut self, field: &str, message: impl Into<String>) {
        self.0.insert(field.to_string(), vec![message.into()]);
    }

    /// Messages for one field, empty if it passed
    pub fn field(&self, name: &str) -> &[String] {
        self.0.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn non_field(&self) -> &[String] {
        self.field(Self::NON_FIELD)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_result(self) -> Result<(), FormErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// Flattened into API validation details
    pub fn into_details(self) -> Vec<ValidationErrorDetail> {
        self.0
            .into_iter()
            .flat_map(|(field, messages)| {
                messages.into_iter().map(move |message| ValidationErrorDetail {
                    field: field.clone(),
                    message,
                })
            })
            .collect()
    }
}

impl From<ValidationErrors> for FormErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut form_errors = FormErrors::new();
        for (field, field_errors) in errors.field_errors() {
            for error in field_errors {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "Enter a valid value.".to_string());
                form_errors.add(&field, message);
            }
        }
        form_errors
    }
}

const REQUIRED: &str = "This field is required.";

/// Sign-up and account edit fields
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct UserForm {
    #[validate(
        length(max = 254, message = "Ensure this value has at most 254 characters."),
        email(message = "Enter a valid email address.")
    )]
    pub email: String,

    #[validate(length(max = 30, message = "Ensure this value has at most 30 characters."))]
    pub first_name: String,

    #[validate(length(max = 30, message = "Ensure this value has at most 30 characters."))]
    pub last_name: String,
}

impl UserForm {
    /// Current values of `user`, for pre-filling the account page
    pub fn from_user(user: &User) -> Self {
        Self {
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }

    pub fn check(&self) -> Result<(), FormErrors> {
        validate_with_required_email(self, &self.email)
    }

    pub fn to_profile_update(&self) -> ProfileUpdate {
        ProfileUpdate {
            email: self.email.trim().to_string(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    /// The email address
    pub username: String,
    pub password: String,
    pub next: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct PasswordResetForm {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
}

impl PasswordResetForm {
    pub fn check(&self) -> Result<(), FormErrors> {
        validate_with_required_email(self, &self.email)
    }
}

fn validate_with_required_email(form: &impl Validate, email: &str) -> Result<(), FormErrors> {
    let mut errors = match form.validate() {
        Ok(()) => FormErrors::new(),
        Err(e) => FormErrors::from(e),
    };
    if email.trim().is_empty() {
        errors.replace("email", REQUIRED);
    }
    errors.into_result()
}

/// Choosing a password from a reset or confirmation link
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SetPasswordForm {
    pub new_password1: String,
    pub new_password2: String,
}

impl SetPasswordForm {
    pub fn check(&self, user: &User) -> Result<(), FormErrors> {
        let mut errors = FormErrors::new();
        check_new_password(&mut errors, &self.new_password1, &self.new_password2, user);
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PasswordChangeForm {
    pub old_password: String,
    pub new_password1: String,
    pub new_password2: String,
}

impl PasswordChangeForm {
    pub fn check(&self, user: &User) -> Result<(), FormErrors> {
        let mut errors = FormErrors::new();

        if !user.check_password(&self.old_password) {
            errors.add(
                "old_password",
                "Your old password was entered incorrectly. Please enter it again.",
            );
        }
        check_new_password(&mut errors, &self.new_password1, &self.new_password2, user);

        errors.into_result()
    }
}

fn check_new_password(errors: &mut FormErrors, password1: &str, password2: &str, user: &User) {
    if password1.is_empty() {
        errors.add("new_password1", REQUIRED);
    }
    if password2.is_empty() {
        errors.add("new_password2", REQUIRED);
        return;
    }
    if password1 != password2 {
        errors.add("new_password2", "The two password fields didn't match.");
        return;
    }

    let attributes = [user.email.as_str(), user.first_name.as_str(), user.last_name.as_str()];
    if let Err(messages) = validate_password(password2, &attributes) {
        for message in messages {
            errors.add("new_password2", message);
        }
    }
}
