/// Database models
///
/// Every operation takes a [`Database`](crate::db::Database) handle and issues its SQL
/// through [`Database::statement`](crate::db::Database::statement), so query observers see
/// each statement together with the model function that sent it.
///
/// # Models
///
/// - `user`: accounts, email confirmation and passwords
/// - `api_token`: one API token per user
/// - `webhook`: webhook subscriptions and payload signing
///
/// # Example
///
/// ```no_run
/// use witness_shared::db::Database;
/// use witness_shared::models::{api_token::ApiToken, user::{NewUser, User}};
///
/// # async fn example(db: Database) -> Result<(), Box<dyn std::error::Error>> {
/// let user = User::create(&db, NewUser::new("user@example.com").password("pass").confirmed(true)).await?;
/// let token = ApiToken::find_by_user(&db, user.id).await?;
/// assert!(token.is_some());
/// # Ok(())
/// # }
/// ```

pub mod api_token;
pub mod error;
pub mod user;
pub mod webhook;

pub use error::ModelError;
