/// Model factories and the fixture provider
///
/// Tests ask a [`Fixtures`] provider for ready-made records instead of building them by
/// hand:
///
/// ```no_run
/// use witness_shared::db::Database;
/// use witness_shared::testing::factories::Fixtures;
///
/// # async fn example(db: Database) {
/// let fixtures = Fixtures::new(db);
/// let user = fixtures.user().await;                // confirmed, active, password "pass"
/// let pending = fixtures.unconfirmed_user().await;
/// let gone = fixtures.deactivated_user().await;
/// let hook = fixtures.webhook_subscription().await; // owned by a fresh user
/// # }
/// ```
///
/// Each factory numbers its records from a [`Sequence`]. [`Fixtures::reset_sequences`]
/// rewinds every sequence the provider owns so a test can rely on predictable emails.

use rand::seq::SliceRandom;
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::db::Database;
use crate::models::user::{NewUser, User};
use crate::models::webhook::{EventType, NewWebhookSubscription, WebhookSubscription};

/// Password given to every factory user
pub const FIXTURE_PASSWORD: &str = "pass";

const FIRST_NAMES: &[&str] = &[
    "Ada", "Grace", "Alan", "Edsger", "Barbara", "Donald", "Frances", "Ken", "Margaret", "Dennis",
    "Radia", "John", "Leslie", "Katherine", "Niklaus", "Sophie",
];

const LAST_NAMES: &[&str] = &[
    "Lovelace", "Hopper", "Turing", "Dijkstra", "Liskov", "Knuth", "Allen", "Thompson",
    "Hamilton", "Ritchie", "Perlman", "McCarthy", "Lamport", "Johnson", "Wirth", "Wilson",
];

/// A counter for numbering factory records
#[derive(Debug, Default)]
pub struct Sequence(AtomicU64);

impl Sequence {
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(0, Ordering::SeqCst);
    }
}

fn pick(names: &[&str]) -> String {
    names
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or_default()
        .to_string()
}

/// Builds confirmed, active users with password `pass`
#[derive(Debug, Clone)]
pub struct UserFactory {
    db: Database,
    sequence: Arc<Sequence>,
    email_domain: Arc<str>,
}

impl UserFactory {
    /// Attributes for the next user, without saving
    pub fn build(&self) -> NewUser {
        let n = self.sequence.next();

        NewUser::new(format!("user{}@{}", n, self.email_domain))
            .name(pick(FIRST_NAMES), pick(LAST_NAMES))
            .password(FIXTURE_PASSWORD)
            .active(true)
            .confirmed(true)
    }

    /// Saves a user built with the default attributes
    pub async fn create(&self) -> User {
        self.create_with(|user| user).await
    }

    /// Saves a user after letting `customize` adjust the attributes
    pub async fn create_with(&self, customize: impl FnOnce(NewUser) -> NewUser) -> User {
        let data = customize(self.build());
        let email = data.email.clone();

        User::create(&self.db, data)
            .await
            .unwrap_or_else(|e| panic!("failed to create fixture user {}: {}", email, e))
    }
}

/// Builds subscriptions, each owned by a new factory user unless told otherwise
#[derive(Debug, Clone)]
pub struct WebhookSubscriptionFactory {
    db: Database,
    sequence: Arc<Sequence>,
    users: UserFactory,
}

impl WebhookSubscriptionFactory {
    pub fn build(&self, user_id: uuid::Uuid) -> NewWebhookSubscription {
        let n = self.sequence.next();

        NewWebhookSubscription {
            user_id,
            event_type: EventType::ArchiveCreated,
            callback_url: format!(
                "https://webhookservice.com/hooks/{}?hookid={}",
                n,
                rand::thread_rng().gen::<u32>()
            ),
            signing_key: None,
        }
    }

    pub async fn create(&self) -> WebhookSubscription {
        let user = self.users.create().await;
        self.create_for(&user).await
    }

    pub async fn create_for(&self, user: &User) -> WebhookSubscription {
        WebhookSubscription::create(&self.db, self.build(user.id))
            .await
            .unwrap_or_else(|e| panic!("failed to create fixture webhook subscription: {}", e))
    }
}

/// Fixture provider handed to tests
#[derive(Debug, Clone)]
pub struct Fixtures {
    db: Database,
    user_sequence: Arc<Sequence>,
    webhook_sequence: Arc<Sequence>,
    email_domain: Arc<str>,
}

impl Fixtures {
    /// Provider whose users get `user{n}@example.com` addresses
    pub fn new(db: Database) -> Self {
        Self::with_email_domain(db, "example.com")
    }

    /// Provider with a random email subdomain, for tests sharing one database
    pub fn isolated(db: Database) -> Self {
        let tag: u64 = rand::thread_rng().gen();
        Self::with_email_domain(db, &format!("t{:x}.example.com", tag))
    }

    pub fn with_email_domain(db: Database, email_domain: &str) -> Self {
        Self {
            db,
            user_sequence: Arc::new(Sequence::default()),
            webhook_sequence: Arc::new(Sequence::default()),
            email_domain: Arc::from(email_domain),
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn email_domain(&self) -> &str {
        &self.email_domain
    }

    pub fn user_factory(&self) -> UserFactory {
        UserFactory {
            db: self.db.clone(),
            sequence: self.user_sequence.clone(),
            email_domain: self.email_domain.clone(),
        }
    }

    pub fn webhook_subscription_factory(&self) -> WebhookSubscriptionFactory {
        WebhookSubscriptionFactory {
            db: self.db.clone(),
            sequence: self.webhook_sequence.clone(),
            users: self.user_factory(),
        }
    }

    /// Confirmed, active user with password `pass`
    pub async fn user(&self) -> User {
        self.user_factory().create().await
    }

    pub async fn unconfirmed_user(&self) -> User {
        self.user_factory().create_with(|u| u.confirmed(false)).await
    }

    pub async fn deactivated_user(&self) -> User {
        self.user_factory().create_with(|u| u.active(false)).await
    }

    pub async fn admin_user(&self) -> User {
        self.user_factory()
            .create_with(|u| u.staff(true).superuser(true))
            .await
    }

    pub async fn webhook_subscription(&self) -> WebhookSubscription {
        self.webhook_subscription_factory().create().await
    }

    pub fn random_webhook_event(&self) -> EventType {
        *EventType::ALL
            .choose(&mut rand::thread_rng())
            .unwrap_or(&EventType::ArchiveCreated)
    }

    /// Every sequence this provider numbers records from
    fn sequences(&self) -> [&Sequence; 2] {
        [self.user_sequence.as_ref(), self.webhook_sequence.as_ref()]
    }

    pub fn reset_sequences(&self) {
        for sequence in self.sequences() {
            sequence.reset();
        }
    }
}
