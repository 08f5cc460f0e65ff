//! In-memory implementations of the storage and delivery traits.
//!
//! Used by unit tests and by the integration test crate (via the `testing`
//! feature) to run account, scope and report flows without `PostgreSQL` or
//! SMTP.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use rounds_core::finance::PaidOrderTotals;
use rounds_core::inventory::PurchaseLine;
use rounds_core::scope::{ShopScope, ShopSelection};
use rounds_core::tokens::{TokenPurpose, TokenRecord};
use rounds_core::{Email, Money, OrderStatus, RoundId, ShopId, UserId};

use crate::db::RepositoryError;
use crate::models::User;
use crate::services::auth::UserStore;
use crate::services::email::{EmailError, EmailMessage, EmailSender};
use crate::services::reports::ReportStore;
use crate::services::scope::{OwnedShops, PreferenceStore, ScopeError};
use crate::services::tokens::TokenStore;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
struct MemoryState {
    users: Vec<(User, Option<String>)>,
    tokens: Vec<(TokenPurpose, TokenRecord)>,
    shops: Vec<(ShopId, UserId)>,
    orders: Vec<SeedOrder>,
    next_id: i32,
}

/// One line item of a seeded order.
#[derive(Debug, Clone)]
pub struct SeedLine {
    pub product_name: String,
    pub quantity: i32,
    pub cost_price: Option<Money>,
}

#[derive(Debug, Clone)]
struct SeedOrder {
    shop_id: ShopId,
    round_id: RoundId,
    status: OrderStatus,
    subtotal: Money,
    shipping_fee: Money,
    items: Vec<SeedLine>,
}

impl MemoryState {
    /// Orders that count towards a round's reports.
    fn paid_orders<'a>(
        &'a self,
        round_id: RoundId,
        scope: &'a ShopScope,
    ) -> impl Iterator<Item = &'a SeedOrder> {
        self.orders.iter().filter(move |o| {
            o.round_id == round_id && scope.contains(o.shop_id) && o.status.is_paid()
        })
    }

    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn user_mut(&mut self, email: &str) -> Option<&mut (User, Option<String>)> {
        self.users.iter_mut().find(|(u, _)| u.email.as_str() == email)
    }
}

/// Users, tokens and shop ownership held in memory. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    /// Insert an unverified user directly.
    ///
    /// # Panics
    ///
    /// Panics if `email` is not a valid address.
    #[allow(clippy::expect_used)]
    pub fn add_user(&self, email: &str, name: &str, password_hash: &str) -> User {
        let email = Email::parse(email).expect("test email must be valid");
        let mut state = lock(&self.state);
        let now = Utc::now();
        let user = User {
            id: UserId::new(state.next_id()),
            email,
            name: name.to_owned(),
            email_verified: false,
            created_at: now,
            updated_at: now,
        };
        state
            .users
            .push((user.clone(), Some(password_hash.to_owned())));
        user
    }

    /// Create a shop owned by `owner` and return its id.
    pub fn add_shop(&self, owner: UserId) -> ShopId {
        let mut state = lock(&self.state);
        let id = ShopId::new(state.next_id());
        state.shops.push((id, owner));
        id
    }

    /// Record an order placed with `shop` in `round`.
    pub fn add_order(
        &self,
        shop_id: ShopId,
        round_id: RoundId,
        status: OrderStatus,
        subtotal: Money,
        shipping_fee: Money,
        items: Vec<SeedLine>,
    ) {
        lock(&self.state).orders.push(SeedOrder {
            shop_id,
            round_id,
            status,
            subtotal,
            shipping_fee,
            items,
        });
    }

    #[must_use]
    pub fn is_verified(&self, email: &str) -> bool {
        lock(&self.state)
            .users
            .iter()
            .any(|(u, _)| u.email.as_str() == email && u.email_verified)
    }

    pub fn set_verified(&self, email: &str) {
        if let Some((user, _)) = lock(&self.state).user_mut(email) {
            user.email_verified = true;
        }
    }

    /// Live and expired tokens currently stored for `purpose`.
    #[must_use]
    pub fn token_count(&self, purpose: TokenPurpose) -> usize {
        lock(&self.state)
            .tokens
            .iter()
            .filter(|(p, _)| *p == purpose)
            .count()
    }
}

impl UserStore for MemoryStore {
    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        Ok(lock(&self.state)
            .users
            .iter()
            .find(|(u, _)| &u.email == email)
            .map(|(u, _)| u.clone()))
    }

    async fn find_with_password(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        Ok(lock(&self.state)
            .users
            .iter()
            .find(|(u, _)| &u.email == email)
            .and_then(|(u, hash)| hash.clone().map(|h| (u.clone(), h))))
    }

    async fn create(
        &self,
        email: &Email,
        name: &str,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let mut state = lock(&self.state);
        if state.users.iter().any(|(u, _)| &u.email == email) {
            return Err(RepositoryError::Conflict("email already exists".into()));
        }
        let now = Utc::now();
        let user = User {
            id: UserId::new(state.next_id()),
            email: email.clone(),
            name: name.to_owned(),
            email_verified: false,
            created_at: now,
            updated_at: now,
        };
        state
            .users
            .push((user.clone(), Some(password_hash.to_owned())));
        Ok(user)
    }

    async fn set_password(&self, user_id: UserId, password_hash: &str) -> Result<(), RepositoryError> {
        let mut state = lock(&self.state);
        let (_, hash) = state
            .users
            .iter_mut()
            .find(|(u, _)| u.id == user_id)
            .ok_or(RepositoryError::NotFound)?;
        *hash = Some(password_hash.to_owned());
        Ok(())
    }
}

impl TokenStore for MemoryStore {
    async fn replace(&self, purpose: TokenPurpose, record: &TokenRecord) -> Result<(), RepositoryError> {
        let mut state = lock(&self.state);
        state
            .tokens
            .retain(|(p, t)| !(*p == purpose && t.email == record.email));
        state.tokens.push((purpose, record.clone()));
        Ok(())
    }

    async fn find(
        &self,
        purpose: TokenPurpose,
        token: &str,
    ) -> Result<Option<TokenRecord>, RepositoryError> {
        Ok(lock(&self.state)
            .tokens
            .iter()
            .find(|(p, t)| *p == purpose && t.token == token)
            .map(|(_, t)| t.clone()))
    }

    async fn delete(&self, purpose: TokenPurpose, token: &str) -> Result<(), RepositoryError> {
        lock(&self.state)
            .tokens
            .retain(|(p, t)| !(*p == purpose && t.token == token));
        Ok(())
    }

    async fn consume_verification(&self, token: &str) -> Result<bool, RepositoryError> {
        let mut state = lock(&self.state);
        let Some(index) = state
            .tokens
            .iter()
            .position(|(p, t)| *p == TokenPurpose::EmailVerification && t.token == token)
        else {
            return Ok(false);
        };
        let (_, record) = state.tokens.remove(index);
        if let Some((user, _)) = state.user_mut(&record.email) {
            user.email_verified = true;
        }
        Ok(true)
    }

    async fn verify_account(&self, email: &str) -> Result<bool, RepositoryError> {
        let mut state = lock(&self.state);
        let Some((user, _)) = state.user_mut(email) else {
            return Ok(false);
        };
        user.email_verified = true;
        state
            .tokens
            .retain(|(p, t)| !(*p == TokenPurpose::EmailVerification && t.email == email));
        Ok(true)
    }

    async fn purge_expired(
        &self,
        purpose: TokenPurpose,
        now: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        let mut state = lock(&self.state);
        let before = state.tokens.len();
        state
            .tokens
            .retain(|(p, t)| !(*p == purpose && t.expires_at < now));
        Ok(u64::try_from(before - state.tokens.len()).unwrap_or_default())
    }
}

impl OwnedShops for MemoryStore {
    async fn owned_shop_ids(&self, owner: UserId) -> Result<Vec<ShopId>, RepositoryError> {
        Ok(lock(&self.state)
            .shops
            .iter()
            .filter(|(_, o)| *o == owner)
            .map(|(id, _)| *id)
            .collect())
    }
}

impl ReportStore for MemoryStore {
    async fn purchase_lines(
        &self,
        round_id: RoundId,
        scope: &ShopScope,
    ) -> Result<Vec<PurchaseLine>, RepositoryError> {
        Ok(lock(&self.state)
            .paid_orders(round_id, scope)
            .flat_map(|o| &o.items)
            .map(|item| PurchaseLine {
                product_name: Some(item.product_name.clone()),
                quantity: Some(i64::from(item.quantity)),
                cost_price: item.cost_price,
            })
            .collect())
    }

    async fn paid_order_totals(
        &self,
        round_id: RoundId,
        scope: &ShopScope,
    ) -> Result<Vec<PaidOrderTotals>, RepositoryError> {
        Ok(lock(&self.state)
            .paid_orders(round_id, scope)
            .map(|o| PaidOrderTotals {
                subtotal: o.subtotal,
                shipping_fee: o.shipping_fee,
            })
            .collect())
    }
}

/// Selected-shop preference held in memory.
#[derive(Clone, Default)]
pub struct MemoryPreferences {
    selection: Arc<Mutex<Option<ShopSelection>>>,
}

impl MemoryPreferences {
    #[must_use]
    pub fn with(selection: ShopSelection) -> Self {
        Self {
            selection: Arc::new(Mutex::new(Some(selection))),
        }
    }

    #[must_use]
    pub fn current(&self) -> Option<ShopSelection> {
        *lock(&self.selection)
    }
}

impl PreferenceStore for MemoryPreferences {
    async fn selection(&self) -> Result<Option<ShopSelection>, ScopeError> {
        Ok(self.current())
    }

    async fn set_selection(&self, selection: ShopSelection) -> Result<(), ScopeError> {
        *lock(&self.selection) = Some(selection);
        Ok(())
    }
}

/// Mailer that records every message instead of sending it.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
    failing: AtomicBool,
}

impl RecordingMailer {
    /// A mailer whose every send fails.
    #[must_use]
    pub fn failing() -> Self {
        let mailer = Self::default();
        mailer.set_failing(true);
        mailer
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Messages delivered so far, oldest first. Failed sends are not recorded.
    #[must_use]
    pub fn sent(&self) -> Vec<EmailMessage> {
        lock(&self.sent).clone()
    }
}

impl EmailSender for RecordingMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(EmailError::InvalidAddress(message.to));
        }
        lock(&self.sent).push(message);
        Ok(())
    }
}
