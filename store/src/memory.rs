//! In-memory storage implementation.
//!
//! Used when no database DSN is configured, and by the test suite. One
//! read-write lock guards all four maps; compound operations hold the
//! write lock for their whole span, which gives the same serial balance
//! application the SQL backend gets from `SELECT … FOR UPDATE`.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use rand::seq::IteratorRandom;
use rust_decimal::Decimal;

use scrip_core::{HmacKey, KeyId, Order, OrderNumber, OrderStatus, User, UserId, Withdrawal, WithdrawalId};

use crate::error::{Result, StoreError};
use crate::Store;

#[derive(Default)]
struct Inner {
    keys: HashMap<KeyId, HmacKey>,
    /// Users keyed by login; logins are unique.
    users: HashMap<String, User>,
    /// Orders keyed by number; numbers are globally unique.
    orders: HashMap<String, Order>,
    withdrawals: HashMap<WithdrawalId, Withdrawal>,
}

/// In-memory backend: a single `RwLock` over plain maps.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    // =========================================================================
    // Signing keys
    // =========================================================================

    async fn create_key(&self, key: &HmacKey) -> Result<()> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        inner.keys.insert(key.id, key.clone());
        Ok(())
    }

    async fn extract_key(&self, id: KeyId) -> Result<HmacKey> {
        let inner = self.inner.read().expect("store lock poisoned");
        inner
            .keys
            .get(&id)
            .filter(|key| !key.is_expired())
            .cloned()
            .ok_or(StoreError::KeyNotFound { id })
    }

    async fn extract_random_key(&self) -> Result<HmacKey> {
        let inner = self.inner.read().expect("store lock poisoned");
        inner
            .keys
            .values()
            .filter(|key| key.is_fresh())
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or(StoreError::NoFreshKeys)
    }

    async fn extract_all_keys(&self) -> Result<HashMap<KeyId, HmacKey>> {
        let inner = self.inner.read().expect("store lock poisoned");
        Ok(inner
            .keys
            .values()
            .filter(|key| !key.is_expired())
            .map(|key| (key.id, key.clone()))
            .collect())
    }

    // =========================================================================
    // Users
    // =========================================================================

    async fn create_user(&self, user: &User) -> Result<()> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        if inner.users.contains_key(&user.login) {
            return Err(StoreError::ConflictingLogin {
                login: user.login.clone(),
            });
        }
        inner.users.insert(user.login.clone(), user.clone());
        Ok(())
    }

    async fn extract_user(&self, login: &str) -> Result<User> {
        let inner = self.inner.read().expect("store lock poisoned");
        inner
            .users
            .get(login)
            .cloned()
            .ok_or_else(|| StoreError::UserNotFound {
                login: login.to_string(),
            })
    }

    async fn extract_user_by_id(&self, id: UserId) -> Result<User> {
        let inner = self.inner.read().expect("store lock poisoned");
        inner
            .users
            .values()
            .find(|user| user.id == id)
            .cloned()
            .ok_or(StoreError::UserNotFoundById { id })
    }

    // =========================================================================
    // Orders
    // =========================================================================

    async fn create_order(&self, order: &Order) -> Result<()> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        check_order_absent(&inner, order)?;
        inner
            .orders
            .insert(order.number.as_str().to_string(), order.clone());
        Ok(())
    }

    async fn extract_orders_by_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let inner = self.inner.read().expect("store lock poisoned");
        let mut orders: Vec<Order> = inner
            .orders
            .values()
            .filter(|order| order.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by_key(|order| order.uploaded_at);
        Ok(orders)
    }

    async fn extract_unterminated_orders(&self) -> Result<Vec<Order>> {
        let inner = self.inner.read().expect("store lock poisoned");
        let mut orders: Vec<Order> = inner
            .orders
            .values()
            .filter(|order| !order.status.is_terminal())
            .cloned()
            .collect();
        orders.sort_by_key(|order| order.uploaded_at);
        Ok(orders)
    }

    // =========================================================================
    // Withdrawals
    // =========================================================================

    async fn create_withdrawal(&self, withdrawal: &Withdrawal, order: &Order) -> Result<()> {
        let mut inner = self.inner.write().expect("store lock poisoned");

        check_order_absent(&inner, order)?;

        let balance = inner
            .users
            .values()
            .find(|user| user.id == order.user_id)
            .map(|user| user.balance)
            .ok_or(StoreError::UserNotFoundById { id: order.user_id })?;

        if balance < withdrawal.sum {
            return Err(StoreError::BalanceExceeded);
        }

        // All checks passed; apply every effect or none.
        inner
            .orders
            .insert(order.number.as_str().to_string(), order.clone());
        inner
            .withdrawals
            .insert(withdrawal.id, withdrawal.clone());
        if let Some(user) = inner.users.values_mut().find(|user| user.id == order.user_id) {
            user.balance -= withdrawal.sum;
        }

        Ok(())
    }

    async fn extract_withdrawals_by_user(&self, user_id: UserId) -> Result<Vec<Withdrawal>> {
        let inner = self.inner.read().expect("store lock poisoned");
        let mut withdrawals: Vec<Withdrawal> = inner
            .withdrawals
            .values()
            .filter(|withdrawal| {
                inner
                    .orders
                    .get(withdrawal.order_number.as_str())
                    .is_some_and(|order| order.user_id == user_id)
            })
            .cloned()
            .collect();
        withdrawals.sort_by_key(|withdrawal| withdrawal.processed_at);
        Ok(withdrawals)
    }

    async fn total_withdrawn_sum(&self, user_id: UserId) -> Result<Decimal> {
        let inner = self.inner.read().expect("store lock poisoned");
        Ok(inner
            .withdrawals
            .values()
            .filter(|withdrawal| {
                inner
                    .orders
                    .get(withdrawal.order_number.as_str())
                    .is_some_and(|order| order.user_id == user_id)
            })
            .map(|withdrawal| withdrawal.sum)
            .sum())
    }

    // =========================================================================
    // Accrual application
    // =========================================================================

    async fn process_accrual(
        &self,
        number: &OrderNumber,
        status: &str,
        sum: Option<Decimal>,
    ) -> Result<()> {
        let status = OrderStatus::from_accrual_status(status).map_err(|_| {
            StoreError::InvalidStatus {
                status: status.to_string(),
            }
        })?;

        let mut inner = self.inner.write().expect("store lock poisoned");

        let user_id = {
            let order = inner.orders.get_mut(number.as_str()).ok_or_else(|| {
                StoreError::OrderNotFound {
                    number: number.as_str().to_string(),
                }
            })?;

            // Terminal states are absorbing; a repeated delivery is a no-op.
            if order.status.is_terminal() {
                return Ok(());
            }

            order.status = status;
            if let Some(sum) = sum {
                order.accrual = Some(sum);
            }
            order.user_id
        };

        if let Some(sum) = sum {
            if let Some(user) = inner.users.values_mut().find(|user| user.id == user_id) {
                user.balance += sum;
            }
        }

        Ok(())
    }
}

/// Fail with the conflict taxonomy if the order number is already taken.
fn check_order_absent(inner: &Inner, order: &Order) -> Result<()> {
    match inner.orders.get(order.number.as_str()) {
        Some(existing) if existing.user_id == order.user_id => Err(StoreError::OrderExists {
            number: order.number.as_str().to_string(),
        }),
        Some(_) => Err(StoreError::OrderCollision {
            number: order.number.as_str().to_string(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn user(login: &str) -> User {
        User::new(login, "sikret").unwrap()
    }

    fn order(number: &str, user: &User) -> Order {
        Order::new(OrderNumber::new(number).unwrap(), user.id, Utc::now())
    }

    #[tokio::test]
    async fn user_login_is_unique() {
        let store = MemoryStore::new();
        let alice = user("alice");

        store.create_user(&alice).await.unwrap();
        let dup = user("alice");
        assert!(matches!(
            store.create_user(&dup).await,
            Err(StoreError::ConflictingLogin { .. })
        ));

        let fetched = store.extract_user("alice").await.unwrap();
        assert_eq!(fetched.id, alice.id);
        let by_id = store.extract_user_by_id(alice.id).await.unwrap();
        assert_eq!(by_id.login, "alice");
    }

    #[tokio::test]
    async fn order_conflict_taxonomy() {
        let store = MemoryStore::new();
        let alice = user("alice");
        let eve = user("eve");
        store.create_user(&alice).await.unwrap();
        store.create_user(&eve).await.unwrap();

        store
            .create_order(&order("4561261212345467", &alice))
            .await
            .unwrap();

        assert!(matches!(
            store.create_order(&order("4561261212345467", &alice)).await,
            Err(StoreError::OrderExists { .. })
        ));
        assert!(matches!(
            store.create_order(&order("4561261212345467", &eve)).await,
            Err(StoreError::OrderCollision { .. })
        ));
    }

    #[tokio::test]
    async fn orders_sorted_by_upload_time() {
        let store = MemoryStore::new();
        let alice = user("alice");
        store.create_user(&alice).await.unwrap();

        let mut late = order("4561261212345467", &alice);
        late.uploaded_at = Utc::now() + Duration::seconds(10);
        let early = order("12345678903", &alice);

        store.create_order(&late).await.unwrap();
        store.create_order(&early).await.unwrap();

        let listed = store.extract_orders_by_user(alice.id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].number.as_str(), "12345678903");
        assert_eq!(listed[1].number.as_str(), "4561261212345467");
    }

    #[tokio::test]
    async fn unterminated_orders_exclude_terminal() {
        let store = MemoryStore::new();
        let alice = user("alice");
        store.create_user(&alice).await.unwrap();

        store.create_order(&order("12345678903", &alice)).await.unwrap();
        store
            .create_order(&order("4561261212345467", &alice))
            .await
            .unwrap();

        store
            .process_accrual(
                &OrderNumber::new("12345678903").unwrap(),
                "INVALID",
                None,
            )
            .await
            .unwrap();

        let pending = store.extract_unterminated_orders().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].number.as_str(), "4561261212345467");
    }

    #[tokio::test]
    async fn withdrawal_debits_balance() {
        let store = MemoryStore::new();
        let mut bob = user("bob");
        bob.balance = Decimal::new(420, 0);
        store.create_user(&bob).await.unwrap();

        let number = OrderNumber::new("4561261212345467").unwrap();
        let withdrawal = Withdrawal::new(number.clone(), Decimal::new(25, 1), Utc::now());
        let order = Order::new(number, bob.id, Utc::now());

        store.create_withdrawal(&withdrawal, &order).await.unwrap();

        let bob = store.extract_user("bob").await.unwrap();
        assert_eq!(bob.balance, Decimal::new(4175, 1));
        assert_eq!(
            store.total_withdrawn_sum(bob.id).await.unwrap(),
            Decimal::new(25, 1)
        );
    }

    #[tokio::test]
    async fn exceeded_balance_leaves_no_trace() {
        let store = MemoryStore::new();
        let mut alice = user("alice");
        alice.balance = Decimal::new(1337, 2);
        store.create_user(&alice).await.unwrap();

        let number = OrderNumber::new("2377225624").unwrap();
        let withdrawal = Withdrawal::new(number.clone(), Decimal::new(42, 0), Utc::now());
        let order = Order::new(number.clone(), alice.id, Utc::now());

        assert!(matches!(
            store.create_withdrawal(&withdrawal, &order).await,
            Err(StoreError::BalanceExceeded)
        ));

        // The failed withdrawal must not have created the order.
        let again = Withdrawal::new(number.clone(), Decimal::ONE, Utc::now());
        store
            .create_withdrawal(&again, &Order::new(number.clone(), alice.id, Utc::now()))
            .await
            .unwrap();

        // Now the order exists and further withdrawals against it fail.
        let third = Withdrawal::new(number.clone(), Decimal::ONE, Utc::now());
        assert!(matches!(
            store
                .create_withdrawal(&third, &Order::new(number.clone(), alice.id, Utc::now()))
                .await,
            Err(StoreError::OrderExists { .. })
        ));

        let eve = user("eve");
        store.create_user(&eve).await.unwrap();
        let theirs = Withdrawal::new(number.clone(), Decimal::ONE, Utc::now());
        assert!(matches!(
            store
                .create_withdrawal(&theirs, &Order::new(number, eve.id, Utc::now()))
                .await,
            Err(StoreError::OrderCollision { .. })
        ));
    }

    #[tokio::test]
    async fn withdrawals_listed_in_processing_order() {
        let store = MemoryStore::new();
        let mut bob = user("bob");
        bob.balance = Decimal::new(100, 0);
        store.create_user(&bob).await.unwrap();

        let first = OrderNumber::new("12345678903").unwrap();
        let second = OrderNumber::new("4561261212345467").unwrap();

        let late = Withdrawal::new(
            second.clone(),
            Decimal::ONE,
            Utc::now() + Duration::seconds(10),
        );
        let early = Withdrawal::new(first.clone(), Decimal::ONE, Utc::now());

        store
            .create_withdrawal(&late, &Order::new(second, bob.id, Utc::now()))
            .await
            .unwrap();
        store
            .create_withdrawal(&early, &Order::new(first, bob.id, Utc::now()))
            .await
            .unwrap();

        let listed = store.extract_withdrawals_by_user(bob.id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].order_number.as_str(), "12345678903");
        assert_eq!(listed[1].order_number.as_str(), "4561261212345467");
    }

    #[tokio::test]
    async fn total_withdrawn_defaults_to_zero() {
        let store = MemoryStore::new();
        let alice = user("alice");
        store.create_user(&alice).await.unwrap();
        assert_eq!(
            store.total_withdrawn_sum(alice.id).await.unwrap(),
            Decimal::ZERO
        );
    }

    #[tokio::test]
    async fn accrual_credits_once() {
        let store = MemoryStore::new();
        let bob = user("bob");
        store.create_user(&bob).await.unwrap();
        store.create_order(&order("12345678903", &bob)).await.unwrap();

        let number = OrderNumber::new("12345678903").unwrap();
        store
            .process_accrual(&number, "PROCESSED", Some(Decimal::TEN))
            .await
            .unwrap();

        let bob = store.extract_user("bob").await.unwrap();
        assert_eq!(bob.balance, Decimal::TEN);
        let orders = store.extract_orders_by_user(bob.id).await.unwrap();
        assert_eq!(orders[0].status, OrderStatus::Processed);
        assert_eq!(orders[0].accrual, Some(Decimal::TEN));

        // Re-delivery of the same result must not re-credit.
        store
            .process_accrual(&number, "PROCESSED", Some(Decimal::TEN))
            .await
            .unwrap();
        let bob = store.extract_user("bob").await.unwrap();
        assert_eq!(bob.balance, Decimal::TEN);
    }

    #[tokio::test]
    async fn accrual_status_normalisation() {
        let store = MemoryStore::new();
        let bob = user("bob");
        store.create_user(&bob).await.unwrap();
        store.create_order(&order("12345678903", &bob)).await.unwrap();

        let number = OrderNumber::new("12345678903").unwrap();
        store
            .process_accrual(&number, "REGISTERED", None)
            .await
            .unwrap();
        let orders = store.extract_orders_by_user(bob.id).await.unwrap();
        assert_eq!(orders[0].status, OrderStatus::New);

        assert!(matches!(
            store.process_accrual(&number, "SHIPPED", None).await,
            Err(StoreError::InvalidStatus { .. })
        ));
    }

    #[tokio::test]
    async fn accrual_for_unknown_order() {
        let store = MemoryStore::new();
        let number = OrderNumber::new("12345678903").unwrap();
        assert!(matches!(
            store.process_accrual(&number, "PROCESSED", None).await,
            Err(StoreError::OrderNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn random_key_is_fresh_only() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.extract_random_key().await,
            Err(StoreError::NoFreshKeys)
        ));

        let mut stale = HmacKey::generate();
        stale.expires_at = Utc::now() + Duration::hours(1);
        store.create_key(&stale).await.unwrap();
        assert!(matches!(
            store.extract_random_key().await,
            Err(StoreError::NoFreshKeys)
        ));

        let fresh = HmacKey::generate();
        store.create_key(&fresh).await.unwrap();
        assert_eq!(store.extract_random_key().await.unwrap().id, fresh.id);

        // Verification still sees both keys.
        let all = store.extract_all_keys().await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.contains_key(&stale.id));
    }

    #[tokio::test]
    async fn expired_keys_are_invisible() {
        let store = MemoryStore::new();
        let mut dead = HmacKey::generate();
        dead.expires_at = Utc::now() - Duration::seconds(1);
        store.create_key(&dead).await.unwrap();

        assert!(store.extract_all_keys().await.unwrap().is_empty());
        assert!(matches!(
            store.extract_key(dead.id).await,
            Err(StoreError::KeyNotFound { .. })
        ));
    }
}
