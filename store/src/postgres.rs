//! Postgres storage implementation.
//!
//! Every compound operation runs in one transaction. `create_withdrawal`
//! locks the owner's row with `SELECT … FOR UPDATE`, which serialises
//! concurrent credits and debits against the same balance;
//! `process_accrual` uses a status-guarded `UPDATE` so terminal orders
//! are never transitioned again.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use uuid::Uuid;

use scrip_core::{
    HmacKey, KeyId, Order, OrderNumber, OrderStatus, User, UserId, Withdrawal, WithdrawalId,
};

use crate::error::{Result, StoreError};
use crate::Store;

/// Postgres-backed storage implementation.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect to the database and run pending migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be built or a migration fails;
    /// both are startup-fatal for the service.
    pub async fn connect(dsn: &str) -> Result<Self> {
        let pool = PgPoolOptions::new().max_connections(5).connect(dsn).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|err| StoreError::Database(err.to_string()))?;

        tracing::info!("database migrations complete");

        Ok(Self { pool })
    }

    fn key_from_row(row: &PgRow) -> Result<HmacKey> {
        Ok(HmacKey {
            id: KeyId::from_uuid(row.try_get("id")?),
            sign: row.try_get("sign")?,
            expires_at: row.try_get("expires_at")?,
        })
    }

    fn user_from_row(row: &PgRow) -> Result<User> {
        Ok(User {
            id: UserId::from_uuid(row.try_get("id")?),
            login: row.try_get("login")?,
            password_hash: row.try_get("password_hash")?,
            balance: row.try_get("balance")?,
        })
    }

    fn order_from_row(row: &PgRow) -> Result<Order> {
        let number: String = row.try_get("id")?;
        let status: String = row.try_get("status")?;

        Ok(Order {
            number: OrderNumber::new(number)
                .map_err(|err| StoreError::Database(err.to_string()))?,
            status: status
                .parse::<OrderStatus>()
                .map_err(|err| StoreError::Database(err.to_string()))?,
            uploaded_at: row.try_get("uploaded_at")?,
            user_id: UserId::from_uuid(row.try_get("user_id")?),
            accrual: row.try_get("accrual")?,
        })
    }

    fn withdrawal_from_row(row: &PgRow) -> Result<Withdrawal> {
        let order_number: String = row.try_get("order_id")?;

        Ok(Withdrawal {
            id: WithdrawalId::from_uuid(row.try_get("id")?),
            order_number: OrderNumber::new(order_number)
                .map_err(|err| StoreError::Database(err.to_string()))?,
            sum: row.try_get("withdrawal_sum")?,
            processed_at: row.try_get("processed_at")?,
        })
    }
}

/// Fail with the conflict taxonomy if the order number is already taken,
/// given the owning user of an existing row.
fn order_conflict(order: &Order, existing_owner: Uuid) -> StoreError {
    if existing_owner == *order.user_id.as_uuid() {
        StoreError::OrderExists {
            number: order.number.as_str().to_string(),
        }
    } else {
        StoreError::OrderCollision {
            number: order.number.as_str().to_string(),
        }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    // =========================================================================
    // Signing keys
    // =========================================================================

    async fn create_key(&self, key: &HmacKey) -> Result<()> {
        sqlx::query("INSERT INTO hmac_key (id, sign, expires_at) VALUES ($1, $2, $3)")
            .bind(key.id.as_uuid())
            .bind(&key.sign)
            .bind(key.expires_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn extract_key(&self, id: KeyId) -> Result<HmacKey> {
        let row = sqlx::query(
            "SELECT id, sign, expires_at FROM hmac_key WHERE id = $1 AND expires_at > $2",
        )
        .bind(id.as_uuid())
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::key_from_row(&row),
            None => Err(StoreError::KeyNotFound { id }),
        }
    }

    async fn extract_random_key(&self) -> Result<HmacKey> {
        let rows = sqlx::query(
            "SELECT id, sign, expires_at FROM hmac_key WHERE expires_at > $1 ORDER BY RANDOM()",
        )
        .bind(Utc::now())
        .fetch_all(&self.pool)
        .await?;

        for row in &rows {
            let key = Self::key_from_row(row)?;
            if key.is_fresh() {
                return Ok(key);
            }
        }

        Err(StoreError::NoFreshKeys)
    }

    async fn extract_all_keys(&self) -> Result<HashMap<KeyId, HmacKey>> {
        let rows = sqlx::query("SELECT id, sign, expires_at FROM hmac_key WHERE expires_at > $1")
            .bind(Utc::now())
            .fetch_all(&self.pool)
            .await?;

        let mut keys = HashMap::with_capacity(rows.len());
        for row in &rows {
            let key = Self::key_from_row(row)?;
            keys.insert(key.id, key);
        }
        Ok(keys)
    }

    // =========================================================================
    // Users
    // =========================================================================

    async fn create_user(&self, user: &User) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let taken = sqlx::query("SELECT 1 FROM app_user WHERE login = $1")
            .bind(&user.login)
            .fetch_optional(&mut *tx)
            .await?;
        if taken.is_some() {
            return Err(StoreError::ConflictingLogin {
                login: user.login.clone(),
            });
        }

        sqlx::query(
            "INSERT INTO app_user (id, login, password_hash, balance) VALUES ($1, $2, $3, $4)",
        )
        .bind(user.id.as_uuid())
        .bind(&user.login)
        .bind(&user.password_hash)
        .bind(user.balance)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn extract_user(&self, login: &str) -> Result<User> {
        let row =
            sqlx::query("SELECT id, login, password_hash, balance FROM app_user WHERE login = $1")
                .bind(login)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some(row) => Self::user_from_row(&row),
            None => Err(StoreError::UserNotFound {
                login: login.to_string(),
            }),
        }
    }

    async fn extract_user_by_id(&self, id: UserId) -> Result<User> {
        let row =
            sqlx::query("SELECT id, login, password_hash, balance FROM app_user WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some(row) => Self::user_from_row(&row),
            None => Err(StoreError::UserNotFoundById { id }),
        }
    }

    // =========================================================================
    // Orders
    // =========================================================================

    async fn create_order(&self, order: &Order) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query("SELECT user_id FROM app_order WHERE id = $1")
            .bind(order.number.as_str())
            .fetch_optional(&mut *tx)
            .await?;
        if let Some(row) = existing {
            return Err(order_conflict(order, row.try_get("user_id")?));
        }

        sqlx::query(
            "INSERT INTO app_order (id, status, uploaded_at, user_id) VALUES ($1, $2, $3, $4)",
        )
        .bind(order.number.as_str())
        .bind(order.status.as_str())
        .bind(order.uploaded_at)
        .bind(order.user_id.as_uuid())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn extract_orders_by_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            "SELECT id, status, uploaded_at, user_id, accrual FROM app_order \
             WHERE user_id = $1 ORDER BY uploaded_at",
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::order_from_row).collect()
    }

    async fn extract_unterminated_orders(&self) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            "SELECT id, status, uploaded_at, user_id, accrual FROM app_order \
             WHERE status != $1 AND status != $2 ORDER BY uploaded_at",
        )
        .bind(OrderStatus::Processed.as_str())
        .bind(OrderStatus::Invalid.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::order_from_row).collect()
    }

    // =========================================================================
    // Withdrawals
    // =========================================================================

    async fn create_withdrawal(&self, withdrawal: &Withdrawal, order: &Order) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query("SELECT user_id FROM app_order WHERE id = $1")
            .bind(order.number.as_str())
            .fetch_optional(&mut *tx)
            .await?;
        if let Some(row) = existing {
            return Err(order_conflict(order, row.try_get("user_id")?));
        }

        sqlx::query(
            "INSERT INTO app_order (id, status, uploaded_at, user_id) VALUES ($1, $2, $3, $4)",
        )
        .bind(order.number.as_str())
        .bind(order.status.as_str())
        .bind(order.uploaded_at)
        .bind(order.user_id.as_uuid())
        .execute(&mut *tx)
        .await?;

        let balance: Decimal =
            sqlx::query("SELECT balance FROM app_user WHERE id = $1 FOR UPDATE")
                .bind(order.user_id.as_uuid())
                .fetch_one(&mut *tx)
                .await?
                .try_get("balance")?;

        if balance < withdrawal.sum {
            return Err(StoreError::BalanceExceeded);
        }

        sqlx::query(
            "INSERT INTO withdrawal (id, order_id, processed_at, withdrawal_sum) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(withdrawal.id.as_uuid())
        .bind(withdrawal.order_number.as_str())
        .bind(withdrawal.processed_at)
        .bind(withdrawal.sum)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE app_user SET balance = balance - $2 WHERE id = $1")
            .bind(order.user_id.as_uuid())
            .bind(withdrawal.sum)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn extract_withdrawals_by_user(&self, user_id: UserId) -> Result<Vec<Withdrawal>> {
        let rows = sqlx::query(
            "SELECT withdrawal.id, withdrawal.order_id, withdrawal.withdrawal_sum, \
                    withdrawal.processed_at \
             FROM withdrawal \
             INNER JOIN app_order ON withdrawal.order_id = app_order.id \
             WHERE app_order.user_id = $1 \
             ORDER BY withdrawal.processed_at",
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::withdrawal_from_row).collect()
    }

    async fn total_withdrawn_sum(&self, user_id: UserId) -> Result<Decimal> {
        let row = sqlx::query(
            "SELECT COALESCE(SUM(withdrawal.withdrawal_sum), 0) AS total \
             FROM withdrawal \
             INNER JOIN app_order ON withdrawal.order_id = app_order.id \
             WHERE app_order.user_id = $1",
        )
        .bind(user_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        Ok(row.try_get("total")?)
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

        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE app_order SET status = $2 \
             WHERE id = $1 AND status != $3 AND status != $4",
        )
        .bind(number.as_str())
        .bind(status.as_str())
        .bind(OrderStatus::Processed.as_str())
        .bind(OrderStatus::Invalid.as_str())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            // Either the order is unknown or it is already terminal; the
            // latter is the idempotent no-op the pipeline relies on.
            let exists = sqlx::query("SELECT 1 FROM app_order WHERE id = $1")
                .bind(number.as_str())
                .fetch_optional(&mut *tx)
                .await?;
            return match exists {
                Some(_) => Ok(()),
                None => Err(StoreError::OrderNotFound {
                    number: number.as_str().to_string(),
                }),
            };
        }

        if let Some(sum) = sum {
            sqlx::query("UPDATE app_order SET accrual = $2 WHERE id = $1")
                .bind(number.as_str())
                .bind(sum)
                .execute(&mut *tx)
                .await?;

            sqlx::query(
                "UPDATE app_user SET balance = app_user.balance + $2 \
                 FROM app_order \
                 WHERE app_order.id = $1 AND app_user.id = app_order.user_id",
            )
            .bind(number.as_str())
            .bind(sum)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
