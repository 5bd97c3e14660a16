//! Allow-list of emails whose presence may be relayed.
//!
//! The relay and the CRUD endpoints talk to the list through
//! [`AllowListStore`], so the Postgres table can be swapped for an in-memory
//! list in tests.

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::db::{users, DbPool};

#[async_trait]
pub trait AllowListStore: Send + Sync {
    /// Every allowed email.
    async fn emails(&self) -> Result<Vec<String>>;

    async fn add(&self, email: &str) -> Result<()>;

    /// Remove an email. Removing an absent email is not an error.
    async fn remove(&self, email: &str) -> Result<()>;

    /// Whether `email` is on the list.
    ///
    /// Reads the whole list and compares exactly. An empty list or an empty
    /// email means no access.
    async fn contains(&self, email: &str) -> Result<bool> {
        if email.is_empty() {
            return Ok(false);
        }
        let emails = self.emails().await?;
        Ok(emails.iter().any(|e| e == email))
    }
}

/// Allow-list backed by the Postgres `users` table.
#[derive(Clone)]
pub struct PgAllowList {
    pool: DbPool,
}

impl PgAllowList {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AllowListStore for PgAllowList {
    async fn emails(&self) -> Result<Vec<String>> {
        let mut conn = self.pool.get().await.context("Database connection unavailable")?;
        users::list_emails(&mut conn).await
    }

    async fn add(&self, email: &str) -> Result<()> {
        let mut conn = self.pool.get().await.context("Database connection unavailable")?;
        users::insert(&mut conn, email).await
    }

    async fn remove(&self, email: &str) -> Result<()> {
        let mut conn = self.pool.get().await.context("Database connection unavailable")?;
        users::delete(&mut conn, email).await?;
        Ok(())
    }
}
