//! Postgres connection pool and the `users` allow-list queries.

pub mod schema;
mod tls;

use anyhow::{Context, Result};
use diesel::prelude::*;
use diesel_async::{
    pooled_connection::{deadpool::Pool, AsyncDieselConnectionManager, ManagerConfig},
    AsyncPgConnection, RunQueryDsl,
};

pub use tls::SslMode;

pub type DbPool = Pool<AsyncPgConnection>;

/// Build the shared pool. Connections are opened lazily on first use.
///
/// Every mode except [`SslMode::Disable`] connects over rustls.
pub fn establish_connection_pool(database_url: &str, ssl: SslMode) -> Result<DbPool> {
    let manager = match ssl {
        SslMode::Disable => AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url),
        mode => {
            let mut manager_config = ManagerConfig::default();
            manager_config.custom_setup =
                Box::new(move |url| Box::pin(tls::establish_tls_connection(url.to_string(), mode)));

            AsyncDieselConnectionManager::<AsyncPgConnection>::new_with_config(
                database_url,
                manager_config,
            )
        }
    };

    Pool::builder(manager)
        .build()
        .context("Failed to build database pool")
}

pub mod users {
    use super::*;

    /// Every allowed email, in table order.
    pub async fn list_emails(conn: &mut AsyncPgConnection) -> Result<Vec<String>> {
        use crate::db::schema::users::dsl::*;

        let emails = users
            .select(email)
            .load::<String>(conn)
            .await
            .context("Failed to load users")?;

        Ok(emails)
    }

    pub async fn insert(conn: &mut AsyncPgConnection, address: &str) -> Result<()> {
        use crate::db::schema::users::dsl::*;

        diesel::insert_into(users)
            .values(email.eq(address))
            .execute(conn)
            .await
            .context("Failed to insert user")?;

        Ok(())
    }

    /// Delete by email. Returns how many rows went away.
    pub async fn delete(conn: &mut AsyncPgConnection, address: &str) -> Result<usize> {
        use crate::db::schema::users::dsl::*;

        let deleted = diesel::delete(users.filter(email.eq(address)))
            .execute(conn)
            .await
            .context("Failed to delete user")?;

        Ok(deleted)
    }
}
