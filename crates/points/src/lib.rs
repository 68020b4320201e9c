//! Points ledger and membership tier accounting.
//!
//! Every balance change goes through [`ledger::apply_entry`], inside a write
//! transaction run by [`store::run_transaction`]. Audit records are appended
//! after the mutation commits.

mod adjust;
mod catalog;
mod config;
mod earn;
mod expiry;
mod member;
mod redeem;
mod repository;
mod summary;
mod types;

pub mod ledger;
pub mod rule;
pub mod scheduler;
pub mod store;
pub mod window;

use std::{ops::Deref, time::Duration};

use advisorhub_shared::{Result, State};
use futures::future::BoxFuture;
use sqlx::SqliteConnection;

pub use adjust::*;
pub use catalog::*;
pub use config::*;
pub use earn::*;
pub use expiry::*;
pub use member::*;
pub use redeem::*;
pub use summary::*;
pub use types::*;

#[derive(Clone)]
pub struct Command {
    state: State,
    pub config: PointsConfig,
}

impl Deref for Command {
    type Target = State;

    fn deref(&self) -> &Self::Target {
        &self.state
    }
}

impl Command {
    pub fn new(state: State, config: PointsConfig) -> Self {
        Self { state, config }
    }

    async fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: for<'c> FnMut(&'c mut SqliteConnection) -> BoxFuture<'c, Result<T>>,
    {
        store::run_transaction(&self.write_db, self.config.max_commit_attempts, f).await
    }

    async fn read<T, F, Fut>(&self, f: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        store::retry_read(
            self.config.max_read_retries,
            Duration::from_millis(self.config.read_retry_backoff_ms),
            f,
        )
        .await
    }
}
