//! Per-user balance storage.
//!
//! One row per user, mutated only through margin-debit-on-open and
//! pnl-credit-on-close. Each row has its own mutex: concurrent operations
//! on different users never contend, concurrent opens on the same user
//! serialize through the row lock so a balance can never be double-spent.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use log::info;
use papertrade::error::TradeError;

/// Balance rows with row-level locking.
#[derive(Debug, Default)]
pub struct AccountLedger {
    rows: RwLock<HashMap<u64, Arc<Mutex<f64>>>>,
}

impl AccountLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a balance row for a new user. Existing accounts are left
    /// untouched.
    pub fn ensure_account(&self, user_id: u64, seed_balance: f64) {
        let mut rows = self.rows.write().unwrap();
        rows.entry(user_id).or_insert_with(|| {
            info!("seeding account {user_id} with balance {seed_balance:.2}");
            Arc::new(Mutex::new(seed_balance))
        });
    }

    /// The lockable balance row for a user. Holding the lock is the
    /// `FOR UPDATE` discipline: check-then-debit must happen entirely
    /// under the guard.
    pub fn row(&self, user_id: u64) -> Result<Arc<Mutex<f64>>, TradeError> {
        self.rows
            .read()
            .unwrap()
            .get(&user_id)
            .cloned()
            .ok_or(TradeError::UnknownUser(user_id))
    }

    /// Current balance snapshot.
    pub fn balance(&self, user_id: u64) -> Result<f64, TradeError> {
        Ok(*self.row(user_id)?.lock().unwrap())
    }

    /// Unconditionally credits realized PnL (which may be negative) to the
    /// user's balance, returning the new balance.
    pub fn credit_pnl(&self, user_id: u64, amount: f64) -> Result<f64, TradeError> {
        let row = self.row(user_id)?;
        let mut balance = row.lock().unwrap();
        *balance += amount;
        Ok(*balance)
    }

    /// Every user with a balance row.
    pub fn user_ids(&self) -> Vec<u64> {
        self.rows.read().unwrap().keys().copied().collect()
    }
}
