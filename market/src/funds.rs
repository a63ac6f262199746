//! # Funds Ledger
//!
//! Recorded currency balances for settlement payouts. Incoming payments
//! (listing fees, purchase amounts) arrive as explicit arguments on the
//! escrow's operations — the attached-value model — so the ledger only ever
//! grows: the escrow credits a seller when a sale settles and credits the
//! administrator when collected fees are withdrawn.
//!
//! Amounts are `u64` values in the smallest denomination of the payment
//! currency. Never floats: rounding and settlement do not mix.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during funds operations.
#[derive(Debug, Error)]
pub enum FundsError {
    /// A credit would overflow the recipient's balance.
    #[error("balance overflow: account {account} holds {current}, credit {credit}")]
    Overflow {
        /// The account being credited.
        account: String,
        /// The balance before the failed credit.
        current: u64,
        /// The amount that caused the overflow.
        credit: u64,
    },
}

/// Address-to-balance map for settlement payouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundsLedger {
    /// Balances keyed by hex-encoded address.
    balances: HashMap<String, u64>,
}

impl FundsLedger {
    /// Creates a new, empty ledger.
    pub fn new() -> Self {
        Self {
            balances: HashMap::new(),
        }
    }

    /// Returns the recorded balance of `account`, or 0.
    pub fn balance_of(&self, account: &str) -> u64 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Checks that crediting `amount` to `account` cannot overflow.
    ///
    /// The escrow calls this before committing a state transition whose
    /// final step is a credit, so the transition never fails halfway.
    ///
    /// # Errors
    ///
    /// Returns [`FundsError::Overflow`] if the credit would exceed `u64::MAX`.
    pub fn check_credit(&self, account: &str, amount: u64) -> Result<(), FundsError> {
        let current = self.balance_of(account);
        current
            .checked_add(amount)
            .ok_or(FundsError::Overflow {
                account: account.to_string(),
                current,
                credit: amount,
            })?;
        Ok(())
    }

    /// Credits `amount` to `account`.
    ///
    /// # Errors
    ///
    /// Returns [`FundsError::Overflow`] if the credit would exceed `u64::MAX`.
    pub fn credit(&mut self, account: &str, amount: u64) -> Result<(), FundsError> {
        self.check_credit(account, amount)?;
        let balance = self.balances.entry(account.to_string()).or_insert(0);
        *balance += amount;
        Ok(())
    }
}

impl Default for FundsLedger {
    fn default() -> Self {
        Self::new()
    }
}
