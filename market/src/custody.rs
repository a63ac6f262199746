//! # Custody Capability
//!
//! The escrow does not implement asset ownership itself — it consumes a
//! custody capability from an asset registry. Anything that can move an
//! asset between holders under an authorization check, report the current
//! holder, and answer operator-approval queries can back the marketplace.
//!
//! The registry's own error vocabulary is collapsed into a single
//! [`CustodyError::Rejected`] here: from the escrow's point of view every
//! registry refusal means the same thing — the transfer did not happen and
//! the operation that requested it must fail with no side effects.

use thiserror::Error;

use bazaar_registry::asset::{AssetError, AssetId, AssetLedger};

/// Errors surfaced by a custody provider.
#[derive(Debug, Error)]
pub enum CustodyError {
    /// The registry refused the transfer (unknown asset, wrong holder, or
    /// missing authorization).
    #[error("custody transfer rejected: {reason}")]
    Rejected {
        /// The registry's own description of the refusal.
        reason: String,
    },
}

/// Custody operations the escrow requires from an asset registry.
pub trait AssetCustody {
    /// Moves custody of `asset_id` from `from` to `to`, on behalf of
    /// `caller`. Fails if `from` is not the current holder or `caller`
    /// lacks authorization.
    fn transfer_from(
        &mut self,
        caller: &str,
        from: &str,
        to: &str,
        asset_id: AssetId,
    ) -> Result<(), CustodyError>;

    /// Returns the current holder of `asset_id`.
    fn holder_of(&self, asset_id: AssetId) -> Result<String, CustodyError>;

    /// Returns whether `operator` holds blanket approval over `holder`'s
    /// assets.
    fn is_approved_for_all(&self, holder: &str, operator: &str) -> bool;
}

impl From<AssetError> for CustodyError {
    fn from(err: AssetError) -> Self {
        CustodyError::Rejected {
            reason: err.to_string(),
        }
    }
}

impl AssetCustody for AssetLedger {
    fn transfer_from(
        &mut self,
        caller: &str,
        from: &str,
        to: &str,
        asset_id: AssetId,
    ) -> Result<(), CustodyError> {
        AssetLedger::transfer_from(self, caller, from, to, asset_id)?;
        Ok(())
    }

    fn holder_of(&self, asset_id: AssetId) -> Result<String, CustodyError> {
        let holder = self.owner_of(asset_id)?;
        Ok(holder.to_string())
    }

    fn is_approved_for_all(&self, holder: &str, operator: &str) -> bool {
        AssetLedger::is_approved_for_all(self, holder, operator)
    }
}
