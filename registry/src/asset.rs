//! # Asset Ledger
//!
//! Tracks every minted asset: who holds it, what its metadata URI is, and
//! who is allowed to move it. Identifiers are sequential starting at 1 and
//! are never reused, so an `AssetId` is a permanent handle.
//!
//! ## Authorization Model
//!
//! - **Holder**: may transfer the asset and grant approvals.
//! - **Per-asset approval**: one address per asset, cleared automatically
//!   when the asset changes hands.
//! - **Operator approval**: a holder may authorize an operator over *all*
//!   of their assets; this survives individual transfers and is what the
//!   marketplace escrow uses to take custody of listed assets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during asset registry operations.
#[derive(Debug, Error)]
pub enum AssetError {
    /// The referenced asset was never minted.
    #[error("asset not found: {0}")]
    AssetNotFound(AssetId),

    /// The `from` address of a transfer is not the current holder.
    #[error("not holder: asset {asset_id} is held by {holder}, not {from}")]
    NotHolder {
        /// The asset that was being transferred.
        asset_id: AssetId,
        /// The address the caller claimed holds the asset.
        from: String,
        /// The actual current holder.
        holder: String,
    },

    /// The caller is neither the holder nor an approved operator.
    #[error("not authorized: {caller} may not move asset {asset_id}")]
    NotAuthorized {
        /// The asset that was being transferred.
        asset_id: AssetId,
        /// The address that attempted the operation.
        caller: String,
    },
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Unique identifier for an asset, assigned sequentially at mint time.
pub type AssetId = u64;

/// A minted asset: its holder and immutable metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetRecord {
    /// The asset's permanent identifier.
    pub asset_id: AssetId,
    /// Hex-encoded public key of the current holder.
    pub holder: String,
    /// Metadata URI, fixed at mint time (e.g., an IPFS link).
    pub uri: String,
    /// Timestamp when the asset was minted.
    pub minted_at: DateTime<Utc>,
}

/// The asset ledger — mints assets and tracks custody and approvals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetLedger {
    /// Minted assets keyed by their identifier.
    assets: HashMap<AssetId, AssetRecord>,
    /// Next identifier to hand out. Starts at 1, never decremented.
    next_asset_id: AssetId,
    /// Per-asset approvals: `asset_id -> approved address`.
    approvals: HashMap<AssetId, String>,
    /// Blanket operator approvals: `holder -> set of operators`.
    operators: HashMap<String, HashSet<String>>,
}

impl AssetLedger {
    /// Creates a new, empty ledger.
    pub fn new() -> Self {
        Self {
            assets: HashMap::new(),
            next_asset_id: 1,
            approvals: HashMap::new(),
            operators: HashMap::new(),
        }
    }

    /// Mints a new asset to `holder` and returns its identifier.
    ///
    /// Identifiers are sequential: the first mint returns 1, the second 2,
    /// and so on. The URI is fixed for the lifetime of the asset.
    pub fn mint(&mut self, holder: &str, uri: &str) -> AssetId {
        let asset_id = self.next_asset_id;
        self.next_asset_id += 1;

        self.assets.insert(
            asset_id,
            AssetRecord {
                asset_id,
                holder: holder.to_string(),
                uri: uri.to_string(),
                minted_at: Utc::now(),
            },
        );

        asset_id
    }

    /// Returns the current holder of an asset.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::AssetNotFound`] if the asset was never minted.
    pub fn owner_of(&self, asset_id: AssetId) -> Result<&str, AssetError> {
        self.assets
            .get(&asset_id)
            .map(|record| record.holder.as_str())
            .ok_or(AssetError::AssetNotFound(asset_id))
    }

    /// Returns the metadata URI of an asset.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::AssetNotFound`] if the asset was never minted.
    pub fn asset_uri(&self, asset_id: AssetId) -> Result<&str, AssetError> {
        self.assets
            .get(&asset_id)
            .map(|record| record.uri.as_str())
            .ok_or(AssetError::AssetNotFound(asset_id))
    }

    /// Grants `operator` a per-asset approval over `asset_id`.
    ///
    /// Only the current holder may grant it. The approval is cleared when
    /// the asset is transferred.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::AssetNotFound`] if the asset does not exist.
    /// Returns [`AssetError::NotAuthorized`] if the caller is not the holder.
    pub fn approve(
        &mut self,
        caller: &str,
        operator: &str,
        asset_id: AssetId,
    ) -> Result<(), AssetError> {
        let record = self
            .assets
            .get(&asset_id)
            .ok_or(AssetError::AssetNotFound(asset_id))?;

        if record.holder != caller {
            return Err(AssetError::NotAuthorized {
                asset_id,
                caller: caller.to_string(),
            });
        }

        self.approvals.insert(asset_id, operator.to_string());
        Ok(())
    }

    /// Grants or revokes blanket operator approval for all of `holder`'s
    /// assets, present and future.
    pub fn set_approval_for_all(&mut self, holder: &str, operator: &str, approved: bool) {
        let operators = self.operators.entry(holder.to_string()).or_default();
        if approved {
            operators.insert(operator.to_string());
        } else {
            operators.remove(operator);
        }
    }

    /// Returns whether `operator` holds blanket approval over `holder`'s assets.
    pub fn is_approved_for_all(&self, holder: &str, operator: &str) -> bool {
        self.operators
            .get(holder)
            .map(|ops| ops.contains(operator))
            .unwrap_or(false)
    }

    /// Moves custody of `asset_id` from `from` to `to`.
    ///
    /// The caller must be the current holder, hold a per-asset approval, or
    /// hold blanket operator approval from the holder. Any per-asset
    /// approval is cleared on success.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::AssetNotFound`] if the asset does not exist.
    /// Returns [`AssetError::NotHolder`] if `from` is not the current holder.
    /// Returns [`AssetError::NotAuthorized`] if the caller lacks authorization.
    pub fn transfer_from(
        &mut self,
        caller: &str,
        from: &str,
        to: &str,
        asset_id: AssetId,
    ) -> Result<(), AssetError> {
        let record = self
            .assets
            .get(&asset_id)
            .ok_or(AssetError::AssetNotFound(asset_id))?;

        if record.holder != from {
            return Err(AssetError::NotHolder {
                asset_id,
                from: from.to_string(),
                holder: record.holder.clone(),
            });
        }

        let approved_for_asset = self
            .approvals
            .get(&asset_id)
            .map(|addr| addr == caller)
            .unwrap_or(false);

        if caller != from && !approved_for_asset && !self.is_approved_for_all(from, caller) {
            return Err(AssetError::NotAuthorized {
                asset_id,
                caller: caller.to_string(),
            });
        }

        // Existence was checked above.
        let record = self.assets.get_mut(&asset_id).unwrap();
        record.holder = to.to_string();
        self.approvals.remove(&asset_id);

        Ok(())
    }

    /// Returns the number of minted assets.
    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }
}

impl Default for AssetLedger {
    fn default() -> Self {
        Self::new()
    }
}
