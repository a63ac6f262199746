//! # Marketplace Escrow Contract
//!
//! Implements the trustless item lifecycle of the bazaar marketplace. The
//! lifecycle is:
//!
//! 1. **List** — a holder pays the fixed listing fee and the escrow pulls
//!    the asset into its own custody (via operator approval on the
//!    registry).
//! 2. **Sell** — a buyer pays exactly the listed price; the escrow hands
//!    custody to the buyer and credits the proceeds to the seller, as one
//!    unit.
//! 3. **Cancel** — the seller reclaims the asset instead; the listing fee
//!    is forfeited.
//!
//! Every listing takes exactly one terminal transition — `Listed → Sold` or
//! `Listed → Cancelled` — and the record is never deleted, so the item table
//! is an append-only ledger of marketplace activity.
//!
//! ## Ordering Discipline
//!
//! A sale flips the item to `Sold` *before* the seller's proceeds are
//! credited. A payee that somehow re-enters the escrow during settlement
//! sees a settled item, not a `Listed` one, so the same item can never be
//! settled twice. Custody transfers, which cannot call back into the
//! escrow, happen first and all-or-nothing: if the registry refuses, the
//! operation fails with no record created and no state touched.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use bazaar_registry::asset::AssetId;

use crate::custody::{AssetCustody, CustodyError};
use crate::funds::{FundsError, FundsLedger};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during marketplace operations.
///
/// All of these are precondition failures detected before any mutation —
/// a rejected operation leaves the marketplace exactly as it found it.
#[derive(Debug, Error)]
pub enum MarketError {
    /// Listings must carry a strictly positive price.
    #[error("invalid price: listings require a strictly positive price")]
    InvalidPrice,

    /// The fee payment did not match the current listing fee exactly.
    #[error("insufficient fee: paid {paid}, listing fee is {required}")]
    InsufficientFee {
        /// The amount the caller attached.
        paid: u64,
        /// The fee in force at the time of the call.
        required: u64,
    },

    /// The purchase payment did not match the item price exactly.
    /// Overpayment is rejected the same as underpayment — the escrow never
    /// strands change.
    #[error("wrong payment: paid {paid}, item price is {price}")]
    WrongPayment {
        /// The amount the caller attached.
        paid: u64,
        /// The price fixed at listing time.
        price: u64,
    },

    /// The referenced item was never listed.
    #[error("market item not found: {0}")]
    NotFound(ItemId),

    /// The item already took its terminal transition.
    #[error("already settled: item is {status}, expected Listed")]
    AlreadySettled {
        /// The item's current terminal status.
        status: ItemStatus,
    },

    /// The caller may not perform this operation.
    #[error("unauthorized: {caller} may not perform this operation")]
    Unauthorized {
        /// The address that attempted the operation.
        caller: String,
    },

    /// The asset registry refused the custody transfer.
    #[error(transparent)]
    CustodyTransferRejected(#[from] CustodyError),

    /// A settlement credit would overflow a recorded balance.
    #[error(transparent)]
    Settlement(#[from] FundsError),
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Identifier of a market item. Monotonically increasing, starting at 1,
/// never reused.
pub type ItemId = u64;

/// The lifecycle status of a market item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemStatus {
    /// Listed for sale; the escrow holds custody of the asset.
    Listed,
    /// Sold to a buyer. Terminal.
    Sold,
    /// Cancelled by the seller. Terminal.
    Cancelled,
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemStatus::Listed => write!(f, "Listed"),
            ItemStatus::Sold => write!(f, "Sold"),
            ItemStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// One listing attempt, identified by its [`ItemId`].
///
/// `seller` and `price` are fixed at creation. `owner` is the marketplace's
/// view of who the asset belongs to: `None` while the escrow holds it, the
/// buyer after a sale, and the seller again after a cancellation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketItem {
    /// Permanent identifier of this listing.
    pub item_id: ItemId,
    /// Identity of the asset registry instance the asset lives in.
    pub asset_contract: String,
    /// Identifier of the asset within that registry.
    pub asset_id: AssetId,
    /// Hex-encoded public key of the party that created the listing.
    pub seller: String,
    /// Marketplace-level owner. `None` while the item is escrowed.
    pub owner: Option<String>,
    /// Purchase price in smallest currency units. Strictly positive.
    pub price: u64,
    /// Current lifecycle status.
    pub status: ItemStatus,
    /// Timestamp when the listing was created.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the most recent state change.
    pub updated_at: DateTime<Utc>,
}

/// The marketplace escrow — listing registry, escrow state machine, and fee
/// administration in one component.
///
/// In production this state would be persisted in the chain's state trie.
/// The in-memory representation here is used for validation logic and
/// testing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Marketplace {
    /// Hex-encoded public key of the administrator and fee beneficiary.
    admin: String,
    /// The registry-level account that holds custody of listed assets.
    escrow_account: String,
    /// Fee charged on every future listing. Mutable by the admin only.
    listing_fee: u64,
    /// Collected listing fees awaiting withdrawal by the admin. Sale
    /// settlements are never staged here.
    collected_fees: u64,
    /// Next item identifier to hand out. Starts at 1, never decremented.
    next_item_id: ItemId,
    /// Append-only table of market items keyed by identifier.
    items: BTreeMap<ItemId, MarketItem>,
}

impl Marketplace {
    /// Creates a new marketplace administered by `admin`.
    ///
    /// # Arguments
    ///
    /// * `admin` - Address of the administrator and fee beneficiary.
    /// * `escrow_account` - The registry-level address assets are parked
    ///   under while listed. Sellers grant this address operator approval.
    /// * `listing_fee` - Initial fee charged per listing, in smallest
    ///   currency units.
    pub fn new(admin: String, escrow_account: String, listing_fee: u64) -> Self {
        Self {
            admin,
            escrow_account,
            listing_fee,
            collected_fees: 0,
            next_item_id: 1,
            items: BTreeMap::new(),
        }
    }

    /// Returns the listing fee currently in force.
    pub fn listing_fee(&self) -> u64 {
        self.listing_fee
    }

    /// Returns the address of the administrator.
    pub fn admin(&self) -> &str {
        &self.admin
    }

    /// Returns the registry-level escrow account.
    pub fn escrow_account(&self) -> &str {
        &self.escrow_account
    }

    /// Returns the collected, not-yet-withdrawn listing fees.
    pub fn collected_fees(&self) -> u64 {
        self.collected_fees
    }

    /// Updates the listing fee. Admin only.
    ///
    /// Applies to future listings; items already listed keep the terms they
    /// were created under.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Unauthorized`] if the caller is not the admin.
    pub fn set_listing_fee(&mut self, caller: &str, new_fee: u64) -> Result<(), MarketError> {
        if caller != self.admin {
            return Err(MarketError::Unauthorized {
                caller: caller.to_string(),
            });
        }

        debug!(old_fee = self.listing_fee, new_fee, "listing fee updated");
        self.listing_fee = new_fee;
        Ok(())
    }

    /// Lists an asset for sale and returns the new item's identifier.
    ///
    /// Pulls the asset from the caller into escrow custody — the caller must
    /// hold the asset in the registry and have granted the escrow account
    /// operator approval. The attached fee is retained in the withdrawable
    /// pool whether or not the item ever sells.
    ///
    /// # Arguments
    ///
    /// * `registry` - The asset registry holding the asset.
    /// * `caller` - The seller creating the listing.
    /// * `asset_contract` - Identity of the registry instance, recorded on
    ///   the item.
    /// * `asset_id` - The asset to list.
    /// * `price` - Purchase price in smallest currency units.
    /// * `paid_fee` - The fee payment attached to the call.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::InvalidPrice`] if `price` is zero.
    /// Returns [`MarketError::InsufficientFee`] unless `paid_fee` equals the
    /// current listing fee exactly.
    /// Returns [`MarketError::CustodyTransferRejected`] if the registry
    /// refuses the transfer — in that case no record is created, no
    /// identifier is consumed, and no fee is retained.
    pub fn create_listing<R: AssetCustody>(
        &mut self,
        registry: &mut R,
        caller: &str,
        asset_contract: &str,
        asset_id: AssetId,
        price: u64,
        paid_fee: u64,
    ) -> Result<ItemId, MarketError> {
        if price == 0 {
            return Err(MarketError::InvalidPrice);
        }

        // Exact match, not "at least": overpaid fees would be stranded.
        if paid_fee != self.listing_fee {
            return Err(MarketError::InsufficientFee {
                paid: paid_fee,
                required: self.listing_fee,
            });
        }

        let pool = self
            .collected_fees
            .checked_add(paid_fee)
            .ok_or(FundsError::Overflow {
                account: self.admin.clone(),
                current: self.collected_fees,
                credit: paid_fee,
            })?;

        // Custody moves first, all-or-nothing: a refusal here means the
        // operation never happened. The escrow pulls as itself, so the
        // registry's operator-approval check gates the listing.
        registry.transfer_from(&self.escrow_account, caller, &self.escrow_account, asset_id)?;

        let item_id = self.next_item_id;
        self.next_item_id += 1;

        let now = Utc::now();
        self.items.insert(
            item_id,
            MarketItem {
                item_id,
                asset_contract: asset_contract.to_string(),
                asset_id,
                seller: caller.to_string(),
                owner: None,
                price,
                status: ItemStatus::Listed,
                created_at: now,
                updated_at: now,
            },
        );
        self.collected_fees = pool;

        info!(item_id, asset_id, price, seller = caller, "market item listed");
        Ok(item_id)
    }

    /// Returns the item with the given identifier.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::NotFound`] if the identifier was never
    /// allocated.
    pub fn get_listing(&self, item_id: ItemId) -> Result<&MarketItem, MarketError> {
        self.items.get(&item_id).ok_or(MarketError::NotFound(item_id))
    }

    /// Executes the sale of a listed item, as one atomic unit: custody moves
    /// from escrow to `buyer`, the item flips to `Sold`, and the seller is
    /// credited exactly the listed price.
    ///
    /// # Arguments
    ///
    /// * `registry` - The asset registry holding the escrowed asset.
    /// * `funds` - The settlement ledger the proceeds are credited to.
    /// * `item_id` - The item being purchased.
    /// * `buyer` - Recipient of the asset.
    /// * `paid_amount` - The payment attached to the call.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::NotFound`] if the item does not exist.
    /// Returns [`MarketError::AlreadySettled`] if the item is not `Listed`.
    /// Returns [`MarketError::WrongPayment`] unless `paid_amount` equals the
    /// item price exactly — both underpayment and overpayment are rejected.
    pub fn execute_sale<R: AssetCustody>(
        &mut self,
        registry: &mut R,
        funds: &mut FundsLedger,
        item_id: ItemId,
        buyer: &str,
        paid_amount: u64,
    ) -> Result<(), MarketError> {
        let item = self.items.get(&item_id).ok_or(MarketError::NotFound(item_id))?;

        if item.status != ItemStatus::Listed {
            return Err(MarketError::AlreadySettled {
                status: item.status,
            });
        }

        if paid_amount != item.price {
            return Err(MarketError::WrongPayment {
                paid: paid_amount,
                price: item.price,
            });
        }

        // Validate the payout up front so nothing below can fail halfway.
        funds.check_credit(&item.seller, item.price)?;

        let seller = item.seller.clone();
        let price = item.price;
        let asset_id = item.asset_id;

        registry.transfer_from(
            &self.escrow_account,
            &self.escrow_account,
            buyer,
            asset_id,
        )?;

        // Commit the terminal status before paying out. A payee that
        // re-enters the escrow must see the item as Sold, not Listed.
        let item = self.items.get_mut(&item_id).unwrap();
        item.status = ItemStatus::Sold;
        item.owner = Some(buyer.to_string());
        item.updated_at = Utc::now();

        funds.credit(&seller, price)?;

        info!(item_id, asset_id, price, buyer, "market item sold");
        Ok(())
    }

    /// Cancels a listing and returns the asset to the seller.
    ///
    /// Only the original seller may cancel. The listing fee paid at creation
    /// is not refunded — it stays in the withdrawable pool as the cost of
    /// having listed.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::NotFound`] if the item does not exist.
    /// Returns [`MarketError::AlreadySettled`] if the item is not `Listed`.
    /// Returns [`MarketError::Unauthorized`] if `caller` is not the seller.
    pub fn cancel_listing<R: AssetCustody>(
        &mut self,
        registry: &mut R,
        item_id: ItemId,
        caller: &str,
    ) -> Result<(), MarketError> {
        let item = self.items.get(&item_id).ok_or(MarketError::NotFound(item_id))?;

        if item.status != ItemStatus::Listed {
            return Err(MarketError::AlreadySettled {
                status: item.status,
            });
        }

        if caller != item.seller {
            return Err(MarketError::Unauthorized {
                caller: caller.to_string(),
            });
        }

        let seller = item.seller.clone();
        let asset_id = item.asset_id;

        registry.transfer_from(
            &self.escrow_account,
            &self.escrow_account,
            &seller,
            asset_id,
        )?;

        let item = self.items.get_mut(&item_id).unwrap();
        item.status = ItemStatus::Cancelled;
        item.owner = Some(seller.clone());
        item.updated_at = Utc::now();

        info!(item_id, asset_id, %seller, "listing cancelled");
        Ok(())
    }

    /// Withdraws the collected listing fees to the admin and returns the
    /// amount transferred. Admin only.
    ///
    /// Only the fee pool moves — sale settlements are paid out inside
    /// [`execute_sale`](Self::execute_sale) and never pass through here.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Unauthorized`] if the caller is not the admin.
    pub fn withdraw_fees(
        &mut self,
        funds: &mut FundsLedger,
        caller: &str,
    ) -> Result<u64, MarketError> {
        if caller != self.admin {
            return Err(MarketError::Unauthorized {
                caller: caller.to_string(),
            });
        }

        let amount = self.collected_fees;
        funds.check_credit(&self.admin, amount)?;

        // Zero the pool before crediting, same discipline as a sale.
        self.collected_fees = 0;
        funds.credit(&self.admin, amount)?;

        info!(amount, "collected fees withdrawn");
        Ok(amount)
    }

    /// Returns the number of items ever listed.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Returns the items currently listed for sale, in identifier order.
    pub fn listed_items(&self) -> Vec<&MarketItem> {
        self.items
            .values()
            .filter(|item| item.status == ItemStatus::Listed)
            .collect()
    }
}
