//! # Bazaar Marketplace Contracts
//!
//! The escrow core of the bazaar marketplace: a buyer/seller escrow that
//! couples custody transfer of a unique asset to payment settlement, with
//! no trusted intermediary in the loop.
//!
//! - **Escrow** — the listing lifecycle state machine. Takes custody of an
//!   asset when it is listed, swaps asset-for-currency atomically on sale,
//!   and returns the asset on cancellation. Collects a fixed, non-refundable
//!   listing fee into an administrator-withdrawable pool.
//! - **Custody** — the capability the escrow consumes from an asset
//!   registry: authorization-checked custody transfer plus holder and
//!   operator lookups.
//! - **Funds** — the settlement ledger. Sale proceeds and fee withdrawals
//!   are credited here synchronously, inside the operation that produced
//!   them.
//!
//! ## Design Principles
//!
//! 1. All monetary operations check for overflow — `checked_add` everywhere,
//!    because wrapping arithmetic and money do not mix.
//! 2. State transitions are explicit: enum variants, not boolean flags, and
//!    every listing takes exactly one terminal transition.
//! 3. Every operation validates before it mutates. A rejected operation
//!    leaves no trace.
//! 4. Every public type is serializable (serde) for wire transport and
//!    persistent storage.

pub mod custody;
pub mod escrow;
pub mod funds;
