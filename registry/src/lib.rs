//! # Bazaar Asset Registry
//!
//! The ownership ledger for unique, non-fungible assets traded on the bazaar
//! marketplace. The registry is deliberately small: it issues sequential
//! asset identifiers, records the current holder and a metadata URI for each
//! asset, and moves custody only when the caller is authorized to move it.
//!
//! Authorization comes in three flavors, checked in order on every transfer:
//!
//! 1. The caller **is** the current holder.
//! 2. The holder granted the caller a per-asset approval.
//! 3. The holder granted the caller blanket operator approval, covering all
//!    of the holder's assets.
//!
//! The marketplace escrow relies on flavor 3: a seller grants the escrow
//! operator approval once, and the escrow can then pull listed assets into
//! custody and push them back out on sale or cancellation.

pub mod asset;
