//! Integration tests for the marketplace escrow.
//!
//! These tests exercise the full listing lifecycle across crate boundaries,
//! driving the escrow against a real asset ledger and funds ledger:
//! list-then-buy, list-then-cancel, exact-payment enforcement, and the
//! double-settlement and double-listing attacks the escrow exists to stop.

use bazaar_market::escrow::{ItemStatus, MarketError, Marketplace};
use bazaar_market::funds::FundsLedger;
use bazaar_registry::asset::{AssetId, AssetLedger};

const LISTING_FEE: u64 = 1_000_000;
const REGISTRY: &str = "registry-main";

/// Helper: a marketplace, an asset ledger, and a funds ledger wired the way
/// a deployment would wire them — one asset minted to the seller, with the
/// escrow account granted operator approval.
fn deploy(seller: &str) -> (Marketplace, AssetLedger, FundsLedger, AssetId) {
    let market = Marketplace::new("admin".into(), "market-escrow".into(), LISTING_FEE);
    let mut ledger = AssetLedger::new();
    let asset_id = ledger.mint(seller, "ipfs://QmAsset/meta.json");
    ledger.set_approval_for_all(seller, "market-escrow", true);
    (market, ledger, FundsLedger::new(), asset_id)
}

// ---------------------------------------------------------------------------
// Lifecycle Tests
// ---------------------------------------------------------------------------

#[test]
fn list_then_buy_happy_path() {
    let (mut market, mut ledger, mut funds, asset_id) = deploy("seller");

    // List asset #1 at price 1.0 with fee 1.0 (in smallest units).
    let item_id = market
        .create_listing(&mut ledger, "seller", REGISTRY, asset_id, 1_000_000, LISTING_FEE)
        .unwrap();
    assert_eq!(item_id, 1);
    assert_eq!(market.get_listing(item_id).unwrap().status, ItemStatus::Listed);
    assert_eq!(ledger.owner_of(asset_id).unwrap(), "market-escrow");

    // Buyer pays exactly the price.
    market
        .execute_sale(&mut ledger, &mut funds, item_id, "buyer", 1_000_000)
        .unwrap();

    let item = market.get_listing(item_id).unwrap();
    assert_eq!(item.status, ItemStatus::Sold);
    assert_eq!(item.owner.as_deref(), Some("buyer"));
    assert_eq!(item.seller, "seller");
    assert_eq!(ledger.owner_of(asset_id).unwrap(), "buyer");
    assert_eq!(funds.balance_of("seller"), 1_000_000);
}

#[test]
fn list_then_cancel_returns_asset() {
    let (mut market, mut ledger, _, asset_id) = deploy("seller");

    let item_id = market
        .create_listing(&mut ledger, "seller", REGISTRY, asset_id, 500_000, LISTING_FEE)
        .unwrap();
    market.cancel_listing(&mut ledger, item_id, "seller").unwrap();

    assert_eq!(market.get_listing(item_id).unwrap().status, ItemStatus::Cancelled);
    assert_eq!(ledger.owner_of(asset_id).unwrap(), "seller");
}

#[test]
fn listing_records_the_seller() {
    let (mut market, mut ledger, _, asset_id) = deploy("seller");

    let item_id = market
        .create_listing(&mut ledger, "seller", REGISTRY, asset_id, 42, LISTING_FEE)
        .unwrap();

    let item = market.get_listing(item_id).unwrap();
    assert_eq!(item.seller, "seller");
    assert_eq!(item.asset_contract, REGISTRY);
    assert_eq!(item.asset_id, asset_id);
}

#[test]
fn marketplace_reports_its_listing_fee() {
    let (market, _, _, _) = deploy("seller");
    assert_eq!(market.listing_fee(), LISTING_FEE);
}

// ---------------------------------------------------------------------------
// Payment Enforcement
// ---------------------------------------------------------------------------

#[test]
fn listing_with_wrong_fee_rejected() {
    let (mut market, mut ledger, _, asset_id) = deploy("seller");

    let result = market.create_listing(&mut ledger, "seller", REGISTRY, asset_id, 1_000_000, 1_000);
    assert!(matches!(result, Err(MarketError::InsufficientFee { .. })));

    // Nothing was recorded and custody never moved.
    assert_eq!(market.item_count(), 0);
    assert_eq!(ledger.owner_of(asset_id).unwrap(), "seller");
}

#[test]
fn sale_with_wrong_payment_rejected() {
    let (mut market, mut ledger, mut funds, asset_id) = deploy("seller");

    let item_id = market
        .create_listing(&mut ledger, "seller", REGISTRY, asset_id, 1_000_000, LISTING_FEE)
        .unwrap();

    // Underpayment.
    let result = market.execute_sale(&mut ledger, &mut funds, item_id, "buyer", 500_000);
    assert!(matches!(result, Err(MarketError::WrongPayment { .. })));

    // Overpayment is rejected too — no change is ever stranded in escrow.
    let result = market.execute_sale(&mut ledger, &mut funds, item_id, "buyer", 1_500_000);
    assert!(matches!(result, Err(MarketError::WrongPayment { .. })));

    // Still listed, still escrowed, seller unpaid.
    assert_eq!(market.get_listing(item_id).unwrap().status, ItemStatus::Listed);
    assert_eq!(ledger.owner_of(asset_id).unwrap(), "market-escrow");
    assert_eq!(funds.balance_of("seller"), 0);
}

// ---------------------------------------------------------------------------
// Double-Settlement and Double-Listing
// ---------------------------------------------------------------------------

#[test]
fn second_sale_of_the_same_item_rejected() {
    let (mut market, mut ledger, mut funds, asset_id) = deploy("seller");

    let item_id = market
        .create_listing(&mut ledger, "seller", REGISTRY, asset_id, 1_000_000, LISTING_FEE)
        .unwrap();
    market
        .execute_sale(&mut ledger, &mut funds, item_id, "buyer", 1_000_000)
        .unwrap();

    let result = market.execute_sale(&mut ledger, &mut funds, item_id, "other", 1_000_000);
    assert!(matches!(result, Err(MarketError::AlreadySettled { .. })));

    // The first settlement stands: one payout, buyer keeps the asset.
    assert_eq!(funds.balance_of("seller"), 1_000_000);
    assert_eq!(ledger.owner_of(asset_id).unwrap(), "buyer");
    assert_eq!(market.get_listing(item_id).unwrap().owner.as_deref(), Some("buyer"));
}

#[test]
fn relisting_an_escrowed_asset_rejected_by_the_registry() {
    let (mut market, mut ledger, _, asset_id) = deploy("seller");

    market
        .create_listing(&mut ledger, "seller", REGISTRY, asset_id, 1_000_000, LISTING_FEE)
        .unwrap();

    // The escrow already holds the asset — the seller cannot list it again.
    let result =
        market.create_listing(&mut ledger, "seller", REGISTRY, asset_id, 2_000_000, LISTING_FEE);
    assert!(matches!(result, Err(MarketError::CustodyTransferRejected(_))));

    // Only the first listing exists.
    assert_eq!(market.item_count(), 1);
}

// ---------------------------------------------------------------------------
// Authorization
// ---------------------------------------------------------------------------

#[test]
fn non_seller_cancel_rejected_and_item_stays_listed() {
    let (mut market, mut ledger, _, asset_id) = deploy("seller");

    let item_id = market
        .create_listing(&mut ledger, "seller", REGISTRY, asset_id, 1_000_000, LISTING_FEE)
        .unwrap();

    let result = market.cancel_listing(&mut ledger, item_id, "intruder");
    assert!(matches!(result, Err(MarketError::Unauthorized { .. })));

    assert_eq!(market.get_listing(item_id).unwrap().status, ItemStatus::Listed);
    assert_eq!(ledger.owner_of(asset_id).unwrap(), "market-escrow");
}

#[test]
fn listing_without_operator_approval_rejected() {
    let mut market = Marketplace::new("admin".into(), "market-escrow".into(), LISTING_FEE);
    let mut ledger = AssetLedger::new();
    let mut funds = FundsLedger::new();

    // The seller holds the asset but never granted the escrow account
    // operator approval — the registry must refuse the pull.
    let asset_id = ledger.mint("seller", "ipfs://QmAsset/meta.json");

    let result =
        market.create_listing(&mut ledger, "seller", REGISTRY, asset_id, 1_000_000, LISTING_FEE);
    assert!(matches!(result, Err(MarketError::CustodyTransferRejected(_))));
    assert_eq!(market.item_count(), 0);
    assert_eq!(ledger.owner_of(asset_id).unwrap(), "seller");

    // Granting approval is the only thing standing between the seller and
    // a successful listing.
    ledger.set_approval_for_all("seller", "market-escrow", true);
    let item_id = market
        .create_listing(&mut ledger, "seller", REGISTRY, asset_id, 1_000_000, LISTING_FEE)
        .unwrap();
    market
        .execute_sale(&mut ledger, &mut funds, item_id, "buyer", 1_000_000)
        .unwrap();
    assert_eq!(ledger.owner_of(asset_id).unwrap(), "buyer");
}

#[test]
fn fee_administration_is_admin_only() {
    let (mut market, _, mut funds, _) = deploy("seller");

    assert!(matches!(
        market.set_listing_fee("seller", 5),
        Err(MarketError::Unauthorized { .. })
    ));
    assert!(matches!(
        market.withdraw_fees(&mut funds, "seller"),
        Err(MarketError::Unauthorized { .. })
    ));

    market.set_listing_fee("admin", 5).unwrap();
    assert_eq!(market.listing_fee(), 5);
}

// ---------------------------------------------------------------------------
// Fee Accounting
// ---------------------------------------------------------------------------

#[test]
fn cancellation_forfeits_the_listing_fee() {
    let (mut market, mut ledger, mut funds, asset_id) = deploy("seller");

    let item_id = market
        .create_listing(&mut ledger, "seller", REGISTRY, asset_id, 1_000_000, LISTING_FEE)
        .unwrap();
    market.cancel_listing(&mut ledger, item_id, "seller").unwrap();

    // The admin's withdrawable pool is unaffected by the cancellation.
    let amount = market.withdraw_fees(&mut funds, "admin").unwrap();
    assert_eq!(amount, LISTING_FEE);
    assert_eq!(funds.balance_of("admin"), LISTING_FEE);
}

#[test]
fn sale_proceeds_never_enter_the_fee_pool() {
    let (mut market, mut ledger, mut funds, asset_id) = deploy("seller");

    let item_id = market
        .create_listing(&mut ledger, "seller", REGISTRY, asset_id, 9_000_000, LISTING_FEE)
        .unwrap();
    market
        .execute_sale(&mut ledger, &mut funds, item_id, "buyer", 9_000_000)
        .unwrap();

    // The pool holds exactly the listing fee; the sale went straight to
    // the seller.
    assert_eq!(market.collected_fees(), LISTING_FEE);
    assert_eq!(funds.balance_of("seller"), 9_000_000);
}

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

#[test]
fn marketplace_serialization_roundtrip() {
    let (mut market, mut ledger, _, asset_id) = deploy("seller");
    let item_id = market
        .create_listing(&mut ledger, "seller", REGISTRY, asset_id, 777, LISTING_FEE)
        .unwrap();

    let json = serde_json::to_string(&market).unwrap();
    let restored: Marketplace = serde_json::from_str(&json).unwrap();

    assert_eq!(restored.listing_fee(), market.listing_fee());
    assert_eq!(restored.collected_fees(), market.collected_fees());
    let item = restored.get_listing(item_id).unwrap();
    assert_eq!(item.seller, "seller");
    assert_eq!(item.status, ItemStatus::Listed);
}
