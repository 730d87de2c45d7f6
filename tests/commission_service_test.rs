//! Integration tests for CommissionEngine on the Company/Alice/Bob/Eve chain.

use rstest::{fixture, rstest};

use sponsor_tree::application::services::{CommissionEngine, SaleOutcome, WeightingPolicy};
use sponsor_tree::application::ApplicationError;
use sponsor_tree::domain::{DomainError, Hierarchy, MemberStatus};

const EPS: f64 = 1e-9;

/// C (Company) -> A (Alice) -> B (Bob) -> E (Eve)
#[fixture]
fn chain() -> Hierarchy {
    let mut h = Hierarchy::default();
    h.attach(Some("C"), "Company", None).unwrap();
    h.attach(Some("A"), "Alice", Some("C")).unwrap();
    h.attach(Some("B"), "Bob", Some("A")).unwrap();
    h.attach(Some("E"), "Eve", Some("B")).unwrap();
    h
}

fn balance(h: &Hierarchy, id: &str) -> f64 {
    h.find(id).unwrap().balance()
}

// ============================================================
// distribute_by_position
// ============================================================

#[rstest]
fn given_chain_when_distributing_by_position_then_nearest_uplines_credited(mut chain: Hierarchy) {
    let engine = CommissionEngine::default();

    let payouts = engine
        .distribute_by_position(&mut chain, "E", 200.0, &[0.10, 0.05])
        .unwrap();

    assert!((balance(&chain, "B") - 20.0).abs() < EPS);
    assert!((balance(&chain, "A") - 10.0).abs() < EPS);
    assert_eq!(balance(&chain, "C"), 0.0);
    assert_eq!(balance(&chain, "E"), 0.0);
    assert_eq!(payouts.len(), 2);
    assert_eq!(payouts[0].member_id, "B");
    assert_eq!(payouts[0].level, 1);
    assert_eq!(payouts[1].member_id, "A");
}

#[rstest]
fn given_more_percentages_than_uplines_when_distributing_then_extra_ignored(
    mut chain: Hierarchy,
) {
    let engine = CommissionEngine::default();

    let payouts = engine
        .distribute_by_position(&mut chain, "A", 100.0, &[0.10, 0.05, 0.02])
        .unwrap();

    assert_eq!(payouts.len(), 1);
    assert!((balance(&chain, "C") - 10.0).abs() < EPS);
}

#[rstest]
fn given_inactive_seller_when_distributing_by_position_then_still_credited(
    mut chain: Hierarchy,
) {
    chain
        .find_mut("E")
        .unwrap()
        .set_status(MemberStatus::Inactive);
    let engine = CommissionEngine::default();

    engine
        .distribute_by_position(&mut chain, "E", 100.0, &[0.10])
        .unwrap();

    assert!((balance(&chain, "B") - 10.0).abs() < EPS);
}

#[rstest]
fn given_unknown_seller_when_distributing_then_member_not_found(mut chain: Hierarchy) {
    let engine = CommissionEngine::default();

    let err = engine
        .distribute_by_position(&mut chain, "X", 100.0, &[0.10])
        .unwrap_err();

    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::MemberNotFound(ref id)) if id == "X"
    ));
}

// ============================================================
// record_sale
// ============================================================

#[rstest]
fn given_seller_rate_half_when_recording_sale_then_pool_split_root_first(mut chain: Hierarchy) {
    chain.find_mut("E").unwrap().set_commission_rate(0.5);
    let engine = CommissionEngine::default();

    let outcome = engine.record_sale(&mut chain, "E", 10_000.0).unwrap();

    let receipt = outcome.receipt().expect("sale recorded");
    assert!((balance(&chain, "E") - 5000.0).abs() < EPS);
    assert_eq!(chain.find("E").unwrap().own_sales(), 10_000.0);
    let upline_total = balance(&chain, "B") + balance(&chain, "A") + balance(&chain, "C");
    assert!((upline_total - 5000.0).abs() < 1e-6);
    assert!(balance(&chain, "C") > balance(&chain, "A"));
    assert!(balance(&chain, "A") > balance(&chain, "B"));
    assert!((receipt.self_commission + receipt.distributed() - 10_000.0).abs() < 1e-6);
    // root first
    let order: Vec<&str> = receipt.payouts.iter().map(|p| p.member_id.as_str()).collect();
    assert_eq!(order, vec!["C", "A", "B"]);
}

#[rstest]
fn given_sqrt_weighting_when_recording_sale_then_shares_match_formula(mut chain: Hierarchy) {
    let engine = CommissionEngine::new(WeightingPolicy::default());

    engine.record_sale(&mut chain, "E", 1000.0).unwrap();

    // rate 0: whole sale goes to the pool; weights sqrt(3) : sqrt(2) : 1
    let total = 3f64.sqrt() + 2f64.sqrt() + 1.0;
    assert!((balance(&chain, "C") - 1000.0 * 3f64.sqrt() / total).abs() < 1e-9);
    assert!((balance(&chain, "A") - 1000.0 * 2f64.sqrt() / total).abs() < 1e-9);
    assert!((balance(&chain, "B") - 1000.0 / total).abs() < 1e-9);
}

#[rstest]
#[case(MemberStatus::Inactive)]
#[case(MemberStatus::Terminated)]
fn given_non_active_seller_when_recording_sale_then_nothing_changes(
    mut chain: Hierarchy,
    #[case] status: MemberStatus,
) {
    chain.find_mut("E").unwrap().set_status(status);
    let engine = CommissionEngine::default();

    let outcome = engine.record_sale(&mut chain, "E", 500.0).unwrap();

    assert_eq!(
        outcome,
        SaleOutcome::SellerNotActive {
            seller_id: "E".to_string(),
            status
        }
    );
    for id in ["C", "A", "B", "E"] {
        assert_eq!(balance(&chain, id), 0.0);
    }
    assert_eq!(chain.find("E").unwrap().own_sales(), 0.0);
}

#[rstest]
fn given_root_seller_when_recording_sale_then_only_self_commission(mut chain: Hierarchy) {
    chain.find_mut("C").unwrap().set_commission_rate(0.2);
    let engine = CommissionEngine::default();

    let outcome = engine.record_sale(&mut chain, "C", 100.0).unwrap();

    let receipt = outcome.receipt().unwrap();
    assert!(receipt.payouts.is_empty());
    assert!((receipt.pool - 80.0).abs() < EPS);
    assert!((balance(&chain, "C") - 20.0).abs() < EPS);
}

// ============================================================
// record_sale_with_percentages
// ============================================================

#[rstest]
fn given_caller_percentages_when_recording_sale_then_normalized_root_first(
    mut chain: Hierarchy,
) {
    let engine = CommissionEngine::default();

    // root first: C gets 3/6, A gets 2/6, B gets 1/6 of the pool
    engine
        .record_sale_with_percentages(&mut chain, "E", 600.0, &[3.0, 2.0, 1.0])
        .unwrap();

    assert!((balance(&chain, "C") - 300.0).abs() < EPS);
    assert!((balance(&chain, "A") - 200.0).abs() < EPS);
    assert!((balance(&chain, "B") - 100.0).abs() < EPS);
}

#[rstest]
fn given_fewer_percentages_than_uplines_when_recording_sale_then_only_farthest_paid(
    mut chain: Hierarchy,
) {
    let engine = CommissionEngine::default();

    engine
        .record_sale_with_percentages(&mut chain, "E", 100.0, &[1.0, 1.0])
        .unwrap();

    assert!((balance(&chain, "C") - 50.0).abs() < EPS);
    assert!((balance(&chain, "A") - 50.0).abs() < EPS);
    assert_eq!(balance(&chain, "B"), 0.0);
}

#[rstest]
#[case(vec![0.0, 0.0, 0.0])]
#[case(vec![1.0, -1.0])]
fn given_non_positive_percentage_sum_when_recording_sale_then_no_upline_credit(
    mut chain: Hierarchy,
    #[case] percentages: Vec<f64>,
) {
    chain.find_mut("E").unwrap().set_commission_rate(0.1);
    let engine = CommissionEngine::default();

    let outcome = engine
        .record_sale_with_percentages(&mut chain, "E", 100.0, &percentages)
        .unwrap();

    assert!(outcome.receipt().unwrap().payouts.is_empty());
    assert!((balance(&chain, "E") - 10.0).abs() < EPS);
    for id in ["C", "A", "B"] {
        assert_eq!(balance(&chain, id), 0.0);
    }
}
