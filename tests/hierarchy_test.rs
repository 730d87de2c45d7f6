//! Integration tests for Hierarchy structural operations (unbounded topology)

use std::collections::HashSet;

use rstest::{fixture, rstest};

use sponsor_tree::domain::{DomainError, Hierarchy, Member};
use sponsor_tree::util::testing;

#[ctor::ctor]
fn init() {
    testing::init_test_setup();
}

fn ids(members: Vec<&Member>) -> Vec<String> {
    members.into_iter().map(|m| m.id().to_string()).collect()
}

/// Every structural invariant observable through the public API.
fn assert_consistent(h: &Hierarchy) {
    let mut seen = HashSet::new();
    for member in h.members() {
        assert!(seen.insert(member.id().to_string()), "duplicate id {}", member.id());

        // uplines terminate without revisiting anyone
        let ups = h.uplines(member.id());
        let unique: HashSet<&str> = ups.iter().map(|m| m.id()).collect();
        assert_eq!(unique.len(), ups.len(), "cycle above {}", member.id());
        assert!(!unique.contains(member.id()));

        // child sequence and sibling links agree
        let children = h.children_of(member.id());
        for (i, child) in children.iter().enumerate() {
            assert_eq!(h.sponsor_of(child.id()).map(|s| s.id()), Some(member.id()));
            let prev = h.previous_sibling_of(child.id()).map(|m| m.id());
            let next = h.next_sibling_of(child.id()).map(|m| m.id());
            let want_prev = i.checked_sub(1).map(|p| children[p].id());
            let want_next = children.get(i + 1).map(|m| m.id());
            assert_eq!(prev, want_prev, "previous sibling of {}", child.id());
            assert_eq!(next, want_next, "next sibling of {}", child.id());
        }
    }
    // pre-order over the forest reaches every member exactly once
    assert_eq!(h.iter().count(), h.len());
}

/// C -> { A -> { A1, A2, A3 }, B -> { B1 } }
#[fixture]
fn company() -> Hierarchy {
    let mut h = Hierarchy::default();
    h.attach(Some("C"), "Company", None).unwrap();
    h.attach(Some("A"), "Alice", Some("C")).unwrap();
    h.attach(Some("B"), "Bob", Some("C")).unwrap();
    h.attach(Some("A1"), "Ann", Some("A")).unwrap();
    h.attach(Some("A2"), "Abe", Some("A")).unwrap();
    h.attach(Some("A3"), "Ada", Some("A")).unwrap();
    h.attach(Some("B1"), "Ben", Some("B")).unwrap();
    h
}

#[rstest]
fn given_members_without_sponsor_when_attaching_then_placed_under_root() {
    let mut h = Hierarchy::default();
    h.attach(None, "Company", None).unwrap();
    h.attach(None, "Alice", None).unwrap();

    assert_eq!(h.root().unwrap().id(), "M1");
    assert_eq!(h.sponsor_of("M2").unwrap().id(), "M1");
    assert_eq!(h.top_level_members().len(), 1);
    assert_consistent(&h);
}

#[rstest]
fn given_blank_id_when_attaching_then_treated_as_omitted(mut company: Hierarchy) {
    let member = company.attach(Some("  "), "Bea", Some("B")).unwrap();
    assert_eq!(member.id(), "B-2");
}

#[rstest]
fn given_synthesized_id_taken_when_attaching_then_suffix_added(mut company: Hierarchy) {
    company.attach(Some("B-2"), "Squatter", Some("A1")).unwrap();

    let member = company.attach(None, "Bea", Some("B")).unwrap();

    assert_eq!(member.id(), "B-2-1");
    assert_consistent(&company);
}

#[rstest]
fn given_tree_when_querying_then_levels_and_listings_match(company: Hierarchy) {
    assert_eq!(company.level("C"), Some(0));
    assert_eq!(company.level("A2"), Some(2));
    assert_eq!(company.level("nope"), None);
    assert_eq!(ids(company.uplines("A2")), vec!["A", "C"]);
    assert!(company.uplines("C").is_empty());
    assert!(company.uplines("nope").is_empty());
    assert_eq!(
        ids(company.all_downlines("C")),
        vec!["A", "A1", "A2", "A3", "B", "B1"]
    );
    assert!(company.all_downlines("B1").is_empty());
    assert_eq!(
        ids(company.breadth_first()),
        vec!["C", "A", "B", "A1", "A2", "A3", "B1"]
    );
    assert_eq!(company.depth(), 3);
}

#[rstest]
#[case("A1")]
#[case("A2")]
#[case("A3")]
fn given_any_sibling_position_when_reparenting_then_links_repaired(
    mut company: Hierarchy,
    #[case] moving: &str,
) {
    company.reparent(moving, "B").unwrap();

    assert_eq!(company.sponsor_of(moving).unwrap().id(), "B");
    assert_eq!(ids(company.children_of("B")).last().unwrap(), moving);
    assert_eq!(company.children_of("A").len(), 2);
    assert_consistent(&company);
}

#[rstest]
fn given_subtree_when_reparenting_then_descendants_follow(mut company: Hierarchy) {
    company.reparent("A", "B1").unwrap();

    assert_eq!(ids(company.uplines("A3")), vec!["A", "B1", "B", "C"]);
    assert_eq!(company.depth(), 5);
    assert_consistent(&company);
}

#[rstest]
#[case("A", "A")]
#[case("A", "A3")]
#[case("C", "B1")]
fn given_target_inside_own_subtree_when_reparenting_then_cycle_rejected(
    mut company: Hierarchy,
    #[case] member: &str,
    #[case] sponsor: &str,
) {
    let err = company.reparent(member, sponsor).unwrap_err();

    assert!(matches!(err, DomainError::CycleDetected { .. }));
    assert_consistent(&company);
    assert_eq!(company.sponsor_of("A").unwrap().id(), "C");
}

#[rstest]
fn given_unknown_ids_when_reparenting_then_not_found_errors(mut company: Hierarchy) {
    assert_eq!(
        company.reparent("X", "C").unwrap_err(),
        DomainError::MemberNotFound("X".into())
    );
    assert_eq!(
        company.reparent("A", "X").unwrap_err(),
        DomainError::SponsorNotFound("X".into())
    );
}

#[rstest]
fn given_middle_child_when_inserting_parent_then_position_kept(mut company: Hierarchy) {
    let new_id = company.insert_parent("A2", "Mid").unwrap().id().to_string();

    assert_eq!(new_id, "A-4");
    assert_eq!(ids(company.children_of("A")), vec!["A1", "A-4", "A3"]);
    assert_eq!(ids(company.children_of("A-4")), vec!["A2"]);
    assert_eq!(ids(company.uplines("A2")), vec!["A-4", "A", "C"]);
    assert_consistent(&company);
}

#[rstest]
fn given_root_when_inserting_parent_then_new_member_is_root(mut company: Hierarchy) {
    let new_id = company.insert_parent("C", "Holding").unwrap().id().to_string();

    assert_eq!(new_id, "M8");
    assert_eq!(company.root().unwrap().id(), "M8");
    assert_eq!(company.top_level_members().len(), 1);
    assert_eq!(company.level("B1"), Some(3));
    assert_consistent(&company);
}

#[rstest]
fn given_unknown_child_when_inserting_parent_then_member_not_found(mut company: Hierarchy) {
    let before = company.len();
    assert_eq!(
        company.insert_parent("X", "Nobody").unwrap_err(),
        DomainError::MemberNotFound("X".into())
    );
    assert_eq!(company.len(), before);
}

#[rstest]
fn given_sales_when_computing_volume_then_subtree_sum(mut company: Hierarchy) {
    for (id, amount) in [("A1", 100.0), ("A3", 50.0), ("B1", 25.0), ("C", 5.0)] {
        company.find_mut(id).unwrap().add_own_sales(amount);
    }

    assert_eq!(company.sales_volume("A"), Some(150.0));
    assert_eq!(company.sales_volume("B"), Some(25.0));
    assert_eq!(company.sales_volume("C"), Some(180.0));
    assert_eq!(company.sales_volume("nope"), None);
}

#[rstest]
fn given_many_mutations_when_done_then_structure_stays_consistent(mut company: Hierarchy) {
    company.reparent("B", "A2").unwrap();
    company.insert_parent("A2", "Mid").unwrap();
    company.attach(None, "Late", Some("B1")).unwrap();
    company.reparent("A1", "B1").unwrap();
    company.insert_parent("B1", "Above Ben").unwrap();
    company.reparent("A3", "A1").unwrap();

    assert_consistent(&company);
    assert_eq!(company.len(), 10);
    assert_eq!(company.top_level_members().len(), 1);
}

#[rstest]
fn given_deep_chain_when_traversing_then_no_recursion_limit() {
    let mut h = Hierarchy::default();
    let mut sponsor = h.attach(Some("L0"), "Level 0", None).unwrap().id().to_string();
    for depth in 1..20_000 {
        sponsor = h
            .attach(Some(format!("L{depth}").as_str()), "deep", Some(sponsor.as_str()))
            .unwrap()
            .id()
            .to_string();
    }

    assert_eq!(h.depth(), 20_000);
    assert_eq!(h.uplines(&sponsor).len(), 19_999);
    assert_eq!(h.all_downlines("L0").len(), 19_999);
    assert_eq!(h.iter_postorder().count(), 20_000);
}
