//! Integration tests for the reconciliation pass.
//!
//! Uses the in-memory store and directory from `kernel::test_dependencies`.

mod common;

use std::collections::HashMap;

use crate::common::{all_member_cases, deps_for, MemberCase};
use discord::Snowflake;
use supporter_sync::domains::supporters::run_pass;
use supporter_sync::kernel::test_dependencies::{
    test_user, MockEntitlementStore, MockRoleDirectory, RoleCall, TEST_ROLE_ID,
};
use supporter_sync::kernel::TestDependencies;

fn assert_converged(test: &TestDependencies, cases: &[MemberCase]) {
    for case in cases {
        if !case.in_guild {
            continue;
        }
        let entitled = case.entitled == Some(true);
        assert_eq!(
            test.directory.has_role(case.snowflake(), TEST_ROLE_ID),
            entitled,
            "member {:?} did not converge",
            case
        );
    }
}

#[tokio::test]
async fn one_pass_converges_every_combination() {
    let cases = all_member_cases();
    let test = deps_for(&cases);

    let report = run_pass(&test.server_deps()).await;

    assert_converged(&test, &cases);
    assert_eq!(report.failed, 0);
    assert_eq!(report.failed_sweeps, 0);
    // entitled + in guild without role
    assert_eq!(report.added.len(), 1);
    // holders that are unlinked or not entitled
    assert_eq!(report.removed.len(), 2);
    // entitled + not in guild
    assert_eq!(report.skipped_absent, 1);
}

#[tokio::test]
async fn second_pass_makes_no_mutations() {
    let cases = all_member_cases();
    let test = deps_for(&cases);
    let deps = test.server_deps();

    let first = run_pass(&deps).await;
    assert!(first.mutations() > 0);
    test.directory.clear_history();

    let second = run_pass(&deps).await;

    assert_eq!(second.mutations(), 0);
    assert!(test.directory.calls().is_empty());
    assert!(test.directory.audits().is_empty());
}

#[tokio::test]
async fn no_member_is_added_and_removed_in_one_pass() {
    let cases = all_member_cases();
    let test = deps_for(&cases);

    run_pass(&test.server_deps()).await;

    let mut per_member: HashMap<Snowflake, Vec<RoleCall>> = HashMap::new();
    for call in test.directory.calls() {
        per_member.entry(call.member()).or_default().push(call);
    }
    for (member, calls) in per_member {
        assert_eq!(calls.len(), 1, "member {} got {:?}", member, calls);
    }
}

#[tokio::test]
async fn removal_earlier_in_pass_is_not_undone_when_store_flips() {
    let member = Snowflake(55);
    // Sweep A's lookup sees no supporter bit...
    let test = TestDependencies::new(
        MockEntitlementStore::new().with_user(test_user(1, false, Some(55))),
        MockRoleDirectory::new().with_member(member, &[TEST_ROLE_ID]),
    );
    // ...while Sweep B's listing already has it back
    test.store
        .set_supporter_listing(vec![test_user(1, true, Some(55))]);

    let report = run_pass(&test.server_deps()).await;

    assert_eq!(report.removed, vec![member]);
    assert!(report.added.is_empty());
    assert_eq!(report.skipped_removed_this_pass, 1);
    assert_eq!(
        test.directory.calls(),
        vec![RoleCall::Removed {
            member,
            role: TEST_ROLE_ID
        }]
    );
}

#[tokio::test]
async fn failing_member_does_not_block_neighbours() {
    let test = TestDependencies::new(
        MockEntitlementStore::new()
            .with_user(test_user(1, false, Some(1)))
            .with_user(test_user(2, false, Some(2)))
            .with_user(test_user(3, false, Some(3)))
            .with_user(test_user(4, true, Some(4)))
            .with_user(test_user(5, true, Some(5)))
            .with_user(test_user(6, true, Some(6))),
        MockRoleDirectory::new()
            .with_member(Snowflake(1), &[TEST_ROLE_ID])
            .with_member(Snowflake(2), &[TEST_ROLE_ID])
            .with_member(Snowflake(3), &[TEST_ROLE_ID])
            .with_member(Snowflake(4), &[])
            .with_member(Snowflake(5), &[])
            .with_member(Snowflake(6), &[]),
    );
    // Lookup failure in Sweep A, mutation failure in Sweep B
    test.store.fail_lookup_for(Snowflake(2));
    test.directory.fail_member(Snowflake(5));

    let report = run_pass(&test.server_deps()).await;

    assert_eq!(report.failed, 2);
    assert_eq!(report.removed, vec![Snowflake(1), Snowflake(3)]);
    assert_eq!(report.added, vec![Snowflake(4), Snowflake(6)]);
    assert!(test.directory.has_role(Snowflake(2), TEST_ROLE_ID));
    assert!(!test.directory.has_role(Snowflake(5), TEST_ROLE_ID));
}

#[tokio::test]
async fn holder_unknown_to_store_is_removed_with_one_audit() {
    let member = Snowflake(31337);
    let test = TestDependencies::new(
        MockEntitlementStore::new(),
        MockRoleDirectory::new().with_member(member, &[TEST_ROLE_ID]),
    );

    let report = run_pass(&test.server_deps()).await;

    assert_eq!(report.removed, vec![member]);
    assert!(!test.directory.has_role(member, TEST_ROLE_ID));
    let audits = test.directory.audits();
    assert_eq!(audits.len(), 1);
    assert_eq!(audits[0].text, "<@31337> just had their supporter role removed.");
}

#[tokio::test]
async fn unlinked_supporter_causes_no_platform_action() {
    let test = TestDependencies::new(
        MockEntitlementStore::new().with_user(test_user(1, true, None)),
        MockRoleDirectory::new().with_member(Snowflake(1), &[]),
    );

    let report = run_pass(&test.server_deps()).await;

    assert_eq!(report.skipped_unlinked, 1);
    assert_eq!(report.failed, 0);
    assert!(test.directory.calls().is_empty());
    assert!(test.directory.audits().is_empty());
}

#[tokio::test]
async fn entitled_holder_is_left_alone() {
    let member = Snowflake(8);
    let test = TestDependencies::new(
        MockEntitlementStore::new().with_user(test_user(1, true, Some(8))),
        MockRoleDirectory::new().with_member(member, &[TEST_ROLE_ID]),
    );

    let report = run_pass(&test.server_deps()).await;

    assert_eq!(report.mutations(), 0);
    assert!(test.directory.calls().is_empty());
    assert!(test.directory.audits().is_empty());
    assert!(test.directory.has_role(member, TEST_ROLE_ID));
}

#[tokio::test]
async fn store_outage_aborts_only_grow_sweep() {
    let test = TestDependencies::new(
        MockEntitlementStore::new().with_user(test_user(1, true, Some(2))),
        MockRoleDirectory::new()
            .with_member(Snowflake(1), &[TEST_ROLE_ID])
            .with_member(Snowflake(2), &[]),
    );
    test.store.fail_listing(true);

    let report = run_pass(&test.server_deps()).await;

    assert_eq!(report.failed_sweeps, 1);
    assert_eq!(report.removed, vec![Snowflake(1)]);
    assert!(report.added.is_empty());
}
