//! Integration tests for the self-service supporter command.

mod common;

use discord::Snowflake;
use supporter_sync::domains::supporters::{run_pass, sync_member, SelfServiceOutcome};
use supporter_sync::kernel::test_dependencies::{
    test_user, MockEntitlementStore, MockRoleDirectory, RoleCall, TEST_AUDIT_CHANNEL_ID,
    TEST_ROLE_ID,
};
use supporter_sync::kernel::TestDependencies;

const REQUESTER: Snowflake = Snowflake(123_456);

fn requester(entitled: Option<bool>, holds_role: bool) -> TestDependencies {
    let mut store = MockEntitlementStore::new();
    if let Some(entitled) = entitled {
        store = store.with_user(test_user(1, entitled, Some(REQUESTER.get())));
    }
    let roles: &[Snowflake] = if holds_role { &[TEST_ROLE_ID] } else { &[] };
    TestDependencies::new(store, MockRoleDirectory::new().with_member(REQUESTER, roles))
}

#[tokio::test]
async fn unlinked_requester_is_told_to_link() {
    for holds_role in [false, true] {
        let test = requester(None, holds_role);

        let outcome = sync_member(&test.server_deps(), REQUESTER).await;

        assert_eq!(outcome, SelfServiceOutcome::NotLinked);
        assert!(test.directory.calls().is_empty());
        assert!(test.directory.audits().is_empty());
        assert_eq!(test.directory.has_role(REQUESTER, TEST_ROLE_ID), holds_role);
    }
}

#[tokio::test]
async fn entitled_holder_is_already_granted() {
    let test = requester(Some(true), true);

    let outcome = sync_member(&test.server_deps(), REQUESTER).await;

    assert_eq!(outcome, SelfServiceOutcome::AlreadyGranted);
    assert!(test.directory.calls().is_empty());
    assert!(test.directory.audits().is_empty());
}

#[tokio::test]
async fn entitled_requester_without_role_is_granted() {
    let test = requester(Some(true), false);

    let outcome = sync_member(&test.server_deps(), REQUESTER).await;

    assert_eq!(outcome, SelfServiceOutcome::Granted);
    assert_eq!(
        test.directory.calls(),
        vec![RoleCall::Added {
            member: REQUESTER,
            role: TEST_ROLE_ID
        }]
    );
    let audits = test.directory.audits();
    assert_eq!(audits.len(), 1);
    assert_eq!(audits[0].channel, TEST_AUDIT_CHANNEL_ID);
    assert_eq!(audits[0].text, "<@123456> just had their supporter role added.");
}

#[tokio::test]
async fn lapsed_holder_has_role_removed() {
    let test = requester(Some(false), true);

    let outcome = sync_member(&test.server_deps(), REQUESTER).await;

    assert_eq!(outcome, SelfServiceOutcome::Removed);
    assert_eq!(
        test.directory.calls(),
        vec![RoleCall::Removed {
            member: REQUESTER,
            role: TEST_ROLE_ID
        }]
    );
    assert_eq!(
        test.directory.audits()[0].text,
        "<@123456> just had their supporter role removed."
    );
}

#[tokio::test]
async fn non_supporter_without_role_is_not_entitled() {
    let test = requester(Some(false), false);

    let outcome = sync_member(&test.server_deps(), REQUESTER).await;

    assert_eq!(outcome, SelfServiceOutcome::NotEntitled);
    assert!(test.directory.calls().is_empty());
}

#[tokio::test]
async fn grant_succeeds_even_if_audit_fails() {
    let test = requester(Some(true), false);
    test.directory.fail_audit(true);

    let outcome = sync_member(&test.server_deps(), REQUESTER).await;

    assert_eq!(outcome, SelfServiceOutcome::Granted);
    assert!(test.directory.has_role(REQUESTER, TEST_ROLE_ID));
}

#[tokio::test]
async fn linked_requester_reaches_same_state_as_pass() {
    // Unlinked requesters are only told to link; the pass handles their role
    for entitled in [Some(false), Some(true)] {
        for holds_role in [false, true] {
            let via_command = requester(entitled, holds_role);
            let via_pass = requester(entitled, holds_role);

            sync_member(&via_command.server_deps(), REQUESTER).await;
            run_pass(&via_pass.server_deps()).await;

            assert_eq!(
                via_command.directory.has_role(REQUESTER, TEST_ROLE_ID),
                via_pass.directory.has_role(REQUESTER, TEST_ROLE_ID),
                "diverged for entitled={:?} holds_role={}",
                entitled,
                holds_role
            );
        }
    }
}

#[tokio::test]
async fn repeated_requests_follow_store_changes() {
    let test = requester(Some(true), false);
    let deps = test.server_deps();

    assert_eq!(sync_member(&deps, REQUESTER).await, SelfServiceOutcome::Granted);
    assert_eq!(
        sync_member(&deps, REQUESTER).await,
        SelfServiceOutcome::AlreadyGranted
    );

    test.store
        .upsert_user(test_user(1, false, Some(REQUESTER.get())));

    assert_eq!(sync_member(&deps, REQUESTER).await, SelfServiceOutcome::Removed);
    assert_eq!(
        sync_member(&deps, REQUESTER).await,
        SelfServiceOutcome::NotEntitled
    );
}
