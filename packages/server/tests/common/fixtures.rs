//! Test fixtures for building synthetic guilds and user tables.

use discord::Snowflake;
use supporter_sync::kernel::test_dependencies::{
    test_user, MockEntitlementStore, MockRoleDirectory, TEST_ROLE_ID,
};
use supporter_sync::kernel::TestDependencies;

/// One synthetic member: store state and guild state.
#[derive(Debug, Clone, Copy)]
pub struct MemberCase {
    pub discord_id: u64,
    /// `None` = no user linked to this Discord account
    pub entitled: Option<bool>,
    pub in_guild: bool,
    pub holds_role: bool,
}

impl MemberCase {
    pub fn snowflake(&self) -> Snowflake {
        Snowflake(self.discord_id)
    }
}

/// Every combination of (linked/entitled, in guild, holds role) once.
pub fn all_member_cases() -> Vec<MemberCase> {
    let mut cases = Vec::new();
    let mut next_id = 1_000u64;

    for entitled in [None, Some(false), Some(true)] {
        for in_guild in [false, true] {
            for holds_role in [false, true] {
                // Only guild members can hold a guild role
                if holds_role && !in_guild {
                    continue;
                }
                cases.push(MemberCase {
                    discord_id: next_id,
                    entitled,
                    in_guild,
                    holds_role,
                });
                next_id += 1;
            }
        }
    }

    cases
}

/// Wire a set of cases into mock dependencies.
pub fn deps_for(cases: &[MemberCase]) -> TestDependencies {
    let mut store = MockEntitlementStore::new();
    let mut directory = MockRoleDirectory::new();

    for (i, case) in cases.iter().enumerate() {
        if let Some(entitled) = case.entitled {
            store = store.with_user(test_user(i as i32 + 1, entitled, Some(case.discord_id)));
        }
        if case.in_guild {
            let roles: &[Snowflake] = if case.holds_role { &[TEST_ROLE_ID] } else { &[] };
            directory = directory.with_member(case.snowflake(), roles);
        }
    }

    TestDependencies::new(store, directory)
}
