use anyhow::Result;
use discord::Snowflake;
use sqlx::MySqlPool;

/// Privilege bitmask stored on `users.privileges`.
#[derive(sqlx::Type, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[sqlx(transparent)]
pub struct Privileges(pub i32);

impl Privileges {
    pub const USER_PUBLIC: i32 = 1 << 0;
    pub const USER_NORMAL: i32 = 1 << 1;
    /// The supporter entitlement. Set and cleared by payment processing.
    pub const USER_DONOR: i32 = 1 << 2;

    pub fn contains(self, bits: i32) -> bool {
        self.0 & bits == bits
    }
}

/// User record as read from the main database. This service never writes it.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub privileges: Privileges,
    /// Linked Discord account, `None` until the user completes the OAuth link.
    pub discord_id: Option<i64>,
}

impl User {
    pub fn is_supporter(&self) -> bool {
        self.privileges.contains(Privileges::USER_DONOR)
    }

    pub fn discord_id(&self) -> Option<Snowflake> {
        self.discord_id
            .and_then(|id| u64::try_from(id).ok())
            .map(Snowflake)
    }

    /// Find the user linked to a Discord account
    pub async fn find_by_discord_id(discord_id: Snowflake, pool: &MySqlPool) -> Result<Option<Self>> {
        let discord_id = i64::try_from(discord_id.get())?;

        sqlx::query_as::<_, Self>(
            "SELECT u.id, u.username, u.privileges, d.discord_id
             FROM users u
             INNER JOIN discord_oauth d ON u.id = d.user_id
             WHERE d.discord_id = ?",
        )
        .bind(discord_id)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    /// Find every user holding the supporter privilege, linked or not
    pub async fn find_all_supporters(pool: &MySqlPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT u.id, u.username, u.privileges, d.discord_id
             FROM users u
             LEFT JOIN discord_oauth d ON u.id = d.user_id
             WHERE u.privileges & ? <> 0",
        )
        .bind(Privileges::USER_DONOR)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }
}
