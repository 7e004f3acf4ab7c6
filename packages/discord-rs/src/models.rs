use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Discord snowflake id. Sent over the wire as a decimal string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Snowflake(pub u64);

impl Snowflake {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for Snowflake {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for Snowflake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Snowflake {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Snowflake {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Str(String),
            Num(u64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Str(s) => s.parse().map(Snowflake).map_err(serde::de::Error::custom),
            Raw::Num(n) => Ok(Snowflake(n)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: Snowflake,
    pub username: String,
    #[serde(default)]
    pub bot: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GuildMember {
    pub user: User,
    #[serde(default)]
    pub roles: Vec<Snowflake>,
}

impl GuildMember {
    pub fn has_role(&self, role: Snowflake) -> bool {
        self.roles.contains(&role)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Guild {
    pub id: Snowflake,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub id: Snowflake,
    pub channel_id: Snowflake,
}

/// Slash command definition for bulk registration.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationCommand {
    pub name: String,
    pub description: String,
    /// 1 = CHAT_INPUT
    #[serde(rename = "type")]
    pub kind: u8,
}

impl ApplicationCommand {
    pub fn chat_input(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kind: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisteredCommand {
    pub id: Snowflake,
    pub name: String,
}

// =============================================================================
// Interactions (HTTP endpoint delivery)
// =============================================================================

pub const INTERACTION_PING: u8 = 1;
pub const INTERACTION_APPLICATION_COMMAND: u8 = 2;

/// Ephemeral message flag: only the invoking user sees the response.
pub const MESSAGE_FLAG_EPHEMERAL: u64 = 1 << 6;

#[derive(Debug, Clone, Deserialize)]
pub struct Interaction {
    pub id: Snowflake,
    #[serde(rename = "type")]
    pub kind: u8,
    /// Authenticates follow-ups for this interaction (valid for 15 minutes)
    #[serde(default)]
    pub token: String,
    pub data: Option<InteractionData>,
    /// Present when invoked in a guild
    pub member: Option<InteractionMember>,
    /// Present when invoked in a DM
    pub user: Option<User>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InteractionData {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InteractionMember {
    pub user: User,
}

#[derive(Debug, Clone, Serialize)]
pub struct InteractionResponse {
    /// 1 = PONG, 4 = CHANNEL_MESSAGE_WITH_SOURCE, 5 = DEFERRED_CHANNEL_MESSAGE_WITH_SOURCE
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<InteractionCallbackData>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InteractionCallbackData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub flags: u64,
}

impl InteractionResponse {
    pub fn pong() -> Self {
        Self { kind: 1, data: None }
    }

    /// A message only the invoking user can see.
    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self {
            kind: 4,
            data: Some(InteractionCallbackData {
                content: Some(content.into()),
                flags: MESSAGE_FLAG_EPHEMERAL,
            }),
        }
    }

    /// Acknowledge now, reply later by editing the original response. The
    /// eventual reply is only visible to the invoking user.
    pub fn deferred_ephemeral() -> Self {
        Self {
            kind: 5,
            data: Some(InteractionCallbackData {
                content: None,
                flags: MESSAGE_FLAG_EPHEMERAL,
            }),
        }
    }
}
