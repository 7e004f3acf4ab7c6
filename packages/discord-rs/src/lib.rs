// Minimal Discord REST client: the handful of guild, role, message and
// interaction endpoints the supporter sync needs. Gateway is not used.

pub mod error;
pub mod models;

use std::time::Duration;

use reqwest::{header, Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub use crate::error::{Error, Result};
pub use crate::models::{
    ApplicationCommand, CreateMessage, Embed, Guild, GuildMember, Interaction,
    InteractionCallbackData, InteractionData, InteractionMember, InteractionResponse, Message,
    RegisteredCommand, Snowflake, User, INTERACTION_APPLICATION_COMMAND, INTERACTION_PING,
    MESSAGE_FLAG_EPHEMERAL,
};

const API_BASE: &str = "https://discord.com/api/v10";

/// Page size for `GET /guilds/{id}/members` (Discord's maximum).
pub const MEMBERS_PAGE_LIMIT: usize = 1000;

/// Applied to every request, connect through body.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Retries after a 429 before the rate limit is surfaced as an error.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Upper bound on a single rate-limit wait.
const MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(60);

#[derive(Deserialize)]
struct RateLimitBody {
    retry_after: f64,
}

/// How long Discord asked us to wait, from the JSON body or the
/// `X-RateLimit-Reset-After` / `Retry-After` headers (seconds).
fn retry_after(headers: &header::HeaderMap, body: &str) -> Duration {
    let from_body = serde_json::from_str::<RateLimitBody>(body)
        .ok()
        .map(|b| b.retry_after);
    let from_header = || {
        ["x-ratelimit-reset-after", "retry-after"]
            .iter()
            .find_map(|name| headers.get(*name)?.to_str().ok()?.parse::<f64>().ok())
    };

    from_body
        .or_else(from_header)
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(Duration::from_secs_f64)
        .unwrap_or(Duration::from_secs(1))
        .min(MAX_RATE_LIMIT_WAIT)
}

#[derive(Debug, Clone)]
pub struct DiscordOptions {
    pub token: String,
    pub application_id: Snowflake,
}

#[derive(Debug, Clone)]
pub struct DiscordClient {
    options: DiscordOptions,
    http: Client,
    base_url: String,
}

impl DiscordClient {
    pub fn new(options: DiscordOptions) -> Result<Self> {
        Self::with_base_url(options, API_BASE)
    }

    /// Point the client at a different API root (proxies, tests).
    pub fn with_base_url(options: DiscordOptions, base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            options,
            http,
            base_url: base_url.into(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .header(header::AUTHORIZATION, format!("Bot {}", self.options.token))
    }

    /// Send a request, waiting out and retrying 429s up to
    /// `MAX_RATE_LIMIT_RETRIES` times.
    async fn send(&self, mut builder: RequestBuilder, what: &str) -> Result<Response> {
        let mut attempt = 0;

        loop {
            // Bodies here are always buffered JSON, so this only fails for streams
            let retry = builder.try_clone();
            let response = builder.send().await?;

            let rate_limited = response.status() == StatusCode::TOO_MANY_REQUESTS;
            if rate_limited && attempt < MAX_RATE_LIMIT_RETRIES {
                if let Some(next) = retry {
                    let headers = response.headers().clone();
                    let body = response.text().await.unwrap_or_default();
                    let wait = retry_after(&headers, &body);
                    attempt += 1;
                    tracing::warn!(
                        attempt,
                        wait_ms = wait.as_millis() as u64,
                        "discord rate limited request for {}, retrying",
                        what
                    );
                    tokio::time::sleep(wait).await;
                    builder = next;
                    continue;
                }
            }

            return Self::check(response, what).await;
        }
    }

    async fn check(response: Response, what: &str) -> Result<Response> {
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(what.to_string()));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, %body, "discord request for {} failed", what);
            return Err(Error::Api { status, body });
        }

        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder, what: &str) -> Result<T> {
        let response = self.send(builder, what).await?;
        Ok(response.json::<T>().await?)
    }

    pub async fn get_guild(&self, guild_id: Snowflake) -> Result<Guild> {
        let builder = self.request(Method::GET, &format!("/guilds/{}", guild_id));
        self.send_json(builder, &format!("guild {}", guild_id)).await
    }

    /// Fetch every member of a guild, following the `after` cursor until a
    /// short page is returned. Requires the privileged members intent.
    pub async fn list_guild_members(&self, guild_id: Snowflake) -> Result<Vec<GuildMember>> {
        let mut members = Vec::new();
        let mut after = Snowflake(0);

        loop {
            let builder = self
                .request(Method::GET, &format!("/guilds/{}/members", guild_id))
                .query(&[
                    ("limit", MEMBERS_PAGE_LIMIT.to_string()),
                    ("after", after.to_string()),
                ]);
            let page: Vec<GuildMember> = self
                .send_json(builder, &format!("members of guild {}", guild_id))
                .await?;

            let page_len = page.len();
            if let Some(last) = page.iter().map(|m| m.user.id).max() {
                after = last;
            }
            members.extend(page);

            if page_len < MEMBERS_PAGE_LIMIT {
                break;
            }
        }

        Ok(members)
    }

    /// Look up a single guild member. A member who is not in the guild is
    /// `Ok(None)`, not an error.
    pub async fn get_guild_member(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
    ) -> Result<Option<GuildMember>> {
        let builder = self.request(
            Method::GET,
            &format!("/guilds/{}/members/{}", guild_id, user_id),
        );
        match self.send_json(builder, &format!("member {}", user_id)).await {
            Ok(member) => Ok(Some(member)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn add_member_role(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        role_id: Snowflake,
        reason: &str,
    ) -> Result<()> {
        let builder = self
            .request(
                Method::PUT,
                &format!("/guilds/{}/members/{}/roles/{}", guild_id, user_id, role_id),
            )
            .header("X-Audit-Log-Reason", urlencoding::encode(reason).into_owned());
        self.send(builder, &format!("role {} on member {}", role_id, user_id))
            .await
            .map(|_| ())
    }

    pub async fn remove_member_role(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        role_id: Snowflake,
        reason: &str,
    ) -> Result<()> {
        let builder = self
            .request(
                Method::DELETE,
                &format!("/guilds/{}/members/{}/roles/{}", guild_id, user_id, role_id),
            )
            .header("X-Audit-Log-Reason", urlencoding::encode(reason).into_owned());
        self.send(builder, &format!("role {} on member {}", role_id, user_id))
            .await
            .map(|_| ())
    }

    pub async fn create_message(
        &self,
        channel_id: Snowflake,
        message: &CreateMessage,
    ) -> Result<Message> {
        let builder = self
            .request(Method::POST, &format!("/channels/{}/messages", channel_id))
            .json(message);
        self.send_json(builder, &format!("channel {}", channel_id))
            .await
    }

    /// Replace the guild-scoped slash commands of this application.
    pub async fn overwrite_guild_commands(
        &self,
        guild_id: Snowflake,
        commands: &[ApplicationCommand],
    ) -> Result<Vec<RegisteredCommand>> {
        let builder = self
            .request(
                Method::PUT,
                &format!(
                    "/applications/{}/guilds/{}/commands",
                    self.options.application_id, guild_id
                ),
            )
            .json(commands);
        self.send_json(builder, &format!("commands of guild {}", guild_id))
            .await
    }

    /// Fill in the reply to a deferred interaction. Interaction webhooks are
    /// authenticated by the token in the path, not the bot token.
    pub async fn edit_original_interaction_response(
        &self,
        interaction_token: &str,
        content: &str,
    ) -> Result<()> {
        #[derive(Serialize)]
        struct Edit<'a> {
            content: &'a str,
        }

        let builder = self
            .http
            .patch(format!(
                "{}/webhooks/{}/{}/messages/@original",
                self.base_url, self.options.application_id, interaction_token
            ))
            .json(&Edit { content });
        self.send(builder, "original interaction response")
            .await
            .map(|_| ())
    }
}
