//! Steam Web API client with centralized response caching.
//!
//! Domain services consume the [`SteamApi`] port; [`SteamClient`] is the
//! production implementation. All upstream calls go through one cache-aside
//! path that stores the raw response body, then typed accessors decode it.
//! No pin or graph logic lives here.

pub mod cache;
pub mod error;
pub mod types;

pub use cache::{MemoryCache, ResponseCache};
pub use error::{Result, SteamError};
pub use types::*;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

/// Raw responses stay cached this long; identity data this stale is fine
/// for an exploration canvas.
const CACHE_TTL: Duration = Duration::from_secs(30 * 60);

/// High-level Steam operations consumed by domain services.
#[async_trait]
pub trait SteamApi: Send + Sync {
    /// Profile summary, or None for an unknown steam id.
    async fn player_summary(&self, steam_id: &str) -> Result<Option<PlayerSummary>>;

    async fn owned_games(&self, steam_id: &str) -> Result<OwnedGames>;

    async fn recently_played(&self, steam_id: &str) -> Result<RecentlyPlayed>;

    async fn friend_list(&self, steam_id: &str) -> Result<Vec<Friend>>;

    /// Store-page details, or None when the store has no entry for the app.
    async fn app_details(&self, app_id: u32) -> Result<Option<AppDetails>>;
}

pub struct SteamClient {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
    store_base: String,
    cache: Arc<dyn ResponseCache>,
}

impl SteamClient {
    pub fn new(api_base: &str, api_key: &str, cache: Arc<dyn ResponseCache>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key: api_key.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
            store_base: "https://store.steampowered.com".to_string(),
            cache,
        }
    }

    pub fn with_store_base(mut self, store_base: &str) -> Self {
        self.store_base = store_base.trim_end_matches('/').to_string();
        self
    }

    /// Cache-aside fetch: read the cache by `steam:{operation}:{key}`, on a
    /// miss call the upstream URL and store the raw body with a fixed TTL.
    async fn fetch(&self, operation: &str, key: &str, url: String) -> Result<Value> {
        let cache_key = format!("steam:{operation}:{key}");
        if let Some(raw) = self.cache.get(&cache_key).await {
            debug!(operation, key, "Steam cache hit");
            return Ok(raw);
        }

        debug!(operation, key, "Steam cache miss, calling API");
        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(SteamError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let raw: Value = resp.json().await?;
        self.cache.put(&cache_key, raw.clone(), CACHE_TTL).await;
        Ok(raw)
    }
}

#[async_trait]
impl SteamApi for SteamClient {
    async fn player_summary(&self, steam_id: &str) -> Result<Option<PlayerSummary>> {
        let url = format!(
            "{}/ISteamUser/GetPlayerSummaries/v2/?key={}&steamids={steam_id}",
            self.api_base, self.api_key
        );
        let raw = self.fetch("player-summary", steam_id, url).await?;
        let envelope: PlayerSummariesEnvelope = serde_json::from_value(raw)?;
        Ok(envelope.response.players.into_iter().next())
    }

    async fn owned_games(&self, steam_id: &str) -> Result<OwnedGames> {
        let url = format!(
            "{}/IPlayerService/GetOwnedGames/v1/?key={}&steamid={steam_id}&include_appinfo=1&include_played_free_games=1",
            self.api_base, self.api_key
        );
        let raw = self.fetch("owned-games", steam_id, url).await?;
        let envelope: OwnedGamesEnvelope = serde_json::from_value(raw)?;
        Ok(envelope.response)
    }

    async fn recently_played(&self, steam_id: &str) -> Result<RecentlyPlayed> {
        let url = format!(
            "{}/IPlayerService/GetRecentlyPlayedGames/v1/?key={}&steamid={steam_id}",
            self.api_base, self.api_key
        );
        let raw = self.fetch("recently-played", steam_id, url).await?;
        let envelope: RecentlyPlayedEnvelope = serde_json::from_value(raw)?;
        Ok(envelope.response)
    }

    async fn friend_list(&self, steam_id: &str) -> Result<Vec<Friend>> {
        let url = format!(
            "{}/ISteamUser/GetFriendList/v1/?key={}&steamid={steam_id}&relationship=friend",
            self.api_base, self.api_key
        );
        let raw = self.fetch("friend-list", steam_id, url).await?;
        let envelope: FriendListEnvelope = serde_json::from_value(raw)?;
        Ok(envelope.friendslist.friends)
    }

    async fn app_details(&self, app_id: u32) -> Result<Option<AppDetails>> {
        let url = format!("{}/api/appdetails?appids={app_id}", self.store_base);
        let raw = self
            .fetch("app-details", &app_id.to_string(), url)
            .await?;
        // The store keys its envelope by the requested app id.
        let Some(entry) = raw.get(app_id.to_string()) else {
            return Ok(None);
        };
        let entry: AppDetailsEntry = serde_json::from_value(entry.clone())?;
        if !entry.success {
            return Ok(None);
        }
        Ok(entry.data)
    }
}
