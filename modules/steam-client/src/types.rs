//! Steam Web API response shapes. Field names follow the wire format.

use serde::{Deserialize, Serialize};

// --- GetPlayerSummaries (ISteamUser/v2) ---

#[derive(Debug, Clone, Deserialize)]
pub struct PlayerSummariesEnvelope {
    pub response: PlayerSummariesResponse,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlayerSummariesResponse {
    #[serde(default)]
    pub players: Vec<PlayerSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub steamid: String,
    #[serde(default)]
    pub personaname: Option<String>,
    #[serde(default)]
    pub realname: Option<String>,
    #[serde(default)]
    pub profileurl: Option<String>,
    #[serde(default)]
    pub avatarfull: Option<String>,
    /// 0 offline, 1 online, 2 busy, 3 away, 4 snooze, 5 looking to trade,
    /// 6 looking to play.
    #[serde(default)]
    pub personastate: Option<u8>,
    /// 1 private, 2 friends only, 3 public.
    #[serde(default)]
    pub communityvisibilitystate: Option<u8>,
    /// Unix timestamp of last logoff.
    #[serde(default)]
    pub lastlogoff: Option<i64>,
    /// Unix timestamp of account creation.
    #[serde(default)]
    pub timecreated: Option<i64>,
}

impl PlayerSummary {
    pub fn persona_state_label(&self) -> &'static str {
        match self.personastate {
            Some(1) => "online",
            Some(2) => "busy",
            Some(3) => "away",
            Some(4) => "snooze",
            Some(5) => "looking to trade",
            Some(6) => "looking to play",
            _ => "offline",
        }
    }
}

// --- GetOwnedGames / GetRecentlyPlayedGames (IPlayerService/v1) ---

#[derive(Debug, Clone, Deserialize)]
pub struct OwnedGamesEnvelope {
    pub response: OwnedGames,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OwnedGames {
    #[serde(default)]
    pub game_count: u32,
    #[serde(default)]
    pub games: Vec<OwnedGame>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnedGame {
    pub appid: u32,
    #[serde(default)]
    pub name: Option<String>,
    /// Total minutes played.
    #[serde(default)]
    pub playtime_forever: u32,
    /// Minutes played in the last two weeks (recently-played responses).
    #[serde(default)]
    pub playtime_2weeks: Option<u32>,
    #[serde(default)]
    pub img_icon_url: Option<String>,
    /// Unix timestamp of the last session.
    #[serde(default)]
    pub rtime_last_played: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecentlyPlayedEnvelope {
    pub response: RecentlyPlayed,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecentlyPlayed {
    #[serde(default)]
    pub total_count: u32,
    #[serde(default)]
    pub games: Vec<OwnedGame>,
}

// --- GetFriendList (ISteamUser/v1) ---

#[derive(Debug, Clone, Deserialize)]
pub struct FriendListEnvelope {
    #[serde(default)]
    pub friendslist: FriendList,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FriendList {
    #[serde(default)]
    pub friends: Vec<Friend>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Friend {
    pub steamid: String,
    #[serde(default)]
    pub relationship: Option<String>,
    #[serde(default)]
    pub friend_since: Option<i64>,
}

// --- Store appdetails ---

#[derive(Debug, Clone, Deserialize)]
pub struct AppDetailsEntry {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<AppDetails>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppDetails {
    pub steam_appid: u32,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub short_description: Option<String>,
    #[serde(default)]
    pub header_image: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub developers: Vec<String>,
    #[serde(default)]
    pub publishers: Vec<String>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub release_date: Option<ReleaseDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Genre {
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseDate {
    #[serde(default)]
    pub coming_soon: bool,
    #[serde(default)]
    pub date: String,
}
