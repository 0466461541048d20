use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// --- Identifier namespaces ---

/// External identifier namespaces recognized across domains.
///
/// The derived `Ord` on this enum is load-bearing: identifier maps are
/// `BTreeMap<Namespace, String>`, so iteration order (and therefore the
/// precedence used when several identifiers could each resolve an entity)
/// is the variant order declared here. Platform accounts rank before
/// social accounts, which rank before internal correlation keys.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    Steam,
    Epic,
    Gog,
    Xbox,
    Playstation,
    Nintendo,
    Discord,
    Twitch,
    /// Internal id of the owning player, used to correlate libraries and
    /// library lists back to a player record.
    Player,
    /// Which platform a library belongs to ("steam", "epic", ...).
    LibrarySource,
    Internal,
}

impl Namespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Steam => "steam",
            Namespace::Epic => "epic",
            Namespace::Gog => "gog",
            Namespace::Xbox => "xbox",
            Namespace::Playstation => "playstation",
            Namespace::Nintendo => "nintendo",
            Namespace::Discord => "discord",
            Namespace::Twitch => "twitch",
            Namespace::Player => "player",
            Namespace::LibrarySource => "library_source",
            Namespace::Internal => "internal",
        }
    }

    /// Platform account namespaces, the ones a library can be sourced from.
    pub fn platforms() -> &'static [Namespace] {
        &[
            Namespace::Steam,
            Namespace::Epic,
            Namespace::Gog,
            Namespace::Xbox,
            Namespace::Playstation,
            Namespace::Nintendo,
        ]
    }

    /// Map a library source string ("steam", "epic", ...) to its platform
    /// namespace.
    pub fn platform_from_source(source: &str) -> Option<Namespace> {
        Namespace::platforms()
            .iter()
            .copied()
            .find(|ns| ns.as_str() == source)
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Namespace {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "steam" => Ok(Namespace::Steam),
            "epic" => Ok(Namespace::Epic),
            "gog" => Ok(Namespace::Gog),
            "xbox" => Ok(Namespace::Xbox),
            "playstation" => Ok(Namespace::Playstation),
            "nintendo" => Ok(Namespace::Nintendo),
            "discord" => Ok(Namespace::Discord),
            "twitch" => Ok(Namespace::Twitch),
            "player" => Ok(Namespace::Player),
            "library_source" => Ok(Namespace::LibrarySource),
            "internal" => Ok(Namespace::Internal),
            other => Err(format!("unrecognized identifier namespace: {other}")),
        }
    }
}

pub type IdentifierMap = BTreeMap<Namespace, String>;

// --- Typed property values ---

/// Scalar value allowed in property, preview, parameter, and context bags.
///
/// Untagged variant order matters for deserialization: timestamps are
/// RFC 3339 strings and must be tried before the plain text fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Number(f64),
    Flag(bool),
    Timestamp(DateTime<Utc>),
    Text(String),
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::Text(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        PropertyValue::Text(v)
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        PropertyValue::Number(v)
    }
}

impl From<u32> for PropertyValue {
    fn from(v: u32) -> Self {
        PropertyValue::Number(v as f64)
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        PropertyValue::Flag(v)
    }
}

impl From<DateTime<Utc>> for PropertyValue {
    fn from(v: DateTime<Utc>) -> Self {
        PropertyValue::Timestamp(v)
    }
}

pub type PropertyMap = BTreeMap<String, PropertyValue>;

// --- Entity kinds ---

/// The four entity categories, each with its own identity store, providers,
/// and Consume implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    Player,
    Library,
    LibraryList,
    Game,
}

impl EntityKind {
    /// The node type string used in node ids and wire payloads.
    pub fn node_type(&self) -> &'static str {
        match self {
            EntityKind::Player => "player",
            EntityKind::Library => "library",
            EntityKind::LibraryList => "library-list",
            EntityKind::Game => "game",
        }
    }

    /// Identifier namespaces accepted at the request boundary for this domain.
    pub fn recognized_namespaces(&self) -> &'static [Namespace] {
        match self {
            EntityKind::Player => &[
                Namespace::Steam,
                Namespace::Epic,
                Namespace::Gog,
                Namespace::Xbox,
                Namespace::Playstation,
                Namespace::Nintendo,
                Namespace::Discord,
                Namespace::Twitch,
                Namespace::Internal,
            ],
            EntityKind::Library => &[
                Namespace::Player,
                Namespace::LibrarySource,
                Namespace::Steam,
                Namespace::Epic,
                Namespace::Gog,
                Namespace::Internal,
            ],
            EntityKind::LibraryList => &[Namespace::Player, Namespace::Internal],
            EntityKind::Game => &[Namespace::Steam, Namespace::Epic, Namespace::Internal],
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.node_type())
    }
}

// --- Canonical entities ---

/// Common surface of the four canonical entity records, generic enough for
/// one identity store implementation to serve every domain.
pub trait DomainEntity:
    Clone + Send + Sync + Serialize + DeserializeOwned + 'static
{
    const KIND: EntityKind;

    /// Build a partial (unresolved) record carrying only identifiers.
    fn from_identifiers(identifiers: IdentifierMap) -> Self;

    fn internal_id(&self) -> Option<Uuid>;
    fn set_internal_id(&mut self, id: Uuid);
    fn identifiers(&self) -> &IdentifierMap;
    fn identifiers_mut(&mut self) -> &mut IdentifierMap;
    fn touch(&mut self);

    /// Display label for the node describing this entity.
    fn label(&self) -> String;

    /// Display properties carried on the node.
    fn properties(&self) -> PropertyMap;
}

/// A resolved real-world player account, unified across platforms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerEntity {
    pub internal_id: Option<Uuid>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub identifiers: IdentifierMap,
    pub last_updated: DateTime<Utc>,
}

impl DomainEntity for PlayerEntity {
    const KIND: EntityKind = EntityKind::Player;

    fn from_identifiers(identifiers: IdentifierMap) -> Self {
        Self {
            internal_id: None,
            display_name: None,
            avatar_url: None,
            identifiers,
            last_updated: Utc::now(),
        }
    }

    fn internal_id(&self) -> Option<Uuid> {
        self.internal_id
    }

    fn set_internal_id(&mut self, id: Uuid) {
        self.internal_id = Some(id);
    }

    fn identifiers(&self) -> &IdentifierMap {
        &self.identifiers
    }

    fn identifiers_mut(&mut self) -> &mut IdentifierMap {
        &mut self.identifiers
    }

    fn touch(&mut self) {
        self.last_updated = Utc::now();
    }

    fn label(&self) -> String {
        self.display_name
            .clone()
            .unwrap_or_else(|| "Unknown Player".to_string())
    }

    fn properties(&self) -> PropertyMap {
        let mut props = PropertyMap::new();
        if let Some(name) = &self.display_name {
            props.insert("displayName".into(), name.as_str().into());
        }
        if let Some(url) = &self.avatar_url {
            props.insert("avatarUrl".into(), url.as_str().into());
        }
        props.insert("lastUpdated".into(), self.last_updated.into());
        props
    }
}

/// One platform's game library for one player.
///
/// Identity is keyed by the platform account identifier; the owning player
/// and the source name are carried as plain fields, since neither is unique
/// to a single library on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryEntity {
    pub internal_id: Option<Uuid>,
    /// Platform this library is sourced from ("steam", "epic", ...).
    pub source: Option<String>,
    /// Internal id of the owning player record.
    pub player_id: Option<Uuid>,
    pub display_name: Option<String>,
    /// Cached game count from the last provider sync.
    pub game_count: Option<u32>,
    pub identifiers: IdentifierMap,
    pub last_updated: DateTime<Utc>,
}

impl DomainEntity for LibraryEntity {
    const KIND: EntityKind = EntityKind::Library;

    fn from_identifiers(identifiers: IdentifierMap) -> Self {
        let source = identifiers
            .keys()
            .find_map(|ns| Namespace::platforms().contains(ns).then(|| ns.as_str()))
            .map(String::from);
        Self {
            internal_id: None,
            source,
            player_id: None,
            display_name: None,
            game_count: None,
            identifiers,
            last_updated: Utc::now(),
        }
    }

    fn internal_id(&self) -> Option<Uuid> {
        self.internal_id
    }

    fn set_internal_id(&mut self, id: Uuid) {
        self.internal_id = Some(id);
    }

    fn identifiers(&self) -> &IdentifierMap {
        &self.identifiers
    }

    fn identifiers_mut(&mut self) -> &mut IdentifierMap {
        &mut self.identifiers
    }

    fn touch(&mut self) {
        self.last_updated = Utc::now();
    }

    fn label(&self) -> String {
        match (&self.display_name, &self.source) {
            (Some(name), _) => name.clone(),
            (None, Some(source)) => format!("{source} Library"),
            (None, None) => "Library".to_string(),
        }
    }

    fn properties(&self) -> PropertyMap {
        let mut props = PropertyMap::new();
        if let Some(source) = &self.source {
            props.insert("source".into(), source.as_str().into());
        }
        if let Some(player_id) = self.player_id {
            props.insert("playerId".into(), player_id.to_string().into());
        }
        if let Some(count) = self.game_count {
            props.insert("gameCount".into(), count.into());
        }
        props.insert("lastUpdated".into(), self.last_updated.into());
        props
    }
}

/// The collection of all libraries belonging to one player, with a
/// source → library record mapping for member resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryListEntity {
    pub internal_id: Option<Uuid>,
    pub display_name: Option<String>,
    /// Library source → internal id of the member library record.
    pub libraries: BTreeMap<String, Uuid>,
    pub identifiers: IdentifierMap,
    pub last_updated: DateTime<Utc>,
}

impl DomainEntity for LibraryListEntity {
    const KIND: EntityKind = EntityKind::LibraryList;

    fn from_identifiers(identifiers: IdentifierMap) -> Self {
        Self {
            internal_id: None,
            display_name: None,
            libraries: BTreeMap::new(),
            identifiers,
            last_updated: Utc::now(),
        }
    }

    fn internal_id(&self) -> Option<Uuid> {
        self.internal_id
    }

    fn set_internal_id(&mut self, id: Uuid) {
        self.internal_id = Some(id);
    }

    fn identifiers(&self) -> &IdentifierMap {
        &self.identifiers
    }

    fn identifiers_mut(&mut self) -> &mut IdentifierMap {
        &mut self.identifiers
    }

    fn touch(&mut self) {
        self.last_updated = Utc::now();
    }

    fn label(&self) -> String {
        self.display_name
            .clone()
            .unwrap_or_else(|| "All Libraries".to_string())
    }

    fn properties(&self) -> PropertyMap {
        let mut props = PropertyMap::new();
        props.insert("libraryCount".into(), (self.libraries.len() as u32).into());
        props.insert("lastUpdated".into(), self.last_updated.into());
        props
    }
}

/// A game title, unified across the stores that sell it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameEntity {
    pub internal_id: Option<Uuid>,
    pub name: Option<String>,
    pub icon_url: Option<String>,
    pub header_image_url: Option<String>,
    pub identifiers: IdentifierMap,
    pub last_updated: DateTime<Utc>,
}

impl DomainEntity for GameEntity {
    const KIND: EntityKind = EntityKind::Game;

    fn from_identifiers(identifiers: IdentifierMap) -> Self {
        Self {
            internal_id: None,
            name: None,
            icon_url: None,
            header_image_url: None,
            identifiers,
            last_updated: Utc::now(),
        }
    }

    fn internal_id(&self) -> Option<Uuid> {
        self.internal_id
    }

    fn set_internal_id(&mut self, id: Uuid) {
        self.internal_id = Some(id);
    }

    fn identifiers(&self) -> &IdentifierMap {
        &self.identifiers
    }

    fn identifiers_mut(&mut self) -> &mut IdentifierMap {
        &mut self.identifiers
    }

    fn touch(&mut self) {
        self.last_updated = Utc::now();
    }

    fn label(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| "Unknown Game".to_string())
    }

    fn properties(&self) -> PropertyMap {
        let mut props = PropertyMap::new();
        if let Some(name) = &self.name {
            props.insert("name".into(), name.as_str().into());
        }
        if let Some(url) = &self.icon_url {
            props.insert("iconUrl".into(), url.as_str().into());
        }
        if let Some(url) = &self.header_image_url {
            props.insert("headerImageUrl".into(), url.as_str().into());
        }
        props.insert("lastUpdated".into(), self.last_updated.into());
        props
    }
}

// --- Tagged entity union ---

/// A resolved (or partial) entity from any domain, tagged by kind.
/// This is what crosses the Consume dispatch boundary.
#[derive(Debug, Clone)]
pub enum EntityRef {
    Player(PlayerEntity),
    Library(LibraryEntity),
    LibraryList(LibraryListEntity),
    Game(GameEntity),
}

impl EntityRef {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityRef::Player(_) => EntityKind::Player,
            EntityRef::Library(_) => EntityKind::Library,
            EntityRef::LibraryList(_) => EntityKind::LibraryList,
            EntityRef::Game(_) => EntityKind::Game,
        }
    }

    pub fn internal_id(&self) -> Option<Uuid> {
        match self {
            EntityRef::Player(e) => e.internal_id,
            EntityRef::Library(e) => e.internal_id,
            EntityRef::LibraryList(e) => e.internal_id,
            EntityRef::Game(e) => e.internal_id,
        }
    }

    pub fn identifiers(&self) -> &IdentifierMap {
        match self {
            EntityRef::Player(e) => &e.identifiers,
            EntityRef::Library(e) => &e.identifiers,
            EntityRef::LibraryList(e) => &e.identifiers,
            EntityRef::Game(e) => &e.identifiers,
        }
    }

    pub fn label(&self) -> String {
        match self {
            EntityRef::Player(e) => e.label(),
            EntityRef::Library(e) => e.label(),
            EntityRef::LibraryList(e) => e.label(),
            EntityRef::Game(e) => e.label(),
        }
    }

    pub fn properties(&self) -> PropertyMap {
        match self {
            EntityRef::Player(e) => e.properties(),
            EntityRef::Library(e) => e.properties(),
            EntityRef::LibraryList(e) => e.properties(),
            EntityRef::Game(e) => e.properties(),
        }
    }
}
