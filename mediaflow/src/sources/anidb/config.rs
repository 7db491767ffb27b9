//! Wishlist filter configuration and query building.

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::LazyLock;

use crate::errors::{ConfigError, MediaflowError};

#[allow(clippy::expect_used)]
static USER_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{1,6}$").expect("valid user id pattern"));

/// A single value or a list of values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMore<T> {
    /// A single value.
    One(T),
    /// A list of values.
    More(Vec<T>),
}

impl<T> OneOrMore<T> {
    /// The values as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        match self {
            Self::One(value) => std::slice::from_ref(value),
            Self::More(values) => values,
        }
    }
}

/// Adult content filter (`h`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdultMode {
    /// No filtering.
    #[default]
    Ignore,
    /// Hide adult titles.
    Hide,
    /// Only adult titles.
    Only,
}

impl AdultMode {
    fn code(self) -> u8 {
        match self {
            Self::Ignore => 0,
            Self::Hide => 1,
            Self::Only => 2,
        }
    }
}

/// Airing status filter (`airing`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiringMode {
    /// No filtering.
    #[default]
    Ignore,
    /// Currently airing.
    Airing,
    /// Finished airing.
    Finished,
    /// Unknown status.
    Unknown,
}

impl AiringMode {
    fn code(self) -> u8 {
        match self {
            Self::Ignore => 0,
            Self::Airing => 1,
            Self::Finished => 2,
            Self::Unknown => 3,
        }
    }
}

/// Media type filter (`type.<name>=1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    /// TV series.
    Tvseries,
    /// TV special.
    Tvspecial,
    /// Original video animation.
    Ova,
    /// Movie.
    Movie,
    /// Web release.
    Web,
    /// Music video.
    Musicvideo,
    /// Unknown type.
    Unknown,
}

impl MediaType {
    /// The wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tvseries => "tvseries",
            Self::Tvspecial => "tvspecial",
            Self::Ova => "ova",
            Self::Movie => "movie",
            Self::Web => "web",
            Self::Musicvideo => "musicvideo",
            Self::Unknown => "unknown",
        }
    }
}

/// Buddy list filter. Accepted but not sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuddyMode {
    /// No filtering.
    #[default]
    Ignore,
    /// Show titles in buddy lists.
    ShowIn,
    /// Hide titles in buddy lists.
    HideIn,
    /// Show titles buddies watched.
    ShowWatched,
    /// Hide titles buddies watched.
    HideWatched,
}

/// Mylist status filter (`mylist`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MylistStatus {
    /// No filtering.
    #[default]
    Ignore,
    /// Complete in mylist.
    Complete,
    /// Incomplete in mylist.
    Incomplete,
    /// In mylist.
    InMylist,
    /// Not in mylist.
    NotInMylist,
    /// Related entries not in mylist.
    RelatedNotInMylist,
}

impl MylistStatus {
    fn code(self) -> u8 {
        match self {
            Self::Ignore => 0,
            Self::Complete => 1,
            Self::Incomplete => 2,
            Self::InMylist => 3,
            Self::NotInMylist => 4,
            Self::RelatedNotInMylist => 5,
        }
    }
}

/// Mylist state filter (`liststate.<name>=1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MylistState {
    /// Watching.
    Watching,
    /// Unknown state.
    Unknown,
    /// Collecting.
    Collecting,
    /// Stalled.
    Stalled,
    /// Dropped.
    Dropped,
}

impl MylistState {
    /// The wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Watching => "watching",
            Self::Unknown => "unknown",
            Self::Collecting => "collecting",
            Self::Stalled => "stalled",
            Self::Dropped => "dropped",
        }
    }
}

/// Detailed mylist filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MylistOptions {
    /// Status filter.
    pub status: Option<MylistStatus>,
    /// State filters.
    pub state: Option<OneOrMore<MylistState>>,
}

/// Mylist filter: a bare status or detailed options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MylistFilter {
    /// Status only.
    Status(MylistStatus),
    /// Status and states.
    Options(MylistOptions),
}

/// Vote filter (`vote`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteMode {
    /// No filtering.
    #[default]
    Ignore,
    /// Permanent vote.
    Permanent,
    /// Temporary vote.
    Temporary,
    /// Not voted.
    #[serde(rename = "none")]
    NoVote,
    /// Either vote kind.
    Either,
}

impl VoteMode {
    fn code(self) -> u8 {
        match self {
            Self::Ignore => 0,
            Self::Permanent => 1,
            Self::Temporary => 2,
            Self::NoVote => 3,
            Self::Either => 4,
        }
    }
}

/// Watched state filter (`watched.<name>=1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchedState {
    /// Not watched.
    Unwatched,
    /// Partially watched.
    Partial,
    /// Completely watched.
    Complete,
    /// Watched everything owned.
    Allihave,
}

impl WatchedState {
    /// The wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unwatched => "unwatched",
            Self::Partial => "partial",
            Self::Complete => "complete",
            Self::Allihave => "allihave",
        }
    }
}

/// Wishlist mode (`mode`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WishlistMode {
    /// Every wishlist entry.
    #[default]
    All,
    /// Undefined priority.
    Undefined,
    /// To watch.
    Watch,
    /// To get.
    Get,
    /// Blacklisted.
    Blacklist,
    /// Buddy entries.
    Buddy,
}

impl WishlistMode {
    fn code(self) -> u8 {
        match self {
            Self::All => 0,
            Self::Undefined => 1,
            Self::Watch => 2,
            Self::Get => 3,
            Self::Blacklist => 4,
            Self::Buddy => 11,
        }
    }
}

/// Filters for an AniDB wishlist read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WishlistConfig {
    /// AniDB user id, one to six digits.
    #[serde(deserialize_with = "deserialize_user_id")]
    pub user_id: String,
    /// Adult content filter.
    pub adult_only: Option<AdultMode>,
    /// Airing status filter.
    pub is_airing: Option<AiringMode>,
    /// Media type filter.
    #[serde(rename = "type")]
    pub media_type: Option<OneOrMore<MediaType>>,
    /// Buddy list filter.
    pub buddy_lists: Option<BuddyMode>,
    /// Mylist filter.
    pub mylist: Option<MylistFilter>,
    /// Vote filter.
    pub vote: Option<VoteMode>,
    /// Watched state filter.
    pub watched: Option<OneOrMore<WatchedState>>,
    /// Wishlist mode.
    pub mode: Option<WishlistMode>,
    /// Guest pass set in the AniDB profile.
    #[serde(rename = "pass")]
    pub pass: Option<String>,
    /// Remove a trailing ` (YYYY)` from titles.
    #[serde(default)]
    pub strip_dates: bool,
}

impl WishlistConfig {
    /// Creates a configuration for a user.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidUserId` unless the id is 1 to 6 digits.
    pub fn new(user_id: impl Into<String>) -> Result<Self, ConfigError> {
        let user_id = user_id.into();
        validate_user_id(&user_id)?;
        Ok(Self {
            user_id,
            ..Default::default()
        })
    }

    /// Parses a JSON document.
    ///
    /// # Errors
    ///
    /// Returns `MediaflowError::Serialization` for unknown fields, bad enum
    /// values, or an invalid user id.
    pub fn from_json_str(json: &str) -> Result<Self, MediaflowError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Sets the wishlist mode.
    #[must_use]
    pub fn with_mode(mut self, mode: WishlistMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Sets the media type filter.
    #[must_use]
    pub fn with_types(mut self, types: Vec<MediaType>) -> Self {
        self.media_type = Some(OneOrMore::More(types));
        self
    }

    /// Enables date stripping.
    #[must_use]
    pub fn with_strip_dates(mut self, strip: bool) -> Self {
        self.strip_dates = strip;
        self
    }
}

/// Checks that a user id is 1 to 6 digits.
///
/// # Errors
///
/// Returns `ConfigError::InvalidUserId` otherwise.
pub fn validate_user_id(user_id: &str) -> Result<(), ConfigError> {
    if USER_ID_RE.is_match(user_id) {
        Ok(())
    } else {
        Err(ConfigError::InvalidUserId(user_id.to_string()))
    }
}

fn deserialize_user_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    let user_id = match Raw::deserialize(deserializer)? {
        Raw::Number(n) => n.to_string(),
        Raw::Text(s) => s,
    };
    validate_user_id(&user_id).map_err(serde::de::Error::custom)?;
    Ok(user_id)
}

/// Builds the wishlist query parameters.
///
/// `show` and `uid` always come first. `buddy_lists` is not sent.
#[must_use]
pub fn build_query(config: &WishlistConfig) -> Vec<(String, String)> {
    let mut params = vec![
        ("show".to_string(), "mywishlist".to_string()),
        ("uid".to_string(), config.user_id.clone()),
    ];
    let flag = |prefix: &str, name: &str| (format!("{prefix}.{name}"), "1".to_string());

    if let Some(mode) = config.mode {
        params.push(("mode".to_string(), mode.code().to_string()));
    }
    if let Some(types) = &config.media_type {
        params.extend(types.as_slice().iter().map(|t| flag("type", t.as_str())));
    }
    if let Some(airing) = config.is_airing {
        params.push(("airing".to_string(), airing.code().to_string()));
    }
    if let Some(adult) = config.adult_only {
        params.push(("h".to_string(), adult.code().to_string()));
    }
    if let Some(pass) = &config.pass {
        params.push(("pass".to_string(), pass.clone()));
    }
    if let Some(vote) = config.vote {
        params.push(("vote".to_string(), vote.code().to_string()));
    }
    if let Some(watched) = &config.watched {
        params.extend(watched.as_slice().iter().map(|w| flag("watched", w.as_str())));
    }
    match &config.mylist {
        Some(MylistFilter::Status(status)) => {
            params.push(("mylist".to_string(), status.code().to_string()));
        }
        Some(MylistFilter::Options(options)) => {
            if let Some(status) = options.status {
                params.push(("mylist".to_string(), status.code().to_string()));
            }
            if let Some(states) = &options.state {
                params.extend(states.as_slice().iter().map(|s| flag("liststate", s.as_str())));
            }
        }
        None => {}
    }
    params
}
