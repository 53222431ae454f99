use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Owner of a cached avatar. Renders to the deterministic cache key
/// `user:<id>` or `chat:<id>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AvatarScope {
    User(String),
    Chat(String),
}

impl AvatarScope {
    pub fn user(id: impl Into<String>) -> Self {
        Self::User(id.into())
    }

    pub fn chat(id: impl Into<String>) -> Self {
        Self::Chat(id.into())
    }

    /// The cache key for this scope.
    pub fn key(&self) -> String {
        self.to_string()
    }

    pub fn owner_id(&self) -> &str {
        match self {
            Self::User(id) | Self::Chat(id) => id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::User(_) => "user",
            Self::Chat(_) => "chat",
        }
    }
}

impl fmt::Display for AvatarScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.owner_id())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseScopeError(pub String);

impl fmt::Display for ParseScopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid avatar scope '{}'", self.0)
    }
}

impl std::error::Error for ParseScopeError {}

impl FromStr for AvatarScope {
    type Err = ParseScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some(("user", id)) if !id.is_empty() => Ok(Self::User(id.to_string())),
            Some(("chat", id)) if !id.is_empty() => Ok(Self::Chat(id.to_string())),
            _ => Err(ParseScopeError(s.to_string())),
        }
    }
}

impl Serialize for AvatarScope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AvatarScope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
