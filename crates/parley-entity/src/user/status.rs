//! Presence status enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Durable presence status attached to a user.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "presence_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PresenceStatus {
    /// Holding a live connection.
    Online,
    /// Connected but away.
    Away,
    /// Connected, notifications muted.
    DoNotDisturb,
    /// No live connection.
    #[default]
    Offline,
}

impl PresenceStatus {
    /// Check if the user is considered online.
    pub fn is_online(&self) -> bool {
        !matches!(self, Self::Offline)
    }

    /// Return the status as its wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "ONLINE",
            Self::Away => "AWAY",
            Self::DoNotDisturb => "DO_NOT_DISTURB",
            Self::Offline => "OFFLINE",
        }
    }
}

impl fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PresenceStatus {
    type Err = parley_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ONLINE" => Ok(Self::Online),
            "AWAY" => Ok(Self::Away),
            "DO_NOT_DISTURB" | "DND" => Ok(Self::DoNotDisturb),
            "OFFLINE" => Ok(Self::Offline),
            _ => Err(parley_core::AppError::validation(format!(
                "Invalid presence status: '{s}'. Expected one of: ONLINE, AWAY, DO_NOT_DISTURB, OFFLINE"
            ))),
        }
    }
}
