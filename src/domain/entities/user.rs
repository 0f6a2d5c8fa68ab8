use chrono::{DateTime, Utc};
use std::fmt;

/// Default level for regular chatters
pub const DEFAULT_LEVEL: u32 = 100;

/// Represents a chatter known to the bot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub login: String,
    pub name: String,
    pub level: u32,
    pub points: i64,
    pub last_active: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(id: impl Into<String>, login: impl Into<String>) -> Self {
        let login = login.into().to_lowercase();
        Self {
            id: id.into(),
            name: login.clone(),
            login,
            level: DEFAULT_LEVEL,
            points: 0,
            last_active: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    pub fn with_points(mut self, points: i64) -> Self {
        self.points = points;
        self
    }

    pub fn with_last_active(mut self, at: DateTime<Utc>) -> Self {
        self.last_active = Some(at);
        self
    }

    /// Two handles refer to the same chatter when their platform ids match
    pub fn same_as(&self, other: &User) -> bool {
        self.id == other.id
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
