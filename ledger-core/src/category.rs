//! Rating categories.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Rating system a contest contributes to.
///
/// Each game type keeps its own rating, so a contest is always filed under
/// exactly one category. The numeric code is what the store indexes on and
/// must never be reassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Confucius,
    Tammany,
    AfterTheFlood,
    GuildOfThieves,
    Indonesia,
    /// Generic Elo pool for games without a dedicated rating.
    Elo,
}

impl Category {
    /// Every category, in code order.
    pub const ALL: [Category; 6] = [
        Category::Confucius,
        Category::Tammany,
        Category::AfterTheFlood,
        Category::GuildOfThieves,
        Category::Indonesia,
        Category::Elo,
    ];

    /// Stable numeric code used for store filters.
    pub fn code(self) -> i32 {
        match self {
            Category::Confucius => 1,
            Category::Tammany => 2,
            Category::AfterTheFlood => 3,
            Category::GuildOfThieves => 4,
            Category::Indonesia => 5,
            Category::Elo => 6,
        }
    }

    /// Inverse of [`Category::code`].
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Confucius => "Confucius",
            Category::Tammany => "Tammany",
            Category::AfterTheFlood => "AfterTheFlood",
            Category::GuildOfThieves => "GuildOfThieves",
            Category::Indonesia => "Indonesia",
            Category::Elo => "Elo",
        }
    }
}

fn normalize_token(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error when parsing an unknown category name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryParseError(pub String);

impl fmt::Display for CategoryParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid category: {}", self.0)
    }
}

impl std::error::Error for CategoryParseError {}

impl FromStr for Category {
    type Err = CategoryParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "confucius" => Ok(Category::Confucius),
            "tammany" | "tammanyhall" => Ok(Category::Tammany),
            "aftertheflood" | "atf" => Ok(Category::AfterTheFlood),
            "guildofthieves" | "got" => Ok(Category::GuildOfThieves),
            "indonesia" => Ok(Category::Indonesia),
            "elo" => Ok(Category::Elo),
            _ => Err(CategoryParseError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_unique_and_reversible() {
        for category in Category::ALL {
            assert_eq!(Category::from_code(category.code()), Some(category));
        }
        assert_eq!(Category::from_code(0), None);
    }

    #[test]
    fn test_parse_accepts_aliases() {
        assert_eq!("ATF".parse::<Category>(), Ok(Category::AfterTheFlood));
        assert_eq!("guild_of_thieves".parse::<Category>(), Ok(Category::GuildOfThieves));
        assert_eq!("Tammany Hall".parse::<Category>(), Ok(Category::Tammany));
        assert!("chess".parse::<Category>().is_err());
    }

    #[test]
    fn test_display_matches_parse() {
        for category in Category::ALL {
            assert_eq!(category.to_string().parse::<Category>(), Ok(category));
        }
    }
}
