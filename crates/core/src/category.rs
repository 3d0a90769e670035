//! Item category enum.

use serde::{Deserialize, Serialize};

/// Feedback category of a retro item.
///
/// Stored in PostgreSQL as lowercase text and serialized the same way on
/// the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum Category {
    Happy,
    Meh,
    Sad,
}

impl Category {
    /// The lowercase wire/database representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Happy => "happy",
            Category::Meh => "meh",
            Category::Sad => "sad",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Category::Happy).unwrap(), "\"happy\"");
        assert_eq!(serde_json::to_string(&Category::Meh).unwrap(), "\"meh\"");
        assert_eq!(serde_json::to_string(&Category::Sad).unwrap(), "\"sad\"");
    }

    #[test]
    fn deserializes_lowercase() {
        let cat: Category = serde_json::from_str("\"sad\"").unwrap();
        assert_eq!(cat, Category::Sad);
    }

    #[test]
    fn rejects_unknown_category() {
        let result = serde_json::from_str::<Category>("\"angry\"");
        assert!(result.is_err());
    }
}
