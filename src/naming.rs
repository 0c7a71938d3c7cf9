//! Property naming strategies applied to Go field names.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a Go field name becomes a JSON property name when no `json` tag names it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyStrategy {
    /// `UserName` -> `user_name`
    Snake,
    /// `UserName` -> `userName`
    #[default]
    Camel,
    /// `UserName` -> `UserName`
    Pascal,
}

impl PropertyStrategy {
    /// Applies the strategy to a field name.
    pub fn apply(&self, name: &str) -> String {
        match self {
            PropertyStrategy::Snake => to_snake_case(name),
            PropertyStrategy::Camel => to_camel_case(name),
            PropertyStrategy::Pascal => name.to_string(),
        }
    }
}

impl FromStr for PropertyStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "snakecase" | "snake" => Ok(PropertyStrategy::Snake),
            "camelcase" | "camel" => Ok(PropertyStrategy::Camel),
            "pascalcase" | "pascal" => Ok(PropertyStrategy::Pascal),
            other => Err(format!("unknown property strategy: {}", other)),
        }
    }
}

impl fmt::Display for PropertyStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PropertyStrategy::Snake => "snakecase",
            PropertyStrategy::Camel => "camelcase",
            PropertyStrategy::Pascal => "pascalcase",
        };
        write!(f, "{}", name)
    }
}

/// Inserts `_` before an uppercase letter unless the previous character was
/// uppercase too, then lowercases. Acronym runs therefore collapse:
/// `HTTPResponse` becomes `httpresponse`.
pub fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_upper = false;
    for (i, c) in name.chars().enumerate() {
        let upper = c.is_uppercase();
        if upper && i > 0 && !prev_upper {
            out.push('_');
        }
        out.extend(c.to_lowercase());
        prev_upper = upper;
    }
    out
}

/// Lowercases the first character only.
pub fn to_camel_case(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snake_case() {
        assert_eq!(to_snake_case("UserName"), "user_name");
        assert_eq!(to_snake_case("ID"), "id");
        assert_eq!(to_snake_case("HTTPResponse"), "httpresponse");
        assert_eq!(to_snake_case("createdAt"), "created_at");
        assert_eq!(to_snake_case(""), "");
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(to_camel_case("UserName"), "userName");
        assert_eq!(to_camel_case("ID"), "iD");
        assert_eq!(to_camel_case("x"), "x");
        assert_eq!(to_camel_case(""), "");
    }

    #[test]
    fn test_strategy_apply() {
        assert_eq!(PropertyStrategy::default(), PropertyStrategy::Camel);
        assert_eq!(PropertyStrategy::Pascal.apply("UserName"), "UserName");
        assert_eq!(PropertyStrategy::Snake.apply("UserName"), "user_name");
        assert_eq!(PropertyStrategy::Camel.apply("UserName"), "userName");
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!("snakecase".parse::<PropertyStrategy>(), Ok(PropertyStrategy::Snake));
        assert_eq!("Pascal".parse::<PropertyStrategy>(), Ok(PropertyStrategy::Pascal));
        assert!("kebab".parse::<PropertyStrategy>().is_err());
    }
}
