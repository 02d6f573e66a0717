//! Naming conventions for collections and generated operations
//!
//! Handles English pluralization (including a few irregular forms), the
//! first-letter case helpers used to derive operation names, and the GraphQL
//! name grammar check.

use regex::Regex;
use std::sync::OnceLock;

/// Utility for converting singular English nouns into their plural form
pub struct Pluralizer;

const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("man", "men"),
    ("woman", "women"),
    ("mouse", "mice"),
    ("goose", "geese"),
];

const UNCOUNTABLE: &[&str] = &["data", "info", "information", "media", "news", "series", "sheep"];

impl Pluralizer {
    /// Convert a singular noun to its plural form
    ///
    /// Only the trailing word of a camelCase identifier is inflected, and the
    /// case of its first letter is preserved.
    ///
    /// # Examples
    ///
    /// ```
    /// use docgraph::core::naming::Pluralizer;
    ///
    /// assert_eq!(Pluralizer::pluralize("widget"), "widgets");
    /// assert_eq!(Pluralizer::pluralize("category"), "categories");
    /// assert_eq!(Pluralizer::pluralize("address"), "addresses");
    /// assert_eq!(Pluralizer::pluralize("salesPerson"), "salesPeople");
    /// ```
    pub fn pluralize(singular: &str) -> String {
        if singular.is_empty() {
            return String::new();
        }

        let split = last_word_start(singular);
        let (head, word) = singular.split_at(split);
        format!("{}{}", head, Self::pluralize_word(word))
    }

    fn pluralize_word(word: &str) -> String {
        let lower = word.to_lowercase();

        if UNCOUNTABLE.contains(&lower.as_str()) {
            return word.to_string();
        }

        if let Some((_, plural)) = IRREGULAR.iter().find(|(s, _)| *s == lower) {
            return match_first_case(word, plural);
        }

        match lower.as_str() {
            // consonant + y -> ies
            s if s.len() > 1
                && s.ends_with('y')
                && !matches!(s.as_bytes()[s.len() - 2], b'a' | b'e' | b'i' | b'o' | b'u') =>
            {
                format!("{}ies", &word[..word.len() - 1])
            }

            s if s.ends_with('s')
                || s.ends_with("sh")
                || s.ends_with("ch")
                || s.ends_with('x')
                || s.ends_with('z') =>
            {
                format!("{}es", word)
            }

            s if s.ends_with("fe") && s.len() > 2 => format!("{}ves", &word[..word.len() - 2]),

            s if s.ends_with('f') && !s.ends_with("ff") && s.len() > 1 => {
                format!("{}ves", &word[..word.len() - 1])
            }

            s if s.ends_with('o') && s.len() > 1 => {
                let before_o = s.as_bytes()[s.len() - 2];
                if matches!(before_o, b'a' | b'e' | b'i' | b'o' | b'u')
                    || matches!(s, "photo" | "piano" | "halo" | "memo" | "logo")
                {
                    format!("{}s", word)
                } else {
                    format!("{}es", word)
                }
            }

            _ => format!("{}s", word),
        }
    }
}

/// Byte index where the last camelCase word of an identifier starts
fn last_word_start(ident: &str) -> usize {
    ident
        .char_indices()
        .filter(|(i, c)| *i > 0 && c.is_uppercase())
        .map(|(i, _)| i)
        .last()
        .unwrap_or(0)
}

fn match_first_case(original: &str, replacement: &str) -> String {
    if original.chars().next().is_some_and(char::is_uppercase) {
        cap_first(replacement)
    } else {
        replacement.to_string()
    }
}

/// Uppercase the first letter of a string
pub fn cap_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Lowercase the first letter of a string
pub fn uncap_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Default collection name for an entity: `Widget` → `widgets`
pub fn collection_name_for(entity_name: &str) -> String {
    Pluralizer::pluralize(&uncap_first(entity_name))
}

/// Whether a string matches the GraphQL `Name` grammar
pub fn is_valid_graphql_name(name: &str) -> bool {
    static NAME: OnceLock<Option<Regex>> = OnceLock::new();
    NAME.get_or_init(|| Regex::new(r"^[_A-Za-z][_0-9A-Za-z]*$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(name))
}
