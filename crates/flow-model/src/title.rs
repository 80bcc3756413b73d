//! Page titles
//!
//! Title resolution belongs to the host wiki; this is the minimal value the
//! engine passes around to build links.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Main (article) namespace
pub const NS_MAIN: i32 = 0;

/// User namespace
pub const NS_USER: i32 = 2;

/// Topic namespace: every topic workflow lives at `Topic:<workflow id>`
pub const NS_TOPIC: i32 = 2600;

/// A page, as namespace + text
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageTitle {
    namespace: i32,
    text: String,
}

impl PageTitle {
    /// Create a title
    #[inline]
    #[must_use]
    pub fn new(namespace: i32, text: impl Into<String>) -> Self {
        Self {
            namespace,
            text: text.into().replace('_', " "),
        }
    }

    /// Namespace id
    #[inline]
    #[must_use]
    pub fn namespace(&self) -> i32 {
        self.namespace
    }

    /// Title text without namespace
    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether this is a topic page
    #[inline]
    #[must_use]
    pub fn is_topic(&self) -> bool {
        self.namespace == NS_TOPIC
    }

    /// `Namespace:Text` with spaces
    #[must_use]
    pub fn prefixed_text(&self) -> String {
        match namespace_name(self.namespace) {
            Some(ns) => format!("{ns}:{}", self.text),
            None => self.text.clone(),
        }
    }

    /// `Namespace:Text` with underscores, as used in urls and API calls
    #[must_use]
    pub fn prefixed_db(&self) -> String {
        self.prefixed_text().replace(' ', "_")
    }

    /// Parse `Namespace:Text`; unknown prefixes stay in the main namespace
    #[must_use]
    pub fn parse(value: &str) -> Self {
        if let Some((prefix, rest)) = value.split_once(':') {
            if let Some(ns) = namespace_id(prefix) {
                return Self::new(ns, rest);
            }
        }
        Self::new(NS_MAIN, value)
    }
}

impl fmt::Display for PageTitle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.prefixed_text())
    }
}

fn namespace_name(ns: i32) -> Option<&'static str> {
    match ns {
        1 => Some("Talk"),
        NS_USER => Some("User"),
        3 => Some("User talk"),
        4 => Some("Project"),
        5 => Some("Project talk"),
        NS_TOPIC => Some("Topic"),
        _ => None,
    }
}

fn namespace_id(name: &str) -> Option<i32> {
    match name.replace('_', " ").as_str() {
        "Talk" => Some(1),
        "User" => Some(NS_USER),
        "User talk" => Some(3),
        "Project" => Some(4),
        "Project talk" => Some(5),
        "Topic" => Some(NS_TOPIC),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixed_forms() {
        let title = PageTitle::new(3, "Some_user");
        assert_eq!(title.prefixed_text(), "User talk:Some user");
        assert_eq!(title.prefixed_db(), "User_talk:Some_user");
    }

    #[test]
    fn parse_known_and_unknown_prefix() {
        assert_eq!(PageTitle::parse("Topic:ABC").namespace(), NS_TOPIC);
        let odd = PageTitle::parse("Foo:Bar");
        assert_eq!(odd.namespace(), NS_MAIN);
        assert_eq!(odd.text(), "Foo:Bar");
    }
}
