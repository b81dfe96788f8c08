use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// The namespace a named object lives in.
///
/// The set is closed: a scope can only be obtained from one of these
/// variants, and parsing any other tag fails with
/// [`TypeError::InvalidScope`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Scope {
    #[serde(rename = "g")]
    Global,
    #[serde(rename = "b")]
    Buffer,
    #[serde(rename = "w")]
    Window,
    #[serde(rename = "t")]
    Tab,
    #[serde(rename = "s")]
    Script,
    #[serde(rename = "l")]
    Local,
    #[serde(rename = "a")]
    Argument,
}

impl Scope {
    /// Every scope, in tag order `g b w t s l a`.
    pub const ALL: [Scope; 7] = [
        Scope::Global,
        Scope::Buffer,
        Scope::Window,
        Scope::Tab,
        Scope::Script,
        Scope::Local,
        Scope::Argument,
    ];

    /// The one-letter tag (`g`, `b`, ...).
    pub const fn tag(self) -> &'static str {
        match self {
            Scope::Global => "g",
            Scope::Buffer => "b",
            Scope::Window => "w",
            Scope::Tab => "t",
            Scope::Script => "s",
            Scope::Local => "l",
            Scope::Argument => "a",
        }
    }

    /// The long name (`global`, `buffer`, ...).
    pub const fn long_name(self) -> &'static str {
        match self {
            Scope::Global => "global",
            Scope::Buffer => "buffer",
            Scope::Window => "window",
            Scope::Tab => "tab",
            Scope::Script => "script",
            Scope::Local => "local",
            Scope::Argument => "argument",
        }
    }

    /// The registry key for `name` in this scope, e.g. `g:mapleader`.
    pub fn qualify(self, name: &str) -> String {
        format!("{}:{name}", self.tag())
    }

    /// Split a qualified key such as `b:buffer_1` into scope and name.
    ///
    /// Returns `None` when the key has no valid scope prefix.
    pub fn split_qualified(key: &str) -> Option<(Scope, &str)> {
        let (tag, name) = key.split_once(':')?;
        let scope = tag.parse().ok()?;
        Some((scope, name))
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Scope {
    type Err = TypeError;

    /// Accepts both the one-letter tag and the long name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scope::ALL
            .into_iter()
            .find(|scope| scope.tag() == s || scope.long_name() == s)
            .ok_or_else(|| TypeError::InvalidScope(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parse_tags_and_long_names() {
        assert_eq!("g".parse::<Scope>().unwrap(), Scope::Global);
        assert_eq!("buffer".parse::<Scope>().unwrap(), Scope::Buffer);
        assert_eq!("a".parse::<Scope>().unwrap(), Scope::Argument);
    }

    #[test]
    fn reject_unknown_tag() {
        let err = "bogus".parse::<Scope>().unwrap_err();
        assert_eq!(err, TypeError::InvalidScope("bogus".into()));
        assert!("".parse::<Scope>().is_err());
        assert!("G".parse::<Scope>().is_err());
    }

    #[test]
    fn qualify_and_split() {
        assert_eq!(Scope::Window.qualify("buffer"), "w:buffer");
        assert_eq!(
            Scope::split_qualified("b:buffer_1"),
            Some((Scope::Buffer, "buffer_1"))
        );
        assert_eq!(Scope::split_qualified("x:foo"), None);
        assert_eq!(Scope::split_qualified("nocolon"), None);
    }

    #[test]
    fn serializes_as_tag() {
        let json = serde_json::to_string(&Scope::Tab).unwrap();
        assert_eq!(json, "\"t\"");
    }

    proptest! {
        #[test]
        fn anything_outside_the_set_is_rejected(tag in "[a-z]{2,8}") {
            let known = Scope::ALL.iter().any(|s| s.long_name() == tag);
            prop_assert_eq!(tag.parse::<Scope>().is_ok(), known);
        }
    }
}
