use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

macro_rules! layout_id {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u32);

        impl $name {
            /// Wrap a raw id. Ids handed out by the stores start at 1.
            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }

            pub const fn get(self) -> u32 {
                self.0
            }

            /// The object name this id is mirrored under, e.g. `buffer_3`.
            pub fn object_name(self) -> String {
                format!(concat!($prefix, "_{}"), self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u32> for $name {
            fn from(raw: u32) -> Self {
                Self(raw)
            }
        }

        impl FromStr for $name {
            type Err = TypeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<u32>()
                    .map(Self)
                    .map_err(|_| TypeError::InvalidId(s.to_string()))
            }
        }
    };
}

layout_id!(
    /// Identifier of a buffer.
    BufferId,
    "buffer"
);
layout_id!(
    /// Identifier of a window.
    WindowId,
    "window"
);
layout_id!(
    /// Identifier of a tab page.
    TabId,
    "tab"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_names() {
        assert_eq!(BufferId::new(1).object_name(), "buffer_1");
        assert_eq!(WindowId::new(12).object_name(), "window_12");
        assert_eq!(TabId::new(3).object_name(), "tab_3");
    }

    #[test]
    fn parse_ids() {
        assert_eq!("7".parse::<BufferId>().unwrap(), BufferId::new(7));
        assert!("seven".parse::<WindowId>().is_err());
    }

    #[test]
    fn debug_names_the_type() {
        assert_eq!(format!("{:?}", TabId::new(2)), "TabId(2)");
    }
}
