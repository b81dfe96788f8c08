use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Editor mode a key mapping applies in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MapMode {
    #[serde(rename = "n")]
    Normal,
    #[serde(rename = "i")]
    Insert,
    #[serde(rename = "v")]
    Visual,
    #[serde(rename = "x")]
    VisualBlock,
    #[serde(rename = "s")]
    Select,
    #[serde(rename = "c")]
    CommandLine,
    #[serde(rename = "o")]
    OperatorPending,
}

impl MapMode {
    pub const ALL: [MapMode; 7] = [
        MapMode::Normal,
        MapMode::Insert,
        MapMode::Visual,
        MapMode::VisualBlock,
        MapMode::Select,
        MapMode::CommandLine,
        MapMode::OperatorPending,
    ];

    /// The one-letter tag used by `:nmap`, `:imap`, ...
    pub const fn tag(self) -> &'static str {
        match self {
            MapMode::Normal => "n",
            MapMode::Insert => "i",
            MapMode::Visual => "v",
            MapMode::VisualBlock => "x",
            MapMode::Select => "s",
            MapMode::CommandLine => "c",
            MapMode::OperatorPending => "o",
        }
    }

    pub const fn long_name(self) -> &'static str {
        match self {
            MapMode::Normal => "normal",
            MapMode::Insert => "insert",
            MapMode::Visual => "visual",
            MapMode::VisualBlock => "visualBlock",
            MapMode::Select => "select",
            MapMode::CommandLine => "commandLine",
            MapMode::OperatorPending => "operatorPending",
        }
    }
}

impl fmt::Display for MapMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.long_name())
    }
}

impl FromStr for MapMode {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MapMode::ALL
            .into_iter()
            .find(|mode| mode.tag() == s || mode.long_name() == s)
            .ok_or_else(|| TypeError::InvalidMode(s.to_string()))
    }
}
