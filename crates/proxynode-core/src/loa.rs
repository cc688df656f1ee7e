//! Levels of assurance requested for generated authentication requests

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Strength of identity assurance requested from the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LevelOfAssurance {
    #[serde(rename = "LEVEL_1")]
    Level1,
    /// Substantial assurance; what the proxy node asks for unless told otherwise
    #[default]
    #[serde(rename = "LEVEL_2")]
    Level2,
}

impl LevelOfAssurance {
    pub fn as_str(&self) -> &'static str {
        match self {
            LevelOfAssurance::Level1 => "LEVEL_1",
            LevelOfAssurance::Level2 => "LEVEL_2",
        }
    }
}

impl fmt::Display for LevelOfAssurance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LevelOfAssurance {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "LEVEL_1" => Ok(LevelOfAssurance::Level1),
            "LEVEL_2" => Ok(LevelOfAssurance::Level2),
            other => Err(Error::InvalidRequest(format!(
                "Unknown level of assurance: {}",
                other
            ))),
        }
    }
}
