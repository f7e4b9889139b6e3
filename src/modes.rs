use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Dialect pair a translation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DialectMode {
    #[default]
    #[serde(rename = "en-paisa")]
    EnglishPaisa,
    #[serde(rename = "en-boricua")]
    EnglishBoricua,
    #[serde(rename = "paisa-boricua")]
    PaisaBoricua,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
}

/// One side of a dialect pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    English,
    Paisa,
    Boricua,
}

impl DialectMode {
    pub const ALL: [DialectMode; 3] = [
        DialectMode::EnglishPaisa,
        DialectMode::EnglishBoricua,
        DialectMode::PaisaBoricua,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DialectMode::EnglishPaisa => "en-paisa",
            DialectMode::EnglishBoricua => "en-boricua",
            DialectMode::PaisaBoricua => "paisa-boricua",
        }
    }

    pub fn pair(&self) -> (Dialect, Dialect) {
        match self {
            DialectMode::EnglishPaisa => (Dialect::English, Dialect::Paisa),
            DialectMode::EnglishBoricua => (Dialect::English, Dialect::Boricua),
            DialectMode::PaisaBoricua => (Dialect::Paisa, Dialect::Boricua),
        }
    }

    pub fn source(&self, direction: Direction) -> Dialect {
        let (left, right) = self.pair();
        match direction {
            Direction::Forward => left,
            Direction::Reverse => right,
        }
    }

    pub fn target(&self, direction: Direction) -> Dialect {
        let (left, right) = self.pair();
        match direction {
            Direction::Forward => right,
            Direction::Reverse => left,
        }
    }

    pub fn label(&self, direction: Direction) -> String {
        format!(
            "{} → {}",
            self.source(direction).name(),
            self.target(direction).name()
        )
    }
}

impl fmt::Display for DialectMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DialectMode {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        let lower = value.trim().to_lowercase();
        DialectMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == lower)
            .ok_or_else(|| {
                anyhow!(
                    "unknown mode '{}' (expected one of: {})",
                    value.trim(),
                    DialectMode::ALL
                        .iter()
                        .map(|mode| mode.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            })
    }
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Reverse => "reverse",
        }
    }

    pub fn flipped(&self) -> Self {
        match self {
            Direction::Forward => Direction::Reverse,
            Direction::Reverse => Direction::Forward,
        }
    }
}

impl FromStr for Direction {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "forward" | "fwd" => Ok(Direction::Forward),
            "reverse" | "rev" => Ok(Direction::Reverse),
            other => Err(anyhow!(
                "unknown direction '{}' (expected forward or reverse)",
                other
            )),
        }
    }
}

impl Dialect {
    pub fn name(&self) -> &'static str {
        match self {
            Dialect::English => "English",
            Dialect::Paisa => "Paisa Spanish",
            Dialect::Boricua => "Boricua Spanish",
        }
    }
}
