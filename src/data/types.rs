//! Label types attached to every row of a tournament dataset.
//!
//! Rows are tagged with an era (the generation period they were sampled
//! from), a region (which part of the competition data they belong to) and
//! carry one optional target per tournament.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::dataset::DataError;

/// Era label.
///
/// Eras are numbered (`era1`, `era2`, ...). The live era is published as
/// `eraX` and always sorts after every numbered era.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Era {
    Numbered(u32),
    /// Declared last so it orders after every numbered era.
    Live,
}

impl Era {
    /// The live era (`eraX`).
    pub const LIVE: Era = Era::Live;

    pub fn new(number: u32) -> Self {
        Self::Numbered(number)
    }

    /// Era number, `None` for the live era.
    pub fn number(&self) -> Option<u32> {
        match self {
            Self::Numbered(n) => Some(*n),
            Self::Live => None,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live)
    }
}

impl FromStr for Era {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let code = trimmed.strip_prefix("era").unwrap_or(trimmed);
        if code.eq_ignore_ascii_case("x") {
            return Ok(Self::Live);
        }
        code.parse::<u32>()
            .map(Self::Numbered)
            .map_err(|_| DataError::InvalidLabel(format!("era '{}'", s)))
    }
}

impl fmt::Display for Era {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numbered(n) => write!(f, "era{}", n),
            Self::Live => write!(f, "eraX"),
        }
    }
}

impl From<u32> for Era {
    fn from(number: u32) -> Self {
        Self::Numbered(number)
    }
}

impl TryFrom<String> for Era {
    type Error = DataError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Era> for String {
    fn from(era: Era) -> Self {
        era.to_string()
    }
}

/// Region of the competition data a row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Train,
    Validation,
    Test,
    Live,
}

impl Region {
    /// Regions that make up the tournament data.
    pub const TOURNAMENT: &'static [Region] = &[Region::Validation, Region::Test, Region::Live];

    pub const ALL: &'static [Region] = &[
        Region::Train,
        Region::Validation,
        Region::Test,
        Region::Live,
    ];

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "train" => Some(Self::Train),
            "validation" => Some(Self::Validation),
            "test" => Some(Self::Test),
            "live" => Some(Self::Live),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Validation => "validation",
            Self::Test => "test",
            Self::Live => "live",
        }
    }

    /// Whether the row is part of the tournament data.
    pub fn is_tournament(&self) -> bool {
        !matches!(self, Self::Train)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tournament whose target a model is trained against.
///
/// Tournaments are numbered from 1; each one owns a `target_<name>` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tournament {
    Bernie,
    Elizabeth,
    Jordan,
    Ken,
    Charles,
}

impl Tournament {
    pub const ALL: [Tournament; 5] = [
        Tournament::Bernie,
        Tournament::Elizabeth,
        Tournament::Jordan,
        Tournament::Ken,
        Tournament::Charles,
    ];

    /// Look up a tournament by its 1-based number.
    pub fn from_number(number: u8) -> Option<Self> {
        match number {
            1..=5 => Some(Self::ALL[(number - 1) as usize]),
            _ => None,
        }
    }

    pub fn number(&self) -> u8 {
        *self as u8 + 1
    }

    /// Position of this tournament's target in a row's target list.
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Bernie => "bernie",
            Self::Elizabeth => "elizabeth",
            Self::Jordan => "jordan",
            Self::Ken => "ken",
            Self::Charles => "charles",
        }
    }

    /// Name of the target column holding this tournament's labels.
    pub fn target_column(&self) -> String {
        format!("target_{}", self.name())
    }
}

impl FromStr for Tournament {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(number) = trimmed.parse::<u8>() {
            return Self::from_number(number)
                .ok_or_else(|| DataError::InvalidLabel(format!("tournament {}", number)));
        }
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| DataError::InvalidLabel(format!("tournament '{}'", s)))
    }
}

impl fmt::Display for Tournament {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_era_parsing() {
        assert_eq!("era12".parse::<Era>().unwrap(), Era::new(12));
        assert_eq!("7".parse::<Era>().unwrap(), Era::new(7));
        assert_eq!("eraX".parse::<Era>().unwrap(), Era::LIVE);
        assert!("eraY".parse::<Era>().is_err());
    }

    #[test]
    fn test_live_era_sorts_last() {
        let mut eras = vec![Era::LIVE, Era::new(120), Era::new(3)];
        eras.sort();
        assert_eq!(eras, vec![Era::new(3), Era::new(120), Era::LIVE]);
    }

    #[test]
    fn test_high_numbered_eras_stay_distinct_from_live() {
        let mut eras: Vec<Era> = ["eraX", "era1000", "era999", "era998"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        eras.sort();
        assert_eq!(
            eras,
            vec![Era::new(998), Era::new(999), Era::new(1000), Era::LIVE]
        );
        assert_eq!(Era::new(999).to_string(), "era999");
        assert!(!Era::new(999).is_live());
        assert!(Era::new(u32::MAX) < Era::LIVE);
        assert_eq!(Era::LIVE.number(), None);
    }

    #[test]
    fn test_era_display_round_trip() {
        assert_eq!(Era::new(42).to_string(), "era42");
        assert_eq!(Era::LIVE.to_string(), "eraX");
    }

    #[test]
    fn test_region_labels() {
        assert_eq!(Region::from_str("Validation"), Some(Region::Validation));
        assert_eq!(Region::from_str("bogus"), None);
        assert!(!Region::Train.is_tournament());
        assert!(Region::TOURNAMENT.iter().all(|r| r.is_tournament()));
    }

    #[test]
    fn test_tournament_lookup() {
        assert_eq!(Tournament::from_number(1), Some(Tournament::Bernie));
        assert_eq!(Tournament::from_number(6), None);
        assert_eq!("ken".parse::<Tournament>().unwrap(), Tournament::Ken);
        assert_eq!("2".parse::<Tournament>().unwrap(), Tournament::Elizabeth);
        assert_eq!(Tournament::Charles.number(), 5);
        assert_eq!(Tournament::Jordan.target_column(), "target_jordan");
    }
}
