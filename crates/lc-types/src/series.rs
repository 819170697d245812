//! Series identity: one feeder in one daily time category.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::errors::LcError;

/// Daily load category. Feeders are modeled separately for the midday and
/// evening readings, so each category gets its own search and model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayCategory {
    Day,
    Night,
}

impl DayCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Night => "night",
        }
    }
}

/// Identity of one tunable series: feeder name plus time category.
///
/// Renders as `<feeder>_<category>`, which is also the file stem used for
/// the split CSV, the progress ledger, and the persisted model artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeriesId {
    pub feeder: String,
    pub category: DayCategory,
}

impl SeriesId {
    pub fn new(feeder: impl Into<String>, category: DayCategory) -> Self {
        Self {
            feeder: feeder.into(),
            category,
        }
    }
}

impl std::fmt::Display for SeriesId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.feeder, self.category.as_str())
    }
}

impl FromStr for SeriesId {
    type Err = LcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (feeder, category) = match s.rsplit_once('_') {
            Some((feeder, "day")) => (feeder, DayCategory::Day),
            Some((feeder, "night")) => (feeder, DayCategory::Night),
            _ => {
                return Err(crate::config_error!(
                    "invalid series name '{s}': expected <feeder>_day or <feeder>_night"
                ))
            }
        };
        if feeder.is_empty() {
            return Err(crate::config_error!("invalid series name '{s}': empty feeder"));
        }
        Ok(Self::new(feeder, category))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn series_name_round_trip() {
        let id: SeriesId = "FDR_KOTA_01_night".parse().unwrap();
        assert_eq!(id.feeder, "FDR_KOTA_01");
        assert_eq!(id.category, DayCategory::Night);
        assert_eq!(id.to_string(), "FDR_KOTA_01_night");
    }

    #[test]
    fn rejects_unknown_category() {
        assert!("FDR01_noon".parse::<SeriesId>().is_err());
        assert!("_day".parse::<SeriesId>().is_err());
        assert!("FDR01".parse::<SeriesId>().is_err());
    }
}
