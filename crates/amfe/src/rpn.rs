//! Risk priority number calculation and classification.
//!
//! An RPN is the product of three 1-5 scores. Out-of-range scores cannot be
//! represented: [`Score`] is the only way into [`rpn`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Smallest valid score.
pub const MIN_SCORE: u8 = 1;

/// Largest valid score.
pub const MAX_SCORE: u8 = 5;

/// A severity, detectability or occurrence score in `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Score(u8);

impl Score {
    /// The lowest score, used for fresh evaluations.
    pub const MIN: Self = Self(MIN_SCORE);

    /// The highest score.
    pub const MAX: Self = Self(MAX_SCORE);

    /// Create a score, rejecting values outside `1..=5`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidScore`] when `value` is out of range.
    pub fn new(value: i64) -> Result<Self> {
        match u8::try_from(value) {
            Ok(v) if (MIN_SCORE..=MAX_SCORE).contains(&v) => Ok(Self(v)),
            _ => Err(Error::InvalidScore(value)),
        }
    }

    /// The raw score value.
    #[must_use]
    pub fn get(self) -> u8 {
        self.0
    }

    /// Every valid score, lowest first.
    pub fn all() -> impl Iterator<Item = Self> {
        (MIN_SCORE..=MAX_SCORE).map(Self)
    }
}

impl Default for Score {
    fn default() -> Self {
        Self::MIN
    }
}

impl TryFrom<i64> for Score {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Score> for u8 {
    fn from(score: Score) -> Self {
        score.0
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Compute the risk priority number.
#[must_use]
pub fn rpn(severity: Score, detectability: Score, occurrence: Score) -> u8 {
    severity.0 * detectability.0 * occurrence.0
}

/// Compute an RPN from unchecked values on wider scales.
///
/// The legacy single-form documents were never range-checked, so their
/// products may exceed 125.
#[must_use]
pub fn rpn_unchecked(severity: u32, occurrence: u32, detection: u32) -> u32 {
    severity.saturating_mul(occurrence).saturating_mul(detection)
}

/// Severity class of an RPN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    /// Low risk.
    Bajo,
    /// Medium risk.
    Medio,
    /// High risk.
    Alto,
    /// Critical risk.
    #[serde(rename = "Crítico")]
    Critico,
}

impl RiskLevel {
    /// Display label as shown on the risk matrices.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Bajo => "Bajo",
            Self::Medio => "Medio",
            Self::Alto => "Alto",
            Self::Critico => "Crítico",
        }
    }

    /// Hex color used to highlight the level.
    #[must_use]
    pub fn color(self) -> &'static str {
        match self {
            Self::Bajo => "#28a745",
            Self::Medio => "#ffc107",
            Self::Alto => "#fd7e14",
            Self::Critico => "#dc3545",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Thresholds used to classify an RPN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskScheme {
    /// Modular matrices: 1-5 scales, RPN at most 125.
    #[default]
    Modular,
    /// Single-form and spreadsheet matrices.
    Legacy,
}

impl RiskScheme {
    /// Lower bounds of Medio, Alto and Crítico.
    #[must_use]
    pub fn thresholds(self) -> [u32; 3] {
        match self {
            Self::Modular => [25, 50, 100],
            Self::Legacy => [20, 50, 100],
        }
    }

    /// Classify an RPN.
    #[must_use]
    pub fn classify(self, rpn: u32) -> RiskLevel {
        let [medio, alto, critico] = self.thresholds();
        if rpn >= critico {
            RiskLevel::Critico
        } else if rpn >= alto {
            RiskLevel::Alto
        } else if rpn >= medio {
            RiskLevel::Medio
        } else {
            RiskLevel::Bajo
        }
    }
}
