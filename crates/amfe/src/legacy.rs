//! Single-form assessments.
//!
//! The older matrix format: one failure mode per matrix, scored before and
//! after corrective action. Scores are not range-checked on this format.

use serde::{Deserialize, Serialize};

use crate::error::FieldError;
use crate::rpn::{self, RiskLevel, RiskScheme};

/// Which of the six scores to change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LegacyScore {
    /// Severity before action.
    Severity,
    /// Occurrence before action.
    Occurrence,
    /// Detection before action.
    Detection,
    /// Severity after action.
    NewSeverity,
    /// Occurrence after action.
    NewOccurrence,
    /// Detection after action.
    NewDetection,
}

/// The `data` document of a single-form matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyAssessment {
    /// Equipment or process under analysis.
    pub equipment: String,
    /// Process the equipment belongs to.
    pub process: String,
    /// What the equipment is meant to do.
    pub function: String,
    /// How it fails.
    pub failure_mode: String,
    /// Consequence of the failure.
    pub failure_effect: String,
    /// Why it fails.
    pub failure_cause: String,
    /// Controls already in place.
    pub current_controls: String,
    /// Severity before action.
    pub severity: u32,
    /// Occurrence before action.
    pub occurrence: u32,
    /// Detection before action.
    pub detection: u32,
    /// Risk priority number before action.
    pub rpn: u32,
    /// Action recommended to reduce the risk.
    pub recommended_action: String,
    /// Who owns the action.
    pub responsibility: String,
    /// When the action is due.
    pub target_date: String,
    /// What was actually done.
    pub action_taken: String,
    /// Severity after action.
    pub new_severity: u32,
    /// Occurrence after action.
    pub new_occurrence: u32,
    /// Detection after action.
    pub new_detection: u32,
    /// Risk priority number after action.
    pub new_rpn: u32,
}

impl Default for LegacyAssessment {
    fn default() -> Self {
        Self {
            equipment: String::new(),
            process: String::new(),
            function: String::new(),
            failure_mode: String::new(),
            failure_effect: String::new(),
            failure_cause: String::new(),
            current_controls: String::new(),
            severity: 1,
            occurrence: 1,
            detection: 1,
            rpn: 1,
            recommended_action: String::new(),
            responsibility: String::new(),
            target_date: String::new(),
            action_taken: String::new(),
            new_severity: 1,
            new_occurrence: 1,
            new_detection: 1,
            new_rpn: 1,
        }
    }
}

impl LegacyAssessment {
    /// Change a score and recompute the RPN it feeds.
    pub fn set_score(&mut self, which: LegacyScore, value: u32) {
        match which {
            LegacyScore::Severity => self.severity = value,
            LegacyScore::Occurrence => self.occurrence = value,
            LegacyScore::Detection => self.detection = value,
            LegacyScore::NewSeverity => self.new_severity = value,
            LegacyScore::NewOccurrence => self.new_occurrence = value,
            LegacyScore::NewDetection => self.new_detection = value,
        }
        self.recompute();
    }

    /// Recompute both RPNs from their scores.
    ///
    /// Zero scores, which older records carry for unset fields, count as 1.
    pub fn recompute(&mut self) {
        for score in [
            &mut self.severity,
            &mut self.occurrence,
            &mut self.detection,
            &mut self.new_severity,
            &mut self.new_occurrence,
            &mut self.new_detection,
        ] {
            if *score == 0 {
                *score = 1;
            }
        }
        self.rpn = rpn::rpn_unchecked(self.severity, self.occurrence, self.detection);
        self.new_rpn =
            rpn::rpn_unchecked(self.new_severity, self.new_occurrence, self.new_detection);
    }

    /// Risk level before action.
    #[must_use]
    pub fn risk(&self) -> RiskLevel {
        RiskScheme::Legacy.classify(self.rpn)
    }

    /// Risk level after action.
    #[must_use]
    pub fn residual_risk(&self) -> RiskLevel {
        RiskScheme::Legacy.classify(self.new_rpn)
    }

    /// Check the required fields, reporting the first one missing.
    ///
    /// # Errors
    ///
    /// Returns the first [`FieldError`] found.
    pub fn validate(&self, name: &str, description: &str) -> Result<(), FieldError> {
        let required = [
            ("name", name, "name is required"),
            ("description", description, "description is required"),
            ("equipment", &self.equipment, "equipment/process is required"),
            (
                "function",
                &self.function,
                "equipment function is required to complete the analysis",
            ),
            (
                "failure_mode",
                &self.failure_mode,
                "failure mode is required to complete the analysis",
            ),
            (
                "failure_effect",
                &self.failure_effect,
                "failure effect is required to complete the analysis",
            ),
            (
                "failure_cause",
                &self.failure_cause,
                "failure cause is required to complete the analysis",
            ),
        ];
        match required.iter().find(|(_, value, _)| value.trim().is_empty()) {
            Some((field, _, message)) => Err(FieldError::new(*field, *message)),
            None => Ok(()),
        }
    }
}
