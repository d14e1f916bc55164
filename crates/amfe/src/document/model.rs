//! Node types of a modular AMFE document.
//!
//! Field names follow the wire format used by the matrix backend, so a
//! document round-trips through `serde_json` unchanged.

use std::sync::Arc;

use chrono::{Datelike, Local};
use serde::{Deserialize, Serialize};

use super::ids::IdGenerator;
use super::tree::ProcessTree;
use super::ElementKind;
use crate::rpn::{self, Score};

/// Institution written into new headers.
pub const DEFAULT_INSTITUTION: &str = "Fundación Clínica Infantil Club Noel";

/// Display color of new processes.
pub const DEFAULT_PROCESS_COLOR: &str = "#C6E0B4";

/// Institutional metadata block printed at the top of a matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Header {
    /// Institution name.
    #[serde(rename = "fundacion")]
    pub institution: String,
    /// Document code, e.g. `AMFE-001`.
    #[serde(rename = "codigo")]
    pub code: String,
    /// Document version.
    pub version: String,
    /// Page number.
    #[serde(rename = "pagina")]
    pub page: String,
    /// Month of issue.
    #[serde(rename = "mes")]
    pub month: String,
    /// Year of issue.
    #[serde(rename = "año")]
    pub year: String,
    /// Hospital service.
    #[serde(rename = "servicio")]
    pub service: String,
    /// Area within the service.
    pub area: String,
    /// Author of the assessment.
    #[serde(rename = "elaboradoPor")]
    pub prepared_by: String,
    /// Biomedical equipment under assessment.
    #[serde(rename = "equipo")]
    pub equipment: String,
    /// Issue date, `YYYY-MM-DD`.
    #[serde(rename = "fechaEmision")]
    pub issue_date: String,
}

impl Default for Header {
    fn default() -> Self {
        Self::with_institution(DEFAULT_INSTITUTION)
    }
}

impl Header {
    /// A blank header dated today.
    #[must_use]
    pub fn with_institution(institution: impl Into<String>) -> Self {
        let today = Local::now().date_naive();
        Self {
            institution: institution.into(),
            code: String::new(),
            version: "1".to_string(),
            page: "1".to_string(),
            month: String::new(),
            year: today.year().to_string(),
            service: String::new(),
            area: String::new(),
            prepared_by: String::new(),
            equipment: String::new(),
            issue_date: today.format("%Y-%m-%d").to_string(),
        }
    }
}

/// A single line of text in one of a failure's lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    /// Client-generated identifier.
    pub id: String,
    /// The text.
    #[serde(rename = "descripcion", default)]
    pub text: String,
}

impl Element {
    /// An empty element with a fresh id.
    #[must_use]
    pub fn blank(ids: &IdGenerator, kind: ElementKind) -> Self {
        Self {
            id: ids.next(kind.id_prefix()),
            text: String::new(),
        }
    }
}

/// Which score of an evaluation to change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScoreField {
    /// How bad the effect is.
    Severity,
    /// How hard the failure is to detect.
    Detectability,
    /// How often the failure happens.
    Occurrence,
}

impl ScoreField {
    /// All score fields in display order.
    pub const ALL: [Self; 3] = [Self::Severity, Self::Detectability, Self::Occurrence];

    /// Wire name of the field.
    #[must_use]
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::Severity => "severidad",
            Self::Detectability => "detectabilidad",
            Self::Occurrence => "ocurrencia",
        }
    }
}

/// Risk evaluation of a failure. The RPN is derived, never set directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "EvaluationWire", into = "EvaluationWire")]
pub struct Evaluation {
    severity: Score,
    detectability: Score,
    occurrence: Score,
    rpn: u8,
}

#[derive(Clone, Serialize, Deserialize)]
struct EvaluationWire {
    severidad: Score,
    detectabilidad: Score,
    ocurrencia: Score,
    #[serde(default)]
    rpn: Option<u8>,
}

impl From<EvaluationWire> for Evaluation {
    fn from(wire: EvaluationWire) -> Self {
        // The stored rpn is ignored; it is always derived from the scores.
        Self::new(wire.severidad, wire.detectabilidad, wire.ocurrencia)
    }
}

impl From<Evaluation> for EvaluationWire {
    fn from(eval: Evaluation) -> Self {
        Self {
            severidad: eval.severity,
            detectabilidad: eval.detectability,
            ocurrencia: eval.occurrence,
            rpn: Some(eval.rpn),
        }
    }
}

impl Default for Evaluation {
    fn default() -> Self {
        Self::new(Score::MIN, Score::MIN, Score::MIN)
    }
}

impl Evaluation {
    /// Create an evaluation and compute its RPN.
    #[must_use]
    pub fn new(severity: Score, detectability: Score, occurrence: Score) -> Self {
        Self {
            severity,
            detectability,
            occurrence,
            rpn: rpn::rpn(severity, detectability, occurrence),
        }
    }

    /// Severity score.
    #[must_use]
    pub fn severity(&self) -> Score {
        self.severity
    }

    /// Detectability score.
    #[must_use]
    pub fn detectability(&self) -> Score {
        self.detectability
    }

    /// Occurrence score.
    #[must_use]
    pub fn occurrence(&self) -> Score {
        self.occurrence
    }

    /// The risk priority number.
    #[must_use]
    pub fn rpn(&self) -> u8 {
        self.rpn
    }

    /// Read one score.
    #[must_use]
    pub fn get(&self, field: ScoreField) -> Score {
        match field {
            ScoreField::Severity => self.severity,
            ScoreField::Detectability => self.detectability,
            ScoreField::Occurrence => self.occurrence,
        }
    }

    /// Change one score and recompute the RPN.
    pub fn set(&mut self, field: ScoreField, score: Score) -> u8 {
        match field {
            ScoreField::Severity => self.severity = score,
            ScoreField::Detectability => self.detectability = score,
            ScoreField::Occurrence => self.occurrence = score,
        }
        self.rpn = rpn::rpn(self.severity, self.detectability, self.occurrence);
        self.rpn
    }
}

/// A potential failure mode with its effects, causes, barriers and actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    /// Client-generated identifier.
    pub id: String,
    /// What fails.
    #[serde(rename = "descripcion", default)]
    pub description: String,
    /// Potential effects.
    #[serde(rename = "efectosPotenciales", default)]
    pub effects: Vec<Element>,
    /// Potential causes.
    #[serde(rename = "causasPotenciales", default)]
    pub causes: Vec<Element>,
    /// Existing barriers.
    #[serde(rename = "barrerasExistentes", default)]
    pub barriers: Vec<Element>,
    /// Risk evaluation.
    #[serde(rename = "evaluacion", default)]
    pub evaluation: Evaluation,
    /// Recommended actions.
    #[serde(rename = "accionesRecomendadas", default)]
    pub recommended_actions: Vec<Element>,
    /// Actions already taken.
    #[serde(rename = "accionesTomadas", default)]
    pub taken_actions: Vec<Element>,
    /// Responsible party.
    #[serde(rename = "responsable", default)]
    pub responsible: String,
}

impl Failure {
    /// A blank failure with one effect, cause and barrier and no actions.
    #[must_use]
    pub fn blank(ids: &IdGenerator) -> Self {
        Self {
            id: ids.next("falla"),
            description: String::new(),
            effects: vec![Element::blank(ids, ElementKind::Effect)],
            causes: vec![Element::blank(ids, ElementKind::Cause)],
            barriers: vec![Element::blank(ids, ElementKind::Barrier)],
            evaluation: Evaluation::default(),
            recommended_actions: Vec::new(),
            taken_actions: Vec::new(),
            responsible: String::new(),
        }
    }

    /// The list holding elements of `kind`.
    #[must_use]
    pub fn elements(&self, kind: ElementKind) -> &[Element] {
        match kind {
            ElementKind::Effect => &self.effects,
            ElementKind::Cause => &self.causes,
            ElementKind::Barrier => &self.barriers,
            ElementKind::RecommendedAction => &self.recommended_actions,
            ElementKind::TakenAction => &self.taken_actions,
        }
    }

    /// Mutable access to the list holding elements of `kind`.
    pub fn elements_mut(&mut self, kind: ElementKind) -> &mut Vec<Element> {
        match kind {
            ElementKind::Effect => &mut self.effects,
            ElementKind::Cause => &mut self.causes,
            ElementKind::Barrier => &mut self.barriers,
            ElementKind::RecommendedAction => &mut self.recommended_actions,
            ElementKind::TakenAction => &mut self.taken_actions,
        }
    }

    /// The risk priority number of this failure.
    #[must_use]
    pub fn rpn(&self) -> u8 {
        self.evaluation.rpn()
    }

    fn all_ids(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.id.as_str()).chain(
            ElementKind::ALL
                .into_iter()
                .flat_map(move |kind| self.elements(kind).iter().map(|e| e.id.as_str())),
        )
    }
}

/// A subprocess and its failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subprocess {
    /// Client-generated identifier.
    pub id: String,
    /// Subprocess name.
    #[serde(rename = "nombre", default)]
    pub name: String,
    /// Potential failures, in display order.
    #[serde(rename = "fallasPotenciales", default)]
    pub failures: Vec<Arc<Failure>>,
}

impl Subprocess {
    /// A blank subprocess holding one blank failure.
    #[must_use]
    pub fn blank(ids: &IdGenerator) -> Self {
        Self {
            id: ids.next("subproc"),
            name: String::new(),
            failures: vec![Arc::new(Failure::blank(ids))],
        }
    }
}

/// A top-level process and its subprocesses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Process {
    /// Client-generated identifier.
    pub id: String,
    /// Process name, e.g. `PLANEACIÓN`.
    #[serde(rename = "nombre", default)]
    pub name: String,
    /// Display color, `#RRGGBB`.
    #[serde(default = "default_color")]
    pub color: String,
    /// Subprocesses, in display order.
    #[serde(rename = "subprocesos", default)]
    pub subprocesses: Vec<Arc<Subprocess>>,
}

fn default_color() -> String {
    DEFAULT_PROCESS_COLOR.to_string()
}

impl Process {
    /// A blank process holding one blank subprocess.
    #[must_use]
    pub fn blank(ids: &IdGenerator, color: &str) -> Self {
        Self {
            id: ids.next("proc"),
            name: String::new(),
            color: color.to_string(),
            subprocesses: vec![Arc::new(Subprocess::blank(ids))],
        }
    }

    /// Every identifier in this process subtree.
    pub fn all_ids(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.id.as_str()).chain(self.subprocesses.iter().flat_map(|sub| {
            std::iter::once(sub.id.as_str()).chain(sub.failures.iter().flat_map(|f| f.all_ids()))
        }))
    }
}

/// The `data` document of a modular matrix.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatrixDocument {
    /// Institutional header.
    #[serde(default)]
    pub header: Header,
    /// The process tree.
    #[serde(rename = "procesos", default)]
    pub processes: ProcessTree,
}

impl MatrixDocument {
    /// A fresh document with one of everything.
    #[must_use]
    pub fn new(header: Header, process_color: &str) -> Self {
        Self {
            header,
            processes: ProcessTree::with_color(process_color),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(v: i64) -> Score {
        Score::new(v).unwrap()
    }

    #[test]
    fn test_header_defaults() {
        let header = Header::default();
        assert_eq!(header.institution, DEFAULT_INSTITUTION);
        assert_eq!(header.version, "1");
        assert_eq!(header.page, "1");
        assert_eq!(header.issue_date.len(), 10);
        assert!(header.service.is_empty());
    }

    #[test]
    fn test_header_wire_names() {
        let mut header = Header::default();
        header.prepared_by = "Ana".to_string();
        let json = serde_json::to_value(&header).unwrap();
        assert_eq!(json["elaboradoPor"], "Ana");
        assert!(json.get("año").is_some());
        assert!(json.get("fechaEmision").is_some());
    }

    #[test]
    fn test_header_missing_fields_use_defaults() {
        let header: Header = serde_json::from_str(r#"{"servicio": "UCI"}"#).unwrap();
        assert_eq!(header.service, "UCI");
        assert_eq!(header.version, "1");
    }

    #[test]
    fn test_evaluation_set_recomputes_rpn() {
        let mut eval = Evaluation::default();
        assert_eq!(eval.rpn(), 1);
        eval.set(ScoreField::Severity, score(3));
        eval.set(ScoreField::Occurrence, score(4));
        let rpn = eval.set(ScoreField::Detectability, score(2));
        assert_eq!(rpn, 24);
        assert_eq!(eval.rpn(), 24);
        assert_eq!(eval.get(ScoreField::Occurrence), score(4));
    }

    #[test]
    fn test_evaluation_stored_rpn_is_recomputed_on_load() {
        let eval: Evaluation = serde_json::from_str(
            r#"{"severidad": 5, "detectabilidad": 2, "ocurrencia": 3, "rpn": 1}"#,
        )
        .unwrap();
        assert_eq!(eval.rpn(), 30);
    }

    #[test]
    fn test_evaluation_rejects_out_of_range_score() {
        let result: Result<Evaluation, _> = serde_json::from_str(
            r#"{"severidad": 6, "detectabilidad": 1, "ocurrencia": 1, "rpn": 6}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_evaluation_serializes_rpn() {
        let eval = Evaluation::new(score(2), score(2), score(2));
        let json = serde_json::to_value(eval).unwrap();
        assert_eq!(json["rpn"], 8);
        assert_eq!(json["severidad"], 2);
    }

    #[test]
    fn test_blank_failure_shape() {
        let ids = IdGenerator::new();
        let failure = Failure::blank(&ids);
        assert_eq!(failure.effects.len(), 1);
        assert_eq!(failure.causes.len(), 1);
        assert_eq!(failure.barriers.len(), 1);
        assert!(failure.recommended_actions.is_empty());
        assert!(failure.taken_actions.is_empty());
        assert_eq!(failure.rpn(), 1);
        assert!(failure.effects[0].id.starts_with("efecto-"));
    }

    #[test]
    fn test_failure_wire_names() {
        let ids = IdGenerator::new();
        let json = serde_json::to_value(Failure::blank(&ids)).unwrap();
        for key in [
            "descripcion",
            "efectosPotenciales",
            "causasPotenciales",
            "barrerasExistentes",
            "evaluacion",
            "accionesRecomendadas",
            "accionesTomadas",
            "responsable",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }

    #[test]
    fn test_process_all_ids_are_unique() {
        let ids = IdGenerator::new();
        let process = Process::blank(&ids, DEFAULT_PROCESS_COLOR);
        let all: Vec<&str> = process.all_ids().collect();
        // process, subprocess, failure, effect, cause, barrier
        assert_eq!(all.len(), 6);
        let unique: std::collections::HashSet<_> = all.iter().collect();
        assert_eq!(unique.len(), all.len());
    }

    #[test]
    fn test_process_missing_color_uses_default() {
        let process: Process =
            serde_json::from_str(r#"{"id": "proc-1", "nombre": "PLANEACIÓN"}"#).unwrap();
        assert_eq!(process.color, DEFAULT_PROCESS_COLOR);
        assert!(process.subprocesses.is_empty());
    }
}
