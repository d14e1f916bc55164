//! Editable view of a modular matrix.
//!
//! [`MatrixForm`] pairs a document with the record fields around it (name,
//! description, backend id) and exposes every node as an addressable field.
//! Reading goes through [`MatrixForm::fields`], writing through
//! [`MatrixForm::set_field`]; both reach straight into the tree, so there is
//! no second copy of the data to keep in sync.

use std::fmt;

use tracing::{debug, info};

use crate::document::{
    ElementKind, FailurePath, Header, MatrixDocument, ProcessTree, ScoreField,
};
use crate::error::{Error, FieldError, Result};
use crate::patterns;
use crate::rpn::Score;
use crate::store::{self, MatrixPayload, MatrixRecord, MatrixStore};

/// A field of the document header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderField {
    /// `fundacion`
    Institution,
    /// `codigo`
    Code,
    /// `version`
    Version,
    /// `pagina`
    Page,
    /// `mes`
    Month,
    /// `año`
    Year,
    /// `servicio`
    Service,
    /// `area`
    Area,
    /// `elaboradoPor`
    PreparedBy,
    /// `equipo`
    Equipment,
    /// `fechaEmision`
    IssueDate,
}

impl HeaderField {
    /// Every header field, in display order.
    pub const ALL: [Self; 11] = [
        Self::Institution,
        Self::Code,
        Self::Version,
        Self::Page,
        Self::Month,
        Self::Year,
        Self::Service,
        Self::Area,
        Self::PreparedBy,
        Self::Equipment,
        Self::IssueDate,
    ];

    /// Wire name of the field.
    #[must_use]
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::Institution => "fundacion",
            Self::Code => "codigo",
            Self::Version => "version",
            Self::Page => "pagina",
            Self::Month => "mes",
            Self::Year => "año",
            Self::Service => "servicio",
            Self::Area => "area",
            Self::PreparedBy => "elaboradoPor",
            Self::Equipment => "equipo",
            Self::IssueDate => "fechaEmision",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Institution => "institution",
            Self::Code => "code",
            Self::Version => "version",
            Self::Page => "page",
            Self::Month => "month",
            Self::Year => "year",
            Self::Service => "service",
            Self::Area => "area",
            Self::PreparedBy => "prepared by",
            Self::Equipment => "equipment",
            Self::IssueDate => "issue date",
        }
    }

    /// Whether a matrix can be submitted with this field blank.
    #[must_use]
    pub fn is_required(self) -> bool {
        matches!(
            self,
            Self::Service | Self::Area | Self::PreparedBy | Self::Equipment
        )
    }

    /// Current value in `header`.
    #[must_use]
    pub fn get(self, header: &Header) -> &str {
        match self {
            Self::Institution => &header.institution,
            Self::Code => &header.code,
            Self::Version => &header.version,
            Self::Page => &header.page,
            Self::Month => &header.month,
            Self::Year => &header.year,
            Self::Service => &header.service,
            Self::Area => &header.area,
            Self::PreparedBy => &header.prepared_by,
            Self::Equipment => &header.equipment,
            Self::IssueDate => &header.issue_date,
        }
    }

    /// Overwrite the value in `header`.
    pub fn set(self, header: &mut Header, value: impl Into<String>) {
        let slot = match self {
            Self::Institution => &mut header.institution,
            Self::Code => &mut header.code,
            Self::Version => &mut header.version,
            Self::Page => &mut header.page,
            Self::Month => &mut header.month,
            Self::Year => &mut header.year,
            Self::Service => &mut header.service,
            Self::Area => &mut header.area,
            Self::PreparedBy => &mut header.prepared_by,
            Self::Equipment => &mut header.equipment,
            Self::IssueDate => &mut header.issue_date,
        };
        *slot = value.into();
    }

    /// Look a field up by wire name.
    #[must_use]
    pub fn from_wire_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.wire_name() == name)
    }
}

/// Address of one editable field of a form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldPath {
    /// Matrix name.
    Name,
    /// Matrix description.
    Description,
    /// A header field.
    Header(HeaderField),
    /// Name of a process.
    ProcessName {
        /// Process id.
        process: String,
    },
    /// Display color of a process.
    ProcessColor {
        /// Process id.
        process: String,
    },
    /// Name of a subprocess.
    SubprocessName {
        /// Process id.
        process: String,
        /// Subprocess id.
        subprocess: String,
    },
    /// Description of a failure.
    FailureDescription(FailurePath),
    /// Party responsible for a failure's actions.
    Responsible(FailurePath),
    /// Text of one list element.
    Element {
        /// Failure owning the list.
        failure: FailurePath,
        /// Which list.
        kind: ElementKind,
        /// Element id.
        element: String,
    },
    /// One evaluation score.
    Score {
        /// Failure being scored.
        failure: FailurePath,
        /// Which score.
        field: ScoreField,
    },
}

fn write_failure(f: &mut fmt::Formatter<'_>, path: &FailurePath) -> fmt::Result {
    write!(
        f,
        "procesos.{}.subprocesos.{}.fallasPotenciales.{}",
        path.process, path.subprocess, path.failure
    )
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name => f.write_str("name"),
            Self::Description => f.write_str("description"),
            Self::Header(field) => write!(f, "header.{}", field.wire_name()),
            Self::ProcessName { process } => write!(f, "procesos.{process}.nombre"),
            Self::ProcessColor { process } => write!(f, "procesos.{process}.color"),
            Self::SubprocessName {
                process,
                subprocess,
            } => write!(f, "procesos.{process}.subprocesos.{subprocess}.nombre"),
            Self::FailureDescription(path) => {
                write_failure(f, path)?;
                f.write_str(".descripcion")
            }
            Self::Responsible(path) => {
                write_failure(f, path)?;
                f.write_str(".responsable")
            }
            Self::Element {
                failure,
                kind,
                element,
            } => {
                write_failure(f, failure)?;
                write!(f, ".{}.{element}", kind.wire_name())
            }
            Self::Score { failure, field } => {
                write_failure(f, failure)?;
                write!(f, ".evaluacion.{}", field.wire_name())
            }
        }
    }
}

/// A modular matrix being edited.
#[derive(Debug, Clone)]
pub struct MatrixForm {
    /// Matrix name.
    pub name: String,
    /// Free-text description; blank means none.
    pub description: String,
    /// Institutional header.
    pub header: Header,
    /// The process tree.
    pub tree: ProcessTree,
    id: Option<i64>,
    saved_hash: Option<String>,
}

impl MatrixForm {
    /// A blank form for a new matrix.
    #[must_use]
    pub fn new(header: Header, process_color: &str) -> Self {
        let document = MatrixDocument::new(header, process_color);
        Self {
            name: String::new(),
            description: String::new(),
            header: document.header,
            tree: document.processes,
            id: None,
            saved_hash: None,
        }
    }

    /// A form editing a stored matrix.
    #[must_use]
    pub fn from_record(record: MatrixRecord<MatrixDocument>) -> Self {
        let mut form = Self {
            name: record.name,
            description: record.description.unwrap_or_default(),
            header: record.data.header,
            tree: record.data.processes,
            id: Some(record.id),
            saved_hash: None,
        };
        form.saved_hash = Some(form.content_hash());
        form
    }

    /// A form holding a draft; `id` selects the record a save replaces.
    #[must_use]
    pub fn from_payload(payload: MatrixPayload<MatrixDocument>, id: Option<i64>) -> Self {
        Self {
            name: payload.name,
            description: payload.description.unwrap_or_default(),
            header: payload.data.header,
            tree: payload.data.processes,
            id,
            saved_hash: None,
        }
    }

    /// Use `color` for processes added from now on.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidColor`] if `color` is not `#RRGGBB`.
    pub fn with_process_color(mut self, color: &str) -> Result<Self> {
        self.tree.set_default_color(color)?;
        Ok(self)
    }

    /// Load a stored matrix into a form.
    ///
    /// # Errors
    ///
    /// Returns the store's error.
    pub async fn load(store: &dyn MatrixStore, id: i64) -> Result<Self> {
        let record = store::load::<MatrixDocument>(store, id).await?;
        info!(matrix = id, name = %record.name, "loaded matrix");
        Ok(Self::from_record(record))
    }

    /// Backend id, set once the matrix has been saved.
    #[must_use]
    pub fn id(&self) -> Option<i64> {
        self.id
    }

    /// Whether saving updates an existing matrix.
    #[must_use]
    pub fn is_edit_mode(&self) -> bool {
        self.id.is_some()
    }

    /// The document as it would be submitted.
    #[must_use]
    pub fn document(&self) -> MatrixDocument {
        MatrixDocument {
            header: self.header.clone(),
            processes: self.tree.clone(),
        }
    }

    /// Every editable field with its current value, in document order.
    #[must_use]
    pub fn fields(&self) -> Vec<(FieldPath, String)> {
        let mut fields = vec![
            (FieldPath::Name, self.name.clone()),
            (FieldPath::Description, self.description.clone()),
        ];
        fields.extend(
            HeaderField::ALL
                .into_iter()
                .map(|h| (FieldPath::Header(h), h.get(&self.header).to_string())),
        );

        for process in self.tree.processes() {
            let pid = process.id.clone();
            fields.push((
                FieldPath::ProcessName {
                    process: pid.clone(),
                },
                process.name.clone(),
            ));
            fields.push((
                FieldPath::ProcessColor {
                    process: pid.clone(),
                },
                process.color.clone(),
            ));
            for sub in &process.subprocesses {
                fields.push((
                    FieldPath::SubprocessName {
                        process: pid.clone(),
                        subprocess: sub.id.clone(),
                    },
                    sub.name.clone(),
                ));
                for failure in &sub.failures {
                    let path = FailurePath::new(pid.as_str(), sub.id.as_str(), failure.id.as_str());
                    fields.push((
                        FieldPath::FailureDescription(path.clone()),
                        failure.description.clone(),
                    ));
                    for kind in ElementKind::ALL {
                        for element in failure.elements(kind) {
                            fields.push((
                                FieldPath::Element {
                                    failure: path.clone(),
                                    kind,
                                    element: element.id.clone(),
                                },
                                element.text.clone(),
                            ));
                        }
                    }
                    for field in ScoreField::ALL {
                        fields.push((
                            FieldPath::Score {
                                failure: path.clone(),
                                field,
                            },
                            failure.evaluation.get(field).to_string(),
                        ));
                    }
                    fields.push((FieldPath::Responsible(path), failure.responsible.clone()));
                }
            }
        }
        fields
    }

    /// Write a field value through to the document.
    ///
    /// # Errors
    ///
    /// Returns the tree's error for unknown ids, [`Error::InvalidColor`] for
    /// bad colors and [`Error::InvalidScore`] or a validation error for bad
    /// scores. The form is unchanged on error.
    pub fn set_field(&mut self, path: &FieldPath, value: &str) -> Result<()> {
        debug!(field = %path, "set field");
        match path {
            FieldPath::Name => self.name = value.to_string(),
            FieldPath::Description => self.description = value.to_string(),
            FieldPath::Header(field) => field.set(&mut self.header, value),
            FieldPath::ProcessName { process } => self.tree.rename_process(process, value)?,
            FieldPath::ProcessColor { process } => self.tree.recolor_process(process, value)?,
            FieldPath::SubprocessName {
                process,
                subprocess,
            } => self.tree.rename_subprocess(process, subprocess, value)?,
            FieldPath::FailureDescription(failure) => {
                self.tree.describe_failure(failure, value)?;
            }
            FieldPath::Responsible(failure) => self.tree.set_responsible(failure, value)?,
            FieldPath::Element {
                failure,
                kind,
                element,
            } => self.tree.edit_element(failure, *kind, element, value)?,
            FieldPath::Score { failure, field } => {
                let raw: i64 = value.trim().parse().map_err(|_| {
                    Error::invalid_field(path.to_string(), "score must be a whole number")
                })?;
                self.tree.set_score(failure, *field, Score::new(raw)?)?;
            }
        }
        Ok(())
    }

    /// Check the fields required for submission.
    #[must_use]
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push(FieldError::new(
                FieldPath::Name.to_string(),
                "matrix name is required",
            ));
        }
        for field in HeaderField::ALL.into_iter().filter(|f| f.is_required()) {
            if field.get(&self.header).trim().is_empty() {
                errors.push(FieldError::new(
                    FieldPath::Header(field).to_string(),
                    format!("{} is required", field.label()),
                ));
            }
        }
        let issue_date = self.header.issue_date.trim();
        if !issue_date.is_empty() && !patterns::date().matches(issue_date) {
            errors.push(FieldError::new(
                FieldPath::Header(HeaderField::IssueDate).to_string(),
                format!("issue date must be {}", patterns::date().description),
            ));
        }
        for (list, kind) in self.tree.empty_lists() {
            errors.push(FieldError::new(list, kind.minimum_warning()));
        }
        errors
    }

    fn payload(&self) -> MatrixPayload<MatrixDocument> {
        let description = self.description.trim();
        MatrixPayload {
            name: self.name.trim().to_string(),
            description: (!description.is_empty()).then(|| description.to_string()),
            data: self.document(),
        }
    }

    /// Validate and build the request body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] with every failing field.
    pub fn submission(&self) -> Result<MatrixPayload<MatrixDocument>> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(Error::Validation(errors));
        }
        Ok(self.payload())
    }

    /// Create or update the matrix.
    ///
    /// A successful create switches the form to edit mode, so saving again
    /// updates the same record.
    ///
    /// # Errors
    ///
    /// Returns a validation error before anything is sent, or the store's
    /// error. The form keeps its content either way.
    pub async fn save(&mut self, store: &dyn MatrixStore) -> Result<MatrixRecord<MatrixDocument>> {
        let payload = self.submission()?;
        let record = match self.id {
            Some(id) => store::update(store, id, &payload).await?,
            None => store::create(store, &payload).await?,
        };
        info!(
            matrix = record.id,
            name = %record.name,
            created = self.id.is_none(),
            "saved matrix"
        );
        self.id = Some(record.id);
        self.saved_hash = Some(self.content_hash());
        Ok(record)
    }

    /// BLAKE3 hash of the content as it would be submitted.
    #[must_use]
    pub fn content_hash(&self) -> String {
        // Serializing plain strings and integers cannot fail.
        let bytes = serde_json::to_vec(&self.payload()).unwrap_or_default();
        blake3::hash(&bytes).to_hex().to_string()
    }

    /// Whether the content differs from what was last loaded or saved.
    ///
    /// A form that was never saved is dirty.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.saved_hash.as_deref() != Some(self.content_hash().as_str())
    }

    /// File name for the spreadsheet export.
    #[must_use]
    pub fn export_file_name(&self) -> String {
        export_file_name(&self.name)
    }

    /// Id to export from.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unsaved`] when the matrix has never been saved.
    pub fn export_target(&self) -> Result<i64> {
        self.id.ok_or(Error::Unsaved("exporting"))
    }
}

/// Spreadsheet file name for a matrix called `name`.
#[must_use]
pub fn export_file_name(name: &str) -> String {
    format!(
        "AMFE_Modular_{}.xlsx",
        patterns::whitespace().replace_all(name, "_")
    )
}
