//! `amfe` - Client and document model for AMFE (FMEA) risk-assessment matrices
//!
//! This library provides the modular matrix document (processes, subprocesses,
//! failure modes and their evaluations), RPN scoring, form editing, and the
//! stores that persist matrices: the REST backend and an offline `SQLite`
//! database.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod accounts;
pub mod api;
pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod form;
pub mod legacy;
pub mod logging;
pub mod patterns;
pub mod rpn;
pub mod session;
pub mod storage;
pub mod store;

pub use api::ApiClient;
pub use config::Config;
pub use document::{FailurePath, MatrixDocument, ProcessTree};
pub use error::{Error, Result};
pub use form::MatrixForm;
pub use legacy::LegacyAssessment;
pub use logging::init_logging;
pub use rpn::{rpn, RiskLevel, RiskScheme, Score};
pub use session::{Session, SessionStore};
pub use storage::Storage;
pub use store::{Collection, MatrixPayload, MatrixRecord, MatrixStore, Page};
