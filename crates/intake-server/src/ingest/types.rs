//! Core types for schema-validated ingestion

use intake_common::RecordKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A named record array submitted for one record kind.
///
/// Fields are optional because absence is a client error reported through an
/// `IngestionResult`, not a deserialization failure.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestionPayload {
    pub kind: RecordKind,
    pub name: Option<String>,
    pub records: Option<Vec<Value>>,
}

impl IngestionPayload {
    pub fn new(kind: RecordKind, name: impl Into<String>, records: Vec<Value>) -> Self {
        Self {
            kind,
            name: Some(name.into()),
            records: Some(records),
        }
    }

    /// Decode the per-kind request envelope, e.g.
    /// `{"dimension_name": "district", "dimension": [...]}`.
    ///
    /// A non-string name is treated as missing and a non-array record field as
    /// absent.
    pub fn from_json(kind: RecordKind, body: &Value) -> Self {
        let name = body
            .get(kind.name_field())
            .and_then(Value::as_str)
            .map(str::to_string);
        let records = body
            .get(kind.records_field())
            .and_then(Value::as_array)
            .cloned();

        Self { kind, name, records }
    }

    /// The schema name as supplied, if it is non-empty
    pub fn schema_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|n| !n.is_empty())
    }
}

/// Outcome of validating a single record. Consumed immediately, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub reasons: Vec<String>,
}

impl ValidationOutcome {
    pub fn from_reasons(reasons: Vec<String>) -> Self {
        Self {
            valid: reasons.is_empty(),
            reasons,
        }
    }
}

/// HTTP-style status carried by an `IngestionResult`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
pub enum ResultCode {
    Ok,
    BadRequest,
}

impl ResultCode {
    pub fn as_u16(self) -> u16 {
        match self {
            ResultCode::Ok => 200,
            ResultCode::BadRequest => 400,
        }
    }
}

impl From<ResultCode> for u16 {
    fn from(code: ResultCode) -> Self {
        code.as_u16()
    }
}

impl TryFrom<u16> for ResultCode {
    type Error = String;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        match code {
            200 => Ok(ResultCode::Ok),
            400 => Ok(ResultCode::BadRequest),
            other => Err(format!("unsupported result code {other}")),
        }
    }
}

/// Outcome of one ingestion call.
///
/// Exactly one of `message` / `error` is set, selected by `code`. On success
/// `valid_counter + error_counter` equals the number of submitted records; a
/// rejected payload has both counters at zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionResult {
    pub code: ResultCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub valid_counter: u64,
    pub error_counter: u64,
}

impl IngestionResult {
    pub fn success(kind: RecordKind, valid_counter: u64, error_counter: u64) -> Self {
        Self {
            code: ResultCode::Ok,
            message: Some(format!(
                "{} ingested: {} valid, {} invalid record(s)",
                kind.title(),
                valid_counter,
                error_counter
            )),
            error: None,
            valid_counter,
            error_counter,
        }
    }

    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            code: ResultCode::BadRequest,
            message: None,
            error: Some(error.into()),
            valid_counter: 0,
            error_counter: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == ResultCode::Ok
    }
}
