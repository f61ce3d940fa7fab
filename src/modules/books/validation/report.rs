//! Aggregation of validation issues into a per-field report.

use std::collections::BTreeMap;

use serde::{ser::SerializeMap, Serialize, Serializer};

use super::violation::{IssueKind, Violation};
use crate::modules::books::models::Field;

/// Key used for issues that concern the whole record.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// One problem found in a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    /// `None` for whole-record issues.
    pub field: Option<Field>,
    pub violation: Violation,
}

impl Issue {
    pub fn key(&self) -> &'static str {
        self.field.map_or(NON_FIELD_ERRORS, |field| field.as_str())
    }

    pub fn kind(&self) -> IssueKind {
        self.violation.kind()
    }

    pub fn message(&self) -> String {
        self.violation.to_string()
    }
}

/// Every issue found while validating one candidate, in discovery order.
///
/// A candidate is accepted only when the report is empty. Serializes as a
/// mapping from field name (or [`NON_FIELD_ERRORS`]) to a list of messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    issues: Vec<Issue>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a problem with a single field.
    pub fn field(&mut self, field: Field, violation: Violation) {
        self.issues.push(Issue {
            field: Some(field),
            violation,
        });
    }

    /// Record a problem with the record as a whole.
    pub fn non_field(&mut self, violation: Violation) {
        self.issues.push(Issue {
            field: None,
            violation,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn has_field(&self, field: Field) -> bool {
        self.issues.iter().any(|issue| issue.field == Some(field))
    }

    pub fn messages_for(&self, field: Field) -> Vec<String> {
        self.issues
            .iter()
            .filter(|issue| issue.field == Some(field))
            .map(Issue::message)
            .collect()
    }

    pub fn non_field_messages(&self) -> Vec<String> {
        self.issues
            .iter()
            .filter(|issue| issue.field.is_none())
            .map(Issue::message)
            .collect()
    }

    /// True when the report is non-empty and every issue is a uniqueness conflict.
    pub fn only_conflicts(&self) -> bool {
        !self.issues.is_empty()
            && self
                .issues
                .iter()
                .all(|issue| issue.kind() == IssueKind::UniquenessConflict)
    }

    /// Field name (or [`NON_FIELD_ERRORS`]) to messages.
    pub fn to_mapping(&self) -> BTreeMap<&'static str, Vec<String>> {
        let mut mapping: BTreeMap<&'static str, Vec<String>> = BTreeMap::new();
        for issue in &self.issues {
            mapping.entry(issue.key()).or_default().push(issue.message());
        }
        mapping
    }

    /// One JSON object per issue with field, kind, code and message.
    pub fn details(&self) -> Vec<serde_json::Value> {
        self.issues
            .iter()
            .map(|issue| {
                serde_json::json!({
                    "field": issue.key(),
                    "kind": issue.kind(),
                    "code": issue.violation.code(),
                    "message": issue.message(),
                })
            })
            .collect()
    }
}

impl Serialize for ValidationReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mapping = self.to_mapping();
        let mut map = serializer.serialize_map(Some(mapping.len()))?;
        for (key, messages) in &mapping {
            map.serialize_entry(key, messages)?;
        }
        map.end()
    }
}
