//! Record parsing and row filtering.
//!
//! The first line of each object is a header naming that object's fields;
//! every following row is aligned positionally against it. Schemas are
//! scoped to one object and re-derived per object - files are not assumed
//! to share a header.
//!
//! The row filter is data, not code: a list of (field, expected value)
//! pairs. The shipped predicate keeps accepted egress flows, matching the
//! store's convention literally (`action == "ACCEPT"`, case-sensitive).

use std::collections::BTreeMap;

/// Row delimiter for flow-log exports.
const DELIMITER: char = ',';

/// The canonical field set carried by every projected record.
pub const CANONICAL_FIELDS: &[&str] = &[
    "srcaddr",
    "dstaddr",
    "dstport",
    "protocol",
    "vpc-id",
    "subnet-id",
    "instance-id",
    "region",
    "action",
    "flow-direction",
];

/// The attributes aggregated per source address.
pub const TRACKED_ATTRIBUTES: &[&str] = &[
    "dstaddr",
    "dstport",
    "protocol",
    "vpc-id",
    "subnet-id",
    "instance-id",
    "region",
];

/// Ordered field names derived from one object's header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSchema {
    fields: Vec<String>,
}

impl RecordSchema {
    /// Derive a schema from a header line.
    pub fn from_header(header: &str) -> Self {
        Self {
            fields: header
                .split(DELIMITER)
                .map(|f| f.trim().to_string())
                .collect(),
        }
    }

    /// Number of fields a well-formed row must carry.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Position of a named field, if the header declared it.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == name)
    }
}

/// Declarative row filter: every listed field must equal its expected value.
///
/// Field comparisons are case-sensitive. A field the schema does not declare
/// reads as an empty value, so rows can never match on it.
#[derive(Debug, Clone)]
pub struct RowPredicate {
    required: Vec<(String, String)>,
}

impl RowPredicate {
    /// The shipped predicate: ACL-accepted egress flows.
    ///
    /// `action == "ACCEPT"` is kept literally as the store records it, even
    /// though it conflates ACL accept with traffic direction semantics.
    pub fn accepted_egress() -> Self {
        Self::new(&[("action", "ACCEPT"), ("flow-direction", "egress")])
    }

    /// Build a predicate from (field, expected value) pairs.
    pub fn new(pairs: &[(&str, &str)]) -> Self {
        Self {
            required: pairs
                .iter()
                .map(|(f, v)| (f.to_string(), v.to_string()))
                .collect(),
        }
    }

    fn matches(&self, schema: &RecordSchema, values: &[&str]) -> bool {
        self.required.iter().all(|(field, expected)| {
            let actual = schema
                .index_of(field)
                .and_then(|i| values.get(i).copied())
                .unwrap_or("");
            actual == expected
        })
    }
}

/// A retained row projected onto the canonical field set.
///
/// Fields absent from the object's schema carry empty values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowRecord {
    values: BTreeMap<&'static str, String>,
}

impl FlowRecord {
    /// The record's source address.
    pub fn srcaddr(&self) -> &str {
        self.field("srcaddr")
    }

    /// Value of a canonical field; empty if the schema lacked it.
    pub fn field(&self, name: &str) -> &str {
        self.values.get(name).map(String::as_str).unwrap_or("")
    }
}

/// Outcome of parsing one data row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    /// The row matched the predicate and was projected.
    Matched(FlowRecord),

    /// The row was well-formed but did not match the predicate.
    Filtered,

    /// The row did not align with the schema and was skipped.
    Malformed {
        reason: String,
        /// Source address, when the misaligned row still exposed one.
        srcaddr: Option<String>,
    },
}

/// Parse one data row against an object's schema and predicate.
///
/// A row whose field count differs from the header is malformed: it is
/// reported and skipped, never fatal to the object or the run.
pub fn parse_row(schema: &RecordSchema, predicate: &RowPredicate, line: &str) -> RowOutcome {
    let values: Vec<&str> = line.split(DELIMITER).map(str::trim).collect();

    if values.len() != schema.field_count() {
        let srcaddr = schema
            .index_of("srcaddr")
            .and_then(|i| values.get(i))
            .map(|v| v.to_string());
        return RowOutcome::Malformed {
            reason: format!(
                "expected {} fields, got {}",
                schema.field_count(),
                values.len()
            ),
            srcaddr,
        };
    }

    if !predicate.matches(schema, &values) {
        return RowOutcome::Filtered;
    }

    let projected = CANONICAL_FIELDS
        .iter()
        .map(|&name| {
            let value = schema
                .index_of(name)
                .and_then(|i| values.get(i).copied())
                .unwrap_or("");
            (name, value.to_string())
        })
        .collect();

    RowOutcome::Matched(FlowRecord { values: projected })
}
