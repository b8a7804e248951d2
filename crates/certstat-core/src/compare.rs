//! Comparison of two README variants.
//!
//! Forks of the index drift apart: the same company can be revoked in one
//! copy and unknown in another. `compare_documents` lists those disagreements.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::CertificateListing;
use crate::readme::ReadmeDocument;

/// A field whose value differs between the two documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDifference {
    pub field: &'static str,
    pub left: String,
    pub right: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Difference {
    OnlyLeft { company: String },
    OnlyRight { company: String },
    Changed {
        company: String,
        fields: Vec<FieldDifference>,
    },
}

impl Difference {
    pub fn company(&self) -> &str {
        match self {
            Difference::OnlyLeft { company }
            | Difference::OnlyRight { company }
            | Difference::Changed { company, .. } => company,
        }
    }
}

/// Compares rows by exact company name. Results are sorted by company.
///
/// Statuses are compared by meaning (`✅ Signed` equals `Signed`); validity
/// strings are compared verbatim.
pub fn compare_documents(left: &ReadmeDocument, right: &ReadmeDocument) -> Vec<Difference> {
    let left_rows = by_company(left);
    let right_rows = by_company(right);

    let mut differences = Vec::new();

    for (company, l) in &left_rows {
        match right_rows.get(company) {
            None => differences.push(Difference::OnlyLeft {
                company: company.to_string(),
            }),
            Some(r) => {
                let fields = diff_listing(l, r);
                if !fields.is_empty() {
                    differences.push(Difference::Changed {
                        company: company.to_string(),
                        fields,
                    });
                }
            }
        }
    }

    for company in right_rows.keys() {
        if !left_rows.contains_key(company) {
            differences.push(Difference::OnlyRight {
                company: company.to_string(),
            });
        }
    }

    differences.sort_by(|a, b| a.company().cmp(b.company()));
    differences
}

/// First row wins when a company appears twice.
fn by_company(doc: &ReadmeDocument) -> BTreeMap<&str, &CertificateListing> {
    let mut rows = BTreeMap::new();
    for listing in doc.listings() {
        rows.entry(listing.company.as_str()).or_insert(listing);
    }
    rows
}

fn diff_listing(left: &CertificateListing, right: &CertificateListing) -> Vec<FieldDifference> {
    let mut fields = Vec::new();

    if left.status() != right.status() {
        fields.push(FieldDifference {
            field: "status",
            left: left.status.clone(),
            right: right.status.clone(),
        });
    }
    if left.valid_from != right.valid_from {
        fields.push(FieldDifference {
            field: "valid_from",
            left: left.valid_from.clone(),
            right: right.valid_from.clone(),
        });
    }
    if left.valid_to != right.valid_to {
        fields.push(FieldDifference {
            field: "valid_to",
            left: left.valid_to.clone(),
            right: right.valid_to.clone(),
        });
    }

    fields
}
