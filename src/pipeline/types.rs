//! Pipeline data types shared by both phases.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of processing one page in phase 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageExtraction {
    /// 1-based page number, unique within a result set.
    pub page_number: u32,
    pub extracted_text: Option<String>,
    pub matched: bool,
    pub matched_name: Option<String>,
    pub matched_contact: Option<String>,
    /// Set when the page could not be read. Never fatal to the batch.
    pub error: Option<String>,
}

impl PageExtraction {
    /// Page whose text came back but did not match anyone.
    pub fn unmatched(page_number: u32, extracted_text: Option<String>) -> Self {
        Self {
            page_number,
            extracted_text,
            matched: false,
            matched_name: None,
            matched_contact: None,
            error: None,
        }
    }

    /// Page that failed before a name could be read.
    pub fn failed(page_number: u32, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::unmatched(page_number, None)
        }
    }

    /// Page matched to a registry entry.
    pub fn matched(page_number: u32, extracted_text: String, name: String, contact: String) -> Self {
        Self {
            page_number,
            extracted_text: Some(extracted_text),
            matched: true,
            matched_name: Some(name),
            matched_contact: Some(contact),
            error: None,
        }
    }
}

/// Page-ordered collection of [`PageExtraction`]s from one phase-1 run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultSet(Vec<PageExtraction>);

impl ResultSet {
    /// Build from results gathered in arbitrary completion order.
    pub fn from_unordered(mut pages: Vec<PageExtraction>) -> Self {
        pages.sort_by_key(|p| p.page_number);
        Self(pages)
    }

    pub fn pages(&self) -> &[PageExtraction] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn matched(&self) -> impl Iterator<Item = &PageExtraction> {
        self.0.iter().filter(|p| p.matched)
    }

    pub fn matched_count(&self) -> usize {
        self.matched().count()
    }

    pub fn failed_count(&self) -> usize {
        self.0.iter().filter(|p| p.error.is_some()).count()
    }
}

/// Everything needed to run phase 2 for one correlation id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRecord {
    pub correlation_id: Uuid,
    pub source_document: Vec<u8>,
    pub result_set: ResultSet,
    pub created_at: DateTime<Utc>,
}

/// Result of one send attempt in phase 2. Returned to the caller, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchOutcome {
    pub page_number: u32,
    pub recipient_name: String,
    pub recipient_contact: String,
    pub sent: bool,
    pub detail: String,
}

/// All outcomes of one dispatch, in page order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReport {
    pub outcomes: Vec<DispatchOutcome>,
    pub sent_count: usize,
    pub failed_count: usize,
}

impl DispatchReport {
    pub fn from_outcomes(outcomes: Vec<DispatchOutcome>) -> Self {
        let sent_count = outcomes.iter().filter(|o| o.sent).count();
        Self {
            failed_count: outcomes.len() - sent_count,
            sent_count,
            outcomes,
        }
    }
}

/// Phase-1 response: the correlation id plus the ordered result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preview {
    pub correlation_id: Uuid,
    pub results: ResultSet,
}
