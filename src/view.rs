//! Filtered and paginated projections over the lead store.
//!
//! Everything here is pure and recomputed on each request; the data
//! volumes of one dashboard session do not warrant indexing.

use serde::{Deserialize, Serialize};

use crate::memory::{Lead, LeadStatus};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusFilter {
    #[default]
    #[serde(alias = "TODOS")]
    All,
    #[serde(alias = "NOVO")]
    New,
    #[serde(alias = "PROSPECTADO")]
    Prospected,
}

impl StatusFilter {
    pub fn matches(self, status: LeadStatus) -> bool {
        match self {
            StatusFilter::All        => true,
            StatusFilter::New        => status == LeadStatus::New,
            StatusFilter::Prospected => status == LeadStatus::Prospected,
        }
    }

    /// Counter caption shown next to the filter control.
    pub fn label(self) -> &'static str {
        match self {
            StatusFilter::All        => "TOTAL",
            StatusFilter::New        => "NEW",
            StatusFilter::Prospected => "PROSPECTED",
        }
    }
}

/// Order-preserving subsequence of `leads` matching `status`.
pub fn filter(leads: &[Lead], status: StatusFilter) -> Vec<&Lead> {
    leads.iter().filter(|l| status.matches(l.status)).collect()
}

/// Window of at most `page_size` items starting at `(page - 1) * page_size`.
///
/// Page numbers are 1-based; page 0 and pages past the end yield an empty
/// slice. Clamping is the caller's job.
pub fn paginate<T>(items: &[T], page: usize, page_size: usize) -> &[T] {
    if page == 0 || page_size == 0 {
        return &[];
    }
    let start = (page - 1).saturating_mul(page_size);
    if start >= items.len() {
        return &[];
    }
    let end = start.saturating_add(page_size).min(items.len());
    &items[start..end]
}

/// `ceil(count / page_size)`, zero for an empty collection.
pub fn total_pages(count: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    count.div_ceil(page_size)
}

/// One rendered lead: the record plus its click-to-chat link.
#[derive(Debug, Serialize, Clone)]
pub struct LeadCard {
    #[serde(flatten)]
    pub lead: Lead,
    pub whatsapp_url: String,
}

impl From<&Lead> for LeadCard {
    fn from(lead: &Lead) -> Self {
        LeadCard {
            whatsapp_url: lead.whatsapp_url(),
            lead: lead.clone(),
        }
    }
}

/// What the dashboard shows for the current filter and page.
#[derive(Debug, Serialize, Clone)]
pub struct PageView {
    pub filter:      StatusFilter,
    /// Counter caption rendered as `<label>: <total>` next to the filter
    /// control, so clients need no mapping table of their own.
    pub label:       &'static str,
    pub page:        usize,
    pub page_size:   usize,
    pub total_pages: usize,
    /// Size of the filtered collection, not of the store.
    pub total:       usize,
    pub has_prev:    bool,
    pub has_next:    bool,
    pub leads:       Vec<LeadCard>,
    pub error:       Option<String>,
    pub generating:  bool,
}
