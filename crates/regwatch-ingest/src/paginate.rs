//! Incremental pagination against a date window
//!
//! Pages are requested newest-first on the date field. Each page is filtered
//! against the window, and the walk stops as soon as no later page can hold a
//! record inside it:
//!
//! 1. the page budget is spent (or a page comes back empty),
//! 2. the oldest date on the page is already before the window start,
//! 3. the page is shorter than requested.
//!
//! Rule 2 is only sound while the feed honours the sort. Observed dates are
//! checked to be non-increasing across the whole walk; after the first
//! violation rule 2 is switched off and the walk continues until 1 or 3.

use chrono::NaiveDate;
use regwatch_common::{Record, Result};
use tracing::{debug, info, warn};

use crate::client::PageSource;
use crate::schema::Schema;

/// Inclusive date range `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl std::fmt::Display for DateWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

/// Page size and page budget for one walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub page_limit: usize,
    pub max_pages: usize,
}

/// Why a walk ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    MaxPages,
    EmptyPage,
    PastWindow,
    ShortPage,
}

/// Outcome of a walk
#[derive(Debug)]
pub struct ScanResult {
    /// In-window records, in fetch order
    pub records: Vec<Record>,
    pub pages_fetched: usize,
    pub stop: StopReason,

    /// The feed was found out of order and scanned without early stopping
    pub sort_violated: bool,
}

/// Tracks whether observed dates stay non-increasing
#[derive(Debug, Default)]
struct SortCheck {
    last: Option<NaiveDate>,
    violated: bool,
}

impl SortCheck {
    fn observe(&mut self, date: NaiveDate, page: usize) {
        if let Some(previous) = self.last {
            if date > previous && !self.violated {
                warn!(
                    page,
                    %previous,
                    %date,
                    "Feed is not sorted newest-first; scanning the full window"
                );
                self.violated = true;
            }
        }
        self.last = Some(date);
    }
}

/// Walk `source` collecting every record whose date lies in `window`.
pub async fn scan<S>(
    source: &S,
    schema: &Schema,
    window: DateWindow,
    limits: PageLimits,
) -> Result<ScanResult>
where
    S: PageSource + ?Sized,
{
    let limit = limits.page_limit;
    let mut offset = 0usize;
    let mut pages = 0usize;
    let mut fresh = Vec::new();
    let mut order = SortCheck::default();

    let stop = loop {
        if pages >= limits.max_pages {
            warn!(max_pages = limits.max_pages, "Page budget spent; results may be truncated");
            break StopReason::MaxPages;
        }
        pages += 1;

        let page = source
            .fetch_page(limit, offset, Some(&schema.date_field))
            .await?;
        if page.is_empty() {
            break StopReason::EmptyPage;
        }
        let page_len = page.len();

        let mut oldest: Option<NaiveDate> = None;
        let mut matched = 0usize;
        for record in page {
            let Some(date) = schema.date_of(&record) else {
                continue;
            };
            order.observe(date, pages);
            oldest = Some(oldest.map_or(date, |o| o.min(date)));
            if window.contains(date) {
                matched += 1;
                fresh.push(record);
            }
        }

        debug!(
            page = pages,
            offset,
            records = page_len,
            matched,
            oldest = ?oldest,
            "Scanned page"
        );

        if !order.violated && oldest.is_some_and(|o| o < window.start) {
            break StopReason::PastWindow;
        }
        if page_len < limit {
            break StopReason::ShortPage;
        }
        offset += limit;
    };

    info!(
        window = %window,
        pages,
        matched = fresh.len(),
        stop = ?stop,
        "Pagination finished"
    );

    Ok(ScanResult {
        records: fresh,
        pages_fetched: pages,
        stop,
        sort_violated: order.violated,
    })
}

/// Sort ascending by (date, identity) so output does not depend on fetch order.
pub fn order_records(records: &mut [Record], schema: &Schema) {
    records.sort_by_cached_key(|record| (schema.date_of(record), schema.id_of(record)));
}
