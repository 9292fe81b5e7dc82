// src/engine.rs ---------------------------------------------------------------
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{GenerateError, Result};
use crate::lead_agent::LeadSource;
use crate::memory::{LeadDraft, LeadStatus, LeadStore};
use crate::view::{self, LeadCard, PageView, StatusFilter};

/// The one message users see for any failed generation.
pub const GENERATION_FAILED: &str =
    "Failed to generate leads. Check your API key or try again.";

/// Session state behind the dashboard: the leads plus what the user is
/// currently looking at.
#[derive(Debug)]
pub struct Dashboard {
    store:      LeadStore,
    filter:     StatusFilter,
    page:       usize,
    page_size:  usize,
    error:      Option<String>,
    /// Shared with the live [`GenerationTicket`], which clears it on drop.
    in_flight:  Arc<AtomicBool>,
}

/// Proof that a generation is in flight. Finishing consumes it; dropping it
/// early (a cancelled request) releases the in-flight slot all the same.
#[must_use]
#[derive(Debug)]
pub struct GenerationTicket {
    niche:     String,
    in_flight: Arc<AtomicBool>,
}

impl GenerationTicket {
    pub fn niche(&self) -> &str {
        &self.niche
    }
}

impl Drop for GenerationTicket {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::SeqCst);
    }
}

impl Dashboard {
    pub fn new(page_size: usize) -> Self {
        Self {
            store: LeadStore::new(),
            filter: StatusFilter::All,
            page: 1,
            page_size: page_size.max(1),
            error: None,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn store(&self) -> &LeadStore { &self.store }
    pub fn filter(&self) -> StatusFilter { self.filter }
    pub fn page(&self) -> usize { self.page }
    pub fn error(&self) -> Option<&str> { self.error.as_deref() }
    pub fn is_generating(&self) -> bool { self.in_flight.load(Ordering::SeqCst) }

    pub fn select_filter(&mut self, filter: StatusFilter) {
        self.filter = filter;
        self.page = 1;
    }

    pub fn total_pages(&self) -> usize {
        let count = view::filter(self.store.leads(), self.filter).len();
        view::total_pages(count, self.page_size)
    }

    pub fn next_page(&mut self) {
        self.page = (self.page + 1).min(self.total_pages().max(1));
    }

    pub fn prev_page(&mut self) {
        self.page = self.page.saturating_sub(1).max(1);
    }

    pub fn toggle_status(&mut self, id: Uuid) -> Option<LeadStatus> {
        self.store.toggle_status(id)
    }

    /// Guard a new generation. The ticket carries the trimmed niche to send
    /// upstream and holds the in-flight slot until finished or dropped.
    pub fn begin_generation(&mut self, niche: &str) -> Result<GenerationTicket> {
        let niche = niche.trim();
        if niche.is_empty() {
            self.error = Some(GENERATION_FAILED.to_string());
            return Err(GenerateError::EmptyNiche);
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(GenerateError::Busy);
        }
        self.error = None;
        Ok(GenerationTicket {
            niche: niche.to_string(),
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    /// Apply the outcome of a generation started with `begin_generation`.
    pub fn finish_generation(
        &mut self,
        ticket: GenerationTicket,
        outcome: Result<Vec<LeadDraft>>,
    ) -> Result<usize> {
        let niche = ticket.niche();
        let result = match outcome {
            Ok(drafts) => {
                let now = Utc::now();
                let batch: Vec<_> = drafts.into_iter().map(|d| d.into_lead(niche, now)).collect();
                let added = batch.len();
                self.store.add_batch(batch);
                self.page = 1;
                Ok(added)
            }
            Err(e) => {
                self.error = Some(GENERATION_FAILED.to_string());
                Err(e)
            }
        };
        drop(ticket);
        result
    }

    pub fn view(&self) -> PageView {
        let filtered = view::filter(self.store.leads(), self.filter);
        let total = filtered.len();
        let total_pages = view::total_pages(total, self.page_size);
        let leads = view::paginate(&filtered, self.page, self.page_size)
            .iter()
            .map(|l| LeadCard::from(*l))
            .collect();

        PageView {
            filter: self.filter,
            label: self.filter.label(),
            page: self.page,
            page_size: self.page_size,
            total_pages,
            total,
            has_prev: self.page > 1,
            has_next: self.page < total_pages,
            leads,
            error: self.error.clone(),
            generating: self.is_generating(),
        }
    }
}

/// Run one generation end to end. The dashboard lock is released while the
/// request is outstanding, so reads and toggles stay responsive. Dropping
/// this future mid-request frees the in-flight slot and adds nothing.
pub async fn run_generation<S>(
    dashboard: &Mutex<Dashboard>,
    source: &S,
    niche: &str,
) -> Result<usize>
where
    S: LeadSource + ?Sized,
{
    let ticket = dashboard.lock().await.begin_generation(niche)?;
    let niche = ticket.niche().to_string();
    info!("generating leads for niche {niche:?}");

    let outcome = source.generate(&niche).await;
    if let Err(e) = &outcome {
        warn!("generation for {niche:?} failed: {e}");
    }

    let added = dashboard.lock().await.finish_generation(ticket, outcome)?;
    info!("added {added} leads for niche {niche:?}");
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    fn draft(name: &str, status: LeadStatus) -> LeadDraft {
        LeadDraft {
            name: name.into(),
            email: format!("{}@example.com", name.to_lowercase()),
            phone: "(11) 91234-5678".into(),
            niche: Some("Tecnologia".into()),
            status: Some(status),
            ..Default::default()
        }
    }

    fn five() -> Vec<LeadDraft> {
        vec![
            draft("Old1", LeadStatus::New),
            draft("Old2", LeadStatus::Prospected),
            draft("Old3", LeadStatus::New),
            draft("Old4", LeadStatus::Prospected),
            draft("Old5", LeadStatus::New),
        ]
    }

    struct Fixed(Vec<LeadDraft>);

    #[async_trait]
    impl LeadSource for Fixed {
        async fn generate(&self, _niche: &str) -> Result<Vec<LeadDraft>> {
            Ok(self.0.clone())
        }
    }

    struct Garbage;

    #[async_trait]
    impl LeadSource for Garbage {
        async fn generate(&self, _niche: &str) -> Result<Vec<LeadDraft>> {
            crate::lead_agent::parse_leads("<html>502</html>")
        }
    }

    #[tokio::test]
    async fn batch_of_five_filters_three_and_two() {
        let dash = Mutex::new(Dashboard::new(3));
        assert_eq!(run_generation(&dash, &Fixed(five()), "Tecnologia").await.unwrap(), 5);

        let mut d = dash.lock().await;
        assert_eq!(d.view().total, 5);
        d.select_filter(StatusFilter::New);
        assert_eq!(d.view().total, 3);
        d.select_filter(StatusFilter::Prospected);
        assert_eq!(d.view().total, 2);
    }

    #[tokio::test]
    async fn two_pages_of_three_and_two() {
        let dash = Mutex::new(Dashboard::new(3));
        run_generation(&dash, &Fixed(five()), "Tecnologia").await.unwrap();

        let mut d = dash.lock().await;
        let first = d.view();
        assert_eq!(first.total_pages, 2);
        assert_eq!(first.leads.len(), 3);
        assert!(!first.has_prev && first.has_next);

        d.next_page();
        let second = d.view();
        assert_eq!(second.page, 2);
        assert_eq!(second.leads.len(), 2);

        d.next_page();
        assert_eq!(d.page(), 2);
        d.prev_page();
        d.prev_page();
        assert_eq!(d.page(), 1);
    }

    #[tokio::test]
    async fn new_batch_prepends_and_resets_page() {
        let dash = Mutex::new(Dashboard::new(3));
        run_generation(&dash, &Fixed(five()), "Tecnologia").await.unwrap();
        dash.lock().await.next_page();

        let fresh = vec![draft("New1", LeadStatus::New), draft("New2", LeadStatus::New)];
        run_generation(&dash, &Fixed(fresh), "Tecnologia").await.unwrap();

        let d = dash.lock().await;
        assert_eq!(d.page(), 1);
        let names: Vec<&str> = d.store().leads().iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["New1", "New2", "Old1", "Old2", "Old3", "Old4", "Old5"]);
    }

    #[tokio::test]
    async fn malformed_reply_leaves_store_untouched() {
        let dash = Mutex::new(Dashboard::new(3));
        run_generation(&dash, &Fixed(five()), "Tecnologia").await.unwrap();

        let err = run_generation(&dash, &Garbage, "Tecnologia").await.unwrap_err();
        assert!(matches!(err, GenerateError::Malformed(_)));

        let d = dash.lock().await;
        assert_eq!(d.store().len(), 5);
        assert_eq!(d.error(), Some(GENERATION_FAILED));
        assert!(!d.is_generating());
    }

    #[tokio::test]
    async fn error_clears_on_next_attempt() {
        let dash = Mutex::new(Dashboard::new(3));
        run_generation(&dash, &Garbage, "x").await.unwrap_err();
        assert!(dash.lock().await.error().is_some());

        run_generation(&dash, &Fixed(five()), "x").await.unwrap();
        assert!(dash.lock().await.error().is_none());
    }

    #[test]
    fn blank_niche_is_rejected_with_message() {
        let mut d = Dashboard::new(3);
        assert!(matches!(d.begin_generation("   "), Err(GenerateError::EmptyNiche)));
        assert_eq!(d.error(), Some(GENERATION_FAILED));
        assert!(!d.is_generating());
    }

    #[test]
    fn second_submit_while_in_flight_is_refused() {
        let mut d = Dashboard::new(3);
        let ticket = d.begin_generation(" Saúde ").unwrap();
        assert_eq!(ticket.niche(), "Saúde");
        assert!(matches!(d.begin_generation("Saúde"), Err(GenerateError::Busy)));

        d.finish_generation(ticket, Ok(vec![])).unwrap();
        assert!(!d.is_generating());
        assert!(d.begin_generation("Saúde").is_ok());
    }

    #[test]
    fn filter_change_resets_page() {
        let mut d = Dashboard::new(1);
        let ticket = d.begin_generation("x").unwrap();
        d.finish_generation(ticket, Ok(five())).unwrap();
        d.next_page();
        d.next_page();
        assert_eq!(d.page(), 3);

        d.select_filter(StatusFilter::Prospected);
        assert_eq!(d.page(), 1);
        assert_eq!(d.total_pages(), 2);
    }

    #[test]
    fn paging_an_empty_dashboard_stays_on_page_one() {
        let mut d = Dashboard::new(3);
        d.next_page();
        assert_eq!(d.page(), 1);
        assert_eq!(d.view().total_pages, 0);
        assert!(!d.view().has_next);
    }

    #[test]
    fn toggling_moves_lead_between_filters() {
        let mut d = Dashboard::new(3);
        let ticket = d.begin_generation("x").unwrap();
        d.finish_generation(ticket, Ok(five())).unwrap();
        let id = d.store().leads()[0].id;

        d.select_filter(StatusFilter::New);
        assert_eq!(d.view().total, 3);
        assert_eq!(d.toggle_status(id), Some(LeadStatus::Prospected));
        assert_eq!(d.view().total, 2);
    }

    struct Stalled;

    #[async_trait]
    impl LeadSource for Stalled {
        async fn generate(&self, _niche: &str) -> Result<Vec<LeadDraft>> {
            std::future::pending::<Result<Vec<LeadDraft>>>().await
        }
    }

    #[tokio::test]
    async fn cancelled_generation_frees_the_slot() {
        let dash = Mutex::new(Dashboard::new(3));
        let timed_out = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            run_generation(&dash, &Stalled, "Tecnologia"),
        )
        .await;
        assert!(timed_out.is_err());
        assert!(!dash.lock().await.is_generating());

        let added = run_generation(&dash, &Fixed(five()), "Tecnologia").await.unwrap();
        assert_eq!(added, 5);
    }

    #[test]
    fn dropped_ticket_adds_nothing() {
        let mut d = Dashboard::new(3);
        let ticket = d.begin_generation("x").unwrap();
        assert!(d.view().generating);

        drop(ticket);
        assert!(!d.is_generating());
        assert!(d.store().is_empty());
        assert!(d.error().is_none());
    }
}
