//! Server-side state of search widgets.
//!
//! Every widget owns a [`RequestSequencer`]. A query is stamped with the next sequence
//! number when dispatched; when its catalog response arrives the results are applied only
//! if no newer query was dispatched in the meantime. Superseded responses are dropped and
//! in-flight fetches are never cancelled.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::SystemTime,
};

use dashmap::DashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::services::match_resolver::CatalogMatch;

/// Strictly increasing counter stamping dispatched queries, starting at 1.
#[derive(Debug, Default)]
pub struct RequestSequencer {
    latest: AtomicU64,
}

impl RequestSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the next sequence number.
    pub fn next(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Last dispatched sequence number, `0` before the first dispatch.
    pub fn latest(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }

    pub fn is_latest(&self, sequence: u64) -> bool {
        self.latest() == sequence
    }
}

/// Query stamped at dispatch time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTicket {
    pub sequence: u64,
    pub query: String,
}

/// Results currently shown by a widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayedResults {
    pub sequence: u64,
    pub query: String,
    pub results: Vec<CatalogMatch>,
    pub completed_at: SystemTime,
}

/// Point-in-time view of a widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSnapshot {
    pub id: Uuid,
    pub latest_sequence: u64,
    pub displayed: Option<DisplayedResults>,
}

/// State of one search widget.
#[derive(Debug)]
pub struct SearchController {
    id: Uuid,
    owner: Uuid,
    sequencer: RequestSequencer,
    displayed: Mutex<Option<DisplayedResults>>,
}

impl SearchController {
    pub fn new(owner: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner,
            sequencer: RequestSequencer::new(),
            displayed: Mutex::new(None),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn owner(&self) -> Uuid {
        self.owner
    }

    /// Stamp `query` with the next sequence number.
    pub fn begin(&self, query: &str) -> SearchTicket {
        SearchTicket {
            sequence: self.sequencer.next(),
            query: query.to_owned(),
        }
    }

    /// Whether the ticket still belongs to the most recently dispatched query.
    pub fn is_current(&self, ticket: &SearchTicket) -> bool {
        self.sequencer.is_latest(ticket.sequence)
    }

    /// Apply `results` for `ticket` unless a newer query was dispatched or displayed.
    ///
    /// Returns whether the displayed state changed.
    pub async fn complete(&self, ticket: &SearchTicket, results: Vec<CatalogMatch>) -> bool {
        let mut displayed = self.displayed.lock().await;
        if !self.sequencer.is_latest(ticket.sequence) {
            return false;
        }
        if displayed
            .as_ref()
            .is_some_and(|current| current.sequence >= ticket.sequence)
        {
            return false;
        }

        *displayed = Some(DisplayedResults {
            sequence: ticket.sequence,
            query: ticket.query.clone(),
            results,
            completed_at: SystemTime::now(),
        });
        true
    }

    pub async fn snapshot(&self) -> SearchSnapshot {
        let displayed = self.displayed.lock().await;
        SearchSnapshot {
            id: self.id,
            latest_sequence: self.sequencer.latest(),
            displayed: displayed.clone(),
        }
    }
}

/// Open search widgets keyed by identifier.
#[derive(Default)]
pub struct SearchRegistry {
    widgets: DashMap<Uuid, Arc<SearchController>>,
}

impl SearchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new widget owned by `owner`.
    pub fn open(&self, owner: Uuid) -> Arc<SearchController> {
        let controller = Arc::new(SearchController::new(owner));
        self.widgets.insert(controller.id(), controller.clone());
        controller
    }

    pub fn get(&self, id: Uuid) -> Option<Arc<SearchController>> {
        self.widgets.get(&id).map(|entry| entry.value().clone())
    }

    pub fn close(&self, id: Uuid) -> Option<Arc<SearchController>> {
        self.widgets.remove(&id).map(|(_, controller)| controller)
    }

    /// Close every widget owned by `owner`, returning how many were closed.
    pub fn close_owned_by(&self, owner: Uuid) -> usize {
        let before = self.widgets.len();
        self.widgets
            .retain(|_, controller| controller.owner() != owner);
        before.saturating_sub(self.widgets.len())
    }
}
