use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    services::match_resolver::CatalogMatch,
    state::search::{DisplayedResults, SearchSnapshot},
};

use super::format_system_time;

/// Query typed into a search widget.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SearchQueryRequest {
    pub query: String,
}

/// Results a widget currently shows.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DisplayedResultsResponse {
    pub sequence: u64,
    pub query: String,
    pub results: Vec<CatalogMatch>,
    pub completed_at: String,
}

impl From<DisplayedResults> for DisplayedResultsResponse {
    fn from(displayed: DisplayedResults) -> Self {
        Self {
            sequence: displayed.sequence,
            query: displayed.query,
            results: displayed.results,
            completed_at: format_system_time(displayed.completed_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SearchSnapshotResponse {
    pub id: Uuid,
    /// Sequence number of the most recently dispatched query.
    pub latest_sequence: u64,
    pub displayed: Option<DisplayedResultsResponse>,
}

impl From<SearchSnapshot> for SearchSnapshotResponse {
    fn from(snapshot: SearchSnapshot) -> Self {
        Self {
            id: snapshot.id,
            latest_sequence: snapshot.latest_sequence,
            displayed: snapshot.displayed.map(Into::into),
        }
    }
}

/// Outcome of submitting a query: `applied` is false when a newer query superseded it.
#[derive(Debug, Serialize, ToSchema)]
pub struct SearchOutcomeResponse {
    pub applied: bool,
    pub snapshot: SearchSnapshotResponse,
}
