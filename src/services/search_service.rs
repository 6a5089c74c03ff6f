//! Sequenced search widgets: each submitted query is fetched, resolved and applied only if
//! it is still the widget's most recent one when its response arrives.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::{
    dao::catalog::CatalogClient,
    dto::search::{SearchOutcomeResponse, SearchQueryRequest, SearchSnapshotResponse},
    error::ServiceError,
    services::{match_resolver::resolve_matches, sse_events},
    state::{
        SearchController, SharedState,
        search::SearchSnapshot,
    },
};

/// What happened to a submitted query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Results are now displayed.
    Applied(SearchSnapshot),
    /// A newer query was dispatched before this one completed; nothing changed.
    Superseded(SearchSnapshot),
}

/// Dispatch `query` on `controller`, fetch and resolve its candidates, then complete it.
///
/// A blank query displays an empty result without reaching the catalog. A failed fetch is
/// reported only when it belongs to the latest query; the displayed state is left as is.
pub async fn run_search(
    controller: &SearchController,
    catalog: &dyn CatalogClient,
    query: &str,
) -> Result<SearchOutcome, ServiceError> {
    let ticket = controller.begin(query.trim());

    let results = if ticket.query.is_empty() {
        Vec::new()
    } else {
        match catalog.search(&ticket.query).await {
            Ok(candidates) => resolve_matches(&ticket.query, &candidates),
            Err(err) if controller.is_current(&ticket) => return Err(err.into()),
            Err(err) => {
                debug!(
                    widget = %controller.id(),
                    sequence = ticket.sequence,
                    error = %err,
                    "discarding failure of superseded search"
                );
                return Ok(SearchOutcome::Superseded(controller.snapshot().await));
            }
        }
    };

    let applied = controller.complete(&ticket, results).await;
    let snapshot = controller.snapshot().await;
    if applied {
        Ok(SearchOutcome::Applied(snapshot))
    } else {
        debug!(
            widget = %controller.id(),
            sequence = ticket.sequence,
            latest = snapshot.latest_sequence,
            "discarding superseded search results"
        );
        Ok(SearchOutcome::Superseded(snapshot))
    }
}

fn owned_widget(
    state: &SharedState,
    owner: Uuid,
    id: Uuid,
) -> Result<Arc<SearchController>, ServiceError> {
    state
        .searches()
        .get(id)
        .filter(|controller| controller.owner() == owner)
        .ok_or_else(|| ServiceError::NotFound(format!("search `{id}` not found")))
}

pub async fn open_search(state: &SharedState, owner: Uuid) -> SearchSnapshotResponse {
    let controller = state.searches().open(owner);
    debug!(widget = %controller.id(), %owner, "search widget opened");
    controller.snapshot().await.into()
}

pub async fn get_search(
    state: &SharedState,
    owner: Uuid,
    id: Uuid,
) -> Result<SearchSnapshotResponse, ServiceError> {
    Ok(owned_widget(state, owner, id)?.snapshot().await.into())
}

pub fn close_search(state: &SharedState, owner: Uuid, id: Uuid) -> Result<(), ServiceError> {
    owned_widget(state, owner, id)?;
    state.searches().close(id);
    Ok(())
}

/// Submit a query to a widget; applied results are also pushed on the owner's live feed.
pub async fn submit_query(
    state: &SharedState,
    owner: Uuid,
    id: Uuid,
    payload: SearchQueryRequest,
) -> Result<SearchOutcomeResponse, ServiceError> {
    let controller = owned_widget(state, owner, id)?;
    let catalog = state.catalog();

    match run_search(&controller, catalog.as_ref(), &payload.query).await? {
        SearchOutcome::Applied(snapshot) => {
            let snapshot = SearchSnapshotResponse::from(snapshot);
            sse_events::broadcast_search_results(state, owner, snapshot.clone());
            Ok(SearchOutcomeResponse {
                applied: true,
                snapshot,
            })
        }
        SearchOutcome::Superseded(snapshot) => Ok(SearchOutcomeResponse {
            applied: false,
            snapshot: snapshot.into(),
        }),
    }
}
