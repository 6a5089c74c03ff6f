use tracing::debug;

use crate::{
    dto::catalog::CatalogGameResponse,
    error::ServiceError,
    services::match_resolver::{CatalogMatch, resolve_matches},
    state::SharedState,
};

/// One-shot search: fetch candidates for `query` and rank them.
pub async fn search_catalog(
    state: &SharedState,
    query: &str,
) -> Result<Vec<CatalogMatch>, ServiceError> {
    let query = query.trim();
    if query.is_empty() {
        return Ok(Vec::new());
    }

    let candidates = state.catalog().search(query).await?;
    let matches = resolve_matches(query, &candidates);
    debug!(
        %query,
        candidates = candidates.len(),
        matches = matches.len(),
        "catalog search resolved"
    );
    Ok(matches)
}

pub async fn game_details(
    state: &SharedState,
    id: &str,
) -> Result<CatalogGameResponse, ServiceError> {
    state
        .catalog()
        .details(id)
        .await?
        .map(CatalogGameResponse::from)
        .ok_or_else(|| ServiceError::NotFound(format!("catalog game `{id}` not found")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dao::catalog::{CatalogCandidateRecord, CatalogDetails},
        state::test_support::{FakeCatalog, state_with},
    };

    #[tokio::test]
    async fn blank_queries_skip_the_catalog() {
        let catalog = FakeCatalog::default();
        let state = state_with(catalog.clone()).await;
        assert!(search_catalog(&state, "   ").await.unwrap().is_empty());
        assert_eq!(catalog.call_count(), 0);
    }

    #[tokio::test]
    async fn results_are_resolved() {
        let catalog = FakeCatalog::default();
        *catalog.candidates.lock().unwrap() = vec![
            CatalogCandidateRecord {
                id: "1".into(),
                name: "Catan".into(),
                publication_year: Some(1995),
            },
            CatalogCandidateRecord {
                id: "2".into(),
                name: "Catan Promo".into(),
                publication_year: Some(2001),
            },
        ];
        let state = state_with(catalog).await;

        let matches = search_catalog(&state, "catan").await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, "1");
    }

    #[tokio::test]
    async fn busy_catalog_surfaces_an_error() {
        let catalog = FakeCatalog::default();
        catalog.set_busy(true);
        let state = state_with(catalog).await;
        assert!(matches!(
            search_catalog(&state, "catan").await,
            Err(ServiceError::Catalog(_))
        ));
    }

    #[tokio::test]
    async fn unknown_game_is_not_found() {
        let state = state_with(FakeCatalog::with_details(vec![CatalogDetails {
            id: "13".into(),
            title: "Catan".into(),
            ..CatalogDetails::default()
        }]))
        .await;

        assert_eq!(game_details(&state, "13").await.unwrap().title, "Catan");
        assert!(matches!(
            game_details(&state, "14").await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
