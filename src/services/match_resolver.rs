//! Ranking of raw catalog search hits against the free-text query that produced them.
//!
//! Candidates whose lowercased name does not contain the lowercased query are dropped, as
//! are promotional variants. Survivors are ordered by where the query occurs in the name
//! (earlier is better), then by publication year (newest first, unknown counted as year 0),
//! then by name length (shorter first). The sort is stable so full ties keep catalog order.

use std::cmp::Reverse;

use serde::Serialize;
use utoipa::ToSchema;

use crate::dao::catalog::CatalogCandidateRecord;

/// Marker identifying promotional variants in a lowercased catalog name.
const PROMO_MARKER: &str = "promo";

/// A catalog entry retained by [`resolve_matches`], in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CatalogMatch {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publication_year: Option<i32>,
}

struct RankedCandidate<'a> {
    record: &'a CatalogCandidateRecord,
    match_index: usize,
    name_length: usize,
}

impl RankedCandidate<'_> {
    fn sort_key(&self) -> (usize, Reverse<i32>, usize) {
        (
            self.match_index,
            Reverse(self.record.publication_year.unwrap_or(0)),
            self.name_length,
        )
    }
}

/// Filter and order `candidates` for `query`. Pure and deterministic.
pub fn resolve_matches(query: &str, candidates: &[CatalogCandidateRecord]) -> Vec<CatalogMatch> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    let mut ranked: Vec<RankedCandidate<'_>> = candidates
        .iter()
        .filter_map(|record| {
            let name = record.name.to_lowercase();
            if name.contains(PROMO_MARKER) {
                return None;
            }
            let byte_index = name.find(&needle)?;
            Some(RankedCandidate {
                record,
                match_index: name[..byte_index].chars().count(),
                name_length: record.name.chars().count(),
            })
        })
        .collect();

    ranked.sort_by_key(RankedCandidate::sort_key);

    ranked
        .into_iter()
        .map(|candidate| CatalogMatch {
            id: candidate.record.id.clone(),
            name: candidate.record.name.clone(),
            publication_year: candidate.record.publication_year,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, name: &str, year: Option<i32>) -> CatalogCandidateRecord {
        CatalogCandidateRecord {
            id: id.into(),
            name: name.into(),
            publication_year: year,
        }
    }

    fn ids(matches: &[CatalogMatch]) -> Vec<&str> {
        matches.iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn ranks_catan_family() {
        let candidates = vec![
            candidate("1", "Catan", Some(1995)),
            candidate("2", "Catan: Seafarers", Some(1997)),
            candidate("3", "Catan Promo Pack", Some(2000)),
            candidate("4", "Star Trek: Catan", Some(2012)),
        ];

        let matches = resolve_matches("catan", &candidates);

        assert_eq!(ids(&matches), vec!["2", "1", "4"]);
        assert_eq!(
            matches[0],
            CatalogMatch {
                id: "2".into(),
                name: "Catan: Seafarers".into(),
                publication_year: Some(1997),
            }
        );
    }

    #[test]
    fn newer_edition_wins_a_match_index_tie() {
        let candidates = vec![
            candidate("1", "Catan", Some(1995)),
            candidate("2", "Catan: Seafarers", Some(1997)),
            candidate("3", "Catan Promo Card", Some(2010)),
        ];

        // Both titles start with the query, so year decides; name length only breaks
        // year ties. Promo entries are dropped whatever their rank.
        assert_eq!(ids(&resolve_matches("catan", &candidates)), vec!["2", "1"]);
    }

    #[test]
    fn resolving_twice_gives_the_same_ranking() {
        let candidates = vec![
            candidate("7", "Star Trek: Catan", Some(2012)),
            candidate("1", "Catan", Some(1995)),
            candidate("5", "Catan Junior", None),
            candidate("2", "Catan: Seafarers", Some(1997)),
            candidate("3", "Catan Promo Pack", Some(2000)),
        ];

        let first = resolve_matches("catan", &candidates);
        let second = resolve_matches("catan", &candidates);

        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn blank_query_yields_nothing() {
        let candidates = vec![candidate("1", "Catan", Some(1995))];
        assert!(resolve_matches("", &candidates).is_empty());
        assert!(resolve_matches("   ", &candidates).is_empty());
    }

    #[test]
    fn empty_candidates_yield_nothing() {
        assert!(resolve_matches("catan", &[]).is_empty());
    }

    #[test]
    fn no_substring_match_yields_nothing() {
        let candidates = vec![candidate("1", "Carcassonne", Some(2000))];
        assert!(resolve_matches("catan", &candidates).is_empty());
    }

    #[test]
    fn single_exact_match_is_returned() {
        let candidates = vec![candidate("13", "Catan", Some(1995))];
        let matches = resolve_matches("Catan", &candidates);
        assert_eq!(ids(&matches), vec!["13"]);
    }

    #[test]
    fn matching_ignores_case_and_surrounding_whitespace() {
        let candidates = vec![candidate("1", "CATAN", None)];
        assert_eq!(ids(&resolve_matches("  cAtAn ", &candidates)), vec!["1"]);
    }

    #[test]
    fn promotional_variants_are_dropped_even_when_matching() {
        let candidates = vec![
            candidate("1", "Azul: Promo Tiles", Some(2019)),
            candidate("2", "Azul", Some(2017)),
            candidate("3", "PROMOTIONAL Azul", Some(2020)),
        ];
        assert_eq!(ids(&resolve_matches("azul", &candidates)), vec!["2"]);
    }

    #[test]
    fn earlier_match_position_wins_over_newer_year() {
        let candidates = vec![
            candidate("late", "The Azul", Some(2024)),
            candidate("early", "Azul", Some(2017)),
        ];
        assert_eq!(
            ids(&resolve_matches("azul", &candidates)),
            vec!["early", "late"]
        );
    }

    #[test]
    fn missing_year_sorts_as_oldest() {
        let candidates = vec![
            candidate("unknown", "Chess", None),
            candidate("ancient", "Chess Set", Some(1)),
        ];
        assert_eq!(
            ids(&resolve_matches("chess", &candidates)),
            vec!["ancient", "unknown"]
        );
    }

    #[test]
    fn shorter_name_breaks_year_ties() {
        let candidates = vec![
            candidate("long", "Go Deluxe", Some(2000)),
            candidate("short", "Go", Some(2000)),
        ];
        assert_eq!(
            ids(&resolve_matches("go", &candidates)),
            vec!["short", "long"]
        );
    }

    #[test]
    fn full_ties_keep_input_order() {
        let candidates = vec![
            candidate("a", "Hive", Some(2001)),
            candidate("b", "Hive", Some(2001)),
            candidate("c", "Hive", Some(2001)),
        ];
        assert_eq!(ids(&resolve_matches("hive", &candidates)), vec!["a", "b", "c"]);
    }

    #[test]
    fn match_index_counts_characters_not_bytes() {
        let candidates = vec![
            candidate("accented", "Éé Go", Some(2000)),
            candidate("plain", "abc Go", Some(2000)),
        ];
        // Both names put "go" after three characters; the shorter name comes first.
        assert_eq!(
            ids(&resolve_matches("go", &candidates)),
            vec!["accented", "plain"]
        );
    }

    #[test]
    fn output_is_a_subset_without_promos_and_ordered() {
        let candidates = vec![
            candidate("1", "Ticket to Ride", Some(2004)),
            candidate("2", "Ticket to Ride: Europe", Some(2005)),
            candidate("3", "Ticket to Ride Promo Cards", Some(2010)),
            candidate("4", "Lost Ticket", None),
            candidate("5", "Ticket to Ride: Märklin", Some(2006)),
            candidate("6", "Pandemic", Some(2008)),
        ];
        let query = "ticket";
        let matches = resolve_matches(query, &candidates);

        for m in &matches {
            let name = m.name.to_lowercase();
            assert!(name.contains(query));
            assert!(!name.contains("promo"));
            assert!(candidates.iter().any(|c| c.id == m.id));
        }

        let keys: Vec<_> = matches
            .iter()
            .map(|m| {
                let name = m.name.to_lowercase();
                let index = name[..name.find(query).unwrap()].chars().count();
                (
                    index,
                    Reverse(m.publication_year.unwrap_or(0)),
                    m.name.chars().count(),
                )
            })
            .collect();
        assert!(keys.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(ids(&matches), vec!["5", "2", "1", "4"]);
    }
}
