//! Retrieval strategy selection.
//!
//! Which searches run is a pure function of the intent, the detected
//! regulations, and whether this is a retry. [`plan_searches`] encodes the
//! strategy table; [`RetrievalSelector`] executes a plan and applies the
//! widening rule.

use crate::capability::with_timeout;
use crate::intent::Intent;
use crate::state::RetrievalOutcome;
use futures::future::try_join_all;
use reglens_core::AppResult;
use reglens_knowledge::{Passage, SearchFilter, SimilaritySearch};
use std::sync::Arc;
use std::time::Duration;

/// Results for a single-regulation lookup.
pub const LOOKUP_K: usize = 5;

/// Floor for each per-regulation search of a comparison.
pub const COMPARE_MIN_K: usize = 5;

/// Budget spread across the regulations of a comparison.
pub const COMPARE_BUDGET: usize = 10;

/// Results for a comparison with fewer than two regulations.
pub const BROAD_COMPARE_K: usize = 10;

/// Results for every other case.
pub const GENERAL_K: usize = 7;

/// Results of the widened search on a retry.
pub const WIDEN_K: usize = 10;

/// A retry with fewer passages than this widens the search.
pub const WIDEN_BELOW: usize = 3;

/// One similarity search to issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedSearch {
    pub k: usize,
    pub filter: Option<SearchFilter>,
}

impl PlannedSearch {
    pub fn filtered(k: usize, regulation: &str) -> Self {
        Self {
            k,
            filter: Some(SearchFilter::regulation(regulation)),
        }
    }

    pub fn unfiltered(k: usize) -> Self {
        Self { k, filter: None }
    }
}

/// Per-regulation result count for a comparison of `count` regulations.
pub fn compare_k(count: usize) -> usize {
    COMPARE_MIN_K.max(COMPARE_BUDGET / count.max(1))
}

/// Searches for the primary strategy, in execution order.
pub fn plan_searches(intent: Intent, regulations: &[String]) -> Vec<PlannedSearch> {
    match (intent, regulations.len()) {
        (Intent::Lookup, 1) => vec![PlannedSearch::filtered(LOOKUP_K, &regulations[0])],
        (Intent::Compare, n) if n >= 2 => {
            let k = compare_k(n);
            regulations
                .iter()
                .map(|regulation| PlannedSearch::filtered(k, regulation))
                .collect()
        }
        (Intent::Compare, _) => vec![PlannedSearch::unfiltered(BROAD_COMPARE_K)],
        _ => vec![PlannedSearch::unfiltered(GENERAL_K)],
    }
}

/// Whether the primary results must be replaced by a widened search.
pub fn should_widen(retry_count: u32, passage_count: usize) -> bool {
    retry_count > 0 && passage_count < WIDEN_BELOW
}

/// Runs retrieval plans against a similarity search client.
pub struct RetrievalSelector {
    search: Arc<dyn SimilaritySearch>,
    timeout: Duration,
}

impl RetrievalSelector {
    pub fn new(search: Arc<dyn SimilaritySearch>, timeout: Duration) -> Self {
        Self { search, timeout }
    }

    /// Retrieve passages for one pass and advance the retry counter.
    ///
    /// `retry_count` is the counter on entry; the outcome carries it
    /// incremented by one.
    pub async fn select_and_retrieve(
        &self,
        query: &str,
        intent: Intent,
        regulations: &[String],
        retry_count: u32,
    ) -> AppResult<RetrievalOutcome> {
        let plan = plan_searches(intent, regulations);

        tracing::info!(
            "Retrieving passages for {} query: {} searches over {} regulations (retry count {})",
            intent,
            plan.len(),
            regulations.len(),
            retry_count
        );

        let mut passages = self.execute(query, &plan).await?;
        let mut widened = false;

        if should_widen(retry_count, passages.len()) {
            tracing::info!(
                "Only {} passages on retry, widening to an unfiltered search of {}",
                passages.len(),
                WIDEN_K
            );
            passages = self.run(query, &PlannedSearch::unfiltered(WIDEN_K)).await?;
            widened = true;
        }

        tracing::info!("Retrieved {} passages (widened: {})", passages.len(), widened);

        Ok(RetrievalOutcome {
            passages,
            retry_count: retry_count + 1,
            widened,
        })
    }

    /// Run every planned search; results are concatenated in plan order.
    async fn execute(&self, query: &str, plan: &[PlannedSearch]) -> AppResult<Vec<Passage>> {
        // Sub-searches are independent reads, so a fan-out runs concurrently
        let results = try_join_all(plan.iter().map(|search| self.run(query, search))).await?;
        Ok(results.into_iter().flatten().collect())
    }

    async fn run(&self, query: &str, search: &PlannedSearch) -> AppResult<Vec<Passage>> {
        with_timeout(
            "Similarity search",
            self.timeout,
            self.search.search(query, search.k, search.filter.as_ref()),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reglens_knowledge::StaticSearch;

    fn regs(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_plan_lookup_single_regulation() {
        assert_eq!(
            plan_searches(Intent::Lookup, &regs(&["SR 11-7"])),
            vec![PlannedSearch::filtered(5, "SR 11-7")]
        );
    }

    #[test]
    fn test_plan_lookup_without_exactly_one_regulation() {
        assert_eq!(
            plan_searches(Intent::Lookup, &[]),
            vec![PlannedSearch::unfiltered(7)]
        );
        assert_eq!(
            plan_searches(Intent::Lookup, &regs(&["SR 11-7", "ISO 42001"])),
            vec![PlannedSearch::unfiltered(7)]
        );
    }

    #[test]
    fn test_plan_compare_fans_out_in_detection_order() {
        assert_eq!(
            plan_searches(Intent::Compare, &regs(&["SR 11-7", "NIST AI RMF"])),
            vec![
                PlannedSearch::filtered(5, "SR 11-7"),
                PlannedSearch::filtered(5, "NIST AI RMF"),
            ]
        );
    }

    #[test]
    fn test_plan_compare_with_fewer_than_two() {
        assert_eq!(
            plan_searches(Intent::Compare, &regs(&["SR 11-7"])),
            vec![PlannedSearch::unfiltered(10)]
        );
        assert_eq!(
            plan_searches(Intent::Compare, &[]),
            vec![PlannedSearch::unfiltered(10)]
        );
    }

    #[test]
    fn test_plan_checklist_and_explain_are_general() {
        for intent in [Intent::Checklist, Intent::Explain] {
            assert_eq!(
                plan_searches(intent, &regs(&["SR 11-7"])),
                vec![PlannedSearch::unfiltered(7)]
            );
        }
    }

    #[test]
    fn test_compare_k() {
        assert_eq!(compare_k(2), 5);
        assert_eq!(compare_k(3), 5);
        assert_eq!(compare_k(5), 5);
        assert_eq!(compare_k(1), 10);
    }

    #[test]
    fn test_should_widen() {
        assert!(!should_widen(0, 0));
        assert!(should_widen(1, 0));
        assert!(should_widen(2, 2));
        assert!(!should_widen(1, 3));
    }

    fn corpus() -> Vec<Passage> {
        vec![
            Passage::new("sr a", "SR 11-7", "sr1107.txt", 1),
            Passage::new("nist a", "NIST AI RMF", "nist.txt", 2),
            Passage::new("sr b", "SR 11-7", "sr1107.txt", 3),
            Passage::new("nist b", "NIST AI RMF", "nist.txt", 4),
        ]
    }

    #[tokio::test]
    async fn test_compare_results_concatenate_in_order() {
        let search = Arc::new(StaticSearch::new(corpus()));
        let selector = RetrievalSelector::new(search.clone(), Duration::from_secs(5));

        let outcome = selector
            .select_and_retrieve("q", Intent::Compare, &regs(&["NIST AI RMF", "SR 11-7"]), 0)
            .await
            .unwrap();

        let contents: Vec<&str> = outcome.passages.iter().map(|p| p.content.as_str()).collect();
        assert_eq!(contents, vec!["nist a", "nist b", "sr a", "sr b"]);
        assert_eq!(outcome.retry_count, 1);
        assert!(!outcome.widened);
        assert_eq!(search.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_first_pass_never_widens() {
        let search = Arc::new(StaticSearch::new(corpus()));
        let selector = RetrievalSelector::new(search.clone(), Duration::from_secs(5));

        let outcome = selector
            .select_and_retrieve("q", Intent::Lookup, &regs(&["ISO 42001"]), 0)
            .await
            .unwrap();

        assert!(outcome.passages.is_empty());
        assert_eq!(search.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_retry_widens_once() {
        let search = Arc::new(StaticSearch::new(corpus()));
        let selector = RetrievalSelector::new(search.clone(), Duration::from_secs(5));

        let outcome = selector
            .select_and_retrieve("q", Intent::Lookup, &regs(&["ISO 42001"]), 1)
            .await
            .unwrap();

        assert!(outcome.widened);
        assert_eq!(outcome.passages.len(), 4);
        assert_eq!(outcome.retry_count, 2);

        let calls = search.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].k, 10);
        assert_eq!(calls[1].filter, None);
    }

    #[tokio::test]
    async fn test_search_failure_propagates() {
        let selector = RetrievalSelector::new(
            Arc::new(StaticSearch::failing("index offline")),
            Duration::from_secs(5),
        );
        let err = selector
            .select_and_retrieve("q", Intent::Explain, &[], 0)
            .await
            .unwrap_err();
        assert!(err.is_capability_failure());
    }
}
