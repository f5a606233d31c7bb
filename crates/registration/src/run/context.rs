use std::collections::{HashMap, HashSet};
use std::time::Instant;

use beehub_core::{BatchResult, CourseRequest};
use tracing::{info, warn};

use crate::classifier::Classification;
use crate::run::result::PickStats;

/// Work queue and retry bookkeeping for one registration run.
#[derive(Debug)]
pub struct PickContext {
    queue: Vec<CourseRequest>,
    processed: HashSet<String>,
    any_success: bool,
    retry_count: u32,
    max_retries: u32,
    pub stats: PickStats,
    started_at: Instant,
}

impl PickContext {
    pub fn new(forest: Vec<CourseRequest>, max_retries: u32) -> Self {
        Self {
            queue: forest,
            processed: HashSet::new(),
            any_success: false,
            retry_count: 0,
            max_retries,
            stats: PickStats::default(),
            started_at: Instant::now(),
        }
    }

    /// Drain the queue into the next batch, skipping CRNs already tried.
    /// A CRN appears at most once per batch.
    pub fn next_batch(&mut self) -> Vec<CourseRequest> {
        let queued = std::mem::take(&mut self.queue);
        let batch: Vec<CourseRequest> = queued
            .into_iter()
            .filter(|course| self.processed.insert(course.crn.clone()))
            .collect();

        if !batch.is_empty() {
            self.stats.batches += 1;
            self.stats.submitted += batch.len();
        }
        batch
    }

    /// Transient failures are only retried until the first success of the run.
    pub fn can_retry(&self) -> bool {
        !self.any_success && self.retry_count < self.max_retries
    }

    pub fn any_success(&self) -> bool {
        self.any_success
    }

    pub fn is_drained(&self) -> bool {
        self.queue.is_empty()
    }

    /// Decide the next queue from a batch's results. Returns true when at least
    /// one CRN was re-queued for a transient retry.
    pub fn advance(&mut self, batch: Vec<CourseRequest>, results: &[BatchResult]) -> bool {
        let succeeded = results.iter().filter(|r| r.is_success()).count();
        self.stats.succeeded += succeeded;
        if succeeded > 0 {
            self.any_success = true;
        }

        let mut pending: HashMap<String, CourseRequest> = batch
            .into_iter()
            .map(|course| (course.crn.clone(), course))
            .collect();
        let mut next = Vec::new();
        let mut retried = false;

        for result in results {
            let Some(course) = pending.remove(&result.crn) else {
                continue;
            };

            match Classification::of(result) {
                Classification::Success => {}
                Classification::Transient if self.can_retry() => {
                    info!(crn = %course.crn, attempt = self.retry_count + 1, "registration window closed, retrying");
                    self.processed.remove(&course.crn);
                    next.push(course);
                    retried = true;
                }
                _ => {
                    if !course.reserves.is_empty() {
                        info!(crn = %course.crn, reserves = course.reserves.len(), "falling back to reserves");
                    }
                    next.extend(course.reserves);
                }
            }
        }

        if !pending.is_empty() {
            let missing: Vec<&String> = pending.keys().collect();
            warn!(crns = ?missing, "registration response omitted submitted CRNs");
        }

        self.queue = next;
        retried
    }

    /// Charge one retry against the budget. Returns true once the budget is spent.
    pub fn increment_retry(&mut self) -> bool {
        self.retry_count += 1;
        self.stats.transient_retries = self.retry_count;
        self.retry_count >= self.max_retries
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn duration(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{classify, TRANSIENT_RESULT_CODE};

    fn crns(batch: &[CourseRequest]) -> Vec<&str> {
        batch.iter().map(|c| c.crn.as_str()).collect()
    }

    #[test]
    fn test_next_batch_dedups() {
        let mut ctx = PickContext::new(
            vec![CourseRequest::new("1"), CourseRequest::new("2"), CourseRequest::new("1")],
            3,
        );

        let batch = ctx.next_batch();
        assert_eq!(crns(&batch), vec!["1", "2"]);
        assert!(ctx.is_drained());
        assert!(ctx.next_batch().is_empty());
    }

    #[test]
    fn test_permanent_failure_queues_reserves() {
        let forest = vec![CourseRequest::with_reserves(
            "A",
            vec![CourseRequest::new("B"), CourseRequest::new("C")],
        )];
        let mut ctx = PickContext::new(forest, 3);

        let batch = ctx.next_batch();
        let retried = ctx.advance(batch, &[classify("A", 1, "VAL06")]);

        assert!(!retried);
        assert_eq!(crns(&ctx.next_batch()), vec!["B", "C"]);
    }

    #[test]
    fn test_transient_requeues_same_crn() {
        let forest = vec![CourseRequest::with_reserves("A", vec![CourseRequest::new("B")])];
        let mut ctx = PickContext::new(forest, 3);

        let batch = ctx.next_batch();
        assert!(ctx.advance(batch, &[classify("A", 1, TRANSIENT_RESULT_CODE)]));
        assert!(!ctx.increment_retry());
        assert_eq!(crns(&ctx.next_batch()), vec!["A"]);
    }

    #[test]
    fn test_transient_after_success_falls_through() {
        let forest = vec![
            CourseRequest::new("A"),
            CourseRequest::with_reserves("B", vec![CourseRequest::new("C")]),
        ];
        let mut ctx = PickContext::new(forest, 3);

        let batch = ctx.next_batch();
        // B is reported before A; A's success still blocks B's retry.
        let retried = ctx.advance(
            batch,
            &[classify("B", 1, TRANSIENT_RESULT_CODE), classify("A", 0, "successResult")],
        );

        assert!(!retried);
        assert!(ctx.any_success());
        assert_eq!(crns(&ctx.next_batch()), vec!["C"]);
    }

    #[test]
    fn test_budget_exhaustion() {
        let mut ctx = PickContext::new(vec![CourseRequest::new("A")], 3);
        assert!(!ctx.increment_retry());
        assert!(!ctx.increment_retry());
        assert!(ctx.increment_retry());
        assert!(!ctx.can_retry());
        assert_eq!(ctx.retry_count(), 3);
    }

    #[test]
    fn test_omitted_and_unknown_crns_are_dropped() {
        let forest = vec![CourseRequest::new("A"), CourseRequest::new("B")];
        let mut ctx = PickContext::new(forest, 3);

        let batch = ctx.next_batch();
        ctx.advance(batch, &[classify("A", 1, "VAL09"), classify("Z", 1, "VAL09")]);

        assert!(ctx.is_drained());
        assert_eq!(ctx.stats.submitted, 2);
    }
}
