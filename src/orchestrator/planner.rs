//! Batch planning for bulk operations
//!
//! A bulk request ("redeem these 23 items") is partitioned into consecutive
//! chunks of exactly `max_chunk_size` items, with the remainder in the final
//! chunk. Order is preserved within and across chunks; nothing is reordered or
//! deduplicated. The chunk size is a parameter, never a constant: it comes
//! from `[batch] max_chunk_size` in the configuration.

use crate::config::BatchConfig;
use crate::ledger::{LedgerClient, LedgerError};
use crate::metrics::metrics;
use crate::orchestrator::errors::OrchestrationError;
use nonempty::NonEmpty;
use std::num::NonZeroUsize;

/// Ordered partition of one bulk input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPlan<T> {
    chunks: Vec<Vec<T>>,
}

impl<T> BatchPlan<T> {
    /// Number of chunks
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// A plan with one chunk should be submitted without a batch
    pub fn is_single_chunk(&self) -> bool {
        self.chunks.len() == 1
    }

    pub fn chunk_sizes(&self) -> Vec<usize> {
        self.chunks.iter().map(Vec::len).collect()
    }

    pub fn total_items(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }

    pub fn chunks(&self) -> &[Vec<T>] {
        &self.chunks
    }

    pub fn into_chunks(self) -> Vec<Vec<T>> {
        self.chunks
    }
}

impl<T> IntoIterator for BatchPlan<T> {
    type Item = Vec<T>;
    type IntoIter = std::vec::IntoIter<Vec<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.chunks.into_iter()
    }
}

/// Partitions bulk input and materializes one intent per chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPlanner {
    max_chunk_size: NonZeroUsize,
}

impl BatchPlanner {
    /// Fails with `InvalidChunkSize` for zero
    pub fn new(max_chunk_size: usize) -> Result<Self, OrchestrationError> {
        NonZeroUsize::new(max_chunk_size)
            .map(|max_chunk_size| Self { max_chunk_size })
            .ok_or(OrchestrationError::InvalidChunkSize(max_chunk_size))
    }

    pub fn from_config(config: &BatchConfig) -> Result<Self, OrchestrationError> {
        Self::new(config.max_chunk_size)
    }

    pub fn max_chunk_size(&self) -> usize {
        self.max_chunk_size.get()
    }

    /// Partition `items` into an ordered plan
    ///
    /// Fails with `EmptyInput` for a zero-length list.
    pub fn plan<T>(&self, items: Vec<T>) -> Result<BatchPlan<T>, OrchestrationError> {
        if items.is_empty() {
            return Err(OrchestrationError::EmptyInput);
        }

        let size = self.max_chunk_size.get();
        let mut chunks = Vec::with_capacity(items.len().div_ceil(size));
        let mut remaining = items.into_iter().peekable();
        while remaining.peek().is_some() {
            chunks.push(remaining.by_ref().take(size).collect());
        }

        metrics().batches_planned.inc();
        metrics().chunks_planned.inc_by(chunks.len() as u64);
        Ok(BatchPlan { chunks })
    }

    /// Plan `items` and build one intent per chunk with `build`
    ///
    /// `build` is called once per chunk, in order. On `EmptyInput` it is never
    /// called.
    pub fn materialize<T, I, F>(
        &self,
        items: Vec<T>,
        mut build: F,
    ) -> Result<NonEmpty<I>, OrchestrationError>
    where
        F: FnMut(Vec<T>) -> Result<I, LedgerError>,
    {
        let intents = self
            .plan(items)?
            .into_iter()
            .map(|chunk| build(chunk).map_err(OrchestrationError::from))
            .collect::<Result<Vec<_>, _>>()?;
        NonEmpty::from_vec(intents).ok_or(OrchestrationError::EmptyInput)
    }

    /// Plan `items` and build one intent per chunk through the ledger client
    pub async fn materialize_via_ledger<L, T, F>(
        &self,
        ledger: &L,
        items: Vec<T>,
        mut to_operation: F,
    ) -> Result<NonEmpty<L::Intent>, OrchestrationError>
    where
        L: LedgerClient,
        T: Send,
        F: FnMut(Vec<T>) -> L::Operation + Send,
    {
        let plan = self.plan(items)?;
        tracing::debug!(
            chunk_sizes = ?plan.chunk_sizes(),
            total_items = plan.total_items(),
            "Batch planned"
        );

        let mut intents = Vec::with_capacity(plan.len());
        for chunk in plan {
            intents.push(ledger.build_intent(to_operation(chunk)).await?);
        }
        NonEmpty::from_vec(intents).ok_or(OrchestrationError::EmptyInput)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_twenty_three_items_make_three_chunks() {
        let planner = BatchPlanner::new(10).unwrap();
        let items: Vec<u32> = (0..23).collect();

        let plan = planner.plan(items.clone()).unwrap();
        assert_eq!(plan.chunk_sizes(), vec![10, 10, 3]);
        assert_eq!(plan.total_items(), 23);

        let flattened: Vec<u32> = plan.into_chunks().into_iter().flatten().collect();
        assert_eq!(flattened, items);
    }

    #[test]
    fn test_exact_multiple_has_full_final_chunk() {
        let planner = BatchPlanner::new(10).unwrap();

        let plan = planner.plan((0..10).collect::<Vec<u32>>()).unwrap();
        assert_eq!(plan.chunk_sizes(), vec![10]);
        assert!(plan.is_single_chunk());

        let plan = planner.plan((0..20).collect::<Vec<u32>>()).unwrap();
        assert_eq!(plan.chunk_sizes(), vec![10, 10]);
    }

    #[test]
    fn test_small_input_is_single_chunk() {
        let planner = BatchPlanner::new(10).unwrap();
        let plan = planner.plan(vec!["a", "b", "c"]).unwrap();
        assert_eq!(plan.chunks(), &[vec!["a", "b", "c"]]);
    }

    #[test]
    fn test_duplicates_are_kept() {
        let planner = BatchPlanner::new(2).unwrap();
        let plan = planner.plan(vec![7, 7, 7]).unwrap();
        assert_eq!(plan.into_chunks(), vec![vec![7, 7], vec![7]]);
    }

    #[test]
    fn test_empty_input_builds_nothing() {
        let planner = BatchPlanner::new(10).unwrap();
        let mut built = 0;

        let result = planner.materialize(Vec::<u32>::new(), |chunk| {
            built += 1;
            Ok(chunk)
        });

        assert_eq!(result, Err(OrchestrationError::EmptyInput));
        assert_eq!(built, 0);
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        assert_eq!(
            BatchPlanner::new(0),
            Err(OrchestrationError::InvalidChunkSize(0))
        );
    }

    #[test]
    fn test_materialize_builds_in_order() {
        let planner = BatchPlanner::new(4).unwrap();
        let intents = planner
            .materialize((1..=9).collect::<Vec<u32>>(), |chunk| {
                Ok(chunk.iter().sum::<u32>())
            })
            .unwrap();

        assert_eq!(intents.len(), 3);
        assert_eq!(intents.head, 1 + 2 + 3 + 4);
        assert_eq!(intents.tail, vec![5 + 6 + 7 + 8, 9]);
    }

    #[test]
    fn test_materialize_stops_on_build_error() {
        let planner = BatchPlanner::new(1).unwrap();
        let mut calls = 0;
        let result = planner.materialize(vec![1, 2, 3], |chunk| {
            calls += 1;
            if chunk[0] == 2 {
                Err(LedgerError::Validation("item 2 frozen".into()))
            } else {
                Ok(chunk[0])
            }
        });

        assert_eq!(
            result,
            Err(OrchestrationError::rejected("Validation failed: item 2 frozen"))
        );
        assert_eq!(calls, 2);
    }

    proptest! {
        #[test]
        fn prop_chunks_concatenate_to_input(
            items in proptest::collection::vec(any::<u16>(), 1..200),
            size in 1usize..25,
        ) {
            let planner = BatchPlanner::new(size).unwrap();
            let plan = planner.plan(items.clone()).unwrap();
            let sizes = plan.chunk_sizes();

            prop_assert_eq!(plan.len(), items.len().div_ceil(size));
            prop_assert!(sizes.iter().all(|&s| s >= 1 && s <= size));
            prop_assert!(sizes[..sizes.len() - 1].iter().all(|&s| s == size));

            let flattened: Vec<u16> = plan.into_chunks().into_iter().flatten().collect();
            prop_assert_eq!(flattened, items);
        }
    }
}
