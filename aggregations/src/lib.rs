//! Partitioned scan/merge engine over payment snapshots.
//!
//! Every entry point takes a read-consistent snapshot of the payment
//! collection, splits it into contiguous non-overlapping ranges, scans each
//! range on its own worker thread, and merges partials behind a single
//! mutex. Workers are spawned fresh per call and joined before the call
//! returns; there is no persistent pool, no cancellation, and no timeout.

use std::ops::Range;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use core_types::types::{Money, Payment};
use parking_lot::Mutex;

/// Split `len` items into `workers` contiguous near-equal ranges covering
/// the collection exactly once. Extra items land on the earlier workers;
/// when `workers > len` the trailing ranges are empty. Worker counts of
/// zero are treated as one.
///
/// The exact index math is load-bearing: callers depend on ranges being
/// reproducible for a given `(len, workers)` pair.
pub fn partition(len: usize, workers: usize) -> Vec<Range<usize>> {
    let workers = workers.max(1);
    let remainder = usize::from(len % workers != 0);
    (0..workers)
        .map(|i| {
            let start = if i == 0 {
                0
            } else {
                (i * len / workers + remainder).min(len)
            };
            let end = ((i + 1) * len / workers + remainder).min(len);
            start..end
        })
        .collect()
}

/// Sum payment amounts across `workers` parallel range scans. The merge
/// lock is held only for the O(1) accumulate, never for the scan itself.
pub fn sum_amounts(payments: &[Payment], workers: usize) -> Money {
    let total = Mutex::new(0);
    thread::scope(|scope| {
        for range in partition(payments.len(), workers) {
            let chunk = &payments[range];
            let total = &total;
            scope.spawn(move || {
                let partial: Money = chunk.iter().map(|payment| payment.amount).sum();
                *total.lock() += partial;
            });
        }
    });
    total.into_inner()
}

/// Collect every payment matching `predicate`, scanning ranges in parallel.
/// Cross-worker merge order is unspecified; treat the result as a set.
pub fn filter<F>(payments: &[Payment], predicate: F, workers: usize) -> Vec<Payment>
where
    F: Fn(&Payment) -> bool + Sync,
{
    let merged = Mutex::new(Vec::new());
    thread::scope(|scope| {
        for range in partition(payments.len(), workers) {
            let chunk = &payments[range];
            let merged = &merged;
            let predicate = &predicate;
            scope.spawn(move || {
                let partial: Vec<Payment> = chunk
                    .iter()
                    .filter(|payment| predicate(payment))
                    .cloned()
                    .collect();
                if !partial.is_empty() {
                    merged.lock().extend(partial);
                }
            });
        }
    });
    merged.into_inner()
}

/// One worker's contribution to a streaming sum.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Progress {
    /// Zero-based index of the partition this partial covers.
    pub part: usize,
    pub result: Money,
}

/// Streaming variant of [`sum_amounts`]: the snapshot is split into parts of
/// `part_size` records and each worker reports its partial sum as it
/// completes. Partials arrive in completion order, not partition order; the
/// sequence is finite, closes once every worker has reported, and is not
/// restartable.
pub fn sum_with_progress(
    payments: Arc<Vec<Payment>>,
    part_size: usize,
) -> mpsc::IntoIter<Progress> {
    let (tx, rx) = mpsc::channel();
    let part_size = part_size.max(1);
    let parts = payments.len().div_ceil(part_size);
    for part in 0..parts {
        let payments = Arc::clone(&payments);
        let tx = tx.clone();
        thread::spawn(move || {
            let start = part * part_size;
            let end = ((part + 1) * part_size).min(payments.len());
            let result = payments[start..end]
                .iter()
                .map(|payment| payment.amount)
                .sum();
            let _ = tx.send(Progress { part, result });
        });
    }
    drop(tx);
    rx.into_iter()
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::types::PaymentStatus;
    use std::collections::HashSet;

    fn payment(id: usize, account_id: i64, amount: Money) -> Payment {
        Payment {
            id: format!("p{id}"),
            account_id,
            amount,
            category: "test".to_string(),
            status: PaymentStatus::InProgress,
        }
    }

    fn payments(amounts: &[Money]) -> Vec<Payment> {
        amounts
            .iter()
            .enumerate()
            .map(|(idx, &amount)| payment(idx, 1, amount))
            .collect()
    }

    #[test]
    fn partition_covers_collection_exactly_once() {
        for len in 0..=32 {
            for workers in 0..=8 {
                let ranges = partition(len, workers);
                assert_eq!(ranges.len(), workers.max(1));
                let mut cursor = 0;
                for range in &ranges {
                    assert_eq!(range.start, cursor);
                    assert!(range.end >= range.start);
                    cursor = range.end;
                }
                assert_eq!(cursor, len, "len={len} workers={workers}");
            }
        }
    }

    #[test]
    fn partition_puts_extra_items_on_earlier_workers() {
        assert_eq!(partition(10, 3), vec![0..4, 4..7, 7..10]);
        assert_eq!(partition(9, 3), vec![0..3, 3..6, 6..9]);
        // more workers than items leaves trailing ranges empty
        assert_eq!(partition(2, 4), vec![0..1, 1..2, 2..2, 2..2]);
    }

    #[test]
    fn partition_treats_zero_workers_as_one() {
        assert_eq!(partition(5, 0), vec![0..5]);
    }

    #[test]
    fn sum_is_worker_count_independent() {
        let snapshot = payments(&[500, 501, 502, 503, 504, 505, 506, 507, 508]);
        let want = sum_amounts(&snapshot, 1);
        assert_eq!(want, 4536);
        for workers in 0..=snapshot.len() {
            assert_eq!(sum_amounts(&snapshot, workers), want, "workers={workers}");
        }
    }

    #[test]
    fn sum_of_empty_snapshot_is_zero() {
        assert_eq!(sum_amounts(&[], 4), 0);
    }

    #[test]
    fn filter_matches_are_worker_count_independent_as_sets() {
        let mut snapshot = payments(&[10, 20, 30, 40, 50]);
        for (idx, p) in snapshot.iter_mut().enumerate() {
            p.account_id = (idx % 2) as i64;
        }
        let want: HashSet<String> = snapshot
            .iter()
            .filter(|p| p.account_id == 0)
            .map(|p| p.id.clone())
            .collect();
        for workers in 0..=6 {
            let got: HashSet<String> = filter(&snapshot, |p| p.account_id == 0, workers)
                .into_iter()
                .map(|p| p.id)
                .collect();
            assert_eq!(got, want, "workers={workers}");
        }
    }

    #[test]
    fn progress_parts_cover_the_snapshot_and_sum_to_total() {
        let snapshot = Arc::new(payments(&[1, 2, 3, 4, 5, 6, 7]));
        let reported: Vec<Progress> = sum_with_progress(Arc::clone(&snapshot), 3).collect();
        assert_eq!(reported.len(), 3);
        let parts: HashSet<usize> = reported.iter().map(|p| p.part).collect();
        assert_eq!(parts, HashSet::from([0, 1, 2]));
        let total: Money = reported.iter().map(|p| p.result).sum();
        assert_eq!(total, 28);
    }

    #[test]
    fn progress_stream_of_empty_snapshot_closes_immediately() {
        let reported: Vec<Progress> = sum_with_progress(Arc::new(Vec::new()), 3).collect();
        assert!(reported.is_empty());
    }
}
