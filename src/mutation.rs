//! Optimistic mutations with reconciliation.
//!
//! Every screen follows the same contract: rewrite the local list first, then issue the
//! request. Success leaves the list as is. Failure raises a notice and throws the
//! speculative state away, either by refetching the authoritative list or by restoring
//! the pre-mutation snapshot.
//!
//! `mutate_each` is the fan-out form used for "turn every active light off". Each
//! request's outcome is kept, so a partial failure is reported and reconciled rather
//! than shown as success.

use log::{debug, warn};
use std::fmt::{Debug, Display};
use std::thread;

use crate::models::homiease::{AutomationRule, Device, DeviceId, RuleId};
use crate::notify::Notices;

/// Items the helpers can locate by identity inside a list.
pub trait Keyed {
    type Key: PartialEq + Clone + Debug;

    fn key(&self) -> &Self::Key;
}

impl Keyed for Device {
    type Key = DeviceId;

    fn key(&self) -> &DeviceId {
        &self.id
    }
}

impl Keyed for AutomationRule {
    type Key = RuleId;

    fn key(&self) -> &RuleId {
        &self.id
    }
}

/// How to discard a speculative change once the remote call failed.
pub enum Reconcile<'a, T, E> {
    /// Replace the list with the backend's copy. Falls back to `Restore` if that fails too.
    Refetch(&'a dyn Fn() -> Result<Vec<T>, E>),
    /// Put back the items as they were before the mutation.
    Restore,
}

/// Notices raised by a mutation.
#[derive(Debug, Clone)]
pub struct Feedback {
    success: Option<String>,
    failure: String,
}

impl Feedback {
    pub fn on_failure(message: impl Into<String>) -> Self {
        Feedback {
            success: None,
            failure: message.into(),
        }
    }

    pub fn with_success(mut self, message: impl Into<String>) -> Self {
        self.success = Some(message.into());
        self
    }
}

/// Per-target outcome of a fan-out mutation.
#[derive(Debug)]
pub struct FanOut<K, E> {
    pub succeeded: Vec<K>,
    pub failed: Vec<(K, E)>,
}

impl<K, E> FanOut<K, E> {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

/// Apply `local` immediately, then run `remote`; reconcile the list if it fails.
pub fn mutate<T, E, L, R>(
    items: &mut Vec<T>,
    local: L,
    remote: R,
    reconcile: Reconcile<'_, T, E>,
    feedback: &Feedback,
    notices: &mut Notices,
) -> Result<(), E>
where
    T: Clone,
    E: Display,
    L: FnOnce(&mut Vec<T>),
    R: FnOnce() -> Result<(), E>,
{
    let snapshot = items.clone();
    local(items);

    match remote() {
        Ok(()) => {
            if let Some(msg) = feedback.success.as_ref() {
                notices.success(msg.clone());
            }
            Ok(())
        }
        Err(e) => {
            warn!("{}: {}", feedback.failure, e);
            notices.error(feedback.failure.clone());
            match reconcile {
                Reconcile::Refetch(fetch) => match fetch() {
                    Ok(fresh) => *items = fresh,
                    Err(refetch_err) => {
                        warn!("Reconciliation refetch failed ({}); restoring previous state", refetch_err);
                        *items = snapshot;
                    }
                },
                Reconcile::Restore => *items = snapshot,
            }
            Err(e)
        }
    }
}

/// Fan-out variant: one `remote` call per key, run in parallel.
///
/// Requests target disjoint items so their order does not matter. When any of them fails
/// the notice names how many did, and the list is reconciled. A failed refetch falls back
/// to restoring only the failed items, leaving the successful ones as applied.
pub fn mutate_each<T, E, L, R>(
    items: &mut Vec<T>,
    keys: &[T::Key],
    local: L,
    remote: R,
    reconcile: Reconcile<'_, T, E>,
    feedback: &Feedback,
    notices: &mut Notices,
) -> FanOut<T::Key, E>
where
    T: Keyed + Clone,
    T::Key: Send + Sync,
    E: Display + Send,
    L: FnOnce(&mut Vec<T>),
    R: Fn(&T::Key) -> Result<(), E> + Sync,
{
    let snapshot = items.clone();
    local(items);

    let outcomes: Vec<(T::Key, Result<(), E>)> = thread::scope(|scope| {
        let remote = &remote;
        let handles = keys
            .iter()
            .map(|key| (key, scope.spawn(move || remote(key))))
            .collect::<Vec<_>>();
        handles
            .into_iter()
            .map(|(key, handle)| {
                let outcome = handle.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic));
                (key.clone(), outcome)
            })
            .collect()
    });

    let mut report = FanOut {
        succeeded: Vec::new(),
        failed: Vec::new(),
    };
    for (key, outcome) in outcomes {
        match outcome {
            Ok(()) => report.succeeded.push(key),
            Err(e) => {
                warn!("{} for {:?}: {}", feedback.failure, key, e);
                report.failed.push((key, e));
            }
        }
    }
    debug!(
        "Fan-out finished: {} succeeded, {} failed",
        report.succeeded.len(),
        report.failed.len()
    );

    if report.is_complete() {
        if let Some(msg) = feedback.success.as_ref() {
            notices.success(msg.clone());
        }
        return report;
    }

    notices.error(format!(
        "{} ({} of {} failed)",
        feedback.failure,
        report.failed.len(),
        report.total()
    ));
    let failed_keys = report.failed.iter().map(|(k, _)| k.clone()).collect::<Vec<_>>();
    match reconcile {
        Reconcile::Refetch(fetch) => match fetch() {
            Ok(fresh) => *items = fresh,
            Err(refetch_err) => {
                warn!("Reconciliation refetch failed ({}); restoring failed items", refetch_err);
                restore_keys(items, &snapshot, &failed_keys);
            }
        },
        Reconcile::Restore => restore_keys(items, &snapshot, &failed_keys),
    }
    report
}

/// Put the snapshot version of each key back into `items`.
fn restore_keys<T: Keyed + Clone>(items: &mut Vec<T>, snapshot: &[T], keys: &[T::Key]) {
    for key in keys {
        let before = snapshot.iter().find(|item| item.key() == key);
        let now = items.iter().position(|item| item.key() == key);
        match (before, now) {
            (Some(old), Some(idx)) => items[idx] = old.clone(),
            (Some(old), None) => {
                // Removed optimistically; put it back where it was.
                let idx = snapshot
                    .iter()
                    .position(|item| item.key() == key)
                    .unwrap_or(items.len())
                    .min(items.len());
                items.insert(idx, old.clone());
            }
            (None, Some(idx)) => {
                items.remove(idx);
            }
            (None, None) => {}
        }
    }
}

/// Local updater: edit the item with `key` in place, if it is present.
pub fn patch_item<T: Keyed>(items: &mut [T], key: &T::Key, edit: impl FnOnce(&mut T)) {
    if let Some(item) = items.iter_mut().find(|item| item.key() == key) {
        edit(item);
    }
}

/// Local updater: drop the item with `key`.
pub fn remove_item<T: Keyed>(items: &mut Vec<T>, key: &T::Key) {
    items.retain(|item| item.key() != key);
}
