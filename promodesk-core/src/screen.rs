// SPDX-License-Identifier: MIT

use std::{
    collections::HashSet,
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::{
    RequestError,
    deadline::{Timeouts, with_deadline},
    list::{Item, Mutation, OptimisticList, Snapshot, temporary_id},
    notify::{self, Notification, Notifier},
    selection::Selection,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenState {
    Idle,
    Loading,
    Ready,
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Delete,
    Add,
    Edit,
}

impl OperationKind {
    fn index(self) -> usize {
        match self {
            OperationKind::Delete => 0,
            OperationKind::Add => 1,
            OperationKind::Edit => 2,
        }
    }
}

type Flags = Arc<[AtomicBool; 3]>;

/// One flag per operation kind. A second operation of the same kind is refused while the flag is up.
#[derive(Default, Clone)]
pub struct InFlight {
    flags: Flags,
}

impl InFlight {
    pub fn try_begin(&self, kind: OperationKind) -> Option<InFlightGuard> {
        self.flags[kind.index()]
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        Some(InFlightGuard {
            kind,
            flags: self.flags.clone(),
        })
    }

    pub fn is_busy(&self, kind: OperationKind) -> bool {
        self.flags[kind.index()].load(Ordering::Acquire)
    }

    pub fn any(&self) -> bool {
        self.flags.iter().any(|f| f.load(Ordering::Acquire))
    }
}

/// Lowers the flag when dropped.
pub struct InFlightGuard {
    kind: OperationKind,
    flags: Flags,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.flags[self.kind.index()].store(false, Ordering::Release);
    }
}

pub struct LoadTicket {
    generation: u64,
    token: CancellationToken,
}

impl LoadTicket {
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub succeeded: usize,
    pub failed: Vec<(String, RequestError)>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct PendingDelete<T> {
    prior: Snapshot<T>,
    ids: Vec<String>,
    deadline: Duration,
    guard: InFlightGuard,
}

pub struct DeleteOutcome<T> {
    prior: Snapshot<T>,
    succeeded: Vec<String>,
    failed: Vec<(String, RequestError)>,
    _guard: InFlightGuard,
}

impl<T> PendingDelete<T> {
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Fires one request per id without waiting for the previous ones.
    pub async fn send<F, Fut>(self, delete: F) -> DeleteOutcome<T>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<(), RequestError>> + Send + 'static,
    {
        let mut set = JoinSet::new();
        for id in &self.ids {
            let fut = with_deadline(self.deadline, None, delete(id.clone()));
            let id = id.clone();
            set.spawn(async move { (id, fut.await) });
        }

        let mut pending = self.ids.iter().cloned().collect::<HashSet<String>>();
        let mut succeeded = Vec::new();
        let mut failed = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((id, Ok(()))) => {
                    pending.remove(&id);
                    succeeded.push(id);
                }
                Ok((id, Err(e))) => {
                    tracing::error!(target: "screen", id=id, error=?e, "Delete the item");
                    pending.remove(&id);
                    failed.push((id, e));
                }
                Err(e) => tracing::error!(target: "screen", error=?e, "Join the delete request"),
            }
        }
        failed.extend(
            pending
                .into_iter()
                .map(|id| (id, RequestError::Transport("the request was lost".to_string()))),
        );

        DeleteOutcome {
            prior: self.prior,
            succeeded,
            failed,
            _guard: self.guard,
        }
    }
}

pub struct PendingAdd<T> {
    items: Vec<T>,
    deadline: Duration,
    guard: InFlightGuard,
}

pub struct AddOutcome {
    temporary_ids: Vec<String>,
    result: Result<Vec<String>, RequestError>,
    _guard: InFlightGuard,
}

impl<T: Item> PendingAdd<T> {
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// The items go out in one request, so it either adds all of them or none.
    pub async fn send<F, Fut>(self, create: F) -> AddOutcome
    where
        F: FnOnce(Vec<T>) -> Fut,
        Fut: Future<Output = Result<Vec<String>, RequestError>>,
    {
        let temporary_ids = self.items.iter().map(|i| i.id()).collect();
        let result = with_deadline(self.deadline, None, create(self.items)).await;
        AddOutcome {
            temporary_ids,
            result,
            _guard: self.guard,
        }
    }
}

pub struct PendingEdit<T> {
    prior: Snapshot<T>,
    item: T,
    deadline: Duration,
    guard: InFlightGuard,
}

pub struct EditOutcome<T> {
    prior: Snapshot<T>,
    id: String,
    result: Result<(), RequestError>,
    _guard: InFlightGuard,
}

impl<T: Item> PendingEdit<T> {
    pub async fn send<F, Fut>(self, update: F) -> EditOutcome<T>
    where
        F: FnOnce(T) -> Fut,
        Fut: Future<Output = Result<(), RequestError>>,
    {
        let id = self.item.id();
        let result = with_deadline(self.deadline, None, update(self.item)).await;
        EditOutcome {
            prior: self.prior,
            id,
            result,
            _guard: self.guard,
        }
    }
}

/// The list of one screen together with its selection, load state and in-flight operations.
pub struct Screen<T> {
    name: String,
    state: ScreenState,
    list: OptimisticList<T>,
    selection: Selection,
    in_flight: InFlight,
    timeouts: Timeouts,
    notifier: Arc<dyn Notifier>,
    load_token: CancellationToken,
    generation: u64,
    unmounted: bool,
}

impl<T: Item + Clone> Screen<T> {
    pub fn new(name: &str, notifier: Arc<dyn Notifier>, timeouts: Timeouts) -> Self {
        Self {
            name: name.to_string(),
            state: ScreenState::Idle,
            list: OptimisticList::default(),
            selection: Selection::default(),
            in_flight: InFlight::default(),
            timeouts,
            notifier,
            load_token: CancellationToken::new(),
            generation: 0,
            unmounted: false,
        }
    }

    pub fn state(&self) -> &ScreenState {
        &self.state
    }

    pub fn items(&self) -> &[Arc<T>] {
        self.list.items()
    }

    pub fn ids(&self) -> Vec<String> {
        self.list.ids()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn select(&mut self, id: &str) {
        if self.list.contains(id) {
            self.selection.select(id);
        } else {
            tracing::warn!(target: "screen", screen=self.name, id=id, "Select an unknown item");
        }
    }

    pub fn toggle(&mut self, id: &str) {
        if self.list.contains(id) {
            self.selection.toggle(id);
        }
    }

    pub fn is_busy(&self, kind: OperationKind) -> bool {
        self.in_flight.is_busy(kind)
    }

    pub fn operation_in_flight(&self) -> bool {
        self.in_flight.any()
    }

    /// Cancels the previous load, if any, and starts a new one.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.load_token.cancel();
        self.load_token = CancellationToken::new();
        self.generation += 1;
        self.state = ScreenState::Loading;

        LoadTicket {
            generation: self.generation,
            token: self.load_token.clone(),
        }
    }

    /// Returns `false` when the result was dropped: the load was cancelled, superseded,
    /// or the screen is gone.
    pub fn finish_load(&mut self, ticket: LoadTicket, result: Result<Vec<T>, RequestError>) -> bool {
        if self.unmounted || ticket.generation != self.generation || ticket.token.is_cancelled() {
            tracing::debug!(target: "screen", screen=self.name, generation=ticket.generation, "Drop a stale load");
            return false;
        }

        match result {
            Ok(items) => {
                self.list.replace_all(items);
                let existing = self.list.ids().into_iter().collect::<HashSet<String>>();
                self.selection.retain_existing(&existing);
                self.state = ScreenState::Ready;
                true
            }
            Err(RequestError::Aborted) => false,
            Err(e) => {
                tracing::error!(target: "screen", screen=self.name, error=?e, "Load the list");
                self.state = ScreenState::Failed(e.to_string());
                true
            }
        }
    }

    pub async fn load<F, Fut>(&mut self, fetch: F) -> bool
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<Vec<T>, RequestError>>,
    {
        let ticket = self.begin_load();
        let result = fetch(ticket.token()).await;
        self.finish_load(ticket, result)
    }

    /// Loads again from scratch, only from the failed state.
    pub async fn retry<F, Fut>(&mut self, fetch: F) -> bool
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<Vec<T>, RequestError>>,
    {
        if !matches!(self.state, ScreenState::Failed(_)) {
            return false;
        }
        self.load(fetch).await
    }

    pub fn unmount(&mut self) {
        self.unmounted = true;
        self.load_token.cancel();
    }

    pub fn begin_delete(&mut self) -> Option<PendingDelete<T>> {
        if self.selection.is_empty() {
            return None;
        }

        let Some(guard) = self.in_flight.try_begin(OperationKind::Delete) else {
            tracing::debug!(target: "screen", screen=self.name, "Delete is already in flight");
            return None;
        };

        let ids = self.selection.ids();
        let prior = self
            .list
            .apply_optimistic(Mutation::Remove(ids.iter().cloned().collect()));
        let deadline = if ids.len() > 1 {
            self.timeouts.batch()
        } else {
            self.timeouts.single()
        };

        Some(PendingDelete {
            prior,
            ids,
            deadline,
            guard,
        })
    }

    pub fn settle_delete(&mut self, outcome: DeleteOutcome<T>) -> BatchReport {
        let report = BatchReport {
            succeeded: outcome.succeeded.len(),
            failed: outcome.failed,
        };
        if self.unmounted {
            return report;
        }

        if report.failed.is_empty() {
            for id in &outcome.succeeded {
                self.selection.deselect(id);
            }
        } else {
            let failed_ids = report
                .failed
                .iter()
                .map(|(id, _)| id.clone())
                .collect::<HashSet<String>>();
            self.list.restore_failed(&outcome.prior, &failed_ids);
            self.selection.reset_to(failed_ids);
        }

        let mut interrupted = false;
        for (_, e) in &report.failed {
            match e {
                RequestError::Aborted => {}
                RequestError::TimedOut => interrupted = true,
                e => self.notifier.notify(Notification::error(e.to_string().as_str())),
            }
        }
        if interrupted {
            self.notifier.notify(Notification::interrupted());
        }
        if report.succeeded > 0 {
            self.notifier
                .notify(Notification::success(notify::deleted(report.succeeded).as_str()));
        }
        if !report.failed.is_empty() {
            self.notifier
                .notify(Notification::error(notify::not_deleted(report.failed.len()).as_str()));
        }

        report
    }

    /// Deletes the selected items, one request per item.
    pub async fn delete_selected<F, Fut>(&mut self, delete: F) -> Option<BatchReport>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<(), RequestError>> + Send + 'static,
    {
        let pending = self.begin_delete()?;
        let outcome = pending.send(delete).await;
        Some(self.settle_delete(outcome))
    }

    pub fn begin_add(&mut self, items: Vec<T>) -> Option<PendingAdd<T>> {
        if items.is_empty() {
            return None;
        }

        let Some(guard) = self.in_flight.try_begin(OperationKind::Add) else {
            tracing::debug!(target: "screen", screen=self.name, "Add is already in flight");
            return None;
        };

        let items = items.iter().map(|i| i.with_id(&temporary_id())).collect::<Vec<T>>();
        self.list.apply_optimistic(Mutation::Append(items.clone()));
        let deadline = if items.len() > 1 {
            self.timeouts.batch()
        } else {
            self.timeouts.single()
        };

        Some(PendingAdd {
            items,
            deadline,
            guard,
        })
    }

    pub fn settle_add(&mut self, outcome: AddOutcome) -> Result<usize, RequestError> {
        let count = outcome.temporary_ids.len();
        if self.unmounted {
            return outcome.result.map(|_| count);
        }

        match outcome.result {
            Ok(assigned) => {
                if assigned.len() == count {
                    let pairs = outcome
                        .temporary_ids
                        .into_iter()
                        .zip(assigned)
                        .collect::<Vec<(String, String)>>();
                    self.list.assign_ids(&pairs);
                } else if !assigned.is_empty() {
                    tracing::warn!(
                        target: "screen",
                        screen=self.name,
                        expected=count,
                        got=assigned.len(),
                        "The server returned an unexpected number of ids"
                    );
                }
                self.notifier.notify(Notification::success(notify::added(count).as_str()));
                Ok(count)
            }
            Err(e) => {
                tracing::error!(target: "screen", screen=self.name, error=?e, "Add the items");
                let added = outcome.temporary_ids.into_iter().collect::<HashSet<String>>();
                self.list.discard(&added);
                self.notify_failure(&e);
                Err(e)
            }
        }
    }

    pub async fn add_all<F, Fut>(&mut self, items: Vec<T>, create: F) -> Option<Result<usize, RequestError>>
    where
        F: FnOnce(Vec<T>) -> Fut,
        Fut: Future<Output = Result<Vec<String>, RequestError>>,
    {
        let pending = self.begin_add(items)?;
        let outcome = pending.send(create).await;
        Some(self.settle_add(outcome))
    }

    pub fn begin_edit(&mut self, item: T) -> Option<PendingEdit<T>> {
        if !self.list.contains(&item.id()) {
            tracing::warn!(target: "screen", screen=self.name, id=item.id(), "Edit an unknown item");
            return None;
        }

        let guard = self.in_flight.try_begin(OperationKind::Edit)?;
        let prior = self.list.apply_optimistic(Mutation::Replace(item.clone()));

        Some(PendingEdit {
            prior,
            item,
            deadline: self.timeouts.single(),
            guard,
        })
    }

    pub fn settle_edit(&mut self, outcome: EditOutcome<T>) -> Result<(), RequestError> {
        if self.unmounted {
            return outcome.result;
        }

        match outcome.result {
            Ok(()) => {
                self.notifier.notify(Notification::success(notify::saved().as_str()));
                Ok(())
            }
            Err(e) => {
                tracing::error!(target: "screen", screen=self.name, error=?e, "Edit the item");
                self.list.revert(&outcome.prior, &outcome.id);
                self.notify_failure(&e);
                Err(e)
            }
        }
    }

    pub async fn edit_in_place<F, Fut>(&mut self, item: T, update: F) -> Option<Result<(), RequestError>>
    where
        F: FnOnce(T) -> Fut,
        Fut: Future<Output = Result<(), RequestError>>,
    {
        let pending = self.begin_edit(item)?;
        let outcome = pending.send(update).await;
        Some(self.settle_edit(outcome))
    }

    fn notify_failure(&self, e: &RequestError) {
        match e {
            RequestError::Aborted => {}
            RequestError::TimedOut => self.notifier.notify(Notification::interrupted()),
            e => self.notifier.notify(Notification::error(e.to_string().as_str())),
        }
    }
}

impl<T> Drop for Screen<T> {
    fn drop(&mut self) {
        self.load_token.cancel();
    }
}
