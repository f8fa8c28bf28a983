use std::{
    collections::HashMap,
    pin::Pin,
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak},
    task::{Context, Poll},
};

use cache_config::Config;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_stream::{wrappers::UnboundedReceiverStream, Stream};

use crate::{
    error::CacheResult,
    gc::GarbageCollector,
    identity::{IdentityResolver, RecordId},
    scalars::ScalarRegistry,
    selection::SelectionSet,
    store::{FieldRef, ListPosition, ReadOutcome, RecordStore, Touched},
    subscriptions::{QueryId, Subscriptions},
};

/// The record store, shared by every query execution of a process.
///
/// Writes and garbage collection take the lock exclusively, reads share it. Cloning is cheap and
/// every clone sees the same records.
#[derive(Clone)]
pub struct Cache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    state: RwLock<CacheState>,
    scalars: Arc<ScalarRegistry>,
    gc: GarbageCollector,
}

#[derive(Default)]
struct CacheState {
    store: RecordStore,
    subscriptions: Subscriptions,
    subscribers: HashMap<QueryId, Subscriber>,
}

struct Subscriber {
    selection: Arc<SelectionSet>,
    root: RecordId,
    variables: Value,
    partial: bool,
    sender: mpsc::UnboundedSender<ReadOutcome>,
}

impl Default for Cache {
    fn default() -> Self {
        Cache::new(IdentityResolver::default(), Arc::default(), GarbageCollector::default())
    }
}

impl Cache {
    pub fn new(identity: IdentityResolver, scalars: Arc<ScalarRegistry>, gc: GarbageCollector) -> Self {
        Cache {
            inner: Arc::new(CacheInner {
                state: RwLock::new(CacheState {
                    store: RecordStore::new(identity),
                    ..Default::default()
                }),
                scalars,
                gc,
            }),
        }
    }

    pub fn from_config(config: &Config, scalars: Arc<ScalarRegistry>) -> Self {
        Cache::new(
            IdentityResolver::new(config.identity.clone()),
            scalars,
            GarbageCollector::new(config.cache.buffer_size),
        )
    }

    pub fn scalars(&self) -> &Arc<ScalarRegistry> {
        &self.inner.scalars
    }

    /// Writes `data` under `root` and re-reads every subscription depending on a changed field.
    pub fn write(
        &self,
        selection: &SelectionSet,
        data: &Value,
        root: &RecordId,
        variables: &Value,
    ) -> CacheResult<Touched> {
        let mut state = self.write_state();
        let touched = state.store.write(selection, data, root, variables)?;
        state.notify(&touched);

        Ok(touched)
    }

    pub fn read(&self, selection: &SelectionSet, root: &RecordId, variables: &Value, partial: bool) -> ReadOutcome {
        self.read_state().store.read(selection, root, variables, partial)
    }

    /// Starts watching a selection. The first item of the stream is the current read, every
    /// following one is a fresh read after a write touched one of its fields.
    pub fn subscribe(
        &self,
        selection: Arc<SelectionSet>,
        root: RecordId,
        variables: Value,
        partial: bool,
    ) -> Subscription {
        let mut state = self.write_state();

        let outcome = state.store.read(&selection, &root, &variables, partial);
        let id = state.subscriptions.register(outcome.dependencies.clone());

        let (sender, receiver) = mpsc::unbounded_channel();
        // The receiver is alive, it is right here.
        let _ = sender.send(outcome);

        state.subscribers.insert(
            id,
            Subscriber {
                selection,
                root,
                variables,
                partial,
                sender,
            },
        );
        tracing::debug!("subscription {id} registered");

        Subscription {
            id,
            cache: Arc::downgrade(&self.inner),
            receiver: UnboundedReceiverStream::new(receiver),
        }
    }

    /// Removes a record. Subscriptions that read it are re-read.
    pub fn delete(&self, id: &RecordId) -> bool {
        let mut state = self.write_state();
        let Some(record) = state.store.delete(id) else {
            return false;
        };

        let touched = record
            .fields()
            .map(|(key, _)| FieldRef::new(id.clone(), key))
            .collect::<Touched>();
        state.notify(&touched);

        true
    }

    /// Advances the generation and evicts the records nobody needs anymore.
    pub fn collect_garbage(&self) -> Vec<RecordId> {
        let mut state = self.write_state();
        let CacheState {
            store, subscriptions, ..
        } = &mut *state;

        self.inner
            .gc
            .collect(store, |record| subscriptions.is_referenced(record))
    }

    pub fn list(&self, name: impl Into<String>) -> ListHandle {
        ListHandle {
            cache: self.clone(),
            name: name.into(),
        }
    }

    pub fn mark_stale(&self, type_name: &str, field: Option<&str>) {
        self.write_state().store.mark_stale(type_name, field);
    }

    pub fn mark_record_stale(&self, id: &RecordId, field: Option<&str>) {
        self.write_state().store.mark_record_stale(id, field);
    }

    /// Drops every record. All subscriptions are re-read.
    pub fn reset(&self) {
        let mut state = self.write_state();
        state.store.reset();

        let ids = state.subscriptions.ids().collect::<Vec<_>>();
        for id in ids {
            state.refresh(id);
        }
        tracing::debug!("cache reset");
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.read_state().store.contains(id)
    }

    pub fn len(&self) -> usize {
        self.read_state().store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_state().store.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.read_state().store.generation()
    }

    /// Runs `f` over the store while holding the read lock.
    pub fn inspect<T>(&self, f: impl FnOnce(&RecordStore) -> T) -> T {
        f(&self.read_state().store)
    }

    fn read_state(&self) -> RwLockReadGuard<'_, CacheState> {
        self.inner.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, CacheState> {
        self.inner.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn mutate(&self, f: impl FnOnce(&mut RecordStore) -> CacheResult<Touched>) -> CacheResult<Touched> {
        let mut state = self.write_state();
        let touched = f(&mut state.store)?;
        state.notify(&touched);

        Ok(touched)
    }
}

impl CacheInner {
    fn unsubscribe(&self, id: QueryId) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.subscriptions.remove(id);
        state.subscribers.remove(&id);
        tracing::debug!("subscription {id} dropped");
    }
}

impl CacheState {
    fn notify(&mut self, touched: &Touched) {
        if touched.is_empty() {
            return;
        }

        for id in self.subscriptions.notify(touched) {
            self.refresh(id);
        }
    }

    fn refresh(&mut self, id: QueryId) {
        let Some(subscriber) = self.subscribers.get(&id) else {
            return;
        };

        let outcome = self.store.read(
            &subscriber.selection,
            &subscriber.root,
            &subscriber.variables,
            subscriber.partial,
        );
        self.subscriptions.replace(id, outcome.dependencies.clone());

        if subscriber.sender.send(outcome).is_err() {
            self.subscriptions.remove(id);
            self.subscribers.remove(&id);
        }
    }
}

/// The updates of one watched selection. Dropping it stops the updates.
pub struct Subscription {
    id: QueryId,
    cache: Weak<CacheInner>,
    receiver: UnboundedReceiverStream<ReadOutcome>,
}

impl Subscription {
    pub fn id(&self) -> QueryId {
        self.id
    }

    /// The next pending update, without waiting for one.
    pub fn try_next(&mut self) -> Option<ReadOutcome> {
        self.receiver.as_mut().try_recv().ok()
    }
}

impl Stream for Subscription {
    type Item = ReadOutcome;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.receiver).poll_next(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cache) = self.cache.upgrade() {
            cache.unsubscribe(self.id);
        }
    }
}

/// In place edits of a named list, see [`RecordStore::list_insert`].
#[derive(Clone)]
pub struct ListHandle {
    cache: Cache,
    name: String,
}

impl ListHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn append(&self, selection: &SelectionSet, data: &Value, variables: &Value) -> CacheResult<Touched> {
        self.insert(selection, data, variables, ListPosition::End)
    }

    pub fn prepend(&self, selection: &SelectionSet, data: &Value, variables: &Value) -> CacheResult<Touched> {
        self.insert(selection, data, variables, ListPosition::Start)
    }

    pub fn insert(
        &self,
        selection: &SelectionSet,
        data: &Value,
        variables: &Value,
        position: ListPosition,
    ) -> CacheResult<Touched> {
        self.cache
            .mutate(|store| store.list_insert(&self.name, selection, data, variables, position))
    }

    pub fn remove(&self, id: &RecordId) -> CacheResult<Touched> {
        self.cache.mutate(|store| store.list_remove(&self.name, id))
    }

    pub fn toggle(
        &self,
        selection: &SelectionSet,
        data: &Value,
        variables: &Value,
        position: ListPosition,
    ) -> CacheResult<Touched> {
        self.cache
            .mutate(|store| store.list_toggle(&self.name, selection, data, variables, position))
    }

    pub fn contains(&self, id: &RecordId) -> CacheResult<bool> {
        self.cache.read_state().store.list_contains(&self.name, id)
    }
}
