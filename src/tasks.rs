//! Async task management for non-blocking API operations.
//!
//! The application state never awaits. It queues [`Request`]s, the main
//! loop hands them to [`TaskSpawner::dispatch`], and each background task
//! reports back with an [`ApiMessage`] through an unbounded channel that the
//! main loop drains with `try_recv()`.
//!
//! Page fetches are tracked per entity in a [`TaskTracker`]: starting a new
//! fetch for an entity aborts the previous one. Results also carry the
//! generation they were requested under so late answers can be recognised.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{debug, trace};

use crate::api::{ApiError, DataSource, Lookups, Page};
use crate::cache::CacheStatus;
use crate::catalog::Entity;
use crate::table::Row;

/// Work the application wants done off the UI thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Fetch one list page. `append` pages extend the loaded rows.
    FetchPage {
        entity: Entity,
        generation: u64,
        page: u32,
        page_size: u32,
        append: bool,
    },
    FetchRecord {
        entity: Entity,
        id: String,
    },
    DeleteRecord {
        entity: Entity,
        id: String,
    },
    FetchLookups,
    /// Abort the outstanding page fetch of one entity.
    Cancel(Entity),
    /// Abort everything in flight.
    CancelAll,
}

/// Messages sent from background tasks to the main event loop.
#[derive(Debug)]
pub enum ApiMessage {
    PageFetched {
        entity: Entity,
        generation: u64,
        append: bool,
        result: Result<(Page, CacheStatus), ApiError>,
    },
    RecordFetched {
        entity: Entity,
        id: String,
        result: Result<(Row, CacheStatus), ApiError>,
    },
    RecordDeleted {
        entity: Entity,
        id: String,
        result: Result<(), ApiError>,
    },
    LookupsFetched(Result<Lookups, ApiError>),
}

impl ApiMessage {
    /// The error carried by this message, if any.
    pub fn error(&self) -> Option<&ApiError> {
        match self {
            ApiMessage::PageFetched { result, .. } => result.as_ref().err(),
            ApiMessage::RecordFetched { result, .. } => result.as_ref().err(),
            ApiMessage::RecordDeleted { result, .. } => result.as_ref().err(),
            ApiMessage::LookupsFetched(result) => result.as_ref().err(),
        }
    }
}

/// Identifies a cancellable unit of background work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskSlot {
    Page(Entity),
    Record,
    Lookups,
}

/// Abort handles of outstanding tasks, at most one per slot.
#[derive(Debug, Default)]
pub struct TaskTracker {
    handles: HashMap<TaskSlot, AbortHandle>,
}

impl TaskTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember `handle` for `slot`, aborting whatever ran there before.
    pub fn track(&mut self, slot: TaskSlot, handle: AbortHandle) {
        if let Some(previous) = self.handles.insert(slot, handle) {
            trace!(?slot, "Aborting superseded task");
            previous.abort();
        }
    }

    pub fn abort(&mut self, slot: TaskSlot) {
        if let Some(handle) = self.handles.remove(&slot) {
            debug!(?slot, "Aborting task");
            handle.abort();
        }
    }

    pub fn abort_all(&mut self) {
        for (_, handle) in self.handles.drain() {
            handle.abort();
        }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

/// Spawns background tasks for async operations.
///
/// Each method clones what it needs and spawns a tokio task that sends its
/// result through the channel. A closed channel means the UI is gone, so
/// send failures are ignored.
#[derive(Clone)]
pub struct TaskSpawner {
    tx: mpsc::UnboundedSender<ApiMessage>,
}

impl TaskSpawner {
    /// Create a new TaskSpawner with the given channel sender.
    pub fn new(tx: mpsc::UnboundedSender<ApiMessage>) -> Self {
        Self { tx }
    }

    /// Start the work `request` describes, tracking it for cancellation.
    pub fn dispatch(&self, source: &DataSource, tracker: &mut TaskTracker, request: Request) {
        match request {
            Request::FetchPage {
                entity,
                generation,
                page,
                page_size,
                append,
            } => {
                let handle =
                    self.spawn_fetch_page(source, entity, generation, page, page_size, append);
                tracker.track(TaskSlot::Page(entity), handle);
            }
            Request::FetchRecord { entity, id } => {
                let handle = self.spawn_fetch_record(source, entity, id);
                tracker.track(TaskSlot::Record, handle);
            }
            Request::DeleteRecord { entity, id } => {
                // Deletes are never aborted once sent
                self.spawn_delete_record(source, entity, id);
            }
            Request::FetchLookups => {
                let handle = self.spawn_fetch_lookups(source);
                tracker.track(TaskSlot::Lookups, handle);
            }
            Request::Cancel(entity) => tracker.abort(TaskSlot::Page(entity)),
            Request::CancelAll => tracker.abort_all(),
        }
    }

    /// Spawn a task to fetch one list page.
    pub fn spawn_fetch_page(
        &self,
        source: &DataSource,
        entity: Entity,
        generation: u64,
        page: u32,
        page_size: u32,
        append: bool,
    ) -> AbortHandle {
        let tx = self.tx.clone();
        let source = source.clone();
        debug!(%entity, generation, page, append, "Spawning page fetch");
        tokio::spawn(async move {
            let result = source.list_page(entity, page, page_size).await;
            let _ = tx.send(ApiMessage::PageFetched {
                entity,
                generation,
                append,
                result,
            });
        })
        .abort_handle()
    }

    /// Spawn a task to fetch a single record for the detail view.
    pub fn spawn_fetch_record(&self, source: &DataSource, entity: Entity, id: String) -> AbortHandle {
        let tx = self.tx.clone();
        let source = source.clone();
        tokio::spawn(async move {
            let result = source.get(entity, &id).await;
            let _ = tx.send(ApiMessage::RecordFetched { entity, id, result });
        })
        .abort_handle()
    }

    /// Spawn a task to delete a record.
    pub fn spawn_delete_record(&self, source: &DataSource, entity: Entity, id: String) -> AbortHandle {
        let tx = self.tx.clone();
        let source = source.clone();
        tokio::spawn(async move {
            let result = source.delete(entity, &id).await;
            let _ = tx.send(ApiMessage::RecordDeleted { entity, id, result });
        })
        .abort_handle()
    }

    /// Spawn a task to fetch the country and province lookups.
    pub fn spawn_fetch_lookups(&self, source: &DataSource) -> AbortHandle {
        let tx = self.tx.clone();
        let source = source.clone();
        tokio::spawn(async move {
            let result = source.lookups().await;
            let _ = tx.send(ApiMessage::LookupsFetched(result));
        })
        .abort_handle()
    }
}

/// Create a new task channel pair.
///
/// Returns the receiver for the main loop and a spawner for starting tasks.
pub fn create_task_channel() -> (mpsc::UnboundedReceiver<ApiMessage>, TaskSpawner) {
    let (tx, rx) = mpsc::unbounded_channel();
    (rx, TaskSpawner::new(tx))
}
