//! Scheduler - where subscription work runs
//!
//! Handler callbacks, adapter routing and stop-replaying triggers are spawned
//! here, never on the publishing thread.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;

use super::error::{BusError, BusResult};

/// Runtime owned by a dedicated scheduler
struct OwnedRuntime(Option<Runtime>);

impl Drop for OwnedRuntime {
    fn drop(&mut self) {
        if let Some(runtime) = self.0.take() {
            // Safe to drop from inside another runtime
            runtime.shutdown_background();
        }
    }
}

/// Handle to the runtime that executes subscription work
#[derive(Clone)]
pub struct Scheduler {
    handle: Handle,
    name: Arc<str>,
    owned: Option<Arc<OwnedRuntime>>,
}

impl Scheduler {
    /// Use the runtime the caller is running on
    pub fn current() -> BusResult<Self> {
        Handle::try_current()
            .map(Self::from_handle)
            .map_err(|_| BusError::NoRuntime)
    }

    pub fn from_handle(handle: Handle) -> Self {
        Self {
            handle,
            name: Arc::from("current"),
            owned: None,
        }
    }

    /// Start a multi-thread runtime owned by this scheduler
    ///
    /// The runtime shuts down in the background when the last clone is dropped.
    pub fn dedicated(name: &str, workers: usize) -> BusResult<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(workers.max(1))
            .thread_name(name)
            .enable_all()
            .build()
            .map_err(|e| BusError::Scheduler(e.to_string()))?;

        tracing::debug!(scheduler = %name, workers = workers.max(1), "Dedicated scheduler started");

        Ok(Self {
            handle: runtime.handle().clone(),
            name: Arc::from(name),
            owned: Some(Arc::new(OwnedRuntime(Some(runtime)))),
        })
    }

    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.handle.spawn(future)
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_dedicated(&self) -> bool {
        self.owned.is_some()
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("name", &self.name)
            .field("dedicated", &self.is_dedicated())
            .finish()
    }
}
