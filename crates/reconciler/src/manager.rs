//! Controller manager: watch dispatch and worker pools.
//!
//! The manager owns one [`WorkQueue`] per registered controller. A single
//! dispatcher task turns store watch events into queue keys, and a fixed
//! number of workers per controller drain the queue. Propagation between
//! loops happens only through the store: a write produces an event, and the
//! event schedules an independent pass.

use std::sync::Arc;
use std::time::Duration;

use flightdeck_store::{ObjectKey, ResourceKind, Store, WatchEvent, WatchReceiver};
use futures::future::join_all;
use itertools::Itertools;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::config::ManagerConfig;
use crate::controller::Reconcile;
use crate::controllers::{AirplaneReconciler, PedalLinkageReconciler, RudderReconciler};
use crate::error::{Error, Result};
use crate::queue::WorkQueue;
use crate::types::ReconcileResult;

/// The key a controller should reconcile in response to `event`, if any.
///
/// Events for the controller's own kind map to their own key. Events for an
/// owned kind map to the key of their controller owner, provided that owner
/// is of the controller's kind.
#[must_use]
pub fn requests_for(
    kind: ResourceKind,
    owns: &[ResourceKind],
    event: &WatchEvent,
) -> Option<ObjectKey> {
    if event.kind == kind {
        return Some(event.key.clone());
    }
    if !owns.contains(&event.kind) {
        return None;
    }
    event
        .controller_owner()
        .filter(|owner| owner.kind == kind)
        .map(|owner| ObjectKey::new(&event.key.namespace, &owner.name))
}

#[derive(Clone)]
struct Route {
    controller: Arc<dyn Reconcile>,
    queue: WorkQueue<ObjectKey>,
}

impl Route {
    async fn dispatch(&self, event: &WatchEvent) {
        if let Some(key) = requests_for(self.controller.kind(), self.controller.owns(), event) {
            debug!(
                controller = self.controller.name(),
                %key,
                kind = %event.kind,
                event_type = ?event.event_type,
                "Enqueued"
            );
            self.queue.add(key).await;
        }
    }

    async fn sync(&self, store: &dyn Store) -> Result<usize> {
        let kind = self.controller.kind();
        let objects = store
            .list(kind)
            .await
            .map_err(|e| Error::store(format!("list {kind}"), e))?;
        let count = objects.len();
        for object in objects {
            self.queue.add(object.key()).await;
        }
        Ok(count)
    }
}

/// Runs registered controllers against a store.
pub struct Manager {
    store: Arc<dyn Store>,
    config: ManagerConfig,
    controllers: Vec<Arc<dyn Reconcile>>,
}

impl Manager {
    /// Create a manager with no controllers.
    pub fn new(store: Arc<dyn Store>, config: ManagerConfig) -> Self {
        Self {
            store,
            config,
            controllers: Vec::new(),
        }
    }

    /// Create a manager running the airplane, pedal linkage, and rudder loops.
    pub fn with_default_controllers(store: Arc<dyn Store>, config: ManagerConfig) -> Self {
        let delay = config.missing_dependency_delay();
        let mut manager = Self::new(Arc::clone(&store), config);
        manager
            .register(Arc::new(AirplaneReconciler::new(Arc::clone(&store))))
            .register(Arc::new(PedalLinkageReconciler::new(
                Arc::clone(&store),
                delay,
            )))
            .register(Arc::new(RudderReconciler::new(store)));
        manager
    }

    /// Add a controller.
    pub fn register(&mut self, controller: Arc<dyn Reconcile>) -> &mut Self {
        self.controllers.push(controller);
        self
    }

    /// Names of the registered controllers, in registration order.
    pub fn controller_names(&self) -> Vec<&'static str> {
        self.controllers.iter().map(|c| c.name()).collect()
    }

    /// Start dispatching and reconciling.
    ///
    /// Every existing object of each controller's kind is queued once, so
    /// objects created before the manager started are converged too.
    pub async fn start(self) -> Result<ManagerHandle> {
        self.config.validate()?;

        // Subscribe before listing so nothing written in between is missed.
        let events = self.store.subscribe();

        let routes: Vec<Route> = self
            .controllers
            .into_iter()
            .map(|controller| Route {
                controller,
                queue: WorkQueue::new(self.config.backoff()),
            })
            .collect();

        for route in &routes {
            let queued = route.sync(self.store.as_ref()).await?;
            debug!(controller = route.controller.name(), queued, "Initial sync");
        }

        let mut workers = Vec::new();
        for route in &routes {
            for _ in 0..self.config.workers_per_controller {
                workers.push(tokio::spawn(run_worker(route.clone())));
            }
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let dispatcher = tokio::spawn(run_dispatcher(
            Arc::clone(&self.store),
            events,
            routes.clone(),
            stop_rx,
        ));

        info!(
            controllers = %routes.iter().map(|r| r.controller.name()).join(","),
            workers = workers.len(),
            "Manager started"
        );

        Ok(ManagerHandle {
            stop_tx,
            queues: routes.into_iter().map(|r| r.queue).collect(),
            dispatcher,
            workers,
            shutdown_timeout: self.config.shutdown_timeout(),
        })
    }
}

/// Handle to a running manager.
pub struct ManagerHandle {
    stop_tx: watch::Sender<bool>,
    queues: Vec<WorkQueue<ObjectKey>>,
    dispatcher: JoinHandle<()>,
    workers: Vec<JoinHandle<()>>,
    shutdown_timeout: Duration,
}

impl ManagerHandle {
    /// Keys waiting across all controller queues.
    pub async fn pending(&self) -> usize {
        let mut pending = 0usize;
        for queue in &self.queues {
            pending = pending.saturating_add(queue.len().await);
        }
        pending
    }

    /// Stop dispatching, drain the workers, and wait for them to finish.
    ///
    /// A pass in flight runs to completion. Workers still running after the
    /// shutdown timeout are aborted.
    pub async fn shutdown(self) -> Result<()> {
        let _ = self.stop_tx.send(true);
        for queue in &self.queues {
            queue.shut_down().await;
        }

        let mut handles = self.workers;
        handles.push(self.dispatcher);
        let aborts: Vec<_> = handles.iter().map(JoinHandle::abort_handle).collect();

        match tokio::time::timeout(self.shutdown_timeout, join_all(handles)).await {
            Ok(results) => {
                for result in results {
                    if let Err(e) = result {
                        warn!(error = %e, "Task ended abnormally");
                    }
                }
                info!("Manager stopped");
                Ok(())
            }
            Err(_) => {
                for abort in aborts {
                    abort.abort();
                }
                Err(Error::timeout("workers to stop", self.shutdown_timeout))
            }
        }
    }
}

async fn run_worker(route: Route) {
    while let Some(key) = route.queue.get().await {
        let span = info_span!(
            "reconcile",
            controller = route.controller.name(),
            namespace = %key.namespace,
            name = %key.name,
        );
        process(&route, &key).instrument(span).await;
        route.queue.done(&key).await;
    }
}

async fn process(route: &Route, key: &ObjectKey) {
    let queue = &route.queue;
    match route.controller.reconcile(key).await {
        Ok(ReconcileResult::Done) => {
            queue.forget(key).await;
        }
        Ok(ReconcileResult::Requeue) => {
            queue.forget(key).await;
            queue.add(key.clone()).await;
        }
        Ok(ReconcileResult::RequeueAfter(delay)) => {
            queue.forget(key).await;
            queue.add_after(key.clone(), delay).await;
        }
        Err(e) => {
            let failures = queue.failures(key).await.saturating_add(1);
            error!(error = %e, failures, "Reconciliation failed");
            queue.add_rate_limited(key.clone()).await;
        }
    }
}

async fn run_dispatcher(
    store: Arc<dyn Store>,
    mut events: WatchReceiver,
    routes: Vec<Route>,
    mut stop: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow() {
                    debug!("Dispatcher stopped");
                    return;
                }
            }
            event = events.recv() => match event {
                Ok(event) => {
                    for route in &routes {
                        route.dispatch(&event).await;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Watch fell behind, resyncing");
                    for route in &routes {
                        if let Err(e) = route.sync(store.as_ref()).await {
                            error!(controller = route.controller.name(), error = %e, "Resync failed");
                        }
                    }
                }
                Err(RecvError::Closed) => {
                    warn!("Store watch closed, dispatcher exiting");
                    return;
                }
            }
        }
    }
}
