use std::sync::mpsc::{self, RecvTimeoutError, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, info};

use restock_events::{CatalogEvent, EventBus, EventEnvelope, NotificationDispatcher, Subscription};

const TICK: Duration = Duration::from_millis(250);

/// Handle to control and join a background worker.
#[derive(Debug)]
pub struct WorkerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl WorkerHandle {
    /// Request graceful shutdown and wait for the worker to stop.
    ///
    /// Envelopes already on the subscription are delivered first.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

/// Pumps bus envelopes into a [`NotificationDispatcher`].
///
/// - Subscribes before the thread starts, so nothing published after `spawn`
///   returns is missed
/// - Handler failures are absorbed by the dispatcher
#[derive(Debug)]
pub struct DispatchWorker;

impl DispatchWorker {
    pub fn spawn<B>(
        name: &'static str,
        bus: B,
        dispatcher: Arc<NotificationDispatcher>,
    ) -> std::io::Result<WorkerHandle>
    where
        B: EventBus<EventEnvelope<CatalogEvent>> + 'static,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let sub = bus.subscribe();

        let join = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || worker_loop(name, sub, shutdown_rx, &dispatcher))?;

        Ok(WorkerHandle {
            shutdown: shutdown_tx,
            join: Some(join),
        })
    }
}

fn worker_loop(
    name: &'static str,
    sub: Subscription<EventEnvelope<CatalogEvent>>,
    shutdown_rx: mpsc::Receiver<()>,
    dispatcher: &NotificationDispatcher,
) {
    info!(worker = name, "dispatch worker started");

    loop {
        if shutdown_rx.try_recv().is_ok() {
            drain(name, &sub, dispatcher);
            break;
        }

        match sub.recv_timeout(TICK) {
            Ok(envelope) => deliver(name, &envelope, dispatcher),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    info!(worker = name, "dispatch worker stopped");
}

fn drain(
    name: &'static str,
    sub: &Subscription<EventEnvelope<CatalogEvent>>,
    dispatcher: &NotificationDispatcher,
) {
    loop {
        match sub.try_recv() {
            Ok(envelope) => deliver(name, &envelope, dispatcher),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => return,
        }
    }
}

fn deliver(name: &'static str, envelope: &EventEnvelope<CatalogEvent>, dispatcher: &NotificationDispatcher) {
    let handled = dispatcher.dispatch(envelope.payload());
    debug!(
        worker = name,
        event_id = %envelope.event_id(),
        source = envelope.source(),
        seq = envelope.sequence_number(),
        handlers = handled,
        "envelope dispatched"
    );
}
