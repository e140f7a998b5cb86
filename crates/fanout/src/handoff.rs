//! Rendezvous handoff channel
//!
//! `send` completes only once a receiver has taken the value, so the channel
//! never holds on to a value the sender has moved past.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot, Mutex};

type Envelope<T> = (T, oneshot::Sender<()>);

/// The receiving side is gone
#[derive(Debug, Error)]
#[error("handoff receiver closed")]
pub(crate) struct Closed;

pub(crate) fn channel<T>() -> (HandoffSender<T>, HandoffReceiver<T>) {
    let (tx, rx) = mpsc::channel(1);
    (HandoffSender { tx }, HandoffReceiver { rx })
}

pub(crate) struct HandoffSender<T> {
    tx: mpsc::Sender<Envelope<T>>,
}

impl<T> Clone for HandoffSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> HandoffSender<T> {
    /// Block until a receiver takes `value`
    pub(crate) async fn send(&self, value: T) -> Result<(), Closed> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx.send((value, ack_tx)).await.map_err(|_| Closed)?;
        ack_rx.await.map_err(|_| Closed)
    }
}

pub(crate) struct HandoffReceiver<T> {
    rx: mpsc::Receiver<Envelope<T>>,
}

impl<T> HandoffReceiver<T> {
    /// Take the next value; `None` once every sender is dropped
    pub(crate) async fn recv(&mut self) -> Option<T> {
        let (value, ack) = self.rx.recv().await?;
        // The sender may have given up waiting; the value is ours either way.
        let _ = ack.send(());
        Some(value)
    }

    pub(crate) fn close(&mut self) {
        self.rx.close();
    }
}

/// Receiver shared by several consumers; each value goes to exactly one of them
pub(crate) struct SharedReceiver<T> {
    inner: Arc<Mutex<HandoffReceiver<T>>>,
}

impl<T> Clone for SharedReceiver<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> SharedReceiver<T> {
    pub(crate) fn new(receiver: HandoffReceiver<T>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(receiver)),
        }
    }

    pub(crate) async fn recv(&self) -> Option<T> {
        self.inner.lock().await.recv().await
    }
}
