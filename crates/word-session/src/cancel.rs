use tokio::sync::watch;

/// Handle used to request cancellation of an in-flight stream.
#[derive(Clone, Debug)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

impl AbortHandle {
    /// Requests cancellation.
    ///
    /// Cancellation is best-effort: it only takes effect if the event source
    /// observes the paired [`CancelSignal`].
    pub fn abort(&self) {
        let _ = self.tx.send(true);
    }
}

/// Read side of a cancellation pair, carried by every `StreamRequest`.
#[derive(Clone, Debug)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    /// Creates a connected abort handle and signal.
    pub fn pair() -> (AbortHandle, CancelSignal) {
        let (tx, rx) = watch::channel(false);
        (AbortHandle { tx }, CancelSignal { rx })
    }

    /// A signal that never fires.
    pub fn never() -> Self {
        let (_handle, signal) = Self::pair();
        signal
    }

    /// Returns true once the paired handle has aborted.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves when cancellation is requested.
    ///
    /// If the abort handle is dropped without aborting, this never resolves.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                futures::future::pending::<()>().await;
            }
        }
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::never()
    }
}
