use tokio::sync::watch;

/// Requests a graceful stop of an in-flight pipeline run.
///
/// The pipeline checks the flag between files and between stages; work already started
/// completes, and no further files are picked up.
#[derive(Debug, Clone)]
pub struct ShutdownTx(watch::Sender<bool>);

impl ShutdownTx {
    pub fn shutdown(&self) {
        // Receivers may already be gone; a send failure means nothing is listening.
        let _ = self.0.send(true);
    }
}

/// Receiving side of the shutdown flag, cheap to clone per worker.
pub type ShutdownRx = watch::Receiver<bool>;

/// Creates a connected shutdown pair, initially not shut down.
pub fn create_shutdown_channel() -> (ShutdownTx, ShutdownRx) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTx(tx), rx)
}

/// Whether shutdown has been requested on this receiver.
pub fn shutdown_requested(rx: &ShutdownRx) -> bool {
    *rx.borrow()
}
