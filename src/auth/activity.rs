use std::sync::Arc;

use tokio::sync::watch;

/// Broadcast signal raised on user interaction. Renewal waits on it so idle
/// sessions do not spend their refresh budget.
#[derive(Debug, Clone)]
pub struct ActivityGate {
    tx: Arc<watch::Sender<u64>>,
}

#[derive(Debug)]
pub struct ArmedActivity {
    rx: watch::Receiver<u64>,
    armed_at: u64,
}

impl ActivityGate {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(0);
        Self { tx: Arc::new(tx) }
    }

    pub fn raise(&self) {
        self.tx.send_modify(|count| *count = count.wrapping_add(1));
    }

    /// Starts observing; the returned handle resolves on the first activity
    /// raised after this call.
    pub fn arm(&self) -> ArmedActivity {
        let rx = self.tx.subscribe();
        let armed_at = *rx.borrow();
        ArmedActivity { rx, armed_at }
    }
}

impl Default for ActivityGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ArmedActivity {
    pub fn has_fired(&self) -> bool {
        *self.rx.borrow() != self.armed_at
    }

    pub async fn wait(mut self) {
        let armed_at = self.armed_at;
        if self.rx.wait_for(|count| *count != armed_at).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
