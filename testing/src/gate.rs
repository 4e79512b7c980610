//! Manually opened gate for holding async operations in flight

use std::sync::Arc;
use tokio::sync::watch;

/// A deferred that a test settles by hand
///
/// Operations await [`Gate::wait`] to stay in flight until the test calls
/// [`Gate::open`]. Clones share the same gate; once open it stays open.
///
/// # Example
///
/// ```
/// use rexmodule_testing::Gate;
///
/// # tokio_test::block_on(async {
/// let gate = Gate::new();
/// let waiter = gate.clone();
/// let pending = tokio::spawn(async move { waiter.wait().await; 5 });
///
/// gate.open();
/// assert_eq!(pending.await.unwrap(), 5);
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct Gate {
    tx: Arc<watch::Sender<bool>>,
}

impl Gate {
    /// A closed gate
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Open the gate, releasing every current and future waiter
    pub fn open(&self) {
        self.tx.send_replace(true);
    }

    /// Whether the gate has been opened
    #[must_use]
    pub fn is_open(&self) -> bool {
        *self.tx.borrow()
    }

    /// Wait until the gate is open
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        loop {
            let open = *rx.borrow_and_update();
            if open || rx.changed().await.is_err() {
                return;
            }
        }
    }
}

impl Default for Gate {
    fn default() -> Self {
        Self::new()
    }
}
