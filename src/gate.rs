//! Blocking gateway from the synchronous session loop into async services.

use std::future::Future;

use tokio::runtime::Handle;

/// The one seam where the sequential session thread waits on async work
/// (persistence, combat resolution). Everything else in the crate is
/// synchronous.
#[derive(Debug, Clone)]
pub struct Gate {
    handle: Handle,
}

impl Gate {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Block the calling thread until `future` resolves and return its
    /// output. Must only be called from outside the runtime; the session
    /// loop never runs inside it, so that holds by construction.
    pub fn wait<F: Future>(&self, future: F) -> F::Output {
        self.handle.block_on(future)
    }
}
