//! Admission gate bounding concurrent provider calls
//!
//! One counting gate for the whole process: at most [`MAX_CONCURRENT_REQUESTS`]
//! provider calls are in flight at once. Excess callers suspend (no polling)
//! and are admitted one-for-one as slots free, in FIFO order; tokio's
//! semaphore queues waiters fairly.

use tokio::sync::{Semaphore, SemaphorePermit};

/// Hard ceiling on simultaneous in-flight provider requests.
pub const MAX_CONCURRENT_REQUESTS: usize = 2;

static GATE: Semaphore = Semaphore::const_new(MAX_CONCURRENT_REQUESTS);

/// Wait for an admission slot. The slot is released when the returned permit
/// drops.
pub(crate) async fn admit() -> SemaphorePermit<'static> {
    // acquire only fails on a closed semaphore; the static gate never closes
    GATE.acquire().await.expect("admission gate never closes")
}
