//! Named thread construction for service worker pools.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};

/// Produces OS threads named `<factory-name>-<n>` from a monotonically
/// increasing counter.
///
/// Stable, predictable thread names make log output and thread dumps from a
/// service attributable to the pool that owns them.
///
/// # Example
///
/// ```rust
/// use fleet_commons::core::NamedThreadFactory;
///
/// let factory = NamedThreadFactory::new("telemetry-flush");
/// let handle = factory.spawn(|| { /* work */ }).unwrap();
/// handle.join().unwrap();
/// ```
#[derive(Debug)]
pub struct NamedThreadFactory {
    name_prefix: String,
    thread_number: AtomicUsize,
}

impl NamedThreadFactory {
    /// Create a factory whose threads are named `<factory_name>-<n>`.
    #[must_use]
    pub fn new(factory_name: &str) -> Self {
        Self {
            name_prefix: format!("{factory_name}-"),
            thread_number: AtomicUsize::new(0),
        }
    }

    /// The name the next spawned thread will receive.
    fn next_thread_name(&self) -> String {
        let n = self.thread_number.fetch_add(1, Ordering::Relaxed);
        format!("{}{n}", self.name_prefix)
    }

    /// Spawn a named thread running `f`.
    ///
    /// # Errors
    ///
    /// Returns the underlying `io::Error` when the OS refuses to create the
    /// thread.
    pub fn spawn<F, T>(&self, f: F) -> io::Result<JoinHandle<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        thread::Builder::new().name(self.next_thread_name()).spawn(f)
    }
}
