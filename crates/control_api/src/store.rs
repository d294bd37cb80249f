use tokio::sync::{Mutex, MutexGuard};

/// Single live copy of an application's state.
///
/// Every mutation runs under one lock, so readers never observe a partially
/// applied command. Callers that broadcast do so while still holding the lock,
/// which keeps emission order identical to mutation order.
#[derive(Debug, Default)]
pub struct StateStore<T> {
    inner: Mutex<T>,
}

impl<T: Clone> StateStore<T> {
    pub fn new(initial: T) -> Self {
        Self {
            inner: Mutex::new(initial),
        }
    }

    pub async fn read(&self) -> T {
        self.inner.lock().await.clone()
    }

    pub async fn apply<R>(&self, mutation: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.inner.lock().await;
        mutation(&mut guard)
    }

    /// Holds the critical section open across awaits on other async resources.
    pub async fn lock(&self) -> MutexGuard<'_, T> {
        self.inner.lock().await
    }
}
