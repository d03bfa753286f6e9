//! Inactivity deadline for the endpoint.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::{Instant, sleep_until};

/// A deadline pushed back by every request.
///
/// Clones share the same deadline. Resets only ever move the deadline later,
/// so concurrent resets cannot shorten the server's lifetime.
#[derive(Debug, Clone)]
pub struct IdleTimer {
    window: Duration,
    deadline: Arc<Mutex<Instant>>,
}

impl IdleTimer {
    /// Start a timer that expires `window` from now.
    pub fn start(window: Duration) -> Self {
        Self {
            window,
            deadline: Arc::new(Mutex::new(Instant::now() + window)),
        }
    }

    /// Push the deadline to `window` from now.
    pub fn reset(&self) {
        let next = Instant::now() + self.window;
        let mut deadline = self.lock();
        if next > *deadline {
            *deadline = next;
        }
    }

    /// The current deadline.
    pub fn deadline(&self) -> Instant {
        *self.lock()
    }

    /// The configured idle window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Resolve once the deadline passes without a reset in between.
    pub async fn expired(&self) {
        loop {
            let deadline = self.deadline();
            sleep_until(deadline).await;
            if Instant::now() >= self.deadline() {
                return;
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Instant> {
        self.deadline.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::task::yield_now;
    use tokio::time::advance;

    const WINDOW: Duration = Duration::from_secs(60);

    #[tokio::test(start_paused = true)]
    async fn expires_after_window_without_requests() {
        let timer = IdleTimer::start(WINDOW);
        let waiter = tokio::spawn({
            let timer = timer.clone();
            async move { timer.expired().await }
        });

        advance(WINDOW - Duration::from_secs(1)).await;
        yield_now().await;
        assert!(!waiter.is_finished());

        advance(Duration::from_secs(2)).await;
        waiter.await.expect("join");
    }

    #[tokio::test(start_paused = true)]
    async fn reset_extends_deadline() {
        let timer = IdleTimer::start(WINDOW);
        let waiter = tokio::spawn({
            let timer = timer.clone();
            async move { timer.expired().await }
        });

        advance(Duration::from_secs(50)).await;
        let reset_at = Instant::now();
        timer.reset();
        assert!(timer.deadline() >= reset_at + WINDOW);

        advance(Duration::from_secs(20)).await;
        yield_now().await;
        assert!(!waiter.is_finished(), "reset at 50s must outlive the 60s mark");

        advance(Duration::from_secs(41)).await;
        waiter.await.expect("join");
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_never_moves_earlier() {
        let timer = IdleTimer::start(WINDOW);
        let first = timer.deadline();
        advance(Duration::from_secs(5)).await;
        timer.reset();
        let second = timer.deadline();
        assert!(second > first);

        let clones: Vec<_> = (0..8).map(|_| timer.clone()).collect();
        let handles: Vec<_> = clones
            .into_iter()
            .map(|t| tokio::spawn(async move { t.reset() }))
            .collect();
        for handle in handles {
            handle.await.expect("join");
        }
        assert!(timer.deadline() >= second);
        assert_eq!(timer.window(), WINDOW);
    }
}
