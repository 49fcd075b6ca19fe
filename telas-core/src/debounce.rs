//! Quiet-window aggregation for free-text search input.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::config::SEARCH_DEBOUNCE;

/// Yields a value only once its sender has been quiet for the window.
///
/// Intermediate values typed during the window are dropped; only the
/// latest one is delivered.
#[derive(Debug)]
pub struct Debouncer<T> {
    rx: mpsc::Receiver<T>,
    window: Duration,
}

impl<T> Debouncer<T> {
    pub fn new(rx: mpsc::Receiver<T>, window: Duration) -> Self {
        Self { rx, window }
    }

    /// Channel with the standard search window.
    pub fn channel(buffer: usize) -> (mpsc::Sender<T>, Self) {
        let (tx, rx) = mpsc::channel(buffer);
        (tx, Self::new(rx, SEARCH_DEBOUNCE))
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Wait for the next settled value.
    ///
    /// Returns `None` once every sender is gone and nothing is pending. A
    /// value pending when the senders close is still delivered.
    pub async fn next_settled(&mut self) -> Option<T> {
        let mut latest = self.rx.recv().await?;
        loop {
            match timeout(self.window, self.rx.recv()).await {
                Ok(Some(value)) => latest = value,
                Ok(None) | Err(_) => return Some(latest),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{sleep, Instant};

    #[tokio::test(start_paused = true)]
    async fn test_keystrokes_collapse_to_last() {
        let (tx, mut debouncer) = Debouncer::channel(16);
        let started = Instant::now();

        tokio::spawn(async move {
            for text in ["g", "ga", "gab"] {
                tx.send(text.to_string()).await.unwrap();
                sleep(Duration::from_millis(100)).await;
            }
            sleep(Duration::from_millis(500)).await;
            tx.send("lino".to_string()).await.unwrap();
        });

        assert_eq!(debouncer.next_settled().await.as_deref(), Some("gab"));
        assert!(started.elapsed() >= Duration::from_millis(500));

        assert_eq!(debouncer.next_settled().await.as_deref(), Some("lino"));
        assert_eq!(debouncer.next_settled().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spaced_values_all_delivered() {
        let (tx, rx) = mpsc::channel(4);
        let mut debouncer = Debouncer::new(rx, Duration::from_millis(50));

        tokio::spawn(async move {
            tx.send(1).await.unwrap();
            sleep(Duration::from_millis(80)).await;
            tx.send(2).await.unwrap();
        });

        assert_eq!(debouncer.next_settled().await, Some(1));
        assert_eq!(debouncer.next_settled().await, Some(2));
        assert_eq!(debouncer.next_settled().await, None);
    }

    #[test]
    fn test_default_window() {
        let (_tx, debouncer) = Debouncer::<String>::channel(1);
        assert_eq!(debouncer.window(), Duration::from_millis(300));
    }
}
