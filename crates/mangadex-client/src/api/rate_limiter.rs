//! Rate limiter shared by every outbound request.
//!
//! Sliding-window limiter: at most `permits` requests in any `window`, and
//! consecutive requests spaced by at least `window / permits`. One instance is
//! created per process and handed to the HTTP layer behind an `Arc`.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

/// Rate limiter safe for concurrent callers
#[derive(Debug)]
pub struct RateLimiter {
    /// Maximum requests per window
    permits: u32,
    /// Window length
    window: Duration,
    /// Minimum spacing between two requests
    min_interval: Duration,
    state: Mutex<LimiterState>,
}

#[derive(Debug, Default)]
struct LimiterState {
    /// Last request timestamp
    last_request: Option<Instant>,
    /// Request timestamps inside the current window, oldest first
    recent_requests: VecDeque<Instant>,
}

impl RateLimiter {
    /// Create a new rate limiter allowing `permits` requests per `window`
    pub fn new(permits: u32, window: Duration) -> Self {
        let permits = permits.max(1);
        Self {
            permits,
            window,
            min_interval: window / permits,
            state: Mutex::new(LimiterState {
                last_request: None,
                recent_requests: VecDeque::with_capacity(permits as usize),
            }),
        }
    }

    /// Wait until a request can be made.
    ///
    /// Callers queue on the internal lock, so permits are granted in arrival
    /// order. Never fails; only delays.
    pub async fn acquire(&self) {
        let mut state = self.state.lock().await;

        let now = Instant::now();
        let window = self.window;
        while state
            .recent_requests
            .front()
            .is_some_and(|&t| now.duration_since(t) >= window)
        {
            state.recent_requests.pop_front();
        }

        // Window full: wait until the oldest request leaves it
        if state.recent_requests.len() >= self.permits as usize {
            if let Some(&oldest) = state.recent_requests.front() {
                let elapsed = now.duration_since(oldest);
                if elapsed < window {
                    let wait_time = window - elapsed;
                    tracing::debug!(
                        wait_ms = wait_time.as_millis(),
                        "Rate limit: waiting for window"
                    );
                    sleep(wait_time).await;
                }
                state.recent_requests.pop_front();
            }
        }

        if let Some(last) = state.last_request {
            let elapsed = Instant::now().duration_since(last);
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!(
                    wait_ms = wait_time.as_millis(),
                    "Rate limit: waiting for request spacing"
                );
                sleep(wait_time).await;
            }
        }

        let request_time = Instant::now();
        state.last_request = Some(request_time);
        state.recent_requests.push_back(request_time);
    }

    /// Number of requests granted inside the current window
    pub async fn current_window_count(&self) -> usize {
        let state = self.state.lock().await;
        let now = Instant::now();
        state
            .recent_requests
            .iter()
            .filter(|&&t| now.duration_since(t) < self.window)
            .count()
    }
}
