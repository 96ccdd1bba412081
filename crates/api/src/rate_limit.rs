use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Sliding-window request counter keyed by client address. Keys whose
/// window has fully expired are dropped, at most once per window.
#[derive(Debug, Clone)]
pub struct IpRateLimiter {
    inner: Arc<Mutex<Windows>>,
    window: Duration,
    max_requests: usize,
}

#[derive(Debug)]
struct Windows {
    hits: HashMap<String, VecDeque<Instant>>,
    last_sweep: Instant,
}

impl IpRateLimiter {
    pub fn new(window: Duration, max_requests: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Windows {
                hits: HashMap::new(),
                last_sweep: Instant::now(),
            })),
            window,
            max_requests,
        }
    }

    pub fn allow(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut guard = self.inner.lock();

        if now.duration_since(guard.last_sweep) > self.window {
            let window = self.window;
            guard.hits.retain(|_, queue| {
                queue
                    .back()
                    .is_some_and(|last| now.duration_since(*last) <= window)
            });
            guard.last_sweep = now;
        }

        let queue = guard.hits.entry(key.to_string()).or_default();
        while let Some(front) = queue.front() {
            if now.duration_since(*front) > self.window {
                queue.pop_front();
            } else {
                break;
            }
        }

        if queue.len() >= self.max_requests {
            return false;
        }

        queue.push_back(now);
        true
    }

    pub fn tracked_keys(&self) -> usize {
        self.inner.lock().hits.len()
    }
}
