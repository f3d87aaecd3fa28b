// crates/hyperchain-reputation/src/uptime.rs
//
// Bounded ring buffer of online/offline samples with a running online count.

use std::collections::VecDeque;

/// Number of liveness samples kept per validator.
pub const UPTIME_WINDOW_CAPACITY: usize = 1000;

#[derive(Debug, Clone)]
pub struct UptimeWindow {
    samples: VecDeque<bool>,
    capacity: usize,
    online: usize,
}

impl Default for UptimeWindow {
    fn default() -> Self {
        Self::with_capacity(UPTIME_WINDOW_CAPACITY)
    }
}

impl UptimeWindow {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            online: 0,
        }
    }

    /// Append a sample, evicting the oldest when full, and return the new
    /// online ratio.
    pub fn push(&mut self, online: bool) -> f64 {
        if self.samples.len() == self.capacity {
            if let Some(true) = self.samples.pop_front() {
                self.online -= 1;
            }
        }
        self.samples.push_back(online);
        if online {
            self.online += 1;
        }
        self.ratio()
    }

    /// Fraction of samples that were online; 0.0 with no samples.
    pub fn ratio(&self) -> f64 {
        if self.samples.is_empty() {
            0.0
        } else {
            self.online as f64 / self.samples.len() as f64
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
