//! Concurrency throttle bounding in-flight queries on one connection.
//!
//! A counting gate: `acquire` blocks while the in-flight count has reached
//! the ceiling, the returned [`ThrottlePermit`] gives the slot back when
//! dropped. A ceiling of zero never blocks.

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

struct ThrottleState {
    ceiling: usize,
    in_flight: usize,
}

/// Counting gate shared by every throttled call on a connection.
pub struct Throttle {
    state: Mutex<ThrottleState>,
    room: Condvar,
}

impl Throttle {
    /// Create a throttle with the given ceiling (0 = unlimited).
    pub fn new(ceiling: usize) -> Self {
        Self {
            state: Mutex::new(ThrottleState {
                ceiling,
                in_flight: 0,
            }),
            room: Condvar::new(),
        }
    }

    /// Change the ceiling. Takes effect for the next acquire; waiters are
    /// woken so a raised ceiling lets them through.
    pub fn set_ceiling(&self, ceiling: usize) {
        let mut state = self.state.lock();
        state.ceiling = ceiling;
        drop(state);
        self.room.notify_all();
    }

    /// Current ceiling.
    pub fn ceiling(&self) -> usize {
        self.state.lock().ceiling
    }

    /// Number of permits currently held.
    pub fn in_flight(&self) -> usize {
        self.state.lock().in_flight
    }

    /// Take a slot, waiting until one is free.
    pub fn acquire(self: &Arc<Self>) -> ThrottlePermit {
        let mut state = self.state.lock();
        while state.ceiling > 0 && state.in_flight >= state.ceiling {
            self.room.wait(&mut state);
        }
        state.in_flight += 1;

        ThrottlePermit {
            throttle: Arc::clone(self),
        }
    }

    fn release(&self) {
        let mut state = self.state.lock();
        debug_assert!(state.in_flight > 0, "throttle released more than acquired");
        state.in_flight = state.in_flight.saturating_sub(1);
        drop(state);
        self.room.notify_one();
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(0)
    }
}

/// RAII slot in a [`Throttle`]. Released exactly once, on drop.
pub struct ThrottlePermit {
    throttle: Arc<Throttle>,
}

impl Drop for ThrottlePermit {
    fn drop(&mut self) {
        self.throttle.release();
    }
}

impl std::fmt::Debug for ThrottlePermit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThrottlePermit").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_unlimited_never_blocks() {
        let throttle = Arc::new(Throttle::new(0));
        let permits: Vec<_> = (0..64).map(|_| throttle.acquire()).collect();
        assert_eq!(throttle.in_flight(), 64);
        drop(permits);
        assert_eq!(throttle.in_flight(), 0);
    }

    #[test]
    fn test_blocks_at_ceiling_until_release() {
        let throttle = Arc::new(Throttle::new(2));
        let first = throttle.acquire();
        let _second = throttle.acquire();

        let (tx, rx) = mpsc::channel();
        let waiter = {
            let throttle = Arc::clone(&throttle);
            thread::spawn(move || {
                let _third = throttle.acquire();
                tx.send(()).unwrap();
            })
        };

        // The third caller must still be parked.
        assert!(rx.recv_timeout(Duration::from_millis(150)).is_err());
        assert_eq!(throttle.in_flight(), 2);

        drop(first);
        rx.recv_timeout(Duration::from_secs(5))
            .expect("waiter should proceed after release");
        waiter.join().unwrap();
        assert_eq!(throttle.in_flight(), 1);
    }

    #[test]
    fn test_raising_ceiling_wakes_waiters() {
        let throttle = Arc::new(Throttle::new(1));
        let _held = throttle.acquire();

        let (tx, rx) = mpsc::channel();
        let waiter = {
            let throttle = Arc::clone(&throttle);
            thread::spawn(move || {
                let _permit = throttle.acquire();
                tx.send(()).unwrap();
            })
        };

        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
        throttle.set_ceiling(0);
        rx.recv_timeout(Duration::from_secs(5))
            .expect("unlimited ceiling should release the waiter");
        waiter.join().unwrap();
    }

    #[test]
    fn test_count_never_exceeds_ceiling() {
        let throttle = Arc::new(Throttle::new(3));
        let peak = Arc::new(Mutex::new(0usize));

        let handles: Vec<_> = (0..12)
            .map(|_| {
                let throttle = Arc::clone(&throttle);
                let peak = Arc::clone(&peak);
                thread::spawn(move || {
                    let _permit = throttle.acquire();
                    {
                        let mut peak = peak.lock();
                        *peak = (*peak).max(throttle.in_flight());
                    }
                    thread::sleep(Duration::from_millis(10));
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert!(*peak.lock() <= 3);
        assert_eq!(throttle.in_flight(), 0);
    }
}
