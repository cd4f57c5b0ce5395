// src/supervisor/policy.rs

//! Crash-loop protection.
//!
//! Pure bookkeeping with no timers or IO: the runtime feeds in the current
//! instant and acts on the returned decision.

use std::time::Duration;

use tokio::time::Instant;

use crate::supervisor::SupervisorOptions;

/// What to do after an unexpected exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartDecision {
    /// Start again after `delay`. `attempt` is 1-based within the window.
    Restart { attempt: u32, delay: Duration },
    /// The window's budget is used up; wait for a manual restart.
    GiveUp { max_restarts: u32 },
}

/// Sliding-window restart accounting.
#[derive(Debug, Clone)]
pub struct RestartPolicy {
    max_restarts: u32,
    window: Duration,
    delay: Duration,
    restart_count: u32,
    last_restart_at: Option<Instant>,
}

impl RestartPolicy {
    pub fn new(options: &SupervisorOptions) -> Self {
        Self {
            max_restarts: options.max_restarts,
            window: options.restart_window,
            delay: options.restart_delay,
            restart_count: 0,
            last_restart_at: None,
        }
    }

    pub fn restart_count(&self) -> u32 {
        self.restart_count
    }

    pub fn max_restarts(&self) -> u32 {
        self.max_restarts
    }

    /// Record a crash observed at `now` and decide whether to restart.
    pub fn on_crash(&mut self, now: Instant) -> RestartDecision {
        let stale = match self.last_restart_at {
            Some(last) => now.saturating_duration_since(last) > self.window,
            None => true,
        };
        if stale {
            self.restart_count = 0;
        }

        if self.restart_count >= self.max_restarts {
            return RestartDecision::GiveUp {
                max_restarts: self.max_restarts,
            };
        }

        self.restart_count += 1;
        self.last_restart_at = Some(now);

        RestartDecision::Restart {
            attempt: self.restart_count,
            delay: self.delay,
        }
    }

    /// Forget all history (a manual start opens a fresh window).
    pub fn reset(&mut self) {
        self.restart_count = 0;
        self.last_restart_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RestartPolicy {
        RestartPolicy::new(&SupervisorOptions::default())
    }

    #[test]
    fn five_restarts_then_give_up_inside_window() {
        let mut p = policy();
        let t0 = Instant::now();

        for i in 1..=5u32 {
            let now = t0 + Duration::from_secs(u64::from(i));
            assert_eq!(
                p.on_crash(now),
                RestartDecision::Restart {
                    attempt: i,
                    delay: Duration::from_secs(1)
                }
            );
        }
        assert_eq!(
            p.on_crash(t0 + Duration::from_secs(6)),
            RestartDecision::GiveUp { max_restarts: 5 }
        );
        // Still given up for further crashes in the same window.
        assert!(matches!(
            p.on_crash(t0 + Duration::from_secs(30)),
            RestartDecision::GiveUp { .. }
        ));
    }

    #[test]
    fn window_expiry_resets_the_counter() {
        let mut p = policy();
        let t0 = Instant::now();

        assert!(matches!(p.on_crash(t0), RestartDecision::Restart { attempt: 1, .. }));
        assert!(matches!(
            p.on_crash(t0 + Duration::from_secs(61)),
            RestartDecision::Restart { attempt: 1, .. }
        ));
    }

    #[test]
    fn exactly_window_is_not_stale() {
        let mut p = policy();
        let t0 = Instant::now();

        p.on_crash(t0);
        assert!(matches!(
            p.on_crash(t0 + Duration::from_secs(60)),
            RestartDecision::Restart { attempt: 2, .. }
        ));
    }

    #[test]
    fn reset_clears_history() {
        let mut p = policy();
        let t0 = Instant::now();
        for _ in 0..5 {
            p.on_crash(t0);
        }
        assert!(matches!(p.on_crash(t0), RestartDecision::GiveUp { .. }));

        p.reset();
        assert_eq!(p.restart_count(), 0);
        assert!(matches!(p.on_crash(t0), RestartDecision::Restart { attempt: 1, .. }));
    }
}
