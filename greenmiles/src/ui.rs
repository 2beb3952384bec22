//! Visibility of the on-screen controls.
//!
//! Holding anywhere for [LONG_PRESS] hides the controls until the press ends.
//! Left alone for [IDLE_FADE] they fade to [FADED]. All of it is computed from
//! timestamps, so there is no timer to cancel.

use std::time::{Duration, Instant};

pub const LONG_PRESS: Duration = Duration::from_millis(600);
pub const IDLE_FADE: Duration = Duration::from_secs(3);
/// Opacity of idle controls.
pub const FADED: f32 = 0.18;

#[derive(Debug, Clone)]
pub struct Visibility {
    hidden: bool,
    last_activity: Instant,
    pressed_at: Option<Instant>,
}

impl Visibility {
    pub fn new(now: Instant) -> Self {
        Visibility {
            hidden: false,
            last_activity: now,
            pressed_at: None,
        }
    }

    /// Any touch or pointer movement.
    pub fn activity(&mut self, now: Instant) {
        self.last_activity = now;
    }

    pub fn press(&mut self, now: Instant) {
        self.activity(now);
        self.pressed_at = Some(now);
    }

    /// End of a press; the controls are shown again. Returns true if the
    /// press was long, in which case it is not a tap.
    pub fn release(&mut self, now: Instant) -> bool {
        self.activity(now);
        self.hidden = false;
        self.pressed_at
            .take()
            .is_some_and(|at| now.saturating_duration_since(at) >= LONG_PRESS)
    }

    pub fn toggle(&mut self) {
        self.hidden = !self.hidden;
        tracing::debug!("controls {}", if self.hidden { "hidden" } else { "shown" });
    }

    /// Whether the controls are hidden at `now`, by toggle or by a held press.
    pub fn is_hidden(&self, now: Instant) -> bool {
        self.hidden
            || self
                .pressed_at
                .is_some_and(|at| now.saturating_duration_since(at) >= LONG_PRESS)
    }

    /// Opacity of the controls at `now`.
    pub fn opacity(&self, now: Instant) -> f32 {
        if self.is_hidden(now) {
            0.0
        } else if now.saturating_duration_since(self.last_activity) >= IDLE_FADE {
            FADED
        } else {
            1.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn fades_when_idle() {
        let t0 = Instant::now();
        let mut v = Visibility::new(t0);
        assert_eq!(v.opacity(t0 + ms(2999)), 1.0);
        assert_eq!(v.opacity(t0 + ms(3000)), FADED);
        v.activity(t0 + ms(3500));
        assert_eq!(v.opacity(t0 + ms(3600)), 1.0);
    }

    #[test]
    fn held_press_hides_until_release() {
        let t0 = Instant::now();
        let mut v = Visibility::new(t0);
        v.press(t0);
        assert_eq!(v.opacity(t0 + ms(599)), 1.0);
        assert!(!v.release(t0 + ms(599)), "short tap");
        assert!(!v.is_hidden(t0 + ms(599)));

        v.press(t0 + ms(1000));
        assert_eq!(v.opacity(t0 + ms(1599)), 1.0);
        assert_eq!(v.opacity(t0 + ms(1600)), 0.0, "hidden while still held");
        assert_eq!(v.opacity(t0 + ms(9000)), 0.0, "held past the idle fade");
        assert!(v.release(t0 + ms(9100)), "long press is not a tap");
        assert!(!v.is_hidden(t0 + ms(9100)));
        assert_eq!(v.opacity(t0 + ms(9200)), 1.0);
    }

    #[test]
    fn toggle_hides_until_next_release() {
        let t0 = Instant::now();
        let mut v = Visibility::new(t0);
        v.toggle();
        assert_eq!(v.opacity(t0 + ms(100)), 0.0);
        assert_eq!(v.opacity(t0 + ms(5000)), 0.0);
        v.toggle();
        assert_eq!(v.opacity(t0 + ms(100)), 1.0);

        v.toggle();
        v.press(t0 + ms(200));
        assert!(!v.release(t0 + ms(300)));
        assert_eq!(v.opacity(t0 + ms(300)), 1.0);
    }

    #[test]
    fn release_without_press() {
        let t0 = Instant::now();
        let mut v = Visibility::new(t0);
        assert!(!v.release(t0 + ms(5000)));
        assert_eq!(v.opacity(t0 + ms(5000)), 1.0);
    }
}
