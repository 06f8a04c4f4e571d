use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayVisibility {
    Hidden,
    Visible { since: Instant },
}

/// Show/auto-hide of the on-screen controls while fullscreen. Only ever
/// reads the clock it is handed, so it is driven by the UI's polling tick.
#[derive(Debug, Clone)]
pub struct OverlayControlState {
    visibility: OverlayVisibility,
    fullscreen: bool,
    timeout: Duration,
}

impl OverlayControlState {
    pub fn new(timeout: Duration) -> Self {
        Self {
            visibility: OverlayVisibility::Hidden,
            fullscreen: false,
            timeout,
        }
    }

    /// Entering fullscreen shows the controls once, then lets them fade
    pub fn enter_fullscreen(&mut self, now: Instant) {
        self.fullscreen = true;
        self.visibility = OverlayVisibility::Visible { since: now };
    }

    pub fn exit_fullscreen(&mut self) {
        self.fullscreen = false;
        self.visibility = OverlayVisibility::Hidden;
    }

    /// Click or pointer activity inside the video area
    pub fn interact(&mut self, now: Instant) {
        if self.fullscreen {
            self.visibility = OverlayVisibility::Visible { since: now };
        }
    }

    /// Polling tick. Returns true when this tick hid the overlay.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.visibility {
            OverlayVisibility::Visible { since }
                if self.fullscreen && now.saturating_duration_since(since) >= self.timeout =>
            {
                self.visibility = OverlayVisibility::Hidden;
                true
            }
            _ => false,
        }
    }

    pub fn visibility(&self) -> OverlayVisibility {
        self.visibility
    }

    pub fn is_visible(&self) -> bool {
        matches!(self.visibility, OverlayVisibility::Visible { .. })
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    /// Windowed mode always shows the controls
    pub fn controls_shown(&self) -> bool {
        !self.fullscreen || self.is_visible()
    }

    /// Time until the next hide is due, for scheduling a repaint
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        match self.visibility {
            OverlayVisibility::Visible { since } if self.fullscreen => {
                Some(self.timeout.saturating_sub(now.saturating_duration_since(since)))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    fn fullscreen_at(t0: Instant) -> OverlayControlState {
        let mut overlay = OverlayControlState::new(Duration::from_secs(5));
        overlay.enter_fullscreen(t0);
        overlay
    }

    #[test]
    fn test_hides_after_timeout() {
        let t0 = Instant::now();
        let mut overlay = fullscreen_at(t0);
        assert!(overlay.is_visible());

        assert!(!overlay.tick(t0 + secs(4.9)));
        assert!(overlay.is_visible());

        assert!(overlay.tick(t0 + secs(5.1)));
        assert_eq!(overlay.visibility(), OverlayVisibility::Hidden);
    }

    #[test]
    fn test_interaction_resets_timer() {
        let t0 = Instant::now();
        let mut overlay = fullscreen_at(t0);

        overlay.interact(t0 + secs(3.0));
        assert!(!overlay.tick(t0 + secs(5.1)));
        assert!(overlay.is_visible());

        assert!(overlay.tick(t0 + secs(8.1)));
        assert!(!overlay.is_visible());
    }

    #[test]
    fn test_click_while_hidden_shows() {
        let t0 = Instant::now();
        let mut overlay = fullscreen_at(t0);
        overlay.tick(t0 + secs(6.0));
        assert!(!overlay.controls_shown());

        overlay.interact(t0 + secs(7.0));
        assert_eq!(overlay.visibility(), OverlayVisibility::Visible { since: t0 + secs(7.0) });
        assert!(overlay.controls_shown());
    }

    #[test]
    fn test_leaving_fullscreen_forces_hidden() {
        let t0 = Instant::now();
        let mut overlay = fullscreen_at(t0);
        overlay.exit_fullscreen();

        assert_eq!(overlay.visibility(), OverlayVisibility::Hidden);
        assert!(overlay.controls_shown());
        assert!(overlay.remaining(t0).is_none());
    }

    #[test]
    fn test_windowed_mode_ignores_interaction_and_ticks() {
        let t0 = Instant::now();
        let mut overlay = OverlayControlState::new(Duration::from_secs(5));
        overlay.interact(t0);
        assert!(!overlay.is_visible());
        assert!(!overlay.tick(t0 + secs(10.0)));
        assert!(overlay.controls_shown());
    }

    #[test]
    fn test_remaining_counts_down() {
        let t0 = Instant::now();
        let overlay = fullscreen_at(t0);
        assert_eq!(overlay.remaining(t0 + secs(2.0)), Some(secs(3.0)));
        assert_eq!(overlay.remaining(t0 + secs(9.0)), Some(Duration::ZERO));
    }
}
