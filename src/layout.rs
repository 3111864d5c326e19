// layout.rs — fixed-frame / fullscreen switching for the embedded variant

use egui::{vec2, Rect};
use std::time::{Duration, Instant};

/// Size of the viewer frame when not fullscreen, in logical points.
pub const EMBEDDED_FRAME: egui::Vec2 = egui::Vec2 { x: 960.0, y: 540.0 };

/// Tracks the fullscreen flag and schedules a single viewer size recompute
/// once the layout has settled.
#[derive(Debug)]
pub struct LayoutController {
    fullscreen: bool,
    delay: Duration,
    pending: Option<Instant>,
}

impl LayoutController {
    pub fn new(delay: Duration) -> Self {
        Self {
            fullscreen: false,
            delay,
            pending: None,
        }
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    /// Flip the flag. A toggle inside a pending window pushes the deadline
    /// back, so a burst of toggles produces exactly one recompute.
    pub fn toggle(&mut self, now: Instant) -> bool {
        self.fullscreen = !self.fullscreen;
        self.pending = Some(now + self.delay);
        self.fullscreen
    }

    /// Push the recompute back to `now + delay` without touching the flag.
    /// Window resizes in the embedded frame go through here so the viewer is
    /// only re-measured from `poll`.
    pub fn schedule(&mut self, now: Instant) {
        self.pending = Some(now + self.delay);
    }

    /// `true` once per settled toggle, when the delay has elapsed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.pending {
            Some(deadline) if now >= deadline => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Viewer frame for the current state inside `screen` (logical points).
    pub fn frame(&self, screen: Rect) -> Rect {
        if self.fullscreen {
            return screen;
        }
        let size = vec2(
            EMBEDDED_FRAME.x.min(screen.width()),
            EMBEDDED_FRAME.y.min(screen.height()),
        );
        Rect::from_center_size(screen.center(), size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::pos2;

    const DELAY: Duration = Duration::from_millis(300);

    #[test]
    fn recompute_fires_once_after_delay() {
        let start = Instant::now();
        let mut layout = LayoutController::new(DELAY);
        assert!(layout.toggle(start));
        assert!(!layout.poll(start + Duration::from_millis(299)));
        assert!(layout.poll(start + DELAY));
        assert!(!layout.poll(start + Duration::from_secs(5)));
    }

    #[test]
    fn burst_of_toggles_yields_one_recompute_with_last_state() {
        let start = Instant::now();
        let mut layout = LayoutController::new(DELAY);
        layout.toggle(start);
        layout.toggle(start + Duration::from_millis(100));
        layout.toggle(start + Duration::from_millis(200));
        assert!(layout.is_fullscreen());

        let fired = (0..20)
            .map(|i| start + Duration::from_millis(i * 50))
            .filter(|&t| layout.poll(t))
            .count();
        assert_eq!(fired, 1);
        assert!(!layout.is_pending());
    }

    #[test]
    fn resizes_after_a_toggle_still_fire_once() {
        let start = Instant::now();
        let mut layout = LayoutController::new(DELAY);
        layout.toggle(start);
        // The window reports its new size a few times while settling.
        layout.schedule(start + Duration::from_millis(20));
        layout.schedule(start + Duration::from_millis(40));

        assert!(!layout.poll(start + DELAY));
        assert!(layout.poll(start + Duration::from_millis(340)));
        assert!(!layout.poll(start + Duration::from_secs(2)));
        assert!(layout.is_fullscreen());
    }

    #[test]
    fn resize_without_toggle_schedules_a_recompute() {
        let start = Instant::now();
        let mut layout = LayoutController::new(DELAY);
        assert!(!layout.is_pending());
        layout.schedule(start);
        assert!(layout.is_pending());
        assert!(layout.poll(start + DELAY));
        assert!(!layout.is_fullscreen());
    }

    #[test]
    fn frame_is_fixed_or_full() {
        let screen = Rect::from_min_size(pos2(0.0, 0.0), vec2(1920.0, 1080.0));
        let mut layout = LayoutController::new(DELAY);
        let frame = layout.frame(screen);
        assert_eq!(frame.size(), EMBEDDED_FRAME);
        assert_eq!(frame.center(), screen.center());

        layout.toggle(Instant::now());
        assert_eq!(layout.frame(screen), screen);
    }

    #[test]
    fn fixed_frame_shrinks_to_small_windows() {
        let screen = Rect::from_min_size(pos2(0.0, 0.0), vec2(640.0, 480.0));
        let layout = LayoutController::new(DELAY);
        assert_eq!(layout.frame(screen), screen);
    }
}
