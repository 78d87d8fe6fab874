//! Two-handle range selector.
//!
//! Pointer motion is converted into a step-quantised `(lo, hi)` pair. The
//! handles can never cross: the low handle stays at least one `step` below the
//! high handle and vice versa, so an ordered pair is guaranteed by
//! construction.

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Handle {
    Min,
    Max,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RangeSelector {
    min: f64,
    max: f64,
    step: f64,
    values: (f64, f64),
    dragging: Option<Handle>,
}

impl RangeSelector {
    /// A selector spanning the whole `[min, max]` track.
    pub fn new(min: f64, max: f64, step: f64) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        let step = if step > 0.0 { step } else { 1.0 };
        Self {
            min,
            max,
            step,
            values: (min, max),
            dragging: None,
        }
    }

    /// Selector starting from a controlled value.
    pub fn with_value(min: f64, max: f64, step: f64, value: (f64, f64)) -> Self {
        let mut selector = Self::new(min, max, step);
        selector.values = selector.clamp_pair(value);
        selector
    }

    pub fn values(&self) -> (f64, f64) {
        self.values
    }

    pub fn bounds(&self) -> (f64, f64) {
        (self.min, self.max)
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging.is_some()
    }

    /// Where `value` sits along the track, in percent.
    pub fn percent(&self, value: f64) -> f64 {
        if self.max <= self.min {
            return 0.0;
        }
        ((value - self.min) / (self.max - self.min) * 100.0).clamp(0.0, 100.0)
    }

    /// Overwrite the pair from an external value. Ignored mid-drag.
    ///
    /// Returns whether the value was taken.
    pub fn set_value(&mut self, value: (f64, f64)) -> bool {
        if self.dragging.is_some() {
            return false;
        }
        self.values = self.clamp_pair(value);
        true
    }

    /// Normalise an arbitrary pair: bounded, step-quantised and ordered.
    pub fn clamp_pair(&self, (lo, hi): (f64, f64)) -> (f64, f64) {
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        let lo = self.quantize(lo);
        let hi = self.quantize(hi);
        if hi - lo >= self.step || self.max - self.min < self.step {
            return (lo, hi);
        }
        // Collapsed pair: widen by one step, preferring to move the upper end.
        if hi + self.step <= self.max {
            (lo, hi + self.step)
        } else {
            (self.max - self.step, self.max)
        }
    }

    /// Start dragging `handle` from `pointer_x` on a track `track_width` wide.
    pub fn begin_drag(&mut self, handle: Handle, pointer_x: f64, track_width: f64) -> DragSession {
        self.dragging = Some(handle);
        let start_value = match handle {
            Handle::Min => self.values.0,
            Handle::Max => self.values.1,
        };
        DragSession {
            handle,
            start_x: pointer_x,
            start_value,
            track_width,
        }
    }

    fn quantize(&self, value: f64) -> f64 {
        let rounded = (value / self.step).round() * self.step;
        rounded.clamp(self.min, self.max)
    }
}

/// One pointer-down .. pointer-up interaction.
///
/// Consumed by [`DragSession::end`], so no drag state outlives the release.
#[derive(Debug)]
#[must_use = "a drag session must be ended to release the handle"]
pub struct DragSession {
    handle: Handle,
    start_x: f64,
    start_value: f64,
    track_width: f64,
}

impl DragSession {
    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// Apply a pointer move and return the new `(lo, hi)` pair.
    pub fn move_to(&self, selector: &mut RangeSelector, pointer_x: f64) -> (f64, f64) {
        if self.track_width <= 0.0 {
            return selector.values;
        }

        let percentage_moved = (pointer_x - self.start_x) / self.track_width;
        let delta = (selector.max - selector.min) * percentage_moved;
        let candidate = selector.quantize(self.start_value + delta);

        match self.handle {
            Handle::Min => {
                let other = selector.values.1;
                selector.values.0 = candidate.min(other - selector.step).max(selector.min);
            }
            Handle::Max => {
                let other = selector.values.0;
                selector.values.1 = candidate.max(other + selector.step).min(selector.max);
            }
        }
        selector.values
    }

    pub fn end(self, selector: &mut RangeSelector) -> (f64, f64) {
        selector.dragging = None;
        selector.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIDTH: f64 = 390.0;

    fn size_selector() -> RangeSelector {
        RangeSelector::new(500.0, 20000.0, 100.0)
    }

    #[test]
    fn min_handle_clamps_to_max_minus_step() {
        let mut selector = size_selector();
        let drag = selector.begin_drag(Handle::Min, 0.0, WIDTH);
        let (lo, hi) = drag.move_to(&mut selector, WIDTH * 3.0);
        assert_eq!(lo, 19900.0);
        assert_eq!(hi, 20000.0);
        drag.end(&mut selector);
    }

    #[test]
    fn max_handle_cannot_cross_min_handle() {
        let mut selector = RangeSelector::with_value(500.0, 20000.0, 100.0, (5000.0, 15000.0));
        let drag = selector.begin_drag(Handle::Max, WIDTH, WIDTH);
        let (lo, hi) = drag.move_to(&mut selector, -WIDTH);
        assert_eq!(lo, 5000.0);
        assert_eq!(hi, 5100.0);
        drag.end(&mut selector);
    }

    #[test]
    fn percent_tracks_position_on_the_rail() {
        let selector = size_selector();
        assert_eq!(selector.percent(500.0), 0.0);
        assert_eq!(selector.percent(10250.0), 50.0);
        assert_eq!(selector.percent(25000.0), 100.0);
    }

    #[test]
    fn moves_are_step_quantised() {
        let mut selector = size_selector();
        let drag = selector.begin_drag(Handle::Min, 0.0, WIDTH);
        // 19500 * (10 / 390) = 500 -> 1000
        let (lo, _) = drag.move_to(&mut selector, 10.0);
        assert_eq!(lo, 1000.0);
        // 19500 * (12 / 390) = 600 -> 1100
        let (lo, _) = drag.move_to(&mut selector, 12.0);
        assert_eq!(lo, 1100.0);
        drag.end(&mut selector);
    }

    #[test]
    fn invariants_hold_over_drag_sequences() {
        let mut selector = size_selector();
        let moves = [-500.0, 40.0, 9000.0, 120.0, -3.0, 389.0, 200.0, -1000.0, 77.0];
        for (i, x) in moves.iter().enumerate() {
            let handle = if i % 2 == 0 { Handle::Min } else { Handle::Max };
            let drag = selector.begin_drag(handle, 100.0, WIDTH);
            for dx in [*x, x / 2.0, x * 1.5] {
                let (lo, hi) = drag.move_to(&mut selector, 100.0 + dx);
                assert!(lo <= hi - selector.step(), "lo={lo} hi={hi}");
                assert!(hi >= lo + selector.step(), "lo={lo} hi={hi}");
                assert!((500.0..=20000.0).contains(&lo));
                assert!((500.0..=20000.0).contains(&hi));
            }
            drag.end(&mut selector);
        }
    }

    #[test]
    fn external_value_is_ignored_while_dragging() {
        let mut selector = size_selector();
        let drag = selector.begin_drag(Handle::Max, 0.0, WIDTH);
        assert!(!selector.set_value((1000.0, 2000.0)));
        assert_eq!(selector.values(), (500.0, 20000.0));
        drag.end(&mut selector);

        assert!(selector.set_value((1000.0, 2000.0)));
        assert_eq!(selector.values(), (1000.0, 2000.0));
    }

    #[test]
    fn zero_width_track_is_a_no_op() {
        let mut selector = size_selector();
        let drag = selector.begin_drag(Handle::Min, 0.0, 0.0);
        assert_eq!(drag.move_to(&mut selector, 50.0), (500.0, 20000.0));
        drag.end(&mut selector);
    }

    #[test]
    fn clamp_pair_orders_and_bounds_values() {
        let selector = RangeSelector::new(0.0, 1000.0, 10.0);
        assert_eq!(selector.clamp_pair((900.0, 100.0)), (100.0, 900.0));
        assert_eq!(selector.clamp_pair((-50.0, 5000.0)), (0.0, 1000.0));
        assert_eq!(selector.clamp_pair((400.0, 400.0)), (400.0, 410.0));
        assert_eq!(selector.clamp_pair((1000.0, 1000.0)), (990.0, 1000.0));
    }
}
