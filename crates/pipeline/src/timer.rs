use std::time::{Duration, Instant};

/// Largest delta a single tick may observe. Keeps the simulation from
/// spiralling after a debugger pause or a long suspend.
const MAX_DELTA: Duration = Duration::from_millis(100);

/// Window for snapping a near-target delta onto the target exactly, so a
/// vsynced 60 Hz loop does not slowly drift against a 1/60 fixed step.
const SNAP_TOLERANCE: Duration = Duration::from_micros(250);

/// Timing state handed to each update step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimeSlice {
    /// Seconds covered by this step.
    pub elapsed_seconds: f64,
    /// Seconds since the timer started, inclusive of this step.
    pub total_seconds: f64,
    /// Update ordinal, starting at 1.
    pub frame: u64,
}

/// Update steps owed for one tick. Yields one [`TimeSlice`] per step.
#[derive(Debug)]
pub struct Steps {
    remaining: u32,
    step_seconds: f64,
    total_seconds: f64,
    frame: u64,
}

impl Iterator for Steps {
    type Item = TimeSlice;

    fn next(&mut self) -> Option<TimeSlice> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        self.frame += 1;
        self.total_seconds += self.step_seconds;
        Some(TimeSlice {
            elapsed_seconds: self.step_seconds,
            total_seconds: self.total_seconds,
            frame: self.frame,
        })
    }
}

/// Frame timer with fixed and variable timestep modes.
///
/// In fixed mode each tick yields as many whole target-length steps as the
/// accumulated wall time covers, carrying the remainder forward. In variable
/// mode each tick yields exactly one step of whatever time passed. Time is
/// injected through `now` parameters so tests drive the timer without
/// sleeping.
#[derive(Debug)]
pub struct StepTimer {
    last: Option<Instant>,
    target: Option<Duration>,
    leftover: Duration,
    elapsed: Duration,
    total: Duration,
    frame_count: u64,
    second_counter: Duration,
    frames_this_second: u32,
    frames_per_second: u32,
}

impl StepTimer {
    /// Variable-step timer.
    pub fn new() -> Self {
        Self {
            last: None,
            target: None,
            leftover: Duration::ZERO,
            elapsed: Duration::ZERO,
            total: Duration::ZERO,
            frame_count: 0,
            second_counter: Duration::ZERO,
            frames_this_second: 0,
            frames_per_second: 0,
        }
    }

    /// Fixed-step timer updating once per `target` of wall time.
    pub fn fixed(target: Duration) -> Self {
        let mut timer = Self::new();
        timer.target = Some(target);
        timer
    }

    pub fn is_fixed(&self) -> bool {
        self.target.is_some()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn total_seconds(&self) -> f64 {
        self.total.as_secs_f64()
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    pub fn frames_per_second(&self) -> u32 {
        self.frames_per_second
    }

    /// Forget the time that passed since the previous tick. Call when the
    /// process resumes from suspend so the pause is not counted as one giant
    /// delta.
    pub fn reset_elapsed(&mut self, now: Instant) {
        self.last = Some(now);
        self.leftover = Duration::ZERO;
        self.second_counter = Duration::ZERO;
        self.frames_this_second = 0;
        self.frames_per_second = 0;
    }

    /// Advance to `now` and report the update steps owed.
    pub fn advance(&mut self, now: Instant) -> Steps {
        let mut delta = match self.last {
            Some(last) => now.saturating_duration_since(last),
            None => Duration::ZERO,
        };
        self.last = Some(now);
        self.second_counter += delta;

        if delta > MAX_DELTA {
            delta = MAX_DELTA;
        }

        let before = self.frame_count;
        let steps = match self.target {
            Some(target) => {
                let snapped = if abs_diff(delta, target) < SNAP_TOLERANCE {
                    target
                } else {
                    delta
                };
                self.leftover += snapped;

                let mut count = 0u32;
                while self.leftover >= target {
                    self.leftover -= target;
                    self.elapsed = target;
                    self.total += target;
                    self.frame_count += 1;
                    count += 1;
                }
                Steps {
                    remaining: count,
                    step_seconds: target.as_secs_f64(),
                    total_seconds: self.total.as_secs_f64()
                        - target.as_secs_f64() * f64::from(count),
                    frame: before,
                }
            }
            None => {
                self.elapsed = delta;
                self.total += delta;
                self.leftover = Duration::ZERO;
                self.frame_count += 1;
                Steps {
                    remaining: 1,
                    step_seconds: delta.as_secs_f64(),
                    total_seconds: self.total.as_secs_f64() - delta.as_secs_f64(),
                    frame: before,
                }
            }
        };

        // One frame per tick, however many fixed steps it drained.
        if self.frame_count != before {
            self.frames_this_second += 1;
        }
        if self.second_counter >= Duration::from_secs(1) {
            self.frames_per_second = self.frames_this_second;
            self.frames_this_second = 0;
            self.second_counter = Duration::from_nanos(
                (self.second_counter.as_nanos() % 1_000_000_000) as u64,
            );
        }

        steps
    }
}

impl Default for StepTimer {
    fn default() -> Self {
        Self::new()
    }
}

fn abs_diff(a: Duration, b: Duration) -> Duration {
    if a > b {
        a - b
    } else {
        b - a
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn first_tick_observes_no_time() {
        let mut timer = StepTimer::new();
        let slices: Vec<_> = timer.advance(Instant::now()).collect();
        assert_eq!(slices.len(), 1);
        assert_eq!(slices[0].elapsed_seconds, 0.0);
        assert_eq!(timer.frame_count(), 1);
    }

    #[test]
    fn variable_step_accumulates_deltas() {
        let mut timer = StepTimer::new();
        let start = Instant::now();
        timer.advance(start).for_each(drop);
        timer.advance(start + ms(16)).for_each(drop);
        timer.advance(start + ms(48)).for_each(drop);
        assert!((timer.total_seconds() - 0.048).abs() < 1e-9);
        assert_eq!(timer.frame_count(), 3);
    }

    #[test]
    fn fixed_step_yields_whole_steps_and_carries_remainder() {
        let mut timer = StepTimer::fixed(ms(10));
        let start = Instant::now();
        timer.advance(start).for_each(drop);

        let slices: Vec<_> = timer.advance(start + ms(35)).collect();
        assert_eq!(slices.len(), 3);
        for slice in &slices {
            assert!((slice.elapsed_seconds - 0.010).abs() < 1e-9);
        }
        assert_eq!(timer.frame_count(), 3);

        // 5 ms carried over; 5 more complete the fourth step.
        let slices: Vec<_> = timer.advance(start + ms(40)).collect();
        assert_eq!(slices.len(), 1);
        assert_eq!(timer.frame_count(), 4);
    }

    #[test]
    fn fixed_step_slices_report_running_totals() {
        let mut timer = StepTimer::fixed(ms(10));
        let start = Instant::now();
        timer.advance(start).for_each(drop);
        let slices: Vec<_> = timer.advance(start + ms(20)).collect();
        assert_eq!(slices.len(), 2);
        assert!((slices[0].total_seconds - 0.010).abs() < 1e-9);
        assert!((slices[1].total_seconds - 0.020).abs() < 1e-9);
        assert_eq!(slices[0].frame, 1);
        assert_eq!(slices[1].frame, 2);
    }

    #[test]
    fn near_target_deltas_snap_to_the_target() {
        let mut timer = StepTimer::fixed(Duration::from_micros(16_667));
        let start = Instant::now();
        timer.advance(start).for_each(drop);
        // 16.7 ms is within the snap window of 16.667 ms.
        let slices: Vec<_> = timer.advance(start + Duration::from_micros(16_700)).collect();
        assert_eq!(slices.len(), 1);
        assert!((timer.total_seconds() - 16_667e-6).abs() < 1e-9);
    }

    #[test]
    fn large_deltas_are_clamped() {
        let mut timer = StepTimer::new();
        let start = Instant::now();
        timer.advance(start).for_each(drop);
        timer.advance(start + Duration::from_secs(5)).for_each(drop);
        assert!((timer.total_seconds() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn reset_elapsed_swallows_a_pause() {
        let mut timer = StepTimer::fixed(ms(10));
        let start = Instant::now();
        timer.advance(start).for_each(drop);
        timer.advance(start + ms(10)).for_each(drop);
        let total_before = timer.total_seconds();

        // Suspend for two seconds, then resume.
        timer.reset_elapsed(start + ms(2_010));
        let slices: Vec<_> = timer.advance(start + ms(2_010)).collect();
        assert!(slices.is_empty());
        assert_eq!(timer.total_seconds(), total_before);

        timer.advance(start + ms(2_020)).for_each(drop);
        assert!((timer.total_seconds() - total_before - 0.010).abs() < 1e-9);
    }

    #[test]
    fn frame_counter_starts_at_zero() {
        let timer = StepTimer::fixed(ms(10));
        assert_eq!(timer.frame_count(), 0);
    }

    #[test]
    fn fps_counts_ticks_not_catchup_steps() {
        let mut timer = StepTimer::fixed(ms(10));
        let start = Instant::now();
        timer.advance(start).for_each(drop);
        timer.advance(start + ms(100)).for_each(drop);
        // A one-second stall owes ten clamped steps but renders one frame.
        timer.advance(start + ms(1_100)).for_each(drop);
        assert_eq!(timer.frame_count(), 20);
        assert_eq!(timer.frames_per_second(), 2);
    }

    #[test]
    fn catchup_is_bounded_by_the_delta_clamp() {
        let mut timer = StepTimer::fixed(Duration::from_millis(1));
        let start = Instant::now();
        timer.advance(start).for_each(drop);
        let slices: Vec<_> = timer.advance(start + Duration::from_secs(30)).collect();
        assert_eq!(slices.len(), 100);
        assert_eq!(timer.frame_count(), 100);
    }
}
