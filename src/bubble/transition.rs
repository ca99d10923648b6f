use glam::DVec2;
use std::time::{Duration, Instant};

/// Values that can be blended for animation
pub trait Interpolate: Copy {
    fn interpolate(&self, other: &Self, t: f64) -> Self;
}

impl Interpolate for f64 {
    fn interpolate(&self, other: &Self, t: f64) -> Self {
        self + (other - self) * t
    }
}

/// Displayed circle of a bubble, in canvas pixels
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Shape {
    pub center: DVec2,
    pub radius: f64,
}

impl Shape {
    pub fn new(center: DVec2, radius: f64) -> Self {
        Self { center, radius }
    }

    /// Hit test. Zero-radius circles cover nothing; tiny ones still cover one dot.
    pub fn contains(&self, point: DVec2) -> bool {
        self.radius > 0.0 && self.center.distance(point) <= self.radius.max(1.0)
    }
}

impl Interpolate for Shape {
    fn interpolate(&self, other: &Self, t: f64) -> Self {
        Shape {
            center: self.center.lerp(other.center, t),
            radius: self.radius.interpolate(&other.radius, t),
        }
    }
}

/// Cubic ease-in-out on `[0, 1]`
pub fn ease_cubic_in_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0) * 2.0;
    if t <= 1.0 {
        t * t * t / 2.0
    } else {
        let t = t - 2.0;
        (t * t * t + 2.0) / 2.0
    }
}

/// Time-based animation between two values
#[derive(Clone, Copy, Debug)]
pub struct Transition<T> {
    from: T,
    to: T,
    start: Instant,
    duration: Duration,
}

impl<T: Interpolate + PartialEq> Transition<T> {
    /// Already at rest on `value`
    pub fn settled(value: T, now: Instant) -> Self {
        Self {
            from: value,
            to: value,
            start: now,
            duration: Duration::ZERO,
        }
    }

    pub fn new(from: T, to: T, now: Instant, duration: Duration) -> Self {
        if from == to {
            return Self::settled(to, now);
        }
        Self {
            from,
            to,
            start: now,
            duration,
        }
    }

    /// Interrupt wherever the animation currently is and head for `to`
    pub fn retarget(&self, to: T, now: Instant, duration: Duration) -> Self {
        Self::new(self.sample(now), to, now, duration)
    }

    /// Eased progress in `[0, 1]`
    fn progress(&self, now: Instant) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.start);
        ease_cubic_in_out(elapsed.as_secs_f64() / self.duration.as_secs_f64())
    }

    pub fn sample(&self, now: Instant) -> T {
        let t = self.progress(now);
        if t >= 1.0 {
            self.to
        } else {
            self.from.interpolate(&self.to, t)
        }
    }

    pub fn target(&self) -> T {
        self.to
    }

    pub fn is_done(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.start) >= self.duration
    }
}
