//! Per-frame lerp toward a moving target
//!
//! Used by the pointer glow: every frame the current position covers a fixed
//! fraction of the remaining distance to the last observed pointer position.

use super::timing::lerp;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Follow state: `current` chases `target`
#[derive(Debug, Clone)]
pub struct Follow {
    current: Point,
    target: Point,
    /// Fraction of the remaining distance covered per frame, in [0, 1]
    factor: f64,
}

impl Follow {
    pub fn new(factor: f64) -> Self {
        Self {
            current: Point::default(),
            target: Point::default(),
            factor: factor.clamp(0.0, 1.0),
        }
    }

    /// Set the position to chase
    pub fn set_target(&mut self, target: Point) {
        self.target = target;
    }

    /// Place both current and target at `point` (no motion)
    pub fn jump_to(&mut self, point: Point) {
        self.current = point;
        self.target = point;
    }

    #[inline]
    pub fn current(&self) -> Point {
        self.current
    }

    #[inline]
    pub fn target(&self) -> Point {
        self.target
    }

    /// Advance one frame and return the new position
    pub fn update(&mut self) -> Point {
        self.current = Point::new(
            lerp(self.current.x, self.target.x, self.factor),
            lerp(self.current.y, self.target.y, self.factor),
        );
        self.current
    }

    /// Check if the remaining distance is below `epsilon`
    pub fn is_settled(&self, epsilon: f64) -> bool {
        self.current.distance(&self.target) < epsilon
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_step_covers_factor() {
        let mut follow = Follow::new(0.1);
        follow.set_target(Point::new(100.0, 50.0));
        let p = follow.update();
        assert!((p.x - 10.0).abs() < 1e-9);
        assert!((p.y - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_converges() {
        let mut follow = Follow::new(0.1);
        follow.set_target(Point::new(400.0, 300.0));
        let mut last = f64::MAX;
        for _ in 0..200 {
            follow.update();
            let d = follow.current().distance(&follow.target());
            assert!(d <= last);
            last = d;
        }
        assert!(follow.is_settled(0.01));
    }

    #[test]
    fn test_jump_to() {
        let mut follow = Follow::new(0.5);
        follow.jump_to(Point::new(3.0, 4.0));
        assert!(follow.is_settled(1e-12));
        assert_eq!(follow.update(), Point::new(3.0, 4.0));
    }
}
