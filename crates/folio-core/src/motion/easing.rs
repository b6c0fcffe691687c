//! Easing curves over clamped progress

pub use crate::config::EasingType;

impl EasingType {
    /// Eased progress for `t`, clamped to [0, 1]. `None` holds at 0 until the end.
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        let remaining = 1.0 - t;
        match self {
            EasingType::None if t < 1.0 => 0.0,
            EasingType::None => 1.0,
            EasingType::Linear => t,
            EasingType::Cubic => 1.0 - remaining.powi(3),
            EasingType::Quintic => 1.0 - remaining.powi(5),
            EasingType::EaseOut if t >= 1.0 => 1.0,
            EasingType::EaseOut => 1.0 - 2.0_f64.powf(-10.0 * t),
        }
    }
}

/// Easing used by a tween: a named curve or a caller-supplied function
#[derive(Debug, Clone, Copy)]
pub enum Easing {
    Preset(EasingType),
    Custom(fn(f64) -> f64),
}

impl Default for Easing {
    fn default() -> Self {
        Easing::Preset(EasingType::Cubic)
    }
}

impl From<EasingType> for Easing {
    fn from(kind: EasingType) -> Self {
        Easing::Preset(kind)
    }
}

impl Easing {
    pub fn apply(&self, t: f64) -> f64 {
        match self {
            Easing::Preset(kind) => kind.apply(t),
            Easing::Custom(f) => f(t.clamp(0.0, 1.0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Counter text a 0 -> 40 count-up shows `elapsed_ms` into a 2s tween
    fn counter_at(easing: EasingType, elapsed_ms: f64) -> i64 {
        (40.0 * easing.apply(elapsed_ms / 2000.0)).round() as i64
    }

    #[test]
    fn test_counter_values_per_curve() {
        assert_eq!(counter_at(EasingType::Linear, 500.0), 10);
        // 1 - 0.75^3 = 0.578
        assert_eq!(counter_at(EasingType::Cubic, 500.0), 23);
        // 1 - 0.75^5 = 0.763
        assert_eq!(counter_at(EasingType::Quintic, 500.0), 31);
        assert_eq!(counter_at(EasingType::None, 1984.0), 0);
        assert_eq!(counter_at(EasingType::None, 2000.0), 40);
    }

    #[test]
    fn test_every_curve_lands_on_target_without_overshoot() {
        for easing in [
            EasingType::None,
            EasingType::Linear,
            EasingType::Cubic,
            EasingType::Quintic,
            EasingType::EaseOut,
        ] {
            let frames: Vec<i64> = (0..=125)
                .map(|frame| counter_at(easing, frame as f64 * 16.0))
                .collect();
            assert!(frames.windows(2).all(|w| w[0] <= w[1]), "{:?} went backwards", easing);
            assert!(frames.iter().all(|v| *v <= 40), "{:?} overshot", easing);
            assert_eq!(counter_at(easing, 2000.0), 40, "{:?} final frame", easing);
        }
    }

    #[test]
    fn test_cubic_is_the_default_tween_curve() {
        assert!((Easing::default().apply(0.5) - 0.875).abs() < 1e-12);
    }

    #[test]
    fn test_custom_input_is_clamped() {
        let easing = Easing::Custom(|t| t * t);
        assert_eq!(easing.apply(2.0), 1.0);
        assert_eq!(easing.apply(-1.0), 0.0);
    }
}
