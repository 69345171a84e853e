//! Metabolic score computation.

use crate::IntensityLevel;

/// Score a session: `floor(total_reps × multiplier × completed/planned × 10)`.
///
/// Multiplication is performed left to right in `f64` so results match the
/// values already stored in existing archives. A session with no planned
/// sets scores zero.
pub fn metabolic_score(
    total_reps: u32,
    intensity: IntensityLevel,
    completed_sets: u32,
    planned_sets: u32,
) -> u32 {
    if planned_sets == 0 {
        return 0;
    }
    let completion = f64::from(completed_sets) / f64::from(planned_sets);
    let raw = f64::from(total_reps) * intensity.multiplier() * completion * 10.0;
    raw.floor().max(0.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Earlier scoring variant without a completion factor, where only High
    /// had its own multiplier and everything else used 1.1.
    fn legacy_score(total_reps: u32, intensity: IntensityLevel) -> u32 {
        let multiplier = if intensity == IntensityLevel::High { 1.5 } else { 1.1 };
        (f64::from(total_reps) * multiplier * 10.0).floor() as u32
    }

    #[test]
    fn test_medium_reference_value() {
        // [10, 12, 11] at Medium over three sets
        assert_eq!(metabolic_score(33, IntensityLevel::Medium, 3, 3), 363);
    }

    #[test]
    fn test_multipliers() {
        assert_eq!(metabolic_score(20, IntensityLevel::High, 4, 4), 300);
        assert_eq!(metabolic_score(20, IntensityLevel::Medium, 4, 4), 220);
        assert_eq!(metabolic_score(20, IntensityLevel::Low, 4, 4), 160);
    }

    #[test]
    fn test_partial_completion_scales_score() {
        assert_eq!(metabolic_score(20, IntensityLevel::High, 2, 4), 150);
        assert_eq!(metabolic_score(20, IntensityLevel::High, 0, 4), 0);
    }

    #[test]
    fn test_zero_reps_and_zero_sets() {
        assert_eq!(metabolic_score(0, IntensityLevel::High, 3, 3), 0);
        assert_eq!(metabolic_score(10, IntensityLevel::High, 0, 0), 0);
    }

    #[test]
    fn test_floor_applied() {
        // 7 × 0.8 × 10 lands just above 56 in f64
        assert_eq!(metabolic_score(7, IntensityLevel::Low, 1, 1), 56);
        // 6 × 1.5 × 0.25 × 10 = 22.5
        assert_eq!(metabolic_score(6, IntensityLevel::High, 1, 4), 22);
        // 1 × 1.1 × (2/3) × 10 = 7.33...
        assert_eq!(metabolic_score(1, IntensityLevel::Medium, 2, 3), 7);
    }

    #[test]
    fn test_legacy_formula_agrees_for_full_medium_and_high_sessions() {
        for reps in [0, 1, 7, 33, 120] {
            assert_eq!(
                metabolic_score(reps, IntensityLevel::Medium, 3, 3),
                legacy_score(reps, IntensityLevel::Medium)
            );
            assert_eq!(
                metabolic_score(reps, IntensityLevel::High, 5, 5),
                legacy_score(reps, IntensityLevel::High)
            );
        }
    }

    #[test]
    fn test_legacy_formula_diverges_for_low_intensity() {
        // The legacy variant scored Low like Medium
        assert_eq!(legacy_score(20, IntensityLevel::Low), 220);
        assert_eq!(metabolic_score(20, IntensityLevel::Low, 2, 2), 160);
    }
}
