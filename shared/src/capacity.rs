//! Weekly capacity arithmetic for the resource overview.
//!
//! An allocation counts its full weekly hours toward any window it touches;
//! there is no proration by overlap length. Matches the reporting behavior
//! the resource pages have always had.

/// Percentage of a user's weekly capacity consumed by `allocated_hours`,
/// rounded to the nearest integer and capped at 100. A capacity of zero
/// reports zero utilization rather than dividing by it.
pub fn utilization(capacity: i32, allocated_hours: f64) -> i32 {
    if capacity <= 0 {
        return 0;
    }
    let pct = (allocated_hours / capacity as f64 * 100.0).round() as i32;
    pct.min(100)
}

/// Hours still unallocated this week, floored at zero.
pub fn availability(capacity: i32, allocated_hours: f64) -> f64 {
    (capacity as f64 - allocated_hours).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_allocated_is_fifty_percent() {
        assert_eq!(utilization(40, 20.0), 50);
    }

    #[test]
    fn zero_capacity_reports_zero() {
        assert_eq!(utilization(0, 20.0), 0);
        assert_eq!(utilization(-1, 20.0), 0);
    }

    #[test]
    fn utilization_caps_at_one_hundred() {
        assert_eq!(utilization(40, 60.0), 100);
    }

    #[test]
    fn utilization_rounds_to_nearest() {
        // 13 / 40 = 32.5% -> 33
        assert_eq!(utilization(40, 13.0), 33);
        // 12.8 / 40 = 32% exactly
        assert_eq!(utilization(40, 12.8), 32);
    }

    #[test]
    fn availability_floors_at_zero() {
        assert_eq!(availability(40, 20.0), 20.0);
        assert_eq!(availability(40, 60.0), 0.0);
        assert_eq!(availability(0, 5.0), 0.0);
    }
}
