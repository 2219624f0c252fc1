//! Load-based worker count heuristic.

/// Lower bound on the number of workers.
pub const MIN_CONCURRENCY: usize = 2;

/// Upper bound on the unloaded worker count.
pub const MAX_BASE_CONCURRENCY: usize = 16;

/// Recommended number of workers for the given host load.
///
/// `base = clamp(floor(cores * 0.70), 2, 16)`, then scaled down as CPU
/// utilisation rises: below 25% use `base`, below 50% use 80% of it, below
/// 70% use 55% of it, otherwise `2`. Never less than `2`.
pub fn recommended_concurrency(core_count: usize, cpu_utilization_percent: f32) -> usize {
    let base = ((core_count as f64 * 0.70).floor() as usize).clamp(MIN_CONCURRENCY, MAX_BASE_CONCURRENCY);

    // NaN compares false everywhere and lands on the most conservative branch.
    if cpu_utilization_percent < 25.0 {
        base
    } else if cpu_utilization_percent < 50.0 {
        scaled(base, 0.80)
    } else if cpu_utilization_percent < 70.0 {
        scaled(base, 0.55)
    } else {
        MIN_CONCURRENCY
    }
}

fn scaled(base: usize, factor: f64) -> usize {
    ((base as f64 * factor).floor() as usize).max(MIN_CONCURRENCY)
}
