use std::hint::black_box;

use crate::config::CpuConfig;

/// Burn CPU on a bounded floating-point recurrence.
///
/// The unit id does not feed into the arithmetic. Returns the final
/// accumulator so callers can keep it alive; it never exceeds
/// `cfg.reset_threshold`.
pub fn stress_cpu(_id: usize, cfg: &CpuConfig) -> f64 {
    let mut x = 0.0f64;

    for i in 0..cfg.iterations {
        x += (i % 97) as f64 * 0.000001;
        x *= 1.0000001;

        // keeps x away from overflow and the denormal range
        if x > cfg.reset_threshold {
            x = 0.0;
        }
        x = black_box(x);
    }

    x
}
