//! Numeric response bodies for the legacy `Test*` RPCs.

use crate::mode::ServiceLimits;

/// Build the `1, 2, 3, …` sequence a legacy response carries.
///
/// In public mode `requested` is ignored and the result is always `cap`
/// elements long. Otherwise the length is `min(requested, cap)`: oversized
/// requests are clamped, never rejected.
pub fn build_numeric_response(requested: u64, public: bool, cap: usize) -> Vec<u64> {
    let len = if public {
        cap as u64
    } else {
        requested.min(cap as u64)
    };

    (1..=len).collect()
}

impl ServiceLimits {
    /// [`build_numeric_response`] with this mode's ceilings.
    pub fn numeric_response(&self, requested: u64) -> Vec<u64> {
        build_numeric_response(requested, self.public, self.response_cap)
    }
}
