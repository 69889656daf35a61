//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Absolute difference between two angles in radians.
///
/// No wrapping is applied, so angles either side of the +/-pi discontinuity
/// give a difference close to 2pi.
pub fn abs_ang_diff<T>(a: T, b: T) -> T
where
    T: Float
{
    (a - b).abs()
}
