//! Divider sanitization.
//!
//! While the user drags, dividers may cross or overlap. Before the image is
//! sliced they are sorted and spread out so that no tile ends up zero pixels
//! wide or tall.

use super::Dividers;
use tracing::debug;

/// Smallest allowed gap fraction after clamping.
pub const MIN_GAP_FLOOR: f32 = 0.0001;
/// Largest allowed gap fraction after clamping.
pub const MIN_GAP_CEIL: f32 = 0.05;
/// Minimum tile thickness, in source pixels, used when splitting.
pub const MIN_GAP_PIXELS: f32 = 2.0;

/// Converts a crop span in pixels into the gap fraction used at split time.
///
/// # Example
/// ```
/// use gridsplit::min_gap_for_span;
///
/// assert_eq!(min_gap_for_span(200), 0.01);
/// assert_eq!(min_gap_for_span(0), 2.0);
/// ```
pub fn min_gap_for_span(span_pixels: u32) -> f32 {
    MIN_GAP_PIXELS / span_pixels.max(1) as f32
}

/// Sorts dividers by value and then sanitizes them.
///
/// Non-finite positions are discarded.
pub fn sanitize_dividers(dividers: &[f32], min_gap_fraction: f32) -> Dividers {
    let mut sorted: Dividers = dividers.iter().copied().filter(|d| d.is_finite()).collect();
    sorted.sort_by(f32::total_cmp);
    sanitize_sorted_dividers(&sorted, min_gap_fraction)
}

/// Sanitizes dividers that are already sorted ascending.
///
/// `min_gap_fraction` is clamped to `[0.0001, 0.05]`. Each divider is clamped
/// into `[gap, 1 - gap]` and pushed to at least `gap` past the previously
/// accepted divider. A divider that would land within `gap` of the upper
/// bound is dropped, so the result may be shorter than the input.
///
/// # Example
/// ```
/// use gridsplit::sanitize_sorted_dividers;
///
/// let out = sanitize_sorted_dividers(&[0.0, 0.5, 0.5], 0.05);
/// assert_eq!(out.as_slice(), &[0.05, 0.5, 0.55]);
///
/// let out = sanitize_sorted_dividers(&[0.9, 0.99], 0.05);
/// assert_eq!(out.as_slice(), &[0.9]);
/// ```
pub fn sanitize_sorted_dividers(sorted_dividers: &[f32], min_gap_fraction: f32) -> Dividers {
    let mut out = Dividers::new();
    if sorted_dividers.is_empty() {
        return out;
    }
    let min_gap = if min_gap_fraction.is_nan() {
        MIN_GAP_FLOOR
    } else {
        min_gap_fraction.clamp(MIN_GAP_FLOOR, MIN_GAP_CEIL)
    };
    let upper = 1.0 - min_gap;
    let mut last = 0.0_f32;

    for &position in sorted_dividers {
        let clamped = position.clamp(min_gap, upper);
        let adjusted = if out.is_empty() {
            clamped
        } else {
            clamped.max(last + min_gap)
        };
        if adjusted >= upper {
            debug!("Dropping divider at {} (adjusted to {})", position, adjusted);
            continue;
        }
        out.push(adjusted);
        last = adjusted;
    }
    out
}
