/*!
 * Size Arithmetic
 * Cell rounding and alignment helpers
 */

use super::types::DeviceSize;

/// Divide rounding up. `divisor` must be non-zero.
#[inline]
pub const fn ceil_div(value: DeviceSize, divisor: DeviceSize) -> DeviceSize {
    value / divisor + (value % divisor != 0) as DeviceSize
}

/// Whether `offset` is a multiple of `alignment`. An alignment of 0 is treated as 1.
#[inline]
pub const fn is_aligned(offset: DeviceSize, alignment: DeviceSize) -> bool {
    alignment <= 1 || offset % alignment == 0
}

/// Round `offset` up to the next multiple of `alignment`.
///
/// Works for any alignment, not only powers of two.
#[inline]
pub const fn align_up(offset: DeviceSize, alignment: DeviceSize) -> DeviceSize {
    if is_aligned(offset, alignment) {
        offset
    } else {
        ceil_div(offset, alignment) * alignment
    }
}
