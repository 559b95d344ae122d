//! Descriptor control word bit field constants.
//!
//! Layout of the 32-bit control word carried by every [`Descriptor`]:
//!
//! ```text
//!  31   30..24   23   22   21..19   18..16   15..0
//! IOC  reserved  DF   SF   BURST    WIDTH    COUNT-1
//! ```
//!
//! [`Descriptor`]: super::Descriptor

/// Control word bit field constants
pub mod control {
    /// Element count minus one (16 bits)
    pub const COUNT_MASK: u32 = 0xFFFF;
    /// Element count shift
    pub const COUNT_SHIFT: u32 = 0;
    /// Element width encoding shift (0 = byte, 1 = half-word, 2 = word)
    pub const WIDTH_SHIFT: u32 = 16;
    /// Element width mask
    pub const WIDTH_MASK: u32 = 0x7 << WIDTH_SHIFT;
    /// Burst encoding shift (log2 of elements per burst)
    pub const BURST_SHIFT: u32 = 19;
    /// Burst mask
    pub const BURST_MASK: u32 = 0x7 << BURST_SHIFT;
    /// Source address stays fixed (no increment)
    pub const SRC_FIXED: u32 = 1 << 22;
    /// Destination address stays fixed (no increment)
    pub const DST_FIXED: u32 = 1 << 23;
    /// Interrupt on completion of this descriptor
    pub const INTERRUPT_ON_COMPLETE: u32 = 1 << 31;

    /// Bits shared by every descriptor of a stream
    pub const TEMPLATE_MASK: u32 = WIDTH_MASK | BURST_MASK | SRC_FIXED | DST_FIXED;
}

/// Encode an element count into the count field.
///
/// `elements` must be in `1..=65536`.
#[inline(always)]
pub const fn encode_count(elements: u32) -> u32 {
    (elements - 1) & control::COUNT_MASK
}

/// Decode the element count from a control word.
#[inline(always)]
pub const fn decode_count(control: u32) -> u32 {
    ((control & control::COUNT_MASK) >> control::COUNT_SHIFT) + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_field_round_trips_extremes() {
        assert_eq!(decode_count(encode_count(1)), 1);
        assert_eq!(decode_count(encode_count(65536)), 65536);
        assert_eq!(encode_count(65536), control::COUNT_MASK);
    }

    #[test]
    fn fields_do_not_overlap() {
        let fields = [
            control::COUNT_MASK,
            control::WIDTH_MASK,
            control::BURST_MASK,
            control::SRC_FIXED,
            control::DST_FIXED,
            control::INTERRUPT_ON_COMPLETE,
        ];
        for (i, a) in fields.iter().enumerate() {
            for b in &fields[i + 1..] {
                assert_eq!(a & b, 0);
            }
        }
    }

    #[test]
    fn template_excludes_count_and_interrupt() {
        assert_eq!(control::TEMPLATE_MASK & control::COUNT_MASK, 0);
        assert_eq!(control::TEMPLATE_MASK & control::INTERRUPT_ON_COMPLETE, 0);
    }
}
