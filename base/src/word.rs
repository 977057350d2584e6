//! Masks and convenience operations for 36-bit machine words.
//!
//! Words are carried in a plain `u64`; the constants here name the
//! fields of the word the way the processor reference manual does.
//! Arithmetic helpers deliberately return more than 36 bits where the
//! hardware exposes a carry (bit position 36, [`C1`]); callers mask
//! with [`FMASK`] once they have inspected the carry.

/// All 36 bits of a word.
pub const FMASK: u64 = 0o777_777_777_777;
/// The sign bit (bit 0 in the manual's numbering, the most
/// significant bit of the word).
pub const SMASK: u64 = 0o400_000_000_000;
/// The 35 magnitude bits below the sign.
pub const CMASK: u64 = 0o377_777_777_777;
/// Carry out of the sign bit; one position above the top of the word.
pub const C1: u64 = 0o1_000_000_000_000;
/// The left (more significant) halfword.
pub const LMASK: u64 = 0o777_777_000_000;
/// The right (less significant) halfword.
pub const RMASK: u64 = 0o000_000_777_777;
/// The sign bit of the right halfword.
pub const LSIGN: u64 = 0o000_000_400_000;
/// Exponent field of a single-precision floating point word
/// (8 bits, excess-200 octal, complemented when the word is negative).
pub const EXPO: u64 = 0o377_000_000_000;
/// Mantissa field of a single-precision floating point word (27 bits).
pub const MANT: u64 = 0o000_777_777_777;
/// The lowest exponent-field bit; one position above the mantissa.
pub const BIT8: u64 = 0o001_000_000_000;
/// The most significant mantissa bit; set in every normalized
/// positive floating point word.
pub const BIT9: u64 = 0o000_400_000_000;
/// Everything below the position field of a byte pointer.
pub const PMASK: u64 = 0o007_777_777_777;

/// Bitwise complement within the word.
#[inline]
pub fn cm(w: u64) -> u64 {
    FMASK ^ w
}

/// Two's-complement negation within the word.  `negate(SMASK)` is
/// `SMASK` again; the caller detects that overflow case from the
/// carries if it matters.
#[inline]
pub fn negate(w: u64) -> u64 {
    (cm(w) + 1) & FMASK
}

/// The left halfword, moved to the low 18 bits.
#[inline]
pub fn left(w: u64) -> u64 {
    (w >> 18) & RMASK
}

/// The right halfword.
#[inline]
pub fn right(w: u64) -> u64 {
    w & RMASK
}

/// Join two halfwords into a full word.
#[inline]
pub fn join(l: u64, r: u64) -> u64 {
    ((l & RMASK) << 18) | (r & RMASK)
}

/// Exchange the two halfwords.
#[inline]
pub fn swap(w: u64) -> u64 {
    ((w & RMASK) << 18) | ((w >> 18) & RMASK)
}

/// Number of leading zero bits in a word; 36 for zero.
#[inline]
pub fn leading_zeros(w: u64) -> u64 {
    let w = w & FMASK;
    if w == 0 {
        36
    } else {
        u64::from(w.leading_zeros()) - 28
    }
}

/// Add one to both halves with a single full-word add, so a carry out
/// of the right half propagates into the left.  The carry out of the
/// word survives in bit [`C1`].
#[inline]
pub fn add_one_both(w: u64) -> u64 {
    w + 0o1_000_001
}

/// Subtract one from both halves with a single full-word add of the
/// joined minus-one constant.  A borrow propagates between halves;
/// the carry out of the word survives in bit [`C1`].
#[inline]
pub fn sub_one_both(w: u64) -> u64 {
    w + 0o777_776_777_777
}

/// Add one to both halves independently; no carry crosses the half
/// boundary.  The carry out of the left half survives in bit [`C1`].
#[inline]
pub fn add_one_both_halves(w: u64) -> u64 {
    ((w + 1) & RMASK) | ((w + 0o1_000_000) & (C1 | LMASK))
}

/// Subtract one from both halves independently; no borrow crosses the
/// half boundary.  The carry out of the left half survives in bit
/// [`C1`].
#[inline]
pub fn sub_one_both_halves(w: u64) -> u64 {
    ((w + RMASK) & RMASK) | ((w + LMASK) & (C1 | LMASK))
}

/// The floating point exponent of a word, corrected for sign (the
/// exponent field is stored complemented in negative words).
#[inline]
pub fn fp_exponent(w: u64) -> i32 {
    let raw = ((w >> 27) & 0o377) as i32;
    if w & SMASK != 0 { 0o377 ^ raw } else { raw }
}

/// Replace the exponent field with a copy of the sign, leaving the
/// sign and mantissa of a floating point word ready for a long shift.
#[inline]
pub fn smear_sign(w: u64) -> u64 {
    if w & SMASK != 0 { w | EXPO } else { w & MANT }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_strategy::{Arbitrary, proptest};

    macro_rules! assert_octal_eq {
        ($left:expr, $right:expr $(,)?) => {{
            match (&$left, &$right) {
                (left_val, right_val) => {
                    if !(*left_val == *right_val) {
                        panic!(
                            "Assertion failed: {:>#012o} != {:>#012o}",
                            left_val, right_val
                        );
                    }
                }
            }
        }};
    }

    #[derive(Debug, Arbitrary)]
    struct WordInput {
        #[strategy(0..=FMASK)]
        w: u64,
    }

    #[test]
    fn test_masks_partition_the_word() {
        assert_octal_eq!(LMASK | RMASK, FMASK);
        assert_octal_eq!(SMASK | CMASK, FMASK);
        assert_octal_eq!(SMASK | EXPO | MANT, FMASK);
        assert_octal_eq!(LMASK & RMASK, 0);
        assert_octal_eq!(C1, FMASK + 1);
    }

    #[test]
    fn test_join_and_swap() {
        assert_octal_eq!(join(0o123_456, 0o525_252), 0o123_456_525_252);
        assert_octal_eq!(swap(0o123_456_525_252), 0o525_252_123_456);
        assert_octal_eq!(left(0o123_456_525_252), 0o123_456);
        assert_octal_eq!(right(0o123_456_525_252), 0o525_252);
    }

    #[test]
    fn test_negate_boundaries() {
        assert_octal_eq!(negate(0), 0);
        assert_octal_eq!(negate(1), FMASK);
        // The most negative number has no positive counterpart.
        assert_octal_eq!(negate(SMASK), SMASK);
    }

    #[test]
    fn test_leading_zeros() {
        assert_eq!(leading_zeros(0), 36);
        assert_eq!(leading_zeros(1), 35);
        assert_eq!(leading_zeros(SMASK), 0);
        assert_eq!(leading_zeros(RMASK), 18);
    }

    #[test]
    fn test_half_increment_carry_behaviour() {
        // A joined add carries from the right half into the left;
        // independent halves do not.
        let w = 0o000_005_777_777;
        assert_octal_eq!(add_one_both(w) & FMASK, 0o000_007_000_000);
        assert_octal_eq!(add_one_both_halves(w) & FMASK, 0o000_006_000_000);
        // Counting up from -2,,X reaches zero in the left half either way.
        let w = 0o777_776_000_003;
        assert_octal_eq!(add_one_both(w) & FMASK, 0o777_777_000_004);
        assert_octal_eq!(add_one_both_halves(w) & FMASK, 0o777_777_000_004);
    }

    #[test]
    fn test_fp_exponent() {
        // +1.0 is exponent 201, mantissa 0.5.
        assert_eq!(fp_exponent(0o201_400_000_000), 0o201);
        // -1.0 stores the exponent field complemented.
        assert_eq!(fp_exponent(0o576_400_000_000), 0o201);
        assert_eq!(fp_exponent(0), 0);
    }

    #[test]
    fn test_smear_sign() {
        assert_octal_eq!(smear_sign(0o201_400_000_000), 0o000_400_000_000);
        assert_octal_eq!(smear_sign(0o576_400_000_000), 0o777_400_000_000);
    }

    #[proptest]
    fn join_inverts_split(input: WordInput) {
        assert_eq!(join(left(input.w), right(input.w)), input.w);
    }

    #[proptest]
    fn swap_twice_is_identity(input: WordInput) {
        assert_eq!(swap(swap(input.w)), input.w);
    }

    #[proptest]
    fn negate_twice_is_identity(input: WordInput) {
        assert_eq!(negate(negate(input.w)), input.w);
    }

    #[proptest]
    fn complement_plus_value_is_all_ones(input: WordInput) {
        assert_eq!(cm(input.w) + input.w, FMASK);
    }

    #[proptest]
    fn leading_zeros_matches_shift_count(input: WordInput) {
        let mut n = 0;
        let mut w = input.w;
        while n < 36 && w & SMASK == 0 {
            n += 1;
            w = (w << 1) & FMASK;
        }
        assert_eq!(leading_zeros(input.w), n);
    }

    #[proptest]
    fn half_increments_agree_without_right_carry(input: WordInput) {
        // Whenever the right half does not wrap, the two AOB flavours
        // are indistinguishable.
        if right(input.w) != RMASK {
            assert_eq!(
                add_one_both(input.w) & (C1 | FMASK),
                add_one_both_halves(input.w) & (C1 | FMASK)
            );
        }
    }
}
