//! `rust_decimal::Decimal` conversion to and from IEEE 754-2008 Decimal128
//! bits (BID encoding).
//!
//! The wire carries decimals as Decimal128 rather than any one platform's
//! native layout. `Decimal`'s whole domain (96-bit significand, scale
//! 0..=28) fits the small-coefficient BID form, so the conversion is exact
//! in both directions for every representable value.

use rust_decimal::Decimal;

/// IEEE exponent bias for Decimal128.
const EXPONENT_BIAS: i32 = 6176;

/// Largest canonical Decimal128 coefficient: 10^34 - 1.
const MAX_COEFFICIENT: u128 = 9_999_999_999_999_999_999_999_999_999_999_999;

const COEFFICIENT_BITS: u32 = 113;
const COEFFICIENT_MASK: u128 = (1u128 << COEFFICIENT_BITS) - 1;

/// Converts a decimal to Decimal128 bits, returned as (low, high) words.
pub fn to_bits(value: &Decimal) -> (u64, u64) {
    let mantissa = value.mantissa(); // signed, |m| < 2^96
    let coefficient = mantissa.unsigned_abs();
    let biased_exponent = (EXPONENT_BIAS - value.scale() as i32) as u128;
    let mut bits = (biased_exponent << COEFFICIENT_BITS) | coefficient;
    if mantissa < 0 || value.is_sign_negative() {
        bits |= 1u128 << 127;
    }
    (bits as u64, (bits >> 64) as u64)
}

/// Reconstructs a decimal from Decimal128 (low, high) words.
///
/// Returns `None` for NaN, infinities, the large-coefficient form, and
/// values outside the 96-bit-significand / scale 0..=28 domain.
pub fn from_bits(lo: u64, hi: u64) -> Option<Decimal> {
    let bits = (lo as u128) | ((hi as u128) << 64);
    let negative = bits >> 127 == 1;
    // G0..G1 == 11 selects the large-coefficient form or a special value.
    if (bits >> 125) & 0b11 == 0b11 {
        return None;
    }
    let biased_exponent = ((bits >> COEFFICIENT_BITS) & 0x3FFF) as i32;
    let coefficient = bits & COEFFICIENT_MASK;
    if coefficient > MAX_COEFFICIENT {
        // Non-canonical; IEEE treats it as zero, we reject it instead.
        return None;
    }
    let scale = EXPONENT_BIAS - biased_exponent;
    if !(0..=28).contains(&scale) {
        return None;
    }
    if coefficient >> 96 != 0 {
        return None;
    }
    let mut mantissa = coefficient as i128;
    if negative {
        mantissa = -mantissa;
    }
    Some(Decimal::from_i128_with_scale(mantissa, scale as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn roundtrip(value: Decimal) {
        let (lo, hi) = to_bits(&value);
        assert_eq!(from_bits(lo, hi), Some(value), "roundtrip of {}", value);
    }

    #[test]
    fn boundary_values_roundtrip() {
        roundtrip(Decimal::ZERO);
        roundtrip(Decimal::ONE);
        roundtrip(Decimal::NEGATIVE_ONE);
        roundtrip(Decimal::MAX);
        roundtrip(Decimal::MIN);
        roundtrip(Decimal::from_str("0.0000000000000000000000000001").unwrap());
        roundtrip(Decimal::from_str("-79228162514264337593543950335").unwrap());
        roundtrip(Decimal::from_str("3.1415926535897932384626433833").unwrap());
    }

    #[test]
    fn scale_is_preserved() {
        let value = Decimal::from_str("1.100").unwrap();
        let (lo, hi) = to_bits(&value);
        let back = from_bits(lo, hi).unwrap();
        assert_eq!(back.scale(), 3);
        assert_eq!(back.to_string(), "1.100");
    }

    #[test]
    fn special_values_are_rejected() {
        // +Inf: G0..G4 = 11110
        let inf_hi = 0b0_11110u64 << 58;
        assert_eq!(from_bits(0, inf_hi), None);
        // NaN: G0..G4 = 11111
        let nan_hi = 0b0_11111u64 << 58;
        assert_eq!(from_bits(0, nan_hi), None);
    }

    #[test]
    fn out_of_domain_exponent_is_rejected() {
        // Biased exponent 0 means scale 6176, far outside Decimal's range.
        assert_eq!(from_bits(1, 0), None);
    }
}
