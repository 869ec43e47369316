//! Script number arithmetic with consensus encoding rules.
//!
//! Numbers on the script stack are little-endian byte arrays with a sign
//! bit in the most significant bit of the last byte. Numeric opcodes
//! accept operands of at most 4 bytes, but results may grow wider and
//! remain valid as long as they are never reinterpreted as numbers. Big
//! integers make that widening safe without wrap-around.

use num_bigint::BigInt;
use num_traits::{One, Signed, ToPrimitive, Zero};

use super::error::{InterpreterError, InterpreterErrorCode};

/// A script number backed by a big integer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptNumber {
    /// The numeric value.
    pub val: BigInt,
}

impl ScriptNumber {
    /// Create a new ScriptNumber from an i64 value.
    pub fn new(val: i64) -> Self {
        ScriptNumber {
            val: BigInt::from(val),
        }
    }

    /// Parse a byte array into a ScriptNumber.
    ///
    /// # Arguments
    /// * `bytes` - Little-endian sign-magnitude encoding.
    /// * `max_len` - Maximum allowed operand width in bytes.
    ///
    /// # Returns
    /// The decoded number, or `NumberTooBig` if the encoding is wider
    /// than `max_len`.
    pub fn from_bytes(bytes: &[u8], max_len: usize) -> Result<Self, InterpreterError> {
        if bytes.len() > max_len {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NumberTooBig,
                format!(
                    "numeric value encoded as {:02x?} is {} bytes which exceeds the max allowed of {}",
                    bytes,
                    bytes.len(),
                    max_len
                ),
            ));
        }

        if bytes.is_empty() {
            return Ok(ScriptNumber { val: BigInt::zero() });
        }

        // Little-endian accumulate, then strip the sign bit if set.
        let mut v = BigInt::zero();
        for (i, &b) in bytes.iter().enumerate() {
            v |= BigInt::from(b) << (8 * i);
        }

        if bytes[bytes.len() - 1] & 0x80 != 0 {
            let mask = !(BigInt::from(0x80_i64) << (8 * (bytes.len() - 1)));
            v &= mask;
            v = -v;
        }

        Ok(ScriptNumber { val: v })
    }

    /// Serialize the number to little-endian sign-magnitude bytes.
    ///
    /// Zero encodes as the empty array. If the magnitude's top byte has
    /// its high bit set, an extra byte carries the sign.
    pub fn to_bytes(&self) -> Vec<u8> {
        if self.val.is_zero() {
            return vec![];
        }

        let is_negative = self.val.is_negative();
        let mut magnitude = self.val.abs();

        let mut result: Vec<u8> = Vec::new();
        while magnitude > BigInt::zero() {
            result.push((&magnitude & BigInt::from(0xff_u8)).to_u8().unwrap_or(0));
            magnitude >>= 8;
        }

        let last = result.len() - 1;
        if result[last] & 0x80 != 0 {
            result.push(if is_negative { 0x80 } else { 0x00 });
        } else if is_negative {
            result[last] |= 0x80;
        }

        result
    }

    // Arithmetic (mutating, return self for chaining)

    /// Add another script number to this one.
    pub fn add(&mut self, other: &ScriptNumber) -> &mut Self {
        self.val = &self.val + &other.val;
        self
    }

    /// Subtract another script number from this one.
    pub fn sub(&mut self, other: &ScriptNumber) -> &mut Self {
        self.val = &self.val - &other.val;
        self
    }

    /// Increment this number by one.
    pub fn incr(&mut self) -> &mut Self {
        self.val = &self.val + BigInt::one();
        self
    }

    /// Decrement this number by one.
    pub fn decr(&mut self) -> &mut Self {
        self.val = &self.val - BigInt::one();
        self
    }

    /// Negate this number.
    pub fn neg(&mut self) -> &mut Self {
        self.val = -self.val.clone();
        self
    }

    /// Replace this number with its absolute value.
    pub fn abs(&mut self) -> &mut Self {
        if self.val.is_negative() {
            self.val = -self.val.clone();
        }
        self
    }

    /// Set this number to the given i64 value.
    pub fn set(&mut self, i: i64) -> &mut Self {
        self.val = BigInt::from(i);
        self
    }

    // Comparisons

    /// Return true if this number is zero.
    pub fn is_zero(&self) -> bool {
        self.val.is_zero()
    }

    /// Return true if this number is less than `other`.
    pub fn less_than(&self, other: &ScriptNumber) -> bool {
        self.val < other.val
    }

    /// Return true if this number is less than the given i64 value.
    pub fn less_than_int(&self, i: i64) -> bool {
        self.val < BigInt::from(i)
    }

    /// Return true if this number is less than or equal to `other`.
    pub fn less_than_or_equal(&self, other: &ScriptNumber) -> bool {
        self.val <= other.val
    }

    /// Return true if this number is greater than `other`.
    pub fn greater_than(&self, other: &ScriptNumber) -> bool {
        self.val > other.val
    }

    /// Return true if this number is greater than the given i64 value.
    pub fn greater_than_int(&self, i: i64) -> bool {
        self.val > BigInt::from(i)
    }

    /// Return true if this number is greater than or equal to `other`.
    pub fn greater_than_or_equal(&self, other: &ScriptNumber) -> bool {
        self.val >= other.val
    }

    /// Return true if this number is equal to `other`.
    pub fn equal(&self, other: &ScriptNumber) -> bool {
        self.val == other.val
    }

    // Conversion

    /// Convert to i32, clamping on overflow.
    pub fn to_i32(&self) -> i32 {
        match self.val.to_i64() {
            Some(v) => {
                if v > i32::MAX as i64 {
                    i32::MAX
                } else if v < i32::MIN as i64 {
                    i32::MIN
                } else {
                    v as i32
                }
            }
            None => {
                if self.val.is_positive() {
                    i32::MAX
                } else {
                    i32::MIN
                }
            }
        }
    }

    /// Convert to i64, clamping on overflow.
    pub fn to_i64(&self) -> i64 {
        if self.greater_than_int(i64::MAX) {
            return i64::MAX;
        }
        if self.less_than_int(i64::MIN) {
            return i64::MIN;
        }
        self.val.to_i64().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex_to_bytes(s: &str) -> Vec<u8> {
        hex::decode(s).unwrap()
    }

    /// Serialization vectors across the sign-bit boundaries.
    #[test]
    fn test_script_num_bytes() {
        let tests: Vec<(i64, Vec<u8>)> = vec![
            (0, vec![]),
            (1, hex_to_bytes("01")),
            (-1, hex_to_bytes("81")),
            (127, hex_to_bytes("7f")),
            (-127, hex_to_bytes("ff")),
            (128, hex_to_bytes("8000")),
            (-128, hex_to_bytes("8080")),
            (129, hex_to_bytes("8100")),
            (-129, hex_to_bytes("8180")),
            (256, hex_to_bytes("0001")),
            (-256, hex_to_bytes("0081")),
            (32767, hex_to_bytes("ff7f")),
            (-32767, hex_to_bytes("ffff")),
            (32768, hex_to_bytes("008000")),
            (-32768, hex_to_bytes("008080")),
            (65535, hex_to_bytes("ffff00")),
            (-65535, hex_to_bytes("ffff80")),
            (8388608, hex_to_bytes("00008000")),
            (-8388608, hex_to_bytes("00008080")),
            (2147483647, hex_to_bytes("ffffff7f")),
            (-2147483647, hex_to_bytes("ffffffff")),
            // Results wider than operands are still serializable.
            (2147483648, hex_to_bytes("0000008000")),
            (-2147483648, hex_to_bytes("0000008080")),
            (4294967295, hex_to_bytes("ffffffff00")),
            (-4294967295, hex_to_bytes("ffffffff80")),
        ];

        for (num, expected) in &tests {
            let got = ScriptNumber::new(*num).to_bytes();
            assert_eq!(
                &got, expected,
                "to_bytes({}): got {:02x?}, want {:02x?}",
                num, got, expected
            );
        }
    }

    /// Decoding vectors, including width-limit rejections.
    #[test]
    fn test_from_bytes() {
        let ok: Vec<(&str, i64)> = vec![
            ("", 0),
            ("01", 1),
            ("81", -1),
            ("7f", 127),
            ("ff", -127),
            ("8000", 128),
            ("8080", -128),
            ("0001", 256),
            ("0081", -256),
            ("ffffff7f", 2147483647),
            ("ffffffff", -2147483647),
            // Non-minimal encodings decode without complaint.
            ("00", 0),
            ("0100", 1),
            ("80", 0),
        ];
        for (hex_str, want) in &ok {
            let sn = ScriptNumber::from_bytes(&hex_to_bytes(hex_str), 4).unwrap();
            assert_eq!(sn.to_i64(), *want, "from_bytes({})", hex_str);
        }

        // 5-byte value passes with a widened limit, fails at the default.
        let wide = hex_to_bytes("ffffffff7f");
        assert!(ScriptNumber::from_bytes(&wide, 4).is_err());
        assert_eq!(
            ScriptNumber::from_bytes(&wide, 5).unwrap().to_i64(),
            549755813887
        );
    }

    /// Width-limit rejection carries the NumberTooBig category.
    #[test]
    fn test_too_wide_error_code() {
        let err = ScriptNumber::from_bytes(&hex_to_bytes("0000008000"), 4).unwrap_err();
        assert_eq!(err.code, InterpreterErrorCode::NumberTooBig);
    }

    /// i32 conversion clamps out-of-range values.
    #[test]
    fn test_to_i32_clamping() {
        assert_eq!(ScriptNumber::new(0).to_i32(), 0);
        assert_eq!(ScriptNumber::new(-2147483648).to_i32(), -2147483648);
        assert_eq!(ScriptNumber::new(2147483648).to_i32(), 2147483647);
        assert_eq!(ScriptNumber::new(-2147483649).to_i32(), -2147483648);
    }

    /// Round-trip through bytes preserves the value.
    #[test]
    fn test_roundtrip() {
        for v in [0i64, 1, -1, 127, -127, 128, 255, 256, 0x7fffffff, -0x7fffffff] {
            let bytes = ScriptNumber::new(v).to_bytes();
            let back = ScriptNumber::from_bytes(&bytes, 9).unwrap();
            assert_eq!(back.to_i64(), v);
        }
    }
}
