//! Arithmetic integer decoding procedures (Annex A).

use crate::arithmetic_decoder::{ArithmeticDecoder, Context};
use crate::error::Result;

/// Integer arithmetic decoder (A.2).
///
/// "An invocation of an arithmetic integer decoding procedure involves decoding
/// a sequence of bits, where each bit is decoded using a context formed by the
/// bits decoded previously in this invocation." (A.1)
///
/// Each of the IADH/IADW/IAEX/IAAI/IADT/IAFS/IADS/IAIT/IARI/IARDW/IARDH/
/// IARDX/IARDY procedures is one instance of this type with its own context
/// storage.
pub(crate) struct IntegerDecoder {
    /// "Each arithmetic integer decoding procedure requires 512 bytes of
    /// storage for its context memory." (A.2)
    contexts: Vec<Context>,
}

impl IntegerDecoder {
    pub(crate) fn new() -> Self {
        Self {
            contexts: vec![Context::default(); 512],
        }
    }

    /// Decode one value; `None` is the out-of-band value.
    ///
    /// "The result of the integer arithmetic decoding procedure is equal to:
    /// - V if S = 0
    /// - -V if S = 1 and V > 0
    /// - OOB if S = 1 and V = 0" (A.2)
    pub(crate) fn decode(&mut self, decoder: &mut ArithmeticDecoder<'_>) -> Option<i32> {
        // "1) Set: PREV = 1" (A.2)
        let mut prev: u32 = 1;

        // Decode S, then follow the length prefix of Figure A.1.
        let s = self.decode_bit(decoder, &mut prev);

        let v = if self.decode_bit(decoder, &mut prev) == 0 {
            // Figure A.1: "V = next 2 bits"
            self.decode_value_bits(decoder, &mut prev, 2)
        } else if self.decode_bit(decoder, &mut prev) == 0 {
            // Figure A.1: "V = (next 4 bits) + 4"
            self.decode_value_bits(decoder, &mut prev, 4) + 4
        } else if self.decode_bit(decoder, &mut prev) == 0 {
            // Figure A.1: "V = (next 6 bits) + 20"
            self.decode_value_bits(decoder, &mut prev, 6) + 20
        } else if self.decode_bit(decoder, &mut prev) == 0 {
            // Figure A.1: "V = (next 8 bits) + 84"
            self.decode_value_bits(decoder, &mut prev, 8) + 84
        } else if self.decode_bit(decoder, &mut prev) == 0 {
            // Figure A.1: "V = (next 12 bits) + 340"
            self.decode_value_bits(decoder, &mut prev, 12) + 340
        } else {
            // Figure A.1: "V = (next 32 bits) + 4436"
            self.decode_value_bits(decoder, &mut prev, 32).wrapping_add(4436)
        };

        if s == 0 {
            Some(v as i32)
        } else if v > 0 {
            Some((v as i32).wrapping_neg())
        } else {
            // "OOB if S = 1 and V = 0"
            None
        }
    }

    /// Decode one value where OOB is not allowed.
    pub(crate) fn decode_non_oob(&mut self, decoder: &mut ArithmeticDecoder<'_>) -> Result<i32> {
        self.decode(decoder).ok_or(crate::error::DecodeError::UnexpectedOob)
    }

    /// Decode one bit and update PREV.
    ///
    /// "3) After each bit is decoded: If PREV < 256 set: PREV = (PREV << 1) OR D
    /// Otherwise set: PREV = (((PREV << 1) OR D) AND 511) OR 256" (A.2)
    #[inline]
    fn decode_bit(&mut self, decoder: &mut ArithmeticDecoder<'_>, prev: &mut u32) -> u8 {
        // "Decode each bit with CX equal to 'IAx + PREV' ... the rightmost
        // 9 bits of PREV are used." (A.2)
        let d = decoder.decode(&mut self.contexts[(*prev & 0x1FF) as usize]);

        if *prev < 256 {
            *prev = (*prev << 1) | d as u32;
        } else {
            *prev = (((*prev << 1) | d as u32) & 511) | 256;
        }

        d
    }

    fn decode_value_bits(
        &mut self,
        decoder: &mut ArithmeticDecoder<'_>,
        prev: &mut u32,
        count: u32,
    ) -> u32 {
        let mut value = 0_u32;
        for _ in 0..count {
            value = (value << 1) | self.decode_bit(decoder, prev) as u32;
        }
        value
    }
}

/// Symbol ID decoder (A.3, the IAID decoding procedure).
///
/// "This decoding procedure is different from all the other integer arithmetic
/// decoding procedures. It uses fixed-length representations of the values
/// being decoded, and does not limit the number of previously-decoded bits
/// used as part of the context." (A.3)
pub(crate) struct IdDecoder {
    /// "The number of contexts required is 2^(SBSYMCODELEN + 1)." (A.3)
    contexts: Vec<Context>,
    /// "The length is equal to SBSYMCODELEN." (A.3)
    code_length: u32,
}

impl IdDecoder {
    pub(crate) fn new(code_length: u32) -> Self {
        Self {
            contexts: vec![Context::default(); 1_usize << (code_length + 1)],
            code_length,
        }
    }

    /// Decode one symbol ID.
    pub(crate) fn decode(&mut self, decoder: &mut ArithmeticDecoder<'_>) -> u32 {
        // "1) Set: PREV = 1" (A.3)
        let mut prev = 1_u32;

        // "2) Decode SBSYMCODELEN bits", each with context IAID + PREV. (A.3)
        for _ in 0..self.code_length {
            let d = decoder.decode(&mut self.contexts[prev as usize]);
            prev = (prev << 1) | d as u32;
        }

        // "3) ... PREV = PREV - 2^SBSYMCODELEN. This step has the effect of
        // clearing the topmost (leading 1) bit of PREV." (A.3)
        prev - (1 << self.code_length)
    }
}

/// The number of bits needed to distinguish `count` symbol IDs:
/// ceil(log2(count)), but at least one bit (6.5.8.2.3, 6.4.10).
pub(crate) fn symbol_code_length(count: u32) -> u32 {
    if count <= 1 { 1 } else { 32 - (count - 1).leading_zeros() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_code_lengths() {
        assert_eq!(symbol_code_length(0), 1);
        assert_eq!(symbol_code_length(1), 1);
        assert_eq!(symbol_code_length(2), 1);
        assert_eq!(symbol_code_length(3), 2);
        assert_eq!(symbol_code_length(4), 2);
        assert_eq!(symbol_code_length(5), 3);
        assert_eq!(symbol_code_length(256), 8);
        assert_eq!(symbol_code_length(257), 9);
    }
}
