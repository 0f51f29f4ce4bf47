//! Huffman tables (Annex B).
//!
//! Covers the fifteen standard tables of Annex B, custom tables delivered by
//! tables segments (B.2), and tables assembled from bare code lengths, which
//! the text region uses for its symbol ID codes (7.4.3.1.7). All of them share
//! the B.3 canonical code assignment and the B.4 read procedure.

use std::sync::LazyLock;

use crate::error::{HuffmanError, ParseError, Result, bail, err};
use crate::reader::Reader;

/// One table line (B.1).
///
/// A line matches a prefix code of `prefix_length` bits; `range_length`
/// further bits hold an offset added to (or, for lower-range lines,
/// subtracted from) `value`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Line {
    /// "RANGELOW" - The base value of the line's range.
    value: i32,
    /// "PREFLEN" - Prefix code length; 0 marks a line that is never used.
    prefix_length: u8,
    /// "RANGELEN" - Number of offset bits following the prefix.
    range_length: u8,
    /// The line covers `value` downwards instead of upwards.
    lower_range: bool,
    /// The line decodes to the out-of-band value.
    oob: bool,
}

impl Line {
    /// A line covering `value` ... `value + 2^range_length - 1`.
    pub(crate) const fn new(value: i32, prefix_length: u8, range_length: u8) -> Self {
        Self {
            value,
            prefix_length,
            range_length,
            lower_range: false,
            oob: false,
        }
    }

    /// The lower range line, covering -∞ ... `value`.
    const fn lower(value: i32, prefix_length: u8) -> Self {
        Self {
            value,
            prefix_length,
            range_length: 32,
            lower_range: true,
            oob: false,
        }
    }

    /// The upper range line, covering `value` ... ∞.
    const fn upper(value: i32, prefix_length: u8) -> Self {
        Self {
            value,
            prefix_length,
            range_length: 32,
            lower_range: false,
            oob: false,
        }
    }

    /// The out-of-band line.
    const fn oob(prefix_length: u8) -> Self {
        Self {
            value: 0,
            prefix_length,
            range_length: 0,
            lower_range: false,
            oob: true,
        }
    }
}

/// A prefix code table.
#[derive(Debug, Clone)]
pub(crate) struct HuffmanTable {
    lines: Vec<Line>,
    /// Canonical code for each line, parallel to `lines`.
    codes: Vec<u32>,
    /// "HTOOB" - whether the table contains an out-of-band line.
    has_oob: bool,
}

impl HuffmanTable {
    /// Assign prefix codes to the given lines (B.3).
    pub(crate) fn new(lines: Vec<Line>) -> Self {
        // "Build a histogram in the array LENCOUNT counting the number of
        // times each prefix length value occurs in PREFLEN." (B.3)
        let max_length = lines.iter().map(|l| l.prefix_length).max().unwrap_or(0) as usize;
        let mut length_count = vec![0_u32; max_length + 1];
        for line in &lines {
            length_count[line.prefix_length as usize] += 1;
        }
        length_count[0] = 0;

        // "FIRSTCODE[CURLEN] = (FIRSTCODE[CURLEN - 1] + LENCOUNT[CURLEN - 1]) × 2"
        // with codes handed out in line order within each length. (B.3)
        let mut codes = vec![0_u32; lines.len()];
        let mut first_code = 0_u32;
        let mut previous_count = 0_u32;
        for current_length in 1..=max_length {
            first_code = (first_code + previous_count) << 1;
            previous_count = length_count[current_length];

            let mut code = first_code;
            for (line, slot) in lines.iter().zip(&mut codes) {
                if line.prefix_length as usize == current_length {
                    *slot = code;
                    code += 1;
                }
            }
        }

        let has_oob = lines.iter().any(|line| line.oob);

        Self {
            lines,
            codes,
            has_oob,
        }
    }

    /// Build a table whose line I decodes to the value I, from bare prefix
    /// code lengths. Used for symbol ID codes (7.4.3.1.7).
    pub(crate) fn from_code_lengths(lengths: &[u8]) -> Self {
        let lines = lengths
            .iter()
            .enumerate()
            .map(|(value, &length)| Line::new(value as i32, length, 0))
            .collect();
        Self::new(lines)
    }

    /// "HTOOB" - whether this table can decode the out-of-band value.
    pub(crate) fn has_oob_symbol(&self) -> bool {
        self.has_oob
    }

    /// Read one symbol (B.4). `None` is the out-of-band value.
    ///
    /// "1) Read bits one at a time until the bit string matches one of the
    /// prefix codes in the table. 2) Read RANGELEN additional bits." (B.4)
    pub(crate) fn read_symbol(&self, reader: &mut Reader<'_>) -> Result<Option<i32>> {
        let mut code = 0_u32;
        let mut length = 0_u8;

        loop {
            let bit = reader.read_bit().ok_or(ParseError::UnexpectedEof)?;
            code = (code << 1) | bit as u32;
            length += 1;

            for (line, &assigned) in self.lines.iter().zip(&self.codes) {
                if line.prefix_length != length || assigned != code {
                    continue;
                }

                if line.oob {
                    return Ok(None);
                }

                // "HTOFFSET" - the offset within the matched line's range.
                let offset = reader
                    .read_bits(line.range_length)
                    .ok_or(ParseError::UnexpectedEof)? as i32;

                let value = if line.lower_range {
                    line.value.wrapping_sub(offset)
                } else {
                    line.value.wrapping_add(offset)
                };

                return Ok(Some(value));
            }

            // No code is longer than 32 bits; anything else cannot match.
            if length >= 32 {
                bail!(HuffmanError::InvalidCode);
            }
        }
    }

    /// Read one symbol, rejecting the out-of-band value.
    pub(crate) fn read_symbol_non_oob(&self, reader: &mut Reader<'_>) -> Result<i32> {
        self.read_symbol(reader)?
            .ok_or(crate::error::DecodeError::UnexpectedOob)
    }

    /// Read a custom code table from a tables segment's data (B.2).
    pub(crate) fn read_custom(reader: &mut Reader<'_>) -> Result<Self> {
        // "Code table flags" - one byte. (B.2.1)
        let flags = reader.read_byte().ok_or(ParseError::UnexpectedEof)?;

        // "Bit 0 is HTOOB for this code table."
        let has_oob = flags & 1 != 0;
        // "Bits 1-3 specify the value of HTPS - 1."
        let prefix_bits = ((flags >> 1) & 0x07) + 1;
        // "Bits 4-6 specify the value of HTRS - 1."
        let range_bits = ((flags >> 4) & 0x07) + 1;
        // "Bit 7 is reserved; it must be 0."
        if flags & 0x80 != 0 {
            bail!(crate::error::FormatError::ReservedBits);
        }

        // "HTLOW" / "HTHIGH" - the explicit value range. (B.2.2, B.2.3)
        let low = reader.read_i32().ok_or(ParseError::UnexpectedEof)?;
        let high = reader.read_i32().ok_or(ParseError::UnexpectedEof)?;
        if low > high {
            bail!(HuffmanError::InvalidLine);
        }

        // Read table lines while CURRANGELOW < HTHIGH. (B.2.4; this matches
        // the worked example, whose last explicit line ends exactly at HTHIGH.)
        let mut lines = Vec::new();
        let mut current_low = low as i64;
        while current_low < high as i64 {
            let prefix_length = read_prefix_length(reader, prefix_bits)?;
            let range_length = reader
                .read_bits(range_bits)
                .ok_or(ParseError::UnexpectedEof)? as u8;

            // Offsets wider than 32 bits cannot be read back.
            if range_length > 32 {
                bail!(HuffmanError::InvalidLine);
            }

            lines.push(Line::new(current_low as i32, prefix_length, range_length));
            current_low += 1_i64 << range_length;
        }

        // "Lower range table line" covering -∞ ... HTLOW - 1. (B.2.5)
        let lower_prefix = read_prefix_length(reader, prefix_bits)?;
        lines.push(Line::lower(low.wrapping_sub(1), lower_prefix));

        // "Upper range table line" covering CURRANGELOW ... ∞. (B.2.6)
        let upper_prefix = read_prefix_length(reader, prefix_bits)?;
        let upper_base = i32::try_from(current_low).map_err(|_| HuffmanError::InvalidLine)?;
        lines.push(Line::upper(upper_base, upper_prefix));

        // "If HTOOB is 1, read the out-of-band table line." (B.2.7)
        if has_oob {
            let oob_prefix = read_prefix_length(reader, prefix_bits)?;
            lines.push(Line::oob(oob_prefix));
        }

        Ok(Self::new(lines))
    }
}

fn read_prefix_length(reader: &mut Reader<'_>, prefix_bits: u8) -> Result<u8> {
    let length = reader
        .read_bits(prefix_bits)
        .ok_or(ParseError::UnexpectedEof)? as u8;

    // Codes longer than 32 bits cannot be matched by the read procedure.
    if length > 32 {
        return err!(HuffmanError::InvalidLine);
    }

    Ok(length)
}

/// Table B.1 - Standard Huffman table A (HTOOB = 0)
pub(crate) static TABLE_A: LazyLock<HuffmanTable> = LazyLock::new(|| {
    HuffmanTable::new(vec![
        Line::new(0, 1, 4),      // 0...15
        Line::new(16, 2, 8),     // 16...271
        Line::new(272, 3, 16),   // 272...65807
        Line::upper(65808, 3),   // 65808...∞
    ])
});

/// Table B.2 - Standard Huffman table B (HTOOB = 1)
pub(crate) static TABLE_B: LazyLock<HuffmanTable> = LazyLock::new(|| {
    HuffmanTable::new(vec![
        Line::new(0, 1, 0),  // 0
        Line::new(1, 2, 0),  // 1
        Line::new(2, 3, 0),  // 2
        Line::new(3, 4, 3),  // 3...10
        Line::new(11, 5, 6), // 11...74
        Line::upper(75, 6),  // 75...∞
        Line::oob(6),        // OOB
    ])
});

/// Table B.3 - Standard Huffman table C (HTOOB = 1)
pub(crate) static TABLE_C: LazyLock<HuffmanTable> = LazyLock::new(|| {
    HuffmanTable::new(vec![
        Line::new(-256, 8, 8), // -256...-1
        Line::new(0, 1, 0),    // 0
        Line::new(1, 2, 0),    // 1
        Line::new(2, 3, 0),    // 2
        Line::new(3, 4, 3),    // 3...10
        Line::new(11, 5, 6),   // 11...74
        Line::lower(-257, 8),  // -∞...-257
        Line::upper(75, 7),    // 75...∞
        Line::oob(6),          // OOB
    ])
});

/// Table B.4 - Standard Huffman table D (HTOOB = 0)
pub(crate) static TABLE_D: LazyLock<HuffmanTable> = LazyLock::new(|| {
    HuffmanTable::new(vec![
        Line::new(1, 1, 0),  // 1
        Line::new(2, 2, 0),  // 2
        Line::new(3, 3, 0),  // 3
        Line::new(4, 4, 3),  // 4...11
        Line::new(12, 5, 6), // 12...75
        Line::upper(76, 5),  // 76...∞
    ])
});

/// Table B.5 - Standard Huffman table E (HTOOB = 0)
pub(crate) static TABLE_E: LazyLock<HuffmanTable> = LazyLock::new(|| {
    HuffmanTable::new(vec![
        Line::new(-255, 7, 8), // -255...0
        Line::new(1, 1, 0),    // 1
        Line::new(2, 2, 0),    // 2
        Line::new(3, 3, 0),    // 3
        Line::new(4, 4, 3),    // 4...11
        Line::new(12, 5, 6),   // 12...75
        Line::lower(-256, 7),  // -∞...-256
        Line::upper(76, 6),    // 76...∞
    ])
});

/// Table B.6 - Standard Huffman table F (HTOOB = 0)
pub(crate) static TABLE_F: LazyLock<HuffmanTable> = LazyLock::new(|| {
    HuffmanTable::new(vec![
        Line::new(-2048, 5, 10), // -2048...-1025
        Line::new(-1024, 4, 9),  // -1024...-513
        Line::new(-512, 4, 8),   // -512...-257
        Line::new(-256, 4, 7),   // -256...-129
        Line::new(-128, 5, 6),   // -128...-65
        Line::new(-64, 5, 5),    // -64...-33
        Line::new(-32, 4, 5),    // -32...-1
        Line::new(0, 2, 7),      // 0...127
        Line::new(128, 3, 7),    // 128...255
        Line::new(256, 3, 8),    // 256...511
        Line::new(512, 4, 9),    // 512...1023
        Line::new(1024, 4, 10),  // 1024...2047
        Line::lower(-2049, 6),   // -∞...-2049
        Line::upper(2048, 6),    // 2048...∞
    ])
});

/// Table B.7 - Standard Huffman table G (HTOOB = 0)
pub(crate) static TABLE_G: LazyLock<HuffmanTable> = LazyLock::new(|| {
    HuffmanTable::new(vec![
        Line::new(-1024, 4, 9), // -1024...-513
        Line::new(-512, 3, 8),  // -512...-257
        Line::new(-256, 4, 7),  // -256...-129
        Line::new(-128, 5, 6),  // -128...-65
        Line::new(-64, 5, 5),   // -64...-33
        Line::new(-32, 4, 5),   // -32...-1
        Line::new(0, 4, 5),     // 0...31
        Line::new(32, 5, 5),    // 32...63
        Line::new(64, 5, 6),    // 64...127
        Line::new(128, 4, 7),   // 128...255
        Line::new(256, 3, 8),   // 256...511
        Line::new(512, 3, 9),   // 512...1023
        Line::new(1024, 3, 10), // 1024...2047
        Line::lower(-1025, 5),  // -∞...-1025
        Line::upper(2048, 5),   // 2048...∞
    ])
});

/// Table B.8 - Standard Huffman table H (HTOOB = 1)
pub(crate) static TABLE_H: LazyLock<HuffmanTable> = LazyLock::new(|| {
    HuffmanTable::new(vec![
        Line::new(-15, 8, 3),   // -15...-8
        Line::new(-7, 9, 1),    // -7...-6
        Line::new(-5, 8, 1),    // -5...-4
        Line::new(-3, 9, 0),    // -3
        Line::new(-2, 7, 0),    // -2
        Line::new(-1, 4, 0),    // -1
        Line::new(0, 2, 1),     // 0...1
        Line::new(2, 5, 0),     // 2
        Line::new(3, 6, 0),     // 3
        Line::new(4, 3, 4),     // 4...19
        Line::new(20, 6, 1),    // 20...21
        Line::new(22, 4, 4),    // 22...37
        Line::new(38, 4, 5),    // 38...69
        Line::new(70, 5, 6),    // 70...133
        Line::new(134, 5, 7),   // 134...261
        Line::new(262, 6, 7),   // 262...389
        Line::new(390, 7, 8),   // 390...645
        Line::new(646, 6, 10),  // 646...1669
        Line::lower(-16, 9),    // -∞...-16
        Line::upper(1670, 9),   // 1670...∞
        Line::oob(2),           // OOB
    ])
});

/// Table B.9 - Standard Huffman table I (HTOOB = 1)
pub(crate) static TABLE_I: LazyLock<HuffmanTable> = LazyLock::new(|| {
    HuffmanTable::new(vec![
        Line::new(-31, 8, 4),   // -31...-16
        Line::new(-15, 9, 2),   // -15...-12
        Line::new(-11, 8, 2),   // -11...-8
        Line::new(-7, 9, 1),    // -7...-6
        Line::new(-5, 7, 1),    // -5...-4
        Line::new(-3, 4, 1),    // -3...-2
        Line::new(-1, 3, 1),    // -1...0
        Line::new(1, 3, 1),     // 1...2
        Line::new(3, 5, 1),     // 3...4
        Line::new(5, 6, 1),     // 5...6
        Line::new(7, 3, 5),     // 7...38
        Line::new(39, 6, 2),    // 39...42
        Line::new(43, 4, 5),    // 43...74
        Line::new(75, 4, 6),    // 75...138
        Line::new(139, 5, 7),   // 139...266
        Line::new(267, 5, 8),   // 267...522
        Line::new(523, 6, 8),   // 523...778
        Line::new(779, 7, 9),   // 779...1290
        Line::new(1291, 6, 11), // 1291...3338
        Line::lower(-32, 9),    // -∞...-32
        Line::upper(3339, 9),   // 3339...∞
        Line::oob(2),           // OOB
    ])
});

/// Table B.10 - Standard Huffman table J (HTOOB = 1)
pub(crate) static TABLE_J: LazyLock<HuffmanTable> = LazyLock::new(|| {
    HuffmanTable::new(vec![
        Line::new(-21, 7, 4),   // -21...-6
        Line::new(-5, 8, 0),    // -5
        Line::new(-4, 7, 0),    // -4
        Line::new(-3, 5, 0),    // -3
        Line::new(-2, 2, 2),    // -2...1
        Line::new(2, 5, 0),     // 2
        Line::new(3, 6, 0),     // 3
        Line::new(4, 7, 0),     // 4
        Line::new(5, 8, 0),     // 5
        Line::new(6, 2, 6),     // 6...69
        Line::new(70, 5, 5),    // 70...101
        Line::new(102, 6, 5),   // 102...133
        Line::new(134, 6, 6),   // 134...197
        Line::new(198, 6, 7),   // 198...325
        Line::new(326, 6, 8),   // 326...581
        Line::new(582, 6, 9),   // 582...1093
        Line::new(1094, 6, 10), // 1094...2117
        Line::new(2118, 7, 11), // 2118...4165
        Line::lower(-22, 8),    // -∞...-22
        Line::upper(4166, 8),   // 4166...∞
        Line::oob(2),           // OOB
    ])
});

/// Table B.11 - Standard Huffman table K (HTOOB = 0)
pub(crate) static TABLE_K: LazyLock<HuffmanTable> = LazyLock::new(|| {
    HuffmanTable::new(vec![
        Line::new(1, 1, 0),   // 1
        Line::new(2, 2, 1),   // 2...3
        Line::new(4, 4, 0),   // 4
        Line::new(5, 4, 1),   // 5...6
        Line::new(7, 5, 1),   // 7...8
        Line::new(9, 5, 2),   // 9...12
        Line::new(13, 6, 2),  // 13...16
        Line::new(17, 7, 2),  // 17...20
        Line::new(21, 7, 3),  // 21...28
        Line::new(29, 7, 4),  // 29...44
        Line::new(45, 7, 5),  // 45...76
        Line::new(77, 7, 6),  // 77...140
        Line::upper(141, 7),  // 141...∞
    ])
});

/// Table B.12 - Standard Huffman table L (HTOOB = 0)
pub(crate) static TABLE_L: LazyLock<HuffmanTable> = LazyLock::new(|| {
    HuffmanTable::new(vec![
        Line::new(1, 1, 0),  // 1
        Line::new(2, 2, 0),  // 2
        Line::new(3, 3, 1),  // 3...4
        Line::new(5, 5, 0),  // 5
        Line::new(6, 5, 1),  // 6...7
        Line::new(8, 6, 1),  // 8...9
        Line::new(10, 7, 0), // 10
        Line::new(11, 7, 1), // 11...12
        Line::new(13, 7, 2), // 13...16
        Line::new(17, 7, 3), // 17...24
        Line::new(25, 7, 4), // 25...40
        Line::new(41, 8, 5), // 41...72
        Line::upper(73, 8),  // 73...∞
    ])
});

/// Table B.13 - Standard Huffman table M (HTOOB = 0)
pub(crate) static TABLE_M: LazyLock<HuffmanTable> = LazyLock::new(|| {
    HuffmanTable::new(vec![
        Line::new(1, 1, 0),  // 1
        Line::new(2, 3, 0),  // 2
        Line::new(3, 4, 0),  // 3
        Line::new(4, 5, 0),  // 4
        Line::new(5, 4, 1),  // 5...6
        Line::new(7, 3, 3),  // 7...14
        Line::new(15, 6, 1), // 15...16
        Line::new(17, 6, 2), // 17...20
        Line::new(21, 6, 3), // 21...28
        Line::new(29, 6, 4), // 29...44
        Line::new(45, 6, 5), // 45...76
        Line::new(77, 7, 6), // 77...140
        Line::upper(141, 7), // 141...∞
    ])
});

/// Table B.14 - Standard Huffman table N (HTOOB = 0)
pub(crate) static TABLE_N: LazyLock<HuffmanTable> = LazyLock::new(|| {
    HuffmanTable::new(vec![
        Line::new(-2, 3, 0), // -2
        Line::new(-1, 3, 0), // -1
        Line::new(0, 1, 0),  // 0
        Line::new(1, 3, 0),  // 1
        Line::new(2, 3, 0),  // 2
    ])
});

/// Table B.15 - Standard Huffman table O (HTOOB = 0)
pub(crate) static TABLE_O: LazyLock<HuffmanTable> = LazyLock::new(|| {
    HuffmanTable::new(vec![
        Line::new(-24, 7, 4), // -24...-9
        Line::new(-8, 6, 2),  // -8...-5
        Line::new(-4, 5, 1),  // -4...-3
        Line::new(-2, 4, 0),  // -2
        Line::new(-1, 3, 0),  // -1
        Line::new(0, 1, 0),   // 0
        Line::new(1, 3, 0),   // 1
        Line::new(2, 4, 0),   // 2
        Line::new(3, 5, 1),   // 3...4
        Line::new(5, 6, 2),   // 5...8
        Line::new(9, 7, 4),   // 9...24
        Line::lower(-25, 7),  // -∞...-25
        Line::upper(25, 7),   // 25...∞
    ])
});

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_one(table: &HuffmanTable, data: &[u8]) -> Option<i32> {
        let mut reader = Reader::new(data);
        table.read_symbol(&mut reader).unwrap()
    }

    #[test]
    fn table_b1_codes() {
        // B.3 assigns 0, 10, 110, 111 to the four lines of table B.1.
        assert_eq!(decode_one(&TABLE_A, &[0b0_0000_000]), Some(0));
        assert_eq!(decode_one(&TABLE_A, &[0b0_0111_000]), Some(7));
        assert_eq!(decode_one(&TABLE_A, &[0b0_1111_000]), Some(15));
        assert_eq!(decode_one(&TABLE_A, &[0b10_000000, 0b01_000000]), Some(17));
        assert_eq!(
            decode_one(&TABLE_A, &[0b111_00000, 0x00, 0x00, 0x00, 0b00000_000]),
            Some(65808)
        );
    }

    #[test]
    fn table_b2_values_and_oob() {
        assert_eq!(decode_one(&TABLE_B, &[0b0_0000000]), Some(0));
        assert_eq!(decode_one(&TABLE_B, &[0b10_000000]), Some(1));
        assert_eq!(decode_one(&TABLE_B, &[0b110_00000]), Some(2));
        // 3...10 with three offset bits.
        assert_eq!(decode_one(&TABLE_B, &[0b1110_101_0]), Some(8));
        assert_eq!(decode_one(&TABLE_B, &[0b111111_00]), None);
        assert!(TABLE_B.has_oob_symbol());
        assert!(!TABLE_A.has_oob_symbol());
    }

    #[test]
    fn non_oob_read_rejects_oob_line() {
        let mut reader = Reader::new(&[0b111111_00]);
        assert!(TABLE_B.read_symbol_non_oob(&mut reader).is_err());
    }

    #[test]
    fn lower_range_line_subtracts_offset() {
        // In table B.3 both eight-bit prefixes sort behind every shorter code,
        // so the -256...-1 line gets 11111110 and the lower range line (which
        // follows it in table order) gets 11111111, followed by a 32-bit
        // offset that is subtracted from -257.
        let data = [0xFF, 0x00, 0x00, 0x00, 0x05];
        let mut reader = Reader::new(&data);
        assert_eq!(TABLE_C.read_symbol(&mut reader).unwrap(), Some(-257 - 5));
    }

    #[test]
    fn custom_table_from_annex_b_example() {
        // The B.2 example encodes a table equivalent to table B.1:
        // HTOOB=0, HTPS=2, HTRS=5, HTLOW=0, HTHIGH=65808.
        let data = [
            0x42, // flags
            0x00, 0x00, 0x00, 0x00, // HTLOW = 0
            0x00, 0x01, 0x01, 0x10, // HTHIGH = 65808
            0x49, 0x23, 0x81, 0x80, // packed table lines
        ];
        let mut reader = Reader::new(&data);
        let table = HuffmanTable::read_custom(&mut reader).unwrap();

        assert!(!table.has_oob_symbol());
        assert_eq!(decode_one(&table, &[0b0_0111_000]), Some(7));
        assert_eq!(decode_one(&table, &[0b10_000000, 0b00_000000]), Some(16));
        assert_eq!(
            decode_one(&table, &[0b110_00000, 0x00, 0b0000000_0]),
            Some(272)
        );
        assert_eq!(
            decode_one(&table, &[0b111_00000, 0x00, 0x00, 0x00, 0b00000_000]),
            Some(65808)
        );
    }

    #[test]
    fn symbol_id_table_from_code_lengths() {
        // Lengths [1, 2, 2] assign 0, 10, 11.
        let table = HuffmanTable::from_code_lengths(&[1, 2, 2]);
        assert_eq!(decode_one(&table, &[0b0_0000000]), Some(0));
        assert_eq!(decode_one(&table, &[0b10_000000]), Some(1));
        assert_eq!(decode_one(&table, &[0b11_000000]), Some(2));
    }

    #[test]
    fn unused_zero_length_lines_never_match() {
        let table = HuffmanTable::from_code_lengths(&[0, 1, 1]);
        assert_eq!(decode_one(&table, &[0b0_0000000]), Some(1));
        assert_eq!(decode_one(&table, &[0b1_0000000]), Some(2));
    }
}
