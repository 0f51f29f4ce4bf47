//! Region decoding procedures and the fields they share (7.4.1, 6.2.5.3).

pub(crate) mod generic;
pub(crate) mod generic_refinement;
pub(crate) mod halftone;
pub(crate) mod pattern;
pub(crate) mod symbol;
pub(crate) mod text;

use crate::error::{Feature, ParseError, RegionError, Result, TemplateError, bail, err};
use crate::reader::Reader;

/// "These operators describe how the segment's bitmap is to be combined with
/// the page bitmap." (7.4.1.5)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CombinationOperator {
    /// 0 OR
    Or,
    /// 1 AND
    And,
    /// 2 XOR
    Xor,
    /// 3 XNOR
    Xnor,
    /// 4 REPLACE
    Replace,
}

impl CombinationOperator {
    pub(crate) fn from_value(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Or),
            1 => Ok(Self::And),
            2 => Ok(Self::Xor),
            3 => Ok(Self::Xnor),
            4 => Ok(Self::Replace),
            _ => err!(RegionError::InvalidCombinationOperator),
        }
    }

    /// The page default operator is a two-bit field, so REPLACE is
    /// unrepresentable there (7.4.8.5).
    pub(crate) fn from_page_value(value: u8) -> Self {
        match value & 0x03 {
            0 => Self::Or,
            1 => Self::And,
            2 => Self::Xor,
            _ => Self::Xnor,
        }
    }
}

/// Template used for generic region coding (6.2.5.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Template {
    /// Template 0: 16 pixels (Figure 3)
    Template0,
    /// Template 1: 13 pixels (Figure 4)
    Template1,
    /// Template 2: 10 pixels (Figure 5)
    Template2,
    /// Template 3: 10 pixels (Figure 6)
    Template3,
}

impl Template {
    pub(crate) fn from_value(value: u8) -> Self {
        match value & 0x03 {
            0 => Self::Template0,
            1 => Self::Template1,
            2 => Self::Template2,
            _ => Self::Template3,
        }
    }

    /// Context width in bits; the context array holds `1 << context_bits()`
    /// entries (6.2.5.3).
    pub(crate) fn context_bits(self) -> u32 {
        match self {
            Self::Template0 => 16,
            Self::Template1 => 13,
            Self::Template2 | Self::Template3 => 10,
        }
    }

    /// Number of adaptive template pixels the template carries (7.4.6.3).
    pub(crate) fn at_pixel_count(self) -> usize {
        match self {
            Self::Template0 => 4,
            _ => 1,
        }
    }
}

/// Template used for refinement coding (6.3.5.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RefinementTemplate {
    /// Template 0: 13 pixels (Figure 12)
    Template0,
    /// Template 1: 10 pixels (Figure 13)
    Template1,
}

impl RefinementTemplate {
    pub(crate) fn context_bits(self) -> u32 {
        match self {
            Self::Template0 => 13,
            Self::Template1 => 10,
        }
    }
}

/// An adaptive template pixel: a signed offset from the current pixel.
///
/// Coordinates are widened beyond the coded byte range because the pattern
/// dictionary substitutes `-HDPW` for the first offset (6.7.5, Table 27),
/// and pattern widths go up to 255.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct AdaptiveTemplatePixel {
    pub(crate) x: i16,
    pub(crate) y: i16,
}

impl AdaptiveTemplatePixel {
    pub(crate) const fn at(x: i16, y: i16) -> Self {
        Self { x, y }
    }
}

/// Read one AT pixel, restricted to the field of Figure 7: strictly above the
/// current row, or on it and strictly to the left.
pub(crate) fn read_at_pixel(reader: &mut Reader<'_>) -> Result<AdaptiveTemplatePixel> {
    let pixel = read_unrestricted_at_pixel(reader)?;

    if pixel.y > 0 || (pixel.y == 0 && pixel.x >= 0) {
        bail!(TemplateError::InvalidAtPixel);
    }

    Ok(pixel)
}

/// Read one AT pixel without the restricted-field check. The second
/// refinement AT pixel samples the reference bitmap, where any offset is
/// meaningful (6.3.5.3).
pub(crate) fn read_unrestricted_at_pixel(reader: &mut Reader<'_>) -> Result<AdaptiveTemplatePixel> {
    let x = reader.read_byte().ok_or(ParseError::UnexpectedEof)? as i8;
    let y = reader.read_byte().ok_or(ParseError::UnexpectedEof)? as i8;

    Ok(AdaptiveTemplatePixel {
        x: x as i16,
        y: y as i16,
    })
}

/// Parsed region segment information field (7.4.1).
///
/// "A region segment information field contains the following subfields:
/// bitmap width, bitmap height, bitmap X location, bitmap Y location, and
/// region segment flags." (7.4.1)
#[derive(Debug, Clone)]
pub(crate) struct RegionSegmentInfo {
    /// "This four-byte field gives the width in pixels of the bitmap encoded
    /// in this segment." (7.4.1.1)
    pub(crate) width: u32,
    /// "This four-byte field gives the height in pixels of the bitmap encoded
    /// in this segment." (7.4.1.2)
    pub(crate) height: u32,
    /// "This four-byte field gives the horizontal offset in pixels of the
    /// bitmap encoded in this segment relative to the page bitmap." (7.4.1.3)
    pub(crate) x_location: u32,
    /// "This four-byte field gives the vertical offset in pixels of the
    /// bitmap encoded in this segment relative to the page bitmap." (7.4.1.4)
    pub(crate) y_location: u32,
    /// "Bits 0-2: External combination operator." (7.4.1.5)
    pub(crate) combination_operator: CombinationOperator,
}

/// A decoded region bitmap together with its placement on the page.
#[derive(Debug)]
pub(crate) struct Region {
    pub(crate) info: RegionSegmentInfo,
    pub(crate) bitmap: crate::bitmap::Bitmap,
}

/// Parse the region segment information field (7.4.1).
pub(crate) fn parse_region_segment_info(reader: &mut Reader<'_>) -> Result<RegionSegmentInfo> {
    let width = reader.read_u32().ok_or(ParseError::UnexpectedEof)?;
    let height = reader.read_u32().ok_or(ParseError::UnexpectedEof)?;
    let x_location = reader.read_u32().ok_or(ParseError::UnexpectedEof)?;
    let y_location = reader.read_u32().ok_or(ParseError::UnexpectedEof)?;

    let flags = reader.read_byte().ok_or(ParseError::UnexpectedEof)?;

    // "Bits 0-2: External combination operator."
    let combination_operator = CombinationOperator::from_value(flags & 0x07)?;

    // "Bit 3: Colour extension flag (COLEXTFLAG)."
    if flags & 0x08 != 0 {
        // "NOTE 3 - If the colour extension flag (COLEXTFLAG) is equal to 1,
        // the external combination operator must be REPLACE." (7.4.1.5)
        if combination_operator != CombinationOperator::Replace {
            bail!(RegionError::ColouredOperatorNotReplace);
        }
        bail!(Feature::ColouredRegion);
    }

    // "Bits 4-7: Reserved; must be 0."
    if flags & 0xF0 != 0 {
        bail!(RegionError::ReservedBits);
    }

    Ok(RegionSegmentInfo {
        width,
        height,
        x_location,
        y_location,
        combination_operator,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info_bytes(flags: u8) -> [u8; 17] {
        let mut data = [0_u8; 17];
        data[3] = 8; // width
        data[7] = 8; // height
        data[16] = flags;
        data
    }

    #[test]
    fn region_operator_values() {
        for (value, expected) in [
            (0, CombinationOperator::Or),
            (1, CombinationOperator::And),
            (2, CombinationOperator::Xor),
            (3, CombinationOperator::Xnor),
            (4, CombinationOperator::Replace),
        ] {
            let data = info_bytes(value);
            let info = parse_region_segment_info(&mut Reader::new(&data)).unwrap();
            assert_eq!(info.combination_operator, expected);
        }

        for value in 5..=7 {
            let data = info_bytes(value);
            assert!(parse_region_segment_info(&mut Reader::new(&data)).is_err());
        }
    }

    #[test]
    fn coloured_region_requires_replace_and_is_rejected() {
        let data = info_bytes(0x08); // COLEXTFLAG with operator OR
        assert_eq!(
            parse_region_segment_info(&mut Reader::new(&data)).unwrap_err(),
            RegionError::ColouredOperatorNotReplace.into()
        );

        let data = info_bytes(0x0C); // COLEXTFLAG with operator REPLACE
        assert_eq!(
            parse_region_segment_info(&mut Reader::new(&data)).unwrap_err(),
            Feature::ColouredRegion.into()
        );
    }

    #[test]
    fn at_pixel_restricted_field() {
        // (-1, 0) is allowed; (0, 0), (1, 0) and (0, 1) are not.
        assert!(read_at_pixel(&mut Reader::new(&[0xFF, 0x00])).is_ok());
        assert!(read_at_pixel(&mut Reader::new(&[0x00, 0x00])).is_err());
        assert!(read_at_pixel(&mut Reader::new(&[0x01, 0x00])).is_err());
        assert!(read_at_pixel(&mut Reader::new(&[0x00, 0x01])).is_err());
        // (3, -1), the usual first AT position, is allowed.
        assert!(read_at_pixel(&mut Reader::new(&[0x03, 0xFF])).is_ok());
    }
}
