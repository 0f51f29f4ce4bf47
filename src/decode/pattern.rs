//! Pattern dictionary decoding (7.4.4, 6.7).

use std::sync::Arc;

use super::{AdaptiveTemplatePixel, Template};
use crate::arithmetic_decoder::{ArithmeticDecoder, Context};
use crate::bitmap::Bitmap;
use crate::error::{DecodeError, ParseError, RegionError, Result, TemplateError, bail};
use crate::reader::Reader;

/// A decoded pattern dictionary.
///
/// "HDPATS - The patterns exported by this pattern dictionary. Contains
/// GRAYMAX + 1 patterns." (Table 25)
#[derive(Debug, Clone)]
pub(crate) struct PatternDictionary {
    /// The patterns, indexed 0 through GRAYMAX.
    pub(crate) patterns: Vec<Arc<Bitmap>>,
    pub(crate) pattern_width: u32,
    pub(crate) pattern_height: u32,
}

/// Parsed pattern dictionary segment data header (7.4.4.1).
#[derive(Debug, Clone)]
struct PatternDictionaryHeader {
    /// "Bit 0: HDMMR" (7.4.4.1.1)
    mmr: bool,
    /// "Bits 1-2: HDTEMPLATE. If HDMMR is 1, this field must contain the
    /// value 0." (7.4.4.1.1)
    template: Template,
    /// "HDPW: ... the width of the patterns defined in this pattern
    /// dictionary. Its value must be greater than zero." (7.4.4.1.2)
    pattern_width: u8,
    /// "HDPH: ... the height of the patterns. Its value must be greater than
    /// zero." (7.4.4.1.3)
    pattern_height: u8,
    /// "GRAYMAX: ... one less than the number of patterns defined in this
    /// pattern dictionary." (7.4.4.1.4)
    graymax: u32,
}

fn parse_pattern_dictionary_header(reader: &mut Reader<'_>) -> Result<PatternDictionaryHeader> {
    // 7.4.4.1.1 Pattern dictionary flags
    let flags = reader.read_byte().ok_or(ParseError::UnexpectedEof)?;
    let mmr = flags & 0x01 != 0;
    let template = Template::from_value(flags >> 1);

    // "Bits 3-7: Reserved; must be 0."
    if flags & 0xF8 != 0 {
        bail!(RegionError::ReservedBits);
    }

    if mmr && template != Template::Template0 {
        bail!(TemplateError::Invalid);
    }

    let pattern_width = reader.read_byte().ok_or(ParseError::UnexpectedEof)?;
    let pattern_height = reader.read_byte().ok_or(ParseError::UnexpectedEof)?;
    if pattern_width == 0 || pattern_height == 0 {
        bail!(RegionError::InvalidDimension);
    }

    let graymax = reader.read_u32().ok_or(ParseError::UnexpectedEof)?;

    Ok(PatternDictionaryHeader {
        mmr,
        template,
        pattern_width,
        pattern_height,
        graymax,
    })
}

/// Decode a pattern dictionary segment's data part (7.4.4.2, 6.7).
pub(crate) fn decode_pattern_dictionary(reader: &mut Reader<'_>) -> Result<PatternDictionary> {
    let header = parse_pattern_dictionary_header(reader)?;

    let pattern_width = header.pattern_width as u32;
    let pattern_height = header.pattern_height as u32;
    let pattern_count = header.graymax.checked_add(1).ok_or(DecodeError::Overflow)?;

    // "1) Create a bitmap B_HDC. The height of this bitmap is HDPH. The width
    // of the bitmap is (GRAYMAX + 1) × HDPW. This bitmap contains all the
    // patterns concatenated left to right." (6.7.5)
    let collective_width = pattern_count
        .checked_mul(pattern_width)
        .ok_or(DecodeError::Overflow)?;
    let mut collective = Bitmap::new(collective_width, pattern_height);

    let data = reader.tail().ok_or(ParseError::UnexpectedEof)?;

    // "2) Decode the collective bitmap using a generic region decoding
    // procedure. Set the parameters to this decoding procedure as shown in
    // Table 27." (6.7.5)
    if header.mmr {
        super::generic::decode_bitmap_mmr(&mut collective, data)?;
    } else {
        // Table 27 pins the first AT pixel to (-HDPW, 0), which ties each
        // pattern's leftmost column to the same column of its neighbor.
        let at_pixels = [
            AdaptiveTemplatePixel::at(-(pattern_width as i16), 0),
            AdaptiveTemplatePixel::at(-3, -1),
            AdaptiveTemplatePixel::at(2, -2),
            AdaptiveTemplatePixel::at(-2, -2),
        ];
        let at_pixels = &at_pixels[..header.template.at_pixel_count()];

        let mut decoder = ArithmeticDecoder::new(data);
        let mut contexts = vec![Context::default(); 1 << header.template.context_bits()];
        super::generic::decode_bitmap(
            &mut collective,
            &mut decoder,
            &mut contexts,
            header.template,
            // Table 27: "TPGDON = 0"
            false,
            None,
            at_pixels,
        )?;
    }

    // "4) While GRAY <= GRAYMAX: ... let the subimage of B_HDC consisting of
    // HDPH rows and columns HDPW × GRAY through HDPW × (GRAY + 1) - 1 be
    // denoted B_P. Set: HDPATS[GRAY] = B_P" (6.7.5)
    let mut patterns = Vec::with_capacity(pattern_count as usize);
    for gray in 0..pattern_count {
        let pattern =
            collective.subbitmap(gray * pattern_width, 0, pattern_width, pattern_height);
        patterns.push(Arc::new(pattern));
    }

    Ok(PatternDictionary {
        patterns,
        pattern_width,
        pattern_height,
    })
}
