//! Generic region decoding (7.4.6, 6.2).
//!
//! "This decoding procedure is used to decode a rectangular array of 0 or 1
//! values, which are coded one pixel at a time (i.e., it is used to decode a
//! bitmap using simple, generic, coding)." (6.2.1)

use super::{
    AdaptiveTemplatePixel, Region, RegionSegmentInfo, Template, parse_region_segment_info,
    read_at_pixel,
};
use crate::arithmetic_decoder::{ArithmeticDecoder, Context};
use crate::bitmap::Bitmap;
use crate::error::{Feature, ParseError, RegionError, Result, TemplateError, bail};
use crate::reader::Reader;

/// Parsed generic region segment data header (7.4.6.1).
#[derive(Debug, Clone)]
pub(crate) struct GenericRegionHeader {
    pub(crate) region_info: RegionSegmentInfo,
    /// "Bit 0: MMR" (7.4.6.2)
    pub(crate) mmr: bool,
    /// "Bits 1-2: GBTEMPLATE. If MMR is 1 then this field must contain the
    /// value zero." (7.4.6.2)
    pub(crate) template: Template,
    /// "Bit 3: TPGDON. This field specifies whether typical prediction for
    /// generic direct coding is used." (7.4.6.2)
    pub(crate) tpgdon: bool,
    /// "GBAT" - adaptive template pixels (7.4.6.3). Empty when MMR is 1.
    pub(crate) at_pixels: Vec<AdaptiveTemplatePixel>,
}

/// Parse a generic region segment data header (7.4.6.1).
pub(crate) fn parse_generic_region_header(reader: &mut Reader<'_>) -> Result<GenericRegionHeader> {
    let region_info = parse_region_segment_info(reader)?;

    // 7.4.6.2 Generic region segment flags
    let flags = reader.read_byte().ok_or(ParseError::UnexpectedEof)?;
    let mmr = flags & 0x01 != 0;
    let template = Template::from_value(flags >> 1);
    let tpgdon = flags & 0x08 != 0;

    // "Bit 4: EXTTEMPLATE. This field specifies whether the generic region
    // uses the extended reference template." (7.4.6.2)
    if flags & 0x10 != 0 {
        bail!(Feature::ExtendedTemplate);
    }

    // "Bits 5-7: Reserved; must be 0."
    if flags & 0xE0 != 0 {
        bail!(RegionError::ReservedBits);
    }

    if mmr && template != Template::Template0 {
        bail!(TemplateError::Invalid);
    }

    // 7.4.6.3 Generic region segment AT flags
    // "This field is only present if MMR is 0."
    let at_pixels = if mmr {
        Vec::new()
    } else {
        let mut pixels = Vec::with_capacity(template.at_pixel_count());
        for _ in 0..template.at_pixel_count() {
            pixels.push(read_at_pixel(reader)?);
        }
        pixels
    };

    Ok(GenericRegionHeader {
        region_info,
        mmr,
        template,
        tpgdon,
        at_pixels,
    })
}

/// Decode a generic region segment's data part (7.4.6, 6.2).
///
/// "The data parts of all three of the generic region segment types are coded
/// identically, but are acted upon differently." (7.4.6)
pub(crate) fn decode_generic_region(
    reader: &mut Reader<'_>,
    had_unknown_length: bool,
) -> Result<Region> {
    let mut header = parse_generic_region_header(reader)?;
    let mut data = reader.tail().ok_or(ParseError::UnexpectedEof)?;

    // "As a special case, as noted in 7.2.7, an immediate generic region
    // segment may have an unknown length. In this case, [the segment] also
    // indicates the height of the generic region ...; it must be no greater
    // than the region segment bitmap height value in the segment's region
    // segment information field." (7.4.6.4)
    if had_unknown_length {
        // The segment parser located the end marker, so the last four bytes
        // are the row count.
        if data.len() < 4 {
            bail!(ParseError::UnexpectedEof);
        }
        let (coded, row_count_bytes) = data.split_at(data.len() - 4);
        let row_count = u32::from_be_bytes(row_count_bytes.try_into().unwrap());

        if row_count > header.region_info.height {
            bail!(RegionError::InvalidDimension);
        }

        header.region_info.height = row_count;
        data = coded;
    }

    let mut bitmap = Bitmap::new(header.region_info.width, header.region_info.height);

    if header.mmr {
        // "6.2.6 Decoding using MMR coding"
        decode_bitmap_mmr(&mut bitmap, data)?;
    } else {
        // "6.2.5 Decoding using a template and arithmetic coding"
        let mut decoder = ArithmeticDecoder::new(data);
        let mut contexts = vec![Context::default(); 1 << header.template.context_bits()];
        decode_bitmap(
            &mut bitmap,
            &mut decoder,
            &mut contexts,
            header.template,
            header.tpgdon,
            None,
            &header.at_pixels,
        )?;
    }

    Ok(Region {
        info: header.region_info,
        bitmap,
    })
}

/// Decode a bitmap with MMR coding (6.2.6).
///
/// "If MMR is 1, the generic region decoding procedure is identical to an MMR
/// decoder described in Recommendation ITU-T T.6 (G4)." (6.2.6)
///
/// Returns the number of coded bytes consumed.
pub(crate) fn decode_bitmap_mmr(bitmap: &mut Bitmap, data: &[u8]) -> Result<usize> {
    let settings = hayro_ccitt::DecodeSettings {
        columns: bitmap.width(),
        rows: bitmap.height(),
        // "If the number of bytes contained in the encoded bitmap is known in
        // advance, then it is permissible for the data stream not to contain
        // an EOFB at the end of the MMR-encoded data." (6.2.6) It may still
        // carry one, so accept both.
        end_of_block: true,
        end_of_line: false,
        rows_are_byte_aligned: false,
        encoding: hayro_ccitt::EncodingMode::Group4,
        // "Pixels decoded by the MMR decoder having the value 'black' shall be
        // treated as having the value 1." (6.2.6) hayro-ccitt emits 1 for
        // white, so invert.
        invert_black: true,
    };

    let mut sink = MmrSink {
        bitmap,
        x: 0,
        y: 0,
        rows_completed: 0,
    };

    let consumed = hayro_ccitt::decode(data, &mut sink, &settings)
        .ok_or(RegionError::MmrSizeMismatch)?;

    // The decoded data must cover the region exactly.
    if sink.rows_completed != sink.bitmap.height() {
        bail!(RegionError::MmrSizeMismatch);
    }

    Ok(consumed)
}

/// A CCITT decoder sink that packs rows into a [`Bitmap`].
struct MmrSink<'a> {
    bitmap: &'a mut Bitmap,
    /// Next column to write, in pixels.
    x: u32,
    y: u32,
    rows_completed: u32,
}

impl MmrSink<'_> {
    fn write_byte(&mut self, byte: u8) {
        if self.y >= self.bitmap.height() || self.x >= self.bitmap.width() {
            return;
        }

        // The sink is only ever handed whole bytes in column order, so each
        // lands on a byte boundary of the packed row.
        let index = (self.x / 8) as usize;
        self.bitmap.row_mut(self.y)[index] = byte;
        self.x += 8;
    }
}

impl hayro_ccitt::Decoder for MmrSink<'_> {
    fn push_byte(&mut self, byte: u8) {
        self.write_byte(byte);
    }

    fn push_bytes(&mut self, byte: u8, count: usize) {
        for _ in 0..count {
            self.write_byte(byte);
        }
    }

    fn next_line(&mut self) {
        self.x = 0;
        self.y += 1;
        self.rows_completed += 1;
    }
}

/// Decode a bitmap with template-based arithmetic coding (6.2.5).
///
/// The caller owns the decoder and context array so that symbol dictionaries
/// can run many bitmaps through one shared coding state (Table 16).
pub(crate) fn decode_bitmap(
    bitmap: &mut Bitmap,
    decoder: &mut ArithmeticDecoder<'_>,
    contexts: &mut [Context],
    template: Template,
    tpgdon: bool,
    skip: Option<&Bitmap>,
    at_pixels: &[AdaptiveTemplatePixel],
) -> Result<()> {
    if let Some(skip) = skip
        && (skip.width() != bitmap.width() || skip.height() != bitmap.height())
    {
        bail!(RegionError::InvalidDimension);
    }

    // "1) Set: LTP = 0" (6.2.5.7)
    let mut ltp = false;

    for y in 0..bitmap.height() {
        // "b) If TPGDON is 1, then decode a bit using the arithmetic entropy
        // coder ... Let SLTP be the value of this bit. Set: LTP = LTP XOR
        // SLTP" (6.2.5.7)
        if tpgdon {
            // The SLTP contexts of Figures 8-11.
            let sltp_context: u32 = match template {
                Template::Template0 => 0b1001_1011_0010_0101,
                Template::Template1 => 0b0_0111_1001_0101,
                Template::Template2 => 0b00_1110_0101,
                Template::Template3 => 0b01_1001_0101,
            };
            let sltp = decoder.decode(&mut contexts[sltp_context as usize]);
            ltp = ltp != (sltp != 0);
        }

        if ltp {
            // "c) If LTP = 1 then set every pixel of the current row of GBREG
            // equal to the corresponding pixel of the row immediately above."
            // (6.2.5.7) For the top row that row is all zero, which the fresh
            // bitmap already is.
            if y > 0 {
                for x in 0..bitmap.width() {
                    let above = bitmap.get_pixel(x, y - 1);
                    bitmap.set_pixel(x, y, above);
                }
            }
        } else {
            // "d) If LTP = 0 then, from left to right, decode each pixel of
            // the current row of GBREG." (6.2.5.7)
            for x in 0..bitmap.width() {
                // "If USESKIP is 1 and the pixel in the bitmap SKIP at the
                // location corresponding to the current pixel is 1, then set
                // the current pixel to 0." (6.2.5.7)
                if let Some(skip) = skip
                    && skip.get_pixel(x, y)
                {
                    continue;
                }

                let context = gather_context(bitmap, x, y, template, at_pixels);
                let pixel = decoder.decode(&mut contexts[context as usize]);
                bitmap.set_pixel(x, y, pixel != 0);
            }
        }
    }

    Ok(())
}

/// Get a pixel for template purposes: out-of-range reads yield 0 (6.2.5.2).
///
/// "All pixels lying outside the bounds of the actual bitmap have the value 0."
#[inline(always)]
fn pixel(bitmap: &Bitmap, x: i32, y: i32) -> u32 {
    if x < 0 || y < 0 || x >= bitmap.width() as i32 {
        0
    } else {
        bitmap.get_pixel(x as u32, y as u32) as u32
    }
}

/// Form the CONTEXT value for the pixel at (x, y) (6.2.5.7 step 3 d).
///
/// The four neighborhoods are written out one by one on purpose: each
/// template's bit order is fixed by the standard's figures and must match the
/// probability model bit for bit.
#[inline(always)]
pub(crate) fn gather_context(
    bitmap: &Bitmap,
    x: u32,
    y: u32,
    template: Template,
    at: &[AdaptiveTemplatePixel],
) -> u32 {
    match template {
        Template::Template0 => gather_context_template0(bitmap, x, y, at),
        Template::Template1 => gather_context_template1(bitmap, x, y, at),
        Template::Template2 => gather_context_template2(bitmap, x, y, at),
        Template::Template3 => gather_context_template3(bitmap, x, y, at),
    }
}

/// The 16-pixel neighborhood of Figure 3, MSB first.
fn gather_context_template0(
    bitmap: &Bitmap,
    x: u32,
    y: u32,
    at: &[AdaptiveTemplatePixel],
) -> u32 {
    let x = x as i32;
    let y = y as i32;

    let mut context = 0_u32;

    context = (context << 1) | pixel(bitmap, x + at[3].x as i32, y + at[3].y as i32);
    context = (context << 1) | pixel(bitmap, x - 1, y - 2);
    context = (context << 1) | pixel(bitmap, x, y - 2);
    context = (context << 1) | pixel(bitmap, x + 1, y - 2);
    context = (context << 1) | pixel(bitmap, x + at[2].x as i32, y + at[2].y as i32);

    context = (context << 1) | pixel(bitmap, x + at[1].x as i32, y + at[1].y as i32);
    context = (context << 1) | pixel(bitmap, x - 2, y - 1);
    context = (context << 1) | pixel(bitmap, x - 1, y - 1);
    context = (context << 1) | pixel(bitmap, x, y - 1);
    context = (context << 1) | pixel(bitmap, x + 1, y - 1);
    context = (context << 1) | pixel(bitmap, x + 2, y - 1);
    context = (context << 1) | pixel(bitmap, x + at[0].x as i32, y + at[0].y as i32);

    context = (context << 1) | pixel(bitmap, x - 4, y);
    context = (context << 1) | pixel(bitmap, x - 3, y);
    context = (context << 1) | pixel(bitmap, x - 2, y);
    context = (context << 1) | pixel(bitmap, x - 1, y);

    context
}

/// The 13-pixel neighborhood of Figure 4, MSB first.
fn gather_context_template1(
    bitmap: &Bitmap,
    x: u32,
    y: u32,
    at: &[AdaptiveTemplatePixel],
) -> u32 {
    let x = x as i32;
    let y = y as i32;

    let mut context = 0_u32;

    context = (context << 1) | pixel(bitmap, x - 1, y - 2);
    context = (context << 1) | pixel(bitmap, x, y - 2);
    context = (context << 1) | pixel(bitmap, x + 1, y - 2);
    context = (context << 1) | pixel(bitmap, x + 2, y - 2);

    context = (context << 1) | pixel(bitmap, x - 2, y - 1);
    context = (context << 1) | pixel(bitmap, x - 1, y - 1);
    context = (context << 1) | pixel(bitmap, x, y - 1);
    context = (context << 1) | pixel(bitmap, x + 1, y - 1);
    context = (context << 1) | pixel(bitmap, x + 2, y - 1);
    context = (context << 1) | pixel(bitmap, x + at[0].x as i32, y + at[0].y as i32);

    context = (context << 1) | pixel(bitmap, x - 3, y);
    context = (context << 1) | pixel(bitmap, x - 2, y);
    context = (context << 1) | pixel(bitmap, x - 1, y);

    context
}

/// The 10-pixel neighborhood of Figure 5, MSB first.
fn gather_context_template2(
    bitmap: &Bitmap,
    x: u32,
    y: u32,
    at: &[AdaptiveTemplatePixel],
) -> u32 {
    let x = x as i32;
    let y = y as i32;

    let mut context = 0_u32;

    context = (context << 1) | pixel(bitmap, x - 1, y - 2);
    context = (context << 1) | pixel(bitmap, x, y - 2);
    context = (context << 1) | pixel(bitmap, x + 1, y - 2);

    context = (context << 1) | pixel(bitmap, x - 2, y - 1);
    context = (context << 1) | pixel(bitmap, x - 1, y - 1);
    context = (context << 1) | pixel(bitmap, x, y - 1);
    context = (context << 1) | pixel(bitmap, x + 1, y - 1);
    context = (context << 1) | pixel(bitmap, x + at[0].x as i32, y + at[0].y as i32);

    context = (context << 1) | pixel(bitmap, x - 2, y);
    context = (context << 1) | pixel(bitmap, x - 1, y);

    context
}

/// The 10-pixel single-row neighborhood of Figure 6, MSB first.
fn gather_context_template3(
    bitmap: &Bitmap,
    x: u32,
    y: u32,
    at: &[AdaptiveTemplatePixel],
) -> u32 {
    let x = x as i32;
    let y = y as i32;

    let mut context = 0_u32;

    context = (context << 1) | pixel(bitmap, x - 3, y - 1);
    context = (context << 1) | pixel(bitmap, x - 2, y - 1);
    context = (context << 1) | pixel(bitmap, x - 1, y - 1);
    context = (context << 1) | pixel(bitmap, x, y - 1);
    context = (context << 1) | pixel(bitmap, x + 1, y - 1);
    context = (context << 1) | pixel(bitmap, x + at[0].x as i32, y + at[0].y as i32);

    context = (context << 1) | pixel(bitmap, x - 4, y);
    context = (context << 1) | pixel(bitmap, x - 3, y);
    context = (context << 1) | pixel(bitmap, x - 2, y);
    context = (context << 1) | pixel(bitmap, x - 1, y);

    context
}
