//! Halftone region decoding (7.4.5, 6.6).

use super::pattern::PatternDictionary;
use super::{CombinationOperator, Region, RegionSegmentInfo, Template, parse_region_segment_info};
use crate::bitmap::Bitmap;
use crate::error::{DecodeError, ParseError, RegionError, Result};
use crate::gray_scale::{GrayScaleParams, decode_gray_scale_image};
use crate::reader::Reader;

/// Parsed halftone region segment data header (7.4.5.1).
#[derive(Debug, Clone)]
struct HalftoneRegionHeader {
    region_info: RegionSegmentInfo,
    /// "Bit 0: HMMR" (7.4.5.1.1)
    mmr: bool,
    /// "Bits 1-2: HTEMPLATE" (7.4.5.1.1)
    template: Template,
    /// "Bit 3: HENABLESKIP" (7.4.5.1.1)
    enable_skip: bool,
    /// "Bits 4-6: HCOMBOP" (7.4.5.1.1)
    combination_operator: CombinationOperator,
    /// "Bit 7: HDEFPIXEL" (7.4.5.1.1)
    default_pixel: bool,
    /// "HGW" / "HGH" - the gray-scale image size (7.4.5.1.2).
    grid_width: u32,
    grid_height: u32,
    /// "HGX" / "HGY" - the grid origin, signed (7.4.5.1.2).
    grid_x: i32,
    grid_y: i32,
    /// "HRX" / "HRY" - 256 times the grid vector coordinates (7.4.5.1.3).
    vector_x: u16,
    vector_y: u16,
}

fn parse_halftone_region_header(reader: &mut Reader<'_>) -> Result<HalftoneRegionHeader> {
    let region_info = parse_region_segment_info(reader)?;

    // 7.4.5.1.1 Halftone region segment flags
    let flags = reader.read_byte().ok_or(ParseError::UnexpectedEof)?;
    let mmr = flags & 0x01 != 0;
    let template = Template::from_value(flags >> 1);
    let enable_skip = flags & 0x08 != 0;
    let combination_operator = CombinationOperator::from_value((flags >> 4) & 0x07)?;
    let default_pixel = flags & 0x80 != 0;

    // 7.4.5.1.2 Halftone grid position and size
    let grid_width = reader.read_u32().ok_or(ParseError::UnexpectedEof)?;
    let grid_height = reader.read_u32().ok_or(ParseError::UnexpectedEof)?;
    let grid_x = reader.read_i32().ok_or(ParseError::UnexpectedEof)?;
    let grid_y = reader.read_i32().ok_or(ParseError::UnexpectedEof)?;

    // 7.4.5.1.3 Halftone grid vector
    let vector_x = reader.read_u16().ok_or(ParseError::UnexpectedEof)?;
    let vector_y = reader.read_u16().ok_or(ParseError::UnexpectedEof)?;

    Ok(HalftoneRegionHeader {
        region_info,
        mmr,
        template,
        enable_skip,
        combination_operator,
        default_pixel,
        grid_width,
        grid_height,
        grid_x,
        grid_y,
        vector_x,
        vector_y,
    })
}

/// Decode a halftone region segment's data part (7.4.5.2, 6.6).
pub(crate) fn decode_halftone_region(
    reader: &mut Reader<'_>,
    pattern_dict: &PatternDictionary,
) -> Result<Region> {
    let header = parse_halftone_region_header(reader)?;

    // "1) Fill a bitmap HTREG, of the size given by HBW and HBH, with the
    // HDEFPIXEL value." (6.6.5)
    let mut bitmap = Bitmap::new(header.region_info.width, header.region_info.height);
    if header.default_pixel {
        bitmap.fill(true);
    }

    // "2) If HENABLESKIP equals 1, compute a bitmap HSKIP as shown in
    // 6.6.5.1." (6.6.5)
    let skip = if header.enable_skip {
        Some(compute_skip_bitmap(&header, pattern_dict)?)
    } else {
        None
    };

    // "3) Set HBPP to ceil(log2(HNUMPATS))." (6.6.5)
    let bits_per_pixel = (pattern_dict.patterns.len() as u32)
        .saturating_sub(1)
        .checked_ilog2()
        .map_or(1, |bits| bits + 1);

    let data = reader.tail().ok_or(ParseError::UnexpectedEof)?;

    // "4) Decode an image GI of size HGW by HGH with HBPP bits per pixel
    // using the gray-scale image decoding procedure as described in Annex C."
    // (6.6.5)
    let params = GrayScaleParams {
        use_mmr: header.mmr,
        bits_per_pixel,
        width: header.grid_width,
        height: header.grid_height,
        template: header.template,
        skip: skip.as_ref(),
    };
    let gray_values = decode_gray_scale_image(data, &params)?;

    // "5) Place sequentially the patterns corresponding to the values in GI
    // into HTREG by the procedure described in 6.6.5.2." (6.6.5)
    for m_g in 0..header.grid_height {
        for n_g in 0..header.grid_width {
            let (x, y) = grid_coordinates(&header, m_g, n_g)?;

            let value = gray_values[(m_g * header.grid_width + n_g) as usize];
            let pattern = pattern_dict
                .patterns
                .get(value as usize)
                .ok_or(RegionError::GrayScaleOutOfRange)?;

            // "ii) Draw the pattern HPATS[GI[n_g, m_g]] into HTREG such that
            // its upper left pixel is at location (x, y) in HTREG." (6.6.5.2)
            bitmap.combine(pattern, x, y, header.combination_operator);
        }
    }

    Ok(Region {
        info: header.region_info,
        bitmap,
    })
}

/// Compute one halftone grid cell position (6.6.5.1, 6.6.5.2):
///
///   x = (HGX + m_g × HRY + n_g × HRX) >> 8
///   y = (HGY + m_g × HRX - n_g × HRY) >> 8
///
/// The shift is arithmetic, so cells left of or above the region stay
/// negative.
fn grid_coordinates(header: &HalftoneRegionHeader, m_g: u32, n_g: u32) -> Result<(i32, i32)> {
    let vector_x = header.vector_x as i64;
    let vector_y = header.vector_y as i64;
    let m_g = m_g as i64;
    let n_g = n_g as i64;

    let x = (header.grid_x as i64 + m_g * vector_y + n_g * vector_x) >> 8;
    let y = (header.grid_y as i64 + m_g * vector_x - n_g * vector_y) >> 8;

    let x = i32::try_from(x).map_err(|_| DecodeError::Overflow)?;
    let y = i32::try_from(y).map_err(|_| DecodeError::Overflow)?;

    Ok((x, y))
}

/// Compute the HSKIP bitmap (6.6.5.1): a grid cell is skipped when its
/// pattern would fall entirely outside the region.
fn compute_skip_bitmap(
    header: &HalftoneRegionHeader,
    pattern_dict: &PatternDictionary,
) -> Result<Bitmap> {
    let pattern_width = pattern_dict.pattern_width as i32;
    let pattern_height = pattern_dict.pattern_height as i32;
    let region_width = header.region_info.width as i32;
    let region_height = header.region_info.height as i32;

    let mut skip = Bitmap::new(header.grid_width, header.grid_height);

    for m_g in 0..header.grid_height {
        for n_g in 0..header.grid_width {
            let (x, y) = grid_coordinates(header, m_g, n_g)?;

            // "ii) If ((x + HPW <= 0) OR (x >= HBW) OR (y + HPH <= 0) OR
            // (y >= HBH)) then set: HSKIP[n_g, m_g] = 1" (6.6.5.1)
            let outside = x + pattern_width <= 0
                || x >= region_width
                || y + pattern_height <= 0
                || y >= region_height;

            if outside {
                skip.set_pixel(n_g, m_g, true);
            }
        }
    }

    Ok(skip)
}
