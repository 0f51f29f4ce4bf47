//! Generic refinement decoding (6.3).
//!
//! "There is a reference bitmap known to the decoding procedure, and this is
//! used as part of the decoding process. The reference bitmap is intended to
//! resemble the bitmap being decoded, and this similarity is used to increase
//! compression." (6.3.1)
//!
//! Only the bitmap-level procedure lives here: refinement is reachable through
//! symbol dictionaries (6.5.8.2.2) and text region symbol instances (6.4.11),
//! both of which run it with typical prediction off. Top-level refinement
//! region segments are rejected by the segment dispatcher.

use super::{AdaptiveTemplatePixel, RefinementTemplate, read_at_pixel, read_unrestricted_at_pixel};
use crate::arithmetic_decoder::{ArithmeticDecoder, Context};
use crate::bitmap::Bitmap;
use crate::error::{Feature, Result, bail};
use crate::reader::Reader;

/// Read the two refinement AT pixels (7.4.2.1.3, 7.4.3.1.3).
///
/// The first samples the bitmap being decoded and is restricted like every
/// generic AT pixel; the second samples the reference bitmap, where any
/// offset is meaningful (6.3.5.3).
pub(crate) fn read_refinement_at_pixels(
    reader: &mut Reader<'_>,
) -> Result<[AdaptiveTemplatePixel; 2]> {
    let first = read_at_pixel(reader)?;
    let second = read_unrestricted_at_pixel(reader)?;
    Ok([first, second])
}

/// Decode a refinement bitmap (6.3.5.6).
///
/// The caller owns the decoder and contexts, so one coding state can span the
/// many refinements of a symbol dictionary or text region (Tables 12 and 18).
#[allow(clippy::too_many_arguments)]
pub(crate) fn decode_refinement_bitmap(
    bitmap: &mut Bitmap,
    decoder: &mut ArithmeticDecoder<'_>,
    contexts: &mut [Context],
    reference: &Bitmap,
    reference_dx: i32,
    reference_dy: i32,
    template: RefinementTemplate,
    at_pixels: &[AdaptiveTemplatePixel; 2],
    tpgron: bool,
) -> Result<()> {
    // "TPGRON" selects typical prediction (6.3.5.6 step 3 b). Neither of the
    // nested uses of refinement can switch it on, so no probability model for
    // it is kept here.
    if tpgron {
        bail!(Feature::RefinementTypicalPrediction);
    }

    for y in 0..bitmap.height() {
        // "c) If LTP = 0 then, from left to right, explicitly decode all
        // pixels of the current row of GRREG." (6.3.5.6)
        for x in 0..bitmap.width() {
            let context = gather_refinement_context(
                bitmap,
                reference,
                x,
                y,
                reference_dx,
                reference_dy,
                template,
                at_pixels,
            );
            let pixel = decoder.decode(&mut contexts[context as usize]);
            bitmap.set_pixel(x, y, pixel != 0);
        }
    }

    Ok(())
}

/// Out-of-range reads of either bitmap yield 0 (6.3.5.2).
///
/// "All pixels lying outside the bounds of the actual bitmap or the reference
/// bitmap have the value 0."
#[inline(always)]
fn pixel(bitmap: &Bitmap, x: i32, y: i32) -> u32 {
    if x < 0 || y < 0 || x >= bitmap.width() as i32 || y >= bitmap.height() as i32 {
        0
    } else {
        bitmap.get_pixel(x as u32, y as u32) as u32
    }
}

/// Form the refinement CONTEXT for the pixel at (x, y) (6.3.5.3).
///
/// The two neighborhoods mix pixels of the bitmap being decoded with pixels
/// of the reference bitmap; the bit orders are those of Figures 12 and 13.
#[allow(clippy::too_many_arguments)]
#[inline(always)]
fn gather_refinement_context(
    bitmap: &Bitmap,
    reference: &Bitmap,
    x: u32,
    y: u32,
    reference_dx: i32,
    reference_dy: i32,
    template: RefinementTemplate,
    at_pixels: &[AdaptiveTemplatePixel; 2],
) -> u32 {
    let x = x as i32;
    let y = y as i32;

    // "GRREFERENCEDX/GRREFERENCEDY - The offset of the reference bitmap with
    // respect to the bitmap being decoded." (Table 6)
    let rx = x - reference_dx;
    let ry = y - reference_dy;

    match template {
        RefinementTemplate::Template0 => {
            // Figure 12: 13 pixels, 4 from the output (including AT1) and 9
            // from the reference (including AT2).
            let at1 = at_pixels[0];
            let at2 = at_pixels[1];

            let mut context = 0_u32;

            context = (context << 1) | pixel(bitmap, x + at1.x as i32, y + at1.y as i32);
            context = (context << 1) | pixel(bitmap, x, y - 1);
            context = (context << 1) | pixel(bitmap, x + 1, y - 1);
            context = (context << 1) | pixel(bitmap, x - 1, y);

            context = (context << 1) | pixel(reference, rx + at2.x as i32, ry + at2.y as i32);
            context = (context << 1) | pixel(reference, rx, ry - 1);
            context = (context << 1) | pixel(reference, rx + 1, ry - 1);
            context = (context << 1) | pixel(reference, rx - 1, ry);
            context = (context << 1) | pixel(reference, rx, ry);
            context = (context << 1) | pixel(reference, rx + 1, ry);
            context = (context << 1) | pixel(reference, rx - 1, ry + 1);
            context = (context << 1) | pixel(reference, rx, ry + 1);
            context = (context << 1) | pixel(reference, rx + 1, ry + 1);

            context
        }
        RefinementTemplate::Template1 => {
            // Figure 13: 10 pixels, 4 from the output and 6 from the
            // reference; no AT pixels.
            let mut context = 0_u32;

            context = (context << 1) | pixel(bitmap, x - 1, y - 1);
            context = (context << 1) | pixel(bitmap, x, y - 1);
            context = (context << 1) | pixel(bitmap, x + 1, y - 1);
            context = (context << 1) | pixel(bitmap, x - 1, y);

            context = (context << 1) | pixel(reference, rx, ry - 1);
            context = (context << 1) | pixel(reference, rx - 1, ry);
            context = (context << 1) | pixel(reference, rx, ry);
            context = (context << 1) | pixel(reference, rx + 1, ry);
            context = (context << 1) | pixel(reference, rx, ry + 1);
            context = (context << 1) | pixel(reference, rx + 1, ry + 1);

            context
        }
    }
}
