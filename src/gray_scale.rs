//! Gray-scale image decoding (Annex C).
//!
//! "A gray-scale image is decoded as a series of bitplanes, from the most
//! significant to the least significant. The bitplanes are Gray coded."
//! (C.2)

use crate::arithmetic_decoder::{ArithmeticDecoder, Context};
use crate::bitmap::Bitmap;
use crate::decode::generic::decode_bitmap;
use crate::decode::{AdaptiveTemplatePixel, Template};
use crate::error::{Feature, RegionError, Result, bail};

/// Input parameters of the gray-scale image decoding procedure (Table C.1).
#[derive(Debug, Clone)]
pub(crate) struct GrayScaleParams<'a> {
    /// "GSMMR" - whether the bitplanes are MMR coded.
    pub(crate) use_mmr: bool,
    /// "GSBPP" - bits per gray-scale value.
    pub(crate) bits_per_pixel: u32,
    /// "GSW" / "GSH" - the gray-scale image size.
    pub(crate) width: u32,
    pub(crate) height: u32,
    /// "GSTEMPLATE" - the generic template coding the bitplanes.
    pub(crate) template: Template,
    /// "GSKIP" - pixels to skip, GSW × GSH. `None` when GSUSESKIP is 0.
    pub(crate) skip: Option<&'a Bitmap>,
}

/// Decode a gray-scale image (C.5). Values are returned in row-major order.
pub(crate) fn decode_gray_scale_image(data: &[u8], params: &GrayScaleParams<'_>) -> Result<Vec<u64>> {
    if params.bits_per_pixel == 0 || params.bits_per_pixel > 63 {
        bail!(RegionError::InvalidDimension);
    }

    // The MMR variant would need the byte length of every bitplane to slice
    // the coded data, and JBIG2 does not record those lengths.
    if params.use_mmr {
        bail!(Feature::MmrGrayScale);
    }

    // Table C.4: the bitplanes share one decoder, one context array, and the
    // AT pixel positions below.
    let first_at_x = match params.template {
        Template::Template0 | Template::Template1 => 3,
        Template::Template2 | Template::Template3 => 2,
    };
    let at_pixels = [
        AdaptiveTemplatePixel::at(first_at_x, -1),
        AdaptiveTemplatePixel::at(-3, -1),
        AdaptiveTemplatePixel::at(2, -2),
        AdaptiveTemplatePixel::at(-2, -2),
    ];
    let at_pixels = &at_pixels[..params.template.at_pixel_count()];

    let mut decoder = ArithmeticDecoder::new(data);
    let mut contexts = vec![Context::default(); 1 << params.template.context_bits()];

    let size = params.width as usize * params.height as usize;
    let mut values = vec![0_u64; size];

    // "1) Decode GSPLANES[GSBPP - 1] using the generic region decoding
    // procedure", then each lower plane, XORing as Gray decoding goes
    // (C.5 steps 2 and 3).
    let mut previous_plane: Option<Bitmap> = None;

    for j in (0..params.bits_per_pixel).rev() {
        let mut plane = Bitmap::new(params.width, params.height);
        decode_bitmap(
            &mut plane,
            &mut decoder,
            &mut contexts,
            params.template,
            // Table C.4: "TPGDON = 0"
            false,
            params.skip,
            at_pixels,
        )?;

        // "3 b) GSPLANES[J][x, y] = GSPLANES[J + 1][x, y] XOR GSPLANES[J][x, y]"
        if let Some(previous) = &previous_plane {
            for y in 0..params.height {
                for x in 0..params.width {
                    let bit = plane.get_pixel(x, y) ^ previous.get_pixel(x, y);
                    plane.set_pixel(x, y, bit);
                }
            }
        }

        // "4) GSVALS[x, y] = sum over J of GSPLANES[J][x, y] * 2^J"
        for y in 0..params.height {
            for x in 0..params.width {
                if plane.get_pixel(x, y) {
                    values[(y * params.width + x) as usize] |= 1 << j;
                }
            }
        }

        previous_plane = Some(plane);
    }

    Ok(values)
}
