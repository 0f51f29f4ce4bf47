//! Page information segments and the pre-decode page scan (7.4.8, 8.2).

use crate::decode::CombinationOperator;
use crate::error::{FormatError, ParseError, Result, bail};
use crate::file::{File, Organization};
use crate::reader::Reader;
use crate::segment::SegmentType;

/// A parsed page information segment (7.4.8).
#[derive(Debug, Clone)]
pub(crate) struct PageInformation {
    /// "This is a four-byte value containing the width in pixels of the
    /// page's bitmap." (7.4.8.1)
    pub(crate) width: u32,
    /// "This is a four-byte value containing the height in pixels of the
    /// page's bitmap. ... A page's bitmap height may be declared to be
    /// unknown (by specifying a height of 0xFFFFFFFF)." (7.4.8.2)
    pub(crate) height: u32,
    /// Page resolution in pixels/metre; zero means unknown (7.4.8.3, 7.4.8.4).
    pub(crate) _x_resolution: u32,
    pub(crate) _y_resolution: u32,
    pub(crate) flags: PageFlags,
    pub(crate) striping: PageStriping,
}

impl PageInformation {
    pub(crate) fn height_is_unknown(&self) -> bool {
        self.height == 0xFFFF_FFFF
    }
}

/// Page segment flags (7.4.8.5).
#[derive(Debug, Clone)]
pub(crate) struct PageFlags {
    /// "Bit 0: Page is eventually lossless." (7.4.8.5)
    pub(crate) _is_eventually_lossless: bool,
    /// "Bit 1: Page might contain refinements." (7.4.8.5)
    pub(crate) _might_contain_refinements: bool,
    /// "Bit 2: Page default pixel value. This bit contains the initial value
    /// for every pixel in the page, before any region segments are decoded or
    /// drawn." (7.4.8.5)
    pub(crate) default_pixel: bool,
    /// "Bits 3-4: Page default combination operator." (7.4.8.5)
    ///
    /// Two bits only, so REPLACE cannot be a page default.
    pub(crate) default_combination_operator: CombinationOperator,
    /// "Bit 5: Page requires auxiliary buffers." (7.4.8.5)
    pub(crate) _requires_auxiliary_buffers: bool,
    /// "Bit 6: Page combination operator overridden. If this bit is 0, then
    /// every direct region segment associated with this page must use the
    /// page's default combination operator." (7.4.8.5)
    pub(crate) combination_operator_overridden: bool,
    /// "Bit 7: Page might contain coloured segment." (7.4.8.5)
    pub(crate) _might_contain_coloured: bool,
}

/// Page striping information (7.4.8.6).
#[derive(Debug, Clone)]
pub(crate) struct PageStriping {
    /// "Bit 15: Page is striped." (7.4.8.6)
    pub(crate) is_striped: bool,
    /// "Bits 0-14: Maximum stripe size." (7.4.8.6)
    pub(crate) maximum_stripe_size: u16,
}

/// Parse a page information segment's data part (7.4.8).
pub(crate) fn parse_page_information(data: &[u8]) -> Result<PageInformation> {
    let mut reader = Reader::new(data);

    let width = reader.read_u32().ok_or(ParseError::UnexpectedEof)?;
    let height = reader.read_u32().ok_or(ParseError::UnexpectedEof)?;
    let x_resolution = reader.read_u32().ok_or(ParseError::UnexpectedEof)?;
    let y_resolution = reader.read_u32().ok_or(ParseError::UnexpectedEof)?;

    let flags_byte = reader.read_byte().ok_or(ParseError::UnexpectedEof)?;
    let flags = PageFlags {
        _is_eventually_lossless: flags_byte & 0x01 != 0,
        _might_contain_refinements: flags_byte & 0x02 != 0,
        default_pixel: flags_byte & 0x04 != 0,
        default_combination_operator: CombinationOperator::from_page_value((flags_byte >> 3) & 0x03),
        _requires_auxiliary_buffers: flags_byte & 0x20 != 0,
        combination_operator_overridden: flags_byte & 0x40 != 0,
        _might_contain_coloured: flags_byte & 0x80 != 0,
    };

    let striping_word = reader.read_u16().ok_or(ParseError::UnexpectedEof)?;
    let striping = PageStriping {
        is_striped: striping_word & 0x8000 != 0,
        maximum_stripe_size: striping_word & 0x7FFF,
    };

    Ok(PageInformation {
        width,
        height,
        _x_resolution: x_resolution,
        _y_resolution: y_resolution,
        flags,
        striping,
    })
}

/// The resolved geometry of one page.
#[derive(Debug, Clone)]
pub(crate) struct PageLayout {
    pub(crate) information: PageInformation,
    /// The final page height: the declared height, or for pages declared with
    /// unknown height, the row below the last stripe.
    pub(crate) height: u32,
}

/// Pre-scan the segments of one page to resolve its size and validate its
/// structure (8.2, 7.4.9, 7.4.10).
///
/// The standard describes an incremental procedure so that striped pages can
/// stream; all input is present here, so one pass over the page's end of
/// stripe segments settles the height up front.
pub(crate) fn scan_page(file: &File<'_>, page_number: u32) -> Result<PageLayout> {
    let mut information: Option<PageInformation> = None;
    let mut resolved_height = 0_u32;
    let mut found_end_of_page = false;
    let mut height_of_last_stripe: Option<u32> = None;
    let mut last_stripe_index: Option<usize> = None;

    for (index, segment) in file.segments.iter().enumerate() {
        if segment.header.page_association != page_number {
            continue;
        }

        // "No segment may follow the end of page segment." (7.4.9; a trailing
        // end of file segment carries page association 0 and never gets here.)
        if found_end_of_page && segment.header.segment_type != SegmentType::EndOfFile {
            bail!(FormatError::SegmentAfterEndOfPage);
        }

        match segment.header.segment_type {
            SegmentType::PageInformation => {
                if information.is_some() {
                    bail!(FormatError::DuplicatePageInformation);
                }

                let parsed = parse_page_information(segment.data)?;

                // "If the page's bitmap height is unknown ... then the 'page
                // is striped' bit must be 1." (7.4.8.6)
                if parsed.height_is_unknown() && !parsed.striping.is_striped {
                    bail!(FormatError::UnknownPageHeight);
                }

                resolved_height = parsed.height;
                information = Some(parsed);
            }
            SegmentType::EndOfStripe => {
                let Some(information) = information.as_ref() else {
                    bail!(FormatError::StripeBeforePageInformation);
                };
                if !information.striping.is_striped {
                    bail!(FormatError::StripeOnUnstripedPage);
                }

                // "The segment data of an end of stripe segment consists of
                // one four-byte value, specifying the Y coordinate of the end
                // row." (7.4.10)
                let y_coordinate: [u8; 4] = segment
                    .data
                    .try_into()
                    .map_err(|_| FormatError::InvalidEndOfStripe)?;
                let stripe_end = u32::from_be_bytes(y_coordinate)
                    .checked_add(1)
                    .ok_or(crate::error::DecodeError::Overflow)?;

                if let Some(previous) = height_of_last_stripe
                    && stripe_end < previous
                {
                    bail!(FormatError::StripeNotMonotonic);
                }

                if information.height_is_unknown() {
                    resolved_height = stripe_end;
                } else if stripe_end > information.height {
                    bail!(FormatError::StripeBeyondPage);
                }

                // "The maximum size of each stripe ... must be no more than
                // the page's maximum stripe size." (7.4.8.6)
                let stripe_height = stripe_end - height_of_last_stripe.unwrap_or(0);
                if stripe_height > information.striping.maximum_stripe_size as u32 {
                    bail!(FormatError::StripeTooTall);
                }

                height_of_last_stripe = Some(stripe_end);
                last_stripe_index = Some(index);
            }
            SegmentType::EndOfPage => {
                // "The segment data part of an end of page segment is empty."
                // (7.4.9)
                if !segment.data.is_empty() {
                    bail!(FormatError::NonEmptyEndOfPage);
                }

                // "If the page is striped, there must be an end of stripe
                // segment immediately preceding this segment." (7.4.9)
                if let Some(information) = information.as_ref()
                    && information.striping.is_striped
                    && last_stripe_index != index.checked_sub(1)
                {
                    bail!(FormatError::EndOfPageNotAfterStripe);
                }

                found_end_of_page = true;
            }
            _ => {}
        }
    }

    let Some(information) = information else {
        bail!(FormatError::MissingPageInformation);
    };

    if information.striping.is_striped && height_of_last_stripe.is_none() {
        bail!(FormatError::MissingEndOfStripe);
    }

    if file.organization == Organization::Embedded {
        // "The JBIG2 file header, end-of-page segments, and end-of-file
        // segment are not used in PDF." (PDF 1.7, 3.3.6)
        if found_end_of_page {
            bail!(FormatError::UnexpectedEndOfPage);
        }
    } else {
        // "Each page must have exactly one end of page segment associated
        // with it." (7.4.9)
        if !found_end_of_page {
            bail!(FormatError::MissingEndOfPage);
        }
    }

    Ok(PageLayout {
        information,
        height: resolved_height,
    })
}

/// Enumerate the pages present in the stream, in order of first appearance.
pub(crate) fn scan_page_numbers(file: &File<'_>) -> Result<Vec<u32>> {
    let mut pages: Vec<u32> = Vec::new();

    for segment in &file.segments {
        let page = segment.header.page_association;
        if page != 0 && !pages.contains(&page) {
            pages.push(page);
        }
    }

    if let Some(declared) = file.number_of_pages
        && declared as usize != pages.len()
    {
        bail!(FormatError::PageCountMismatch);
    }

    Ok(pages)
}
