/*!
A memory-safe, pure-Rust JBIG2 decoder.

JBIG2 (ITU-T T.88, ISO/IEC 14492) is a bi-level image compression standard,
most often met inside PDF files compressing scanned text. This crate decodes
standalone JBIG2 files (sequential and random-access organizations) as well as
the embedded bitstreams produced by PDF's `JBIG2Decode` filter, and
reconstructs each page as a packed 1-bit-per-pixel bitmap.

# Example
```rust,no_run
let data = std::fs::read("image.jb2").unwrap();
let frame = jbig2_decoder::decode(&data).unwrap();

println!("{}x{} image", frame.width(), frame.height());
```

# Safety
This crate forbids unsafe code via a crate-level attribute.
*/

#![forbid(unsafe_code)]

mod arithmetic_decoder;
mod bitmap;
mod decode;
mod error;
mod extension;
mod file;
mod gray_scale;
mod huffman_table;
mod integer_decoder;
mod page;
mod reader;
mod segment;

use std::sync::Arc;

use bitmap::Bitmap;
use decode::Region;
use decode::generic::decode_generic_region;
use decode::halftone::decode_halftone_region;
use decode::pattern::{PatternDictionary, decode_pattern_dictionary};
use decode::symbol::decode_symbol_dictionary;
use decode::text::decode_text_region;
use file::{File, parse_embedded, parse_file};
use huffman_table::HuffmanTable;
use page::{PageLayout, scan_page, scan_page_numbers};
use reader::Reader;
use segment::SegmentType;

pub use error::{
    DecodeError, Feature, FormatError, HuffmanError, ParseError, RegionError, Result,
    SegmentError, SymbolError, TemplateError,
};

/// Whether `data` starts with the 8-byte JBIG2 file ID string.
pub fn sniff(data: &[u8]) -> bool {
    file::sniff(data)
}

/// Decode the first page of a standalone JBIG2 file.
pub fn decode(data: &[u8]) -> Result<Frame> {
    Decoder::new(data)?.decode_frame(0)
}

/// One decoded page.
///
/// Rows are packed MSB-first, one bit per pixel, `stride` bytes per row. A
/// set bit is a black pixel.
#[derive(Debug, Clone)]
pub struct Frame {
    width: u32,
    height: u32,
    stride: usize,
    data: Vec<u8>,
}

impl Frame {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes per packed row.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// The packed rows, `stride * height` bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The pixel at (x, y); `true` is black. Out-of-bounds reads are white.
    pub fn get(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let byte = self.data[y as usize * self.stride + (x / 8) as usize];
        byte & (0x80 >> (x & 7)) != 0
    }

    fn from_bitmap(bitmap: Bitmap) -> Self {
        Self {
            width: bitmap.width(),
            height: bitmap.height(),
            stride: bitmap.stride(),
            data: bitmap.into_data(),
        }
    }
}

/// A parsed JBIG2 bitstream from which pages can be decoded.
pub struct Decoder<'a> {
    file: File<'a>,
    /// The page numbers present, in order of first appearance.
    pages: Vec<u32>,
    /// A decode failure per page, kept so that retrying a broken frame
    /// reports the same error instead of redoing the work.
    failures: Vec<Option<DecodeError>>,
}

impl<'a> Decoder<'a> {
    /// Parse a standalone JBIG2 file (with a file header).
    pub fn new(data: &'a [u8]) -> Result<Self> {
        Self::from_file(parse_file(data)?)
    }

    /// Parse an embedded bitstream: one or more chunks, each containing whole
    /// segments, with no file header. PDF's `JBIG2Decode` filter supplies its
    /// optional globals stream and the image stream this way.
    ///
    /// An embedded bitstream describes exactly one page.
    pub fn embedded(chunks: &[&'a [u8]]) -> Result<Self> {
        let decoder = Self::from_file(parse_embedded(chunks)?)?;

        if decoder.pages.len() != 1 {
            return Err(FormatError::PageCountMismatch.into());
        }

        Ok(decoder)
    }

    fn from_file(file: File<'a>) -> Result<Self> {
        let pages = scan_page_numbers(&file)?;
        let failures = vec![None; pages.len()];

        Ok(Self {
            file,
            pages,
            failures,
        })
    }

    /// The number of pages in the bitstream.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Decode one page by index (not by page number).
    ///
    /// Pages decode independently; a failure poisons only its own frame, and
    /// asking for that frame again returns the same error.
    pub fn decode_frame(&mut self, index: usize) -> Result<Frame> {
        let Some(&page_number) = self.pages.get(index) else {
            return Err(FormatError::PageNotFound.into());
        };

        if let Some(error) = self.failures[index] {
            return Err(error);
        }

        match decode_page(&self.file, page_number) {
            Ok(bitmap) => Ok(Frame::from_bitmap(bitmap)),
            Err(error) => {
                self.failures[index] = Some(error);
                Err(error)
            }
        }
    }
}

/// Decoded artifacts produced by the dictionary and tables segments of one
/// page, keyed by segment number and borrowed by later segments through their
/// referred-to lists.
#[derive(Default)]
struct SegmentArtifacts {
    symbols: Vec<(u32, Vec<Arc<Bitmap>>)>,
    patterns: Vec<(u32, PatternDictionary)>,
    tables: Vec<(u32, HuffmanTable)>,
}

impl SegmentArtifacts {
    /// SDINSYMS / SBSYMS: the concatenated exports of the referred symbol
    /// dictionaries, in reference order (6.5.5 step 1, 6.4.5).
    fn collect_symbols(&self, referred: &[u32]) -> Vec<Arc<Bitmap>> {
        let mut result = Vec::new();
        for number in referred {
            if let Some((_, symbols)) = self.symbols.iter().find(|(n, _)| n == number) {
                result.extend(symbols.iter().cloned());
            }
        }
        result
    }

    /// The Huffman tables of the referred tables segments, in reference order
    /// (7.4.2.1.6, 7.4.3.1.6).
    fn collect_tables(&self, referred: &[u32]) -> Vec<&HuffmanTable> {
        referred
            .iter()
            .filter_map(|number| {
                self.tables
                    .iter()
                    .find(|(n, _)| n == number)
                    .map(|(_, table)| table)
            })
            .collect()
    }

    /// The pattern dictionary a halftone region draws from (6.6.5).
    fn find_pattern_dictionary(&self, referred: &[u32]) -> Option<&PatternDictionary> {
        referred.iter().find_map(|number| {
            self.patterns
                .iter()
                .find(|(n, _)| n == number)
                .map(|(_, dictionary)| dictionary)
        })
    }
}

/// The page bitmap under construction, with the composition rules of its page
/// information segment (8.2).
struct PageCompositor {
    bitmap: Bitmap,
    layout: PageLayout,
}

impl PageCompositor {
    fn new(layout: PageLayout) -> Self {
        // "Bit 2: Page default pixel value. This bit contains the initial
        // value for every pixel in the page, before any region segments are
        // decoded or drawn." (7.4.8.5)
        let mut bitmap = Bitmap::new(layout.information.width, layout.height);
        if layout.information.flags.default_pixel {
            bitmap.fill(true);
        }

        Self { bitmap, layout }
    }

    /// Draw one immediate region onto the page (8.2 step 5).
    fn compose(&mut self, region: Region) -> Result<()> {
        let information = &self.layout.information;

        // "If this bit is 0, then every direct region segment associated with
        // this page must use the page's default combination operator."
        // (7.4.8.5)
        if !information.flags.combination_operator_overridden
            && region.info.combination_operator
                != information.flags.default_combination_operator
        {
            return Err(RegionError::OperatorMismatch.into());
        }

        // "The region segment information field of a region segment must
        // describe a region that is entirely within the page." (7.4.1)
        let right = region
            .info
            .x_location
            .checked_add(region.info.width)
            .ok_or(DecodeError::Overflow)?;
        let bottom = region
            .info
            .y_location
            .checked_add(region.info.height)
            .ok_or(DecodeError::Overflow)?;
        if right > self.bitmap.width() || bottom > self.bitmap.height() {
            return Err(RegionError::OutsidePage.into());
        }

        self.bitmap.combine(
            &region.bitmap,
            region.info.x_location as i32,
            region.info.y_location as i32,
            region.info.combination_operator,
        );

        Ok(())
    }
}

/// Run the segment pipeline for one page (8.1, 8.2).
///
/// Segments execute in file order; dictionaries and tables leave their
/// artifacts behind for the segments that refer to them.
fn decode_page(file: &File<'_>, page_number: u32) -> Result<Bitmap> {
    let layout = scan_page(file, page_number)?;

    let mut artifacts = SegmentArtifacts::default();
    let mut compositor: Option<PageCompositor> = None;

    for segment in &file.segments {
        // Segments with page association 0 (shared dictionaries and tables)
        // apply to every page.
        if segment.header.page_association != 0
            && segment.header.page_association != page_number
        {
            continue;
        }

        log::debug!(
            "segment {}: {:?}, page {}",
            segment.header.segment_number,
            segment.header.segment_type,
            segment.header.page_association,
        );

        let mut reader = Reader::new(segment.data);

        match segment.header.segment_type {
            SegmentType::SymbolDictionary => {
                let input_symbols = artifacts.collect_symbols(&segment.header.referred_to_segments);
                let tables = artifacts.collect_tables(&segment.header.referred_to_segments);

                let exported =
                    decode_symbol_dictionary(&mut reader, &input_symbols, &tables)?;
                artifacts
                    .symbols
                    .push((segment.header.segment_number, exported));
            }
            SegmentType::PatternDictionary => {
                let dictionary = decode_pattern_dictionary(&mut reader)?;
                artifacts
                    .patterns
                    .push((segment.header.segment_number, dictionary));
            }
            SegmentType::Tables => {
                let table = HuffmanTable::read_custom(&mut reader)?;
                artifacts
                    .tables
                    .push((segment.header.segment_number, table));
            }
            SegmentType::ImmediateTextRegion | SegmentType::ImmediateLosslessTextRegion => {
                let symbols = artifacts.collect_symbols(&segment.header.referred_to_segments);
                let tables = artifacts.collect_tables(&segment.header.referred_to_segments);

                let region = decode_text_region(&mut reader, &symbols, &tables)?;
                compose(&mut compositor, region)?;
            }
            SegmentType::ImmediateGenericRegion
            | SegmentType::ImmediateLosslessGenericRegion => {
                let region = decode_generic_region(&mut reader, segment.had_unknown_length())?;
                compose(&mut compositor, region)?;
            }
            SegmentType::ImmediateHalftoneRegion
            | SegmentType::ImmediateLosslessHalftoneRegion => {
                let dictionary = artifacts
                    .find_pattern_dictionary(&segment.header.referred_to_segments)
                    .ok_or(SegmentError::MissingPatternDictionary)?;

                let region = decode_halftone_region(&mut reader, dictionary)?;
                compose(&mut compositor, region)?;
            }
            SegmentType::IntermediateTextRegion
            | SegmentType::IntermediateGenericRegion
            | SegmentType::IntermediateHalftoneRegion => {
                // Intermediate regions exist to feed refinement regions
                // (8.2 step 4 a), which are equally out of scope here.
                return Err(Feature::IntermediateRegion.into());
            }
            SegmentType::IntermediateGenericRefinementRegion
            | SegmentType::ImmediateGenericRefinementRegion
            | SegmentType::ImmediateLosslessGenericRefinementRegion => {
                return Err(Feature::TopLevelRefinement.into());
            }
            SegmentType::PageInformation => {
                // Geometry and structural checks already ran in the page
                // scan; executing the segment brings the page bitmap into
                // existence.
                compositor = Some(PageCompositor::new(layout.clone()));
            }
            SegmentType::EndOfPage | SegmentType::EndOfStripe | SegmentType::EndOfFile => {
                // Validated by the page scan and the file parser.
            }
            SegmentType::Profiles => {
                return Err(Feature::Profiles.into());
            }
            SegmentType::ColourPalette => {
                return Err(Feature::ColouredRegion.into());
            }
            SegmentType::Extension => {
                extension::decode_extension(segment.data)?;
            }
        }
    }

    let compositor = compositor.ok_or(FormatError::MissingPageInformation)?;
    Ok(compositor.bitmap)
}

/// Draw a decoded immediate region onto the page, which must exist by now.
fn compose(compositor: &mut Option<PageCompositor>, region: Region) -> Result<()> {
    compositor
        .as_mut()
        .ok_or(FormatError::MissingPageInformation)?
        .compose(region)
}
