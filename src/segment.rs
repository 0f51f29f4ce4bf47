//! Segment headers and segment data extraction (7.2).

use crate::error::{ParseError, Result, SegmentError, bail, err};
use crate::reader::Reader;

/// "The segment type is a number between 0 and 63, inclusive. Not all values
/// are allowed." (7.3)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SegmentType {
    /// Symbol dictionary - see 7.4.2. (type 0)
    SymbolDictionary,
    /// Intermediate text region - see 7.4.3. (type 4)
    IntermediateTextRegion,
    /// Immediate text region - see 7.4.3. (type 6)
    ImmediateTextRegion,
    /// Immediate lossless text region - see 7.4.3. (type 7)
    ImmediateLosslessTextRegion,
    /// Pattern dictionary - see 7.4.4. (type 16)
    PatternDictionary,
    /// Intermediate halftone region - see 7.4.5. (type 20)
    IntermediateHalftoneRegion,
    /// Immediate halftone region - see 7.4.5. (type 22)
    ImmediateHalftoneRegion,
    /// Immediate lossless halftone region - see 7.4.5. (type 23)
    ImmediateLosslessHalftoneRegion,
    /// Intermediate generic region - see 7.4.6. (type 36)
    IntermediateGenericRegion,
    /// Immediate generic region - see 7.4.6. (type 38)
    ImmediateGenericRegion,
    /// Immediate lossless generic region - see 7.4.6. (type 39)
    ImmediateLosslessGenericRegion,
    /// Intermediate generic refinement region - see 7.4.7. (type 40)
    IntermediateGenericRefinementRegion,
    /// Immediate generic refinement region - see 7.4.7. (type 42)
    ImmediateGenericRefinementRegion,
    /// Immediate lossless generic refinement region - see 7.4.7. (type 43)
    ImmediateLosslessGenericRefinementRegion,
    /// Page information - see 7.4.8. (type 48)
    PageInformation,
    /// End of page - see 7.4.9. (type 49)
    EndOfPage,
    /// End of stripe - see 7.4.10. (type 50)
    EndOfStripe,
    /// End of file - see 7.4.11. (type 51)
    EndOfFile,
    /// Profiles - see 7.4.12. (type 52)
    Profiles,
    /// Tables - see 7.4.13. (type 53)
    Tables,
    /// Colour palette - see 7.4.16. (type 54)
    ColourPalette,
    /// Extension - see 7.4.14. (type 62)
    Extension,
}

impl SegmentType {
    /// "All other segment types are reserved and must not be used." (7.3)
    fn from_value(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::SymbolDictionary),
            4 => Ok(Self::IntermediateTextRegion),
            6 => Ok(Self::ImmediateTextRegion),
            7 => Ok(Self::ImmediateLosslessTextRegion),
            16 => Ok(Self::PatternDictionary),
            20 => Ok(Self::IntermediateHalftoneRegion),
            22 => Ok(Self::ImmediateHalftoneRegion),
            23 => Ok(Self::ImmediateLosslessHalftoneRegion),
            36 => Ok(Self::IntermediateGenericRegion),
            38 => Ok(Self::ImmediateGenericRegion),
            39 => Ok(Self::ImmediateLosslessGenericRegion),
            40 => Ok(Self::IntermediateGenericRefinementRegion),
            42 => Ok(Self::ImmediateGenericRefinementRegion),
            43 => Ok(Self::ImmediateLosslessGenericRefinementRegion),
            48 => Ok(Self::PageInformation),
            49 => Ok(Self::EndOfPage),
            50 => Ok(Self::EndOfStripe),
            51 => Ok(Self::EndOfFile),
            52 => Ok(Self::Profiles),
            53 => Ok(Self::Tables),
            54 => Ok(Self::ColourPalette),
            62 => Ok(Self::Extension),
            _ => err!(SegmentError::UnknownType),
        }
    }
}

/// A parsed segment header (7.2.1).
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SegmentHeader {
    /// "This four-byte field contains the segment's segment number." (7.2.2)
    pub(crate) segment_number: u32,
    /// "Bits 0-5: Segment type. See 7.3." (7.2.3)
    pub(crate) segment_type: SegmentType,
    /// "This field encodes the number of the page to which this segment
    /// belongs. ... This field may contain a value of zero; this value
    /// indicates that this segment is not associated with any page." (7.2.6)
    pub(crate) page_association: u32,
    /// "This field contains the segment numbers of the segments that this
    /// segment refers to, if any." (7.2.5)
    pub(crate) referred_to_segments: Vec<u32>,
    /// "This 4-byte field contains the length of the segment's segment data
    /// part, in bytes." (7.2.7)
    ///
    /// `None` means the 0xFFFFFFFF sentinel was present, which is only valid
    /// for immediate generic region segments.
    pub(crate) data_length: Option<u32>,
}

/// A segment header together with its data part.
#[derive(Debug)]
pub(crate) struct Segment<'a> {
    pub(crate) header: SegmentHeader,
    pub(crate) data: &'a [u8],
}

impl Segment<'_> {
    /// Whether the segment's length was coded as the 0xFFFFFFFF sentinel, in
    /// which case the data part ends with a four-byte row count (7.4.6.4).
    pub(crate) fn had_unknown_length(&self) -> bool {
        self.header.data_length.is_none()
    }
}

/// Parse one segment header (7.2).
pub(crate) fn parse_segment_header(reader: &mut Reader<'_>) -> Result<SegmentHeader> {
    // 7.2.2 Segment number
    let segment_number = reader.read_u32().ok_or(ParseError::UnexpectedEof)?;

    // 7.2.3 Segment header flags
    // "Bits 0-5: Segment type."
    // "Bit 6: Page association field size."
    // "Bit 7: Deferred non-retain." (only meaningful to editors; ignored here)
    let flags = reader.read_byte().ok_or(ParseError::UnexpectedEof)?;
    let segment_type = SegmentType::from_value(flags & 0x3F)?;
    let page_association_is_long = flags & 0x40 != 0;

    // 7.2.4 Referred-to segment count and retention flags
    // "The three most significant bits of the first byte in this field
    // determine the length of the field. If the value of this three-bit
    // subfield is between 0 and 4, then the field is one byte long. If the
    // value of this three-bit subfield is 7, then the field is at least five
    // bytes long. This three-bit subfield must not contain values of 5 and 6."
    let count_byte = reader.read_byte().ok_or(ParseError::UnexpectedEof)?;
    let short_count = count_byte >> 5;

    let referred_count = match short_count {
        0..=4 => short_count as u32,
        5 | 6 => bail!(SegmentError::InvalidReferredCount),
        _ => {
            // Long form: a four-byte big-endian count whose low 29 bits are
            // used, followed by one retention bit per referred segment plus
            // one for this segment, rounded up to whole bytes.
            let rest = reader.read_bytes(3).ok_or(ParseError::UnexpectedEof)?;
            let count =
                u32::from_be_bytes([count_byte & 0x1F, rest[0], rest[1], rest[2]]);

            let retention_bytes = (count as usize + 1).div_ceil(8);
            reader
                .skip_bytes(retention_bytes)
                .ok_or(ParseError::UnexpectedEof)?;

            count
        }
    };

    // 7.2.5 Referred-to segment numbers
    // "When the current segment's number is 256 or less, then each referred-to
    // segment number is one byte long. Otherwise, when the current segment's
    // number is 65536 or less, each referred-to segment number is two bytes
    // long. Otherwise, each referred-to segment number is four bytes long."
    let mut referred_to_segments = Vec::with_capacity(referred_count as usize);
    for _ in 0..referred_count {
        let referred = if segment_number <= 256 {
            reader.read_byte().ok_or(ParseError::UnexpectedEof)? as u32
        } else if segment_number <= 65536 {
            reader.read_u16().ok_or(ParseError::UnexpectedEof)? as u32
        } else {
            reader.read_u32().ok_or(ParseError::UnexpectedEof)?
        };

        // "A segment must only reference segments with segment numbers that
        // are less than this segment's segment number." (7.2.2)
        if referred >= segment_number {
            bail!(SegmentError::ForwardReference);
        }

        referred_to_segments.push(referred);
    }

    // 7.2.6 Segment page association
    let page_association = if page_association_is_long {
        reader.read_u32().ok_or(ParseError::UnexpectedEof)?
    } else {
        reader.read_byte().ok_or(ParseError::UnexpectedEof)? as u32
    };

    // 7.2.7 Segment data length
    // "If the segment's type is 'Immediate generic region', then the length
    // field may contain the value 0xFFFFFFFF. ... The value 0xFFFFFFFF must
    // not be used unless the segment's type is 'Immediate generic region'."
    let raw_length = reader.read_u32().ok_or(ParseError::UnexpectedEof)?;
    let data_length = if raw_length == 0xFFFF_FFFF {
        if segment_type != SegmentType::ImmediateGenericRegion {
            bail!(SegmentError::UnknownLengthNotGeneric);
        }
        None
    } else {
        Some(raw_length)
    };

    Ok(SegmentHeader {
        segment_number,
        segment_type,
        page_association,
        referred_to_segments,
        data_length,
    })
}

/// Attach a segment's data part to a previously parsed header.
pub(crate) fn parse_segment_data<'a>(
    reader: &mut Reader<'a>,
    header: SegmentHeader,
) -> Result<Segment<'a>> {
    let data = match header.data_length {
        Some(length) => reader
            .read_bytes(length as usize)
            .ok_or(SegmentError::TruncatedData)?,
        None => {
            let length = scan_for_unknown_region_length(reader)?;
            reader
                .read_bytes(length)
                .ok_or(SegmentError::TruncatedData)?
        }
    };

    Ok(Segment { header, data })
}

/// Parse one complete segment (header followed by data).
pub(crate) fn parse_segment<'a>(reader: &mut Reader<'a>) -> Result<Segment<'a>> {
    let header = parse_segment_header(reader)?;
    parse_segment_data(reader, header)
}

/// Find the data length of an unknown-length immediate generic region.
///
/// "In order for the decoder to correctly decode the segment, it needs to read
/// the four-byte row count field, which is stored in the last four bytes of
/// the segment's data part. These four bytes can be detected without knowing
/// the length of the data part in advance: if MMR is 1, they are preceded by
/// the two-byte sequence 0x00 0x00; if MMR is 0, they are preceded by the
/// two-byte sequence 0xFF 0xAC." (7.2.7)
fn scan_for_unknown_region_length(reader: &Reader<'_>) -> Result<usize> {
    let mut scan = reader.clone();
    let start = scan.byte_pos();

    // "The form of encoding used by the segment may be determined by examining
    // the eighteenth byte of its segment data part, and the end sequences can
    // occur anywhere after that eighteenth byte." (7.2.7)
    scan.skip_bytes(17).ok_or(ParseError::UnexpectedEof)?;
    let flags = scan.read_byte().ok_or(ParseError::UnexpectedEof)?;
    let mmr = flags & 1 != 0;

    let end_marker: [u8; 2] = if mmr { [0x00, 0x00] } else { [0xFF, 0xAC] };

    while let Some(window) = scan.peek_bytes(6) {
        if window[..2] == end_marker {
            // Marker plus the four-byte row count close the segment.
            return Ok(scan.byte_pos() - start + 6);
        }
        scan.skip_bytes(1).ok_or(ParseError::UnexpectedEof)?;
    }

    err!(SegmentError::MissingEndMarker)
}
