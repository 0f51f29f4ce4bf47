//! File organizations and the file header (Annex D).
//!
//! Standalone files carry a file header and either the sequential or the
//! random-access organization. Embedded streams (the form PDF's JBIG2Decode
//! filter produces) have no file header and arrive as one or more chunks of
//! whole segments.

use crate::error::{FormatError, ParseError, Result, bail};
use crate::reader::Reader;
use crate::segment::{Segment, SegmentType, parse_segment, parse_segment_data, parse_segment_header};

/// "This is an 8-byte sequence containing 0x97 0x4A 0x42 0x32 0x0D 0x0A 0x1A
/// 0x0A." (D.4.1)
const FILE_ID: [u8; 8] = [0x97, 0x4A, 0x42, 0x32, 0x0D, 0x0A, 0x1A, 0x0A];

/// Whether `data` starts with the JBIG2 file ID string.
pub(crate) fn sniff(data: &[u8]) -> bool {
    data.get(..8) == Some(&FILE_ID)
}

/// How the segments of a bitstream are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Organization {
    /// "A file header is followed by a sequence of segments. The two parts of
    /// each segment are stored together: first the segment header then the
    /// segment data." (D.1)
    Sequential,
    /// "A file header is followed by a sequence of segment headers; the last
    /// segment header is followed by the data for the first segment, then the
    /// data for the second segment, and so on." (D.2)
    RandomAccess,
    /// "The embedded organization is like the sequential organization, minus
    /// the file header." (D.3)
    Embedded,
}

/// A parsed bitstream: the organization, the declared page count (if any),
/// and every segment in file order.
#[derive(Debug)]
pub(crate) struct File<'a> {
    pub(crate) organization: Organization,
    /// The file header's page count, when the header declared one.
    pub(crate) number_of_pages: Option<u32>,
    pub(crate) segments: Vec<Segment<'a>>,
}

/// Parse a standalone JBIG2 file (file header plus segments).
pub(crate) fn parse_file(data: &[u8]) -> Result<File<'_>> {
    let mut reader = Reader::new(data);

    // D.4.1 ID string
    let id = reader.read_bytes(8).ok_or(ParseError::UnexpectedEof)?;
    if id != FILE_ID {
        bail!(FormatError::InvalidHeader);
    }

    // D.4.2 File header flags
    let flags = reader.read_byte().ok_or(ParseError::UnexpectedEof)?;

    // "Bit 0: File organization type. If this bit is 1, the file uses the
    // sequential organization."
    let organization = if flags & 0x01 != 0 {
        Organization::Sequential
    } else {
        Organization::RandomAccess
    };

    // "Bit 1: Unknown number of pages."
    let page_count_is_unknown = flags & 0x02 != 0;

    // "Bit 2: ... the file contains one or more generic region segments using
    // the templates with 12 AT pixels" and "Bit 3: ... coloured region
    // segments". Both only forecast segment content; the segments themselves
    // are rejected when executed, so the bits need no action here.

    // "Bits 4-7: Reserved; must be 0."
    if flags & 0xF0 != 0 {
        bail!(FormatError::ReservedBits);
    }

    // D.4.3 Number of pages
    let number_of_pages = if page_count_is_unknown {
        None
    } else {
        Some(reader.read_u32().ok_or(ParseError::UnexpectedEof)?)
    };

    let segments = match organization {
        Organization::Sequential => parse_sequential(&mut reader)?,
        Organization::RandomAccess => parse_random_access(&mut reader)?,
        Organization::Embedded => unreachable!(),
    };

    Ok(File {
        organization,
        number_of_pages,
        segments,
    })
}

/// Parse an embedded stream from one or more chunks of whole segments.
///
/// "The JBIG2 file header, end-of-page segments, and end-of-file segment are
/// not used in PDF." (PDF 1.7, 3.3.6; the scanner separately rejects
/// EndOfPage on the page.)
pub(crate) fn parse_embedded<'a>(chunks: &[&'a [u8]]) -> Result<File<'a>> {
    let mut segments = Vec::new();

    for chunk in chunks {
        let mut reader = Reader::new(chunk);

        while !reader.at_end() {
            let segment = parse_segment(&mut reader)?;

            if segment.header.segment_type == SegmentType::EndOfFile {
                bail!(FormatError::UnexpectedEndOfFile);
            }

            segments.push(segment);
        }
    }

    Ok(File {
        organization: Organization::Embedded,
        number_of_pages: None,
        segments,
    })
}

fn parse_sequential<'a>(reader: &mut Reader<'a>) -> Result<Vec<Segment<'a>>> {
    let mut segments = Vec::new();

    while !reader.at_end() {
        let segment = parse_segment(reader)?;
        let is_end_of_file = segment.header.segment_type == SegmentType::EndOfFile;
        segments.push(segment);

        // "If a file contains an end of file segment, it must be the last
        // segment." (7.4.11)
        if is_end_of_file {
            if !reader.at_end() {
                bail!(FormatError::EndOfFileNotLast);
            }
            break;
        }
    }

    Ok(segments)
}

fn parse_random_access<'a>(reader: &mut Reader<'a>) -> Result<Vec<Segment<'a>>> {
    // All headers come first, terminated by the end of file segment's header.
    let mut headers = Vec::new();

    loop {
        if reader.at_end() {
            // Files without an end of file segment simply ran out of headers.
            break;
        }

        let header = parse_segment_header(reader)?;
        let is_end_of_file = header.segment_type == SegmentType::EndOfFile;
        headers.push(header);

        if is_end_of_file {
            break;
        }
    }

    // Then all data parts, concatenated in header order.
    let mut segments = Vec::with_capacity(headers.len());
    for header in headers {
        segments.push(parse_segment_data(reader, header)?);
    }

    Ok(segments)
}
