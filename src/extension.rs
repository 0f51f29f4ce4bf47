//! Extension segments (7.4.14) and coded comments (7.4.15).

use crate::error::{Feature, Result, bail};
use crate::reader::Reader;

/// "7.4.15.1 Single-byte coded comment"
const SINGLE_BYTE_CODED_COMMENT: u32 = 0x2000_0000;
/// "7.4.15.2 Multi-byte coded comment"
const MULTI_BYTE_CODED_COMMENT: u32 = 0x2000_0002;

/// Process one extension segment's data part.
///
/// "Bit 31 of the extension type field indicates whether this extension is
/// necessary for the correct decoding of the page." (7.4.14) An unnecessary
/// extension of unknown type is skipped; a necessary one cannot be.
pub(crate) fn decode_extension(data: &[u8]) -> Result<()> {
    let mut reader = Reader::new(data);

    let Some(extension_type) = reader.read_u32() else {
        log::warn!("extension segment too short for a type field");
        return Ok(());
    };

    match extension_type {
        SINGLE_BYTE_CODED_COMMENT => {
            if decode_single_byte_comment(&mut reader).is_none() {
                log::warn!("malformed single-byte coded comment");
            }
        }
        MULTI_BYTE_CODED_COMMENT => {
            if decode_multi_byte_comment(&mut reader).is_none() {
                log::warn!("malformed multi-byte coded comment");
            }
        }
        _ if extension_type & 0x8000_0000 != 0 => {
            bail!(Feature::EssentialExtension);
        }
        _ => {
            log::debug!("skipping unknown extension type {extension_type:#010x}");
        }
    }

    Ok(())
}

/// "Pairs of zero-terminated ISO/IEC 8859-1 strings, the list terminated by
/// another zero length string." (7.4.15.1)
fn decode_single_byte_comment(reader: &mut Reader<'_>) -> Option<()> {
    loop {
        let key = read_latin1_string(reader)?;
        if key.is_empty() {
            break;
        }
        let value = read_latin1_string(reader)?;

        log::debug!("comment: {key:?} = {value:?}");
    }

    if !reader.at_end() {
        log::warn!("trailing data after single-byte coded comment");
    }

    Some(())
}

/// "Pairs of zero-terminated UCS-2 strings, the list terminated by another
/// zero length string." (7.4.15.2)
fn decode_multi_byte_comment(reader: &mut Reader<'_>) -> Option<()> {
    loop {
        let key = read_ucs2_string(reader)?;
        if key.is_empty() {
            break;
        }
        let value = read_ucs2_string(reader)?;

        match (String::from_utf16(&key), String::from_utf16(&value)) {
            (Ok(key), Ok(value)) => log::debug!("comment: {key:?} = {value:?}"),
            _ => log::warn!("comment with unpaired surrogates"),
        }
    }

    if !reader.at_end() {
        log::warn!("trailing data after multi-byte coded comment");
    }

    Some(())
}

fn read_latin1_string(reader: &mut Reader<'_>) -> Option<String> {
    let mut result = String::new();

    loop {
        let byte = reader.read_byte()?;
        if byte == 0 {
            return Some(result);
        }
        // ISO 8859-1 maps bytes to the first 256 code points directly.
        result.push(byte as char);
    }
}

fn read_ucs2_string(reader: &mut Reader<'_>) -> Option<Vec<u16>> {
    let mut result = Vec::new();

    loop {
        let unit = reader.read_u16()?;
        if unit == 0 {
            return Some(result);
        }
        result.push(unit);
    }
}
