//! Symbol dictionary decoding (7.4.2, 6.5).
//!
//! "This decoding procedure is used to decode a set of symbols; these symbols
//! can then be used by text region decoding procedures, or in some cases by
//! other symbol dictionary decoding procedures." (6.5.1)

use std::sync::Arc;

use super::generic::{decode_bitmap, decode_bitmap_mmr};
use super::generic_refinement::{decode_refinement_bitmap, read_refinement_at_pixels};
use super::{AdaptiveTemplatePixel, RefinementTemplate, Template, read_at_pixel};
use crate::arithmetic_decoder::{ArithmeticDecoder, Context};
use crate::bitmap::Bitmap;
use crate::error::{
    DecodeError, Feature, HuffmanError, ParseError, Result, SegmentError, SymbolError, bail,
};
use crate::huffman_table::{HuffmanTable, TABLE_A, TABLE_B, TABLE_C, TABLE_D, TABLE_E};
use crate::integer_decoder::{IdDecoder, IntegerDecoder, symbol_code_length};
use crate::reader::Reader;

/// Parsed symbol dictionary flags (7.4.2.1.1).
#[derive(Debug, Clone)]
struct SymbolDictionaryFlags {
    /// "Bit 0: SDHUFF"
    huffman: bool,
    /// "Bit 1: SDREFAGG. If this bit is 0, then no refinement or aggregate
    /// coding is used in this segment. If this bit is 1, then every symbol
    /// bitmap is refinement/aggregate coded."
    refinement_or_aggregate: bool,
    /// "Bits 2-3: SDHUFFDH selection"
    delta_height_selection: u8,
    /// "Bits 4-5: SDHUFFDW selection"
    delta_width_selection: u8,
    /// "Bit 6: SDHUFFBMSIZE selection"
    bitmap_size_selection: u8,
    /// "Bit 7: SDHUFFAGGINST selection"
    aggregate_instances_selection: u8,
    /// "Bits 10-11: SDTEMPLATE"
    template: Template,
    /// "Bit 12: SDRTEMPLATE"
    refinement_template: RefinementTemplate,
}

/// Parsed symbol dictionary segment data header (7.4.2.1).
#[derive(Debug, Clone)]
struct SymbolDictionaryHeader {
    flags: SymbolDictionaryFlags,
    /// "SDAT" - adaptive template pixels (7.4.2.1.2). Empty when SDHUFF is 1.
    at_pixels: Vec<AdaptiveTemplatePixel>,
    /// "SDRAT" - refinement adaptive template pixels (7.4.2.1.3).
    refinement_at_pixels: [AdaptiveTemplatePixel; 2],
    /// "SDNUMEXSYMS: ... the number of symbols exported from this
    /// dictionary." (7.4.2.1.4)
    num_exported: u32,
    /// "SDNUMNEWSYMS: ... the number of symbols defined in this dictionary."
    /// (7.4.2.1.5)
    num_new: u32,
}

fn parse_symbol_dictionary_header(reader: &mut Reader<'_>) -> Result<SymbolDictionaryHeader> {
    // 7.4.2.1.1 Symbol dictionary flags
    let word = reader.read_u16().ok_or(ParseError::UnexpectedEof)?;

    let huffman = word & 0x0001 != 0;
    let refinement_or_aggregate = word & 0x0002 != 0;
    let delta_height_selection = ((word >> 2) & 0x03) as u8;
    let delta_width_selection = ((word >> 4) & 0x03) as u8;
    let bitmap_size_selection = ((word >> 6) & 0x01) as u8;
    let aggregate_instances_selection = ((word >> 7) & 0x01) as u8;

    // "Bit 8: Bitmap coding context used" and "Bit 9: Bitmap coding context
    // retained" share arithmetic statistics across segments (E.3.7, 6.5.4).
    // Every context array here lives and dies with its own segment.
    if word & 0x0300 != 0 {
        bail!(Feature::BitmapCodingContext);
    }

    let template = Template::from_value(((word >> 10) & 0x03) as u8);
    let refinement_template = if word & 0x1000 != 0 {
        RefinementTemplate::Template1
    } else {
        RefinementTemplate::Template0
    };

    // "Bits 13-15: Reserved; must be 0."
    if word & 0xE000 != 0 {
        bail!(crate::error::RegionError::ReservedBits);
    }

    let flags = SymbolDictionaryFlags {
        huffman,
        refinement_or_aggregate,
        delta_height_selection,
        delta_width_selection,
        bitmap_size_selection,
        aggregate_instances_selection,
        template,
        refinement_template,
    };

    // 7.4.2.1.2 Symbol dictionary AT flags
    // "This field is only present if SDHUFF is 0."
    let at_pixels = if huffman {
        Vec::new()
    } else {
        let mut pixels = Vec::with_capacity(flags.template.at_pixel_count());
        for _ in 0..flags.template.at_pixel_count() {
            pixels.push(read_at_pixel(reader)?);
        }
        pixels
    };

    // 7.4.2.1.3 Symbol dictionary refinement AT flags
    // "This field is only present if SDREFAGG is 1 and SDRTEMPLATE is 0."
    let refinement_at_pixels =
        if refinement_or_aggregate && refinement_template == RefinementTemplate::Template0 {
            read_refinement_at_pixels(reader)?
        } else {
            [AdaptiveTemplatePixel::default(); 2]
        };

    let num_exported = reader.read_u32().ok_or(ParseError::UnexpectedEof)?;
    let num_new = reader.read_u32().ok_or(ParseError::UnexpectedEof)?;

    Ok(SymbolDictionaryHeader {
        flags,
        at_pixels,
        refinement_at_pixels,
        num_exported,
        num_new,
    })
}

/// The Huffman tables a Huffman-coded dictionary reads with (7.4.2.1.6).
struct SymbolDictionaryTables<'a> {
    delta_height: &'a HuffmanTable,
    delta_width: &'a HuffmanTable,
    bitmap_size: &'a HuffmanTable,
}

fn select_tables<'a>(
    flags: &SymbolDictionaryFlags,
    referred_tables: &[&'a HuffmanTable],
) -> Result<SymbolDictionaryTables<'a>> {
    let mut next_custom = 0_usize;
    let mut custom = || -> Result<&'a HuffmanTable> {
        let table = referred_tables
            .get(next_custom)
            .copied()
            .ok_or(HuffmanError::MissingTables)?;
        next_custom += 1;
        Ok(table)
    };

    // "SDHUFFDH: 0 Table B.4, 1 Table B.5, 3 user-supplied; the value 2 is
    // not permitted." (7.4.2.1.1)
    let delta_height: &HuffmanTable = match flags.delta_height_selection {
        0 => &TABLE_D,
        1 => &TABLE_E,
        3 => custom()?,
        _ => bail!(HuffmanError::InvalidSelection),
    };

    // "SDHUFFDW: 0 Table B.2, 1 Table B.3, 3 user-supplied; the value 2 is
    // not permitted." (7.4.2.1.1)
    let delta_width: &HuffmanTable = match flags.delta_width_selection {
        0 => &TABLE_B,
        1 => &TABLE_C,
        3 => custom()?,
        _ => bail!(HuffmanError::InvalidSelection),
    };

    // "SDHUFFBMSIZE: 0 Table B.1, 1 user-supplied." (7.4.2.1.1)
    let bitmap_size: &HuffmanTable = match flags.bitmap_size_selection {
        0 => &TABLE_A,
        _ => custom()?,
    };

    // "SDHUFFAGGINST: 0 Table B.1, 1 user-supplied." (7.4.2.1.1) Aggregate
    // coding under Huffman was rejected before this point, but the selection
    // still claims a referred table.
    if flags.aggregate_instances_selection != 0 {
        custom()?;
    }

    Ok(SymbolDictionaryTables {
        delta_height,
        delta_width,
        bitmap_size,
    })
}

/// The arithmetic coding state of a non-Huffman dictionary.
struct ArithmeticState<'a> {
    decoder: ArithmeticDecoder<'a>,
    /// IADH / IADW / IAEX / IAAI (Table 31).
    delta_height: IntegerDecoder,
    delta_width: IntegerDecoder,
    export_run: IntegerDecoder,
    aggregate_instances: IntegerDecoder,
    /// IARDX / IARDY and IAID for refinement coding (6.5.8.2.2).
    refinement_x: IntegerDecoder,
    refinement_y: IntegerDecoder,
    id: IdDecoder,
    /// "GB" contexts shared by every directly coded symbol (Table 16).
    generic_contexts: Vec<Context>,
    /// "GR" contexts shared by every refined symbol (Table 18).
    refinement_contexts: Vec<Context>,
}

/// Decode a symbol dictionary segment's data part (7.4.2.2, 6.5).
///
/// `input_symbols` is SDINSYMS, the concatenation of the exported symbols of
/// every referred symbol dictionary. Returns SDEXSYMS.
pub(crate) fn decode_symbol_dictionary(
    reader: &mut Reader<'_>,
    input_symbols: &[Arc<Bitmap>],
    referred_tables: &[&HuffmanTable],
) -> Result<Vec<Arc<Bitmap>>> {
    let header = parse_symbol_dictionary_header(reader)?;

    // Refinement inside a Huffman dictionary interleaves arithmetic data into
    // the bit stream (6.5.8.2.2 step 5); aggregate text regions are rejected
    // outright below.
    if header.flags.huffman && header.flags.refinement_or_aggregate {
        bail!(Feature::HuffmanRefinement);
    }

    let tables = if header.flags.huffman {
        Some(select_tables(&header.flags, referred_tables)?)
    } else {
        None
    };

    let mut arithmetic = if header.flags.huffman {
        None
    } else {
        let data = reader.tail().ok_or(ParseError::UnexpectedEof)?;
        Some(ArithmeticState {
            decoder: ArithmeticDecoder::new(data),
            delta_height: IntegerDecoder::new(),
            delta_width: IntegerDecoder::new(),
            export_run: IntegerDecoder::new(),
            aggregate_instances: IntegerDecoder::new(),
            refinement_x: IntegerDecoder::new(),
            refinement_y: IntegerDecoder::new(),
            // "SBSYMCODELEN: ceil(log2(SDNUMINSYMS + SDNUMNEWSYMS))"
            // (6.5.8.2.3)
            id: IdDecoder::new(symbol_code_length(
                input_symbols.len() as u32 + header.num_new,
            )),
            generic_contexts: vec![
                Context::default();
                1 << header.flags.template.context_bits()
            ],
            refinement_contexts: vec![
                Context::default();
                1 << header.flags.refinement_template.context_bits()
            ],
        })
    };

    // "1) Create an array SDNEWSYMS of bitmaps, having SDNUMNEWSYMS entries."
    // (6.5.5)
    let mut new_symbols: Vec<Arc<Bitmap>> = Vec::with_capacity(header.num_new as usize);

    // "2) If SDHUFF is 1 and SDREFAGG is 0, create an array SDNEWSYMWIDTHS of
    // integers, having SDNUMNEWSYMS entries." (6.5.5)
    let mut new_symbol_widths: Vec<u32> = Vec::new();

    // "3) Set: HCHEIGHT = 0, NSYMSDECODED = 0" (6.5.5)
    let mut height_class_height = 0_u32;
    let mut decoded = 0_u32;

    // "4) Decode each height class as follows: a) If NSYMSDECODED ==
    // SDNUMNEWSYMS then all the symbols in the dictionary have been decoded;
    // proceed to step 5)." (6.5.5)
    while decoded < header.num_new {
        // "b) Decode the height class delta height as described in 6.5.6.
        // Set: HCHEIGHT = HCHEIGHT + HCDH, SYMWIDTH = 0, TOTWIDTH = 0,
        // HCFIRSTSYM = NSYMSDECODED" (6.5.5)
        let delta_height = match (&mut arithmetic, &tables) {
            (Some(state), _) => state.delta_height.decode_non_oob(&mut state.decoder)?,
            (None, Some(tables)) => tables.delta_height.read_symbol_non_oob(reader)?,
            _ => unreachable!(),
        };
        height_class_height = height_class_height
            .checked_add_signed(delta_height)
            .ok_or(DecodeError::Overflow)?;

        let mut symbol_width = 0_u32;
        let mut total_width = 0_u32;
        let height_class_first = decoded as usize;

        // "c) Decode each symbol within the height class as follows:" (6.5.5)
        loop {
            // "i) Decode the delta width for the symbol as described in
            // 6.5.7. If the result of this decoding is OOB then all the
            // symbols in this height class have been decoded." (6.5.5)
            let delta_width = match (&mut arithmetic, &tables) {
                (Some(state), _) => state.delta_width.decode(&mut state.decoder),
                (None, Some(tables)) => tables.delta_width.read_symbol(reader)?,
                _ => unreachable!(),
            };
            let Some(delta_width) = delta_width else {
                break;
            };

            if decoded == header.num_new {
                bail!(SymbolError::TooManySymbols);
            }

            // "Set: SYMWIDTH = SYMWIDTH + DW, TOTWIDTH = TOTWIDTH + SYMWIDTH"
            symbol_width = symbol_width
                .checked_add_signed(delta_width)
                .ok_or(DecodeError::Overflow)?;
            total_width = total_width
                .checked_add(symbol_width)
                .ok_or(DecodeError::Overflow)?;

            if let Some(state) = &mut arithmetic {
                // "ii) If SDHUFF is 0 or SDREFAGG is 1, then decode the
                // symbol's bitmap as described in 6.5.8." (6.5.5)
                let bitmap = decode_symbol_bitmap(
                    state,
                    &header,
                    input_symbols,
                    &new_symbols,
                    symbol_width,
                    height_class_height,
                )?;
                new_symbols.push(Arc::new(bitmap));
            } else {
                // "iii) If SDHUFF is 1 and SDREFAGG is 0, then set:
                // SDNEWSYMWIDTHS[NSYMSDECODED] = SYMWIDTH" (6.5.5)
                new_symbol_widths.push(symbol_width);
            }

            // "iv) Set: NSYMSDECODED = NSYMSDECODED + 1" (6.5.5)
            decoded += 1;
        }

        // "d) If SDHUFF is 1 and SDREFAGG is 0, then decode the height class
        // collective bitmap as described in 6.5.9 ... and break it up to
        // obtain the symbols." (6.5.5)
        if let Some(tables) = &tables {
            let collective = read_height_class_collective_bitmap(
                reader,
                tables.bitmap_size,
                total_width,
                height_class_height,
            )?;

            let mut column = 0_u32;
            for &width in &new_symbol_widths[height_class_first..decoded as usize] {
                let symbol = collective.subbitmap(column, 0, width, height_class_height);
                new_symbols.push(Arc::new(symbol));
                column += width;
            }
        }
    }

    // "5) Determine which symbol bitmaps are exported from this symbol
    // dictionary, as described in 6.5.10." (6.5.5)
    decode_exported_symbols(reader, &mut arithmetic, &header, input_symbols, &new_symbols)
}

/// Decode one symbol's bitmap with arithmetic coding (6.5.8).
fn decode_symbol_bitmap(
    state: &mut ArithmeticState<'_>,
    header: &SymbolDictionaryHeader,
    input_symbols: &[Arc<Bitmap>],
    new_symbols: &[Arc<Bitmap>],
    width: u32,
    height: u32,
) -> Result<Bitmap> {
    let mut bitmap = Bitmap::new(width, height);

    if !header.flags.refinement_or_aggregate {
        // "6.5.8.1 Direct-coded symbol bitmap": a generic region decode with
        // the parameters of Table 16 (MMR = 0, TPGDON = 0, USESKIP = 0) and
        // the dictionary-wide coding state.
        decode_bitmap(
            &mut bitmap,
            &mut state.decoder,
            &mut state.generic_contexts,
            header.flags.template,
            false,
            None,
            &header.at_pixels,
        )?;

        return Ok(bitmap);
    }

    // "6.5.8.2 Refinement/aggregate-coded symbol bitmap"
    //
    // "1) Decode the number of symbol instances contained in the aggregation,
    // as specified in 6.5.8.2.1. Let REFAGGNINST be the value decoded."
    let instances = state.aggregate_instances.decode_non_oob(&mut state.decoder)?;

    // "2) If REFAGGNINST is greater than one, then decode the bitmap itself
    // using a text region decoding procedure as described in 6.4" - a whole
    // nested text region per symbol, which no corpus sample exercises.
    if instances > 1 {
        bail!(Feature::MultiInstanceAggregate);
    }
    if instances < 1 {
        bail!(SymbolError::InvalidAggregateCount);
    }

    // "3) If REFAGGNINST is equal to one, then decode the bitmap as described
    // in 6.5.8.2.2:" a symbol ID, two offsets, and a refinement against that
    // symbol with the parameters of Table 18.
    let id = state.id.decode(&mut state.decoder) as usize;
    let refinement_x = state.refinement_x.decode_non_oob(&mut state.decoder)?;
    let refinement_y = state.refinement_y.decode_non_oob(&mut state.decoder)?;

    // "Set SBSYMS to an array of SDNUMINSYMS + NSYMSDECODED symbols, formed
    // by concatenating the array SDINSYMS and the first NSYMSDECODED entries
    // of the array SDNEWSYMS." (6.5.8.2.4)
    let reference = if id < input_symbols.len() {
        &input_symbols[id]
    } else {
        new_symbols
            .get(id - input_symbols.len())
            .ok_or(SymbolError::IdOutOfRange)?
    };

    decode_refinement_bitmap(
        &mut bitmap,
        &mut state.decoder,
        &mut state.refinement_contexts,
        reference,
        refinement_x,
        refinement_y,
        header.flags.refinement_template,
        &header.refinement_at_pixels,
        false,
    )?;

    Ok(bitmap)
}

/// Read one height class collective bitmap (6.5.9).
fn read_height_class_collective_bitmap(
    reader: &mut Reader<'_>,
    bitmap_size_table: &HuffmanTable,
    total_width: u32,
    height: u32,
) -> Result<Bitmap> {
    // "1) Read the size in bytes using the SDHUFFBMSIZE Huffman table. Let
    // BMSIZE be the value decoded."
    let bitmap_size = bitmap_size_table.read_symbol_non_oob(reader)?;
    if bitmap_size < 0 {
        bail!(crate::error::RegionError::InvalidDimension);
    }

    // "2) Skip over any bits remaining in the last byte read."
    reader.align();

    let mut collective = Bitmap::new(total_width, height);

    if bitmap_size == 0 {
        // "3) If BMSIZE is zero, then the bitmap is stored uncompressed ...
        // HCHEIGHT rows of TOTWIDTH pixels, each row padded out to a byte
        // boundary with 0-7 0 bits."
        for y in 0..height {
            reader
                .fill_bytes(collective.row_mut(y))
                .ok_or(ParseError::UnexpectedEof)?;
        }
    } else {
        // "4) Otherwise, decode the bitmap using a generic bitmap decoding
        // procedure ... Set the parameters to this decoding procedure as
        // shown in Table 19." (MMR = 1.)
        let data = reader
            .read_bytes(bitmap_size as usize)
            .ok_or(SegmentError::TruncatedData)?;
        decode_bitmap_mmr(&mut collective, data)?;
    }

    // "5) Skip over any bits remaining in the last byte read." Both branches
    // consume whole bytes, so the reader is already aligned.
    Ok(collective)
}

/// Decode the export flags and assemble SDEXSYMS (6.5.10).
///
/// "The symbols that may be exported from a given dictionary include any of
/// the symbols that are input to the dictionary, plus any of the symbols
/// defined in the dictionary."
fn decode_exported_symbols(
    reader: &mut Reader<'_>,
    arithmetic: &mut Option<ArithmeticState<'_>>,
    header: &SymbolDictionaryHeader,
    input_symbols: &[Arc<Bitmap>],
    new_symbols: &[Arc<Bitmap>],
) -> Result<Vec<Arc<Bitmap>>> {
    let total = input_symbols.len() + new_symbols.len();

    // "1) Set: EXINDEX = 0, CUREXFLAG = 0"
    let mut index = 0_usize;
    let mut current_flag = false;

    let mut exported = Vec::with_capacity(header.num_exported as usize);

    // "5) Repeat steps 2) through 4) until EXINDEX == SDNUMINSYMS +
    // SDNUMNEWSYMS."
    while index < total {
        // "2) Decode a value using Table B.1 if SDHUFF is 1, or the IAEX
        // integer arithmetic decoding procedure if SDHUFF is 0. Let
        // EXRUNLENGTH be the decoded value."
        let run = match arithmetic {
            Some(state) => state.export_run.decode_non_oob(&mut state.decoder)?,
            None => TABLE_A.read_symbol_non_oob(reader)?,
        };

        if run < 0 || index + run as usize > total {
            bail!(SymbolError::InvalidExportRun);
        }

        // "3) Set EXFLAGS[EXINDEX] through EXFLAGS[EXINDEX + EXRUNLENGTH - 1]
        // to CUREXFLAG." Exported symbols can be collected directly instead
        // of materializing the flag array.
        if current_flag {
            for i in index..index + run as usize {
                let symbol = if i < input_symbols.len() {
                    &input_symbols[i]
                } else {
                    &new_symbols[i - input_symbols.len()]
                };
                exported.push(Arc::clone(symbol));
            }
        }

        // "4) Set: EXINDEX = EXINDEX + EXRUNLENGTH, CUREXFLAG = NOT(CUREXFLAG)"
        index += run as usize;
        current_flag = !current_flag;
    }

    // The runs must mark exactly SDNUMEXSYMS symbols as exported (7.4.2.1.4).
    if exported.len() != header.num_exported as usize {
        bail!(SymbolError::ExportCountMismatch);
    }

    Ok(exported)
}
