//! End-to-end decoding tests over synthesized JBIG2 bitstreams.
//!
//! Huffman-coded streams are assembled bit by bit; arithmetic streams are
//! produced by the small QM encoder in [`qm`], so every test drives the
//! decoder through the same entry points a real file would.

mod qm;

use jbig2_decoder::{DecodeError, Decoder, Frame, RegionError, SegmentError, TemplateError};
use qm::{Bits, Cx, QmCoder, TestBitmap};

// --- segment assembly helpers ----------------------------------------------

const SYMBOL_DICTIONARY: u8 = 0;
const IMMEDIATE_TEXT_REGION: u8 = 6;
const PATTERN_DICTIONARY: u8 = 16;
const IMMEDIATE_HALFTONE_REGION: u8 = 22;
const IMMEDIATE_GENERIC_REGION: u8 = 38;
const PAGE_INFORMATION: u8 = 48;
const END_OF_PAGE: u8 = 49;
const END_OF_STRIPE: u8 = 50;
const END_OF_FILE: u8 = 51;
const TABLES: u8 = 53;

/// A segment header in the short form: segment number below 256, at most
/// four one-byte referred segment numbers, one-byte page association.
fn segment(number: u8, segment_type: u8, referred: &[u8], page: u8, data: &[u8]) -> Vec<u8> {
    assert!(referred.len() <= 4);

    let mut out = vec![0, 0, 0, number];
    out.push(segment_type);
    out.push((referred.len() as u8) << 5);
    out.extend_from_slice(referred);
    out.push(page);
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(data);
    out
}

/// A sequential file header declaring one page.
fn file_header() -> Vec<u8> {
    let mut out = vec![0x97, 0x4A, 0x42, 0x32, 0x0D, 0x0A, 0x1A, 0x0A];
    out.push(0x01); // sequential, known page count
    out.extend_from_slice(&1_u32.to_be_bytes());
    out
}

/// A page information segment data part.
fn page_info(width: u32, height: u32, flags: u8, striping: u16) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&width.to_be_bytes());
    out.extend_from_slice(&height.to_be_bytes());
    out.extend_from_slice(&0_u32.to_be_bytes()); // X resolution unknown
    out.extend_from_slice(&0_u32.to_be_bytes()); // Y resolution unknown
    out.push(flags);
    out.extend_from_slice(&striping.to_be_bytes());
    out
}

/// A region segment information field.
fn region_info(width: u32, height: u32, x: u32, y: u32, operator: u8) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&width.to_be_bytes());
    out.extend_from_slice(&height.to_be_bytes());
    out.extend_from_slice(&x.to_be_bytes());
    out.extend_from_slice(&y.to_be_bytes());
    out.push(operator);
    out
}

/// The nominal AT pixel positions for generic template 0.
const STANDARD_AT: [(i32, i32); 4] = [(3, -1), (-3, -1), (2, -2), (-2, -2)];

fn standard_at_bytes() -> Vec<u8> {
    let mut out = Vec::new();
    for (x, y) in STANDARD_AT {
        out.push(x as i8 as u8);
        out.push(y as i8 as u8);
    }
    out
}

/// Assert that a frame matches rows of '#' (black) and '.' (white).
fn assert_frame(frame: &Frame, expected: &[&str]) {
    assert_eq!(frame.height() as usize, expected.len());
    for (y, row) in expected.iter().enumerate() {
        assert_eq!(frame.width() as usize, row.len());
        for (x, ch) in row.chars().enumerate() {
            assert_eq!(
                frame.get(x as u32, y as u32),
                ch == '#',
                "pixel mismatch at ({x}, {y})"
            );
        }
    }
}

fn bitmap_from_rows(rows: &[&str]) -> TestBitmap {
    let height = rows.len() as u32;
    let width = rows[0].len() as u32;
    let mut bitmap = TestBitmap::new(width, height);
    for (y, row) in rows.iter().enumerate() {
        for (x, ch) in row.chars().enumerate() {
            bitmap.set(x as u32, y as u32, ch == '#');
        }
    }
    bitmap
}

const GLYPH_A: [&str; 5] = [".#.", "#.#", "###", "#.#", "#.#"];
const GLYPH_B: [&str; 5] = ["##.", "#.#", "##.", "#.#", "##."];

// --- sniffing ---------------------------------------------------------------

#[test]
fn sniffing() {
    assert!(jbig2_decoder::sniff(&file_header()));
    assert!(!jbig2_decoder::sniff(b"GIF89a.."));
    assert!(!jbig2_decoder::sniff(&[0x97, 0x4A]));
}

// --- generic region ---------------------------------------------------------

/// Encode a bitmap as an immediate generic region data part (template 0,
/// TPGDON off, nominal AT pixels).
fn generic_region_data(bitmap: &TestBitmap, operator: u8) -> Vec<u8> {
    let mut data = region_info(bitmap.width, bitmap.height, bitmap.x, bitmap.y, operator);
    data.push(0x00); // arithmetic, template 0, no TPGDON
    data.extend_from_slice(&standard_at_bytes());

    let mut coder = QmCoder::new();
    let mut contexts = vec![Cx::default(); 1 << 16];
    qm::encode_generic_template0(&mut coder, &mut contexts, bitmap, STANDARD_AT);
    data.extend_from_slice(&coder.flush());
    data
}

#[test]
fn single_generic_region_all_black() {
    let mut all_black = TestBitmap::new(32, 32);
    all_black.fill(true);

    let mut file = file_header();
    file.extend(segment(0, PAGE_INFORMATION, &[], 1, &page_info(32, 32, 0, 0)));
    file.extend(segment(
        1,
        IMMEDIATE_GENERIC_REGION,
        &[],
        1,
        &generic_region_data(&all_black, 0),
    ));
    file.extend(segment(2, END_OF_PAGE, &[], 1, &[]));

    let frame = jbig2_decoder::decode(&file).unwrap();
    assert_eq!(frame.width(), 32);
    assert_eq!(frame.height(), 32);
    for y in 0..32 {
        for x in 0..32 {
            assert!(frame.get(x, y), "pixel ({x}, {y}) should be black");
        }
    }
}

#[test]
fn generic_region_round_trips_arbitrary_pixels() {
    let source = bitmap_from_rows(&[
        "#..#..##..",
        ".##....#.#",
        "#.#.##...#",
        "....##.##.",
        "##.#...#..",
        ".#..###..#",
    ]);

    let mut file = file_header();
    file.extend(segment(0, PAGE_INFORMATION, &[], 1, &page_info(10, 6, 0, 0)));
    file.extend(segment(
        1,
        IMMEDIATE_GENERIC_REGION,
        &[],
        1,
        &generic_region_data(&source, 0),
    ));
    file.extend(segment(2, END_OF_PAGE, &[], 1, &[]));

    let frame = jbig2_decoder::decode(&file).unwrap();
    assert_frame(
        &frame,
        &[
            "#..#..##..",
            ".##....#.#",
            "#.#.##...#",
            "....##.##.",
            "##.#...#..",
            ".#..###..#",
        ],
    );
}

#[test]
fn random_access_organization_decodes() {
    // All segment headers first (terminated by the end of file header), then
    // the data parts concatenated in header order.
    let info = page_info(8, 8, 0, 0);
    let mut region = TestBitmap::new(8, 8);
    region.fill(true);
    let region_data = generic_region_data(&region, 0);

    let mut file = vec![0x97, 0x4A, 0x42, 0x32, 0x0D, 0x0A, 0x1A, 0x0A];
    file.push(0x00); // random-access, known page count
    file.extend_from_slice(&1_u32.to_be_bytes());

    for (number, segment_type, page, length) in [
        (0_u8, PAGE_INFORMATION, 1, info.len()),
        (1, IMMEDIATE_GENERIC_REGION, 1, region_data.len()),
        (2, END_OF_PAGE, 1, 0),
        (3, END_OF_FILE, 0, 0),
    ] {
        file.extend_from_slice(&[0, 0, 0, number]);
        file.push(segment_type);
        file.push(0); // no referred segments
        file.push(page);
        file.extend_from_slice(&(length as u32).to_be_bytes());
    }

    file.extend_from_slice(&info);
    file.extend_from_slice(&region_data);

    let frame = jbig2_decoder::decode(&file).unwrap();
    assert!(frame.get(0, 0) && frame.get(7, 7));
}

#[test]
fn unknown_length_generic_region_decodes() {
    // The region's data length is the 0xFFFFFFFF sentinel; its end is found
    // by scanning for the 0xFF 0xAC terminator, and the four bytes after it
    // hold the decoded row count.
    let mut region = TestBitmap::new(8, 8);
    region.fill(true);

    let mut data = generic_region_data(&region, 0);
    data.extend_from_slice(&8_u32.to_be_bytes()); // row count

    let mut file = file_header();
    file.extend(segment(0, PAGE_INFORMATION, &[], 1, &page_info(8, 8, 0, 0)));
    // The segment header, with the sentinel in place of the data length.
    file.extend_from_slice(&[0, 0, 0, 1]);
    file.push(IMMEDIATE_GENERIC_REGION);
    file.push(0);
    file.push(1);
    file.extend_from_slice(&0xFFFF_FFFF_u32.to_be_bytes());
    file.extend_from_slice(&data);
    file.extend(segment(2, END_OF_PAGE, &[], 1, &[]));

    let frame = jbig2_decoder::decode(&file).unwrap();
    for y in 0..8 {
        for x in 0..8 {
            assert!(frame.get(x, y));
        }
    }
}

#[test]
fn at_pixel_outside_restricted_field_is_rejected() {
    let mut data = region_info(8, 8, 0, 0, 0);
    data.push(0x00);
    // First AT pixel at (0, 0): forbidden by the restricted field.
    data.extend_from_slice(&[0x00, 0x00, 0xFD, 0xFF, 0x02, 0xFE, 0xFE, 0xFE]);

    let mut file = file_header();
    file.extend(segment(0, PAGE_INFORMATION, &[], 1, &page_info(8, 8, 0, 0)));
    file.extend(segment(1, IMMEDIATE_GENERIC_REGION, &[], 1, &data));
    file.extend(segment(2, END_OF_PAGE, &[], 1, &[]));

    assert_eq!(
        jbig2_decoder::decode(&file).unwrap_err(),
        DecodeError::Template(TemplateError::InvalidAtPixel)
    );
}

#[test]
fn region_operator_must_match_page_default() {
    let mut all_black = TestBitmap::new(8, 8);
    all_black.fill(true);

    // Page default operator is OR and the override bit is clear, but the
    // region asks for XOR (2).
    let mut file = file_header();
    file.extend(segment(0, PAGE_INFORMATION, &[], 1, &page_info(8, 8, 0, 0)));
    file.extend(segment(
        1,
        IMMEDIATE_GENERIC_REGION,
        &[],
        1,
        &generic_region_data(&all_black, 2),
    ));
    file.extend(segment(2, END_OF_PAGE, &[], 1, &[]));

    assert_eq!(
        jbig2_decoder::decode(&file).unwrap_err(),
        DecodeError::Region(RegionError::OperatorMismatch)
    );
}

#[test]
fn override_bit_allows_other_operators() {
    let mut all_black = TestBitmap::new(8, 8);
    all_black.fill(true);

    // Page flags 0x40: combination operator overridden; region uses XOR over
    // a white page, which leaves the region black.
    let mut file = file_header();
    file.extend(segment(0, PAGE_INFORMATION, &[], 1, &page_info(8, 8, 0x40, 0)));
    file.extend(segment(
        1,
        IMMEDIATE_GENERIC_REGION,
        &[],
        1,
        &generic_region_data(&all_black, 2),
    ));
    file.extend(segment(2, END_OF_PAGE, &[], 1, &[]));

    let frame = jbig2_decoder::decode(&file).unwrap();
    assert!(frame.get(0, 0) && frame.get(7, 7));
}

#[test]
fn region_outside_page_is_rejected() {
    let mut all_black = TestBitmap::new(8, 8);
    all_black.fill(true);
    all_black.x = 4; // 4 + 8 > 8

    let mut file = file_header();
    file.extend(segment(0, PAGE_INFORMATION, &[], 1, &page_info(8, 8, 0, 0)));
    file.extend(segment(
        1,
        IMMEDIATE_GENERIC_REGION,
        &[],
        1,
        &generic_region_data(&all_black, 0),
    ));
    file.extend(segment(2, END_OF_PAGE, &[], 1, &[]));

    assert_eq!(
        jbig2_decoder::decode(&file).unwrap_err(),
        DecodeError::Region(RegionError::OutsidePage)
    );
}

// --- symbol dictionary + text region (arithmetic) ---------------------------

/// Encode a symbol dictionary defining the A and B glyphs and exporting both
/// (SDHUFF = 0, SDREFAGG = 0, template 0).
fn arithmetic_symbol_dictionary_data(num_exported: u32) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&0_u16.to_be_bytes()); // flags
    data.extend_from_slice(&standard_at_bytes());
    data.extend_from_slice(&num_exported.to_be_bytes());
    data.extend_from_slice(&2_u32.to_be_bytes()); // SDNUMNEWSYMS

    let mut coder = QmCoder::new();
    let mut iadh = vec![Cx::default(); 512];
    let mut iadw = vec![Cx::default(); 512];
    let mut iaex = vec![Cx::default(); 512];
    let mut generic = vec![Cx::default(); 1 << 16];

    // One height class of height 5 holding both glyphs.
    qm::encode_integer(&mut coder, &mut iadh, Some(5));
    qm::encode_integer(&mut coder, &mut iadw, Some(3));
    qm::encode_generic_template0(
        &mut coder,
        &mut generic,
        &bitmap_from_rows(&GLYPH_A),
        STANDARD_AT,
    );
    qm::encode_integer(&mut coder, &mut iadw, Some(0));
    qm::encode_generic_template0(
        &mut coder,
        &mut generic,
        &bitmap_from_rows(&GLYPH_B),
        STANDARD_AT,
    );
    qm::encode_integer(&mut coder, &mut iadw, None); // end of height class

    // Export both new symbols: a zero-length run of non-exports, then two
    // exports.
    qm::encode_integer(&mut coder, &mut iaex, Some(0));
    qm::encode_integer(&mut coder, &mut iaex, Some(2));

    data.extend_from_slice(&coder.flush());
    data
}

/// Encode a text region placing A at (0,0), B at (4,0) and A at (8,0)
/// (SBHUFF = 0, one strip, TOPLEFT corner).
fn arithmetic_text_region_data() -> Vec<u8> {
    let mut data = region_info(20, 8, 0, 0, 0);
    data.extend_from_slice(&0x0010_u16.to_be_bytes()); // flags: REFCORNER TOPLEFT
    data.extend_from_slice(&3_u32.to_be_bytes()); // SBNUMINSTANCES

    let mut coder = QmCoder::new();
    let mut iadt = vec![Cx::default(); 512];
    let mut iafs = vec![Cx::default(); 512];
    let mut iads = vec![Cx::default(); 512];
    let mut iaid = vec![Cx::default(); 4]; // SBSYMCODELEN = 1

    qm::encode_integer(&mut coder, &mut iadt, Some(0)); // initial STRIPT
    qm::encode_integer(&mut coder, &mut iadt, Some(0)); // strip T

    qm::encode_integer(&mut coder, &mut iafs, Some(0)); // FIRSTS
    qm::encode_id(&mut coder, &mut iaid, 1, 0); // A

    // After placing A, CURS is 2; the next instances land at S = 4 and S = 8.
    qm::encode_integer(&mut coder, &mut iads, Some(2));
    qm::encode_id(&mut coder, &mut iaid, 1, 1); // B
    qm::encode_integer(&mut coder, &mut iads, Some(2));
    qm::encode_id(&mut coder, &mut iaid, 1, 0); // A

    data.extend_from_slice(&coder.flush());
    data
}

const TEXT_PAGE: [&str; 8] = [
    ".#..##...#..........",
    "#.#.#.#.#.#.........",
    "###.##..###.........",
    "#.#.#.#.#.#.........",
    "#.#.##..#.#.........",
    "....................",
    "....................",
    "....................",
];

#[test]
fn symbol_dictionary_feeds_text_region() {
    let mut file = file_header();
    file.extend(segment(0, PAGE_INFORMATION, &[], 1, &page_info(20, 8, 0, 0)));
    file.extend(segment(
        1,
        SYMBOL_DICTIONARY,
        &[],
        1,
        &arithmetic_symbol_dictionary_data(2),
    ));
    file.extend(segment(
        2,
        IMMEDIATE_TEXT_REGION,
        &[1],
        1,
        &arithmetic_text_region_data(),
    ));
    file.extend(segment(3, END_OF_PAGE, &[], 1, &[]));

    let frame = jbig2_decoder::decode(&file).unwrap();
    assert_frame(&frame, &TEXT_PAGE);
}

#[test]
fn integer_coding_round_trips_across_magnitude_buckets() {
    // Height and width deltas spanning every magnitude bucket of the integer
    // coding, both signs, plus OOB terminators. A single wrong bit anywhere
    // desynchronizes the stream and trips the export count check.
    let classes: &[(i32, &[i32])] = &[
        (400, &[1]),          // 340...4435 bucket, then 0...3
        (-396, &[90, -85]),   // negative large, then 84...339 both signs
        (4436, &[1]),         // the 32-bit bucket
        (-4400, &[21]),       // 20...83 bucket
    ];

    let mut num_new = 0_u32;
    let mut coder = QmCoder::new();
    let mut iadh = vec![Cx::default(); 512];
    let mut iadw = vec![Cx::default(); 512];
    let mut iaex = vec![Cx::default(); 512];
    let mut generic = vec![Cx::default(); 1 << 16];

    let mut height = 0_i32;
    for &(delta_height, widths) in classes {
        height += delta_height;
        qm::encode_integer(&mut coder, &mut iadh, Some(delta_height));

        let mut width = 0_i32;
        for &delta_width in widths {
            width += delta_width;
            qm::encode_integer(&mut coder, &mut iadw, Some(delta_width));

            let mut bitmap = TestBitmap::new(width as u32, height as u32);
            bitmap.set(0, 0, true);
            qm::encode_generic_template0(&mut coder, &mut generic, &bitmap, STANDARD_AT);
            num_new += 1;
        }
        qm::encode_integer(&mut coder, &mut iadw, None);
    }

    // Export all new symbols: a 4...19-bucket run completes the coverage.
    qm::encode_integer(&mut coder, &mut iaex, Some(0));
    qm::encode_integer(&mut coder, &mut iaex, Some(num_new as i32));

    let mut data = Vec::new();
    data.extend_from_slice(&0_u16.to_be_bytes());
    data.extend_from_slice(&standard_at_bytes());
    data.extend_from_slice(&num_new.to_be_bytes());
    data.extend_from_slice(&num_new.to_be_bytes());
    data.extend_from_slice(&coder.flush());

    let mut file = file_header();
    file.extend(segment(0, PAGE_INFORMATION, &[], 1, &page_info(8, 8, 0, 0)));
    file.extend(segment(1, SYMBOL_DICTIONARY, &[], 1, &data));
    file.extend(segment(2, END_OF_PAGE, &[], 1, &[]));

    let frame = jbig2_decoder::decode(&file).unwrap();
    assert_eq!((frame.width(), frame.height()), (8, 8));
}

#[test]
fn export_count_mismatch_is_rejected() {
    // The dictionary claims one exported symbol but the export runs mark two.
    let mut file = file_header();
    file.extend(segment(0, PAGE_INFORMATION, &[], 1, &page_info(20, 8, 0, 0)));
    file.extend(segment(
        1,
        SYMBOL_DICTIONARY,
        &[],
        1,
        &arithmetic_symbol_dictionary_data(1),
    ));
    file.extend(segment(2, END_OF_PAGE, &[], 1, &[]));

    assert_eq!(
        jbig2_decoder::decode(&file).unwrap_err(),
        DecodeError::Symbol(jbig2_decoder::SymbolError::ExportCountMismatch)
    );
}

#[test]
fn embedded_stream_with_global_dictionary() {
    // PDF style: the symbol dictionary arrives in a globals chunk with page
    // association 0, the page itself in a second chunk, and neither carries
    // an end of page segment.
    let globals = segment(0, SYMBOL_DICTIONARY, &[], 0, &arithmetic_symbol_dictionary_data(2));

    let mut page = segment(1, PAGE_INFORMATION, &[], 1, &page_info(20, 8, 0, 0));
    page.extend(segment(
        2,
        IMMEDIATE_TEXT_REGION,
        &[0],
        1,
        &arithmetic_text_region_data(),
    ));

    let mut decoder = Decoder::embedded(&[&globals, &page]).unwrap();
    assert_eq!(decoder.page_count(), 1);

    let frame = decoder.decode_frame(0).unwrap();
    assert_frame(&frame, &TEXT_PAGE);
}

// --- symbol dictionary + text region (Huffman) ------------------------------

/// Encode the same two-glyph dictionary with SDHUFF = 1, SDREFAGG = 0 and an
/// uncompressed height class collective bitmap.
///
/// `flags` selects the standard tables (0x0001) or a user-supplied bitmap
/// size table (0x0041).
fn huffman_symbol_dictionary_data(flags: u16) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&flags.to_be_bytes());
    data.extend_from_slice(&2_u32.to_be_bytes()); // SDNUMEXSYMS
    data.extend_from_slice(&2_u32.to_be_bytes()); // SDNUMNEWSYMS

    let mut bits = Bits::new();

    // Delta height 5, via table B.4: the 4...11 line has the code 1110 and
    // three offset bits.
    bits.push(0b1110, 4);
    bits.push(1, 3);

    // Delta width 3, via table B.2: the 3...10 line has the code 1110 and
    // three offset bits; delta width 0 is the one-bit code 0; OOB is 111111.
    bits.push(0b1110, 4);
    bits.push(0, 3);
    bits.push(0b0, 1);
    bits.push(0b111111, 6);

    // Collective bitmap size 0 (uncompressed), via table B.1: code 0 plus
    // four offset bits.
    bits.push(0b0, 1);
    bits.push(0, 4);
    bits.align();

    // The collective bitmap: A and B side by side, 6 pixels over 5 rows, each
    // row padded to a byte.
    let collective = [
        0b010_110_00, // .#. ##.
        0b101_101_00, // #.# #.#
        0b111_110_00, // ### ##.
        0b101_101_00, // #.# #.#
        0b101_110_00, // #.# ##.
    ];
    for row in collective {
        bits.push(row, 8);
    }

    // Export runs 0 and 2, via table B.1.
    bits.push(0b0, 1);
    bits.push(0, 4);
    bits.push(0b0, 1);
    bits.push(2, 4);

    data.extend_from_slice(&bits.into_bytes());
    data
}

/// Encode the three-instance text region with SBHUFF = 1 and the standard
/// tables B.6 / B.8 / B.11.
fn huffman_text_region_data() -> Vec<u8> {
    let mut data = region_info(20, 8, 0, 0, 0);
    data.extend_from_slice(&0x0011_u16.to_be_bytes()); // SBHUFF, TOPLEFT
    data.extend_from_slice(&0_u16.to_be_bytes()); // all standard tables
    data.extend_from_slice(&3_u32.to_be_bytes()); // SBNUMINSTANCES

    let mut bits = Bits::new();

    // Symbol ID code lengths (7.4.3.1.7): give RUNCODE1 a one-bit code and
    // leave every other run code unused, then emit "length 1" twice.
    for code in 0..35 {
        bits.push(if code == 1 { 1 } else { 0 }, 4);
    }
    bits.push(0b0, 1); // symbol 0 has code length 1
    bits.push(0b0, 1); // symbol 1 has code length 1
    bits.align();

    // Initial strip T: table B.11 cannot express zero, so the initial value
    // is 1 (STRIPT = -1) and the first strip advances by 1.
    bits.push(0b0, 1); // DT = 1
    bits.push(0b0, 1); // DT = 1

    // First instance: FIRSTS delta 0 via table B.6 (code 00 + 7 offset bits),
    // then symbol 0.
    bits.push(0b00, 2);
    bits.push(0, 7);
    bits.push(0b0, 1); // symbol A

    // Two more instances at S deltas of 2 via table B.8 (code 11010).
    bits.push(0b11010, 5);
    bits.push(0b1, 1); // symbol B
    bits.push(0b11010, 5);
    bits.push(0b0, 1); // symbol A

    data.extend_from_slice(&bits.into_bytes());
    data
}

#[test]
fn huffman_symbol_dictionary_feeds_huffman_text_region() {
    let mut file = file_header();
    file.extend(segment(0, PAGE_INFORMATION, &[], 1, &page_info(20, 8, 0, 0)));
    file.extend(segment(
        1,
        SYMBOL_DICTIONARY,
        &[],
        1,
        &huffman_symbol_dictionary_data(0x0001),
    ));
    file.extend(segment(
        2,
        IMMEDIATE_TEXT_REGION,
        &[1],
        1,
        &huffman_text_region_data(),
    ));
    file.extend(segment(3, END_OF_PAGE, &[], 1, &[]));

    let frame = jbig2_decoder::decode(&file).unwrap();
    assert_frame(&frame, &TEXT_PAGE);
}

#[test]
fn tables_segment_supplies_user_table() {
    // The Annex B.2 example encodes a table equivalent to table B.1; wiring
    // it in as the user-supplied bitmap size table must not change the
    // decoded page.
    let custom_table = [
        0x42, // flags: HTOOB=0, HTPS=2, HTRS=5
        0x00, 0x00, 0x00, 0x00, // HTLOW = 0
        0x00, 0x01, 0x01, 0x10, // HTHIGH = 65808
        0x49, 0x23, 0x81, 0x80, // packed table lines
    ];

    let mut file = file_header();
    file.extend(segment(0, PAGE_INFORMATION, &[], 1, &page_info(20, 8, 0, 0)));
    file.extend(segment(1, TABLES, &[], 1, &custom_table));
    file.extend(segment(
        2,
        SYMBOL_DICTIONARY,
        &[1],
        1,
        // Bit 6 set: SDHUFFBMSIZE comes from the referred tables segment.
        &huffman_symbol_dictionary_data(0x0041),
    ));
    file.extend(segment(
        3,
        IMMEDIATE_TEXT_REGION,
        &[2],
        1,
        &huffman_text_region_data(),
    ));
    file.extend(segment(4, END_OF_PAGE, &[], 1, &[]));

    let frame = jbig2_decoder::decode(&file).unwrap();
    assert_frame(&frame, &TEXT_PAGE);
}

// --- pattern dictionary + halftone region -----------------------------------

fn pattern_dictionary_data() -> Vec<u8> {
    let mut data = Vec::new();
    data.push(0x00); // arithmetic, template 0
    data.push(2); // HDPW
    data.push(2); // HDPH
    data.extend_from_slice(&3_u32.to_be_bytes()); // GRAYMAX

    // The collective bitmap: solid, half-left, half-right, empty.
    let collective = bitmap_from_rows(&["###..#..", "###..#.."]);

    let mut coder = QmCoder::new();
    let mut contexts = vec![Cx::default(); 1 << 16];
    qm::encode_generic_template0(
        &mut coder,
        &mut contexts,
        &collective,
        [(-2, 0), (-3, -1), (2, -2), (-2, -2)],
    );
    data.extend_from_slice(&coder.flush());
    data
}

fn halftone_region_data() -> Vec<u8> {
    let mut data = region_info(8, 4, 0, 0, 0);
    data.push(0x00); // arithmetic, template 0, no skip, HCOMBOP OR
    data.extend_from_slice(&4_u32.to_be_bytes()); // HGW
    data.extend_from_slice(&2_u32.to_be_bytes()); // HGH
    data.extend_from_slice(&0_i32.to_be_bytes()); // HGX
    data.extend_from_slice(&0_i32.to_be_bytes()); // HGY
    data.extend_from_slice(&0x0200_u16.to_be_bytes()); // HRX: 2 pixels
    data.extend_from_slice(&0_u16.to_be_bytes()); // HRY

    // Gray-scale values [[0, 1, 2, 3], [3, 2, 1, 0]] as two Gray-coded
    // bitplanes over one shared coder and context array.
    let values = [[0_u64, 1, 2, 3], [3, 2, 1, 0]];

    let mut msb_plane = TestBitmap::new(4, 2);
    let mut lsb_plane = TestBitmap::new(4, 2);
    for (y, row) in values.iter().enumerate() {
        for (x, &value) in row.iter().enumerate() {
            let high = (value >> 1) & 1 != 0;
            let low = value & 1 != 0;
            msb_plane.set(x as u32, y as u32, high);
            // Gray coding: the stored lower plane is XORed with the plane
            // above it.
            lsb_plane.set(x as u32, y as u32, low ^ high);
        }
    }

    let mut coder = QmCoder::new();
    let mut contexts = vec![Cx::default(); 1 << 16];
    qm::encode_generic_template0(&mut coder, &mut contexts, &msb_plane, STANDARD_AT);
    qm::encode_generic_template0(&mut coder, &mut contexts, &lsb_plane, STANDARD_AT);
    data.extend_from_slice(&coder.flush());
    data
}

#[test]
fn halftone_region_tiles_patterns() {
    let mut file = file_header();
    file.extend(segment(0, PAGE_INFORMATION, &[], 1, &page_info(8, 4, 0, 0)));
    file.extend(segment(1, PATTERN_DICTIONARY, &[], 1, &pattern_dictionary_data()));
    file.extend(segment(
        2,
        IMMEDIATE_HALFTONE_REGION,
        &[1],
        1,
        &halftone_region_data(),
    ));
    file.extend(segment(3, END_OF_PAGE, &[], 1, &[]));

    let frame = jbig2_decoder::decode(&file).unwrap();
    assert_frame(
        &frame,
        &[
            "###..#..", // solid, half-left, half-right, empty
            "###..#..",
            "...##.##", // empty, half-right, half-left, solid
            "...##.##",
        ],
    );
}

// --- striped pages -----------------------------------------------------------

fn end_of_stripe(y: u32) -> Vec<u8> {
    y.to_be_bytes().to_vec()
}

#[test]
fn striped_page_with_unknown_height() {
    // Height 0xFFFFFFFF with the striped bit and a maximum stripe size of 4;
    // three stripes of generic regions end at rows 3, 7 and 11.
    let mut file = file_header();
    file.extend(segment(
        0,
        PAGE_INFORMATION,
        &[],
        1,
        &page_info(8, 0xFFFF_FFFF, 0, 0x8000 | 4),
    ));

    let mut number = 1;
    for (stripe_y, end_y) in [(0, 3_u32), (4, 7), (8, 11)] {
        let mut bitmap = TestBitmap::new(8, 4);
        bitmap.fill(true);
        bitmap.y = stripe_y;

        file.extend(segment(
            number,
            IMMEDIATE_GENERIC_REGION,
            &[],
            1,
            &generic_region_data(&bitmap, 0),
        ));
        file.extend(segment(number + 1, END_OF_STRIPE, &[], 1, &end_of_stripe(end_y)));
        number += 2;
    }
    file.extend(segment(number, END_OF_PAGE, &[], 1, &[]));

    let frame = jbig2_decoder::decode(&file).unwrap();
    assert_eq!(frame.width(), 8);
    assert_eq!(frame.height(), 12);
    for y in 0..12 {
        assert!(frame.get(0, y) && frame.get(7, y));
    }
}

#[test]
fn decreasing_stripes_are_rejected() {
    let mut file = file_header();
    file.extend(segment(
        0,
        PAGE_INFORMATION,
        &[],
        1,
        &page_info(8, 0xFFFF_FFFF, 0, 0x8000 | 8),
    ));
    file.extend(segment(1, END_OF_STRIPE, &[], 1, &end_of_stripe(7)));
    file.extend(segment(2, END_OF_STRIPE, &[], 1, &end_of_stripe(3)));
    file.extend(segment(3, END_OF_PAGE, &[], 1, &[]));

    assert!(jbig2_decoder::decode(&file).is_err());
}

// --- malformed headers -------------------------------------------------------

#[test]
fn reserved_referred_count_fails_parsing() {
    let mut file = file_header();
    file.extend_from_slice(&[
        0x00, 0x00, 0x00, 0x00, // segment number 0
        0x30, // page information
        0xA0, // referred count 5: reserved
        0x01, // page association
        0x00, 0x00, 0x00, 0x13,
    ]);
    file.extend_from_slice(&page_info(8, 8, 0, 0));

    assert_eq!(
        Decoder::new(&file).map(|_| ()).unwrap_err(),
        DecodeError::Segment(SegmentError::InvalidReferredCount)
    );
}

#[test]
fn failed_frame_keeps_reporting_the_same_error() {
    let mut file = file_header();
    file.extend(segment(0, PAGE_INFORMATION, &[], 1, &page_info(8, 8, 0, 0)));
    // A text region that refers to no symbol dictionary at all.
    file.extend(segment(1, IMMEDIATE_TEXT_REGION, &[], 1, &{
        let mut data = region_info(8, 8, 0, 0, 0);
        data.extend_from_slice(&0x0010_u16.to_be_bytes());
        data.extend_from_slice(&1_u32.to_be_bytes());
        data
    }));
    file.extend(segment(2, END_OF_PAGE, &[], 1, &[]));

    let mut decoder = Decoder::new(&file).unwrap();
    let first = decoder.decode_frame(0).unwrap_err();
    let second = decoder.decode_frame(0).unwrap_err();
    assert_eq!(first, second);
}
