//! Test-only encoders: a QM arithmetic coder (the encoder half of ITU-T T.88
//! Annex E, in the software conventions of Annex G), the integer and symbol
//! ID encodings of Annex A, and a generic-region pixel encoder for template 0.
//!
//! These exist so the integration tests can synthesize real arithmetic
//! bitstreams instead of carrying opaque binary fixtures.

/// One row of Table E.1: (Qe, NMPS, NLPS, SWITCH).
#[rustfmt::skip]
const QE: [(u32, u8, u8, bool); 47] = [
    (0x5601,  1,  1, true),
    (0x3401,  2,  6, false),
    (0x1801,  3,  9, false),
    (0x0AC1,  4, 12, false),
    (0x0521,  5, 29, false),
    (0x0221, 38, 33, false),
    (0x5601,  7,  6, true),
    (0x5401,  8, 14, false),
    (0x4801,  9, 14, false),
    (0x3801, 10, 14, false),
    (0x3001, 11, 17, false),
    (0x2401, 12, 18, false),
    (0x1C01, 13, 20, false),
    (0x1601, 29, 21, false),
    (0x5601, 15, 14, true),
    (0x5401, 16, 14, false),
    (0x5101, 17, 15, false),
    (0x4801, 18, 16, false),
    (0x3801, 19, 17, false),
    (0x3401, 20, 18, false),
    (0x3001, 21, 19, false),
    (0x2801, 22, 19, false),
    (0x2401, 23, 20, false),
    (0x2201, 24, 21, false),
    (0x1C01, 25, 22, false),
    (0x1801, 26, 23, false),
    (0x1601, 27, 24, false),
    (0x1401, 28, 25, false),
    (0x1201, 29, 26, false),
    (0x1101, 30, 27, false),
    (0x0AC1, 31, 28, false),
    (0x09C1, 32, 29, false),
    (0x08A1, 33, 30, false),
    (0x0521, 34, 31, false),
    (0x0441, 35, 32, false),
    (0x02A1, 36, 33, false),
    (0x0221, 37, 34, false),
    (0x0141, 38, 35, false),
    (0x0111, 39, 36, false),
    (0x0085, 40, 37, false),
    (0x0049, 41, 38, false),
    (0x0025, 42, 39, false),
    (0x0015, 43, 40, false),
    (0x0009, 44, 41, false),
    (0x0005, 45, 42, false),
    (0x0001, 45, 43, false),
    (0x5601, 46, 46, false),
];

/// Per-context adaptive state: a Table E.1 index and the current MPS sense.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cx {
    index: u8,
    mps: bool,
}

/// The QM encoder state (Annex E encoder, software conventions).
pub struct QmCoder {
    a: u32,
    c: u32,
    ct: i32,
    b: u8,
    /// Index of `b` in the output; -1 before the first byte exists.
    bp: i64,
    out: Vec<u8>,
}

impl QmCoder {
    pub fn new() -> Self {
        // INITENC: A = 0x8000, C = 0, CT = 12, BP before the first byte.
        Self {
            a: 0x8000,
            c: 0,
            ct: 12,
            b: 0,
            bp: -1,
            out: Vec::new(),
        }
    }

    /// Encode one decision `d` in context `cx` (the ENCODE procedure).
    pub fn encode_bit(&mut self, cx: &mut Cx, d: bool) {
        let (qe, nmps, nlps, switch) = QE[cx.index as usize];

        if d == cx.mps {
            // CODEMPS with conditional exchange.
            self.a = self.a.wrapping_sub(qe);
            if self.a & 0x8000 == 0 {
                if self.a < qe {
                    self.a = qe;
                } else {
                    self.c = self.c.wrapping_add(qe);
                }
                cx.index = nmps;
                self.renorm();
            } else {
                self.c = self.c.wrapping_add(qe);
            }
        } else {
            // CODELPS with conditional exchange.
            self.a = self.a.wrapping_sub(qe);
            if self.a < qe {
                self.c = self.c.wrapping_add(qe);
            } else {
                self.a = qe;
            }
            if switch {
                cx.mps = !cx.mps;
            }
            cx.index = nlps;
            self.renorm();
        }
    }

    /// RENORME: shift A and C up until A's top bit returns.
    fn renorm(&mut self) {
        loop {
            self.a <<= 1;
            self.c <<= 1;
            self.ct -= 1;
            if self.ct == 0 {
                self.byte_out();
            }
            if self.a & 0x8000 != 0 {
                break;
            }
        }
    }

    /// BYTEOUT: emit one byte, stuffing after 0xFF and propagating carries.
    fn byte_out(&mut self) {
        if self.b == 0xFF {
            if self.bp >= 0 {
                self.out.push(self.b);
            }
            self.b = (self.c >> 20) as u8;
            self.bp += 1;
            self.c &= 0x0F_FFFF;
            self.ct = 7;
            return;
        }

        if self.c < 0x0800_0000 {
            if self.bp >= 0 {
                self.out.push(self.b);
            }
            self.b = (self.c >> 19) as u8;
            self.bp += 1;
            self.c &= 0x07_FFFF;
            self.ct = 8;
            return;
        }

        // Carry into the pending byte.
        self.b = self.b.wrapping_add(1);
        if self.b == 0xFF {
            self.c &= 0x07FF_FFFF;
            if self.bp >= 0 {
                self.out.push(self.b);
            }
            self.b = (self.c >> 20) as u8;
            self.bp += 1;
            self.c &= 0x0F_FFFF;
            self.ct = 7;
        } else {
            if self.bp >= 0 {
                self.out.push(self.b);
            }
            self.b = (self.c >> 19) as u8;
            self.bp += 1;
            self.c &= 0x07_FFFF;
            self.ct = 8;
        }
    }

    /// FLUSH: terminate the stream, appending the 0xFF 0xAC marker a decoder
    /// idles on.
    pub fn flush(mut self) -> Vec<u8> {
        let over = self.c.wrapping_add(self.a);
        self.c |= 0xFFFF;
        if self.c >= over {
            self.c = self.c.wrapping_sub(0x8000);
        }

        self.c <<= self.ct as u32;
        self.byte_out();
        self.c <<= self.ct as u32;
        self.byte_out();

        if self.bp >= 0 {
            self.out.push(self.b);
        }
        self.out.push(0xFF);
        self.out.push(0xAC);
        self.out
    }
}

/// One bit of an Annex A integer, chaining PREV exactly like the decoder.
fn integer_bit(coder: &mut QmCoder, contexts: &mut [Cx], prev: &mut usize, d: u32) {
    coder.encode_bit(&mut contexts[*prev & 0x1FF], d != 0);

    if *prev < 256 {
        *prev = (*prev << 1) | d as usize;
    } else {
        *prev = (((*prev << 1) | d as usize) & 511) | 256;
    }
}

/// Encode one Annex A integer; `None` is the out-of-band value.
pub fn encode_integer(coder: &mut QmCoder, contexts: &mut [Cx], value: Option<i32>) {
    let mut prev = 1_usize;

    let Some(value) = value else {
        // OOB: S = 1 with a zero magnitude in the smallest bucket.
        integer_bit(coder, contexts, &mut prev, 1);
        integer_bit(coder, contexts, &mut prev, 0);
        integer_bit(coder, contexts, &mut prev, 0);
        integer_bit(coder, contexts, &mut prev, 0);
        return;
    };

    let sign = u32::from(value < 0);
    let magnitude = value.unsigned_abs();
    integer_bit(coder, contexts, &mut prev, sign);

    // The magnitude buckets of Figure A.1.
    let (prefix, prefix_len, value_bits, base): (u32, u32, u32, u32) = match magnitude {
        0..=3 => (0b0, 1, 2, 0),
        4..=19 => (0b10, 2, 4, 4),
        20..=83 => (0b110, 3, 6, 20),
        84..=339 => (0b1110, 4, 8, 84),
        340..=4435 => (0b11110, 5, 12, 340),
        _ => (0b11111, 5, 32, 4436),
    };

    for i in (0..prefix_len).rev() {
        integer_bit(coder, contexts, &mut prev, (prefix >> i) & 1);
    }

    let offset = magnitude - base;
    for i in (0..value_bits).rev() {
        integer_bit(coder, contexts, &mut prev, (offset >> i) & 1);
    }
}

/// Encode one Annex A.3 symbol ID of `code_length` bits.
///
/// `contexts` must hold `1 << (code_length + 1)` entries.
pub fn encode_id(coder: &mut QmCoder, contexts: &mut [Cx], code_length: u32, value: u32) {
    let mut prev = 1_usize;

    for i in (0..code_length).rev() {
        let d = (value >> i) & 1;
        coder.encode_bit(&mut contexts[prev], d != 0);
        prev = (prev << 1) | d as usize;
    }
}

/// A plain pixel matrix the tests draw into before encoding.
pub struct TestBitmap {
    pub width: u32,
    pub height: u32,
    /// Placement on the page, used when the bitmap becomes a region.
    pub x: u32,
    pub y: u32,
    data: Vec<bool>,
}

impl TestBitmap {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            x: 0,
            y: 0,
            data: vec![false; (width * height) as usize],
        }
    }

    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        self.data[(y * self.width + x) as usize] = value;
    }

    pub fn fill(&mut self, value: bool) {
        self.data.fill(value);
    }

    /// Template reads outside the bitmap are white, like the decoder's.
    fn pixel(&self, x: i32, y: i32) -> u32 {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            0
        } else {
            self.data[(y as u32 * self.width + x as u32) as usize] as u32
        }
    }
}

/// Encode a bitmap pixel by pixel with generic template 0 and no typical
/// prediction. The context bit order mirrors Figure 3; the decoder must form
/// the identical value for every pixel or the streams diverge immediately.
pub fn encode_generic_template0(
    coder: &mut QmCoder,
    contexts: &mut [Cx],
    bitmap: &TestBitmap,
    at: [(i32, i32); 4],
) {
    for y in 0..bitmap.height as i32 {
        for x in 0..bitmap.width as i32 {
            let mut context = 0_u32;

            context = (context << 1) | bitmap.pixel(x + at[3].0, y + at[3].1);
            context = (context << 1) | bitmap.pixel(x - 1, y - 2);
            context = (context << 1) | bitmap.pixel(x, y - 2);
            context = (context << 1) | bitmap.pixel(x + 1, y - 2);
            context = (context << 1) | bitmap.pixel(x + at[2].0, y + at[2].1);

            context = (context << 1) | bitmap.pixel(x + at[1].0, y + at[1].1);
            context = (context << 1) | bitmap.pixel(x - 2, y - 1);
            context = (context << 1) | bitmap.pixel(x - 1, y - 1);
            context = (context << 1) | bitmap.pixel(x, y - 1);
            context = (context << 1) | bitmap.pixel(x + 1, y - 1);
            context = (context << 1) | bitmap.pixel(x + 2, y - 1);
            context = (context << 1) | bitmap.pixel(x + at[0].0, y + at[0].1);

            context = (context << 1) | bitmap.pixel(x - 4, y);
            context = (context << 1) | bitmap.pixel(x - 3, y);
            context = (context << 1) | bitmap.pixel(x - 2, y);
            context = (context << 1) | bitmap.pixel(x - 1, y);

            let d = bitmap.pixel(x, y) != 0;
            coder.encode_bit(&mut contexts[context as usize], d);
        }
    }
}

/// An MSB-first bit accumulator for hand-assembled Huffman streams.
pub struct Bits {
    out: Vec<u8>,
    current: u8,
    used: u8,
}

impl Bits {
    pub fn new() -> Self {
        Self {
            out: Vec::new(),
            current: 0,
            used: 0,
        }
    }

    pub fn push(&mut self, value: u32, bits: u32) {
        for i in (0..bits).rev() {
            self.push_bit(((value >> i) & 1) as u8);
        }
    }

    fn push_bit(&mut self, bit: u8) {
        self.current = (self.current << 1) | bit;
        self.used += 1;
        if self.used == 8 {
            self.out.push(self.current);
            self.current = 0;
            self.used = 0;
        }
    }

    /// Pad the current byte with zero bits.
    pub fn align(&mut self) {
        while self.used != 0 {
            self.push_bit(0);
        }
    }

    pub fn into_bytes(mut self) -> Vec<u8> {
        self.align();
        self.out
    }
}
