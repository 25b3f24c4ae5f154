//! Packed reference text (spec §3 "Packed text", §6 "Packed DNA text file").
//!
//! Three bits per symbol are split across three parallel layers: two dense
//! bitmaps carrying the low/high bit of the `{A,C,G,T}` 2-bit code (which is
//! exactly `Symbol::code() & 0b11` for those four symbols, since
//! `alphabet::BASE_A..=BASE_T` are assigned codes `0..=3`), and a third,
//! sparse layer recording which positions hold a non-ACGT symbol (`N`, `SEP`,
//! `JMP`) together with their exact code. Most reference bases are plain
//! nucleotides, so the sparse side table stays small — this mirrors the
//! `cdna_bitwise_text.c` layout named in spec §6 more directly than a flat
//! 3-bit-per-symbol array would.

use crate::alphabet::Symbol;

const WORD_BITS: usize = 64;

#[inline]
fn word_index(i: usize) -> usize {
    i / WORD_BITS
}

#[inline]
fn bit_index(i: usize) -> usize {
    i % WORD_BITS
}

pub struct PackedText {
    len: usize,
    layer_lo: Vec<u64>,
    layer_hi: Vec<u64>,
    special_bitmap: Vec<u64>,
    /// Sorted by position; holds the exact code for every position flagged
    /// in `special_bitmap`.
    special_codes: Vec<(u32, u8)>,
}

impl PackedText {
    pub fn from_symbols(symbols: &[Symbol]) -> Self {
        let len = symbols.len();
        let words = word_index(len.saturating_sub(1).max(0)) + 1;
        let words = if len == 0 { 0 } else { words };
        let mut layer_lo = vec![0u64; words];
        let mut layer_hi = vec![0u64; words];
        let mut special_bitmap = vec![0u64; words];
        let mut special_codes = Vec::new();

        for (i, sym) in symbols.iter().enumerate() {
            let code = sym.code();
            let w = word_index(i);
            let b = bit_index(i);
            if code <= 3 {
                if code & 0b01 != 0 {
                    layer_lo[w] |= 1u64 << b;
                }
                if code & 0b10 != 0 {
                    layer_hi[w] |= 1u64 << b;
                }
            } else {
                special_bitmap[w] |= 1u64 << b;
                special_codes.push((i as u32, code));
            }
        }

        PackedText { len, layer_lo, layer_hi, special_bitmap, special_codes }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Random access to the encoded symbol at position `i`.
    pub fn get(&self, i: usize) -> Symbol {
        debug_assert!(i < self.len, "packed text index out of range: {i} >= {}", self.len);
        let w = word_index(i);
        let b = bit_index(i);
        let is_special = (self.special_bitmap[w] >> b) & 1 == 1;
        if is_special {
            let code = match self.special_codes.binary_search_by_key(&(i as u32), |&(pos, _)| pos) {
                Ok(idx) => self.special_codes[idx].1,
                Err(_) => unreachable!("special_bitmap set without a matching special_codes entry"),
            };
            Symbol::from_code(code)
        } else {
            let lo = (self.layer_lo[w] >> b) & 1;
            let hi = (self.layer_hi[w] >> b) & 1;
            Symbol::from_code(((hi << 1) | lo) as u8)
        }
    }

    pub fn slice(&self, begin: usize, end: usize) -> Vec<Symbol> {
        (begin..end).map(|i| self.get(i)).collect()
    }

    pub fn to_symbols(&self) -> Vec<Symbol> {
        (0..self.len).map(|i| self.get(i)).collect()
    }

    /// Serializes to the "Packed DNA text file" layout of spec §6: header
    /// `{text_length, text_size}` then the two dense layers followed by the
    /// sparse special-position bitmap and its `(position, code)` pairs.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(self.len as u64).to_le_bytes());
        out.extend_from_slice(&(self.layer_lo.len() as u64).to_le_bytes());
        for word in &self.layer_lo {
            out.extend_from_slice(&word.to_le_bytes());
        }
        for word in &self.layer_hi {
            out.extend_from_slice(&word.to_le_bytes());
        }
        for word in &self.special_bitmap {
            out.extend_from_slice(&word.to_le_bytes());
        }
        out.extend_from_slice(&(self.special_codes.len() as u64).to_le_bytes());
        for &(pos, code) in &self.special_codes {
            out.extend_from_slice(&pos.to_le_bytes());
            out.push(code);
        }
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut cursor = 0usize;
        let read_u64 = |bytes: &[u8], cursor: &mut usize| -> u64 {
            let v = u64::from_le_bytes(bytes[*cursor..*cursor + 8].try_into().unwrap());
            *cursor += 8;
            v
        };

        let len = read_u64(bytes, &mut cursor) as usize;
        let word_count = read_u64(bytes, &mut cursor) as usize;

        let mut read_words = |bytes: &[u8], cursor: &mut usize| -> Vec<u64> {
            (0..word_count).map(|_| read_u64(bytes, cursor)).collect()
        };
        let layer_lo = read_words(bytes, &mut cursor);
        let layer_hi = read_words(bytes, &mut cursor);
        let special_bitmap = read_words(bytes, &mut cursor);

        let special_count = read_u64(bytes, &mut cursor) as usize;
        let mut special_codes = Vec::with_capacity(special_count);
        for _ in 0..special_count {
            let pos = u32::from_le_bytes(bytes[cursor..cursor + 4].try_into().unwrap());
            cursor += 4;
            let code = bytes[cursor];
            cursor += 1;
            special_codes.push((pos, code));
        }

        PackedText { len, layer_lo, layer_hi, special_bitmap, special_codes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::encode_text;

    #[test]
    fn random_access_round_trips() {
        let symbols = encode_text(b"ACGTNACGTNNNACGT").unwrap();
        let packed = PackedText::from_symbols(&symbols);
        assert_eq!(packed.len(), symbols.len());
        for (i, sym) in symbols.iter().enumerate() {
            assert_eq!(packed.get(i), *sym, "mismatch at {i}");
        }
    }

    #[test]
    fn slice_matches_source() {
        let symbols = encode_text(b"ACGTACGTACGT").unwrap();
        let packed = PackedText::from_symbols(&symbols);
        assert_eq!(packed.slice(4, 8), symbols[4..8]);
    }

    #[test]
    fn empty_text() {
        let packed = PackedText::from_symbols(&[]);
        assert_eq!(packed.len(), 0);
        assert!(packed.is_empty());
    }

    #[test]
    fn byte_round_trip_preserves_special_positions() {
        let symbols = encode_text(b"ACGTNACGTNNNACGT").unwrap();
        let packed = PackedText::from_symbols(&symbols);
        let bytes = packed.to_bytes();
        let loaded = PackedText::from_bytes(&bytes);
        assert_eq!(loaded.to_symbols(), symbols);
    }
}
