//! Code Point Packing
//!
//! Packs an arbitrary byte sequence into code points, two bytes per code point,
//! behind a header code point holding the byte count.  Every value is offset by
//! `BASE_OFFSET` to stay clear of ASCII.
//!
//! Packed values run from `0x100` to `0x100FF`, which covers the surrogate range.
//! Such values are not `char`, so packed text is kept as raw `u32` code points.
//! For storage each code point is written with the UTF-8 bit patterns, surrogates
//! included ("generalized UTF-8").  This is ordinary UTF-8 whenever no surrogate
//! is present.

use crate::Error;

/// Added to every packed value
pub const BASE_OFFSET: u32 = 0x0100;
/// Largest payload whose length fits in a 16 bit header
pub const MAX_PAYLOAD: usize = 0xFFFF - BASE_OFFSET as usize;

/// Sequence of code points produced by `pack`, header first
#[derive(Clone,Debug,PartialEq,Eq,Default)]
pub struct PackedText {
    cps: Vec<u32>
}

impl PackedText {
    pub fn code_points(&self) -> &[u32] {
        &self.cps
    }
    /// length in code points, including the header
    pub fn len(&self) -> usize {
        self.cps.len()
    }
    pub fn is_empty(&self) -> bool {
        self.cps.is_empty()
    }
    /// Convert to a `String`, fails if any code point is a surrogate
    pub fn to_string_strict(&self) -> Result<String,Error> {
        let mut ans = String::with_capacity(self.cps.len() * 3);
        for cp in &self.cps {
            match char::from_u32(*cp) {
                Some(c) => ans.push(c),
                None => return Err(Error::UnsupportedInput(format!("{:#x} is not a scalar value",cp)))
            }
        }
        Ok(ans)
    }
    /// Encode as generalized UTF-8
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut ans = Vec::with_capacity(self.cps.len() * 3);
        for cp in &self.cps {
            let cp = *cp;
            if cp < 0x80 {
                ans.push(cp as u8);
            } else if cp < 0x800 {
                ans.push(0xc0 | (cp >> 6) as u8);
                ans.push(0x80 | (cp & 0x3f) as u8);
            } else if cp < 0x10000 {
                ans.push(0xe0 | (cp >> 12) as u8);
                ans.push(0x80 | ((cp >> 6) & 0x3f) as u8);
                ans.push(0x80 | (cp & 0x3f) as u8);
            } else {
                ans.push(0xf0 | (cp >> 18) as u8);
                ans.push(0x80 | ((cp >> 12) & 0x3f) as u8);
                ans.push(0x80 | ((cp >> 6) & 0x3f) as u8);
                ans.push(0x80 | (cp & 0x3f) as u8);
            }
        }
        ans
    }
    /// Decode generalized UTF-8.  Overlong forms and values past 0x10FFFF are rejected.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self,Error> {
        let malformed = |at: usize| Error::UnsupportedInput(format!("malformed text at byte {}",at));
        let mut cps = Vec::with_capacity(bytes.len() / 2);
        let mut ptr = 0;
        while ptr < bytes.len() {
            let lead = bytes[ptr];
            let (extra,init,min) = match lead {
                0x00..=0x7f => (0,lead as u32,0),
                0xc0..=0xdf => (1,(lead & 0x1f) as u32,0x80),
                0xe0..=0xef => (2,(lead & 0x0f) as u32,0x800),
                0xf0..=0xf4 => (3,(lead & 0x07) as u32,0x10000),
                _ => return Err(malformed(ptr))
            };
            if ptr + extra >= bytes.len() {
                return Err(malformed(ptr));
            }
            let mut cp = init;
            for k in 1..=extra {
                let b = bytes[ptr + k];
                if b & 0xc0 != 0x80 {
                    return Err(malformed(ptr + k));
                }
                cp = (cp << 6) | (b & 0x3f) as u32;
            }
            if cp < min || cp > 0x10ffff {
                return Err(malformed(ptr));
            }
            cps.push(cp);
            ptr += 1 + extra;
        }
        Ok(Self { cps })
    }
}

impl From<Vec<u32>> for PackedText {
    fn from(cps: Vec<u32>) -> Self {
        Self { cps }
    }
}

impl From<&str> for PackedText {
    fn from(s: &str) -> Self {
        Self { cps: s.chars().map(|c| c as u32).collect() }
    }
}

/// Pack bytes into code points
pub fn pack(bytes: &[u8]) -> Result<PackedText,Error> {
    if bytes.len() > MAX_PAYLOAD {
        return Err(Error::UnsupportedInput(format!("{} bytes exceeds packing limit of {}",bytes.len(),MAX_PAYLOAD)));
    }
    let mut cps = Vec::with_capacity(1 + (bytes.len() + 1) / 2);
    cps.push(BASE_OFFSET + bytes.len() as u32);
    for pair in bytes.chunks(2) {
        let hi = pair[0] as u32;
        let lo = match pair.len() {
            2 => pair[1] as u32,
            _ => 0
        };
        cps.push(BASE_OFFSET + (hi << 8 | lo));
    }
    log::debug!("packed {} bytes into {} code points",bytes.len(),cps.len());
    Ok(PackedText { cps })
}

/// Unpack code points into bytes, the header determines how many bytes are kept.
/// Code points past the declared length are ignored.
/// Unlike `pack`, headers past `0xFFFF` are accepted so that long artifacts from
/// older tools can still be read.  The header is checked against the number of
/// code points present before anything is allocated.
pub fn unpack(packed: &PackedText) -> Result<Vec<u8>,Error> {
    let header = match packed.cps.first() {
        Some(h) => *h,
        None => return Err(Error::TruncatedHeader)
    };
    if header < BASE_OFFSET {
        return Err(Error::BadHeader(header));
    }
    let length = (header - BASE_OFFSET) as usize;
    let needed = (length + 1) / 2;
    if packed.cps.len() - 1 < needed {
        log::error!("header declares {} bytes but only {} code points follow",length,packed.cps.len() - 1);
        return Err(Error::TruncatedHeader);
    }
    let mut ans = Vec::with_capacity(length);
    for cp in &packed.cps[1..=needed] {
        if *cp < BASE_OFFSET || *cp - BASE_OFFSET > 0xffff {
            return Err(Error::BadCodePoint(*cp));
        }
        let val = *cp - BASE_OFFSET;
        ans.push((val >> 8) as u8);
        if ans.len() < length {
            ans.push((val & 0xff) as u8);
        }
    }
    Ok(ans)
}

#[test]
fn layout() {
    let packed = pack(&hex::decode("0161000901").unwrap()).expect("packing failed");
    assert_eq!(packed.code_points(),&[0x105,0x261,0x109,0x200]);
    let packed = pack(&hex::decode("ffff0000").unwrap()).expect("packing failed");
    assert_eq!(packed.code_points(),&[0x104,0x100ff,0x100]);
}

#[test]
fn invertibility() {
    for n in 0..8 {
        let test_data: Vec<u8> = (0..n).map(|i| (i * 37 + 250) as u8).collect();
        let packed = pack(&test_data).expect("packing failed");
        assert_eq!(packed.len(),1 + (n + 1) / 2);
        assert_eq!(unpack(&packed).expect("unpacking failed"),test_data);
    }
}

#[test]
fn odd_padding_is_dropped() {
    let packed = PackedText::from(vec![0x103,0x1234,0x5678]);
    assert_eq!(unpack(&packed).expect("unpacking failed"),vec![0x11,0x34,0x55]);
}

#[test]
fn trailing_code_points_ignored() {
    let packed = PackedText::from(vec![0x102,0x4242,'\n' as u32]);
    assert_eq!(unpack(&packed).expect("unpacking failed"),vec![0x41,0x42]);
}

#[test]
fn header_boundary() {
    let packed = pack(&vec![7;MAX_PAYLOAD]).expect("packing failed");
    assert_eq!(packed.code_points()[0],0xffff);
    assert_eq!(unpack(&packed).expect("unpacking failed").len(),MAX_PAYLOAD);
    assert!(matches!(pack(&vec![7;MAX_PAYLOAD+1]),Err(Error::UnsupportedInput(_))));
}

#[test]
fn header_past_pack_limit() {
    // 0x10000 bytes declared, readable though `pack` would refuse to write it
    let mut cps = vec![BASE_OFFSET + 0x10000];
    cps.extend(std::iter::repeat(0x4242).take(0x8000));
    assert_eq!(unpack(&PackedText::from(cps)).expect("unpacking failed").len(),0x10000);
    // huge declared length with a short body fails before allocating
    assert_eq!(unpack(&PackedText::from(vec![0x10ffff,0x100,0x100])),Err(Error::TruncatedHeader));
}

#[test]
fn truncated() {
    assert_eq!(unpack(&PackedText::default()),Err(Error::TruncatedHeader));
    assert_eq!(unpack(&PackedText::from(vec![0x105,0x261])),Err(Error::TruncatedHeader));
    assert_eq!(unpack(&PackedText::from(vec![0x41])),Err(Error::BadHeader(0x41)));
    assert_eq!(unpack(&PackedText::from(vec![0x102,0x20])),Err(Error::BadCodePoint(0x20)));
}

#[test]
fn generalized_utf8() {
    let packed = PackedText::from(vec![0x105,0x41,0x3b1,0xd800,0xdfff,0xffff,0x100ff]);
    let bytes = packed.to_bytes();
    assert_eq!(bytes,hex::decode("c48541ceb1eda080edbfbfefbfbff09083bf").unwrap());
    assert_eq!(PackedText::from_bytes(&bytes).expect("decoding failed"),packed);
    assert!(packed.to_string_strict().is_err());
    let packed = PackedText::from("Āžé");
    assert_eq!(packed.to_bytes(),"Āžé".as_bytes());
    assert_eq!(packed.to_string_strict().expect("not a string"),"Āžé");
}

#[test]
fn malformed_bytes() {
    assert!(PackedText::from_bytes(&[0xc4]).is_err());
    assert!(PackedText::from_bytes(&[0xc4,0x41]).is_err());
    assert!(PackedText::from_bytes(&[0xc0,0x80]).is_err());
    assert!(PackedText::from_bytes(&[0xff]).is_err());
}
