//! # Unicompress
//!
//! Compress text into a string of Unicode code points, and back again.
//!
//! Compression runs in three stages:
//! * text is converted to UTF-8 bytes
//! * the bytes are tokenized by a simple LZ77 matcher (`lz` module)
//! * the token stream is packed two bytes per code point (`packing` module)
//!
//! HTML can optionally be minified first (`html` module).  Expansion is the
//! same pipeline run backwards.
//!
//! The functions in this module transform whole buffers, we expect inputs
//! that are easily buffered (single files of modest size).

use std::io::{Cursor,Read,Write};

pub mod lz;
pub mod packing;
pub mod html;

pub use lz::Token;
pub use packing::{PackedText,BASE_OFFSET,MAX_PAYLOAD};

type DYNERR = Box<dyn std::error::Error>;

/// Codec Errors
#[derive(thiserror::Error,Debug,PartialEq)]
pub enum Error {
    #[error("corrupt token stream at byte {offset}: {reason}")]
    CorruptStream {
        offset: usize,
        reason: String
    },
    #[error("packed text is shorter than its declared length")]
    TruncatedHeader,
    #[error("header code point {0:#06x} is below the base offset")]
    BadHeader(u32),
    #[error("code point {0:#x} cannot hold packed data")]
    BadCodePoint(u32),
    #[error("unsupported input: {0}")]
    UnsupportedInput(String)
}

/// Serialization of reference tokens.
/// Literal tokens are always `0x01` followed by the byte.
#[derive(Clone,Copy,Debug,PartialEq)]
pub enum TokenFormat {
    /// `0x00`, length, distance, each field a single byte.  Lengths and
    /// distances above 255 are truncated modulo 256, as in existing artifacts.
    Legacy,
    /// `0x00`, length, distance, each field a big endian u16.
    Wide
}

/// Options controlling compression
#[derive(Clone,Debug)]
pub struct Options {
    /// maximum distance the matcher will look behind the cursor
    pub window: usize,
    /// longest match the matcher will measure
    pub max_match: usize,
    /// matches must be longer than this to become a reference
    pub threshold: usize,
    /// how reference tokens are serialized
    pub format: TokenFormat
}

pub const STD_OPTIONS: Options = Options {
    window: 2048,
    max_match: 258,
    threshold: 3,
    format: TokenFormat::Wide
};

/// Same matcher as `STD_OPTIONS`, but emits the single byte format.
/// Long or distant matches will not survive the round trip.
pub const LEGACY_OPTIONS: Options = Options {
    window: 2048,
    max_match: 258,
    threshold: 3,
    format: TokenFormat::Legacy
};

/// Compress text into packed code points
pub fn compress_text(text: &str,opt: &Options) -> Result<PackedText,Error> {
    let raw = text.as_bytes();
    let tokens = lz::compress(raw,opt);
    let token_bytes = lz::serialize(&tokens,opt.format);
    log::debug!("{} bytes became {} tokens in {} bytes",raw.len(),tokens.len(),token_bytes.len());
    packing::pack(&token_bytes)
}

/// Minify HTML, then compress it as text
pub fn compress_html(html: &str,opt: &Options) -> Result<PackedText,Error> {
    let minified = html::minify(html);
    log::debug!("minified {} bytes of HTML into {}",html.len(),minified.len());
    compress_text(&minified,opt)
}

/// Recover text from packed code points.
/// The format in `opt` has to match the one used for compression.
pub fn decompress_text(packed: &PackedText,opt: &Options) -> Result<String,Error> {
    let token_bytes = packing::unpack(packed)?;
    let raw = lz::decompress(&token_bytes,opt.format)?;
    log::debug!("{} token bytes expanded to {} bytes",token_bytes.len(),raw.len());
    String::from_utf8(raw).map_err(|e| Error::UnsupportedInput(e.to_string()))
}

/// Main compression function.
/// `text_in` is an object with the `Read` trait, usually `std::fs::File`, or `std::io::Cursor<&[u8]>`.
/// `packed_out` is an object with the `Write` trait, receives the packed text as generalized UTF-8.
/// If `minify` is true the input is treated as HTML.
/// Returns (in_size,out_size) in bytes, or error.
pub fn compress<R,W>(text_in: &mut R, packed_out: &mut W, minify: bool, opt: &Options) -> Result<(u64,u64),DYNERR>
where R: Read, W: Write {
    let mut raw = Vec::new();
    text_in.read_to_end(&mut raw)?;
    let text = match String::from_utf8(raw) {
        Ok(s) => s,
        Err(_) => return Err(Box::new(Error::UnsupportedInput("input is not UTF-8 text".to_string())))
    };
    let packed = match minify {
        true => compress_html(&text,opt)?,
        false => compress_text(&text,opt)?
    };
    let out = packed.to_bytes();
    packed_out.write_all(&out)?;
    packed_out.flush()?;
    Ok((text.len() as u64,out.len() as u64))
}

/// Main decompression function.
/// `packed_in` is an object with the `Read` trait holding packed text as generalized UTF-8.
/// `text_out` is an object with the `Write` trait, receives UTF-8 text.
/// Returns (in_size,out_size) in bytes, or error.
pub fn decompress<R,W>(packed_in: &mut R, text_out: &mut W, opt: &Options) -> Result<(u64,u64),DYNERR>
where R: Read, W: Write {
    let mut raw = Vec::new();
    packed_in.read_to_end(&mut raw)?;
    let packed = PackedText::from_bytes(&raw)?;
    let text = decompress_text(&packed,opt)?;
    text_out.write_all(text.as_bytes())?;
    text_out.flush()?;
    Ok((raw.len() as u64,text.len() as u64))
}

/// Convenience function, calls `compress` with a slice returning a Vec
pub fn compress_slice(slice: &[u8],minify: bool,opt: &Options) -> Result<Vec<u8>,DYNERR> {
    let mut src = Cursor::new(slice);
    let mut ans: Cursor<Vec<u8>> = Cursor::new(Vec::new());
    compress(&mut src,&mut ans,minify,opt)?;
    Ok(ans.into_inner())
}

/// Convenience function, calls `decompress` with a slice returning a Vec
pub fn decompress_slice(slice: &[u8],opt: &Options) -> Result<Vec<u8>,DYNERR> {
    let mut src = Cursor::new(slice);
    let mut ans: Cursor<Vec<u8>> = Cursor::new(Vec::new());
    decompress(&mut src,&mut ans,opt)?;
    Ok(ans.into_inner())
}

#[test]
fn text_invertibility() {
    let test_data = "I am Sam. Sam I am. I do not like this Sam I am.\n";
    let packed = compress_text(test_data,&STD_OPTIONS).expect("compression failed");
    assert!(packed.len() < test_data.len());
    let expanded = decompress_text(&packed,&STD_OPTIONS).expect("expansion failed");
    assert_eq!(test_data,expanded);
}

#[test]
fn empty_text() {
    let packed = compress_text("",&STD_OPTIONS).expect("compression failed");
    assert_eq!(packed.code_points(),&[BASE_OFFSET]);
    assert_eq!(decompress_text(&packed,&STD_OPTIONS).expect("expansion failed"),"");
}

#[test]
fn legacy_matches_original_artifact() {
    // 'a' as a literal, then a run of 9 at distance 1
    let packed = compress_text("aaaaaaaaaa",&LEGACY_OPTIONS).expect("compression failed");
    assert_eq!(packed.code_points(),&[0x105,0x261,0x109,0x200]);
    let expanded = decompress_text(&packed,&LEGACY_OPTIONS).expect("expansion failed");
    assert_eq!(expanded,"aaaaaaaaaa");
}

#[test]
fn multibyte_text() {
    let test_data = "שלום עולם, שלום עולם, שלום עולם! Grüße, Grüße. 日本語 日本語";
    let out = compress_slice(test_data.as_bytes(),false,&STD_OPTIONS).expect("compression failed");
    let expanded = decompress_slice(&out,&STD_OPTIONS).expect("expansion failed");
    assert_eq!(test_data.as_bytes().to_vec(),expanded);
}

#[test]
fn html_is_minified() {
    let test_data = "<div>\n  <!-- note -->\n  <p> hello </p>\n</div>\n";
    let out = compress_slice(test_data.as_bytes(),true,&STD_OPTIONS).expect("compression failed");
    let expanded = decompress_slice(&out,&STD_OPTIONS).expect("expansion failed");
    assert_eq!(String::from_utf8(expanded).unwrap(),"<div><p> hello </p></div> ");
}

#[test]
fn binary_input_rejected() {
    match compress_slice(&[0x66,0xff,0xfe,0x00],false,&STD_OPTIONS) {
        Ok(_) => panic!("binary input was accepted"),
        Err(e) => assert!(e.to_string().starts_with("unsupported input"))
    }
}
