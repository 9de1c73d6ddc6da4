//! LZ77 Match Compression
//!
//! A deliberately simple dictionary coder.  At every position the whole window
//! behind the cursor is searched by brute force, so compression is
//! O(window * match length) per position.  This is fine for the modest inputs we expect.
//!
//! * The longest match wins; among equal matches the smallest distance wins
//! * Only matches longer than `Options::threshold` become references
//! * Tokens are serialized byte aligned, see `TokenFormat`

use crate::{Error,Options,TokenFormat};

const LITERAL_FLAG: u8 = 1;
const REFERENCE_FLAG: u8 = 0;
/// wide fields are u16, the matcher never goes past this
const WIDE_LIMIT: usize = u16::MAX as usize;
/// cap on the up-front reservation when replaying, lengths in the stream are not trusted
const MAX_PREALLOC: usize = 1 << 20;

/// Represents a single token in the compressed stream
#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub enum Token {
    /// A literal byte
    Literal(u8),
    /// A back-reference: copy `length` bytes starting `distance` bytes back
    Reference { length: usize, distance: usize }
}

impl Token {
    /// Number of bytes this token produces when expanded
    pub fn expanded_size(&self) -> usize {
        match self {
            Token::Literal(_) => 1,
            Token::Reference { length, .. } => *length
        }
    }
    /// Number of bytes this token occupies in the serialized stream
    pub fn serialized_size(&self,format: TokenFormat) -> usize {
        match (self,format) {
            (Token::Literal(_),_) => 2,
            (Token::Reference {..},TokenFormat::Legacy) => 3,
            (Token::Reference {..},TokenFormat::Wide) => 5
        }
    }
}

/// Find the longest match for the run starting at `pos`.
/// Returns (length,distance), length is 0 if nothing matches.
fn longest_match(data: &[u8],pos: usize,window: usize,max_match: usize) -> (usize,usize) {
    let max_len = usize::min(max_match,data.len() - pos);
    let mut best_len = 0;
    let mut best_dist = 0;
    for dist in 1..=usize::min(window,pos) {
        let mut len = 0;
        // source may run into the lookahead, that is how runs get encoded
        while len < max_len && data[pos - dist + len] == data[pos + len] {
            len += 1;
        }
        if len > best_len {
            best_len = len;
            best_dist = dist;
            if best_len == max_len {
                // nothing farther back can be strictly longer
                break;
            }
        }
    }
    (best_len,best_dist)
}

/// Scan `data` and produce the token sequence.
/// Window and match length are clamped to what the wide format can hold.
pub fn compress(data: &[u8],opt: &Options) -> Vec<Token> {
    let window = usize::min(opt.window,WIDE_LIMIT);
    let max_match = usize::min(opt.max_match,WIDE_LIMIT);
    if window < opt.window || max_match < opt.max_match {
        log::warn!("window {} and max match {} clamped to {}",opt.window,opt.max_match,WIDE_LIMIT);
    }
    let mut ans = Vec::new();
    let mut pos = 0;
    while pos < data.len() {
        let (length,distance) = longest_match(data,pos,window,max_match);
        if length > opt.threshold {
            log::trace!("reference {} back {} at {}",length,distance,pos);
            ans.push(Token::Reference { length, distance });
            pos += length;
        } else {
            ans.push(Token::Literal(data[pos]));
            pos += 1;
        }
    }
    ans
}

/// Serialize tokens into the byte stream that gets packed
pub fn serialize(tokens: &[Token],format: TokenFormat) -> Vec<u8> {
    let mut ans = Vec::with_capacity(tokens.iter().map(|t| t.serialized_size(format)).sum());
    for tok in tokens {
        match (*tok,format) {
            (Token::Literal(c),_) => {
                ans.push(LITERAL_FLAG);
                ans.push(c);
            },
            (Token::Reference { length, distance },TokenFormat::Legacy) => {
                if length > u8::MAX as usize || distance > u8::MAX as usize {
                    log::warn!("reference ({},{}) truncated by legacy format",length,distance);
                }
                ans.push(REFERENCE_FLAG);
                ans.push((length % 256) as u8);
                ans.push((distance % 256) as u8);
            },
            (Token::Reference { length, distance },TokenFormat::Wide) => {
                ans.push(REFERENCE_FLAG);
                ans.extend_from_slice(&u16::to_be_bytes(length as u16));
                ans.extend_from_slice(&u16::to_be_bytes(distance as u16));
            }
        }
    }
    ans
}

/// Parse a serialized stream back into tokens.
/// Any flag other than 0 is a literal, as in the oldest artifacts.
pub fn deserialize(token_bytes: &[u8],format: TokenFormat) -> Result<Vec<Token>,Error> {
    let mut ans = Vec::new();
    let mut ptr = 0;
    let field_len = match format {
        TokenFormat::Legacy => 1,
        TokenFormat::Wide => 2
    };
    while ptr < token_bytes.len() {
        let flag = token_bytes[ptr];
        let payload = match flag {
            REFERENCE_FLAG => 2 * field_len,
            _ => 1
        };
        if ptr + 1 + payload > token_bytes.len() {
            return Err(Error::CorruptStream {
                offset: ptr,
                reason: "token is cut off".to_string()
            });
        }
        let fields = &token_bytes[ptr+1..ptr+1+payload];
        let tok = match (flag,format) {
            (REFERENCE_FLAG,TokenFormat::Legacy) => Token::Reference {
                length: fields[0] as usize,
                distance: fields[1] as usize
            },
            (REFERENCE_FLAG,TokenFormat::Wide) => Token::Reference {
                length: u16::from_be_bytes([fields[0],fields[1]]) as usize,
                distance: u16::from_be_bytes([fields[2],fields[3]]) as usize
            },
            _ => Token::Literal(fields[0])
        };
        ans.push(tok);
        ptr += 1 + payload;
    }
    Ok(ans)
}

/// Replay tokens to reconstruct the original bytes.
/// References are copied one byte at a time so that overlapping copies repeat the pattern.
pub fn replay(tokens: &[Token]) -> Result<Vec<u8>,Error> {
    let expected: usize = tokens.iter().map(|t| t.expanded_size()).sum();
    let mut ans: Vec<u8> = Vec::with_capacity(usize::min(expected,MAX_PREALLOC));
    for (idx,tok) in tokens.iter().enumerate() {
        match *tok {
            Token::Literal(c) => ans.push(c),
            Token::Reference { length, distance } => {
                if distance == 0 || distance > ans.len() {
                    log::error!("reference {} back with only {} bytes of output",distance,ans.len());
                    return Err(Error::CorruptStream {
                        offset: idx,
                        reason: format!("distance {} exceeds available output {}",distance,ans.len())
                    });
                }
                let start = ans.len() - distance;
                for k in 0..length {
                    let c = ans[start + k];
                    ans.push(c);
                }
            }
        }
    }
    Ok(ans)
}

/// Main decompression function, takes the serialized token stream
pub fn decompress(token_bytes: &[u8],format: TokenFormat) -> Result<Vec<u8>,Error> {
    let tokens = deserialize(token_bytes,format)?;
    log::debug!("replaying {} tokens",tokens.len());
    replay(&tokens)
}

// *************** TESTS *****************

#[cfg(test)]
use crate::{STD_OPTIONS,LEGACY_OPTIONS};

#[test]
fn empty_input() {
    assert!(compress(&[],&STD_OPTIONS).is_empty());
    assert!(decompress(&[],TokenFormat::Wide).expect("expansion failed").is_empty());
}

#[test]
fn run_is_one_overlapping_reference() {
    let tokens = compress("aaaaaaaaaa".as_bytes(),&STD_OPTIONS);
    assert_eq!(tokens,vec![
        Token::Literal(b'a'),
        Token::Reference { length: 9, distance: 1 }
    ]);
    assert_eq!(replay(&tokens).expect("expansion failed"),"aaaaaaaaaa".as_bytes());
}

#[test]
fn spelled_out_run_expands() {
    // four literals then a reference, as an older encoder might have written it
    let tokens = vec![
        Token::Literal(b'a'),
        Token::Literal(b'a'),
        Token::Literal(b'a'),
        Token::Literal(b'a'),
        Token::Reference { length: 6, distance: 1 }
    ];
    assert_eq!(replay(&tokens).expect("expansion failed"),"aaaaaaaaaa".as_bytes());
}

#[test]
fn smallest_distance_wins() {
    let tokens = compress("ABCABCABCX".as_bytes(),&STD_OPTIONS);
    assert_eq!(tokens,vec![
        Token::Literal(b'A'),
        Token::Literal(b'B'),
        Token::Literal(b'C'),
        Token::Reference { length: 6, distance: 3 },
        Token::Literal(b'X')
    ]);
    // "abcd" at 10 matches 4 bytes both 5 and 10 back, nearer one is taken
    let tokens = compress("abcdXabcdYabcdZ".as_bytes(),&STD_OPTIONS);
    assert_eq!(tokens[7],Token::Reference { length: 4, distance: 5 });
}

#[test]
fn threshold_is_strict() {
    // "abc" repeats, but a match of 3 is not worth a reference
    let tokens = compress("abcXabcY".as_bytes(),&STD_OPTIONS);
    assert!(tokens.iter().all(|t| matches!(t,Token::Literal(_))));
    // "abcd" repeats, 4 is enough
    let tokens = compress("abcdXabcdY".as_bytes(),&STD_OPTIONS);
    assert_eq!(tokens[5],Token::Reference { length: 4, distance: 5 });
}

#[test]
fn literal_fallback() {
    let test_data = "the quick brown fox".as_bytes();
    let tokens = compress(test_data,&STD_OPTIONS);
    let token_bytes = serialize(&tokens,TokenFormat::Wide);
    assert_eq!(tokens.len(),test_data.len());
    assert_eq!(token_bytes.len(),2 * test_data.len());
}

#[test]
fn match_length_is_capped() {
    let test_data = vec![b'z';600];
    let tokens = compress(&test_data,&STD_OPTIONS);
    assert_eq!(tokens,vec![
        Token::Literal(b'z'),
        Token::Reference { length: 258, distance: 1 },
        Token::Reference { length: 258, distance: 1 },
        Token::Reference { length: 83, distance: 1 }
    ]);
    assert_eq!(replay(&tokens).expect("expansion failed"),test_data);
}

/// xorshift letters, no digits
#[cfg(test)]
fn filler(n: usize) -> Vec<u8> {
    let mut ans = Vec::with_capacity(n);
    let mut state: u32 = 1;
    for _i in 0..n {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        ans.push(b'a' + (state % 26) as u8);
    }
    ans
}

#[test]
fn window_is_respected() {
    let mut test_data = "0123456789".as_bytes().to_vec();
    test_data.extend_from_slice(&filler(3000));
    test_data.extend_from_slice("0123456789".as_bytes());
    let tokens = compress(&test_data,&STD_OPTIONS);
    for tok in &tokens {
        if let Token::Reference { distance, .. } = tok {
            assert!(*distance <= 2048);
        }
    }
    // the digits are too far back to be found
    let tail = &tokens[tokens.len()-10..];
    assert!(tail.iter().all(|t| matches!(t,Token::Literal(_))));
}

#[test]
fn window_edge() {
    // repeat exactly 2048 back is found
    let test_data = ["0123".as_bytes(),&filler(2044),"0123".as_bytes()].concat();
    let tokens = compress(&test_data,&STD_OPTIONS);
    assert_eq!(tokens.last(),Some(&Token::Reference { length: 4, distance: 2048 }));
    // one further is out of reach
    let test_data = ["0123".as_bytes(),&filler(2045),"0123".as_bytes()].concat();
    let tokens = compress(&test_data,&STD_OPTIONS);
    assert_eq!(tokens.last(),Some(&Token::Literal(b'3')));
}

#[test]
fn oversized_options_are_clamped() {
    let opt = Options {
        window: 70000,
        max_match: 70000,
        threshold: 3,
        format: TokenFormat::Wide
    };
    let test_data = vec![b'z';70000];
    let tokens = compress(&test_data,&opt);
    assert_eq!(tokens,vec![
        Token::Literal(b'z'),
        Token::Reference { length: 65535, distance: 1 },
        Token::Reference { length: 4464, distance: 1 }
    ]);
    let token_bytes = serialize(&tokens,TokenFormat::Wide);
    assert_eq!(decompress(&token_bytes,TokenFormat::Wide).expect("expansion failed"),test_data);
}

#[test]
fn far_references_rejected_without_reserving() {
    // every token claims 65535 bytes from 65535 back, with nothing written yet
    let token_bytes = hex::decode("00ffffffff".repeat(200000)).unwrap();
    match decompress(&token_bytes,TokenFormat::Wide) {
        Err(Error::CorruptStream { offset, .. }) => assert_eq!(offset,0),
        _ => panic!("far reference was accepted")
    }
}

#[test]
fn serialized_layout() {
    let tokens = vec![
        Token::Literal(b'a'),
        Token::Reference { length: 9, distance: 1 }
    ];
    assert_eq!(serialize(&tokens,TokenFormat::Legacy),hex::decode("0161000901").unwrap());
    assert_eq!(serialize(&tokens,TokenFormat::Wide),hex::decode("01610000090001").unwrap());
}

#[test]
fn legacy_truncation() {
    let tokens = vec![Token::Reference { length: 258, distance: 300 }];
    assert_eq!(serialize(&tokens,TokenFormat::Legacy),hex::decode("00022c").unwrap());
    let tokens = compress(&vec![b'z';300],&LEGACY_OPTIONS);
    let token_bytes = serialize(&tokens,TokenFormat::Legacy);
    // 258 wraps to 2, so the round trip comes up short
    let expanded = decompress(&token_bytes,TokenFormat::Legacy).expect("expansion failed");
    assert_ne!(expanded.len(),300);
}

#[test]
fn wide_round_trip() {
    let mut test_data = Vec::new();
    for i in 0..40 {
        test_data.extend_from_slice(format!("line {} of the same old song\n",i % 7).as_bytes());
    }
    test_data.extend_from_slice(&vec![b'-';700]);
    let token_bytes = serialize(&compress(&test_data,&STD_OPTIONS),TokenFormat::Wide);
    assert!(token_bytes.len() < test_data.len());
    let expanded = decompress(&token_bytes,TokenFormat::Wide).expect("expansion failed");
    assert_eq!(test_data,expanded);
}

#[test]
fn corrupt_reference() {
    // reference 2 back with only 1 byte of output
    match decompress(&hex::decode("0161000402").unwrap(),TokenFormat::Legacy) {
        Err(Error::CorruptStream { offset, .. }) => assert_eq!(offset,1),
        _ => panic!("corrupt reference was accepted")
    }
    // distance 0
    assert!(decompress(&hex::decode("0161000400").unwrap(),TokenFormat::Legacy).is_err());
}

#[test]
fn cut_off_token() {
    match decompress(&hex::decode("01610000").unwrap(),TokenFormat::Wide) {
        Err(Error::CorruptStream { offset, .. }) => assert_eq!(offset,2),
        _ => panic!("cut off token was accepted")
    }
    assert!(decompress(&hex::decode("01").unwrap(),TokenFormat::Legacy).is_err());
}
