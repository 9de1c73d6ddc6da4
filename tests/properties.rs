use proptest::prelude::*;
use unicompress::{lz,packing,html,Token,TokenFormat,MAX_PAYLOAD,STD_OPTIONS,LEGACY_OPTIONS};

/// Text drawn from a small alphabet so that matches are common
fn arb_repetitive() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(prop::sample::select(b"ab \n".to_vec()),0..1500)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn pack_round_trip(data in prop::collection::vec(any::<u8>(),0..4096)) {
        let packed = packing::pack(&data).unwrap();
        prop_assert_eq!(packed.len(),1 + (data.len() + 1) / 2);
        prop_assert_eq!(packing::unpack(&packed).unwrap(),data);
    }

    #[test]
    fn stored_form_round_trip(data in prop::collection::vec(any::<u8>(),0..2048)) {
        let packed = packing::pack(&data).unwrap();
        let stored = packed.to_bytes();
        let restored = unicompress::PackedText::from_bytes(&stored).unwrap();
        prop_assert_eq!(packing::unpack(&restored).unwrap(),data);
    }

    #[test]
    fn wide_round_trip(data in prop::collection::vec(any::<u8>(),0..2048)) {
        let token_bytes = lz::serialize(&lz::compress(&data,&STD_OPTIONS),TokenFormat::Wide);
        prop_assert_eq!(lz::decompress(&token_bytes,TokenFormat::Wide).unwrap(),data);
    }

    #[test]
    fn wide_round_trip_repetitive(data in arb_repetitive()) {
        let tokens = lz::compress(&data,&STD_OPTIONS);
        for tok in &tokens {
            if let Token::Reference { length, distance } = tok {
                prop_assert!(*length > 3 && *length <= 258);
                prop_assert!(*distance >= 1 && *distance <= 2048);
            }
        }
        let token_bytes = lz::serialize(&tokens,TokenFormat::Wide);
        prop_assert_eq!(lz::decompress(&token_bytes,TokenFormat::Wide).unwrap(),data);
    }

    #[test]
    fn legacy_round_trip_short(data in prop::collection::vec(prop::sample::select(b"xyz".to_vec()),0..250)) {
        // under 256 bytes every length and distance fits the single byte fields
        let token_bytes = lz::serialize(&lz::compress(&data,&LEGACY_OPTIONS),TokenFormat::Legacy);
        prop_assert_eq!(lz::decompress(&token_bytes,TokenFormat::Legacy).unwrap(),data);
    }

    #[test]
    fn text_round_trip(text in "\\PC{0,400}") {
        let packed = unicompress::compress_text(&text,&STD_OPTIONS).unwrap();
        prop_assert_eq!(unicompress::decompress_text(&packed,&STD_OPTIONS).unwrap(),text);
    }

    #[test]
    fn minify_settles(html in "[<>a-c \t\n]{0,80}") {
        let once = html::minify(&html);
        prop_assert_eq!(html::minify(&once),once);
    }

    #[test]
    fn garbage_never_panics(data in prop::collection::vec(any::<u8>(),0..512)) {
        let _ = lz::decompress(&data,TokenFormat::Legacy);
        let _ = lz::decompress(&data,TokenFormat::Wide);
        if let Ok(packed) = unicompress::PackedText::from_bytes(&data) {
            let _ = packing::unpack(&packed);
        }
    }
}

#[test]
fn pack_limit() {
    assert!(packing::pack(&vec![0u8;MAX_PAYLOAD]).is_ok());
    assert!(packing::pack(&vec![0u8;MAX_PAYLOAD + 1]).is_err());
}
