use super::*;

use rand::Rng;

//-----------------------------------------------------------------------------

#[test]
fn base_codec() {
    let bases = [b'A', b'C', b'G', b'T'];
    for (i, base) in bases.iter().enumerate() {
        assert_eq!(encode_base(*base), Some(i + 1), "Invalid encoding for {}", *base as char);
        assert_eq!(encode_base(base.to_ascii_lowercase()), Some(i + 1), "Invalid lower-case encoding for {}", *base as char);
        assert_eq!(decode_base(i + 1), *base, "Invalid decoding for value {}", i + 1);
    }
    assert_eq!(encode_base(b'N'), None, "Encoded an invalid base");
    assert_eq!(encode_base(b'5'), None, "Encoded a digit as a base");
}

#[test]
fn base_strings() {
    let encoded = encode_bases(b"gattaca").unwrap();
    assert_eq!(encoded, vec![3, 1, 4, 4, 1, 2, 1], "Invalid encoding for a DNA string");
    assert!(encode_bases(b"gattnca").is_err(), "Encoded a string with an invalid base");
}

#[test]
fn marker_classification() {
    for value in 1..=4 {
        assert!(is_base(value), "Value {} is not a base", value);
        assert!(!is_marker(value), "Value {} is a marker", value);
    }
    assert!(is_site_marker(5) && !is_allele_marker(5), "Invalid classification for marker 5");
    assert!(is_allele_marker(6) && !is_site_marker(6), "Invalid classification for marker 6");
    assert!(is_site_marker(11), "Invalid classification for marker 11");
    assert!(is_allele_marker(12), "Invalid classification for marker 12");

    assert_eq!(site_marker(9), 9);
    assert_eq!(site_marker(10), 9);
    assert_eq!(allele_marker(9), 10);
    assert_eq!(allele_marker(10), 10);

    assert_eq!(site_rank(5), 0);
    assert_eq!(site_rank(7), 1);
    assert_eq!(site_rank(11), 3);
}

#[test]
fn variant_loci() {
    let locus = VariantLocus::new(7, 2);
    assert!(!locus.is_outside(), "A real locus is outside");
    assert!(!locus.is_unknown(), "A resolved locus is unknown");

    let unknown = VariantLocus::new(7, crate::ALLELE_UNKNOWN);
    assert!(unknown.is_unknown(), "An unresolved locus is not unknown");

    assert!(VariantLocus::outside().is_outside(), "The placeholder locus is not outside");
}

#[test]
fn sa_intervals() {
    let interval = SaInterval::new(3, 3);
    assert_eq!(interval.len(), 1, "Invalid length for a single-row interval");
    assert!(interval.contains(3) && !interval.contains(4), "Invalid containment for a single-row interval");

    let interval = SaInterval::new(2, 6);
    assert_eq!(interval.len(), 5, "Invalid length");
    let rows: Vec<usize> = interval.rows().collect();
    assert_eq!(rows, vec![2, 3, 4, 5, 6], "Invalid row iteration");
}

#[test]
#[should_panic]
fn invalid_sa_interval() {
    let _ = SaInterval::new(4, 3);
}

//-----------------------------------------------------------------------------

#[test]
fn byte_code() {
    let mut encoder = ByteCode::new();
    assert!(encoder.is_empty(), "A new encoder is not empty");
    encoder.write(0);
    encoder.write(127);
    encoder.write(128);
    encoder.write(usize::MAX);

    let mut iter = ByteCodeIter::new(encoder.as_ref());
    assert_eq!(iter.next(), Some(0));
    assert_eq!(iter.next(), Some(127));
    assert_eq!(iter.next(), Some(128));
    assert_eq!(iter.next(), Some(usize::MAX));
    assert_eq!(iter.next(), None, "Got a value past the end of the encoding");
}

#[test]
fn byte_code_random() {
    let mut rng = rand::thread_rng();
    let values: Vec<usize> = (0..1000).map(|_| rng.gen_range(0..usize::MAX)).collect();

    let mut encoder = ByteCode::new();
    for value in values.iter() {
        encoder.write(*value);
    }

    let decoded: Vec<usize> = ByteCodeIter::new(encoder.as_ref()).collect();
    assert_eq!(decoded, values, "Random values did not survive a round trip");
}

#[test]
fn byte_code_raw_bytes() {
    let mut encoder = ByteCode::new();
    encoder.write_byte(3);
    encoder.write(200);
    encoder.write_byte(4);

    let mut iter = ByteCodeIter::new(encoder.as_ref());
    assert_eq!(iter.byte(), Some(3));
    assert_eq!(iter.next(), Some(200));
    assert_eq!(iter.byte(), Some(4));
    assert_eq!(iter.byte(), None);
}

//-----------------------------------------------------------------------------
