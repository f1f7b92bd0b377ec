use super::*;

use simple_sds::serialize;

use std::fs;

//-----------------------------------------------------------------------------

fn build_index(prg: &str) -> PrgIndex {
    PrgIndex::from_prg(PrgString::from_ascii(prg).unwrap()).unwrap()
}

//-----------------------------------------------------------------------------

#[test]
fn boundary_ranges() {
    let prg = PrgString::from_ascii("aca5g6c6tt7a8c8gg").unwrap();
    assert_eq!(site_boundary_ranges(&prg), vec![(3, 7), (10, 14)], "Invalid ranges with two sites");

    let prg = PrgString::from_ascii("acagctt7a8c8gg").unwrap();
    assert_eq!(site_boundary_ranges(&prg), vec![(7, 11)], "Invalid ranges with one site");

    let prg = PrgString::from_ascii("acagcttagg").unwrap();
    assert!(site_boundary_ranges(&prg).is_empty(), "Found ranges without sites");
}

#[test]
fn region_ranges() {
    // A site close to the start.
    let prg = PrgString::from_ascii("t7a8c8acagctt").unwrap();
    let ranges = site_boundary_ranges(&prg);
    assert_eq!(kmer_region_ranges(&ranges, 5, prg.len()), vec![(1, 9)], "Invalid region for a site close to the start");

    // A large read size clamps to the PRG.
    let prg = PrgString::from_ascii("cagcttt7a8c8acg").unwrap();
    let ranges = site_boundary_ranges(&prg);
    assert_eq!(kmer_region_ranges(&ranges, 150, prg.len()), vec![(7, 14)], "Invalid region for a site close to the end");

    // A region ending inside another site extends to that site's end.
    let prg = PrgString::from_ascii("tt5a6c6a7aa8cc8t").unwrap();
    let ranges = site_boundary_ranges(&prg);
    assert_eq!(kmer_region_ranges(&ranges, 4, prg.len()), vec![(2, 14), (8, 15)], "Overlapping regions were not extended");

    // With a read size of one, the region is the site itself.
    let prg = PrgString::from_ascii("ta5g6a6acgt").unwrap();
    let ranges = site_boundary_ranges(&prg);
    assert_eq!(kmer_region_ranges(&ranges, 1, prg.len()), vec![(2, 6)], "Invalid region for read size one");
}

#[test]
fn kmer_enumeration() {
    let prg = PrgString::from_ascii("gct5c6g6t6ag7t8c8cta").unwrap();
    let kmers = enumerate_kmers(&prg, 4, 6);
    let truth: Vec<Vec<u8>> = vec![
        vec![2, 1, 3, 2], // CAGC
        vec![2, 1, 3, 4], // CAGT
        vec![2, 2, 4, 1], // CCTA
        vec![3, 1, 3, 2], // GAGC
        vec![3, 1, 3, 4], // GAGT
        vec![4, 1, 3, 2], // TAGC
        vec![4, 1, 3, 4], // TAGT
        vec![4, 2, 4, 1], // TCTA
    ];
    assert_eq!(kmers, truth, "Invalid enumerated k-mers");
}

#[test]
fn enumeration_without_sites() {
    let prg = PrgString::from_ascii("gattaca").unwrap();
    let kmers = enumerate_kmers(&prg, 3, 10);
    let truth: Vec<Vec<u8>> = vec![
        vec![1, 2, 1], // ACA
        vec![1, 4, 4], // ATT
        vec![3, 1, 4], // GAT
        vec![4, 1, 2], // TAC
        vec![4, 4, 1], // TTA
    ];
    assert_eq!(kmers, truth, "Invalid k-mers for a PRG without sites");
}

//-----------------------------------------------------------------------------

#[test]
fn build_and_query() {
    let index = build_index("gct5c6g6t6ag7t8c8cta");
    let kmers = KmerIndex::build(&index, 4, 6);
    assert_eq!(kmers.k(), 4);
    assert_eq!(kmers.max_read_size(), 6);
    assert_eq!(kmers.prg_length(), index.prg().len());
    assert!(kmers.is_compatible(&index), "The index is not compatible with its own PRG");

    // All enumerated k-mers are reachable in this PRG.
    assert_eq!(kmers.len(), 8, "Invalid number of stored k-mers");
    let states = kmers.states(&[4, 1, 3, 4]).unwrap();
    assert!(!states.is_empty(), "No seed states for TAGT");
    assert!(kmers.states(&[1, 1, 1, 1]).is_none(), "Found seed states for an unreachable k-mer");
}

#[test]
fn fingerprint_mismatch() {
    let index = build_index("gct5c6g6t6ag7t8c8cta");
    let kmers = KmerIndex::build(&index, 4, 6);
    let other = build_index("gcgct5c6g6t6agtcct");
    assert!(!kmers.is_compatible(&other), "An index built for another PRG is compatible");
}

#[test]
fn serialize_kmer_index() {
    let index = build_index("gct5c6g6t6ag7t8c8cta");
    let kmers = KmerIndex::build(&index, 4, 6);
    serialize::test(&kmers, "kmer-index", None, true);
}

#[test]
fn corrupted_file() {
    let filename = serialize::temp_file_name("kmer-index");
    fs::write(&filename, b"not a kmer index").unwrap();
    let result: io::Result<KmerIndex> = serialize::load_from(&filename);
    assert!(result.is_err(), "Loaded a corrupted k-mer index");
    fs::remove_file(&filename).unwrap();
}

//-----------------------------------------------------------------------------
