use super::*;

use crate::support::{self, VariantLocus};

//-----------------------------------------------------------------------------

fn build_index(prg: &str) -> PrgIndex {
    PrgIndex::from_prg(PrgString::from_ascii(prg).unwrap()).unwrap()
}

fn coverage_sum(graph: &CoverageGraph) -> usize {
    let mut result = 0;
    for i in 0..graph.node_count() {
        result += graph.node(i).coverage().iter().map(|value| *value as usize).sum::<usize>();
    }
    result
}

fn map_and_record(index: &mut PrgIndex, kmers: &KmerIndex, read: &[u8]) -> Vec<SearchState> {
    let read = support::encode_bases(read).unwrap();
    let states = index.map_read(&read, kmers);
    index.record_coverage(&states, read.len());
    states
}

//-----------------------------------------------------------------------------

#[test]
fn masks() {
    let index = build_index("gcgct5c6g6t6agtcct");
    assert_eq!(index.sites_mask_at(6), 5);
    assert_eq!(index.allele_mask_at(6), 1);
    assert_eq!(index.allele_mask_at(10), 3);
    assert_eq!(index.sites_mask_at(0), 0);
    assert_eq!(index.max_marker(), 6);
    assert_eq!(index.end_of(5), Some(11));
}

#[test]
fn single_site_read() {
    let mut index = build_index("gcgct5c6g6t6agtcct");
    let kmers = KmerIndex::build(&index, 4, 6);

    let states = map_and_record(&mut index, &kmers, b"cttagt");
    assert_eq!(states.len(), 1, "Invalid number of states");
    assert_eq!(states[0].traversed_path, vec![VariantLocus::new(5, 3)], "Invalid traversed path");

    let graph = index.graph();
    assert_eq!(graph.node(graph.access(0).node).coverage(), &[0, 0, 0, 1, 1], "Invalid left flank coverage");
    assert_eq!(graph.node(graph.access(10).node).coverage(), &[1], "Invalid allele coverage");
    assert_eq!(graph.node(graph.access(12).node).coverage(), &[1, 1, 1, 0, 0, 0], "Invalid right flank coverage");

    // Every base of the read is attributed exactly once.
    assert_eq!(coverage_sum(graph), 6, "Coverage is not conserved");
}

#[test]
fn two_site_read() {
    let mut index = build_index("gct5c6g6t6ag7t8c8cta");
    let kmers = KmerIndex::build(&index, 4, 6);

    let states = map_and_record(&mut index, &kmers, b"cttagt");
    assert_eq!(states.len(), 1);
    let expected = vec![VariantLocus::new(7, 1), VariantLocus::new(5, 3)];
    assert_eq!(states[0].traversed_path, expected, "Invalid traversed path");
    assert_eq!(coverage_sum(index.graph()), 6, "Coverage is not conserved");
}

#[test]
fn coverage_is_conserved_over_reads() {
    let mut index = build_index("gct5c6g6t6ag7t8c8cta");
    let kmers = KmerIndex::build(&index, 4, 6);

    map_and_record(&mut index, &kmers, b"cttagt");
    map_and_record(&mut index, &kmers, b"ctcagt");
    assert_eq!(coverage_sum(index.graph()), 12, "Coverage is not conserved over two reads");

    let counts = crate::coverage::allele_base_counts(index.graph());
    assert_eq!(counts[0], vec![vec![1], vec![0], vec![1]], "Invalid base counts for site 5");
    assert_eq!(counts[1], vec![vec![2], vec![0]], "Invalid base counts for site 7");
}

#[test]
fn coverage_is_commutative() {
    let reads: [&[u8]; 2] = [b"cttagt", b"ctcagt"];

    let mut forward = build_index("gct5c6g6t6ag7t8c8cta");
    let kmers = KmerIndex::build(&forward, 4, 6);
    let mut backward = forward.clone();

    for read in reads.iter() {
        map_and_record(&mut forward, &kmers, read);
    }
    for read in reads.iter().rev() {
        map_and_record(&mut backward, &kmers, read);
    }
    assert_eq!(forward.graph(), backward.graph(), "Coverage depends on the order of the reads");
}

#[test]
fn encapsulated_read() {
    let mut index = build_index("t5c6gcttagt6aa");
    let kmers = KmerIndex::build(&index, 4, 6);

    let states = map_and_record(&mut index, &kmers, b"cttagt");
    assert_eq!(states.len(), 1);
    assert_eq!(states[0].traversed_path, vec![VariantLocus::new(5, 2)], "Invalid resolved locus");

    // All six bases land inside the second allele.
    let allele = index.graph().access(5).node;
    assert_eq!(index.graph().node(allele).coverage(), &[0, 1, 1, 1, 1, 1, 1], "Invalid coverage inside the allele");
    assert_eq!(coverage_sum(index.graph()), 6, "Coverage is not conserved");
}

#[test]
fn coverage_dump() {
    let mut index = build_index("gct5c6g6t6ag7t8c8cta");
    let kmers = KmerIndex::build(&index, 4, 6);
    let mut grouped = crate::coverage::GroupedAlleleCounts::new(index.prg().site_count());

    for read in [b"cttagt".as_slice(), b"ctcagt".as_slice()] {
        let states = map_and_record(&mut index, &kmers, read);
        grouped.record(&states);
    }

    assert_eq!(grouped.site(0).get(&vec![1]), Some(&1));
    assert_eq!(grouped.site(0).get(&vec![3]), Some(&1));
    assert_eq!(grouped.site(1).get(&vec![1]), Some(&2));

    let json = crate::coverage::coverage_json(index.graph(), &grouped).to_string();
    assert!(json.contains("\"grouped_allele_counts\""), "Missing grouped counts in the dump");
    assert!(json.contains("\"allele_base_counts\""), "Missing base counts in the dump");
}

//-----------------------------------------------------------------------------
