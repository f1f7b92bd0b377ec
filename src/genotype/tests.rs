use super::*;

use crate::index::PrgIndex;
use crate::prg::PrgString;

//-----------------------------------------------------------------------------

fn build_graph(prg: &str) -> CoverageGraph {
    let index = PrgIndex::from_prg(PrgString::from_ascii(prg).unwrap()).unwrap();
    index.graph().clone()
}

#[test]
fn alleles_of_a_flat_site() {
    let graph = build_graph("gcgct5c6g6t6agtcct");
    let (entry, _) = graph.bubble_map().iter().next().map(|(a, b)| (*a, *b)).unwrap();
    let alleles = site_alleles(&graph, entry);

    assert_eq!(alleles.len(), 3, "Invalid number of alleles");
    let sequences: Vec<Vec<u8>> = alleles.iter().map(|allele| allele.sequence.clone()).collect();
    assert_eq!(sequences, vec![vec![2], vec![3], vec![4]], "Invalid allele sequences");
    for (i, allele) in alleles.iter().enumerate() {
        assert_eq!(allele.haplogroup, i, "Invalid haplogroup for allele {}", i);
        assert_eq!(allele.base_coverage.len(), allele.sequence.len(), "Coverage length does not match the sequence");
    }
}

#[test]
fn alleles_skip_nested_sites() {
    let graph = build_graph("t5c6g7a8c8g6t");
    let entries: Vec<usize> = graph.bubble_map().keys().copied().collect();

    // The outer site: the second allele owns only the bases around the nested site.
    let outer = site_alleles(&graph, entries[0]);
    assert_eq!(outer.len(), 2);
    assert_eq!(outer[0].sequence, vec![2], "Invalid first allele of the outer site");
    assert_eq!(outer[1].sequence, vec![3, 3], "The nested site was not skipped");

    let nested = site_alleles(&graph, entries[1]);
    assert_eq!(nested.len(), 2);
    assert_eq!(nested[0].sequence, vec![1]);
    assert_eq!(nested[1].sequence, vec![2]);
}

//-----------------------------------------------------------------------------

fn example_site() -> GenotypedSite {
    GenotypedSite {
        info: GtypeInfo {
            alleles: Vec::new(),
            genotype: Some(vec![1, 1]),
            allele_covs: vec![0.0, 12.5],
            total_coverage: 13,
            haplogroups: vec![0, 1],
            filters: Vec::new(),
        },
        pos: 5,
        site_end_node: 3,
        num_haplogroups: 2,
        kind: SiteKind::Level { gt_conf: 42.0 },
    }
}

#[test]
fn null_genotypes() {
    let mut site = example_site();
    assert!(!site.is_null(), "A called site is null");

    site.make_null();
    assert!(site.is_null(), "A nulled site is not null");
    assert_eq!(site.info.total_coverage, 0, "Nulling did not clear the coverage");
    assert_eq!(site.kind, SiteKind::Level { gt_conf: 0.0 }, "Nulling did not clear the model entries");
}

#[test]
fn filters() {
    let mut site = example_site();
    site.set_filter("AMBIG");
    site.set_filter("AMBIG");
    site.set_filter("LOW_COV");
    assert_eq!(site.info.filters, vec!["AMBIG", "LOW_COV"], "Invalid filter list");
}

//-----------------------------------------------------------------------------
