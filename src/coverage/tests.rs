use super::*;

use crate::index::PrgIndex;
use crate::prg::PrgString;
use crate::search::SearchState;
use crate::support::SaInterval;

//-----------------------------------------------------------------------------

#[test]
fn pending_intervals_merge() {
    let mut pending = PendingCovNode::new(0, 2, 6);
    assert_eq!(pending.coordinates(), (0, 2));
    assert!(!pending.is_full(), "A partial interval is full");

    // Overlapping and adjacent extensions merge.
    pending.extend(1, 3);
    assert_eq!(pending.coordinates(), (0, 3), "Overlapping extension did not merge");
    pending.extend(4, 5);
    assert_eq!(pending.coordinates(), (0, 5), "Adjacent extension did not merge");
    assert!(pending.is_full(), "An interval covering the node is not full");
}

#[test]
fn pending_full_on_creation() {
    let pending = PendingCovNode::new(0, 0, 1);
    assert!(pending.is_full(), "A single-base node covered entirely is not full");
}

#[test]
#[should_panic]
fn disjoint_extension_panics() {
    let mut pending = PendingCovNode::new(0, 1, 8);
    pending.extend(5, 6);
}

//-----------------------------------------------------------------------------

fn build_index(prg: &str) -> PrgIndex {
    PrgIndex::from_prg(PrgString::from_ascii(prg).unwrap()).unwrap()
}

#[test]
fn traverser_crosses_a_bubble() {
    let index = build_index("gcgct5c6g6t6agtcct");
    let graph = index.graph();

    // Start at position 3 and consume six bases through the third allele.
    let path = vec![VariantLocus::new(5, 3)];
    let mut traverser = Traverser::new(graph, *graph.access(3), path, 6);

    let node = traverser.next_node().unwrap();
    assert_eq!(node, graph.access(0).node, "The walk does not start in the flanking node");
    assert_eq!(traverser.coordinates(), (3, 4), "Invalid coordinates in the flanking node");

    let node = traverser.next_node().unwrap();
    assert_eq!(node, graph.access(10).node, "The walk did not choose the third allele");
    assert_eq!(traverser.coordinates(), (0, 0), "Invalid coordinates in the allele node");

    let node = traverser.next_node().unwrap();
    assert_eq!(node, graph.access(12).node, "The walk did not continue past the exit");
    assert_eq!(traverser.coordinates(), (0, 2), "Invalid coordinates in the trailing node");

    assert_eq!(traverser.next_node(), None, "The walk did not end");
    assert_eq!(traverser.remaining(), 0, "Unconsumed bases after a full walk");
}

#[test]
fn traverser_defers_without_a_path() {
    let index = build_index("gcgct5c6g6t6agtcct");
    let graph = index.graph();

    // No path: the walk stops at the bubble entry.
    let mut traverser = Traverser::new(graph, *graph.access(0), Vec::new(), 10);
    assert_eq!(traverser.next_node(), Some(graph.access(0).node));
    assert_eq!(traverser.coordinates(), (0, 4));
    assert_eq!(traverser.next_node(), None, "The walk continued past the fork without a path");
    assert_eq!(traverser.remaining(), 5, "Invalid number of deferred bases");

    // An undetermined allele defers the same way.
    let path = vec![VariantLocus::new(5, crate::ALLELE_UNKNOWN)];
    let mut traverser = Traverser::new(graph, *graph.access(0), path, 10);
    traverser.next_node();
    assert_eq!(traverser.next_node(), None, "The walk continued past the fork with an undetermined allele");
}

//-----------------------------------------------------------------------------

#[test]
fn shared_nodes_count_once() {
    // Two mapping instances of one read covering the same node.
    let index = build_index("gcgct5c6g6t6agtcct");
    let mut graph = index.graph().clone();
    let tail = graph.access(12).node;

    let mut recorder = CoverageRecorder::new(4);
    recorder.process_node(&graph, tail, 0, 2);
    recorder.process_node(&graph, tail, 1, 3);
    assert_eq!(recorder.pending().len(), 1, "Shared node has several pending intervals");
    assert_eq!(recorder.pending().get(&tail).unwrap().coordinates(), (0, 3), "Invalid merged interval");

    recorder.flush(&mut graph);
    assert_eq!(graph.node(tail).coverage(), &[1, 1, 1, 1, 0, 0], "Shared bases were incremented more than once");
}

#[test]
fn record_coverage_for_one_state() {
    let mut index = build_index("gcgct5c6g6t6agtcct");
    // A state matching at position 3 through the third allele.
    let mut state = SearchState::with_interval(SaInterval::new(5, 5));
    state.traversed_path.push(VariantLocus::new(5, 3));
    assert_eq!(index.fm().sa(5), 3, "The test state does not match at position 3");

    index.record_coverage(&[state], 6);
    let graph = index.graph();
    assert_eq!(graph.node(graph.access(0).node).coverage(), &[0, 0, 0, 1, 1], "Invalid coverage in the left flank");
    assert_eq!(graph.node(graph.access(10).node).coverage(), &[1], "Invalid coverage on the allele");
    assert_eq!(graph.node(graph.access(12).node).coverage(), &[1, 1, 1, 0, 0, 0], "Invalid coverage in the right flank");
    assert_eq!(graph.node(graph.access(6).node).coverage(), &[0], "Coverage on an allele the read did not take");
}

#[test]
fn conservation_with_a_multi_row_state() {
    // A read matching twice inside one allele is a single mapping instance;
    // recording credits the read length once, anchored at the first row.
    let mut index = build_index("t5c6gcttagtacgcttagt6aa");
    let kmers = crate::kmer_index::KmerIndex::build(&index, 4, 6);
    let read = crate::support::encode_bases(b"cttagt").unwrap();

    let states = index.map_read(&read, &kmers);
    assert_eq!(states.len(), 1, "Invalid number of states");
    assert_eq!(states[0].sa_interval.len(), 2, "Invalid number of occurrences");

    // The first row of the interval is the occurrence at position 5: its suffix
    // continues with a base, which sorts before the marker after the occurrence
    // at position 14.
    assert_eq!(index.fm().sa(states[0].sa_interval.first), 5, "Invalid anchor row");

    index.record_coverage(&states, read.len());
    let graph = index.graph();
    let allele = graph.access(5).node;
    assert_eq!(
        graph.node(allele).coverage(),
        &[0, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0],
        "Invalid coverage on the allele"
    );
    let total: usize = (0..graph.node_count())
        .map(|i| graph.node(i).coverage().iter().map(|value| *value as usize).sum::<usize>())
        .sum();
    assert_eq!(total, read.len(), "Coverage is not conserved for a multi-row state");
}

//-----------------------------------------------------------------------------

#[test]
fn grouped_allele_counts() {
    let mut grouped = GroupedAlleleCounts::new(2);

    // One read crossing both sites.
    let mut state = SearchState::with_interval(SaInterval::new(0, 0));
    state.traversed_path.push(VariantLocus::new(7, 1));
    state.traversed_path.push(VariantLocus::new(5, 3));
    grouped.record(&[state.clone()]);
    assert_eq!(grouped.site(0).get(&vec![3]), Some(&1), "Invalid group for site 5");
    assert_eq!(grouped.site(1).get(&vec![1]), Some(&1), "Invalid group for site 7");

    // A read compatible with two alleles of site 5.
    let mut second = SearchState::with_interval(SaInterval::new(0, 0));
    second.traversed_path.push(VariantLocus::new(5, 2));
    grouped.record(&[state, second]);
    assert_eq!(grouped.site(0).get(&vec![2, 3]), Some(&1), "Alleles of one read were not grouped");
    assert_eq!(grouped.site(1).get(&vec![1]), Some(&2), "Invalid count after the second read");
}

#[test]
fn grouped_counts_skip_unknown_alleles() {
    let mut grouped = GroupedAlleleCounts::new(1);
    let mut state = SearchState::with_interval(SaInterval::new(0, 0));
    state.traversing_path.push(VariantLocus::new(5, crate::ALLELE_UNKNOWN));
    grouped.record(&[state]);
    assert!(grouped.site(0).is_empty(), "An undetermined allele was counted");
}

//-----------------------------------------------------------------------------

#[test]
fn base_counts_and_json() {
    let index = build_index("gcgct5c6g6t6agtcct");
    let counts = allele_base_counts(index.graph());
    assert_eq!(counts, vec![vec![vec![0], vec![0], vec![0]]], "Invalid base counts for an unmapped graph");

    let grouped = GroupedAlleleCounts::new(index.prg().site_count());
    let json = coverage_json(index.graph(), &grouped).to_string();
    assert!(json.contains("\"grouped_allele_counts\""), "Missing grouped allele counts in the dump");
    assert!(json.contains("\"allele_base_counts\""), "Missing base counts in the dump");
}

#[test]
fn base_counts_skip_nested_bubbles() {
    let index = build_index("t5c6g7a8c8g6t");
    let counts = allele_base_counts(index.graph());
    // Site 5: the second allele owns G G around the nested site; site 7: A and C.
    assert_eq!(counts.len(), 2, "Invalid number of sites");
    assert_eq!(counts[0], vec![vec![0], vec![0, 0]], "Invalid shape for the outer site");
    assert_eq!(counts[1], vec![vec![0], vec![0]], "Invalid shape for the nested site");
}

//-----------------------------------------------------------------------------
