//! Per-base coverage recording over the coverage graph.
//!
//! For every matched search state of a read, a [`Traverser`] walks the coverage graph
//! from the match start, consuming the read length and choosing alleles at bubble
//! entries from the state's traversed path. Instead of incrementing coverage during
//! the walk, the recorder accumulates pending intervals per node and flushes once per
//! read, so mapping instances of one read that cross the same node never double-count.
//!
//! Site-level coverage is recorded separately as grouped allele counts: for every
//! site a read crosses, the set of alleles its states support is counted as a group.

use crate::fm_index::FmIndex;
use crate::formats::JSONValue;
use crate::graph::{CoverageGraph, NodeAccess};
use crate::search::SearchState;
use crate::support::VariantLocus;
use crate::support;

use std::collections::{BTreeMap, BTreeSet};

#[cfg(test)]
mod tests;

//-----------------------------------------------------------------------------

/// A pending coverage increment on one coverage node.
///
/// The interval is 0-based with inclusive ends. Extensions merge overlapping or
/// adjacent intervals; a single read traverses a contiguous path, so a disjoint
/// extension is a programming error.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PendingCovNode {
    start: usize,
    end: usize,
    size: usize,
    full: bool,
}

impl PendingCovNode {
    /// Creates a pending increment for a node of the given size.
    ///
    /// # Panics
    ///
    /// Panics if the interval does not fit in the node.
    pub fn new(start: usize, end: usize, size: usize) -> Self {
        assert!(start <= end && end < size, "PendingCovNode: Interval {}..={} does not fit in a node of size {}", start, end, size);
        PendingCovNode {
            start: start,
            end: end,
            size: size,
            full: start == 0 && end == size - 1,
        }
    }

    /// Merges another interval from the same read into this one.
    ///
    /// # Panics
    ///
    /// Panics if the intervals are disjoint and non-adjacent.
    pub fn extend(&mut self, start: usize, end: usize) {
        assert!(start <= end && end < self.size, "PendingCovNode: Interval {}..={} does not fit in a node of size {}", start, end, self.size);
        if start > self.end + 1 || end + 1 < self.start {
            panic!("Inconsistent coverage node coordinates: {}..={} does not touch {}..={}", start, end, self.start, self.end);
        }
        if start < self.start {
            self.start = start;
        }
        if end > self.end {
            self.end = end;
        }
        if self.start == 0 && self.end == self.size - 1 {
            self.full = true;
        }
    }

    /// Returns the inclusive interval of bases to increment.
    #[inline]
    pub fn coordinates(&self) -> (usize, usize) {
        (self.start, self.end)
    }

    /// Returns `true` if the interval covers the whole node.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.full
    }
}

//-----------------------------------------------------------------------------

/// A walk over the coverage graph for one search state.
///
/// The traverser starts from a random-access point, consumes the read length, and
/// yields every sequence node it visits together with the covered base interval.
/// At a bubble entry it chooses the successor matching the next locus of the path;
/// it stops early when the path is exhausted or the next allele is undetermined,
/// leaving the remaining bases to the genotyping stage.
#[derive(Clone, Debug)]
pub struct Traverser<'a> {
    graph: &'a CoverageGraph,
    node: usize,
    bases_remaining: usize,
    // The traversed loci in read order.
    path: Vec<VariantLocus>,
    path_index: usize,
    start_pos: usize,
    end_pos: usize,
    started: bool,
    done: bool,
    start_offset: usize,
}

impl<'a> Traverser<'a> {
    /// Creates a traverser starting from the given access point.
    pub fn new(graph: &'a CoverageGraph, start: NodeAccess, path: Vec<VariantLocus>, read_size: usize) -> Self {
        Traverser {
            graph: graph,
            node: start.node,
            bases_remaining: read_size,
            path: path,
            path_index: 0,
            start_pos: 0,
            end_pos: 0,
            started: false,
            done: false,
            start_offset: start.offset,
        }
    }

    /// Returns the covered interval in the node returned by the last [`Traverser::next_node`].
    #[inline]
    pub fn coordinates(&self) -> (usize, usize) {
        (self.start_pos, self.end_pos)
    }

    /// Returns the number of read bases not yet attributed to a node.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.bases_remaining
    }

    /// Advances to the next covered node and returns its arena index, or [`None`] when
    /// the traversal has ended.
    pub fn next_node(&mut self) -> Option<usize> {
        if self.done || self.bases_remaining == 0 {
            self.done = true;
            return None;
        }
        if !self.started {
            self.started = true;
            if !self.graph.node(self.node).is_empty() {
                self.consume(self.start_offset);
                return Some(self.node);
            }
        }

        loop {
            if self.bases_remaining == 0 {
                self.done = true;
                return None;
            }
            match self.advance() {
                Some(node) => {
                    self.node = node;
                    if self.graph.node(node).is_empty() {
                        continue;
                    }
                    self.consume(0);
                    return Some(node);
                }
                None => {
                    self.done = true;
                    return None;
                }
            }
        }
    }

    // Consumes bases in the current node from the given offset and sets the coordinates.
    fn consume(&mut self, offset: usize) {
        let node = self.graph.node(self.node);
        let used = (node.len() - offset).min(self.bases_remaining);
        self.start_pos = offset;
        self.end_pos = offset + used - 1;
        self.bases_remaining -= used;
    }

    // Moves past the current node, choosing an allele at a bubble entry.
    fn advance(&mut self) -> Option<usize> {
        let node = self.graph.node(self.node);
        match node.outdegree() {
            0 => None,
            1 => Some(node.successor(0)),
            _ => self.choose_allele(),
        }
    }

    // Chooses the successor of a bubble entry from the next locus of the path.
    fn choose_allele(&mut self) -> Option<usize> {
        if self.path_index >= self.path.len() {
            return None;
        }
        let locus = self.path[self.path_index];
        if locus.is_unknown() {
            return None;
        }
        self.path_index += 1;

        let node = self.graph.node(self.node);
        for i in 0..node.outdegree() {
            let candidate = node.successor(i);
            if self.graph.node(candidate).locus() == locus {
                return Some(candidate);
            }
        }
        // The chosen allele may start with a nested site, in which case the successor
        // is the nested entry and the nested locus is next on the path.
        if self.path_index < self.path.len() {
            let nested = self.path[self.path_index];
            for i in 0..node.outdegree() {
                let candidate = node.successor(i);
                if self.graph.node(candidate).is_boundary() && self.graph.node(candidate).site() == nested.site {
                    return Some(candidate);
                }
            }
        }
        panic!("Traverser: No successor of node {} matches locus ({}, {})", self.node, locus.site, locus.allele);
    }
}

//-----------------------------------------------------------------------------

/// Accumulates the per-base coverage of one read and flushes it once.
///
/// Search states are processed with [`CoverageRecorder::process_state`]; the pending
/// intervals of all states are unioned per node, and [`CoverageRecorder::flush`]
/// increments each covered base by one.
#[derive(Clone, Debug, Default)]
pub struct CoverageRecorder {
    pending: BTreeMap<usize, PendingCovNode>,
    read_length: usize,
}

impl CoverageRecorder {
    /// Creates a recorder for a read of the given length.
    pub fn new(read_length: usize) -> Self {
        CoverageRecorder {
            pending: BTreeMap::new(),
            read_length: read_length,
        }
    }

    /// Traverses the graph for one search state and accumulates its coverage.
    pub fn process_state(&mut self, graph: &CoverageGraph, fm: &FmIndex, state: &SearchState) {
        let start = *graph.access(fm.sa(state.sa_interval.first));
        let path = state.path_in_read_order();
        let mut traverser = Traverser::new(graph, start, path, self.read_length);
        while let Some(node) = traverser.next_node() {
            let (start_pos, end_pos) = traverser.coordinates();
            self.process_node(graph, node, start_pos, end_pos);
        }
    }

    /// Creates or extends the pending interval of one node.
    pub fn process_node(&mut self, graph: &CoverageGraph, node: usize, start: usize, end: usize) {
        match self.pending.get_mut(&node) {
            Some(pending) => pending.extend(start, end),
            None => {
                let size = graph.node(node).len();
                self.pending.insert(node, PendingCovNode::new(start, end, size));
            }
        }
    }

    /// Returns the pending intervals.
    pub fn pending(&self) -> &BTreeMap<usize, PendingCovNode> {
        &self.pending
    }

    /// Increments the coverage of every covered base by one.
    pub fn flush(self, graph: &mut CoverageGraph) {
        for (node, pending) in self.pending {
            if pending.is_full() {
                graph.increment_all(node);
            } else {
                let (start, end) = pending.coordinates();
                graph.increment_coverage(node, start, end);
            }
        }
    }
}

/// Records the per-base coverage of one read's matched search states.
///
/// All states contribute to a shared pending map that is flushed once, so bases
/// covered by several mapping instances are incremented once.
pub fn record_coverage(graph: &mut CoverageGraph, fm: &FmIndex, states: &[SearchState], read_length: usize) {
    let mut recorder = CoverageRecorder::new(read_length);
    for state in states {
        recorder.process_state(graph, fm, state);
    }
    recorder.flush(graph);
}

//-----------------------------------------------------------------------------

/// Read counts per site, grouped by the set of alleles the read is compatible with.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GroupedAlleleCounts {
    sites: Vec<BTreeMap<Vec<usize>, u64>>,
}

impl GroupedAlleleCounts {
    /// Creates empty counts for the given number of sites.
    pub fn new(site_count: usize) -> Self {
        GroupedAlleleCounts {
            sites: vec![BTreeMap::new(); site_count],
        }
    }

    /// Returns the number of sites.
    #[inline]
    pub fn site_count(&self) -> usize {
        self.sites.len()
    }

    /// Returns the groups of the site with the given rank.
    ///
    /// # Panics
    ///
    /// May panic if `rank >= self.site_count()`.
    pub fn site(&self, rank: usize) -> &BTreeMap<Vec<usize>, u64> {
        &self.sites[rank]
    }

    /// Records the allele groups supported by one read's search states.
    pub fn record(&mut self, states: &[SearchState]) {
        let mut per_site: BTreeMap<usize, BTreeSet<usize>> = BTreeMap::new();
        for state in states {
            for locus in state.traversed_path.iter().chain(state.traversing_path.iter()) {
                if !locus.is_unknown() {
                    per_site.entry(locus.site).or_default().insert(locus.allele);
                }
            }
        }
        for (site, alleles) in per_site {
            let group: Vec<usize> = alleles.into_iter().collect();
            *self.sites[support::site_rank(site)].entry(group).or_insert(0) += 1;
        }
    }
}

//-----------------------------------------------------------------------------

/// Extracts the per-base coverage of every allele of every site, in PRG order.
///
/// The coverage of an allele is the concatenated coverage of its own sequence nodes;
/// nested sites within an allele report their coverage under their own site.
pub fn allele_base_counts(graph: &CoverageGraph) -> Vec<Vec<Vec<u32>>> {
    let mut result: Vec<Vec<Vec<u32>>> = Vec::with_capacity(graph.bubble_map().len());
    for (entry, exit) in graph.bubble_map() {
        let entry_node = graph.node(*entry);
        let mut site_counts: Vec<Vec<u32>> = Vec::with_capacity(entry_node.outdegree());
        for i in 0..entry_node.outdegree() {
            let mut counts: Vec<u32> = Vec::new();
            let mut cur = entry_node.successor(i);
            while cur != *exit {
                if let Some(nested_exit) = graph.bubble_map().get(&cur) {
                    cur = graph.node(*nested_exit).successor(0);
                    continue;
                }
                let node = graph.node(cur);
                counts.extend_from_slice(node.coverage());
                cur = node.successor(0);
            }
            site_counts.push(counts);
        }
        result.push(site_counts);
    }
    result
}

/// Builds the JSON coverage dump: an object with per-site grouped allele counts and
/// per-base allele counts.
///
/// This is the only contract the mapping core owes to the external genotyper.
pub fn coverage_json(graph: &CoverageGraph, grouped: &GroupedAlleleCounts) -> JSONValue {
    let mut grouped_json: Vec<JSONValue> = Vec::with_capacity(grouped.site_count());
    for rank in 0..grouped.site_count() {
        let mut site_json: Vec<JSONValue> = Vec::new();
        for (group, count) in grouped.site(rank) {
            let alleles: Vec<JSONValue> = group.iter().map(|allele| JSONValue::Number(*allele)).collect();
            site_json.push(JSONValue::Object(vec![
                (String::from("alleles"), JSONValue::Array(alleles)),
                (String::from("count"), JSONValue::Number(*count as usize)),
            ]));
        }
        grouped_json.push(JSONValue::Array(site_json));
    }

    let mut base_json: Vec<JSONValue> = Vec::new();
    for site_counts in allele_base_counts(graph) {
        let alleles: Vec<JSONValue> = site_counts.iter()
            .map(|counts| JSONValue::Array(counts.iter().map(|value| JSONValue::Number(*value as usize)).collect()))
            .collect();
        base_json.push(JSONValue::Array(alleles));
    }

    JSONValue::Object(vec![
        (String::from("grouped_allele_counts"), JSONValue::Array(grouped_json)),
        (String::from("allele_base_counts"), JSONValue::Array(base_json)),
    ])
}

//-----------------------------------------------------------------------------
