//! The coverage graph: a DAG of sequence and boundary nodes decoded from a linear PRG.
//!
//! Every variant site becomes a bubble: an entry boundary node with one successor per
//! allele and a matching exit boundary node. Sequence nodes carry per-base coverage
//! counters, which are the only mutable state after construction. Nodes live in an
//! arena owned by the graph and edges are pairs of arena indexes, so the registry of
//! bubbles never forms ownership cycles and the graph is freed in one shot.
//!
//! # Examples
//!
//! ```
//! use vbwt::prg::PrgString;
//! use vbwt::graph::CoverageGraph;
//!
//! let prg = PrgString::from_ascii("gcgct5c6g6t6agtcct").unwrap();
//! let graph = CoverageGraph::from_prg(&prg).unwrap();
//! assert_eq!(graph.node_count(), 9);
//! assert!(!graph.is_nested());
//!
//! // One bubble with three alleles.
//! assert_eq!(graph.bubble_map().len(), 1);
//! let (entry, _) = graph.bubble_map().iter().next().unwrap();
//! assert_eq!(graph.node(*entry).outdegree(), 3);
//!
//! // PRG position 8 is the single base of the second allele.
//! let access = graph.access(8);
//! assert_eq!(graph.node(access.node).sequence(), &[3]);
//! assert_eq!(access.offset, 0);
//!
//! // Empty alleles are rejected. Adjacent markers cannot be written in the flat
//! // ASCII form, so the stream is given as integers.
//! let bad = PrgString::from_ints(vec![4, 5, 2, 6, 1, 6, 6]).unwrap();
//! assert!(CoverageGraph::from_prg(&bad).is_err());
//! ```

use crate::prg::{PrgString, MarkerType};
use crate::support::VariantLocus;

use std::collections::BTreeMap;


//-----------------------------------------------------------------------------

/// A node of the coverage graph.
///
/// Sequence nodes own a non-empty run of bases and a coverage counter per base.
/// Boundary nodes delimit the bubbles of variant sites and own no sequence.
#[derive(Clone, Debug)]
pub struct CoverageNode {
    sequence: Vec<u8>,
    pos: usize,
    locus: VariantLocus,
    boundary: bool,
    successors: Vec<usize>,
    coverage: Vec<u32>,
}

impl CoverageNode {
    fn new(pos: usize, locus: VariantLocus, boundary: bool) -> Self {
        CoverageNode {
            sequence: Vec::new(),
            pos: pos,
            locus: locus,
            boundary: boundary,
            successors: Vec::new(),
            coverage: Vec::new(),
        }
    }

    fn push_base(&mut self, base: u8) {
        self.sequence.push(base);
        self.coverage.push(0);
    }

    /// Returns the sequence of the node as integer base codes.
    #[inline]
    pub fn sequence(&self) -> &[u8] {
        &self.sequence
    }

    /// Returns the length of the sequence.
    #[inline]
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    /// Returns `true` if the node has no sequence.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Returns the absolute PRG position of the node.
    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Returns the variant locus of the node, or the outside placeholder.
    #[inline]
    pub fn locus(&self) -> VariantLocus {
        self.locus
    }

    /// Returns the site marker of the node, or `0` outside of sites.
    #[inline]
    pub fn site(&self) -> usize {
        self.locus.site
    }

    /// Returns the allele identifier of the node, or `0`.
    #[inline]
    pub fn allele(&self) -> usize {
        self.locus.allele
    }

    /// Returns `true` if the node is a site boundary.
    #[inline]
    pub fn is_boundary(&self) -> bool {
        self.boundary
    }

    /// Returns the number of outgoing edges.
    #[inline]
    pub fn outdegree(&self) -> usize {
        self.successors.len()
    }

    /// Returns the successor of the given rank.
    ///
    /// # Panics
    ///
    /// May panic if `i >= self.outdegree()`.
    #[inline]
    pub fn successor(&self, i: usize) -> usize {
        self.successors[i]
    }

    /// Returns the successors of the node.
    #[inline]
    pub fn successors(&self) -> &[usize] {
        &self.successors
    }

    /// Returns the per-base coverage counters.
    #[inline]
    pub fn coverage(&self) -> &[u32] {
        &self.coverage
    }

    // Content equality: everything except the edges.
    fn same_content(&self, other: &CoverageNode) -> bool {
        self.sequence == other.sequence
            && self.pos == other.pos
            && self.locus == other.locus
            && self.boundary == other.boundary
            && self.coverage == other.coverage
    }
}

//-----------------------------------------------------------------------------

/// Random-access record for one PRG position.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct NodeAccess {
    /// Arena index of the node covering the position.
    pub node: usize,
    /// Offset of the position within the node's sequence; `0` for boundary nodes.
    pub offset: usize,
    /// The variant locus this position is a jump target for, or the outside placeholder.
    pub target: VariantLocus,
}

/// A marker targeted by another marker, with the allele taken when the jump crosses a
/// direct deletion.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TargetedMarker {
    /// The targeted marker.
    pub marker: usize,
    /// Allele taken across a direct deletion, or `0`.
    pub direct_deletion_allele: usize,
}

//-----------------------------------------------------------------------------

/// A coverage graph decoded from a normalised linear PRG.
///
/// The topology is immutable after construction; only the per-node coverage counters
/// change, through [`CoverageGraph::increment_coverage`]. Two graphs are equal when
/// their random-access vectors agree node-wise and their parent and target maps agree.
#[derive(Clone, Debug)]
pub struct CoverageGraph {
    nodes: Vec<CoverageNode>,
    root: usize,
    sink: usize,
    bubble_map: BTreeMap<usize, usize>,
    parent_map: BTreeMap<usize, VariantLocus>,
    random_access: Vec<NodeAccess>,
    target_map: BTreeMap<usize, Vec<TargetedMarker>>,
}

impl CoverageGraph {
    /// Builds the coverage graph for the given PRG.
    ///
    /// Returns an error if the PRG contains an empty allele.
    pub fn from_prg(prg: &PrgString) -> Result<CoverageGraph, String> {
        Builder::new(prg).run()
    }

    /// Returns the number of nodes in the arena.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the node with the given arena index.
    ///
    /// # Panics
    ///
    /// May panic if `i >= self.node_count()`.
    #[inline]
    pub fn node(&self, i: usize) -> &CoverageNode {
        &self.nodes[i]
    }

    /// Returns the arena index of the root.
    #[inline]
    pub fn root(&self) -> usize {
        self.root
    }

    /// Returns the arena index of the sink.
    #[inline]
    pub fn sink(&self) -> usize {
        self.sink
    }

    /// Returns the bubble registry: an ordered map from entry nodes to exit nodes.
    #[inline]
    pub fn bubble_map(&self) -> &BTreeMap<usize, usize> {
        &self.bubble_map
    }

    /// Returns the map from nested sites to their parent locus.
    #[inline]
    pub fn parent_map(&self) -> &BTreeMap<usize, VariantLocus> {
        &self.parent_map
    }

    /// Returns `true` if the PRG contains nested sites.
    #[inline]
    pub fn is_nested(&self) -> bool {
        !self.parent_map.is_empty()
    }

    /// Returns the random-access record for the given PRG position.
    ///
    /// # Panics
    ///
    /// May panic if the position is out of bounds.
    #[inline]
    pub fn access(&self, pos: usize) -> &NodeAccess {
        &self.random_access[pos]
    }

    /// Returns the random-access records for all PRG positions.
    #[inline]
    pub fn random_access(&self) -> &[NodeAccess] {
        &self.random_access
    }

    /// Returns the map from markers to the markers they are jump targets for.
    #[inline]
    pub fn target_map(&self) -> &BTreeMap<usize, Vec<TargetedMarker>> {
        &self.target_map
    }

    /// Increments the coverage of the given node by one on every base of the inclusive range.
    ///
    /// # Panics
    ///
    /// Panics if the range does not fit in the node's sequence.
    pub fn increment_coverage(&mut self, node: usize, start: usize, end: usize) {
        let node = &mut self.nodes[node];
        assert!(start <= end && end < node.coverage.len(),
            "CoverageGraph: Coverage range {}..={} does not fit in a node of length {}", start, end, node.coverage.len());
        for value in node.coverage[start..=end].iter_mut() {
            *value += 1;
        }
    }

    /// Increments the coverage of the given node by one on every base.
    pub fn increment_all(&mut self, node: usize) {
        let node = &mut self.nodes[node];
        for value in node.coverage.iter_mut() {
            *value += 1;
        }
    }
}

impl PartialEq for CoverageGraph {
    fn eq(&self, other: &Self) -> bool {
        if self.random_access.len() != other.random_access.len() {
            return false;
        }
        for (a, b) in self.random_access.iter().zip(other.random_access.iter()) {
            if a.offset != b.offset || a.target != b.target {
                return false;
            }
            let (node_a, node_b) = (&self.nodes[a.node], &other.nodes[b.node]);
            if !node_a.same_content(node_b) || node_a.outdegree() != node_b.outdegree() {
                return false;
            }
        }
        self.parent_map == other.parent_map && self.target_map == other.target_map
    }
}

impl Eq for CoverageGraph {}

//-----------------------------------------------------------------------------

// Builds the graph in a single left-to-right pass over the PRG.
struct Builder<'a> {
    prg: &'a PrgString,
    nodes: Vec<CoverageNode>,
    // Arena index of the sequence node under construction, created lazily at its first base.
    cur_node: Option<usize>,
    // Node whose outgoing edge must point to the next node.
    back_wire: usize,
    cur_pos: usize,
    cur_locus: VariantLocus,
    bubble_starts: BTreeMap<usize, usize>,
    bubble_ends: BTreeMap<usize, usize>,
    bubble_map: BTreeMap<usize, usize>,
    parent_map: BTreeMap<usize, VariantLocus>,
    random_access: Vec<NodeAccess>,
    target_map: BTreeMap<usize, Vec<TargetedMarker>>,
}

impl<'a> Builder<'a> {
    fn new(prg: &'a PrgString) -> Self {
        Builder {
            prg: prg,
            nodes: vec![CoverageNode::new(0, VariantLocus::outside(), false)],
            cur_node: None,
            back_wire: 0,
            cur_pos: 0,
            cur_locus: VariantLocus::outside(),
            bubble_starts: BTreeMap::new(),
            bubble_ends: BTreeMap::new(),
            bubble_map: BTreeMap::new(),
            parent_map: BTreeMap::new(),
            random_access: Vec::with_capacity(prg.len()),
            target_map: BTreeMap::new(),
        }
    }

    fn run(mut self) -> Result<CoverageGraph, String> {
        for pos in 0..self.prg.len() {
            let marker_type = self.prg.marker_type(pos);
            match marker_type {
                MarkerType::Sequence => self.add_sequence(self.prg.ints()[pos]),
                MarkerType::SiteEntry => self.enter_site(self.prg.ints()[pos]),
                MarkerType::AlleleEnd => self.end_allele(self.prg.ints()[pos])?,
                MarkerType::SiteEnd => self.exit_site(self.prg.ints()[pos])?,
            }
            self.setup_random_access(marker_type);
        }
        let sink = self.make_sink();
        self.map_targets();

        Ok(CoverageGraph {
            nodes: self.nodes,
            root: 0,
            sink: sink,
            bubble_map: self.bubble_map,
            parent_map: self.parent_map,
            random_access: self.random_access,
            target_map: self.target_map,
        })
    }

    fn push_node(&mut self, node: CoverageNode) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    // Wires the node under construction, if any, between `back_wire` and the target.
    fn wire(&mut self, target: usize) {
        match self.cur_node.take() {
            Some(node) => {
                self.nodes[self.back_wire].successors.push(node);
                self.nodes[node].successors.push(target);
            }
            None => {
                self.nodes[self.back_wire].successors.push(target);
            }
        }
    }

    fn add_sequence(&mut self, value: usize) {
        let node = match self.cur_node {
            Some(node) => node,
            None => {
                let node = self.push_node(CoverageNode::new(self.cur_pos, self.cur_locus, false));
                self.cur_node = Some(node);
                node
            }
        };
        self.nodes[node].push_base(value as u8);
        self.cur_pos += 1;
    }

    fn enter_site(&mut self, marker: usize) {
        let entry = self.push_node(CoverageNode::new(self.cur_pos, VariantLocus::new(marker, 0), true));
        self.wire(entry);
        let exit = self.push_node(CoverageNode::new(self.cur_pos, VariantLocus::new(marker, 0), true));

        self.bubble_map.insert(entry, exit);
        self.bubble_starts.insert(marker, entry);
        self.bubble_ends.insert(marker, exit);

        if !self.cur_locus.is_outside() {
            assert!(!self.parent_map.contains_key(&marker), "Builder: Site {} entered twice", marker);
            self.parent_map.insert(marker, self.cur_locus);
        }
        self.cur_locus = VariantLocus::new(marker, 1);
        self.back_wire = entry;
    }

    fn end_allele(&mut self, marker: usize) -> Result<(), String> {
        let entry = self.reach_allele_end(marker)?;
        self.back_wire = entry;
        self.cur_pos = self.nodes[entry].pos;
        self.cur_locus.allele += 1;
        Ok(())
    }

    fn exit_site(&mut self, marker: usize) -> Result<(), String> {
        let site = marker - 1;
        self.reach_allele_end(marker)?;
        let exit = self.bubble_ends[&site];
        self.cur_locus = self.parent_map.get(&site).copied().unwrap_or_else(VariantLocus::outside);
        self.back_wire = exit;
        // The exit holds the largest allele end position.
        self.cur_pos = self.nodes[exit].pos;
        Ok(())
    }

    // Wires the current allele to the site exit and returns the site entry.
    fn reach_allele_end(&mut self, marker: usize) -> Result<usize, String> {
        let site = marker - 1;
        assert_eq!(self.cur_locus.site, site, "Builder: Allele marker {} inside site {}", marker, self.cur_locus.site);
        let entry = self.bubble_starts[&site];
        if self.cur_node.is_none() && self.back_wire == entry {
            return Err(format!("Empty allele {} in site {}", self.cur_locus.allele, site));
        }

        let exit = self.bubble_ends[&site];
        self.wire(exit);
        if self.nodes[exit].pos < self.cur_pos {
            self.nodes[exit].pos = self.cur_pos;
        }
        Ok(entry)
    }

    fn make_sink(&mut self) -> usize {
        let sink = self.push_node(CoverageNode::new(self.cur_pos + 1, VariantLocus::outside(), false));
        self.wire(sink);
        sink
    }

    fn setup_random_access(&mut self, marker_type: MarkerType) {
        let node = if marker_type == MarkerType::Sequence { self.cur_node.unwrap() } else { self.back_wire };
        let len = self.nodes[node].len();
        let offset = if len <= 1 { 0 } else { len - 1 };
        self.random_access.push(NodeAccess {
            node: node,
            offset: offset,
            target: VariantLocus::outside(),
        });
    }

    // Records, for every marker position preceded by another marker, which marker the
    // position is a jump target for, and gives every sequence position following a
    // marker the locus it starts.
    fn map_targets(&mut self) {
        let mut prev_type = MarkerType::Sequence;
        let mut prev_marker = 0;
        let mut cur_allele = 0;

        for pos in 0..self.prg.len() {
            let cur_marker = self.prg.ints()[pos];
            let cur_type = self.prg.marker_type(pos);
            match cur_type {
                MarkerType::Sequence => {
                    if prev_type != MarkerType::Sequence {
                        self.random_access[pos].target = VariantLocus::new(prev_marker, cur_allele);
                    }
                }
                MarkerType::SiteEntry => {
                    cur_allele = 1;
                    if prev_type != MarkerType::Sequence {
                        self.entry_targets(prev_type, prev_marker, cur_marker);
                    }
                }
                MarkerType::SiteEnd => {
                    if prev_type != MarkerType::Sequence {
                        self.exit_targets(prev_type, prev_marker, cur_marker, cur_allele);
                    }
                    cur_allele = self.parent_map.get(&(cur_marker - 1)).map(|locus| locus.allele).unwrap_or(0);
                }
                MarkerType::AlleleEnd => {
                    if prev_type != MarkerType::Sequence {
                        self.exit_targets(prev_type, prev_marker, cur_marker, cur_allele);
                    }
                    cur_allele += 1;
                }
            }
            prev_marker = cur_marker;
            prev_type = cur_type;
        }
    }

    fn entry_targets(&mut self, prev_type: MarkerType, prev_marker: usize, cur_marker: usize) {
        let inserted = match prev_type {
            // Double entry, or a site end leading straight into the next site.
            MarkerType::SiteEntry | MarkerType::SiteEnd => prev_marker,
            MarkerType::AlleleEnd => prev_marker - 1,
            MarkerType::Sequence => unreachable!(),
        };
        self.target_map.insert(cur_marker, vec![TargetedMarker { marker: inserted, direct_deletion_allele: 0 }]);
    }

    fn exit_targets(&mut self, prev_type: MarkerType, prev_marker: usize, cur_marker: usize, cur_allele: usize) {
        let targeted = match prev_type {
            // Double exit: a nested site ends where an allele of its parent ends.
            MarkerType::SiteEnd => TargetedMarker { marker: prev_marker, direct_deletion_allele: 0 },
            // Direct deletion: the jump targets the site marker and records the allele.
            MarkerType::SiteEntry | MarkerType::AlleleEnd => {
                TargetedMarker { marker: prev_marker - 1, direct_deletion_allele: cur_allele }
            }
            MarkerType::Sequence => unreachable!(),
        };
        self.target_map.entry(cur_marker).or_default().push(targeted);
    }
}

//-----------------------------------------------------------------------------
