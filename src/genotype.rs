//! The surface shared with the genotyping stage.
//!
//! The mapping core does not compute genotype likelihoods. It only exposes, per variant
//! site, the alleles with their per-base coverage and a record the genotyping model
//! fills in. Site kinds are a tagged enum rather than a class hierarchy, so the model
//! specific extras live in the variant and the hot path stays free of dynamic dispatch.

use crate::graph::CoverageGraph;

#[cfg(test)]
mod tests;

//-----------------------------------------------------------------------------

/// One allele of a genotyped site.
#[derive(Clone, Debug, PartialEq)]
pub struct Allele {
    /// The sequence of the allele in base codes.
    pub sequence: Vec<u8>,
    /// Per-base coverage of the allele.
    pub base_coverage: Vec<u32>,
    /// The haplogroup of the allele: the outgoing edge of the bubble entry it descends from.
    pub haplogroup: usize,
}

/// Indices of the called alleles in a genotype.
pub type GtypedIndices = Vec<usize>;

/// The genotyping information of one site.
///
/// `genotype` is [`None`] for a null call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GtypeInfo {
    /// The alleles considered for the call.
    pub alleles: Vec<Allele>,
    /// The called genotype, or [`None`] for a null call.
    pub genotype: Option<GtypedIndices>,
    /// Mean coverage per considered allele.
    pub allele_covs: Vec<f64>,
    /// Total read coverage on the site.
    pub total_coverage: usize,
    /// Haplogroup of each considered allele.
    pub haplogroups: Vec<usize>,
    /// Names of the filters the site failed.
    pub filters: Vec<String>,
}

/// Model-specific attachment of a genotyped site.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum SiteKind {
    /// A site genotyped level by level in the bubble nesting order.
    Level {
        /// Difference in log likelihood between the most likely and the next most likely genotype.
        gt_conf: f64,
    },
}

/// A genotyped variant site.
#[derive(Clone, Debug, PartialEq)]
pub struct GenotypedSite {
    /// The genotyping information of the site.
    pub info: GtypeInfo,
    /// Position of the site in the PRG.
    pub pos: usize,
    /// Arena index of the site's exit boundary node.
    pub site_end_node: usize,
    /// Number of outgoing edges of the bubble entry.
    pub num_haplogroups: usize,
    /// Model-specific entries.
    pub kind: SiteKind,
}

impl GenotypedSite {
    /// Returns `true` if the site has a null genotype.
    pub fn is_null(&self) -> bool {
        self.info.genotype.is_none()
    }

    /// Replaces the call with a null genotype and clears the model-specific entries.
    pub fn make_null(&mut self) {
        self.info.genotype = None;
        self.info.total_coverage = 0;
        match &mut self.kind {
            SiteKind::Level { gt_conf } => *gt_conf = 0.0,
        }
    }

    /// Marks the site as failing the given filter.
    pub fn set_filter(&mut self, name: &str) {
        if !self.info.filters.iter().any(|filter| filter == name) {
            self.info.filters.push(String::from(name));
        }
    }
}

//-----------------------------------------------------------------------------

/// Extracts the alleles of the bubble with the given entry node.
///
/// Every allele is the concatenation of the sequence nodes on its branch, with its
/// current per-base coverage and the branch rank as its haplogroup. Branches with
/// nested sites contribute only their own sequence nodes.
///
/// # Panics
///
/// Panics if the node is not a bubble entry.
pub fn site_alleles(graph: &CoverageGraph, entry: usize) -> Vec<Allele> {
    let exit = *graph.bubble_map().get(&entry).unwrap_or_else(|| {
        panic!("Node {} is not a bubble entry", entry)
    });
    let entry_node = graph.node(entry);

    let mut result: Vec<Allele> = Vec::with_capacity(entry_node.outdegree());
    for haplogroup in 0..entry_node.outdegree() {
        let mut sequence: Vec<u8> = Vec::new();
        let mut base_coverage: Vec<u32> = Vec::new();
        let mut cur = entry_node.successor(haplogroup);
        while cur != exit {
            if let Some(nested_exit) = graph.bubble_map().get(&cur) {
                cur = graph.node(*nested_exit).successor(0);
                continue;
            }
            let node = graph.node(cur);
            sequence.extend_from_slice(node.sequence());
            base_coverage.extend_from_slice(node.coverage());
            cur = node.successor(0);
        }
        result.push(Allele {
            sequence: sequence,
            base_coverage: base_coverage,
            haplogroup: haplogroup,
        });
    }
    result
}

//-----------------------------------------------------------------------------
