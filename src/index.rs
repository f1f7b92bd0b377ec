//! The PRG index: the linear PRG with its FM-index, coverage graph, and masks.
//!
//! [`PrgIndex`] ties together everything read mapping needs: the normalised PRG, the
//! FM-index over it, the coverage graph decoded from it, and the per-position site and
//! allele masks the search engine resolves alleles with.
//!
//! # Examples
//!
//! ```
//! use vbwt::prg::PrgString;
//! use vbwt::index::PrgIndex;
//! use vbwt::kmer_index::KmerIndex;
//! use vbwt::support::{self, VariantLocus};
//!
//! let prg = PrgString::from_ascii("gcgct5c6g6t6agtcct").unwrap();
//! let mut index = PrgIndex::from_prg(prg).unwrap();
//! let kmers = KmerIndex::build(&index, 4, 6);
//!
//! // The read takes the third allele of the site.
//! let read = support::encode_bases(b"cttagt").unwrap();
//! let states = index.map_read(&read, &kmers);
//! assert_eq!(states.len(), 1);
//! assert_eq!(states[0].traversed_path, vec![VariantLocus::new(5, 3)]);
//!
//! // Recording coverage increments the single base of that allele.
//! index.record_coverage(&states, read.len());
//! let access = *index.graph().access(10);
//! assert_eq!(index.graph().node(access.node).coverage(), &[1]);
//! ```

use crate::coverage;
use crate::fm_index::FmIndex;
use crate::graph::CoverageGraph;
use crate::kmer_index::KmerIndex;
use crate::prg::PrgString;
use crate::search::{self, SearchState};

use simple_sds::int_vector::IntVector;
use simple_sds::ops::Access;

#[cfg(test)]
mod tests;

//-----------------------------------------------------------------------------

/// A linear PRG indexed for read mapping.
///
/// The FM-index and the coverage graph are built over the same normalised PRG.
/// The graph topology is immutable; per-node coverage is updated through
/// [`PrgIndex::record_coverage`].
#[derive(Clone, Debug, PartialEq)]
pub struct PrgIndex {
    prg: PrgString,
    fm: FmIndex,
    graph: CoverageGraph,
    sites_mask: IntVector,
    allele_mask: IntVector,
}

impl PrgIndex {
    /// Builds the index for the given PRG.
    ///
    /// Returns an error if the coverage graph cannot be built.
    pub fn from_prg(prg: PrgString) -> Result<PrgIndex, String> {
        let graph = CoverageGraph::from_prg(&prg)?;
        let fm = FmIndex::from(&prg);
        let (sites_mask, allele_mask) = prg.masks();
        Ok(PrgIndex {
            prg: prg,
            fm: fm,
            graph: graph,
            sites_mask: sites_mask,
            allele_mask: allele_mask,
        })
    }

    /// Returns the linear PRG.
    #[inline]
    pub fn prg(&self) -> &PrgString {
        &self.prg
    }

    /// Returns the FM-index.
    #[inline]
    pub fn fm(&self) -> &FmIndex {
        &self.fm
    }

    /// Returns the coverage graph.
    #[inline]
    pub fn graph(&self) -> &CoverageGraph {
        &self.graph
    }

    /// Returns the largest marker value in the PRG.
    #[inline]
    pub fn max_marker(&self) -> usize {
        self.prg.max_marker()
    }

    /// Returns the PRG index where the site of the given marker ends.
    #[inline]
    pub fn end_of(&self, marker: usize) -> Option<usize> {
        self.prg.end_of(marker)
    }

    /// Returns the site marker enclosing the given PRG position, or `0`.
    #[inline]
    pub fn sites_mask_at(&self, pos: usize) -> usize {
        self.sites_mask.get(pos) as usize
    }

    /// Returns the 1-based allele identifier enclosing the given PRG position, or `0`.
    #[inline]
    pub fn allele_mask_at(&self, pos: usize) -> usize {
        self.allele_mask.get(pos) as usize
    }

    /// Maps a read with the vBWT engine, seeding the search from the k-mer index.
    ///
    /// Returns the surviving search states; a read that fails to map yields an empty
    /// vector.
    pub fn map_read(&self, read: &[u8], kmer_index: &KmerIndex) -> Vec<SearchState> {
        search::search_read_backwards(read, kmer_index, self)
    }

    /// Records the per-base coverage of one read's matched search states.
    pub fn record_coverage(&mut self, states: &[SearchState], read_length: usize) {
        coverage::record_coverage(&mut self.graph, &self.fm, states, read_length);
    }
}

//-----------------------------------------------------------------------------
