//! # vBWT: read mapping over a variation-aware Burrows-Wheeler transform
//!
//! This library maps sequencing reads to a linearised population reference graph (PRG)
//! and records per-base coverage over the graph for downstream genotyping.
//! It is based on the [Simple-SDS](https://github.com/jltsiren/simple-sds) library.
//!
//! The PRG encodes arbitrarily nested variation sites as an integer stream; the
//! backward search of an FM-index over that stream is extended to recognise the
//! variant markers, fork at site boundaries, and track the path of variant loci each
//! mapping instance traverses.
//!
//! # References
//!
//! ### vBWT
//!
//! Sorina Maciuca, Carlos del Ojo Elias, Gil McVean, and Zamin Iqbal:
//! **A natural encoding of genetic variation in a Burrows-Wheeler transform to enable mapping and genome inference**.\
//! Algorithms in Bioinformatics (WABI 2016), LNCS 9838:222-233, 2016.
//! DOI: [10.1007/978-3-319-43681-4_18](https://doi.org/10.1007/978-3-319-43681-4_18)
//!
//! ### Genotyping with nested variation
//!
//! Brice Letcher, Martin Hunt, and Zamin Iqbal:
//! **Gramtools enables multiscale variation analysis with genome graphs**.\
//! Genome Biology 22:259, 2021.
//! DOI: [10.1186/s13059-021-02474-0](https://doi.org/10.1186/s13059-021-02474-0)
//!
//! # Notes
//!
//! * See [Simple-SDS](https://github.com/jltsiren/simple-sds) for assumptions on the environment.
//! * The coverage dump is the only output contract; see [`coverage::coverage_json`].

pub mod coverage;
pub mod fm_index;
pub mod formats;
pub mod genotype;
pub mod graph;
pub mod headers;
pub mod index;
pub mod kmer_index;
pub mod prg;
pub mod search;
pub mod support;

// Shared internal code for the binaries.
#[cfg(feature = "binaries")]
#[doc(hidden)]
pub mod internal;

//-----------------------------------------------------------------------------

pub use crate::index::PrgIndex;
pub use crate::kmer_index::KmerIndex;
pub use crate::prg::{PrgString, Endianness};
pub use crate::search::SearchState;
pub use crate::support::{SaInterval, VariantLocus};

//-----------------------------------------------------------------------------

/// Number of DNA symbols; values `1..=SIGMA_DNA` encode the bases.
pub const SIGMA_DNA: usize = 4;

/// The smallest variant marker value. Odd markers open a site; even markers separate
/// and terminate its alleles.
pub const MIN_MARKER: usize = 5;

/// Allele identifier of a variant locus whose allele has not been determined.
pub const ALLELE_UNKNOWN: usize = 0;

//-----------------------------------------------------------------------------
