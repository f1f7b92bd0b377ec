//! Backward search over a linear PRG with variant-aware marker jumps.
//!
//! The engine extends an ordinary FM-index backward search: before every base
//! extension it scans the BWT symbols within each search state for variant markers.
//! A marker at the end of a site starts a backward traversal of the site with an
//! undetermined allele; a marker at a site entry or between two alleles ends a
//! traversal, resolving the allele from the allele mask. Every jump forks a new
//! search state carrying the path of traversed variant loci.
//!
//! # Examples
//!
//! ```
//! use vbwt::prg::PrgString;
//! use vbwt::index::PrgIndex;
//! use vbwt::search;
//!
//! let prg = PrgString::from_ascii("gcgct5c6g6t6agtcct").unwrap();
//! let index = PrgIndex::from_prg(prg).unwrap();
//!
//! // "CT" occurs twice on the reference path and the variant fork dies out.
//! let (states, _) = search::search_pattern(&[2, 4], &index);
//! assert_eq!(states.len(), 1);
//! assert_eq!(states[0].sa_interval.len(), 2);
//! assert!(states[0].traversed_path.is_empty());
//! ```

use crate::index::PrgIndex;
use crate::kmer_index::KmerIndex;
use crate::support::{SaInterval, VariantLocus};
use crate::support;


//-----------------------------------------------------------------------------

/// Position of a search state relative to variant sites.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum VariantSiteState {
    /// The match does not currently overlap a variant site.
    Outside,
    /// The match has entered a site it has not finished traversing.
    Within,
}

/// A state of backward search in the vBWT.
///
/// The state consists of an inclusive suffix array interval, the path of variant loci
/// the match has fully traversed, and the path of loci it is currently traversing with
/// an undetermined allele. Both paths are stored in reverse read order (the earliest
/// matched locus last); reporting reverses once.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SearchState {
    /// Suffix array interval of the matched suffix.
    pub sa_interval: SaInterval,
    /// Loci fully traversed by the match, in reverse read order.
    pub traversed_path: Vec<VariantLocus>,
    /// Loci entered from their site end and not yet resolved, innermost last.
    pub traversing_path: Vec<VariantLocus>,
    /// Position of the state relative to variant sites.
    pub variant_site_state: VariantSiteState,
}

impl SearchState {
    /// Returns the initial state covering the whole index.
    pub fn init(index: &PrgIndex) -> Self {
        SearchState {
            sa_interval: index.fm().whole_interval(),
            traversed_path: Vec::new(),
            traversing_path: Vec::new(),
            variant_site_state: VariantSiteState::Outside,
        }
    }

    /// Returns a state with the given interval and no traversal history.
    pub fn with_interval(interval: SaInterval) -> Self {
        SearchState {
            sa_interval: interval,
            traversed_path: Vec::new(),
            traversing_path: Vec::new(),
            variant_site_state: VariantSiteState::Outside,
        }
    }

    /// Returns the number of matched occurrences.
    #[inline]
    pub fn len(&self) -> usize {
        self.sa_interval.len()
    }

    /// Returns the traversed path in read order.
    pub fn path_in_read_order(&self) -> Vec<VariantLocus> {
        let mut result = self.traversed_path.clone();
        result.reverse();
        result
    }
}

//-----------------------------------------------------------------------------

// Classifies the marker preceding the suffix at `row` under the reporting convention:
// a site exit is reported as the site (odd) marker with the allele resolved from the
// mask, and a site entry as the allele (even) marker with an undetermined allele.
fn marker_locus(index: &PrgIndex, row: usize, marker: usize) -> VariantLocus {
    let pos = index.fm().sa(row);
    if support::is_site_marker(marker) {
        return VariantLocus::new(marker, index.allele_mask_at(pos));
    }
    if index.end_of(marker) == Some(pos - 1) {
        return VariantLocus::new(marker, crate::ALLELE_UNKNOWN);
    }
    VariantLocus::new(marker - 1, index.allele_mask_at(pos))
}

/// Returns the variant loci whose markers occur immediately to the left of the matches
/// in the state, in ascending suffix array order.
///
/// A locus with a site (odd) marker is a site exit with a resolved allele; a locus with
/// an allele (even) marker is a site entry whose allele is not yet known.
pub fn left_markers_search(state: &SearchState, index: &PrgIndex) -> Vec<VariantLocus> {
    let markers = index.fm().range_markers(state.sa_interval, index.max_marker());
    markers.iter().map(|(row, marker)| marker_locus(index, *row, *marker)).collect()
}

//-----------------------------------------------------------------------------

// A fork that ends a backward traversal through the site entry.
fn exit_jump(state: &SearchState, site: usize, allele: usize, interval: SaInterval) -> SearchState {
    let mut result = state.clone();
    result.sa_interval = interval;
    if let Some(open) = result.traversing_path.last() {
        if open.site == site && open.is_unknown() {
            result.traversing_path.pop();
        }
    }
    result.traversed_path.push(VariantLocus::new(site, allele));
    result.variant_site_state = if result.traversing_path.is_empty() {
        VariantSiteState::Outside
    } else {
        VariantSiteState::Within
    };
    result
}

// A fork that starts a backward traversal from the site end.
fn enter_jump(state: &SearchState, site: usize, interval: SaInterval) -> SearchState {
    let mut result = state.clone();
    result.sa_interval = interval;
    result.traversing_path.push(VariantLocus::new(site, crate::ALLELE_UNKNOWN));
    result.variant_site_state = VariantSiteState::Within;
    result
}

/// Returns the search states forked from the given state by variant marker jumps.
///
/// Jump targets are rescanned, so chains of adjacent markers (a site ending where the
/// next one starts, or nested site ends) cascade within one call. Emissions that would
/// produce an identical state collapse to one, which covers the duplicate shapes
/// arising from consecutive identical markers and direct deletions.
pub fn search_state_vbwt_jumps(state: &SearchState, index: &PrgIndex) -> Vec<SearchState> {
    let mut result: Vec<SearchState> = Vec::new();
    let mut queue: Vec<SearchState> = vec![state.clone()];

    while let Some(current) = queue.pop() {
        for (row, marker) in index.fm().range_markers(current.sa_interval, index.max_marker()) {
            let locus = marker_locus(index, row, marker);
            let forked = if support::is_allele_marker(locus.site) {
                // Entering the site backward through its end; all alleles stay reachable.
                enter_jump(&current, locus.site - 1, index.fm().symbol_range(locus.site).unwrap())
            } else {
                // Exiting backward through the site entry; the odd marker is unique.
                exit_jump(&current, locus.site, locus.allele, index.fm().symbol_range(locus.site).unwrap())
            };
            if !result.contains(&forked) {
                queue.push(forked.clone());
                result.push(forked);
            }
        }
    }
    result
}

//-----------------------------------------------------------------------------

/// Performs one backward step over a set of search states.
///
/// When `jumps_enabled` is set, every state is first forked at the variant markers to
/// its left; all surviving states are then extended by the base, and states whose
/// interval becomes empty are dropped. The second return value tells whether the first
/// state of the input was among the dropped.
pub fn process_read_char(states: Vec<SearchState>, base: u8, index: &PrgIndex, jumps_enabled: bool) -> (Vec<SearchState>, bool) {
    let mut expanded: Vec<SearchState> = Vec::with_capacity(states.len());
    for state in states {
        if jumps_enabled {
            let jumps = search_state_vbwt_jumps(&state, index);
            expanded.push(state);
            expanded.extend(jumps);
        } else {
            expanded.push(state);
        }
    }

    let mut result: Vec<SearchState> = Vec::with_capacity(expanded.len());
    let mut first_dropped = false;
    for (i, mut state) in expanded.into_iter().enumerate() {
        match index.fm().lf(state.sa_interval, base as usize) {
            Some(interval) => {
                state.sa_interval = interval;
                result.push(state);
            }
            None => {
                if i == 0 {
                    first_dropped = true;
                }
            }
        }
    }
    (result, first_dropped)
}

/// Searches for a pattern of base codes from scratch.
///
/// Returns the surviving states and whether the initial whole-index interval was
/// pruned during the search. The latter tells a k-mer prebuild pass that the pattern
/// does not occur on a marker-free path of the PRG.
pub fn search_pattern(pattern: &[u8], index: &PrgIndex) -> (Vec<SearchState>, bool) {
    let mut states = vec![SearchState::init(index)];
    let mut first_pruned = false;
    let mut lineage_alive = true;

    for (i, base) in pattern.iter().rev().enumerate() {
        let (next, first_dropped) = process_read_char(states, *base, index, i > 0);
        if lineage_alive && first_dropped {
            first_pruned = true;
            lineage_alive = false;
        }
        states = next;
        if states.is_empty() {
            break;
        }
    }
    (states, first_pruned)
}

/// Maps a read, seeding the search with the k-mer index.
///
/// The seed is the read's suffix of length `k`; the remaining bases are processed
/// backward with marker jumps enabled. A read that fails to map yields an empty
/// vector, never an error.
pub fn search_read_backwards(read: &[u8], kmer_index: &KmerIndex, index: &PrgIndex) -> Vec<SearchState> {
    let k = kmer_index.k();
    if read.len() < k {
        return Vec::new();
    }
    let mut states = match kmer_index.states(&read[read.len() - k..]) {
        Some(seed) => seed.to_vec(),
        None => return Vec::new(),
    };

    for base in read[..read.len() - k].iter().rev() {
        let (next, _) = process_read_char(states, *base, index, true);
        states = next;
        if states.is_empty() {
            return Vec::new();
        }
    }
    handle_allele_encapsulated_states(states, index)
}

//-----------------------------------------------------------------------------

/// Resolves the variant loci of matches that crossed no markers.
///
/// A state with empty paths may still have matches inside variant sites when the whole
/// match lies within one allele. Such a state keeps its interval as one mapping
/// instance; the locus is resolved from the site and allele masks, which agree across
/// the rows of a non-forked match. States whose matches lie outside sites pass through
/// unchanged.
pub fn handle_allele_encapsulated_states(states: Vec<SearchState>, index: &PrgIndex) -> Vec<SearchState> {
    let mut result: Vec<SearchState> = Vec::new();
    for mut state in states {
        if !state.traversed_path.is_empty() || !state.traversing_path.is_empty() {
            result.push(state);
            continue;
        }
        let resolved = state.sa_interval.rows().find_map(|row| {
            let pos = index.fm().sa(row);
            let site = index.sites_mask_at(pos);
            if site != 0 {
                Some(VariantLocus::new(site, index.allele_mask_at(pos)))
            } else {
                None
            }
        });
        if let Some(locus) = resolved {
            state.traversed_path.push(locus);
            state.variant_site_state = VariantSiteState::Within;
        }
        result.push(state);
    }
    result
}

//-----------------------------------------------------------------------------
