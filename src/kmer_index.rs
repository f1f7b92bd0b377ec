//! Precomputed seed states for every k-mer reachable in the PRG.
//!
//! The index amortises the first `k` bases of every read. K-mers are enumerated from
//! the regions around variant sites, expanded over all allele combinations, and each
//! one is searched from scratch with the vBWT engine. The resulting search states are
//! the seeds of read mapping. The k-mer set is sharded and processed in parallel,
//! with each shard owning its part of the output.
//!
//! # Examples
//!
//! ```
//! use vbwt::prg::PrgString;
//! use vbwt::index::PrgIndex;
//! use vbwt::kmer_index::KmerIndex;
//!
//! let prg = PrgString::from_ascii("gct5c6g6t6ag7t8c8cta").unwrap();
//! let index = PrgIndex::from_prg(prg).unwrap();
//! let kmers = KmerIndex::build(&index, 4, 6);
//! assert_eq!(kmers.k(), 4);
//!
//! // TAGT spans both sites; its seed states are precomputed.
//! assert!(kmers.states(&[4, 1, 3, 4]).is_some());
//! ```

use crate::headers::{Header, KmerIndexPayload};
use crate::index::PrgIndex;
use crate::prg::PrgString;
use crate::search::{self, SearchState, VariantSiteState};
use crate::support::{ByteCode, ByteCodeIter, SaInterval, VariantLocus};
use crate::support;

use rayon::prelude::*;

use simple_sds::serialize::Serialize;

use std::collections::{BTreeMap, BTreeSet};
use std::io::{Error, ErrorKind};
use std::io;

#[cfg(test)]
mod tests;

//-----------------------------------------------------------------------------

/// Returns the boundary index ranges `(entry, end)` of all variant sites, in PRG order.
pub fn site_boundary_ranges(prg: &PrgString) -> Vec<(usize, usize)> {
    let mut result: Vec<(usize, usize)> = Vec::new();
    for (pos, value) in prg.ints().iter().enumerate() {
        if support::is_site_marker(*value) {
            result.push((pos, prg.end_of(*value).unwrap()));
        }
    }
    result
}

/// Returns the index range to enumerate k-mers from for every site.
///
/// A region starts at the site entry and extends `max_read_size - 1` positions past
/// the site end, clamped to the PRG. A region that ends inside another site is
/// extended to that site's end, so the expansion never cuts a site open.
pub fn kmer_region_ranges(ranges: &[(usize, usize)], max_read_size: usize, prg_len: usize) -> Vec<(usize, usize)> {
    assert!(max_read_size > 0, "Kmer regions require a positive maximum read size");
    let mut result: Vec<(usize, usize)> = Vec::with_capacity(ranges.len());
    for (start, end) in ranges.iter() {
        let mut limit = (end + max_read_size - 1).min(prg_len - 1);
        loop {
            let enclosing = ranges.iter().find(|(other_start, other_end)| *other_start <= limit && limit < *other_end);
            match enclosing {
                Some((_, other_end)) => limit = (*other_end).min(prg_len - 1),
                None => break,
            }
        }
        result.push((*start, limit));
    }
    result
}

// Expands the PRG range into all concrete sequences, recursing into variant sites.
fn expand_region(prg: &PrgString, start: usize, end: usize) -> Vec<Vec<u8>> {
    let ints = prg.ints();
    let mut seqs: Vec<Vec<u8>> = vec![Vec::new()];
    let mut pos = start;
    while pos <= end {
        let value = ints[pos];
        if support::is_base(value) {
            for seq in seqs.iter_mut() {
                seq.push(value as u8);
            }
            pos += 1;
            continue;
        }

        // A site entry; split `entry..end` into alleles at the top-level allele markers.
        let site_end = prg.end_of(value).unwrap();
        let mut alleles: Vec<Vec<Vec<u8>>> = Vec::new();
        let mut allele_start = pos + 1;
        let mut depth = 0;
        for i in pos + 1..=site_end {
            let inner = ints[i];
            if inner == value + 1 && depth == 0 {
                alleles.push(expand_region(prg, allele_start, i - 1));
                allele_start = i + 1;
            } else if support::is_site_marker(inner) {
                depth += 1;
            } else if support::is_allele_marker(inner) && prg.end_of(inner) == Some(i) {
                depth -= 1;
            }
        }

        let mut next: Vec<Vec<u8>> = Vec::new();
        for seq in seqs.iter() {
            for expansions in alleles.iter() {
                for allele in expansions.iter() {
                    let mut extended = seq.clone();
                    extended.extend_from_slice(allele);
                    next.push(extended);
                }
            }
        }
        seqs = next;
        pos = site_end + 1;
    }
    seqs
}

/// Enumerates all distinct k-mers reachable within the k-mer regions of the PRG,
/// in sorted order.
///
/// A PRG without variant sites is enumerated as a single region.
pub fn enumerate_kmers(prg: &PrgString, k: usize, max_read_size: usize) -> Vec<Vec<u8>> {
    if prg.is_empty() {
        return Vec::new();
    }
    let ranges = site_boundary_ranges(prg);
    let regions = if ranges.is_empty() {
        vec![(0, prg.len() - 1)]
    } else {
        kmer_region_ranges(&ranges, max_read_size, prg.len())
    };

    let mut result: BTreeSet<Vec<u8>> = BTreeSet::new();
    for (start, end) in regions {
        for seq in expand_region(prg, start, end) {
            for window in seq.windows(k) {
                result.insert(window.to_vec());
            }
        }
    }
    result.into_iter().collect()
}

//-----------------------------------------------------------------------------

/// Precomputed seed states for the k-mers reachable in a PRG.
///
/// The index is keyed by the k-mer in base codes. Only k-mers with at least one seed
/// state are stored. The on-disk format starts with a [`Header`] carrying `k`, the
/// maximum read size, and the PRG length as a fingerprint, followed by byte-coded
/// self-delimiting records.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KmerIndex {
    header: Header<KmerIndexPayload>,
    kmers: BTreeMap<Vec<u8>, Vec<SearchState>>,
}

impl KmerIndex {
    /// Builds the k-mer index for the given PRG index.
    ///
    /// The k-mer set is split into shards that are searched in parallel; the shard
    /// outputs are merged in k-mer order, so the result is deterministic.
    ///
    /// # Panics
    ///
    /// Panics if `k == 0` or `max_read_size == 0`.
    pub fn build(index: &PrgIndex, k: usize, max_read_size: usize) -> KmerIndex {
        assert!(k > 0, "KmerIndex: k-mer length must be positive");
        assert!(max_read_size > 0, "KmerIndex: maximum read size must be positive");

        let kmers = enumerate_kmers(index.prg(), k, max_read_size);
        let shard_size = (kmers.len() / (4 * rayon::current_num_threads())).max(1);
        let shards: Vec<Vec<(Vec<u8>, Vec<SearchState>)>> = kmers
            .par_chunks(shard_size)
            .map(|shard| {
                let mut output: Vec<(Vec<u8>, Vec<SearchState>)> = Vec::new();
                for kmer in shard {
                    let (states, _) = search::search_pattern(kmer, index);
                    if !states.is_empty() {
                        output.push((kmer.clone(), states));
                    }
                }
                output
            })
            .collect();

        let mut map: BTreeMap<Vec<u8>, Vec<SearchState>> = BTreeMap::new();
        for shard in shards {
            for (kmer, states) in shard {
                map.insert(kmer, states);
            }
        }

        let mut header = Header::<KmerIndexPayload>::new();
        header.payload_mut().k = k as u32;
        header.payload_mut().max_read_size = max_read_size as u32;
        header.payload_mut().prg_length = index.prg().len() as u64;

        KmerIndex {
            header: header,
            kmers: map,
        }
    }

    /// Returns the k-mer length.
    #[inline]
    pub fn k(&self) -> usize {
        self.header.payload().k as usize
    }

    /// Returns the maximum read size the index was built for.
    #[inline]
    pub fn max_read_size(&self) -> usize {
        self.header.payload().max_read_size as usize
    }

    /// Returns the length of the PRG the index was built from.
    #[inline]
    pub fn prg_length(&self) -> usize {
        self.header.payload().prg_length as usize
    }

    /// Returns the number of stored k-mers.
    #[inline]
    pub fn len(&self) -> usize {
        self.kmers.len()
    }

    /// Returns `true` if the index stores no k-mers.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.kmers.is_empty()
    }

    /// Returns the seed states for the given k-mer, or [`None`] if the k-mer has none.
    pub fn states(&self, kmer: &[u8]) -> Option<&[SearchState]> {
        self.kmers.get(kmer).map(|states| states.as_slice())
    }

    /// Returns `true` if the index was built for the given PRG index.
    ///
    /// Callers should rebuild a loaded index when the fingerprint does not match.
    pub fn is_compatible(&self, index: &PrgIndex) -> bool {
        self.prg_length() == index.prg().len()
    }

    /// Returns an iterator over the stored k-mers and their seed states.
    pub fn iter(&self) -> impl Iterator<Item = (&Vec<u8>, &Vec<SearchState>)> {
        self.kmers.iter()
    }
}

//-----------------------------------------------------------------------------

fn encode_state(encoder: &mut ByteCode, state: &SearchState) {
    encoder.write(state.sa_interval.first);
    encoder.write(state.sa_interval.last - state.sa_interval.first);
    encoder.write(if state.variant_site_state == VariantSiteState::Within { 1 } else { 0 });
    encoder.write(state.traversed_path.len());
    for locus in state.traversed_path.iter() {
        encoder.write(locus.site);
        encoder.write(locus.allele);
    }
    encoder.write(state.traversing_path.len());
    for locus in state.traversing_path.iter() {
        encoder.write(locus.site);
        encoder.write(locus.allele);
    }
}

fn decode_path(iter: &mut ByteCodeIter<'_>) -> Option<Vec<VariantLocus>> {
    let len = iter.next()?;
    let mut result: Vec<VariantLocus> = Vec::with_capacity(len);
    for _ in 0..len {
        let site = iter.next()?;
        let allele = iter.next()?;
        result.push(VariantLocus::new(site, allele));
    }
    Some(result)
}

fn decode_state(iter: &mut ByteCodeIter<'_>) -> Option<SearchState> {
    let first = iter.next()?;
    let length = iter.next()?;
    let within = iter.next()?;
    let traversed = decode_path(iter)?;
    let traversing = decode_path(iter)?;
    Some(SearchState {
        sa_interval: SaInterval::new(first, first + length),
        traversed_path: traversed,
        traversing_path: traversing,
        variant_site_state: if within != 0 { VariantSiteState::Within } else { VariantSiteState::Outside },
    })
}

impl KmerIndex {
    // Byte-codes all records.
    fn encode_records(&self) -> Vec<u8> {
        let mut encoder = ByteCode::new();
        encoder.write(self.kmers.len());
        for (kmer, states) in self.kmers.iter() {
            for base in kmer.iter() {
                encoder.write_byte(*base);
            }
            encoder.write(states.len());
            for state in states.iter() {
                encode_state(&mut encoder, state);
            }
        }
        Vec::from(encoder)
    }
}

impl Serialize for KmerIndex {
    fn serialize_header<T: io::Write>(&self, writer: &mut T) -> io::Result<()> {
        self.header.serialize(writer)
    }

    fn serialize_body<T: io::Write>(&self, writer: &mut T) -> io::Result<()> {
        self.encode_records().serialize(writer)
    }

    fn load<T: io::Read>(reader: &mut T) -> io::Result<Self> {
        let header = Header::<KmerIndexPayload>::load(reader)?;
        if let Err(msg) = header.validate() {
            return Err(Error::new(ErrorKind::InvalidData, msg));
        }

        let bytes = Vec::<u8>::load(reader)?;
        let mut iter = ByteCodeIter::new(&bytes);
        let count = iter.next().ok_or_else(|| Error::new(ErrorKind::InvalidData, "KmerIndex: Missing record count"))?;
        let k = header.payload().k as usize;

        let mut kmers: BTreeMap<Vec<u8>, Vec<SearchState>> = BTreeMap::new();
        for _ in 0..count {
            let mut kmer: Vec<u8> = Vec::with_capacity(k);
            for _ in 0..k {
                let base = iter.byte().ok_or_else(|| Error::new(ErrorKind::InvalidData, "KmerIndex: Truncated k-mer record"))?;
                kmer.push(base);
            }
            let n_states = iter.next().ok_or_else(|| Error::new(ErrorKind::InvalidData, "KmerIndex: Truncated k-mer record"))?;
            let mut states: Vec<SearchState> = Vec::with_capacity(n_states);
            for _ in 0..n_states {
                let state = decode_state(&mut iter)
                    .ok_or_else(|| Error::new(ErrorKind::InvalidData, "KmerIndex: Truncated search state record"))?;
                states.push(state);
            }
            kmers.insert(kmer, states);
        }

        Ok(KmerIndex {
            header: header,
            kmers: kmers,
        })
    }

    fn size_in_elements(&self) -> usize {
        self.header.size_in_elements() + self.encode_records().size_in_elements()
    }
}

//-----------------------------------------------------------------------------
