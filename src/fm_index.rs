//! An FM-index over the integer alphabet of a linear PRG.
//!
//! The index stores the full suffix array and the BWT of the PRG with an implicit
//! terminator, cumulative symbol counts, rank structures for the DNA bases, and a
//! sparse directory of the BWT positions holding variant markers. The directory
//! replaces a general wavelet tree: the only two-dimensional range query the search
//! engine needs is "all marker symbols within a suffix array interval", and markers
//! are rare in the BWT.
//!
//! # Examples
//!
//! ```
//! use vbwt::prg::PrgString;
//! use vbwt::fm_index::FmIndex;
//! use vbwt::support::SaInterval;
//!
//! let prg = PrgString::from_ascii("gcgct5c6g6t6agtcct").unwrap();
//! let fm = FmIndex::from(&prg);
//! assert_eq!(fm.len(), 19);
//!
//! // The site marker 5 has a single suffix array row; the allele marker 6 has three.
//! assert_eq!(fm.symbol_range(5), Some(SaInterval::new(15, 15)));
//! assert_eq!(fm.symbol_range(6), Some(SaInterval::new(16, 18)));
//! assert_eq!(fm.sa(15), 5);
//!
//! // Backward extension: "GT" occurs once in the PRG.
//! let t_rows = fm.symbol_range(4).unwrap();
//! let gt = fm.lf(t_rows, 3).unwrap();
//! assert_eq!(gt.len(), 1);
//! ```

use crate::prg::PrgString;
use crate::support::SaInterval;
use crate::support;

use simple_sds::bit_vector::BitVector;
use simple_sds::int_vector::IntVector;
use simple_sds::ops::{Vector, Access, Push, BitVec, Rank, PredSucc};
use simple_sds::raw_vector::{RawVector, AccessRaw};
use simple_sds::serialize::Serialize;
use simple_sds::sparse_vector::{SparseVector, SparseBuilder};
use simple_sds::bits;

use std::convert::TryFrom;
use std::io::{Error, ErrorKind};
use std::io;


//-----------------------------------------------------------------------------

/// An FM-index over a normalised linear PRG.
///
/// The index must be built over the same normalised PRG as the coverage graph.
/// All intervals are inclusive on both ends; see [`SaInterval`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FmIndex {
    sa: IntVector,
    bwt: IntVector,
    // counts[c] is the number of symbols smaller than c, including the terminator.
    counts: Vec<usize>,
    base_occs: Vec<BitVector>,
    marker_rows: SparseVector,
    marker_symbols: IntVector,
}

impl FmIndex {
    /// Returns the number of suffix array rows (PRG length plus the terminator).
    #[inline]
    pub fn len(&self) -> usize {
        self.sa.len()
    }

    /// Returns `true` if the index is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    /// Returns the length of the indexed PRG.
    #[inline]
    pub fn text_len(&self) -> usize {
        self.len() - 1
    }

    /// Returns the size of the alphabet, including the terminator.
    #[inline]
    pub fn sigma(&self) -> usize {
        self.counts.len() - 1
    }

    /// Returns the interval covering the whole index.
    pub fn whole_interval(&self) -> SaInterval {
        SaInterval::new(0, self.len() - 1)
    }

    /// Returns the text position of the suffix at the given row.
    ///
    /// # Panics
    ///
    /// May panic if `row >= self.len()`.
    #[inline]
    pub fn sa(&self, row: usize) -> usize {
        self.sa.get(row) as usize
    }

    /// Returns the BWT symbol at the given row: the symbol preceding the suffix in the text.
    ///
    /// # Panics
    ///
    /// May panic if `row >= self.len()`.
    #[inline]
    pub fn bwt_symbol(&self, row: usize) -> usize {
        self.bwt.get(row) as usize
    }

    /// Returns the number of occurrences of the given base in the BWT before the given row.
    ///
    /// # Panics
    ///
    /// Panics if the symbol is not a DNA base.
    pub fn rank(&self, base: usize, row: usize) -> usize {
        assert!(support::is_base(base), "FmIndex: Rank is only supported for DNA bases, got {}", base);
        self.base_occs[base - 1].rank(row)
    }

    /// Extends the matches in the interval backward by the given base.
    ///
    /// Returns [`None`] if no matches remain.
    ///
    /// # Panics
    ///
    /// Panics if the symbol is not a DNA base or the interval is out of bounds.
    pub fn lf(&self, interval: SaInterval, base: usize) -> Option<SaInterval> {
        assert!(interval.last < self.len(), "FmIndex: Interval {}..={} is out of bounds", interval.first, interval.last);
        let first = self.counts[base] + self.rank(base, interval.first);
        let last = self.counts[base] + self.rank(base, interval.last + 1);
        if first < last { Some(SaInterval::new(first, last - 1)) } else { None }
    }

    /// Returns the full suffix array run of the given symbol, or [`None`] if the symbol
    /// does not occur in the PRG.
    ///
    /// Because the rows of an FM-index group equal symbols, the run is contiguous.
    pub fn symbol_range(&self, symbol: usize) -> Option<SaInterval> {
        if symbol + 1 >= self.counts.len() {
            return None;
        }
        let first = self.counts[symbol];
        let last = self.counts[symbol + 1];
        if first < last { Some(SaInterval::new(first, last - 1)) } else { None }
    }

    /// Returns all rows of the interval whose BWT symbol is a variant marker no larger
    /// than `max_marker`, with their symbols, in ascending row order.
    pub fn range_markers(&self, interval: SaInterval, max_marker: usize) -> Vec<(usize, usize)> {
        let mut result: Vec<(usize, usize)> = Vec::new();
        let mut iter = self.marker_rows.successor(interval.first);
        while let Some((rank, row)) = iter.next() {
            if row > interval.last {
                break;
            }
            let symbol = self.marker_symbols.get(rank) as usize;
            if symbol <= max_marker {
                result.push((row, symbol));
            }
        }
        result
    }
}

//-----------------------------------------------------------------------------

impl From<&PrgString> for FmIndex {
    fn from(prg: &PrgString) -> Self {
        let text = prg.ints();
        let n = text.len();
        let sigma = prg.max_marker().max(crate::SIGMA_DNA) + 1;

        // Suffix array over the text with an implicit terminator at index n.
        // Suffix comparison sort is adequate at PRG scale and needs no workspace.
        let mut sa_vec: Vec<usize> = (0..=n).collect();
        sa_vec.sort_unstable_by(|a, b| text[*a..].cmp(&text[*b..]));

        let mut bwt_vec: Vec<usize> = Vec::with_capacity(n + 1);
        for pos in sa_vec.iter() {
            bwt_vec.push(if *pos == 0 { 0 } else { text[*pos - 1] });
        }

        let mut counts: Vec<usize> = vec![0; sigma + 1];
        counts[1] = 1; // The terminator.
        for value in text.iter() {
            counts[*value + 1] += 1;
        }
        for c in 1..counts.len() {
            counts[c] += counts[c - 1];
        }

        let mut raw_occs: Vec<RawVector> = (0..crate::SIGMA_DNA).map(|_| RawVector::with_len(n + 1, false)).collect();
        for (row, symbol) in bwt_vec.iter().enumerate() {
            if support::is_base(*symbol) {
                raw_occs[*symbol - 1].set_bit(row, true);
            }
        }
        let mut base_occs: Vec<BitVector> = raw_occs.into_iter().map(BitVector::from).collect();
        for occs in base_occs.iter_mut() {
            occs.enable_rank();
        }

        let marker_count = bwt_vec.iter().filter(|symbol| support::is_marker(**symbol)).count();
        let mut builder = SparseBuilder::new(n + 1, marker_count).unwrap();
        let mut marker_symbols = IntVector::with_capacity(marker_count, bits::bit_len(sigma as u64)).unwrap();
        for (row, symbol) in bwt_vec.iter().enumerate() {
            if support::is_marker(*symbol) {
                unsafe { builder.set_unchecked(row); }
                marker_symbols.push(*symbol as u64);
            }
        }
        let marker_rows = SparseVector::try_from(builder).unwrap();

        let mut sa = IntVector::with_capacity(n + 1, bits::bit_len(n.max(1) as u64)).unwrap();
        sa.extend(sa_vec);
        let mut bwt = IntVector::with_capacity(n + 1, bits::bit_len(sigma as u64)).unwrap();
        bwt.extend(bwt_vec);

        FmIndex {
            sa: sa,
            bwt: bwt,
            counts: counts,
            base_occs: base_occs,
            marker_rows: marker_rows,
            marker_symbols: marker_symbols,
        }
    }
}

//-----------------------------------------------------------------------------

impl Serialize for FmIndex {
    fn serialize_header<T: io::Write>(&self, _: &mut T) -> io::Result<()> {
        Ok(())
    }

    fn serialize_body<T: io::Write>(&self, writer: &mut T) -> io::Result<()> {
        self.sa.serialize(writer)?;
        self.bwt.serialize(writer)?;
        self.counts.serialize(writer)?;
        for occs in self.base_occs.iter() {
            occs.serialize(writer)?;
        }
        self.marker_rows.serialize(writer)?;
        self.marker_symbols.serialize(writer)?;
        Ok(())
    }

    fn load<T: io::Read>(reader: &mut T) -> io::Result<Self> {
        let sa = IntVector::load(reader)?;
        let bwt = IntVector::load(reader)?;
        if sa.len() != bwt.len() {
            return Err(Error::new(ErrorKind::InvalidData, "FmIndex: Suffix array / BWT length mismatch"));
        }

        let counts = Vec::<usize>::load(reader)?;
        if counts.last().copied() != Some(sa.len()) {
            return Err(Error::new(ErrorKind::InvalidData, "FmIndex: Symbol counts do not match the index size"));
        }

        let mut base_occs: Vec<BitVector> = Vec::with_capacity(crate::SIGMA_DNA);
        for _ in 0..crate::SIGMA_DNA {
            let mut occs = BitVector::load(reader)?;
            if occs.len() != sa.len() {
                return Err(Error::new(ErrorKind::InvalidData, "FmIndex: Base occurrence vector length mismatch"));
            }
            occs.enable_rank();
            base_occs.push(occs);
        }

        let marker_rows = SparseVector::load(reader)?;
        let marker_symbols = IntVector::load(reader)?;
        if marker_rows.count_ones() != marker_symbols.len() {
            return Err(Error::new(ErrorKind::InvalidData, "FmIndex: Marker directory length mismatch"));
        }

        Ok(FmIndex {
            sa: sa,
            bwt: bwt,
            counts: counts,
            base_occs: base_occs,
            marker_rows: marker_rows,
            marker_symbols: marker_symbols,
        })
    }

    fn size_in_elements(&self) -> usize {
        let mut result = self.sa.size_in_elements() + self.bwt.size_in_elements() + self.counts.size_in_elements();
        for occs in self.base_occs.iter() {
            result += occs.size_in_elements();
        }
        result + self.marker_rows.size_in_elements() + self.marker_symbols.size_in_elements()
    }
}

//-----------------------------------------------------------------------------
