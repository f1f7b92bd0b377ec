//! The linearised PRG: a self-describing integer stream encoding nested variation sites.
//!
//! A population reference graph is linearised as a sequence of unsigned integers.
//! Values `1..=4` encode the DNA bases and values of at least `5` are variant markers.
//! An odd marker opens a variant site; the corresponding even marker separates its alleles,
//! and the last occurrence of the even marker closes the site.
//! Legacy streams that close a site by repeating the odd marker are normalised on construction.
//!
//! # Examples
//!
//! ```
//! use vbwt::prg::PrgString;
//!
//! let prg = PrgString::from_ascii("gcgct5c6g6t6agtcct").unwrap();
//! assert_eq!(prg.len(), 18);
//! assert_eq!(prg.site_count(), 1);
//! assert_eq!(prg.end_of(6), Some(11));
//!
//! // The legacy form with an odd site-end normalises to the same stream.
//! let legacy = PrgString::from_ascii("gcgct5c6g6t5agtcct").unwrap();
//! assert!(legacy.odd_site_end_found());
//! assert_eq!(legacy.ints(), prg.ints());
//! ```

use crate::support::{self, VariantLocus};

use simple_sds::int_vector::IntVector;
use simple_sds::ops::Push;

use std::collections::BTreeMap;
use std::fmt::{self, Display};
use std::fs::File;
use std::io::{BufReader, BufWriter, Error, ErrorKind, Read, Write};
use std::path::Path;
use std::io;


//-----------------------------------------------------------------------------

/// Byte order of a binary PRG file.
///
/// The on-disk format is a headerless stream of 32-bit words; the length is implicit
/// from the file size. The caller declares the byte order, and writing with the same
/// declaration round-trips the file byte-exactly.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Endianness {
    /// Least significant byte first.
    Little,
    /// Most significant byte first.
    Big,
}

//-----------------------------------------------------------------------------

/// A normalised linear PRG.
///
/// Construction normalises site-end markers to the even form and records, for every
/// even marker, the index where its site ends. Unrecognised values, sites that never
/// close, and allele markers outside any site are fatal parse errors.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PrgString {
    ints: Vec<usize>,
    end_positions: BTreeMap<usize, usize>,
    odd_site_end_found: bool,
}

impl PrgString {
    /// Creates a PRG from an integer stream, normalising site-end markers.
    ///
    /// Returns an error on a value `0`, an allele marker without an open site,
    /// or a site that never closes.
    pub fn from_ints(ints: Vec<usize>) -> Result<PrgString, String> {
        let mut result = PrgString {
            ints: ints,
            end_positions: BTreeMap::new(),
            odd_site_end_found: false,
        };
        result.normalise()?;
        Ok(result)
    }

    /// Creates a PRG from an ASCII string of bases and markers.
    ///
    /// Digits are parsed greedily as multi-digit integers, so this only works for
    /// flat PRGs; a nested PRG must be read from its binary form, where the integers
    /// are self-describing.
    pub fn from_ascii(prg: &str) -> Result<PrgString, String> {
        let mut ints: Vec<usize> = Vec::with_capacity(prg.len());
        let mut marker: usize = 0;
        let mut in_marker = false;
        for byte in prg.bytes() {
            if byte.is_ascii_digit() {
                marker = 10 * marker + ((byte - b'0') as usize);
                in_marker = true;
                continue;
            }
            if in_marker {
                ints.push(marker);
                marker = 0;
                in_marker = false;
            }
            match support::encode_base(byte) {
                Some(value) => ints.push(value),
                None => return Err(format!("Invalid character {:?} in a PRG string", byte as char)),
            }
        }
        if in_marker {
            ints.push(marker);
        }
        Self::from_ints(ints)
    }

    /// Loads a PRG from a binary file of 32-bit words in the given byte order.
    pub fn load<P: AsRef<Path>>(filename: P, endianness: Endianness) -> io::Result<PrgString> {
        let mut reader = BufReader::new(File::open(filename)?);
        let mut bytes: Vec<u8> = Vec::new();
        reader.read_to_end(&mut bytes)?;
        if bytes.len() % 4 != 0 {
            return Err(Error::new(ErrorKind::InvalidData, "PrgString: File size is not a multiple of the word size"));
        }
        let mut ints: Vec<usize> = Vec::with_capacity(bytes.len() / 4);
        for word in bytes.chunks_exact(4) {
            let word = [word[0], word[1], word[2], word[3]];
            let value = match endianness {
                Endianness::Little => u32::from_le_bytes(word),
                Endianness::Big => u32::from_be_bytes(word),
            };
            ints.push(value as usize);
        }
        Self::from_ints(ints).map_err(|msg| Error::new(ErrorKind::InvalidData, msg))
    }

    /// Writes the normalised PRG to a binary file of 32-bit words in the given byte order.
    pub fn serialize<P: AsRef<Path>>(&self, filename: P, endianness: Endianness) -> io::Result<()> {
        let mut writer = BufWriter::new(File::create(filename)?);
        for value in self.ints.iter() {
            let word = *value as u32;
            let bytes = match endianness {
                Endianness::Little => word.to_le_bytes(),
                Endianness::Big => word.to_be_bytes(),
            };
            writer.write_all(&bytes)?;
        }
        writer.flush()
    }

    // Rewrites legacy odd site-ends to the even form and maps every site to its end index.
    fn normalise(&mut self) -> Result<(), String> {
        let mut open: Vec<usize> = Vec::new();
        for i in 0..self.ints.len() {
            let value = self.ints[i];
            if value == 0 {
                return Err(format!("Invalid value 0 at PRG index {}", i));
            }
            if support::is_base(value) {
                continue;
            }
            if support::is_site_marker(value) {
                if open.contains(&value) {
                    // Legacy form: the second occurrence of the odd marker closes the site.
                    self.ints[i] = value + 1;
                    self.end_positions.insert(value + 1, i);
                    open.retain(|m| *m != value);
                    self.odd_site_end_found = true;
                } else {
                    open.push(value);
                }
            } else {
                if !open.contains(&(value - 1)) {
                    return Err(format!("Allele marker {} at PRG index {} outside of site {}", value, i, value - 1));
                }
                self.end_positions.insert(value, i);
            }
        }

        // Sites whose allele marker was seen are closed by their last occurrence.
        open.retain(|m| !self.end_positions.contains_key(&(m + 1)));
        if let Some(marker) = open.first() {
            return Err(format!("Site {} never closes", marker));
        }
        Ok(())
    }

    /// Returns the integer stream.
    #[inline]
    pub fn ints(&self) -> &[usize] {
        &self.ints
    }

    /// Returns the length of the PRG.
    #[inline]
    pub fn len(&self) -> usize {
        self.ints.len()
    }

    /// Returns `true` if the PRG is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ints.is_empty()
    }

    /// Returns the map from allele markers to the PRG index where the site ends.
    #[inline]
    pub fn end_positions(&self) -> &BTreeMap<usize, usize> {
        &self.end_positions
    }

    /// Returns the PRG index where the site of the given marker ends.
    pub fn end_of(&self, marker: usize) -> Option<usize> {
        self.end_positions.get(&support::allele_marker(marker)).copied()
    }

    /// Returns the number of variant sites.
    #[inline]
    pub fn site_count(&self) -> usize {
        self.end_positions.len()
    }

    /// Returns the largest marker value, or `0` if there are no markers.
    pub fn max_marker(&self) -> usize {
        self.end_positions.keys().next_back().copied().unwrap_or(0)
    }

    /// Returns `true` if normalisation rewrote a legacy odd site-end.
    #[inline]
    pub fn odd_site_end_found(&self) -> bool {
        self.odd_site_end_found
    }
}

//-----------------------------------------------------------------------------

/// Position classification derived from the marker value and the site-end map.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MarkerType {
    /// A DNA base.
    Sequence,
    /// An odd marker opening a site.
    SiteEntry,
    /// An even marker separating two alleles.
    AlleleEnd,
    /// The last even marker of a site.
    SiteEnd,
}

impl PrgString {
    /// Classifies the given PRG position.
    ///
    /// # Panics
    ///
    /// Panics if the position is out of bounds or the stream has not been normalised.
    pub fn marker_type(&self, pos: usize) -> MarkerType {
        let value = self.ints[pos];
        if support::is_base(value) {
            return MarkerType::Sequence;
        }
        if support::is_site_marker(value) {
            return MarkerType::SiteEntry;
        }
        let end = self.end_positions.get(&value).copied();
        assert!(end.is_some() && pos <= end.unwrap(), "PrgString: Allele marker {} at index {} has no site end", value, pos);
        if pos < end.unwrap() { MarkerType::AlleleEnd } else { MarkerType::SiteEnd }
    }

    /// Builds the site and allele masks.
    ///
    /// For every PRG position, the masks store the marker of the enclosing site and the
    /// 1-based allele identifier within it, or `0` outside of sites. The markers of a
    /// site itself belong to the enclosing locus, so the first position of an allele
    /// always carries that allele's identifier, even when the allele starts with a
    /// nested site.
    pub fn masks(&self) -> (IntVector, IntVector) {
        let width = simple_sds::bits::bit_len(self.max_marker().max(self.len()).max(1) as u64);
        let mut sites = IntVector::with_capacity(self.len(), width).unwrap();
        let mut alleles = IntVector::with_capacity(self.len(), width).unwrap();

        let mut stack: Vec<VariantLocus> = Vec::new();
        for pos in 0..self.len() {
            let enclosing = |stack: &[VariantLocus]| stack.last().copied().unwrap_or_else(VariantLocus::outside);
            match self.marker_type(pos) {
                MarkerType::Sequence => {
                    let locus = enclosing(&stack);
                    sites.push(locus.site as u64);
                    alleles.push(locus.allele as u64);
                }
                MarkerType::SiteEntry => {
                    let locus = enclosing(&stack);
                    sites.push(locus.site as u64);
                    alleles.push(locus.allele as u64);
                    stack.push(VariantLocus::new(self.ints[pos], 1));
                }
                MarkerType::AlleleEnd => {
                    let top = stack.len() - 1;
                    stack[top].allele += 1;
                    let locus = if stack.len() > 1 { stack[stack.len() - 2] } else { VariantLocus::outside() };
                    sites.push(locus.site as u64);
                    alleles.push(locus.allele as u64);
                }
                MarkerType::SiteEnd => {
                    stack.pop();
                    let locus = enclosing(&stack);
                    sites.push(locus.site as u64);
                    alleles.push(locus.allele as u64);
                }
            }
        }
        (sites, alleles)
    }
}

//-----------------------------------------------------------------------------

impl Display for PrgString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for value in self.ints.iter() {
            if support::is_base(*value) {
                write!(f, "{}", support::decode_base(*value) as char)?;
            } else {
                write!(f, "{}", value)?;
            }
        }
        Ok(())
    }
}

//-----------------------------------------------------------------------------
