use vbwt::prg::{PrgString, Endianness};
use vbwt::index::PrgIndex;
use vbwt::kmer_index::KmerIndex;
use vbwt::coverage::{self, GroupedAlleleCounts};
use vbwt::search::SearchState;
use vbwt::support;
use vbwt::internal;

use simple_sds::serialize;

use rayon::prelude::*;

use std::fs::File;
use std::io::{Write, BufWriter, BufRead};
use std::time::Instant;
use std::{env, fs, io, process};

use getopts::Options;

//-----------------------------------------------------------------------------

fn main() -> Result<(), String> {
    let start = Instant::now();
    let config = Config::new()?;
    rayon::ThreadPoolBuilder::new().num_threads(config.threads).build_global().map_err(|e| e.to_string())?;

    // The PRG and its derived structures.
    let prg_file = config.prg_file.as_ref().unwrap();
    if config.verbose {
        eprintln!("Loading PRG {}", prg_file);
    }
    let prg = if config.ascii {
        let text = fs::read_to_string(prg_file).map_err(|x| x.to_string())?;
        PrgString::from_ascii(text.trim())?
    } else {
        PrgString::load(prg_file, config.endianness).map_err(|x| x.to_string())?
    };
    let mut index = PrgIndex::from_prg(prg)?;

    // The k-mer index, rebuilt when missing or built for another PRG.
    let kmer_file = config.kmer_file.clone().unwrap_or_else(|| format!("{}.kmers", prg_file));
    let kmer_index = match serialize::load_from::<KmerIndex, _>(&kmer_file) {
        Ok(loaded) => {
            if loaded.is_compatible(&index) {
                loaded
            } else {
                if config.verbose {
                    eprintln!("K-mer index {} does not match the PRG; rebuilding", kmer_file);
                }
                KmerIndex::build(&index, config.k, config.max_read_size)
            }
        }
        Err(_) => {
            if config.verbose {
                eprintln!("Building the k-mer index (k = {}, max read size = {})", config.k, config.max_read_size);
            }
            KmerIndex::build(&index, config.k, config.max_read_size)
        }
    };

    // The reads: one read per line, FASTA/FASTQ headers and quality lines skipped.
    let reads_file = config.reads_file.as_ref().unwrap();
    if config.verbose {
        eprintln!("Loading reads {}", reads_file);
    }
    let mut reads: Vec<Vec<u8>> = Vec::new();
    let mut skipped = 0;
    for line in internal::open_file(reads_file)?.lines() {
        let line = line.map_err(|x| x.to_string())?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('>') || line.starts_with('@') || line.starts_with('+') {
            continue;
        }
        match support::encode_bases(line.as_bytes()) {
            Ok(read) => reads.push(read),
            Err(_) => skipped += 1,
        }
    }
    if config.verbose && skipped > 0 {
        eprintln!("Skipped {} lines with non-ACGT characters", skipped);
    }

    // Map phase: reads are searched in parallel; coverage is flushed read by read.
    let map_start = Instant::now();
    let results: Vec<Vec<SearchState>> = reads.par_iter()
        .map(|read| index.map_read(read, &kmer_index))
        .collect();

    let mut grouped = GroupedAlleleCounts::new(index.prg().site_count());
    let mut mapped = 0;
    for (read, states) in reads.iter().zip(results.iter()) {
        if states.is_empty() {
            continue;
        }
        mapped += 1;
        index.record_coverage(states, read.len());
        grouped.record(states);
    }
    if config.verbose {
        internal::report_mapping(reads.len(), mapped, map_start.elapsed());
    }

    // The coverage dump.
    let dump = coverage::coverage_json(index.graph(), &grouped);
    match config.output.as_ref() {
        Some(filename) => {
            let mut writer = BufWriter::new(File::create(filename).map_err(|x| x.to_string())?);
            writeln!(writer, "{}", dump).map_err(|x| x.to_string())?;
        }
        None => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            writeln!(writer, "{}", dump).map_err(|x| x.to_string())?;
        }
    }

    if config.verbose {
        eprintln!("Mapped {} reads in {:.3} seconds", reads.len(), start.elapsed().as_secs_f64());
        internal::report_memory_usage();
        eprintln!("");
    }
    Ok(())
}

//-----------------------------------------------------------------------------

struct Config {
    prg_file: Option<String>,
    reads_file: Option<String>,
    kmer_file: Option<String>,
    output: Option<String>,
    ascii: bool,
    endianness: Endianness,
    k: usize,
    max_read_size: usize,
    threads: usize,
    verbose: bool,
}

impl Config {
    const MIN_THREADS: usize = 1;
    const MAX_THREADS: usize = 64;
    const DEFAULT_K: usize = 15;
    const DEFAULT_MAX_READ_SIZE: usize = 150;

    pub fn new() -> Result<Config, String> {
        let args: Vec<String> = env::args().collect();
        let program = args[0].clone();

        let mut opts = Options::new();
        opts.optflag("a", "ascii", "the PRG file is an ASCII string (flat PRGs only)");
        opts.optopt("e", "endianness", "byte order of the binary PRG (little, big; default little)", "ORDER");
        opts.optflag("h", "help", "print this help");
        opts.optopt("i", "kmer-index", "k-mer index file (default: prg.kmers)", "FILE");
        opts.optopt("k", "kmer-size", &format!("k-mer length when rebuilding the index (default {})", Self::DEFAULT_K), "INT");
        opts.optopt("m", "max-read-size", &format!("maximum read length when rebuilding the index (default {})", Self::DEFAULT_MAX_READ_SIZE), "INT");
        opts.optopt("o", "output", "write the coverage dump to a file instead of stdout", "FILE");
        opts.optopt("t", "threads", "number of mapping threads (default 1)", "INT");
        opts.optflag("v", "verbose", "print progress information");
        let matches = opts.parse(&args[1..]).map_err(|x| x.to_string())?;

        let mut config = Config {
            prg_file: None,
            reads_file: None,
            kmer_file: None,
            output: None,
            ascii: false,
            endianness: Endianness::Little,
            k: Self::DEFAULT_K,
            max_read_size: Self::DEFAULT_MAX_READ_SIZE,
            threads: Self::MIN_THREADS,
            verbose: false,
        };
        if matches.opt_present("a") {
            config.ascii = true;
        }
        if let Some(s) = matches.opt_str("e") {
            config.endianness = match s.as_str() {
                "little" => Endianness::Little,
                "big" => Endianness::Big,
                _ => return Err(format!("Invalid byte order: {}", s)),
            };
        }
        if let Some(s) = matches.opt_str("i") {
            config.kmer_file = Some(s);
        }
        if let Some(s) = matches.opt_str("k") {
            match s.parse::<usize>() {
                Ok(n) if n > 0 => config.k = n,
                _ => return Err(format!("Invalid k-mer length: {}", s)),
            }
        }
        if let Some(s) = matches.opt_str("m") {
            match s.parse::<usize>() {
                Ok(n) if n > 0 => config.max_read_size = n,
                _ => return Err(format!("Invalid maximum read length: {}", s)),
            }
        }
        if let Some(s) = matches.opt_str("o") {
            config.output = Some(s);
        }
        if let Some(s) = matches.opt_str("t") {
            match s.parse::<usize>() {
                Ok(n) if n >= Self::MIN_THREADS && n <= Self::MAX_THREADS => config.threads = n,
                Ok(n) => return Err(format!("Invalid number of threads: {} (must be {} to {})", n, Self::MIN_THREADS, Self::MAX_THREADS)),
                Err(_) => return Err(format!("Invalid number of threads: {}", s)),
            }
        }
        if matches.opt_present("v") {
            config.verbose = true;
        }

        let mut free = matches.free.iter();
        if let Some(s) = free.next() {
            config.prg_file = Some(s.clone());
        }
        if let Some(s) = free.next() {
            config.reads_file = Some(s.clone());
        }
        if matches.opt_present("h") || config.prg_file.is_none() || config.reads_file.is_none() {
            let header = format!("Usage: {} [options] prg.bin reads.txt\n\nMaps reads to a linear PRG and writes the coverage dump as JSON.", program);
            eprint!("{}", opts.usage(&header));
            process::exit(if matches.opt_present("h") { 0 } else { 1 });
        }

        Ok(config)
    }
}

//-----------------------------------------------------------------------------
