use vbwt::prg::{PrgString, Endianness};
use vbwt::index::PrgIndex;
use vbwt::kmer_index::KmerIndex;
use vbwt::internal;

use simple_sds::serialize;

use std::time::Instant;
use std::{env, fs, process};

use getopts::Options;

//-----------------------------------------------------------------------------

fn main() -> Result<(), String> {
    let start = Instant::now();
    let config = Config::new()?;
    rayon::ThreadPoolBuilder::new().num_threads(config.threads).build_global().map_err(|e| e.to_string())?;

    let filename = config.filename.as_ref().unwrap();
    if config.verbose {
        eprintln!("Loading PRG {}", filename);
    }
    let prg = if config.ascii {
        let text = fs::read_to_string(filename).map_err(|x| x.to_string())?;
        PrgString::from_ascii(text.trim())?
    } else {
        PrgString::load(filename, config.endianness).map_err(|x| x.to_string())?
    };
    if config.verbose {
        eprintln!("PRG length {}, {} sites, max marker {}", prg.len(), prg.site_count(), prg.max_marker());
        if prg.odd_site_end_found() {
            eprintln!("Legacy odd site ends were normalised");
        }
    }

    if config.verbose {
        eprintln!("Building the FM-index and the coverage graph");
    }
    let index = PrgIndex::from_prg(prg)?;

    if config.verbose {
        eprintln!("Building the k-mer index (k = {}, max read size = {})", config.k, config.max_read_size);
    }
    let kmer_index = KmerIndex::build(&index, config.k, config.max_read_size);
    if config.verbose {
        eprintln!("Indexed {} k-mers", kmer_index.len());
    }

    let prefix = config.output.as_ref().unwrap_or(filename);
    index.prg().serialize(format!("{}.prg", prefix), Endianness::Little).map_err(|x| x.to_string())?;
    serialize::serialize_to(index.fm(), format!("{}.fmi", prefix)).map_err(|x| x.to_string())?;
    serialize::serialize_to(&kmer_index, format!("{}.kmers", prefix)).map_err(|x| x.to_string())?;
    if config.verbose {
        eprintln!("Wrote {}.prg, {}.fmi, {}.kmers", prefix, prefix, prefix);
        eprintln!("");
        eprintln!("Index built in {:.3} seconds", start.elapsed().as_secs_f64());
        internal::report_memory_usage();
        eprintln!("");
    }
    Ok(())
}

//-----------------------------------------------------------------------------

struct Config {
    filename: Option<String>,
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
        opts.optopt("k", "kmer-size", &format!("k-mer length for the seed index (default {})", Self::DEFAULT_K), "INT");
        opts.optopt("m", "max-read-size", &format!("maximum read length (default {})", Self::DEFAULT_MAX_READ_SIZE), "INT");
        opts.optopt("o", "output", "prefix for the output files (default: the PRG file name)", "PREFIX");
        opts.optopt("t", "threads", "number of threads for the k-mer prebuild (default 1)", "INT");
        opts.optflag("v", "verbose", "print progress information");
        let matches = opts.parse(&args[1..]).map_err(|x| x.to_string())?;

        let mut config = Config {
            filename: None,
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

        if let Some(s) = matches.free.first() {
            config.filename = Some(s.clone());
        }
        if matches.opt_present("h") || config.filename.is_none() {
            let header = format!("Usage: {} [options] prg.bin\n\nBuilds the FM-index and the k-mer seed index for a linear PRG.", program);
            eprint!("{}", opts.usage(&header));
            process::exit(if matches.opt_present("h") { 0 } else { 1 });
        }

        Ok(config)
    }
}

//-----------------------------------------------------------------------------
