use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::{info, warn};

use bifm_rust::ibf::{
    BinCount, BinIndex, BinSize, BinningDirectory, HashFunctionCount, IbfConfig, IbfStorage, InterleavedBloomFilter,
};
use bifm_rust::index::{BiFmIndex, IndexConfig, IndexMeta};
use bifm_rust::io::{read_sequences, SequenceRecord};
use bifm_rust::search::{search, HitStrategy, MaxError, SearchConfig};
use bifm_rust::util::dna;
use bifm_rust::util::kmer::HashVariant;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(
    name = "bifm-rust",
    author,
    version,
    about = "Approximate search on a bidirectional FM index, plus IBF pre-filtering",
    arg_required_else_help = true
)]
struct Cli {
    /// 输出 debug 日志（RUST_LOG 优先）
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum HitArg {
    All,
    AllBest,
    Best,
    Strata,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a bidirectional FM index from a FASTA file
    Index {
        /// Reference FASTA file
        reference: PathBuf,
        /// Output prefix; the index is written to <prefix>.bifm
        #[arg(short, long, default_value = "ref")]
        output: String,
        #[arg(long = "sa-sample", default_value_t = 16)]
        sa_sample: usize,
        #[arg(long = "occ-block", default_value_t = 64)]
        occ_block: usize,
    },
    /// Search FASTA/FASTQ queries with up to a given number of errors
    Search {
        /// Path to the index (.bifm)
        #[arg(short = 'i', long = "index")]
        index: PathBuf,
        /// Query FASTA or FASTQ file
        queries: PathBuf,
        /// Maximum total number of errors
        #[arg(short = 'e', long = "errors")]
        errors: Option<u8>,
        #[arg(long)]
        substitutions: Option<u8>,
        #[arg(long)]
        insertions: Option<u8>,
        #[arg(long)]
        deletions: Option<u8>,
        /// Total error rate relative to the query length (overrides the counts)
        #[arg(long = "error-rate", conflicts_with_all = ["errors", "substitutions", "insertions", "deletions"])]
        error_rate: Option<f64>,
        #[arg(long, value_enum, default_value_t = HitArg::All)]
        hit: HitArg,
        /// Extra errors above the best hit for --hit strata
        #[arg(long, default_value_t = 0)]
        stratum: u8,
        #[arg(short = 't', long = "threads", default_value_t = 1)]
        threads: usize,
        /// Output TSV path (stdout if omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Build a binning directory (IBF) with one bin per FASTA file
    IbfBuild {
        /// One FASTA file per bin
        #[arg(required = true)]
        bins: Vec<PathBuf>,
        #[arg(short, long)]
        output: PathBuf,
        /// Bits per bin
        #[arg(long = "bin-size")]
        bin_size: usize,
        #[arg(long = "hash-functions", default_value_t = 2)]
        hash_functions: usize,
        #[arg(short = 'k', long = "kmer", default_value_t = 20)]
        kmer: u8,
        /// Minimiser window; plain k-mers if omitted
        #[arg(short = 'w', long = "window")]
        window: Option<u32>,
    },
    /// Count, per bin, how many query hashes hit
    IbfCount {
        /// Binning directory built by ibf-build
        #[arg(short = 'i', long = "ibf")]
        ibf: PathBuf,
        /// Query FASTA or FASTQ file
        queries: PathBuf,
        /// Compress the directory before counting
        #[arg(long)]
        compressed: bool,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    match cli.command {
        Commands::Index { reference, output, sa_sample, occ_block } => {
            run_index(&reference, &output, IndexConfig { sa_sample, occ_block })
        }
        Commands::Search {
            index,
            queries,
            errors,
            substitutions,
            insertions,
            deletions,
            error_rate,
            hit,
            stratum,
            threads,
            out,
        } => {
            let max_error = match error_rate {
                Some(rate) => MaxError::total_rate(rate),
                None => MaxError::Count { total: errors, substitution: substitutions, insertion: insertions, deletion: deletions },
            };
            let hit = match hit {
                HitArg::All => HitStrategy::All,
                HitArg::AllBest => HitStrategy::AllBest,
                HitArg::Best => HitStrategy::Best,
                HitArg::Strata => HitStrategy::Strata(stratum),
            };
            let config = SearchConfig::new().max_error(max_error).hit(hit).threads(threads);
            run_search(&index, &queries, &config, out.as_deref())
        }
        Commands::IbfBuild { bins, output, bin_size, hash_functions, kmer, window } => {
            let hash = match window {
                Some(window) => HashVariant::Minimiser { k: kmer, window },
                None => HashVariant::Kmer { k: kmer },
            };
            let config = IbfConfig {
                bins: BinCount(bins.len()),
                bin_size: BinSize(bin_size),
                hash_functions: HashFunctionCount(hash_functions),
                hash,
            };
            run_ibf_build(&bins, &output, config)
        }
        Commands::IbfCount { ibf, queries, compressed, out } => run_ibf_count(&ibf, &queries, compressed, out.as_deref()),
    }
}

fn output_writer(out: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match out {
        Some(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("cannot create output file '{}'", p.display()))?,
        )),
        None => Box::new(BufWriter::new(std::io::stdout().lock())),
    })
}

fn run_index(reference: &Path, output: &str, config: IndexConfig) -> Result<()> {
    let records = read_sequences(reference)
        .with_context(|| format!("cannot read reference FASTA '{}'", reference.display()))?;
    if records.is_empty() {
        bail!("FASTA file '{}' contains no sequences", reference.display());
    }

    let total_len: usize = records.iter().map(|r| r.seq.len()).sum();
    info!("reference: {}", reference.display());
    info!("sequences: {}, total length: {}", records.len(), total_len);

    let encoded: Vec<Vec<u8>> = records.iter().map(|r| dna::encode(&r.seq)).collect();
    let named = records.iter().zip(&encoded).map(|(r, s)| (r.id.clone(), s.as_slice()));
    let mut index = BiFmIndex::from_named(named, config)
        .with_context(|| format!("cannot build an index over '{}'", reference.display()))?;
    index.set_meta(IndexMeta {
        source: Some(reference.display().to_string()),
        build_args: Some(std::env::args().collect::<Vec<_>>().join(" ")),
        build_timestamp: Some(chrono::Utc::now().to_rfc3339()),
    });

    let out_path = format!("{}.bifm", output);
    index.save_to_file(&out_path).with_context(|| format!("cannot write index to '{}'", out_path))?;
    info!("bidirectional FM index saved: {}", out_path);
    Ok(())
}

fn run_search(index_path: &Path, queries_path: &Path, config: &SearchConfig, out: Option<&Path>) -> Result<()> {
    let index = BiFmIndex::load_from_file(index_path)
        .with_context(|| format!("cannot load index '{}'", index_path.display()))?;
    let records = read_sequences(queries_path)
        .with_context(|| format!("cannot read queries from '{}'", queries_path.display()))?;
    let queries: Vec<Vec<u8>> = records.iter().map(|r| dna::encode(&r.seq)).collect();
    info!("searching {} queries against {} reference sequences", queries.len(), index.seqs().len());

    let hits = search(&index, &queries, config).context("search failed")?;

    let mut w = output_writer(out)?;
    for hit in &hits {
        let seq = &index.seqs()[hit.reference_id];
        writeln!(w, "{}\t{}\t{}", records[hit.query_id].id, seq.name, hit.reference_begin)?;
    }
    w.flush()?;
    info!("{} hits reported", hits.len());
    Ok(())
}

fn run_ibf_build(bin_files: &[PathBuf], output: &Path, config: IbfConfig) -> Result<()> {
    let mut dir = BinningDirectory::new(config).context("invalid IBF configuration")?;
    for (bin, path) in bin_files.iter().enumerate() {
        let records =
            read_sequences(path).with_context(|| format!("cannot read bin {} from '{}'", bin, path.display()))?;
        if records.is_empty() {
            warn!("bin {} ('{}') has no sequences", bin, path.display());
        }
        for rec in &records {
            dir.emplace_sequence(&dna::encode(&rec.seq), BinIndex(bin))?;
        }
        info!("bin {}: {} sequences from '{}'", bin, records.len(), path.display());
    }
    dir.save_to_file(output).with_context(|| format!("cannot write binning directory to '{}'", output.display()))?;
    info!("binning directory saved: {}", output.display());
    Ok(())
}

fn run_ibf_count(ibf_path: &Path, queries_path: &Path, compressed: bool, out: Option<&Path>) -> Result<()> {
    let dir = BinningDirectory::<InterleavedBloomFilter>::load_from_file(ibf_path)
        .with_context(|| format!("cannot load binning directory '{}'", ibf_path.display()))?;
    let records = read_sequences(queries_path)
        .with_context(|| format!("cannot read queries from '{}'", queries_path.display()))?;

    let mut w = output_writer(out)?;
    if compressed {
        let packed = dir.compress();
        info!("compressed directory: {} bits over {} bins", packed.ibf().bit_size(), packed.bin_count());
        write_counts(&packed, &records, &mut w)?;
    } else {
        write_counts(&dir, &records, &mut w)?;
    }
    w.flush()?;
    Ok(())
}

/// 每条查询一行：`id  哈希总数  各 bin 计数...`
fn write_counts<F: IbfStorage>(
    dir: &BinningDirectory<F>,
    records: &[SequenceRecord],
    w: &mut dyn Write,
) -> Result<()> {
    let mut agent = dir.counting_agent::<u32>();
    for rec in records {
        let (counts, total) = agent.count_query_with_total(&dna::encode(&rec.seq));
        let counts: Vec<String> = counts.iter().map(u32::to_string).collect();
        writeln!(w, "{}\t{}\t{}", rec.id, total, counts.join("\t"))?;
    }
    Ok(())
}
