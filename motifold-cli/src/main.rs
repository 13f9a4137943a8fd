//! # Motifold CLI
//!
//! Command-line driver for bi-objective RNA secondary structure
//! prediction: thermodynamic expected accuracy traded against coverage by
//! known structural motifs.
//!
//! ## Usage
//!
//! ```bash
//! # purely thermodynamic Pareto sweep
//! motifold -i hairpin.fasta
//!
//! # with candidate motif insertion sites and a probability threshold
//! motifold -i hairpin.fasta -s sites.csv -t 0.01
//!
//! # diagnostic posterior matrix, slow reference recurrence
//! motifold -i hairpin.fasta --fold-mode mccaskill --print-pb
//! ```
//!
//! ## Options
//!
//! - `-i, --input <FILE>`: input FASTA file; the first record is folded
//! - `-s, --sites <FILE>`: position-resolved motif insertion sites (CSV)
//! - `-t, --theta <FLOAT>`: pair-probability threshold (default: 0)
//! - `--fold-mode <MODE>`: `mccaskill`, `mccaskill-fast`, `pk`, `pk-fast`
//! - `--lambda-min/--lambda-max <FLOAT>`: explicit sweep window; without
//!   them the motif-coverage extreme seeds the sweep
//! - `--params <FILE>`: scalar energy-parameter overrides
//! - `--total-timeout/--solve-timeout <SECONDS>`: enumeration deadlines
//! - `--print-pb`: print the posterior base-pair probability matrix
//! - `-o, --output <FILE>`: output file (default: stdout)
//! - `-q, --quiet`: suppress progress messages

mod sites;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::time::Duration;

use bio::io::fasta;
use clap::{Arg, ArgAction, Command};

use motifold_core::config::{PredictionConfig, SearchLimits};
use motifold_core::energy::EnergyParams;
use motifold_core::fold::{format_posterior, FoldMode};
use motifold_core::sequence::RnaSequence;
use motifold_core::{predict, PredictionOutcome};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let matches = Command::new("motifold")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Bi-objective RNA secondary structure prediction")
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .value_name("FILE")
                .required(true)
                .help("Input FASTA file; the first record is folded"),
        )
        .arg(
            Arg::new("sites")
                .short('s')
                .long("sites")
                .value_name("FILE")
                .help("Position-resolved motif insertion sites (CSV)"),
        )
        .arg(
            Arg::new("theta")
                .short('t')
                .long("theta")
                .value_name("FLOAT")
                .default_value("0.0")
                .value_parser(clap::value_parser!(f64))
                .help("Pair-probability threshold for decision variables"),
        )
        .arg(
            Arg::new("fold-mode")
                .long("fold-mode")
                .value_name("MODE")
                .default_value("mccaskill-fast")
                .help("Partition recurrence: mccaskill, mccaskill-fast, pk, pk-fast"),
        )
        .arg(
            Arg::new("lambda-min")
                .long("lambda-min")
                .value_name("FLOAT")
                .value_parser(clap::value_parser!(f64))
                .help("Lower bound of the motif-coverage sweep window"),
        )
        .arg(
            Arg::new("lambda-max")
                .long("lambda-max")
                .value_name("FLOAT")
                .value_parser(clap::value_parser!(f64))
                .help("Upper bound of the motif-coverage sweep window"),
        )
        .arg(
            Arg::new("params")
                .long("params")
                .value_name("FILE")
                .help("Scalar energy-parameter overrides (name value per line)"),
        )
        .arg(
            Arg::new("total-timeout")
                .long("total-timeout")
                .value_name("SECONDS")
                .value_parser(clap::value_parser!(u64))
                .help("Deadline for the whole Pareto enumeration"),
        )
        .arg(
            Arg::new("solve-timeout")
                .long("solve-timeout")
                .value_name("SECONDS")
                .value_parser(clap::value_parser!(u64))
                .help("Budget for a single solver invocation"),
        )
        .arg(
            Arg::new("print-pb")
                .long("print-pb")
                .action(ArgAction::SetTrue)
                .help("Print the posterior base-pair probability matrix"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Output file (default: stdout)"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .action(ArgAction::SetTrue)
                .help("Suppress progress messages"),
        )
        .get_matches();

    let quiet = matches.get_flag("quiet");

    let input = matches.get_one::<String>("input").expect("required");
    let reader = fasta::Reader::new(File::open(input)?);
    let record = reader
        .records()
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "empty FASTA file"))??;
    let seq = RnaSequence::new(record.id().to_string(), std::str::from_utf8(record.seq())?)?;
    if !quiet {
        if seq.contains_thymine() {
            eprintln!("warning: thymines replaced by uracils");
        }
        if !seq.unknown_chars().is_empty() {
            eprintln!(
                "warning: unknown characters treated as N: {:?}",
                seq.unknown_chars()
            );
        }
    }

    let fold_mode = match matches
        .get_one::<String>("fold-mode")
        .expect("defaulted")
        .as_str()
    {
        "mccaskill" => FoldMode::NoPseudoknots { fast: false },
        "mccaskill-fast" => FoldMode::NoPseudoknots { fast: true },
        "pk" => FoldMode::Pseudoknots { fast: false },
        "pk-fast" => FoldMode::Pseudoknots { fast: true },
        other => return Err(format!("unknown fold mode {other:?}").into()),
    };

    let mut params = EnergyParams::default_turner();
    if let Some(path) = matches.get_one::<String>("params") {
        params.apply_overrides(&std::fs::read_to_string(path)?)?;
    }

    let sites = match matches.get_one::<String>("sites") {
        Some(path) => sites::parse_sites(&std::fs::read_to_string(path)?)?,
        None => Vec::new(),
    };

    let config = PredictionConfig {
        fold_mode,
        theta: *matches.get_one::<f64>("theta").expect("defaulted"),
        quiet,
        limits: SearchLimits {
            per_solve: matches
                .get_one::<u64>("solve-timeout")
                .map(|&s| Duration::from_secs(s)),
            total: matches
                .get_one::<u64>("total-timeout")
                .map(|&s| Duration::from_secs(s)),
        },
    };

    let bounds = match (
        matches.get_one::<f64>("lambda-min"),
        matches.get_one::<f64>("lambda-max"),
    ) {
        (Some(&lo), Some(&hi)) => Some((lo, hi)),
        (None, None) => None,
        _ => return Err("--lambda-min and --lambda-max must be given together".into()),
    };

    let outcome = predict(&seq, &params, sites, &config, bounds)?;

    let mut writer: BufWriter<Box<dyn Write>> = match matches.get_one::<String>("output") {
        Some(path) => BufWriter::new(Box::new(File::create(path)?)),
        None => BufWriter::new(Box::new(io::stdout())),
    };
    write_results(&mut writer, &seq, &outcome, config.theta, matches.get_flag("print-pb"))?;
    writer.flush()?;
    Ok(())
}

fn write_results(
    out: &mut impl Write,
    seq: &RnaSequence,
    outcome: &PredictionOutcome,
    theta: f64,
    print_pb: bool,
) -> io::Result<()> {
    if print_pb {
        write!(out, "{}", format_posterior(seq, &outcome.pb, theta))?;
    }
    writeln!(out, ">{} ({} nt)", seq.name(), seq.len())?;
    writeln!(out, "{seq}")?;
    let mut points = outcome.pareto.to_vec();
    points.sort_by(|a, b| {
        a.motif_coverage()
            .partial_cmp(&b.motif_coverage())
            .expect("objective values are finite")
    });
    for (rank, s) in points.iter().enumerate() {
        writeln!(
            out,
            "# {}\tmotif-coverage={:.4}\texpected-accuracy={:.4}",
            rank + 1,
            s.motif_coverage(),
            s.expected_accuracy()
        )?;
        writeln!(out, "{}", s.dot_bracket())?;
        for m in s.motifs() {
            writeln!(out, "+ {}", m.position_string())?;
        }
    }
    Ok(())
}
