//! Command-line driver for the Vortex commitment.
//!
//! `vortex demo` commits to a pseudo-random matrix, opens it
//! non-interactively and verifies the opening; `vortex verify` re-checks an
//! opening written by `demo --proof <file>`.

use std::{env, fs, sync::Arc, time::Instant};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_subscriber::EnvFilter;
use vortex_pcs::{
    commit, eval_lagrange, Fr, Hash, Params, Proof, RingSis, Transcript, VerifierInput, E4,
};

const TRANSCRIPT_TAG: &[u8] = b"VORTEX-CLI";
const SIS_LOG_DEGREE: u32 = 9;
const SIS_LOG_BOUND: usize = 16;

fn fatal(message: &str) -> ! {
    eprintln!("{message}");
    std::process::exit(1);
}

fn print_help() {
    println!("Usage: vortex <demo|verify> [flags]");
    println!("  demo [--columns N] [--rows M] [--rate R] [--open K] [--seed S] [--proof <file>]");
    println!("  verify --proof <file>");
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct DemoOptions {
    columns: usize,
    rows: usize,
    rate: usize,
    open: usize,
    seed: u64,
}

impl Default for DemoOptions {
    fn default() -> Self {
        Self {
            columns: 1024,
            rows: 64,
            rate: 2,
            open: 64,
            seed: 0,
        }
    }
}

/// Everything needed to re-run the verifier on a saved opening.
#[derive(Debug, Serialize, Deserialize)]
struct OpeningBundle {
    options: DemoOptions,
    root: Hash,
    evaluation_point: E4,
    claimed_values: Vec<E4>,
    alpha: E4,
    selected_columns: Vec<usize>,
    proof: Proof,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut args = env::args().skip(1);
    match args.next().as_deref() {
        Some("demo") => cmd_demo(args.collect()),
        Some("verify") => cmd_verify(args.collect()),
        Some("-h") | Some("--help") | None => print_help(),
        Some(other) => {
            print_help();
            fatal(&format!("unknown command: {other}"));
        }
    }
}

fn parse_value<T: std::str::FromStr>(flag: &str, value: Option<String>) -> T {
    let value = value.unwrap_or_else(|| fatal(&format!("{flag} expects a value")));
    value
        .parse()
        .unwrap_or_else(|_| fatal(&format!("invalid {flag} value: {value}")))
}

fn cmd_demo(args: Vec<String>) {
    let mut options = DemoOptions::default();
    let mut proof_path: Option<String> = None;
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--columns" => options.columns = parse_value("--columns", iter.next()),
            "--rows" => options.rows = parse_value("--rows", iter.next()),
            "--rate" => options.rate = parse_value("--rate", iter.next()),
            "--open" => options.open = parse_value("--open", iter.next()),
            "--seed" => options.seed = parse_value("--seed", iter.next()),
            "--proof" => {
                proof_path = Some(
                    iter.next()
                        .unwrap_or_else(|| fatal("--proof expects a path")),
                )
            }
            other => fatal(&format!("unknown argument: {other}")),
        }
    }

    let params = build_params(&options);
    let mut rng = ChaCha8Rng::seed_from_u64(options.seed);
    let matrix: Vec<Vec<Fr>> = (0..options.rows)
        .map(|_| (0..options.columns).map(|_| Fr::random(&mut rng)).collect())
        .collect();

    let start = Instant::now();
    let mut state = commit(&params, &matrix).unwrap_or_else(|err| fatal(&format!("commit failed: {err}")));
    let commit_time = start.elapsed();
    let root = state.get_commitment();

    let mut transcript = Transcript::new(TRANSCRIPT_TAG);
    transcript.append_hash(&root);
    let evaluation_point = transcript.challenge_e4();
    let claimed_values: Vec<E4> = matrix
        .iter()
        .map(|row| {
            eval_lagrange(row, &evaluation_point)
                .unwrap_or_else(|err| fatal(&format!("evaluation failed: {err}")))
        })
        .collect();
    transcript.append_e4_slice(&claimed_values);
    let alpha = transcript.challenge_e4();

    let start = Instant::now();
    state
        .open_lin_comb(alpha)
        .unwrap_or_else(|err| fatal(&format!("opening failed: {err}")));
    transcript.append_e4_slice(state.u_alpha().unwrap_or_default());
    let selected_columns = transcript.challenge_indices(options.open, params.size_codeword());
    let proof = state
        .open_columns(&selected_columns)
        .unwrap_or_else(|err| fatal(&format!("opening failed: {err}")));
    let open_time = start.elapsed();

    let bundle = OpeningBundle {
        options,
        root,
        evaluation_point,
        claimed_values,
        alpha,
        selected_columns,
        proof,
    };
    let start = Instant::now();
    verify_bundle(&params, &bundle);
    let verify_time = start.elapsed();

    println!("root:   {root}");
    println!(
        "matrix: {} x {} (rate 1/{}, {} opened columns)",
        options.rows, options.columns, options.rate, options.open
    );
    println!("commit: {:.3} ms", commit_time.as_secs_f64() * 1e3);
    println!("open:   {:.3} ms", open_time.as_secs_f64() * 1e3);
    println!("verify: {:.3} ms", verify_time.as_secs_f64() * 1e3);

    if let Some(path) = proof_path {
        let json = serde_json::to_string_pretty(&bundle)
            .unwrap_or_else(|err| fatal(&format!("failed to encode proof: {err}")));
        fs::write(&path, json).unwrap_or_else(|err| fatal(&format!("failed to write {path}: {err}")));
        info!(path = %path, "wrote opening");
        println!("proof written to {path}");
    }
}

fn cmd_verify(args: Vec<String>) {
    let mut proof_path: Option<String> = None;
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--proof" => {
                proof_path = Some(
                    iter.next()
                        .unwrap_or_else(|| fatal("--proof expects a path")),
                )
            }
            other => fatal(&format!("unknown argument: {other}")),
        }
    }
    let path = proof_path.unwrap_or_else(|| fatal("verify requires --proof <file>"));
    let raw = fs::read_to_string(&path).unwrap_or_else(|err| fatal(&format!("failed to read {path}: {err}")));
    let bundle: OpeningBundle =
        serde_json::from_str(&raw).unwrap_or_else(|err| fatal(&format!("invalid proof file: {err}")));
    let params = build_params(&bundle.options);
    verify_bundle(&params, &bundle);
    println!("ok: opening verifies against root {}", bundle.root);
}

fn build_params(options: &DemoOptions) -> Arc<Params> {
    let key = RingSis::new(options.seed, SIS_LOG_DEGREE, SIS_LOG_BOUND, options.rows)
        .unwrap_or_else(|err| fatal(&format!("invalid ring-SIS parameters: {err}")));
    let params = Params::new(
        options.columns,
        options.rows,
        Some(Arc::new(key)),
        options.rate,
        options.open,
    )
    .unwrap_or_else(|err| fatal(&format!("invalid parameters: {err}")));
    Arc::new(params)
}

fn verify_bundle(params: &Params, bundle: &OpeningBundle) {
    let input = VerifierInput {
        root: bundle.root,
        claimed_values: &bundle.claimed_values,
        evaluation_point: bundle.evaluation_point,
        alpha: bundle.alpha,
        selected_columns: &bundle.selected_columns,
        proof: &bundle.proof,
    };
    params
        .verify(&input)
        .unwrap_or_else(|err| fatal(&format!("verification failed: {err}")));
}
