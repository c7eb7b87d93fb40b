// Copyright (c) 2025 Proof of Capacity Consortium
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

#[macro_use]
extern crate log;

use clap::{value_parser, Arg, ArgMatches, Command};
use post_hashlib::SoftAes;
use post_prover::{
    check_proof, load_cfg, logger, Blake3Oracle, Cfg, PowBackend, PowOracle, Proof, ProveError,
    Prover, ProverLimits, Result,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const CRATE_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

fn cli() -> Command {
    let challenge = Arg::new("challenge")
        .long("challenge")
        .value_name("HEX")
        .help("32-byte challenge, hex encoded")
        .required(true);
    let proof = Arg::new("proof")
        .long("proof")
        .value_name("HEX")
        .help("SCALE encoded proof, hex encoded")
        .required(true);

    Command::new("PoST Prover")
        .version(env!("CARGO_PKG_VERSION"))
        .about(CRATE_DESCRIPTION)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Location of the config file")
                .default_value("prover_config.yaml"),
        )
        .subcommand_required(true)
        .subcommand(
            Command::new("prove")
                .about("Generates a proof for a challenge")
                .arg(challenge.clone())
                .arg(
                    Arg::new("start-nonce")
                        .long("start-nonce")
                        .value_name("NONCE")
                        .help("First nonce of the first window, a multiple of 16")
                        .value_parser(value_parser!(u32))
                        .default_value("0"),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .value_name("FILE")
                        .help("Writes the SCALE encoded proof to FILE")
                        .value_parser(value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            Command::new("inspect")
                .about("Decodes a proof and lists its label indices")
                .arg(proof.clone())
                .arg(
                    Arg::new("num-labels")
                        .long("num-labels")
                        .value_name("N")
                        .help("Labels in the plot the proof was made for")
                        .value_parser(value_parser!(u64))
                        .required(true),
                )
                .arg(
                    Arg::new("count")
                        .long("count")
                        .value_name("K2")
                        .help("Number of packed indices")
                        .value_parser(value_parser!(usize))
                        .required(true),
                ),
        )
        .subcommand(
            Command::new("check")
                .about("Re-classifies the labels of a proof against the local plot")
                .arg(challenge)
                .arg(proof),
        )
}

fn parse_challenge(hex_str: &str) -> Result<[u8; 32]> {
    let bytes = hex::decode(hex_str.trim_start_matches("0x"))
        .map_err(|e| ProveError::Configuration(format!("invalid challenge: {}", e)))?;
    bytes.as_slice().try_into().map_err(|_| {
        ProveError::Configuration(format!("challenge must be 32 bytes, got {}", bytes.len()))
    })
}

fn parse_proof(hex_str: &str) -> Result<Proof> {
    let bytes = hex::decode(hex_str.trim_start_matches("0x"))
        .map_err(|e| ProveError::Codec(format!("invalid proof hex: {}", e)))?;
    Proof::from_bytes(&bytes)
}

fn arg<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a String> {
    matches
        .get_one::<String>(name)
        .ok_or_else(|| ProveError::Configuration(format!("missing argument --{}", name)))
}

fn new_oracle(backend: PowBackend) -> Result<Arc<dyn PowOracle>> {
    match backend {
        PowBackend::Blake3 => Ok(Arc::new(Blake3Oracle)),
        #[cfg(feature = "randomx")]
        PowBackend::RandomX => {
            let oracle = post_prover::RandomXOracle::new().map_err(|source| {
                ProveError::Oracle { group: 0, source }
            })?;
            Ok(Arc::new(oracle))
        }
        #[cfg(not(feature = "randomx"))]
        PowBackend::RandomX => Err(ProveError::Configuration(
            "built without the `randomx` feature".to_owned(),
        )),
    }
}

fn prove(cfg: &Cfg, matches: &ArgMatches) -> Result<()> {
    let challenge = parse_challenge(arg(matches, "challenge")?)?;
    let start_nonce = matches.get_one::<u32>("start-nonce").copied().unwrap_or(0);

    let prover = Prover::new(&cfg.data_dir, &cfg.proving, new_oracle(cfg.pow_backend)?)?
        .with_nonces(cfg.nonces)?
        .with_batch_size(cfg.batch_size)?
        .with_scan_options(cfg.scan_options())
        .with_limits(ProverLimits {
            max_attempts: cfg.max_attempts(),
            timeout: cfg.timeout(),
        });
    info!(
        "plot: {} units, {} labels, {} workers",
        prover.metadata().num_units,
        prover.num_labels(),
        cfg.scan_options().workers
    );

    let proof = prover.generate_proof(&challenge, start_nonce, &CancellationToken::new())?;
    let wire = proof.to_bytes()?;
    if let Some(path) = matches.get_one::<PathBuf>("output") {
        fs::write(path, &wire).map_err(|e| {
            ProveError::Configuration(format!("failed to write {}: {}", path.display(), e))
        })?;
        info!("proof written to {}", path.display());
    }
    let json = serde_json::to_string_pretty(&proof).map_err(|e| ProveError::Codec(e.to_string()))?;
    println!("{}", json);
    println!("{}", hex::encode(wire));
    Ok(())
}

fn inspect(matches: &ArgMatches) -> Result<()> {
    let proof = parse_proof(arg(matches, "proof")?)?;
    let num_labels = matches.get_one::<u64>("num-labels").copied().unwrap_or(0);
    let count = matches.get_one::<usize>("count").copied().unwrap_or(0);
    let indices = proof.decode_indices(num_labels, count)?;
    println!("nonce:   {}", proof.nonce);
    println!("pow:     {}", proof.pow);
    println!("indices: {:?}", indices);
    Ok(())
}

fn check(cfg: &Cfg, matches: &ArgMatches) -> Result<()> {
    let challenge = parse_challenge(arg(matches, "challenge")?)?;
    let proof = parse_proof(arg(matches, "proof")?)?;
    let checked = check_proof(&proof, &challenge, &cfg.data_dir, &cfg.proving, &SoftAes)?;
    info!("proof ok: {} labels re-classified", checked);
    Ok(())
}

fn run(cfg: &Cfg, matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("prove", sub)) => prove(cfg, sub),
        Some(("inspect", sub)) => inspect(sub),
        Some(("check", sub)) => check(cfg, sub),
        _ => Err(ProveError::Configuration("unknown subcommand".to_owned())),
    }
}

fn main() {
    let matches = cli().get_matches();
    let config = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or("prover_config.yaml");

    let cfg = match load_cfg(Path::new(config)) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };
    let _handle = match logger::init_logger(&cfg) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    info!("PoST Prover {}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&cfg, &matches) {
        error!("{}", e);
        std::process::exit(1);
    }
}
