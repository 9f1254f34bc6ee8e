use std::{
    fs::File,
    path::{Path, PathBuf},
    process::ExitCode,
    str::FromStr as _,
};

use ark_bn254::{Bn254, Fr};
use ark_ff::PrimeField as _;
use circom_types::CheckElement;
use circom_types::groth16::{Groth16Proof, PublicSignals, VerificationKey, ZKey};
use clap::{Args, Parser, Subcommand};
use eyre::Context;
use poseidon2::{Poseidon2Hash, utils};
use poseidon2_groth16::{
    circom::{CircomGroth16MaterialBuilder, CircuitInput, Poseidon2Input},
    harness,
    verifier::{VerificationKeyFile, verify_groth16},
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _};

/// Proves the Poseidon2 Circom circuit with Groth16 and verifies the proof. Without a subcommand
/// the circuit is proven for x = 123456789, y = 987654321 and the report is printed as JSON.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None, args_conflicts_with_subcommands = true)]
struct Config {
    #[clap(subcommand)]
    subcommand: Option<SubCommand>,
    #[clap(flatten)]
    run: RunConfig,
}

#[derive(Debug, Subcommand)]
enum SubCommand {
    /// Prove once, verify once, print `{proof, publicSignals, verified}`.
    Run(RunConfig),
    /// Verify a stored snarkjs proof.
    Verify(VerifyConfig),
    /// Write the verification key embedded in a zkey in snarkjs form.
    ExportVk(ExportVkConfig),
    /// Hash field elements or text with the native Poseidon2.
    Hash(HashConfig),
}

#[derive(Debug, Args)]
struct RunConfig {
    /// Path to the compiled circuit.
    #[clap(long, env = "POSEIDON2_WASM", default_value = "poseidon2.wasm")]
    pub wasm: PathBuf,
    /// Path to the snarkjs proving key.
    #[clap(long, env = "POSEIDON2_ZKEY", default_value = "poseidon2_0001.zkey")]
    pub zkey: PathBuf,
    /// Path to the snarkjs verification key.
    #[clap(long, env = "POSEIDON2_VK", default_value = "verification_key.json")]
    pub vk: PathBuf,
    /// Circuit input as JSON, e.g. `{"x": "..", "y": ".."}`. Uses the fixed input if omitted.
    #[clap(long)]
    pub input: Option<PathBuf>,
    /// Also write the proof to this file.
    #[clap(long)]
    pub proof_out: Option<PathBuf>,
    /// Also write the public signals to this file.
    #[clap(long)]
    pub public_out: Option<PathBuf>,
    /// Expected SHA-256 of the zkey. A matching zkey skips point validation.
    #[clap(long)]
    pub zkey_fingerprint: Option<String>,
    /// Expected SHA-256 of the wasm.
    #[clap(long)]
    pub wasm_fingerprint: Option<String>,
}

#[derive(Debug, Args)]
struct VerifyConfig {
    /// Path to the snarkjs verification key.
    #[clap(long, env = "POSEIDON2_VK", default_value = "verification_key.json")]
    pub vk: PathBuf,
    /// Path to the snarkjs proof.
    #[clap(long)]
    pub proof: PathBuf,
    /// Path to the public signals.
    #[clap(long)]
    pub public: PathBuf,
}

#[derive(Debug, Args)]
struct ExportVkConfig {
    /// Path to the snarkjs proving key.
    #[clap(long, env = "POSEIDON2_ZKEY", default_value = "poseidon2_0001.zkey")]
    pub zkey: PathBuf,
    /// Location of the output file. Write to stdout if omitted.
    #[clap(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct HashConfig {
    /// State width of the permutation.
    #[clap(long, default_value_t = 3, value_parser = clap::value_parser!(u16).range(2..))]
    pub width: u16,
    /// Hash the UTF-8 bytes of this text instead of the elements.
    #[clap(long, conflicts_with = "elements")]
    pub text: Option<String>,
    /// Field elements in decimal or `0x` hex.
    pub elements: Vec<String>,
}

fn write_json(path: &Path, value: &impl serde::Serialize) -> eyre::Result<()> {
    let file = File::create(path).with_context(|| format!("while creating {}", path.display()))?;
    serde_json::to_writer_pretty(file, value).context("while writing json")
}

fn run(config: RunConfig) -> eyre::Result<ExitCode> {
    let input: CircuitInput = match &config.input {
        Some(path) => serde_json::from_reader(File::open(path).context("while opening input file")?)
            .context("while parsing circuit input")?,
        None => Poseidon2Input::default().into(),
    };

    let mut builder = CircomGroth16MaterialBuilder::new();
    if let Some(fingerprint) = config.zkey_fingerprint {
        builder = builder.fingerprint_zkey(fingerprint);
    }
    if let Some(fingerprint) = config.wasm_fingerprint {
        builder = builder.fingerprint_wasm(fingerprint);
    }
    let material = builder
        .build_from_paths(&config.zkey, &config.wasm)
        .context("while loading proving material")?;

    let verifier = VerificationKeyFile::new(config.vk);
    let report = harness::run(&material, &verifier, &input)?;

    if let Some(path) = config.proof_out {
        write_json(&path, &report.proof)?;
    }
    if let Some(path) = config.public_out {
        write_json(&path, &report.public_signals)?;
    }
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(ExitCode::SUCCESS)
}

fn verify(config: VerifyConfig) -> eyre::Result<ExitCode> {
    let VerifyConfig { vk, proof, public } = config;
    let vk = VerificationKey::from_path(vk).context("while reading verification key")?;
    let proof = Groth16Proof::from_path(proof).context("while reading proof")?;
    let public = PublicSignals::<Fr>::from_path(public).context("while reading public signals")?;

    if verify_groth16(&vk, &public, &proof)? {
        println!("valid proof");
        Ok(ExitCode::SUCCESS)
    } else {
        println!("invalid proof");
        Ok(ExitCode::FAILURE)
    }
}

fn export_vk(config: ExportVkConfig) -> eyre::Result<ExitCode> {
    let ExportVkConfig { zkey, output } = config;
    let zkey = ZKey::<Bn254>::from_path(zkey, CheckElement::Yes).context("while parsing zkey")?;
    let vk = VerificationKey::from(zkey.pk.vk);
    if let Some(output) = output {
        write_json(&output, &vk)?;
    } else {
        println!("{}", serde_json::to_string_pretty(&vk)?);
    }
    Ok(ExitCode::SUCCESS)
}

fn hash(config: HashConfig) -> eyre::Result<ExitCode> {
    let HashConfig {
        width,
        text,
        elements,
    } = config;
    let elements = match text {
        Some(text) => utils::str_to_elements(&text),
        None => elements
            .iter()
            .map(|s| {
                if s.starts_with("0x") || s.starts_with("0X") {
                    utils::hex_to_field(s).with_context(|| format!("invalid element {s:?}"))
                } else {
                    Fr::from_str(s).map_err(|_| eyre::eyre!("invalid element {s:?}"))
                }
            })
            .collect::<eyre::Result<Vec<_>>>()?,
    };
    let digest = Poseidon2Hash::new(usize::from(width)).hash_variable(&elements);
    println!("{}", digest.into_bigint());
    println!("{}", utils::field_to_hex(&digest));
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let config = Config::parse();

    let filter_layer = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("poseidon2_groth16=info,poseidon2_zk=info"));
    let fmt_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);
    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();

    let result = match config.subcommand {
        None => run(config.run),
        Some(SubCommand::Run(config)) => run(config),
        Some(SubCommand::Verify(config)) => verify(config),
        Some(SubCommand::ExportVk(config)) => export_vk(config),
        Some(SubCommand::Hash(config)) => hash(config),
    };
    result.unwrap_or_else(|err| {
        tracing::error!("{err:?}");
        ExitCode::FAILURE
    })
}
