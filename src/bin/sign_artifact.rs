//! Artifact signing utility.
//!
//! ```bash
//! sign_artifact keygen --out-seed <path> [--out-pub <path>] [--force]
//! sign_artifact sign <artifact> --key-file <path> [--serial <n>]
//! ```
//!
//! `sign` writes `manifest.json` (SHA-256 of the artifact) and `model.sig`
//! (Ed25519 over the manifest bytes) next to the artifact. The loader verifies
//! them when `CARDIORISK_TRUSTED_KEY_B64` is set to the printed public key.
//!
//! Seed material is zeroized after use and written with 0600 permissions on Unix.

use std::fs;
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose;
use base64::Engine;
use clap::{Parser, Subcommand};
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use cardiorisk::adapters::artifact_file::{sign_directory, ARTIFACT_FILE};

const KEY_FILE_ENV: &str = "CARDIORISK_SIGNING_KEY_B64_FILE";

#[derive(Parser)]
#[command(name = "sign_artifact", about = "Sign model artifacts for verified loading")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate an Ed25519 signing seed
    Keygen {
        /// Where to write the base64 seed
        #[arg(long)]
        out_seed: PathBuf,

        /// Where to write the base64 public key
        #[arg(long)]
        out_pub: Option<PathBuf>,

        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },

    /// Write a signed manifest for an artifact
    Sign {
        /// Artifact file, or a directory containing model.json
        artifact: PathBuf,

        /// File holding the base64 seed [env: CARDIORISK_SIGNING_KEY_B64_FILE]
        #[arg(long)]
        key_file: Option<PathBuf>,

        /// Monotonic serial; defaults to the current Unix time
        #[arg(long)]
        serial: Option<u64>,
    },
}

#[derive(Zeroize, ZeroizeOnDrop)]
struct Seed([u8; 32]);

fn main() -> Result<()> {
    match Cli::parse().command {
        Command::Keygen {
            out_seed,
            out_pub,
            force,
        } => keygen(&out_seed, out_pub.as_deref(), force),
        Command::Sign {
            artifact,
            key_file,
            serial,
        } => sign(&artifact, key_file, serial),
    }
}

fn keygen(out_seed: &Path, out_pub: Option<&Path>, force: bool) -> Result<()> {
    for path in std::iter::once(out_seed).chain(out_pub) {
        if path.exists() && !force {
            bail!("Refusing to overwrite existing file {path:?}. Use --force.");
        }
    }

    let mut seed = Seed([0u8; 32]);
    OsRng.fill_bytes(&mut seed.0);
    let verifying_key = SigningKey::from_bytes(&seed.0).verifying_key();

    let seed_b64 = Zeroizing::new(general_purpose::STANDARD.encode(seed.0));
    let pub_b64 = general_purpose::STANDARD.encode(verifying_key.as_bytes());

    write_restricted(out_seed, seed_b64.as_bytes(), 0o600)?;
    println!("Wrote signing seed (base64) to {out_seed:?}");

    if let Some(path) = out_pub {
        // Public key is non-secret; allow read access.
        write_restricted(path, pub_b64.as_bytes(), 0o644)?;
        println!("Wrote public key (base64) to {path:?}");
    }
    println!("CARDIORISK_TRUSTED_KEY_B64={pub_b64}");
    Ok(())
}

#[cfg_attr(not(unix), allow(unused_variables))]
fn write_restricted(path: &Path, contents: &[u8], mode: u32) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create {parent:?}"))?;
    }

    let mut opts = fs::OpenOptions::new();
    opts.write(true).create(true).truncate(true);
    #[cfg(unix)]
    opts.mode(mode);

    let mut file = opts
        .open(path)
        .with_context(|| format!("Failed to open {path:?}"))?;
    file.write_all(contents)?;
    file.write_all(b"\n")?;
    Ok(())
}

fn read_seed(key_file: Option<PathBuf>) -> Result<Seed> {
    let path = match key_file {
        Some(p) => p,
        None => std::env::var(KEY_FILE_ENV)
            .map(PathBuf::from)
            .with_context(|| format!("Missing signing key. Pass --key-file or set {KEY_FILE_ENV}"))?,
    };

    let content = Zeroizing::new(
        fs::read_to_string(&path).with_context(|| format!("Failed reading signing key {path:?}"))?,
    );
    let raw = Zeroizing::new(
        general_purpose::STANDARD
            .decode(content.trim())
            .context("Invalid base64 in signing key")?,
    );
    if raw.len() != 32 {
        bail!(
            "Signing key seed must be 32 bytes after base64 decode (got {})",
            raw.len()
        );
    }

    let mut seed = Seed([0u8; 32]);
    seed.0.copy_from_slice(&raw);
    Ok(seed)
}

fn sign(artifact: &Path, key_file: Option<PathBuf>, serial: Option<u64>) -> Result<()> {
    let (dir, name) = if artifact.is_dir() {
        (artifact.to_path_buf(), ARTIFACT_FILE.to_string())
    } else {
        let name = artifact
            .file_name()
            .context("Artifact path has no file name")?
            .to_string_lossy()
            .into_owned();
        let dir = artifact
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        (dir, name)
    };
    if !dir.join(&name).is_file() {
        bail!("No artifact found at {:?}", dir.join(&name));
    }

    let seed = read_seed(key_file)?;
    let signing_key = SigningKey::from_bytes(&seed.0);

    let created_at = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);
    let serial = serial.unwrap_or(created_at.max(1) as u64);

    let manifest = sign_directory(&dir, &[name.as_str()], serial, created_at, &signing_key)
        .context("Failed to sign artifact")?;

    println!("Signed {} file(s) in {dir:?} (serial {})", manifest.files.len(), manifest.serial);
    println!(
        "CARDIORISK_TRUSTED_KEY_B64={}",
        general_purpose::STANDARD.encode(signing_key.verifying_key().as_bytes())
    );
    Ok(())
}
