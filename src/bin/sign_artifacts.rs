//! Manifest and signature writer for a Glucorisk model directory.
//!
//! Hashes `scaler.json` and `model.json` into `manifest.json`. Given an
//! Ed25519 seed, also writes `model.sig` over the manifest bytes.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin sign_artifacts -- <model_dir> [--new-seed <path>] [--force]
//! ```
//!
//! The seed is read from the file named by `GLUCORISK_SIGNING_KEY_B64_FILE`
//! (base64, 32 bytes). `--new-seed` generates a fresh seed instead, writes it
//! to `<path>` with 0600 permissions and signs with it. Without either the
//! manifest is written unsigned.

use std::env;
use std::fs;
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use base64::engine::general_purpose;
use base64::Engine;
use ed25519_dalek::{Signer, SigningKey};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use glucorisk::adapters::artifacts::{ArtifactManifest, MANIFEST_FILE, SIGNATURE_FILE};

const KEY_FILE_ENV: &str = "GLUCORISK_SIGNING_KEY_B64_FILE";

#[derive(Zeroize, ZeroizeOnDrop)]
struct Seed([u8; 32]);

struct Args {
    model_dir: PathBuf,
    new_seed: Option<PathBuf>,
    force: bool,
}

fn usage() -> anyhow::Error {
    anyhow!("Usage: sign_artifacts <model_dir> [--new-seed <path>] [--force]")
}

fn parse_args() -> Result<Args> {
    let mut args = env::args().skip(1);
    let mut model_dir = None;
    let mut new_seed = None;
    let mut force = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--new-seed" => new_seed = Some(PathBuf::from(args.next().ok_or_else(usage)?)),
            "--force" => force = true,
            "-h" | "--help" => return Err(usage()),
            _ if model_dir.is_none() => model_dir = Some(PathBuf::from(arg)),
            _ => return Err(usage()),
        }
    }

    Ok(Args {
        model_dir: model_dir.ok_or_else(usage)?,
        new_seed,
        force,
    })
}

fn decode_seed(b64: &str) -> Result<Seed> {
    let raw = Zeroizing::new(
        general_purpose::STANDARD
            .decode(b64.trim())
            .context("Invalid base64 in signing seed")?,
    );
    let bytes: [u8; 32] = raw
        .as_slice()
        .try_into()
        .map_err(|_| anyhow!("Signing seed must be 32 bytes (got {})", raw.len()))?;
    Ok(Seed(bytes))
}

fn read_seed_file(path: &Path) -> Result<Seed> {
    let content = Zeroizing::new(
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?,
    );
    if content.trim().is_empty() {
        bail!("Empty signing seed in {}", path.display());
    }
    decode_seed(&content)
}

fn write_new_seed(path: &Path, force: bool) -> Result<Seed> {
    if path.exists() && !force {
        bail!("Refusing to overwrite {}. Use --force.", path.display());
    }

    let mut seed = Seed([0u8; 32]);
    OsRng.fill_bytes(&mut seed.0);
    let encoded = Zeroizing::new(general_purpose::STANDARD.encode(seed.0));

    let mut opts = fs::OpenOptions::new();
    opts.write(true).create(true).truncate(true);
    #[cfg(unix)]
    opts.mode(0o600);

    let mut file = opts
        .open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    file.write_all(encoded.as_bytes())?;
    file.write_all(b"\n")?;

    println!("Wrote signing seed (base64) to {}", path.display());
    Ok(seed)
}

fn main() -> Result<()> {
    let args = parse_args()?;

    let seed = match (&args.new_seed, env::var(KEY_FILE_ENV)) {
        (Some(path), _) => Some(write_new_seed(path, args.force)?),
        (None, Ok(path)) => Some(read_seed_file(Path::new(path.trim()))?),
        (None, Err(_)) => None,
    };

    let manifest = ArtifactManifest::for_directory(&args.model_dir)?;
    let manifest_bytes = manifest.to_bytes()?;
    let manifest_path = args.model_dir.join(MANIFEST_FILE);
    fs::write(&manifest_path, &manifest_bytes)
        .with_context(|| format!("Failed to write {}", manifest_path.display()))?;
    println!("Wrote manifest: {}", manifest_path.display());
    for (name, digest) in &manifest.files {
        println!("  {name} sha256={digest}");
    }

    let sig_path = args.model_dir.join(SIGNATURE_FILE);
    match seed {
        Some(seed) => {
            let signing_key = SigningKey::from_bytes(&seed.0);
            let signature = signing_key.sign(&manifest_bytes);
            fs::write(&sig_path, signature.to_bytes())
                .with_context(|| format!("Failed to write {}", sig_path.display()))?;
            println!("Wrote signature: {}", sig_path.display());
            println!(
                "GLUCORISK_TRUSTED_KEY_B64={}",
                general_purpose::STANDARD.encode(signing_key.verifying_key().as_bytes())
            );
        }
        None => {
            if sig_path.exists() {
                fs::remove_file(&sig_path)
                    .with_context(|| format!("Failed to remove stale {}", sig_path.display()))?;
                println!("Removed stale signature: {}", sig_path.display());
            }
            println!("No signing seed given; manifest is unsigned");
        }
    }

    Ok(())
}
