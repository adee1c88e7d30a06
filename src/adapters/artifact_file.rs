//! Artifact file adapter: loads a model artifact from disk.
//!
//! # Layout
//!
//! The path may name the artifact JSON directly or a directory containing
//! `model.json`. The directory may also contain:
//!
//! - `manifest.json`: SHA-256 digests of the bound files, plus serial and
//!   creation time
//! - `model.sig`: Ed25519 signature over the exact manifest bytes
//!
//! # Integrity
//!
//! - With a trusted verifying key configured, manifest and signature are
//!   mandatory and must verify.
//! - With a manifest present, the artifact's digest must match its entry,
//!   whether or not a key is configured.
//! - With neither, the artifact is loaded unverified and a warning is logged.
//!
//! Every failure is a [`ConfigurationError`]: the process must not start with
//! an artifact it cannot trust.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::{ConfigurationError, ModelArtifact, Schema};
use crate::ports::ArtifactSource;

/// Default artifact file name inside a model directory.
pub const ARTIFACT_FILE: &str = "model.json";

/// Signed manifest file name.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Detached Ed25519 signature file name.
pub const SIGNATURE_FILE: &str = "model.sig";

const MANIFEST_VERSION: u32 = 1;

/// Manifest binding artifact files to their SHA-256 digests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub version: u32,
    /// Monotonic serial, e.g. a CI build number
    pub serial: u64,
    /// Unix timestamp (seconds) of signing
    pub created_at: i64,
    /// File name -> lowercase SHA-256 hex
    pub files: BTreeMap<String, String>,
}

/// Artifact stored on the local filesystem.
#[derive(Debug, Clone)]
pub struct ArtifactFile {
    path: PathBuf,
    trusted_key: Option<VerifyingKey>,
}

impl ArtifactFile {
    /// Artifact at `path` (a JSON file or a model directory).
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            trusted_key: None,
        }
    }

    /// Require a manifest signed by `key`.
    #[must_use]
    pub fn with_trusted_key(mut self, key: VerifyingKey) -> Self {
        self.trusted_key = Some(key);
        self
    }

    /// Split the configured path into (directory, artifact file name).
    fn resolve(&self) -> (PathBuf, String) {
        if self.path.is_dir() {
            return (self.path.clone(), ARTIFACT_FILE.to_string());
        }
        let dir = self
            .path
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        let name = self
            .path
            .file_name()
            .map_or_else(|| ARTIFACT_FILE.to_string(), |n| n.to_string_lossy().into_owned());
        (dir, name)
    }

    /// Read and verify the manifest, if one is present or required.
    fn verified_manifest(&self, dir: &Path) -> Result<Option<ArtifactManifest>, ConfigurationError> {
        let manifest_path = dir.join(MANIFEST_FILE);
        let sig_path = dir.join(SIGNATURE_FILE);

        if !manifest_path.exists() {
            if self.trusted_key.is_some() {
                tracing::error!(
                    "Manifest not found at {:?}; a trusted key is configured so signed artifacts are required",
                    manifest_path
                );
                return Err(ConfigurationError::Integrity(
                    "signed manifest required but manifest.json is missing".into(),
                ));
            }
            return Ok(None);
        }

        let manifest_bytes = fs::read(&manifest_path)
            .map_err(|e| ConfigurationError::Integrity(format!("failed to read manifest: {e}")))?;

        if let Some(key) = &self.trusted_key {
            let sig_bytes = fs::read(&sig_path).map_err(|e| {
                ConfigurationError::Integrity(format!("failed to read signature: {e}"))
            })?;
            let sig_bytes: [u8; 64] = sig_bytes.as_slice().try_into().map_err(|_| {
                ConfigurationError::Integrity("invalid signature length (expected 64 bytes)".into())
            })?;
            key.verify(&manifest_bytes, &Signature::from_bytes(&sig_bytes))
                .map_err(|_| ConfigurationError::Integrity("invalid manifest signature".into()))?;
            tracing::info!("Artifact manifest signature verified");
        }

        let manifest: ArtifactManifest = serde_json::from_slice(&manifest_bytes)
            .map_err(|e| ConfigurationError::Integrity(format!("invalid manifest format: {e}")))?;
        if manifest.version != MANIFEST_VERSION {
            return Err(ConfigurationError::Integrity(format!(
                "unsupported manifest version {}",
                manifest.version
            )));
        }

        Ok(Some(manifest))
    }
}

impl ArtifactSource for ArtifactFile {
    fn load(&self, schema: &Schema) -> Result<ModelArtifact, ConfigurationError> {
        let (dir, name) = self.resolve();
        let manifest = self.verified_manifest(&dir)?;

        let artifact_path = dir.join(&name);
        let bytes = fs::read(&artifact_path).map_err(|e| {
            ConfigurationError::Unreadable(format!("{}: {e}", artifact_path.display()))
        })?;
        let digest = sha256_hex(&bytes);

        match &manifest {
            Some(manifest) => {
                let expected = manifest.files.get(&name).ok_or_else(|| {
                    ConfigurationError::Integrity(format!("manifest does not bind {name}"))
                })?;
                if !constant_time_eq_str(expected, &digest) {
                    return Err(ConfigurationError::Integrity(format!(
                        "digest mismatch for {name}"
                    )));
                }
                tracing::info!(
                    "Artifact {} bound by manifest serial {}",
                    name,
                    manifest.serial
                );
            }
            None => tracing::warn!(
                "Loading UNVERIFIED artifact {:?} (no manifest, no trusted key)",
                artifact_path
            ),
        }

        let artifact = ModelArtifact::from_json(&bytes, schema)?;
        tracing::info!(
            "Loaded artifact {:?} (sha256={}, columns={})",
            artifact_path,
            &digest[..12],
            artifact.width()
        );
        Ok(artifact)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Decode a base64 Ed25519 verifying key.
///
/// # Errors
/// Returns `ConfigurationError::Setting` if the value is not 32 bytes of valid key material.
pub fn decode_verifying_key(b64: &str) -> Result<VerifyingKey, ConfigurationError> {
    let invalid = |detail: String| ConfigurationError::Setting {
        name: "trusted key".into(),
        detail,
    };
    let raw = base64::engine::general_purpose::STANDARD
        .decode(b64.trim())
        .map_err(|e| invalid(format!("invalid base64: {e}")))?;
    let bytes: [u8; 32] = raw
        .as_slice()
        .try_into()
        .map_err(|_| invalid(format!("expected 32 bytes, got {}", raw.len())))?;
    VerifyingKey::from_bytes(&bytes).map_err(|_| invalid("not a valid Ed25519 point".into()))
}

/// Lowercase SHA-256 hex digest.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes).iter().map(|b| format!("{b:02x}")).collect()
}

/// Write `manifest.json` and `model.sig` for the given files in `dir`.
///
/// The signature covers the exact manifest bytes written to disk.
///
/// # Errors
/// Returns `ConfigurationError::Integrity` if a file cannot be read or written.
pub fn sign_directory(
    dir: &Path,
    files: &[&str],
    serial: u64,
    created_at: i64,
    signing_key: &SigningKey,
) -> Result<ArtifactManifest, ConfigurationError> {
    let io_err = |what: &str, e: std::io::Error| ConfigurationError::Integrity(format!("{what}: {e}"));

    let mut bound = BTreeMap::new();
    for &name in files {
        let bytes = fs::read(dir.join(name)).map_err(|e| io_err(name, e))?;
        bound.insert(name.to_string(), sha256_hex(&bytes));
    }

    let manifest = ArtifactManifest {
        version: MANIFEST_VERSION,
        serial,
        created_at,
        files: bound,
    };
    let manifest_bytes = serde_json::to_vec_pretty(&manifest)
        .map_err(|e| ConfigurationError::Integrity(format!("failed to serialize manifest: {e}")))?;

    fs::write(dir.join(MANIFEST_FILE), &manifest_bytes).map_err(|e| io_err(MANIFEST_FILE, e))?;
    let signature: Signature = signing_key.sign(&manifest_bytes);
    fs::write(dir.join(SIGNATURE_FILE), signature.to_bytes()).map_err(|e| io_err(SIGNATURE_FILE, e))?;

    Ok(manifest)
}

// Constant-time compare for ASCII strings (used for SHA-256 hex digests).
fn constant_time_eq_str(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes().iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FIXTURE_JSON;
    use rand::rngs::OsRng;
    use tempfile::tempdir;

    fn write_fixture(dir: &Path) {
        fs::write(dir.join(ARTIFACT_FILE), FIXTURE_JSON).expect("write artifact");
    }

    fn signing_key() -> SigningKey {
        SigningKey::generate(&mut OsRng)
    }

    #[test]
    fn test_loads_unsigned_artifact_from_directory() {
        let temp = tempdir().expect("tempdir");
        write_fixture(temp.path());

        let artifact = ArtifactFile::new(temp.path())
            .load(&Schema::standard())
            .expect("Should load");
        assert_eq!(artifact.width(), 20);
    }

    #[test]
    fn test_loads_artifact_by_file_path() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("heart_v2.json");
        fs::write(&path, FIXTURE_JSON).expect("write artifact");

        assert!(ArtifactFile::new(&path).load(&Schema::standard()).is_ok());
    }

    #[test]
    fn test_missing_artifact_is_configuration_error() {
        let temp = tempdir().expect("tempdir");
        let err = ArtifactFile::new(temp.path())
            .load(&Schema::standard())
            .expect_err("must fail");
        assert!(matches!(err, ConfigurationError::Unreadable(_)));
    }

    #[test]
    fn test_signed_artifact_verifies() {
        let temp = tempdir().expect("tempdir");
        write_fixture(temp.path());
        let key = signing_key();
        let manifest = sign_directory(temp.path(), &[ARTIFACT_FILE], 7, 1_700_000_000, &key)
            .expect("Should sign");
        assert_eq!(manifest.files.len(), 1);

        let artifact = ArtifactFile::new(temp.path())
            .with_trusted_key(key.verifying_key())
            .load(&Schema::standard())
            .expect("Should load");
        assert_eq!(artifact.width(), 20);
    }

    #[test]
    fn test_wrong_key_is_rejected() {
        let temp = tempdir().expect("tempdir");
        write_fixture(temp.path());
        sign_directory(temp.path(), &[ARTIFACT_FILE], 1, 0, &signing_key()).expect("Should sign");

        let err = ArtifactFile::new(temp.path())
            .with_trusted_key(signing_key().verifying_key())
            .load(&Schema::standard())
            .expect_err("must fail");
        assert_eq!(
            err,
            ConfigurationError::Integrity("invalid manifest signature".into())
        );
    }

    #[test]
    fn test_tampered_artifact_fails_digest_check() {
        let temp = tempdir().expect("tempdir");
        write_fixture(temp.path());
        sign_directory(temp.path(), &[ARTIFACT_FILE], 1, 0, &signing_key()).expect("Should sign");

        let mut doc: serde_json::Value = serde_json::from_slice(FIXTURE_JSON).expect("json");
        doc["bias"] = serde_json::json!(3.0);
        fs::write(temp.path().join(ARTIFACT_FILE), doc.to_string()).expect("tamper");

        // No trusted key, but the manifest is present and must still match.
        let err = ArtifactFile::new(temp.path())
            .load(&Schema::standard())
            .expect_err("must fail");
        assert!(err.to_string().contains("digest mismatch"));
    }

    #[test]
    fn test_trusted_key_requires_manifest() {
        let temp = tempdir().expect("tempdir");
        write_fixture(temp.path());

        let err = ArtifactFile::new(temp.path())
            .with_trusted_key(signing_key().verifying_key())
            .load(&Schema::standard())
            .expect_err("must fail");
        assert!(matches!(err, ConfigurationError::Integrity(_)));
    }

    #[test]
    fn test_decode_verifying_key() {
        let key = signing_key();
        let b64 = base64::engine::general_purpose::STANDARD.encode(key.verifying_key().to_bytes());
        assert_eq!(
            decode_verifying_key(&b64).expect("Should decode"),
            key.verifying_key()
        );
        assert!(decode_verifying_key("AAAA").is_err());
        assert!(decode_verifying_key("not base64!").is_err());
    }
}
