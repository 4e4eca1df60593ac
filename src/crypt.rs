//! Encryption collaborator for the encrypt plugin.
//!
//! One passphrase protects the whole repository. The derived key is checked
//! against a verifier file under `.plugins/encrypt/passwd` (a random salt
//! plus an AES-GCM-sealed marker), lives only in process memory and is
//! memoized for a single invocation. Password rotation re-encrypts each
//! at-rest file atomically (temp + rename) but is deliberately not
//! transactional across the batch: an interruption leaves already-rotated
//! files valid under the new passphrase and the rest valid under the old one.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use anyhow::{Context, Result, bail};
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::prompt::Prompt;
use crate::{DOTFILES_DIR, PLUGINS_DIR};

/// Verifier file name under the encrypt plugin's private state directory.
pub const VERIFIER_FILE: &str = "passwd";

/// Salt length prepended to the verifier file.
const SALT_LEN: usize = 16;

/// AES-GCM nonce length prepended to every ciphertext.
const NONCE_LEN: usize = 12;

/// Known plaintext sealed into the verifier file.
const VERIFIER_MARKER: &[u8] = b"dotsync passphrase verifier v1";

/// Key-derivation rounds. Iterated SHA-256 over salt and passphrase.
const KDF_ROUNDS: u32 = 65_536;

/// A derived symmetric cipher. Cheap to clone; the key never leaves memory.
#[derive(Clone)]
pub struct Cipher {
    key: [u8; 32],
}

impl Cipher {
    /// Derives a cipher from a passphrase and per-repository salt.
    #[must_use]
    pub fn derive(passphrase: &str, salt: &[u8]) -> Self {
        let mut digest = [0u8; 32];
        let mut hasher = Sha256::new();
        hasher.update(salt);
        hasher.update(passphrase.as_bytes());
        digest.copy_from_slice(&hasher.finalize());
        for _ in 1..KDF_ROUNDS {
            let mut hasher = Sha256::new();
            hasher.update(digest);
            hasher.update(salt);
            digest.copy_from_slice(&hasher.finalize());
        }
        Self { key: digest }
    }

    /// Encrypts `plaintext`, returning `nonce || ciphertext` with a fresh
    /// random nonce.
    ///
    /// # Errors
    /// Returns an error if encryption fails.
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let cipher = Aes256Gcm::new((&self.key).into());
        let mut nonce = [0u8; NONCE_LEN];
        rand::rng().fill_bytes(&mut nonce);
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|_| anyhow::anyhow!("encryption failed"))?;
        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    /// Decrypts data produced by [`Cipher::seal`].
    ///
    /// # Errors
    /// Fails on truncated input or when the key does not match (GCM
    /// authentication failure).
    pub fn open(&self, data: &[u8]) -> Result<Vec<u8>> {
        if data.len() < NONCE_LEN {
            bail!("ciphertext is truncated");
        }
        let (nonce, ciphertext) = data.split_at(NONCE_LEN);
        let cipher = Aes256Gcm::new((&self.key).into());
        cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| anyhow::anyhow!("decryption failed: wrong passphrase or corrupt data"))
    }
}

/// Path to the encrypt plugin's private state directory.
#[must_use]
pub fn state_dir(repo: &Path) -> PathBuf {
    repo.join(PLUGINS_DIR).join("encrypt")
}

/// Path to the passphrase verifier file.
#[must_use]
pub fn verifier_path(repo: &Path) -> PathBuf {
    state_dir(repo).join(VERIFIER_FILE)
}

fn write_verifier(repo: &Path, salt: &[u8], cipher: &Cipher) -> Result<()> {
    let mut data = salt.to_vec();
    data.extend_from_slice(&cipher.seal(VERIFIER_MARKER)?);
    crate::utils::atomic_write(&verifier_path(repo), &data)
}

fn load_verifier(repo: &Path) -> Result<(Vec<u8>, Vec<u8>)> {
    let data = std::fs::read(verifier_path(repo)).context("Failed to read passphrase verifier")?;
    if data.len() <= SALT_LEN {
        bail!("passphrase verifier is corrupt");
    }
    let (salt, sealed) = data.split_at(SALT_LEN);
    Ok((salt.to_vec(), sealed.to_vec()))
}

/// Per-invocation cache of the repository cipher.
#[derive(Default)]
pub struct SecretStore {
    cached: RefCell<Option<Cipher>>,
}

impl SecretStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the repository cipher, prompting for the passphrase on first
    /// use. When no verifier exists yet, a new passphrase is set up and the
    /// verifier written.
    ///
    /// # Errors
    /// Fails when the passphrase does not verify or prompting fails.
    pub fn cipher(&self, repo: &Path, prompt: &dyn Prompt) -> Result<Cipher> {
        if let Some(cipher) = self.cached.borrow().as_ref() {
            return Ok(cipher.clone());
        }

        let cipher = if verifier_path(repo).exists() {
            let (salt, sealed) = load_verifier(repo)?;
            let passphrase = prompt.secret("Repository passphrase: ")?;
            let cipher = Cipher::derive(&passphrase, &salt);
            cipher
                .open(&sealed)
                .context("incorrect repository passphrase")?;
            debug!("passphrase verified");
            cipher
        } else {
            let passphrase = prompt.secret("Set repository passphrase: ")?;
            if passphrase.is_empty() {
                bail!("passphrase must not be empty");
            }
            let mut salt = [0u8; SALT_LEN];
            rand::rng().fill_bytes(&mut salt);
            let cipher = Cipher::derive(&passphrase, &salt);
            write_verifier(repo, &salt, &cipher)?;
            info!("repository passphrase initialized");
            cipher
        };

        *self.cached.borrow_mut() = Some(cipher.clone());
        Ok(cipher)
    }

    /// Changes the repository passphrase, re-encrypting every regular file
    /// under `dotfiles/encrypt/` with a fresh salt and key. Each rewrite is
    /// atomic; the batch is not.
    ///
    /// # Errors
    /// Fails when the current passphrase does not verify, the new
    /// passphrases do not match, or a file cannot be rewritten.
    pub fn rotate(&self, repo: &Path, prompt: &dyn Prompt) -> Result<usize> {
        let old_cipher = if verifier_path(repo).exists() {
            Some(self.cipher(repo, prompt)?)
        } else {
            None
        };

        let passphrase = prompt.secret("New repository passphrase: ")?;
        if passphrase.is_empty() {
            bail!("passphrase must not be empty");
        }
        let confirmation = prompt.secret("Confirm new passphrase: ")?;
        if passphrase != confirmation {
            bail!("passphrases do not match");
        }

        let mut salt = [0u8; SALT_LEN];
        rand::rng().fill_bytes(&mut salt);
        let new_cipher = Cipher::derive(&passphrase, &salt);

        let mut rotated = 0;
        if let Some(old_cipher) = old_cipher {
            let encrypt_root = repo.join(DOTFILES_DIR).join("encrypt");
            if encrypt_root.is_dir() {
                for dir_entry in WalkDir::new(&encrypt_root).follow_links(false) {
                    let dir_entry = dir_entry.context("Failed to walk encrypt tree")?;
                    // Secondary categories are symlinks to the master; only
                    // the master holds ciphertext.
                    if !dir_entry.file_type().is_file() {
                        continue;
                    }
                    let path = dir_entry.path();
                    let plaintext = old_cipher
                        .open(&std::fs::read(path)?)
                        .with_context(|| format!("Failed to decrypt {}", path.display()))?;
                    crate::utils::atomic_write(path, &new_cipher.seal(&plaintext)?)?;
                    rotated += 1;
                    debug!("re-encrypted {}", path.display());
                }
            }
        }

        write_verifier(repo, &salt, &new_cipher)?;
        *self.cached.borrow_mut() = Some(new_cipher);
        Ok(rotated)
    }
}
