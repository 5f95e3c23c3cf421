//! GPG-encrypted file store
//!
//! Same whole-collection layout as the local store, but the file on disk is
//! ciphertext. Encryption itself is delegated to a `Cipher`; `GpgCli` shells
//! out to the `gpg` binary.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use super::file::{atomic_write, ensure_dir, read_if_exists, FileLock};
use super::records;
use super::traits::{Store, StoreError, StoreResult};
use crate::logging::file_logger as log;
use crate::types::{Config, ConfigInput};

/// Encrypts and decrypts whole store files
pub trait Cipher: Send + Sync {
    fn name(&self) -> &str;

    fn encrypt(&self, plaintext: &[u8]) -> StoreResult<Vec<u8>>;

    fn decrypt(&self, ciphertext: &[u8]) -> StoreResult<Vec<u8>>;
}

/// Cipher backed by the `gpg` command line tool
///
/// Runs in batch mode, so decryption relies on gpg-agent for the passphrase.
/// Without a recipient, files are encrypted to the default key.
#[derive(Debug, Clone)]
pub struct GpgCli {
    binary: PathBuf,
    recipient: Option<String>,
}

impl Default for GpgCli {
    fn default() -> Self {
        Self::new()
    }
}

impl GpgCli {
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from("gpg"),
            recipient: None,
        }
    }

    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.recipient = Some(recipient.into());
        self
    }

    fn run(&self, args: &[&str], input: &[u8]) -> StoreResult<Vec<u8>> {
        let mut child = Command::new(&self.binary)
            .args(["--batch", "--yes", "--quiet"])
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| StoreError::Cipher(format!("failed to run {}: {}", self.binary.display(), e)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| StoreError::Cipher("gpg stdin is not piped".to_string()))?;

        // stdin is fed from its own thread while stdout and stderr drain here;
        // either pipe filling up would otherwise stall both processes.
        let (written, output) = thread::scope(|scope| {
            let feeder = scope.spawn(move || stdin.write_all(input));
            let output = child.wait_with_output();
            (feeder.join(), output)
        });

        let output = output?;
        if !output.status.success() {
            return Err(StoreError::Cipher(format!(
                "gpg exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        match written {
            Ok(result) => result?,
            Err(_) => return Err(StoreError::Cipher("gpg stdin writer panicked".to_string())),
        }
        Ok(output.stdout)
    }
}

impl Cipher for GpgCli {
    fn name(&self) -> &str {
        "gpg"
    }

    fn encrypt(&self, plaintext: &[u8]) -> StoreResult<Vec<u8>> {
        match &self.recipient {
            Some(recipient) => self.run(&["--encrypt", "--recipient", recipient.as_str()], plaintext),
            None => self.run(&["--encrypt", "--default-recipient-self"], plaintext),
        }
    }

    fn decrypt(&self, ciphertext: &[u8]) -> StoreResult<Vec<u8>> {
        self.run(&["--decrypt"], ciphertext)
    }
}

/// Options for opening a GPG store
#[derive(Clone)]
pub struct GpgStoreOptions {
    /// Encrypted store file; its directory is created if missing
    pub path: PathBuf,
    pub cipher: Arc<dyn Cipher>,
}

impl GpgStoreOptions {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cipher: Arc::new(GpgCli::new()),
        }
    }

    pub fn with_cipher(mut self, cipher: Arc<dyn Cipher>) -> Self {
        self.cipher = cipher;
        self
    }
}

/// Store that keeps the whole collection in one encrypted file
pub struct GpgStore {
    path: PathBuf,
    cipher: Arc<dyn Cipher>,
    guard: Mutex<()>,
}

impl GpgStore {
    /// Open a store, decrypting any existing file to prove the key works
    pub fn open(options: GpgStoreOptions) -> StoreResult<Self> {
        if options.path.as_os_str().is_empty() {
            return Err(StoreError::configuration("invalid parameter: file path is required for gpg"));
        }
        if let Some(dir) = options.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_dir(dir)?;
        }

        let store = Self {
            path: options.path,
            cipher: options.cipher,
            guard: Mutex::new(()),
        };
        store.read()?;
        log::debug(
            "GpgStore",
            &format!("opened {} with cipher {}", store.path.display(), store.cipher.name()),
        );
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> StoreResult<Vec<Config>> {
        let Some(ciphertext) = read_if_exists(&self.path)? else {
            return Ok(Vec::new());
        };
        if ciphertext.is_empty() {
            return Ok(Vec::new());
        }
        let plaintext = self.cipher.decrypt(&ciphertext)?;
        records::decode(&plaintext, &self.path)
    }

    fn write(&self, configs: &[Config]) -> StoreResult<()> {
        let ciphertext = self.cipher.encrypt(&records::encode(configs)?)?;
        atomic_write(&self.path, &ciphertext)
    }

    fn modify<T>(&self, change: impl FnOnce(&mut Vec<Config>) -> StoreResult<T>) -> StoreResult<T> {
        let _held = self.guard.lock();
        let _lock = FileLock::acquire(&self.path)?;

        let mut configs = self.read()?;
        let result = change(&mut configs)?;
        self.write(&configs)?;
        Ok(result)
    }

    fn snapshot(&self) -> StoreResult<Vec<Config>> {
        let _held = self.guard.lock();
        let _lock = FileLock::acquire(&self.path)?;
        self.read()
    }
}

impl std::fmt::Debug for GpgStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpgStore")
            .field("path", &self.path)
            .field("cipher", &self.cipher.name())
            .finish()
    }
}

#[async_trait]
impl Store for GpgStore {
    fn name(&self) -> &str {
        "gpg"
    }

    async fn put_many(&self, inputs: Vec<ConfigInput>) -> StoreResult<()> {
        if inputs.is_empty() {
            return Ok(());
        }
        self.modify(|configs| records::apply_put(configs, &inputs, Utc::now(), &self.path))
    }

    async fn get_many(&self, inputs: &[ConfigInput]) -> StoreResult<Vec<Config>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        Ok(records::select(&self.snapshot()?, inputs))
    }

    async fn get_by_path(&self, prefix: &str) -> StoreResult<Vec<Config>> {
        Ok(records::by_prefix(&self.snapshot()?, prefix))
    }

    async fn delete_many(&self, inputs: &[ConfigInput]) -> StoreResult<()> {
        if inputs.is_empty() {
            return Ok(());
        }
        self.modify(|configs| Ok(records::apply_delete(configs, inputs)))
            .map(|_| ())
    }
}
