//! Benchmark corpus generation.
//!
//! The corpus is a single text file of lowercase hexadecimal characters. A
//! target of `size_mb` megabytes is produced from `size_mb * 1 MiB / 2` random
//! bytes, since every byte expands to two hex characters.
//!
//! Without a seed the bytes come from the operating system CSPRNG. With a seed
//! they come from ChaCha8, so repeated campaigns can share an identical corpus.

use rand::rngs::OsRng;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{BenchError, Result};

/// Bytes per megabyte used for corpus sizing and throughput.
pub const BYTES_PER_MB: u64 = 1024 * 1024;

/// Default corpus file name, relative to the working directory.
pub const DEFAULT_CORPUS_FILE: &str = "randomdata.txt";

/// Configuration for corpus generation.
#[derive(Debug, Clone)]
pub struct CorpusConfig {
    /// Target size of the hex text in megabytes.
    pub size_mb: u64,
    /// Destination file. Overwritten if it exists.
    pub path: PathBuf,
    /// Seed for reproducible corpora; `None` draws from the OS.
    pub seed: Option<u64>,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            size_mb: 5,
            path: PathBuf::from(DEFAULT_CORPUS_FILE),
            seed: None,
        }
    }
}

/// Size and digest of a corpus file on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct CorpusMeta {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub size_mb: f64,
    pub sha256: String,
}

/// Number of random bytes needed for `size_mb` megabytes of hex text.
pub fn raw_byte_count(size_mb: u64) -> Result<usize> {
    size_mb
        .checked_mul(BYTES_PER_MB / 2)
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| BenchError::InvalidConfig(format!("corpus size of {size_mb} MB is too large")))
}

/// Generate the hex text for a corpus without touching the filesystem.
pub fn generate_corpus(config: &CorpusConfig) -> Result<String> {
    let mut bytes = vec![0u8; raw_byte_count(config.size_mb)?];
    match config.seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed).fill_bytes(&mut bytes),
        None => OsRng.fill_bytes(&mut bytes),
    }
    Ok(hex::encode(bytes))
}

/// Generate a corpus and write it to `config.path` as a single blob.
pub fn write_corpus(config: &CorpusConfig) -> Result<CorpusMeta> {
    let text = generate_corpus(config)?;
    fs::write(&config.path, text.as_bytes())?;
    Ok(CorpusMeta {
        path: config.path.clone(),
        size_bytes: text.len() as u64,
        size_mb: text.len() as f64 / BYTES_PER_MB as f64,
        sha256: hex::encode(Sha256::digest(text.as_bytes())),
    })
}

/// Read size and digest of an existing corpus.
pub fn read_corpus_meta<P: AsRef<Path>>(path: P) -> Result<CorpusMeta> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    Ok(CorpusMeta {
        path: path.to_path_buf(),
        size_bytes: bytes.len() as u64,
        size_mb: bytes.len() as f64 / BYTES_PER_MB as f64,
        sha256: hex::encode(Sha256::digest(&bytes)),
    })
}

/// True if every character is a lowercase hex digit.
pub fn is_hex_corpus(text: &str) -> bool {
    text.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
