use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod dataset;
pub mod error;
pub mod harness;
pub mod report;
pub mod runner;
pub mod schema;
pub mod tool;

pub use error::{BenchError, Result};

/// Block-cipher mode of operation, passed opaquely to the external tool.
#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CipherMode {
    /// Electronic codebook.
    #[value(name = "ECB")]
    Ecb,
    /// Cipher block chaining.
    #[value(name = "CBC")]
    Cbc,
    /// Cipher feedback.
    #[value(name = "CFB")]
    Cfb,
    /// Output feedback.
    #[value(name = "OFB")]
    Ofb,
}

impl CipherMode {
    /// Every mode, in report order.
    pub const ALL: [CipherMode; 4] = [
        CipherMode::Ecb,
        CipherMode::Cbc,
        CipherMode::Cfb,
        CipherMode::Ofb,
    ];

    /// Identifier understood by the external tool's `-m` flag.
    pub fn as_str(&self) -> &'static str {
        match self {
            CipherMode::Ecb => "ECB",
            CipherMode::Cbc => "CBC",
            CipherMode::Cfb => "CFB",
            CipherMode::Ofb => "OFB",
        }
    }
}

impl fmt::Display for CipherMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Encrypt,
    Decrypt,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Encrypt => "Encrypt",
            Direction::Decrypt => "Decrypt",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
