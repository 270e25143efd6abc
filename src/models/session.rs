use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Encryption scheme for a session, fixed at start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum EncryptionMethod {
    /// Strong per-entry AES-256 encryption in a standard zip container.
    Aes256,
    /// Legacy ZipCrypto stream cipher; weak but readable by nearly every tool.
    CryptoZip,
    /// 7z container with encrypted entry names, via an external 7-Zip executable.
    SevenZip,
}

impl EncryptionMethod {
    pub fn display_name(self) -> &'static str {
        match self {
            EncryptionMethod::Aes256 => "AES-256 zip",
            EncryptionMethod::CryptoZip => "ZipCrypto zip",
            EncryptionMethod::SevenZip => "7z",
        }
    }

    /// File extension the method produces.
    pub fn extension(self) -> &'static str {
        match self {
            EncryptionMethod::Aes256 | EncryptionMethod::CryptoZip => "zip",
            EncryptionMethod::SevenZip => "7z",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Encrypt,
    Decrypt,
}

impl Direction {
    pub fn name(self) -> &'static str {
        match self {
            Direction::Encrypt => "encrypt",
            Direction::Decrypt => "decrypt",
        }
    }
}

/// Controller state; terminal outcomes return the controller to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Validating,
    Running,
}

/// Non-error terminal outcome of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Completed,
    Cancelled,
}
