//! Command-line front-end definitions.

use crate::models::EncryptionMethod;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "lockzip",
    version,
    about = "Encrypt files and folders into password-protected archives"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Encrypt files or directories into an archive
    Encrypt {
        /// Files and directories to include
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output archive path (.zip for aes256/crypto-zip, .7z for seven-zip)
        #[arg(short, long)]
        output: PathBuf,

        /// Encryption method
        #[arg(short, long, value_enum, default_value_t = EncryptionMethod::Aes256)]
        method: EncryptionMethod,

        /// Password; generated and printed when omitted
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Decrypt an archive into a directory
    Decrypt {
        /// Archive to decrypt (.zip or .7z)
        archive: PathBuf,

        /// Directory to extract into
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Archive password
        #[arg(short, long)]
        password: String,
    },

    /// Classify paths as files or directories
    Inspect {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Generate a strong random password
    Genpass,
}
