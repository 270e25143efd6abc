//! AES-256 zip variant: standard container, per-entry AES-256 (WinZip AE-2,
//! PBKDF2-derived keys with a per-entry random salt and verification word).

use super::{read_zip_archive, write_zip_archive, EncryptionStrategy};
use crate::engine::progress::{CancelToken, ProgressSink};
use crate::models::FileEntry;
use crate::utils::error::Result;
use secrecy::{ExposeSecret, SecretString};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{AesMode, CompressionMethod};

pub struct AesZipStrategy;

impl EncryptionStrategy for AesZipStrategy {
    fn encrypt(
        &self,
        files: &[FileEntry],
        password: &SecretString,
        output_path: &Path,
        sink: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<()> {
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .with_aes_encryption(AesMode::Aes256, password.expose_secret());
        write_zip_archive(files, options, output_path, sink, cancel)
    }

    fn decrypt(
        &self,
        archive_path: &Path,
        password: &SecretString,
        output_dir: &Path,
        sink: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<()> {
        read_zip_archive(archive_path, password, output_dir, sink, cancel)
    }
}
