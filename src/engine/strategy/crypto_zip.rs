//! Legacy ZipCrypto variant: the weak but universally readable stream
//! cipher, kept as the guaranteed-available "basic/compatible" fallback.
//! Wrong passwords are caught early by the per-entry verification bytes.

use super::{read_zip_archive, write_zip_archive, EncryptionStrategy};
use crate::engine::progress::{CancelToken, ProgressSink};
use crate::models::FileEntry;
use crate::utils::error::Result;
use secrecy::{ExposeSecret, SecretString};
use std::path::Path;
use zip::unstable::write::FileOptionsExt;
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;

pub struct CryptoZipStrategy;

impl EncryptionStrategy for CryptoZipStrategy {
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
            .with_deprecated_encryption(password.expose_secret().as_bytes());
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
