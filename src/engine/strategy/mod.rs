//! Encryption strategies: one interchangeable variant per
//! [`EncryptionMethod`], dispatched once at session start, plus the shared
//! encrypted-zip container code the two native variants configure.
//!
//! Every variant writes its output to a temporary location first (a temp
//! file beside the target archive, or a hidden staging directory inside the
//! output directory) and renames it into place on success, so cancellation
//! and mid-run failures never leave partial output behind.

mod aes_zip;
mod crypto_zip;
mod seven_zip;

pub use aes_zip::AesZipStrategy;
pub use crypto_zip::CryptoZipStrategy;
pub use seven_zip::SevenZipStrategy;

use crate::engine::progress::{CancelToken, ProgressMeter, ProgressSink};
use crate::models::{EncryptionMethod, FileEntry};
use crate::utils::error::{EngineError, Result};
use secrecy::{ExposeSecret, SecretString};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Component, Path, PathBuf};
use tempfile::NamedTempFile;
use zip::result::ZipError;
use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

/// Cancellation granularity within large files.
const COPY_CHUNK: usize = 64 * 1024;

// Extraction limits carried over from the original product.
const MAX_ENTRY_COUNT: usize = 10_000;
const MAX_TOTAL_BYTES: u64 = 10 * 1024 * 1024 * 1024;

pub trait EncryptionStrategy: Send + Sync {
    fn encrypt(
        &self,
        files: &[FileEntry],
        password: &SecretString,
        output_path: &Path,
        sink: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<()>;

    fn decrypt(
        &self,
        archive_path: &Path,
        password: &SecretString,
        output_dir: &Path,
        sink: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<()>;
}

pub fn for_method(method: EncryptionMethod) -> Box<dyn EncryptionStrategy> {
    match method {
        EncryptionMethod::Aes256 => Box::new(AesZipStrategy),
        EncryptionMethod::CryptoZip => Box::new(CryptoZipStrategy),
        EncryptionMethod::SevenZip => Box::new(SevenZipStrategy),
    }
}

/// Streams `files` into an encrypted zip written beside `output_path` and
/// renamed into place only after `finish` succeeds.
pub(super) fn write_zip_archive(
    files: &[FileEntry],
    options: FileOptions<'_, ()>,
    output_path: &Path,
    sink: &dyn ProgressSink,
    cancel: &CancelToken,
) -> Result<()> {
    let parent = non_empty_parent(output_path);
    let staging = NamedTempFile::new_in(parent)?;
    let mut writer = ZipWriter::new(staging);

    let total: u64 = files.iter().map(|f| f.size).sum();
    let mut meter = ProgressMeter::new(sink, total);

    for file in files {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        writer
            .start_file(file.archive_name.as_str(), options.clone())
            .map_err(map_zip_error)?;
        let mut source = File::open(&file.path)?;
        copy_chunked(&mut source, &mut writer, cancel, &mut meter)?;
    }

    let staging = writer.finish().map_err(map_zip_error)?;
    staging.persist(output_path).map_err(|e| EngineError::Io(e.error))?;
    meter.finish();
    Ok(())
}

/// Extracts an encrypted zip into a hidden staging directory inside
/// `output_dir`, committing only after every entry extracted cleanly.
/// The password is verified against the first file entry's verification
/// field before anything is created on disk.
pub(super) fn read_zip_archive(
    archive_path: &Path,
    password: &SecretString,
    output_dir: &Path,
    sink: &dyn ProgressSink,
    cancel: &CancelToken,
) -> Result<()> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(file).map_err(map_zip_error)?;

    if archive.len() > MAX_ENTRY_COUNT {
        return Err(EngineError::InvalidInput(format!(
            "archive has too many entries (limit {})",
            MAX_ENTRY_COUNT
        )));
    }

    let mut total: u64 = 0;
    let mut first_file_index = None;
    for index in 0..archive.len() {
        let entry = archive.by_index_raw(index).map_err(map_zip_error)?;
        if entry.is_dir() {
            continue;
        }
        if first_file_index.is_none() {
            first_file_index = Some(index);
        }
        total = total.saturating_add(entry.size());
    }
    if total > MAX_TOTAL_BYTES {
        return Err(EngineError::InvalidInput(format!(
            "archive would extract more than {} bytes",
            MAX_TOTAL_BYTES
        )));
    }

    // Fail closed: check the verification field before creating any output.
    if let Some(index) = first_file_index {
        archive
            .by_index_decrypt(index, password.expose_secret().as_bytes())
            .map_err(map_zip_error)?;
    }

    let staging = staging_dir_in(output_dir)?;
    let mut meter = ProgressMeter::new(sink, total);

    for index in 0..archive.len() {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        let mut entry = archive
            .by_index_decrypt(index, password.expose_secret().as_bytes())
            .map_err(map_zip_error)?;
        let raw_path = PathBuf::from(entry.name());
        let Some(dest) = sanitize_extract_path(staging.path(), &raw_path) else {
            return Err(EngineError::InvalidInput(format!(
                "{}: unsafe entry path",
                entry.name()
            )));
        };

        if entry.is_dir() {
            fs::create_dir_all(&dest)?;
            continue;
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&dest)?;
        copy_chunked(&mut entry, &mut out, cancel, &mut meter)?;
    }

    commit_staging(staging.path(), output_dir)?;
    meter.finish();
    Ok(())
}

/// Copies in fixed-size chunks, checking cancellation and ticking progress
/// at each chunk boundary.
pub(super) fn copy_chunked<R: Read + ?Sized, W: Write + ?Sized>(
    source: &mut R,
    dest: &mut W,
    cancel: &CancelToken,
    meter: &mut ProgressMeter<'_>,
) -> Result<()> {
    let mut buf = vec![0u8; COPY_CHUNK];
    loop {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        let read = source.read(&mut buf)?;
        if read == 0 {
            return Ok(());
        }
        dest.write_all(&buf[..read])?;
        meter.add(read as u64);
    }
}

/// Hidden staging directory inside `dir`, so the final move is a rename on
/// the same filesystem. Dropped (and deleted) on any error path.
pub(super) fn staging_dir_in(dir: &Path) -> Result<tempfile::TempDir> {
    tempfile::Builder::new()
        .prefix(".lockzip-")
        .tempdir_in(dir)
        .map_err(EngineError::Io)
}

/// Moves every top-level entry of `staging` into `output_dir`. Conflicts
/// are detected before the first move, so a failed commit changes nothing.
pub(super) fn commit_staging(staging: &Path, output_dir: &Path) -> Result<()> {
    let mut names = Vec::new();
    for entry in fs::read_dir(staging)? {
        names.push(entry?.file_name());
    }
    for name in &names {
        let target = output_dir.join(name);
        if target.exists() {
            return Err(EngineError::InvalidInput(format!(
                "destination already exists: {}",
                target.display()
            )));
        }
    }
    for name in &names {
        fs::rename(staging.join(name), output_dir.join(name))?;
    }
    Ok(())
}

pub(super) fn non_empty_parent(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Strips unsafe components from an archive entry path (Zip Slip guard).
fn sanitize_extract_path(dest_root: &Path, raw_path: &Path) -> Option<PathBuf> {
    let mut clean = PathBuf::new();
    for comp in raw_path.components() {
        match comp {
            Component::Normal(v) => clean.push(v),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    let out = dest_root.join(clean);
    if out.starts_with(dest_root) {
        Some(out)
    } else {
        None
    }
}

fn map_zip_error(error: ZipError) -> EngineError {
    match error {
        ZipError::Io(e) => EngineError::Io(e),
        ZipError::InvalidPassword => EngineError::WrongPassword,
        ZipError::UnsupportedArchive(detail)
            if detail.to_ascii_lowercase().contains("password") =>
        {
            EngineError::WrongPassword
        }
        other => EngineError::InvalidInput(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::progress::NullSink;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn secret(password: &str) -> SecretString {
        SecretString::new(password.to_string())
    }

    fn write_inputs(base: &Path) -> Vec<FileEntry> {
        let a = base.join("a.txt");
        let b_dir = base.join("b");
        fs::create_dir_all(&b_dir).expect("create b");
        fs::write(&a, b"hello").expect("write a");
        fs::write(b_dir.join("c.txt"), b"world").expect("write c");
        vec![
            FileEntry {
                path: a,
                archive_name: "a.txt".to_string(),
                size: 5,
            },
            FileEntry {
                path: b_dir.join("c.txt"),
                archive_name: "b/c.txt".to_string(),
                size: 5,
            },
        ]
    }

    fn read_tree(dir: &Path) -> BTreeMap<String, Vec<u8>> {
        let mut out = BTreeMap::new();
        for entry in walkdir::WalkDir::new(dir) {
            let entry = entry.expect("walk output");
            if entry.file_type().is_file() {
                let rel = entry
                    .path()
                    .strip_prefix(dir)
                    .expect("relative path")
                    .to_string_lossy()
                    .replace('\\', "/");
                out.insert(rel, fs::read(entry.path()).expect("read extracted"));
            }
        }
        out
    }

    fn roundtrip(strategy: &dyn EncryptionStrategy, extension: &str) {
        let temp = tempdir().expect("create tempdir");
        let src = temp.path().join("src");
        fs::create_dir_all(&src).expect("create src");
        let files = write_inputs(&src);
        let archive = temp.path().join(format!("out.{}", extension));
        let cancel = CancelToken::new();

        strategy
            .encrypt(&files, &secret("Tr0ub4dor&3"), &archive, &NullSink, &cancel)
            .expect("encrypt");
        assert!(archive.exists());

        let dest = temp.path().join("dest");
        fs::create_dir_all(&dest).expect("create dest");
        strategy
            .decrypt(&archive, &secret("Tr0ub4dor&3"), &dest, &NullSink, &cancel)
            .expect("decrypt");

        let tree = read_tree(&dest);
        assert_eq!(tree.get("a.txt").map(Vec::as_slice), Some(&b"hello"[..]));
        assert_eq!(tree.get("b/c.txt").map(Vec::as_slice), Some(&b"world"[..]));
        assert_eq!(tree.len(), 2);
    }

    fn wrong_password_fails_closed(strategy: &dyn EncryptionStrategy) {
        let temp = tempdir().expect("create tempdir");
        let src = temp.path().join("src");
        fs::create_dir_all(&src).expect("create src");
        let files = write_inputs(&src);
        let archive = temp.path().join("out.zip");
        let cancel = CancelToken::new();

        strategy
            .encrypt(&files, &secret("correct"), &archive, &NullSink, &cancel)
            .expect("encrypt");

        let dest = temp.path().join("dest");
        fs::create_dir_all(&dest).expect("create dest");
        let result = strategy.decrypt(&archive, &secret("incorrect"), &dest, &NullSink, &cancel);
        assert!(matches!(result, Err(EngineError::WrongPassword)));
        assert_eq!(
            fs::read_dir(&dest).expect("read dest").count(),
            0,
            "wrong password must write zero output files"
        );
    }

    fn cancelled_encrypt_leaves_no_output(strategy: &dyn EncryptionStrategy) {
        let temp = tempdir().expect("create tempdir");
        let src = temp.path().join("src");
        fs::create_dir_all(&src).expect("create src");
        let files = write_inputs(&src);
        let archive = temp.path().join("out.zip");
        let cancel = CancelToken::new();
        cancel.request();

        let result = strategy.encrypt(&files, &secret("pw"), &archive, &NullSink, &cancel);
        assert!(matches!(result, Err(EngineError::Cancelled)));
        assert!(!archive.exists());
        // Temp staging beside the archive must be cleaned up too.
        assert_eq!(fs::read_dir(temp.path()).expect("read dir").count(), 1);
    }

    #[test]
    fn test_aes_zip_roundtrip() {
        roundtrip(&AesZipStrategy, "zip");
    }

    #[test]
    fn test_crypto_zip_roundtrip() {
        roundtrip(&CryptoZipStrategy, "zip");
    }

    #[test]
    fn test_aes_zip_wrong_password_fails_closed() {
        wrong_password_fails_closed(&AesZipStrategy);
    }

    #[test]
    fn test_crypto_zip_wrong_password_fails_closed() {
        wrong_password_fails_closed(&CryptoZipStrategy);
    }

    fn cancelled_decrypt_leaves_no_output(strategy: &dyn EncryptionStrategy) {
        let temp = tempdir().expect("create tempdir");
        let src = temp.path().join("src");
        fs::create_dir_all(&src).expect("create src");
        let files = write_inputs(&src);
        let archive = temp.path().join("out.zip");
        let cancel = CancelToken::new();

        strategy
            .encrypt(&files, &secret("pw"), &archive, &NullSink, &cancel)
            .expect("encrypt");

        let dest = temp.path().join("dest");
        fs::create_dir_all(&dest).expect("create dest");
        cancel.request();
        let result = strategy.decrypt(&archive, &secret("pw"), &dest, &NullSink, &cancel);
        assert!(matches!(result, Err(EngineError::Cancelled)));
        // Nothing new in the output dir, including the hidden staging dir.
        assert_eq!(fs::read_dir(&dest).expect("read dest").count(), 0);
    }

    #[test]
    fn test_aes_zip_cancel_leaves_no_output() {
        cancelled_encrypt_leaves_no_output(&AesZipStrategy);
    }

    #[test]
    fn test_crypto_zip_cancel_leaves_no_output() {
        cancelled_encrypt_leaves_no_output(&CryptoZipStrategy);
    }

    #[test]
    fn test_aes_zip_cancel_decrypt_leaves_no_new_files() {
        cancelled_decrypt_leaves_no_output(&AesZipStrategy);
    }

    #[test]
    fn test_crypto_zip_cancel_decrypt_leaves_no_new_files() {
        cancelled_decrypt_leaves_no_output(&CryptoZipStrategy);
    }

    #[test]
    fn test_cross_method_decrypt_zip_reader_detects_entry_scheme() {
        // A ZipCrypto archive decrypted through the AES strategy works
        // because the container reader detects the per-entry scheme.
        let temp = tempdir().expect("create tempdir");
        let src = temp.path().join("src");
        fs::create_dir_all(&src).expect("create src");
        let files = write_inputs(&src);
        let archive = temp.path().join("out.zip");
        let cancel = CancelToken::new();

        CryptoZipStrategy
            .encrypt(&files, &secret("pw"), &archive, &NullSink, &cancel)
            .expect("encrypt");
        let dest = temp.path().join("dest");
        fs::create_dir_all(&dest).expect("create dest");
        AesZipStrategy
            .decrypt(&archive, &secret("pw"), &dest, &NullSink, &cancel)
            .expect("decrypt");
        assert!(dest.join("a.txt").exists());
    }

    #[test]
    fn test_sanitize_extract_path_blocks_unsafe_paths() {
        let root = PathBuf::from("/tmp/base");
        assert!(sanitize_extract_path(&root, Path::new("ok/file.txt")).is_some());
        assert!(sanitize_extract_path(&root, Path::new("../evil")).is_none());
        assert!(sanitize_extract_path(&root, Path::new("/abs/path")).is_none());
    }

    #[test]
    fn test_commit_staging_rejects_conflicts_without_moving() {
        let temp = tempdir().expect("create tempdir");
        let staging = temp.path().join("staging");
        let out = temp.path().join("out");
        fs::create_dir_all(&staging).expect("create staging");
        fs::create_dir_all(&out).expect("create out");
        fs::write(staging.join("fresh.txt"), b"fresh").expect("write fresh");
        fs::write(staging.join("taken.txt"), b"new").expect("write taken");
        fs::write(out.join("taken.txt"), b"old").expect("write conflict");

        let result = commit_staging(&staging, &out);
        assert!(matches!(result, Err(EngineError::InvalidInput(_))));
        assert!(!out.join("fresh.txt").exists());
        assert_eq!(fs::read(out.join("taken.txt")).expect("read"), b"old");
    }
}
