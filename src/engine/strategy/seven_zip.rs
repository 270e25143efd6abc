//! 7z variant: always delegates to an external 7-Zip executable, which is
//! the only scheme here that also encrypts entry names (`-mhe=on`).
//!
//! Encryption stages the inputs into a temp tree laid out by archive name,
//! reported as 0-50%, then maps the tool's own progress onto 50-100%.

use super::{commit_staging, copy_chunked, non_empty_parent, staging_dir_in, EncryptionStrategy};
use crate::engine::progress::{CancelToken, ProgressMeter, ProgressSink};
use crate::models::FileEntry;
use crate::system::tool::SevenZipTool;
use crate::utils::error::{EngineError, Result};
use secrecy::{ExposeSecret, SecretString};
use std::ffi::OsString;
use std::fs::{self, File};
use std::path::Path;

pub struct SevenZipStrategy;

impl EncryptionStrategy for SevenZipStrategy {
    fn encrypt(
        &self,
        files: &[FileEntry],
        password: &SecretString,
        output_path: &Path,
        sink: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<()> {
        let tool = SevenZipTool::locate()?;

        let staging = tempfile::Builder::new()
            .prefix("lockzip-7z-")
            .tempdir()
            .map_err(EngineError::Io)?;
        let total: u64 = files.iter().map(|f| f.size).sum();
        let mut meter = ProgressMeter::scaled(sink, total, 0, 50);
        for file in files {
            if cancel.is_cancelled() {
                return Err(EngineError::Cancelled);
            }
            let dest = staging.path().join(&file.archive_name);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut source = File::open(&file.path)?;
            let mut out = File::create(&dest)?;
            copy_chunked(&mut source, &mut out, cancel, &mut meter)?;
        }
        meter.finish();

        // The tool writes into a scratch dir beside the target, renamed in
        // only on success.
        let scratch = staging_dir_in(non_empty_parent(output_path))?;
        let archive_name = output_path
            .file_name()
            .ok_or_else(|| {
                EngineError::InvalidInput(format!(
                    "output path has no file name: {}",
                    output_path.display()
                ))
            })?
            .to_os_string();
        let scratch_archive = scratch.path().join(&archive_name);

        let mut names = Vec::new();
        for entry in fs::read_dir(staging.path())? {
            names.push(entry?.file_name());
        }
        let args = compress_args(password, &scratch_archive, &names);

        let mut meter = ProgressMeter::scaled(sink, 100, 50, 100);
        tool.run(
            &args,
            Some(staging.path()),
            &mut |percent| meter.set(u64::from(percent)),
            cancel,
        )?;

        if output_path.exists() {
            fs::remove_file(output_path)?;
        }
        fs::rename(&scratch_archive, output_path)?;
        meter.finish();
        Ok(())
    }

    fn decrypt(
        &self,
        archive_path: &Path,
        password: &SecretString,
        output_dir: &Path,
        sink: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<()> {
        let tool = SevenZipTool::locate()?;
        let staging = staging_dir_in(output_dir)?;

        let args = extract_args(password, archive_path, staging.path());

        let mut meter = ProgressMeter::new(sink, 100);
        tool.run(
            &args,
            None,
            &mut |percent| meter.set(u64::from(percent)),
            cancel,
        )?;

        commit_staging(staging.path(), output_dir)?;
        meter.finish();
        Ok(())
    }
}

/// `a` invocation; `--` ends switch parsing so staged file names starting
/// with `-` are never read as switches.
fn compress_args(password: &SecretString, archive: &Path, names: &[OsString]) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "a".into(),
        "-t7z".into(),
        "-mhe=on".into(),
        "-bsp1".into(),
        "-bso0".into(),
        "-y".into(),
        password_arg(password),
        "--".into(),
        archive.as_os_str().to_os_string(),
    ];
    args.extend(names.iter().cloned());
    args
}

fn extract_args(password: &SecretString, archive: &Path, dest: &Path) -> Vec<OsString> {
    let mut dest_arg = OsString::from("-o");
    dest_arg.push(dest);
    vec![
        "x".into(),
        "-bsp1".into(),
        "-bso0".into(),
        "-y".into(),
        password_arg(password),
        dest_arg,
        "--".into(),
        archive.as_os_str().to_os_string(),
    ]
}

fn password_arg(password: &SecretString) -> OsString {
    let mut arg = OsString::from("-p");
    arg.push(password.expose_secret());
    arg
}
