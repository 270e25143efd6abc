//! Session controller: the state machine around one encrypt/decrypt run.
//!
//! `Idle -> Validating -> Running -> {Completed, Cancelled, Failed}`, with
//! every terminal state returning the controller to `Idle`. Validation is
//! synchronous in the start call and never touches the filesystem output;
//! the run itself executes on a dedicated worker thread. At most one
//! session is active at a time.

use crate::engine::progress::{CancelToken, ProgressSink};
use crate::engine::strategy;
use crate::models::{Direction, EncryptionMethod, InputEntry, SessionOutcome, SessionState};
use crate::system::expand;
use crate::utils::error::{EngineError, Result};
use secrecy::{ExposeSecret, SecretString};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;

const ZIP_MAGIC: [u8; 2] = [0x50, 0x4B];
const SEVENZ_MAGIC: [u8; 6] = [0x37, 0x7A, 0xBC, 0xAF, 0x27, 0x1C];

/// Everything needed to start one encryption run.
pub struct EncryptRequest {
    pub inputs: Vec<InputEntry>,
    pub password: SecretString,
    pub method: EncryptionMethod,
    pub output_path: PathBuf,
}

/// Everything needed to start one decryption run.
pub struct DecryptRequest {
    pub archive_path: PathBuf,
    pub password: SecretString,
    pub output_dir: PathBuf,
}

#[derive(Debug)]
struct Shared {
    state: SessionState,
    cancel: Option<CancelToken>,
}

/// Owns the one-active-session invariant and the cancellation flag.
pub struct SessionController {
    shared: Arc<Mutex<Shared>>,
}

/// Handle to a running session; `wait` resolves to the terminal outcome.
pub struct SessionHandle {
    handle: JoinHandle<Result<SessionOutcome>>,
    cancel: CancelToken,
}

impl SessionHandle {
    /// Blocks until the session reaches its terminal state. Exactly one
    /// terminal outcome is produced per session, and no progress ticks
    /// follow it.
    pub fn wait(self) -> Result<SessionOutcome> {
        self.handle
            .join()
            .map_err(|_| EngineError::Io(std::io::Error::other("session worker panicked")))?
    }

    /// Requests cancellation of this session.
    pub fn cancel(&self) {
        self.cancel.request();
    }
}

impl SessionController {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared {
                state: SessionState::Idle,
                cancel: None,
            })),
        }
    }

    pub fn start_encrypt(
        &self,
        request: EncryptRequest,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<SessionHandle> {
        self.begin()?;
        if let Err(error) = validate_encrypt(&request) {
            self.reset_idle();
            return Err(error);
        }
        Ok(self.spawn(Direction::Encrypt, move |sink, cancel| {
            run_encrypt(&request, sink, cancel)
        }, sink))
    }

    pub fn start_decrypt(
        &self,
        request: DecryptRequest,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<SessionHandle> {
        self.begin()?;
        let method = match validate_decrypt(&request) {
            Ok(method) => method,
            Err(error) => {
                self.reset_idle();
                return Err(error);
            }
        };
        Ok(self.spawn(Direction::Decrypt, move |sink, cancel| {
            run_decrypt(&request, method, sink, cancel)
        }, sink))
    }

    /// Requests cancellation of the active session. No-op when idle.
    pub fn cancel(&self) {
        let shared = self.lock();
        if let Some(token) = &shared.cancel {
            token.request();
        }
    }

    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    /// `Idle -> Validating`, or `SessionBusy`.
    fn begin(&self) -> Result<()> {
        let mut shared = self.lock();
        if shared.state != SessionState::Idle {
            return Err(EngineError::SessionBusy);
        }
        shared.state = SessionState::Validating;
        Ok(())
    }

    fn reset_idle(&self) {
        let mut shared = self.lock();
        shared.state = SessionState::Idle;
        shared.cancel = None;
    }

    fn spawn<F>(&self, direction: Direction, work: F, sink: Arc<dyn ProgressSink>) -> SessionHandle
    where
        F: FnOnce(&dyn ProgressSink, &CancelToken) -> Result<()> + Send + 'static,
    {
        let cancel = CancelToken::new();
        {
            let mut shared = self.lock();
            shared.state = SessionState::Running;
            shared.cancel = Some(cancel.clone());
        }
        log::info!("session started: {}", direction.name());

        let token = cancel.clone();
        let shared = Arc::clone(&self.shared);
        let handle = std::thread::spawn(move || {
            let _guard = IdleGuard(shared);
            let outcome = resolve(work(sink.as_ref(), &token), &token);
            match &outcome {
                Ok(result) => log::info!("session {}: {:?}", direction.name(), result),
                Err(error) => log::warn!("session {} failed: {}", direction.name(), error),
            }
            outcome
        });

        SessionHandle { handle, cancel }
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        match self.shared.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for SessionController {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns the controller to `Idle` when the worker exits for any reason.
struct IdleGuard(Arc<Mutex<Shared>>);

impl Drop for IdleGuard {
    fn drop(&mut self) {
        let mut shared = match self.0.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        shared.state = SessionState::Idle;
        shared.cancel = None;
    }
}

/// Cancellation wins over a concurrent failure: a session whose token was
/// set resolves to `Cancelled` regardless of what the strategy returned.
fn resolve(result: Result<()>, cancel: &CancelToken) -> Result<SessionOutcome> {
    match result {
        Ok(()) => Ok(SessionOutcome::Completed),
        Err(_) if cancel.is_cancelled() => Ok(SessionOutcome::Cancelled),
        Err(EngineError::Cancelled) => Ok(SessionOutcome::Cancelled),
        Err(error) => Err(error),
    }
}

fn validate_encrypt(request: &EncryptRequest) -> Result<()> {
    if request.password.expose_secret().is_empty() {
        return Err(EngineError::InvalidInput(
            "password must not be empty".to_string(),
        ));
    }
    if request.inputs.is_empty() {
        return Err(EngineError::InvalidInput("no input selected".to_string()));
    }
    for entry in &request.inputs {
        // Without following symlinks: a link with a vanished target is
        // still present and gets skipped with a warning during expansion.
        if let Err(e) = fs::symlink_metadata(&entry.path) {
            if e.kind() == std::io::ErrorKind::NotFound {
                return Err(EngineError::NotFound {
                    path: entry.path.clone(),
                });
            }
            return Err(EngineError::Io(e));
        }
    }
    Ok(())
}

/// Checks that the archive is readable and carries a recognized container
/// signature, and picks the strategy that reads it. Zip archives share one
/// reader that detects the per-entry encryption scheme, so `Aes256` covers
/// `CryptoZip` output as well.
fn validate_decrypt(request: &DecryptRequest) -> Result<EncryptionMethod> {
    if !request.output_dir.is_dir() {
        return Err(EngineError::InvalidInput(format!(
            "output directory does not exist: {}",
            request.output_dir.display()
        )));
    }
    let method = detect_archive_method(&request.archive_path)?;

    let mut file = File::open(&request.archive_path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            EngineError::NotFound {
                path: request.archive_path.clone(),
            }
        } else {
            EngineError::Io(e)
        }
    })?;
    let mut magic = [0u8; 6];
    let read = file.read(&mut magic)?;
    let matches = match method {
        EncryptionMethod::SevenZip => read >= SEVENZ_MAGIC.len() && magic == SEVENZ_MAGIC,
        _ => read >= ZIP_MAGIC.len() && magic[..2] == ZIP_MAGIC,
    };
    if !matches {
        return Err(EngineError::InvalidInput(format!(
            "not a recognized {} archive: {}",
            method.extension(),
            request.archive_path.display()
        )));
    }
    Ok(method)
}

fn detect_archive_method(path: &Path) -> Result<EncryptionMethod> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("zip") => Ok(EncryptionMethod::Aes256),
        Some("7z") => Ok(EncryptionMethod::SevenZip),
        _ => Err(EngineError::InvalidInput(format!(
            "unsupported archive format: {}",
            path.display()
        ))),
    }
}

fn run_encrypt(
    request: &EncryptRequest,
    sink: &dyn ProgressSink,
    cancel: &CancelToken,
) -> Result<()> {
    let files = expand::expand(&request.inputs)?;
    if files.is_empty() {
        return Err(EngineError::InvalidInput(
            "selection contains no regular files".to_string(),
        ));
    }
    log::info!(
        "encrypting {} files with {} to {}",
        files.len(),
        request.method.display_name(),
        request.output_path.display()
    );
    strategy::for_method(request.method).encrypt(
        &files,
        &request.password,
        &request.output_path,
        sink,
        cancel,
    )
}

fn run_decrypt(
    request: &DecryptRequest,
    method: EncryptionMethod,
    sink: &dyn ProgressSink,
    cancel: &CancelToken,
) -> Result<()> {
    log::info!(
        "decrypting {} into {}",
        request.archive_path.display(),
        request.output_dir.display()
    );
    strategy::for_method(method).decrypt(
        &request.archive_path,
        &request.password,
        &request.output_dir,
        sink,
        cancel,
    )
}
