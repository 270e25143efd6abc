//! LockZip: a password-protected archive encryption engine.
//!
//! Encrypts file and directory selections into `.zip` (AES-256 or legacy
//! ZipCrypto) or `.7z` (external 7-Zip, encrypted entry names) archives and
//! decrypts them back, streaming data in bounded chunks, reporting throttled
//! 0-100 progress, honoring cooperative cancellation, and guaranteeing that
//! no non-success outcome leaves partial output on disk.
//!
//! The presentation layer is a collaborator, not part of this crate's
//! concern: it drives the [`Engine`] command surface and implements
//! [`ProgressSink`] for its own display. The bundled binary is a minimal
//! CLI doing exactly that.

pub mod cli;
pub mod engine;
pub mod models;
pub mod system;
pub mod utils;

pub use engine::progress::{CancelToken, NullSink, ProgressSink};
pub use engine::session::{DecryptRequest, EncryptRequest, SessionHandle};
pub use engine::Engine;
pub use models::{EncryptionMethod, FileEntry, InputEntry, SessionOutcome, SessionState};
pub use utils::error::{EngineError, Result};
