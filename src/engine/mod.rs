//! The archive encryption engine: command surface, session control,
//! progress plumbing and the encryption strategies.

pub mod progress;
pub mod session;
pub mod strategy;

use crate::models::{InputEntry, SessionState};
use crate::system::expand;
use crate::utils::error::Result;
use crate::utils::password;
use progress::ProgressSink;
use session::{DecryptRequest, EncryptRequest, SessionController, SessionHandle};
use std::path::PathBuf;
use std::sync::Arc;

/// The command surface the presentation layer drives.
///
/// `start_*` and `cancel` are non-blocking; progress flows through the
/// caller's [`ProgressSink`] and the terminal outcome through
/// [`SessionHandle::wait`]. `generate_password` and `inspect_paths` are
/// short synchronous queries with no shared mutable state.
pub struct Engine {
    controller: SessionController,
}

impl Engine {
    pub fn new() -> Self {
        Self {
            controller: SessionController::new(),
        }
    }

    pub fn start_encrypt(
        &self,
        request: EncryptRequest,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<SessionHandle> {
        self.controller.start_encrypt(request, sink)
    }

    pub fn start_decrypt(
        &self,
        request: DecryptRequest,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<SessionHandle> {
        self.controller.start_decrypt(request, sink)
    }

    /// Requests cancellation of the active session; no-op when idle.
    pub fn cancel(&self) {
        self.controller.cancel();
    }

    pub fn state(&self) -> SessionState {
        self.controller.state()
    }

    /// Produces a strong random password.
    pub fn generate_password(&self) -> String {
        password::generate()
    }

    /// Classifies paths as files or directories without expanding them.
    pub fn inspect_paths(&self, paths: &[PathBuf]) -> Vec<InputEntry> {
        expand::inspect_paths(paths)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
