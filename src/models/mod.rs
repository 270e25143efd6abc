pub mod entry;
pub mod session;

pub use entry::{FileEntry, InputEntry};
pub use session::{Direction, EncryptionMethod, SessionOutcome, SessionState};
