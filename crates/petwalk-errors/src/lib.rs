//! User-facing error taxonomy for petwalk sessions.
//!
//! Transport failures arrive as reason codes. This crate turns them into a
//! small, fixed set of [`ErrorCategory`] values, each carrying plain-language
//! copy plus two UI policies: whether to offer a retry button, and whether
//! to leave the session screen automatically.
//!
//! ```text
//! transport reason code ──classify()──→ ErrorCategory ──raise()──→ ErrorEvent ──→ subscribers
//! ```

mod category;
mod classify;
mod notifier;
mod probe;

pub use category::{ErrorCategory, ErrorEvent, ErrorPolicy};
pub use classify::{FailureCode, classify};
pub use notifier::{ErrorNotice, ErrorNotifier};
pub use probe::{AlwaysReachable, FlagProbe, NetworkProbe};
