//! Recipient verification engine: the pure, synchronous core.
//!
//! ```text
//! raw reply ──▶ parser ──▶ ParsedAnalysis ──▶ matcher ──▶ MatchVerdict
//!               (JSON slice)                  (fuzzy scores)
//! ```
//!
//! 1. [`parser`]  — find and decode the JSON object inside the model's reply
//! 2. [`model`]   — typed view over the decoded object, with strict coercion
//! 3. [`fuzzy`]   — token-set similarity used for addresses and identities
//! 4. [`matcher`] — validity, uniqueness and first-recipient label
//!
//! Nothing here performs I/O or holds state; every function may be called
//! concurrently from any thread.

pub mod fuzzy;
pub mod matcher;
pub mod model;
pub mod parser;

pub use fuzzy::token_set_ratio;
pub use matcher::{verify, verify_with_diagnostics};
pub use model::{MatchVerdict, ParsedAnalysis, RecipientRecord};
pub use parser::extract_json;
