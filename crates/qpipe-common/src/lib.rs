//! qpipe Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the qpipe workspace.
//!
//! # Overview
//!
//! - **Error Handling**: `QpipeError` and the `Result` alias
//! - **Logging**: tracing subscriber setup shared by every binary
//! - **Naming**: deterministic artifact names derived from enrichment keys
//!
//! # Example
//!
//! ```no_run
//! use qpipe_common::naming::artifact_name;
//!
//! fn main() -> qpipe_common::Result<()> {
//!     let name = artifact_name("United States")?;
//!     assert_eq!(name, "united_states.json");
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;
pub mod naming;

// Re-export commonly used types
pub use error::{QpipeError, Result};
