//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Measurement time comes from the source row (`Date` + `Time` columns)
//! - `uploaded_at` is local wall-clock time taken when a row is mapped

mod config;
mod delivery;
mod error;
mod record;
mod status;
mod transport;

pub use config::*;
pub use delivery::*;
pub use error::*;
pub use record::*;
pub use status::*;
pub use transport::*;
