#![forbid(unsafe_code)]

//! Findings aggregation and filtering engine behind the recon view.
//!
//! The crate is pure: it never touches the filesystem or the network. Snapshots,
//! investigated-state round-trips and source lines arrive through [`ReconTransport`];
//! the filter `active` map and the investigated mirror are written through [`StateStore`].

mod aggregate;
mod error;
mod filter;
mod investigated;
mod model;
mod predicate;
mod prompt;
mod session;
mod source_cache;
mod taxonomy;
mod transport;

pub use aggregate::*;
pub use error::*;
pub use filter::*;
pub use investigated::*;
pub use model::*;
pub use predicate::*;
pub use prompt::*;
pub use session::*;
pub use source_cache::*;
pub use taxonomy::*;
pub use transport::*;
