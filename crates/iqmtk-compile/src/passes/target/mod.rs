//! Target-specific compilation passes.
//!
//! These passes need the device: its coupling graph for placement and
//! routing, its native gates for the rebase.

pub mod placement;
pub mod rebase;
pub mod routing;

pub use placement::Placement;
pub use rebase::IqmRebase;
pub use routing::{DefaultMapping, Routing};
