//! HAProxy side of the pipeline.
//!
//! From a member snapshot to a reloaded proxy, in order:
//!
//! - [`TemplateSet`] renders one fragment per member
//! - [`assemble`] splices the fragments into the base config text
//! - [`Applier`] validates, writes and signals, fail-closed
//! - [`ProcessController`] abstracts the process so the applier is
//!   testable without a running HAProxy

mod apply;
mod assemble;
mod process;
mod templates;

pub use apply::Applier;
pub use assemble::{assemble, verify_base};
pub use process::{HaproxyController, ProcessController};
pub use templates::TemplateSet;
