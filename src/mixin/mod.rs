//! Mixin composition - live delegation from targets to mixed-in sources
//!
//! - Own properties of a target always win
//! - Among sources, the most recently mixed wins
//! - Reads through a link always see the source's current state
//! - Keys starting with the reserved prefix (`__mix` by default) are never mixed
//! - Mixing is rejected if it would create a lookup cycle

mod error;
mod link;
mod receiver;
mod registry;

pub use error::{CycleKind, HookKind, MixError};
pub use link::MixLink;
pub use receiver::Receiver;
pub use registry::CompositionRegistry;
