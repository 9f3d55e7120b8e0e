//! mixkit - live mixin composition for dynamic property objects
//!
//! Objects hold JSON values, accessors and methods. Other objects can be
//! mixed into them: reads of keys the target does not own are delegated,
//! live, to the mixed-in sources and then to the target's prototype chain.

pub mod config;
pub mod mixin;
pub mod objects;
pub mod scenario;

pub use config::{MixConfig, WriteMode};
pub use mixin::{CompositionRegistry, MixError, Receiver};
pub use objects::{Handle, Property};
