//! Object system - dynamic property objects that sources can be mixed into

mod object;
mod property;

pub use object::{Handle, Hook, Object, ObjectId, Properties};
pub use property::{Getter, Method, Property, Setter};
