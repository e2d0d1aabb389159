//! Target description and record layouts for ahead-of-time relocation data.
//!
//! Code compiled ahead of time refers to values that only exist once it is
//! loaded into a process: classes, constant pools, helpers, other methods.
//! Each such reference is described by a relocation record. This crate
//! defines what those records are: their kinds, the typed targets they are
//! built from, their serialized layout for each pointer width and the
//! collaborators consulted while they are written. The `aot-relocs` crate
//! writes them.

#![deny(missing_docs)]

mod error;
mod kind;
mod reader;
mod schema;
mod services;
mod target;
mod tunables;
mod validation;
mod width;

pub use crate::error::*;
pub use crate::kind::*;
pub use crate::reader::*;
pub use crate::schema::*;
pub use crate::services::*;
pub use crate::target::*;
pub use crate::tunables::*;
pub use crate::validation::*;
pub use crate::width::*;

pub use cranelift_entity::{EntityRef, PrimaryMap};
pub use object;
