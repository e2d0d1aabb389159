//! Encoder for the relocation data of ahead-of-time compiled methods.
//!
//! The code generator records every value it could not bind at compile time
//! as a [`RelocationRequest`](aot_relocs_environ::RelocationRequest). Once a
//! method is compiled, [`process_relocations`] turns those requests into one
//! self-describing buffer in three strict passes:
//!
//! * the requests are normalized into the list of records to write,
//! * the size of every record is summed and the buffer allocated once,
//! * every record is written into exactly the space sized for it.
//!
//! The buffer starts with its own size and, when symbols are validated, the
//! shared cache offset of the well-known class chains, followed by the
//! records in order.

#![deny(missing_docs)]

mod aggregate;
mod emit;
mod encode;
mod sink;
mod size;

pub use crate::aggregate::{EntryTarget, NormalizedEntry, RelocationList, normalize};
pub use crate::emit::{EmitContext, FieldValues};
pub use crate::encode::{RelocationBuffer, encode, process_relocations, write_entry};
pub use crate::sink::RecordSink;
pub use crate::size::{entry_size, prefix_size, total_size};

pub use aot_relocs_environ as environ;
