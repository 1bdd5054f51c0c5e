//! Core runtime primitives for the matte language.
//!
//! This crate holds the data half of the runtime: the [`Value`] sum type
//! that every matte program manipulates, the [`Zone`] arena that owns
//! per-call-frame values, the [`Exception`] record and its process-wide
//! slot, and the packet/record containers ([`ObjectList`], [`Record`]).
//!
//! Behaviour (operator kernels, dispatch, display, iteration) lives in
//! the `matte-runtime` crate; the split keeps this crate linkable into
//! both the runtime staticlib and the compiler, which reuses the
//! exception machinery for its own diagnostics.

pub mod except;
pub mod list;
pub mod record;
pub mod value;
pub mod zone;

pub use except::{Exception, Frame};
pub use list::ObjectList;
pub use record::Record;
pub use value::{Cell, ComplexMatrix, IterState, Matrix, Range, Value, ValueKind};
pub use zone::Zone;
