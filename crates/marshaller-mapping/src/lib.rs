//! Mapping engine for the semantic marshaller.
//!
//! Translates between characteristic values and device wire messages:
//!
//! ```text
//!            marshal                               unmarshal
//! value ──cast──▶ characteristic ──actuator──▶ content ──codec──▶ wire
//! value ◀─cast── characteristic ◀──sensor──── content ◀─codec── wire
//! ```
//!
//! Values are laid out on [`skeleton::Skeleton`]s: trees built once from a
//! schema with every bound slot indexed, so binding a value is a direct
//! write.

pub mod casting;
pub mod configurables;
pub mod mapper;
pub mod marshal;
pub mod options;
pub mod paths;
pub mod skeleton;

pub use casting::{CastRegistry, Caster};
pub use configurables::find_configurables;
pub use mapper::{actuator, complete_bindings, sensor};
pub use marshal::{Marshaller, MarshallingInput, WireMap};
pub use options::ServicePaths;
pub use paths::{paths_for, PathMatch};
pub use skeleton::{Skeleton, SlotId};
