//! Run-length encoded label maps
//!
//! A [`LabelMap`] stores a labeled raster as a collection of
//! [`LabelObject`]s keyed by label instead of a dense pixel array. Each object
//! is the union of its [`RunLengthLine`]s and carries an [`AttributesMap`]
//! filled in by the valuators.

mod attributes;
mod line;
mod map;
mod object;
mod region;

pub use attributes::AttributesMap;
pub use line::RunLengthLine;
pub use map::LabelMap;
pub use object::LabelObject;
pub use region::Region;
