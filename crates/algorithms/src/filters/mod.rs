//! Object filters
//!
//! Filters decide which objects survive. Each one moves the objects it
//! drops into a second label map with the same geometry and returns it.

mod autocrop;
mod keep_n;
mod opening;
mod selection;

pub use autocrop::auto_crop;
pub use keep_n::{
    keep_n_objects, keep_n_objects_by, shape_keep_n_objects, statistics_keep_n_objects,
    KeepNObjects, KeepNParams,
};
pub use opening::{
    attributes_opening, opening_by, shape_opening, shape_opening_by_name, statistics_opening,
    AttributesOpening, OpeningParams,
};
pub use selection::label_selection;
