//! Shrink a label map's region to its objects

use obia_core::{Label, LabelMap, Region};
use tracing::{debug, warn};

/// Replace the map's region with the bounding box of all its objects,
/// grown by `border` pixels and clipped to the original region.
///
/// Object pixels keep their absolute indices, so the transform is left
/// unchanged. A map without objects keeps its region.
pub fn auto_crop<L: Label>(map: &mut LabelMap<L>, border: usize) -> Region {
    let original = map.region();

    let bbox = map
        .iter()
        .filter_map(|obj| obj.bounding_box())
        .reduce(|a, b| (a.0.min(b.0), a.1.min(b.1), a.2.max(b.2), a.3.max(b.3)));

    let Some((min_row, min_col, max_row, max_col)) = bbox else {
        warn!("auto crop on a map without objects, region unchanged");
        return original;
    };

    let cropped = Region::new(min_row, min_col, max_row - min_row + 1, max_col - min_col + 1)
        .padded(border)
        .intersection(&original);

    debug!(?original, ?cropped, border, "auto crop");
    map.set_region(cropped);
    cropped
}
