//! Boundary vectorization of label objects
//!
//! Each object's outline is traced on the pixel-corner lattice:
//! - Horizontal edges come from a sweep over two consecutive scanlines,
//!   classifying every column span as `Outside`, `AboveOnly`, `BelowOnly`
//!   or `Both`. Only the one-sided spans are boundary.
//! - Vertical edges are the two ends of every run.
//! - Edges are directed with the object on their left and linked into
//!   rings, merging collinear edges on the way.
//!
//! A correction pass then splits rings at repeated vertices, drops
//! degenerate rings and assigns holes to their exterior.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::marker::PhantomData;

use geo::orient::{Direction, Orient};
use geo::{Contains, Coord, Geometry, LineString, MultiPolygon, Point, Polygon};
use obia_core::{
    Algorithm, AttributeValue, Error, Feature, FeatureCollection, GeoTransform, Label, LabelMap,
    LabelObject, Result,
};
use tracing::{debug, trace, warn};

/// Lattice point `(x, y)` = (column, row) of a pixel corner
type Vertex = (i64, i64);

/// Label map to polygon features
#[derive(Debug, Clone, Copy)]
pub struct LabelMapToVectorData<L>(PhantomData<L>);

impl<L> Default for LabelMapToVectorData<L> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<L: Label> Algorithm for LabelMapToVectorData<L> {
    type Input = LabelMap<L>;
    type Output = FeatureCollection;
    type Params = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "LabelMapToVectorData"
    }

    fn description(&self) -> &'static str {
        "Trace the outline of every object as a polygon feature"
    }

    fn execute(&self, input: Self::Input, _params: Self::Params) -> Result<Self::Output> {
        label_map_to_vector_data(&input)
    }
}

/// Convert every object of `map` into a polygon feature.
///
/// Features follow the map's label order. The feature id is the label;
/// properties carry every attribute under its own name plus `label` and,
/// when set, `class_label`. Objects with several 4-connected parts become
/// a `MultiPolygon`. Coordinates are pixel corners mapped through the
/// map's transform.
pub fn label_map_to_vector_data<L: Label>(map: &LabelMap<L>) -> Result<FeatureCollection> {
    let transform = map.transform();
    let mut collection = FeatureCollection::new();

    for obj in map.iter() {
        let mut feature = match object_geometry(obj, transform) {
            Some(geometry) => Feature::new(geometry),
            None => {
                warn!(label = %obj.label(), "object has no pixels, feature without geometry");
                Feature::empty()
            }
        };
        feature = feature.with_id(obj.label().to_string());

        for (name, value) in obj.attributes().iter() {
            feature.set_property(name, AttributeValue::Float(value));
        }
        feature.set_property("label", label_value(obj.label())?);
        if let Some(class_label) = obj.class_label() {
            feature.set_property("class_label", label_value(class_label)?);
        }
        collection.push(feature);
    }

    debug!(features = collection.len(), "label map vectorized");
    Ok(collection)
}

fn label_value<L: Label>(label: L) -> Result<AttributeValue> {
    label
        .to_i64()
        .map(AttributeValue::Int)
        .ok_or_else(|| Error::Algorithm(format!("label {label} does not fit a 64-bit integer")))
}

/// Outline of one object in the map's physical space
fn object_geometry<L: Label>(obj: &LabelObject<L>, transform: &GeoTransform) -> Option<Geometry<f64>> {
    let rows = row_intervals(obj);
    if rows.is_empty() {
        return None;
    }

    let edges = boundary_edges(&rows);
    let rings = link_rings(&edges);
    trace!(label = %obj.label(), edges = edges.len(), rings = rings.len(), "traced object");

    let mut polygons: Vec<Polygon<f64>> = assemble_polygons(rings)
        .into_iter()
        .map(|(exterior, holes)| {
            let to_physical = |ring: Vec<Vertex>| -> LineString<f64> {
                ring.into_iter()
                    .map(|(x, y)| {
                        let (gx, gy) = transform.apply(x as f64, y as f64);
                        Coord { x: gx, y: gy }
                    })
                    .collect()
            };
            let holes = holes.into_iter().map(to_physical).collect();
            Polygon::new(to_physical(exterior), holes).orient(Direction::Default)
        })
        .collect();

    match polygons.len() {
        0 => None,
        1 => polygons.pop().map(Geometry::Polygon),
        _ => Some(Geometry::MultiPolygon(MultiPolygon::new(polygons))),
    }
}

/// Sorted, merged `[start, end)` column intervals per row
fn row_intervals<L: Label>(obj: &LabelObject<L>) -> BTreeMap<i64, Vec<(i64, i64)>> {
    let mut rows: BTreeMap<i64, Vec<(i64, i64)>> = BTreeMap::new();
    for line in obj.lines() {
        rows.entry(line.row as i64)
            .or_default()
            .push((line.col as i64, (line.col + line.length) as i64));
    }
    for intervals in rows.values_mut() {
        intervals.sort_unstable();
        let mut merged: Vec<(i64, i64)> = Vec::with_capacity(intervals.len());
        for &(start, end) in intervals.iter() {
            match merged.last_mut() {
                Some(last) if start <= last.1 => last.1 = last.1.max(end),
                _ => merged.push((start, end)),
            }
        }
        *intervals = merged;
    }
    rows
}

fn covers(intervals: &[(i64, i64)], x: i64) -> bool {
    let i = intervals.partition_point(|&(_, end)| end <= x);
    i < intervals.len() && intervals[i].0 <= x
}

/// Coverage of a column span by the scanlines above and below a
/// horizontal lattice line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SweepState {
    Outside,
    AboveOnly,
    BelowOnly,
    Both,
}

impl SweepState {
    fn at(above: &[(i64, i64)], below: &[(i64, i64)], x: i64) -> Self {
        match (covers(above, x), covers(below, x)) {
            (false, false) => SweepState::Outside,
            (true, false) => SweepState::AboveOnly,
            (false, true) => SweepState::BelowOnly,
            (true, true) => SweepState::Both,
        }
    }
}

/// Directed boundary edges, object on the left in `(x, y)` lattice space
fn boundary_edges(rows: &BTreeMap<i64, Vec<(i64, i64)>>) -> Vec<(Vertex, Vertex)> {
    let mut edges = Vec::new();

    // Horizontal edges on every lattice line touching a non-empty row
    let mut lattice_rows: Vec<i64> = rows.keys().flat_map(|&r| [r, r + 1]).collect();
    lattice_rows.dedup();
    let none: Vec<(i64, i64)> = Vec::new();

    for y in lattice_rows {
        let above = rows.get(&(y - 1)).unwrap_or(&none);
        let below = rows.get(&y).unwrap_or(&none);

        let mut breaks: Vec<i64> = above
            .iter()
            .chain(below.iter())
            .flat_map(|&(s, e)| [s, e])
            .collect();
        breaks.sort_unstable();
        breaks.dedup();

        let mut span: Option<(SweepState, i64)> = None;
        for &x in &breaks {
            let state = SweepState::at(above, below, x);
            if let Some((open, start)) = span {
                if open == state {
                    continue;
                }
                match open {
                    SweepState::BelowOnly => edges.push(((start, y), (x, y))),
                    SweepState::AboveOnly => edges.push(((x, y), (start, y))),
                    SweepState::Outside | SweepState::Both => {}
                }
            }
            span = Some((state, x));
        }
    }

    // Vertical edges at the ends of every run
    for (&row, intervals) in rows {
        for &(start, end) in intervals {
            edges.push(((start, row + 1), (start, row)));
            edges.push(((end, row), (end, row + 1)));
        }
    }

    edges
}

fn direction(from: Vertex, to: Vertex) -> Vertex {
    ((to.0 - from.0).signum(), (to.1 - from.1).signum())
}

fn cross(a: Vertex, b: Vertex) -> i64 {
    a.0 * b.1 - a.1 * b.0
}

/// Link edges into closed rings.
///
/// Where two parts of the object touch at a corner the vertex has two
/// outgoing edges; taking the left turn keeps diagonal neighbours in
/// separate rings. Collinear consecutive edges collapse into one.
fn link_rings(edges: &[(Vertex, Vertex)]) -> Vec<Vec<Vertex>> {
    let mut outgoing: HashMap<Vertex, Vec<usize>> = HashMap::with_capacity(edges.len());
    for (i, &(from, _)) in edges.iter().enumerate() {
        outgoing.entry(from).or_default().push(i);
    }

    let mut order: Vec<usize> = (0..edges.len()).collect();
    order.sort_by_key(|&i| (edges[i].0 .1, edges[i].0 .0));

    let mut used = vec![false; edges.len()];
    let mut rings = Vec::new();

    for first in order {
        if used[first] {
            continue;
        }

        let mut ring = vec![edges[first].0];
        let mut current = first;
        loop {
            used[current] = true;
            let (from, to) = edges[current];
            let heading = direction(from, to);

            let next = outgoing.get(&to).and_then(|candidates| {
                candidates
                    .iter()
                    .copied()
                    .filter(|&i| !used[i] || i == first)
                    .max_by_key(|&i| {
                        let (f, t) = edges[i];
                        cross(heading, direction(f, t)).signum()
                    })
            });

            let Some(next) = next else {
                // Unbalanced edge set; close what we have
                break;
            };
            let (nf, nt) = edges[next];
            if direction(nf, nt) != heading {
                ring.push(to);
            }
            if next == first {
                break;
            }
            current = next;
        }
        rings.push(ring);
    }

    rings
}

/// Split a ring wherever it passes twice through the same vertex
fn split_ring(ring: Vec<Vertex>) -> Vec<Vec<Vertex>> {
    let mut pieces = Vec::new();
    let mut stack: Vec<Vertex> = Vec::with_capacity(ring.len());
    let mut on_stack: HashSet<Vertex> = HashSet::with_capacity(ring.len());

    for v in ring {
        if on_stack.contains(&v) {
            let mut piece = Vec::new();
            while let Some(q) = stack.pop() {
                if q == v {
                    break;
                }
                on_stack.remove(&q);
                piece.push(q);
            }
            piece.push(v);
            piece.reverse();
            pieces.push(piece);
            stack.push(v);
        } else {
            on_stack.insert(v);
            stack.push(v);
        }
    }
    pieces.push(stack);
    pieces
}

/// Remove repeated and collinear vertices (including spikes)
fn simplify_ring(mut ring: Vec<Vertex>) -> Vec<Vertex> {
    loop {
        ring.dedup();
        while ring.len() > 1 && ring.first() == ring.last() {
            ring.pop();
        }
        let n = ring.len();
        if n < 3 {
            return ring;
        }

        let keep: Vec<bool> = (0..n)
            .map(|i| {
                let prev = ring[(i + n - 1) % n];
                let cur = ring[i];
                let next = ring[(i + 1) % n];
                cross((cur.0 - prev.0, cur.1 - prev.1), (next.0 - cur.0, next.1 - cur.1)) != 0
            })
            .collect();
        if keep.iter().all(|&k| k) {
            return ring;
        }
        ring = ring
            .into_iter()
            .zip(keep)
            .filter_map(|(v, k)| k.then_some(v))
            .collect();
    }
}

/// Twice the signed area; positive when the object lies on the left
fn signed_area2(ring: &[Vertex]) -> i64 {
    let n = ring.len();
    (0..n)
        .map(|i| {
            let (x0, y0) = ring[i];
            let (x1, y1) = ring[(i + 1) % n];
            x0 * y1 - x1 * y0
        })
        .sum()
}

fn lattice_polygon(ring: &[Vertex]) -> Polygon<f64> {
    let coords: Vec<Coord<f64>> = ring
        .iter()
        .map(|&(x, y)| Coord { x: x as f64, y: y as f64 })
        .collect();
    Polygon::new(LineString::from(coords), vec![])
}

/// A point inside the background pixel to the right of the hole's first
/// edge. It never lies on a lattice line.
fn hole_probe(ring: &[Vertex]) -> Point<f64> {
    let (x0, y0) = ring[0];
    let (dx, dy) = direction(ring[0], ring[1]);
    Point::new(
        x0 as f64 + 0.5 * dx as f64 + 0.25 * dy as f64,
        y0 as f64 + 0.5 * dy as f64 - 0.25 * dx as f64,
    )
}

/// Correction pass: clean the traced rings and group them into
/// `(exterior, holes)` pairs, still in lattice space.
fn assemble_polygons(rings: Vec<Vec<Vertex>>) -> Vec<(Vec<Vertex>, Vec<Vec<Vertex>>)> {
    let mut exteriors: Vec<(Vec<Vertex>, i64)> = Vec::new();
    let mut holes: Vec<Vec<Vertex>> = Vec::new();

    for ring in rings.into_iter().flat_map(split_ring) {
        let ring = simplify_ring(ring);
        if ring.len() < 3 {
            continue;
        }
        let area2 = signed_area2(&ring);
        match area2.signum() {
            1 => exteriors.push((ring, area2)),
            -1 => holes.push(ring),
            _ => {}
        }
    }

    let shells: Vec<Polygon<f64>> = exteriors.iter().map(|(r, _)| lattice_polygon(r)).collect();
    let mut assigned: Vec<Vec<Vec<Vertex>>> = vec![Vec::new(); exteriors.len()];

    for hole in holes {
        let probe = hole_probe(&hole);
        let owner = shells
            .iter()
            .enumerate()
            .filter(|(_, shell)| shell.contains(&probe))
            .min_by_key(|(i, _)| exteriors[*i].1)
            .map(|(i, _)| i);
        match owner {
            Some(i) => assigned[i].push(close(hole)),
            None => warn!(?probe, "hole outside every exterior ring, dropped"),
        }
    }

    exteriors
        .into_iter()
        .zip(assigned)
        .map(|((ring, _), holes)| (close(ring), holes))
        .collect()
}

fn close(mut ring: Vec<Vertex>) -> Vec<Vertex> {
    if let Some(&first) = ring.first() {
        ring.push(first);
    }
    ring
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo::Area;

    fn polygon(geometry: &Geometry<f64>) -> &Polygon<f64> {
        match geometry {
            Geometry::Polygon(p) => p,
            other => panic!("expected a polygon, got {other:?}"),
        }
    }

    fn single_feature(map: &LabelMap<u8>) -> Feature {
        let fc = label_map_to_vector_data(map).unwrap();
        assert_eq!(fc.len(), 1);
        fc.into_iter().next().unwrap()
    }

    #[test]
    fn test_rectangle_has_four_corners() {
        let mut map = LabelMap::new(5, 6, 0u8);
        for row in 1..4 {
            map.set_line(row, 1, 4, 1).unwrap();
        }
        let feature = single_feature(&map);
        let geometry = feature.geometry.as_ref().unwrap();
        let poly = polygon(geometry);
        assert_eq!(poly.exterior().0.len(), 5);
        assert_eq!(poly.exterior().0.first(), poly.exterior().0.last());
        assert!(poly.interiors().is_empty());
        assert_relative_eq!(poly.unsigned_area(), 12.0);
        assert_eq!(feature.id.as_deref(), Some("1"));
    }

    #[test]
    fn test_pixel_grid_corners() {
        let mut map = LabelMap::new(3, 3, 0u8);
        map.set_pixel(1, 1, 4).unwrap();
        let feature = single_feature(&map);
        let geometry = feature.geometry.as_ref().unwrap();
        let xs: Vec<f64> = polygon(geometry).exterior().0.iter().map(|c| c.x).collect();
        let min = xs.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = xs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        assert_relative_eq!(min, 0.5);
        assert_relative_eq!(max, 1.5);
    }

    #[test]
    fn test_ring_with_hole() {
        let mut map = LabelMap::new(5, 5, 0u8);
        for row in 0..5 {
            map.set_line(row, 0, 5, 1).unwrap();
        }
        map.set_pixel(2, 2, 0).unwrap();
        let feature = single_feature(&map);
        let geometry = feature.geometry.as_ref().unwrap();
        let poly = polygon(geometry);
        assert_eq!(poly.interiors().len(), 1);
        assert_relative_eq!(poly.unsigned_area(), 24.0);
        assert_relative_eq!(Polygon::new(poly.interiors()[0].clone(), vec![]).unsigned_area(), 1.0);
    }

    #[test]
    fn test_diagonal_pixels_are_separate_parts() {
        let mut map = LabelMap::new(2, 2, 0u8);
        map.set_pixel(0, 0, 1).unwrap();
        map.set_pixel(1, 1, 1).unwrap();
        let feature = single_feature(&map);
        match feature.geometry.as_ref().unwrap() {
            Geometry::MultiPolygon(mp) => {
                assert_eq!(mp.0.len(), 2);
                assert_relative_eq!(mp.unsigned_area(), 2.0);
            }
            other => panic!("expected a multipolygon, got {other:?}"),
        }
    }

    #[test]
    fn test_notch_touching_hole() {
        // Background centre and corner meet at a vertex: one exterior whose
        // hole touches it there.
        let mut map = LabelMap::new(3, 3, 0u8);
        for row in 0..3 {
            map.set_line(row, 0, 3, 1).unwrap();
        }
        map.set_pixel(0, 0, 0).unwrap();
        map.set_pixel(1, 1, 0).unwrap();
        let feature = single_feature(&map);
        let geometry = feature.geometry.as_ref().unwrap();
        let poly = polygon(geometry);
        assert_relative_eq!(poly.unsigned_area(), 7.0);
        assert_eq!(poly.interiors().len(), 1);
    }

    #[test]
    fn test_orientation_in_physical_space() {
        let mut map = LabelMap::new(4, 4, 0u8).with_transform(GeoTransform::new(100.0, 200.0, 10.0, -10.0));
        map.set_line(1, 1, 2, 1).unwrap();
        map.set_line(2, 1, 2, 1).unwrap();
        let feature = single_feature(&map);
        let geometry = feature.geometry.as_ref().unwrap();
        let poly = polygon(geometry);
        assert!(poly.signed_area() > 0.0);
        assert_relative_eq!(poly.unsigned_area(), 400.0);
    }

    #[test]
    fn test_properties() {
        let mut map = LabelMap::new(3, 3, 0u8);
        map.set_pixel(0, 0, 7).unwrap();
        let obj = map.label_object_mut(7).unwrap();
        obj.set_attribute("SHAPE::Size", 1.0);
        obj.set_class_label(Some(2));
        let feature = single_feature(&map);
        assert_eq!(feature.get_property("SHAPE::Size"), Some(&AttributeValue::Float(1.0)));
        assert_eq!(feature.get_property("label"), Some(&AttributeValue::Int(7)));
        assert_eq!(feature.get_property("class_label"), Some(&AttributeValue::Int(2)));
    }

    #[test]
    fn test_split_ring_at_repeated_vertex() {
        let ring = vec![(0, 0), (1, 0), (1, 1), (2, 1), (2, 2), (1, 2), (1, 1), (0, 1)];
        let pieces = split_ring(ring);
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0], vec![(1, 1), (2, 1), (2, 2), (1, 2)]);
        assert_eq!(pieces[1], vec![(0, 0), (1, 0), (1, 1), (0, 1)]);
    }
}
