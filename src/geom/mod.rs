//! Geometry vocabulary shared by features, filters and cursors.
//!
//! The geometry model is the `geo` crate's; this module only adds the
//! envelope helpers the query layer needs.

pub use geo::{Coord, Geometry, LineString, Point, Polygon, Rect};

use geo::{BoundingRect, CoordsIter};
use std::hash::{Hash, Hasher};

/// Returns the envelope of a geometry, or `None` for an empty geometry.
pub fn envelope(geometry: &Geometry<f64>) -> Option<Rect<f64>> {
    geometry.bounding_rect()
}

/// Builds a rectangle from two corners in any order.
pub fn rect(minx: f64, miny: f64, maxx: f64, maxy: f64) -> Rect<f64> {
    Rect::new(Coord { x: minx, y: miny }, Coord { x: maxx, y: maxy })
}

/// Returns true if two envelopes share at least one point.
pub fn envelopes_intersect(a: &Rect<f64>, b: &Rect<f64>) -> bool {
    a.min().x <= b.max().x && b.min().x <= a.max().x && a.min().y <= b.max().y && b.min().y <= a.max().y
}

/// Returns the intersection of two envelopes, if they overlap.
pub fn envelope_intersection(a: &Rect<f64>, b: &Rect<f64>) -> Option<Rect<f64>> {
    if !envelopes_intersect(a, b) {
        return None;
    }
    Some(rect(
        a.min().x.max(b.min().x),
        a.min().y.max(b.min().y),
        a.max().x.min(b.max().x),
        a.max().y.min(b.max().y),
    ))
}

/// Structural equality: same variant, same part layout and the same bit
/// pattern on every coordinate. Unlike `==` on `geo` types, `0.0` and `-0.0`
/// differ and a NaN coordinate equals itself.
pub(crate) fn same_geometry(a: &Geometry<f64>, b: &Geometry<f64>) -> bool {
    std::mem::discriminant(a) == std::mem::discriminant(b)
        && part_sizes(a) == part_sizes(b)
        && a.coords_iter()
            .zip(b.coords_iter())
            .all(|(p, q)| p.x.to_bits() == q.x.to_bits() && p.y.to_bits() == q.y.to_bits())
}

/// Feeds the same structure [`same_geometry`] compares into a hasher.
pub(crate) fn hash_geometry<H: Hasher>(geometry: &Geometry<f64>, state: &mut H) {
    std::mem::discriminant(geometry).hash(state);
    part_sizes(geometry).hash(state);
    for c in geometry.coords_iter() {
        c.x.to_bits().hash(state);
        c.y.to_bits().hash(state);
    }
}

/// Coordinate count of every ring, line and member, depth first.
fn part_sizes(geometry: &Geometry<f64>) -> Vec<usize> {
    let mut sizes = Vec::new();
    collect_part_sizes(geometry, &mut sizes);
    sizes
}

fn collect_part_sizes(geometry: &Geometry<f64>, sizes: &mut Vec<usize>) {
    let polygon = |poly: &Polygon<f64>, sizes: &mut Vec<usize>| {
        sizes.push(poly.exterior().0.len());
        sizes.extend(poly.interiors().iter().map(|ring| ring.0.len()));
    };
    match geometry {
        Geometry::Polygon(poly) => polygon(poly, sizes),
        Geometry::MultiLineString(mls) => sizes.extend(mls.0.iter().map(|ls| ls.0.len())),
        Geometry::MultiPolygon(mp) => {
            for poly in &mp.0 {
                sizes.push(poly.interiors().len());
                polygon(poly, sizes);
            }
        }
        Geometry::GeometryCollection(gc) => {
            for member in &gc.0 {
                sizes.push(member.coords_count());
                collect_part_sizes(member, sizes);
            }
        }
        other => sizes.push(other.coords_count()),
    }
}

/// Returns true if two geometries are equal within `tolerance` on every
/// coordinate and share the same structure.
pub fn approx_equal(a: &Geometry<f64>, b: &Geometry<f64>, tolerance: f64) -> bool {
    if std::mem::discriminant(a) != std::mem::discriminant(b) {
        return false;
    }
    if a.coords_count() != b.coords_count() {
        return false;
    }
    a.coords_iter()
        .zip(b.coords_iter())
        .all(|(p, q)| (p.x - q.x).abs() <= tolerance && (p.y - q.y).abs() <= tolerance)
}

/// Writes a geometry as WKT text.
pub fn to_wkt(geometry: &Geometry<f64>) -> String {
    let mut out = String::new();
    write_wkt(&mut out, geometry);
    out
}

fn write_wkt(out: &mut String, geometry: &Geometry<f64>) {
    match geometry {
        Geometry::Point(p) => {
            out.push_str("POINT(");
            write_coord(out, &p.0);
            out.push(')');
        }
        Geometry::Line(l) => {
            out.push_str("LINESTRING");
            write_ring(out, [l.start, l.end].iter());
        }
        Geometry::LineString(ls) => {
            out.push_str("LINESTRING");
            write_ring(out, ls.0.iter());
        }
        Geometry::Polygon(poly) => {
            out.push_str("POLYGON");
            write_polygon(out, poly);
        }
        Geometry::MultiPoint(mp) => {
            out.push_str("MULTIPOINT");
            write_ring(out, mp.0.iter().map(|p| &p.0));
        }
        Geometry::MultiLineString(mls) => {
            out.push_str("MULTILINESTRING(");
            for (i, ls) in mls.0.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_ring(out, ls.0.iter());
            }
            out.push(')');
        }
        Geometry::MultiPolygon(mp) => {
            out.push_str("MULTIPOLYGON(");
            for (i, poly) in mp.0.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_polygon(out, poly);
            }
            out.push(')');
        }
        Geometry::Rect(r) => {
            out.push_str("POLYGON");
            write_polygon(out, &r.to_polygon());
        }
        Geometry::Triangle(t) => {
            out.push_str("POLYGON");
            write_polygon(out, &t.to_polygon());
        }
        Geometry::GeometryCollection(gc) => {
            out.push_str("GEOMETRYCOLLECTION(");
            for (i, g) in gc.0.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_wkt(out, g);
            }
            out.push(')');
        }
    }
}

fn write_coord(out: &mut String, c: &Coord<f64>) {
    out.push_str(&format!("{:?} {:?}", c.x, c.y));
}

fn write_ring<'a>(out: &mut String, coords: impl Iterator<Item = &'a Coord<f64>>) {
    out.push('(');
    for (i, c) in coords.enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_coord(out, c);
    }
    out.push(')');
}

fn write_polygon(out: &mut String, poly: &Polygon<f64>) {
    out.push('(');
    write_ring(out, poly.exterior().0.iter());
    for interior in poly.interiors() {
        out.push_str(", ");
        write_ring(out, interior.0.iter());
    }
    out.push(')');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_of_point() {
        let g = Geometry::Point(Point::new(3.0, 4.0));
        let env = envelope(&g).unwrap();
        assert_eq!(env.min(), Coord { x: 3.0, y: 4.0 });
        assert_eq!(env.max(), Coord { x: 3.0, y: 4.0 });
    }

    #[test]
    fn test_rect_normalizes_corners() {
        let r = rect(10.0, 10.0, 0.0, 0.0);
        assert_eq!(r.min(), Coord { x: 0.0, y: 0.0 });
        assert_eq!(r.max(), Coord { x: 10.0, y: 10.0 });
    }

    #[test]
    fn test_envelope_intersection() {
        let a = rect(0.0, 0.0, 10.0, 10.0);
        let b = rect(5.0, 5.0, 20.0, 20.0);
        assert_eq!(envelope_intersection(&a, &b), Some(rect(5.0, 5.0, 10.0, 10.0)));

        let c = rect(11.0, 11.0, 12.0, 12.0);
        assert!(envelope_intersection(&a, &c).is_none());
    }

    #[test]
    fn test_touching_envelopes_intersect() {
        let a = rect(0.0, 0.0, 1.0, 1.0);
        let b = rect(1.0, 1.0, 2.0, 2.0);
        assert!(envelopes_intersect(&a, &b));
    }

    #[test]
    fn test_point_wkt() {
        let g = Geometry::Point(Point::new(1.5, -2.0));
        assert_eq!(to_wkt(&g), "POINT(1.5 -2.0)");
    }

    #[test]
    fn test_rect_wkt_is_closed_polygon() {
        let g = Geometry::Rect(rect(0.0, 0.0, 1.0, 1.0));
        let wkt = to_wkt(&g);
        assert!(wkt.starts_with("POLYGON(("));
        assert!(wkt.ends_with("))"));
        assert_eq!(wkt.matches(",").count(), 4);
    }

    #[test]
    fn test_same_geometry_compares_bits() {
        let zero = Geometry::Point(Point::new(0.0, 0.0));
        let negative_zero = Geometry::Point(Point::new(-0.0, 0.0));
        assert!(!same_geometry(&zero, &negative_zero));

        let nan = Geometry::Point(Point::new(f64::NAN, 1.0));
        assert!(same_geometry(&nan, &nan.clone()));
    }

    #[test]
    fn test_same_geometry_sees_ring_layout() {
        let ring = |coords: &[(f64, f64)]| LineString::from(coords.to_vec());
        let square = [(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 0.0)];
        let hole = [(1.0, 1.0), (2.0, 1.0), (2.0, 2.0), (1.0, 1.0)];
        let mut joined = square.to_vec();
        joined.extend_from_slice(&hole);

        let with_hole = Geometry::Polygon(Polygon::new(ring(&square), vec![ring(&hole)]));
        let single_ring = Geometry::Polygon(Polygon::new(ring(&joined), vec![]));
        assert!(!same_geometry(&with_hole, &single_ring));
        assert!(same_geometry(&with_hole, &with_hole.clone()));
    }

    #[test]
    fn test_approx_equal() {
        let a = Geometry::Point(Point::new(1.0, 2.0));
        let b = Geometry::Point(Point::new(1.0 + 1e-10, 2.0));
        assert!(approx_equal(&a, &b, 1e-9));
        assert!(!approx_equal(&a, &b, 1e-12));
    }
}
