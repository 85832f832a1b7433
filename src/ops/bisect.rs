//! Plane bisection.
//!
//! Selected edges crossing the plane are split where they meet it, and
//! selected faces spanning the plane are split along the new vertices.
//! Vertices within [`BisectOptions::epsilon`] of the plane count as already
//! on it, so bisecting twice by the same plane adds nothing the second time.
//!
//! Optionally the selected geometry on either side is removed, and the open
//! boundary left along the cut is capped with triangles.
//!
//! # Example
//!
//! ```
//! use editmesh::prelude::*;
//! use editmesh::ops::bisect::{bisect, BisectOptions};
//! use nalgebra::{Point3, Vector3};
//!
//! let points = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(1.0, 1.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//! ];
//! let mut mesh = build_from_polygons(&points, &[[0, 1, 2, 3]]).unwrap();
//! mesh.select_all(true);
//!
//! let ctx = EditContext::new(SelectMode::Vertex);
//! let options = BisectOptions::new(Point3::new(0.5, 0.0, 0.0), Vector3::x());
//! let report = bisect(&mut mesh, &ctx, &options).unwrap();
//!
//! assert_eq!(report.verts_created, 2);
//! assert_eq!(mesh.num_faces(), 2);
//! ```

use std::collections::{HashMap, HashSet};

use nalgebra::{Matrix3, Matrix4, Point2, Point3, Vector3};
use tracing::{debug, warn};

use super::{execute, EditContext, OpReport};
use crate::error::{EditError, Result};
use crate::mesh::{EdgeId, ElemFlags, FaceId, LoopId, Mesh, VertexId};

/// Options for [`bisect`].
#[derive(Debug, Clone)]
pub struct BisectOptions {
    /// A point on the plane.
    pub plane_co: Point3<f64>,

    /// The plane normal. "Outer" is the side it points to.
    pub plane_no: Vector3<f64>,

    /// Maps the plane into mesh-local space, if it is given in another space.
    pub world_to_local: Option<Matrix4<f64>>,

    /// Distance within which a vertex counts as on the plane.
    pub epsilon: f64,

    /// Remove selected geometry behind the plane.
    pub clear_inner: bool,

    /// Remove selected geometry in front of the plane.
    pub clear_outer: bool,

    /// Cap the open boundary along the cut.
    pub fill: bool,
}

impl Default for BisectOptions {
    fn default() -> Self {
        Self {
            plane_co: Point3::origin(),
            plane_no: Vector3::z(),
            world_to_local: None,
            epsilon: 1e-4,
            clear_inner: false,
            clear_outer: false,
            fill: false,
        }
    }
}

impl BisectOptions {
    /// Bisect by the plane through `plane_co` with normal `plane_no`.
    pub fn new(plane_co: Point3<f64>, plane_no: Vector3<f64>) -> Self {
        Self {
            plane_co,
            plane_no,
            ..Self::default()
        }
    }

    /// Give the plane in another space, with the matrix into mesh space.
    pub fn with_transform(mut self, world_to_local: Matrix4<f64>) -> Self {
        self.world_to_local = Some(world_to_local);
        self
    }

    /// Set the on-plane tolerance.
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Remove selected geometry behind the plane.
    pub fn with_clear_inner(mut self, clear: bool) -> Self {
        self.clear_inner = clear;
        self
    }

    /// Remove selected geometry in front of the plane.
    pub fn with_clear_outer(mut self, clear: bool) -> Self {
        self.clear_outer = clear;
        self
    }

    /// Cap the open boundary along the cut.
    pub fn with_fill(mut self, fill: bool) -> Self {
        self.fill = fill;
        self
    }

    /// The plane in mesh-local space, with a unit normal.
    ///
    /// # Errors
    ///
    /// Returns [`EditError::InvalidParameter`] if the normal is zero or the
    /// transform is singular.
    pub fn local_plane(&self) -> Result<(Point3<f64>, Vector3<f64>)> {
        let (co, no) = match &self.world_to_local {
            None => (self.plane_co, self.plane_no),
            Some(m) => {
                let linear: Matrix3<f64> = m.fixed_view::<3, 3>(0, 0).into_owned();
                let inverse = linear.try_inverse().ok_or_else(|| {
                    EditError::invalid_param("world_to_local", "singular", "transform must be invertible")
                })?;
                (m.transform_point(&self.plane_co), inverse.transpose() * self.plane_no)
            }
        };
        let no = no.try_normalize(1e-12).ok_or_else(|| {
            EditError::invalid_param("plane_no", format!("{:?}", self.plane_no), "normal must be non-zero")
        })?;
        Ok((co, no))
    }
}

/// Operator-specific output of [`bisect`].
#[derive(Debug, Clone, Default)]
pub struct BisectOutput {
    /// Vertices inserted on crossing edges.
    pub cut_verts: Vec<VertexId>,
    /// Edges inserted across split faces.
    pub cut_edges: Vec<EdgeId>,
    /// Cap faces.
    pub fill_faces: Vec<FaceId>,
}

/// Signed distances to the plane, classified with a tolerance.
struct Plane {
    co: Point3<f64>,
    no: Vector3<f64>,
    epsilon: f64,
}

impl Plane {
    fn distance(&self, p: &Point3<f64>) -> f64 {
        (p - self.co).dot(&self.no)
    }

    fn side(&self, p: &Point3<f64>) -> i8 {
        let d = self.distance(p);
        if d > self.epsilon {
            1
        } else if d < -self.epsilon {
            -1
        } else {
            0
        }
    }
}

/// Bisect the selection by a plane.
///
/// # Errors
///
/// Returns [`EditError::InvalidParameter`] for an unusable plane.
pub fn bisect(mesh: &mut Mesh, ctx: &EditContext, options: &BisectOptions) -> Result<OpReport<BisectOutput>> {
    let (co, no) = options.local_plane()?;
    let plane = Plane {
        co,
        no,
        epsilon: options.epsilon,
    };
    execute(mesh, ctx, "bisect", |mesh| {
        let selected = mesh.selected_verts();
        let mut out = BisectOutput::default();

        for e in mesh.selected_edges() {
            let [a, b] = mesh.edge(e).verts();
            let (pa, pb) = (*mesh.position(a), *mesh.position(b));
            if plane.side(&pa) * plane.side(&pb) >= 0 {
                continue;
            }
            let (da, db) = (plane.distance(&pa), plane.distance(&pb));
            let (vn, _) = mesh.split_edge(e, a, da / (da - db));
            out.cut_verts.push(vn);
        }

        let mut work: Vec<FaceId> = mesh.selected_faces();
        while let Some(f) = work.pop() {
            if let Some((f_new, e)) = cut_face(mesh, &plane, f)? {
                out.cut_edges.push(e);
                mesh.select_edge(e, true);
                work.push(f);
                work.push(f_new);
            }
        }

        if options.clear_inner || options.clear_outer {
            for v in selected {
                if !mesh.contains_vertex(v) {
                    continue;
                }
                let side = plane.side(mesh.position(v));
                if (options.clear_inner && side < 0) || (options.clear_outer && side > 0) {
                    mesh.purge_vertex(v);
                }
            }
            out.cut_verts.retain(|&v| mesh.contains_vertex(v));
            out.cut_edges.retain(|&e| mesh.contains_edge(e));
        }

        if options.fill {
            // Selected edges already lying in the plane can border the
            // opening too.
            let mut rim = out.cut_edges.clone();
            rim.extend(mesh.selected_edges().into_iter().filter(|&e| {
                let [a, b] = mesh.edge(e).verts();
                plane.side(mesh.position(a)) == 0 && plane.side(mesh.position(b)) == 0 && !out.cut_edges.contains(&e)
            }));
            out.fill_faces = fill_cut(mesh, &plane, &rim)?;
        }
        debug!(
            verts = out.cut_verts.len(),
            edges = out.cut_edges.len(),
            fill = out.fill_faces.len(),
            "bisected"
        );
        Ok(out)
    })
}

/// Split `f` once between two on-plane corners, if it spans the plane.
fn cut_face(mesh: &mut Mesh, plane: &Plane, f: FaceId) -> Result<Option<(FaceId, EdgeId)>> {
    let corners: Vec<LoopId> = mesh.face_loops(f).collect();
    let sides: Vec<i8> = corners
        .iter()
        .map(|&l| plane.side(mesh.position(mesh.loop_(l).vert())))
        .collect();
    if !(sides.contains(&1) && sides.contains(&-1)) {
        return Ok(None);
    }

    let along = plane.no.cross(&mesh.face(f).no);
    let mut on_plane: Vec<(f64, LoopId)> = corners
        .iter()
        .zip(&sides)
        .filter(|(_, &s)| s == 0)
        .map(|(&l, _)| (mesh.position(mesh.loop_(l).vert()).coords.dot(&along), l))
        .collect();
    on_plane.sort_by(|a, b| a.0.total_cmp(&b.0));

    for pair in on_plane.chunks_exact(2) {
        let (la, lb) = (pair[0].1, pair[1].1);
        if mesh.loop_(la).next() == lb || mesh.loop_(lb).next() == la {
            continue;
        }
        return mesh.split_face(f, la, lb).map(Some);
    }
    Ok(None)
}

/// Cap every closed loop of rim edges left with a single face.
fn fill_cut(mesh: &mut Mesh, plane: &Plane, rim: &[EdgeId]) -> Result<Vec<FaceId>> {
    let open: Vec<EdgeId> = rim
        .iter()
        .copied()
        .filter(|&e| mesh.contains_edge(e) && mesh.edge_face_count(e) == 1)
        .collect();
    let mut at: HashMap<VertexId, Vec<EdgeId>> = HashMap::new();
    for &e in &open {
        for v in mesh.edge(e).verts() {
            at.entry(v).or_default().push(e);
        }
    }

    let mut used: HashSet<EdgeId> = HashSet::new();
    let mut created = Vec::new();
    for &start in &open {
        if used.contains(&start) {
            continue;
        }
        let Some(ring) = walk_ring(mesh, &at, start, &mut used) else {
            warn!(edge = ?start, "cut boundary does not close, leaving it open");
            continue;
        };
        created.extend(cap_ring(mesh, plane, &ring, start)?);
    }
    Ok(created)
}

/// The vertex cycle through `start`, or `None` if it branches or stays open.
fn walk_ring(
    mesh: &Mesh,
    at: &HashMap<VertexId, Vec<EdgeId>>,
    start: EdgeId,
    used: &mut HashSet<EdgeId>,
) -> Option<Vec<VertexId>> {
    let [first, mut v] = mesh.edge(start).verts();
    let mut ring = vec![first];
    let mut e = start;
    used.insert(start);
    while v != first {
        ring.push(v);
        let around = at.get(&v)?;
        if around.len() != 2 {
            return None;
        }
        e = if around[0] == e { around[1] } else { around[0] };
        if !used.insert(e) {
            return None;
        }
        v = mesh.edge(e).other_vert(v);
    }
    (ring.len() >= 3).then_some(ring)
}

/// Triangulate one ring, wound against the faces already on its edges.
fn cap_ring(mesh: &mut Mesh, plane: &Plane, ring: &[VertexId], start: EdgeId) -> Result<Vec<FaceId>> {
    let mut ring = ring.to_vec();
    let Some(l) = mesh.edge(start).first_loop() else {
        return Ok(Vec::new());
    };
    let src = mesh.loop_(l).face();
    // The ring starts along `start`; a neighbour running the same way means
    // the cap must run the other way.
    if mesh.loop_(l).vert() == ring[0] {
        ring.reverse();
    }
    let (mat_nr, smooth) = (mesh.face(src).mat_nr, mesh.face(src).flags & ElemFlags::SMOOTH);

    let u = plane.no.cross(&pick_axis(&plane.no)).normalize();
    let w = plane.no.cross(&u);
    let flat: Vec<Point2<f64>> = ring
        .iter()
        .map(|&v| {
            let d = mesh.position(v) - plane.co;
            Point2::new(d.dot(&u), d.dot(&w))
        })
        .collect();

    let mut faces = Vec::new();
    for [a, b, c] in ear_clip(&flat) {
        let f = mesh.create_face(&[ring[a], ring[b], ring[c]], None)?;
        let face = mesh.face_mut(f);
        face.mat_nr = mat_nr;
        face.flags |= smooth;
        mesh.select_face(f, true);
        faces.push(f);
    }
    Ok(faces)
}

/// A coordinate axis not parallel to `n`.
fn pick_axis(n: &Vector3<f64>) -> Vector3<f64> {
    if n.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    }
}

/// Ear-clipping triangulation of a simple polygon, keeping its winding.
fn ear_clip(points: &[Point2<f64>]) -> Vec<[usize; 3]> {
    let cross = |o: Point2<f64>, a: Point2<f64>, b: Point2<f64>| (a - o).perp(&(b - o));
    let n = points.len();
    let area: f64 = (0..n).map(|i| points[i].coords.perp(&points[(i + 1) % n].coords)).sum();
    let orient = if area >= 0.0 { 1.0 } else { -1.0 };

    let mut idx: Vec<usize> = (0..n).collect();
    let mut tris = Vec::with_capacity(n.saturating_sub(2));
    while idx.len() > 3 {
        let m = idx.len();
        let ear = (0..m).find(|&i| {
            let (a, b, c) = (idx[(i + m - 1) % m], idx[i], idx[(i + 1) % m]);
            if cross(points[a], points[b], points[c]) * orient <= 0.0 {
                return false;
            }
            idx.iter().filter(|&&p| p != a && p != b && p != c).all(|&p| {
                let q = points[p];
                !(cross(points[a], points[b], q) * orient > 0.0
                    && cross(points[b], points[c], q) * orient > 0.0
                    && cross(points[c], points[a], q) * orient > 0.0)
            })
        });
        // Degenerate input: fall back to clipping the first corner.
        let i = ear.unwrap_or(0);
        tris.push([idx[(i + m - 1) % m], idx[i], idx[(i + 1) % m]]);
        idx.remove(i);
    }
    if idx.len() == 3 {
        tris.push([idx[0], idx[1], idx[2]]);
    }
    tris
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::build_from_polygons;
    use crate::select::SelectMode;
    use approx::assert_relative_eq;

    fn unit_quad() -> Mesh {
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        build_from_polygons(&points, &[[0, 1, 2, 3]]).unwrap()
    }

    fn cube() -> Mesh {
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(1.0, 0.0, 1.0),
            Point3::new(1.0, 1.0, 1.0),
            Point3::new(0.0, 1.0, 1.0),
        ];
        let faces = [
            [0, 3, 2, 1],
            [4, 5, 6, 7],
            [0, 1, 5, 4],
            [1, 2, 6, 5],
            [2, 3, 7, 6],
            [3, 0, 4, 7],
        ];
        build_from_polygons(&points, &faces).unwrap()
    }

    #[test]
    fn test_quad_bisect_with_fill() {
        let mut mesh = unit_quad();
        mesh.select_all(true);
        let ctx = EditContext::new(SelectMode::Vertex);
        let options = BisectOptions::new(Point3::new(0.5, 0.0, 0.0), Vector3::x()).with_fill(true);
        let report = bisect(&mut mesh, &ctx, &options).unwrap();

        assert_eq!(mesh.num_vertices(), 6);
        assert_eq!(mesh.num_edges(), 7);
        assert_eq!(mesh.num_faces(), 2);
        assert!(report.output.fill_faces.is_empty());
        assert!(report.new_verts.iter().all(|&v| mesh.is_vert_selected(v)));
        assert!(report.new_edges.iter().all(|&e| mesh.is_edge_selected(e)));
        for &v in &report.output.cut_verts {
            assert_relative_eq!(mesh.position(v).x, 0.5);
        }
    }

    #[test]
    fn test_bisect_twice_adds_nothing() {
        let mut mesh = cube();
        mesh.select_all(true);
        let ctx = EditContext::new(SelectMode::Vertex);
        let options = BisectOptions::new(Point3::new(0.0, 0.0, 0.4), Vector3::new(0.2, 0.1, 1.0));
        let first = bisect(&mut mesh, &ctx, &options).unwrap();
        assert!(first.verts_created > 0);

        let second = bisect(&mut mesh, &ctx, &options).unwrap();
        assert_eq!(second.verts_created, 0);
        assert_eq!(second.faces_created, 0);
    }

    #[test]
    fn test_clear_outer_and_fill_closes_cube() {
        let mut mesh = cube();
        mesh.select_all(true);
        let ctx = EditContext::new(SelectMode::Vertex);
        let options = BisectOptions::new(Point3::new(0.0, 0.0, 0.5), Vector3::z())
            .with_clear_outer(true)
            .with_fill(true);
        let report = bisect(&mut mesh, &ctx, &options).unwrap();

        assert_eq!(mesh.num_vertices(), 8);
        assert_eq!(report.output.fill_faces.len(), 2);
        assert_eq!(mesh.num_faces(), 1 + 4 + 2);
        assert!(mesh.edge_ids().all(|e| mesh.is_manifold_edge(e)));
        assert!(mesh.vertex_ids().all(|v| mesh.position(v).z <= 0.5 + 1e-12));
        // The cap faces up, away from the kept half.
        for &f in &report.output.fill_faces {
            assert_relative_eq!(mesh.face_normal(f), Vector3::z(), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_fill_closes_cut_along_existing_edges() {
        // The diagonal plane x = y holds two vertical cube edges.
        let mut mesh = cube();
        mesh.select_all(true);
        let ctx = EditContext::new(SelectMode::Vertex);
        let no = Vector3::new(1.0, -1.0, 0.0);
        let options = BisectOptions::new(Point3::origin(), no)
            .with_clear_outer(true)
            .with_fill(true);
        let report = bisect(&mut mesh, &ctx, &options).unwrap();

        assert!(report.output.cut_verts.is_empty());
        assert_eq!(report.output.cut_edges.len(), 2);
        assert_eq!(report.output.fill_faces.len(), 2);
        assert_eq!(mesh.num_vertices(), 6);
        assert_eq!(mesh.num_edges(), 10);
        assert_eq!(mesh.num_faces(), 6);
        assert!(mesh.edge_ids().all(|e| mesh.is_manifold_edge(e)));
        for &f in &report.output.fill_faces {
            assert!(mesh.face_vertices(f).all(|v| {
                let p = mesh.position(v);
                (p.x - p.y).abs() < 1e-12
            }));
            assert_relative_eq!(mesh.face_normal(f), no.normalize(), epsilon = 1e-12);
        }
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_plane_transform() {
        // Mesh space is world space scaled by 2 along x.
        let m = Matrix4::new_nonuniform_scaling(&Vector3::new(2.0, 1.0, 1.0));
        let options = BisectOptions::new(Point3::new(1.0, 0.0, 0.0), Vector3::new(1.0, 1.0, 0.0)).with_transform(m);
        let (co, no) = options.local_plane().unwrap();
        assert_relative_eq!(co, Point3::new(2.0, 0.0, 0.0));
        assert_relative_eq!(no, Vector3::new(0.5, 1.0, 0.0).normalize(), epsilon = 1e-12);
    }

    #[test]
    fn test_zero_normal_rejected() {
        let mut mesh = unit_quad();
        let ctx = EditContext::default();
        let options = BisectOptions::new(Point3::origin(), Vector3::zeros());
        assert!(matches!(
            bisect(&mut mesh, &ctx, &options),
            Err(EditError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_no_crossing_is_noop() {
        let mut mesh = unit_quad();
        mesh.select_all(true);
        let ctx = EditContext::new(SelectMode::Vertex);
        let options = BisectOptions::new(Point3::new(5.0, 0.0, 0.0), Vector3::x());
        let report = bisect(&mut mesh, &ctx, &options).unwrap();
        assert!(report.is_noop());
    }

    #[test]
    fn test_ear_clip_concave() {
        // An L shape.
        let pts = [
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(2.0, 1.0),
            Point2::new(1.0, 1.0),
            Point2::new(1.0, 2.0),
            Point2::new(0.0, 2.0),
        ];
        let tris = ear_clip(&pts);
        assert_eq!(tris.len(), 4);
        let area: f64 = tris
            .iter()
            .map(|&[a, b, c]| (pts[b] - pts[a]).perp(&(pts[c] - pts[a])) * 0.5)
            .sum();
        assert_relative_eq!(area, 3.0);
    }
}
