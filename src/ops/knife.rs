//! Knife cut along a screen-space polyline.
//!
//! Every selected edge whose projected segment is crossed by the polyline is
//! split, and the new vertices are joined across the faces around them with
//! the shared subdivision patterns from [`subdivide`](super::subdivide).
//!
//! # Example
//!
//! ```
//! use editmesh::prelude::*;
//! use editmesh::ops::knife::{knife, KnifeMode, KnifeOptions};
//! use nalgebra::{Point2, Point3};
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
//! let top_down = |p: &Point3<f64>| Some(Point2::new(p.x, p.y));
//! let stroke = [Point2::new(0.3, -1.0), Point2::new(0.3, 2.0)];
//! let ctx = EditContext::new(SelectMode::Vertex);
//! knife(&mut mesh, &ctx, &top_down, &stroke, &KnifeOptions::default()).unwrap();
//!
//! assert_eq!(mesh.num_faces(), 2);
//! ```

use std::collections::{BTreeSet, HashSet};

use nalgebra::{Point2, Vector2};
use tracing::{debug, trace};

use super::subdivide::{connect_cut_vertices, split_edges_at, EdgeCut};
use super::{execute, EditContext, OpReport, ProjectionTable, Projector};
use crate::error::{EditError, Result};
use crate::mesh::{FaceId, Mesh, VertexId};

/// Where crossed edges are cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KnifeMode {
    /// At the crossing point.
    #[default]
    Exact,
    /// At the edge midpoint.
    Midpoints,
    /// Evenly, with the given number of cuts per crossed edge.
    Multicut(usize),
}

/// Options for [`knife`].
#[derive(Debug, Clone)]
pub struct KnifeOptions {
    /// Cut placement.
    pub mode: KnifeMode,

    /// Join the new vertices across their faces.
    pub connect: bool,

    /// Slack added around each projected edge's bounding box.
    pub bbox_epsilon: f64,

    /// Crossings this close to an endpoint (in screen units) snap to it and
    /// cut nothing. Not used in multicut mode.
    pub snap_distance: f64,
}

impl Default for KnifeOptions {
    fn default() -> Self {
        Self {
            mode: KnifeMode::Exact,
            connect: true,
            bbox_epsilon: 1e-3,
            snap_distance: 1e-6,
        }
    }
}

impl KnifeOptions {
    /// Set the cut placement.
    pub fn with_mode(mut self, mode: KnifeMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set whether new vertices are joined across faces.
    pub fn with_connect(mut self, connect: bool) -> Self {
        self.connect = connect;
        self
    }
}

/// Operator-specific output of [`knife`].
#[derive(Debug, Clone, Default)]
pub struct KnifeOutput {
    /// Number of edges the polyline crossed.
    pub crossed: usize,
}

#[inline]
fn cross(a: Vector2<f64>, b: Vector2<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Where the polyline first crosses the segment `a -> b`, as a fraction
/// measured from `a`.
///
/// Returns `None` when nothing crosses, or when the crossing snaps to an
/// endpoint.
pub fn polyline_crossing(a: Point2<f64>, b: Point2<f64>, polyline: &[Point2<f64>], options: &KnifeOptions) -> Option<f64> {
    let dir = b - a;
    if dir.norm_squared() == 0.0 || polyline.len() < 2 {
        return None;
    }
    let (lo, hi) = (a.inf(&b), b.sup(&a));
    let slack = Vector2::repeat(options.bbox_epsilon);
    let (lo, hi) = (lo - slack, hi + slack);
    let snaps = !matches!(options.mode, KnifeMode::Multicut(_));

    if snaps && polyline.iter().any(|p| *p == a || *p == b) {
        return None;
    }

    let side = |p: &Point2<f64>| cross(dir, p - a);
    let mut last = side(&polyline[0]);
    for w in polyline.windows(2) {
        let (p, q) = (w[0], w[1]);
        let dist = side(&q);
        if last * dist <= 0.0 {
            let seg = q - p;
            let denom = cross(dir, seg);
            let hit = if denom.abs() <= f64::EPSILON * dir.norm() * seg.norm() {
                // Collinear: cut in the middle of the overlap.
                let (plo, phi) = (p.inf(&q), p.sup(&q));
                Point2::from((hi.inf(&phi).coords + lo.sup(&plo).coords) * 0.5)
            } else {
                let t = cross(p - a, seg) / denom;
                a + dir * t
            };
            if hit.x >= lo.x && hit.x <= hi.x && hit.y >= lo.y && hit.y <= hi.y {
                if snaps && ((hit - a).norm() <= options.snap_distance || (hit - b).norm() <= options.snap_distance) {
                    return None;
                }
                // Measure along the dominant axis.
                let frac = if dir.x.abs() >= dir.y.abs() {
                    (hit.x - a.x) / dir.x
                } else {
                    (hit.y - a.y) / dir.y
                };
                return (frac > 0.0 && frac < 1.0).then_some(frac);
            }
        }
        last = dist;
    }
    None
}

/// Cut the selected edges along `polyline`.
///
/// `polyline` is in the same screen space as `projector`. Edges with an
/// unprojectable endpoint are skipped.
///
/// # Errors
///
/// Returns [`EditError::InvalidSelection`] if fewer than two vertices are
/// selected or the polyline has fewer than two points.
pub fn knife<P: Projector + ?Sized>(
    mesh: &mut Mesh,
    ctx: &EditContext,
    projector: &P,
    polyline: &[Point2<f64>],
    options: &KnifeOptions,
) -> Result<OpReport<KnifeOutput>> {
    if polyline.len() < 2 {
        return Err(EditError::invalid_selection("knife polyline needs at least two points"));
    }
    if let KnifeMode::Multicut(0) = options.mode {
        return Err(EditError::invalid_param("cuts", 0, "multicut needs at least one cut"));
    }
    execute(mesh, ctx, "knife", |mesh| {
        if mesh.selected_verts().len() < 2 {
            return Err(EditError::invalid_selection("knife needs at least two selected vertices"));
        }
        let screen = ProjectionTable::build(mesh, projector);

        let mut cuts = Vec::new();
        for e in mesh.selected_edges() {
            let [v0, v1] = mesh.edge(e).verts();
            let (Some(a), Some(b)) = (screen.get(v0), screen.get(v1)) else {
                continue;
            };
            let Some(frac) = polyline_crossing(a, b, polyline, options) else {
                continue;
            };
            trace!(edge = ?e, frac, "knife crossing");
            cuts.push(match options.mode {
                KnifeMode::Exact => EdgeCut {
                    edge: e,
                    fractions: vec![frac],
                },
                KnifeMode::Midpoints => EdgeCut::uniform(e, 1),
                KnifeMode::Multicut(n) => EdgeCut::uniform(e, n),
            });
        }

        let faces: BTreeSet<FaceId> = cuts.iter().flat_map(|c| mesh.edge_faces(c.edge)).collect();
        let new_verts: HashSet<VertexId> = split_edges_at(mesh, &cuts).into_iter().collect();
        if options.connect {
            let faces: Vec<FaceId> = faces.into_iter().collect();
            for e in connect_cut_vertices(mesh, &new_verts, &faces)? {
                mesh.select_edge(e, true);
            }
        }
        debug!(crossed = cuts.len(), verts = new_verts.len(), "knife cut");
        Ok(KnifeOutput { crossed: cuts.len() })
    })
}
