//! Rip: tear a vertex or an edge path away from its neighbours.
//!
//! The side that detaches is the one nearest a 2D reference point (usually
//! the cursor), compared in the screen space of a [`Projector`]. Ripped
//! copies are left selected, ready to be moved.
//!
//! A single vertex is torn along the edge or edges nearest the reference:
//! one cut opens a boundary vertex, two cuts are needed inside a closed fan.
//! A wire vertex splits between its wire edges, and a vertex with three
//! faces gives up the face corner whose bisector runs nearest the reference.
//!
//! An edge path first grows by one edge at every end that touches exactly
//! one selected edge. Then every two-faced edge is duplicated, one copy per
//! face, and each path vertex whose faces came apart is split in two. A path
//! end inside the surface stays shared, so the rip opens like a slit.

use std::collections::{BTreeSet, HashMap, HashSet};

use nalgebra::{Point2, Point3};
use tracing::debug;

use super::projection::Projector;
use super::{execute, EditContext, OpReport};
use crate::error::{EditError, Result};
use crate::mesh::{EdgeId, ElemFlags, FaceId, LoopId, Mesh, VertexId};

/// Options for [`rip`].
#[derive(Debug, Clone)]
pub struct RipOptions {
    /// Screen-space point choosing the side that detaches.
    pub reference: Point2<f64>,
    /// Bridge the opened seam with new faces.
    pub fill: bool,
}

impl Default for RipOptions {
    fn default() -> Self {
        Self {
            reference: Point2::origin(),
            fill: false,
        }
    }
}

impl RipOptions {
    /// Rip towards `reference`.
    pub fn new(reference: Point2<f64>) -> Self {
        Self {
            reference,
            ..Default::default()
        }
    }

    /// Set whether the seam is filled.
    pub fn with_fill(mut self, fill: bool) -> Self {
        self.fill = fill;
        self
    }
}

/// Operator-specific output of [`rip`].
#[derive(Debug, Clone, Default)]
pub struct RipOutput {
    /// Vertices created on the detached side.
    pub ripped: Vec<VertexId>,
    /// Faces bridging the seam, when filling.
    pub fill_faces: Vec<FaceId>,
}

/// Distance from `p` to the segment `a`-`b`.
fn segment_distance(p: Point2<f64>, a: Point2<f64>, b: Point2<f64>) -> f64 {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    let t = if len_sq > 0.0 {
        ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    (p - (a + ab * t)).norm()
}

fn screen_distance<P: Projector + ?Sized>(projector: &P, reference: Point2<f64>, p: &Point3<f64>) -> f64 {
    projector
        .project(p)
        .map_or(f64::INFINITY, |q| (q - reference).norm())
}

/// Screen distance from the reference to the stroke running from `v` to `p`.
fn stroke_distance<P: Projector + ?Sized>(
    mesh: &Mesh,
    projector: &P,
    reference: Point2<f64>,
    v: VertexId,
    p: &Point3<f64>,
) -> f64 {
    match (projector.project(mesh.position(v)), projector.project(p)) {
        (Some(a), Some(b)) => segment_distance(reference, a, b),
        _ => f64::INFINITY,
    }
}

/// A point inside the face of corner `l`, along the corner bisector and half
/// the shorter adjacent edge away from the corner.
fn corner_point(mesh: &Mesh, l: LoopId) -> Point3<f64> {
    let corner = mesh.loop_(l);
    let co = *mesh.position(corner.vert());
    let to_prev = *mesh.position(mesh.loop_(corner.prev()).vert()) - co;
    let to_next = *mesh.position(mesh.loop_(corner.next()).vert()) - co;
    let reach = 0.5 * to_prev.norm().min(to_next.norm());
    let (Some(d1), Some(d2)) = (to_prev.try_normalize(f64::EPSILON), to_next.try_normalize(f64::EPSILON)) else {
        return co;
    };
    // Reflex corners bisect outwards; flip those back into the face.
    let inward = mesh.face_normal(corner.face()).cross(&d2);
    let bisector = d1 + d2;
    let tangent = if bisector.norm_squared() < 1e-12 {
        inward
    } else if bisector.dot(&inward) < 0.0 {
        -bisector
    } else {
        bisector
    };
    co + tangent.try_normalize(f64::EPSILON).unwrap_or(inward) * reach
}

/// Closest screen distance from the reference to a face of `fan`, or to a
/// wire edge of `v` when the fan has no faces.
fn fan_score<P: Projector + ?Sized>(
    mesh: &Mesh,
    projector: &P,
    reference: Point2<f64>,
    v: VertexId,
    fan: &[EdgeId],
) -> f64 {
    let faces = fan
        .iter()
        .flat_map(|&e| mesh.edge_faces(e))
        .map(|f| screen_distance(projector, reference, &mesh.face_centroid(f)));
    let wires = fan
        .iter()
        .filter(|&&e| mesh.is_wire(e))
        .map(|&e| stroke_distance(mesh, projector, reference, v, &mesh.edge_midpoint(e)));
    faces.chain(wires).fold(f64::INFINITY, f64::min)
}

/// Selected vertices grouped by selected edges.
fn selection_components(mesh: &Mesh) -> usize {
    let selected: HashSet<VertexId> = mesh.selected_verts().into_iter().collect();
    let mut seen: HashSet<VertexId> = HashSet::new();
    let mut count = 0;
    for &start in &selected {
        if !seen.insert(start) {
            continue;
        }
        count += 1;
        let mut stack = vec![start];
        while let Some(v) = stack.pop() {
            for e in mesh.disk_edges(v).filter(|&e| mesh.is_edge_selected(e)) {
                let w = mesh.edge(e).other_vert(v);
                if selected.contains(&w) && seen.insert(w) {
                    stack.push(w);
                }
            }
        }
    }
    count
}

fn rip_vertex<P: Projector + ?Sized>(
    mesh: &mut Mesh,
    v: VertexId,
    projector: &P,
    reference: Point2<f64>,
) -> Option<VertexId> {
    // Boundary and wire edges are where the vertex can already come apart.
    let candidates = mesh
        .disk_edges(v)
        .filter(|&e| mesh.is_boundary_edge(e) || mesh.is_wire(e))
        .count();

    if mesh.vertex_faces(v).next().is_none() {
        if candidates < 2 {
            return None;
        }
        let (_, best) = mesh
            .disk_edges(v)
            .map(|e| (stroke_distance(mesh, projector, reference, v, &mesh.edge_midpoint(e)), e))
            .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)))?;
        return Some(mesh.separate_fan(v, &[best]));
    }

    let mut fans = mesh.vertex_fans(v);
    if fans.len() == 1 {
        if mesh.vertex_degree(v) == 3 && mesh.vertex_faces(v).count() == 3 {
            return rip_corner(mesh, v, projector, reference);
        }
        // Two candidates bound an open fan and one cut splits it between
        // them. A closed fan needs two cuts.
        let cuts = if candidates == 2 { 1 } else { 2 };
        let fan = fans.swap_remove(0);
        let mut inner: Vec<(f64, EdgeId)> = fan
            .iter()
            .filter(|&&e| mesh.is_manifold_edge(e))
            .map(|&e| {
                let w = mesh.edge(e).other_vert(v);
                (stroke_distance(mesh, projector, reference, v, mesh.position(w)), e)
            })
            .collect();
        if inner.len() < cuts {
            debug!(?v, "vertex fan has nothing to tear along");
            return None;
        }
        inner.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        for &(_, e) in inner.iter().take(cuts) {
            let l = mesh.edge(e).first_loop()?;
            let other = mesh.loop_(l).radial_next();
            mesh.separate_edge(e, other);
        }
        fans = mesh.vertex_fans(v);
    }

    let best = fans
        .iter()
        .map(|fan| fan_score(mesh, projector, reference, v, fan))
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)?;
    Some(mesh.separate_fan(v, &fans[best]))
}

/// Tear one face corner off a vertex with three edges and three faces: the
/// corner whose bisector runs nearest the reference.
fn rip_corner<P: Projector + ?Sized>(
    mesh: &mut Mesh,
    v: VertexId,
    projector: &P,
    reference: Point2<f64>,
) -> Option<VertexId> {
    let (_, l) = mesh
        .vertex_loops(v)
        .map(|l| (stroke_distance(mesh, projector, reference, v, &corner_point(mesh, l)), l))
        .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)))?;
    let prev = mesh.loop_(l).prev();
    for corner in [l, prev] {
        let e = mesh.loop_(corner).edge();
        if mesh.is_manifold_edge(e) {
            mesh.separate_edge(e, corner);
        }
    }
    let own = mesh.loop_(l).edge();
    let fan = mesh.vertex_fans(v).into_iter().find(|fan| fan.contains(&own))?;
    Some(mesh.separate_fan(v, &fan))
}

/// The corner of `l`'s face on the other edge that face has at `v`.
fn other_corner(mesh: &Mesh, l: LoopId, v: VertexId) -> LoopId {
    let corner = mesh.loop_(l);
    if corner.vert() == v {
        corner.prev()
    } else {
        corner.next()
    }
}

/// Edges extending the selected path by one step at every vertex that
/// touches exactly one selected edge.
///
/// At a vertex with three or four edges, or one on a boundary, the step
/// crosses the face on the reference side and continues to the edge across
/// from the selected one. Around larger manifold fans it takes the edge
/// halfway round.
fn grow_path<P: Projector + ?Sized>(mesh: &Mesh, projector: &P, reference: Point2<f64>) -> Vec<EdgeId> {
    let ends: BTreeSet<VertexId> = mesh
        .selected_edges()
        .into_iter()
        .filter(|&e| !mesh.is_wire(e))
        .flat_map(|e| mesh.edge(e).verts())
        .collect();
    let side = |l: LoopId| screen_distance(projector, reference, &mesh.face_centroid(mesh.loop_(l).face()));

    let mut grown: Vec<EdgeId> = Vec::new();
    for v in ends {
        let faced: Vec<EdgeId> = mesh.disk_edges(v).filter(|&e| !mesh.is_wire(e)).collect();
        let touching: Vec<EdgeId> = faced.iter().copied().filter(|&e| mesh.is_edge_selected(e)).collect();
        let &[e] = touching.as_slice() else {
            continue;
        };
        let Some(la) = mesh.edge(e).first_loop() else {
            continue;
        };
        let all_manifold = faced.iter().all(|&x| mesh.is_manifold_edge(x));

        let next = if faced.len() == 3 || faced.len() == 4 || !all_manifold {
            let lb = mesh.loop_(la).radial_next();
            let near = if side(la) <= side(lb) { la } else { lb };
            let beside = other_corner(mesh, near, v);
            let edge = mesh.loop_(beside).edge();
            if !mesh.is_manifold_edge(edge) {
                continue;
            }
            if faced.len() == 3 {
                edge
            } else {
                let across = mesh.loop_(beside).radial_next();
                mesh.loop_(other_corner(mesh, across, v)).edge()
            }
        } else {
            let mut l = la;
            for _ in 0..faced.len() / 2 {
                l = mesh.loop_(other_corner(mesh, l, v)).radial_next();
            }
            mesh.loop_(l).edge()
        };
        if next != e && !grown.contains(&next) {
            grown.push(next);
        }
    }
    grown
}

/// Choose, for each cut pair, the half on the side nearest the reference,
/// keeping the choice consistent along connected stretches of the path.
fn ripped_halves<P: Projector + ?Sized>(
    mesh: &Mesh,
    projector: &P,
    reference: Point2<f64>,
    pairs: &[[EdgeId; 2]],
) -> HashSet<EdgeId> {
    let mut at: HashMap<VertexId, Vec<usize>> = HashMap::new();
    for (i, &[e, _]) in pairs.iter().enumerate() {
        for v in mesh.edge(e).verts() {
            at.entry(v).or_default().push(i);
        }
    }
    let half_score = |e: EdgeId| {
        mesh.edge_faces(e)
            .map(|f| screen_distance(projector, reference, &mesh.face_centroid(f)))
            .fold(f64::INFINITY, f64::min)
    };

    let mut ripped: HashSet<EdgeId> = HashSet::new();
    let mut decided = vec![false; pairs.len()];
    for start in 0..pairs.len() {
        if decided[start] {
            continue;
        }
        let [a, b] = pairs[start];
        let pick = if half_score(a) <= half_score(b) { a } else { b };
        ripped.insert(pick);
        decided[start] = true;

        let mut stack = vec![pick];
        while let Some(r) = stack.pop() {
            for v in mesh.edge(r).verts() {
                let fans = mesh.vertex_fans(v);
                let Some(fan) = fans.iter().find(|fan| fan.contains(&r)) else {
                    continue;
                };
                for &j in at.get(&v).map(Vec::as_slice).unwrap_or_default() {
                    if decided[j] {
                        continue;
                    }
                    let [x, y] = pairs[j];
                    let half = match (fan.contains(&x), fan.contains(&y)) {
                        (true, false) => x,
                        (false, true) => y,
                        _ => continue,
                    };
                    ripped.insert(half);
                    decided[j] = true;
                    stack.push(half);
                }
            }
        }
    }
    ripped
}

/// Where a seam came apart: the kept edge and its ripped twin.
struct Seam {
    kept: EdgeId,
    ripped: EdgeId,
}

fn rip_edges<P: Projector + ?Sized>(
    mesh: &mut Mesh,
    projector: &P,
    reference: Point2<f64>,
) -> (Vec<VertexId>, Vec<Seam>, HashMap<VertexId, VertexId>) {
    let grown = grow_path(mesh, projector, reference);
    let mut tagged = mesh.selected_edges();
    tagged.extend(grown);
    tagged.retain(|&e| mesh.is_manifold_edge(e));
    let path: BTreeSet<VertexId> = tagged.iter().flat_map(|&e| mesh.edge(e).verts()).collect();

    let mut pairs: Vec<[EdgeId; 2]> = Vec::new();
    for e in tagged {
        let Some(l) = mesh.edge(e).first_loop() else {
            continue;
        };
        let other = mesh.loop_(l).radial_next();
        let half = mesh.separate_edge(e, other);
        pairs.push([e, half]);
    }
    let ripped = ripped_halves(mesh, projector, reference, &pairs);

    let mut new_verts = Vec::new();
    let mut origin: HashMap<VertexId, VertexId> = HashMap::new();
    for v in path {
        let fans = mesh.vertex_fans(v);
        if fans.len() < 2 {
            continue;
        }
        let Some(fan) = fans.iter().find(|fan| fan.iter().any(|e| ripped.contains(e))) else {
            continue;
        };
        let nv = mesh.separate_fan(v, fan);
        origin.insert(nv, v);
        new_verts.push(nv);
    }

    let mut seams = Vec::new();
    for [a, b] in pairs {
        let same = {
            let [p, q] = mesh.edge(a).verts();
            mesh.edge(b).has_vert(p) && mesh.edge(b).has_vert(q)
        };
        if same {
            mesh.edge_splice(a, b);
        } else if ripped.contains(&a) {
            seams.push(Seam { kept: b, ripped: a });
        } else {
            seams.push(Seam { kept: a, ripped: b });
        }
    }
    (new_verts, seams, origin)
}

/// Bridge each opened seam with a quad, or a triangle at a slit end.
fn fill_seams(mesh: &mut Mesh, seams: &[Seam], origin: &HashMap<VertexId, VertexId>) -> Result<Vec<FaceId>> {
    let mut faces = Vec::new();
    for seam in seams {
        let Some(l) = mesh.edge(seam.kept).first_loop() else {
            continue;
        };
        let corner = *mesh.loop_(l);
        let x = corner.vert();
        let y = mesh.edge(seam.kept).other_vert(x);
        let image = |v: VertexId| {
            mesh.edge(seam.ripped)
                .verts()
                .into_iter()
                .find(|&r| r == v || origin.get(&r) == Some(&v))
        };
        let (Some(x2), Some(y2)) = (image(x), image(y)) else {
            return Err(EditError::degenerate("ripped edge lost track of its source"));
        };
        let mut verts = vec![y, x];
        if x2 != x {
            verts.push(x2);
        }
        if y2 != y {
            verts.push(y2);
        }
        let f = mesh.create_face(&verts, None)?;
        let src = mesh.face(corner.face());
        let (mat_nr, smooth) = (src.mat_nr, src.flags & ElemFlags::SMOOTH);
        let face = mesh.face_mut(f);
        face.mat_nr = mat_nr;
        face.flags |= smooth;
        faces.push(f);
    }
    Ok(faces)
}

/// Rip the selected vertex or edge path.
///
/// # Errors
///
/// Returns [`EditError::InvalidSelection`] if faces are selected or the
/// selection is not connected.
pub fn rip<P: Projector + ?Sized>(
    mesh: &mut Mesh,
    ctx: &EditContext,
    projector: &P,
    options: &RipOptions,
) -> Result<OpReport<RipOutput>> {
    execute(mesh, ctx, "rip", |mesh| {
        if !mesh.selected_faces().is_empty() {
            return Err(EditError::invalid_selection("rip works on vertices and edges, not faces"));
        }
        let verts = mesh.selected_verts();
        if verts.is_empty() {
            return Ok(RipOutput::default());
        }
        if selection_components(mesh) > 1 {
            return Err(EditError::invalid_selection("rip needs one connected selection"));
        }

        let mut output = RipOutput::default();
        if mesh.selected_edges().is_empty() {
            let v = verts[0];
            if let Some(nv) = rip_vertex(mesh, v, projector, options.reference) {
                mesh.select_all(false);
                mesh.select_vert(nv, true);
                output.ripped.push(nv);
            }
        } else {
            let (ripped, seams, origin) = rip_edges(mesh, projector, options.reference);
            if options.fill {
                output.fill_faces = fill_seams(mesh, &seams, &origin)?;
            }
            mesh.select_all(false);
            for seam in &seams {
                mesh.select_edge(seam.ripped, true);
            }
            output.ripped = ripped;
        }
        debug!(ripped = output.ripped.len(), filled = output.fill_faces.len(), "ripped");
        Ok(output)
    })
}
