//! Edge subdivision and loop cuts.
//!
//! This module also hosts the two primitives the knife is built on:
//! [`split_edges_at`] inserts vertices along edges, and
//! [`connect_cut_vertices`] joins the inserted vertices across the faces
//! around them.
//!
//! Faces are reconnected by pattern, based on which of their sides carry new
//! vertices:
//!
//! | Cut sides                         | Pattern                                  |
//! |-----------------------------------|------------------------------------------|
//! | one                               | fan from the corner facing the cut side  |
//! | two                               | nested straight cuts between the sides   |
//! | all four of a quad, equal counts  | grid                                     |
//! | three or more otherwise           | corner cuts between neighbouring sides   |

use std::collections::{BTreeSet, HashSet};

use tracing::debug;

use super::{execute, EditContext, OpReport};
use crate::error::{EditError, Result};
use crate::mesh::{EdgeId, FaceId, LoopId, Mesh, VertexId};

/// Where to cut one edge.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeCut {
    /// The edge to cut.
    pub edge: EdgeId,
    /// Fractions along the edge, measured from `edge.verts()[0]`.
    pub fractions: Vec<f64>,
}

impl EdgeCut {
    /// `cuts` evenly spaced cuts.
    pub fn uniform(edge: EdgeId, cuts: usize) -> Self {
        let fractions = (1..=cuts).map(|j| j as f64 / (cuts + 1) as f64).collect();
        Self { edge, fractions }
    }
}

/// Split an edge at increasing fractions measured from `v_from`.
///
/// Returns the new vertices ordered from `v_from`.
fn split_edge_at(mesh: &mut Mesh, e: EdgeId, v_from: VertexId, fractions: &[f64]) -> Vec<VertexId> {
    let mut out = Vec::with_capacity(fractions.len());
    let (mut cur, mut from, mut done) = (e, v_from, 0.0);
    for &t in fractions {
        let fac = (t - done) / (1.0 - done);
        let (vn, rest) = mesh.split_edge(cur, from, fac);
        out.push(vn);
        cur = rest;
        from = vn;
        done = t;
    }
    out
}

/// Split edges at the given fractions.
///
/// Fractions outside `(0, 1)` are dropped and the rest sorted. Returns every
/// new vertex.
pub fn split_edges_at(mesh: &mut Mesh, cuts: &[EdgeCut]) -> Vec<VertexId> {
    let mut created = Vec::new();
    for cut in cuts {
        if !mesh.contains_edge(cut.edge) {
            continue;
        }
        let mut fractions: Vec<f64> = cut.fractions.iter().copied().filter(|t| *t > 0.0 && *t < 1.0).collect();
        fractions.sort_by(f64::total_cmp);
        fractions.dedup();
        let v0 = mesh.edge(cut.edge).verts()[0];
        created.extend(split_edge_at(mesh, cut.edge, v0, &fractions));
    }
    created
}

/// Join `a` and `b` across a face where both are non-adjacent corners.
///
/// Returns `None` if they already share an edge or no face holds both.
pub(crate) fn connect_verts(mesh: &mut Mesh, a: VertexId, b: VertexId) -> Result<Option<EdgeId>> {
    if a == b || mesh.edge_between(a, b).is_some() {
        return Ok(None);
    }
    let corners: Vec<LoopId> = mesh.vertex_loops(a).collect();
    for la in corners {
        let f = mesh.loop_(la).face();
        let Some(lb) = mesh.face_loop_at(f, b) else {
            continue;
        };
        if mesh.loop_(la).next() == lb || mesh.loop_(lb).next() == la {
            continue;
        }
        let (_, e) = mesh.split_face(f, la, lb)?;
        return Ok(Some(e));
    }
    Ok(None)
}

/// One side of a face: its starting corner and the new vertices on it.
struct Side {
    corner: VertexId,
    cuts: Vec<VertexId>,
}

/// The sides of `f` in winding order, or `None` if every corner is new.
fn face_sides(mesh: &Mesh, f: FaceId, new_verts: &HashSet<VertexId>) -> Option<Vec<Side>> {
    let start = mesh.face_loops(f).find(|&l| !new_verts.contains(&mesh.loop_(l).vert()))?;
    let mut sides: Vec<Side> = Vec::new();
    for l in mesh.loops_from(start) {
        let v = mesh.loop_(l).vert();
        if new_verts.contains(&v) {
            if let Some(side) = sides.last_mut() {
                side.cuts.push(v);
            }
        } else {
            sides.push(Side {
                corner: v,
                cuts: Vec::new(),
            });
        }
    }
    Some(sides)
}

/// Connect new vertices across every face in `faces`.
///
/// `new_verts` are the vertices inserted by [`split_edges_at`]. Returns the
/// connecting edges.
pub fn connect_cut_vertices(
    mesh: &mut Mesh,
    new_verts: &HashSet<VertexId>,
    faces: &[FaceId],
) -> Result<Vec<EdgeId>> {
    let mut created = Vec::new();
    for &f in faces {
        if !mesh.contains_face(f) {
            continue;
        }
        let Some(sides) = face_sides(mesh, f, new_verts) else {
            continue;
        };
        let k = sides.len();
        let cut: Vec<usize> = (0..k).filter(|&i| !sides[i].cuts.is_empty()).collect();

        let mut pairs: Vec<(VertexId, VertexId)> = Vec::new();
        match cut.as_slice() {
            [] => continue,
            &[i] => {
                let apex = sides[(i + 1 + k / 2) % k].corner;
                pairs.extend(sides[i].cuts.iter().map(|&c| (apex, c)));
            }
            &[i, j] => {
                let (sa, sb) = (&sides[i].cuts, &sides[j].cuts);
                let n = sa.len().min(sb.len());
                pairs.extend((0..n).map(|m| (sa[m], sb[sb.len() - 1 - m])));
            }
            _ if k == 4 && cut.len() == 4 && sides.iter().all(|s| s.cuts.len() == sides[0].cuts.len()) => {
                created.extend(grid_fill(mesh, &sides)?);
                continue;
            }
            _ => {
                for (m, &i) in cut.iter().enumerate() {
                    let j = cut[(m + 1) % cut.len()];
                    if let (Some(&last), Some(&first)) = (sides[i].cuts.last(), sides[j].cuts.first()) {
                        pairs.push((last, first));
                    }
                }
            }
        }
        for (a, b) in pairs {
            if let Some(e) = connect_verts(mesh, a, b)? {
                created.push(e);
            }
        }
    }
    debug!(faces = faces.len(), edges = created.len(), "connected cut vertices");
    Ok(created)
}

/// Grid pattern for a quad with `n` cuts on every side.
///
/// Parallel cuts go from side 0 to side 2 first; each cut is then split `n`
/// times and the rows are joined from side 3 to side 1.
fn grid_fill(mesh: &mut Mesh, sides: &[Side]) -> Result<Vec<EdgeId>> {
    let n = sides[0].cuts.len();
    let (s0, s1, s2, s3) = (&sides[0].cuts, &sides[1].cuts, &sides[2].cuts, &sides[3].cuts);
    let mut created = Vec::new();

    // columns[c][r]: column c from the side-3 end, row r from the side-0 end.
    let mut columns: Vec<Vec<VertexId>> = Vec::with_capacity(n + 2);
    columns.push(s3.iter().rev().copied().collect());
    for i in 0..n {
        let (a, b) = (s0[i], s2[n - 1 - i]);
        let Some(line) = connect_verts(mesh, a, b)? else {
            return Err(EditError::degenerate("grid fill could not span the quad"));
        };
        created.push(line);
        columns.push(split_edge_at(mesh, line, a, &EdgeCut::uniform(line, n).fractions));
    }
    columns.push(s1.clone());

    for c in 0..=n {
        for r in 0..n {
            if let Some(e) = connect_verts(mesh, columns[c][r], columns[c + 1][r])? {
                created.push(e);
            }
        }
    }
    Ok(created)
}

/// Options for [`subdivide_edges`].
#[derive(Debug, Clone)]
pub struct SubdivideOptions {
    /// New vertices per edge.
    pub cuts: usize,
}

impl Default for SubdivideOptions {
    fn default() -> Self {
        Self { cuts: 1 }
    }
}

impl SubdivideOptions {
    /// Set the number of cuts per edge.
    pub fn with_cuts(mut self, cuts: usize) -> Self {
        self.cuts = cuts;
        self
    }
}

/// Subdivide every selected edge and reconnect the faces around them.
///
/// # Errors
///
/// Returns [`EditError::InvalidParameter`] if `cuts` is zero.
pub fn subdivide_edges(mesh: &mut Mesh, ctx: &EditContext, options: &SubdivideOptions) -> Result<OpReport> {
    if options.cuts == 0 {
        return Err(EditError::invalid_param("cuts", options.cuts, "must be at least 1"));
    }
    execute(mesh, ctx, "subdivide_edges", |mesh| {
        let edges = mesh.selected_edges();
        let faces: BTreeSet<FaceId> = edges.iter().flat_map(|&e| mesh.edge_faces(e)).collect();
        let cuts: Vec<EdgeCut> = edges.iter().map(|&e| EdgeCut::uniform(e, options.cuts)).collect();
        let new_verts: HashSet<VertexId> = split_edges_at(mesh, &cuts).into_iter().collect();
        let faces: Vec<FaceId> = faces.into_iter().collect();
        for e in connect_cut_vertices(mesh, &new_verts, &faces)? {
            mesh.select_edge(e, true);
        }
        Ok(())
    })
}

/// Options for [`loop_cut`].
#[derive(Debug, Clone)]
pub struct LoopCutOptions {
    /// Number of edge loops to insert.
    pub cuts: usize,
}

impl Default for LoopCutOptions {
    fn default() -> Self {
        Self { cuts: 1 }
    }
}

impl LoopCutOptions {
    /// Set the number of loops.
    pub fn with_cuts(mut self, cuts: usize) -> Self {
        self.cuts = cuts;
        self
    }
}

/// Edge ring through `start`, each edge paired with the endpoint on the
/// same side of the ring. The flag is set when the ring closes.
fn edge_ring(mesh: &Mesh, start: EdgeId) -> (Vec<(EdgeId, VertexId)>, bool) {
    let s0 = mesh.edge(start).verts()[0];
    let mut seen: HashSet<EdgeId> = HashSet::from([start]);
    let mut halves: [Vec<(EdgeId, VertexId)>; 2] = [Vec::new(), Vec::new()];

    let first = mesh.edge(start).first_loop();
    let second = first.map(|l| mesh.loop_(l).radial_next()).filter(|&l| Some(l) != first);
    for (side, entry) in [first, second].into_iter().enumerate() {
        let Some(mut l) = entry else {
            continue;
        };
        let mut s = s0;
        loop {
            let corner = mesh.loop_(l);
            if mesh.face(corner.face()).len() != 4 {
                break;
            }
            let lo_id = mesh.loop_(corner.next()).next();
            let lo = mesh.loop_(lo_id);
            let across = if corner.vert() == s {
                mesh.loop_(lo.next()).vert()
            } else {
                lo.vert()
            };
            let e = lo.edge();
            if e == start {
                return (ring_from_halves(start, s0, halves), true);
            }
            if !seen.insert(e) {
                break;
            }
            halves[side].push((e, across));
            if !mesh.is_manifold_edge(e) {
                break;
            }
            l = lo.radial_next();
            s = across;
        }
    }
    (ring_from_halves(start, s0, halves), false)
}

fn ring_from_halves(start: EdgeId, s0: VertexId, halves: [Vec<(EdgeId, VertexId)>; 2]) -> Vec<(EdgeId, VertexId)> {
    let [forward, backward] = halves;
    let mut ring: Vec<(EdgeId, VertexId)> = backward.into_iter().rev().collect();
    ring.push((start, s0));
    ring.extend(forward);
    ring
}

/// Insert evenly spaced edge loops across the quad ring through `edge`.
///
/// Only the new loops are left selected.
///
/// # Errors
///
/// Returns [`EditError::InvalidParameter`] if `cuts` is zero and
/// [`EditError::InvalidSelection`] if `edge` has no quad to cut across.
pub fn loop_cut(mesh: &mut Mesh, ctx: &EditContext, edge: EdgeId, options: &LoopCutOptions) -> Result<OpReport> {
    if options.cuts == 0 {
        return Err(EditError::invalid_param("cuts", options.cuts, "must be at least 1"));
    }
    execute(mesh, ctx, "loop_cut", |mesh| {
        if !mesh.contains_edge(edge) || !mesh.edge_faces(edge).any(|f| mesh.face(f).len() == 4) {
            return Err(EditError::invalid_selection("loop cut needs an edge on a quad"));
        }
        let (ring, closed) = edge_ring(mesh, edge);
        debug!(ring = ring.len(), closed, "walked edge ring");

        let fractions = EdgeCut::uniform(edge, options.cuts).fractions;
        let rows: Vec<Vec<VertexId>> = ring
            .iter()
            .map(|&(e, s)| split_edge_at(mesh, e, s, &fractions))
            .collect();

        let mut loops = Vec::new();
        let links = if closed { rows.len() } else { rows.len() - 1 };
        for k in 0..links {
            let (a, b) = (&rows[k], &rows[(k + 1) % rows.len()]);
            for j in 0..options.cuts {
                if let Some(e) = connect_verts(mesh, a[j], b[j])? {
                    loops.push(e);
                }
            }
        }

        mesh.select_all(false);
        for e in loops {
            mesh.select_edge(e, true);
        }
        Ok(())
    })
}
