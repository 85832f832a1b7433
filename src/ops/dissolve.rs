//! Dissolve and delete.
//!
//! Dissolving removes elements and merges the faces around them into one
//! larger face, keeping the surface closed. Deleting removes elements and
//! everything that depends on them, leaving a hole.
//!
//! Merging is done region by region: the connected faces to merge are
//! traced along their outline, then replaced by a single face over that
//! outline. A region whose outline is not a single simple cycle (a ring of
//! faces around a hole, or one pinched at a vertex) is left alone.

use std::collections::{BTreeSet, HashSet};

use tracing::debug;

use super::{execute, EditContext, OpReport};
use crate::error::{EditError, Result};
use crate::mesh::{EdgeId, FaceId, LoopId, Mesh, VertexId};

/// Options for the dissolve operators.
#[derive(Debug, Clone, Default)]
pub struct DissolveOptions {
    /// Also dissolve vertices left with exactly two edges along the merged
    /// outline.
    pub use_verts: bool,
}

impl DissolveOptions {
    /// Set whether pass-through vertices are dissolved too.
    pub fn with_use_verts(mut self, use_verts: bool) -> Self {
        self.use_verts = use_verts;
        self
    }
}

/// Operator-specific output of the dissolve operators.
#[derive(Debug, Clone, Default)]
pub struct DissolveOutput {
    /// Faces created by merging.
    pub merged: Vec<FaceId>,
}

/// What [`delete`] removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteKind {
    /// Selected vertices with their edges and faces.
    Verts,
    /// Selected edges with their faces, and vertices left without edges.
    Edges,
    /// Selected faces, and edges and vertices no other face uses.
    Faces,
    /// Selected faces only; their edges and vertices stay.
    OnlyFaces,
}

/// Outline of a face region in winding order.
struct Outline {
    verts: Vec<VertexId>,
    edges: Vec<EdgeId>,
    interior: Vec<EdgeId>,
}

/// The other region corner on an interior edge.
fn twin(mesh: &Mesh, region: &HashSet<FaceId>, l: LoopId) -> Option<LoopId> {
    let e = mesh.loop_(l).edge();
    mesh.radial_loops(e)
        .find(|&r| r != l && region.contains(&mesh.loop_(r).face()))
}

/// Trace the outline of `region`, or `None` if it is not one simple cycle.
fn region_outline(mesh: &Mesh, region: &HashSet<FaceId>) -> Option<Outline> {
    let edges: BTreeSet<EdgeId> = region.iter().flat_map(|&f| mesh.face_edges(f)).collect();
    let mut boundary: BTreeSet<LoopId> = BTreeSet::new();
    let mut interior = Vec::new();
    for &e in &edges {
        let (inside, outside): (Vec<LoopId>, Vec<LoopId>) =
            mesh.radial_loops(e).partition(|&l| region.contains(&mesh.loop_(l).face()));
        match (inside.as_slice(), outside.is_empty()) {
            (&[l], _) => {
                boundary.insert(l);
            }
            (&[a, b], true) if mesh.loop_(a).vert() != mesh.loop_(b).vert() => interior.push(e),
            _ => return None,
        }
    }

    let &start = boundary.first()?;
    let total: usize = region.iter().map(|&f| mesh.face(f).len()).sum();
    let mut out = Outline {
        verts: Vec::new(),
        edges: Vec::new(),
        interior,
    };
    let mut cur = start;
    loop {
        out.verts.push(mesh.loop_(cur).vert());
        out.edges.push(mesh.loop_(cur).edge());
        if out.verts.len() > boundary.len() {
            return None;
        }
        let mut next = mesh.loop_(cur).next();
        let mut steps = 0;
        while !boundary.contains(&next) {
            next = mesh.loop_(twin(mesh, region, next)?).next();
            steps += 1;
            if steps > total {
                return None;
            }
        }
        if next == start {
            break;
        }
        cur = next;
    }

    let distinct: HashSet<VertexId> = out.verts.iter().copied().collect();
    if out.verts.len() != boundary.len() || distinct.len() != out.verts.len() {
        return None;
    }
    Some(out)
}

/// Replace `region` by one face over its outline.
///
/// Returns `None` when the outline is not a simple cycle and nothing was
/// changed.
fn merge_region(mesh: &mut Mesh, region: &HashSet<FaceId>) -> Result<Option<FaceId>> {
    let Some(outline) = region_outline(mesh, region) else {
        debug!(faces = region.len(), "region outline is not a simple cycle, skipped");
        return Ok(None);
    };
    let n = outline.verts.len();
    if n < 3 {
        return Err(EditError::degenerate(format!("merged face would have {} corners", n)));
    }
    let corners: HashSet<VertexId> = outline.verts.iter().copied().collect();
    let duplicate = mesh
        .vertex_faces(outline.verts[0])
        .filter(|f| !region.contains(f))
        .any(|f| mesh.face(f).len() == n && mesh.face_vertices(f).all(|v| corners.contains(&v)));
    if duplicate {
        return Err(EditError::degenerate("merged face would duplicate an existing face"));
    }

    let Some(&template) = region.iter().min() else {
        return Ok(None);
    };
    let attrs = mesh.face(template).clone();
    let inner: BTreeSet<VertexId> = region
        .iter()
        .flat_map(|&f| mesh.face_vertices(f))
        .filter(|v| !corners.contains(v))
        .collect();

    for &f in region {
        mesh.kill_face(f);
    }
    for &e in &outline.interior {
        mesh.kill_edge(e);
    }
    for v in inner {
        if mesh.vertex(v).edge().is_none() {
            mesh.kill_vertex(v);
        }
    }
    let f = mesh.create_face(&outline.verts, Some(&outline.edges))?;
    mesh.face_mut(f).copy_attrs(&attrs);
    let no = mesh.face_normal(f);
    mesh.face_mut(f).no = no;
    Ok(Some(f))
}

/// Dissolve `v` if it has two edges and every face through it keeps at
/// least three corners. Returns whether it was dissolved.
fn dissolve_pass_through(mesh: &mut Mesh, v: VertexId) -> Result<bool> {
    if !mesh.contains_vertex(v) || mesh.vertex_degree(v) != 2 {
        return Ok(false);
    }
    let ends: Vec<VertexId> = mesh.vertex_neighbors(v).collect();
    let safe = mesh.vertex_faces(v).all(|f| mesh.face(f).len() > 3)
        && ends[0] != ends[1]
        && mesh.edge_between(ends[0], ends[1]).is_none();
    if !safe {
        return Ok(false);
    }
    mesh.join_edges_kill_vertex(v)?;
    Ok(true)
}

/// Connected groups of `faces`, joined across `links` edges.
fn face_groups(mesh: &Mesh, faces: &BTreeSet<FaceId>, links: &HashSet<EdgeId>) -> Vec<HashSet<FaceId>> {
    let mut seen: HashSet<FaceId> = HashSet::new();
    let mut groups = Vec::new();
    for &start in faces {
        if !seen.insert(start) {
            continue;
        }
        let mut group = HashSet::from([start]);
        let mut stack = vec![start];
        while let Some(f) = stack.pop() {
            for e in mesh.face_edges(f).filter(|e| links.contains(e)) {
                for g in mesh.edge_faces(e) {
                    if faces.contains(&g) && seen.insert(g) {
                        group.insert(g);
                        stack.push(g);
                    }
                }
            }
        }
        groups.push(group);
    }
    groups
}

fn merge_across_edges(mesh: &mut Mesh, use_verts: bool) -> Result<Vec<FaceId>> {
    let links: HashSet<EdgeId> = mesh
        .selected_edges()
        .into_iter()
        .filter(|&e| mesh.is_manifold_edge(e))
        .collect();
    let faces: BTreeSet<FaceId> = links.iter().flat_map(|&e| mesh.edge_faces(e)).collect();
    let ends: BTreeSet<VertexId> = links.iter().flat_map(|&e| mesh.edge(e).verts()).collect();

    let mut merged = Vec::new();
    for group in face_groups(mesh, &faces, &links) {
        if group.len() < 2 {
            continue;
        }
        if let Some(f) = merge_region(mesh, &group)? {
            merged.push(f);
        }
    }
    if use_verts {
        for v in ends {
            dissolve_pass_through(mesh, v)?;
        }
    }
    Ok(merged)
}

/// Dissolve the selected edges, merging the faces on either side.
///
/// Wire and boundary edges are left alone.
pub fn dissolve_edges(mesh: &mut Mesh, ctx: &EditContext, options: &DissolveOptions) -> Result<OpReport<DissolveOutput>> {
    execute(mesh, ctx, "dissolve_edges", |mesh| {
        let merged = merge_across_edges(mesh, options.use_verts)?;
        Ok(DissolveOutput { merged })
    })
}

/// Dissolve the selected edges and the vertices they leave with two edges,
/// then select the merged faces.
pub fn dissolve_edge_loop(mesh: &mut Mesh, ctx: &EditContext) -> Result<OpReport<DissolveOutput>> {
    execute(mesh, ctx, "dissolve_edge_loop", |mesh| {
        let merged = merge_across_edges(mesh, true)?;
        for &f in &merged {
            if mesh.contains_face(f) {
                mesh.select_face(f, true);
            }
        }
        Ok(DissolveOutput { merged })
    })
}

/// Merge each connected group of selected faces into one face.
pub fn dissolve_faces(mesh: &mut Mesh, ctx: &EditContext, options: &DissolveOptions) -> Result<OpReport<DissolveOutput>> {
    execute(mesh, ctx, "dissolve_faces", |mesh| {
        let faces: BTreeSet<FaceId> = mesh.selected_faces().into_iter().collect();
        let links: HashSet<EdgeId> = faces
            .iter()
            .flat_map(|&f| mesh.face_edges(f))
            .filter(|&e| mesh.edge_faces(e).all(|g| faces.contains(&g)))
            .collect();

        let pivots: BTreeSet<VertexId> = links
            .iter()
            .filter(|&&e| mesh.is_manifold_edge(e))
            .flat_map(|&e| mesh.edge(e).verts())
            .collect();

        let mut merged = Vec::new();
        for group in face_groups(mesh, &faces, &links) {
            if group.len() < 2 {
                continue;
            }
            if let Some(f) = merge_region(mesh, &group)? {
                merged.push(f);
            }
        }
        if options.use_verts {
            for v in pivots {
                dissolve_pass_through(mesh, v)?;
            }
        }
        Ok(DissolveOutput { merged })
    })
}

/// Dissolve the selected vertices, merging the faces around each one.
///
/// # Errors
///
/// Returns [`EditError::DegenerateGeometry`] if removing a vertex would
/// leave a face with fewer than three corners.
pub fn dissolve_verts(mesh: &mut Mesh, ctx: &EditContext) -> Result<OpReport<DissolveOutput>> {
    execute(mesh, ctx, "dissolve_verts", |mesh| {
        let mut merged = Vec::new();
        for v in mesh.selected_verts() {
            if !mesh.contains_vertex(v) {
                continue;
            }
            let region: HashSet<FaceId> = mesh.vertex_faces(v).collect();
            if region.len() > 1 {
                if let Some(f) = merge_region(mesh, &region)? {
                    merged.push(f);
                }
            }
            if !mesh.contains_vertex(v) {
                continue;
            }
            match mesh.vertex_degree(v) {
                0 => mesh.kill_vertex(v),
                2 => {
                    mesh.join_edges_kill_vertex(v)?;
                }
                _ => debug!(?v, "vertex kept, faces around it could not merge"),
            }
        }
        merged.retain(|&f| mesh.contains_face(f));
        Ok(DissolveOutput { merged })
    })
}

/// Remove selected elements without merging anything.
pub fn delete(mesh: &mut Mesh, ctx: &EditContext, kind: DeleteKind) -> Result<OpReport> {
    execute(mesh, ctx, "delete", |mesh| {
        match kind {
            DeleteKind::Verts => {
                for v in mesh.selected_verts() {
                    mesh.purge_vertex(v);
                }
            }
            DeleteKind::Edges => {
                let edges = mesh.selected_edges();
                let ends: BTreeSet<VertexId> = edges.iter().flat_map(|&e| mesh.edge(e).verts()).collect();
                for e in edges {
                    mesh.kill_edge(e);
                }
                for v in ends {
                    if mesh.vertex(v).edge().is_none() {
                        mesh.kill_vertex(v);
                    }
                }
            }
            DeleteKind::Faces | DeleteKind::OnlyFaces => {
                let faces = mesh.selected_faces();
                let mut edges: BTreeSet<EdgeId> = BTreeSet::new();
                for &f in &faces {
                    edges.extend(mesh.face_edges(f));
                }
                for f in faces {
                    mesh.kill_face(f);
                }
                if kind == DeleteKind::Faces {
                    let wires: Vec<EdgeId> = edges.into_iter().filter(|&e| mesh.is_wire(e)).collect();
                    let mut ends: BTreeSet<VertexId> = BTreeSet::new();
                    for e in wires {
                        ends.extend(mesh.edge(e).verts());
                        mesh.kill_edge(e);
                    }
                    for v in ends {
                        if mesh.vertex(v).edge().is_none() {
                            mesh.kill_vertex(v);
                        }
                    }
                }
            }
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::build_from_polygons;
    use crate::select::SelectMode;
    use nalgebra::Point3;
    use std::collections::HashMap;

    /// Number of faces per corner count.
    fn face_sizes(mesh: &Mesh) -> HashMap<usize, usize> {
        let mut sizes = HashMap::new();
        for f in mesh.face_ids() {
            *sizes.entry(mesh.face(f).len()).or_insert(0) += 1;
        }
        sizes
    }

    /// `n` by `n` unit quads in the z = 0 plane.
    fn grid(n: usize) -> Mesh {
        let mut points = Vec::new();
        for y in 0..=n {
            for x in 0..=n {
                points.push(Point3::new(x as f64, y as f64, 0.0));
            }
        }
        let row = n + 1;
        let mut quads = Vec::new();
        for y in 0..n {
            for x in 0..n {
                let a = y * row + x;
                quads.push([a, a + 1, a + row + 1, a + row]);
            }
        }
        build_from_polygons(&points, &quads).unwrap()
    }

    fn vert_at(mesh: &Mesh, x: f64, y: f64) -> VertexId {
        mesh.vertex_ids()
            .find(|&v| {
                let p = mesh.position(v);
                p.x == x && p.y == y
            })
            .unwrap()
    }

    #[test]
    fn test_dissolve_shared_edge() {
        let mut mesh = strip();
        let shared = mesh.edge_ids().find(|&e| mesh.is_manifold_edge(e)).unwrap();
        mesh.select_edge(shared, true);
        let ctx = EditContext::new(SelectMode::Edge);

        let mut plain = mesh.clone();
        let report = dissolve_edges(&mut plain, &ctx, &DissolveOptions::default()).unwrap();
        assert_eq!(report.output.merged.len(), 1);
        assert_eq!(plain.num_faces(), 1);
        assert_eq!(plain.face(report.output.merged[0]).len(), 6);
        assert_eq!(plain.num_edges(), 6);
        assert_eq!(plain.num_vertices(), 6);

        let report = dissolve_edges(&mut mesh, &ctx, &DissolveOptions::default().with_use_verts(true)).unwrap();
        assert_eq!(mesh.num_faces(), 1);
        assert_eq!(mesh.num_vertices(), 4);
        assert_eq!(mesh.num_edges(), 4);
        assert_eq!(report.verts_removed, 2);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_dissolve_face_block() {
        let mut mesh = grid(2);
        mesh.select_all(true);
        let ctx = EditContext::new(SelectMode::Face);
        let report = dissolve_faces(&mut mesh, &ctx, &DissolveOptions::default()).unwrap();

        assert_eq!(report.output.merged.len(), 1);
        assert_eq!(mesh.num_faces(), 1);
        assert_eq!(mesh.num_vertices(), 8);
        assert_eq!(mesh.num_edges(), 8);
        let f = report.output.merged[0];
        assert!(mesh.is_face_selected(f));
        assert_eq!(mesh.face_normal(f).z, 1.0);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_dissolve_faces_with_pass_through_verts() {
        let mut mesh = grid(2);
        mesh.select_all(true);
        let ctx = EditContext::new(SelectMode::Face);
        dissolve_faces(&mut mesh, &ctx, &DissolveOptions::default().with_use_verts(true)).unwrap();

        assert_eq!(mesh.num_vertices(), 4);
        assert_eq!(face_sizes(&mesh).get(&4), Some(&1));
    }

    #[test]
    fn test_ring_region_is_skipped() {
        let mut mesh = grid(3);
        let center = Point3::new(1.5, 1.5, 0.0);
        let faces: Vec<FaceId> = mesh.face_ids().collect();
        for f in faces {
            mesh.select_face(f, mesh.face_centroid(f) != center);
        }
        let ctx = EditContext::new(SelectMode::Face);
        let report = dissolve_faces(&mut mesh, &ctx, &DissolveOptions::default()).unwrap();

        assert!(report.output.merged.is_empty());
        assert_eq!(report.faces_created, 0);
        assert_eq!(mesh.num_faces(), 9);
    }

    #[test]
    fn test_dissolve_inner_vertex() {
        let mut mesh = grid(2);
        let center = vert_at(&mesh, 1.0, 1.0);
        mesh.select_vert(center, true);
        let ctx = EditContext::new(SelectMode::Vertex);
        let report = dissolve_verts(&mut mesh, &ctx).unwrap();

        assert!(!mesh.contains_vertex(center));
        assert_eq!(report.output.merged.len(), 1);
        assert_eq!(mesh.num_faces(), 1);
        assert_eq!(mesh.num_vertices(), 8);
        assert_eq!(mesh.num_edges(), 8);
    }

    #[test]
    fn test_dissolve_quad_corner() {
        let mut mesh = grid(1);
        let corner = vert_at(&mesh, 0.0, 0.0);
        mesh.select_vert(corner, true);
        let ctx = EditContext::new(SelectMode::Vertex);
        dissolve_verts(&mut mesh, &ctx).unwrap();

        assert_eq!(mesh.num_vertices(), 3);
        assert_eq!(face_sizes(&mesh).get(&3), Some(&1));
    }

    #[test]
    fn test_dissolve_triangle_corner_fails() {
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let mut mesh = build_from_polygons(&points, &[[0, 1, 2]]).unwrap();
        let corner = vert_at(&mesh, 0.0, 0.0);
        mesh.select_vert(corner, true);
        let ctx = EditContext::new(SelectMode::Vertex);
        let err = dissolve_verts(&mut mesh, &ctx).unwrap_err();

        assert!(matches!(err, EditError::DegenerateGeometry { .. }));
        assert_eq!(mesh.num_vertices(), 3);
        assert_eq!(mesh.num_faces(), 1);
    }

    #[test]
    fn test_dissolve_edge_loop() {
        let mut mesh = grid(3);
        let column: Vec<EdgeId> = mesh
            .edge_ids()
            .filter(|&e| {
                let [a, b] = mesh.edge(e).verts();
                mesh.position(a).x == 1.0 && mesh.position(b).x == 1.0
            })
            .collect();
        assert_eq!(column.len(), 3);
        for e in column {
            mesh.select_edge(e, true);
        }
        let ctx = EditContext::new(SelectMode::Edge);
        let report = dissolve_edge_loop(&mut mesh, &ctx).unwrap();

        assert_eq!(report.output.merged.len(), 3);
        assert_eq!(mesh.num_faces(), 6);
        assert_eq!(mesh.num_vertices(), 12);
        assert_eq!(mesh.num_edges(), 17);
        assert_eq!(face_sizes(&mesh).get(&4), Some(&6));
        assert!(report.output.merged.iter().all(|&f| mesh.is_face_selected(f)));
        assert_eq!(mesh.selected_faces().len(), 3);
        assert!(mesh.validate().is_ok());
    }

    fn strip() -> Mesh {
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(2.0, 1.0, 0.0),
        ];
        build_from_polygons(&points, &[[0, 1, 4, 3], [1, 2, 5, 4]]).unwrap()
    }

    fn select_left_face(mesh: &mut Mesh) {
        let left = mesh
            .face_ids()
            .find(|&f| mesh.face_centroid(f).x < 1.0)
            .unwrap();
        mesh.select_face(left, true);
    }

    #[test]
    fn test_delete_faces() {
        let ctx = EditContext::new(SelectMode::Face);

        let mut mesh = strip();
        select_left_face(&mut mesh);
        delete(&mut mesh, &ctx, DeleteKind::Faces).unwrap();
        assert_eq!((mesh.num_vertices(), mesh.num_edges(), mesh.num_faces()), (4, 4, 1));

        let mut mesh = strip();
        select_left_face(&mut mesh);
        delete(&mut mesh, &ctx, DeleteKind::OnlyFaces).unwrap();
        assert_eq!((mesh.num_vertices(), mesh.num_edges(), mesh.num_faces()), (6, 7, 1));
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_delete_verts_and_edges() {
        let mut mesh = strip();
        let v0 = vert_at(&mesh, 0.0, 0.0);
        mesh.select_vert(v0, true);
        delete(&mut mesh, &EditContext::new(SelectMode::Vertex), DeleteKind::Verts).unwrap();
        assert_eq!((mesh.num_vertices(), mesh.num_edges(), mesh.num_faces()), (5, 5, 1));

        let mut mesh = strip();
        let shared = mesh.edge_ids().find(|&e| mesh.is_manifold_edge(e)).unwrap();
        mesh.select_edge(shared, true);
        delete(&mut mesh, &EditContext::new(SelectMode::Edge), DeleteKind::Edges).unwrap();
        assert_eq!((mesh.num_vertices(), mesh.num_edges(), mesh.num_faces()), (6, 6, 0));
    }

    #[test]
    fn test_delete_nothing_is_noop() {
        let mut mesh = strip();
        let report = delete(&mut mesh, &EditContext::new(SelectMode::Face), DeleteKind::Faces).unwrap();
        assert!(report.is_noop());
    }
}
