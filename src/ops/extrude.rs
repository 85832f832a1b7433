//! Extrusion.
//!
//! Extrusion duplicates the selected geometry and joins the copy to the
//! original with new wall faces. Four flavours are supported:
//!
//! - [`ExtrudeMode::Region`]: selected faces move as one connected cap.
//!   Vertices shared between selected faces are duplicated once, and only the
//!   outline of the region grows walls. Selected edges and vertices that touch
//!   no selected face are extruded as loose edges and points.
//! - [`ExtrudeMode::IndividualFaces`]: every selected face gets its own cap and
//!   its own ring of walls.
//! - [`ExtrudeMode::EdgesOnly`]: every selected edge becomes a quad.
//! - [`ExtrudeMode::VertsOnly`]: every selected vertex grows a wire edge.
//!
//! Edges in [`ExtrudeOptions::exclude`] stay welded: their endpoints are not
//! duplicated, so the cap stays attached along them. Use
//! [`mirror_seam_edges`] to build that set for mirror-modelled meshes.
//!
//! # Example
//!
//! ```
//! use editmesh::prelude::*;
//! use editmesh::ops::extrude::{extrude, ExtrudeMode, ExtrudeOptions};
//! use nalgebra::{Point3, Vector3};
//!
//! let points = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(2.0, 0.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//!     Point3::new(1.0, 1.0, 0.0),
//!     Point3::new(2.0, 1.0, 0.0),
//! ];
//! let mut mesh = build_from_polygons(&points, &[[0, 1, 4, 3], [1, 2, 5, 4]]).unwrap();
//! mesh.select_all(true);
//!
//! let ctx = EditContext::new(SelectMode::Face);
//! let options = ExtrudeOptions::default()
//!     .with_mode(ExtrudeMode::IndividualFaces)
//!     .with_translation(Vector3::new(0.0, 0.0, 0.5));
//! let report = extrude(&mut mesh, &ctx, &options).unwrap();
//!
//! // Each quad gets its own four new corners and four walls.
//! assert_eq!(report.verts_created, 8);
//! assert_eq!(mesh.num_faces(), 2 + 8);
//! ```

use std::collections::{BTreeSet, HashMap, HashSet};

use nalgebra::Vector3;
use tracing::debug;

use super::{execute, EditContext, OpReport};
use crate::error::{EditError, Result};
use crate::mesh::{EdgeId, ElemFlags, FaceId, LoopId, Mesh, VertexId};

/// Which geometry to extrude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtrudeMode {
    /// Selected faces as one connected region.
    #[default]
    Region,
    /// Each selected face on its own.
    IndividualFaces,
    /// Each selected edge on its own.
    EdgesOnly,
    /// Each selected vertex on its own.
    VertsOnly,
}

/// Options for [`extrude`].
#[derive(Debug, Clone, Default)]
pub struct ExtrudeOptions {
    /// Which geometry to extrude.
    pub mode: ExtrudeMode,

    /// Edges that are never duplicated (region mode only).
    pub exclude: HashSet<EdgeId>,

    /// Offset applied to the extruded copy.
    pub translation: Vector3<f64>,
}

impl ExtrudeOptions {
    /// Set the extrusion mode.
    pub fn with_mode(mut self, mode: ExtrudeMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the edges that stay welded.
    pub fn with_exclude(mut self, exclude: HashSet<EdgeId>) -> Self {
        self.exclude = exclude;
        self
    }

    /// Set the offset applied to the extruded copy.
    pub fn with_translation(mut self, translation: Vector3<f64>) -> Self {
        self.translation = translation;
        self
    }
}

/// Operator-specific output of [`extrude`].
#[derive(Debug, Clone, Default)]
pub struct ExtrudeOutput {
    /// Area-weighted average normal of the new cap faces, normalized.
    /// `None` when no face was extruded.
    pub direction: Option<Vector3<f64>>,
}

/// Extrude the selection.
///
/// # Errors
///
/// Returns [`EditError::InvalidSelection`] if no vertex is selected.
pub fn extrude(mesh: &mut Mesh, ctx: &EditContext, options: &ExtrudeOptions) -> Result<OpReport<ExtrudeOutput>> {
    execute(mesh, ctx, "extrude", |mesh| {
        if mesh.selected_verts().is_empty() {
            return Err(EditError::invalid_selection("nothing selected to extrude"));
        }

        let extruded = match options.mode {
            ExtrudeMode::Region => extrude_region(mesh, &options.exclude)?,
            ExtrudeMode::IndividualFaces => extrude_individual_faces(mesh)?,
            ExtrudeMode::EdgesOnly => extrude_edges_only(mesh)?,
            ExtrudeMode::VertsOnly => extrude_verts_only(mesh),
        };

        if options.translation != Vector3::zeros() {
            for &v in &extruded.moved {
                let co = mesh.position(v) + options.translation;
                mesh.set_position(v, co);
            }
        }
        mesh.recalc_normals();
        if options.mode == ExtrudeMode::IndividualFaces {
            // Each cap corner takes the normal of its own face.
            for &f in &extruded.caps {
                let no = mesh.face(f).no;
                let corners: Vec<VertexId> = mesh.face_vertices(f).collect();
                for v in corners {
                    mesh.vertex_mut(v).no = no;
                }
            }
        }

        let weighted: Vector3<f64> = extruded
            .caps
            .iter()
            .map(|&f| mesh.face_normal(f) * mesh.face_area(f))
            .sum();
        let direction = weighted.try_normalize(1e-12);
        debug!(caps = extruded.caps.len(), moved = extruded.moved.len(), "extruded");
        Ok(ExtrudeOutput { direction })
    })
}

/// The caps and the vertices to translate.
struct Extruded {
    caps: Vec<FaceId>,
    moved: Vec<VertexId>,
}

/// A copy of `v` at the same position, with a connecting edge.
fn duplicate_vertex(mesh: &mut Mesh, v: VertexId) -> (VertexId, EdgeId) {
    let src = mesh.vertex(v);
    let (co, no) = (src.co, src.no);
    let d = mesh.create_vertex(co);
    mesh.vertex_mut(d).no = no;
    let connector = mesh.create_edge(v, d);
    (d, connector)
}

/// Wall over the quad `[x, y, y', x']`, collapsing to a triangle where an
/// endpoint was not duplicated.
///
/// `x -> y` must be the direction the extruded face ran along `e`, so the
/// wall meets the untouched neighbour of `e` with opposite winding.
fn build_wall(
    mesh: &mut Mesh,
    e: EdgeId,
    cap: EdgeId,
    (x, y): (VertexId, VertexId),
    dup: &HashMap<VertexId, (VertexId, EdgeId)>,
    src_face: Option<FaceId>,
) -> Result<FaceId> {
    let mut verts = vec![x, y];
    let mut edges = vec![e];
    if let Some(&(y2, cy)) = dup.get(&y) {
        verts.push(y2);
        edges.push(cy);
    }
    let x2 = dup.get(&x).map(|&(d, _)| d);
    edges.push(cap);
    if let Some(x2) = x2 {
        verts.push(x2);
        edges.push(dup[&x].1);
    }
    let wall = mesh.create_face(&verts, Some(&edges))?;
    if let Some(src) = src_face {
        let (mat_nr, smooth) = (mesh.face(src).mat_nr, mesh.face(src).flags & ElemFlags::SMOOTH);
        let face = mesh.face_mut(wall);
        face.mat_nr = mat_nr;
        face.flags |= smooth;
    }
    Ok(wall)
}

fn extrude_region(mesh: &mut Mesh, exclude: &HashSet<EdgeId>) -> Result<Extruded> {
    let faces = mesh.selected_faces();
    let region: HashSet<FaceId> = faces.iter().copied().collect();

    let region_edges: BTreeSet<EdgeId> = faces.iter().flat_map(|&f| mesh.face_edges(f)).collect();
    let mut boundary: Vec<(EdgeId, LoopId)> = Vec::new();
    let mut shared: Vec<EdgeId> = Vec::new();
    let mut interior: Vec<EdgeId> = Vec::new();
    for &e in &region_edges {
        let (inside, outside): (Vec<LoopId>, Vec<LoopId>) =
            mesh.radial_loops(e).partition(|&l| region.contains(&mesh.loop_(l).face()));
        if exclude.contains(&e) {
            continue;
        }
        match (inside.as_slice(), outside.is_empty()) {
            (&[only], _) => boundary.push((e, only)),
            (_, true) => interior.push(e),
            _ => shared.push(e),
        }
    }

    let welded: HashSet<VertexId> = exclude
        .iter()
        .filter(|&&e| mesh.contains_edge(e))
        .flat_map(|&e| mesh.edge(e).verts())
        .collect();

    let mut dup: HashMap<VertexId, (VertexId, EdgeId)> = HashMap::new();
    for e in boundary.iter().map(|&(e, _)| e).chain(shared.iter().copied()) {
        for v in mesh.edge(e).verts() {
            if !welded.contains(&v) && !dup.contains_key(&v) {
                let copy = duplicate_vertex(mesh, v);
                dup.insert(v, copy);
            }
        }
    }
    let image = |dup: &HashMap<VertexId, (VertexId, EdgeId)>, v: VertexId| dup.get(&v).map_or(v, |&(d, _)| d);

    // Walls run along the outline in the direction the region face used it.
    let mut walls: Vec<(EdgeId, EdgeId, VertexId, VertexId, FaceId)> = Vec::new();
    let mut cap_edge: HashMap<EdgeId, EdgeId> = HashMap::new();
    for &(e, l) in &boundary {
        let corner = *mesh.loop_(l);
        let x = corner.vert();
        let y = mesh.edge(e).other_vert(x);
        let (x2, y2) = (image(&dup, x), image(&dup, y));
        if x2 == x && y2 == y {
            continue;
        }
        let cap = mesh.create_edge(x2, y2);
        cap_edge.insert(e, cap);
        walls.push((e, cap, x, y, corner.face()));
    }
    for &e in &shared {
        let [a, b] = mesh.edge(e).verts();
        let cap = mesh.create_edge(image(&dup, a), image(&dup, b));
        cap_edge.insert(e, cap);
    }

    for &f in &faces {
        let corners: Vec<LoopId> = mesh.face_loops(f).collect();
        for l in corners {
            let corner = *mesh.loop_(l);
            let e = cap_edge.get(&corner.edge()).copied().unwrap_or(corner.edge());
            mesh.loop_relink(l, image(&dup, corner.vert()), e);
        }
    }
    for &e in &interior {
        for v in mesh.edge(e).verts() {
            if let Some(&(d, _)) = dup.get(&v) {
                mesh.edge_swap_vert(e, v, d);
            }
        }
    }

    for &(e, cap, x, y, src) in &walls {
        build_wall(mesh, e, cap, (x, y), &dup, Some(src))?;
    }

    // Loose edges and points touching no selected face.
    let mut loose_caps = Vec::new();
    for e in mesh.selected_edges() {
        if region_edges.contains(&e) || exclude.contains(&e) {
            continue;
        }
        let [a, b] = mesh.edge(e).verts();
        for v in [a, b] {
            if !dup.contains_key(&v) {
                let copy = duplicate_vertex(mesh, v);
                dup.insert(v, copy);
            }
        }
        let (x, y) = wire_direction(mesh, e);
        let cap = mesh.create_edge(image(&dup, x), image(&dup, y));
        let src = mesh.edge_faces(e).next();
        build_wall(mesh, e, cap, (x, y), &dup, src)?;
        loose_caps.push(cap);
    }
    let mut loose_points = Vec::new();
    for v in mesh.selected_verts() {
        if dup.contains_key(&v) || dup.values().any(|&(d, _)| d == v) {
            continue;
        }
        if mesh.vertex_faces(v).any(|f| region.contains(&f)) {
            continue;
        }
        let copy = duplicate_vertex(mesh, v);
        dup.insert(v, copy);
        loose_points.push(copy.0);
    }

    mesh.select_all(false);
    for &f in &faces {
        mesh.select_face(f, true);
    }
    for &cap in &loose_caps {
        mesh.select_edge(cap, true);
    }
    for &d in &loose_points {
        mesh.select_vert(d, true);
    }

    let mut moved: BTreeSet<VertexId> = faces
        .iter()
        .flat_map(|&f| mesh.face_vertices(f))
        .filter(|v| !welded.contains(v))
        .collect();
    moved.extend(dup.values().map(|&(d, _)| d));
    Ok(Extruded {
        caps: faces,
        moved: moved.into_iter().collect(),
    })
}

/// Orientation for the wall of a loose edge: opposite to the face already
/// using it, or the stored order for a wire edge.
fn wire_direction(mesh: &Mesh, e: EdgeId) -> (VertexId, VertexId) {
    let [a, b] = mesh.edge(e).verts();
    match mesh.edge(e).first_loop() {
        Some(l) if mesh.loop_(l).vert() == a => (b, a),
        _ => (a, b),
    }
}

fn extrude_individual_faces(mesh: &mut Mesh) -> Result<Extruded> {
    let faces = mesh.selected_faces();
    let mut moved = Vec::new();
    for &f in &faces {
        let corners: Vec<LoopId> = mesh.face_loops(f).collect();
        let n = corners.len();
        let base: Vec<(VertexId, EdgeId)> = corners
            .iter()
            .map(|&l| (mesh.loop_(l).vert(), mesh.loop_(l).edge()))
            .collect();

        let mut dup: HashMap<VertexId, (VertexId, EdgeId)> = HashMap::with_capacity(n);
        for &(v, _) in &base {
            let copy = duplicate_vertex(mesh, v);
            dup.insert(v, copy);
            moved.push(copy.0);
        }
        let caps: Vec<EdgeId> = (0..n)
            .map(|i| mesh.create_edge(dup[&base[i].0].0, dup[&base[(i + 1) % n].0].0))
            .collect();
        for (i, &l) in corners.iter().enumerate() {
            mesh.loop_relink(l, dup[&base[i].0].0, caps[i]);
        }
        for i in 0..n {
            let (x, e) = base[i];
            let y = base[(i + 1) % n].0;
            build_wall(mesh, e, caps[i], (x, y), &dup, Some(f))?;
        }
    }

    mesh.select_all(false);
    for &f in &faces {
        mesh.select_face(f, true);
    }
    Ok(Extruded { caps: faces, moved })
}

fn extrude_edges_only(mesh: &mut Mesh) -> Result<Extruded> {
    let edges = mesh.selected_edges();
    let mut moved = Vec::new();
    let mut caps = Vec::new();
    for &e in &edges {
        let (x, y) = wire_direction(mesh, e);
        let mut dup = HashMap::with_capacity(2);
        for v in [x, y] {
            let copy = duplicate_vertex(mesh, v);
            dup.insert(v, copy);
            moved.push(copy.0);
        }
        let cap = mesh.create_edge(dup[&x].0, dup[&y].0);
        let src = mesh.edge_faces(e).next();
        build_wall(mesh, e, cap, (x, y), &dup, src)?;
        caps.push(cap);
    }

    mesh.select_all(false);
    for &cap in &caps {
        mesh.select_edge(cap, true);
    }
    Ok(Extruded {
        caps: Vec::new(),
        moved,
    })
}

fn extrude_verts_only(mesh: &mut Mesh) -> Extruded {
    let verts = mesh.selected_verts();
    let moved: Vec<VertexId> = verts.iter().map(|&v| duplicate_vertex(mesh, v).0).collect();
    mesh.select_all(false);
    for &d in &moved {
        mesh.select_vert(d, true);
    }
    Extruded {
        caps: Vec::new(),
        moved,
    }
}

/// Edges lying on a mirror plane, for [`ExtrudeOptions::exclude`].
///
/// `axes[i]` enables the plane where coordinate `i` is zero; an edge is on
/// the plane when both endpoints are within `tolerance` of it.
pub fn mirror_seam_edges(mesh: &Mesh, axes: [bool; 3], tolerance: f64) -> HashSet<EdgeId> {
    mesh.edges()
        .filter(|(_, edge)| {
            let [a, b] = edge.verts();
            let (pa, pb) = (mesh.position(a), mesh.position(b));
            (0..3).any(|i| axes[i] && pa[i].abs() <= tolerance && pb[i].abs() <= tolerance)
        })
        .map(|(e, _)| e)
        .collect()
}
