//! Edge rotation.
//!
//! The edge shared by two faces is removed and replaced by one joining the
//! next corners along, turning it a step around the merged outline. Face
//! sizes are preserved: two quads stay two quads and two triangles stay two
//! triangles.

use tracing::debug;

use super::{execute, EditContext, OpReport};
use crate::error::{EditError, Result};
use crate::mesh::{EdgeId, FaceId, Mesh, VertexId};

/// Options for [`rotate_edge`].
#[derive(Debug, Clone, Default)]
pub struct RotateOptions {
    /// Rotate counter-clockwise (seen from the side the first face's normal
    /// points to) instead of clockwise.
    pub ccw: bool,
}

impl RotateOptions {
    /// Set the rotation direction.
    pub fn with_ccw(mut self, ccw: bool) -> Self {
        self.ccw = ccw;
        self
    }
}

/// Operator-specific output of [`rotate_edge`].
#[derive(Debug, Clone)]
pub struct RotateOutput {
    /// The replacement edge.
    pub edge: EdgeId,
}

/// The edge to rotate: the one shared by exactly two selected faces, or the
/// single selected edge.
fn pick_edge(mesh: &Mesh) -> Result<EdgeId> {
    let faces = mesh.selected_faces();
    if let &[fa, fb] = faces.as_slice() {
        let shared: Vec<EdgeId> = mesh
            .face_edges(fa)
            .filter(|&e| mesh.edge_faces(e).any(|f| f == fb))
            .collect();
        if let &[e] = shared.as_slice() {
            return Ok(e);
        }
        return Err(EditError::invalid_selection("the two selected faces must share exactly one edge"));
    }
    match mesh.selected_edges().as_slice() {
        &[e] => Ok(e),
        _ => Err(EditError::invalid_selection(
            "select exactly one edge or two adjacent faces to rotate",
        )),
    }
}

/// Neighbour of `v` in `f` that is not `not`.
fn other_neighbour(mesh: &Mesh, f: FaceId, v: VertexId, not: VertexId) -> Option<VertexId> {
    let l = mesh.face_loop_at(f, v)?;
    let next = mesh.loop_(mesh.loop_(l).next()).vert();
    if next == not {
        Some(mesh.loop_(mesh.loop_(l).prev()).vert())
    } else {
        Some(next)
    }
}

/// Rotate the selected edge between its two faces.
///
/// # Errors
///
/// Returns [`EditError::InvalidSelection`] unless exactly one edge or two
/// adjacent faces are selected and the edge has exactly two faces, and
/// [`EditError::DegenerateGeometry`] if the rotated edge already exists.
pub fn rotate_edge(mesh: &mut Mesh, ctx: &EditContext, options: &RotateOptions) -> Result<OpReport<RotateOutput>> {
    execute(mesh, ctx, "rotate_edge", |mesh| {
        let e = pick_edge(mesh)?;
        if !mesh.is_manifold_edge(e) {
            return Err(EditError::invalid_selection("only an edge between exactly two faces can rotate"));
        }
        let Some(l) = mesh.edge(e).first_loop() else {
            return Err(EditError::invalid_selection("edge has no faces"));
        };
        let corner = *mesh.loop_(l);
        let (v1, v2) = (corner.vert(), mesh.loop_(corner.next()).vert());
        let (mut fa, mut fb) = (corner.face(), mesh.loop_(corner.radial_next()).face());
        if !options.ccw {
            std::mem::swap(&mut fa, &mut fb);
        }

        let n1 = other_neighbour(mesh, fb, v1, v2);
        let n2 = other_neighbour(mesh, fa, v2, v1);
        let (Some(n1), Some(n2)) = (n1, n2) else {
            return Err(EditError::degenerate("edge faces do not contain its endpoints"));
        };
        if n1 == n2 || mesh.edge_between(n1, n2).is_some() {
            return Err(EditError::degenerate("the rotated edge would duplicate an existing one"));
        }

        let merged = mesh.join_faces(fa, fb, e)?;
        let (Some(la), Some(lb)) = (mesh.face_loop_at(merged, n1), mesh.face_loop_at(merged, n2)) else {
            return Err(EditError::degenerate("rotation corners left the merged face"));
        };
        let (_, edge) = mesh.split_face(merged, la, lb)?;
        mesh.select_edge(edge, true);
        debug!(from = ?e, to = ?edge, "rotated edge");
        Ok(RotateOutput { edge })
    })
}
