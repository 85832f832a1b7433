//! Mesh editing operators.
//!
//! Every operator reads the current selection from the mesh, rewrites the
//! topology, and hands back an [`OpReport`]. They all run through
//! [`execute`], which gives each call the same life cycle:
//!
//! 1. the operator validates its selection and parameters, returning an
//!    error before touching anything if they are unusable;
//! 2. the operator mutates the mesh;
//! 3. on error the mesh is restored from a snapshot taken before step 2,
//!    so a failed call leaves no partial geometry behind;
//! 4. on success the selection is flushed for the session's
//!    [`SelectMode`](crate::select::SelectMode), and the context's
//!    [`Notifier`] is told what changed.
//!
//! # Operators
//!
//! - [`extrude`]: region, individual face, edge and vertex extrusion
//! - [`rip`]: tear a vertex or edge path away from its neighbours
//! - [`bisect`]: cut by a plane, optionally clearing one side and capping
//! - [`knife`]: cut selected edges along a screen-space polyline
//! - [`subdivide`]: uniform edge subdivision and loop cuts
//! - [`rotate`]: rotate an edge between its two faces
//! - [`dissolve`]: merge faces across edges or vertices, and delete
//! - [`collapse`]: merge connected selections to a point
//!
//! # Example
//!
//! ```
//! use editmesh::prelude::*;
//! use editmesh::ops::extrude::{extrude, ExtrudeOptions};
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
//! let ctx = EditContext::new(SelectMode::Face);
//! let options = ExtrudeOptions::default().with_translation(Vector3::new(0.0, 0.0, 1.0));
//! let report = extrude(&mut mesh, &ctx, &options).unwrap();
//!
//! assert_eq!(report.verts_created, 4);
//! assert_eq!(mesh.num_faces(), 5);
//! ```

pub mod bisect;
pub mod collapse;
pub mod dissolve;
pub mod extrude;
pub mod knife;
mod notify;
pub mod projection;
pub mod rip;
pub mod rotate;
pub mod subdivide;

pub use notify::{Changes, Notifier};
pub use projection::{ProjectionTable, Projector};

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::mesh::{EdgeId, ElemFlags, FaceId, Mesh, VertexId};
use crate::select::{flush_selection, SelectMode};

/// Per-session state passed to every operator.
#[derive(Debug, Default)]
pub struct EditContext {
    /// Authoritative element kind for selection flushing.
    pub select_mode: SelectMode,
    /// Receives the change set of every successful operator.
    pub notifier: Notifier,
}

impl EditContext {
    /// Create a context with the given selection mode and no notifier.
    pub fn new(select_mode: SelectMode) -> Self {
        Self {
            select_mode,
            notifier: Notifier::none(),
        }
    }

    /// Attach a change notifier.
    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = notifier;
        self
    }
}

/// Outcome of a successful operator call.
#[derive(Debug, Clone, Default)]
pub struct OpReport<T = ()> {
    /// Vertices created.
    pub verts_created: usize,
    /// Edges created.
    pub edges_created: usize,
    /// Faces created.
    pub faces_created: usize,
    /// Vertices killed.
    pub verts_removed: usize,
    /// Edges killed.
    pub edges_removed: usize,
    /// Faces killed.
    pub faces_removed: usize,
    /// New vertices, in handle order.
    pub new_verts: Vec<VertexId>,
    /// New edges, in handle order.
    pub new_edges: Vec<EdgeId>,
    /// New faces, in handle order.
    pub new_faces: Vec<FaceId>,
    /// What changed, as sent to the notifier.
    pub changes: Changes,
    /// Operator-specific output.
    pub output: T,
}

impl<T> OpReport<T> {
    /// Whether the call changed nothing at all.
    pub fn is_noop(&self) -> bool {
        self.changes.is_empty()
    }

    /// Compare the mesh against its pre-operator snapshot.
    fn diff(before: &Mesh, after: &Mesh, output: T) -> Self {
        let new_verts: Vec<VertexId> = after.verts.keys().filter(|&v| !before.verts.contains_key(v)).collect();
        let new_edges: Vec<EdgeId> = after.edges.keys().filter(|&e| !before.edges.contains_key(e)).collect();
        let new_faces: Vec<FaceId> = after.faces.keys().filter(|&f| !before.faces.contains_key(f)).collect();
        let verts_removed = before.verts.keys().filter(|&v| !after.verts.contains_key(v)).count();
        let edges_removed = before.edges.keys().filter(|&e| !after.edges.contains_key(e)).count();
        let faces_removed = before.faces.keys().filter(|&f| !after.faces.contains_key(f)).count();

        let mut changes = Changes::empty();
        let corners_changed = before.loops.len() != after.loops.len()
            || after.loops.iter().any(|(l, corner)| {
                before.loops.get(l).map_or(true, |old| {
                    old.v != corner.v || old.e != corner.e || old.f != corner.f || old.next != corner.next
                })
            });
        if !new_verts.is_empty()
            || !new_edges.is_empty()
            || !new_faces.is_empty()
            || verts_removed + edges_removed + faces_removed > 0
            || corners_changed
        {
            changes |= Changes::TOPOLOGY;
        }
        if after
            .verts
            .iter()
            .any(|(v, vert)| before.verts.get(v).is_some_and(|old| old.co != vert.co))
        {
            changes |= Changes::GEOMETRY;
        }
        let sel = |flags: ElemFlags| flags & (ElemFlags::SELECT | ElemFlags::HIDDEN);
        let selection_changed = after
            .verts
            .iter()
            .any(|(v, x)| before.verts.get(v).map_or(sel(x.flags) != ElemFlags::empty(), |o| sel(o.flags) != sel(x.flags)))
            || after
                .edges
                .iter()
                .any(|(e, x)| before.edges.get(e).map_or(sel(x.flags) != ElemFlags::empty(), |o| sel(o.flags) != sel(x.flags)))
            || after
                .faces
                .iter()
                .any(|(f, x)| before.faces.get(f).map_or(sel(x.flags) != ElemFlags::empty(), |o| sel(o.flags) != sel(x.flags)))
            || before.totsel != after.totsel;
        if selection_changed {
            changes |= Changes::SELECTION;
        }

        Self {
            verts_created: new_verts.len(),
            edges_created: new_edges.len(),
            faces_created: new_faces.len(),
            verts_removed,
            edges_removed,
            faces_removed,
            new_verts,
            new_edges,
            new_faces,
            changes,
            output,
        }
    }
}

/// Run an operator body inside the snapshot/flush/notify frame.
///
/// The selection is flushed before `body` runs, so the body can trust the
/// select bits of every element kind. `body` must validate before it
/// mutates. If it returns an error the mesh is restored to its state before
/// the call.
pub fn execute<T, F>(mesh: &mut Mesh, ctx: &EditContext, name: &'static str, body: F) -> Result<OpReport<T>>
where
    F: FnOnce(&mut Mesh) -> Result<T>,
{
    debug!(op = name, mode = ?ctx.select_mode, "running operator");
    let snapshot = mesh.clone();
    flush_selection(mesh, ctx.select_mode);
    match body(mesh) {
        Ok(output) => {
            if cfg!(debug_assertions) {
                if let Err(violation) = mesh.validate() {
                    panic!("{} left the mesh invalid: {}", name, violation);
                }
            }
            flush_selection(mesh, ctx.select_mode);
            let report = OpReport::diff(&snapshot, mesh, output);
            ctx.notifier.notify(report.changes);
            info!(
                op = name,
                verts_created = report.verts_created,
                edges_created = report.edges_created,
                faces_created = report.faces_created,
                verts_removed = report.verts_removed,
                edges_removed = report.edges_removed,
                faces_removed = report.faces_removed,
                "operator finished"
            );
            Ok(report)
        }
        Err(err) => {
            *mesh = snapshot;
            warn!(op = name, error = %err, "operator failed, mesh restored");
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EditError;
    use crate::mesh::build_from_polygons;
    use nalgebra::Point3;
    use std::sync::atomic::{AtomicU8, Ordering};
    use std::sync::Arc;

    fn quad() -> Mesh {
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        build_from_polygons(&points, &[[0, 1, 2, 3]]).unwrap()
    }

    #[test]
    fn test_error_rolls_back() {
        let mut mesh = quad();
        let ctx = EditContext::default();
        let result: Result<OpReport> = execute(&mut mesh, &ctx, "test", |mesh| {
            let v = mesh.create_vertex(Point3::new(5.0, 5.0, 5.0));
            let w = mesh.vertex_ids().next().unwrap();
            mesh.create_edge(v, w);
            Err(EditError::degenerate("late failure"))
        });
        assert!(result.is_err());
        assert_eq!(mesh.num_vertices(), 4);
        assert_eq!(mesh.num_edges(), 4);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_report_counts_and_notifies() {
        let mut mesh = quad();
        let seen = Arc::new(AtomicU8::new(0));
        let sink = seen.clone();
        let ctx = EditContext::new(SelectMode::Vertex).with_notifier(Notifier::new(move |c| {
            sink.store(c.bits(), Ordering::Relaxed);
        }));
        let report = execute(&mut mesh, &ctx, "test", |mesh| {
            let v = mesh.create_vertex(Point3::new(2.0, 0.0, 0.0));
            mesh.select_vert(v, true);
            Ok(v)
        })
        .unwrap();
        assert_eq!(report.verts_created, 1);
        assert_eq!(report.new_verts, vec![report.output]);
        assert!(report.changes.contains(Changes::TOPOLOGY | Changes::SELECTION));
        assert!(!report.changes.contains(Changes::GEOMETRY));
        assert_eq!(seen.load(Ordering::Relaxed), report.changes.bits());
        assert_eq!(mesh.selection_counts().verts, 1);
    }

    #[test]
    fn test_noop_report() {
        let mut mesh = quad();
        let ctx = EditContext::default();
        let report = execute(&mut mesh, &ctx, "test", |_| Ok(())).unwrap();
        assert!(report.is_noop());
    }
}
