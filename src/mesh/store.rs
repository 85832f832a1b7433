//! The topology store and its create/kill primitives.
//!
//! Every primitive leaves the three cycle families closed:
//!
//! - the **disk cycle** of a vertex links all edges incident to it,
//! - the **radial cycle** of an edge links all corners (loops) using it,
//! - the **loop cycle** of a face links its corners in winding order.
//!
//! Higher-level surgery lives in [`euler`](super::euler); editing operators
//! never touch the link fields directly.

use nalgebra::Point3;
use slotmap::SlotMap;

use super::element::{DiskLink, Edge, ElemFlags, Face, Loop, Vertex};
use super::index::{EdgeId, ElemId, FaceId, LoopId, VertexId};
use crate::error::{EditError, Result};
use crate::select::SelectionCounts;

/// An editable polygon mesh.
///
/// Elements are addressed by versioned keys that stay valid until
/// the element is killed. Accessors panic on stale handles, since those
/// indicate a bug in the caller rather than bad input.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub(crate) verts: SlotMap<VertexId, Vertex>,
    pub(crate) edges: SlotMap<EdgeId, Edge>,
    pub(crate) loops: SlotMap<LoopId, Loop>,
    pub(crate) faces: SlotMap<FaceId, Face>,

    /// Elements in the order the user selected them.
    pub(crate) select_history: Vec<ElemId>,

    /// Totals refreshed by every flush.
    pub(crate) totsel: SelectionCounts,
}

impl Mesh {
    /// Create a new empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    // ==================== Accessors ====================

    /// Number of live vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.verts.len()
    }

    /// Number of live edges.
    #[inline]
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Number of live face corners.
    #[inline]
    pub fn num_loops(&self) -> usize {
        self.loops.len()
    }

    /// Number of live faces.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Whether the mesh has no vertices.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.verts.is_empty()
    }

    /// Get a vertex by handle.
    #[inline]
    pub fn vertex(&self, v: VertexId) -> &Vertex {
        &self.verts[v]
    }

    /// Get a mutable vertex by handle.
    #[inline]
    pub fn vertex_mut(&mut self, v: VertexId) -> &mut Vertex {
        &mut self.verts[v]
    }

    /// Get an edge by handle.
    #[inline]
    pub fn edge(&self, e: EdgeId) -> &Edge {
        &self.edges[e]
    }

    /// Get a mutable edge by handle.
    #[inline]
    pub fn edge_mut(&mut self, e: EdgeId) -> &mut Edge {
        &mut self.edges[e]
    }

    /// Get a face corner by handle.
    #[inline]
    pub fn loop_(&self, l: LoopId) -> &Loop {
        &self.loops[l]
    }

    /// Get a face by handle.
    #[inline]
    pub fn face(&self, f: FaceId) -> &Face {
        &self.faces[f]
    }

    /// Get a mutable face by handle.
    #[inline]
    pub fn face_mut(&mut self, f: FaceId) -> &mut Face {
        &mut self.faces[f]
    }

    /// Vertex position.
    #[inline]
    pub fn position(&self, v: VertexId) -> &Point3<f64> {
        &self.verts[v].co
    }

    /// Move a vertex.
    #[inline]
    pub fn set_position(&mut self, v: VertexId, co: Point3<f64>) {
        self.verts[v].co = co;
    }

    /// Whether the vertex handle is live.
    pub fn contains_vertex(&self, v: VertexId) -> bool {
        self.verts.contains_key(v)
    }

    /// Whether the edge handle is live.
    pub fn contains_edge(&self, e: EdgeId) -> bool {
        self.edges.contains_key(e)
    }

    /// Whether the face handle is live.
    pub fn contains_face(&self, f: FaceId) -> bool {
        self.faces.contains_key(f)
    }

    /// Iterate over vertex handles.
    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.verts.keys()
    }

    /// Iterate over edge handles.
    pub fn edge_ids(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.edges.keys()
    }

    /// Iterate over face handles.
    pub fn face_ids(&self) -> impl Iterator<Item = FaceId> + '_ {
        self.faces.keys()
    }

    /// Iterate over `(handle, vertex)` pairs.
    pub fn vertices(&self) -> impl Iterator<Item = (VertexId, &Vertex)> + '_ {
        self.verts.iter()
    }

    /// Iterate over `(handle, edge)` pairs.
    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &Edge)> + '_ {
        self.edges.iter()
    }

    /// Iterate over `(handle, face)` pairs.
    pub fn faces(&self) -> impl Iterator<Item = (FaceId, &Face)> + '_ {
        self.faces.iter()
    }

    // ==================== Creation ====================

    /// Create a loose vertex.
    pub fn create_vertex(&mut self, co: Point3<f64>) -> VertexId {
        self.verts.insert(Vertex::new(co))
    }

    /// Create an edge between two distinct vertices.
    ///
    /// Duplicate edges over the same pair are allowed; some operators need
    /// them transiently. Use [`create_edge_unique`](Self::create_edge_unique)
    /// or [`ensure_edge`](Self::ensure_edge) to avoid them.
    pub fn create_edge(&mut self, v0: VertexId, v1: VertexId) -> EdgeId {
        assert_ne!(v0, v1, "edge endpoints must differ");
        let e = self.edges.insert_with_key(|e| Edge {
            v: [v0, v1],
            flags: ElemFlags::empty(),
            l: None,
            disk: [DiskLink { next: e, prev: e }; 2],
        });
        self.disk_append(e, v0);
        self.disk_append(e, v1);
        e
    }

    /// Create an edge, failing if one already joins the pair.
    pub fn create_edge_unique(&mut self, v0: VertexId, v1: VertexId) -> Result<EdgeId> {
        if self.edge_between(v0, v1).is_some() {
            return Err(EditError::DuplicateEdge { v0, v1 });
        }
        Ok(self.create_edge(v0, v1))
    }

    /// Return the edge joining the pair, creating it if needed.
    pub fn ensure_edge(&mut self, v0: VertexId, v1: VertexId) -> EdgeId {
        match self.edge_between(v0, v1) {
            Some(e) => e,
            None => self.create_edge(v0, v1),
        }
    }

    /// Create a face over a cyclic vertex list.
    ///
    /// If `edges` is given, `edges[i]` must join `verts[i]` and
    /// `verts[(i + 1) % n]`; otherwise missing boundary edges are created.
    /// Checking that no face already spans the same vertex cycle is the
    /// caller's job.
    pub fn create_face(&mut self, verts: &[VertexId], edges: Option<&[EdgeId]>) -> Result<FaceId> {
        let n = verts.len();
        if n < 3 {
            return Err(EditError::DegenerateGeometry {
                reason: format!("face needs at least 3 corners, got {}", n),
            });
        }
        for (i, v) in verts.iter().enumerate() {
            if verts[i + 1..].contains(v) {
                return Err(EditError::DegenerateGeometry {
                    reason: format!("vertex {:?} repeats in face", v),
                });
            }
        }
        let boundary: Vec<EdgeId> = match edges {
            Some(edges) => {
                if edges.len() != n {
                    return Err(EditError::invalid_param(
                        "edges",
                        edges.len(),
                        "edge count must match vertex count",
                    ));
                }
                for (i, &e) in edges.iter().enumerate() {
                    let edge = &self.edges[e];
                    if !(edge.has_vert(verts[i]) && edge.has_vert(verts[(i + 1) % n])) {
                        return Err(EditError::DegenerateGeometry {
                            reason: format!("edge {:?} does not join corner {}", e, i),
                        });
                    }
                }
                edges.to_vec()
            }
            None => (0..n)
                .map(|i| self.ensure_edge(verts[i], verts[(i + 1) % n]))
                .collect(),
        };

        // The corner ring is linked in once the corners exist.
        let f = self.faces.insert(Face {
            l_first: LoopId::default(),
            len: n,
            no: nalgebra::Vector3::zeros(),
            flags: ElemFlags::empty(),
            mat_nr: 0,
        });
        let loops: Vec<LoopId> = verts
            .iter()
            .zip(&boundary)
            .map(|(&v, &e)| self.new_loop(v, e, f))
            .collect();
        for i in 0..n {
            let l = loops[i];
            self.loops[l].next = loops[(i + 1) % n];
            self.loops[l].prev = loops[(i + n - 1) % n];
            self.radial_append(boundary[i], l);
        }
        self.faces[f].l_first = loops[0];
        let no = self.face_normal(f);
        self.faces[f].no = no;
        Ok(f)
    }

    /// Allocate a corner whose cycle links all point at itself.
    pub(crate) fn new_loop(&mut self, v: VertexId, e: EdgeId, f: FaceId) -> LoopId {
        self.loops.insert_with_key(|l| Loop {
            v,
            e,
            f,
            next: l,
            prev: l,
            radial_next: l,
            radial_prev: l,
        })
    }

    // ==================== Destruction ====================

    /// Remove a face and its corners. Boundary edges and vertices stay.
    pub fn kill_face(&mut self, f: FaceId) {
        let corners: Vec<LoopId> = self.face_loops(f).collect();
        for l in corners {
            let e = self.loops[l].e;
            self.radial_remove(e, l);
            self.loops.remove(l);
        }
        self.faces.remove(f);
        self.select_history.retain(|h| *h != ElemId::Face(f));
    }

    /// Remove an edge and every face using it. Endpoints stay.
    pub fn kill_edge(&mut self, e: EdgeId) {
        while let Some(l) = self.edges[e].l {
            let f = self.loops[l].f;
            self.kill_face(f);
        }
        let [v0, v1] = self.edges[e].v;
        self.disk_remove(e, v0);
        self.disk_remove(e, v1);
        self.edges.remove(e);
        self.select_history.retain(|h| *h != ElemId::Edge(e));
    }

    /// Remove a loose vertex.
    ///
    /// # Panics
    ///
    /// Panics if the vertex still has incident edges; kill those first.
    pub fn kill_vertex(&mut self, v: VertexId) {
        assert!(
            self.verts[v].e.is_none(),
            "kill_vertex on {:?} with incident edges",
            v
        );
        self.verts.remove(v);
        self.select_history.retain(|h| *h != ElemId::Vertex(v));
    }

    /// Remove a vertex together with its edges and faces.
    pub fn purge_vertex(&mut self, v: VertexId) {
        while let Some(e) = self.verts[v].e {
            self.kill_edge(e);
        }
        self.kill_vertex(v);
    }

    // ==================== Cycle maintenance ====================

    #[inline]
    pub(crate) fn disk_link(&self, e: EdgeId, v: VertexId) -> DiskLink {
        let edge = &self.edges[e];
        edge.disk[edge.slot_of(v)]
    }

    #[inline]
    pub(crate) fn disk_link_mut(&mut self, e: EdgeId, v: VertexId) -> &mut DiskLink {
        let edge = &mut self.edges[e];
        let slot = edge.slot_of(v);
        &mut edge.disk[slot]
    }

    /// Next edge after `e` in the disk cycle of `v`.
    #[inline]
    pub fn disk_next(&self, e: EdgeId, v: VertexId) -> EdgeId {
        self.disk_link(e, v).next
    }

    /// Previous edge before `e` in the disk cycle of `v`.
    #[inline]
    pub fn disk_prev(&self, e: EdgeId, v: VertexId) -> EdgeId {
        self.disk_link(e, v).prev
    }

    pub(crate) fn disk_append(&mut self, e: EdgeId, v: VertexId) {
        match self.verts[v].e {
            None => {
                self.verts[v].e = Some(e);
                *self.disk_link_mut(e, v) = DiskLink { next: e, prev: e };
            }
            Some(first) => {
                let last = self.disk_prev(first, v);
                *self.disk_link_mut(e, v) = DiskLink {
                    next: first,
                    prev: last,
                };
                self.disk_link_mut(last, v).next = e;
                self.disk_link_mut(first, v).prev = e;
            }
        }
    }

    pub(crate) fn disk_remove(&mut self, e: EdgeId, v: VertexId) {
        let DiskLink { next, prev } = self.disk_link(e, v);
        if next == e {
            self.verts[v].e = None;
        } else {
            self.disk_link_mut(prev, v).next = next;
            self.disk_link_mut(next, v).prev = prev;
            if self.verts[v].e == Some(e) {
                self.verts[v].e = Some(next);
            }
        }
        *self.disk_link_mut(e, v) = DiskLink { next: e, prev: e };
    }

    /// Replace endpoint `from` of `e` by `to`, moving it between disk cycles.
    pub(crate) fn edge_swap_vert(&mut self, e: EdgeId, from: VertexId, to: VertexId) {
        self.disk_remove(e, from);
        let slot = self.edges[e].slot_of(from);
        self.edges[e].v[slot] = to;
        self.disk_append(e, to);
    }

    pub(crate) fn radial_append(&mut self, e: EdgeId, l: LoopId) {
        self.loops[l].e = e;
        match self.edges[e].l {
            None => {
                self.edges[e].l = Some(l);
                self.loops[l].radial_next = l;
                self.loops[l].radial_prev = l;
            }
            Some(first) => {
                let last = self.loops[first].radial_prev;
                self.loops[l].radial_next = first;
                self.loops[l].radial_prev = last;
                self.loops[last].radial_next = l;
                self.loops[first].radial_prev = l;
            }
        }
    }

    pub(crate) fn radial_remove(&mut self, e: EdgeId, l: LoopId) {
        let Loop {
            radial_next,
            radial_prev,
            ..
        } = self.loops[l];
        if radial_next == l {
            self.edges[e].l = None;
        } else {
            self.loops[radial_prev].radial_next = radial_next;
            self.loops[radial_next].radial_prev = radial_prev;
            if self.edges[e].l == Some(l) {
                self.edges[e].l = Some(radial_next);
            }
        }
        self.loops[l].radial_next = l;
        self.loops[l].radial_prev = l;
    }

    /// Unlink a corner from its face cycle and its radial cycle and free it.
    ///
    /// The caller is responsible for keeping the face valid afterwards.
    pub(crate) fn loop_unlink(&mut self, l: LoopId) {
        let Loop { e, f, next, prev, .. } = self.loops[l];
        self.radial_remove(e, l);
        self.loops[prev].next = next;
        self.loops[next].prev = prev;
        let face = &mut self.faces[f];
        face.len -= 1;
        if face.l_first == l {
            face.l_first = next;
        }
        self.loops.remove(l);
    }

    /// Point corner `l` at vertex `v` and move it onto the radial cycle of `e`.
    pub(crate) fn loop_relink(&mut self, l: LoopId, v: VertexId, e: EdgeId) {
        let old = self.loops[l].e;
        if old != e {
            self.radial_remove(old, l);
            self.radial_append(e, l);
        }
        self.loops[l].v = v;
    }

    /// Insert a new corner after `after` in the same face.
    pub(crate) fn loop_insert_after(&mut self, after: LoopId, v: VertexId, e: EdgeId) -> LoopId {
        let f = self.loops[after].f;
        let next = self.loops[after].next;
        let l = self.new_loop(v, e, f);
        self.loops[l].prev = after;
        self.loops[l].next = next;
        self.loops[after].next = l;
        self.loops[next].prev = l;
        self.radial_append(e, l);
        self.faces[f].len += 1;
        l
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tri() -> (Mesh, [VertexId; 3], FaceId) {
        let mut mesh = Mesh::new();
        let a = mesh.create_vertex(Point3::new(0.0, 0.0, 0.0));
        let b = mesh.create_vertex(Point3::new(1.0, 0.0, 0.0));
        let c = mesh.create_vertex(Point3::new(0.0, 1.0, 0.0));
        let f = mesh.create_face(&[a, b, c], None).unwrap();
        (mesh, [a, b, c], f)
    }

    #[test]
    fn test_create_face_builds_edges() {
        let (mesh, [a, b, _], f) = tri();
        assert_eq!(mesh.num_edges(), 3);
        assert_eq!(mesh.num_loops(), 3);
        assert_eq!(mesh.face(f).len(), 3);
        assert!(mesh.edge_between(a, b).is_some());
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_create_face_rejects_two_corners() {
        let mut mesh = Mesh::new();
        let a = mesh.create_vertex(Point3::origin());
        let b = mesh.create_vertex(Point3::new(1.0, 0.0, 0.0));
        assert!(matches!(
            mesh.create_face(&[a, b], None),
            Err(EditError::DegenerateGeometry { .. })
        ));
        assert_eq!(mesh.num_edges(), 0);
    }

    #[test]
    fn test_create_edge_unique() {
        let (mut mesh, [a, b, _], _) = tri();
        assert!(matches!(
            mesh.create_edge_unique(b, a),
            Err(EditError::DuplicateEdge { .. })
        ));
        let dup = mesh.create_edge(a, b);
        assert_eq!(mesh.vertex_degree(a), 3);
        assert!(mesh.is_wire(dup));
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_kill_edge_kills_faces() {
        let (mut mesh, [a, b, _], _) = tri();
        let e = mesh.edge_between(a, b).unwrap();
        mesh.kill_edge(e);
        assert_eq!(mesh.num_faces(), 0);
        assert_eq!(mesh.num_edges(), 2);
        assert_eq!(mesh.num_loops(), 0);
        assert!(!mesh.contains_edge(e));
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_purge_vertex() {
        let (mut mesh, [a, _, _], _) = tri();
        mesh.purge_vertex(a);
        assert_eq!(mesh.num_vertices(), 2);
        assert_eq!(mesh.num_edges(), 1);
        assert_eq!(mesh.num_faces(), 0);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    #[should_panic(expected = "incident edges")]
    fn test_kill_vertex_with_edges_panics() {
        let (mut mesh, [a, _, _], _) = tri();
        mesh.kill_vertex(a);
    }

    #[test]
    fn test_kill_face_keeps_edges() {
        let (mut mesh, _, f) = tri();
        mesh.kill_face(f);
        assert_eq!(mesh.num_faces(), 0);
        assert_eq!(mesh.num_edges(), 3);
        assert!(mesh.edge_ids().all(|e| mesh.is_wire(e)));
        assert!(mesh.validate().is_ok());
    }
}
