//! Euler operators: local topology surgery that keeps all cycles closed.
//!
//! These are the building blocks the editing operators are written in terms
//! of. Each one either succeeds and leaves a valid mesh, or returns an error
//! before touching anything.

use std::collections::{HashMap, HashSet};

use nalgebra::Vector3;

use super::element::{ElemFlags, Face};
use super::index::{EdgeId, ElemId, FaceId, LoopId, VertexId};
use super::store::Mesh;
use crate::error::{EditError, Result};

impl Mesh {
    /// Split edge `e` by inserting a vertex at `fac` along it, measured from
    /// `v_from`.
    ///
    /// `e` keeps its `v_from` end and now ends at the new vertex; the returned
    /// edge runs from the new vertex to the old far end. Every face using `e`
    /// gains one corner. The new vertex inherits the edge's selection.
    pub fn split_edge(&mut self, e: EdgeId, v_from: VertexId, fac: f64) -> (VertexId, EdgeId) {
        let v_to = self.edges[e].other_vert(v_from);
        let (p, q) = (self.verts[v_from].co, self.verts[v_to].co);
        let no = self.verts[v_from].no.lerp(&self.verts[v_to].no, fac);
        let eflags = self.edges[e].flags;

        let vn = self.create_vertex(p + (q - p) * fac);
        self.verts[vn].no = no.try_normalize(f64::EPSILON).unwrap_or(no);
        self.verts[vn].flags = eflags & (ElemFlags::SELECT | ElemFlags::HIDDEN);

        let corners: Vec<LoopId> = self.radial_loops(e).collect();
        self.edge_swap_vert(e, v_to, vn);
        let e_new = self.create_edge(vn, v_to);
        self.edges[e_new].flags = eflags;

        for l in corners {
            if self.loops[l].v == v_from {
                self.loop_insert_after(l, vn, e_new);
            } else {
                self.radial_remove(e, l);
                self.radial_append(e_new, l);
                self.loop_insert_after(l, vn, e);
            }
        }
        (vn, e_new)
    }

    /// Split face `f` with a new edge between the corners `l_a` and `l_b`.
    ///
    /// `f` keeps the corners from `l_a` up to `l_b`; the returned face takes
    /// the rest and copies the attributes of `f`.
    pub fn split_face(&mut self, f: FaceId, l_a: LoopId, l_b: LoopId) -> Result<(FaceId, EdgeId)> {
        let (la, lb) = (self.loops[l_a], self.loops[l_b]);
        if la.f != f || lb.f != f {
            return Err(EditError::degenerate("split corners must belong to the face"));
        }
        if l_a == l_b || la.next == l_b || lb.next == l_a {
            return Err(EditError::degenerate("split corners must be distinct and not adjacent"));
        }

        let e = self.ensure_edge(la.v, lb.v);
        let mut face = Face {
            l_first: l_b,
            len: 0,
            no: Vector3::zeros(),
            flags: ElemFlags::empty(),
            mat_nr: 0,
        };
        face.copy_attrs(&self.faces[f]);
        let f_new = self.faces.insert(face);

        let nl1 = self.new_loop(lb.v, e, f);
        let nl2 = self.new_loop(la.v, e, f_new);

        self.loops[lb.prev].next = nl1;
        self.loops[nl1].prev = lb.prev;
        self.loops[nl1].next = l_a;
        self.loops[l_a].prev = nl1;

        self.loops[la.prev].next = nl2;
        self.loops[nl2].prev = la.prev;
        self.loops[nl2].next = l_b;
        self.loops[l_b].prev = nl2;

        self.radial_append(e, nl1);
        self.radial_append(e, nl2);

        let second: Vec<LoopId> = self.loops_from(l_b).collect();
        for &l in &second {
            self.loops[l].f = f_new;
        }
        self.faces[f_new].len = second.len();
        let first_len = self.loops_from(l_a).count();
        self.faces[f].len = first_len;
        self.faces[f].l_first = l_a;

        let (n0, n1) = (self.face_normal(f), self.face_normal(f_new));
        self.faces[f].no = n0;
        self.faces[f_new].no = n1;
        Ok((f_new, e))
    }

    /// Merge `f_b` into `f_a` across their shared edge `e`.
    ///
    /// Both faces must use `e` with opposite winding and share nothing else.
    /// `e` is killed when no other face uses it.
    pub fn join_faces(&mut self, f_a: FaceId, f_b: FaceId, e: EdgeId) -> Result<FaceId> {
        if f_a == f_b {
            return Err(EditError::degenerate("cannot join a face with itself"));
        }
        let l_a = self
            .face_loop_on(f_a, e)
            .ok_or_else(|| EditError::degenerate("edge is not on the first face"))?;
        let l_b = self
            .face_loop_on(f_b, e)
            .ok_or_else(|| EditError::degenerate("edge is not on the second face"))?;
        let (la, lb) = (self.loops[l_a], self.loops[l_b]);
        if la.v == lb.v {
            return Err(EditError::degenerate("faces have inconsistent winding across the edge"));
        }
        let verts_a: HashSet<VertexId> = self.face_vertices(f_a).collect();
        let shared = self.face_vertices(f_b).filter(|v| verts_a.contains(v)).count();
        if shared != 2 {
            return Err(EditError::degenerate("faces touch at more than the joined edge"));
        }

        self.radial_remove(e, l_a);
        self.radial_remove(e, l_b);
        self.loops[la.prev].next = lb.next;
        self.loops[lb.next].prev = la.prev;
        self.loops[lb.prev].next = la.next;
        self.loops[la.next].prev = lb.prev;
        self.loops.remove(l_a);
        self.loops.remove(l_b);

        let merged: Vec<LoopId> = self.loops_from(la.next).collect();
        for &l in &merged {
            self.loops[l].f = f_a;
        }
        let selected = self.faces[f_b].flags & ElemFlags::SELECT;
        let face = &mut self.faces[f_a];
        face.l_first = la.next;
        face.len = merged.len();
        face.flags |= selected;
        self.faces.remove(f_b);
        self.select_history.retain(|h| *h != ElemId::Face(f_b));

        if self.edges[e].l.is_none() {
            self.kill_edge(e);
        }
        let no = self.face_normal(f_a);
        self.faces[f_a].no = no;
        Ok(f_a)
    }

    /// Remove a two-valent vertex, fusing its two edges into one.
    ///
    /// Every face through the vertex loses a corner, so none may be a
    /// triangle. Returns the surviving edge.
    pub fn join_edges_kill_vertex(&mut self, v: VertexId) -> Result<EdgeId> {
        let edges: Vec<EdgeId> = self.disk_edges(v).collect();
        let &[e1, e2] = edges.as_slice() else {
            return Err(EditError::degenerate(format!(
                "vertex {:?} has {} edges, expected 2",
                v,
                edges.len()
            )));
        };
        let a = self.edges[e1].other_vert(v);
        let b = self.edges[e2].other_vert(v);
        if a == b {
            return Err(EditError::degenerate("both edges lead to the same vertex"));
        }
        let corners: Vec<LoopId> = self.vertex_loops(v).collect();
        if corners.iter().any(|&l| self.faces[self.loops[l].f].len <= 3) {
            return Err(EditError::degenerate("dissolving the vertex would leave a two-sided face"));
        }
        if self.edge_between(a, b).is_some() {
            return Err(EditError::DuplicateEdge { v0: a, v1: b });
        }

        for l in corners {
            let prev = self.loops[l].prev;
            if self.loops[prev].e == e2 {
                self.radial_remove(e2, prev);
                self.radial_append(e1, prev);
            }
            self.loop_unlink(l);
        }
        debug_assert!(self.edges[e2].l.is_none());
        self.disk_remove(e2, v);
        self.disk_remove(e2, b);
        self.edges.remove(e2);
        self.select_history.retain(|h| *h != ElemId::Edge(e2));
        self.edge_swap_vert(e1, v, b);
        self.kill_vertex(v);
        Ok(e1)
    }

    /// Collapse edge `e`, merging its far endpoint into `v_keep`.
    ///
    /// Triangles on `e` are removed, larger faces lose a corner, and edges
    /// that end up doubled are spliced together.
    pub fn collapse_edge(&mut self, e: EdgeId, v_keep: VertexId) -> Result<VertexId> {
        let v_kill = self.edges[e].other_vert(v_keep);
        let kill_faces: Vec<FaceId> = self.vertex_faces(v_kill).collect();
        for f in kill_faces {
            if self.face_loop_on(f, e).is_none() && self.face_loop_at(f, v_keep).is_some() {
                return Err(EditError::degenerate(format!(
                    "face {:?} spans both endpoints without using the edge",
                    f
                )));
            }
        }

        let parallel: Vec<EdgeId> = self
            .disk_edges(v_kill)
            .filter(|&x| x != e && self.edges[x].has_vert(v_keep))
            .collect();
        for dup in parallel {
            self.edge_splice(e, dup);
        }

        let corners: Vec<LoopId> = self.radial_loops(e).collect();
        for l in corners {
            if !self.loops.contains_key(l) {
                continue;
            }
            let f = self.loops[l].f;
            if self.faces[f].len <= 3 {
                self.kill_face(f);
            } else {
                self.loop_unlink(l);
            }
        }
        self.disk_remove(e, v_keep);
        self.disk_remove(e, v_kill);
        self.edges.remove(e);
        self.select_history.retain(|h| *h != ElemId::Edge(e));

        let corners: Vec<LoopId> = self.vertex_loops(v_kill).collect();
        for l in corners {
            self.loops[l].v = v_keep;
        }
        let moving: Vec<EdgeId> = self.disk_edges(v_kill).collect();
        for x in moving {
            self.edge_swap_vert(x, v_kill, v_keep);
        }
        self.kill_vertex(v_kill);
        self.merge_duplicate_edges(v_keep);
        Ok(v_keep)
    }

    /// Splice every edge around `v` that duplicates another into the first.
    pub(crate) fn merge_duplicate_edges(&mut self, v: VertexId) {
        let edges: Vec<EdgeId> = self.disk_edges(v).collect();
        let mut first: HashMap<VertexId, EdgeId> = HashMap::new();
        for x in edges {
            let other = self.edges[x].other_vert(v);
            match first.get(&other) {
                Some(&keep) => self.edge_splice(keep, x),
                None => {
                    first.insert(other, x);
                }
            }
        }
    }

    /// Move all corners of `dup` onto `keep` (same endpoints) and kill `dup`.
    pub(crate) fn edge_splice(&mut self, keep: EdgeId, dup: EdgeId) {
        debug_assert!({
            let [a, b] = self.edges[dup].v;
            self.edges[keep].has_vert(a) && self.edges[keep].has_vert(b)
        });
        while let Some(l) = self.edges[dup].l {
            self.radial_remove(dup, l);
            self.radial_append(keep, l);
        }
        let selected = self.edges[dup].flags & ElemFlags::SELECT;
        self.edges[keep].flags |= selected;
        let [a, b] = self.edges[dup].v;
        self.disk_remove(dup, a);
        self.disk_remove(dup, b);
        self.edges.remove(dup);
        self.select_history.retain(|h| *h != ElemId::Edge(dup));
    }

    /// Give corner `l` its own copy of edge `e`.
    ///
    /// Returns the new edge, or `e` itself when `l` is its only corner.
    pub fn separate_edge(&mut self, e: EdgeId, l: LoopId) -> EdgeId {
        assert_eq!(self.loops[l].e, e, "corner {:?} is not on {:?}", l, e);
        if self.loops[l].radial_next == l {
            return e;
        }
        let [a, b] = self.edges[e].v;
        let e_new = self.create_edge(a, b);
        self.edges[e_new].flags = self.edges[e].flags;
        self.radial_remove(e, l);
        self.radial_append(e_new, l);
        e_new
    }

    /// Split `v` into one vertex per fan of faces around it.
    ///
    /// The first fan keeps `v`; every other fan (and every wire edge) gets a
    /// copy at the same position. Returns all resulting vertices, `v` first.
    pub fn separate_vertex_fans(&mut self, v: VertexId) -> Vec<VertexId> {
        let fans = self.vertex_fans(v);
        let mut out = vec![v];
        for fan in fans.into_iter().skip(1) {
            out.push(self.separate_fan(v, &fan));
        }
        out
    }

    /// Move one fan of `v` (a group from [`vertex_fans`](Self::vertex_fans))
    /// onto a new vertex at the same position.
    pub fn separate_fan(&mut self, v: VertexId, fan: &[EdgeId]) -> VertexId {
        let src = self.verts[v].clone();
        let nv = self.create_vertex(src.co);
        self.verts[nv].no = src.no;
        self.verts[nv].flags = src.flags;
        for &x in fan {
            let corners: Vec<LoopId> = self.radial_loops(x).collect();
            for l in corners {
                if self.loops[l].v == v {
                    self.loops[l].v = nv;
                }
            }
            self.edge_swap_vert(x, v, nv);
        }
        nv
    }

    /// Remove a wire edge and any endpoint it leaves without edges.
    pub fn remove_spur(&mut self, e: EdgeId) -> Result<()> {
        if !self.is_wire(e) {
            return Err(EditError::degenerate(format!("edge {:?} still has faces", e)));
        }
        let [a, b] = self.edges[e].v;
        self.kill_edge(e);
        for v in [a, b] {
            if self.verts[v].e.is_none() {
                self.kill_vertex(v);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    /// A 2x1 strip of unit quads: v0..v2 along y = 0, v3..v5 along y = 1.
    fn strip() -> (Mesh, Vec<VertexId>, [FaceId; 2]) {
        let mut mesh = Mesh::new();
        let v: Vec<_> = [
            (0.0, 0.0),
            (1.0, 0.0),
            (2.0, 0.0),
            (0.0, 1.0),
            (1.0, 1.0),
            (2.0, 1.0),
        ]
        .iter()
        .map(|&(x, y)| mesh.create_vertex(Point3::new(x, y, 0.0)))
        .collect();
        let f0 = mesh.create_face(&[v[0], v[1], v[4], v[3]], None).unwrap();
        let f1 = mesh.create_face(&[v[1], v[2], v[5], v[4]], None).unwrap();
        (mesh, v, [f0, f1])
    }

    #[test]
    fn test_split_edge_shared_by_two_faces() {
        let (mut mesh, v, [f0, f1]) = strip();
        let e = mesh.edge_between(v[1], v[4]).unwrap();
        let (vn, e_new) = mesh.split_edge(e, v[1], 0.25);

        assert_relative_eq!(*mesh.position(vn), Point3::new(1.0, 0.25, 0.0));
        assert_eq!(mesh.edge(e).verts(), [v[1], vn]);
        assert!(mesh.edge(e_new).has_vert(v[4]));
        assert_eq!(mesh.face(f0).len(), 5);
        assert_eq!(mesh.face(f1).len(), 5);
        assert_eq!(mesh.num_edges(), 8);
        assert!(mesh.is_manifold_edge(e));
        assert!(mesh.is_manifold_edge(e_new));
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_split_face_and_join_back() {
        let (mut mesh, v, [f0, _]) = strip();
        let la = mesh.face_loop_at(f0, v[0]).unwrap();
        let lb = mesh.face_loop_at(f0, v[4]).unwrap();
        let (f_new, diag) = mesh.split_face(f0, la, lb).unwrap();

        assert_eq!(mesh.num_faces(), 3);
        assert_eq!(mesh.face(f0).len(), 3);
        assert_eq!(mesh.face(f_new).len(), 3);
        assert!(mesh.is_manifold_edge(diag));
        assert!(mesh.validate().is_ok());

        let joined = mesh.join_faces(f0, f_new, diag).unwrap();
        assert_eq!(joined, f0);
        assert_eq!(mesh.face(f0).len(), 4);
        assert!(!mesh.contains_edge(diag));
        assert!(!mesh.contains_face(f_new));
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_split_face_rejects_adjacent_corners() {
        let (mut mesh, v, [f0, _]) = strip();
        let la = mesh.face_loop_at(f0, v[0]).unwrap();
        let lb = mesh.face_loop_at(f0, v[1]).unwrap();
        assert!(mesh.split_face(f0, la, lb).is_err());
        assert_eq!(mesh.num_faces(), 2);
    }

    #[test]
    fn test_join_edges_kill_vertex_undoes_split() {
        let (mut mesh, v, [f0, f1]) = strip();
        let e = mesh.edge_between(v[1], v[4]).unwrap();
        let (vn, _) = mesh.split_edge(e, v[1], 0.5);
        let kept = mesh.join_edges_kill_vertex(vn).unwrap();

        assert!(!mesh.contains_vertex(vn));
        assert!(mesh.edge(kept).has_vert(v[1]) && mesh.edge(kept).has_vert(v[4]));
        assert_eq!(mesh.face(f0).len(), 4);
        assert_eq!(mesh.face(f1).len(), 4);
        assert_eq!(mesh.num_edges(), 7);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_join_edges_rejects_triangle_corner() {
        let mut mesh = Mesh::new();
        let a = mesh.create_vertex(Point3::origin());
        let b = mesh.create_vertex(Point3::new(1.0, 0.0, 0.0));
        let c = mesh.create_vertex(Point3::new(0.0, 1.0, 0.0));
        mesh.create_face(&[a, b, c], None).unwrap();
        assert!(mesh.join_edges_kill_vertex(a).is_err());
        assert_eq!(mesh.num_vertices(), 3);
    }

    #[test]
    fn test_collapse_edge_in_strip() {
        let (mut mesh, v, [f0, f1]) = strip();
        let e = mesh.edge_between(v[1], v[4]).unwrap();
        let kept = mesh.collapse_edge(e, v[1]).unwrap();

        assert_eq!(kept, v[1]);
        assert!(!mesh.contains_vertex(v[4]));
        assert_eq!(mesh.num_vertices(), 5);
        assert_eq!(mesh.face(f0).len(), 3);
        assert_eq!(mesh.face(f1).len(), 3);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_collapse_edge_kills_triangles_and_splices() {
        // Two triangles sharing edge a-b.
        let mut mesh = Mesh::new();
        let a = mesh.create_vertex(Point3::origin());
        let b = mesh.create_vertex(Point3::new(1.0, 0.0, 0.0));
        let c = mesh.create_vertex(Point3::new(0.5, 1.0, 0.0));
        let d = mesh.create_vertex(Point3::new(0.5, -1.0, 0.0));
        mesh.create_face(&[a, b, c], None).unwrap();
        mesh.create_face(&[b, a, d], None).unwrap();
        let e = mesh.edge_between(a, b).unwrap();
        mesh.collapse_edge(e, a).unwrap();

        assert_eq!(mesh.num_faces(), 0);
        assert_eq!(mesh.num_vertices(), 3);
        // a-c and a-d survive as wire edges; b's copies were spliced away.
        assert_eq!(mesh.num_edges(), 2);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_separate_edge_then_fans() {
        let (mut mesh, v, [f0, f1]) = strip();
        let e = mesh.edge_between(v[1], v[4]).unwrap();
        let l = mesh.face_loop_on(f1, e).unwrap();
        let e_new = mesh.separate_edge(e, l);

        assert_ne!(e, e_new);
        assert!(mesh.is_boundary_edge(e));
        assert!(mesh.is_boundary_edge(e_new));
        assert!(mesh.validate().is_ok());

        let before = mesh.component_count();
        let split_bottom = mesh.separate_vertex_fans(v[1]);
        let split_top = mesh.separate_vertex_fans(v[4]);
        assert_eq!(split_bottom.len(), 2);
        assert_eq!(split_top.len(), 2);
        assert_eq!(mesh.component_count(), before + 1);
        assert_eq!(mesh.face_vertices(f0).count(), 4);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_remove_spur() {
        let (mut mesh, v, _) = strip();
        let tip = mesh.create_vertex(Point3::new(3.0, 0.0, 0.0));
        let spur = mesh.create_edge(v[2], tip);
        mesh.remove_spur(spur).unwrap();
        assert!(!mesh.contains_vertex(tip));
        assert!(mesh.contains_vertex(v[2]));

        let shared = mesh.edge_between(v[1], v[4]).unwrap();
        assert!(mesh.remove_spur(shared).is_err());
    }
}
