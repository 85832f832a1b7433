//! Adjacency predicates and derived geometry.

use std::collections::HashSet;

use nalgebra::{Point3, Vector3};
use slotmap::SecondaryMap;

use super::index::{EdgeId, FaceId, LoopId, VertexId};
use super::store::Mesh;

impl Mesh {
    // ==================== Predicates ====================

    /// Number of faces using `e`.
    pub fn edge_face_count(&self, e: EdgeId) -> usize {
        self.radial_loops(e).count()
    }

    /// Number of edges incident to `v`.
    pub fn vertex_degree(&self, v: VertexId) -> usize {
        self.disk_edges(v).count()
    }

    /// An edge with no faces.
    #[inline]
    pub fn is_wire(&self, e: EdgeId) -> bool {
        self.edges[e].l.is_none()
    }

    /// An edge with exactly one face.
    pub fn is_boundary_edge(&self, e: EdgeId) -> bool {
        match self.edges[e].l {
            Some(l) => self.loops[l].radial_next == l,
            None => false,
        }
    }

    /// An edge with exactly two faces.
    pub fn is_manifold_edge(&self, e: EdgeId) -> bool {
        match self.edges[e].l {
            Some(l) => {
                let next = self.loops[l].radial_next;
                next != l && self.loops[next].radial_next == l
            }
            None => false,
        }
    }

    /// A vertex touching a boundary or wire edge, or no edge at all.
    pub fn is_boundary_vertex(&self, v: VertexId) -> bool {
        self.verts[v].e.is_none()
            || self
                .disk_edges(v)
                .any(|e| self.is_wire(e) || self.is_boundary_edge(e))
    }

    /// A vertex whose faces form a single fan over manifold or boundary edges.
    pub fn is_manifold_vertex(&self, v: VertexId) -> bool {
        let edges: Vec<EdgeId> = self.disk_edges(v).collect();
        if edges.is_empty() {
            return false;
        }
        if edges.iter().any(|&e| self.is_wire(e) || self.edge_face_count(e) > 2) {
            return false;
        }
        let boundary = edges.iter().filter(|&&e| self.is_boundary_edge(e)).count();
        if boundary != 0 && boundary != 2 {
            return false;
        }
        self.vertex_fans(v).len() == 1
    }

    /// The first edge joining `a` and `b`, if any.
    pub fn edge_between(&self, a: VertexId, b: VertexId) -> Option<EdgeId> {
        self.disk_edges(a).find(|&e| self.edges[e].has_vert(b))
    }

    /// A face using both `a` and `b` as corners, if any.
    pub fn face_between(&self, a: VertexId, b: VertexId) -> Option<FaceId> {
        self.vertex_faces(a)
            .find(|&f| self.face_vertices(f).any(|v| v == b))
    }

    /// The corner of `f` sitting on `v`.
    pub fn face_loop_at(&self, f: FaceId, v: VertexId) -> Option<LoopId> {
        self.face_loops(f).find(|&l| self.loops[l].v == v)
    }

    /// The corner of `f` running along `e`.
    pub fn face_loop_on(&self, f: FaceId, e: EdgeId) -> Option<LoopId> {
        self.radial_loops(e).find(|&l| self.loops[l].f == f)
    }

    /// Groups of incident edges around `v` connected through shared faces.
    ///
    /// Each group is one fan; wire edges form their own single-edge groups.
    pub fn vertex_fans(&self, v: VertexId) -> Vec<Vec<EdgeId>> {
        let mut visited: HashSet<EdgeId> = HashSet::new();
        let mut fans = Vec::new();
        for start in self.disk_edges(v) {
            if !visited.insert(start) {
                continue;
            }
            let mut fan = vec![start];
            let mut stack = vec![start];
            while let Some(e) = stack.pop() {
                for l in self.radial_loops(e) {
                    let corner = &self.loops[l];
                    let across = if corner.v == v {
                        self.loops[corner.prev].e
                    } else {
                        self.loops[corner.next].e
                    };
                    if visited.insert(across) {
                        fan.push(across);
                        stack.push(across);
                    }
                }
            }
            fans.push(fan);
        }
        fans
    }

    // ==================== Geometry ====================

    /// Newell normal of a face, normalized. Zero for a degenerate face.
    pub fn face_normal(&self, f: FaceId) -> Vector3<f64> {
        let mut n = Vector3::zeros();
        for l in self.face_loops(f) {
            let corner = &self.loops[l];
            let p = &self.verts[corner.v].co;
            let q = &self.verts[self.loops[corner.next].v].co;
            n.x += (p.y - q.y) * (p.z + q.z);
            n.y += (p.z - q.z) * (p.x + q.x);
            n.z += (p.x - q.x) * (p.y + q.y);
        }
        n.try_normalize(f64::EPSILON).unwrap_or_else(Vector3::zeros)
    }

    /// Polygon area.
    pub fn face_area(&self, f: FaceId) -> f64 {
        let c = self.face_centroid(f);
        let mut twice = Vector3::zeros();
        for l in self.face_loops(f) {
            let corner = &self.loops[l];
            let p = self.verts[corner.v].co - c;
            let q = self.verts[self.loops[corner.next].v].co - c;
            twice += p.cross(&q);
        }
        twice.norm() * 0.5
    }

    /// Average of the corner positions.
    pub fn face_centroid(&self, f: FaceId) -> Point3<f64> {
        let mut sum = Vector3::zeros();
        let mut n = 0.0;
        for v in self.face_vertices(f) {
            sum += self.verts[v].co.coords;
            n += 1.0;
        }
        Point3::from(sum / n)
    }

    /// Edge length.
    pub fn edge_length(&self, e: EdgeId) -> f64 {
        let [a, b] = self.edges[e].v;
        (self.verts[b].co - self.verts[a].co).norm()
    }

    /// Edge midpoint.
    pub fn edge_midpoint(&self, e: EdgeId) -> Point3<f64> {
        let [a, b] = self.edges[e].v;
        nalgebra::center(&self.verts[a].co, &self.verts[b].co)
    }

    /// Recompute face normals and area-weighted vertex normals.
    pub fn recalc_normals(&mut self) {
        let faces: Vec<FaceId> = self.faces.keys().collect();
        for f in faces {
            let no = self.face_normal(f);
            self.faces[f].no = no;
        }
        let verts: Vec<VertexId> = self.verts.keys().collect();
        for v in verts {
            let mut n = Vector3::zeros();
            for f in self.vertex_faces(v) {
                n += self.faces[f].no * self.face_area(f);
            }
            self.verts[v].no = n.try_normalize(f64::EPSILON).unwrap_or_else(Vector3::zeros);
        }
    }

    /// Axis-aligned bounds, `None` for an empty mesh.
    pub fn bounding_box(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let mut iter = self.verts.iter().map(|(_, v)| v.co);
        let first = iter.next()?;
        Some(iter.fold((first, first), |(lo, hi), p| {
            (lo.inf(&p), hi.sup(&p))
        }))
    }

    /// Number of edge-connected components, counting loose vertices.
    pub fn component_count(&self) -> usize {
        let mut seen: SecondaryMap<VertexId, ()> = SecondaryMap::with_capacity(self.verts.len());
        let mut count = 0;
        for start in self.verts.keys() {
            if seen.insert(start, ()).is_some() {
                continue;
            }
            count += 1;
            let mut stack = vec![start];
            while let Some(v) = stack.pop() {
                for w in self.vertex_neighbors(v) {
                    if seen.insert(w, ()).is_none() {
                        stack.push(w);
                    }
                }
            }
        }
        count
    }
}
