//! Cycle iterators.
//!
//! All three walks are finite and restartable: they stop when they come back
//! to the element they started from. Mutating the mesh invalidates them, so
//! operators collect into a `Vec` before they edit.

use super::index::{EdgeId, FaceId, LoopId, VertexId};
use super::store::Mesh;

/// Iterator over the edges around a vertex (its disk cycle).
pub struct DiskIter<'a> {
    mesh: &'a Mesh,
    v: VertexId,
    start: Option<EdgeId>,
    current: Option<EdgeId>,
}

impl<'a> Iterator for DiskIter<'a> {
    type Item = EdgeId;

    fn next(&mut self) -> Option<Self::Item> {
        let result = self.current?;
        let next = self.mesh.disk_next(result, self.v);
        self.current = if Some(next) == self.start {
            None
        } else {
            Some(next)
        };
        Some(result)
    }
}

/// Iterator over the corners sharing an edge (its radial cycle).
pub struct RadialIter<'a> {
    mesh: &'a Mesh,
    start: Option<LoopId>,
    current: Option<LoopId>,
}

impl<'a> Iterator for RadialIter<'a> {
    type Item = LoopId;

    fn next(&mut self) -> Option<Self::Item> {
        let result = self.current?;
        let next = self.mesh.loops[result].radial_next;
        self.current = if Some(next) == self.start {
            None
        } else {
            Some(next)
        };
        Some(result)
    }
}

/// Iterator over the corners of a face in winding order.
pub struct FaceLoopIter<'a> {
    mesh: &'a Mesh,
    start: LoopId,
    current: Option<LoopId>,
}

impl<'a> Iterator for FaceLoopIter<'a> {
    type Item = LoopId;

    fn next(&mut self) -> Option<Self::Item> {
        let result = self.current?;
        let next = self.mesh.loops[result].next;
        self.current = if next == self.start { None } else { Some(next) };
        Some(result)
    }
}

impl Mesh {
    /// Edges incident to `v`.
    pub fn disk_edges(&self, v: VertexId) -> DiskIter<'_> {
        let start = self.verts[v].e;
        DiskIter {
            mesh: self,
            v,
            start,
            current: start,
        }
    }

    /// Corners using edge `e`, one per incident face side.
    pub fn radial_loops(&self, e: EdgeId) -> RadialIter<'_> {
        let start = self.edges[e].l;
        RadialIter {
            mesh: self,
            start,
            current: start,
        }
    }

    /// Corners of face `f`, starting at its first loop.
    pub fn face_loops(&self, f: FaceId) -> FaceLoopIter<'_> {
        self.loops_from(self.faces[f].l_first)
    }

    /// Corners of the face owning `l`, starting at `l`.
    pub fn loops_from(&self, l: LoopId) -> FaceLoopIter<'_> {
        FaceLoopIter {
            mesh: self,
            start: l,
            current: Some(l),
        }
    }

    /// Faces using edge `e`.
    pub fn edge_faces(&self, e: EdgeId) -> impl Iterator<Item = FaceId> + '_ {
        self.radial_loops(e).map(move |l| self.loops[l].f)
    }

    /// Vertices adjacent to `v` through an edge.
    pub fn vertex_neighbors(&self, v: VertexId) -> impl Iterator<Item = VertexId> + '_ {
        self.disk_edges(v)
            .map(move |e| self.edges[e].other_vert(v))
    }

    /// Corners sitting on `v`, one per face around it.
    pub fn vertex_loops(&self, v: VertexId) -> impl Iterator<Item = LoopId> + '_ {
        self.disk_edges(v).flat_map(move |e| {
            self.radial_loops(e)
                .filter(move |&l| self.loops[l].v == v)
        })
    }

    /// Faces around `v`.
    pub fn vertex_faces(&self, v: VertexId) -> impl Iterator<Item = FaceId> + '_ {
        self.vertex_loops(v).map(move |l| self.loops[l].f)
    }

    /// Corner vertices of `f` in winding order.
    pub fn face_vertices(&self, f: FaceId) -> impl Iterator<Item = VertexId> + '_ {
        self.face_loops(f).map(move |l| self.loops[l].v)
    }

    /// Boundary edges of `f` in winding order.
    pub fn face_edges(&self, f: FaceId) -> impl Iterator<Item = EdgeId> + '_ {
        self.face_loops(f).map(move |l| self.loops[l].e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    #[test]
    fn test_disk_iter_on_fan() {
        let mut mesh = Mesh::new();
        let c = mesh.create_vertex(Point3::origin());
        let spokes: Vec<_> = (0..5)
            .map(|i| {
                let v = mesh.create_vertex(Point3::new(i as f64, 1.0, 0.0));
                mesh.create_edge(c, v)
            })
            .collect();
        let around: Vec<_> = mesh.disk_edges(c).collect();
        assert_eq!(around, spokes);
        assert_eq!(mesh.vertex_neighbors(c).count(), 5);
    }

    #[test]
    fn test_loose_vertex_has_empty_disk() {
        let mut mesh = Mesh::new();
        let v = mesh.create_vertex(Point3::origin());
        assert_eq!(mesh.disk_edges(v).count(), 0);
        assert_eq!(mesh.vertex_faces(v).count(), 0);
    }

    #[test]
    fn test_face_and_radial_iters() {
        let mut mesh = Mesh::new();
        let v: Vec<_> = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]
            .iter()
            .map(|&(x, y)| mesh.create_vertex(Point3::new(x, y, 0.0)))
            .collect();
        let f0 = mesh.create_face(&[v[0], v[1], v[2]], None).unwrap();
        let f1 = mesh.create_face(&[v[0], v[2], v[3]], None).unwrap();

        assert_eq!(mesh.face_vertices(f0).collect::<Vec<_>>(), vec![v[0], v[1], v[2]]);
        let diag = mesh.edge_between(v[0], v[2]).unwrap();
        let mut faces: Vec<_> = mesh.edge_faces(diag).collect();
        faces.sort();
        assert_eq!(faces, vec![f0, f1]);
        assert_eq!(mesh.vertex_faces(v[0]).count(), 2);
        assert_eq!(mesh.vertex_faces(v[1]).count(), 1);
    }
}
