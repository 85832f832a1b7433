//! Mesh construction from face-vertex lists.
//!
//! Polygons may have any number of corners (at least three). Edges shared by
//! several polygons are created once, so the result is fully connected.

use std::collections::HashMap;

use nalgebra::Point3;
use tracing::debug;

use super::index::VertexId;
use super::store::Mesh;
use crate::error::{EditError, Result};

/// Build a mesh from vertex positions and polygons given as index lists.
///
/// # Example
/// ```
/// use editmesh::mesh::build_from_polygons;
/// use nalgebra::Point3;
///
/// let points = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(1.0, 1.0, 0.0),
///     Point3::new(0.0, 1.0, 0.0),
/// ];
/// let mesh = build_from_polygons(&points, &[[0, 1, 2, 3]]).unwrap();
/// assert_eq!(mesh.num_vertices(), 4);
/// assert_eq!(mesh.num_edges(), 4);
/// assert_eq!(mesh.num_faces(), 1);
/// ```
pub fn build_from_polygons<P: AsRef<[usize]>>(points: &[Point3<f64>], polygons: &[P]) -> Result<Mesh> {
    if polygons.is_empty() {
        return Err(EditError::EmptyMesh);
    }

    for (fi, poly) in polygons.iter().enumerate() {
        let poly = poly.as_ref();
        if let Some(&vi) = poly.iter().find(|&&vi| vi >= points.len()) {
            return Err(EditError::InvalidVertexIndex { face: fi, vertex: vi });
        }
        if poly.len() < 3 {
            return Err(EditError::DegenerateGeometry {
                reason: format!("polygon {} has {} corners", fi, poly.len()),
            });
        }
        for (i, vi) in poly.iter().enumerate() {
            if poly[i + 1..].contains(vi) {
                return Err(EditError::DegenerateGeometry {
                    reason: format!("polygon {} repeats vertex {}", fi, vi),
                });
            }
        }
    }

    let mut mesh = Mesh::new();
    let ids: Vec<VertexId> = points.iter().map(|&p| mesh.create_vertex(p)).collect();
    for poly in polygons {
        let verts: Vec<VertexId> = poly.as_ref().iter().map(|&vi| ids[vi]).collect();
        mesh.create_face(&verts, None)?;
    }
    mesh.recalc_normals();

    debug!(
        vertices = mesh.num_vertices(),
        edges = mesh.num_edges(),
        faces = mesh.num_faces(),
        "built mesh from polygons"
    );
    Ok(mesh)
}

/// Export a mesh as compact vertex positions and polygon index lists.
///
/// Vertices are numbered in handle order, so slots freed by earlier edits
/// are skipped.
pub fn to_face_vertex(mesh: &Mesh) -> (Vec<Point3<f64>>, Vec<Vec<usize>>) {
    let mut remap: HashMap<VertexId, usize> = HashMap::with_capacity(mesh.num_vertices());
    let mut points = Vec::with_capacity(mesh.num_vertices());
    for (v, vert) in mesh.vertices() {
        remap.insert(v, points.len());
        points.push(vert.co);
    }
    let polygons = mesh
        .face_ids()
        .map(|f| mesh.face_vertices(f).map(|v| remap[&v]).collect())
        .collect();
    (points, polygons)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube() -> (Vec<Point3<f64>>, Vec<[usize; 4]>) {
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(1.0, 0.0, 1.0),
            Point3::new(1.0, 1.0, 1.0),
            Point3::new(0.0, 1.0, 1.0),
        ];
        let faces = vec![
            [0, 3, 2, 1],
            [4, 5, 6, 7],
            [0, 1, 5, 4],
            [1, 2, 6, 5],
            [2, 3, 7, 6],
            [3, 0, 4, 7],
        ];
        (points, faces)
    }

    #[test]
    fn test_cube() {
        let (points, faces) = cube();
        let mesh = build_from_polygons(&points, &faces).unwrap();
        assert_eq!(mesh.num_vertices(), 8);
        assert_eq!(mesh.num_edges(), 12);
        assert_eq!(mesh.num_faces(), 6);
        assert!(mesh.edge_ids().all(|e| mesh.is_manifold_edge(e)));
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_mixed_polygons() {
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(2.0, 0.5, 0.0),
        ];
        let polys: Vec<Vec<usize>> = vec![vec![0, 1, 2, 3], vec![1, 4, 2]];
        let mesh = build_from_polygons(&points, &polys).unwrap();
        assert_eq!(mesh.num_edges(), 6);
        assert_eq!(mesh.num_faces(), 2);
    }

    #[test]
    fn test_roundtrip() {
        let (points, faces) = cube();
        let mesh = build_from_polygons(&points, &faces).unwrap();
        let (out_points, out_faces) = to_face_vertex(&mesh);
        assert_eq!(out_points, points);
        let expected: Vec<Vec<usize>> = faces.iter().map(|f| f.to_vec()).collect();
        assert_eq!(out_faces, expected);
    }

    #[test]
    fn test_invalid_vertex_index() {
        let points = vec![Point3::origin(); 3];
        let result = build_from_polygons(&points, &[[0, 1, 5]]);
        assert!(matches!(
            result,
            Err(EditError::InvalidVertexIndex { face: 0, vertex: 5 })
        ));
    }

    #[test]
    fn test_degenerate_polygon() {
        let points = vec![Point3::origin(); 3];
        assert!(matches!(
            build_from_polygons(&points, &[[0, 1, 1]]),
            Err(EditError::DegenerateGeometry { .. })
        ));
        let empty: [[usize; 3]; 0] = [];
        assert!(matches!(
            build_from_polygons(&points, &empty),
            Err(EditError::EmptyMesh)
        ));
    }
}
