//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use editmesh::prelude::*;
use nalgebra::{Point2, Point3};

/// A unit quad in the z = 0 plane, wound towards +z.
pub fn quad() -> Mesh {
    let points = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(1.0, 1.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
    ];
    build_from_polygons(&points, &[[0, 1, 2, 3]]).unwrap()
}

/// A right triangle in the z = 0 plane.
pub fn triangle() -> Mesh {
    let points = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
    ];
    build_from_polygons(&points, &[[0, 1, 2]]).unwrap()
}

/// `n` by `n` unit quads covering `[0, n]^2` in the z = 0 plane.
pub fn grid(n: usize) -> Mesh {
    let row = n + 1;
    let mut points = Vec::with_capacity(row * row);
    for y in 0..=n {
        for x in 0..=n {
            points.push(Point3::new(x as f64, y as f64, 0.0));
        }
    }
    let mut quads = Vec::with_capacity(n * n);
    for y in 0..n {
        for x in 0..n {
            let a = y * row + x;
            quads.push([a, a + 1, a + row + 1, a + row]);
        }
    }
    build_from_polygons(&points, &quads).unwrap()
}

/// The closed unit cube, faces wound outwards.
pub fn cube() -> Mesh {
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
    let quads = [
        [0, 3, 2, 1],
        [4, 5, 6, 7],
        [0, 1, 5, 4],
        [1, 2, 6, 5],
        [2, 3, 7, 6],
        [3, 0, 4, 7],
    ];
    build_from_polygons(&points, &quads).unwrap()
}

/// The vertex sitting at `p`.
pub fn vert_at(mesh: &Mesh, p: Point3<f64>) -> VertexId {
    mesh.vertex_ids()
        .find(|&v| (mesh.position(v) - p).norm() < 1e-9)
        .unwrap_or_else(|| panic!("no vertex at {:?}", p))
}

/// The face whose centroid is at `p`.
pub fn face_at(mesh: &Mesh, p: Point3<f64>) -> FaceId {
    mesh.face_ids()
        .find(|&f| (mesh.face_centroid(f) - p).norm() < 1e-9)
        .unwrap_or_else(|| panic!("no face centred at {:?}", p))
}

/// Orthographic view straight down the z axis.
pub fn top_down(p: &Point3<f64>) -> Option<Point2<f64>> {
    Some(Point2::new(p.x, p.y))
}

/// Euler characteristic `V - E + F`.
pub fn euler_characteristic(mesh: &Mesh) -> isize {
    mesh.num_vertices() as isize - mesh.num_edges() as isize + mesh.num_faces() as isize
}
