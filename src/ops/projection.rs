//! Screen-space projection consumed by the rip and knife operators.
//!
//! The viewport owns the camera; operators only need a way to turn a
//! mesh-local point into 2D. Any `Fn(&Point3<f64>) -> Option<Point2<f64>>`
//! is a [`Projector`], which keeps tests free of camera setup:
//!
//! ```
//! use editmesh::ops::Projector;
//! use nalgebra::{Point2, Point3};
//!
//! let top_down = |p: &Point3<f64>| Some(Point2::new(p.x, p.y));
//! assert_eq!(top_down.project(&Point3::new(1.0, 2.0, 3.0)), Some(Point2::new(1.0, 2.0)));
//! ```

use nalgebra::{Matrix4, Point2, Point3};
use slotmap::SecondaryMap;

use crate::mesh::{Mesh, VertexId};

/// Maps mesh-local points to 2D screen coordinates.
pub trait Projector {
    /// Project a point, or `None` if it cannot be projected (for example
    /// behind the near clipping plane).
    fn project(&self, p: &Point3<f64>) -> Option<Point2<f64>>;
}

impl<F> Projector for F
where
    F: Fn(&Point3<f64>) -> Option<Point2<f64>>,
{
    fn project(&self, p: &Point3<f64>) -> Option<Point2<f64>> {
        self(p)
    }
}

/// A projector from a full model-view-projection matrix and a viewport size.
#[derive(Debug, Clone)]
pub struct MatrixProjector {
    /// Mesh-local to clip space.
    pub mvp: Matrix4<f64>,
    /// Viewport width in pixels.
    pub width: f64,
    /// Viewport height in pixels.
    pub height: f64,
    /// Points with clip-space `w` at or below this are rejected.
    pub near_clip: f64,
}

impl MatrixProjector {
    /// Create a projector for the given matrix and viewport size.
    pub fn new(mvp: Matrix4<f64>, width: f64, height: f64) -> Self {
        Self {
            mvp,
            width,
            height,
            near_clip: 1e-6,
        }
    }
}

impl Projector for MatrixProjector {
    fn project(&self, p: &Point3<f64>) -> Option<Point2<f64>> {
        let clip = self.mvp * p.to_homogeneous();
        if clip.w <= self.near_clip {
            return None;
        }
        let ndc_x = clip.x / clip.w;
        let ndc_y = clip.y / clip.w;
        Some(Point2::new(
            (ndc_x + 1.0) * 0.5 * self.width,
            (ndc_y + 1.0) * 0.5 * self.height,
        ))
    }
}

/// Per-vertex screen positions, built once per operator call.
///
/// Vertices created after the table was built read as unprojectable.
#[derive(Debug, Clone)]
pub struct ProjectionTable {
    screen: SecondaryMap<VertexId, Point2<f64>>,
}

impl ProjectionTable {
    /// Project every vertex of `mesh`.
    pub fn build<P: Projector + ?Sized>(mesh: &Mesh, projector: &P) -> Self {
        let screen = mesh
            .vertices()
            .filter_map(|(v, vert)| projector.project(&vert.co).map(|p| (v, p)))
            .collect();
        Self { screen }
    }

    /// Screen position of `v`, if it was projectable.
    #[inline]
    pub fn get(&self, v: VertexId) -> Option<Point2<f64>> {
        self.screen.get(v).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_matrix_projector_identity() {
        let proj = MatrixProjector::new(Matrix4::identity(), 200.0, 100.0);
        let p = proj.project(&Point3::new(0.0, 0.0, 0.5)).unwrap();
        assert_relative_eq!(p, Point2::new(100.0, 50.0));
        let corner = proj.project(&Point3::new(1.0, 1.0, 0.0)).unwrap();
        assert_relative_eq!(corner, Point2::new(200.0, 100.0));
    }

    #[test]
    fn test_table_marks_unprojectable() {
        let mut mesh = Mesh::new();
        let front = mesh.create_vertex(Point3::new(0.0, 0.0, 1.0));
        let behind = mesh.create_vertex(Point3::new(0.0, 0.0, -1.0));
        let projector = |p: &Point3<f64>| (p.z > 0.0).then(|| Point2::new(p.x, p.y));
        let table = ProjectionTable::build(&mesh, &projector);
        assert!(table.get(front).is_some());
        assert!(table.get(behind).is_none());
    }
}
