//! # editmesh
//!
//! A topological mesh-editing kernel in the style of an interactive
//! modeller's edit mode.
//!
//! editmesh keeps a polygon mesh as vertices, edges, face corners ("loops")
//! and faces linked by three families of cycles, and provides the editing
//! operators a modelling tool is built from: extrusion, rip, bisection,
//! knife cuts, subdivision, edge rotation, dissolve and collapse.
//!
//! ## Features
//!
//! - **Generational handles**: killed elements leave stale handles detectable
//!   instead of dangling
//! - **Arbitrary polygons**: faces are n-gons, edges may carry any number of
//!   faces
//! - **Selection flushing**: vertex, edge and face select modes kept
//!   consistent after every edit
//! - **Transactional operators**: a failed operator leaves the mesh exactly as
//!   it was
//! - **No viewport dependency**: screen-space operators take a [`Projector`](ops::Projector)
//!
//! ## Quick Start
//!
//! ```
//! use editmesh::prelude::*;
//! use editmesh::ops::extrude::{extrude, ExtrudeOptions};
//! use nalgebra::{Point3, Vector3};
//!
//! // A unit cube
//! let points = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(1.0, 1.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//!     Point3::new(0.0, 0.0, 1.0),
//!     Point3::new(1.0, 0.0, 1.0),
//!     Point3::new(1.0, 1.0, 1.0),
//!     Point3::new(0.0, 1.0, 1.0),
//! ];
//! let quads = vec![
//!     [0, 3, 2, 1],
//!     [4, 5, 6, 7],
//!     [0, 1, 5, 4],
//!     [1, 2, 6, 5],
//!     [2, 3, 7, 6],
//!     [3, 0, 4, 7],
//! ];
//! let mut mesh = build_from_polygons(&points, &quads).unwrap();
//!
//! // Select the top face and pull it up
//! let top = mesh.face_ids().find(|&f| mesh.face_centroid(f).z == 1.0).unwrap();
//! mesh.select_face(top, true);
//!
//! let ctx = EditContext::new(SelectMode::Face);
//! let options = ExtrudeOptions::default().with_translation(Vector3::new(0.0, 0.0, 1.0));
//! let report = extrude(&mut mesh, &ctx, &options).unwrap();
//!
//! assert_eq!(report.verts_created, 4);
//! assert_eq!(mesh.num_faces(), 10);
//! assert!(mesh.validate().is_ok());
//! ```
//!
//! ## Mesh Traversal
//!
//! ```
//! use editmesh::prelude::*;
//! use nalgebra::Point3;
//!
//! # let points = vec![
//! #     Point3::new(0.0, 0.0, 0.0),
//! #     Point3::new(1.0, 0.0, 0.0),
//! #     Point3::new(0.5, 1.0, 0.0),
//! # ];
//! let mesh = build_from_polygons(&points, &[[0, 1, 2]]).unwrap();
//! let v = mesh.vertex_ids().next().unwrap();
//!
//! // Edges around a vertex (its disk cycle)
//! assert_eq!(mesh.disk_edges(v).count(), 2);
//!
//! // Corners around a face (its loop cycle)
//! let f = mesh.face_ids().next().unwrap();
//! assert_eq!(mesh.face_loops(f).count(), 3);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod mesh;
pub mod ops;
pub mod select;

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types and functions:
///
/// ```
/// use editmesh::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{EditError, Result};
    pub use crate::mesh::{
        build_from_polygons, to_face_vertex, EdgeId, ElemFlags, ElemId, FaceId, LoopId, Mesh,
        VertexId,
    };
    pub use crate::ops::{Changes, EditContext, Notifier, OpReport, Projector};
    pub use crate::select::{flush_selection, SelectMode};
}

// Re-export nalgebra types for convenience
pub use nalgebra;
