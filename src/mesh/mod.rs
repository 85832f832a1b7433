//! Core mesh data structures.
//!
//! This module provides the editable polygon mesh and the primitives every
//! editing operator is built from.
//!
//! # Overview
//!
//! The primary type is [`Mesh`], a vertex/edge/corner/face graph in the style
//! of a radial-edge structure:
//!
//! - every vertex links its incident edges in a **disk cycle**,
//! - every edge links the face corners ([`Loop`]s) using it in a **radial cycle**,
//! - every face links its corners in a **loop cycle** in winding order.
//!
//! Unlike a half-edge structure this handles polygons of any size, wire edges,
//! loose vertices and non-manifold edges, all of which appear transiently
//! while editing.
//!
//! # Handles
//!
//! Elements are identified by versioned slot-map keys ([`VertexId`],
//! [`EdgeId`], [`LoopId`], [`FaceId`]). Killing an element never moves any
//! other, and a handle to a killed element is detected rather than aliased.
//!
//! # Construction
//!
//! ```
//! use editmesh::mesh::build_from_polygons;
//! use nalgebra::Point3;
//!
//! let points = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.5, 1.0, 0.0),
//! ];
//! let mesh = build_from_polygons(&points, &[[0, 1, 2]]).unwrap();
//! assert!(mesh.validate().is_ok());
//! ```

mod builder;
mod element;
mod euler;
mod index;
mod iter;
mod query;
mod store;
mod validate;

pub use builder::{build_from_polygons, to_face_vertex};
pub use element::{Edge, ElemFlags, Face, Loop, Vertex};
pub use index::{EdgeId, ElemId, FaceId, LoopId, VertexId};
pub use iter::{DiskIter, FaceLoopIter, RadialIter};
pub use store::Mesh;
pub use validate::TopologyViolation;
