//! Element records stored in the mesh slot maps.
//!
//! Connectivity fields are crate-private: they are only ever changed through
//! the store primitives and Euler operators, which keep the disk, radial and
//! loop cycles closed. Attribute fields (position, normal, flags, material)
//! are public and may be edited freely.

use bitflags::bitflags;
use nalgebra::{Point3, Vector3};

use super::index::{EdgeId, FaceId, LoopId, VertexId};

bitflags! {
    /// Per-element state bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ElemFlags: u8 {
        /// Element is selected.
        const SELECT = 1 << 0;
        /// Element is hidden; hidden elements never count as selected.
        const HIDDEN = 1 << 1;
        /// Smooth shading (faces) or a smooth edge.
        const SMOOTH = 1 << 2;
    }
}

/// A mesh vertex.
#[derive(Debug, Clone)]
pub struct Vertex {
    /// Position in mesh-local space.
    pub co: Point3<f64>,
    /// Derived normal, refreshed by [`Mesh::recalc_normals`](super::Mesh::recalc_normals).
    pub no: Vector3<f64>,
    /// State bits.
    pub flags: ElemFlags,
    /// Entry point into the disk cycle, `None` for a loose vertex.
    pub(crate) e: Option<EdgeId>,
}

impl Vertex {
    pub(crate) fn new(co: Point3<f64>) -> Self {
        Self {
            co,
            no: Vector3::zeros(),
            flags: ElemFlags::empty(),
            e: None,
        }
    }

    /// One incident edge, if any.
    #[inline]
    pub fn edge(&self) -> Option<EdgeId> {
        self.e
    }
}

/// Next/previous links of an edge around one of its endpoints.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DiskLink {
    pub(crate) next: EdgeId,
    pub(crate) prev: EdgeId,
}

/// A mesh edge.
///
/// `disk[i]` links this edge into the disk cycle of `v[i]`.
#[derive(Debug, Clone)]
pub struct Edge {
    pub(crate) v: [VertexId; 2],
    /// State bits.
    pub flags: ElemFlags,
    /// Entry point into the radial cycle, `None` for a wire edge.
    pub(crate) l: Option<LoopId>,
    pub(crate) disk: [DiskLink; 2],
}

impl Edge {
    /// Both endpoints.
    #[inline]
    pub fn verts(&self) -> [VertexId; 2] {
        self.v
    }

    /// Whether `v` is an endpoint.
    #[inline]
    pub fn has_vert(&self, v: VertexId) -> bool {
        self.v[0] == v || self.v[1] == v
    }

    /// The endpoint opposite `v`.
    ///
    /// # Panics
    ///
    /// Panics if `v` is not an endpoint.
    #[inline]
    pub fn other_vert(&self, v: VertexId) -> VertexId {
        if self.v[0] == v {
            self.v[1]
        } else {
            assert_eq!(self.v[1], v, "{:?} is not an endpoint", v);
            self.v[0]
        }
    }

    /// One face corner using this edge, if any.
    #[inline]
    pub fn first_loop(&self) -> Option<LoopId> {
        self.l
    }

    #[inline]
    pub(crate) fn slot_of(&self, v: VertexId) -> usize {
        if self.v[0] == v {
            0
        } else {
            debug_assert_eq!(self.v[1], v);
            1
        }
    }
}

/// A face corner.
///
/// A loop belongs to exactly one face, sits on vertex `v` and runs along edge
/// `e` towards the next corner of the face.
#[derive(Debug, Clone, Copy)]
pub struct Loop {
    pub(crate) v: VertexId,
    pub(crate) e: EdgeId,
    pub(crate) f: FaceId,
    pub(crate) next: LoopId,
    pub(crate) prev: LoopId,
    pub(crate) radial_next: LoopId,
    pub(crate) radial_prev: LoopId,
}

impl Loop {
    /// The corner vertex.
    #[inline]
    pub fn vert(&self) -> VertexId {
        self.v
    }

    /// The edge leaving the corner along the face boundary.
    #[inline]
    pub fn edge(&self) -> EdgeId {
        self.e
    }

    /// The owning face.
    #[inline]
    pub fn face(&self) -> FaceId {
        self.f
    }

    /// Next corner around the face.
    #[inline]
    pub fn next(&self) -> LoopId {
        self.next
    }

    /// Previous corner around the face.
    #[inline]
    pub fn prev(&self) -> LoopId {
        self.prev
    }

    /// Next corner sharing the same edge.
    #[inline]
    pub fn radial_next(&self) -> LoopId {
        self.radial_next
    }
}

/// A polygon face.
#[derive(Debug, Clone)]
pub struct Face {
    pub(crate) l_first: LoopId,
    pub(crate) len: usize,
    /// Derived normal.
    pub no: Vector3<f64>,
    /// State bits.
    pub flags: ElemFlags,
    /// Material slot, carried over to faces derived from this one.
    pub mat_nr: u16,
}

impl Face {
    /// First corner of the boundary.
    #[inline]
    pub fn first_loop(&self) -> LoopId {
        self.l_first
    }

    /// Number of corners.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false for a live face; faces have at least three corners.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Copy shading, material and selection from another face.
    pub(crate) fn copy_attrs(&mut self, src: &Face) {
        self.no = src.no;
        self.flags = src.flags;
        self.mat_nr = src.mat_nr;
    }
}
