//! Handle types for mesh elements.
//!
//! Elements live in [`slotmap::SlotMap`]s. A key carries the slot version it
//! was issued for, so a handle to a killed element can never alias a newer
//! element that reused the slot.

slotmap::new_key_type! {
    /// A type-safe vertex handle.
    pub struct VertexId;

    /// A type-safe edge handle.
    pub struct EdgeId;

    /// A type-safe face-corner (loop) handle.
    pub struct LoopId;

    /// A type-safe face handle.
    pub struct FaceId;
}

/// Any element handle, used by the selection history and operator reports.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ElemId {
    /// A vertex.
    Vertex(VertexId),
    /// An edge.
    Edge(EdgeId),
    /// A face.
    Face(FaceId),
}

impl From<VertexId> for ElemId {
    fn from(v: VertexId) -> Self {
        ElemId::Vertex(v)
    }
}

impl From<EdgeId> for ElemId {
    fn from(e: EdgeId) -> Self {
        ElemId::Edge(e)
    }
}

impl From<FaceId> for ElemId {
    fn from(f: FaceId) -> Self {
        ElemId::Face(f)
    }
}
