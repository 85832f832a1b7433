//! Selection state and flushing.
//!
//! Each element carries its own select bit, but only one element kind is
//! authoritative at a time: the [`SelectMode`] of the edit session. After any
//! selection or topology change, [`flush_selection`] rederives the other
//! kinds from the authoritative one:
//!
//! | Mode   | Vertices                          | Edges                    | Faces                     |
//! |--------|-----------------------------------|--------------------------|---------------------------|
//! | Vertex | authoritative                     | both endpoints selected  | all corners selected      |
//! | Edge   | any selected incident edge        | authoritative            | all edges selected        |
//! | Face   | on a selected face                | on a selected face       | authoritative             |
//!
//! Hidden elements are never selected and never count toward the rules.
//! One pass is enough because every rule reads only the authoritative kind,
//! so flushing is idempotent.

use tracing::trace;

use crate::mesh::{EdgeId, ElemFlags, ElemId, FaceId, Mesh, VertexId};

/// Which element kind drives selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SelectMode {
    /// Vertices are authoritative.
    #[default]
    Vertex,
    /// Edges are authoritative.
    Edge,
    /// Faces are authoritative.
    Face,
}

/// Selected element totals, refreshed by every flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SelectionCounts {
    /// Selected vertices.
    pub verts: usize,
    /// Selected edges.
    pub edges: usize,
    /// Selected faces.
    pub faces: usize,
}

impl SelectionCounts {
    /// Whether nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.verts == 0 && self.edges == 0 && self.faces == 0
    }
}

#[inline]
fn visible_selected(flags: ElemFlags) -> bool {
    flags.contains(ElemFlags::SELECT) && !flags.contains(ElemFlags::HIDDEN)
}

#[inline]
fn set_select(flags: &mut ElemFlags, select: bool) {
    let hidden = flags.contains(ElemFlags::HIDDEN);
    flags.set(ElemFlags::SELECT, select && !hidden);
}

/// Rederive selection bits from the authoritative kind and refresh counts.
pub fn flush_selection(mesh: &mut Mesh, mode: SelectMode) -> SelectionCounts {
    for vert in mesh.verts.values_mut() {
        if vert.flags.contains(ElemFlags::HIDDEN) {
            vert.flags.remove(ElemFlags::SELECT);
        }
    }
    for edge in mesh.edges.values_mut() {
        if edge.flags.contains(ElemFlags::HIDDEN) {
            edge.flags.remove(ElemFlags::SELECT);
        }
    }
    for face in mesh.faces.values_mut() {
        if face.flags.contains(ElemFlags::HIDDEN) {
            face.flags.remove(ElemFlags::SELECT);
        }
    }

    match mode {
        SelectMode::Vertex => {
            let edges: Vec<EdgeId> = mesh.edge_ids().collect();
            for e in edges {
                let [a, b] = mesh.edges[e].v;
                let sel = visible_selected(mesh.verts[a].flags) && visible_selected(mesh.verts[b].flags);
                set_select(&mut mesh.edges[e].flags, sel);
            }
            let faces: Vec<FaceId> = mesh.face_ids().collect();
            for f in faces {
                let sel = mesh
                    .face_vertices(f)
                    .all(|v| visible_selected(mesh.verts[v].flags));
                set_select(&mut mesh.faces[f].flags, sel);
            }
        }
        SelectMode::Edge => {
            let verts: Vec<VertexId> = mesh.vertex_ids().collect();
            for v in verts {
                let sel = mesh
                    .disk_edges(v)
                    .any(|e| visible_selected(mesh.edges[e].flags));
                set_select(&mut mesh.verts[v].flags, sel);
            }
            let faces: Vec<FaceId> = mesh.face_ids().collect();
            for f in faces {
                let sel = mesh
                    .face_edges(f)
                    .all(|e| visible_selected(mesh.edges[e].flags));
                set_select(&mut mesh.faces[f].flags, sel);
            }
        }
        SelectMode::Face => {
            let verts: Vec<VertexId> = mesh.vertex_ids().collect();
            for v in verts {
                let sel = mesh
                    .vertex_faces(v)
                    .any(|f| visible_selected(mesh.faces[f].flags));
                set_select(&mut mesh.verts[v].flags, sel);
            }
            let edges: Vec<EdgeId> = mesh.edge_ids().collect();
            for e in edges {
                let sel = mesh
                    .edge_faces(e)
                    .any(|f| visible_selected(mesh.faces[f].flags));
                set_select(&mut mesh.edges[e].flags, sel);
            }
        }
    }

    let counts = SelectionCounts {
        verts: mesh.verts.iter().filter(|(_, v)| visible_selected(v.flags)).count(),
        edges: mesh.edges.iter().filter(|(_, e)| visible_selected(e.flags)).count(),
        faces: mesh.faces.iter().filter(|(_, f)| visible_selected(f.flags)).count(),
    };
    let history_live = |h: &ElemId| match *h {
        ElemId::Vertex(v) => mesh.verts.get(v).is_some_and(|x| visible_selected(x.flags)),
        ElemId::Edge(e) => mesh.edges.get(e).is_some_and(|x| visible_selected(x.flags)),
        ElemId::Face(f) => mesh.faces.get(f).is_some_and(|x| visible_selected(x.flags)),
    };
    let history: Vec<ElemId> = mesh.select_history.iter().copied().filter(history_live).collect();
    mesh.select_history = history;
    mesh.totsel = counts;
    trace!(?mode, verts = counts.verts, edges = counts.edges, faces = counts.faces, "flushed selection");
    counts
}

impl Mesh {
    /// Totals from the most recent flush.
    pub fn selection_counts(&self) -> SelectionCounts {
        self.totsel
    }

    /// Elements in the order they were selected, oldest first.
    pub fn select_history(&self) -> &[ElemId] {
        &self.select_history
    }

    /// Whether a vertex is selected and visible.
    pub fn is_vert_selected(&self, v: VertexId) -> bool {
        visible_selected(self.verts[v].flags)
    }

    /// Whether an edge is selected and visible.
    pub fn is_edge_selected(&self, e: EdgeId) -> bool {
        visible_selected(self.edges[e].flags)
    }

    /// Whether a face is selected and visible.
    pub fn is_face_selected(&self, f: FaceId) -> bool {
        visible_selected(self.faces[f].flags)
    }

    /// Select or deselect a vertex. Hidden vertices stay deselected.
    pub fn select_vert(&mut self, v: VertexId, select: bool) {
        set_select(&mut self.verts[v].flags, select);
        self.record_history(ElemId::Vertex(v), self.is_vert_selected(v));
    }

    /// Select or deselect an edge together with its endpoints.
    pub fn select_edge(&mut self, e: EdgeId, select: bool) {
        set_select(&mut self.edges[e].flags, select);
        if select {
            let [a, b] = self.edges[e].v;
            set_select(&mut self.verts[a].flags, true);
            set_select(&mut self.verts[b].flags, true);
        }
        self.record_history(ElemId::Edge(e), self.is_edge_selected(e));
    }

    /// Select or deselect a face together with its edges and corners.
    pub fn select_face(&mut self, f: FaceId, select: bool) {
        set_select(&mut self.faces[f].flags, select);
        if select {
            let corners: Vec<_> = self.face_loops(f).collect();
            for l in corners {
                let (v, e) = (self.loops[l].v, self.loops[l].e);
                set_select(&mut self.verts[v].flags, true);
                set_select(&mut self.edges[e].flags, true);
            }
        }
        self.record_history(ElemId::Face(f), self.is_face_selected(f));
    }

    /// Set the select bit of every visible element.
    pub fn select_all(&mut self, select: bool) {
        for vert in self.verts.values_mut() {
            set_select(&mut vert.flags, select);
        }
        for edge in self.edges.values_mut() {
            set_select(&mut edge.flags, select);
        }
        for face in self.faces.values_mut() {
            set_select(&mut face.flags, select);
        }
        if !select {
            self.select_history.clear();
        }
    }

    /// Hide or reveal a vertex. Hiding also deselects.
    pub fn set_vert_hidden(&mut self, v: VertexId, hidden: bool) {
        let flags = &mut self.verts[v].flags;
        flags.set(ElemFlags::HIDDEN, hidden);
        if hidden {
            flags.remove(ElemFlags::SELECT);
        }
    }

    /// Hide or reveal an edge. Hiding also deselects.
    pub fn set_edge_hidden(&mut self, e: EdgeId, hidden: bool) {
        let flags = &mut self.edges[e].flags;
        flags.set(ElemFlags::HIDDEN, hidden);
        if hidden {
            flags.remove(ElemFlags::SELECT);
        }
    }

    /// Hide or reveal a face. Hiding also deselects.
    pub fn set_face_hidden(&mut self, f: FaceId, hidden: bool) {
        let flags = &mut self.faces[f].flags;
        flags.set(ElemFlags::HIDDEN, hidden);
        if hidden {
            flags.remove(ElemFlags::SELECT);
        }
    }

    /// Selected, visible vertices.
    pub fn selected_verts(&self) -> Vec<VertexId> {
        self.verts
            .iter()
            .filter(|(_, v)| visible_selected(v.flags))
            .map(|(id, _)| id)
            .collect()
    }

    /// Selected, visible edges.
    pub fn selected_edges(&self) -> Vec<EdgeId> {
        self.edges
            .iter()
            .filter(|(_, e)| visible_selected(e.flags))
            .map(|(id, _)| id)
            .collect()
    }

    /// Selected, visible faces.
    pub fn selected_faces(&self) -> Vec<FaceId> {
        self.faces
            .iter()
            .filter(|(_, f)| visible_selected(f.flags))
            .map(|(id, _)| id)
            .collect()
    }

    fn record_history(&mut self, elem: ElemId, selected: bool) {
        self.select_history.retain(|h| *h != elem);
        if selected {
            self.select_history.push(elem);
        }
    }
}
