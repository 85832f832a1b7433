//! Collapse connected selections to a point.
//!
//! Each connected set of selected edges is merged into a single vertex.
//! Faces that would be left with fewer than three corners, or that would
//! touch the merged vertex twice, are removed along the way.

use std::collections::{BTreeSet, HashSet};

use nalgebra::Point3;
use tracing::debug;

use super::{execute, EditContext, OpReport};
use crate::error::{EditError, Result};
use crate::mesh::{EdgeId, ElemId, FaceId, Mesh, VertexId};

/// Where the merged vertex ends up.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum CollapseMode {
    /// Centroid of each connected set.
    #[default]
    Center,
    /// The first selected vertex.
    First,
    /// The most recently selected vertex.
    Last,
    /// A caller-supplied point.
    Cursor(Point3<f64>),
}

/// Options for [`collapse`].
#[derive(Debug, Clone, Default)]
pub struct CollapseOptions {
    /// Target location.
    pub mode: CollapseMode,
}

impl CollapseOptions {
    /// Set the target location.
    pub fn with_mode(mut self, mode: CollapseMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Operator-specific output of [`collapse`].
#[derive(Debug, Clone, Default)]
pub struct CollapseOutput {
    /// The vertex each connected set was merged into.
    pub verts: Vec<VertexId>,
}

/// Vertex sets connected through selected edges.
fn edge_components(mesh: &Mesh) -> Vec<BTreeSet<VertexId>> {
    let selected: HashSet<EdgeId> = mesh.selected_edges().into_iter().collect();
    let starts: BTreeSet<VertexId> = selected.iter().flat_map(|&e| mesh.edge(e).verts()).collect();
    let mut seen: HashSet<VertexId> = HashSet::new();
    let mut out = Vec::new();
    for start in starts {
        if !seen.insert(start) {
            continue;
        }
        let mut comp = BTreeSet::from([start]);
        let mut stack = vec![start];
        while let Some(v) = stack.pop() {
            for e in mesh.disk_edges(v).filter(|e| selected.contains(e)) {
                let w = mesh.edge(e).other_vert(v);
                if seen.insert(w) {
                    comp.insert(w);
                    stack.push(w);
                }
            }
        }
        out.push(comp);
    }
    out
}

/// Whether `f` is still a valid face once `comp` becomes one vertex.
fn survives_merge(mesh: &Mesh, f: FaceId, comp: &BTreeSet<VertexId>) -> bool {
    let mapped: Vec<Option<VertexId>> = mesh
        .face_vertices(f)
        .map(|v| (!comp.contains(&v)).then_some(v))
        .collect();
    let n = mapped.len();
    let kept: Vec<Option<VertexId>> = (0..n)
        .filter(|&i| !(mapped[i].is_none() && mapped[(i + n - 1) % n].is_none()))
        .map(|i| mapped[i])
        .collect();
    kept.len() >= 3 && kept.iter().filter(|x| x.is_none()).count() <= 1
}

/// Whether [`Mesh::collapse_edge`] accepts `e` with `v_keep` kept.
fn collapsible(mesh: &Mesh, e: EdgeId, v_keep: VertexId) -> bool {
    let v_kill = mesh.edge(e).other_vert(v_keep);
    mesh.vertex_faces(v_kill)
        .all(|f| mesh.face_loop_on(f, e).is_some() || mesh.face_loop_at(f, v_keep).is_none())
}

/// Merge every vertex of `comp` into `keep`.
fn collapse_component(mesh: &mut Mesh, mut comp: BTreeSet<VertexId>, keep: VertexId) -> Result<()> {
    let doomed: BTreeSet<FaceId> = comp
        .iter()
        .flat_map(|&v| mesh.vertex_faces(v))
        .filter(|&f| !survives_merge(mesh, f, &comp))
        .collect();
    for f in doomed {
        mesh.kill_face(f);
    }

    loop {
        let inner: BTreeSet<EdgeId> = comp
            .iter()
            .flat_map(|&v| mesh.disk_edges(v))
            .filter(|&e| mesh.edge(e).verts().iter().all(|v| comp.contains(v)))
            .collect();
        if inner.is_empty() {
            break;
        }
        let pick = inner.iter().find_map(|&e| {
            let [a, b] = mesh.edge(e).verts();
            let (k, kill) = if b == keep { (b, a) } else { (a, b) };
            collapsible(mesh, e, k).then_some((e, k, kill))
        });
        let Some((e, k, kill)) = pick else {
            return Err(EditError::degenerate("no edge in the selection can collapse cleanly"));
        };
        mesh.collapse_edge(e, k)?;
        comp.remove(&kill);
    }
    if comp.len() > 1 {
        return Err(EditError::degenerate("selection did not merge into a single vertex"));
    }
    Ok(())
}

/// The first or last vertex in the selection history.
fn history_vertex(mesh: &Mesh, last: bool) -> Option<VertexId> {
    let mut verts = mesh.select_history().iter().filter_map(|h| match *h {
        ElemId::Vertex(v) => Some(v),
        _ => None,
    });
    if last {
        verts.last()
    } else {
        verts.next()
    }
}

/// Collapse each connected set of selected edges to one vertex.
///
/// # Errors
///
/// Returns [`EditError::InvalidSelection`] for [`CollapseMode::First`] or
/// [`CollapseMode::Last`] when no vertex is in the selection history.
pub fn collapse(mesh: &mut Mesh, ctx: &EditContext, options: &CollapseOptions) -> Result<OpReport<CollapseOutput>> {
    execute(mesh, ctx, "collapse", |mesh| {
        let components = edge_components(mesh);
        if components.is_empty() {
            return Ok(CollapseOutput::default());
        }
        let anchor = match options.mode {
            CollapseMode::First | CollapseMode::Last => {
                let last = options.mode == CollapseMode::Last;
                let v = history_vertex(mesh, last)
                    .ok_or_else(|| EditError::invalid_selection("no vertex in the selection history"))?;
                Some((v, *mesh.position(v)))
            }
            _ => None,
        };

        let mut verts = Vec::new();
        for comp in components {
            let target = match (options.mode, anchor) {
                (CollapseMode::Cursor(p), _) => p,
                (_, Some((_, p))) => p,
                _ => {
                    let sum = comp.iter().fold(Point3::origin().coords, |acc, &v| acc + mesh.position(v).coords);
                    Point3::from(sum / comp.len() as f64)
                }
            };
            let keep = match anchor {
                Some((v, _)) if comp.contains(&v) => v,
                _ => match comp.first() {
                    Some(&v) => v,
                    None => continue,
                },
            };
            debug!(verts = comp.len(), ?keep, "collapsing component");
            collapse_component(mesh, comp, keep)?;
            mesh.set_position(keep, target);
            verts.push(keep);
        }
        mesh.recalc_normals();
        Ok(CollapseOutput { verts })
    })
}
