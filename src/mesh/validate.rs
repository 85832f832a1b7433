//! Structural invariant checks.
//!
//! A failed check means a bug in a primitive or operator, not bad input, so
//! the operators only run it under `debug_assertions`. Tests call
//! [`Mesh::validate`] after every edit.

use slotmap::SecondaryMap;
use thiserror::Error;

use super::index::{EdgeId, FaceId, LoopId, VertexId};
use super::store::Mesh;

/// A broken topology invariant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopologyViolation {
    /// A disk cycle does not close over exactly the incident edges.
    #[error("disk cycle of {vertex:?} is broken at {edge:?}")]
    DiskCycle {
        /// The vertex whose disk cycle is broken.
        vertex: VertexId,
        /// The offending edge.
        edge: EdgeId,
    },

    /// A radial cycle does not close over the corners using the edge.
    #[error("radial cycle of {edge:?} is broken at {corner:?}")]
    RadialCycle {
        /// The edge whose radial cycle is broken.
        edge: EdgeId,
        /// The offending corner.
        corner: LoopId,
    },

    /// A face cycle does not close after `len` steps or is too short.
    #[error("loop cycle of {face:?} is broken ({reason})")]
    LoopCycle {
        /// The face.
        face: FaceId,
        /// What went wrong.
        reason: &'static str,
    },

    /// An element references a killed element.
    #[error("{element} references a dead {target}")]
    DanglingReference {
        /// Debug name of the referencing element.
        element: String,
        /// Kind of the missing element.
        target: &'static str,
    },
}

impl Mesh {
    /// Check disk, radial and loop cycle closure and reference liveness.
    pub fn validate(&self) -> Result<(), TopologyViolation> {
        for (e, edge) in self.edges.iter() {
            for v in edge.v {
                if !self.verts.contains_key(v) {
                    return Err(TopologyViolation::DanglingReference {
                        element: format!("{:?}", e),
                        target: "vertex",
                    });
                }
            }
            if edge.v[0] == edge.v[1] {
                return Err(TopologyViolation::DiskCycle {
                    vertex: edge.v[0],
                    edge: e,
                });
            }
        }

        // Disk cycles: every edge in the walk has the vertex as an endpoint,
        // prev/next agree, and the walk covers exactly the incident edges.
        let mut incident: SecondaryMap<VertexId, usize> = self.verts.keys().map(|v| (v, 0)).collect();
        for (_, edge) in self.edges.iter() {
            for v in edge.v {
                incident[v] += 1;
            }
        }
        for (v, vert) in self.verts.iter() {
            let Some(start) = vert.e else {
                if let Some((e, _)) = self.edges.iter().find(|(_, edge)| edge.has_vert(v)) {
                    return Err(TopologyViolation::DiskCycle { vertex: v, edge: e });
                }
                continue;
            };
            let mut e = start;
            let mut steps = 0;
            loop {
                if !self.edges.contains_key(e) || !self.edges[e].has_vert(v) {
                    return Err(TopologyViolation::DiskCycle { vertex: v, edge: e });
                }
                let next = self.disk_next(e, v);
                if !self.edges.get(next).is_some_and(|n| n.has_vert(v)) || self.disk_prev(next, v) != e {
                    return Err(TopologyViolation::DiskCycle { vertex: v, edge: e });
                }
                steps += 1;
                e = next;
                if e == start || steps > incident[v] {
                    break;
                }
            }
            if e != start || steps != incident[v] {
                return Err(TopologyViolation::DiskCycle { vertex: v, edge: e });
            }
        }

        // Radial cycles.
        let mut uses: SecondaryMap<EdgeId, usize> = self.edges.keys().map(|e| (e, 0)).collect();
        for (_, corner) in self.loops.iter() {
            if !self.edges.contains_key(corner.e) {
                return Err(TopologyViolation::DanglingReference {
                    element: format!("{:?}", corner),
                    target: "edge",
                });
            }
            uses[corner.e] += 1;
        }
        for (e, edge) in self.edges.iter() {
            let Some(start) = edge.l else {
                if let Some((l, _)) = self.loops.iter().find(|(_, corner)| corner.e == e) {
                    return Err(TopologyViolation::RadialCycle { edge: e, corner: l });
                }
                continue;
            };
            let mut l = start;
            let mut steps = 0;
            loop {
                let Some(corner) = self.loops.get(l) else {
                    return Err(TopologyViolation::RadialCycle { edge: e, corner: l });
                };
                let back = self.loops.get(corner.radial_next).map(|n| n.radial_prev);
                if corner.e != e || back != Some(l) {
                    return Err(TopologyViolation::RadialCycle { edge: e, corner: l });
                }
                steps += 1;
                l = corner.radial_next;
                if l == start || steps > uses[e] {
                    break;
                }
            }
            if l != start || steps != uses[e] {
                return Err(TopologyViolation::RadialCycle { edge: e, corner: l });
            }
        }

        // Loop cycles: corners chain vertex to vertex along their edges.
        let mut owned: SecondaryMap<FaceId, usize> = self.faces.keys().map(|f| (f, 0)).collect();
        for (_, corner) in self.loops.iter() {
            if !self.faces.contains_key(corner.f) {
                return Err(TopologyViolation::DanglingReference {
                    element: format!("{:?}", corner),
                    target: "face",
                });
            }
            owned[corner.f] += 1;
        }
        for (f, face) in self.faces.iter() {
            if face.len < 3 {
                return Err(TopologyViolation::LoopCycle {
                    face: f,
                    reason: "fewer than 3 corners",
                });
            }
            if owned[f] != face.len {
                return Err(TopologyViolation::LoopCycle {
                    face: f,
                    reason: "corner count mismatch",
                });
            }
            let mut l = face.l_first;
            for _ in 0..face.len {
                let Some(corner) = self.loops.get(l) else {
                    return Err(TopologyViolation::LoopCycle {
                        face: f,
                        reason: "dead corner",
                    });
                };
                let next = corner.next;
                let edge = &self.edges[corner.e];
                let Some(next_corner) = self.loops.get(next) else {
                    return Err(TopologyViolation::LoopCycle {
                        face: f,
                        reason: "dead corner",
                    });
                };
                if corner.f != f
                    || next_corner.prev != l
                    || !self.verts.contains_key(corner.v)
                    || !edge.has_vert(corner.v)
                    || !edge.has_vert(next_corner.v)
                {
                    return Err(TopologyViolation::LoopCycle {
                        face: f,
                        reason: "corner links disagree",
                    });
                }
                l = next;
            }
            if l != face.l_first {
                return Err(TopologyViolation::LoopCycle {
                    face: f,
                    reason: "cycle does not close",
                });
            }
        }
        Ok(())
    }
}
