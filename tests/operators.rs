//! End-to-end operator workflows on small meshes.

mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use approx::assert_relative_eq;
use common::*;
use editmesh::ops::bisect::{bisect, BisectOptions};
use editmesh::ops::collapse::{collapse, CollapseOptions};
use editmesh::ops::dissolve::{delete, dissolve_faces, dissolve_verts, DeleteKind, DissolveOptions};
use editmesh::ops::extrude::{extrude, ExtrudeOptions};
use editmesh::ops::knife::{knife, KnifeOptions};
use editmesh::ops::rip::{rip, RipOptions};
use editmesh::ops::rotate::{rotate_edge, RotateOptions};
use editmesh::ops::subdivide::{loop_cut, subdivide_edges, LoopCutOptions, SubdivideOptions};
use editmesh::prelude::*;
use nalgebra::{Point2, Point3, Vector3};

fn two_quads() -> Mesh {
    let points = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(2.0, 0.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
        Point3::new(1.0, 1.0, 0.0),
        Point3::new(2.0, 1.0, 0.0),
    ];
    build_from_polygons(&points, &[[0, 1, 4, 3], [1, 2, 5, 4]]).unwrap()
}

fn endpoints(mesh: &Mesh, e: EdgeId) -> [Point3<f64>; 2] {
    let [a, b] = mesh.edge(e).verts();
    let (pa, pb) = (*mesh.position(a), *mesh.position(b));
    if (pa.x, pa.y) <= (pb.x, pb.y) {
        [pa, pb]
    } else {
        [pb, pa]
    }
}

#[test]
fn test_extrude_then_bisect_column() {
    let mut mesh = cube();
    let top = face_at(&mesh, Point3::new(0.5, 0.5, 1.0));
    mesh.select_face(top, true);

    let face_ctx = EditContext::new(SelectMode::Face);
    let options = ExtrudeOptions::default().with_translation(Vector3::z());
    extrude(&mut mesh, &face_ctx, &options).unwrap();
    assert_eq!(mesh.num_vertices(), 12);
    assert_eq!(mesh.num_edges(), 20);
    assert_eq!(mesh.num_faces(), 10);

    mesh.select_all(true);
    let vert_ctx = EditContext::new(SelectMode::Vertex);
    let plane = BisectOptions::new(Point3::new(0.0, 0.0, 1.5), Vector3::z());
    let report = bisect(&mut mesh, &vert_ctx, &plane).unwrap();

    assert_eq!(report.output.cut_verts.len(), 4);
    assert_eq!(mesh.num_vertices(), 16);
    assert_eq!(mesh.num_edges(), 28);
    assert_eq!(mesh.num_faces(), 14);
    assert_eq!(euler_characteristic(&mesh), 2);
    assert!(mesh.edge_ids().all(|e| mesh.is_manifold_edge(e)));
    for &v in &report.output.cut_verts {
        assert_relative_eq!(mesh.position(v).z, 1.5);
    }
    assert!(mesh.validate().is_ok());
}

#[test]
fn test_loop_cut_around_cube() {
    let mut mesh = cube();
    let (a, b) = (vert_at(&mesh, Point3::origin()), vert_at(&mesh, Point3::new(0.0, 0.0, 1.0)));
    let vertical = mesh.edge_between(a, b).unwrap();

    let ctx = EditContext::new(SelectMode::Edge);
    let report = loop_cut(&mut mesh, &ctx, vertical, &LoopCutOptions::default()).unwrap();

    assert_eq!(report.verts_created, 4);
    assert_eq!(mesh.num_vertices(), 12);
    assert_eq!(mesh.num_edges(), 20);
    assert_eq!(mesh.num_faces(), 10);
    assert_eq!(mesh.selection_counts().edges, 4);
    for e in mesh.selected_edges() {
        for v in mesh.edge(e).verts() {
            assert_relative_eq!(mesh.position(v).z, 0.5);
        }
    }
    assert!(mesh.edge_ids().all(|e| mesh.is_manifold_edge(e)));
    assert!(mesh.validate().is_ok());
}

#[test]
fn test_subdivide_then_dissolve_restores_quad() {
    let mut mesh = quad();
    mesh.select_all(true);
    let ctx = EditContext::new(SelectMode::Face);
    subdivide_edges(&mut mesh, &ctx, &SubdivideOptions::default()).unwrap();
    assert_eq!(mesh.num_vertices(), 9);
    assert_eq!(mesh.num_faces(), 4);

    mesh.select_all(true);
    let report = dissolve_faces(&mut mesh, &ctx, &DissolveOptions::default().with_use_verts(true)).unwrap();

    assert_eq!(report.output.merged.len(), 1);
    assert_eq!(mesh.num_vertices(), 4);
    assert_eq!(mesh.num_edges(), 4);
    assert_eq!(mesh.num_faces(), 1);
    let f = report.output.merged[0];
    assert_relative_eq!(mesh.face_area(f), 1.0, epsilon = 1e-12);
}

#[test]
fn test_knife_then_collapse_cut() {
    let mut mesh = quad();
    mesh.select_all(true);
    let ctx = EditContext::new(SelectMode::Vertex);
    let stroke = [Point2::new(0.5, -1.0), Point2::new(0.5, 2.0)];
    let cut = knife(&mut mesh, &ctx, &top_down, &stroke, &KnifeOptions::default()).unwrap();

    assert_eq!(cut.output.crossed, 2);
    assert_eq!(cut.verts_created, 2);
    assert_eq!(mesh.num_edges(), 7);
    assert_eq!(mesh.num_faces(), 2);

    mesh.select_all(false);
    for &v in &cut.new_verts {
        mesh.select_vert(v, true);
    }
    let report = collapse(&mut mesh, &ctx, &CollapseOptions::default()).unwrap();

    let &[merged] = report.output.verts.as_slice() else {
        panic!("expected one merged vertex");
    };
    assert_relative_eq!(*mesh.position(merged), Point3::new(0.5, 0.5, 0.0), epsilon = 1e-12);
    assert_eq!(mesh.num_vertices(), 5);
    assert_eq!(mesh.num_edges(), 6);
    assert_eq!(mesh.num_faces(), 2);
    assert!(mesh.face_ids().all(|f| mesh.face(f).len() == 3));
    assert_eq!(mesh.vertex_fans(merged).len(), 2);
    assert!(mesh.validate().is_ok());
}

#[test]
fn test_three_rotations_come_back_around() {
    let mut mesh = two_quads();
    let shared = mesh
        .edge_ids()
        .find(|&e| mesh.is_manifold_edge(e))
        .unwrap();
    let original = endpoints(&mesh, shared);
    mesh.select_edge(shared, true);

    let ctx = EditContext::new(SelectMode::Edge);
    let mut seen = Vec::new();
    for _ in 0..3 {
        let report = rotate_edge(&mut mesh, &ctx, &RotateOptions::default()).unwrap();
        seen.push(endpoints(&mesh, report.output.edge));
        assert_eq!(mesh.num_edges(), 7);
        assert!(mesh.face_ids().all(|f| mesh.face(f).len() == 4));
        assert_eq!(mesh.selected_edges(), vec![report.output.edge]);
    }
    assert_ne!(seen[0], original);
    assert_ne!(seen[1], original);
    assert_eq!(seen[2], original);
}

#[test]
fn test_rip_path_then_delete_ripped_side() {
    let mut mesh = grid(2);
    for y in 0..=2 {
        let v = vert_at(&mesh, Point3::new(1.0, y as f64, 0.0));
        mesh.select_vert(v, true);
    }
    let ctx = EditContext::new(SelectMode::Vertex);
    rip(&mut mesh, &ctx, &top_down, &RipOptions::new(Point2::new(1.7, 1.0))).unwrap();
    assert_eq!(mesh.component_count(), 2);

    mesh.select_all(false);
    let right: Vec<FaceId> = mesh.face_ids().filter(|&f| mesh.face_centroid(f).x > 1.0).collect();
    for f in right {
        mesh.select_face(f, true);
    }
    delete(&mut mesh, &EditContext::new(SelectMode::Face), DeleteKind::Faces).unwrap();

    assert_eq!(mesh.num_vertices(), 6);
    assert_eq!(mesh.num_edges(), 7);
    assert_eq!(mesh.num_faces(), 2);
    assert_eq!(mesh.component_count(), 1);
    assert!(mesh.vertex_ids().all(|v| mesh.position(v).x <= 1.0));
    assert!(mesh.validate().is_ok());
}

#[test]
fn test_notifier_sees_each_successful_change() {
    let log: Arc<Mutex<Vec<Changes>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();
    let ctx = EditContext::new(SelectMode::Face).with_notifier(Notifier::new(move |changes| {
        sink.lock().unwrap().push(changes);
    }));

    let mut mesh = cube();
    let top = face_at(&mesh, Point3::new(0.5, 0.5, 1.0));
    mesh.select_face(top, true);
    let options = ExtrudeOptions::default().with_translation(Vector3::z());
    let report = extrude(&mut mesh, &ctx, &options).unwrap();
    assert!(report.changes.contains(Changes::TOPOLOGY | Changes::SELECTION));

    // Nothing selected: no change, no notification.
    mesh.select_all(false);
    let noop = delete(&mut mesh, &ctx, DeleteKind::Faces).unwrap();
    assert!(noop.is_noop());

    let seen = log.lock().unwrap();
    assert_eq!(seen.as_slice(), &[report.changes]);
}

#[test]
fn test_failed_operators_leave_mesh_untouched() {
    let called = Arc::new(AtomicBool::new(false));
    let flag = called.clone();
    let notifier = Notifier::new(move |_| flag.store(true, Ordering::Relaxed));
    let ctx = EditContext::new(SelectMode::Vertex).with_notifier(notifier);

    let mut mesh = triangle();
    let corner = vert_at(&mesh, Point3::origin());
    mesh.select_vert(corner, true);
    let before = to_face_vertex(&mesh);
    let err = dissolve_verts(&mut mesh, &ctx).unwrap_err();
    assert!(matches!(err, EditError::DegenerateGeometry { .. }));
    assert_eq!(to_face_vertex(&mesh), before);

    let mut mesh = quad();
    let boundary = mesh.edge_ids().next().unwrap();
    mesh.select_edge(boundary, true);
    let before = to_face_vertex(&mesh);
    let err = rotate_edge(&mut mesh, &EditContext::new(SelectMode::Edge), &RotateOptions::default()).unwrap_err();
    assert!(matches!(err, EditError::InvalidSelection { .. }));
    assert_eq!(to_face_vertex(&mesh), before);
    assert!(mesh.validate().is_ok());

    assert!(!called.load(Ordering::Relaxed));
}
