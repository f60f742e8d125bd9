mod common;

use common::test_utils::*;
use scene_canvas::{MountStatus, SceneError, engine::RenderEngine, events::ResizeEvents};

#[test]
fn same_flag_mounts_one_engine() {
    let (mut host, listeners) = host(loaders(CountingPhysicsLoader::default(), CountingOverlayLoader::default()));
    let surface = FakeSurface::new(800, 600);

    let task = host.mount(Some(surface.clone()), &config(false)).unwrap().unwrap();
    assert!(host.mount(Some(surface.clone()), &config(false)).unwrap().is_none());
    assert!(finish(&mut host, task));

    assert_eq!(surface.log().created, 1);
    assert_eq!(surface.log().render_loops, 1);
    assert_eq!(listeners.borrow().len(), 1);
    assert!(host.status().is_rendering());
}

#[test]
fn engine_is_created_with_the_canvas_options() {
    let (mut host, _) = host(loaders(CountingPhysicsLoader::default(), CountingOverlayLoader::default()));
    host.mount(Some(FakeSurface::new(800, 600)), &config(false)).unwrap();

    let engine = host.engine().unwrap();
    assert!(engine.options.antialias);
    assert!(engine.options.preserve_drawing_buffer);
    assert!(engine.options.stencil);
    assert!(!engine.options.disable_webgl2_support);
}

#[test]
fn missing_surface_is_a_no_op() {
    let (mut host, listeners) = host(loaders(CountingPhysicsLoader::default(), CountingOverlayLoader::default()));

    assert!(host.mount(None, &config(true)).unwrap().is_none());

    assert!(!host.is_mounted());
    assert!(listeners.borrow().is_empty());
    assert!(matches!(host.status(), MountStatus::Unmounted));
    // unmounting something that never mounted is fine too
    host.unmount();
}

#[test]
fn flag_change_without_a_surface_still_tears_down() {
    let (mut host, listeners) = host(loaders(CountingPhysicsLoader::default(), CountingOverlayLoader::default()));
    let surface = FakeSurface::new(800, 600);
    let task = host.mount(Some(surface.clone()), &config(false)).unwrap().unwrap();
    assert!(finish(&mut host, task));

    assert!(host.mount(None, &config(true)).unwrap().is_none());

    assert!(!host.is_mounted());
    assert!(listeners.borrow().is_empty());
    assert_eq!(surface.log().disposed, 1);
    assert!(matches!(host.status(), MountStatus::Unmounted));
}

#[test]
fn same_flag_without_a_surface_keeps_the_mount() {
    let (mut host, listeners) = host(loaders(CountingPhysicsLoader::default(), CountingOverlayLoader::default()));
    let surface = FakeSurface::new(800, 600);
    let task = host.mount(Some(surface.clone()), &config(false)).unwrap().unwrap();
    assert!(finish(&mut host, task));

    assert!(host.mount(None, &config(false)).unwrap().is_none());

    assert!(host.status().is_rendering());
    assert_eq!(listeners.borrow().len(), 1);
    assert_eq!(surface.log().disposed, 0);
}

#[test]
fn unmount_removes_only_its_own_listener() {
    let (mut host, listeners) = host(loaders(CountingPhysicsLoader::default(), CountingOverlayLoader::default()));
    let foreign = listeners.borrow_mut().add(Box::new(|| {}));
    let surface = FakeSurface::new(800, 600);

    let task = host.mount(Some(surface.clone()), &config(false)).unwrap().unwrap();
    finish(&mut host, task);
    assert_eq!(listeners.borrow().len(), 2);

    host.unmount();
    host.unmount();

    assert_eq!(listeners.borrow().len(), 1);
    assert!(listeners.borrow().contains(foreign));
    assert_eq!(surface.log().disposed, 1);
    assert!(host.engine().is_none());
}

#[test]
fn unmount_disposes_even_while_constructing() {
    let (physics, _sender) = PendingPhysicsLoader::new();
    let (mut host, listeners) = host(loaders(physics, CountingOverlayLoader::default()));
    let surface = FakeSurface::new(800, 600);

    let _task = host.mount(Some(surface.clone()), &config(false)).unwrap().unwrap();
    assert!(matches!(host.status(), MountStatus::Constructing));
    host.unmount();

    assert_eq!(surface.log().disposed, 1);
    assert_eq!(surface.log().render_loops, 0);
    assert!(listeners.borrow().is_empty());
}

#[test]
fn dropping_the_host_unmounts() {
    let (mut host, listeners) = host(loaders(CountingPhysicsLoader::default(), CountingOverlayLoader::default()));
    let surface = FakeSurface::new(800, 600);
    let task = host.mount(Some(surface.clone()), &config(false)).unwrap().unwrap();
    finish(&mut host, task);

    drop(host);

    assert_eq!(surface.log().disposed, 1);
    assert!(listeners.borrow().is_empty());
}

#[test]
fn toggling_the_flag_remounts() {
    let (mut host, listeners) = host(loaders(CountingPhysicsLoader::default(), CountingOverlayLoader::default()));
    let surface = FakeSurface::new(800, 600);

    let first = host.mount(Some(surface.clone()), &config(false)).unwrap().unwrap();
    finish(&mut host, first);
    let second = host.mount(Some(surface.clone()), &config(true)).unwrap().unwrap();
    finish(&mut host, second);

    assert_eq!(surface.log().created, 2);
    assert_eq!(surface.log().disposed, 1);
    assert_eq!(listeners.borrow().len(), 1);
    assert!(host.engine().unwrap().is_rendering());
}

#[test]
fn engine_creation_failure_is_reported() {
    let (mut host, listeners) = host(loaders(CountingPhysicsLoader::default(), CountingOverlayLoader::default()));

    let err = host.mount(Some(FakeSurface::broken()), &config(false)).unwrap_err();

    assert!(matches!(err, SceneError::Engine(_)));
    assert!(err.to_string().contains("no GPU adapter"));
    assert!(!host.is_mounted());
    assert!(listeners.borrow().is_empty());
}
