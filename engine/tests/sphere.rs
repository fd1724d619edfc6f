use std::sync::mpsc::channel;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use geof_engine::field::FieldIndex;
use geof_engine::panel::PerFieldFn;
use geof_engine::sphere::{spawn_sphere, FrameData, FrameEvent, SphereError, SphereEvent};
use geof_engine::{Registry, SphereConfig};

const WAIT: Duration = Duration::from_secs(30);

fn config(panels: u8) -> SphereConfig {
    SphereConfig { panel_count: Some(panels), ..SphereConfig::default() }
}

#[test]
fn zero_divisions_is_rejected() {
    let registry: Registry<u32> = Registry::new();
    let res = spawn_sphere(&registry, 0, |_| 0u32, SphereConfig::default(), None);
    assert!(matches!(res, Err(SphereError::InvalidDivisions(0))));
    assert!(registry.sphere_ids().is_empty());
}

#[test]
fn spheres_and_panels_are_registered_until_teardown() {
    let registry: Registry<u32> = Registry::new();
    let handle =
        spawn_sphere(&registry, 2, |_| 0u32, config(4), None).expect("sphere spawns");
    let id = handle.id();

    assert!(registry.sphere(id).is_some());
    assert!(registry.sphere_ids().contains(&id));
    for p in 0..4 {
        let panel = registry.panel(id, p).expect("panel registered");
        assert_eq!(panel.sphere(), id);
        assert_eq!(panel.panel_index(), p);
    }
    assert!(registry.panel(id, 4).is_none());

    let looked_up = registry.get(id).expect("lookup by id");
    assert_eq!(looked_up.id(), id);
    assert_eq!(looked_up.divisions(), 2);
    assert!(!looked_up.in_frame().expect("in_frame"));

    handle.teardown().expect("teardown");
    assert!(registry.sphere(id).is_none(), "sphere must be unregistered");
    assert!(registry.panel(id, 0).is_none(), "panels must be unregistered");
    assert!(matches!(registry.get(id), Err(SphereError::UnknownSphere(e)) if e == id));
    // Operations on a torn-down sphere fail with the unknown-sphere error.
    assert!(matches!(handle.in_frame(), Err(SphereError::UnknownSphere(_))));
    assert!(matches!(handle.get_all_field_data(), Err(SphereError::UnknownSphere(_))));
}

#[test]
fn sphere_ids_are_unique() {
    let registry: Registry<u32> = Registry::new();
    let a = spawn_sphere(&registry, 1, |_| 0u32, config(4), None).expect("first");
    let b = spawn_sphere(&registry, 1, |_| 0u32, config(4), None).expect("second");
    assert_ne!(a.id(), b.id());
    a.teardown().expect("teardown a");
    b.teardown().expect("teardown b");
}

#[test]
fn concurrent_registry_lookup() {
    let registry: Registry<u32> = Registry::new();
    let handle =
        spawn_sphere(&registry, 2, |_| 0u32, config(4), None).expect("sphere spawns");
    let id = handle.id();
    std::thread::scope(|scope| {
        for _ in 0..4 {
            let registry = registry.clone();
            scope.spawn(move || {
                for _ in 0..100 {
                    assert!(registry.sphere(id).is_some());
                    assert!(registry.panel(id, 0).is_some());
                }
            });
        }
    });
    handle.teardown().expect("teardown");
}

#[test]
fn inactivity_notifies_parent_and_sphere_resumes() {
    let registry: Registry<u32> = Registry::new();
    let (parent_tx, parent_rx) = channel();
    let cfg = SphereConfig {
        panel_count: Some(4),
        inactivity_timeout: Some(Duration::from_millis(50)),
        frame_timeout: None,
    };
    let handle =
        spawn_sphere(&registry, 2, |_| 7u32, cfg, Some(parent_tx)).expect("sphere spawns");

    let event = parent_rx.recv_timeout(WAIT).expect("inactivity event");
    assert_eq!(event, SphereEvent::Inactive(handle.id()));

    // Any operation resumes the sphere; state was retained.
    let data = handle.get_all_field_data().expect("snapshot after hibernation");
    assert!(data.values().all(|&v| v == 7));
    handle.teardown().expect("teardown");
}

#[test]
fn frame_timeout_is_fatal() {
    let registry: Registry<u32> = Registry::new();
    let cfg = SphereConfig {
        panel_count: Some(4),
        inactivity_timeout: None,
        frame_timeout: Some(Duration::from_millis(100)),
    };
    let handle = spawn_sphere(&registry, 2, |_| 0u32, cfg, None).expect("sphere spawns");
    let id = handle.id();

    let (gate_tx, gate_rx) = channel::<()>();
    let gate = Arc::new(Mutex::new(gate_rx));
    let stuck: Arc<PerFieldFn<u32, ()>> = Arc::new(move |idx, cur, _nbh, _| {
        if idx == FieldIndex::North {
            let _ = gate.lock().expect("gate lock").recv();
        }
        Ok(*cur)
    });
    let (reply_tx, reply_rx) = channel();
    handle.start_frame(stuck, FrameData::literal(()), reply_tx).expect("frame accepted");

    let event = reply_rx.recv_timeout(WAIT).expect("frame event");
    assert!(
        matches!(event, FrameEvent::FrameFailed(e, SphereError::FrameTimeout(t)) if e == id && t == id),
        "expected frame timeout, got {event:?}"
    );

    // Unblock the stuck worker so the sphere can finish tearing down,
    // then wait for the registration to disappear.
    drop(gate_tx);
    let deadline = Instant::now() + WAIT;
    while registry.sphere(id).is_some() {
        assert!(Instant::now() < deadline, "sphere never tore down after timeout");
        std::thread::sleep(Duration::from_millis(10));
    }
    assert!(matches!(handle.get_all_field_data(), Err(SphereError::UnknownSphere(_))));
}

#[test]
fn panel_count_follows_config_override() {
    let registry: Registry<u32> = Registry::new();
    for &panels in &[4u8, 8u8] {
        let handle =
            spawn_sphere(&registry, 2, |_| 0u32, config(panels), None).expect("sphere spawns");
        assert_eq!(handle.panel_count(), panels);
        handle.teardown().expect("teardown");
    }
}
