use std::sync::mpsc::channel;
use std::time::Duration;

use geof_engine::functions::{FunctionTable, ResolveError};
use geof_engine::sphere::{spawn_sphere, FrameData, FrameEvent};
use geof_engine::{Registry, SphereConfig};

#[test]
fn unknown_reference_is_an_explicit_error() {
    let table: FunctionTable<u32> = FunctionTable::new();
    let err = match table.resolve_per_field("life", "step") {
        Err(e) => e,
        Ok(_) => panic!("must not resolve"),
    };
    assert_eq!(
        err,
        ResolveError::UnknownFunctionRef { module: "life".into(), function: "step".into() }
    );
    assert_eq!(err.to_string(), "unknown function reference life.step");

    let err = match table.resolve_sphere_data("life", "seed") {
        Err(e) => e,
        Ok(_) => panic!("must not resolve"),
    };
    assert!(matches!(err, ResolveError::UnknownFunctionRef { .. }));
}

#[test]
fn registered_functions_resolve_and_run() {
    let mut table: FunctionTable<u32, u32> = FunctionTable::new();
    table.register_per_field("life", "step", |_idx, cur, _nbh, offset| Ok(cur + offset));
    table.register_sphere_data("life", "seed", || 10u32);

    let func = table.resolve_per_field("life", "step").expect("per-field resolves");
    let data = table.resolve_sphere_data("life", "seed").expect("sphere-data resolves");
    assert_eq!(data(), 10);

    let registry: Registry<u32, u32> = Registry::new();
    let cfg = SphereConfig { panel_count: Some(4), ..SphereConfig::default() };
    let handle = spawn_sphere(&registry, 2, |_| 1u32, cfg, None).expect("sphere spawns");
    let (reply_tx, reply_rx) = channel();
    handle
        .start_frame(func, FrameData::Compute(data), reply_tx)
        .expect("frame accepted");
    let event = reply_rx.recv_timeout(Duration::from_secs(30)).expect("frame event");
    assert!(matches!(event, FrameEvent::FrameComplete(_)));
    let after = handle.get_all_field_data().expect("snapshot");
    assert!(after.values().all(|&v| v == 11));
    handle.teardown().expect("teardown");
}

#[test]
fn re_registration_replaces_the_previous_function() {
    let mut table: FunctionTable<u32> = FunctionTable::new();
    table.register_per_field("m", "f", |_idx, _cur, _nbh, _| Ok(1));
    table.register_per_field("m", "f", |_idx, _cur, _nbh, _| Ok(2));
    let f = table.resolve_per_field("m", "f").expect("resolves");
    let nbh = dummy_neighborhood();
    let out = f(geof_engine::FieldIndex::North, &0, &nbh, &()).expect("runs");
    assert_eq!(out, 2);
}

fn dummy_neighborhood() -> geof_engine::panel::Neighborhood<'static, u32> {
    static ZERO: u32 = 0;
    geof_engine::panel::Neighborhood {
        nw: &ZERO,
        w: &ZERO,
        sw: &ZERO,
        se: &ZERO,
        e: &ZERO,
        ne: None,
    }
}
