use geof_engine::centroid::centroids;
use geof_engine::field::field_count;
use geof_engine::partition::{
    auto_panel_count, build_partition, validate_partition, PartitionError,
};

const DIVISION_SET: [u32; 5] = [1, 2, 3, 8, 16];

#[test]
fn panels_partition_all_fields() {
    for &d in &DIVISION_SET {
        let cents = centroids(d);
        for &panels in &[4u8, 8u8] {
            let part = build_partition(d, &cents, panels).expect("partition builds");
            assert_eq!(part.panel_count, panels);
            assert_eq!(part.panels.len(), usize::from(panels));
            validate_partition(d, &part).expect("partition is a disjoint cover");

            let total: usize = part.panels.iter().map(|p| p.fields.len()).sum();
            assert_eq!(total as u32, field_count(d), "cover size d={d} panels={panels}");
            for set in &part.panels {
                assert!(!set.fields.is_empty(), "panel {} empty at d={d}", set.panel);
            }
        }
    }
}

#[test]
fn partition_is_deterministic() {
    for &panels in &[4u8, 8u8] {
        let cents = centroids(8);
        let a = build_partition(8, &cents, panels).expect("first build");
        let b = build_partition(8, &cents, panels).expect("second build");
        assert_eq!(a, b, "same input must give the same partition");
    }
}

#[test]
fn owner_and_local_index_agree_with_panel_sets() {
    let d = 3;
    let cents = centroids(d);
    let part = build_partition(d, &cents, 8).expect("partition builds");
    for set in &part.panels {
        for (li, &flat) in set.fields.iter().enumerate() {
            assert_eq!(part.owner[flat as usize], set.panel);
            assert_eq!(part.local_index[flat as usize] as usize, li);
        }
    }
}

#[test]
fn panel_field_lists_are_sorted() {
    let d = 4;
    let cents = centroids(d);
    let part = build_partition(d, &cents, 4).expect("partition builds");
    for set in &part.panels {
        for w in set.fields.windows(2) {
            assert!(w[0] < w[1], "panel {} fields not ascending", set.panel);
        }
    }
}

#[test]
fn unsupported_panel_count_is_rejected() {
    let cents = centroids(2);
    let res = build_partition(2, &cents, 6);
    assert!(matches!(res, Err(PartitionError::BadPanelCount(6))));
}

#[test]
fn auto_panel_count_is_valid() {
    let n = auto_panel_count();
    assert!(n == 4 || n == 8);
}

#[test]
fn poles_are_assigned() {
    let d = 2;
    let cents = centroids(d);
    let part = build_partition(d, &cents, 8).expect("partition builds");
    // Flats 0 and 1 are the poles; owner is defined for both.
    assert!(usize::from(part.owner[0]) < 8);
    assert!(usize::from(part.owner[1]) < 8);
    let north_panel = &part.panels[usize::from(part.owner[0])];
    assert!(north_panel.fields.contains(&0));
}
