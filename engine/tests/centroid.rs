use geof_engine::adjacency::neighbor_flats;
use geof_engine::centroid::{centroid_of, centroids};
use geof_engine::field::{field_count, FieldIndex};

fn chord(a: geof_geo::Vec3, b: geof_geo::Vec3) -> f64 {
    a.sub(b).length()
}

#[test]
fn centroids_are_unit_length_and_complete() {
    for &d in &[1u32, 2, 3, 8] {
        let cents = centroids(d);
        assert_eq!(cents.len() as u32, field_count(d));
        for (flat, c) in cents.iter().enumerate() {
            assert!((c.length() - 1.0).abs() < 1e-12, "centroid {flat} not unit at d={d}");
        }
    }
}

#[test]
fn poles_sit_on_the_y_axis() {
    let cents = centroids(4);
    let north = cents[FieldIndex::North.to_flat(4) as usize];
    let south = cents[FieldIndex::South.to_flat(4) as usize];
    assert!((north.y - 1.0).abs() < 1e-12 && north.x.abs() < 1e-12 && north.z.abs() < 1e-12);
    assert!((south.y + 1.0).abs() < 1e-12 && south.x.abs() < 1e-12 && south.z.abs() < 1e-12);
}

#[test]
fn d1_centroids_are_icosahedron_vertices() {
    let cents = centroids(1);
    // 12 distinct unit vectors, pairwise separated by at least the
    // icosahedral edge chord (~1.0515) or exactly antipodal.
    for i in 0..12 {
        for j in (i + 1)..12 {
            let dist = chord(cents[i], cents[j]);
            assert!(dist > 1.0, "vertices {i},{j} too close: {dist}");
        }
    }
}

#[test]
fn adjacent_fields_are_nearer_than_non_adjacent() {
    for &d in &[2u32, 3, 4] {
        let cents = centroids(d);
        for idx in FieldIndex::iter(d) {
            let own = cents[idx.to_flat(d) as usize];
            let neighbours = neighbor_flats(idx, d);
            let max_adjacent = neighbours
                .iter()
                .map(|&f| chord(own, cents[f as usize]))
                .fold(0.0_f64, f64::max);
            let mut min_other = f64::INFINITY;
            for flat in 0..field_count(d) {
                if flat == idx.to_flat(d) || neighbours.contains(&flat) {
                    continue;
                }
                min_other = min_other.min(chord(own, cents[flat as usize]));
            }
            assert!(
                max_adjacent < min_other,
                "{idx:?} at d={d}: adjacent max {max_adjacent} vs non-adjacent min {min_other}"
            );
        }
    }
}

#[test]
fn single_field_centroid_matches_table() {
    for &d in &[1u32, 3] {
        let cents = centroids(d);
        for idx in FieldIndex::iter(d) {
            let one = centroid_of(idx, d);
            let all = cents[idx.to_flat(d) as usize];
            assert!(chord(one, all) < 1e-15, "{idx:?} differs at d={d}");
        }
    }
}
