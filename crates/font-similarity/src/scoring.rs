use ordered_float::OrderedFloat;
use font_core::{FeatureVector, FontRecord, FEATURE_WEIGHTS};
use font_normalizer::normalize_name;

/// Decay rate of [`similarity_score`] per unit of distance
const SIMILARITY_DECAY: f32 = 1.2;

/// Weighted Euclidean distance between two feature vectors
pub fn distance(a: &FeatureVector, b: &FeatureVector) -> f32 {
    a.values()
        .iter()
        .zip(b.values())
        .zip(FEATURE_WEIGHTS.iter())
        .map(|((x, y), w)| w * (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

/// `100 * exp(-1.2 * d)` without rounding; strictly decreasing in `d`.
pub fn similarity_score(distance: f32) -> f32 {
    100.0 * (-SIMILARITY_DECAY * distance.max(0.0)).exp()
}

/// Percentage similarity for display, 0 to 100.
pub fn similarity(distance: f32) -> u8 {
    similarity_score(distance).round().clamp(0.0, 100.0) as u8
}

/// A catalog record together with its distance to the query
#[derive(Debug, Clone, Copy)]
pub struct Neighbor<'a> {
    pub record: &'a FontRecord,
    pub distance: f32,
}

/// The `k` records closest to `query`, nearest first.
///
/// Equal distances keep catalog order. Records whose normalized family equals
/// the normalized `exclude` name are skipped.
pub fn nearest_neighbors<'a>(
    records: &'a [FontRecord],
    query: &FeatureVector,
    k: usize,
    exclude: Option<&str>,
) -> Vec<Neighbor<'a>> {
    let excluded = exclude.map(normalize_name).filter(|name| !name.is_empty());

    let mut neighbors: Vec<Neighbor<'a>> = records
        .iter()
        .filter(|record| match &excluded {
            Some(name) => normalize_name(&record.family) != *name,
            None => true,
        })
        .map(|record| Neighbor { record, distance: distance(query, &record.features) })
        .collect();

    neighbors.sort_by_key(|n| OrderedFloat(n.distance));
    neighbors.truncate(k);
    neighbors
}

#[cfg(test)]
mod tests {
    use super::*;
    use font_core::{FeatureDimension, FontCategory, FEATURE_COUNT};
    use proptest::prelude::*;

    fn vector(values: [f32; FEATURE_COUNT]) -> FeatureVector {
        FeatureVector::new(values)
    }

    fn record(family: &str, values: [f32; FEATURE_COUNT]) -> FontRecord {
        FontRecord {
            family: family.to_string(),
            category: FontCategory::SansSerif,
            features: vector(values),
        }
    }

    fn arb_vector() -> impl Strategy<Value = FeatureVector> {
        prop::array::uniform15(0.0f32..1.0).prop_map(FeatureVector::new)
    }

    #[test]
    fn test_similarity_endpoints() {
        assert_eq!(similarity(0.0), 100);
        assert_eq!(similarity(1.0), 30);
        assert_eq!(similarity(50.0), 0);
    }

    #[test]
    fn test_monospace_mismatch_dominates() {
        let base = [0.0; FEATURE_COUNT];
        let mut mono = base;
        mono[FeatureDimension::Monospace.index()] = 1.0;
        let mono_distance = distance(&vector(base), &vector(mono));
        assert!((mono_distance - 3.0f32.sqrt()).abs() < 1e-6);

        for dim in FeatureDimension::ALL {
            if dim == FeatureDimension::Monospace {
                continue;
            }
            let (_, max) = dim.range();
            let mut other = base;
            other[dim.index()] = max;
            let d = distance(&vector(base), &vector(other));
            assert!(d < mono_distance, "{} mismatch {} >= monospace {}", dim, d, mono_distance);
        }
    }

    #[test]
    fn test_nearest_neighbors_order_and_exclusion() {
        let mut near = [0.5; FEATURE_COUNT];
        near[0] = 0.45;
        let records = vec![
            record("Far Away", [1.0; FEATURE_COUNT]),
            record("Open Sans", [0.5; FEATURE_COUNT]),
            record("Near", near),
            record("Tied", near),
        ];
        let query = vector([0.5; FEATURE_COUNT]);

        let all = nearest_neighbors(&records, &query, 10, None);
        let names: Vec<&str> = all.iter().map(|n| n.record.family.as_str()).collect();
        assert_eq!(names, vec!["Open Sans", "Near", "Tied", "Far Away"]);

        let excluded = nearest_neighbors(&records, &query, 2, Some("open-SANS"));
        let names: Vec<&str> = excluded.iter().map(|n| n.record.family.as_str()).collect();
        assert_eq!(names, vec!["Near", "Tied"]);

        assert!(nearest_neighbors(&records, &query, 0, None).is_empty());
        assert!(nearest_neighbors(&[], &query, 5, None).is_empty());
    }

    proptest! {
        #[test]
        fn prop_distance_is_a_symmetric_zero_on_diagonal(a in arb_vector(), b in arb_vector()) {
            prop_assert_eq!(distance(&a, &a), 0.0);
            prop_assert_eq!(distance(&a, &b), distance(&b, &a));
            prop_assert!(distance(&a, &b) >= 0.0);
        }

        #[test]
        fn prop_similarity_strictly_decreasing(d in 0.0f32..6.0, delta in 0.01f32..4.0) {
            prop_assert!(similarity_score(d) > similarity_score(d + delta));
            prop_assert!(similarity(d) >= similarity(d + delta));
        }

        #[test]
        fn prop_neighbors_sorted_and_never_excluded(
            vectors in prop::collection::vec(arb_vector(), 1..20),
            query in arb_vector(),
            k in 1usize..8,
            excluded in 0usize..20,
        ) {
            let records: Vec<FontRecord> = vectors
                .into_iter()
                .enumerate()
                .map(|(i, features)| FontRecord {
                    family: format!("Family {}", i % 5),
                    category: FontCategory::Serif,
                    features,
                })
                .collect();
            let exclude = format!("family-{}", excluded % 5);

            let neighbors = nearest_neighbors(&records, &query, k, Some(&exclude));
            prop_assert!(neighbors.len() <= k);
            for pair in neighbors.windows(2) {
                prop_assert!(pair[0].distance <= pair[1].distance);
            }
            for n in &neighbors {
                prop_assert_ne!(normalize_name(&n.record.family), normalize_name(&exclude));
            }
        }
    }
}
