use knot_core::config::resolve_config_path;
use knot_core::model::object_id::{project_key, same_project};
use knot_core::model::relation::clamp_confidence;
use knot_core::{CanonicalObject, Relation, RelationSource, RelationType};
use proptest::prelude::*;
use std::path::{Path, PathBuf};

fn id_parts() -> impl Strategy<Value = (String, String, String)> {
    (
        "[a-z]{1,6}",
        "[a-zA-Z]{1,8}(-[a-zA-Z]{1,5}){0,2}",
        "[0-9]{1,5}",
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    // -----------------------------------------------------------------------
    // object ids
    // -----------------------------------------------------------------------

    #[test]
    fn project_key_is_the_lowercased_middle((platform, project, number) in id_parts()) {
        let id = format!("{platform}-{project}-{number}");
        prop_assert_eq!(project_key(&id), Some(project.to_lowercase()));
    }

    #[test]
    fn same_project_ignores_platform_and_number(
        (p1, project, n1) in id_parts(),
        p2 in "[a-z]{1,6}",
        n2 in "[0-9]{1,5}",
    ) {
        let a = format!("{p1}-{project}-{n1}");
        let b = format!("{p2}-{}-{n2}", project.to_uppercase());
        prop_assert!(same_project(&a, &b));
    }

    #[test]
    fn ids_without_a_middle_have_no_project(platform in "[a-z]{1,6}", number in "[0-9]{1,5}") {
        let id = format!("{platform}-{number}");
        prop_assert_eq!(project_key(&id), None);
    }

    // -----------------------------------------------------------------------
    // relations
    // -----------------------------------------------------------------------

    #[test]
    fn confidence_always_lands_in_unit_interval(raw in proptest::num::f64::ANY) {
        let c = clamp_confidence(raw);
        prop_assert!((0.0..=1.0).contains(&c));

        let rel = Relation::new("a", "b", RelationType::SimilarTo, RelationSource::Computed, raw);
        prop_assert!((0.0..=1.0).contains(&rel.confidence));
    }

    #[test]
    fn relation_type_parses_loosely(kind in prop::sample::select(RelationType::ALL.to_vec())) {
        let shouty = kind.as_str().to_uppercase().replace('_', "-");
        prop_assert_eq!(shouty.parse::<RelationType>(), Ok(kind));
    }

    #[test]
    fn relation_json_round_trips(
        kind in prop::sample::select(RelationType::ALL.to_vec()),
        confidence in 0.0f64..=1.0,
    ) {
        let rel = Relation::new("gh-web-1", "gh-web-2", kind, RelationSource::Inferred, confidence);
        let json = serde_json::to_string(&rel).expect("serialize");
        let back: Relation = serde_json::from_str(&json).expect("deserialize");
        prop_assert_eq!(back, rel);
    }

    // -----------------------------------------------------------------------
    // fingerprints
    // -----------------------------------------------------------------------

    #[test]
    fn fingerprint_ignores_case_and_spacing(words in prop::collection::vec("[a-zA-Z]{1,8}", 1..8)) {
        let mut a = CanonicalObject::new("a");
        a.title = words.join(" ");
        let mut b = CanonicalObject::new("b");
        b.title = format!("  {}\t", words.join("   ").to_uppercase());

        prop_assert_eq!(a.content_fingerprint(), b.content_fingerprint());
    }

    // -----------------------------------------------------------------------
    // config resolution
    // -----------------------------------------------------------------------

    #[test]
    fn explicit_config_path_always_wins(name in "[a-z]{1,10}\\.toml", env in proptest::option::of("[a-z]{1,10}")) {
        let explicit = PathBuf::from(&name);
        let resolved = resolve_config_path(
            Some(&explicit),
            env.as_deref(),
            Path::new("/nonexistent"),
            Some(PathBuf::from("/also/nonexistent")),
        );
        prop_assert_eq!(resolved, Some(explicit));
    }
}
