use std::collections::BTreeMap;

use super::{Config, Recommender};
use crate::error::RecError;
use crate::model::{NodeKind, PropertyValue};
use crate::profile::{ContextPreference, UserProfile};

fn str_prop(name: &str, value: &str) -> (String, PropertyValue) {
    (name.to_string(), PropertyValue::Str(value.to_string()))
}

fn tokens_prop(name: &str, value: &str) -> (String, PropertyValue) {
    (
        name.to_string(),
        PropertyValue::Tokens(value.split_whitespace().map(str::to_string).collect()),
    )
}

/// 3 users, 4 items, 6 ratings: user 1 rates 101, 102; user 2 rates 101,
/// 103; user 3 rates 102, 104.
fn engine() -> Recommender {
    let engine = Recommender::new(Config::default());
    for user in ["1", "2", "3"] {
        engine.create_user(user).expect("create user");
    }
    engine
        .add_user_interactions("1", &[("101", 5.0), ("102", 3.0)])
        .expect("ratings of user 1");
    engine
        .add_user_interactions("2", &[("101", 4.0), ("103", 5.0)])
        .expect("ratings of user 2");
    engine
        .add_user_interactions("3", &[("102", 2.0), ("104", 4.0)])
        .expect("ratings of user 3");
    for (item, name, category) in [
        ("101", "Toy Story", "Animation Children Comedy"),
        ("102", "Jumanji", "Adventure Children Fantasy"),
        ("103", "Grumpier Old Men", "Comedy Romance"),
        ("104", "Waiting to Exhale", "Comedy Drama Romance"),
    ] {
        engine
            .add_item_properties(
                item,
                BTreeMap::from([str_prop("name", name), tokens_prop("category", category)]),
            )
            .expect("item properties");
    }
    engine.refresh_baseline().expect("baseline");
    engine
}

fn comedy() -> BTreeMap<String, PropertyValue> {
    BTreeMap::from([str_prop("category", "Comedy")])
}

fn items(recs: &[super::ScoredItem]) -> Vec<&str> {
    recs.iter().map(|r| r.item.as_str()).collect()
}

#[test]
fn cf_surfaces_item_liked_by_most_similar_neighbor() {
    let engine = engine();
    // Users 2 and 3 both share one item with user 1 at equal similarity;
    // the user-id tie-break selects user 2, whose unseen item is 103.
    let recs = engine.recommend_cf("1", 1, 5).expect("cf recs");
    assert_eq!(items(&recs), vec!["103"]);
    // baseline 23/6 plus user 2's deviation on 103 (5.0 - 4.5).
    assert!((recs[0].score - (23.0 / 6.0 + 0.5)).abs() < 1e-9);
}

#[test]
fn cf_uses_all_neighbors_when_k_exceeds_candidates() {
    let engine = engine();
    let recs = engine.recommend_cf("1", 10, 10).expect("cf recs");
    // 104 via user 3 (deviation 4.0 - 3.0) outscores 103 via user 2.
    assert_eq!(items(&recs), vec!["104", "103"]);
}

#[test]
fn cf_is_empty_for_users_without_history() {
    let engine = engine();
    engine.create_user("4").expect("create user 4");
    let recs = engine.recommend_cf("4", 3, 5).expect("cf recs");
    assert!(recs.is_empty());
}

#[test]
fn cf_tolerates_non_positive_limits() {
    let engine = engine();
    assert!(engine.recommend_cf("1", 0, 5).expect("k=0").is_empty());
    assert!(engine.recommend_cf("1", 3, 0).expect("top_n=0").is_empty());
}

#[test]
fn cf_rejects_unknown_users() {
    let engine = engine();
    assert!(matches!(
        engine.recommend_cf("9", 1, 5),
        Err(RecError::NotFound("user"))
    ));
}

#[test]
fn cf_never_returns_rated_items() {
    let engine = engine();
    for user in ["1", "2", "3"] {
        let rated = engine.get_items_by_user(user).expect("rated items");
        for rec in engine.recommend_cf(user, 2, 10).expect("cf recs") {
            assert!(!rated.contains(&rec.item), "{user} already rated {}", rec.item);
        }
    }
}

#[test]
fn contextual_ranks_unseen_matching_items() {
    let engine = engine();
    // User 3 rated 102 and 104: 104 is a Comedy but excluded as seen, 102
    // matches nothing, leaving 101 and 103 tied and ordered by id.
    let recs = engine
        .recommend_contextual("3", &comedy(), None, 5)
        .expect("contextual recs");
    assert_eq!(items(&recs), vec!["101", "103"]);
    assert!(recs.iter().all(|r| r.score > 0.0));
}

#[test]
fn contextual_applies_profile_weights() {
    let engine = engine();

    let mut profile = UserProfile::new("3");
    profile
        .add_context_def("category", ContextPreference::Num(2.0))
        .expect("numeric weight");
    let recs = engine
        .recommend_contextual("3", &comedy(), Some(&profile), 5)
        .expect("weighted recs");
    assert_eq!(items(&recs), vec!["101", "103"]);
    assert!(recs.iter().all(|r| (r.score - 2.0).abs() < 1e-12));

    let mut veto = UserProfile::new("3");
    veto.add_context_def(
        "category",
        ContextPreference::Dict(BTreeMap::from([("Comedy".to_string(), false)])),
    )
    .expect("dict veto");
    let recs = engine
        .recommend_contextual("3", &comedy(), Some(&veto), 5)
        .expect("vetoed recs");
    assert!(recs.is_empty(), "a zero weight zeroes the match score");
}

#[test]
fn contextual_tolerates_non_positive_limits() {
    let engine = engine();
    assert!(engine
        .recommend_contextual("3", &comedy(), None, 0)
        .expect("top_n=0")
        .is_empty());
}

#[test]
fn hybrid_prefers_items_backed_by_both_signals() {
    let engine = engine();
    // CF for user 1 with k=1 yields only 103; contextually 103 and 104 are
    // unseen Comedies. 103 carries both signals and must lead.
    let recs = engine
        .recommend_hybrid("1", &comedy(), None, 1, 5)
        .expect("hybrid recs");
    assert_eq!(items(&recs), vec!["103", "104"]);
    assert!(recs[0].score > recs[1].score);
}

#[test]
fn hybrid_tolerates_non_positive_limits() {
    let engine = engine();
    assert!(engine
        .recommend_hybrid("1", &comedy(), None, 0, 5)
        .expect("k=0")
        .is_empty());
    assert!(engine
        .recommend_hybrid("1", &comedy(), None, 1, 0)
        .expect("top_n=0")
        .is_empty());
}

#[test]
fn hybrid_rank_never_worsens_when_contextual_match_grows() {
    let engine = engine();
    engine.create_user("5").expect("fresh user");

    // With no history the collaborative side is silent for user 5, so the
    // fused ranking follows the contextual signal alone.
    let narrow = engine
        .recommend_hybrid(
            "5",
            &BTreeMap::from([tokens_prop("category", "Comedy")]),
            None,
            1,
            5,
        )
        .expect("single-token constraints");
    let rank_before = items(&narrow)
        .iter()
        .position(|i| *i == "104")
        .expect("104 is a candidate");

    let wide = engine
        .recommend_hybrid(
            "5",
            &BTreeMap::from([tokens_prop("category", "Comedy Drama")]),
            None,
            1,
            5,
        )
        .expect("wider constraints raise only 104's match score");
    let rank_after = items(&wide)
        .iter()
        .position(|i| *i == "104")
        .expect("104 remains a candidate");

    assert!(
        rank_after <= rank_before,
        "contextual gain must not demote the item: {rank_before} -> {rank_after}"
    );
}

#[test]
fn explain_traces_shared_category_evidence() {
    let engine = engine();
    let explanations = engine
        .explain_blackbox_recs("3", "101", &["category"], 0.0)
        .expect("explanations");
    // User 1 rated 101 and shares item 102 with user 3; items 101 and 102
    // both carry the Children category token.
    assert_eq!(explanations.len(), 1);
    assert_eq!(
        explanations[0],
        "You liked Jumanji, and users who rated Toy Story highly also liked items \
         with similar category: Children"
    );
}

#[test]
fn explain_without_evidence_is_empty_not_an_error() {
    let engine = engine();
    let explanations = engine
        .explain_blackbox_recs("3", "101", &["category"], 6.0)
        .expect("no peer rated 101 that highly");
    assert!(explanations.is_empty());
}

#[test]
fn explain_rejects_unknown_identifiers() {
    let engine = engine();
    assert!(matches!(
        engine.explain_blackbox_recs("9", "101", &["category"], 0.0),
        Err(RecError::NotFound("user"))
    ));
    assert!(matches!(
        engine.explain_blackbox_recs("3", "999", &["category"], 0.0),
        Err(RecError::NotFound("item"))
    ));
}

#[test]
fn baseline_is_fixed_until_refreshed() {
    let engine = engine();
    let loaded = engine.global_baseline().expect("baseline");
    assert!((loaded - 23.0 / 6.0).abs() < 1e-12);

    engine
        .add_user_interactions("1", &[("104", 4.5)])
        .expect("late interaction");
    assert!((engine.global_baseline().expect("baseline") - loaded).abs() < 1e-12);

    let refreshed = engine.refresh_baseline().expect("refresh");
    assert!((refreshed - 27.5 / 7.0).abs() < 1e-12);
}

#[test]
fn unique_feat_values_tokenize_categories() {
    let engine = engine();
    let values = engine
        .get_unique_feat_values(NodeKind::Item, "category")
        .expect("category values");
    let expected = [
        "Adventure",
        "Animation",
        "Children",
        "Comedy",
        "Drama",
        "Fantasy",
        "Romance",
    ];
    assert_eq!(
        values,
        expected
            .iter()
            .map(|t| PropertyValue::Str((*t).to_string()))
            .collect::<Vec<_>>()
    );
}

mod properties {
    use proptest::prelude::*;

    use super::*;

    fn seeded_engine(ratings: &[(u8, u8, u8)]) -> Recommender {
        let engine = Recommender::new(Config::default());
        for (user, item, rating) in ratings {
            let user = format!("u{user}");
            engine.create_user(&user).expect("create user");
            let item = format!("i{item}");
            engine
                .add_user_interactions(&user, &[(item.as_str(), f64::from(*rating) / 2.0)])
                .expect("add rating");
        }
        for item_id in 0u8..8 {
            let item = format!("i{item_id}");
            let category = if item_id % 2 == 0 { "Comedy" } else { "Drama Romance" };
            // Only items someone rated exist; ignore the rest.
            let _ = engine.add_item_properties(
                &item,
                std::collections::BTreeMap::from([super::tokens_prop("category", category)]),
            );
        }
        engine.refresh_baseline().expect("baseline");
        engine
    }

    proptest! {
        #[test]
        fn cf_excludes_rated_items(
            ratings in proptest::collection::vec((0u8..5, 0u8..8, 1u8..=10), 1..40)
        ) {
            let engine = seeded_engine(&ratings);
            for user in 0u8..5 {
                let user = format!("u{user}");
                let Ok(rated) = engine.get_items_by_user(&user) else { continue };
                for rec in engine.recommend_cf(&user, 3, 10).expect("cf recs") {
                    prop_assert!(!rated.contains(&rec.item));
                }
            }
        }

        #[test]
        fn contextual_only_returns_positive_matches(
            ratings in proptest::collection::vec((0u8..5, 0u8..8, 1u8..=10), 1..40)
        ) {
            let engine = seeded_engine(&ratings);
            let constraints = std::collections::BTreeMap::from([super::str_prop(
                "category", "Comedy",
            )]);
            for user in 0u8..5 {
                let user = format!("u{user}");
                let Ok(rated) = engine.get_items_by_user(&user) else { continue };
                for rec in engine
                    .recommend_contextual(&user, &constraints, None, 10)
                    .expect("contextual recs")
                {
                    prop_assert!(rec.score > 0.0);
                    prop_assert!(!rated.contains(&rec.item));
                }
            }
        }
    }
}
