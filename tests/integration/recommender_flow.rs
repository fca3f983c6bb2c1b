#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use recograph::{
    Config, ContextPreference, NodeKind, PropertyValue, RecError, Recommender, Result,
    UserProfile,
};
use tempfile::tempdir;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn write_catalog(dir: &Path) {
    fs::write(
        dir.join("test_rec.user"),
        "user_id:token\tage:int\n\
         1\t25\n\
         2\t30\n\
         3\t35\n",
    )
    .expect("write user file");
    fs::write(
        dir.join("test_rec.item"),
        "item_id:token\tname:string\tcategory:string_seq\n\
         101\tToy Story\tAnimation Children Comedy\n\
         102\tJumanji\tAdventure Children Fantasy\n\
         103\tGrumpier Old Men\tComedy Romance\n\
         104\tWaiting to Exhale\tComedy Drama Romance\n",
    )
    .expect("write item file");
    fs::write(
        dir.join("test_rec.inter"),
        "user_id:token\titem_id:token\trating:float\n\
         1\t101\t5.0\n\
         1\t102\t3.0\n\
         2\t101\t4.0\n\
         2\t103\t5.0\n\
         3\t102\t2.0\n\
         3\t104\t4.0\n",
    )
    .expect("write inter file");
}

fn comedy() -> BTreeMap<String, PropertyValue> {
    BTreeMap::from([(
        "category".to_string(),
        PropertyValue::Str("Comedy".to_string()),
    )])
}

#[test]
fn full_recommendation_flow() -> Result<()> {
    init_tracing();
    let dir = tempdir()?;
    write_catalog(dir.path());

    let engine = Recommender::from_dataset("test_rec", dir.path(), Config::default())?;

    // Seeded graph shape.
    let users = engine.get_users_by_item("101")?;
    assert_eq!(users.into_iter().collect::<Vec<_>>(), vec!["1", "2"]);
    let items = engine.get_items_by_user("2")?;
    assert_eq!(items.into_iter().collect::<Vec<_>>(), vec!["101", "103"]);
    assert!((engine.global_baseline()? - 23.0 / 6.0).abs() < 1e-12);

    // User management.
    assert_eq!(engine.create_user("4")?, "4");
    engine.add_user_properties(
        "1",
        BTreeMap::from([(
            "country".to_string(),
            PropertyValue::Str("USA".to_string()),
        )]),
    )?;

    // Distinct attribute values: categories tokenized, ages untouched.
    let categories = engine.get_unique_feat_values(NodeKind::Item, "category")?;
    for token in ["Animation", "Children", "Comedy", "Adventure", "Fantasy", "Romance", "Drama"] {
        assert!(
            categories.contains(&PropertyValue::Str(token.to_string())),
            "missing category token {token}"
        );
    }
    let ages = engine.get_unique_feat_values(NodeKind::User, "age")?;
    assert_eq!(
        ages,
        vec![
            PropertyValue::Int(25),
            PropertyValue::Int(30),
            PropertyValue::Int(35),
        ]
    );

    // Late interaction: 104 joins user 1's history.
    let before = engine.get_items_by_user("1")?;
    assert!(!before.contains("104"));
    engine.add_user_interactions("1", &[("104", 4.5)])?;
    assert!(engine.get_items_by_user("1")?.contains("104"));

    // User 3 has not seen the Comedy item 101.
    let recs = engine.recommend_contextual("3", &comedy(), None, 5)?;
    assert!(recs.iter().any(|r| r.item == "101"), "101 is an unseen Comedy");

    // Users 1 and 2 both rated 101; user 2 liked 103, unseen by user 1.
    let recs = engine.recommend_cf("1", 1, 5)?;
    assert!(recs.iter().any(|r| r.item == "103"), "cf must surface 103");

    // 103 carries both collaborative and contextual signal for user 1.
    let recs = engine.recommend_hybrid("1", &comedy(), None, 1, 5)?;
    assert!(recs.iter().any(|r| r.item == "103"));

    // Profile weighting scales contextual scores proportionally.
    let mut profile = UserProfile::new("3");
    profile
        .add_context_def("category", ContextPreference::Num(2.0))
        .expect("weight category");
    let weighted = engine.recommend_contextual("3", &comedy(), Some(&profile), 5)?;
    assert!(weighted.iter().all(|r| (r.score - 2.0).abs() < 1e-12));

    // Peer evidence for recommending 101 to user 3.
    let explanations = engine.explain_blackbox_recs("3", "101", &["category"], 0.0)?;
    assert!(!explanations.is_empty());
    let joined = explanations.join(" ");
    assert!(joined.contains("You liked"));
    assert!(joined.contains("similar category"));

    // The baseline stays at its load-time value until explicitly refreshed.
    assert!((engine.global_baseline()? - 23.0 / 6.0).abs() < 1e-12);
    assert!((engine.refresh_baseline()? - 27.5 / 7.0).abs() < 1e-12);

    Ok(())
}

#[test]
fn empty_results_and_typed_errors() -> Result<()> {
    init_tracing();
    let dir = tempdir()?;
    write_catalog(dir.path());

    let engine = Recommender::from_dataset("test_rec", dir.path(), Config::default())?;

    // Unknown identifiers are typed errors.
    assert!(matches!(
        engine.recommend_cf("9", 1, 5),
        Err(RecError::NotFound("user"))
    ));
    assert!(matches!(
        engine.explain_blackbox_recs("1", "999", &["category"], 0.0),
        Err(RecError::NotFound("item"))
    ));

    // Non-positive limits and absent evidence are empty results, not errors.
    assert!(engine.recommend_cf("1", 0, 5)?.is_empty());
    assert!(engine.recommend_cf("1", 1, 0)?.is_empty());
    assert!(engine.recommend_contextual("1", &comedy(), None, 0)?.is_empty());
    assert!(engine.recommend_hybrid("1", &comedy(), None, 0, 5)?.is_empty());
    assert!(engine
        .explain_blackbox_recs("3", "101", &["category"], 6.0)?
        .is_empty());

    // A freshly created user has no history and therefore no CF signal.
    engine.create_user("5")?;
    assert!(engine.recommend_cf("5", 3, 5)?.is_empty());

    Ok(())
}
