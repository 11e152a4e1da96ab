//! Integration tests: config + dataset + permissions driving a full search.

use futures_util::StreamExt;
use site_search::permissions::PermissionStore;
use site_search::store::Dataset;
use site_search::{Permission, Site, SiteSearchConfig, SiteSearchError, User, UserDef};

const DATASET: &str = r#"{
  "tables": [
    {
      "name": "Person",
      "plural": "people",
      "link": "/people/{id}/",
      "records": [
        {"id": 1, "name": "Alice Smith", "email": "alice@example.com", "status": "active"},
        {"id": 2, "name": "Alice Jones", "email": "ajones@example.com", "status": "active"},
        {"id": 3, "name": "Alice Archer", "email": "archer@example.com", "status": "archived"},
        {"id": 4, "name": "Bob Stone", "email": "bob@alice.example", "status": "active"}
      ]
    },
    {
      "name": "Event",
      "plural": "events",
      "display_field": "title",
      "records": [
        {"id": "e1", "title": "Alice's birthday", "year": 2024},
        {"id": "e2", "title": "Board meeting", "year": 2023}
      ]
    },
    {
      "name": "Venue",
      "plural": "venues",
      "records": [
        {"id": 10, "name": "Town Hall"}
      ]
    }
  ]
}"#;

const CONFIG: &str = r#"
[search]
dedup = "first_occurrence"

[permissions]
global_permission = "site_search"

[[indices]]
record_type = "Person"
field = "name__icontains"
relevance = 0.75
exclude = { status = "archived" }

[[indices]]
record_type = "Person"
field = "email__icontains"
relevance = 0.5
max_results = 2

[[indices]]
record_type = "Person"
field = "id"
precondition = '^\d+$'
term_transform = "integer"
relevance = 1.0
max_results = 1

[[indices]]
record_type = "Event"
field = "title__icontains"
order_by = "-year"

[[indices]]
record_type = "Venue"
field = "name__istartswith"
precondition = ".{3,}"
"#;

fn site() -> Site {
    let config: SiteSearchConfig = toml::from_str(CONFIG).expect("parse config");
    let dataset = Dataset::from_json(DATASET).expect("parse dataset");
    Site::new(dataset, &config).expect("build site")
}

fn perm(name: &str) -> Permission {
    name.parse().expect("valid permission")
}

fn summary(results: &[site_search_core::TypeResult]) -> Vec<(String, Vec<String>)> {
    results
        .iter()
        .map(|r| {
            (
                r.type_label.clone(),
                r.records.iter().map(|rec| rec.text.clone()).collect(),
            )
        })
        .collect()
}

#[tokio::test]
async fn superuser_sees_every_record_type_in_name_order() {
    let site = site();
    let results = site
        .search_all(&User::superuser("root"), "alice")
        .await
        .expect("search");

    assert_eq!(
        summary(&results),
        vec![
            ("events".to_owned(), vec!["Alice's birthday".to_owned()]),
            (
                "people".to_owned(),
                vec!["Alice Smith".to_owned(), "Alice Jones".to_owned()]
            ),
        ]
    );
    let people = &results[1];
    assert!((people.relevance - 0.75).abs() < f64::EPSILON);
    assert_eq!(people.records[0].url.as_deref(), Some("/people/1/"));
}

#[tokio::test]
async fn archived_records_are_excluded_by_the_name_index_only() {
    let site = site();
    let root = User::superuser("root");

    let by_name = site.search_all(&root, "archer").await.expect("search");
    // The email index has no exclusion, so the archived record still surfaces.
    assert_eq!(
        summary(&by_name),
        vec![("people".to_owned(), vec!["Alice Archer".to_owned()])]
    );
    assert!((by_name[0].relevance - 0.5).abs() < f64::EPSILON);
}

#[tokio::test]
async fn numeric_term_hits_the_id_index_first() {
    let site = site();
    let results = site
        .search_all(&User::superuser("root"), "4")
        .await
        .expect("search");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].records[0].text, "Bob Stone");
    assert!((results[0].relevance - 1.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn user_without_permissions_sees_nothing() {
    let site = site();
    for term in ["alice", "4", "town"] {
        let results = site
            .search_all(&User::new("guest"), term)
            .await
            .expect("search");
        assert!(results.is_empty(), "term {term:?} leaked results");
    }
}

#[tokio::test]
async fn per_type_permission_limits_results() {
    let site = site();
    let user = User::new("planner");
    user.grant(perm("search.event"));

    let results = site.search_all(&user, "alice").await.expect("search");
    assert_eq!(
        summary(&results),
        vec![("events".to_owned(), vec!["Alice's birthday".to_owned()])]
    );
}

#[tokio::test]
async fn global_permission_from_shared_store() {
    let site = site();
    let mut store = PermissionStore::default();
    store.grant(perm("site_search"));
    let user = User::new("editor").with_permissions(store.into_shared());

    let results = site.search_all(&user, "town").await.expect("search");
    assert_eq!(
        summary(&results),
        vec![("venues".to_owned(), vec!["Town Hall".to_owned()])]
    );
}

#[tokio::test]
async fn denied_type_stays_hidden_from_configured_user() {
    let mut config: SiteSearchConfig = toml::from_str(CONFIG).expect("parse config");
    config.users.push(UserDef {
        name: "editor".into(),
        superuser: false,
        grants: vec![perm("site_search")],
        denies: vec![perm("search.person")],
    });
    let site = Site::new(Dataset::from_json(DATASET).expect("parse dataset"), &config)
        .expect("build site");

    let editor = config.user("editor");
    let results = site.search_all(&editor, "alice").await.expect("search");
    assert_eq!(
        summary(&results),
        vec![("events".to_owned(), vec!["Alice's birthday".to_owned()])]
    );
}

#[tokio::test]
async fn short_terms_skip_guarded_indices() {
    let site = site();
    let results = site
        .search_all(&User::superuser("root"), "to")
        .await
        .expect("search");
    // The venue index needs three characters; "to" still matches an email.
    assert!(results.iter().all(|r| r.type_label != "venues"));
}

#[tokio::test]
async fn empty_term_yields_nothing() {
    let site = site();
    let results = site
        .search_all(&User::superuser("root"), "")
        .await
        .expect("search");
    assert!(results.is_empty());
}

#[tokio::test]
async fn stream_can_stop_after_first_result() {
    let site = site();
    let root = User::superuser("root");
    let first: Vec<_> = site.search(&root, "alice").take(1).collect().await;
    assert_eq!(first.len(), 1);
    let first = first.into_iter().next().expect("one item").expect("ok");
    assert_eq!(first.type_label, "events");
}

#[test]
fn config_file_round_trip_builds_same_site() {
    let dir = tempfile::tempdir().expect("tempdir");
    let dataset_path = dir.path().join("data.json");
    std::fs::write(&dataset_path, DATASET).expect("write dataset");

    let mut config: SiteSearchConfig = toml::from_str(CONFIG).expect("parse config");
    config.dataset = Some(dataset_path);
    let config_path = dir.path().join("config.toml");
    config.save_to_file(&config_path).expect("save");

    let loaded = SiteSearchConfig::from_file(&config_path).expect("load");
    assert_eq!(loaded.indices, config.indices);

    let site = Site::from_config(&loaded).expect("site");
    assert_eq!(site.registry().len(), 5);
    assert_eq!(site.dataset().tables().count(), 3);
}

#[test]
fn index_on_unknown_table_is_a_config_error() {
    let config: SiteSearchConfig = toml::from_str(
        r#"
        [[indices]]
        record_type = "Invoice"
        field = "number"
        "#,
    )
    .expect("parse config");
    let dataset = Dataset::from_json(DATASET).expect("parse dataset");
    let err = Site::new(dataset, &config).unwrap_err();
    assert!(matches!(err, SiteSearchError::Config(_)));
}

#[test]
fn bundled_demo_config_loads() {
    let root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
    let mut config =
        SiteSearchConfig::from_file(&root.join("demos/config.toml")).expect("load demo config");
    config.dataset = config.dataset.map(|path| root.join(path));

    let site = Site::from_config(&config).expect("demo site");
    assert_eq!(site.registry().len(), 5);
    assert_eq!(site.registry().grouped().len(), 3);
    assert_eq!(config.users.len(), 1);
}
