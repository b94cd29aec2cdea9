use checklist_core::db::open_db_in_memory;
use checklist_core::{
    Checklist, ChecklistStore, ImportError, SqliteCollectionRepository, StoreError,
    SubmittedForm, SubmittedItem, SubmittedSection,
};
use rusqlite::Connection;
use serde_json::json;
use std::collections::HashSet;

fn open_store(conn: &Connection) -> ChecklistStore<SqliteCollectionRepository<'_>> {
    let repo = SqliteCollectionRepository::try_new(conn).unwrap();
    ChecklistStore::open(repo).unwrap()
}

fn seed_store(store: &mut ChecklistStore<SqliteCollectionRepository<'_>>) {
    let a320 = store
        .create(
            &SubmittedForm::new("A320 normal", Some("A320"))
                .section(SubmittedSection::new(
                    "Preflight",
                    vec![
                        SubmittedItem::new("BATT 1+2", "ON"),
                        SubmittedItem::new("EXT PWR", "ON").with_comment("if available"),
                    ],
                ))
                .section(SubmittedSection::new(
                    "Before Start",
                    vec![SubmittedItem::new("BEACON", "ON")],
                )),
        )
        .unwrap();
    let section = &a320.sections[0];
    store
        .toggle_item(a320.id, section.id, section.items[1].id)
        .unwrap();

    store
        .create(
            &SubmittedForm::new("Walkaround", None).section(SubmittedSection::new(
                "Exterior",
                vec![SubmittedItem {
                    name: "Pitot covers".to_string(),
                    action: None,
                    comment: Some("count them".to_string()),
                }],
            )),
        )
        .unwrap();
}

fn two_record_payload() -> serde_json::Value {
    json!([
        {
            "id": 1,
            "title": "C172 runup",
            "aircraft": "C172",
            "sections": [
                {"id": 2, "name": "Runup", "items": [
                    {"id": 3, "name": "Mags", "action": "CHECK", "completed": false},
                    {"id": 4, "name": "Carb heat", "action": "CHECK", "completed": true}
                ]}
            ],
            "createdAt": "2024-01-02T03:04:05Z"
        },
        {
            "id": 1,
            "title": "C172 shutdown",
            "aircraft": "C172",
            "checklists": [
                {"id": 2, "name": "Shutdown", "items": [
                    {"id": 3, "name": "Mixture", "action": "IDLE CUTOFF"}
                ]}
            ]
        }
    ])
}

fn all_identifiers(checklists: &[Checklist]) -> Vec<u64> {
    checklists.iter().flat_map(Checklist::identifiers).collect()
}

/// Content of a checklist with identifiers and timestamps stripped.
fn content(checklist: &Checklist) -> serde_json::Value {
    json!({
        "title": checklist.title,
        "aircraft": checklist.aircraft,
        "sections": checklist.sections.iter().map(|section| json!({
            "name": section.name,
            "items": section.items.iter().map(|item| json!({
                "name": item.name,
                "action": item.action,
                "comment": item.comment,
                "completed": item.completed,
            })).collect::<Vec<_>>(),
        })).collect::<Vec<_>>(),
    })
}

#[test]
fn import_appends_with_pairwise_distinct_identifiers() {
    let conn = open_db_in_memory().unwrap();
    let mut store = open_store(&conn);
    seed_store(&mut store);
    let before = store.len();

    let imported = store.import_batch(&two_record_payload()).unwrap();

    assert_eq!(imported.len(), 2);
    assert_eq!(store.len(), before + 2);
    assert_eq!(store.checklists()[before].title, "C172 runup");
    assert_eq!(store.checklists()[before + 1].title, "C172 shutdown");
    assert_eq!(imported[0], store.checklists()[before].id);

    let ids = all_identifiers(store.checklists());
    let distinct: HashSet<u64> = ids.iter().copied().collect();
    assert_eq!(distinct.len(), ids.len());
    assert!(!distinct.contains(&1));
    assert!(!distinct.contains(&0));
}

#[test]
fn import_keeps_completion_and_creation_time() {
    let conn = open_db_in_memory().unwrap();
    let mut store = open_store(&conn);

    store.import_batch(&two_record_payload()).unwrap();

    let runup = &store.checklists()[0];
    assert_eq!(runup.progress_counts(), (1, 2));
    assert_eq!(runup.created_at.to_rfc3339(), "2024-01-02T03:04:05+00:00");
    assert_eq!(store.checklists()[1].sections[0].name, "Shutdown");
}

#[test]
fn export_then_import_round_trips_content() {
    let conn = open_db_in_memory().unwrap();
    let mut source = open_store(&conn);
    seed_store(&mut source);
    let exported = source.export_all();

    let target_conn = open_db_in_memory().unwrap();
    let mut target = open_store(&target_conn);
    target
        .import_batch(&serde_json::to_value(&exported).unwrap())
        .unwrap();

    let original: Vec<_> = exported.iter().map(content).collect();
    let restored: Vec<_> = target.checklists().iter().map(content).collect();
    assert_eq!(restored, original);
    for (restored, original) in target.checklists().iter().zip(&exported) {
        assert_eq!(restored.created_at, original.created_at);
    }
}

#[test]
fn export_json_text_round_trips_through_import_json() {
    let conn = open_db_in_memory().unwrap();
    let mut source = open_store(&conn);
    seed_store(&mut source);
    let text = source.export_json().unwrap();
    assert!(text.starts_with('['));

    let target_conn = open_db_in_memory().unwrap();
    let mut target = open_store(&target_conn);
    target.import_json(&text).unwrap();

    let original: Vec<_> = source.checklists().iter().map(content).collect();
    let restored: Vec<_> = target.checklists().iter().map(content).collect();
    assert_eq!(restored, original);
}

#[test]
fn malformed_record_aborts_the_whole_batch() {
    let conn = open_db_in_memory().unwrap();
    let mut store = open_store(&conn);
    seed_store(&mut store);
    let before = store.export_all();

    let payload = json!([
        {"title": "fine", "sections": [{"name": "s", "items": [{"name": "i"}]}]},
        {"title": "broken", "sections": [{"name": "s", "items": [{"action": "ON"}]}]}
    ]);
    let err = store.import_batch(&payload).unwrap_err();

    match err {
        StoreError::Import(ImportError::MalformedRecord { index, .. }) => assert_eq!(index, 1),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(store.export_all(), before);
}

#[test]
fn non_array_payload_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let mut store = open_store(&conn);

    let err = store
        .import_batch(&json!({"title": "x", "sections": []}))
        .unwrap_err();
    assert!(matches!(err, StoreError::Import(ImportError::NotAnArray)));

    let err = store.import_json("not json at all").unwrap_err();
    assert!(matches!(err, StoreError::Import(ImportError::InvalidJson(_))));
    assert!(store.is_empty());
}

#[test]
fn flat_steps_records_are_rejected() {
    let conn = open_db_in_memory().unwrap();
    let mut store = open_store(&conn);

    let payload = json!([{"id": 1, "title": "legacy", "steps": [{"id": 2, "name": "a"}]}]);
    let err = store.import_batch(&payload).unwrap_err();
    assert!(matches!(
        err,
        StoreError::Import(ImportError::LegacyStepsSchema { index: 0 })
    ));
    assert!(store.is_empty());
}

#[test]
fn imported_checklists_are_persisted() {
    let conn = open_db_in_memory().unwrap();
    {
        let mut store = open_store(&conn);
        store.import_batch(&two_record_payload()).unwrap();
    }

    let reopened = open_store(&conn);
    assert_eq!(reopened.len(), 2);
    let labels: Vec<String> = reopened.distinct_aircraft().into_iter().collect();
    assert_eq!(labels, vec!["C172".to_string()]);
}

#[test]
fn record_with_only_blank_names_is_rejected_without_commit() {
    let conn = open_db_in_memory().unwrap();
    let mut store = open_store(&conn);

    let err = store
        .import_json(r#"[{"title":"t","sections":[{"name":"   ","items":[{"name":"  "}]}]}]"#)
        .unwrap_err();

    assert!(matches!(
        err,
        StoreError::Import(ImportError::MalformedRecord { index: 0, .. })
    ));
    assert!(store.is_empty());
    assert!(open_store(&conn).is_empty());
}

#[test]
fn update_after_import_keeps_completion_of_padded_names() {
    let conn = open_db_in_memory().unwrap();
    let mut store = open_store(&conn);
    let payload = json!([{
        "title": "A320 normal",
        "aircraft": "A320",
        "sections": [{"name": "Preflight ", "items": [
            {"name": "BATT 1+2 ", "action": "ON", "completed": true},
            {"name": "EXT PWR", "action": "ON"}
        ]}]
    }]);
    let id = store.import_batch(&payload).unwrap()[0];
    let imported = store.get(id).unwrap();
    assert_eq!(imported.sections[0].name, "Preflight");
    assert_eq!(imported.sections[0].items[0].name, "BATT 1+2");

    let form = SubmittedForm::new("A320 normal", Some("A320")).section(SubmittedSection::new(
        "Preflight",
        vec![
            SubmittedItem::new("BATT 1+2", "ON"),
            SubmittedItem::new("EXT PWR", "ON"),
        ],
    ));
    let updated = store.update(id, &form).unwrap();

    let completed: Vec<bool> = updated.sections[0]
        .items
        .iter()
        .map(|item| item.completed)
        .collect();
    assert_eq!(completed, vec![true, false]);
}
