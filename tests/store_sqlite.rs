//! SQLite store tests.
//!
//! Exercise the [`Store`] contract against a real database file: run id
//! allocation, atomic run writes, status round-trips through the code and
//! column-list columns, and fileset replacement.

use chrono::Utc;
use data_inbox::check::evaluate;
use data_inbox::db;
use data_inbox::matcher::MatchOptions;
use data_inbox::migrate::create_schema;
use data_inbox::models::{
    FileEvaluation, FileStatus, FilesetChange, FilesetEntry, PartnerEvaluation, PartnerStatus,
    RunOutcome,
};
use data_inbox::registry::{FilesetSnapshot, PartnerRegistry};
use data_inbox::sqlite_store::SqliteStore;
use data_inbox::store::Store;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

async fn open(tmp: &TempDir) -> SqliteStore {
    let pool = db::connect_path(&tmp.path().join("inbox.sqlite"))
        .await
        .unwrap();
    create_schema(&pool).await.unwrap();
    SqliteStore::new(pool)
}

async fn add_partner(store: &SqliteStore, id: i64, dir: &Path, enabled: bool) {
    sqlx::query(
        "INSERT INTO partners (id, name, full_name, directory, stored_directory, enabled)
         VALUES (?, ?, ?, ?, NULL, ?)",
    )
    .bind(id)
    .bind(format!("p{}", id))
    .bind(format!("Partner {}", id))
    .bind(dir.to_string_lossy().to_string())
    .bind(enabled)
    .execute(store.pool())
    .await
    .unwrap();
}

fn entry(partner_id: i64, pattern: &str, filetype_id: Option<i64>, header: &str) -> FilesetEntry {
    FilesetEntry {
        partner_id,
        filename_pattern: pattern.into(),
        filetype_id,
        header: header.into(),
        recorded_at: Utc::now(),
    }
}

#[tokio::test]
async fn test_run_ids_increase_and_survive_failed_runs() {
    let tmp = TempDir::new().unwrap();
    let store = open(&tmp).await;
    add_partner(&store, 1, tmp.path(), true).await;

    let first = store.begin_run(Utc::now()).await.unwrap();
    assert_eq!(first.id, 1);

    // Unknown partner: the whole write is rejected, the run id stays taken.
    let bad = RunOutcome {
        partners: vec![
            PartnerEvaluation {
                partner_id: 1,
                status: PartnerStatus::NoNewData,
            },
            PartnerEvaluation {
                partner_id: 42,
                status: PartnerStatus::NoNewData,
            },
        ],
        files: Vec::new(),
    };
    assert!(store.record_run(first.id, &bad).await.is_err());
    assert!(store.partner_statuses(first.id).await.unwrap().is_empty());

    let second = store.begin_run(Utc::now()).await.unwrap();
    assert_eq!(second.id, 2);
    assert!(store.run(first.id).await.unwrap().is_some());
    assert!(store.run(99).await.unwrap().is_none());
}

#[tokio::test]
async fn test_status_rows_round_trip() {
    let tmp = TempDir::new().unwrap();
    let store = open(&tmp).await;
    add_partner(&store, 1, tmp.path(), true).await;

    let run = store.begin_run(Utc::now()).await.unwrap();
    let files = vec![
        FileEvaluation {
            partner_id: 1,
            filename: "LABS_02.csv".into(),
            filetype_id: None,
            status: FileStatus::ColumnsAddedAndRemoved {
                added: vec!["units".into(), "flag, raw".into()],
                removed: vec!["date".into()],
            },
        },
        FileEvaluation {
            partner_id: 1,
            filename: "VITAL.csv".into(),
            filetype_id: None,
            status: FileStatus::NoHeaderChange,
        },
    ];
    let outcome = RunOutcome {
        partners: vec![PartnerEvaluation {
            partner_id: 1,
            status: PartnerStatus::HasNewFiles,
        }],
        files: files.clone(),
    };
    store.record_run(run.id, &outcome).await.unwrap();

    let partners = store.partner_statuses(run.id).await.unwrap();
    assert_eq!(partners.len(), 1);
    assert_eq!(partners[0].status, PartnerStatus::HasNewFiles);

    let stored: Vec<_> = store
        .file_statuses(run.id)
        .await
        .unwrap()
        .into_iter()
        .map(|f| (f.filename, f.status))
        .collect();
    let expected: Vec<_> = files.into_iter().map(|f| (f.filename, f.status)).collect();
    assert_eq!(stored, expected);
}

#[tokio::test]
async fn test_fileset_replace_and_insert() {
    let tmp = TempDir::new().unwrap();
    let store = open(&tmp).await;
    add_partner(&store, 1, tmp.path(), true).await;
    sqlx::query("INSERT INTO filetypes (id, name) VALUES (1, 'DEMOGRAPHIC')")
        .execute(store.pool())
        .await
        .unwrap();

    store
        .apply_fileset_changes(&[
            FilesetChange::Replace(entry(1, "DEMOGRAPHIC", Some(1), "pid,sex")),
            FilesetChange::Insert(entry(1, "pharmacy", None, "rx")),
        ])
        .await
        .unwrap();
    store
        .apply_fileset_changes(&[FilesetChange::Replace(entry(
            1,
            "DEMOGRAPHIC_V2",
            Some(1),
            "pid,sex,race",
        ))])
        .await
        .unwrap();

    let mut entries: Vec<_> = store
        .fileset_entries()
        .await
        .unwrap()
        .into_iter()
        .map(|e| (e.filename_pattern, e.filetype_id, e.header))
        .collect();
    entries.sort();
    assert_eq!(
        entries,
        vec![
            ("DEMOGRAPHIC_V2".to_string(), Some(1), "pid,sex,race".to_string()),
            ("pharmacy".to_string(), None, "rx".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_evaluation_is_repeatable_across_runs() {
    let tmp = TempDir::new().unwrap();
    let inbox = tmp.path().join("inbox");
    fs::create_dir(&inbox).unwrap();
    fs::write(inbox.join("DEMOGRAPHIC_20230215.csv"), "pid|sex\n").unwrap();
    fs::write(inbox.join("LABS.csv"), "pid,value\n").unwrap();

    let store = open(&tmp).await;
    add_partner(&store, 1, &inbox, true).await;
    add_partner(&store, 2, &tmp.path().join("missing"), true).await;
    add_partner(&store, 3, &inbox, false).await;
    sqlx::query(
        "INSERT INTO fileset_entries (partner_id, filename_pattern, filetype_id, header, recorded_at)
         VALUES (1, 'DEMOGRAPHIC', NULL, 'pid,sex', 0), (1, 'LABS', NULL, 'pid,date,value', 0)",
    )
    .execute(store.pool())
    .await
    .unwrap();

    let mut rows = Vec::new();
    for _ in 0..2 {
        let registry = PartnerRegistry::new(store.partners().await.unwrap());
        let fileset = FilesetSnapshot::new(store.fileset_entries().await.unwrap());
        let run = store.begin_run(Utc::now()).await.unwrap();
        let outcome = evaluate(&registry, &fileset, &MatchOptions::default());
        store.record_run(run.id, &outcome).await.unwrap();

        let partners: Vec<_> = store
            .partner_statuses(run.id)
            .await
            .unwrap()
            .into_iter()
            .map(|p| (p.partner_id, p.status))
            .collect();
        let files: Vec<_> = store
            .file_statuses(run.id)
            .await
            .unwrap()
            .into_iter()
            .map(|f| (f.filename, f.status))
            .collect();
        rows.push((partners, files));
    }

    assert_eq!(rows[0], rows[1]);
    let (partners, files) = &rows[0];
    assert_eq!(
        partners,
        &vec![
            (1, PartnerStatus::HasNewFiles),
            (2, PartnerStatus::DirectoryNotFound),
            (3, PartnerStatus::NotChecked),
        ]
    );
    assert_eq!(
        files,
        &vec![
            ("DEMOGRAPHIC_20230215.csv".to_string(), FileStatus::HeaderMissing),
            (
                "LABS.csv".to_string(),
                FileStatus::ColumnsRemoved {
                    removed: vec!["date".into()]
                }
            ),
        ]
    );
}

#[tokio::test]
async fn test_one_fileset_entry_per_partner_and_pattern() {
    let tmp = TempDir::new().unwrap();
    let store = open(&tmp).await;
    add_partner(&store, 1, tmp.path(), true).await;
    sqlx::query("INSERT INTO filetypes (id, name) VALUES (2, 'LABS')")
        .execute(store.pool())
        .await
        .unwrap();
    store
        .apply_fileset_changes(&[FilesetChange::Insert(entry(1, "LABS", None, "pid,date"))])
        .await
        .unwrap();

    // The vocabulary now knows LABS; the newer header takes over the pattern.
    store
        .apply_fileset_changes(&[FilesetChange::Replace(entry(
            1,
            "LABS",
            Some(2),
            "pid,date,value,units",
        ))])
        .await
        .unwrap();

    let entries: Vec<_> = store
        .fileset_entries()
        .await
        .unwrap()
        .into_iter()
        .map(|e| (e.filename_pattern, e.filetype_id, e.header))
        .collect();
    assert_eq!(
        entries,
        vec![("LABS".to_string(), Some(2), "pid,date,value,units".to_string())]
    );

    let duplicate = sqlx::query(
        "INSERT INTO fileset_entries (partner_id, filename_pattern, filetype_id, header, recorded_at)
         VALUES (1, 'LABS', NULL, 'pid', 0)",
    )
    .execute(store.pool())
    .await;
    assert!(duplicate.is_err());
}
