use rubrics_core::db::open_db_in_memory;
use rubrics_core::model::ledger::LedgerEntry;
use rubrics_core::{
    parse_rows, reconcile, CatalogRepository, GradeSheetError, GradeSheetService, ImportError,
    ImportPath, LedgerRepository, NewRubric, ReconcileError, RepoError, RubricRepository,
    SqliteCatalogRepository, SqliteLedgerRepository, SqliteRubricRepository,
};
use rusqlite::Connection;

struct Fixture {
    attempt_id: i64,
    initial: i64,
    recheck: i64,
    /// Rubrics `A`, `B`, `C`.
    rubrics: [i64; 3],
}

#[test]
fn first_import_creates_one_entry_per_named_rubric() {
    let conn = open_db_in_memory().unwrap();
    let fx = setup(&conn);
    let [a, b, c] = fx.rubrics;

    let summary = import(
        &conn,
        &fx,
        fx.initial,
        vec![
            row(&[&a.to_string(), &b.to_string(), "", "3"]),
            row(&[&a.to_string(), "", "", "2"]),
            row(&[&a.to_string(), &b.to_string(), &c.to_string(), "1"]),
        ],
    )
    .unwrap();

    assert_eq!(summary.path, ImportPath::Created);
    assert_eq!(summary.rows_read, 3);
    assert_eq!(summary.rows_skipped, 0);
    assert_eq!(summary.entries_written, 3);
    assert_eq!(
        marks_by_rubric(&conn, &fx, fx.initial),
        vec![(a, 6), (b, 4), (c, 1)]
    );
}

#[test]
fn rows_without_marks_are_skipped_even_with_garbage_ids() {
    let conn = open_db_in_memory().unwrap();
    let fx = setup(&conn);
    let [a, _, _] = fx.rubrics;

    let summary = import(
        &conn,
        &fx,
        fx.initial,
        vec![
            row(&["not-an-id", "x", "y", ""]),
            row(&[&a.to_string(), "", "", "5"]),
            row(&[&a.to_string(), "", "", "   "]),
        ],
    )
    .unwrap();

    assert_eq!(summary.rows_read, 3);
    assert_eq!(summary.rows_skipped, 2);
    assert_eq!(marks_by_rubric(&conn, &fx, fx.initial), vec![(a, 5)]);
}

#[test]
fn empty_level_stops_scanning_deeper_levels() {
    let conn = open_db_in_memory().unwrap();
    let fx = setup(&conn);
    let [a, _, c] = fx.rubrics;

    import(
        &conn,
        &fx,
        fx.initial,
        vec![row(&[&a.to_string(), "", &c.to_string(), "4"])],
    )
    .unwrap();

    assert_eq!(marks_by_rubric(&conn, &fx, fx.initial), vec![(a, 4)]);
}

#[test]
fn reimport_resets_touched_rubrics_and_keeps_untouched_ones() {
    let conn = open_db_in_memory().unwrap();
    let fx = setup(&conn);
    let [a, b, _] = fx.rubrics;

    import(
        &conn,
        &fx,
        fx.initial,
        vec![row(&[&a.to_string(), &b.to_string(), "", "3"])],
    )
    .unwrap();
    let summary = import(
        &conn,
        &fx,
        fx.initial,
        vec![
            row(&[&a.to_string(), "", "", "1"]),
            row(&[&a.to_string(), "", "", "2"]),
        ],
    )
    .unwrap();

    assert_eq!(summary.path, ImportPath::Updated);
    assert_eq!(summary.entries_written, 1);
    assert_eq!(
        marks_by_rubric(&conn, &fx, fx.initial),
        vec![(a, 3), (b, 3)]
    );
}

#[test]
fn reimport_keeps_entry_ids_stable() {
    let conn = open_db_in_memory().unwrap();
    let fx = setup(&conn);
    let [a, _, _] = fx.rubrics;

    import(&conn, &fx, fx.initial, vec![row(&[&a.to_string(), "", "", "7"])]).unwrap();
    let before = entries(&conn, &fx, fx.initial);
    import(&conn, &fx, fx.initial, vec![row(&[&a.to_string(), "", "", "9"])]).unwrap();
    let after = entries(&conn, &fx, fx.initial);

    assert_eq!(before.len(), 1);
    assert_eq!(before[0].id, after[0].id);
    assert_eq!(after[0].marks, 9);
}

#[test]
fn malformed_marks_fail_without_writing() {
    let conn = open_db_in_memory().unwrap();
    let fx = setup(&conn);
    let [a, _, _] = fx.rubrics;

    let err = import(
        &conn,
        &fx,
        fx.initial,
        vec![
            row(&[&a.to_string(), "", "", "2"]),
            row(&[&a.to_string(), "", "", "two"]),
        ],
    )
    .unwrap_err();

    assert!(matches!(
        err,
        ImportError::Sheet(GradeSheetError::InvalidMarks { row: 2, .. })
    ));
    assert!(entries(&conn, &fx, fx.initial).is_empty());
}

#[test]
fn malformed_rubric_id_on_update_leaves_marks_unchanged() {
    let conn = open_db_in_memory().unwrap();
    let fx = setup(&conn);
    let [a, _, _] = fx.rubrics;

    import(&conn, &fx, fx.initial, vec![row(&[&a.to_string(), "", "", "6"])]).unwrap();
    let err = import(
        &conn,
        &fx,
        fx.initial,
        vec![
            row(&[&a.to_string(), "", "", "1"]),
            row(&[&a.to_string(), "B", "", "1"]),
        ],
    )
    .unwrap_err();

    assert!(matches!(
        err,
        ImportError::Sheet(GradeSheetError::InvalidRubricId {
            row: 2,
            level: 2,
            ..
        })
    ));
    assert_eq!(marks_by_rubric(&conn, &fx, fx.initial), vec![(a, 6)]);
}

#[test]
fn unknown_rubric_on_update_fails_without_writing() {
    let conn = open_db_in_memory().unwrap();
    let fx = setup(&conn);
    let [a, b, _] = fx.rubrics;

    import(&conn, &fx, fx.initial, vec![row(&[&a.to_string(), "", "", "6"])]).unwrap();
    let err = import(
        &conn,
        &fx,
        fx.initial,
        vec![
            row(&[&a.to_string(), "", "", "1"]),
            row(&[&a.to_string(), &b.to_string(), "", "1"]),
        ],
    )
    .unwrap_err();

    assert!(matches!(
        err,
        ImportError::Reconcile(ReconcileError::UnknownRubric { rubric_id, row: 2 }) if rubric_id == b
    ));
    assert_eq!(marks_by_rubric(&conn, &fx, fx.initial), vec![(a, 6)]);
}

#[test]
fn nonexistent_rubric_on_create_rolls_back_the_batch() {
    let conn = open_db_in_memory().unwrap();
    let fx = setup(&conn);
    let [a, _, _] = fx.rubrics;

    let err = import(
        &conn,
        &fx,
        fx.initial,
        vec![
            row(&[&a.to_string(), "", "", "1"]),
            row(&["9999", "", "", "1"]),
        ],
    )
    .unwrap_err();

    assert!(matches!(err, ImportError::Repo(RepoError::Db(_))));
    assert!(entries(&conn, &fx, fx.initial).is_empty());
}

#[test]
fn revisions_are_isolated() {
    let conn = open_db_in_memory().unwrap();
    let fx = setup(&conn);
    let [a, b, _] = fx.rubrics;

    import(
        &conn,
        &fx,
        fx.initial,
        vec![row(&[&a.to_string(), &b.to_string(), "", "4"])],
    )
    .unwrap();
    let summary = import(&conn, &fx, fx.recheck, vec![row(&[&a.to_string(), "", "", "8"])]).unwrap();

    assert_eq!(summary.path, ImportPath::Created);
    assert_eq!(
        marks_by_rubric(&conn, &fx, fx.initial),
        vec![(a, 4), (b, 4)]
    );
    assert_eq!(marks_by_rubric(&conn, &fx, fx.recheck), vec![(a, 8)]);
}

#[test]
fn empty_sheet_writes_nothing() {
    let conn = open_db_in_memory().unwrap();
    let fx = setup(&conn);

    let summary = import(&conn, &fx, fx.initial, Vec::new()).unwrap();

    assert_eq!(summary.path, ImportPath::Created);
    assert_eq!(summary.entries_written, 0);
    assert!(entries(&conn, &fx, fx.initial).is_empty());
}

#[test]
fn import_persists_exactly_the_reconciled_plan() {
    let conn = open_db_in_memory().unwrap();
    let fx = setup(&conn);
    let [a, b, c] = fx.rubrics;

    import(
        &conn,
        &fx,
        fx.initial,
        vec![
            row(&[&a.to_string(), &b.to_string(), "", "2"]),
            row(&[&c.to_string(), "", "", "5"]),
        ],
    )
    .unwrap();

    let sheet = vec![
        row(&[&b.to_string(), "", "", "1"]),
        row(&[&a.to_string(), &b.to_string(), "", "4"]),
    ];
    let existing = entries(&conn, &fx, fx.initial);
    let plan = reconcile(
        existing,
        &parse_rows(&sheet).unwrap(),
        fx.attempt_id,
        fx.initial,
    )
    .unwrap();
    assert!(plan.to_create.is_empty());

    let summary = import(&conn, &fx, fx.initial, sheet).unwrap();

    assert_eq!(summary.path, ImportPath::Updated);
    assert_eq!(summary.entries_written, plan.to_update.len());
    let stored = entries(&conn, &fx, fx.initial);
    for planned in &plan.to_update {
        let persisted = stored
            .iter()
            .find(|entry| entry.id == planned.id)
            .unwrap();
        assert_eq!(persisted, planned);
    }
    assert_eq!(
        marks_by_rubric(&conn, &fx, fx.initial),
        vec![(a, 4), (b, 5), (c, 5)]
    );
}

#[test]
fn explicit_store_and_update_paths_write_through_the_ledger() {
    let conn = open_db_in_memory().unwrap();
    let fx = setup(&conn);
    let [a, b, _] = fx.rubrics;
    let service = GradeSheetService::new(SqliteLedgerRepository::try_new(&conn).unwrap());

    let first = parse_rows(&[row(&[&a.to_string(), &b.to_string(), "", "4"])]).unwrap();
    let inserted = service
        .store_marks_for_revision(fx.attempt_id, fx.recheck, &first)
        .unwrap();
    let second = parse_rows(&[row(&[&b.to_string(), "", "", "1"])]).unwrap();
    let updated = service
        .update_marks_for_revision(fx.attempt_id, fx.recheck, &second)
        .unwrap();

    assert_eq!((inserted, updated), (2, 1));
    assert_eq!(
        marks_by_rubric(&conn, &fx, fx.recheck),
        vec![(a, 4), (b, 1)]
    );

    let unknown = service
        .update_marks_for_revision(fx.attempt_id, fx.initial, &second)
        .unwrap_err();
    assert!(matches!(
        unknown,
        ImportError::Reconcile(ReconcileError::UnknownRubric { .. })
    ));
}

fn setup(conn: &Connection) -> Fixture {
    let rubrics = SqliteRubricRepository::try_new(conn).unwrap();
    let catalog = SqliteCatalogRepository::try_new(conn).unwrap();

    let tree_id = rubrics.create_tree().unwrap();
    let a = rubrics.create_rubric(&NewRubric::new(tree_id, "A")).unwrap();
    let b = rubrics.create_rubric(&NewRubric::new(tree_id, "B")).unwrap();
    let c = rubrics
        .create_rubric(&NewRubric::new(tree_id, "C").leaf())
        .unwrap();
    rubrics.create_edge(tree_id, a.id, b.id).unwrap();
    rubrics.create_edge(tree_id, b.id, c.id).unwrap();

    let question = catalog.create_question("Explain", tree_id).unwrap();
    let student = catalog.create_student("alice").unwrap();
    let attempt = catalog
        .create_attempt(student.id, question.id, tree_id)
        .unwrap();

    Fixture {
        attempt_id: attempt.id,
        initial: catalog.create_revision("initial").unwrap().id,
        recheck: catalog.create_revision("recheck").unwrap().id,
        rubrics: [a.id, b.id, c.id],
    }
}

fn import(
    conn: &Connection,
    fx: &Fixture,
    revision_id: i64,
    rows: Vec<Vec<String>>,
) -> Result<rubrics_core::ImportSummary, ImportError> {
    let service = GradeSheetService::new(SqliteLedgerRepository::try_new(conn).unwrap());
    service.import_grade_sheet(fx.attempt_id, revision_id, rows)
}

fn row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|cell| cell.to_string()).collect()
}

fn entries(conn: &Connection, fx: &Fixture, revision_id: i64) -> Vec<LedgerEntry> {
    SqliteLedgerRepository::try_new(conn)
        .unwrap()
        .list_entries(fx.attempt_id, revision_id)
        .unwrap()
}

fn marks_by_rubric(conn: &Connection, fx: &Fixture, revision_id: i64) -> Vec<(i64, u16)> {
    let mut marks: Vec<_> = entries(conn, fx, revision_id)
        .into_iter()
        .map(|entry| (entry.rubric_id, entry.marks))
        .collect();
    marks.sort_unstable();
    marks
}
