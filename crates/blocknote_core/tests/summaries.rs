use blocknote_core::db::open_db_in_memory;
use blocknote_core::summary::parse_date_query;
use blocknote_core::{
    BlockKind, ContentBlock, FullNote, Note, NoteRepository, SqliteNoteRepository, SummaryFilter,
};
use rusqlite::{params, Connection};
use uuid::Uuid;

fn save_note(conn: &mut Connection, title: &str, bodies: &[&str], updated_at: i64) -> Uuid {
    let mut note = Note::new(title);
    note.updated_at = updated_at;
    let blocks = bodies
        .iter()
        .enumerate()
        .map(|(index, body)| {
            ContentBlock::new(note.id, BlockKind::text(*body), index as u32).unwrap()
        })
        .collect();
    let full = FullNote::new(note, blocks).unwrap();
    let mut repo = SqliteNoteRepository::try_new(conn).unwrap();
    repo.save_full_note(&full).unwrap();
    full.note.id
}

#[test]
fn preview_joins_text_bodies_and_counts_every_block() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteNoteRepository::try_new(&mut conn).unwrap();
    let note = Note::new("mixed");
    let blocks = vec![
        ContentBlock::new(note.id, BlockKind::text("Hello "), 0).unwrap(),
        ContentBlock::new(note.id, BlockKind::image("images/a.jpg", None, None), 1).unwrap(),
        ContentBlock::new(note.id, BlockKind::text("world"), 2).unwrap(),
    ];
    let full = FullNote::new(note, blocks).unwrap();
    repo.save_full_note(&full).unwrap();

    let summaries = repo.list_summaries(&SummaryFilter::all()).unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].preview, "Hello  world");
    assert_eq!(summaries[0].block_count, 3);
    assert_eq!(summaries[0].title, "mixed");
    assert_eq!(summaries[0].last_modified, full.note.updated_at);
    assert_eq!(summaries[0], blocknote_core::summary::summarize(&full));
}

#[test]
fn summaries_follow_block_changes() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteNoteRepository::try_new(&mut conn).unwrap();
    let note = Note::new("live");
    let first = FullNote::new(
        note.clone(),
        vec![ContentBlock::new(note.id, BlockKind::text("draft"), 0).unwrap()],
    )
    .unwrap();
    repo.save_full_note(&first).unwrap();

    let second = FullNote::new(
        note.clone(),
        vec![
            ContentBlock::new(note.id, BlockKind::text("final"), 0).unwrap(),
            ContentBlock::new(note.id, BlockKind::audio("audios/a.m4a", None), 1).unwrap(),
        ],
    )
    .unwrap();
    repo.save_full_note(&second).unwrap();

    let summary = &repo.list_summaries(&SummaryFilter::all()).unwrap()[0];
    assert_eq!(summary.preview, "final");
    assert_eq!(summary.block_count, 2);
}

#[test]
fn note_without_blocks_has_empty_preview() {
    let mut conn = open_db_in_memory().unwrap();
    save_note(&mut conn, "empty", &[], 10);

    let repo = SqliteNoteRepository::try_new(&mut conn).unwrap();
    let summaries = repo.list_summaries(&SummaryFilter::all()).unwrap();
    assert_eq!(summaries[0].preview, "");
    assert_eq!(summaries[0].block_count, 0);
}

#[test]
fn summaries_are_newest_first_with_id_tiebreak() {
    let mut conn = open_db_in_memory().unwrap();
    let older = save_note(&mut conn, "older", &["a"], 1_000);
    let tie_a = save_note(&mut conn, "tie a", &["b"], 2_000);
    let tie_b = save_note(&mut conn, "tie b", &["c"], 2_000);

    let repo = SqliteNoteRepository::try_new(&mut conn).unwrap();
    let ids: Vec<Uuid> = repo
        .list_summaries(&SummaryFilter::all())
        .unwrap()
        .into_iter()
        .map(|summary| summary.id)
        .collect();

    let mut ties = vec![tie_a, tie_b];
    ties.sort_by_key(|id| id.to_string());
    assert_eq!(ids, vec![ties[0], ties[1], older]);
}

#[test]
fn text_search_matches_titles_and_bodies_case_insensitively() {
    let mut conn = open_db_in_memory().unwrap();
    let by_title = save_note(&mut conn, "Weekly Groceries", &["milk"], 1);
    let by_body = save_note(&mut conn, "errands", &["buy GROCERIES later"], 2);
    save_note(&mut conn, "unrelated", &["nothing here"], 3);

    let repo = SqliteNoteRepository::try_new(&mut conn).unwrap();
    let mut found: Vec<Uuid> = repo
        .list_summaries(&SummaryFilter::text("groceries"))
        .unwrap()
        .into_iter()
        .map(|summary| summary.id)
        .collect();
    found.sort();
    let mut expected = vec![by_title, by_body];
    expected.sort();
    assert_eq!(found, expected);
}

#[test]
fn text_search_treats_wildcards_literally() {
    let mut conn = open_db_in_memory().unwrap();
    let literal = save_note(&mut conn, "sale", &["50% off"], 1);
    save_note(&mut conn, "other", &["500 items"], 2);

    let repo = SqliteNoteRepository::try_new(&mut conn).unwrap();
    let found = repo.list_summaries(&SummaryFilter::text("0%")).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, literal);
}

#[test]
fn category_filter_limits_results() {
    let mut conn = open_db_in_memory().unwrap();
    let daily = save_note(&mut conn, "daily note", &["x"], 1);
    let work = save_note(&mut conn, "work note", &["y"], 2);
    conn.execute(
        "UPDATE notes SET category_id = 'work' WHERE id = ?1;",
        params![work.to_string()],
    )
    .unwrap();

    let repo = SqliteNoteRepository::try_new(&mut conn).unwrap();
    let in_work = repo
        .list_summaries(&SummaryFilter::in_category("work"))
        .unwrap();
    assert_eq!(in_work.len(), 1);
    assert_eq!(in_work[0].id, work);
    assert_eq!(in_work[0].category_id, "work");

    let in_daily = repo
        .list_summaries(&SummaryFilter::in_category("daily"))
        .unwrap();
    assert_eq!(in_daily.len(), 1);
    assert_eq!(in_daily[0].id, daily);
}

#[test]
fn date_query_matches_notes_modified_that_month() {
    let march = parse_date_query("20250310").unwrap().start_ms + 3_600_000;
    let april = parse_date_query("20250401").unwrap().start_ms;

    let mut conn = open_db_in_memory().unwrap();
    let in_march = save_note(&mut conn, "spring", &["plans"], march);
    save_note(&mut conn, "later", &["more plans"], april);
    let titled = save_note(&mut conn, "report 202503", &["draft"], april + 1);

    let repo = SqliteNoteRepository::try_new(&mut conn).unwrap();
    let found: Vec<Uuid> = repo
        .list_summaries(&SummaryFilter::smart_search("202503"))
        .unwrap()
        .into_iter()
        .map(|summary| summary.id)
        .collect();
    assert_eq!(found, vec![titled, in_march]);
}
