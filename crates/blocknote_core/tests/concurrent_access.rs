use blocknote_core::db::open_db;
use blocknote_core::{
    BlockKind, ContentBlock, FullNote, Note, NoteRepository, SqliteNoteRepository, SummaryFilter,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

fn with_blocks(note: &Note, count: u32) -> FullNote {
    let blocks = (0..count)
        .map(|index| {
            let kind = if index % 2 == 0 {
                BlockKind::text(format!("part {index}"))
            } else {
                BlockKind::image(format!("images/img_{index}.jpg"), Some(100), Some(100))
            };
            ContentBlock::new(note.id, kind, index).unwrap()
        })
        .collect();
    FullNote::new(note.clone(), blocks).unwrap()
}

#[test]
fn readers_never_observe_partial_block_sets() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shared.db");
    let note = Note::new("contended");

    {
        let mut conn = open_db(&path).unwrap();
        let mut repo = SqliteNoteRepository::try_new(&mut conn).unwrap();
        repo.save_full_note(&with_blocks(&note, 3)).unwrap();
    }

    let done = Arc::new(AtomicBool::new(false));
    let writer = {
        let path = path.clone();
        let note = note.clone();
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut conn = open_db(&path).unwrap();
            let mut repo = SqliteNoteRepository::try_new(&mut conn).unwrap();
            for round in 0..60 {
                let count = if round % 2 == 0 { 5 } else { 3 };
                repo.save_full_note(&with_blocks(&note, count)).unwrap();
            }
            done.store(true, Ordering::SeqCst);
        })
    };

    let mut conn = open_db(&path).unwrap();
    let mut repo = SqliteNoteRepository::try_new(&mut conn).unwrap();
    let mut observations = 0;
    while !done.load(Ordering::SeqCst) || observations == 0 {
        let full = repo.get_full_note(note.id).unwrap().unwrap();
        assert!(
            matches!(full.blocks.len(), 3 | 5),
            "observed {} blocks",
            full.blocks.len()
        );
        let summary = &repo.list_summaries(&SummaryFilter::all()).unwrap()[0];
        assert!(matches!(summary.block_count, 3 | 5));
        observations += 1;
    }

    writer.join().unwrap();
    let last = repo.get_full_note(note.id).unwrap().unwrap();
    assert_eq!(last.blocks.len(), 3);
}
