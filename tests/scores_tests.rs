use std::fs;

use tetris_duel::scores::{qualifies, record, top_n, HighScoreEntry, HighScoreStore, JsonFileStore, MemoryStore};

fn entry(score: u64, initials: &str) -> HighScoreEntry {
    HighScoreEntry {
        date: "2024-05-01 12:00".to_string(),
        score,
        initials: initials.to_string(),
    }
}

fn full_board() -> Vec<HighScoreEntry> {
    vec![
        entry(1600, "AAA"),
        entry(800, "BBB"),
        entry(400, "CCC"),
        entry(200, "DDD"),
        entry(100, "EEE"),
    ]
}

#[test]
fn short_board_always_qualifies() {
    assert!(qualifies(&[], 0));
    assert!(qualifies(&full_board()[..4], 0));
}

#[test]
fn full_board_needs_to_beat_minimum() {
    let board = full_board();
    assert!(!qualifies(&board, 100));
    assert!(qualifies(&board, 101));
}

#[test]
fn top_n_sorts_descending() {
    let sorted = top_n(vec![entry(5, "X"), entry(50, "Y"), entry(20, "Z")], 2);
    assert_eq!(sorted, vec![entry(50, "Y"), entry(20, "Z")]);
}

#[test]
fn record_keeps_best_five() -> anyhow::Result<()> {
    let mut store = MemoryStore::with_entries(full_board());
    let board = record(&mut store, entry(300, "NEW"))?;
    assert_eq!(board.len(), 5);
    assert_eq!(board[3], entry(300, "NEW"));
    assert!(board.iter().all(|e| e.initials != "EEE"));
    assert_eq!(store.load_top(5), board);
    Ok(())
}

#[test]
fn json_file_round_trip() -> anyhow::Result<()> {
    let dir = std::env::temp_dir().join(format!("tetris-duel-scores-{}", std::process::id()));
    fs::create_dir_all(&dir)?;
    let path = dir.join("highscores.json");
    let _ = fs::remove_file(&path);

    let mut store = JsonFileStore::new(&path);
    assert!(store.load_top(5).is_empty());

    record(&mut store, entry(160, "ABC"))?;
    record(&mut store, entry(1600, "XYZ"))?;
    let reopened = JsonFileStore::new(&path);
    assert_eq!(reopened.load_top(5), vec![entry(1600, "XYZ"), entry(160, "ABC")]);

    let text = fs::read_to_string(&path)?;
    assert!(text.contains("\"initials\": \"XYZ\""));
    assert!(text.contains("\"date\""));

    fs::write(&path, "not json")?;
    assert!(JsonFileStore::new(&path).load_top(5).is_empty());

    fs::remove_dir_all(&dir)?;
    Ok(())
}

#[test]
fn new_entry_is_dated() {
    let e = HighScoreEntry::now(40, "QED");
    assert_eq!(e.score, 40);
    assert_eq!(e.initials, "QED");
    assert_eq!(e.date.len(), "2024-05-01 12:00".len());
}
