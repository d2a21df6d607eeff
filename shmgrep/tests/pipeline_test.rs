use shmgrep::orchestrator::{new_session_id, run_worker, ChannelNames, SourceSession};
use std::num::NonZeroUsize;
use std::thread;

fn shards(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap()
}

fn spawn_worker(names: ChannelNames, word: &str, shard_count: usize) -> thread::JoinHandle<()> {
    let word = word.to_string();
    thread::spawn(move || {
        run_worker(&names, &word, shards(shard_count)).unwrap();
    })
}

#[test]
fn full_pipeline_returns_matches_in_order() {
    let names = ChannelNames::for_session(&new_session_id());
    let source = SourceSession::create(&names).unwrap();
    let worker = spawn_worker(names, "cat", 4);

    let lines: Vec<String> = vec![
        "the cat sat".into(),
        "a dog ran".into(),
        "concatenate".into(),
        "The Cat slept".into(),
        "cats everywhere".into(),
        "one more cat!".into(),
    ];

    let sent = source.send_lines(&lines).unwrap();
    assert_eq!(sent, lines.len());

    let mut seen = Vec::new();
    let matches = source
        .collect_matches(|line| seen.push(line.to_string()))
        .unwrap();
    worker.join().unwrap();

    let expected = vec![
        "the cat sat".to_string(),
        "The Cat slept".to_string(),
        "one more cat!".to_string(),
    ];
    assert_eq!(matches, expected);
    // The sink observes every match, in arrival order
    assert_eq!(seen, expected);
}

#[test]
fn empty_input_completes_without_blocking() {
    let names = ChannelNames::for_session(&new_session_id());
    let source = SourceSession::create(&names).unwrap();
    let worker = spawn_worker(names, "cat", 4);

    let sent = source.send_lines(&[]).unwrap();
    assert_eq!(sent, 0);

    let matches = source.collect_matches(|_| {}).unwrap();
    worker.join().unwrap();
    assert!(matches.is_empty());
}

#[test]
fn single_line_input_roundtrips() {
    let names = ChannelNames::for_session(&new_session_id());
    let source = SourceSession::create(&names).unwrap();
    let worker = spawn_worker(names, "needle", 4);

    let lines = vec!["just one needle".to_string()];
    source.send_lines(&lines).unwrap();

    let matches = source.collect_matches(|_| {}).unwrap();
    worker.join().unwrap();
    assert_eq!(matches, lines);
}

#[test]
fn oversized_lines_are_skipped_not_searched() {
    let names = ChannelNames::for_session(&new_session_id());
    let source = SourceSession::create(&names).unwrap();
    let worker = spawn_worker(names, "cat", 4);

    let lines = vec![
        "a cat fits".to_string(),
        format!("cat {}", "x".repeat(300)),
        "another cat fits".to_string(),
    ];
    let sent = source.send_lines(&lines).unwrap();
    assert_eq!(sent, 2);

    let matches = source.collect_matches(|_| {}).unwrap();
    worker.join().unwrap();
    assert_eq!(matches, vec!["a cat fits", "another cat fits"]);
    assert_eq!(source.metrics().get_stats().oversized_skipped, 1);
}

#[test]
fn large_stream_preserves_order_through_the_single_slot() {
    let names = ChannelNames::for_session(&new_session_id());
    let source = SourceSession::create(&names).unwrap();
    let worker = spawn_worker(names, "keep", 4);

    let lines: Vec<String> = (0..500)
        .map(|i| {
            if i % 2 == 0 {
                format!("{:04} keep this", i)
            } else {
                format!("{:04} drop this", i)
            }
        })
        .collect();
    source.send_lines(&lines).unwrap();

    let matches = source.collect_matches(|_| {}).unwrap();
    worker.join().unwrap();

    let expected: Vec<String> = lines
        .iter()
        .filter(|line| line.contains("keep"))
        .cloned()
        .collect();
    assert_eq!(matches, expected);
}

#[test]
fn worker_count_of_one_still_works() {
    let names = ChannelNames::for_session(&new_session_id());
    let source = SourceSession::create(&names).unwrap();
    let worker = spawn_worker(names, "cat", 1);

    let lines = vec!["a cat".to_string(), "no dog".to_string()];
    source.send_lines(&lines).unwrap();

    let matches = source.collect_matches(|_| {}).unwrap();
    worker.join().unwrap();
    assert_eq!(matches, vec!["a cat"]);
}
