//! Event log ordering, format, and console mirroring.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

mod common;

use std::time::Duration;

use benchd_server::obs::logger::{mirrors_to_console, LogEvent, Logger};

#[tokio::test]
async fn lines_keep_call_order() {
    let (_dir, log) = common::temp_log();
    let logger = Logger::open(&log).await.unwrap();

    for i in 0..500 {
        logger.write(LogEvent::info(format!("line {i}")));
    }
    logger.flush().await.unwrap();

    let lines = common::log_lines(&log);
    assert_eq!(lines.len(), 500);
    for (i, line) in lines.iter().enumerate() {
        assert!(line.ends_with(&format!("] line {i}")), "out of order: {line}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writers_do_not_interleave_within_lines() {
    let (_dir, log) = common::temp_log();
    let logger = Logger::open(&log).await.unwrap();

    let mut tasks = Vec::new();
    for w in 0..8 {
        let logger = logger.clone();
        tasks.push(tokio::spawn(async move {
            for i in 0..100 {
                logger.write(LogEvent::info(format!("writer={w} seq={i}")));
                tokio::task::yield_now().await;
            }
        }));
    }
    for t in tasks {
        t.await.unwrap();
    }
    logger.flush().await.unwrap();

    let lines = common::log_lines(&log);
    assert_eq!(lines.len(), 800);

    // Per-writer sequence stays in order even though writers interleave.
    for w in 0..8 {
        let prefix = format!("writer={w} seq=");
        let seqs: Vec<u32> = lines
            .iter()
            .filter_map(|l| l.split_once(&prefix))
            .map(|(_, seq)| seq.parse().unwrap())
            .collect();
        assert_eq!(seqs, (0..100u32).collect::<Vec<_>>());
    }
}

#[tokio::test]
async fn line_format_has_iso_timestamp_and_request_id() {
    let (_dir, log) = common::temp_log();
    let logger = Logger::open(&log).await.unwrap();

    logger.write(LogEvent::info("GET / from 127.0.0.1").with_request(42));
    logger.write(LogEvent::stats("STATS - Requests: 0"));
    logger.flush().await.unwrap();

    let lines = common::log_lines(&log);
    let (ts, rest) = lines[0]
        .strip_prefix('[')
        .and_then(|l| l.split_once("] "))
        .unwrap();
    // 2026-10-16T12:34:56.789Z
    assert_eq!(ts.len(), 24, "timestamp: {ts}");
    assert!(ts.ends_with('Z'));
    assert_eq!(&ts[10..11], "T");
    assert_eq!(rest, "#42 GET / from 127.0.0.1");

    assert!(lines[1].ends_with("] STATS - Requests: 0"));
}

#[tokio::test]
async fn reopening_appends() {
    let (_dir, log) = common::temp_log();
    {
        let logger = Logger::open(&log).await.unwrap();
        logger.write(LogEvent::info("first run"));
        logger.flush().await.unwrap();
    }
    let logger = Logger::open(&log).await.unwrap();
    logger.write(LogEvent::info("second run"));
    logger.flush().await.unwrap();

    let lines = common::log_lines(&log);
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("first run"));
    assert!(lines[1].ends_with("second run"));
}

#[tokio::test]
async fn lines_reach_the_file_without_flush() {
    let (_dir, log) = common::temp_log();
    let logger = Logger::open(&log).await.unwrap();

    logger.write(LogEvent::info("Server running on port 8080"));
    logger.write(LogEvent::info("GET / from 127.0.0.1").with_request(1));

    // No flush(): a reader tailing the file still sees both lines.
    let mut seen = Vec::new();
    for _ in 0..200 {
        seen = std::fs::read_to_string(&log)
            .map(|s| s.lines().map(str::to_owned).collect())
            .unwrap_or_default();
        if seen.len() == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(seen.len(), 2, "lines on disk: {seen:?}");
    assert!(seen[0].ends_with("] Server running on port 8080"));
    assert!(seen[1].ends_with("] #1 GET / from 127.0.0.1"));
}

#[test]
fn console_mirroring_policy() {
    assert!(mirrors_to_console("Server running on port 8080"));
    assert!(mirrors_to_console("SIGTERM received, shutting down gracefully"));
    assert!(mirrors_to_console("CLIENT ERROR: malformed request"));
    assert!(mirrors_to_console("ERROR: broken pipe"));

    assert!(!mirrors_to_console("GET / from 127.0.0.1"));
    assert!(!mirrors_to_console("COMPLETED in 0ms (Total: 1, Errors: 0)"));
    assert!(!mirrors_to_console("STATS - Requests: 1, Errors: 0, Memory: 3MB / 9MB RSS"));
    assert!(!mirrors_to_console("Server closed. Total requests: 1, Errors: 0"));
    // Case-sensitive substring match.
    assert!(!mirrors_to_console("error: lowercase"));
}
