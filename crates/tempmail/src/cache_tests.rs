// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::{Duration, SystemTime};

use crate::test_support::detail;

use super::*;

fn open_temp() -> anyhow::Result<(tempfile::TempDir, DetailCache)> {
    let dir = tempfile::tempdir()?;
    let cache = DetailCache::open(dir.path().join("nested/cache"))?;
    Ok((dir, cache))
}

#[test]
fn open_creates_directory() -> anyhow::Result<()> {
    let (_dir, cache) = open_temp()?;
    assert!(cache.dir().is_dir());
    Ok(())
}

#[test]
fn put_then_get() -> anyhow::Result<()> {
    let (_dir, cache) = open_temp()?;
    assert_eq!(cache.get("m1"), None);

    cache.put(&detail("m1"))?;
    assert_eq!(cache.get("m1"), Some(detail("m1")));
    assert!(cache.dir().join("m1.json").is_file());
    Ok(())
}

#[test]
fn put_overwrites_and_leaves_no_temp_files() -> anyhow::Result<()> {
    let (_dir, cache) = open_temp()?;
    let mut d = detail("m1");
    cache.put(&d)?;
    d.subject = "edited".to_owned();
    cache.put(&d)?;

    assert_eq!(cache.get("m1").map(|d| d.subject), Some("edited".to_owned()));
    let names: Vec<_> = std::fs::read_dir(cache.dir())?
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["m1.json"]);
    Ok(())
}

#[test]
fn corrupt_entry_is_a_miss() -> anyhow::Result<()> {
    let (_dir, cache) = open_temp()?;
    std::fs::write(cache.dir().join("bad.json"), "{ not json")?;
    assert_eq!(cache.get("bad"), None);
    Ok(())
}

#[yare::parameterized(
    empty = { "" },
    dot = { "." },
    dotdot = { ".." },
    hidden = { ".m1" },
    slash = { "a/b" },
    traversal = { "../m1" },
    backslash = { "a\\b" },
    nul = { "a\0b" },
)]
fn invalid_ids_are_rejected(id: &str) {
    assert!(!is_valid_id(id));
}

#[test]
fn put_rejects_invalid_id() -> anyhow::Result<()> {
    let (_dir, cache) = open_temp()?;
    crate::assert_err_contains!(cache.put(&detail("../escape")), "invalid message id");
    assert_eq!(cache.get("../escape"), None);
    Ok(())
}

#[test]
fn history_lists_newest_first_and_skips_junk() -> anyhow::Result<()> {
    let (_dir, cache) = open_temp()?;
    cache.put(&detail("old"))?;
    cache.put(&detail("new"))?;
    std::fs::write(cache.dir().join("junk.json"), "[]")?;
    std::fs::write(cache.dir().join("notes.txt"), "ignored")?;

    let now = SystemTime::now();
    for (id, age) in [("old", 60), ("new", 1)] {
        let file = std::fs::File::options().write(true).open(cache.dir().join(format!("{id}.json")))?;
        file.set_modified(now - Duration::from_secs(age))?;
    }

    let history = cache.history()?;
    let ids: Vec<_> = history.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["new", "old"]);
    assert!(history.iter().all(|m| m.seen && m.size == 0 && m.mailbox.is_empty()));
    assert_eq!(history[0].subject, "subject new");
    Ok(())
}

#[test]
fn history_of_empty_cache_is_empty() -> anyhow::Result<()> {
    let (_dir, cache) = open_temp()?;
    assert!(cache.history()?.is_empty());
    Ok(())
}
