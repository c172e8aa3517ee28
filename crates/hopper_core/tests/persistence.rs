use hopper_core::{
    DayKey, JsonFileStore, NormalizeContext, PersistQueue, Registry, RegistryDocument, Task,
};
use std::io::ErrorKind;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const SNAPSHOTS: i64 = 250;

fn snapshot(revision: i64) -> RegistryDocument {
    let today = DayKey::parse("2025-09-01").expect("fixture day key should parse");
    let mut registry = Registry::empty(0);
    for index in 0..(revision % 7) {
        let mut task = Task::new(format!("task {index}"), None, today, revision);
        task.hopper = 0.25 * index as f64;
        registry.tasks.push(task);
    }
    registry.touch(revision);
    registry.to_document()
}

#[test]
fn readers_never_observe_a_partial_snapshot() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let path = dir.path().join("data").join("hopper_state.json");
    let queue = PersistQueue::start(JsonFileStore::new(&path)).expect("queue should start");

    let done = Arc::new(AtomicBool::new(false));
    let reader = {
        let done = Arc::clone(&done);
        let path = path.clone();
        std::thread::spawn(move || {
            let mut parsed = 0_u64;
            while !done.load(Ordering::SeqCst) {
                match std::fs::read(&path) {
                    Ok(bytes) => {
                        let document: RegistryDocument = serde_json::from_slice(&bytes)
                            .unwrap_or_else(|err| panic!("torn snapshot: {err}"));
                        assert_eq!(document.version, 1);
                        parsed += 1;
                    }
                    Err(err) if err.kind() == ErrorKind::NotFound => {}
                    Err(err) => panic!("unexpected read error: {err}"),
                }
            }
            parsed
        })
    };

    let mut last = None;
    for revision in 1..=SNAPSHOTS {
        let document = snapshot(revision);
        queue.enqueue(document.clone());
        last = Some(document);
    }
    queue.flush();
    done.store(true, Ordering::SeqCst);
    reader.join().expect("reader thread should not panic");

    let stats = queue.stats();
    assert_eq!(stats.enqueued, SNAPSHOTS as u64);
    assert_eq!(stats.completed, SNAPSHOTS as u64);
    assert_eq!(stats.failed, 0);

    let on_disk: RegistryDocument =
        serde_json::from_slice(&std::fs::read(&path).expect("snapshot should exist"))
            .expect("snapshot should be valid JSON");
    assert_eq!(Some(on_disk), last);
    assert!(!path.with_extension("tmp").exists());
}

#[test]
fn failed_writes_are_counted_and_later_writes_still_land() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"not a directory").expect("blocker file should be written");

    // Parent is a regular file, so every write to this path fails.
    let broken = PersistQueue::start(JsonFileStore::new(blocker.join("state.json")))
        .expect("queue should start");
    broken.enqueue(snapshot(1));
    broken.enqueue(snapshot(2));
    broken.flush();
    assert_eq!(broken.stats().failed, 2);
    assert_eq!(broken.stats().completed, 0);

    let path = dir.path().join("state.json");
    let healthy = PersistQueue::start(JsonFileStore::new(&path)).expect("queue should start");
    healthy.enqueue(snapshot(3));
    drop(healthy);

    let store = JsonFileStore::new(&path);
    let ctx = NormalizeContext {
        today: DayKey::parse("2025-09-01").expect("fixture day key should parse"),
        now_ms: 99,
    };
    let registry = store.load(&ctx);
    assert_eq!(registry.updated_at, 3);
    assert_eq!(registry.tasks.len(), 3);
}
