//! Memoization, invalidation, dependency propagation, and notification.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use maboroshi_vfs::{ChangeSet, FileOutput, GenFs, Generator, VfsError};

#[tokio::test]
async fn test_concurrent_resolution_invokes_generator_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let fs = Arc::new(GenFs::new());
    fs.add([(
        "slow/out.js",
        Generator::file(move |_| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                Ok(FileOutput::new(b"bundled".to_vec()))
            }
        }),
    )]);

    let mut handles = Vec::new();
    for _ in 0..16 {
        let fs = Arc::clone(&fs);
        handles.push(tokio::spawn(
            async move { fs.read_file("slow/out.js").await },
        ));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), b"bundled");
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_invalidation_round_trip() {
    let input = Arc::new(Mutex::new("v1".to_string()));
    let source = Arc::clone(&input);

    let fs = GenFs::new();
    fs.add([(
        "out/page.html",
        Generator::file(move |_| {
            let source = Arc::clone(&source);
            async move {
                let current = source.lock().unwrap().clone();
                Ok(FileOutput::new(current.into_bytes()))
            }
        }),
    )]);

    assert_eq!(fs.read_file("out/page.html").await.unwrap(), b"v1");

    // The underlying input changes, but the memo still answers
    *input.lock().unwrap() = "v2".to_string();
    assert_eq!(fs.read_file("out/page.html").await.unwrap(), b"v1");

    // Explicit invalidation busts exactly this path
    assert_eq!(fs.invalidate(["out/page.html"]), 1);
    assert_eq!(fs.read_file("out/page.html").await.unwrap(), b"v2");
}

#[tokio::test]
async fn test_failed_generator_is_not_retried_until_invalidated() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let fs = GenFs::new();
    fs.add([(
        "flaky/out.js",
        Generator::file(move |_| {
            let counter = Arc::clone(&counter);
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                if n == 0 {
                    Err(VfsError::other("transient compiler failure"))
                } else {
                    Ok(FileOutput::new(b"recovered".to_vec()))
                }
            }
        }),
    )]);

    assert!(fs.read_file("flaky/out.js").await.is_err());
    // Still the cached failure, no re-invocation
    assert!(fs.read_file("flaky/out.js").await.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    fs.invalidate(["flaky/out.js"]);
    assert_eq!(fs.read_file("flaky/out.js").await.unwrap(), b"recovered");
}

#[tokio::test]
async fn test_dir_generator_runs_once_per_resolution_cycle() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let fs = GenFs::new();
    fs.add([(
        "site",
        Generator::dir(move |mut dir| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                dir.generate_file("a.html", |_| async { Ok(FileOutput::new(b"a".to_vec())) });
                dir.generate_file("b.html", |_| async { Ok(FileOutput::new(b"b".to_vec())) });
                Ok(dir)
            }
        }),
    )]);

    fs.read_dir("site").await.unwrap();
    fs.read_file("site/a.html").await.unwrap();
    fs.read_file("site/b.html").await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    fs.invalidate(["site"]);
    fs.read_file("site/a.html").await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_watch_declarations_feed_the_graph() {
    let fs = GenFs::new();
    fs.add([(
        "pages",
        Generator::dir(|mut dir| async move {
            dir.generate_file("index.html", |_| async {
                Ok(FileOutput::new(b"<p>hi</p>".to_vec()))
            });
            dir.watch("view/*.svelte", ChangeSet::WRITE | ChangeSet::REMOVE);
            Ok(dir)
        }),
    )]);

    // Watches are only known once the generator runs
    assert!(fs.trigger("view/index.svelte", ChangeSet::WRITE).is_empty());

    fs.read_dir("pages").await.unwrap();
    let affected = fs.trigger("view/index.svelte", ChangeSet::WRITE);
    assert_eq!(affected, vec!["pages"]);

    // A change kind the watch did not declare does not propagate
    assert!(fs.trigger("view/index.svelte", ChangeSet::CREATE).is_empty());
}

#[tokio::test]
async fn test_trigger_walks_transitive_closure_nearest_first() {
    let fs = GenFs::new();
    fs.add([("out/a.js", Generator::file(|_| async { Ok(FileOutput::new(b"a".to_vec())) }))]);

    // A depends on x; B depends on A
    fs.graph().link("out/a.js", "src/x.go", ChangeSet::all());
    fs.graph().link("out/b.js", "out/a.js", ChangeSet::all());

    let affected = fs.trigger("src/x.go", ChangeSet::WRITE);
    assert_eq!(affected, vec!["out/a.js", "out/b.js"]);
}

#[tokio::test]
async fn test_trigger_publishes_to_subscribers() {
    let fs = GenFs::new();
    fs.add([(
        "out/app.js",
        Generator::file(|_| async { Ok(FileOutput::new(b"app".to_vec())) }),
    )]);
    fs.graph().link("out/app.js", "src/**/*.go", ChangeSet::WRITE);

    let mut sub = fs.subscribe("out/app.js").await.unwrap();

    let affected = fs.trigger("src/web/web.go", ChangeSet::WRITE);
    assert_eq!(affected, vec!["out/app.js"]);

    let event = sub.recv().await.expect("event expected");
    assert_eq!(event.path, "out/app.js");
    assert_eq!(event.changes, ChangeSet::WRITE);
}

#[tokio::test]
async fn test_subscribe_requires_resolvable_path() {
    let fs = GenFs::new();
    let err = fs.subscribe("never/registered.js").await.unwrap_err();
    assert!(err.is_not_exist());
}

#[tokio::test]
async fn test_literal_pattern_ordering_on_trigger() {
    let fs = GenFs::new();
    // Both a literal and a glob watch match the same concrete path, through
    // different generated artifacts.
    fs.graph().link("out/exact.js", "view/home.svelte", ChangeSet::WRITE);
    fs.graph().link("out/glob.js", "view/*.svelte", ChangeSet::WRITE);

    let affected = fs.trigger("view/home.svelte", ChangeSet::WRITE);
    // Literal pattern resolves first, so its dependents lead
    assert_eq!(affected, vec!["out/exact.js", "out/glob.js"]);
}

#[tokio::test]
async fn test_exists_all_joins_failures() {
    let fs = GenFs::new();
    fs.add([(
        "ok.txt",
        Generator::file(|_| async { Ok(FileOutput::new(b"ok".to_vec())) }),
    )]);

    assert!(fs.exists_all(&["ok.txt"]).await.is_ok());

    let err = fs
        .exists_all(&["ok.txt", "missing/a.txt", "missing/b.txt"])
        .await
        .unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("missing/a.txt"));
    assert!(msg.contains("missing/b.txt"));
    assert!(err.is_not_exist());
}

#[tokio::test]
async fn test_invalidate_is_scoped_to_named_paths() {
    let calls = Arc::new(AtomicUsize::new(0));

    let fs = GenFs::new();
    for name in ["out/a.js", "out/b.js"] {
        let counter = Arc::clone(&calls);
        fs.add([(
            name,
            Generator::file(move |p| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(FileOutput::new(p.into_bytes()))
                }
            }),
        )]);
    }

    fs.read_file("out/a.js").await.unwrap();
    fs.read_file("out/b.js").await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    fs.invalidate(["out/a.js"]);
    fs.read_file("out/a.js").await.unwrap();
    fs.read_file("out/b.js").await.unwrap();
    // Only a.js recomputed
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}
