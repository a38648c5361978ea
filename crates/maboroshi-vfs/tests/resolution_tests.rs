//! End-to-end resolution tests: generator registration, directory
//! synthesis, prefix matching, serve namespaces, and the root merge.

use maboroshi_vfs::{
    backends::MemoryFs, DirEntry, FileOutput, FileType, GenFs, Generator, VfsError,
};

fn static_file(content: &'static str) -> Generator {
    Generator::file(move |_| async move { Ok(FileOutput::new(content.as_bytes().to_vec())) })
}

fn site_generator() -> Generator {
    Generator::dir(|mut dir| async move {
        dir.generate_file("index.html", |_| async {
            Ok(FileOutput::new(b"<h1>hi</h1>".to_vec()))
        });
        dir.generate_file("about/about.html", |_| async {
            Ok(FileOutput::new(b"<h2>about</h2>".to_vec()))
        });
        Ok(dir)
    })
}

#[tokio::test]
async fn test_site_scenario() {
    let fs = GenFs::new();
    fs.add([("site", site_generator())]);

    // Listing: about/ is implied by the nested registration
    let entries = fs.read_dir("site").await.unwrap();
    let summary: Vec<_> = entries.iter().map(|e| (e.name.as_str(), e.kind)).collect();
    assert_eq!(
        summary,
        vec![
            ("about", FileType::Directory),
            ("index.html", FileType::File)
        ]
    );

    // Contents resolve through the scoped index
    assert_eq!(fs.read_file("site/index.html").await.unwrap(), b"<h1>hi</h1>");
    assert_eq!(
        fs.read_file("site/about/about.html").await.unwrap(),
        b"<h2>about</h2>"
    );

    // The implied directory stats as a directory
    let attr = fs.stat("site/about").await.unwrap();
    assert!(attr.is_dir());
    assert_eq!(attr.size, 0);
}

#[tokio::test]
async fn test_partial_segment_never_matches() {
    let fs = GenFs::new();
    fs.add([("view", site_generator())]);

    assert!(fs.open("viewer").await.unwrap_err().is_not_exist());
    assert!(fs.open("viewer/x").await.unwrap_err().is_not_exist());
    assert!(fs.open("view").await.is_ok());
}

#[tokio::test]
async fn test_listing_determinism() {
    let fs = GenFs::new();
    fs.add([
        ("d/z.txt", static_file("z")),
        ("d/a.txt", static_file("a")),
        ("d/sub/x.txt", static_file("x")),
    ]);

    let first = fs.read_dir("d").await.unwrap();
    let second = fs.read_dir("d").await.unwrap();
    assert_eq!(first, second);

    let names: Vec<_> = first.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["a.txt", "sub", "z.txt"]);
}

#[tokio::test]
async fn test_serve_namespace() {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let fs = GenFs::new();
    fs.add([(
        "assets",
        Generator::serve(move |_, rel| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(format!("served:{}", rel).into_bytes())
            }
        }),
    )]);

    // Any path under the prefix serves, even ones never declared
    assert_eq!(
        fs.read_file("assets/css/app.css").await.unwrap(),
        b"served:css/app.css"
    );
    assert_eq!(fs.read_file("assets/x.js").await.unwrap(), b"served:x.js");

    // Serve results are never memoized: every request recomputes
    assert_eq!(fs.read_file("assets/x.js").await.unwrap(), b"served:x.js");
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    // Listing a serve-owned path is an invalid operation, not a missing path
    let err = fs.read_dir("assets").await.unwrap_err();
    assert!(err.is_invalid_op());
    let err = fs.read_dir("assets/css").await.unwrap_err();
    assert!(err.is_invalid_op());
}

#[tokio::test]
async fn test_root_merge_with_real_fs() {
    let real = MemoryFs::new()
        .with_file("r.txt", b"from disk".to_vec())
        .with_file("shared.txt", b"disk version".to_vec());

    let fs = GenFs::overlay(real);
    fs.add([
        ("gen.go", static_file("package gen")),
        ("shared.txt", static_file("generator version")),
    ]);

    let entries = fs.read_dir(".").await.unwrap();
    let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
    // Sorted, no duplicate for shared.txt
    assert_eq!(names, vec!["gen.go", "r.txt", "shared.txt"]);

    // On a name collision the generator wins
    assert_eq!(
        fs.read_file("shared.txt").await.unwrap(),
        b"generator version"
    );
    // Non-generator roots fall through to the real side
    assert_eq!(fs.read_file("r.txt").await.unwrap(), b"from disk");
}

#[tokio::test]
async fn test_nested_dir_generators() {
    let fs = GenFs::new();
    fs.add([(
        "app",
        Generator::dir(|mut dir| async move {
            dir.generate_dir("pages", |mut pages| async move {
                pages.generate_file("home.html", |_| async {
                    Ok(FileOutput::new(b"<home>".to_vec()))
                });
                Ok(pages)
            });
            dir.generate_file("app.js", |_| async {
                Ok(FileOutput::new(b"console.log(1)".to_vec()))
            });
            Ok(dir)
        }),
    )]);

    assert_eq!(
        fs.read_file("app/pages/home.html").await.unwrap(),
        b"<home>"
    );

    let entries = fs.read_dir("app").await.unwrap();
    let summary: Vec<_> = entries.iter().map(|e| (e.name.as_str(), e.kind)).collect();
    assert_eq!(
        summary,
        vec![
            ("app.js", FileType::File),
            ("pages", FileType::Directory)
        ]
    );
}

#[tokio::test]
async fn test_declared_entries_merge_into_listing() {
    let fs = GenFs::new();
    fs.add([(
        "docs",
        Generator::dir(|mut dir| async move {
            dir.generate_file("readme.md", |_| async {
                Ok(FileOutput::new(b"# docs".to_vec()))
            });
            dir.entry(DirEntry::directory("media"));
            // A declaration colliding with a registration loses
            dir.entry(DirEntry::directory("readme.md"));
            Ok(dir)
        }),
    )]);

    let entries = fs.read_dir("docs").await.unwrap();
    let summary: Vec<_> = entries.iter().map(|e| (e.name.as_str(), e.kind)).collect();
    assert_eq!(
        summary,
        vec![
            ("media", FileType::Directory),
            ("readme.md", FileType::File)
        ]
    );
}

#[tokio::test]
async fn test_flat_registrations_merge_into_dir_generator_listing() {
    let fs = GenFs::new();
    fs.add([
        ("site", site_generator()),
        ("site/extra.txt", static_file("extra")),
    ]);

    let entries = fs.read_dir("site").await.unwrap();
    let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["about", "extra.txt", "index.html"]);

    // The flat registration resolves ahead of the directory generator
    assert_eq!(fs.read_file("site/extra.txt").await.unwrap(), b"extra");
}

#[tokio::test]
async fn test_handle_reports_requested_path() {
    let fs = GenFs::new();
    fs.add([(
        "echo",
        Generator::dir(|mut dir| async move {
            dir.generate_file("me.txt", |requested| async move {
                Ok(FileOutput::new(requested.into_bytes()))
            });
            Ok(dir)
        }),
    )]);

    let handle = fs.open("echo/me.txt").await.unwrap();
    assert_eq!(handle.path(), "echo/me.txt");
    // The generator saw the caller's path, not its scoped remainder
    assert_eq!(fs.read_file("echo/me.txt").await.unwrap(), b"echo/me.txt");
}

#[tokio::test]
async fn test_path_below_file_is_missing() {
    let fs = GenFs::new();
    fs.add([("a/file.txt", static_file("x"))]);
    let err = fs.open("a/file.txt/deeper").await.unwrap_err();
    assert!(err.is_not_exist());
}

#[tokio::test]
async fn test_generator_failure_is_wrapped_with_path() {
    let fs = GenFs::new();
    fs.add([(
        "broken/out.css",
        Generator::file(|_| async { Err(VfsError::other("sass exited with status 1")) }),
    )]);

    let err = fs.read_file("broken/out.css").await.unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("broken/out.css"));
    assert!(msg.contains("sass exited with status 1"));
    assert!(!err.is_not_exist());
}

#[tokio::test]
async fn test_empty_fs_root_is_listable() {
    let fs = GenFs::new();
    let entries = fs.read_dir(".").await.unwrap();
    assert!(entries.is_empty());
    assert!(fs.stat(".").await.unwrap().is_dir());
}
