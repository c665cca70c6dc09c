//! Listings across page boundaries.

mod common;

use std::collections::HashSet;
use std::sync::Arc;

use bucketfs_core::store::{MAX_LIST_PAGE, ObjectStore};
use bucketfs_core::{AttributeKind, FileSystem, FsConfig, FsError, ObjectListing};
use common::{BUCKET, bpath, path, seeded_fs, seeded_store};

fn many_keys(prefix: &str, n: usize) -> Vec<String> {
    (0..n).map(|i| format!("{prefix}{i:05}")).collect()
}

#[test]
fn test_1050_objects_yield_1050_entries() {
    let keys = many_keys("", 1050);
    let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
    let fs = seeded_fs(&refs);

    let entries: Vec<_> = fs
        .list_directory(&path("/bucket"))
        .unwrap()
        .map(Result::unwrap)
        .collect();
    assert_eq!(entries.len(), 1050);

    let distinct: HashSet<_> = entries.iter().map(|e| e.path.clone()).collect();
    assert_eq!(distinct.len(), 1050);
    assert!(entries.windows(2).all(|w| w[0].path < w[1].path));

    // two pages from the listing, plus the directory probe
    assert!(fs.store().calls().list_objects >= 2);
}

#[test]
fn test_raw_listing_respects_store_page_limit() {
    let store = seeded_store(&[]);
    for key in many_keys("p/", 2 * MAX_LIST_PAGE + 5) {
        store.put_object(BUCKET, &key, b"").unwrap();
    }
    store.reset_calls();

    let mut listing = ObjectListing::new(Arc::clone(&store), BUCKET, "p/").with_page_size(5000);
    assert_eq!(listing.by_ref().count(), 2 * MAX_LIST_PAGE + 5);
    assert_eq!(listing.pages_fetched(), 3);
    assert_eq!(store.calls().list_objects, 3);
}

#[test]
fn test_small_pages_keep_order() {
    let store = seeded_store(&["d/a", "d/b/x", "d/b/y", "d/c", "d/e/f/g"]);
    let fs = FileSystem::new(store, FsConfig::local().with_list_page_size(1));

    let names: Vec<String> = fs
        .list_directory(&bpath("d"))
        .unwrap()
        .map(|e| e.unwrap().path.to_string())
        .collect();
    assert_eq!(names, ["/bucket/d/a", "/bucket/d/b/", "/bucket/d/c", "/bucket/d/e/"]);
}

#[test]
fn test_listing_warms_cache() {
    let fs = seeded_fs(&["d/one", "d/two"]);
    let count = fs.list_directory(&bpath("d/")).unwrap().count();
    assert_eq!(count, 2);

    fs.store().reset_calls();
    let attrs = fs
        .read_attributes(&bpath("d/one"), AttributeKind::Basic)
        .unwrap();
    assert_eq!(attrs.size, 5);
    assert_eq!(fs.store().calls().metadata_reads(), 0);
}

#[test]
fn test_list_requires_directory() {
    let fs = seeded_fs(&["file"]);
    assert!(matches!(
        fs.list_directory(&bpath("file")).map(|_| ()),
        Err(FsError::InvalidArgument { .. })
    ));
    assert!(fs
        .list_directory(&bpath("missing/"))
        .map(|_| ())
        .unwrap_err()
        .is_not_found());
}

#[test]
fn test_walk_visits_everything_once() {
    let fs = seeded_fs(&["r/a/1", "r/a/2", "r/b/c/3", "r/b/", "r/top"]);
    let walked: Vec<String> = fs
        .walk(&bpath("r"))
        .unwrap()
        .map(|e| e.unwrap().path.to_string())
        .collect();
    assert_eq!(
        walked,
        [
            "/bucket/r/a/",
            "/bucket/r/a/1",
            "/bucket/r/a/2",
            "/bucket/r/b/",
            "/bucket/r/b/c/",
            "/bucket/r/b/c/3",
            "/bucket/r/top",
        ]
    );
}

#[test]
fn test_listing_error_surfaces() {
    let fs = seeded_fs(&["d/x"]);
    let mut entries = fs.list_directory(&bpath("d")).unwrap();
    fs.store().set_unavailable(true);
    assert!(matches!(entries.next(), Some(Err(FsError::Store(_)))));
    assert!(entries.next().is_none());

    fs.store().set_unavailable(false);
    entries.restart();
    assert_eq!(entries.count(), 1);
}
