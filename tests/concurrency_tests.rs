mod common;

use common::fixtures::downloads_map;
use http::Method;
use routemap::router::{Map, MapAdapter, Rule, SharedMap};
use routemap::values;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn test_router_types_are_thread_safe() {
    assert_send_sync::<Map>();
    assert_send_sync::<MapAdapter>();
    assert_send_sync::<SharedMap>();
    assert_send_sync::<Rule>();
}

#[test]
fn test_shared_adapter_across_threads() {
    let map = downloads_map();
    let urls = Arc::new(map.bind("localhost"));

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let urls = Arc::clone(&urls);
            thread::spawn(move || {
                for i in 0..500_i64 {
                    let id = t * 1_000 + i;
                    let path = urls
                        .build("downloads/show", &values! { "id" => id }, None, false)
                        .unwrap();
                    let (endpoint, values) = urls.match_path(&path, &Method::GET).unwrap();
                    assert_eq!(endpoint, "downloads/show");
                    assert_eq!(values, values! { "id" => id });
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_concurrent_binds_share_one_snapshot() {
    let map = Arc::new(downloads_map());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let map = Arc::clone(&map);
            thread::spawn(move || {
                let urls = map.bind("localhost");
                urls.match_path("/about", &Method::GET).unwrap().0
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), "about");
    }
    assert!(Arc::ptr_eq(&map.update(), &map.update()));
}

#[test]
fn test_readers_see_whole_tables_during_replace() {
    let version = |n: i64| {
        let mut map = Map::new();
        map.add(Rule::new("/version", "version").defaults(values! { "n" => n }))
            .unwrap();
        map.add(Rule::new(format!("/only/{n}"), format!("only_{n}")))
            .unwrap();
        map
    };

    let shared = Arc::new(SharedMap::new(version(0)));
    let stop = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let shared = Arc::clone(&shared);
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                let mut checks = 0_u64;
                while !stop.load(Ordering::Relaxed) || checks == 0 {
                    let urls = shared.bind("localhost");
                    let (_, values) = urls.match_path("/version", &Method::GET).unwrap();
                    let n = values["n"].as_i64().unwrap();
                    // the version rule and its sibling always come from the same table
                    let only = format!("/only/{n}");
                    assert_eq!(
                        urls.match_path(&only, &Method::GET).unwrap().0,
                        format!("only_{n}")
                    );
                    checks += 1;
                }
                checks
            })
        })
        .collect();

    for n in 1..=50 {
        shared.replace(version(n));
    }
    stop.store(true, Ordering::Relaxed);

    for reader in readers {
        assert!(reader.join().unwrap() > 0);
    }
    let urls = shared.bind("localhost");
    assert_eq!(
        urls.match_path("/version", &Method::GET).unwrap().1,
        values! { "n" => 50 }
    );
}
