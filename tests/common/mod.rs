#![allow(dead_code)]

pub mod temp_files {
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::{SystemTime, UNIX_EPOCH};

    // Global counter and lock for thread-safe temporary file creation
    static TEMP_COUNTER: AtomicUsize = AtomicUsize::new(0);
    static TEMP_LOCK: Mutex<()> = Mutex::new(());

    /// Creates a route file with a unique name; `ext` selects the format
    pub fn create_temp_routes(content: &str, ext: &str) -> PathBuf {
        let _lock = TEMP_LOCK.lock().unwrap();
        let counter = TEMP_COUNTER.fetch_add(1, Ordering::SeqCst);
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();

        let path = std::env::temp_dir().join(format!(
            "routemap_test_{}_{}_{}.{}",
            std::process::id(),
            counter,
            nanos,
            ext
        ));

        std::fs::write(&path, content).unwrap();
        path
    }

    pub fn create_temp_yaml(content: &str) -> PathBuf {
        create_temp_routes(content, "yaml")
    }

    pub fn create_temp_json(content: &str) -> PathBuf {
        create_temp_routes(content, "json")
    }

    pub fn create_temp_toml(content: &str) -> PathBuf {
        create_temp_routes(content, "toml")
    }

    /// Cleanup temporary files (best effort)
    pub fn cleanup_temp_files(paths: &[PathBuf]) {
        for path in paths {
            let _ = std::fs::remove_file(path);
        }
    }
}

pub mod fixtures {
    use http::Method;
    use routemap::router::{Map, Rule};
    use routemap::values;

    /// The table used throughout the matching tests.
    pub fn downloads_map() -> Map {
        let mut map = Map::new();
        map.add(Rule::new("/", "index")).unwrap();
        map.add(Rule::new("/about", "about")).unwrap();
        map.add(Rule::new("/downloads/", "downloads/index")).unwrap();
        map.add(Rule::new("/downloads/<int:id>", "downloads/show"))
            .unwrap();
        map.add(Rule::new("/all/", "all").defaults(values! { "page" => 1 }))
            .unwrap();
        map.add(Rule::new("/all/page/<int:page>", "all")).unwrap();
        map.add(Rule::new("/submit", "submit").methods([Method::POST]))
            .unwrap();
        map
    }
}
