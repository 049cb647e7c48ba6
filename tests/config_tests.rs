mod common;

use common::temp_files;
use http::Method;
use routemap::config::{load_route_file, load_routes, parse_routes, RouteFormat};
use routemap::router::{RoutingError, Value};
use routemap::values;

const YAML_ROUTES: &str = r#"
rules:
  - rule: /
    endpoint: index
  - rule: /downloads/
    endpoint: downloads/index
  - rule: /downloads/<int:id>
    endpoint: downloads/show
    methods: [get]
  - rule: /all/
    endpoint: all
    defaults:
      page: 1
  - rule: /all/page/<int:page>
    endpoint: all
  - rule: /old/<int:id>
    endpoint: old
    redirect_to: /downloads/<id>
groups:
  - submount: /api
    endpoint_prefix: "api."
    rules:
      - rule: /status
        endpoint: status
    groups:
      - subdomain: admin
        rules:
          - rule: /users/<int:id>
            endpoint: user
            methods: [GET, DELETE]
"#;

const JSON_ROUTES: &str = r#"{
  "strict_slashes": false,
  "rules": [
    { "rule": "/docs/", "endpoint": "docs" },
    { "rule": "/price/<float:value>", "endpoint": "price", "defaults": { "currency": "EUR" } }
  ]
}"#;

const TOML_ROUTES: &str = r#"
redirect_defaults = false
default_subdomain = "www"

[[rules]]
rule = "/all/"
endpoint = "all"
defaults = { page = 1 }

[[rules]]
rule = "/all/page/<int:page>"
endpoint = "all"

[[groups]]
subdomain = "static"

[[groups.rules]]
rule = "/<path:file>"
endpoint = "static"
build_only = true
"#;

#[test]
fn test_load_yaml_routes() {
    let path = temp_files::create_temp_yaml(YAML_ROUTES);
    let map = load_routes(&path).unwrap();
    temp_files::cleanup_temp_files(&[path]);

    assert_eq!(map.rule_count(), 8);
    let urls = map.bind("example.com");

    assert_eq!(
        urls.match_path("/downloads/42", &Method::GET).unwrap(),
        ("downloads/show".to_string(), values! { "id" => 42 })
    );
    assert_eq!(
        urls.match_path("/downloads/42", &Method::POST),
        Err(RoutingError::MethodNotAllowed {
            allowed: vec![Method::GET, Method::HEAD]
        })
    );
    assert_eq!(
        urls.match_path("/all/page/1", &Method::GET)
            .unwrap_err()
            .location(),
        Some("http://example.com/all/")
    );
    assert_eq!(
        urls.match_path("/old/3", &Method::GET)
            .unwrap_err()
            .location(),
        Some("http://example.com/downloads/3")
    );

    assert_eq!(
        urls.match_path("/api/status", &Method::GET).unwrap().0,
        "api.status"
    );
    assert_eq!(
        urls.build("api.user", &values! { "id" => 5 }, Some(&Method::DELETE), false)
            .unwrap(),
        "http://admin.example.com/api/users/5"
    );
}

#[test]
fn test_load_json_routes() {
    let path = temp_files::create_temp_json(JSON_ROUTES);
    let map = load_routes(&path).unwrap();
    temp_files::cleanup_temp_files(&[path]);

    assert!(!map.config().strict_slashes);
    let urls = map.bind("localhost");
    assert_eq!(urls.match_path("/docs", &Method::GET).unwrap().0, "docs");

    let (endpoint, values) = urls.match_path("/price/9.5", &Method::GET).unwrap();
    assert_eq!(endpoint, "price");
    assert_eq!(values["value"], Value::Float(9.5));
    assert_eq!(values["currency"], Value::from("EUR"));
}

#[test]
fn test_load_toml_routes() {
    let path = temp_files::create_temp_toml(TOML_ROUTES);
    let map = load_routes(&path).unwrap();
    temp_files::cleanup_temp_files(&[path]);

    assert!(!map.config().redirect_defaults);
    assert_eq!(map.config().default_subdomain, "www");

    let urls = map.bind("example.com");
    assert_eq!(urls.subdomain(), "www");
    assert_eq!(
        urls.match_path("/all/page/1", &Method::GET).unwrap().1,
        values! { "page" => 1 }
    );
    assert_eq!(
        urls.build("static", &values! { "file" => "css/site.css" }, None, false)
            .unwrap(),
        "http://static.example.com/css/site.css"
    );
    let cdn = map.bind("example.com").with_subdomain("static");
    assert_eq!(
        cdn.match_path("/css/site.css", &Method::GET),
        Err(RoutingError::NotFound)
    );
}

#[test]
fn test_route_file_parses_the_same_in_every_format() {
    let yaml = parse_routes(
        "rules:\n  - rule: /a/<int:id>\n    endpoint: a\n    defaults: { x: 1.5, y: text }\n",
        RouteFormat::Yaml,
    )
    .unwrap();
    let json = parse_routes(
        r#"{"rules": [{"rule": "/a/<int:id>", "endpoint": "a", "defaults": {"x": 1.5, "y": "text"}}]}"#,
        RouteFormat::Json,
    )
    .unwrap();
    let toml = parse_routes(
        "[[rules]]\nrule = \"/a/<int:id>\"\nendpoint = \"a\"\ndefaults = { x = 1.5, y = \"text\" }\n",
        RouteFormat::Toml,
    )
    .unwrap();

    assert_eq!(yaml, json);
    assert_eq!(json, toml);
}

#[test]
fn test_invalid_route_files() {
    let unknown_converter = temp_files::create_temp_yaml(
        "rules:\n  - rule: /x/<bogus:id>\n    endpoint: x\n",
    );
    let err = load_routes(&unknown_converter).unwrap_err();
    assert!(format!("{err:#}").contains("unknown converter 'bogus'"));

    let no_slash = temp_files::create_temp_yaml("rules:\n  - rule: x\n    endpoint: x\n");
    let err = load_routes(&no_slash).unwrap_err();
    assert!(format!("{err:#}").contains("leading slash"));

    let bad_method = temp_files::create_temp_json(
        r#"{"rules": [{"rule": "/x", "endpoint": "x", "methods": ["GE T"]}]}"#,
    );
    let err = load_routes(&bad_method).unwrap_err();
    assert!(format!("{err:#}").contains("invalid method"));

    let bad_syntax = temp_files::create_temp_toml("[[rules]\nrule = ");
    let err = load_routes(&bad_syntax).unwrap_err();
    assert!(format!("{err:#}").contains("invalid TOML route file"));

    temp_files::cleanup_temp_files(&[unknown_converter, no_slash, bad_method, bad_syntax]);

    let unsupported = temp_files::create_temp_routes("rules: []", "ini");
    assert!(load_route_file(&unsupported).is_err());
    temp_files::cleanup_temp_files(&[unsupported]);

    assert!(load_routes("/nonexistent/routes.yaml").is_err());
}
