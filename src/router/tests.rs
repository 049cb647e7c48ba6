use super::pattern::{compile, PatternSpec};
use super::*;
use crate::values;
use http::Method;
use std::sync::Arc;

fn bound(rule: Rule) -> Rule {
    let mut rule = rule;
    rule.bind_with(&MapConfig::default()).unwrap();
    rule
}

fn compiled_regex(rule: &str, subdomain: &str) -> String {
    let pattern = compile(
        &PatternSpec {
            rule,
            subdomain,
            is_leaf: !rule.ends_with('/'),
            strict_slashes: true,
            build_only: false,
        },
        &ConverterRegistry::builtin(),
    )
    .unwrap();
    pattern.regex.unwrap().as_str().to_string()
}

#[test]
fn test_tokenize_mixed_template() {
    let tokens = tokenize("/archive/<int(fixed_digits=4):year>/<slug>").unwrap();
    assert_eq!(
        tokens,
        vec![
            Token::Literal("/archive/".into()),
            Token::Variable {
                converter: Some("int".into()),
                args: Some("fixed_digits=4".into()),
                name: "year".into(),
            },
            Token::Literal("/".into()),
            Token::Variable {
                converter: None,
                args: None,
                name: "slug".into(),
            },
        ]
    );
}

#[test]
fn test_tokenize_rejects_malformed() {
    assert!(tokenize("/a/<id").is_err());
    assert!(tokenize("/a/id>").is_err());
    assert!(tokenize("/a/<1abc>").is_err());
    assert!(tokenize("/a/<int id>").is_err());
    assert!(tokenize("/a/<any(x:name>").is_err());
}

#[test]
fn test_suffix_group_name_is_reserved() {
    assert!(tokenize("/a/<__suffix__>").is_err());
    assert!(tokenize("/a/<int:__suffix__>").is_err());

    let config = MapConfig::default();
    let mut rule = Rule::new("/files/<__suffix__>/", "x");
    assert!(matches!(
        rule.bind_with(&config),
        Err(RuleError::MalformedRule { reason, .. }) if reason.contains("reserved")
    ));
}

#[test]
fn test_compiled_regex_shape() {
    assert_eq!(compiled_regex("/", ""), r"^\|(?P<__suffix__>/?)$");
    assert_eq!(
        compiled_regex("/downloads/<int:id>", ""),
        r"^\|/downloads/(?P<id>\d+)$"
    );
    assert_eq!(
        compiled_regex("/users/", "<user>"),
        r"^(?P<user>[^/]+)\|/users(?P<__suffix__>/?)$"
    );
}

#[test]
fn test_literals_are_matched_encoded() {
    assert_eq!(compiled_regex("/a b", ""), r"^\|/a%20b$");
}

#[test]
fn test_weights_prefer_literals() {
    assert!(Weight::Literal(1) > Weight::Variable(150));
    assert!(Weight::Literal(5) > Weight::Literal(4));
    assert!(Weight::Variable(150) > Weight::Variable(100));
}

#[test]
fn test_bind_errors() {
    let config = MapConfig::default();

    let mut rule = Rule::new("no-slash", "x");
    assert!(matches!(
        rule.bind_with(&config),
        Err(RuleError::MissingLeadingSlash { .. })
    ));

    let mut rule = Rule::new("/<a>/<int:a>", "x");
    assert!(matches!(
        rule.bind_with(&config),
        Err(RuleError::DuplicateVariable { variable, .. }) if variable == "a"
    ));

    let mut rule = Rule::new("/<date:day>", "x");
    assert!(matches!(
        rule.bind_with(&config),
        Err(RuleError::UnknownConverter { converter, .. }) if converter == "date"
    ));

    let mut rule = Rule::new("/<int(bogus=1):id>", "x");
    assert!(matches!(
        rule.bind_with(&config),
        Err(RuleError::InvalidConverterArguments { .. })
    ));

    let mut rule = Rule::new("/old/<id>", "x").redirect_to_template("/new/<slug>");
    assert!(matches!(
        rule.bind_with(&config),
        Err(RuleError::UnknownRedirectVariable { variable, .. }) if variable == "slug"
    ));

    let mut rule = Rule::new("/ok", "x");
    rule.bind_with(&config).unwrap();
    assert!(matches!(
        rule.bind_with(&config),
        Err(RuleError::AlreadyBound { .. })
    ));
}

#[test]
fn test_get_implies_head() {
    let rule = Rule::new("/", "index").methods([Method::GET, Method::POST, Method::GET]);
    assert_eq!(
        rule.get_methods().unwrap(),
        &[Method::GET, Method::HEAD, Method::POST]
    );
    let rule = Rule::new("/", "index").methods(Vec::<Method>::new());
    assert!(rule.get_methods().is_none());
}

#[test]
fn test_rule_match_outcomes() {
    let rule = bound(Rule::new("/downloads/<int:id>", "show").defaults(values! { "fmt" => "html" }));
    assert_eq!(
        rule.match_path("|/downloads/42", Some(&Method::GET)),
        RuleMatch::Matched(values! { "id" => 42, "fmt" => "html" })
    );
    assert_eq!(
        rule.match_path("|/downloads/abc", Some(&Method::GET)),
        RuleMatch::NoMatch
    );

    let rule = bound(Rule::new("/downloads/", "index"));
    assert_eq!(
        rule.match_path("|/downloads", Some(&Method::GET)),
        RuleMatch::MissingSlash
    );
    assert_eq!(
        rule.match_path("|/downloads", None),
        RuleMatch::Matched(Values::new())
    );
    assert_eq!(
        rule.match_path("|/downloads/", Some(&Method::GET)),
        RuleMatch::Matched(Values::new())
    );
}

#[test]
fn test_missing_slash_respects_methods() {
    let rule = bound(Rule::new("/submit/", "submit").methods([Method::POST]));
    assert_eq!(
        rule.match_path("|/submit", Some(&Method::GET)),
        RuleMatch::Matched(Values::new())
    );
    assert_eq!(
        rule.match_path("|/submit", Some(&Method::POST)),
        RuleMatch::MissingSlash
    );
}

#[test]
fn test_lenient_leaf_accepts_trailing_slash() {
    let rule = bound(Rule::new("/about", "about").strict_slashes(false));
    assert!(matches!(
        rule.match_path("|/about/", Some(&Method::GET)),
        RuleMatch::Matched(_)
    ));
    let (_, path) = rule.build(&Values::new(), true).unwrap();
    assert_eq!(path, "/about");
}

#[test]
fn test_captures_are_decoded() {
    let rule = bound(Rule::new("/wiki/<page>", "wiki"));
    assert_eq!(
        rule.match_path("|/wiki/caf%C3%A9", Some(&Method::GET)),
        RuleMatch::Matched(values! { "page" => "café" })
    );
}

#[test]
fn test_build_appends_sorted_query() {
    let rule = bound(Rule::new("/", "index"));
    let (domain, path) = rule
        .build(&values! { "q" => "x y", "a" => 1 }, true)
        .unwrap();
    assert_eq!(domain, "");
    assert_eq!(path, "/?a=1&q=x+y");

    let (_, path) = rule.build(&values! { "q" => "x y" }, false).unwrap();
    assert_eq!(path, "/");
}

#[test]
fn test_build_rejects_unserializable() {
    let rule = bound(Rule::new("/page/<int:n>", "page"));
    assert!(rule.build(&values! { "n" => "abc" }, true).is_none());
    assert!(rule.build(&Values::new(), true).is_none());
}

#[test]
fn test_build_uses_subdomain_variables() {
    let rule = bound(Rule::new("/", "user_home").subdomain("<user>"));
    let (domain, path) = rule.build(&values! { "user" => "alice" }, true).unwrap();
    assert_eq!(domain, "alice");
    assert_eq!(path, "/");
}

#[test]
fn test_suitable_for() {
    let rule = bound(
        Rule::new("/all/", "all")
            .defaults(values! { "page" => 1 })
            .methods([Method::GET]),
    );
    assert!(rule.suitable_for(&Values::new(), None));
    assert!(rule.suitable_for(&values! { "page" => 1 }, Some(&Method::GET)));
    assert!(!rule.suitable_for(&values! { "page" => 2 }, None));
    assert!(!rule.suitable_for(&Values::new(), Some(&Method::POST)));

    let rule = bound(Rule::new("/all/page/<int:page>", "all"));
    assert!(!rule.suitable_for(&Values::new(), None));
    assert!(rule.suitable_for(&values! { "page" => 3 }, None));
}

#[test]
fn test_provides_defaults_for() {
    let canonical = bound(Rule::new("/all/", "all").defaults(values! { "page" => 1 }));
    let paged = bound(Rule::new("/all/page/<int:page>", "all"));
    let other = bound(Rule::new("/other/<int:page>", "other"));

    assert!(canonical.provides_defaults_for(&paged));
    assert!(!paged.provides_defaults_for(&canonical));
    assert!(!canonical.provides_defaults_for(&other));
    assert!(!canonical.provides_defaults_for(&canonical));
}

#[test]
fn test_match_order_static_before_dynamic() {
    let mut map = Map::new();
    map.add(Rule::new("/<page>", "page")).unwrap();
    map.add(Rule::new("/<path:rest>", "catchall")).unwrap();
    map.add(Rule::new("/about", "about")).unwrap();
    map.add(Rule::new("/<int:id>", "by_id")).unwrap();

    let order: Vec<String> = map
        .iter_rules(None)
        .iter()
        .map(|r| r.rule().to_string())
        .collect();
    assert_eq!(order, vec!["/about", "/<int:id>", "/<page>", "/<path:rest>"]);
}

#[test]
fn test_more_segments_win() {
    let mut map = Map::new();
    map.add(Rule::new("/<a>", "one")).unwrap();
    map.add(Rule::new("/<a>/<b>", "two")).unwrap();
    let first = map.iter_rules(None)[0].endpoint().to_string();
    assert_eq!(first, "two");
}

#[test]
fn test_build_order_prefers_defaults() {
    let mut map = Map::new();
    map.add(Rule::new("/all/page/<int:page>", "all")).unwrap();
    map.add(Rule::new("/all/", "all").defaults(values! { "page" => 1 }))
        .unwrap();
    map.add(Rule::new("/everything/", "all").defaults(values! { "page" => 1 }).alias(true))
        .unwrap();

    let order: Vec<String> = map
        .iter_rules(Some("all"))
        .iter()
        .map(|r| r.rule().to_string())
        .collect();
    assert_eq!(order, vec!["/all/", "/all/page/<int:page>", "/everything/"]);
}

#[test]
fn test_add_is_all_or_nothing() {
    let mut map = Map::new();
    map.add(Rule::new("/a", "a")).unwrap();
    let result = map.add(vec![Rule::new("/b", "b"), Rule::new("c", "c")]);
    assert!(result.is_err());
    assert_eq!(map.rule_count(), 1);
}

#[test]
fn test_update_is_cached_until_add() {
    let mut map = Map::new();
    map.add(Rule::new("/a", "a")).unwrap();
    let first = map.update();
    let second = map.update();
    assert!(Arc::ptr_eq(&first, &second));

    map.add(Rule::new("/b", "b")).unwrap();
    let third = map.update();
    assert!(!Arc::ptr_eq(&first, &third));
    assert_eq!(third.len(), 2);
    assert_eq!(first.len(), 1);
}

#[test]
fn test_endpoint_queries() {
    let mut map = Map::new();
    map.add(Rule::new("/users/<int:id>", "users.show")).unwrap();
    map.add(Rule::new("/users/", "users.list")).unwrap();
    assert!(map.is_endpoint_expecting("users.show", &["id"]));
    assert!(!map.is_endpoint_expecting("users.list", &["id"]));
    assert_eq!(map.endpoints(), vec!["users.list", "users.show"]);
}

#[test]
fn test_bind_for_host_derives_subdomain() {
    let mut map = Map::new();
    map.add(Rule::new("/", "index")).unwrap();

    let adapter = map.bind_for_host("example.com", "api.Example.com:80", "http");
    assert_eq!(adapter.subdomain(), "api");
    assert_eq!(adapter.server_name(), "example.com");

    let adapter = map.bind_for_host("example.com:8443", "example.com:8443", "https");
    assert_eq!(adapter.subdomain(), "");

    let adapter = map.bind_for_host("example.com", "evil.org", "http");
    assert_eq!(adapter.subdomain(), "<invalid>");
}

#[test]
fn test_rule_debug_hides_callback() {
    let rule = Rule::new("/x", "x").redirect_to_callback(|_, _| "/y".to_string());
    let debug = format!("{rule:?}");
    assert!(debug.contains("Callback(..)"));
}
