use super::{split_path, PathTemplate};
use crate::error::ConfigError;

#[test]
fn test_root_path() {
    let t = PathTemplate::compile("/").unwrap();
    let m = t.matches("/").unwrap();
    assert!(m.vars.is_empty());
    assert_eq!(m.remainder(), None);
    assert!(t.matches("/foo").is_none());
}

#[test]
fn test_parameterized_path() {
    let t = PathTemplate::compile("/items/{id}").unwrap();
    let m = t.matches("/items/123").unwrap();
    assert_eq!(m.get("id"), Some("123"));
    assert_eq!(m.literal_count, 1);
    assert_eq!(t.variables().collect::<Vec<_>>(), vec!["id"]);
}

#[test]
fn test_nested_path() {
    let t = PathTemplate::compile("/a/{b}/c").unwrap();
    assert!(t.matches("/a/1/c").is_some());
    assert!(t.matches("/a/1/d").is_none());
    assert!(t.matches("/A/1/c").is_none());
}

#[test]
fn test_segment_count_mismatch_without_wildcard() {
    let t = PathTemplate::compile("/{a}/{b}").unwrap();
    assert!(t.matches("/123/qux/true/quux").is_none());
}

#[test]
fn test_wildcard_remainder() {
    let t = PathTemplate::compile("/{a}/{b}/*").unwrap();
    let m = t.matches("/123/qux/true/quux").unwrap();
    assert_eq!(m.get("a"), Some("123"));
    assert_eq!(m.get("b"), Some("qux"));
    assert_eq!(m.remainder(), Some("true/quux"));
}

#[test]
fn test_wildcard_matches_zero_segments() {
    let t = PathTemplate::compile("/files/*").unwrap();
    let m = t.matches("/files").unwrap();
    assert_eq!(m.remainder(), Some(""));
}

#[test]
fn test_variables_and_remainder_are_decoded() {
    let t = PathTemplate::compile("/users/{name}/*").unwrap();
    let m = t.matches("/users/John%20Doe/a%20b/c").unwrap();
    assert_eq!(m.get("name"), Some("John Doe"));
    assert_eq!(m.remainder(), Some("a b/c"));
}

#[test]
fn test_invalid_utf8_escape_fails_match() {
    let t = PathTemplate::compile("/users/{name}").unwrap();
    assert!(t.matches("/users/%FF").is_none());
}

#[test]
fn test_variable_rejects_empty_segment() {
    let t = PathTemplate::compile("/a/{b}/c").unwrap();
    assert!(t.matches("/a//c").is_none());
}

#[test]
fn test_query_string_and_trailing_slash_ignored() {
    let t = PathTemplate::compile("/pets/{id}").unwrap();
    assert_eq!(t.matches("/pets/7/").unwrap().get("id"), Some("7"));
    assert_eq!(t.matches("/pets/7?verbose=true").unwrap().get("id"), Some("7"));
}

#[test]
fn test_duplicate_variable_rejected() {
    let err = PathTemplate::compile("/{id}/x/{id}").unwrap_err();
    assert_eq!(
        err,
        ConfigError::DuplicateVariable {
            template: "/{id}/x/{id}".to_string(),
            name: "id".to_string(),
        }
    );
}

#[test]
fn test_misplaced_wildcard_rejected() {
    assert!(matches!(
        PathTemplate::compile("/a/*/b"),
        Err(ConfigError::MisplacedWildcard { .. })
    ));
    assert!(matches!(
        PathTemplate::compile("/a/b*"),
        Err(ConfigError::MisplacedWildcard { .. })
    ));
}

#[test]
fn test_malformed_segments_rejected() {
    for bad in ["/a/{}", "/a/{b", "/a/b}", "/a/x{b}", "/a//b"] {
        assert!(
            matches!(PathTemplate::compile(bad), Err(ConfigError::MalformedSegment { .. })),
            "expected malformed segment error for {bad}"
        );
    }
}

#[test]
fn test_specificity_prefers_leading_literals() {
    let literal = PathTemplate::compile("/foo/bar").unwrap();
    let variable = PathTemplate::compile("/foo/{id}").unwrap();
    let wildcard = PathTemplate::compile("/foo/*").unwrap();
    assert!(literal.specificity() > variable.specificity());
    assert!(variable.specificity() > wildcard.specificity());
}

#[test]
fn test_specificity_total_literals_breaks_leading_tie() {
    let a = PathTemplate::compile("/x/{id}/detail").unwrap();
    let b = PathTemplate::compile("/x/{id}/{part}").unwrap();
    assert!(a.specificity() > b.specificity());
}

#[test]
fn test_match_prefix_returns_rest() {
    let t = PathTemplate::compile("/users/{uid}").unwrap();
    let (m, rest) = t.match_prefix("/users/42/posts/9").unwrap();
    assert_eq!(m.get("uid"), Some("42"));
    assert_eq!(rest, "/posts/9");

    let (_, rest) = t.match_prefix("/users/42").unwrap();
    assert_eq!(rest, "/");
    assert!(t.match_prefix("/users").is_none());
}

#[test]
fn test_first_literal() {
    assert_eq!(PathTemplate::compile("/pets/{id}").unwrap().first_literal(), Some("pets"));
    assert_eq!(PathTemplate::compile("/{id}").unwrap().first_literal(), None);
    assert_eq!(PathTemplate::compile("/").unwrap().first_literal(), None);
}

#[test]
fn test_split_path() {
    assert!(split_path("/").is_empty());
    assert!(split_path("").is_empty());
    assert_eq!(split_path("/a/b/").as_slice(), &["a", "b"]);
    assert_eq!(split_path("a/b?x=1").as_slice(), &["a", "b"]);
}
