mod common;

use std::sync::Arc;

use brrtdispatch::call::{CallState, RequestSeed};
use brrtdispatch::dispatcher::{Dispatcher, ResourceBuilder, SharedDispatcher};
use brrtdispatch::error::{HeaderKind, RejectReason, Rejection};
use brrtdispatch::guard::{Guard, RoleSet};
use brrtdispatch::registry::CandidateBuilder;
use brrtdispatch::runtime_config::RuntimeConfig;
use brrtdispatch::stats::DispatchStats;
use common::calls::{call, get, outcome};
use common::fixtures::{zoo, zoo_tree};
use http::{Method, StatusCode};

#[test]
fn test_root_operation() {
    let d = zoo();
    let mut c = get("/health");
    assert_eq!(d.dispatch(&mut c).unwrap().name(), "health");
    assert_eq!(
        c.response_media_type().map(ToString::to_string).as_deref(),
        Some("application/json")
    );
}

#[test]
fn test_accept_selects_between_producers() {
    let d = zoo();
    let seed = RequestSeed::new("GET", "/foo").header("Accept", "text/html");
    assert_eq!(outcome(&d, seed), Ok("foo_html".to_string()));

    let seed = RequestSeed::new("GET", "/foo").header("Accept", "application/json");
    assert_eq!(outcome(&d, seed), Ok("foo_json".to_string()));

    // No Accept: both negotiate, declaration order decides
    assert_eq!(outcome(&d, RequestSeed::new("GET", "/foo")), Ok("foo_json".to_string()));
}

#[test]
fn test_unacceptable_media_is_not_found_with_reason() {
    let d = zoo();
    let mut c = CallState::new(RequestSeed::new("GET", "/foo").header("Accept", "application/xml"));
    let rejection = d.dispatch(&mut c).unwrap_err();
    assert_eq!(rejection.status(), StatusCode::NOT_FOUND);
    assert_eq!(rejection.reason(), Some(RejectReason::NotAcceptable));
    assert!(c.selected().is_none());
    assert_eq!(c.rejection(), Some(&rejection));
}

#[test]
fn test_literal_beats_variable_in_child() {
    let d = zoo();
    let mut c = get("/foo/bar");
    assert_eq!(d.dispatch(&mut c).unwrap().name(), "foo_bar");
    assert!(c.path_var("id").is_none());

    let mut c = get("/foo/42");
    assert_eq!(d.dispatch(&mut c).unwrap().name(), "foo_by_id");
    assert_eq!(c.path_var("id"), Some("42"));
}

#[test]
fn test_wildcard_remainder() {
    let d = zoo();
    let mut c = get("/foo/files/docs/readme.txt");
    assert_eq!(d.dispatch(&mut c).unwrap().name(), "foo_files");
    assert_eq!(c.remainder(), Some("docs/readme.txt"));
}

#[test]
fn test_variables_bound_from_resource_and_operation() {
    let d = zoo();
    let mut c = get("/users/7/posts/abc");
    assert_eq!(d.dispatch(&mut c).unwrap().name(), "get_post");
    assert_eq!(c.path_var("user_id"), Some("7"));
    assert_eq!(c.path_var("post_id"), Some("abc"));
    let vars = c.path_vars_map();
    assert_eq!(vars.len(), 2);
}

#[test]
fn test_failed_child_falls_back_and_discards_its_variables() {
    let d = zoo();
    let mut c = get("/users/7/settings");
    assert_eq!(d.dispatch(&mut c).unwrap().name(), "root_settings");
    assert_eq!(c.path_var("uid"), Some("7"));
    assert!(c.path_var("user_id").is_none());
}

#[test]
fn test_child_rejection_more_specific_than_local_miss() {
    let d = zoo();
    let mut c = call("DELETE", "/foo/bar");
    let rejection = d.dispatch(&mut c).unwrap_err();
    assert_eq!(rejection.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(rejection.allow_header().as_deref(), Some("GET"));
}

#[test]
fn test_method_sets_are_unioned_across_child_and_local() {
    let d = zoo();
    let mut c = call("DELETE", "/users/7/profile");
    match d.dispatch(&mut c).unwrap_err() {
        Rejection::MethodNotAllowed { allowed } => {
            assert_eq!(allowed.len(), 3);
            for m in [Method::GET, Method::PUT, Method::POST] {
                assert!(allowed.contains(&m), "missing {m}");
            }
        }
        other => panic!("expected 405, got {other:?}"),
    }
}

#[test]
fn test_local_operation_reached_when_child_method_misses() {
    let d = zoo();
    let mut c = call("POST", "/users/7/profile");
    assert_eq!(d.dispatch(&mut c).unwrap().name(), "root_update_profile");
    assert_eq!(c.path_var("uid"), Some("7"));
}

#[test]
fn test_client_version_in_child() {
    let d = zoo();
    let ok = RequestSeed::new("GET", "/users/7/profile").header("X-Client-Version", "1.5");
    assert_eq!(outcome(&d, ok), Ok("get_profile".to_string()));

    let too_new = RequestSeed::new("GET", "/users/7/profile").header("X-Client-Version", "2.0");
    assert_eq!(outcome(&d, too_new), Err(412));

    // Absent header fails every ranged candidate
    assert_eq!(outcome(&d, RequestSeed::new("GET", "/users/7/profile")), Err(412));
}

#[test]
fn test_bad_header_in_child_aborts_dispatch() {
    let d = zoo();
    let mut c = CallState::new(
        RequestSeed::new("GET", "/users/7/profile").header("X-Client-Version", "one.two"),
    );
    let rejection = d.dispatch(&mut c).unwrap_err();
    assert_eq!(rejection.status(), StatusCode::BAD_REQUEST);
    assert!(matches!(
        rejection,
        Rejection::BadHeader {
            header: HeaderKind::ClientVersion,
            ..
        }
    ));
    assert!(c.path_vars().is_empty());
}

#[test]
fn test_guard_falls_through_to_unguarded_operation() {
    let d = zoo();
    let admin = RequestSeed::new("PUT", "/users/7/profile").role("ROLE_ADMIN");
    assert_eq!(outcome(&d, admin), Ok("admin_put_profile".to_string()));

    let user = RequestSeed::new("PUT", "/users/7/profile").role("ROLE_USER");
    assert_eq!(outcome(&d, user), Ok("put_profile".to_string()));
}

#[test]
fn test_unknown_path() {
    let d = zoo();
    let mut c = get("/does/not/exist");
    let rejection = d.dispatch(&mut c).unwrap_err();
    assert_eq!(
        rejection,
        Rejection::NotFound {
            reason: RejectReason::PathNotFound
        }
    );
}

#[test]
fn test_selection_is_deterministic() {
    let d = zoo();
    let seeds = [
        RequestSeed::new("GET", "/foo"),
        RequestSeed::new("GET", "/foo").header("Accept", "text/*"),
        RequestSeed::new("GET", "/foo/bar"),
        RequestSeed::new("PUT", "/users/1/profile"),
        RequestSeed::new("GET", "/nowhere"),
    ];
    for seed in seeds {
        let first = outcome(&d, seed.clone());
        for _ in 0..20 {
            assert_eq!(outcome(&d, seed.clone()), first);
        }
    }
}

#[test]
fn test_redispatch_rebinds_variables() {
    let d = zoo();
    let mut c = get("/users/7/posts/abc");
    d.dispatch(&mut c).unwrap();
    assert_eq!(d.dispatch(&mut c).unwrap().name(), "get_post");
    assert_eq!(c.path_vars().len(), 2);
}

#[derive(Debug)]
struct ApiKeyGuard;

impl Guard for ApiKeyGuard {
    fn allows(&self, _roles: &RoleSet, call: &CallState) -> bool {
        call.header("x-api-key") == Some("secret")
    }

    fn name(&self) -> &str {
        "api_key"
    }
}

fn guarded_tree() -> ResourceBuilder {
    ResourceBuilder::new("/").child(
        ResourceBuilder::new("/admin")
            .roles_declared(["ROLE_ADMIN", "ROLE_AUDITOR", "ROLE_USER"])
            .role_guard("ROLE_A*")
            .guard(Arc::new(ApiKeyGuard))
            .operation(CandidateBuilder::new("settings", "GET", "/settings"))
            .operation(
                CandidateBuilder::new("purge", "DELETE", "/settings")
                    .role_guard("ROLE_ADMIN && ROLE_USER"),
            )
            .child(
                ResourceBuilder::new("/reports")
                    .operation(CandidateBuilder::new("reports", "GET", "/").role_guard("ROLE_AUD*")),
            ),
    )
}

#[test]
fn test_resource_guards_apply_to_every_operation() {
    let d = Dispatcher::build(guarded_tree(), &RuntimeConfig::default()).unwrap();

    let auditor = RequestSeed::new("GET", "/admin/settings")
        .role("ROLE_AUDITOR")
        .header("X-Api-Key", "secret");
    assert_eq!(outcome(&d, auditor), Ok("settings".to_string()));

    let no_key = RequestSeed::new("GET", "/admin/settings").role("ROLE_ADMIN");
    assert_eq!(outcome(&d, no_key), Err(403));

    let user = RequestSeed::new("GET", "/admin/settings")
        .role("ROLE_USER")
        .header("X-Api-Key", "secret");
    assert_eq!(outcome(&d, user), Err(403));
}

#[test]
fn test_operation_guard_combines_with_resource_guard() {
    let d = Dispatcher::build(guarded_tree(), &RuntimeConfig::default()).unwrap();
    let admin_user = RequestSeed::new("DELETE", "/admin/settings")
        .role("ROLE_ADMIN")
        .role("ROLE_USER")
        .header("X-Api-Key", "secret");
    assert_eq!(outcome(&d, admin_user), Ok("purge".to_string()));

    // Passes the resource guards, fails the operation's own
    let admin_only = RequestSeed::new("DELETE", "/admin/settings")
        .role("ROLE_ADMIN")
        .header("X-Api-Key", "secret");
    assert_eq!(outcome(&d, admin_only), Err(403));

    // Passes the operation's guard, fails the resource's
    let user_admin_no_key = RequestSeed::new("DELETE", "/admin/settings")
        .role("ROLE_ADMIN")
        .role("ROLE_USER");
    assert_eq!(outcome(&d, user_admin_no_key), Err(403));
}

#[test]
fn test_child_inherits_declared_roles_but_not_guards() {
    let d = Dispatcher::build(guarded_tree(), &RuntimeConfig::default()).unwrap();
    // ROLE_AUD* resolves against the inherited universe; no api key needed
    let auditor = RequestSeed::new("GET", "/admin/reports").role("ROLE_AUDITOR");
    assert_eq!(outcome(&d, auditor), Ok("reports".to_string()));

    let user = RequestSeed::new("GET", "/admin/reports").role("ROLE_USER");
    assert_eq!(outcome(&d, user), Err(403));
}

#[test]
fn test_version_header_override_per_subtree() {
    let root = ResourceBuilder::new("/").child(
        ResourceBuilder::new("/v")
            .version_header("X-Api-Version")
            .operation(CandidateBuilder::new("legacy", "GET", "/").client_version("[,2)"))
            .operation(CandidateBuilder::new("modern", "GET", "/").client_version("2")),
    );
    let d = Dispatcher::build(root, &RuntimeConfig::default()).unwrap();

    let legacy = RequestSeed::new("GET", "/v").header("X-Api-Version", "1.9");
    assert_eq!(outcome(&d, legacy), Ok("legacy".to_string()));
    let modern = RequestSeed::new("GET", "/v").header("X-Api-Version", "3.1");
    assert_eq!(outcome(&d, modern), Ok("modern".to_string()));
    let wrong_header = RequestSeed::new("GET", "/v").header("X-Client-Version", "3.1");
    assert_eq!(outcome(&d, wrong_header), Err(412));
}

#[test]
fn test_strict_accept_reports_406() {
    let config = RuntimeConfig {
        strict_accept: true,
        ..RuntimeConfig::default()
    };
    let d = Dispatcher::build(zoo_tree(), &config).unwrap();
    let seed = RequestSeed::new("GET", "/foo").header("Accept", "image/png");
    assert_eq!(outcome(&d, seed), Err(406));
}

#[test]
fn test_method_override() {
    let config = RuntimeConfig {
        method_override: true,
        ..RuntimeConfig::default()
    };
    let d = Dispatcher::build(zoo_tree(), &config).unwrap();
    let seed = RequestSeed::new("POST", "/users/7/profile?method=PUT").role("ROLE_ADMIN");
    let mut c = CallState::new(seed);
    assert_eq!(d.dispatch(&mut c).unwrap().name(), "admin_put_profile");
    assert_eq!(c.method(), Some(&Method::PUT));

    // Disabled by default
    let seed = RequestSeed::new("POST", "/users/7/profile").header("X-Method", "PUT");
    assert_eq!(outcome(&zoo(), seed), Ok("root_update_profile".to_string()));
}

#[test]
fn test_content_type_negotiation_through_tree() {
    let root = ResourceBuilder::new("/").child(
        ResourceBuilder::new("/upload")
            .operation(CandidateBuilder::new("upload_json", "POST", "/").consumes("application/json"))
            .operation(CandidateBuilder::new("upload_form", "POST", "/").consumes(
                "application/x-www-form-urlencoded, multipart/form-data",
            )),
    );
    let d = Dispatcher::build(root, &RuntimeConfig::default()).unwrap();

    let mut c = CallState::new(
        RequestSeed::new("POST", "/upload")
            .header("Content-Type", "multipart/form-data; boundary=xyz")
            .with_body(),
    );
    assert_eq!(d.dispatch(&mut c).unwrap().name(), "upload_form");
    assert_eq!(
        c.request_media_type().map(|m| m.essence()).as_deref(),
        Some("multipart/form-data")
    );

    let seed = RequestSeed::new("POST", "/upload")
        .header("Content-Type", "text/plain")
        .with_body();
    let mut c = CallState::new(seed);
    let rejection = d.dispatch(&mut c).unwrap_err();
    assert_eq!(rejection.status(), StatusCode::NOT_FOUND);
    assert_eq!(rejection.reason(), Some(RejectReason::UnsupportedMediaType));

    // Without a body the consumes set is not consulted
    assert_eq!(
        outcome(&d, RequestSeed::new("POST", "/upload")),
        Ok("upload_json".to_string())
    );
}

#[test]
fn test_dispatch_from_http_request() {
    let d = zoo();
    let req = http::Request::builder()
        .method("GET")
        .uri("/foo/42?verbose=true")
        .header("accept", "*/*")
        .body(())
        .unwrap();
    let c = d.dispatch_seed(RequestSeed::from_request(&req));
    assert_eq!(c.selected().map(|s| s.name()), Some("foo_by_id"));
    assert_eq!(c.query_param("verbose"), Some("true"));
}

#[test]
fn test_repeated_accept_lines_negotiate_as_one_list() {
    let d = zoo();
    let req = http::Request::builder()
        .uri("/foo")
        .header("accept", "application/xml")
        .header("accept", "text/html")
        .body(())
        .unwrap();
    let c = d.dispatch_seed(RequestSeed::from_request(&req));
    assert_eq!(c.rejection(), None);
    assert_eq!(c.selected().map(|s| s.name()), Some("foo_html"));
}

#[test]
fn test_stats_record_selections_and_rejections() {
    let stats = Arc::new(DispatchStats::new());
    let d = Dispatcher::build_with_stats(zoo_tree(), &RuntimeConfig::default(), Arc::clone(&stats))
        .unwrap();

    for path in ["/users/1/posts/a", "/users/2/posts/b", "/health", "/missing"] {
        let c = d.dispatch_seed(RequestSeed::new("GET", path));
        assert!(c.selected().is_some() || c.rejection().is_some());
    }

    let snapshot = stats.snapshot();
    assert_eq!(snapshot.total_dispatches, 4);
    let users = &snapshot.resources["/users/{user_id}"];
    assert_eq!(users.selections["get_post"], 2);
    let root = &snapshot.resources["/"];
    assert_eq!(root.selections["health"], 1);
    assert_eq!(root.rejections[&404], 1);
    assert_eq!(root.dispatches, 2);
}

#[test]
fn test_shared_dispatcher_swaps_trees() {
    let shared = SharedDispatcher::new(zoo());
    let mut c = get("/health");
    assert_eq!(shared.dispatch(&mut c).unwrap().name(), "health");

    let in_flight = shared.load();
    let next = ResourceBuilder::new("/")
        .operation(CandidateBuilder::new("health_v2", "GET", "/health"));
    let previous = shared.replace(Dispatcher::build(next, &RuntimeConfig::default()).unwrap());
    assert_eq!(previous.candidate_count(), in_flight.candidate_count());

    let mut c = get("/health");
    assert_eq!(shared.dispatch(&mut c).unwrap().name(), "health_v2");
    // The tree loaded before the swap still resolves against the old operations
    let mut c = get("/health");
    assert_eq!(in_flight.dispatch(&mut c).unwrap().name(), "health");
}

#[test]
fn test_tree_counts() {
    let d = zoo();
    assert_eq!(d.resource_count(), 3);
    assert_eq!(d.candidate_count(), 12);
    assert_eq!(d.children()[1].full_path(), "/users/{user_id}");
}
