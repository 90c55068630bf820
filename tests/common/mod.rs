#![allow(dead_code)]

use brrtdispatch::call::{CallState, RequestSeed};
use brrtdispatch::dispatcher::{Dispatcher, ResourceBuilder};
use brrtdispatch::registry::CandidateBuilder;
use brrtdispatch::runtime_config::RuntimeConfig;

pub mod fixtures {
    use super::*;

    /// Resource tree shared by the integration tests
    ///
    /// ```text
    /// /                         GET /health, GET /users/{uid}/settings,
    ///                           POST /users/{uid}/profile
    /// ├── /foo                  GET / (json), GET / (html), GET /{id}, GET /bar,
    /// │                         GET /files/*
    /// └── /users/{user_id}      GET /profile [1.0,2.0), GET /posts/{post_id},
    ///                           PUT /profile (admin), PUT /profile
    /// ```
    pub fn zoo_tree() -> ResourceBuilder {
        ResourceBuilder::new("/")
            .operation(CandidateBuilder::new("health", "GET", "/health").produces("application/json"))
            .operation(CandidateBuilder::new("root_settings", "GET", "/users/{uid}/settings"))
            .operation(CandidateBuilder::new("root_update_profile", "POST", "/users/{uid}/profile"))
            .child(
                ResourceBuilder::new("/foo")
                    .operation(CandidateBuilder::new("foo_json", "GET", "/").produces("application/json"))
                    .operation(CandidateBuilder::new("foo_html", "GET", "/").produces("text/html"))
                    .operation(CandidateBuilder::new("foo_by_id", "GET", "/{id}"))
                    .operation(CandidateBuilder::new("foo_bar", "GET", "/bar"))
                    .operation(CandidateBuilder::new("foo_files", "GET", "/files/*")),
            )
            .child(
                ResourceBuilder::new("/users/{user_id}")
                    .operation(
                        CandidateBuilder::new("get_profile", "GET", "/profile")
                            .client_version("[1.0,2.0)"),
                    )
                    .operation(CandidateBuilder::new("get_post", "GET", "/posts/{post_id}"))
                    .operation(
                        CandidateBuilder::new("admin_put_profile", "PUT", "/profile")
                            .role_guard("ROLE_ADMIN"),
                    )
                    .operation(CandidateBuilder::new("put_profile", "PUT", "/profile")),
            )
    }

    pub fn zoo() -> Dispatcher {
        Dispatcher::build(zoo_tree(), &RuntimeConfig::default()).unwrap()
    }
}

pub mod calls {
    use super::*;

    pub fn get(path: &str) -> CallState {
        CallState::new(RequestSeed::new("GET", path))
    }

    pub fn call(method: &str, path: &str) -> CallState {
        CallState::new(RequestSeed::new(method, path))
    }

    /// Dispatch and return the selected operation name, or the status code
    pub fn outcome(dispatcher: &Dispatcher, seed: RequestSeed) -> Result<String, u16> {
        let mut call = CallState::new(seed);
        dispatcher
            .dispatch(&mut call)
            .map(|c| c.name().to_string())
            .map_err(|r| r.status().as_u16())
    }
}

pub mod temp_files {
    use std::io::Write;

    /// Write `content` to a temporary file with the given extension
    pub fn create_temp_config(content: &str, ext: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .prefix("brrtd_test_")
            .suffix(&format!(".{ext}"))
            .tempfile()
            .unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }
}
