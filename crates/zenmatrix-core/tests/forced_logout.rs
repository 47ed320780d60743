//! An unauthorized task fetch must tear down the stored session.

use std::fs;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zenmatrix_core::api::ApiClient;
use zenmatrix_core::cli::Invocation;
use zenmatrix_core::commands;
use zenmatrix_core::config::Config;
use zenmatrix_core::render::Renderer;
use zenmatrix_core::session::{Session, StateDir};
use zenmatrix_core::task::User;

#[tokio::test(flavor = "multi_thread")]
async fn a_401_on_list_clears_the_stored_session() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let temp = tempfile::tempdir().expect("tempdir");
    let rc_path = temp.path().join("zenmatrixrc");
    fs::write(&rc_path, "color=off\n").expect("write rc file");

    let data_dir = temp.path().join("data");
    let uri = server.uri();

    let result = tokio::task::spawn_blocking(move || {
        let cfg = Config::load(Some(&rc_path)).expect("load config");
        let mut store = StateDir::open(&data_dir).expect("open state dir");
        store
            .save_session(&Session {
                token: "stale".to_string(),
                user: User {
                    email: "ana@example.com".to_string(),
                },
            })
            .expect("save session");

        let api = ApiClient::new(&uri);
        let mut renderer = Renderer::new(&cfg).expect("renderer");
        let inv = Invocation {
            view_tokens: vec![],
            command: "list".to_string(),
            command_args: vec![],
        };

        let outcome = commands::dispatch(&mut store, &cfg, &mut renderer, &api, inv);
        (outcome, store.load_session().expect("load session"))
    })
    .await
    .expect("join");

    let (outcome, session) = result;
    let err = outcome.expect_err("the fetch must abort");
    assert!(err.to_string().contains("unauthorized"));
    assert!(session.is_none(), "session must be cleared after a 401");
}
