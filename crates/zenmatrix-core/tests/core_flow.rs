use tempfile::tempdir;
use zenmatrix_core::session::{Session, StateDir};
use zenmatrix_core::task::User;
use zenmatrix_core::view::{CompletedFilter, ViewMode, ViewState, apply_tokens};

#[test]
fn session_roundtrip_and_clear() {
    let temp = tempdir().expect("tempdir");
    let store = StateDir::open(temp.path()).expect("open state dir");

    assert!(store.load_session().expect("load").is_none());

    store
        .save_session(&Session {
            token: "tok-123".to_string(),
            user: User {
                email: "ana@example.com".to_string(),
            },
        })
        .expect("save session");

    let session = store.load_session().expect("load").expect("session present");
    assert_eq!(session.token, "tok-123");
    assert_eq!(session.user.email, "ana@example.com");

    store.clear_session().expect("clear session");
    assert!(store.load_session().expect("load").is_none());

    // clearing twice is fine
    store.clear_session().expect("clear again");
}

#[test]
fn view_state_survives_reopening_the_store() {
    let temp = tempdir().expect("tempdir");

    {
        let store = StateDir::open(temp.path()).expect("open state dir");
        assert!(store.load_view().expect("load view").is_none());

        let mut view = ViewState::default();
        apply_tokens(
            &mut view,
            &[
                "rent".to_string(),
                "project:Home".to_string(),
                "completed:false".to_string(),
                "page:3".to_string(),
            ],
        )
        .expect("apply tokens");
        store.save_view(&view).expect("save view");
    }

    let store = StateDir::open(temp.path()).expect("reopen state dir");
    let view = store.load_view().expect("load view").expect("view present");
    assert_eq!(view.search, "rent");
    assert_eq!(view.project, "Home");
    assert_eq!(view.completed, CompletedFilter::NotCompleted);
    assert_eq!(view.page, 3);
    assert_eq!(view.mode, ViewMode::List);

    // the derived query carries exactly what was stored
    let pairs = view.query_pairs();
    assert!(pairs.contains(&("search", "rent".to_string())));
    assert!(pairs.contains(&("proyecto", "Home".to_string())));
    assert!(pairs.contains(&("isCompleted", "false".to_string())));
    assert!(pairs.contains(&("page", "3".to_string())));
}
