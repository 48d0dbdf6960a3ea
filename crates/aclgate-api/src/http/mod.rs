//! HTTP REST API endpoints.
//!
//! | Endpoint | Method | Description |
//! |----------|--------|-------------|
//! | `/init` | POST | Translate and load a configuration document |
//! | `/add` | POST | Same as `/init`, reported as `added` |
//! | `/relationships` | POST | Load a list of tuple strings |
//! | `/assign` | POST | Grant one relation to one user |
//! | `/check` | POST | Permission check |
//! | `/lookup/{type}/{permission}/{subject_type}/{subject_id}` | GET | Accessible hierarchy |
//! | `/subtree/{type}/{id}/{permission}` | GET | Subtree under a root |
//! | `/authz/token/{sso_user_id}` | GET | Authorization token |
//! | `/authz/direct-subjects` | GET | Subjects from stored tuples |
//! | `/authz/effective-subjects` | GET | Subjects after permission evaluation |

pub mod routes;
pub mod state;

pub use routes::{
    create_router, create_router_with_body_limit, create_router_with_observability,
    with_middleware, ApiError, ApiResult, RouterOptions, DEFAULT_BODY_LIMIT,
};
pub use state::AppState;
