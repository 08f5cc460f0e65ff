//! Business logic services.
//!
//! Services sit between route handlers and repositories. Account, scope and
//! report services are generic over small storage traits so they run against
//! the in-memory stores in [`crate::testing`] as well as `PostgreSQL`.

pub mod auth;
pub mod cache;
pub mod email;
pub mod orders;
pub mod payment;
pub mod reports;
pub mod scope;
pub mod storage;
pub mod tokens;

pub use auth::{AuthError, AuthService, UserStore};
pub use cache::ShopCache;
pub use email::{EmailSender, Mailer};
pub use reports::ReportStore;
pub use storage::{StorageError, UploadKind, UploadStorage};
pub use tokens::{TokenService, TokenStore};
