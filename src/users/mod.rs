/// User accounts: OAuth upserts, bookmarks, roles and ban state
pub mod models;
pub mod repository;

pub use models::{OAuthProfile, PagedUsers, Role, User};
pub use repository::UserRepository;
