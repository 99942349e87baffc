/// Animal profile posts: data model, search filter builder, repository
pub mod filter;
pub mod models;
pub mod repository;

pub use filter::SearchFilter;
pub use models::{NewPost, OptionalImageField, Page, PagedPosts, Post, PostUpdate};
pub use repository::PostRepository;
