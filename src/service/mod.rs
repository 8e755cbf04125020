//! Service layer
//!
//! Contains business logic separated from HTTP handlers.
//! Services orchestrate database, token cipher, and GitHub API operations.

mod account;
mod ownership;
mod projects;
mod repos;

pub use account::{AccountService, SignupInput};
pub use ownership::authorize_owned;
pub use projects::{NewFileInput, ProjectService};
pub use repos::{RepoService, RepoSummary};
