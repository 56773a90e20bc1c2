//! taskdeck git - source-control connector
//!
//! Branch listing goes through libgit2; pulling shells out to the `git`
//! binary so the user's credential helpers apply.

mod branches;
mod connector;
mod repository;

pub use connector::GitConnector;
pub use repository::{GitRepo, Result};
