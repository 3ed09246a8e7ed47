//! # Squad
//!
//! Dynamic member searches over a member/team schema.
//!
//! A [`MemberSearchCondition`] holds optional search fields; each present,
//! non-blank field becomes one constraint and the constraints are ANDed. The
//! [`MemberRepository`] turns a condition into a member-left-join-team query
//! and runs it whole or one page at a time. Paged searches come in two
//! flavours that always agree on content and total:
//!
//! - [`MemberRepository::search_page_simple`] gets rows and total together.
//! - [`MemberRepository::search_page_complex`] skips the count query when
//!   the first page already holds every match.
//!
//! ## Quick Start
//!
//! ```rust
//! use squad::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> squad::Result<()> {
//! let repo = MemberRepository::new(MemoryEngine::new());
//! repo.install_schema().await?;
//!
//! let team_b = repo.save_team(Team::new("teamB")).await?;
//! repo.save(Member::with_team("member4", 40, &team_b)?).await?;
//! repo.save(Member::new("member5", 38)).await?;
//!
//! let condition = MemberSearchCondition::new().team_name("teamB").age_goe(35);
//! let found = repo.search(&condition).await?;
//! assert_eq!(found.len(), 1);
//! assert_eq!(found[0].username.as_deref(), Some("member4"));
//!
//! let page = repo
//!     .search_page_complex(&MemberSearchCondition::new(), &PageRequest::of(0, 10)?)
//!     .await?;
//! assert_eq!(page.total(), 2);
//! # Ok(())
//! # }
//! ```
//!
//! With the `sqlite` feature (on by default), [`connect`] opens the
//! database named in a [`SquadConfig`] and installs the schema.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod condition;
pub mod config;
pub mod error;
pub mod model;
pub mod repository;

pub use condition::MemberSearchCondition;
pub use config::{ConfigError, SquadConfig};
pub use error::{Error, Result};
pub use model::{Member, MemberDto, MemberTeamDto, Team};
pub use repository::MemberRepository;

/// The query layer: filters, queries, pagination and engines.
pub mod query {
    pub use squad_query::*;
}

/// SQLite engine.
#[cfg(feature = "sqlite")]
#[cfg_attr(docsrs, doc(cfg(feature = "sqlite")))]
pub mod sqlite {
    pub use squad_sqlite::*;
}

/// Open the configured database, install the schema and return a
/// repository over it.
///
/// Only SQLite URLs are understood. `debug.log_queries` turns on search
/// statement logging.
#[cfg(feature = "sqlite")]
#[cfg_attr(docsrs, doc(cfg(feature = "sqlite")))]
pub async fn connect(config: &SquadConfig) -> Result<MemberRepository<squad_sqlite::SqliteEngine>> {
    let sqlite = squad_sqlite::SqliteConfig::from_url(&config.database.url)?;
    let engine = squad_sqlite::SqliteEngine::open(sqlite).await?;
    let repo = MemberRepository::new(engine).with_query_logging(config.debug.log_queries);
    repo.install_schema().await?;
    tracing::info!(url = %config.database.url, "Member repository ready");
    Ok(repo)
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::condition::MemberSearchCondition;
    pub use crate::config::SquadConfig;
    pub use crate::error::{Error, Result};
    pub use crate::model::{Member, MemberDto, MemberTeamDto, Team};
    pub use crate::repository::MemberRepository;
    pub use squad_query::prelude::*;

    #[cfg(feature = "sqlite")]
    pub use crate::connect;
    #[cfg(feature = "sqlite")]
    pub use squad_sqlite::SqliteEngine;
}
