//! Integration tests for configuration loading and `squad::connect`.

use pretty_assertions::assert_eq;
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

use squad::prelude::*;
use squad::{ConfigError, Error};

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_config_from_file() {
    let file = write_config(
        r#"
        [database]
        url = "sqlite::memory:"

        [pagination]
        default_page_size = 5
        max_page_size = 10
        strategy = "simple"
        "#,
    );

    let config = SquadConfig::from_file(file.path()).unwrap();
    assert_eq!(config.pagination.default_page_size, 5);
    assert_eq!(config.pagination.strategy, PageStrategy::Simple);
    assert_eq!(config.page_request(0, Some(50)).unwrap().page_size(), 10);
}

#[test]
fn test_invalid_file_reports_toml_error() {
    let file = write_config("[database\nurl = 1");
    let err = SquadConfig::from_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Toml(_)));
}

#[tokio::test]
async fn test_connect_in_memory() {
    let config = SquadConfig::default();
    let repo = connect(&config).await.unwrap();

    let team = repo.save_team(Team::new("teamA")).await.unwrap();
    repo.save(Member::with_team("member1", 10, &team).unwrap())
        .await
        .unwrap();

    let request = config.page_request(0, None).unwrap();
    let page = repo
        .search_page(&MemberSearchCondition::new(), &request, config.pagination.strategy)
        .await
        .unwrap();
    assert_eq!(page.total(), 1);
    assert_eq!(page.content()[0].team_name.as_deref(), Some("teamA"));
}

#[tokio::test]
async fn test_connect_file_database_persists() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("squad.db");
    let config: SquadConfig = format!(
        "[database]\nurl = \"sqlite://{}?busy_timeout=1000\"\n\n[debug]\nlog_queries = true\n",
        path.display()
    )
    .parse()
    .unwrap();

    {
        let repo = connect(&config).await.unwrap();
        repo.save(Member::new("member1", 10)).await.unwrap();
        repo.save(Member::new("member2", 20)).await.unwrap();
    }

    // Reconnecting keeps the existing tables and rows.
    let repo = connect(&config).await.unwrap();
    let found = repo
        .search(&MemberSearchCondition::new().age_goe(15))
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].username.as_deref(), Some("member2"));
}

#[tokio::test]
async fn test_connect_rejects_bad_url() {
    let mut config = SquadConfig::default();
    config.database.url = "sqlite://db.sqlite?synchronous=sometimes".into();

    let err = connect(&config).await.err().unwrap();
    assert!(matches!(err, Error::Sqlite(_)), "{}", err);
}
