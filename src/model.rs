//! Records and projections of the member/team schema.
//!
//! [`Member`] and [`Team`] are persisted records. [`MemberTeamDto`] and
//! [`MemberDto`] are read-only projections built from query rows through
//! [`FromRow`]; they are never written back.

use serde::{Deserialize, Serialize};

use squad_query::error::{QueryError, QueryResult};
use squad_query::row::{FromRow, Row};
use squad_query::schema::{ColumnDef, ColumnType, TableSchema};
use squad_query::traits::Model;

/// Alias of the member table in search queries.
pub const MEMBER_ALIAS: &str = "m";
/// Alias of the joined team table in search queries.
pub const TEAM_ALIAS: &str = "t";

/// A team members can belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    id: Option<i64>,
    /// Team name.
    pub name: String,
}

impl Team {
    /// A team not yet saved.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }

    /// Generated id, once saved.
    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub(crate) fn assign_id(&mut self, id: i64) {
        self.id = Some(id);
    }
}

impl Model for Team {
    const MODEL_NAME: &'static str = "Team";
    const TABLE_NAME: &'static str = "team";
    const PRIMARY_KEY: &'static str = "id";
    const COLUMNS: &'static [&'static str] = &["id", "name"];

    fn schema() -> TableSchema {
        TableSchema::new(
            Self::TABLE_NAME,
            [ColumnDef::id("id"), ColumnDef::required("name", ColumnType::Text)],
        )
    }

    fn to_row(&self) -> Row {
        let row = Row::new().with("name", self.name.as_str());
        match self.id {
            Some(id) => row.with("id", id),
            None => row,
        }
    }
}

impl FromRow for Team {
    fn from_row(row: &Row) -> QueryResult<Self> {
        Ok(Self {
            id: Some(row.get_i64("id")?),
            name: row.get_string("name")?,
        })
    }
}

/// A member, optionally linked to a team by id.
///
/// The id is generated on save and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    id: Option<i64>,
    /// Login name; may be absent.
    pub username: Option<String>,
    /// Age in years.
    pub age: i32,
    team_id: Option<i64>,
}

impl Member {
    /// A member without a team.
    pub fn new(username: impl Into<String>, age: i32) -> Self {
        Self {
            id: None,
            username: Some(username.into()),
            age,
            team_id: None,
        }
    }

    /// A member of `team`.
    ///
    /// Fails when `team` has not been saved yet.
    pub fn with_team(username: impl Into<String>, age: i32, team: &Team) -> QueryResult<Self> {
        let mut member = Self::new(username, age);
        member.change_team(team)?;
        Ok(member)
    }

    /// Generated id, once saved.
    pub fn id(&self) -> Option<i64> {
        self.id
    }

    /// Id of the team this member belongs to.
    pub fn team_id(&self) -> Option<i64> {
        self.team_id
    }

    /// Move this member to `team`.
    pub fn change_team(&mut self, team: &Team) -> QueryResult<()> {
        let id = team.id().ok_or_else(|| {
            QueryError::foreign_key_violation(format!(
                "team '{}' must be saved before members can join it",
                team.name
            ))
            .with_model(Team::MODEL_NAME)
        })?;
        self.team_id = Some(id);
        Ok(())
    }

    /// Leave the current team.
    pub fn leave_team(&mut self) {
        self.team_id = None;
    }

    pub(crate) fn assign_id(&mut self, id: i64) {
        self.id = Some(id);
    }
}

impl Model for Member {
    const MODEL_NAME: &'static str = "Member";
    const TABLE_NAME: &'static str = "member";
    const PRIMARY_KEY: &'static str = "id";
    const COLUMNS: &'static [&'static str] = &["id", "username", "age", "team_id"];

    fn schema() -> TableSchema {
        TableSchema::new(
            Self::TABLE_NAME,
            [
                ColumnDef::id("id"),
                ColumnDef::optional("username", ColumnType::Text),
                ColumnDef::required("age", ColumnType::Integer),
                ColumnDef::optional("team_id", ColumnType::Integer).references(Team::TABLE_NAME, "id"),
            ],
        )
    }

    fn to_row(&self) -> Row {
        let row = Row::new()
            .with("username", self.username.clone())
            .with("age", self.age)
            .with("team_id", self.team_id);
        match self.id {
            Some(id) => row.with("id", id),
            None => row,
        }
    }
}

impl FromRow for Member {
    fn from_row(row: &Row) -> QueryResult<Self> {
        Ok(Self {
            id: Some(row.get_i64("id")?),
            username: row.get_opt_string("username")?,
            age: row.get_i32("age")?,
            team_id: row.get_opt_i64("team_id")?,
        })
    }
}

/// Flattened member-with-team search result.
///
/// Team fields are absent for members without a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberTeamDto {
    /// Member id.
    pub member_id: i64,
    /// Member username.
    pub username: Option<String>,
    /// Member age.
    pub age: i32,
    /// Team id.
    pub team_id: Option<i64>,
    /// Team name.
    pub team_name: Option<String>,
}

impl MemberTeamDto {
    /// Projected `(column, output name)` pairs, in output order.
    pub const PROJECTION: &'static [(&'static str, &'static str)] = &[
        ("m.id", "member_id"),
        ("m.username", "username"),
        ("m.age", "age"),
        ("t.id", "team_id"),
        ("t.name", "team_name"),
    ];
}

impl FromRow for MemberTeamDto {
    fn from_row(row: &Row) -> QueryResult<Self> {
        Ok(Self {
            member_id: row.get_i64("member_id")?,
            username: row.get_opt_string("username")?,
            age: row.get_i32("age")?,
            team_id: row.get_opt_i64("team_id")?,
            team_name: row.get_opt_string("team_name")?,
        })
    }
}

/// Username and age only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberDto {
    /// Member username.
    pub username: Option<String>,
    /// Member age.
    pub age: i32,
}

impl MemberDto {
    /// Projected `(column, output name)` pairs, in output order.
    pub const PROJECTION: &'static [(&'static str, &'static str)] =
        &[("m.username", "username"), ("m.age", "age")];
}

impl FromRow for MemberDto {
    fn from_row(row: &Row) -> QueryResult<Self> {
        Ok(Self {
            username: row.get_opt_string("username")?,
            age: row.get_i32("age")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use squad_query::filter::FilterValue;

    #[test]
    fn test_member_row_omits_unassigned_id() {
        let member = Member::new("member1", 10);
        let row = member.to_row();
        assert!(!row.contains("id"));
        assert_eq!(row.get("team_id"), Some(&FilterValue::Null));
    }

    #[test]
    fn test_change_team_requires_saved_team() {
        let mut member = Member::new("member1", 10);
        let err = member.change_team(&Team::new("teamA")).unwrap_err();
        assert!(err.is_constraint_violation());
        assert_eq!(member.team_id(), None);

        let mut team = Team::new("teamA");
        team.assign_id(7);
        member.change_team(&team).unwrap();
        assert_eq!(member.team_id(), Some(7));

        member.leave_team();
        assert_eq!(member.team_id(), None);
    }

    #[test]
    fn test_member_from_row() {
        let row = Row::new()
            .with("id", 3i64)
            .with("username", FilterValue::Null)
            .with("age", 30)
            .with("team_id", 2i64);
        let member = Member::from_row(&row).unwrap();
        assert_eq!(member.id(), Some(3));
        assert_eq!(member.username, None);
        assert_eq!(member.team_id(), Some(2));
    }

    #[test]
    fn test_member_team_dto_from_row_without_team() {
        let row = Row::new()
            .with("member_id", 5i64)
            .with("username", "loner")
            .with("age", 50)
            .with("team_id", FilterValue::Null)
            .with("team_name", FilterValue::Null);
        let dto = MemberTeamDto::from_row(&row).unwrap();
        assert_eq!(dto.team_name, None);
        assert_eq!(dto.member_id, 5);
    }

    #[test]
    fn test_dto_from_row_reports_missing_column() {
        let row = Row::new().with("username", "member1");
        let err = MemberDto::from_row(&row).unwrap_err();
        assert!(err.is_store_error());
    }

    #[test]
    fn test_member_team_dto_serializes_camel_case() {
        let dto = MemberTeamDto {
            member_id: 1,
            username: Some("member1".into()),
            age: 10,
            team_id: Some(1),
            team_name: Some("teamA".into()),
        };
        let json = serde_json::to_value(&dto).unwrap();
        assert_eq!(json["memberId"], 1);
        assert_eq!(json["teamName"], "teamA");
    }
}
