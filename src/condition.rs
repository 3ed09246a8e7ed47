//! Member search conditions and the predicate builder.
//!
//! Each field of [`MemberSearchCondition`] contributes at most one
//! constraint; absent fields and blank strings contribute nothing. The
//! constraints are ANDed, and a condition with nothing set matches every
//! member.
//!
//! ```rust
//! use squad::condition::MemberSearchCondition;
//! use squad_query::{DatabaseType, Filter};
//!
//! let condition = MemberSearchCondition::new().team_name("teamB").age_goe(35).age_loe(40);
//! let (sql, params) = condition.to_filter().to_sql(DatabaseType::SQLite);
//! assert_eq!(sql, "(t.name = ? AND m.age >= ? AND m.age <= ?)");
//! assert_eq!(params.len(), 3);
//!
//! assert_eq!(MemberSearchCondition::new().username("  ").to_filter(), Filter::None);
//! ```

use serde::{Deserialize, Serialize};

use squad_query::filter::Filter;

/// Optional search fields for members.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MemberSearchCondition {
    /// Exact username.
    pub username: Option<String>,
    /// Exact name of the member's team.
    #[serde(alias = "team_name")]
    pub team_name: Option<String>,
    /// Minimum age, inclusive.
    #[serde(alias = "age_goe")]
    pub age_goe: Option<i32>,
    /// Maximum age, inclusive.
    #[serde(alias = "age_loe")]
    pub age_loe: Option<i32>,
}

/// A constraint constructor: one field's contribution, if any.
pub type Constraint = fn(&MemberSearchCondition) -> Option<Filter>;

/// Every constraint a condition can contribute, in clause order.
pub const CONSTRAINTS: [Constraint; 4] = [username_eq, team_name_eq, age_goe, age_loe];

impl MemberSearchCondition {
    /// A condition matching every member.
    pub fn new() -> Self {
        Self::default()
    }

    /// Require an exact username.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Require an exact team name.
    pub fn team_name(mut self, team_name: impl Into<String>) -> Self {
        self.team_name = Some(team_name.into());
        self
    }

    /// Require `age >= age_goe`.
    pub fn age_goe(mut self, age_goe: i32) -> Self {
        self.age_goe = Some(age_goe);
        self
    }

    /// Require `age <= age_loe`.
    pub fn age_loe(mut self, age_loe: i32) -> Self {
        self.age_loe = Some(age_loe);
        self
    }

    /// The conjunction of every active constraint.
    pub fn to_filter(&self) -> Filter {
        Filter::and(CONSTRAINTS.iter().filter_map(|constraint| constraint(self)))
    }

    /// Same conjunction as [`to_filter`](Self::to_filter), accumulated one
    /// field at a time.
    pub fn to_filter_with_builder(&self) -> Filter {
        let mut builder = Filter::and_builder();

        if let Some(username) = self.username.as_deref().filter(|s| has_text(s)) {
            builder.and(Filter::Equals("m.username".into(), username.into()));
        }
        if let Some(team_name) = self.team_name.as_deref().filter(|s| has_text(s)) {
            builder.and(Filter::Equals("t.name".into(), team_name.into()));
        }
        if let Some(age) = self.age_goe {
            builder.and(Filter::Gte("m.age".into(), age.into()));
        }
        if let Some(age) = self.age_loe {
            builder.and(Filter::Lte("m.age".into(), age.into()));
        }

        builder.build()
    }

    /// Number of active constraints.
    pub fn active_constraints(&self) -> usize {
        CONSTRAINTS.iter().filter(|constraint| constraint(self).is_some()).count()
    }

    /// Whether no field constrains the search.
    pub fn is_unconstrained(&self) -> bool {
        self.active_constraints() == 0
    }
}

/// Whether `s` contains a non-whitespace character.
pub fn has_text(s: &str) -> bool {
    !s.trim().is_empty()
}

fn username_eq(condition: &MemberSearchCondition) -> Option<Filter> {
    let username = condition.username.as_deref().filter(|s| has_text(s))?;
    Some(Filter::Equals("m.username".into(), username.into()))
}

fn team_name_eq(condition: &MemberSearchCondition) -> Option<Filter> {
    let team_name = condition.team_name.as_deref().filter(|s| has_text(s))?;
    Some(Filter::Equals("t.name".into(), team_name.into()))
}

fn age_goe(condition: &MemberSearchCondition) -> Option<Filter> {
    condition.age_goe.map(|age| Filter::Gte("m.age".into(), age.into()))
}

fn age_loe(condition: &MemberSearchCondition) -> Option<Filter> {
    condition.age_loe.map(|age| Filter::Lte("m.age".into(), age.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use squad_query::filter::FilterValue;

    #[test]
    fn test_empty_condition_matches_all() {
        let condition = MemberSearchCondition::new();
        assert_eq!(condition.to_filter(), Filter::None);
        assert!(condition.is_unconstrained());
    }

    #[test]
    fn test_blank_strings_are_absent() {
        for blank in ["", " ", "\t\n"] {
            let condition = MemberSearchCondition::new().username(blank).team_name(blank);
            assert_eq!(condition.to_filter(), Filter::None, "{:?}", blank);
            assert_eq!(condition.to_filter_with_builder(), Filter::None);
        }
    }

    #[test]
    fn test_single_constraint_is_not_wrapped() {
        let condition = MemberSearchCondition::new().age_goe(20);
        assert_eq!(
            condition.to_filter(),
            Filter::Gte("m.age".into(), FilterValue::Int(20))
        );
    }

    #[test]
    fn test_all_fields() {
        let condition = MemberSearchCondition::new()
            .username("member1")
            .team_name("teamA")
            .age_goe(10)
            .age_loe(20);
        assert_eq!(condition.active_constraints(), 4);
        assert_eq!(
            condition.to_filter(),
            Filter::And(vec![
                Filter::Equals("m.username".into(), "member1".into()),
                Filter::Equals("t.name".into(), "teamA".into()),
                Filter::Gte("m.age".into(), 10.into()),
                Filter::Lte("m.age".into(), 20.into()),
            ])
        );
    }

    #[test]
    fn test_builder_flavour_agrees() {
        let conditions = [
            MemberSearchCondition::new(),
            MemberSearchCondition::new().username("member1"),
            MemberSearchCondition::new().team_name("teamB").age_loe(40),
            MemberSearchCondition::new().username(" ").age_goe(35).age_loe(40),
            MemberSearchCondition::new()
                .username("member4")
                .team_name("teamB")
                .age_goe(35)
                .age_loe(40),
        ];
        for condition in conditions {
            assert_eq!(condition.to_filter(), condition.to_filter_with_builder());
        }
    }

    #[test]
    fn test_values_are_not_trimmed() {
        let condition = MemberSearchCondition::new().username(" member1 ");
        assert_eq!(
            condition.to_filter(),
            Filter::Equals("m.username".into(), " member1 ".into())
        );
    }

    #[test]
    fn test_deserialize_camel_and_snake_case() {
        let camel: MemberSearchCondition =
            serde_json::from_str(r#"{"teamName":"teamB","ageGoe":35,"ageLoe":40}"#).unwrap();
        let snake: MemberSearchCondition =
            serde_json::from_str(r#"{"team_name":"teamB","age_goe":35,"age_loe":40}"#).unwrap();
        assert_eq!(camel, snake);
        assert_eq!(camel, MemberSearchCondition::new().team_name("teamB").age_goe(35).age_loe(40));
    }
}
