//! Member repository: CRUD on members and teams, and condition searches.
//!
//! Every search builds the same shape of query: members `m` left-joined to
//! teams `t` (members without a team are kept), filtered by the condition's
//! constraints and projected into [`MemberTeamDto`]. Paged searches hand the
//! query to the pager with the chosen [`PageStrategy`].
//!
//! Searches without a sort return rows in store-defined order. Both bundled
//! engines return insertion order for this query, but callers that need a
//! stable order should sort through [`PageRequest::sorted`] or
//! [`MemberRepository::search_sorted`].

use tracing::{debug, info, instrument};

use squad_query::error::{QueryError, QueryResult};
use squad_query::filter::Filter;
use squad_query::pager::{self, PageStrategy};
use squad_query::pagination::{Page, PageRequest};
use squad_query::query::{SelectQuery, TableRef};
use squad_query::squad_debug;
use squad_query::traits::{Model, QueryEngine};
use squad_query::types::OrderBy;

use crate::condition::MemberSearchCondition;
use crate::model::{MEMBER_ALIAS, Member, MemberDto, MemberTeamDto, TEAM_ALIAS, Team};

/// Repository over the member/team schema.
///
/// Holds nothing but the engine handle, so clones are cheap and calls are
/// independent.
#[derive(Clone)]
pub struct MemberRepository<E: QueryEngine> {
    engine: E,
    log_queries: bool,
}

impl<E: QueryEngine> MemberRepository<E> {
    /// Create a repository over `engine`.
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            log_queries: false,
        }
    }

    /// Log every search statement at info level.
    pub fn with_query_logging(mut self, enabled: bool) -> Self {
        self.log_queries = enabled;
        self
    }

    /// The underlying engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Create the team and member tables if missing.
    pub async fn install_schema(&self) -> QueryResult<()> {
        self.engine.create_table(&Team::schema()).await?;
        self.engine.create_table(&Member::schema()).await
    }

    // ============== Records ==============

    /// Insert a team and return it with its generated id.
    #[instrument(skip(self, team), fields(name = %team.name))]
    pub async fn save_team(&self, mut team: Team) -> QueryResult<Team> {
        let id = self
            .engine
            .insert(Team::TABLE_NAME, team.to_row())
            .await
            .map_err(|e| e.with_model(Team::MODEL_NAME).with_context("save team"))?;
        team.assign_id(id);
        debug!(id, "Team saved");
        Ok(team)
    }

    /// Insert a member and return it with its generated id.
    #[instrument(skip(self, member), fields(username = ?member.username))]
    pub async fn save(&self, mut member: Member) -> QueryResult<Member> {
        let id = self
            .engine
            .insert(Member::TABLE_NAME, member.to_row())
            .await
            .map_err(|e| e.with_model(Member::MODEL_NAME).with_context("save member"))?;
        member.assign_id(id);
        debug!(id, "Member saved");
        Ok(member)
    }

    /// Look up a member by id.
    pub async fn find_by_id(&self, id: i64) -> QueryResult<Option<Member>> {
        let query = members_query().r#where(Filter::Equals("m.id".into(), id.into())).take(1);
        let mut members: Vec<Member> = pager::fetch_all(&self.engine, &query).await?;
        Ok(members.pop())
    }

    /// Look up a member by id, failing when it does not exist.
    pub async fn get_by_id(&self, id: i64) -> QueryResult<Member> {
        self.find_by_id(id).await?.ok_or_else(|| {
            QueryError::not_found(Member::MODEL_NAME)
                .with_field(format!("id = {}", id))
                .with_context("get member by id")
        })
    }

    /// Every member, in store order.
    pub async fn find_all(&self) -> QueryResult<Vec<Member>> {
        pager::fetch_all(&self.engine, &members_query()).await
    }

    /// Members with exactly this username.
    pub async fn find_by_username(&self, username: &str) -> QueryResult<Vec<Member>> {
        let query = members_query().r#where(Filter::Equals("m.username".into(), username.into()));
        pager::fetch_all(&self.engine, &query).await
    }

    // ============== Searches ==============

    /// Every member matching `condition`, with team details.
    pub async fn search(&self, condition: &MemberSearchCondition) -> QueryResult<Vec<MemberTeamDto>> {
        self.run_search(condition.to_filter(), OrderBy::none()).await
    }

    /// Like [`search`](Self::search), ordered by `order`.
    ///
    /// Order columns may name projected fields (`member_id`, `age`, ...) or
    /// qualified columns (`m.age`, `t.name`).
    pub async fn search_sorted(
        &self,
        condition: &MemberSearchCondition,
        order: impl Into<OrderBy>,
    ) -> QueryResult<Vec<MemberTeamDto>> {
        self.run_search(condition.to_filter(), order.into()).await
    }

    /// [`search`](Self::search) with the constraint set accumulated by a
    /// builder. Returns the same members.
    pub async fn search_by_builder(&self, condition: &MemberSearchCondition) -> QueryResult<Vec<MemberTeamDto>> {
        self.run_search(condition.to_filter_with_builder(), OrderBy::none()).await
    }

    /// Username and age of every member matching `condition`.
    pub async fn search_member_dtos(&self, condition: &MemberSearchCondition) -> QueryResult<Vec<MemberDto>> {
        let query = project(member_team_source(), MemberDto::PROJECTION).r#where(condition.to_filter());
        self.log_query(&query);
        pager::fetch_all(&self.engine, &query).await
    }

    /// One page of matches; content and total in one round trip.
    pub async fn search_page_simple(
        &self,
        condition: &MemberSearchCondition,
        request: &PageRequest,
    ) -> QueryResult<Page<MemberTeamDto>> {
        self.search_page(condition, request, PageStrategy::Simple).await
    }

    /// One page of matches; the count query runs only when the page alone
    /// cannot prove the total.
    pub async fn search_page_complex(
        &self,
        condition: &MemberSearchCondition,
        request: &PageRequest,
    ) -> QueryResult<Page<MemberTeamDto>> {
        self.search_page(condition, request, PageStrategy::Optimized).await
    }

    /// One page of matches with an explicit strategy.
    #[instrument(skip(self, condition, request), fields(page = request.page_index(), size = request.page_size()))]
    pub async fn search_page(
        &self,
        condition: &MemberSearchCondition,
        request: &PageRequest,
        strategy: PageStrategy,
    ) -> QueryResult<Page<MemberTeamDto>> {
        let query = member_team_query(condition.to_filter());
        squad_debug!(
            constraints = condition.active_constraints(),
            strategy = %strategy,
            "Paged member search"
        );
        self.log_query(&query);
        pager::fetch_page(&self.engine, &query, request, strategy).await
    }

    async fn run_search(&self, filter: Filter, order: OrderBy) -> QueryResult<Vec<MemberTeamDto>> {
        let query = member_team_query(filter).order_by(order);
        squad_debug!(filter = ?query.filter(), "Member search");
        self.log_query(&query);
        pager::fetch_all(&self.engine, &query).await
    }

    fn log_query(&self, query: &SelectQuery) {
        if self.log_queries {
            let (sql, params) = query.build_sql(self.engine.database_type());
            info!(sql = %sql, params = ?params, "Member search query");
        }
    }
}

/// `member m LEFT JOIN team t ON m.team_id = t.id`, nothing projected yet.
fn member_team_source() -> SelectQuery {
    SelectQuery::new(TableRef::aliased(Member::TABLE_NAME, MEMBER_ALIAS)).left_join(
        TableRef::aliased(Team::TABLE_NAME, TEAM_ALIAS),
        "m.team_id",
        "t.id",
    )
}

/// The member/team search query for `filter`.
pub fn member_team_query(filter: Filter) -> SelectQuery {
    project(member_team_source(), MemberTeamDto::PROJECTION).r#where(filter)
}

fn members_query() -> SelectQuery {
    SelectQuery::new(TableRef::aliased(Member::TABLE_NAME, MEMBER_ALIAS)).columns_of(MEMBER_ALIAS, Member::COLUMNS)
}

fn project(query: SelectQuery, projection: &[(&str, &str)]) -> SelectQuery {
    projection
        .iter()
        .fold(query, |query, (column, alias)| query.column(*column, *alias))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use squad_query::memory::{EngineOp, MemoryEngine};
    use squad_query::sql::DatabaseType;

    async fn repository() -> MemberRepository<MemoryEngine> {
        let repo = MemberRepository::new(MemoryEngine::new());
        repo.install_schema().await.unwrap();
        repo
    }

    #[test]
    fn test_member_team_query_sql() {
        let (sql, _) = member_team_query(Filter::None).build_sql(DatabaseType::SQLite);
        assert_eq!(
            sql,
            "SELECT m.id AS member_id, m.username AS username, m.age AS age, \
             t.id AS team_id, t.name AS team_name \
             FROM member m LEFT JOIN team t ON m.team_id = t.id"
        );
    }

    #[tokio::test]
    async fn test_save_and_find() {
        let repo = repository().await;
        let member = repo.save(Member::new("member1", 10)).await.unwrap();
        let id = member.id().unwrap();

        assert_eq!(repo.find_by_id(id).await.unwrap(), Some(member.clone()));
        assert_eq!(repo.find_all().await.unwrap(), vec![member.clone()]);
        assert_eq!(repo.find_by_username("member1").await.unwrap(), vec![member]);
        assert_eq!(repo.find_by_id(id + 1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let repo = repository().await;
        let err = repo.get_by_id(42).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.context.model.as_deref(), Some("Member"));
    }

    #[tokio::test]
    async fn test_save_member_with_missing_team() {
        let repo = repository().await;
        let mut ghost = Team::new("ghost");
        ghost.assign_id(99);
        let member = Member::with_team("member1", 10, &ghost).unwrap();

        let err = repo.save(member).await.unwrap_err();
        assert!(err.is_constraint_violation());
        assert_eq!(err.context.operation.as_deref(), Some("save member"));
    }

    #[tokio::test]
    async fn test_search_page_complex_skips_count_for_single_page() {
        let repo = repository().await;
        let team = repo.save_team(Team::new("teamA")).await.unwrap();
        repo.save(Member::with_team("member1", 10, &team).unwrap()).await.unwrap();
        repo.engine().stats().reset();

        let page = repo
            .search_page_complex(&MemberSearchCondition::new(), &PageRequest::of(0, 3).unwrap())
            .await
            .unwrap();

        assert_eq!(page.total(), 1);
        assert_eq!(page.content()[0].team_name.as_deref(), Some("teamA"));
        assert_eq!(repo.engine().stats().calls(EngineOp::Count), 0);
    }

    #[tokio::test]
    async fn test_query_logging_does_not_change_results() {
        let repo = repository().await.with_query_logging(true);
        repo.save(Member::new("member1", 10)).await.unwrap();
        let found = repo
            .search(&MemberSearchCondition::new().username("member1"))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
    }
}
