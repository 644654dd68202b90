use anyhow::Context;
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{types::Json, PgPool, Postgres, QueryBuilder};

use super::{
    object_id::MovieId,
    query::{MovieFilter, SortDirection, SortField},
    repo_types::{Movie, MovieRow},
};

/// Document-store primitives the movie services are built on.
#[async_trait]
pub trait MovieStore: Send + Sync {
    async fn count(&self, filter: &MovieFilter) -> anyhow::Result<u64>;

    /// Matching movies ordered by `sort` (then by id), windowed by skip/limit.
    async fn find(
        &self,
        filter: &MovieFilter,
        sort: &[SortField],
        skip: u64,
        limit: u64,
    ) -> anyhow::Result<Vec<Movie>>;

    async fn get(&self, id: MovieId) -> anyhow::Result<Option<Movie>>;

    /// Shallow-merges `fields` into the document. Returns `false` when no
    /// document has this id.
    async fn merge(&self, id: MovieId, fields: Map<String, Value>) -> anyhow::Result<bool>;
}

#[derive(Clone)]
pub struct PgMovieStore {
    db: PgPool,
}

impl PgMovieStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &MovieFilter) {
    if let Some(term) = &filter.title_contains {
        qb.push(" WHERE strpos(lower(doc->>'title'), lower(")
            .push_bind(term.clone())
            .push(")) > 0");
    }
}

fn direction_sql(direction: SortDirection) -> &'static str {
    match direction {
        SortDirection::Asc => " ASC",
        SortDirection::Desc => " DESC",
    }
}

fn to_i64(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

/// Sort keys for one field, whose value is bound as `s{i}.v`.
///
/// jsonb's own ordering ranks strings below numbers and compares strings with
/// the database collation. Documents are ordered instead by type bracket
/// (missing/null, numbers, strings, objects, arrays, booleans), then by value
/// within numbers, strings (bytewise) and booleans.
fn push_sort_keys(qb: &mut QueryBuilder<'_, Postgres>, i: usize, direction: SortDirection) {
    let v = format!("s{i}.v");
    let dir = direction_sql(direction);
    qb.push(format!(
        "CASE jsonb_typeof({v}) WHEN 'number' THEN 1 WHEN 'string' THEN 2 \
         WHEN 'object' THEN 3 WHEN 'array' THEN 4 WHEN 'boolean' THEN 5 ELSE 0 END{dir}, \
         CASE WHEN jsonb_typeof({v}) = 'number' THEN ({v})::numeric END{dir}, \
         (CASE WHEN jsonb_typeof({v}) = 'string' THEN {v} #>> '{{}}' END) COLLATE \"C\"{dir}, \
         CASE WHEN jsonb_typeof({v}) = 'boolean' THEN ({v})::boolean END{dir}, "
    ));
}

/// `SELECT id, doc` for one listing page.
fn find_query(
    filter: &MovieFilter,
    sort: &[SortField],
    skip: u64,
    limit: u64,
) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::<Postgres>::new("SELECT id, doc FROM movies");
    for (i, field) in sort.iter().enumerate() {
        qb.push(" CROSS JOIN LATERAL (SELECT doc #> ")
            .push_bind(field.path.clone())
            .push(format!(" AS v) AS s{i}"));
    }
    push_filter(&mut qb, filter);
    qb.push(" ORDER BY ");
    for (i, field) in sort.iter().enumerate() {
        push_sort_keys(&mut qb, i, field.direction);
    }
    qb.push("id ASC OFFSET ")
        .push_bind(to_i64(skip))
        .push(" LIMIT ")
        .push_bind(to_i64(limit));
    qb
}

#[async_trait]
impl MovieStore for PgMovieStore {
    async fn count(&self, filter: &MovieFilter) -> anyhow::Result<u64> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM movies");
        push_filter(&mut qb, filter);
        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(&self.db)
            .await
            .context("count movies")?;
        Ok(count.max(0) as u64)
    }

    async fn find(
        &self,
        filter: &MovieFilter,
        sort: &[SortField],
        skip: u64,
        limit: u64,
    ) -> anyhow::Result<Vec<Movie>> {
        let mut qb = find_query(filter, sort, skip, limit);
        let rows: Vec<MovieRow> = qb
            .build_query_as()
            .fetch_all(&self.db)
            .await
            .context("find movies")?;
        rows.into_iter().map(Movie::try_from).collect()
    }

    async fn get(&self, id: MovieId) -> anyhow::Result<Option<Movie>> {
        let row = sqlx::query_as::<_, MovieRow>(r#"SELECT id, doc FROM movies WHERE id = $1"#)
            .bind(id.to_string())
            .fetch_optional(&self.db)
            .await
            .context("get movie")?;
        row.map(Movie::try_from).transpose()
    }

    async fn merge(&self, id: MovieId, fields: Map<String, Value>) -> anyhow::Result<bool> {
        let res = sqlx::query(r#"UPDATE movies SET doc = doc || $2 WHERE id = $1"#)
            .bind(id.to_string())
            .bind(Json(Value::Object(fields)))
            .execute(&self.db)
            .await
            .context("merge movie fields")?;
        Ok(res.rows_affected() > 0)
    }
}
