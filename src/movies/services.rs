use serde_json::Value;
use tracing::{debug, info};

use super::{
    dto::{MoviePage, MoviePatch},
    object_id::MovieId,
    query::{total_pages, ListingQuery},
    repo::MovieStore,
    repo_types::Movie,
};
use crate::error::{AppError, AppResult};

fn parse_id(raw: &str) -> AppResult<MovieId> {
    raw.parse()
        .map_err(|_| AppError::BadRequest("Invalid movie id".into()))
}

fn not_found() -> AppError {
    AppError::NotFound("Movie not found".into())
}

pub async fn list(movies: &dyn MovieStore, query: &ListingQuery) -> AppResult<MoviePage> {
    let count = movies.count(&query.filter).await?;
    let page = movies
        .find(&query.filter, &query.sort, query.skip(), query.limit)
        .await?;
    debug!(count, returned = page.len(), page = query.page, "movies listed");
    Ok(MoviePage {
        movies: page,
        total_pages: total_pages(count, query.limit),
    })
}

pub async fn get_by_id(movies: &dyn MovieStore, raw_id: &str) -> AppResult<Movie> {
    let id = parse_id(raw_id)?;
    movies.get(id).await?.ok_or_else(not_found)
}

/// Validates `body` against the updatable fields and merges it into the
/// movie. Concurrent updates are last-write-wins.
pub async fn update_partial(movies: &dyn MovieStore, raw_id: &str, body: Value) -> AppResult<()> {
    let id = parse_id(raw_id)?;
    let fields = MoviePatch::from_json(body)?.into_fields()?;
    let keys: Vec<String> = fields.keys().cloned().collect();
    if !movies.merge(id, fields).await? {
        return Err(not_found());
    }
    info!(%id, ?keys, "movie updated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movies::{dto::ListParams, memory::MemoryMovieStore};
    use serde_json::json;

    fn movie(n: u8, doc: Value) -> Movie {
        let mut bytes = [0u8; 12];
        bytes[11] = n;
        let Value::Object(fields) = doc else {
            panic!("fixture must be an object")
        };
        Movie::new(MovieId::from_bytes(bytes), fields)
    }

    fn query(page: &str, limit: &str, sort_by: &str, sort_order: &str) -> ListingQuery {
        ListingQuery::from_params(&ListParams {
            page: Some(page.into()),
            limit: Some(limit.into()),
            search: None,
            sort_by: Some(sort_by.into()),
            sort_order: Some(sort_order.into()),
        })
        .unwrap()
    }

    fn titles(page: &MoviePage) -> Vec<String> {
        page.movies
            .iter()
            .map(|m| m.get("title").and_then(Value::as_str).unwrap().to_string())
            .collect()
    }

    fn abc_store() -> MemoryMovieStore {
        MemoryMovieStore::new([
            movie(1, json!({ "title": "A", "year": 2000 })),
            movie(2, json!({ "title": "B", "year": 2001 })),
            movie(3, json!({ "title": "C", "year": 1999 })),
        ])
    }

    #[tokio::test]
    async fn first_page_of_two() {
        let store = abc_store();
        let page = list(&store, &query("1", "2", "title", "asc")).await.unwrap();
        assert_eq!(titles(&page), vec!["A", "B"]);
        assert_eq!(page.total_pages, 2);
    }

    #[tokio::test]
    async fn last_page_holds_the_remainder() {
        let store = MemoryMovieStore::new((1..=23).map(|n| {
            movie(n, json!({ "title": format!("Movie {n:02}"), "year": 1990 + n as i64 }))
        }));
        let first = list(&store, &query("1", "10", "title", "")).await.unwrap();
        assert_eq!(first.total_pages, 3);

        let last = list(&store, &query("3", "10", "title", "")).await.unwrap();
        assert_eq!(last.movies.len(), 3);
        assert_eq!(titles(&last), vec!["Movie 21", "Movie 22", "Movie 23"]);

        let beyond = list(&store, &query("4", "10", "title", "")).await.unwrap();
        assert!(beyond.movies.is_empty());
    }

    #[tokio::test]
    async fn multi_field_sort_defaults_missing_direction_to_ascending() {
        let store = MemoryMovieStore::new([
            movie(1, json!({ "title": "Zulu", "year": 1964 })),
            movie(2, json!({ "title": "Heat", "year": 1995 })),
            movie(3, json!({ "title": "Casino", "year": 1995 })),
            movie(4, json!({ "title": "Alien", "year": 1979 })),
        ]);
        let page = list(&store, &query("1", "10", "year,title", "desc"))
            .await
            .unwrap();
        assert_eq!(titles(&page), vec!["Casino", "Heat", "Alien", "Zulu"]);
    }

    #[tokio::test]
    async fn empty_result_has_zero_pages() {
        let store = MemoryMovieStore::default();
        let page = list(&store, &query("1", "10", "", "")).await.unwrap();
        assert!(page.movies.is_empty());
        assert_eq!(page.total_pages, 0);
    }

    #[tokio::test]
    async fn get_by_id_distinguishes_malformed_and_absent() {
        let store = abc_store();
        assert!(matches!(
            get_by_id(&store, "not-an-id").await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            get_by_id(&store, "ffffffffffffffffffffffff").await,
            Err(AppError::NotFound(_))
        ));
        let found = get_by_id(&store, "000000000000000000000002").await.unwrap();
        assert_eq!(found.get("title"), Some(&json!("B")));
    }

    #[tokio::test]
    async fn update_changes_only_the_given_field_and_is_idempotent() {
        let store = abc_store();
        let id = "000000000000000000000001";
        update_partial(&store, id, json!({ "year": 1999 })).await.unwrap();
        let once = get_by_id(&store, id).await.unwrap();
        update_partial(&store, id, json!({ "year": 1999 })).await.unwrap();
        let twice = get_by_id(&store, id).await.unwrap();

        assert_eq!(once.get("year"), Some(&json!(1999)));
        assert_eq!(once.get("title"), Some(&json!("A")));
        assert_eq!(once.fields.len(), 2);
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn update_errors() {
        let store = abc_store();
        assert!(matches!(
            update_partial(&store, "123", json!({ "year": 1999 })).await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            update_partial(&store, "ffffffffffffffffffffffff", json!({ "year": 1999 })).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            update_partial(&store, "000000000000000000000001", json!({ "rating": 5 })).await,
            Err(AppError::BadRequest(_))
        ));
    }
}
