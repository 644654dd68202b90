use std::cmp::Ordering;
use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use super::{
    object_id::MovieId,
    query::{MovieFilter, SortDirection, SortField},
    repo::MovieStore,
    repo_types::Movie,
};

/// In-process movie collection. Filtering and ordering match
/// [`super::repo::PgMovieStore`].
#[derive(Default)]
pub struct MemoryMovieStore {
    docs: RwLock<BTreeMap<MovieId, Map<String, Value>>>,
}

impl MemoryMovieStore {
    pub fn new(movies: impl IntoIterator<Item = Movie>) -> Self {
        Self {
            docs: RwLock::new(movies.into_iter().map(|m| (m.id, m.fields)).collect()),
        }
    }
}

fn matches(doc: &Map<String, Value>, filter: &MovieFilter) -> bool {
    match &filter.title_contains {
        None => true,
        Some(term) => doc
            .get("title")
            .and_then(Value::as_str)
            .is_some_and(|t| t.to_lowercase().contains(&term.to_lowercase())),
    }
}

fn lookup<'a>(doc: &'a Map<String, Value>, path: &[String]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    rest.iter()
        .try_fold(doc.get(first)?, |v, key| v.as_object()?.get(key))
}

fn type_rank(v: Option<&Value>) -> u8 {
    match v {
        None | Some(Value::Null) => 0,
        Some(Value::Number(_)) => 1,
        Some(Value::String(_)) => 2,
        Some(Value::Object(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Bool(_)) => 5,
    }
}

/// Orders values by type bracket: missing/null, numbers, strings, objects,
/// arrays, booleans. Numbers, strings (bytewise) and booleans are then
/// compared by value; objects and arrays tie within their bracket.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn compare_docs(a: &Map<String, Value>, b: &Map<String, Value>, sort: &[SortField]) -> Ordering {
    sort.iter()
        .map(|field| {
            let ord = compare_values(lookup(a, &field.path), lookup(b, &field.path));
            match field.direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        })
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

#[async_trait]
impl MovieStore for MemoryMovieStore {
    async fn count(&self, filter: &MovieFilter) -> anyhow::Result<u64> {
        let docs = self.docs.read().await;
        Ok(docs.values().filter(|d| matches(d, filter)).count() as u64)
    }

    async fn find(
        &self,
        filter: &MovieFilter,
        sort: &[SortField],
        skip: u64,
        limit: u64,
    ) -> anyhow::Result<Vec<Movie>> {
        let docs = self.docs.read().await;
        // BTreeMap iteration is id-ordered; the stable sort keeps that as the tie-break
        let mut hits: Vec<(&MovieId, &Map<String, Value>)> =
            docs.iter().filter(|(_, d)| matches(d, filter)).collect();
        hits.sort_by(|(_, a), (_, b)| compare_docs(a, b, sort));

        let skip = usize::try_from(skip).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(hits
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|(id, d)| Movie::new(*id, d.clone()))
            .collect())
    }

    async fn get(&self, id: MovieId) -> anyhow::Result<Option<Movie>> {
        let docs = self.docs.read().await;
        Ok(docs.get(&id).map(|d| Movie::new(id, d.clone())))
    }

    async fn merge(&self, id: MovieId, fields: Map<String, Value>) -> anyhow::Result<bool> {
        let mut docs = self.docs.write().await;
        let Some(doc) = docs.get_mut(&id) else {
            return Ok(false);
        };
        doc.extend(fields);
        Ok(true)
    }
}
