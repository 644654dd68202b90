use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::{types::Json, FromRow};

use super::object_id::MovieId;

/// A movie document: its identifier plus whatever fields the dataset carries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Movie {
    pub id: MovieId,
    /// Never holds an `id` key; the identifier above is the only one emitted.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Movie {
    pub fn new(id: MovieId, mut fields: Map<String, Value>) -> Self {
        fields.remove("id");
        Self { id, fields }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

#[derive(Debug, FromRow)]
pub struct MovieRow {
    pub id: String,
    pub doc: Json<Map<String, Value>>,
}

impl TryFrom<MovieRow> for Movie {
    type Error = anyhow::Error;

    fn try_from(row: MovieRow) -> Result<Self, Self::Error> {
        let id = row
            .id
            .parse::<MovieId>()
            .map_err(|e| anyhow::anyhow!("stored id {:?}: {e}", row.id))?;
        Ok(Movie::new(id, row.doc.0))
    }
}
