//! Tab-separated dataset loading.
//!
//! A dataset directory holds up to three files named after the dataset:
//! `<name>.user`, `<name>.item` (both optional) and `<name>.inter`
//! (required). Every column header carries an explicit type suffix
//! (`user_id:token`, `category:string_seq`, `rating:float`); nothing is
//! sniffed or inferred from sample values. Role columns are resolved by the
//! fixed base names `user_id`, `item_id` and `rating`; all other columns
//! become node properties typed by their declared suffix.

use std::collections::BTreeMap;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use tracing::debug;

use crate::error::{RecError, Result};
use crate::model::PropertyValue;

/// A column type declared in a header suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeclaredType {
    Token,
    TokenSeq,
    Int,
    Float,
}

impl DeclaredType {
    fn parse(name: &str) -> Result<Self> {
        match name {
            "token" | "string" => Ok(DeclaredType::Token),
            "token_seq" | "string_seq" => Ok(DeclaredType::TokenSeq),
            "int" => Ok(DeclaredType::Int),
            "float" => Ok(DeclaredType::Float),
            other => Err(RecError::Dataset(format!(
                "unknown declared column type '{other}'"
            ))),
        }
    }

    fn parse_value(self, raw: &str) -> Result<PropertyValue> {
        match self {
            DeclaredType::Token => Ok(PropertyValue::Str(raw.to_string())),
            DeclaredType::TokenSeq => Ok(PropertyValue::Tokens(
                raw.split_whitespace().map(str::to_string).collect(),
            )),
            DeclaredType::Int => raw
                .parse::<i64>()
                .map(PropertyValue::Int)
                .map_err(|_| RecError::Dataset(format!("'{raw}' is not an integer"))),
            DeclaredType::Float => raw
                .parse::<f64>()
                .map(PropertyValue::Float)
                .map_err(|_| RecError::Dataset(format!("'{raw}' is not a float"))),
        }
    }
}

#[derive(Debug, Clone)]
struct ColumnSpec {
    base: String,
    ty: DeclaredType,
    index: usize,
}

/// A user or item row: external key plus typed properties.
#[derive(Debug, Clone)]
pub struct NodeRecord {
    /// External node identifier.
    pub key: String,
    /// Remaining columns, keyed by base column name.
    pub properties: BTreeMap<String, PropertyValue>,
}

/// One rating row of the interactions file.
#[derive(Debug, Clone)]
pub struct Interaction {
    /// Rating user.
    pub user: String,
    /// Rated item.
    pub item: String,
    /// Rating value.
    pub rating: f64,
}

/// A fully parsed dataset, ready to seed an engine.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    /// Rows of `<name>.user`, empty when the file is absent.
    pub users: Vec<NodeRecord>,
    /// Rows of `<name>.item`, empty when the file is absent.
    pub items: Vec<NodeRecord>,
    /// Rows of `<name>.inter`.
    pub interactions: Vec<Interaction>,
}

impl Dataset {
    /// Loads a dataset directory.
    pub fn load(name: &str, dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();

        let user_path = dir.join(format!("{name}.user"));
        let users = if user_path.exists() {
            load_nodes(&user_path, "user_id")?
        } else {
            Vec::new()
        };

        let item_path = dir.join(format!("{name}.item"));
        let items = if item_path.exists() {
            load_nodes(&item_path, "item_id")?
        } else {
            Vec::new()
        };

        let inter_path = dir.join(format!("{name}.inter"));
        if !inter_path.exists() {
            return Err(RecError::Dataset(format!(
                "missing interactions file {}",
                inter_path.display()
            )));
        }
        let interactions = load_interactions(&inter_path)?;

        debug!(
            dataset = name,
            users = users.len(),
            items = items.len(),
            interactions = interactions.len(),
            "dataset parsed"
        );
        Ok(Self {
            users,
            items,
            interactions,
        })
    }
}

fn open_columns(path: &Path) -> Result<(csv::Reader<std::fs::File>, Vec<ColumnSpec>)> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_path(path)
        .map_err(|e| csv_error(path, e))?;
    let headers = reader.headers().map_err(|e| csv_error(path, e))?.clone();
    let columns = parse_headers(&headers, path)?;
    Ok((reader, columns))
}

fn parse_headers(headers: &StringRecord, path: &Path) -> Result<Vec<ColumnSpec>> {
    headers
        .iter()
        .enumerate()
        .map(|(index, header)| {
            let (base, ty) = header.split_once(':').ok_or_else(|| {
                RecError::Dataset(format!(
                    "header '{header}' in {} lacks a ':type' suffix",
                    path.display()
                ))
            })?;
            Ok(ColumnSpec {
                base: base.to_string(),
                ty: DeclaredType::parse(ty)?,
                index,
            })
        })
        .collect()
}

fn find_column<'a>(columns: &'a [ColumnSpec], base: &str, path: &Path) -> Result<&'a ColumnSpec> {
    columns
        .iter()
        .find(|column| column.base == base)
        .ok_or_else(|| {
            RecError::Dataset(format!("{} has no '{base}' column", path.display()))
        })
}

fn cell<'r>(record: &'r StringRecord, column: &ColumnSpec, path: &Path) -> Result<&'r str> {
    record
        .get(column.index)
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .ok_or_else(|| {
            RecError::Dataset(format!(
                "missing value for column '{}' in {}",
                column.base,
                path.display()
            ))
        })
}

fn load_nodes(path: &Path, id_base: &str) -> Result<Vec<NodeRecord>> {
    let (mut reader, columns) = open_columns(path)?;
    let id_column = find_column(&columns, id_base, path)?.clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| csv_error(path, e))?;
        let key = cell(&record, &id_column, path)?.to_string();

        let mut properties = BTreeMap::new();
        for column in &columns {
            if column.base == id_base {
                continue;
            }
            let Some(raw) = record.get(column.index).map(str::trim) else {
                continue;
            };
            if raw.is_empty() {
                continue;
            }
            properties.insert(column.base.clone(), column.ty.parse_value(raw)?);
        }
        rows.push(NodeRecord { key, properties });
    }
    Ok(rows)
}

fn load_interactions(path: &Path) -> Result<Vec<Interaction>> {
    let (mut reader, columns) = open_columns(path)?;
    let user_column = find_column(&columns, "user_id", path)?.clone();
    let item_column = find_column(&columns, "item_id", path)?.clone();
    let rating_column = find_column(&columns, "rating", path)?.clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| csv_error(path, e))?;
        let user = cell(&record, &user_column, path)?.to_string();
        let item = cell(&record, &item_column, path)?.to_string();
        let raw = cell(&record, &rating_column, path)?;
        let PropertyValue::Float(rating) = rating_column.ty.parse_value(raw)? else {
            return Err(RecError::Dataset(format!(
                "rating column in {} must be declared float",
                path.display()
            )));
        };
        rows.push(Interaction { user, item, rating });
    }
    Ok(rows)
}

fn csv_error(path: &Path, err: csv::Error) -> RecError {
    RecError::Dataset(format!("{}: {err}", path.display()))
}
