//! Venue metadata keyed by place id, built from the `wisata_data.csv` export.
//!
//! Exports come in two column-naming conventions (the public Kaggle
//! dataset's English headers and the project's Indonesian ones), so every
//! logical field is resolved through [`FIELD_TABLE`].

use std::collections::HashMap;
use std::io::Read;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::WisataRecommendation;
use crate::utils::{image_url, truncate_with_ellipsis};

/// Identifier columns in priority order; the first column is used otherwise.
pub const ID_COLUMNS: &[&str] = &["Place_Id", "wisata_id"];

/// Cell values treated as missing, as the dataframe exporter writes them.
pub const NULL_MARKERS: &[&str] = &[
    "", "NaN", "nan", "-NaN", "-nan", "NA", "N/A", "n/a", "<NA>", "#N/A", "NULL", "null", "None",
];

/// Image name used when the venue name column is absent or empty.
pub const DEFAULT_IMAGE_NAME: &str = "default";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    Category,
    City,
    Price,
    Rating,
    Description,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldDefault {
    Text(&'static str),
    Integer(i64),
    Float(f64),
}

impl FieldDefault {
    pub fn as_text(&self) -> String {
        match self {
            FieldDefault::Text(value) => value.to_string(),
            FieldDefault::Integer(value) => value.to_string(),
            FieldDefault::Float(value) => value.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub field: Field,
    pub columns: &'static [&'static str],
    pub default: FieldDefault,
}

pub const FIELD_TABLE: &[FieldSpec] = &[
    FieldSpec {
        field: Field::Name,
        columns: &["Place_Name", "nama_wisata"],
        default: FieldDefault::Text("Unknown"),
    },
    FieldSpec {
        field: Field::Category,
        columns: &["Category", "kategori"],
        default: FieldDefault::Text("Unknown"),
    },
    FieldSpec {
        field: Field::City,
        columns: &["City", "lokasi"],
        default: FieldDefault::Text("Unknown"),
    },
    FieldSpec {
        field: Field::Price,
        columns: &["Price", "harga"],
        default: FieldDefault::Integer(0),
    },
    FieldSpec {
        field: Field::Rating,
        columns: &["Rating", "rating"],
        default: FieldDefault::Float(4.0),
    },
    FieldSpec {
        field: Field::Description,
        columns: &["Description", "deskripsi"],
        default: FieldDefault::Text("Tempat wisata menarik di Jawa Timur"),
    },
];

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("csv file has no columns")]
    NoColumns,

    #[error("duplicate place id '{0}'")]
    DuplicateId(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSettings {
    pub description_limit: usize,
    pub image_prefix: String,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            description_limit: 200,
            image_prefix: "/static/images".to_string(),
        }
    }
}

/// A fully resolved catalog row.
#[derive(Debug, Clone, PartialEq)]
pub struct Venue {
    pub place_id: String,
    pub name: String,
    pub category: String,
    pub city: String,
    pub price: i64,
    pub rating: f64,
    pub description: String,
    pub image_url: String,
}

impl Venue {
    pub fn with_score(&self, score: f32) -> WisataRecommendation {
        WisataRecommendation {
            place_id: self.place_id.clone(),
            nama_wisata: self.name.clone(),
            kategori: self.category.clone(),
            harga: self.price,
            lokasi: self.city.clone(),
            rating: self.rating,
            score,
            deskripsi: self.description.clone(),
            image_url: self.image_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct VenueCatalog {
    venues: Vec<Venue>,
    index: HashMap<String, usize>,
    id_column: String,
}

/// Column position chosen for each logical field: the first candidate
/// present in the header wins, even when its cell turns out to be empty.
struct ResolvedColumns {
    positions: HashMap<Field, usize>,
}

impl ResolvedColumns {
    fn from_headers(headers: &[String]) -> Self {
        let positions = FIELD_TABLE
            .iter()
            .filter_map(|entry| {
                entry
                    .columns
                    .iter()
                    .find_map(|name| headers.iter().position(|h| h == name))
                    .map(|pos| (entry.field, pos))
            })
            .collect();
        Self { positions }
    }

    fn raw<'r>(&self, record: &'r csv::StringRecord, field: Field) -> Option<&'r str> {
        let pos = *self.positions.get(&field)?;
        record.get(pos).filter(|value| !is_null(value))
    }
}

pub fn is_null(value: &str) -> bool {
    let value = value.trim();
    NULL_MARKERS.iter().any(|marker| *marker == value)
}

fn field_spec(field: Field) -> &'static FieldSpec {
    FIELD_TABLE
        .iter()
        .find(|entry| entry.field == field)
        .unwrap_or_else(|| unreachable!("every field has a table entry"))
}

fn text_field(columns: &ResolvedColumns, record: &csv::StringRecord, field: Field) -> String {
    columns
        .raw(record, field)
        .map(str::to_string)
        .unwrap_or_else(|| field_spec(field).default.as_text())
}

fn integer_field(columns: &ResolvedColumns, record: &csv::StringRecord, field: Field) -> i64 {
    let default = match field_spec(field).default {
        FieldDefault::Integer(value) => value,
        _ => 0,
    };
    let Some(raw) = columns.raw(record, field) else {
        return default;
    };

    let raw = raw.trim();
    raw.parse::<i64>()
        .ok()
        .or_else(|| {
            raw.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(|v| v.trunc() as i64)
        })
        .unwrap_or_else(|| {
            debug!("Unparseable {:?} value '{}', using {}", field, raw, default);
            default
        })
}

fn float_field(columns: &ResolvedColumns, record: &csv::StringRecord, field: Field) -> f64 {
    let default = match field_spec(field).default {
        FieldDefault::Float(value) => value,
        FieldDefault::Integer(value) => value as f64,
        FieldDefault::Text(_) => 0.0,
    };
    let Some(raw) = columns.raw(record, field) else {
        return default;
    };

    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or_else(|| {
            debug!("Unparseable {:?} value '{}', using {}", field, raw, default);
            default
        })
}

impl VenueCatalog {
    pub fn from_reader<R: Read>(reader: R, settings: &CatalogSettings) -> Result<Self, CatalogError> {
        let mut csv_reader = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);

        let headers: Vec<String> = csv_reader.headers()?.iter().map(str::to_string).collect();
        if headers.is_empty() {
            return Err(CatalogError::NoColumns);
        }

        let id_pos = ID_COLUMNS
            .iter()
            .find_map(|name| headers.iter().position(|h| h == name))
            .unwrap_or_else(|| {
                warn!("Using '{}' as ID column", headers[0]);
                0
            });
        let id_column = headers[id_pos].clone();

        // the id column is the key, never a field source
        let mut field_headers = headers.clone();
        field_headers[id_pos].clear();
        let columns = ResolvedColumns::from_headers(&field_headers);

        let mut catalog = Self {
            venues: Vec::new(),
            index: HashMap::new(),
            id_column,
        };

        for (line, record) in csv_reader.records().enumerate() {
            let record = record?;
            let place_id = match record.get(id_pos) {
                Some(id) if !is_null(id) => id.trim().to_string(),
                _ => {
                    warn!("Skipping catalog row {} without a place id", line + 1);
                    continue;
                }
            };

            if catalog.index.contains_key(&place_id) {
                return Err(CatalogError::DuplicateId(place_id));
            }

            let image_name = columns
                .raw(&record, Field::Name)
                .unwrap_or(DEFAULT_IMAGE_NAME);

            let venue = Venue {
                name: text_field(&columns, &record, Field::Name),
                category: text_field(&columns, &record, Field::Category),
                city: text_field(&columns, &record, Field::City),
                price: integer_field(&columns, &record, Field::Price),
                rating: float_field(&columns, &record, Field::Rating),
                description: truncate_with_ellipsis(
                    &text_field(&columns, &record, Field::Description),
                    settings.description_limit,
                ),
                image_url: image_url(&settings.image_prefix, image_name),
                place_id: place_id.clone(),
            };

            catalog.index.insert(place_id, catalog.venues.len());
            catalog.venues.push(venue);
        }

        Ok(catalog)
    }

    pub fn from_venues(venues: Vec<Venue>) -> Result<Self, CatalogError> {
        let mut index = HashMap::with_capacity(venues.len());
        for (pos, venue) in venues.iter().enumerate() {
            if index.insert(venue.place_id.clone(), pos).is_some() {
                return Err(CatalogError::DuplicateId(venue.place_id.clone()));
            }
        }
        Ok(Self {
            venues,
            index,
            id_column: ID_COLUMNS[0].to_string(),
        })
    }

    pub fn get(&self, place_id: &str) -> Option<&Venue> {
        self.index.get(place_id).map(|&pos| &self.venues[pos])
    }

    pub fn contains(&self, place_id: &str) -> bool {
        self.index.contains_key(place_id)
    }

    /// Venues in file order.
    pub fn iter(&self) -> impl Iterator<Item = &Venue> {
        self.venues.iter()
    }

    pub fn len(&self) -> usize {
        self.venues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.venues.is_empty()
    }

    pub fn id_column(&self) -> &str {
        &self.id_column
    }
}
