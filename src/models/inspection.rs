//! Modelos de inspección
//!
//! Inspección, detalle por paso, pasos ordenados por taller y el catálogo de observaciones.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Resultado de un paso - mapea al ENUM detail_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "detail_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DetailStatus {
    Apt,
    Conditional,
    Rejected,
}

impl DetailStatus {
    pub fn label(&self) -> &'static str {
        match self {
            DetailStatus::Apt => "Apto",
            DetailStatus::Conditional => "Condicional",
            DetailStatus::Rejected => "Rechazado",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Inspection {
    pub id: Uuid,
    pub application_id: Uuid,
    pub is_second: bool,
    pub global_observations: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InspectionDetail {
    pub id: Uuid,
    pub inspection_id: Uuid,
    pub step_id: Uuid,
    pub status: DetailStatus,
    pub observations: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Paso de inspección con su posición en el orden del taller
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OrderedStep {
    pub step_id: Uuid,
    pub number: i32,
    pub name: String,
    pub description: Option<String>,
}

/// Fila plana del catálogo: categoría → subcategoría → observación
#[derive(Debug, Clone, FromRow)]
pub struct CatalogRow {
    pub category_id: Uuid,
    pub category_name: String,
    pub subcategory_id: Uuid,
    pub subcategory_name: String,
    pub observation_id: Uuid,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CatalogObservation {
    pub id: Uuid,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CatalogSubcategory {
    pub id: Uuid,
    pub name: String,
    pub observations: Vec<CatalogObservation>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CatalogCategory {
    pub id: Uuid,
    pub name: String,
    pub subcategories: Vec<CatalogSubcategory>,
}

/// Arma el árbol del catálogo a partir de filas ordenadas por categoría y subcategoría
pub fn build_catalog_tree(rows: Vec<CatalogRow>) -> Vec<CatalogCategory> {
    let mut categories: Vec<CatalogCategory> = Vec::new();

    for row in rows {
        if categories.last().map(|c| c.id) != Some(row.category_id) {
            categories.push(CatalogCategory {
                id: row.category_id,
                name: row.category_name.clone(),
                subcategories: Vec::new(),
            });
        }
        let Some(category) = categories.last_mut() else {
            continue;
        };

        if category.subcategories.last().map(|s| s.id) != Some(row.subcategory_id) {
            category.subcategories.push(CatalogSubcategory {
                id: row.subcategory_id,
                name: row.subcategory_name.clone(),
                observations: Vec::new(),
            });
        }
        if let Some(subcategory) = category.subcategories.last_mut() {
            subcategory.observations.push(CatalogObservation {
                id: row.observation_id,
                description: row.description,
            });
        }
    }

    categories
}
