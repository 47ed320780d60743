use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// The four Eisenhower quadrant labels as the API spells them. The wire
/// keeps `prioridad` as a free string, so values outside this set can and
/// do show up; see `matrix::categorize` for how those are handled.
pub const PRIORITY_LABELS: [&str; 4] = [
    "Urgente-Importante",
    "No Urgente-Importante",
    "Urgente-No Importante",
    "No Urgente-No Importante",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    #[serde(
        default,
        deserialize_with = "lenient_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,

    pub titulo: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descripcion: Option<String>,

    pub proyecto: String,

    pub responsable: String,

    pub prioridad: String,

    #[serde(rename = "isCompleted", default)]
    pub is_completed: bool,

    #[serde(
        rename = "fechaVencimiento",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub fecha_vencimiento: Option<DateTime<Utc>>,

    #[serde(
        rename = "fechaTerminada",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub fecha_terminada: Option<DateTime<Utc>>,

    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Task {
    pub fn new_draft(titulo: String) -> Self {
        Self {
            id: None,
            titulo,
            descripcion: None,
            proyecto: String::new(),
            responsable: String::new(),
            prioridad: String::new(),
            is_completed: false,
            fecha_vencimiento: None,
            fecha_terminada: None,
            created_at: None,
            extra: BTreeMap::new(),
        }
    }

    /// Completion-date invariant: `fecha_terminada` is set iff the task is
    /// completed. Applied right before every submission, so the server
    /// never sees a half-toggled pair.
    pub fn sync_completion(&mut self, now: DateTime<Utc>) {
        if self.is_completed {
            if self.fecha_terminada.is_none() {
                self.fecha_terminada = Some(now);
            }
        } else {
            self.fecha_terminada = None;
        }
    }

    pub fn is_known_priority(value: &str) -> bool {
        PRIORITY_LABELS.contains(&value)
    }
}

/// Backends disagree on whether task ids are strings or numbers; accept
/// both and normalize to a string.
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|raw| match raw {
        serde_json::Value::String(text) => Some(text),
        serde_json::Value::Number(number) => Some(number.to_string()),
        _ => None,
    }))
}
