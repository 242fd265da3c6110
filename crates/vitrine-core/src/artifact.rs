//! Artifact types — physical museum objects and their audit trail.
//!
//! Artifacts are plain mutable rows. Every mutation appends a
//! [`HistoryEntry`] recording who changed what, so the history table is the
//! append-only record the artifact table itself is not.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

// ─── Classification enums ────────────────────────────────────────────────────

/// Physical condition grades, best to worst.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
  Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Condition {
  Excellent,
  Good,
  Fair,
  Poor,
  Damaged,
}

/// Where the object physically lives.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
  Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ObjectLocation {
  /// On display.
  Vitrine,
  /// In storage.
  Warehouse,
}

/// How the object entered the collection.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
  Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AcquisitionMethod {
  Purchase,
  Donation,
  Loan,
  Bequest,
  Transfer,
}

/// Physical dimensions in centimetres; weight in kilograms when known.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
  pub height_cm: f64,
  pub width_cm:  f64,
  pub depth_cm:  f64,
  pub weight_kg: Option<f64>,
}

// ─── Artifact ────────────────────────────────────────────────────────────────

/// A catalogued museum object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
  pub id:                 Uuid,
  /// The museum's own catalogue number, e.g. "2019.44.7".
  pub accession_number:   String,
  pub title:              String,
  pub description:        String,
  pub category:           String,
  pub period:             String,
  pub culture:            String,
  pub material:           String,
  pub dimensions:         Dimensions,
  pub condition:          Condition,
  pub location:           ObjectLocation,
  pub image_url:          Option<String>,
  /// Photo of the object as displayed, when on display.
  pub vitrine_image_url:  Option<String>,
  pub provenance:         String,
  pub acquisition_date:   NaiveDate,
  pub acquisition_method: AcquisitionMethod,
  pub estimated_value:    Option<f64>,
  pub exhibition_history: Vec<String>,
  pub conservation_notes: String,
  pub tags:               Vec<String>,
  pub created_at:         DateTime<Utc>,
  pub updated_at:         DateTime<Utc>,
  /// Email of the creating user.
  pub created_by:         String,
  pub last_edited_by:     String,
}

/// Input to artifact creation. Timestamps and attribution of later edits
/// are set by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewArtifact {
  pub accession_number:   String,
  pub title:              String,
  pub description:        String,
  pub category:           String,
  pub period:             String,
  pub culture:            String,
  pub material:           String,
  pub dimensions:         Dimensions,
  pub condition:          Condition,
  pub location:           ObjectLocation,
  pub image_url:          Option<String>,
  pub vitrine_image_url:  Option<String>,
  pub provenance:         String,
  pub acquisition_date:   NaiveDate,
  pub acquisition_method: AcquisitionMethod,
  pub estimated_value:    Option<f64>,
  pub exhibition_history: Vec<String>,
  pub conservation_notes: String,
  pub tags:               Vec<String>,
  pub created_by:         String,
}

/// A partial update. `None` fields are left untouched (and stay off the
/// wire); the store records a field-level diff of everything that actually
/// changed. The doubly-optional fields distinguish "leave alone" from
/// "clear" (`Some(None)`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArtifactPatch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub title:              Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description:        Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub category:           Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub period:             Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub culture:            Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub material:           Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub dimensions:         Option<Dimensions>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub condition:          Option<Condition>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub location:           Option<ObjectLocation>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub image_url:          Option<Option<String>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub vitrine_image_url:  Option<Option<String>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub provenance:         Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub estimated_value:    Option<Option<f64>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub exhibition_history: Option<Vec<String>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub conservation_notes: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub tags:               Option<Vec<String>>,
}

// ─── History ─────────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
  Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HistoryAction {
  Created,
  Updated,
  Deleted,
}

/// One audit row. `changes` maps field name to `{"old": .., "new": ..}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
  pub id:          Uuid,
  pub artifact_id: Uuid,
  pub action:      HistoryAction,
  pub changes:     serde_json::Value,
  pub edited_by:   String,
  pub edited_at:   DateTime<Utc>,
  pub notes:       Option<String>,
}
