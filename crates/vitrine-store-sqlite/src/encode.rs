//! Encoding and decoding helpers between Rust domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Closed-set enums are
//! stored as their snake_case display form. Structured fields (dimensions,
//! tags, exhibition history, change diffs) are stored as compact JSON.
//! UUIDs are stored as hyphenated lowercase strings.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;
use vitrine_core::{
  artifact::{
    AcquisitionMethod, Artifact, Condition, Dimensions, HistoryAction,
    HistoryEntry, ObjectLocation,
  },
  profile::Profile,
  report::{Report, ReportPriority, ReportStatus, ReportType},
  role::Role,
};

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(d: NaiveDate) -> String { d.to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  s.parse().map_err(|_| Error::DateParse(format!("bad date: {s:?}")))
}

/// Parse any strum-derived closed-set enum, surfacing the stored text on
/// failure.
fn decode_enum<T: std::str::FromStr>(s: &str, what: &str) -> Result<T> {
  s.parse()
    .map_err(|_| Error::ValueParse(format!("unknown {what}: {s:?}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `profiles` row.
pub struct RawProfile {
  pub user_id:    String,
  pub name:       String,
  pub email:      String,
  pub role:       String,
  pub department: Option<String>,
  pub is_active:  bool,
  pub created_at: String,
  pub last_login: Option<String>,
}

impl RawProfile {
  pub fn into_profile(self) -> Result<Profile> {
    Ok(Profile {
      user_id:    decode_uuid(&self.user_id)?,
      name:       self.name,
      email:      self.email,
      // Rows written by older schema revisions may carry retired role
      // names; degrade to viewer rather than failing the whole read.
      role:       Role::parse_or_viewer(&self.role),
      department: self.department,
      is_active:  self.is_active,
      created_at: decode_dt(&self.created_at)?,
      last_login: self.last_login.as_deref().map(decode_dt).transpose()?,
    })
  }
}

/// Raw strings read directly from an `artifacts` row.
pub struct RawArtifact {
  pub id:                 String,
  pub accession_number:   String,
  pub title:              String,
  pub description:        String,
  pub category:           String,
  pub period:             String,
  pub culture:            String,
  pub material:           String,
  pub dimensions:         String,
  pub condition:          String,
  pub location:           String,
  pub image_url:          Option<String>,
  pub vitrine_image_url:  Option<String>,
  pub provenance:         String,
  pub acquisition_date:   String,
  pub acquisition_method: String,
  pub estimated_value:    Option<f64>,
  pub exhibition_history: String,
  pub conservation_notes: String,
  pub tags:               String,
  pub created_at:         String,
  pub updated_at:         String,
  pub created_by:         String,
  pub last_edited_by:     String,
}

impl RawArtifact {
  pub fn into_artifact(self) -> Result<Artifact> {
    let dimensions: Dimensions = serde_json::from_str(&self.dimensions)?;
    let condition: Condition = decode_enum(&self.condition, "condition")?;
    let location: ObjectLocation = decode_enum(&self.location, "location")?;
    let acquisition_method: AcquisitionMethod =
      decode_enum(&self.acquisition_method, "acquisition method")?;

    Ok(Artifact {
      id: decode_uuid(&self.id)?,
      accession_number: self.accession_number,
      title: self.title,
      description: self.description,
      category: self.category,
      period: self.period,
      culture: self.culture,
      material: self.material,
      dimensions,
      condition,
      location,
      image_url: self.image_url,
      vitrine_image_url: self.vitrine_image_url,
      provenance: self.provenance,
      acquisition_date: decode_date(&self.acquisition_date)?,
      acquisition_method,
      estimated_value: self.estimated_value,
      exhibition_history: serde_json::from_str(&self.exhibition_history)?,
      conservation_notes: self.conservation_notes,
      tags: serde_json::from_str(&self.tags)?,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
      created_by: self.created_by,
      last_edited_by: self.last_edited_by,
    })
  }
}

/// Raw strings read directly from an `artifact_history` row.
pub struct RawHistoryEntry {
  pub id:          String,
  pub artifact_id: String,
  pub action:      String,
  pub changes:     String,
  pub edited_by:   String,
  pub edited_at:   String,
  pub notes:       Option<String>,
}

impl RawHistoryEntry {
  pub fn into_entry(self) -> Result<HistoryEntry> {
    let action: HistoryAction = decode_enum(&self.action, "history action")?;
    Ok(HistoryEntry {
      id: decode_uuid(&self.id)?,
      artifact_id: decode_uuid(&self.artifact_id)?,
      action,
      changes: serde_json::from_str(&self.changes)?,
      edited_by: self.edited_by,
      edited_at: decode_dt(&self.edited_at)?,
      notes: self.notes,
    })
  }
}

/// Raw strings read directly from a `reports` row.
pub struct RawReport {
  pub id:              String,
  pub artifact_id:     String,
  pub artifact_title:  String,
  pub report_type:     String,
  pub title:           String,
  pub content:         String,
  pub findings:        Option<String>,
  pub recommendations: Option<String>,
  pub priority:        String,
  pub status:          String,
  pub created_by:      String,
  pub created_at:      String,
  pub updated_at:      String,
  pub reviewed_by:     Option<String>,
  pub reviewed_at:     Option<String>,
}

impl RawReport {
  pub fn into_report(self) -> Result<Report> {
    let report_type: ReportType = decode_enum(&self.report_type, "report type")?;
    let priority: ReportPriority = decode_enum(&self.priority, "priority")?;
    let status: ReportStatus = decode_enum(&self.status, "status")?;

    Ok(Report {
      id: decode_uuid(&self.id)?,
      artifact_id: decode_uuid(&self.artifact_id)?,
      artifact_title: self.artifact_title,
      report_type,
      title: self.title,
      content: self.content,
      findings: self.findings,
      recommendations: self.recommendations,
      priority,
      status,
      created_by: self.created_by,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
      reviewed_by: self.reviewed_by,
      reviewed_at: self.reviewed_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}
