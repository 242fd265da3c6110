//! Report types — authored documents attached to artifacts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
  Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReportType {
  Conservation,
  ConditionAssessment,
  Research,
  Acquisition,
  Exhibition,
  General,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
  Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReportPriority {
  Low,
  Medium,
  High,
  Critical,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
  Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReportStatus {
  Draft,
  UnderReview,
  Completed,
  Archived,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
  pub id:              Uuid,
  pub artifact_id:     Uuid,
  /// Denormalised for list views; refreshed by the store on write.
  pub artifact_title:  String,
  pub report_type:     ReportType,
  pub title:           String,
  pub content:         String,
  pub findings:        Option<String>,
  pub recommendations: Option<String>,
  pub priority:        ReportPriority,
  pub status:          ReportStatus,
  pub created_by:      String,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
  pub reviewed_by:     Option<String>,
  pub reviewed_at:     Option<DateTime<Utc>>,
}

/// Input to report creation. New reports always start in
/// [`ReportStatus::Draft`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReport {
  pub artifact_id:     Uuid,
  pub report_type:     ReportType,
  pub title:           String,
  pub content:         String,
  pub findings:        Option<String>,
  pub recommendations: Option<String>,
  pub priority:        ReportPriority,
  pub created_by:      String,
}

/// Partial report update; `None` fields are left untouched (and stay off
/// the wire). Setting `reviewed_by` stamps `reviewed_at`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportPatch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub title:           Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub content:         Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub findings:        Option<Option<String>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub recommendations: Option<Option<String>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub priority:        Option<ReportPriority>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status:          Option<ReportStatus>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub reviewed_by:     Option<String>,
}
