//! The `CollectionStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (`vitrine-store-sqlite`
//! locally, `vitrine-client` against a hosted platform). Higher layers
//! depend on this abstraction, not on any concrete backend.
//!
//! Authorization is NOT checked here: the advisory gate lives in
//! [`crate::role`] and true enforcement is the backend's row-level policy.

use std::future::Future;

use uuid::Uuid;

use crate::{
  artifact::{Artifact, ArtifactPatch, HistoryEntry, NewArtifact},
  profile::Profile,
  report::{NewReport, Report, ReportPatch},
  role::Role,
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`CollectionStore::list_artifacts`].
#[derive(Debug, Clone, Default)]
pub struct ArtifactQuery {
  /// Free-text filter over title, accession number, description, culture,
  /// category, period, material, and tags.
  pub text:      Option<String>,
  pub category:  Option<String>,
  pub condition: Option<String>,
  pub location:  Option<String>,
  pub tag:       Option<String>,
  pub limit:     Option<usize>,
  pub offset:    Option<usize>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the collection backend's table CRUD.
///
/// Artifact mutations append [`HistoryEntry`] audit rows as a side effect;
/// callers never write history directly.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait CollectionStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Profiles ──────────────────────────────────────────────────────────

  /// Retrieve a profile by identity id. Returns `None` if not found.
  fn get_profile(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<Profile>, Self::Error>> + Send + '_;

  /// All profiles, ordered by creation time descending (the roster order).
  fn list_profiles(
    &self,
  ) -> impl Future<Output = Result<Vec<Profile>, Self::Error>> + Send + '_;

  /// Change a profile's role.
  fn update_role(
    &self,
    user_id: Uuid,
    role: Role,
  ) -> impl Future<Output = Result<Profile, Self::Error>> + Send + '_;

  /// Flip a profile's active flag.
  fn set_active(
    &self,
    user_id: Uuid,
    active: bool,
  ) -> impl Future<Output = Result<Profile, Self::Error>> + Send + '_;

  // ── Artifacts ─────────────────────────────────────────────────────────

  fn add_artifact(
    &self,
    input: NewArtifact,
  ) -> impl Future<Output = Result<Artifact, Self::Error>> + Send + '_;

  fn get_artifact(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Artifact>, Self::Error>> + Send + '_;

  /// Apply a partial update, stamp `updated_at`/`last_edited_by`, and
  /// append an audit row with the field-level diff.
  fn update_artifact<'a>(
    &'a self,
    id: Uuid,
    patch: ArtifactPatch,
    edited_by: &'a str,
  ) -> impl Future<Output = Result<Artifact, Self::Error>> + Send + 'a;

  /// Delete the artifact row. Its history rows are retained.
  fn delete_artifact<'a>(
    &'a self,
    id: Uuid,
    deleted_by: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Filtered listing, newest first.
  fn list_artifacts<'a>(
    &'a self,
    query: &'a ArtifactQuery,
  ) -> impl Future<Output = Result<Vec<Artifact>, Self::Error>> + Send + 'a;

  // ── Reports ───────────────────────────────────────────────────────────

  fn add_report(
    &self,
    input: NewReport,
  ) -> impl Future<Output = Result<Report, Self::Error>> + Send + '_;

  fn get_report(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Report>, Self::Error>> + Send + '_;

  fn update_report(
    &self,
    id: Uuid,
    patch: ReportPatch,
  ) -> impl Future<Output = Result<Report, Self::Error>> + Send + '_;

  fn delete_report(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Reports, newest first, optionally restricted to one artifact.
  fn list_reports(
    &self,
    artifact_id: Option<Uuid>,
  ) -> impl Future<Output = Result<Vec<Report>, Self::Error>> + Send + '_;

  // ── History ───────────────────────────────────────────────────────────

  /// Audit rows, newest first, optionally restricted to one artifact.
  fn list_history(
    &self,
    artifact_id: Option<Uuid>,
  ) -> impl Future<Output = Result<Vec<HistoryEntry>, Self::Error>> + Send + '_;
}
