//! [`SqliteBackend`] — the SQLite implementation of [`CollectionStore`]
//! and [`ChangeFeed`]. The auth-side traits live in [`crate::auth`].

use std::{path::Path, sync::{Arc, Mutex}};

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use tokio::sync::broadcast;
use uuid::Uuid;
use vitrine_core::{
  artifact::{Artifact, ArtifactPatch, HistoryAction, HistoryEntry, NewArtifact},
  auth::{AuthEvent, AuthSession},
  event::{ChangeAction, ChangeEvent, ChangeFeed, Table},
  profile::Profile,
  report::{NewReport, Report, ReportPatch, ReportStatus},
  role::Role,
  store::{ArtifactQuery, CollectionStore},
};

use crate::{
  encode::{
    encode_date, encode_dt, encode_uuid, RawArtifact, RawHistoryEntry,
    RawProfile, RawReport,
  },
  feed::FeedHub,
  schema::SCHEMA,
  Error, Result,
};

// ─── Backend ─────────────────────────────────────────────────────────────────

/// A Vitrine backend backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection, feed hub, and session cache are
/// all reference-counted, so every clone observes the same state.
#[derive(Clone)]
pub struct SqliteBackend {
  pub(crate) conn:    tokio_rusqlite::Connection,
  pub(crate) feeds:   FeedHub,
  pub(crate) events:  broadcast::Sender<AuthEvent>,
  /// The transport's cached current session, mirroring what a hosted-auth
  /// client keeps in local storage.
  pub(crate) current: Arc<Mutex<Option<AuthSession>>>,
}

impl SqliteBackend {
  /// Open (or create) a backend at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::from_connection(conn).await
  }

  /// Open an in-memory backend — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::from_connection(conn).await
  }

  async fn from_connection(conn: tokio_rusqlite::Connection) -> Result<Self> {
    let backend = Self {
      conn,
      feeds: FeedHub::new(),
      events: broadcast::channel(16).0,
      current: Arc::new(Mutex::new(None)),
    };
    backend.init_schema().await?;
    Ok(backend)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Write every mutable column of an artifact row back.
  async fn write_artifact(&self, artifact: &Artifact) -> Result<()> {
    let id_str         = encode_uuid(artifact.id);
    let dimensions_str = serde_json::to_string(&artifact.dimensions)?;
    let condition_str  = artifact.condition.to_string();
    let location_str   = artifact.location.to_string();
    let exhibitions    = serde_json::to_string(&artifact.exhibition_history)?;
    let tags_str       = serde_json::to_string(&artifact.tags)?;
    let updated_str    = encode_dt(artifact.updated_at);
    let a              = artifact.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE artifacts SET
             title = ?2, description = ?3, category = ?4, period = ?5,
             culture = ?6, material = ?7, dimensions = ?8, condition = ?9,
             location = ?10, image_url = ?11, vitrine_image_url = ?12,
             provenance = ?13, estimated_value = ?14,
             exhibition_history = ?15, conservation_notes = ?16, tags = ?17,
             updated_at = ?18, last_edited_by = ?19
           WHERE id = ?1",
          rusqlite::params![
            id_str,
            a.title,
            a.description,
            a.category,
            a.period,
            a.culture,
            a.material,
            dimensions_str,
            condition_str,
            location_str,
            a.image_url,
            a.vitrine_image_url,
            a.provenance,
            a.estimated_value,
            exhibitions,
            a.conservation_notes,
            tags_str,
            updated_str,
            a.last_edited_by,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Append an audit row and emit its change event.
  async fn append_history(
    &self,
    artifact_id: Uuid,
    action: HistoryAction,
    changes: serde_json::Value,
    edited_by: &str,
    notes: Option<String>,
  ) -> Result<HistoryEntry> {
    let entry = HistoryEntry {
      id: Uuid::new_v4(),
      artifact_id,
      action,
      changes,
      edited_by: edited_by.to_owned(),
      edited_at: Utc::now(),
      notes,
    };

    let id_str       = encode_uuid(entry.id);
    let artifact_str = encode_uuid(artifact_id);
    let action_str   = action.to_string();
    let changes_str  = serde_json::to_string(&entry.changes)?;
    let edited_by    = entry.edited_by.clone();
    let at_str       = encode_dt(entry.edited_at);
    let notes_col    = entry.notes.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO artifact_history
             (id, artifact_id, action, changes, edited_by, edited_at, notes)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            id_str, artifact_str, action_str, changes_str, edited_by, at_str,
            notes_col,
          ],
        )?;
        Ok(())
      })
      .await?;

    self.feeds.emit(
      Table::ArtifactHistory,
      ChangeAction::Insert,
      entry.id,
      None,
      Some(serde_json::to_value(&entry)?),
    );
    Ok(entry)
  }
}

// ─── Row readers ─────────────────────────────────────────────────────────────

fn profile_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawProfile> {
  Ok(RawProfile {
    user_id:    row.get(0)?,
    name:       row.get(1)?,
    email:      row.get(2)?,
    role:       row.get(3)?,
    department: row.get(4)?,
    is_active:  row.get(5)?,
    created_at: row.get(6)?,
    last_login: row.get(7)?,
  })
}

const PROFILE_COLS: &str =
  "user_id, name, email, role, department, is_active, created_at, last_login";

fn artifact_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawArtifact> {
  Ok(RawArtifact {
    id:                 row.get(0)?,
    accession_number:   row.get(1)?,
    title:              row.get(2)?,
    description:        row.get(3)?,
    category:           row.get(4)?,
    period:             row.get(5)?,
    culture:            row.get(6)?,
    material:           row.get(7)?,
    dimensions:         row.get(8)?,
    condition:          row.get(9)?,
    location:           row.get(10)?,
    image_url:          row.get(11)?,
    vitrine_image_url:  row.get(12)?,
    provenance:         row.get(13)?,
    acquisition_date:   row.get(14)?,
    acquisition_method: row.get(15)?,
    estimated_value:    row.get(16)?,
    exhibition_history: row.get(17)?,
    conservation_notes: row.get(18)?,
    tags:               row.get(19)?,
    created_at:         row.get(20)?,
    updated_at:         row.get(21)?,
    created_by:         row.get(22)?,
    last_edited_by:     row.get(23)?,
  })
}

const ARTIFACT_COLS: &str =
  "id, accession_number, title, description, category, period, culture, \
   material, dimensions, condition, location, image_url, vitrine_image_url, \
   provenance, acquisition_date, acquisition_method, estimated_value, \
   exhibition_history, conservation_notes, tags, created_at, updated_at, \
   created_by, last_edited_by";

fn report_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawReport> {
  Ok(RawReport {
    id:              row.get(0)?,
    artifact_id:     row.get(1)?,
    artifact_title:  row.get(2)?,
    report_type:     row.get(3)?,
    title:           row.get(4)?,
    content:         row.get(5)?,
    findings:        row.get(6)?,
    recommendations: row.get(7)?,
    priority:        row.get(8)?,
    status:          row.get(9)?,
    created_by:      row.get(10)?,
    created_at:      row.get(11)?,
    updated_at:      row.get(12)?,
    reviewed_by:     row.get(13)?,
    reviewed_at:     row.get(14)?,
  })
}

const REPORT_COLS: &str =
  "id, artifact_id, artifact_title, report_type, title, content, findings, \
   recommendations, priority, status, created_by, created_at, updated_at, \
   reviewed_by, reviewed_at";

fn history_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawHistoryEntry> {
  Ok(RawHistoryEntry {
    id:          row.get(0)?,
    artifact_id: row.get(1)?,
    action:      row.get(2)?,
    changes:     row.get(3)?,
    edited_by:   row.get(4)?,
    edited_at:   row.get(5)?,
    notes:       row.get(6)?,
  })
}

// ─── Patch application ───────────────────────────────────────────────────────

fn diff_field(
  changes: &mut serde_json::Map<String, serde_json::Value>,
  field: &str,
  old: serde_json::Value,
  new: serde_json::Value,
) {
  changes.insert(
    field.to_owned(),
    serde_json::json!({ "old": old, "new": new }),
  );
}

/// Apply `patch` on top of `old`, collecting a field-level diff of what
/// actually changed. Untouched fields produce no diff entry.
fn apply_patch(
  old: &Artifact,
  patch: ArtifactPatch,
) -> (Artifact, serde_json::Map<String, serde_json::Value>) {
  use serde_json::json;

  let mut next = old.clone();
  let mut changes = serde_json::Map::new();

  macro_rules! field {
    ($name:ident) => {
      if let Some(value) = patch.$name {
        if value != next.$name {
          diff_field(
            &mut changes,
            stringify!($name),
            json!(&next.$name),
            json!(&value),
          );
          next.$name = value;
        }
      }
    };
  }

  field!(title);
  field!(description);
  field!(category);
  field!(period);
  field!(culture);
  field!(material);
  field!(dimensions);
  field!(condition);
  field!(location);
  field!(image_url);
  field!(vitrine_image_url);
  field!(provenance);
  field!(estimated_value);
  field!(exhibition_history);
  field!(conservation_notes);
  field!(tags);

  (next, changes)
}

// ─── CollectionStore impl ────────────────────────────────────────────────────

impl CollectionStore for SqliteBackend {
  type Error = Error;

  // ── Profiles ──────────────────────────────────────────────────────────────

  async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>> {
    let id_str = encode_uuid(user_id);

    let raw: Option<RawProfile> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {PROFILE_COLS} FROM profiles WHERE user_id = ?1"),
            rusqlite::params![id_str],
            profile_from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawProfile::into_profile).transpose()
  }

  async fn list_profiles(&self) -> Result<Vec<Profile>> {
    let raws: Vec<RawProfile> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PROFILE_COLS} FROM profiles ORDER BY created_at DESC"
        ))?;
        let rows = stmt
          .query_map([], profile_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawProfile::into_profile).collect()
  }

  async fn update_role(&self, user_id: Uuid, role: Role) -> Result<Profile> {
    let id_str   = encode_uuid(user_id);
    let role_str = role.to_string();

    let updated = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE profiles SET role = ?2 WHERE user_id = ?1",
          rusqlite::params![id_str, role_str],
        )?)
      })
      .await?;

    if updated == 0 {
      return Err(vitrine_core::Error::ProfileNotFound(user_id).into());
    }

    let profile = self
      .get_profile(user_id)
      .await?
      .ok_or(vitrine_core::Error::ProfileNotFound(user_id))?;

    self.feeds.emit(
      Table::Profiles,
      ChangeAction::Update,
      user_id,
      None,
      Some(serde_json::to_value(&profile)?),
    );
    Ok(profile)
  }

  async fn set_active(&self, user_id: Uuid, active: bool) -> Result<Profile> {
    let id_str = encode_uuid(user_id);

    let updated = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE profiles SET is_active = ?2 WHERE user_id = ?1",
          rusqlite::params![id_str, active],
        )?)
      })
      .await?;

    if updated == 0 {
      return Err(vitrine_core::Error::ProfileNotFound(user_id).into());
    }

    let profile = self
      .get_profile(user_id)
      .await?
      .ok_or(vitrine_core::Error::ProfileNotFound(user_id))?;

    self.feeds.emit(
      Table::Profiles,
      ChangeAction::Update,
      user_id,
      None,
      Some(serde_json::to_value(&profile)?),
    );
    Ok(profile)
  }

  // ── Artifacts ─────────────────────────────────────────────────────────────

  async fn add_artifact(&self, input: NewArtifact) -> Result<Artifact> {
    let now = Utc::now();
    let artifact = Artifact {
      id: Uuid::new_v4(),
      accession_number: input.accession_number,
      title: input.title,
      description: input.description,
      category: input.category,
      period: input.period,
      culture: input.culture,
      material: input.material,
      dimensions: input.dimensions,
      condition: input.condition,
      location: input.location,
      image_url: input.image_url,
      vitrine_image_url: input.vitrine_image_url,
      provenance: input.provenance,
      acquisition_date: input.acquisition_date,
      acquisition_method: input.acquisition_method,
      estimated_value: input.estimated_value,
      exhibition_history: input.exhibition_history,
      conservation_notes: input.conservation_notes,
      tags: input.tags,
      created_at: now,
      updated_at: now,
      created_by: input.created_by.clone(),
      last_edited_by: input.created_by,
    };

    let id_str         = encode_uuid(artifact.id);
    let dimensions_str = serde_json::to_string(&artifact.dimensions)?;
    let condition_str  = artifact.condition.to_string();
    let location_str   = artifact.location.to_string();
    let date_str       = encode_date(artifact.acquisition_date);
    let method_str     = artifact.acquisition_method.to_string();
    let exhibitions    = serde_json::to_string(&artifact.exhibition_history)?;
    let tags_str       = serde_json::to_string(&artifact.tags)?;
    let created_str    = encode_dt(artifact.created_at);
    let updated_str    = encode_dt(artifact.updated_at);
    let a              = artifact.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO artifacts (
             id, accession_number, title, description, category, period,
             culture, material, dimensions, condition, location, image_url,
             vitrine_image_url, provenance, acquisition_date,
             acquisition_method, estimated_value, exhibition_history,
             conservation_notes, tags, created_at, updated_at, created_by,
             last_edited_by
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                     ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23,
                     ?24)",
          rusqlite::params![
            id_str,
            a.accession_number,
            a.title,
            a.description,
            a.category,
            a.period,
            a.culture,
            a.material,
            dimensions_str,
            condition_str,
            location_str,
            a.image_url,
            a.vitrine_image_url,
            a.provenance,
            date_str,
            method_str,
            a.estimated_value,
            exhibitions,
            a.conservation_notes,
            tags_str,
            created_str,
            updated_str,
            a.created_by,
            a.last_edited_by,
          ],
        )?;
        Ok(())
      })
      .await?;

    self
      .append_history(
        artifact.id,
        HistoryAction::Created,
        serde_json::json!({}),
        &artifact.created_by,
        None,
      )
      .await?;

    self.feeds.emit(
      Table::Artifacts,
      ChangeAction::Insert,
      artifact.id,
      None,
      Some(serde_json::to_value(&artifact)?),
    );
    Ok(artifact)
  }

  async fn get_artifact(&self, id: Uuid) -> Result<Option<Artifact>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawArtifact> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {ARTIFACT_COLS} FROM artifacts WHERE id = ?1"),
            rusqlite::params![id_str],
            artifact_from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawArtifact::into_artifact).transpose()
  }

  async fn update_artifact(
    &self,
    id: Uuid,
    patch: ArtifactPatch,
    edited_by: &str,
  ) -> Result<Artifact> {
    let old = self
      .get_artifact(id)
      .await?
      .ok_or(vitrine_core::Error::ArtifactNotFound(id))?;

    let (mut next, changes) = apply_patch(&old, patch);
    if changes.is_empty() {
      return Ok(old);
    }

    next.updated_at = Utc::now();
    next.last_edited_by = edited_by.to_owned();
    self.write_artifact(&next).await?;

    self
      .append_history(
        id,
        HistoryAction::Updated,
        serde_json::Value::Object(changes),
        edited_by,
        None,
      )
      .await?;

    self.feeds.emit(
      Table::Artifacts,
      ChangeAction::Update,
      id,
      Some(serde_json::to_value(&old)?),
      Some(serde_json::to_value(&next)?),
    );
    Ok(next)
  }

  async fn delete_artifact(&self, id: Uuid, deleted_by: &str) -> Result<()> {
    let old = self
      .get_artifact(id)
      .await?
      .ok_or(vitrine_core::Error::ArtifactNotFound(id))?;

    let id_str = encode_uuid(id);
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM artifacts WHERE id = ?1",
          rusqlite::params![id_str],
        )?;
        Ok(())
      })
      .await?;

    self
      .append_history(
        id,
        HistoryAction::Deleted,
        serde_json::json!({}),
        deleted_by,
        Some(old.title.clone()),
      )
      .await?;

    self.feeds.emit(
      Table::Artifacts,
      ChangeAction::Delete,
      id,
      Some(serde_json::to_value(&old)?),
      None,
    );
    Ok(())
  }

  async fn list_artifacts(&self, query: &ArtifactQuery) -> Result<Vec<Artifact>> {
    // Phase 1: SQL LIKE over the text columns + JSON-encoded tags.
    let text_pattern = query.text.as_deref().map(|t| format!("%{t}%"));
    let category     = query.category.clone();
    let condition    = query.condition.clone();
    let location     = query.location.clone();
    let tag_pattern  = query.tag.as_deref().map(|t| format!("%{t}%"));
    let limit_val    = query.limit.unwrap_or(100) as i64;
    let offset_val   = query.offset.unwrap_or(0) as i64;

    let raws: Vec<RawArtifact> = self
      .conn
      .call(move |conn| {
        let mut conds: Vec<&'static str> = vec![];
        if text_pattern.is_some() {
          conds.push(
            "(title LIKE ?1 OR accession_number LIKE ?1 OR description LIKE ?1
              OR culture LIKE ?1 OR category LIKE ?1 OR period LIKE ?1
              OR material LIKE ?1 OR provenance LIKE ?1 OR tags LIKE ?1)",
          );
        }
        if category.is_some() {
          conds.push("category = ?2");
        }
        if condition.is_some() {
          conds.push("condition = ?3");
        }
        if location.is_some() {
          conds.push("location = ?4");
        }
        if tag_pattern.is_some() {
          conds.push("tags LIKE ?5");
        }

        let where_clause = if conds.is_empty() {
          String::new()
        } else {
          format!("WHERE {}", conds.join(" AND "))
        };

        let sql = format!(
          "SELECT {ARTIFACT_COLS} FROM artifacts
           {where_clause}
           ORDER BY created_at DESC
           LIMIT ?6 OFFSET ?7"
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![
              text_pattern.as_deref(),
              category.as_deref(),
              condition.as_deref(),
              location.as_deref(),
              tag_pattern.as_deref(),
              limit_val,
              offset_val,
            ],
            artifact_from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawArtifact::into_artifact).collect()
  }

  // ── Reports ───────────────────────────────────────────────────────────────

  async fn add_report(&self, input: NewReport) -> Result<Report> {
    let artifact = self
      .get_artifact(input.artifact_id)
      .await?
      .ok_or(vitrine_core::Error::ArtifactNotFound(input.artifact_id))?;

    let now = Utc::now();
    let report = Report {
      id: Uuid::new_v4(),
      artifact_id: input.artifact_id,
      artifact_title: artifact.title,
      report_type: input.report_type,
      title: input.title,
      content: input.content,
      findings: input.findings,
      recommendations: input.recommendations,
      priority: input.priority,
      status: ReportStatus::Draft,
      created_by: input.created_by,
      created_at: now,
      updated_at: now,
      reviewed_by: None,
      reviewed_at: None,
    };

    let id_str       = encode_uuid(report.id);
    let artifact_str = encode_uuid(report.artifact_id);
    let type_str     = report.report_type.to_string();
    let priority_str = report.priority.to_string();
    let status_str   = report.status.to_string();
    let created_str  = encode_dt(report.created_at);
    let updated_str  = encode_dt(report.updated_at);
    let r            = report.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO reports (
             id, artifact_id, artifact_title, report_type, title, content,
             findings, recommendations, priority, status, created_by,
             created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
          rusqlite::params![
            id_str,
            artifact_str,
            r.artifact_title,
            type_str,
            r.title,
            r.content,
            r.findings,
            r.recommendations,
            priority_str,
            status_str,
            r.created_by,
            created_str,
            updated_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    self.feeds.emit(
      Table::Reports,
      ChangeAction::Insert,
      report.id,
      None,
      Some(serde_json::to_value(&report)?),
    );
    Ok(report)
  }

  async fn get_report(&self, id: Uuid) -> Result<Option<Report>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawReport> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {REPORT_COLS} FROM reports WHERE id = ?1"),
            rusqlite::params![id_str],
            report_from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawReport::into_report).transpose()
  }

  async fn update_report(&self, id: Uuid, patch: ReportPatch) -> Result<Report> {
    let old = self
      .get_report(id)
      .await?
      .ok_or(vitrine_core::Error::ReportNotFound(id))?;

    let mut next = old.clone();
    let mut changed = false;

    if let Some(title) = patch.title {
      changed |= title != next.title;
      next.title = title;
    }
    if let Some(content) = patch.content {
      changed |= content != next.content;
      next.content = content;
    }
    if let Some(findings) = patch.findings {
      changed |= findings != next.findings;
      next.findings = findings;
    }
    if let Some(recommendations) = patch.recommendations {
      changed |= recommendations != next.recommendations;
      next.recommendations = recommendations;
    }
    if let Some(priority) = patch.priority {
      changed |= priority != next.priority;
      next.priority = priority;
    }
    if let Some(status) = patch.status {
      changed |= status != next.status;
      next.status = status;
    }
    if let Some(reviewed_by) = patch.reviewed_by {
      next.reviewed_by = Some(reviewed_by);
      next.reviewed_at = Some(Utc::now());
      changed = true;
    }

    if !changed {
      return Ok(old);
    }
    next.updated_at = Utc::now();

    let id_str       = encode_uuid(id);
    let priority_str = next.priority.to_string();
    let status_str   = next.status.to_string();
    let updated_str  = encode_dt(next.updated_at);
    let reviewed_str = next.reviewed_at.map(encode_dt);
    let r            = next.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE reports SET
             title = ?2, content = ?3, findings = ?4, recommendations = ?5,
             priority = ?6, status = ?7, updated_at = ?8, reviewed_by = ?9,
             reviewed_at = ?10
           WHERE id = ?1",
          rusqlite::params![
            id_str,
            r.title,
            r.content,
            r.findings,
            r.recommendations,
            priority_str,
            status_str,
            updated_str,
            r.reviewed_by,
            reviewed_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    self.feeds.emit(
      Table::Reports,
      ChangeAction::Update,
      id,
      Some(serde_json::to_value(&old)?),
      Some(serde_json::to_value(&next)?),
    );
    Ok(next)
  }

  async fn delete_report(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);

    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM reports WHERE id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    if deleted == 0 {
      return Err(vitrine_core::Error::ReportNotFound(id).into());
    }

    self
      .feeds
      .emit(Table::Reports, ChangeAction::Delete, id, None, None);
    Ok(())
  }

  async fn list_reports(&self, artifact_id: Option<Uuid>) -> Result<Vec<Report>> {
    let artifact_str = artifact_id.map(encode_uuid);

    let raws: Vec<RawReport> = self
      .conn
      .call(move |conn| {
        let rows = if let Some(aid) = artifact_str {
          let mut stmt = conn.prepare(&format!(
            "SELECT {REPORT_COLS} FROM reports WHERE artifact_id = ?1
             ORDER BY created_at DESC"
          ))?;
          stmt
            .query_map(rusqlite::params![aid], report_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          let mut stmt = conn.prepare(&format!(
            "SELECT {REPORT_COLS} FROM reports ORDER BY created_at DESC"
          ))?;
          stmt
            .query_map([], report_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawReport::into_report).collect()
  }

  // ── History ───────────────────────────────────────────────────────────────

  async fn list_history(
    &self,
    artifact_id: Option<Uuid>,
  ) -> Result<Vec<HistoryEntry>> {
    let artifact_str = artifact_id.map(encode_uuid);

    let raws: Vec<RawHistoryEntry> = self
      .conn
      .call(move |conn| {
        const COLS: &str =
          "id, artifact_id, action, changes, edited_by, edited_at, notes";
        let rows = if let Some(aid) = artifact_str {
          let mut stmt = conn.prepare(&format!(
            "SELECT {COLS} FROM artifact_history WHERE artifact_id = ?1
             ORDER BY edited_at DESC"
          ))?;
          stmt
            .query_map(rusqlite::params![aid], history_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          let mut stmt = conn.prepare(&format!(
            "SELECT {COLS} FROM artifact_history ORDER BY edited_at DESC"
          ))?;
          stmt
            .query_map([], history_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawHistoryEntry::into_entry).collect()
  }
}

// ─── ChangeFeed impl ─────────────────────────────────────────────────────────

impl ChangeFeed for SqliteBackend {
  fn watch(&self, table: Table) -> broadcast::Receiver<ChangeEvent> {
    self.feeds.sender(table).subscribe()
  }
}
