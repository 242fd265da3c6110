//! [`CollectionStore`] implementation over the PostgREST-style `/rest`
//! table endpoints.
//!
//! Server-side triggers own the derived data: audit rows for artifact
//! mutations, the denormalised `artifact_title` on reports, and all
//! timestamps. This client only ships the fields the caller controls.

use serde::de::DeserializeOwned;
use uuid::Uuid;
use vitrine_core::{
  artifact::{Artifact, ArtifactPatch, HistoryEntry, NewArtifact},
  profile::Profile,
  report::{NewReport, Report, ReportPatch},
  role::Role,
  store::{ArtifactQuery, CollectionStore},
};

use crate::{ClientError, HttpBackend, Result};

impl HttpBackend {
  fn rows_url(&self, table: &str) -> String {
    self.url(&format!("/rest/{table}"))
  }

  async fn rows<T: DeserializeOwned>(
    &self,
    req: reqwest::RequestBuilder,
  ) -> Result<Vec<T>> {
    let resp = self.authed(req).send().await?;
    if !resp.status().is_success() {
      return Err(Self::error_for(resp).await);
    }
    Ok(resp.json().await?)
  }

  /// Mutations ask for the affected rows back; an empty set means the
  /// filter matched nothing.
  async fn returning<T: DeserializeOwned>(
    &self,
    req: reqwest::RequestBuilder,
    what: &str,
  ) -> Result<T> {
    let rows: Vec<T> = self
      .rows(req.header("Prefer", "return=representation"))
      .await?;
    rows
      .into_iter()
      .next()
      .ok_or_else(|| ClientError::NotFound(what.to_owned()))
  }
}

impl CollectionStore for HttpBackend {
  type Error = ClientError;

  // ── Profiles ──────────────────────────────────────────────────────────────

  async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>> {
    let rows: Vec<Profile> = self
      .rows(
        self
          .http
          .get(self.rows_url("profiles"))
          .query(&[("user_id", format!("eq.{user_id}"))]),
      )
      .await?;
    Ok(rows.into_iter().next())
  }

  async fn list_profiles(&self) -> Result<Vec<Profile>> {
    self
      .rows(
        self
          .http
          .get(self.rows_url("profiles"))
          .query(&[("order", "created_at.desc")]),
      )
      .await
  }

  async fn update_role(&self, user_id: Uuid, role: Role) -> Result<Profile> {
    self
      .returning(
        self
          .http
          .patch(self.rows_url("profiles"))
          .query(&[("user_id", format!("eq.{user_id}"))])
          .json(&serde_json::json!({ "role": role })),
        &format!("profile {user_id}"),
      )
      .await
  }

  async fn set_active(&self, user_id: Uuid, active: bool) -> Result<Profile> {
    self
      .returning(
        self
          .http
          .patch(self.rows_url("profiles"))
          .query(&[("user_id", format!("eq.{user_id}"))])
          .json(&serde_json::json!({ "is_active": active })),
        &format!("profile {user_id}"),
      )
      .await
  }

  // ── Artifacts ─────────────────────────────────────────────────────────────

  async fn add_artifact(&self, input: NewArtifact) -> Result<Artifact> {
    self
      .returning(
        self
          .http
          .post(self.rows_url("artifacts"))
          .json(&input),
        "inserted artifact",
      )
      .await
  }

  async fn get_artifact(&self, id: Uuid) -> Result<Option<Artifact>> {
    let rows: Vec<Artifact> = self
      .rows(
        self
          .http
          .get(self.rows_url("artifacts"))
          .query(&[("id", format!("eq.{id}"))]),
      )
      .await?;
    Ok(rows.into_iter().next())
  }

  async fn update_artifact(
    &self,
    id: Uuid,
    patch: ArtifactPatch,
    edited_by: &str,
  ) -> Result<Artifact> {
    let mut body = match serde_json::to_value(&patch) {
      Ok(serde_json::Value::Object(map)) => map,
      _ => serde_json::Map::new(),
    };
    if body.is_empty() {
      // Nothing to change; hand back the current row.
      return self
        .get_artifact(id)
        .await?
        .ok_or_else(|| ClientError::NotFound(format!("artifact {id}")));
    }
    body.insert("last_edited_by".into(), serde_json::json!(edited_by));

    self
      .returning(
        self
          .http
          .patch(self.rows_url("artifacts"))
          .query(&[("id", format!("eq.{id}"))])
          .json(&body),
        &format!("artifact {id}"),
      )
      .await
  }

  async fn delete_artifact(&self, id: Uuid, _deleted_by: &str) -> Result<()> {
    // Attribution of the audit row is derived server-side from the bearer
    // token; the parameter only matters to local backends.
    let _: Artifact = self
      .returning(
        self
          .http
          .delete(self.rows_url("artifacts"))
          .query(&[("id", format!("eq.{id}"))]),
        &format!("artifact {id}"),
      )
      .await?;
    Ok(())
  }

  async fn list_artifacts(&self, query: &ArtifactQuery) -> Result<Vec<Artifact>> {
    let mut params: Vec<(String, String)> = vec![
      ("order".into(), "created_at.desc".into()),
      ("limit".into(), query.limit.unwrap_or(100).to_string()),
      ("offset".into(), query.offset.unwrap_or(0).to_string()),
    ];
    if let Some(text) = &query.text {
      params.push((
        "or".into(),
        format!(
          "(title.ilike.*{text}*,accession_number.ilike.*{text}*,\
           description.ilike.*{text}*,culture.ilike.*{text}*,\
           category.ilike.*{text}*,period.ilike.*{text}*,\
           material.ilike.*{text}*)"
        ),
      ));
    }
    if let Some(category) = &query.category {
      params.push(("category".into(), format!("eq.{category}")));
    }
    if let Some(condition) = &query.condition {
      params.push(("condition".into(), format!("eq.{condition}")));
    }
    if let Some(location) = &query.location {
      params.push(("location".into(), format!("eq.{location}")));
    }
    if let Some(tag) = &query.tag {
      params.push(("tags".into(), format!("cs.{{{tag}}}")));
    }

    self
      .rows(self.http.get(self.rows_url("artifacts")).query(&params))
      .await
  }

  // ── Reports ───────────────────────────────────────────────────────────────

  async fn add_report(&self, input: NewReport) -> Result<Report> {
    self
      .returning(
        self.http.post(self.rows_url("reports")).json(&input),
        "inserted report",
      )
      .await
  }

  async fn get_report(&self, id: Uuid) -> Result<Option<Report>> {
    let rows: Vec<Report> = self
      .rows(
        self
          .http
          .get(self.rows_url("reports"))
          .query(&[("id", format!("eq.{id}"))]),
      )
      .await?;
    Ok(rows.into_iter().next())
  }

  async fn update_report(&self, id: Uuid, patch: ReportPatch) -> Result<Report> {
    self
      .returning(
        self
          .http
          .patch(self.rows_url("reports"))
          .query(&[("id", format!("eq.{id}"))])
          .json(&patch),
        &format!("report {id}"),
      )
      .await
  }

  async fn delete_report(&self, id: Uuid) -> Result<()> {
    let _: Report = self
      .returning(
        self
          .http
          .delete(self.rows_url("reports"))
          .query(&[("id", format!("eq.{id}"))]),
        &format!("report {id}"),
      )
      .await?;
    Ok(())
  }

  async fn list_reports(&self, artifact_id: Option<Uuid>) -> Result<Vec<Report>> {
    let mut params: Vec<(String, String)> =
      vec![("order".into(), "created_at.desc".into())];
    if let Some(artifact_id) = artifact_id {
      params.push(("artifact_id".into(), format!("eq.{artifact_id}")));
    }
    self
      .rows(self.http.get(self.rows_url("reports")).query(&params))
      .await
  }

  // ── History ───────────────────────────────────────────────────────────────

  async fn list_history(
    &self,
    artifact_id: Option<Uuid>,
  ) -> Result<Vec<HistoryEntry>> {
    let mut params: Vec<(String, String)> =
      vec![("order".into(), "edited_at.desc".into())];
    if let Some(artifact_id) = artifact_id {
      params.push(("artifact_id".into(), format!("eq.{artifact_id}")));
    }
    self
      .rows(
        self
          .http
          .get(self.rows_url("artifact_history"))
          .query(&params),
      )
      .await
  }
}
