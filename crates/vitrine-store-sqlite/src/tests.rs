//! Integration tests for `SqliteBackend` against an in-memory database.

use uuid::Uuid;
use vitrine_core::{
  account::{AdminDirectory, NewAccount},
  artifact::{
    AcquisitionMethod, ArtifactPatch, Condition, Dimensions, HistoryAction,
    NewArtifact, ObjectLocation,
  },
  auth::{AuthTransport, SignUp, TokenIntrospection},
  event::{ChangeAction, ChangeFeed, Table},
  report::{NewReport, ReportPatch, ReportPriority, ReportStatus, ReportType},
  role::Role,
  store::{ArtifactQuery, CollectionStore},
};

use crate::SqliteBackend;

async fn backend() -> SqliteBackend {
  SqliteBackend::open_in_memory()
    .await
    .expect("in-memory backend")
}

fn signup(name: &str, email: &str, role: Role) -> SignUp {
  SignUp {
    name:       name.into(),
    email:      email.into(),
    password:   "hunter2hunter2".into(),
    department: Some("Antiquities".into()),
    role,
  }
}

fn new_artifact(title: &str, created_by: &str) -> NewArtifact {
  NewArtifact {
    accession_number:   "2019.44.7".into(),
    title:              title.into(),
    description:        "A terracotta oil lamp.".into(),
    category:           "Ceramics".into(),
    period:             "Roman".into(),
    culture:            "Roman".into(),
    material:           "Terracotta".into(),
    dimensions:         Dimensions {
      height_cm: 6.0,
      width_cm:  9.5,
      depth_cm:  7.0,
      weight_kg: Some(0.2),
    },
    condition:          Condition::Good,
    location:           ObjectLocation::Warehouse,
    image_url:          None,
    vitrine_image_url:  None,
    provenance:         "Purchased at auction, 1998.".into(),
    acquisition_date:   "1998-03-14".parse().unwrap(),
    acquisition_method: AcquisitionMethod::Purchase,
    estimated_value:    Some(1200.0),
    exhibition_history: vec![],
    conservation_notes: String::new(),
    tags:               vec!["lamp".into(), "roman".into()],
    created_by:         created_by.into(),
  }
}

// ─── Auth ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn sign_up_then_sign_in() {
  let b = backend().await;

  let identity = b
    .sign_up(signup("Alice", "alice@museum.test", Role::Curator))
    .await
    .unwrap();

  let session = b
    .sign_in_with_password("alice@museum.test", "hunter2hunter2")
    .await
    .unwrap();
  assert_eq!(session.identity.user_id, identity.user_id);
  assert_eq!(session.identity.email, "alice@museum.test");
  assert!(!session.access_token.is_empty());

  // sign-in stamps last_login on the profile
  let profile = b.get_profile(identity.user_id).await.unwrap().unwrap();
  assert!(profile.last_login.is_some());
  assert_eq!(profile.role, Role::Curator);
}

#[tokio::test]
async fn sign_in_wrong_password_is_invalid_credentials() {
  let b = backend().await;
  b.sign_up(signup("Alice", "alice@museum.test", Role::Viewer))
    .await
    .unwrap();

  let err = b
    .sign_in_with_password("alice@museum.test", "wrong")
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(vitrine_core::Error::InvalidCredentials)
  ));
}

#[tokio::test]
async fn sign_up_duplicate_email_errors() {
  let b = backend().await;
  b.sign_up(signup("Alice", "alice@museum.test", Role::Viewer))
    .await
    .unwrap();

  let err = b
    .sign_up(signup("Other Alice", "alice@museum.test", Role::Viewer))
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(vitrine_core::Error::EmailTaken(_))
  ));
}

#[tokio::test]
async fn deactivated_account_cannot_sign_in() {
  let b = backend().await;
  let identity = b
    .sign_up(signup("Bob", "bob@museum.test", Role::Viewer))
    .await
    .unwrap();
  b.set_active(identity.user_id, false).await.unwrap();

  let err = b
    .sign_in_with_password("bob@museum.test", "hunter2hunter2")
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(vitrine_core::Error::AccountDisabled(_))
  ));
}

#[tokio::test]
async fn sign_out_twice_errors_already_signed_out() {
  let b = backend().await;
  b.sign_up(signup("Alice", "alice@museum.test", Role::Viewer))
    .await
    .unwrap();
  let session = b
    .sign_in_with_password("alice@museum.test", "hunter2hunter2")
    .await
    .unwrap();

  b.sign_out(&session.access_token).await.unwrap();
  let err = b.sign_out(&session.access_token).await.unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(vitrine_core::Error::AlreadySignedOut)
  ));
  assert!(b.session().await.unwrap().is_none());
}

#[tokio::test]
async fn resolve_token_round_trip() {
  let b = backend().await;
  let identity = b
    .sign_up(signup("Alice", "alice@museum.test", Role::Admin))
    .await
    .unwrap();
  let session = b
    .sign_in_with_password("alice@museum.test", "hunter2hunter2")
    .await
    .unwrap();

  let resolved = b.resolve_token(&session.access_token).await.unwrap();
  assert_eq!(resolved.unwrap().user_id, identity.user_id);

  // an unknown token resolves to nothing
  assert!(b.resolve_token("not-a-token").await.unwrap().is_none());

  // signing out kills the token
  b.sign_out(&session.access_token).await.unwrap();
  assert!(
    b.resolve_token(&session.access_token)
      .await
      .unwrap()
      .is_none()
  );
}

#[tokio::test]
async fn update_password_takes_effect() {
  let b = backend().await;
  b.sign_up(signup("Alice", "alice@museum.test", Role::Viewer))
    .await
    .unwrap();
  let session = b
    .sign_in_with_password("alice@museum.test", "hunter2hunter2")
    .await
    .unwrap();

  b.update_password(&session.access_token, "correct horse battery")
    .await
    .unwrap();

  assert!(
    b.sign_in_with_password("alice@museum.test", "hunter2hunter2")
      .await
      .is_err()
  );
  assert!(
    b.sign_in_with_password("alice@museum.test", "correct horse battery")
      .await
      .is_ok()
  );
}

// ─── Profiles ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn roster_is_ordered_newest_first() {
  let b = backend().await;
  b.sign_up(signup("First", "first@museum.test", Role::Viewer))
    .await
    .unwrap();
  b.sign_up(signup("Second", "second@museum.test", Role::Viewer))
    .await
    .unwrap();
  b.sign_up(signup("Third", "third@museum.test", Role::Viewer))
    .await
    .unwrap();

  let roster = b.list_profiles().await.unwrap();
  assert_eq!(roster.len(), 3);
  assert_eq!(roster[0].name, "Third");
  assert_eq!(roster[2].name, "First");
}

#[tokio::test]
async fn update_role_and_toggle_active() {
  let b = backend().await;
  let identity = b
    .sign_up(signup("Alice", "alice@museum.test", Role::Viewer))
    .await
    .unwrap();

  let profile = b.update_role(identity.user_id, Role::Curator).await.unwrap();
  assert_eq!(profile.role, Role::Curator);

  let off = b.set_active(identity.user_id, false).await.unwrap();
  assert!(!off.is_active);
  let on = b.set_active(identity.user_id, true).await.unwrap();
  assert!(on.is_active);
}

#[tokio::test]
async fn update_role_unknown_user_errors() {
  let b = backend().await;
  let err = b.update_role(Uuid::new_v4(), Role::Admin).await.unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(vitrine_core::Error::ProfileNotFound(_))
  ));
}

// ─── Admin directory ─────────────────────────────────────────────────────────

#[tokio::test]
async fn create_account_yields_active_profile() {
  let b = backend().await;
  let profile = b
    .create_account(
      &NewAccount {
        name:       "New Curator".into(),
        email:      "curator@museum.test".into(),
        department: Some("Textiles".into()),
        role:       Role::Curator,
      },
      "Temp0rary!pw",
    )
    .await
    .unwrap();

  assert!(profile.is_active);
  assert_eq!(profile.role, Role::Curator);

  // the temporary password signs in
  assert!(
    b.sign_in_with_password("curator@museum.test", "Temp0rary!pw")
      .await
      .is_ok()
  );
}

#[tokio::test]
async fn delete_account_cascades_profile_and_sessions() {
  let b = backend().await;
  let identity = b
    .sign_up(signup("Doomed", "doomed@museum.test", Role::Viewer))
    .await
    .unwrap();
  let session = b
    .sign_in_with_password("doomed@museum.test", "hunter2hunter2")
    .await
    .unwrap();

  b.delete_account(identity.user_id).await.unwrap();

  assert!(b.get_profile(identity.user_id).await.unwrap().is_none());
  assert!(
    b.resolve_token(&session.access_token)
      .await
      .unwrap()
      .is_none()
  );
}

// ─── Artifacts ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_get_artifact() {
  let b = backend().await;
  let artifact = b
    .add_artifact(new_artifact("Oil lamp", "alice@museum.test"))
    .await
    .unwrap();

  let fetched = b.get_artifact(artifact.id).await.unwrap().unwrap();
  assert_eq!(fetched.title, "Oil lamp");
  assert_eq!(fetched.condition, Condition::Good);
  assert_eq!(fetched.dimensions.weight_kg, Some(0.2));
  assert_eq!(fetched.created_by, "alice@museum.test");
}

#[tokio::test]
async fn create_appends_history_row() {
  let b = backend().await;
  let artifact = b
    .add_artifact(new_artifact("Oil lamp", "alice@museum.test"))
    .await
    .unwrap();

  let history = b.list_history(Some(artifact.id)).await.unwrap();
  assert_eq!(history.len(), 1);
  assert_eq!(history[0].action, HistoryAction::Created);
  assert_eq!(history[0].edited_by, "alice@museum.test");
}

#[tokio::test]
async fn update_artifact_records_field_diff() {
  let b = backend().await;
  let artifact = b
    .add_artifact(new_artifact("Oil lamp", "alice@museum.test"))
    .await
    .unwrap();

  let patch = ArtifactPatch {
    condition: Some(Condition::Fair),
    location: Some(ObjectLocation::Vitrine),
    ..Default::default()
  };
  let updated = b
    .update_artifact(artifact.id, patch, "bob@museum.test")
    .await
    .unwrap();
  assert_eq!(updated.condition, Condition::Fair);
  assert_eq!(updated.last_edited_by, "bob@museum.test");
  assert!(updated.updated_at > artifact.updated_at);

  let history = b.list_history(Some(artifact.id)).await.unwrap();
  let entry = history
    .iter()
    .find(|h| h.action == HistoryAction::Updated)
    .unwrap();
  let changes = entry.changes.as_object().unwrap();
  assert_eq!(changes.len(), 2);
  assert_eq!(changes["condition"]["old"], "good");
  assert_eq!(changes["condition"]["new"], "fair");
  assert_eq!(changes["location"]["new"], "vitrine");
}

#[tokio::test]
async fn empty_patch_is_a_no_op() {
  let b = backend().await;
  let artifact = b
    .add_artifact(new_artifact("Oil lamp", "alice@museum.test"))
    .await
    .unwrap();

  let same = b
    .update_artifact(artifact.id, ArtifactPatch::default(), "bob@museum.test")
    .await
    .unwrap();
  assert_eq!(same.updated_at, artifact.updated_at);
  assert_eq!(same.last_edited_by, "alice@museum.test");

  // no Updated history row was written
  let history = b.list_history(Some(artifact.id)).await.unwrap();
  assert!(history.iter().all(|h| h.action == HistoryAction::Created));
}

#[tokio::test]
async fn delete_artifact_keeps_history() {
  let b = backend().await;
  let artifact = b
    .add_artifact(new_artifact("Oil lamp", "alice@museum.test"))
    .await
    .unwrap();

  b.delete_artifact(artifact.id, "alice@museum.test")
    .await
    .unwrap();

  assert!(b.get_artifact(artifact.id).await.unwrap().is_none());

  let history = b.list_history(Some(artifact.id)).await.unwrap();
  assert_eq!(history.len(), 2);
  assert_eq!(history[0].action, HistoryAction::Deleted);
  assert_eq!(history[0].notes.as_deref(), Some("Oil lamp"));
}

#[tokio::test]
async fn list_artifacts_filters() {
  let b = backend().await;
  b.add_artifact(new_artifact("Oil lamp", "a@museum.test"))
    .await
    .unwrap();
  let mut amphora = new_artifact("Amphora", "a@museum.test");
  amphora.category = "Pottery".into();
  amphora.tags = vec!["greek".into()];
  b.add_artifact(amphora).await.unwrap();

  let all = b.list_artifacts(&ArtifactQuery::default()).await.unwrap();
  assert_eq!(all.len(), 2);

  let by_text = b
    .list_artifacts(&ArtifactQuery {
      text: Some("amphora".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(by_text.len(), 1);
  assert_eq!(by_text[0].title, "Amphora");

  let by_category = b
    .list_artifacts(&ArtifactQuery {
      category: Some("Ceramics".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(by_category.len(), 1);
  assert_eq!(by_category[0].title, "Oil lamp");

  let by_tag = b
    .list_artifacts(&ArtifactQuery {
      tag: Some("greek".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(by_tag.len(), 1);
}

// ─── Reports ─────────────────────────────────────────────────────────────────

fn new_report(artifact_id: Uuid) -> NewReport {
  NewReport {
    artifact_id,
    report_type:     ReportType::Conservation,
    title:           "Surface cleaning".into(),
    content:         "Light soot deposits removed.".into(),
    findings:        None,
    recommendations: Some("Re-inspect in 12 months.".into()),
    priority:        ReportPriority::Low,
    created_by:      "alice@museum.test".into(),
  }
}

#[tokio::test]
async fn add_report_denormalises_artifact_title() {
  let b = backend().await;
  let artifact = b
    .add_artifact(new_artifact("Oil lamp", "alice@museum.test"))
    .await
    .unwrap();

  let report = b.add_report(new_report(artifact.id)).await.unwrap();
  assert_eq!(report.artifact_title, "Oil lamp");
  assert_eq!(report.status, ReportStatus::Draft);
  assert!(report.reviewed_by.is_none());
}

#[tokio::test]
async fn add_report_for_unknown_artifact_errors() {
  let b = backend().await;
  let err = b.add_report(new_report(Uuid::new_v4())).await.unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(vitrine_core::Error::ArtifactNotFound(_))
  ));
}

#[tokio::test]
async fn review_stamps_reviewer_and_time() {
  let b = backend().await;
  let artifact = b
    .add_artifact(new_artifact("Oil lamp", "alice@museum.test"))
    .await
    .unwrap();
  let report = b.add_report(new_report(artifact.id)).await.unwrap();

  let reviewed = b
    .update_report(
      report.id,
      ReportPatch {
        status: Some(ReportStatus::Completed),
        reviewed_by: Some("bob@museum.test".into()),
        ..Default::default()
      },
    )
    .await
    .unwrap();

  assert_eq!(reviewed.status, ReportStatus::Completed);
  assert_eq!(reviewed.reviewed_by.as_deref(), Some("bob@museum.test"));
  assert!(reviewed.reviewed_at.is_some());
}

#[tokio::test]
async fn list_reports_per_artifact() {
  let b = backend().await;
  let lamp = b
    .add_artifact(new_artifact("Oil lamp", "a@museum.test"))
    .await
    .unwrap();
  let amphora = b
    .add_artifact(new_artifact("Amphora", "a@museum.test"))
    .await
    .unwrap();
  b.add_report(new_report(lamp.id)).await.unwrap();
  b.add_report(new_report(lamp.id)).await.unwrap();
  b.add_report(new_report(amphora.id)).await.unwrap();

  assert_eq!(b.list_reports(None).await.unwrap().len(), 3);
  assert_eq!(b.list_reports(Some(lamp.id)).await.unwrap().len(), 2);
}

// ─── Change feed ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn profile_mutations_emit_change_events() {
  let b = backend().await;
  let identity = b
    .sign_up(signup("Early", "early@museum.test", Role::Viewer))
    .await
    .unwrap();

  let mut rx = b.watch(Table::Profiles);
  b.update_role(identity.user_id, Role::Curator).await.unwrap();

  let event = rx.recv().await.unwrap();
  assert_eq!(event.table, Table::Profiles);
  assert_eq!(event.action, ChangeAction::Update);
  assert_eq!(event.row_id, identity.user_id);
}

#[tokio::test]
async fn artifact_mutation_emits_on_both_tables() {
  let b = backend().await;
  let mut artifacts_rx = b.watch(Table::Artifacts);
  let mut history_rx = b.watch(Table::ArtifactHistory);

  let artifact = b
    .add_artifact(new_artifact("Oil lamp", "a@museum.test"))
    .await
    .unwrap();

  let insert = artifacts_rx.recv().await.unwrap();
  assert_eq!(insert.action, ChangeAction::Insert);
  assert_eq!(insert.row_id, artifact.id);

  let audit = history_rx.recv().await.unwrap();
  assert_eq!(audit.table, Table::ArtifactHistory);
  assert_eq!(audit.action, ChangeAction::Insert);
}
