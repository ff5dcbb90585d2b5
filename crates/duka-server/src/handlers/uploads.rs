//! Multipart image uploads.

use axum::{
  Json,
  extract::{Multipart, State},
};
use duka_core::store::KeyValueStore;
use serde_json::{Value, json};

use crate::{
  AppState,
  auth::{AdminUser, CurrentUser},
  error::ApiError,
  media::{self, MediaError, Upload, clean_segment},
};

/// The `file` part plus any text fields of a multipart form.
struct Form {
  file:   Option<Upload>,
  fields: Vec<(String, String)>,
}

impl Form {
  async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
    let mut form = Form { file: None, fields: Vec::new() };
    while let Some(field) = multipart.next_field().await? {
      let Some(name) = field.name().map(str::to_owned) else {
        continue;
      };
      if name == "file" {
        let file_name = field.file_name().map(str::to_owned);
        let content_type = field.content_type().map(str::to_owned);
        let bytes = field.bytes().await?;
        form.file = Some(Upload { file_name, content_type, bytes });
      } else {
        form.fields.push((name, field.text().await?));
      }
    }
    Ok(form)
  }

  fn field(&self, name: &str) -> Option<&str> {
    self
      .fields
      .iter()
      .find(|(n, _)| n == name)
      .map(|(_, v)| v.trim())
      .filter(|v| !v.is_empty())
  }
}

async fn store_upload<S>(
  state: &AppState<S>,
  prefix: &str,
  upload: &Upload,
) -> Result<Json<Value>, ApiError>
where
  S: KeyValueStore + 'static,
{
  let name = media::save(&state.config.media_dir, prefix, upload, state.clock.now()).await?;
  Ok(Json(json!({ "success": true, "url": media::public_url(&name) })))
}

/// `POST /upload-profile-picture`; fields `file` and `userId`.
pub async fn profile_picture<S>(
  State(state): State<AppState<S>>,
  CurrentUser(user): CurrentUser,
  multipart: Multipart,
) -> Result<Json<Value>, ApiError>
where
  S: KeyValueStore + 'static,
{
  let form = Form::read(multipart).await?;
  let user_id = form.field("userId");
  if let Some(claimed) = user_id
    && claimed != user.id.to_string()
  {
    return Err(ApiError::Forbidden(
      "Can only upload your own profile picture".to_owned(),
    ));
  }
  let (Some(_), Some(upload)) = (user_id, form.file.as_ref()) else {
    return Err(ApiError::BadRequest("File and userId required".to_owned()));
  };
  store_upload(&state, &format!("profile-{}", user.id), upload).await
}

/// `POST /upload-image`; fields `file` and optional `type` (default
/// `general`), which becomes the file name prefix.
pub async fn image<S>(
  State(state): State<AppState<S>>,
  _: AdminUser,
  multipart: Multipart,
) -> Result<Json<Value>, ApiError>
where
  S: KeyValueStore + 'static,
{
  let form = Form::read(multipart).await?;
  let upload = form.file.as_ref().ok_or(MediaError::Missing)?;
  let prefix = form
    .field("type")
    .map(clean_segment)
    .filter(|p| !p.is_empty())
    .unwrap_or_else(|| "general".to_owned());
  store_upload(&state, &prefix, upload).await
}
