use actix_multipart::Multipart;
use actix_web::{post, web};
use futures_util::TryStreamExt;

use crate::api::{error, success};
use crate::modules::attachment::service::AttachmentService;
use crate::modules::message::schema::Attachment;

#[post("")]
pub async fn upload_attachment(
    attachment_service: web::Data<AttachmentService>,
    mut payload: Multipart,
) -> Result<success::Success<Attachment>, error::Error> {
    let mut field = payload
        .try_next()
        .await
        .map_err(|e| error::Error::bad_request(e.to_string()))?
        .ok_or_else(|| error::Error::bad_request("No file found in request"))?;

    let original_name = field
        .content_disposition()
        .and_then(|cd| cd.get_filename())
        .map(|name| name.to_string())
        .ok_or_else(|| error::Error::bad_request("Missing filename"))?;
    let mime_type = field.content_type().map(|m| m.essence_str().to_string());

    let mut bytes = Vec::new();
    while let Some(chunk) =
        field.try_next().await.map_err(|e| error::Error::bad_request(e.to_string()))?
    {
        attachment_service.check_size(bytes.len() + chunk.len())?;
        bytes.extend_from_slice(&chunk);
    }

    let attachment =
        attachment_service.upload(&original_name, &bytes, mime_type.as_deref()).await?;
    Ok(success::Success::created(Some(attachment)).message("File uploaded successfully"))
}
