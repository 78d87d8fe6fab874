//! Two-step inquiry form. The draft lives in the session between steps, so a
//! failed submit keeps everything the visitor typed except the attachment.

use anyhow::anyhow;
use askama::Template;
use axum::{
    extract::{Multipart, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Form,
};
use service_core::error::AppError;
use tower_sessions::Session;

use crate::forms::{
    Attachment, ContactDetails, FieldErrors, FormError, InquiryDraft, InquiryType, StepTwoForm,
};
use crate::handlers::redirect_to;
use crate::handlers::views::{
    banner_view, field_views, type_options, BannerView, FieldView, TypeOptionView,
};
use crate::models::Banner;
use crate::services::inflight::submit_key;
use crate::session::{client_key, session_error};
use crate::AppState;

#[derive(Template)]
#[template(path = "contact_step1.html")]
pub struct StepOneTemplate {
    pub contact: ContactDetails,
    pub errors: FieldErrors,
}

#[derive(Template)]
#[template(path = "contact_step2.html")]
pub struct StepTwoTemplate {
    pub contact_name: String,
    pub types: Vec<TypeOptionView>,
    pub fields: Vec<FieldView>,
    pub message: String,
    pub consent: bool,
    pub errors: FieldErrors,
    pub banner: Option<BannerView>,
}

impl StepTwoTemplate {
    fn new(draft: &InquiryDraft, errors: FieldErrors, banner: Option<&Banner>) -> Self {
        Self {
            contact_name: draft.contact.full_name.clone(),
            types: type_options(draft.inquiry_type),
            fields: field_views(draft),
            message: draft.message.clone(),
            consent: draft.consent,
            errors,
            banner: banner_view(banner),
        }
    }
}

#[derive(Template)]
#[template(path = "partials/fields.html")]
pub struct FieldsTemplate {
    pub fields: Vec<FieldView>,
}

#[derive(Template)]
#[template(path = "contact_thanks.html")]
pub struct ThanksTemplate {
    pub name: String,
}

async fn load_draft(session: &Session) -> Result<InquiryDraft, AppError> {
    Ok(session
        .get::<InquiryDraft>(InquiryDraft::SESSION_KEY)
        .await
        .map_err(session_error)?
        .unwrap_or_default())
}

/// Also pins the session's client key, so overlapping step-two posts contend
/// for the same submit guard.
async fn save_draft(session: &Session, draft: &InquiryDraft) -> Result<(), AppError> {
    client_key(session).await?;
    session
        .insert(InquiryDraft::SESSION_KEY, draft)
        .await
        .map_err(session_error)
}

pub async fn contact_page(session: Session) -> Result<Response, AppError> {
    let draft = load_draft(&session).await?;
    Ok(StepOneTemplate {
        contact: draft.contact,
        errors: FieldErrors::new(),
    }
    .into_response())
}

pub async fn submit_contact(
    session: Session,
    headers: HeaderMap,
    Form(contact): Form<ContactDetails>,
) -> Result<Response, AppError> {
    let mut draft = load_draft(&session).await?;
    let outcome = draft.submit_contact(contact);
    save_draft(&session, &draft).await?;

    match outcome {
        Ok(()) => Ok(redirect_to(&headers, "/contact/details")),
        Err(errors) => Ok((
            StatusCode::UNPROCESSABLE_ENTITY,
            StepOneTemplate {
                contact: draft.contact,
                errors,
            },
        )
            .into_response()),
    }
}

pub async fn details_page(session: Session, headers: HeaderMap) -> Result<Response, AppError> {
    let draft = load_draft(&session).await?;
    if !draft.contact_confirmed {
        return Ok(redirect_to(&headers, "/contact"));
    }
    Ok(StepTwoTemplate::new(&draft, FieldErrors::new(), None).into_response())
}

/// `GET /contact/fields`: inputs for the selected inquiry type.
///
/// Values posted alongside belong to the previously shown type and are kept
/// in the draft, so switching back restores them.
pub async fn type_fields(
    session: Session,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let mut draft = load_draft(&session).await?;
    let form = StepTwoForm::from_pairs(pairs);

    if let Some(previous) = draft.inquiry_type {
        draft.fields.merge_for_type(previous, form.fields);
    }
    draft.inquiry_type = form.inquiry_type.as_deref().and_then(InquiryType::from_label);
    save_draft(&session, &draft).await?;

    Ok(FieldsTemplate {
        fields: field_views(&draft),
    }
    .into_response())
}

async fn read_step_two(mut multipart: Multipart, limit: usize) -> Result<StepTwoForm, FormError> {
    let mut form = StepTwoForm::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        if name != "attachment" {
            let value = field.text().await?;
            form.apply(&name, value);
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field.bytes().await?;
        if file_name.is_empty() || bytes.is_empty() {
            continue;
        }
        if bytes.len() > limit {
            return Err(FormError::AttachmentTooLarge { limit });
        }
        form.attachment = Some(Attachment {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }
    Ok(form)
}

/// `POST /contact/details`: validate step 2 and submit the whole inquiry.
pub async fn submit_details(
    State(state): State<AppState>,
    session: Session,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let mut draft = load_draft(&session).await?;
    let ui = &state.settings.ui;

    let form = match read_step_two(multipart, ui.max_upload_bytes).await {
        Ok(form) => form,
        Err(FormError::AttachmentTooLarge { limit }) => {
            let mut errors = FieldErrors::new();
            errors.insert(
                "attachment",
                format!("Attachments must be {} KB or smaller", limit / 1024),
            );
            return Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                StepTwoTemplate::new(&draft, errors, None),
            )
                .into_response());
        }
        Err(e) => return Err(AppError::BadRequest(anyhow!(e))),
    };

    let outcome = draft.submit_details(&form);
    save_draft(&session, &draft).await?;
    let inquiry_type = match outcome {
        Ok(inquiry_type) => inquiry_type,
        Err(errors) => {
            return Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                StepTwoTemplate::new(&draft, errors, None),
            )
                .into_response());
        }
    };

    let key = client_key(&session).await?;
    let Some(_guard) = state.inflight.try_acquire(submit_key(&key)) else {
        return Err(AppError::Conflict(anyhow!(
            "An inquiry from this session is already being submitted"
        )));
    };

    let submitted = match draft.to_multipart(inquiry_type, form.attachment) {
        Ok(multipart) => state.api.submit_inquiry(multipart).await,
        Err(e) => Err(e),
    };

    match submitted {
        Ok(()) => {
            session
                .remove::<InquiryDraft>(InquiryDraft::SESSION_KEY)
                .await
                .map_err(session_error)?;
            tracing::info!(inquiry_type = %inquiry_type, "Inquiry submitted");
            Ok(ThanksTemplate {
                name: draft.contact.full_name,
            }
            .into_response())
        }
        Err(e) => {
            tracing::warn!(inquiry_type = %inquiry_type, error = %e, "Inquiry submission failed");
            let banner = Banner::error(ui, e.user_message());
            Ok(StepTwoTemplate::new(&draft, FieldErrors::new(), Some(&banner)).into_response())
        }
    }
}
