use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, State},
    http::StatusCode,
};
use contact_server_domain::{
    ServiceError,
    app::AppState,
    contact::{Contact, ContactId},
};

use crate::{ApiError, JsonMessage};

/// `axum::Json` whose rejection is reported through `ApiError`.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct PathParam<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct QueryParams<T>(pub T);

#[derive(serde::Serialize, Clone, Debug, PartialEq)]
pub struct JsonContact {
    id: ContactId,
    first_name: String,
    first_surname: String,
    second_surname: String,
    email: String,
    phone: String,
}

impl From<Contact> for JsonContact {
    fn from(contact: Contact) -> Self {
        JsonContact {
            id: contact.id,
            first_name: contact.first_name,
            first_surname: contact.first_surname,
            second_surname: contact.second_surname,
            email: contact.email,
            phone: contact.phone,
        }
    }
}

/// Missing text fields deserialize as empty strings so that the service
/// reports them as validation errors.
#[derive(serde::Deserialize)]
pub struct JsonContactRequest {
    id: Option<ContactId>,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    first_surname: String,
    #[serde(default)]
    second_surname: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    phone: String,
}

impl JsonContactRequest {
    fn into_contact(self, id: ContactId) -> Contact {
        Contact {
            id,
            first_name: self.first_name,
            first_surname: self.first_surname,
            second_surname: self.second_surname,
            email: self.email,
            phone: self.phone,
        }
    }
}

#[derive(serde::Deserialize)]
pub struct SearchQuery {
    name: String,
}

pub async fn get_all(State(app): State<AppState>) -> Result<Json<Vec<JsonContact>>, ApiError> {
    let contacts = app.contact_service.list_contacts().await?;
    Ok(Json(contacts.into_iter().map(JsonContact::from).collect()))
}

pub async fn create(
    State(app): State<AppState>,
    JsonBody(request): JsonBody<JsonContactRequest>,
) -> Result<(StatusCode, Json<JsonContact>), ApiError> {
    let Some(id) = request.id else {
        return Err(ServiceError::BadRequest("Missing required field: id".to_string()).into());
    };
    let contact = app
        .contact_service
        .create_contact(request.into_contact(id))
        .await?;
    Ok((StatusCode::CREATED, Json(contact.into())))
}

pub async fn update(
    PathParam(id): PathParam<ContactId>,
    State(app): State<AppState>,
    JsonBody(request): JsonBody<JsonContactRequest>,
) -> Result<Json<JsonContact>, ApiError> {
    // the path id wins when the body omits it; a conflicting one is rejected by the service
    let body_id = request.id.unwrap_or(id);
    let contact = app
        .contact_service
        .update_contact(id, request.into_contact(body_id))
        .await?;
    Ok(Json(contact.into()))
}

pub async fn delete(
    PathParam(id): PathParam<ContactId>,
    State(app): State<AppState>,
) -> Result<Json<JsonMessage>, ApiError> {
    app.contact_service.delete_contact(id).await?;
    Ok(Json(JsonMessage {
        message: "contact deleted".to_string(),
    }))
}

pub async fn search(
    QueryParams(query): QueryParams<SearchQuery>,
    State(app): State<AppState>,
) -> Result<Json<Vec<JsonContact>>, ApiError> {
    let contacts = app.contact_service.search_contacts(&query.name).await?;
    Ok(Json(contacts.into_iter().map(JsonContact::from).collect()))
}
