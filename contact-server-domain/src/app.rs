use std::sync::Arc;

use crate::contact::{ArcContactRepository, ArcContactService, ContactServiceImpl};

#[derive(Clone)]
pub struct AppState {
    pub contact_service: ArcContactService,
}

pub fn construct_app(contact_repository: ArcContactRepository) -> AppState {
    let contact_service: ArcContactService =
        Arc::new(Box::new(ContactServiceImpl::new(contact_repository)));

    AppState { contact_service }
}
