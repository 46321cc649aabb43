use std::sync::Arc;

use log::{debug, info};
use tokio::sync::{RwLock, RwLockWriteGuard};

use crate::{ServiceError, ServiceResult, util::validate_contact};

pub type ContactId = i64;

/// Column names of the record file, in storage order.
pub const CONTACT_FIELDS: [&str; 6] = [
    "id",
    "first_name",
    "first_surname",
    "second_surname",
    "email",
    "phone",
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Contact {
    pub id: ContactId,
    pub first_name: String,
    pub first_surname: String,
    pub second_surname: String,
    pub email: String,
    pub phone: String,
}

impl Contact {
    /// The text fields paired with their column names.
    pub fn fields(&self) -> [(&'static str, &str); 5] {
        [
            ("first_name", self.first_name.as_str()),
            ("first_surname", self.first_surname.as_str()),
            ("second_surname", self.second_surname.as_str()),
            ("email", self.email.as_str()),
            ("phone", self.phone.as_str()),
        ]
    }

    fn name_contains(&self, needle_lowercase: &str) -> bool {
        self.first_name.to_lowercase().contains(needle_lowercase)
    }
}

/// Exclusive write access to the underlying store, released on drop.
pub struct WriteLease {
    _guard: Box<dyn std::any::Any + Send + Sync>,
}

impl WriteLease {
    pub fn new<T: Send + Sync + 'static>(guard: T) -> Self {
        Self {
            _guard: Box::new(guard),
        }
    }
}

pub type ArcContactRepository = Arc<Box<dyn ContactRepository + Send + Sync + 'static>>;

/// Whole-file access to the stored contacts. Implementations do no
/// validation; `ContactServiceImpl` holds `lock_for_write` across every
/// read-modify-write, so the lease must exclude writers in other processes too.
#[async_trait::async_trait]
pub trait ContactRepository {
    async fn lock_for_write(&self) -> ServiceResult<WriteLease>;
    async fn load_all(&self) -> ServiceResult<Vec<Contact>>;
    async fn append(&self, contact: &Contact) -> ServiceResult<()>;
    async fn replace_all(&self, contacts: &[Contact]) -> ServiceResult<()>;
}

pub type ArcContactService = Arc<Box<dyn ContactService + Send + Sync + 'static>>;

#[async_trait::async_trait]
pub trait ContactService {
    async fn list_contacts(&self) -> ServiceResult<Vec<Contact>>;
    async fn create_contact(&self, contact: Contact) -> ServiceResult<Contact>;
    async fn update_contact(&self, id: ContactId, contact: Contact) -> ServiceResult<Contact>;
    async fn delete_contact(&self, id: ContactId) -> ServiceResult<()>;
    async fn search_contacts(&self, name: &str) -> ServiceResult<Vec<Contact>>;
}

pub struct ContactServiceImpl {
    contact_repository: ArcContactRepository,
    record_lock: RwLock<()>,
}

impl ContactServiceImpl {
    pub fn new(contact_repository: ArcContactRepository) -> Self {
        Self {
            contact_repository,
            record_lock: RwLock::new(()),
        }
    }

    async fn lock_for_write(&self) -> ServiceResult<(RwLockWriteGuard<'_, ()>, WriteLease)> {
        let guard = self.record_lock.write().await;
        let lease = self.contact_repository.lock_for_write().await?;
        Ok((guard, lease))
    }
}

#[async_trait::async_trait]
impl ContactService for ContactServiceImpl {
    async fn list_contacts(&self) -> ServiceResult<Vec<Contact>> {
        let _guard = self.record_lock.read().await;
        let contacts = self.contact_repository.load_all().await?;
        if contacts.is_empty() {
            return ServiceError::not_found("No contacts found");
        }
        debug!("Listed {} contacts", contacts.len());
        Ok(contacts)
    }

    async fn create_contact(&self, contact: Contact) -> ServiceResult<Contact> {
        validate_contact(&contact)?;

        let _lock = self.lock_for_write().await?;
        let contacts = self.contact_repository.load_all().await?;
        if contacts.iter().any(|c| c.id == contact.id) {
            return ServiceError::bad_request(format!(
                "Contact with id {} already exists",
                contact.id
            ));
        }
        self.contact_repository.append(&contact).await?;

        info!("Created contact {}", contact.id);
        Ok(contact)
    }

    async fn update_contact(&self, id: ContactId, contact: Contact) -> ServiceResult<Contact> {
        if contact.id != id {
            return ServiceError::bad_request(format!(
                "Contact id {} does not match path id {}",
                contact.id, id
            ));
        }
        validate_contact(&contact)?;

        let _lock = self.lock_for_write().await?;
        let mut contacts = self.contact_repository.load_all().await?;
        let mut found = false;
        for existing in contacts.iter_mut().filter(|c| c.id == id) {
            *existing = contact.clone();
            found = true;
        }
        if !found {
            return ServiceError::not_found(format!("Contact with id {} not found", id));
        }
        self.contact_repository.replace_all(&contacts).await?;

        info!("Updated contact {}", id);
        Ok(contact)
    }

    async fn delete_contact(&self, id: ContactId) -> ServiceResult<()> {
        let _lock = self.lock_for_write().await?;
        let mut contacts = self.contact_repository.load_all().await?;
        let before = contacts.len();
        contacts.retain(|c| c.id != id);
        if contacts.len() == before {
            return ServiceError::not_found(format!("Contact with id {} not found", id));
        }
        self.contact_repository.replace_all(&contacts).await?;

        info!("Deleted contact {}", id);
        Ok(())
    }

    async fn search_contacts(&self, name: &str) -> ServiceResult<Vec<Contact>> {
        let needle = name.to_lowercase();

        let _guard = self.record_lock.read().await;
        let matches: Vec<Contact> = self
            .contact_repository
            .load_all()
            .await?
            .into_iter()
            .filter(|c| c.name_contains(&needle))
            .collect();
        if matches.is_empty() {
            return ServiceError::not_found(format!("No contacts found with name '{}'", name));
        }
        debug!("Search for '{}' matched {} contacts", name, matches.len());
        Ok(matches)
    }
}

#[cfg(test)]
#[derive(Default, Clone)]
pub struct MockContactRepository {
    contacts: Arc<std::sync::Mutex<Vec<Contact>>>,
    fail: bool,
}

#[cfg(test)]
impl MockContactRepository {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn get_contacts(&self) -> Vec<Contact> {
        self.contacts.lock().unwrap().clone()
    }

    fn check(&self) -> ServiceResult<()> {
        if self.fail {
            return ServiceError::internal("disk on fire");
        }
        Ok(())
    }
}

#[cfg(test)]
#[async_trait::async_trait]
impl ContactRepository for MockContactRepository {
    async fn lock_for_write(&self) -> ServiceResult<WriteLease> {
        Ok(WriteLease::new(()))
    }

    async fn load_all(&self) -> ServiceResult<Vec<Contact>> {
        self.check()?;
        let contacts = self.get_contacts();
        // widen the window between read and write so unserialized writers would interleave
        tokio::task::yield_now().await;
        Ok(contacts)
    }

    async fn append(&self, contact: &Contact) -> ServiceResult<()> {
        self.check()?;
        self.contacts.lock().unwrap().push(contact.clone());
        Ok(())
    }

    async fn replace_all(&self, contacts: &[Contact]) -> ServiceResult<()> {
        self.check()?;
        *self.contacts.lock().unwrap() = contacts.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(id: ContactId, first_name: &str) -> Contact {
        Contact {
            id,
            first_name: first_name.to_string(),
            first_surname: "Lopez".to_string(),
            second_surname: "Ruiz".to_string(),
            email: format!("{}@x.com", first_name.to_lowercase()),
            phone: "555-0100".to_string(),
        }
    }

    fn service() -> (MockContactRepository, ContactServiceImpl) {
        let repo = MockContactRepository::default();
        let service = ContactServiceImpl::new(Arc::new(Box::new(repo.clone())));
        (repo, service)
    }

    #[tokio::test]
    async fn test_lifecycle() {
        let (_, service) = service();

        assert!(matches!(
            service.list_contacts().await,
            Err(ServiceError::NotFound(..))
        ));

        let ana = contact(1, "Ana");
        assert_eq!(service.create_contact(ana.clone()).await.ok(), Some(ana.clone()));
        assert_eq!(service.list_contacts().await.ok(), Some(vec![ana.clone()]));

        let anna = Contact {
            first_name: "Anna".to_string(),
            ..ana.clone()
        };
        assert_eq!(
            service.update_contact(1, anna.clone()).await.ok(),
            Some(anna.clone())
        );
        assert_eq!(service.list_contacts().await.ok(), Some(vec![anna]));

        assert!(service.delete_contact(1).await.is_ok());
        assert!(matches!(
            service.list_contacts().await,
            Err(ServiceError::NotFound(..))
        ));
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_without_writing() {
        let (repo, service) = service();

        let mut no_name = contact(1, "Ana");
        no_name.first_name = String::new();
        assert!(matches!(
            service.create_contact(no_name).await,
            Err(ServiceError::BadRequest(..))
        ));

        let mut no_email = contact(2, "Bea");
        no_email.email = String::new();
        assert!(matches!(
            service.create_contact(no_email).await,
            Err(ServiceError::BadRequest(..))
        ));

        assert!(repo.get_contacts().is_empty());
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_id() {
        let (repo, service) = service();
        service.create_contact(contact(1, "Ana")).await.unwrap();

        assert!(matches!(
            service.create_contact(contact(1, "Bea")).await,
            Err(ServiceError::BadRequest(..))
        ));
        assert_eq!(repo.get_contacts(), vec![contact(1, "Ana")]);
    }

    #[tokio::test]
    async fn test_update_keeps_order_and_other_rows() {
        let (repo, service) = service();
        for (id, name) in [(1, "Ana"), (2, "Bea"), (3, "Carla")] {
            service.create_contact(contact(id, name)).await.unwrap();
        }

        let mut beatriz = contact(2, "Beatriz");
        beatriz.phone = "555-0199".to_string();
        service.update_contact(2, beatriz.clone()).await.unwrap();

        assert_eq!(
            repo.get_contacts(),
            vec![contact(1, "Ana"), beatriz, contact(3, "Carla")]
        );
    }

    #[tokio::test]
    async fn test_update_errors() {
        let (repo, service) = service();
        service.create_contact(contact(1, "Ana")).await.unwrap();

        assert!(matches!(
            service.update_contact(7, contact(7, "Gina")).await,
            Err(ServiceError::NotFound(..))
        ));
        assert!(matches!(
            service.update_contact(1, contact(2, "Ana")).await,
            Err(ServiceError::BadRequest(..))
        ));

        let mut no_email = contact(1, "Ana");
        no_email.email = String::new();
        assert!(matches!(
            service.update_contact(1, no_email).await,
            Err(ServiceError::BadRequest(..))
        ));
        assert_eq!(repo.get_contacts(), vec![contact(1, "Ana")]);
    }

    #[tokio::test]
    async fn test_delete_removes_only_target() {
        let (repo, service) = service();
        for (id, name) in [(1, "Ana"), (2, "Bea"), (3, "Carla")] {
            service.create_contact(contact(id, name)).await.unwrap();
        }

        service.delete_contact(2).await.unwrap();
        assert_eq!(repo.get_contacts(), vec![contact(1, "Ana"), contact(3, "Carla")]);

        assert!(matches!(
            service.delete_contact(2).await,
            Err(ServiceError::NotFound(..))
        ));
        assert_eq!(repo.get_contacts().len(), 2);
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_substring() {
        let (_, service) = service();
        for (id, name) in [(1, "Ana"), (2, "Mariana"), (3, "Carla"), (4, "ÁNGEL")] {
            service.create_contact(contact(id, name)).await.unwrap();
        }

        let found = service.search_contacts("ANA").await.unwrap();
        let ids: Vec<ContactId> = found.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2]);

        let found = service.search_contacts("ángel").await.unwrap();
        assert_eq!(found, vec![contact(4, "ÁNGEL")]);

        assert!(matches!(
            service.search_contacts("zoe").await,
            Err(ServiceError::NotFound(..))
        ));
    }

    #[tokio::test]
    async fn test_search_empty_name_matches_all() {
        let (_, service) = service();
        assert!(matches!(
            service.search_contacts("").await,
            Err(ServiceError::NotFound(..))
        ));

        for (id, name) in [(1, "Ana"), (2, "Bea"), (3, "Carla")] {
            service.create_contact(contact(id, name)).await.unwrap();
        }
        let ids: Vec<ContactId> = service
            .search_contacts("")
            .await
            .unwrap()
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_repository_failure_is_internal() {
        let service = ContactServiceImpl::new(Arc::new(Box::new(MockContactRepository::failing())));

        assert!(matches!(
            service.list_contacts().await,
            Err(ServiceError::Internal(..))
        ));
        assert!(matches!(
            service.create_contact(contact(1, "Ana")).await,
            Err(ServiceError::Internal(..))
        ));
        assert!(matches!(
            service.delete_contact(1).await,
            Err(ServiceError::Internal(..))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writers_do_not_lose_updates() {
        let repo = MockContactRepository::default();
        let service: ArcContactService =
            Arc::new(Box::new(ContactServiceImpl::new(Arc::new(Box::new(repo.clone())))));
        for id in 0..20 {
            service.create_contact(contact(id, "Ana")).await.unwrap();
        }

        let handles: Vec<_> = (0..20)
            .map(|id| {
                let service = service.clone();
                tokio::spawn(async move {
                    service
                        .update_contact(id, contact(id, &format!("Updated{}", id)))
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let contacts = repo.get_contacts();
        assert_eq!(contacts.len(), 20);
        for (id, c) in contacts.iter().enumerate() {
            assert_eq!(c.id, id as ContactId);
            assert_eq!(c.first_name, format!("Updated{}", id));
        }
    }
}
