use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use tracing::debug;

use common::types::{OrganizationId, UserId};
use models::{Capability, Organization, OrganizationData};
use state::{
    KeyDefinition, KeyedState, StateDefinition, StateProvider, StateSubscription, StorageLocation,
};

use crate::errors::ServiceError;

/// Storage domain for organization membership state, persisted on disk.
pub const ORGANIZATIONS_DISK: StateDefinition =
    StateDefinition::new("organizations", StorageLocation::Disk);

/// How the organization list is stored: a record of organization id ->
/// persisted data, one record per user scope.
pub type OrganizationRecord = HashMap<String, OrganizationData>;

/// Key under which the per-user organization record lives.
pub static ORGANIZATIONS: Lazy<KeyDefinition<OrganizationRecord>> = Lazy::new(|| {
    state::registry::global()
        .register_record::<OrganizationData>(ORGANIZATIONS_DISK, "organizations")
        .expect("register organizations state key")
});

/// Publishes organization state for the current or a specific user and owns
/// the update paths (`upsert`/`replace`). Reads surface [`Organization`]
/// views rebuilt from the stored record on every emission.
#[derive(Clone)]
pub struct OrganizationService {
    provider: Arc<StateProvider>,
}

impl OrganizationService {
    pub fn new(provider: Arc<StateProvider>) -> Self {
        Self { provider }
    }

    /// Organization record state for the specified user, defaulting to the
    /// currently active one.
    fn state_for(
        &self,
        user_id: Option<UserId>,
    ) -> Result<KeyedState<OrganizationRecord>, ServiceError> {
        Ok(self.provider.get_user_or_active(user_id, &ORGANIZATIONS)?)
    }

    /// Live list of the user's organizations as read-only views. Absent
    /// state emits an empty list; ordering is not significant.
    pub async fn organizations(
        &self,
        user_id: Option<UserId>,
    ) -> Result<OrganizationsSubscription, ServiceError> {
        let inner = self.state_for(user_id)?.changes().await?;
        Ok(OrganizationsSubscription { inner })
    }

    /// Snapshot of the current organization list.
    pub async fn organizations_now(
        &self,
        user_id: Option<UserId>,
    ) -> Result<Vec<Organization>, ServiceError> {
        let record = self.state_for(user_id)?.get().await?;
        Ok(record_to_views(&record))
    }

    /// Look up a single organization by id.
    pub async fn get(
        &self,
        id: OrganizationId,
        user_id: Option<UserId>,
    ) -> Result<Option<Organization>, ServiceError> {
        Ok(self
            .organizations_now(user_id)
            .await?
            .into_iter()
            .find(|org| org.id == id))
    }

    /// Organizations whose admin console the user can open, sorted by name.
    pub async fn admin_organizations(
        &self,
        user_id: Option<UserId>,
    ) -> Result<Vec<Organization>, ServiceError> {
        let mut orgs: Vec<Organization> = self
            .organizations_now(user_id)
            .await?
            .into_iter()
            .filter(|org| Capability::OrgAdmin.allows(org))
            .collect();
        orgs.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(orgs)
    }

    pub async fn has_any_organizations(
        &self,
        user_id: Option<UserId>,
    ) -> Result<bool, ServiceError> {
        Ok(!self.organizations_now(user_id).await?.is_empty())
    }

    /// Insert-or-overwrite the entry keyed by `data.id`, leaving every other
    /// entry untouched.
    pub async fn upsert(
        &self,
        data: OrganizationData,
        user_id: Option<UserId>,
    ) -> Result<(), ServiceError> {
        data.validate()?;
        let state = self.state_for(user_id)?;
        debug!(org = %data.id, "upserting organization");
        state
            .update(move |mut record| {
                record.insert(data.id.to_string(), data);
                record
            })
            .await?;
        Ok(())
    }

    /// Unconditionally replace the whole record for the scope. Meant for
    /// full-sync handling; prefer `upsert` for single entries.
    pub async fn replace(
        &self,
        record: OrganizationRecord,
        user_id: Option<UserId>,
    ) -> Result<(), ServiceError> {
        let state = self.state_for(user_id)?;
        debug!(count = record.len(), "replacing organization record");
        state.update(move |_| record).await?;
        Ok(())
    }
}

/// Live organization list: the stored record is mapped to views on every
/// emission.
pub struct OrganizationsSubscription {
    inner: StateSubscription<OrganizationRecord>,
}

impl OrganizationsSubscription {
    pub async fn recv(&mut self) -> Result<Vec<Organization>, ServiceError> {
        let record = self.inner.recv().await?;
        Ok(record_to_views(&record))
    }
}

fn record_to_views(record: &OrganizationRecord) -> Vec<Organization> {
    record.values().map(Organization::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::organization::{OrganizationUserRole, OrganizationUserStatus, Permissions};
    use state::AccountService;
    use std::time::Duration;
    use uuid::Uuid;

    fn org(name: &str, role: OrganizationUserRole) -> OrganizationData {
        OrganizationData {
            id: Uuid::new_v4(),
            name: name.into(),
            identifier: None,
            enabled: true,
            status: OrganizationUserStatus::Confirmed,
            role,
            permissions: Permissions::default(),
            use_policies: true,
            use_sso: false,
            use_scim: false,
            use_groups: true,
            use_events: true,
            seats: Some(5),
            family_sponsorship_available: false,
        }
    }

    fn service_for(accounts: AccountService) -> (OrganizationService, Arc<StateProvider>) {
        let provider = Arc::new(StateProvider::in_memory(accounts));
        (OrganizationService::new(Arc::clone(&provider)), provider)
    }

    #[tokio::test]
    async fn absent_state_yields_an_empty_list() -> Result<(), anyhow::Error> {
        let (service, _) = service_for(AccountService::with_active(Uuid::new_v4()));
        assert!(service.organizations_now(None).await?.is_empty());
        assert!(!service.has_any_organizations(None).await?);
        Ok(())
    }

    #[tokio::test]
    async fn upsert_inserts_and_preserves_other_entries() -> Result<(), anyhow::Error> {
        let (service, _) = service_for(AccountService::with_active(Uuid::new_v4()));
        let acme = org("Acme", OrganizationUserRole::Owner);
        let globex = org("Globex", OrganizationUserRole::User);

        service.upsert(acme.clone(), None).await?;
        service.upsert(globex.clone(), None).await?;

        let mut renamed = acme.clone();
        renamed.name = "Acme Rebranded".into();
        service.upsert(renamed.clone(), None).await?;

        let orgs = service.organizations_now(None).await?;
        assert_eq!(orgs.len(), 2);
        let acme_view = service.get(acme.id, None).await?.expect("acme present");
        assert_eq!(acme_view.name, "Acme Rebranded");
        let globex_view = service.get(globex.id, None).await?.expect("globex intact");
        assert_eq!(globex_view.name, "Globex");
        Ok(())
    }

    #[tokio::test]
    async fn replace_drops_entries_not_in_the_new_record() -> Result<(), anyhow::Error> {
        let (service, _) = service_for(AccountService::with_active(Uuid::new_v4()));
        let old = org("Old", OrganizationUserRole::User);
        service.upsert(old.clone(), None).await?;

        let fresh = org("Fresh", OrganizationUserRole::User);
        let record: OrganizationRecord =
            HashMap::from([(fresh.id.to_string(), fresh.clone())]);
        service.replace(record, None).await?;

        let orgs = service.organizations_now(None).await?;
        assert_eq!(orgs.len(), 1);
        assert_eq!(orgs[0].id, fresh.id);
        assert!(service.get(old.id, None).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn scopes_do_not_leak_between_users() -> Result<(), anyhow::Error> {
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let (service, _) = service_for(AccountService::with_active(alice));

        service
            .upsert(org("Acme", OrganizationUserRole::User), Some(alice))
            .await?;

        assert!(service.organizations_now(Some(bob)).await?.is_empty());
        assert_eq!(service.organizations_now(Some(alice)).await?.len(), 1);
        // Active scope aliases alice right now.
        assert_eq!(service.organizations_now(None).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn subscription_taken_before_a_switch_stays_pinned() -> Result<(), anyhow::Error> {
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let accounts = AccountService::with_active(alice);
        let (service, _) = service_for(accounts.clone());

        let mut pinned = service.organizations(None).await?;
        assert!(pinned.recv().await?.is_empty());

        accounts.switch(Some(bob));
        let mut fresh = service.organizations(None).await?;
        assert!(fresh.recv().await?.is_empty());

        let acme = org("Acme", OrganizationUserRole::User);
        service.upsert(acme.clone(), Some(alice)).await?;

        let seen = pinned.recv().await?;
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].id, acme.id);

        // Bob's subscription must not observe alice's write.
        let unexpected = tokio::time::timeout(Duration::from_millis(50), fresh.recv()).await;
        assert!(unexpected.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_upserts_both_land() -> Result<(), anyhow::Error> {
        let (service, _) = service_for(AccountService::with_active(Uuid::new_v4()));
        let a = org("A", OrganizationUserRole::User);
        let b = org("B", OrganizationUserRole::User);

        let (ra, rb) = tokio::join!(
            service.upsert(a.clone(), None),
            service.upsert(b.clone(), None)
        );
        ra?;
        rb?;

        let orgs = service.organizations_now(None).await?;
        assert_eq!(orgs.len(), 2);
        assert!(service.get(a.id, None).await?.is_some());
        assert!(service.get(b.id, None).await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn reserialized_upsert_is_idempotent() -> Result<(), anyhow::Error> {
        let user = Uuid::new_v4();
        let (service, provider) = service_for(AccountService::with_active(user));
        let acme = org("Acme", OrganizationUserRole::Admin);
        service.upsert(acme.clone(), None).await?;

        // Pull the record back out, push it through JSON, and upsert again.
        let stored = provider.get_user(user, &ORGANIZATIONS)?.get().await?;
        let round_tripped: OrganizationData = serde_json::from_value(serde_json::to_value(
            stored.get(&acme.id.to_string()).expect("stored entry"),
        )?)?;
        let before = service.organizations_now(None).await?;

        service.upsert(round_tripped, None).await?;
        let after = service.organizations_now(None).await?;
        assert_eq!(before, after);
        Ok(())
    }

    #[tokio::test]
    async fn admin_filter_uses_the_capability_table() -> Result<(), anyhow::Error> {
        let (service, _) = service_for(AccountService::with_active(Uuid::new_v4()));

        let mut member_only = org("zeta", OrganizationUserRole::User);
        member_only.status = OrganizationUserStatus::Invited;
        let owner = org("alpha", OrganizationUserRole::Owner);
        let admin = org("Beta", OrganizationUserRole::Admin);

        service.upsert(member_only, None).await?;
        service.upsert(owner.clone(), None).await?;
        service.upsert(admin.clone(), None).await?;

        let admins = service.admin_organizations(None).await?;
        let names: Vec<&str> = admins.iter().map(|o| o.name.as_str()).collect();
        // Sorted case-insensitively; the unconfirmed membership is filtered
        // out because it grants no tab at all.
        assert_eq!(names, vec!["alpha", "Beta"]);
        Ok(())
    }

    #[tokio::test]
    async fn upsert_rejects_invalid_records() -> Result<(), anyhow::Error> {
        let (service, _) = service_for(AccountService::with_active(Uuid::new_v4()));
        let mut nameless = org("", OrganizationUserRole::User);
        nameless.name = "".into();
        let err = service.upsert(nameless, None).await.err();
        assert!(matches!(err, Some(ServiceError::Model(_))));
        Ok(())
    }

    #[tokio::test]
    async fn operations_without_an_active_account_fail_cleanly() {
        let (service, _) = service_for(AccountService::new());
        let err = service.organizations_now(None).await.err();
        assert!(matches!(err, Some(ServiceError::State(_))));
    }
}
