use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};
use uuid::Uuid;

use common::utils::logging::init_logging_default;
use models::organization::{
    OrganizationData, OrganizationUserRole, OrganizationUserStatus, Permissions,
};
use service::organization::{OrganizationRecord, OrganizationService, ORGANIZATIONS};
use state::{AccountService, DeriveDefinition, FileStorage, MemoryStorage, StateProvider};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logging_default();

    let config = configs::StateConfig::load_and_validate().unwrap_or_else(|e| {
        warn!("Failed to load config file: {}, using defaults", e);
        configs::StateConfig::default()
    });
    common::env::ensure_env(&config.storage.data_dir).await?;

    let disk = FileStorage::with_capacity(
        config.disk_path(),
        config.storage.change_feed_capacity,
    )
    .await?;
    let memory = Arc::new(MemoryStorage::with_capacity(
        config.storage.change_feed_capacity,
    ));

    let accounts = AccountService::new();
    let user = Uuid::new_v4();
    accounts.switch(Some(user));
    info!(%user, "active account");

    let provider = Arc::new(StateProvider::new(disk, memory, accounts));
    let organizations = OrganizationService::new(Arc::clone(&provider));

    organizations
        .upsert(sample_org("Acme", OrganizationUserRole::Owner), None)
        .await?;
    organizations
        .upsert(sample_org("Globex", OrganizationUserRole::User), None)
        .await?;

    for org in organizations.organizations_now(None).await? {
        info!(id = %org.id, name = %org.name, admin = org.is_admin, "organization");
    }
    for org in organizations.admin_organizations(None).await? {
        info!(name = %org.name, "admin console available");
    }

    // Derived view: how many organizations the active user belongs to.
    let parent = provider.get_active(&ORGANIZATIONS)?.changes().await?;
    let count = provider.get_derived(
        parent,
        DeriveDefinition::new("organization_count", |record: &OrganizationRecord| {
            record.len()
        }),
    );
    let mut count_changes = count.changes();
    info!(count = count_changes.recv().await?, "organization count");

    Ok(())
}

fn sample_org(name: &str, role: OrganizationUserRole) -> OrganizationData {
    OrganizationData {
        id: Uuid::new_v4(),
        name: name.into(),
        identifier: Some(name.to_lowercase()),
        enabled: true,
        status: OrganizationUserStatus::Confirmed,
        role,
        permissions: Permissions::default(),
        use_policies: true,
        use_sso: false,
        use_scim: false,
        use_groups: true,
        use_events: true,
        seats: Some(10),
        family_sponsorship_available: false,
    }
}
