use tracing::info;

use crate::auth::hash_password;
use crate::database::models::*;
use crate::database::store::Store;
use crate::types::Role;

/// Password of every demo account
pub const DEMO_PASSWORD: &str = "desk-demo";

/// Rows created by [`seed_demo`]
#[derive(Debug, Clone)]
pub struct DemoData {
    pub it: Area,
    pub hr: Area,
    pub hardware: RequestType,
    pub software: RequestType,
    pub payroll: RequestType,
    pub other: RequestType,
    pub root: User,
    pub admin: User,
    pub it_agent: User,
    pub it_agent2: User,
    pub hr_agent: User,
    pub alice: User,
    pub bob: User,
}

/// Demo catalog and one account per role. Returns `None` when the demo
/// accounts already exist.
pub async fn seed_demo(store: &dyn Store) -> anyhow::Result<Option<DemoData>> {
    if store.find_user_by_username("root").await?.is_some() {
        info!("Demo data already present, skipping seed");
        return Ok(None);
    }

    let it = store
        .insert_area(NewArea {
            name: "IT Support".into(),
            description: Some("Hardware, software and network issues".into()),
        })
        .await?;
    let hr = store
        .insert_area(NewArea {
            name: "Human Resources".into(),
            description: Some("Payroll, leave and contracts".into()),
        })
        .await?;

    let request_type = |name: &str, area: Option<&Area>| NewRequestType {
        name: name.to_string(),
        description: None,
        area_id: area.map(|a| a.id),
    };
    let hardware = store.insert_request_type(request_type("Hardware", Some(&it))).await?;
    let software = store.insert_request_type(request_type("Software", Some(&it))).await?;
    let payroll = store.insert_request_type(request_type("Payroll", Some(&hr))).await?;
    let other = store.insert_request_type(request_type("Other", None)).await?;

    let password_hash = hash_password(DEMO_PASSWORD)?;
    let account = |username: &str, display_name: &str, role: Role, area: Option<&Area>| NewUser {
        username: username.to_string(),
        display_name: display_name.to_string(),
        email: format!("{}@desk.local", username),
        password_hash: password_hash.clone(),
        role,
        area_id: area.map(|a| a.id),
        active: true,
    };

    let root = store
        .insert_user(account("root", "Root", Role::SuperAdmin, None))
        .await?;
    let admin = store
        .insert_user(account("admin", "Desk Admin", Role::Admin, None))
        .await?;
    let it_agent = store
        .insert_user(account("it.agent", "Ana IT", Role::AreaAgent, Some(&it)))
        .await?;
    let it_agent2 = store
        .insert_user(account("it.agent2", "Ivan IT", Role::AreaAgent, Some(&it)))
        .await?;
    let hr_agent = store
        .insert_user(account("hr.agent", "Helen HR", Role::AreaAgent, Some(&hr)))
        .await?;
    let alice = store
        .insert_user(account("alice", "Alice", Role::User, None))
        .await?;
    let bob = store
        .insert_user(account("bob", "Bob", Role::User, None))
        .await?;

    info!("Seeded demo data: 2 areas, 4 request types, 7 users");
    Ok(Some(DemoData {
        it,
        hr,
        hardware,
        software,
        payroll,
        other,
        root,
        admin,
        it_agent,
        it_agent2,
        hr_agent,
        alice,
        bob,
    }))
}
