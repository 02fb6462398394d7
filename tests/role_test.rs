use std::sync::Arc;

use async_trait::async_trait;
use rusty_gate::auth::{Role, RoleEngine, RoleId, User, UserId};
use rusty_gate::constants::STANDARD_ROLES;
use rusty_gate::{MemoryStore, RoleStore, RustyGateError, UserStore};

struct Fixture {
    store: MemoryStore,
    users: Arc<dyn UserStore>,
    engine: RoleEngine,
}

fn fixture() -> Fixture {
    let _ = env_logger::builder().is_test(true).try_init();

    let store = MemoryStore::new();
    let users: Arc<dyn UserStore> = Arc::new(store.clone());
    let roles: Arc<dyn RoleStore> = Arc::new(store.clone());
    let engine = RoleEngine::new(roles, users.clone());
    Fixture { store, users, engine }
}

async fn create_user(fixture: &Fixture, name: &str) -> User {
    fixture
        .users
        .create(User::new(
            name.to_string(),
            format!("{}@example.com", name),
            "$argon2id$placeholder".to_string(),
        ))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_create_and_lookup_role() {
    let f = fixture();
    let role = f.engine.create_role("editor", "Can edit content").await.unwrap();

    assert_eq!(f.engine.get_role("editor").await.unwrap(), Some(role.clone()));
    assert_eq!(f.engine.get_role_by_id(role.id).await.unwrap(), Some(role));
    assert_eq!(f.engine.get_role("missing").await.unwrap(), None);
}

#[tokio::test]
async fn test_duplicate_role_rejected() {
    let f = fixture();
    f.engine.create_role("editor", "first").await.unwrap();

    assert_eq!(
        f.engine.create_role("editor", "second").await.unwrap_err(),
        RustyGateError::DuplicateRole("editor".to_string())
    );
    assert_eq!(f.engine.list_roles().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_role_name_validation() {
    let f = fixture();
    assert!(matches!(
        f.engine.create_role("   ", "blank").await,
        Err(RustyGateError::ValidationError(_))
    ));
    assert!(matches!(
        f.engine.create_role(&"r".repeat(65), "long").await,
        Err(RustyGateError::ValidationError(_))
    ));
}

#[tokio::test]
async fn test_assign_is_idempotent() {
    let f = fixture();
    let alice = create_user(&f, "alice").await;
    let admin = f.engine.create_role("admin", "Administrator").await.unwrap();

    assert!(f.engine.assign_role_to_user(alice.id, admin.id).await.unwrap());
    assert!(!f.engine.assign_role_to_user(alice.id, admin.id).await.unwrap());

    let held = f.engine.get_user_roles(alice.id).await.unwrap();
    assert_eq!(held, vec![admin]);
    assert_eq!(f.store.assignment_count().await, 1);
}

#[tokio::test]
async fn test_concurrent_assignment_creates_one_row() {
    let f = fixture();
    let alice = create_user(&f, "alice").await;
    let admin = f.engine.create_role("admin", "Administrator").await.unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = f.engine.clone();
            tokio::spawn(async move { engine.assign_role_to_user(alice.id, admin.id).await })
        })
        .collect();

    let mut created = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap() {
            created += 1;
        }
    }

    assert_eq!(created, 1);
    assert_eq!(f.store.assignment_count().await, 1);
}

#[tokio::test]
async fn test_assign_unknown_user_or_role() {
    let f = fixture();
    let alice = create_user(&f, "alice").await;
    let admin = f.engine.create_role("admin", "Administrator").await.unwrap();

    assert!(matches!(
        f.engine.assign_role_to_user(uuid::Uuid::new_v4(), admin.id).await,
        Err(RustyGateError::UserNotFound(_))
    ));
    assert!(matches!(
        f.engine.assign_role_to_user(alice.id, uuid::Uuid::new_v4()).await,
        Err(RustyGateError::RoleNotFound(_))
    ));
    assert_eq!(f.store.assignment_count().await, 0);
}

#[tokio::test]
async fn test_revoke_role() {
    let f = fixture();
    let alice = create_user(&f, "alice").await;
    let admin = f.engine.create_role("admin", "Administrator").await.unwrap();
    f.engine.assign_role_to_user(alice.id, admin.id).await.unwrap();

    assert!(f.engine.revoke_role_from_user(alice.id, admin.id).await.unwrap());
    assert!(!f.engine.revoke_role_from_user(alice.id, admin.id).await.unwrap());
    assert!(f.engine.get_user_role_names(alice.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_role_removes_assignments() {
    let f = fixture();
    let alice = create_user(&f, "alice").await;
    let bob = create_user(&f, "bob").await;
    let editor = f.engine.create_role("editor", "Editor").await.unwrap();
    let viewer = f.engine.create_role("viewer", "Viewer").await.unwrap();

    f.engine.assign_role_to_user(alice.id, editor.id).await.unwrap();
    f.engine.assign_role_to_user(bob.id, editor.id).await.unwrap();
    f.engine.assign_role_to_user(bob.id, viewer.id).await.unwrap();

    f.engine.delete_role(editor.id).await.unwrap();

    assert!(f.engine.get_user_roles(alice.id).await.unwrap().is_empty());
    let bob_roles = f.engine.get_user_role_names(bob.id).await.unwrap();
    assert_eq!(bob_roles.into_iter().collect::<Vec<_>>(), vec!["viewer".to_string()]);
    assert_eq!(f.engine.get_role("editor").await.unwrap(), None);

    assert!(matches!(
        f.engine.delete_role(editor.id).await,
        Err(RustyGateError::RoleNotFound(_))
    ));
}

#[tokio::test]
async fn test_ensure_standard_roles() {
    let f = fixture();

    let created = f.engine.ensure_roles(STANDARD_ROLES).await.unwrap();
    assert_eq!(created.len(), STANDARD_ROLES.len());

    let again = f.engine.ensure_roles(STANDARD_ROLES).await.unwrap();
    assert!(again.is_empty());

    let names: Vec<String> = f
        .engine
        .list_roles()
        .await
        .unwrap()
        .into_iter()
        .map(|role| role.name)
        .collect();
    assert_eq!(
        names,
        vec!["admin", "moderator", "premium", "superadmin", "user", "verified"]
    );
}

#[tokio::test]
async fn test_role_names_reflect_current_state() {
    let f = fixture();
    let alice = create_user(&f, "alice").await;
    f.engine.ensure_roles(STANDARD_ROLES).await.unwrap();

    let premium = f.engine.get_role("premium").await.unwrap().unwrap();
    let verified = f.engine.get_role("verified").await.unwrap().unwrap();
    f.engine.assign_role_to_user(alice.id, premium.id).await.unwrap();

    let held = f.engine.get_user_role_names(alice.id).await.unwrap();
    assert!(rusty_gate::auth::has_any(&held, &["admin", "premium"]));
    assert!(!rusty_gate::auth::has_all(&held, &["premium", "verified"]));

    f.engine.assign_role_to_user(alice.id, verified.id).await.unwrap();
    let held = f.engine.get_user_role_names(alice.id).await.unwrap();
    assert!(rusty_gate::auth::has_all(&held, &["premium", "verified"]));
    assert!(!rusty_gate::auth::is_admin(&held));
}

/// Lists a user's roles unsorted and with repeats, as a backend without
/// ordering or a uniqueness constraint might
struct UnorderedAssignments {
    inner: MemoryStore,
}

#[async_trait]
impl RoleStore for UnorderedAssignments {
    async fn get_by_name(&self, name: &str) -> rusty_gate::Result<Option<Role>> {
        self.inner.get_by_name(name).await
    }

    async fn get_by_id(&self, role_id: RoleId) -> rusty_gate::Result<Option<Role>> {
        RoleStore::get_by_id(&self.inner, role_id).await
    }

    async fn create(&self, role: Role) -> rusty_gate::Result<Role> {
        RoleStore::create(&self.inner, role).await
    }

    async fn delete(&self, role_id: RoleId) -> rusty_gate::Result<bool> {
        self.inner.delete(role_id).await
    }

    async fn list_all(&self) -> rusty_gate::Result<Vec<Role>> {
        self.inner.list_all().await
    }

    async fn list_user_roles(&self, user_id: UserId) -> rusty_gate::Result<Vec<Role>> {
        let mut roles = self.inner.list_user_roles(user_id).await?;
        roles.reverse();
        let repeated = roles.clone();
        roles.extend(repeated);
        Ok(roles)
    }

    async fn add_assignment(&self, user_id: UserId, role_id: RoleId) -> rusty_gate::Result<bool> {
        self.inner.add_assignment(user_id, role_id).await
    }

    async fn remove_assignment(&self, user_id: UserId, role_id: RoleId) -> rusty_gate::Result<bool> {
        self.inner.remove_assignment(user_id, role_id).await
    }
}

#[tokio::test]
async fn test_user_roles_unique_and_sorted_whatever_the_backend_order() {
    let store = MemoryStore::new();
    let users: Arc<dyn UserStore> = Arc::new(store.clone());
    let roles: Arc<dyn RoleStore> = Arc::new(UnorderedAssignments { inner: store });
    let engine = RoleEngine::new(roles, users.clone());

    let alice = users
        .create(User::new(
            "alice".to_string(),
            "alice@example.com".to_string(),
            "$argon2id$placeholder".to_string(),
        ))
        .await
        .unwrap();
    for name in ["verified", "admin", "premium"] {
        let role = engine.create_role(name, "").await.unwrap();
        engine.assign_role_to_user(alice.id, role.id).await.unwrap();
    }

    let names: Vec<String> = engine
        .get_user_roles(alice.id)
        .await
        .unwrap()
        .into_iter()
        .map(|role| role.name)
        .collect();
    assert_eq!(names, vec!["admin", "premium", "verified"]);
}

#[tokio::test]
async fn test_role_names_are_trimmed_on_lookup_and_seeding() {
    let f = fixture();

    let created = f.engine.ensure_roles(&[("  editor ", "Can edit")]).await.unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].name, "editor");

    let again = f.engine.ensure_roles(&[("editor", "Can edit"), (" editor", "Can edit")]).await.unwrap();
    assert!(again.is_empty());

    assert!(f.engine.get_role(" editor ").await.unwrap().is_some());
    assert_eq!(f.engine.list_roles().await.unwrap().len(), 1);
}
