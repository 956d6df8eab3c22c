//! Integration tests for the default-address invariant.
//!
//! These tests require:
//! - A running `PostgreSQL` database (`VITRINA_TEST_DATABASE_URL`)
//!
//! Run with: cargo test -p vitrina-integration-tests -- --ignored

use vitrina_core::{AddressId, UserId};
use vitrina_storefront::db::{AddressRepository, RepositoryError};
use vitrina_storefront::models::{Address, AddressPatch};
use vitrina_integration_tests::{address_fields, create_user, test_pool};

fn defaults(addresses: &[Address]) -> Vec<AddressId> {
    addresses
        .iter()
        .filter(|a| a.is_default)
        .map(|a| a.id)
        .collect()
}

// ============================================================================
// Create
// ============================================================================

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_first_address_becomes_default() {
    let pool = test_pool().await;
    let (user, _) = create_user(&pool).await;
    let repo = AddressRepository::new(&pool);

    let first = repo
        .create(user.id, &address_fields("ул. Первая", false))
        .await
        .unwrap();
    assert!(first.is_default);

    let second = repo
        .create(user.id, &address_fields("ул. Вторая", false))
        .await
        .unwrap();
    assert!(!second.is_default);

    let list = repo.list(user.id).await.unwrap();
    assert_eq!(defaults(&list), vec![first.id]);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_create_default_clears_previous_default() {
    let pool = test_pool().await;
    let (user, _) = create_user(&pool).await;
    let repo = AddressRepository::new(&pool);

    let a = repo.create(user.id, &address_fields("A", true)).await.unwrap();
    let b = repo.create(user.id, &address_fields("B", true)).await.unwrap();

    let list = repo.list(user.id).await.unwrap();
    assert_eq!(defaults(&list), vec![b.id]);
    assert!(!repo.get(user.id, a.id).await.unwrap().is_default);
    // Default is listed first.
    assert_eq!(list.first().map(|a| a.id), Some(b.id));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_create_for_unknown_user_writes_nothing() {
    let pool = test_pool().await;
    let ghost = UserId::new(i32::MAX);

    let err = AddressRepository::new(&pool)
        .create(ghost, &address_fields("nowhere", true))
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound));
}

// ============================================================================
// Update
// ============================================================================

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_update_moves_default() {
    let pool = test_pool().await;
    let (user, _) = create_user(&pool).await;
    let repo = AddressRepository::new(&pool);

    let a = repo.create(user.id, &address_fields("A", true)).await.unwrap();
    let b = repo.create(user.id, &address_fields("B", false)).await.unwrap();

    let patch = AddressPatch {
        is_default: Some(true),
        ..AddressPatch::default()
    };
    let updated = repo.update(user.id, b.id, &patch).await.unwrap();
    assert!(updated.is_default);

    let list = repo.list(user.id).await.unwrap();
    assert_eq!(defaults(&list), vec![b.id]);
    assert!(!repo.get(user.id, a.id).await.unwrap().is_default);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_unsetting_the_default_is_ignored() {
    let pool = test_pool().await;
    let (user, _) = create_user(&pool).await;
    let repo = AddressRepository::new(&pool);

    let a = repo.create(user.id, &address_fields("A", true)).await.unwrap();
    repo.create(user.id, &address_fields("B", false)).await.unwrap();

    let patch = AddressPatch {
        is_default: Some(false),
        city: Some("Казань".to_string()),
        ..AddressPatch::default()
    };
    let updated = repo.update(user.id, a.id, &patch).await.unwrap();
    assert!(updated.is_default);
    assert_eq!(updated.city, "Казань");

    let list = repo.list(user.id).await.unwrap();
    assert_eq!(defaults(&list), vec![a.id]);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_update_clears_optional_field_with_empty_string() {
    let pool = test_pool().await;
    let (user, _) = create_user(&pool).await;
    let repo = AddressRepository::new(&pool);

    let a = repo.create(user.id, &address_fields("A", true)).await.unwrap();
    assert!(a.postal_code.is_some());

    let patch = AddressPatch {
        postal_code: Some(String::new()),
        ..AddressPatch::default()
    };
    let updated = repo.update(user.id, a.id, &patch).await.unwrap();
    assert_eq!(updated.postal_code, None);
    assert_eq!(updated.street, "A");
}

// ============================================================================
// Delete
// ============================================================================

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_deleting_default_promotes_oldest_remaining() {
    let pool = test_pool().await;
    let (user, _) = create_user(&pool).await;
    let repo = AddressRepository::new(&pool);

    let a = repo.create(user.id, &address_fields("A", true)).await.unwrap();
    let b = repo.create(user.id, &address_fields("B", false)).await.unwrap();
    let c = repo.create(user.id, &address_fields("C", false)).await.unwrap();

    repo.delete(user.id, a.id).await.unwrap();

    let list = repo.list(user.id).await.unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(defaults(&list), vec![b.id]);
    assert!(list.iter().any(|addr| addr.id == c.id && !addr.is_default));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_deleting_non_default_keeps_default() {
    let pool = test_pool().await;
    let (user, _) = create_user(&pool).await;
    let repo = AddressRepository::new(&pool);

    let a = repo.create(user.id, &address_fields("A", true)).await.unwrap();
    let b = repo.create(user.id, &address_fields("B", false)).await.unwrap();

    repo.delete(user.id, b.id).await.unwrap();

    let list = repo.list(user.id).await.unwrap();
    assert_eq!(defaults(&list), vec![a.id]);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_deleting_only_address_leaves_none() {
    let pool = test_pool().await;
    let (user, _) = create_user(&pool).await;
    let repo = AddressRepository::new(&pool);

    let a = repo.create(user.id, &address_fields("A", true)).await.unwrap();
    repo.delete(user.id, a.id).await.unwrap();

    assert!(repo.list(user.id).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_other_users_address_is_not_found() {
    let pool = test_pool().await;
    let (owner, _) = create_user(&pool).await;
    let (intruder, _) = create_user(&pool).await;
    let repo = AddressRepository::new(&pool);

    let a = repo.create(owner.id, &address_fields("A", true)).await.unwrap();

    assert!(matches!(
        repo.get(intruder.id, a.id).await,
        Err(RepositoryError::NotFound)
    ));
    assert!(matches!(
        repo.delete(intruder.id, a.id).await,
        Err(RepositoryError::NotFound)
    ));
    assert!(repo.get(owner.id, a.id).await.unwrap().is_default);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_concurrent_default_creates_leave_one_default() {
    let pool = test_pool().await;
    let (user, _) = create_user(&pool).await;
    let user_id = user.id;

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let pool = pool.clone();
            tokio::spawn(async move {
                AddressRepository::new(&pool)
                    .create(user_id, &address_fields(&format!("ул. {i}"), true))
                    .await
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let list = AddressRepository::new(&pool).list(user.id).await.unwrap();
    assert_eq!(list.len(), 8);
    assert_eq!(defaults(&list).len(), 1);
}
