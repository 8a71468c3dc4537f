mod common;

use anyhow::Result;
use campus_api::context;
use campus_api::database::StoreError;
use campus_api::filter::Filter;
use campus_api::observer::ObserverError;
use campus_api::scope::UnscopedPolicy;
use common::{campus, doc, tenant};
use serde_json::json;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_writers_land_in_their_own_collections() -> Result<()> {
    let campus = campus();
    let tenants = ["north", "south", "east", "west"];

    let mut handles = Vec::new();
    for slug in tenants {
        for n in 0..5 {
            let students = campus.models.students.clone();
            handles.push(tokio::spawn(context::establish(tenant(slug), async move {
                tokio::task::yield_now().await;
                students.create(doc(json!({"name": format!("{}-{}", slug, n), "home": slug}))).await
            })));
        }
    }
    for handle in handles {
        handle.await??;
    }

    for slug in tenants {
        let stored = campus.store.raw(&format!("students_{}", slug)).await;
        assert_eq!(stored.len(), 5, "tenant {}", slug);
        assert!(stored.iter().all(|d| d["home"] == json!(slug)));
    }
    assert!(campus.store.raw("students").await.is_empty());
    Ok(())
}

#[tokio::test]
async fn collection_scoped_reads_are_isolated() -> Result<()> {
    let campus = campus();
    let branches = &campus.models.branches;

    context::establish(tenant("acme"), branches.create(doc(json!({"_id": "b1", "name": "Acme North"})))).await?;
    context::establish(tenant("globex"), branches.create(doc(json!({"_id": "b1", "name": "Globex HQ"})))).await?;
    branches.create(doc(json!({"_id": "b1", "name": "Unassigned"}))).await?;

    let acme = context::establish(tenant("acme"), branches.find_by_id("b1")).await?;
    let globex = context::establish(tenant("globex"), branches.find_by_id("b1")).await?;
    let default = branches.find_by_id("b1").await?;

    assert_eq!(acme.map(|d| d["name"].clone()), Some(json!("Acme North")));
    assert_eq!(globex.map(|d| d["name"].clone()), Some(json!("Globex HQ")));
    assert_eq!(default.map(|d| d["name"].clone()), Some(json!("Unassigned")));
    Ok(())
}

#[tokio::test]
async fn field_scoped_model_stamps_and_filters_on_customer() -> Result<()> {
    let campus = campus();
    let users = &campus.models.users;

    let created = context::establish(
        tenant("acme"),
        // A client-supplied customer value is overwritten
        users.create(doc(json!({"_id": "u1", "email": "a@acme.test", "customer": "globex"}))),
    )
    .await?;
    assert_eq!(created["customer"], json!("acme"));
    context::establish(tenant("globex"), users.create(doc(json!({"_id": "u2", "email": "b@globex.test"})))).await?;

    // An $or naming the other customer cannot widen the tenant constraint
    let escape = Filter::new().where_value(&json!({"$or": [{"customer": "acme"}, {"email": {"$ne": null}}]}))?;
    let seen = context::establish(tenant("globex"), users.find(escape)).await?;
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0]["_id"], json!("u2"));

    // Patches cannot move a document to another customer
    context::establish(tenant("globex"), async {
        users.update_by_id("u2", doc(json!({"customer": "acme", "email": "c@globex.test"}))).await
    })
    .await?;
    let stored = campus.store.raw("users").await;
    let u2 = stored.iter().find(|d| d["_id"] == json!("u2")).cloned().unwrap_or_default();
    assert_eq!(u2["customer"], json!("globex"));
    assert_eq!(u2["email"], json!("c@globex.test"));

    // Cross-tenant writes by id do not match
    let missing = context::establish(tenant("globex"), users.delete_by_id("u1")).await?;
    assert!(missing.is_none());
    Ok(())
}

#[tokio::test]
async fn shared_collection_ids_do_not_collide_across_customers() -> Result<()> {
    let campus = campus();
    let users = &campus.models.users;

    context::establish(tenant("globex"), users.create(doc(json!({"_id": "secret-id", "email": "g@globex.test"})))).await?;

    // Acme can neither detect nor block the id globex already uses
    let created =
        context::establish(tenant("acme"), users.create(doc(json!({"_id": "secret-id", "email": "a@acme.test"})))).await?;
    assert_eq!(created["customer"], json!("acme"));

    let acme = context::establish(tenant("acme"), users.find_by_id("secret-id")).await?;
    let globex = context::establish(tenant("globex"), users.find_by_id("secret-id")).await?;
    assert_eq!(acme.map(|d| d["email"].clone()), Some(json!("a@acme.test")));
    assert_eq!(globex.map(|d| d["email"].clone()), Some(json!("g@globex.test")));

    // Deleting in one customer leaves the other's document alone
    context::establish(tenant("acme"), users.delete_by_id("secret-id")).await?;
    assert_eq!(campus.store.raw("users").await.len(), 1);

    // Within one customer the id is still unique
    let err = context::establish(tenant("globex"), users.create(doc(json!({"_id": "secret-id"})))).await.err();
    assert!(matches!(err, Some(ObserverError::Store(StoreError::Duplicate { .. }))));
    Ok(())
}

#[tokio::test]
async fn overlong_slugs_fail_before_reaching_the_store() -> Result<()> {
    let campus = campus();
    let slug = "a".repeat(60);

    // students_<slug> would exceed the 63-byte collection name limit
    let err = context::establish(tenant(&slug), campus.models.students.create(doc(json!({"name": "x"})))).await.err();
    assert!(matches!(err, Some(ObserverError::ValidationError(_))));
    let err = context::establish(tenant(&slug), campus.models.students.count(Filter::new())).await.err();
    assert!(matches!(err, Some(ObserverError::ValidationError(_))));
    assert!(campus.store.collection_names().await.is_empty());

    // Field-scoped models keep one collection, so the slug length does not matter
    let user = context::establish(tenant(&slug), campus.models.users.create(doc(json!({"email": "x@y.test"})))).await?;
    assert_eq!(user["customer"], json!(slug));
    Ok(())
}

#[tokio::test]
async fn reject_if_unscoped_fails_without_a_tenant() -> Result<()> {
    let campus = campus();
    let users = &campus.models.users;

    let err = users.find(Filter::new()).await.err();
    assert!(matches!(err, Some(ObserverError::SecurityError(_))));

    // Explicitly bound "no tenant" is still no tenant
    let err = context::establish(None, users.create(doc(json!({"email": "x@y.test"})))).await.err();
    assert!(matches!(err, Some(ObserverError::SecurityError(_))));
    assert!(campus.store.raw("users").await.is_empty());

    // A call site may opt into the default scope explicitly
    let admin = users.with_unscoped(UnscopedPolicy::DefaultAllowed);
    let created = admin.create(doc(json!({"email": "root@campus.test", "customer": "acme"}))).await?;
    assert!(created.get("customer").is_none());
    assert_eq!(admin.count(Filter::new()).await?, 1);
    Ok(())
}

#[tokio::test]
async fn global_models_ignore_the_tenant() -> Result<()> {
    let campus = campus();
    let customers = &campus.models.customers;

    context::establish(tenant("acme"), customers.create(doc(json!({"_id": "acme", "slug": "acme"})))).await?;
    let from_globex = context::establish(tenant("globex"), customers.count(Filter::new())).await?;
    let unbound = customers.count(Filter::new()).await?;

    assert_eq!(from_globex, 1);
    assert_eq!(unbound, 1);
    assert_eq!(campus.store.collection_names().await, vec!["customers".to_string()]);
    Ok(())
}
