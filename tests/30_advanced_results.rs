mod common;

use anyhow::Result;
use campus_api::config::QueryConfig;
use campus_api::context;
use campus_api::query::ListQuerySpec;
use common::{campus, doc, tenant};
use serde_json::json;

fn config() -> QueryConfig {
    QueryConfig::default()
}

#[tokio::test]
async fn pages_through_twenty_three_results() -> Result<()> {
    let campus = campus();
    let students = &campus.models.students;

    context::establish(tenant("acme"), async {
        let documents = (0..23).map(|n| doc(json!({"name": format!("s{:02}", n), "seq": n}))).collect();
        students.create_many(documents).await?;

        let first = students.advanced_results_with(&ListQuerySpec::new().limit(10).sort("seq"), &config()).await?;
        assert_eq!(first.results.len(), 10);
        assert_eq!(first.results[0]["seq"], json!(0));
        assert_eq!((first.page, first.limit, first.total_pages, first.total_results), (1, 10, 3, 23));

        let last = students
            .advanced_results_with(&ListQuerySpec::new().page(3).limit(10).sort("seq"), &config())
            .await?;
        assert_eq!(last.results.len(), 3);
        assert_eq!(last.results[2]["seq"], json!(22));
        assert_eq!(last.total_pages, 3);
        anyhow::Ok(())
    })
    .await?;

    // Another tenant sees none of them
    let other = context::establish(tenant("globex"), students.advanced_results_with(&ListQuerySpec::new(), &config())).await?;
    assert!(other.results.is_empty());
    assert_eq!((other.total_pages, other.total_results), (0, 0));
    Ok(())
}

#[tokio::test]
async fn envelope_serializes_camel_case() -> Result<()> {
    let campus = campus();
    let envelope = context::establish(
        tenant("acme"),
        campus.models.classes.advanced_results_with(&ListQuerySpec::new(), &config()),
    )
    .await?;
    let value = serde_json::to_value(&envelope)?;
    assert_eq!(value, json!({"results": [], "page": 1, "limit": 25, "totalPages": 0, "totalResults": 0}));
    Ok(())
}

#[tokio::test]
async fn filters_flags_and_overrides_combine() -> Result<()> {
    let campus = campus();
    let teachers = &campus.models.teachers;

    context::establish(tenant("acme"), async {
        teachers
            .create_many(vec![
                doc(json!({"name": "Ann", "branch": "b1", "is_active": true, "years": 3})),
                doc(json!({"name": "Bob", "branch": "b1", "is_active": false, "years": 9})),
                doc(json!({"name": "Cy", "branch": "b2", "is_active": true, "years": 12, "archived": true})),
                doc(json!({"name": "Di", "branch": "b2", "is_active": true, "years": 7})),
            ])
            .await?;

        let spec = ListQuerySpec {
            is_active: Some("true".into()),
            archived: Some("false".into()),
            ..ListQuerySpec::new().query(r#"{"years": {"gte": 5}}"#).sort("name").select("name")
        };
        let found = teachers.advanced_results_with(&spec, &config()).await?;
        let names: Vec<_> = found.results.iter().map(|d| d["name"].clone()).collect();
        assert_eq!(names, vec![json!("Di")]);
        assert!(found.results[0].get("years").is_none());

        // The server-side branch wins over the client's
        let spec = ListQuerySpec { branch: Some("b2".into()), ..ListQuerySpec::new().sort("name") }
            .with_override("branch", "b1");
        let found = teachers.advanced_results_with(&spec, &config()).await?;
        assert_eq!(found.total_results, 2);
        assert!(found.results.iter().all(|d| d["branch"] == json!("b1")));
        anyhow::Ok(())
    })
    .await
}

#[tokio::test]
async fn populate_resolves_within_the_callers_tenant() -> Result<()> {
    let campus = campus();
    let models = &campus.models;

    context::establish(tenant("acme"), async {
        models.branches.create(doc(json!({"_id": "b1", "name": "North"}))).await?;
        models.teachers.create(doc(json!({"_id": "t1", "name": "Ms. Frizzle", "branch": "b1"}))).await?;
        models.students.create_many(vec![doc(json!({"_id": "s1", "name": "Arnold"})), doc(json!({"_id": "s2", "name": "Wanda"}))]).await?;
        models.classes.create(doc(json!({"_id": "c1", "name": "Science", "teacher": "t1", "students": ["s1", "s2", "gone"]}))).await?;
        anyhow::Ok(())
    })
    .await?;
    // Same reference ids, but nothing to resolve them against
    context::establish(tenant("globex"), models.classes.create(doc(json!({"_id": "c1", "teacher": "t1"})))).await?;

    let acme = context::establish(
        tenant("acme"),
        models.classes.advanced_results_with(&ListQuerySpec::new().populate("teacher.branch,students"), &config()),
    )
    .await?;
    let class = &acme.results[0];
    assert_eq!(class["teacher"]["name"], json!("Ms. Frizzle"));
    assert_eq!(class["teacher"]["branch"]["name"], json!("North"));
    let students: Vec<_> = class["students"].as_array().cloned().unwrap_or_default();
    assert_eq!(students.len(), 2);
    assert_eq!(students[0]["name"], json!("Arnold"));

    let globex = context::establish(
        tenant("globex"),
        models.classes.advanced_results_with(&ListQuerySpec::new().populate("teacher"), &config()),
    )
    .await?;
    assert!(globex.results[0]["teacher"].is_null());
    Ok(())
}

#[tokio::test]
async fn unsupported_operators_are_rejected() -> Result<()> {
    let campus = campus();
    let result = context::establish(
        tenant("acme"),
        campus.models.students.advanced_results_with(&ListQuerySpec::new().query(r#"{"name": {"$regex": "^A"}}"#), &config()),
    )
    .await;
    assert!(result.is_err());
    Ok(())
}
