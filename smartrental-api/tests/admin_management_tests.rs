/// Admin user-management endpoints against a real database
///
/// Skipped when DATABASE_URL is not set. Admin tokens are minted directly,
/// so these tests never depend on which admin the database holds.

mod common;

use axum::http::{Method, StatusCode};
use common::{admin_token, unique_credentials, TestContext, PASSWORD};
use serde_json::{json, Value};
use smartrental_shared::models::user::{Role, User};
use uuid::Uuid;

fn ids(list: &Value) -> Vec<String> {
    list.as_array()
        .unwrap()
        .iter()
        .map(|u| u["id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_list_users_with_role_filter() {
    let Some(ctx) = TestContext::with_database().await else { return };
    let token = admin_token();
    let (owner_id, _, _) = ctx.register_owner().await;
    let (tenant_id, _, _) = ctx.register_tenant().await;

    let (status, body) = ctx.get("/admin/users/", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    let all = ids(&body["users"]);
    assert!(all.contains(&owner_id.to_string()));
    assert!(all.contains(&tenant_id.to_string()));
    assert!(body["users"]
        .as_array()
        .unwrap()
        .iter()
        .all(|u| u["role"] != "admin" && u.get("password_hash").is_none()));

    let (status, body) = ctx.get("/admin/users/?role=owner", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    let owners = ids(&body["users"]);
    assert!(owners.contains(&owner_id.to_string()));
    assert!(!owners.contains(&tenant_id.to_string()));

    let (status, body) = ctx.get("/admin/users/?role=tenant", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    let tenants = ids(&body["users"]);
    assert!(tenants.contains(&tenant_id.to_string()));
    assert!(!tenants.contains(&owner_id.to_string()));
}

#[tokio::test]
async fn test_tenant_endpoints_hide_owners() {
    let Some(ctx) = TestContext::with_database().await else { return };
    let token = admin_token();
    let (owner_id, _, _) = ctx.register_owner().await;
    let (tenant_id, tenant_username, _) = ctx.register_tenant().await;

    let (status, body) = ctx.get("/admin/tenants/", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    let tenants = ids(&body["tenants"]);
    assert!(tenants.contains(&tenant_id.to_string()));
    assert!(!tenants.contains(&owner_id.to_string()));

    let (status, body) = ctx
        .get(&format!("/admin/tenants/{}/", tenant_id), Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tenant"]["username"], tenant_username.as_str());

    let (status, body) = ctx
        .get(&format!("/admin/tenants/{}/", owner_id), Some(&token))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Tenant not found.");

    // The owner is still reachable through the general endpoint
    let (status, body) = ctx
        .get(&format!("/admin/users/{}/", owner_id), Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["role"], "owner");
}

#[tokio::test]
async fn test_partial_update_touches_only_given_fields() {
    let Some(ctx) = TestContext::with_database().await else { return };
    let token = admin_token();
    let (username, email) = unique_credentials();

    let (status, body) = ctx
        .post(
            "/tenant_register/",
            None,
            json!({
                "username": username,
                "email": email,
                "password": PASSWORD,
                "phone": "0123456789",
                "address": "1 Old Street"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = common::user_id(&body);
    let uri = format!("/admin/users/{}/", id);

    let (status, body) = ctx
        .send(Method::PUT, &uri, Some(&token), Some(json!({ "address": "12 Harbour Road" })))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["message"], "User updated successfully.");
    assert_eq!(body["user"]["address"], "12 Harbour Road");
    assert_eq!(body["user"]["phone"], "0123456789");
    assert_eq!(body["user"]["username"], username.as_str());
    assert_eq!(body["user"]["email"], email.as_str());
    assert_eq!(body["user"]["role"], "tenant");
    assert_eq!(body["user"]["is_active"], true);

    let (status, body) = ctx
        .send(Method::PUT, &uri, Some(&token), Some(json!({ "phone": null })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["user"]["phone"].is_null());
    assert_eq!(body["user"]["address"], "12 Harbour Road");

    // Re-saving the user's own username is not a conflict
    let (status, _) = ctx
        .send(Method::PUT, &uri, Some(&token), Some(json!({ "username": username })))
        .await;
    assert_eq!(status, StatusCode::OK);

    // Password is not an editable field and stays valid
    let stored = User::find_by_id(&ctx.db, id).await.unwrap().unwrap();
    assert!(smartrental_shared::auth::password::verify_password(PASSWORD, &stored.password_hash).unwrap());
}

#[tokio::test]
async fn test_update_conflicts_and_bad_input() {
    let Some(ctx) = TestContext::with_database().await else { return };
    let token = admin_token();
    let (id, _, _) = ctx.register_tenant().await;
    let (_, other_username, other_email) = ctx.register_tenant().await;
    let uri = format!("/admin/users/{}/", id);

    let (status, body) = ctx
        .send(Method::PUT, &uri, Some(&token), Some(json!({ "username": other_username })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "duplicate");

    let (status, body) = ctx
        .send(
            Method::PUT,
            &uri,
            Some(&token),
            Some(json!({ "email": other_email.to_uppercase() })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "duplicate");

    let (status, _) = ctx
        .send(Method::PUT, &uri, Some(&token), Some(json!({ "role": "admin" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let stored = User::find_by_id(&ctx.db, id).await.unwrap().unwrap();
    assert_eq!(stored.role, Role::Tenant);
    assert_ne!(stored.username, other_username);
}

#[tokio::test]
async fn test_update_unknown_user_is_not_found() {
    let Some(ctx) = TestContext::with_database().await else { return };

    let (status, body) = ctx
        .send(
            Method::PUT,
            &format!("/admin/users/{}/", Uuid::new_v4()),
            Some(&admin_token()),
            Some(json!({ "address": "Nowhere" })),
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "User not found.");
}

#[tokio::test]
async fn test_delete_user() {
    let Some(ctx) = TestContext::with_database().await else { return };
    let token = admin_token();
    let (id, _, email) = ctx.register_tenant().await;
    let uri = format!("/admin/users/{}/", id);

    let (status, body) = ctx.send(Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User deleted successfully.");

    let (status, _) = ctx.get(&uri, Some(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = ctx.send(Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = ctx
        .post("/login-user/", None, json!({ "email": email, "password": PASSWORD }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_account_is_out_of_reach() {
    let Some(ctx) = TestContext::with_database().await else { return };
    let token = admin_token();

    let admin_id = match sqlx::query_scalar::<_, Uuid>("SELECT id FROM users WHERE role = 'admin'")
        .fetch_optional(&ctx.db)
        .await
        .unwrap()
    {
        Some(id) => id,
        None => {
            let (username, email) = unique_credentials();
            let (status, body) = ctx
                .post(
                    "/register/",
                    None,
                    json!({ "username": username, "email": email, "password": PASSWORD }),
                )
                .await;
            if status != StatusCode::CREATED {
                // Another test registered the admin first
                sqlx::query_scalar("SELECT id FROM users WHERE role = 'admin'")
                    .fetch_one(&ctx.db)
                    .await
                    .unwrap()
            } else {
                common::user_id(&body)
            }
        }
    };
    let uri = format!("/admin/users/{}/", admin_id);

    let (status, _) = ctx.get(&uri, Some(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = ctx
        .send(Method::PUT, &uri, Some(&token), Some(json!({ "is_active": false })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = ctx.send(Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let admin = User::find_by_id(&ctx.db, admin_id).await.unwrap().unwrap();
    assert!(admin.is_active);
    assert_eq!(admin.role, Role::Admin);
}
