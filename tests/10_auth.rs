mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

use common::{TestServer, ADMIN, PASSWORD};

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let server = TestServer::spawn().await?;

    let res = server.client.get(server.url("/health")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let _body = res.json::<serde_json::Value>().await?;
    Ok(())
}

#[tokio::test]
async fn first_registration_bootstraps_admin_then_closes() -> Result<()> {
    let server = TestServer::spawn().await?;
    let token = server.bootstrap_admin().await?;

    let (status, me) = server.get_json("/me", &token).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["data"]["username"], ADMIN);
    assert_eq!(me["data"]["role"], "admin");

    let res = server
        .client
        .post(server.url("/register"))
        .json(&json!({ "username": "intruder", "password": PASSWORD }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn login_returns_bearer_token() -> Result<()> {
    let server = TestServer::spawn().await?;
    server.bootstrap_admin().await?;

    let res = server
        .client
        .post(server.url("/token"))
        .form(&[("username", ADMIN), ("password", PASSWORD)])
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await?;
    assert_eq!(body["token_type"], "bearer");
    assert_eq!(body["role"], "admin");

    let res = server
        .client
        .post(server.url("/token"))
        .form(&[("username", ADMIN), ("password", "wrong-password")])
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn protected_routes_require_token() -> Result<()> {
    let server = TestServer::spawn().await?;

    let res = server.client.get(server.url("/dashboard")).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = server
        .client
        .get(server.url("/dashboard"))
        .bearer_auth("not-a-jwt")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn credentials_follow_role_table() -> Result<()> {
    let server = TestServer::spawn().await?;
    let admin = server.bootstrap_admin().await?;
    let normal = server.user_with_role(&admin, "maria", "normal").await?;
    let outsourced = server.user_with_role(&admin, "joao", "tercerizado").await?;

    let (status, _) = server.get_json("/credenciais", &normal).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = server.get_json("/credenciais", &outsourced).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().is_some());

    let credential = json!({
        "serviceName": "Firewall",
        "accessUrl": "https://fw.local",
        "username": "ops",
        "password": "hunter22"
    });
    let res = server
        .client
        .post(server.url("/credenciais"))
        .bearer_auth(&outsourced)
        .json(&credential)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = server
        .client
        .post(server.url("/credenciais"))
        .bearer_auth(&admin)
        .json(&credential)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);

    let (_, body) = server.get_json("/credenciais", &outsourced).await?;
    assert_eq!(body["data"][0]["serviceName"], "Firewall");
    Ok(())
}

#[tokio::test]
async fn admin_manages_users() -> Result<()> {
    let server = TestServer::spawn().await?;
    let admin = server.bootstrap_admin().await?;
    let normal = server.user_with_role(&admin, "maria", "normal").await?;

    let (status, _) = server.get_json("/users", &normal).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = server.get_json("/users", &admin).await?;
    assert_eq!(status, StatusCode::OK);
    let users = body["data"].as_array().cloned().unwrap_or_default();
    assert_eq!(users.len(), 2);
    assert!(users.iter().all(|u| u.get("passwordHash").is_none()));

    let id = users
        .iter()
        .find(|u| u["username"] == "maria")
        .and_then(|u| u["id"].as_i64())
        .expect("maria listed");

    let res = server
        .client
        .put(server.url(&format!("/users/{}/role", id)))
        .bearer_auth(&admin)
        .json(&json!({ "role": "superuser" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = server
        .client
        .put(server.url(&format!("/users/{}/role", id)))
        .bearer_auth(&admin)
        .json(&json!({ "role": "tercerizado" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = server
        .client
        .delete(server.url(&format!("/users/{}", id)))
        .bearer_auth(&admin)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let (status, _) = server.get_json("/me", &normal).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}
