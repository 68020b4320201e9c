use advisorhub::auth::Role;
use axum::http::StatusCode;
use serde_json::json;
use temp_dir::TempDir;

mod helpers;

#[tokio::test]
async fn test_health_and_ready() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let app = helpers::setup_test_app(dir.child("db.sqlite3")).await?;

    let (status, body) = app.send("GET", "/health", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = app.send("GET", "/ready", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");

    Ok(())
}

#[tokio::test]
async fn test_member_routes_require_bearer_token() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let app = helpers::setup_test_app(dir.child("db.sqlite3")).await?;

    let (status, body) = app.send("POST", "/api/points/daily-login", None, None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["errorKind"], "Unauthorized");

    let (status, _) = app
        .send("GET", "/api/points/summary", Some("not-a-jwt"), None)
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn test_daily_login_and_summary() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let app = helpers::setup_test_app(dir.child("db.sqlite3")).await?;
    let token = app.token("member-1", Role::Member);

    let (status, body) = app
        .send("POST", "/api/points/daily-login", Some(&token), None)
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["errorKind"], "NotFound");

    let (status, body) = app
        .send(
            "POST",
            "/api/points/enroll",
            Some(&token),
            Some(json!({ "timezone": "Europe/Paris" })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], "member-1");
    assert_eq!(body["data"]["primaryTierId"], "basic");

    let (status, body) = app
        .send("POST", "/api/points/daily-login", Some(&token), None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["decision"]["granted"], true);
    assert_eq!(body["data"]["entry"]["amount"], 10);
    assert_eq!(body["data"]["entry"]["createdBy"], "member-1");

    let (status, body) = app
        .send("POST", "/api/points/daily-login", Some(&token), None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["decision"]["granted"], false);
    assert_eq!(body["data"]["decision"]["reason"], "DAILY_MAX");
    assert!(body["data"]["entry"].is_null());

    let (status, body) = app
        .send("GET", "/api/points/summary", Some(&token), None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["currentBalance"], 10);
    assert_eq!(body["data"]["lifetimeEarned"], 10);
    assert_eq!(body["data"]["tier"]["id"], "basic");
    assert_eq!(body["data"]["recentEntries"].as_array().map(Vec::len), Some(1));

    Ok(())
}

#[tokio::test]
async fn test_redeem_rejection_and_success() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let app = helpers::setup_test_app(dir.child("db.sqlite3")).await?;
    let member = app.token("member-1", Role::Member);
    let admin = app.token("admin-1", Role::Admin);

    app.send("POST", "/api/points/enroll", Some(&member), Some(json!({})))
        .await?;

    let (status, body) = app
        .send(
            "POST",
            "/api/points/redeem",
            Some(&member),
            Some(json!({ "itemId": "report" })),
        )
        .await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);
    assert_eq!(body["errorKind"], "InsufficientPoints");
    assert_eq!(body["data"]["error"], "InsufficientPoints");

    let (status, _) = app
        .send(
            "POST",
            "/api/admin/points/adjust",
            Some(&admin),
            Some(json!({
                "memberId": "member-1",
                "direction": "credit",
                "amount": 40,
                "reason": "welcome bonus"
            })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .send(
            "POST",
            "/api/points/redeem",
            Some(&member),
            Some(json!({ "itemId": "report" })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["success"], true);
    assert_eq!(body["data"]["entry"]["amount"], -30);
    assert_eq!(body["data"]["entry"]["balanceAfter"], 10);
    assert!(body["data"]["orderId"].is_string());

    let (status, body) = app
        .send(
            "POST",
            "/api/points/redeem",
            Some(&member),
            Some(json!({ "itemId": "missing" })),
        )
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["data"]["error"], "ItemUnavailable");

    Ok(())
}

#[tokio::test]
async fn test_admin_routes_require_admin_role() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let app = helpers::setup_test_app(dir.child("db.sqlite3")).await?;
    let member = app.token("member-1", Role::Member);

    let (status, body) = app
        .send(
            "POST",
            "/api/admin/points/adjust",
            Some(&member),
            Some(json!({
                "memberId": "member-1",
                "direction": "credit",
                "amount": 1000,
                "reason": "self service"
            })),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["errorKind"], "Forbidden");

    let (status, _) = app.send("GET", "/api/admin/audit", Some(&member), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    Ok(())
}

#[tokio::test]
async fn test_adjust_errors_and_audit_listing() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let app = helpers::setup_test_app(dir.child("db.sqlite3")).await?;
    let member = app.token("member-1", Role::Member);
    let admin = app.token("admin-1", Role::Admin);

    app.send("POST", "/api/points/enroll", Some(&member), Some(json!({})))
        .await?;

    let (status, body) = app
        .send(
            "POST",
            "/api/admin/points/adjust",
            Some(&admin),
            Some(json!({
                "memberId": "member-1",
                "direction": "credit",
                "amount": 50,
                "reason": "  "
            })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorKind"], "ValidationError");

    let (status, body) = app
        .send(
            "POST",
            "/api/admin/points/adjust",
            Some(&admin),
            Some(json!({
                "memberId": "member-1",
                "direction": "debit",
                "amount": 5,
                "reason": "duplicate credit"
            })),
        )
        .await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errorKind"], "InsufficientPoints");

    let (status, body) = app
        .send(
            "POST",
            "/api/admin/points/adjust",
            Some(&admin),
            Some(json!({ "memberId": "member-1" })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, _) = app
        .send(
            "POST",
            "/api/admin/points/adjust",
            Some(&admin),
            Some(json!({
                "memberId": "member-1",
                "direction": "credit",
                "amount": 25,
                "reason": "event attendance"
            })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .send(
            "GET",
            "/api/admin/audit?action=POINTS_MANUAL_ADJUST&targetId=member-1",
            Some(&admin),
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    let records = body["data"].as_array().cloned().unwrap_or_default();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["operatorId"], "admin-1");
    assert_eq!(records[0]["description"], "event attendance");
    assert_eq!(records[0]["changes"]["before"]["points"], 0);
    assert_eq!(records[0]["changes"]["after"]["points"], 25);

    let (status, body) = app
        .send("GET", "/api/admin/members/member-1/entries", Some(&admin), None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));

    Ok(())
}

#[tokio::test]
async fn test_sweep_route() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let app = helpers::setup_test_app(dir.child("db.sqlite3")).await?;
    let member = app.token("member-1", Role::Member);
    let admin = app.token("admin-1", Role::Admin);

    app.send("POST", "/api/points/enroll", Some(&member), Some(json!({})))
        .await?;
    app.send("POST", "/api/points/daily-login", Some(&member), None)
        .await?;

    let (status, body) = app
        .send("POST", "/api/admin/points/sweep", Some(&admin), Some(json!({})))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["count"], 0);

    // Two years out, past the default twelve month expiry.
    let as_of = time::OffsetDateTime::now_utc().unix_timestamp() + 2 * 365 * 24 * 60 * 60;
    let (status, body) = app
        .send(
            "POST",
            "/api/admin/points/sweep",
            Some(&admin),
            Some(json!({ "asOf": as_of })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["count"], 1);
    assert_eq!(body["data"]["pointsExpired"], 10);

    let summary = app.command.get_user_points_summary("member-1").await?;
    assert_eq!(summary.current_balance, 0);
    assert_eq!(summary.lifetime_expired, 10);

    Ok(())
}
