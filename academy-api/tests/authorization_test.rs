//! Role and tenant checks in the domain handlers
//!
//! Every request here is refused (or accepted) before the handler reaches
//! PostgreSQL, so the in-memory store from `common` is enough. Academy 1
//! and academy 2 are two separate tenants.

mod common;

use academy_shared::models::account::Role;
use axum::http::StatusCode;
use common::TestContext;
use serde_json::json;

#[tokio::test]
async fn test_coach_cannot_edit_another_coach() {
    let ctx = TestContext::new();
    let (_, coach) = ctx.seed_account("coach@one.id", Role::Coach, Some(1)).await;
    let (peer_id, _) = ctx.seed_account("peer@one.id", Role::Coach, Some(1)).await;

    let (status, body) = ctx
        .send(
            "PUT",
            "/api/user/update",
            Some(&coach),
            Some(json!({"id": peer_id, "password": "taken-over"})),
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_coach_cannot_edit_admin_in_same_vendor() {
    let ctx = TestContext::new();
    let (admin_id, _) = ctx.seed_account("root@one.id", Role::Admin, Some(1)).await;
    let (_, coach) = ctx.seed_account("coach@one.id", Role::Coach, Some(1)).await;

    let (status, _) = ctx
        .send(
            "PUT",
            "/api/user/update",
            Some(&coach),
            Some(json!({"id": admin_id, "password": "taken-over", "email": "coach2@one.id"})),
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_coach_cannot_edit_member_of_other_vendor() {
    let ctx = TestContext::new();
    let (_, coach) = ctx.seed_account("coach@one.id", Role::Coach, Some(1)).await;
    let (member_id, _) = ctx.seed_account("player@two.id", Role::Member, Some(2)).await;

    let (status, _) = ctx
        .send(
            "PUT",
            "/api/user/update",
            Some(&coach),
            Some(json!({"id": member_id, "name": "Renamed"})),
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_member_cannot_edit_teammate() {
    let ctx = TestContext::new();
    let (_, member) = ctx.seed_account("a@one.id", Role::Member, Some(1)).await;
    let (teammate_id, _) = ctx.seed_account("b@one.id", Role::Member, Some(1)).await;

    let (status, _) = ctx
        .send(
            "PUT",
            "/api/user/update",
            Some(&member),
            Some(json!({"id": teammate_id, "password": "x"})),
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_member_cannot_promote_self() {
    let ctx = TestContext::new();
    let (member_id, member) = ctx.seed_account("a@one.id", Role::Member, Some(1)).await;

    let (status, _) = ctx
        .send(
            "PUT",
            "/api/user/update",
            Some(&member),
            Some(json!({"id": member_id, "role": "coach"})),
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_coach_cannot_attach_self_to_vendor() {
    let ctx = TestContext::new();
    let (coach_id, coach) = ctx.seed_account("free@agent.id", Role::Coach, None).await;

    let (status, _) = ctx
        .send(
            "PUT",
            "/api/user/update",
            Some(&coach),
            Some(json!({"id": coach_id, "vendor_id": 1})),
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_update_unknown_account_is_not_found() {
    let ctx = TestContext::new();
    let (_, admin) = ctx.seed_account("root@one.id", Role::Admin, None).await;

    let (status, _) = ctx
        .send(
            "PUT",
            "/api/user/update",
            Some(&admin),
            Some(json!({"id": 999, "name": "Nobody"})),
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_vendor_roster_is_tenant_scoped() {
    let ctx = TestContext::new();
    let (_, coach) = ctx.seed_account("coach@one.id", Role::Coach, Some(1)).await;
    let (_, member) = ctx.seed_account("player@one.id", Role::Member, Some(1)).await;

    for token in [&coach, &member] {
        let (status, _) = ctx
            .send("GET", "/api/users/vendor?vendor_id=2", Some(token), None)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    let (status, _) = ctx.send("GET", "/api/users/vendor", Some(&coach), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_vendor_payments_need_payment_managers() {
    let ctx = TestContext::new();
    let (_, coach) = ctx.seed_account("coach@one.id", Role::Coach, Some(1)).await;
    let (_, member) = ctx.seed_account("player@one.id", Role::Member, Some(1)).await;

    let (status, _) = ctx
        .send("GET", "/api/payments/vendor?vendor_id=1", Some(&member), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx
        .send("GET", "/api/payments/vendor?vendor_id=2", Some(&coach), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_member_cannot_pay_for_someone_else() {
    let ctx = TestContext::new();
    let (_, member) = ctx.seed_account("a@one.id", Role::Member, Some(1)).await;
    let (teammate_id, _) = ctx.seed_account("b@one.id", Role::Member, Some(1)).await;
    let teammate = teammate_id.to_string();

    let (status, body) = ctx
        .send_form(
            "POST",
            "/api/payment/create",
            &member,
            &[("vendor_id", "1"), ("user_id", teammate.as_str()), ("amount", "50000")],
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_payment_outside_own_vendor_forbidden() {
    let ctx = TestContext::new();
    let (_, member) = ctx.seed_account("a@one.id", Role::Member, Some(1)).await;
    let (_, coach) = ctx.seed_account("coach@one.id", Role::Coach, Some(1)).await;
    let (other_id, _) = ctx.seed_account("b@two.id", Role::Member, Some(2)).await;
    let other = other_id.to_string();

    let (status, _) = ctx
        .send_form(
            "POST",
            "/api/payment/create",
            &member,
            &[("vendor_id", "2"), ("amount", "50000")],
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx
        .send_form(
            "POST",
            "/api/payment/create",
            &coach,
            &[("vendor_id", "2"), ("user_id", other.as_str()), ("amount", "50000")],
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_bulk_payment_needs_coach_of_vendor() {
    let ctx = TestContext::new();
    let (_, member) = ctx.seed_account("a@one.id", Role::Member, Some(1)).await;
    let (_, coach) = ctx.seed_account("coach@two.id", Role::Coach, Some(2)).await;

    for token in [&member, &coach] {
        let (status, _) = ctx
            .send(
                "POST",
                "/api/payment/bulk",
                Some(token),
                Some(json!({"vendor_id": 1, "event_id": 1})),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}

#[tokio::test]
async fn test_schedule_changes_need_coach_of_vendor() {
    let ctx = TestContext::new();
    let (_, member) = ctx.seed_account("a@one.id", Role::Member, Some(1)).await;
    let (_, coach) = ctx.seed_account("coach@two.id", Role::Coach, Some(2)).await;

    let challenge = json!({
        "vendor_id": 1,
        "title": "Juggling",
        "category": "technique",
        "max_point": 100
    });

    for token in [&member, &coach] {
        let (status, _) = ctx
            .send("POST", "/api/challenge/create", Some(token), Some(challenge.clone()))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}

#[tokio::test]
async fn test_vendor_admin_actions() {
    let ctx = TestContext::new();
    let (_, coach) = ctx.seed_account("coach@one.id", Role::Coach, Some(1)).await;

    let bank = json!({
        "vendor_id": 2,
        "bank_name": "BCA",
        "bank_account": "1234567890",
        "bank_holder": "Garuda FC"
    });
    let (status, _) = ctx
        .send("PUT", "/api/vendor/bank", Some(&coach), Some(bank))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx.send("DELETE", "/api/vendor/1", Some(&coach), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
