//! Gatekeeper behaviour over an axum application, driven with `oneshot`.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, StatusCode};
use axum::response::Response;
use edge_gatekeeper::auth::Role;
use tower::ServiceExt;

mod common;

use common::{app, configured, gatekeeper, request, unconfigured, FakeIdentityService};

async fn body_json(response: Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn location(response: &Response) -> &str {
    response.headers()[header::LOCATION].to_str().unwrap()
}

fn sessions() -> Arc<FakeIdentityService> {
    Arc::new(
        FakeIdentityService::default()
            .with_session("athlete-token", "u-athlete", Role::Athlete)
            .with_session("brand-token", "u-brand", Role::Brand)
            .with_session("director-token", "u-director", Role::Director),
    )
}

#[tokio::test]
async fn test_non_throttled_paths_have_no_rate_limit_headers() {
    let router = app(gatekeeper(&configured(), sessions()));

    for path in ["/", "/pricing", "/athlete/dashboard", "/login-help"] {
        let response = router
            .clone()
            .oneshot(request(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let has_rl = response
            .headers()
            .keys()
            .any(|name| name.as_str().starts_with("x-ratelimit-"));
        assert!(!has_rl, "{path} must not carry rate limit headers");
    }
}

#[tokio::test]
async fn test_sixth_request_in_window_is_rejected() {
    let router = app(gatekeeper(&configured(), sessions()));

    for expected_remaining in ["4", "3", "2", "1", "0"] {
        let response = router
            .clone()
            .oneshot(
                request("/login")
                    .header("x-forwarded-for", "10.0.0.1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-ratelimit-limit"], "5");
        assert_eq!(response.headers()["x-ratelimit-remaining"], expected_remaining);
        assert!(response.headers().contains_key("x-ratelimit-reset"));
    }

    let response = router
        .clone()
        .oneshot(
            request("/login")
                .header("x-forwarded-for", "10.0.0.1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = response.headers()[header::RETRY_AFTER].to_str().unwrap().parse().unwrap();
    assert!(retry_after > 0 && retry_after <= 60);
    assert_eq!(response.headers()["x-ratelimit-remaining"], "0");

    let body = body_json(response).await;
    assert_eq!(body["error"], "Too Many Requests");
    assert_eq!(body["retryAfter"], retry_after);
    assert!(body["message"].as_str().unwrap().contains(&retry_after.to_string()));

    // A different client is unaffected.
    let response = router
        .oneshot(
            request("/login")
                .header("x-forwarded-for", "10.0.0.2")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_counter_resets_after_window() {
    let mut config = configured();
    config.rate_limit.window_ms = 200;
    let router = app(gatekeeper(&config, sessions()));

    for _ in 0..6 {
        router
            .clone()
            .oneshot(request("/forgot-password").body(Body::empty()).unwrap())
            .await
            .unwrap();
    }
    tokio::time::sleep(Duration::from_millis(300)).await;

    let response = router
        .oneshot(request("/forgot-password").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-ratelimit-remaining"], "4");
}

#[tokio::test]
async fn test_client_identified_by_first_forwarded_entry() {
    let gk = gatekeeper(&configured(), sessions());
    let router = app(gk.clone());

    router
        .oneshot(
            request("/signup/brand")
                .header("x-forwarded-for", "1.1.1.1, 2.2.2.2")
                .header("x-real-ip", "3.3.3.3")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let store = gk.limiter().store();
    assert!(store.get("auth:1.1.1.1").is_some());
    assert!(store.get("auth:3.3.3.3").is_none());
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_anonymous_protected_redirects_to_login() {
    let service = sessions();
    let router = app(gatekeeper(&configured(), service.clone()));

    let response = router
        .oneshot(request("/director/dashboard").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/login?redirect=%2Fdirector%2Fdashboard");
    // No cookie, no identity round-trip.
    assert_eq!(service.call_count(), 0);
}

#[tokio::test]
async fn test_invalid_session_redirects_to_login() {
    let router = app(gatekeeper(&configured(), sessions()));
    let response = router
        .oneshot(
            request("/brand/campaigns")
                .header(header::COOKIE, "session=forged")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(location(&response), "/login?redirect=%2Fbrand%2Fcampaigns");
}

#[tokio::test]
async fn test_athlete_in_brand_tree_goes_home() {
    let router = app(gatekeeper(&configured(), sessions()));

    for path in ["/brand", "/brand/dashboard", "/brand/deals/7"] {
        let response = router
            .clone()
            .oneshot(
                request(path)
                    .header(header::COOKIE, "session=athlete-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT, "{path}");
        assert_eq!(location(&response), "/athlete/dashboard");
    }
}

#[tokio::test]
async fn test_matching_role_reaches_application() {
    let router = app(gatekeeper(&configured(), sessions()));
    let response = router
        .oneshot(
            request("/brand/deals")
                .header(header::COOKIE, "session=brand-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"/brand/deals");
}

#[tokio::test]
async fn test_authenticated_user_bounced_from_auth_pages() {
    let router = app(gatekeeper(&configured(), sessions()));

    for (path, token, home) in [
        ("/login", "director-token", "/director/dashboard"),
        ("/signup", "brand-token", "/brand/dashboard"),
        ("/signup/athlete", "athlete-token", "/athlete/dashboard"),
    ] {
        let response = router
            .clone()
            .oneshot(
                request(path)
                    .header(header::COOKIE, format!("session={token}"))
                    .header("x-real-ip", token)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT, "{path}");
        assert_eq!(location(&response), home);
        // Still a throttled endpoint.
        assert_eq!(response.headers()["x-ratelimit-remaining"], "4");
    }
}

#[tokio::test]
async fn test_missing_configuration_fails_open_but_still_throttles() {
    let service = sessions();
    let router = app(gatekeeper(&unconfigured(), service.clone()));

    let response = router
        .clone()
        .oneshot(request("/athlete/dashboard").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::LOCATION).is_none());

    let response = router
        .clone()
        .oneshot(
            request("/login")
                .header(header::COOKIE, "session=athlete-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-ratelimit-limit"], "5");
    assert_eq!(response.headers()["x-ratelimit-remaining"], "4");

    for _ in 0..4 {
        router
            .clone()
            .oneshot(request("/login").body(Body::empty()).unwrap())
            .await
            .unwrap();
    }
    let response = router
        .oneshot(request("/login").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(service.call_count(), 0);
}

#[tokio::test]
async fn test_excluded_assets_bypass_gatekeeper() {
    let gk = gatekeeper(&configured(), sessions());
    let router = app(gk.clone());

    for path in ["/login/logo.png", "/_next/static/app.js", "/athlete/avatar.jpg"] {
        let response = router
            .clone()
            .oneshot(request(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{path}");
    }
    assert!(gk.limiter().store().is_empty());
}

#[tokio::test]
async fn test_demo_mode_simulates_role() {
    let mut config = configured();
    config.demo.enabled = true;
    let service = sessions();
    let router = app(gatekeeper(&config, service.clone()));

    let response = router
        .clone()
        .oneshot(
            request("/athlete/dashboard")
                .header(header::COOKIE, "demo_role=director")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(location(&response), "/director/dashboard");

    let response = router
        .oneshot(
            request("/director/dashboard")
                .header(header::COOKIE, "demo_role=director")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(service.call_count(), 0);
}

#[tokio::test]
async fn test_demo_role_bounced_from_auth_pages() {
    let mut config = configured();
    config.demo.enabled = true;
    let service = sessions();
    let router = app(gatekeeper(&config, service.clone()));

    for path in ["/login", "/signup"] {
        let response = router
            .clone()
            .oneshot(
                request(path)
                    .header(header::COOKIE, "demo_role=director")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT, "{path}");
        assert_eq!(location(&response), "/director/dashboard");
    }
    assert_eq!(service.call_count(), 0);
}

#[tokio::test]
async fn test_demo_mode_ignored_in_production() {
    let mut config = configured();
    config.demo.enabled = true;
    config.demo.tier = edge_gatekeeper::config::DeploymentTier::Production;
    let router = app(gatekeeper(&config, sessions()));

    let response = router
        .oneshot(
            request("/director/dashboard")
                .header(header::COOKIE, "demo_role=director")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(location(&response), "/login?redirect=%2Fdirector%2Fdashboard");
}

#[tokio::test]
async fn test_path_spellings_share_the_login_counter() {
    let router = app(gatekeeper(&configured(), sessions()));

    for path in ["/login", "//login", "/%6Cogin", "/login;x", "/login/"] {
        let response = router
            .clone()
            .oneshot(
                request(path)
                    .header("x-real-ip", "9.9.9.9")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{path}");
        assert!(response.headers().contains_key("x-ratelimit-limit"), "{path}");
    }

    let response = router
        .oneshot(
            request("/%6C%6F%67%69%6E")
                .header("x-real-ip", "9.9.9.9")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_encoded_brand_tree_still_checks_role() {
    let router = app(gatekeeper(&configured(), sessions()));

    for path in ["/%62rand/dashboard", "//brand/dashboard", "/brand/dashboard;.png", "/athlete/../brand"] {
        let response = router
            .clone()
            .oneshot(
                request(path)
                    .header(header::COOKIE, "session=athlete-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT, "{path}");
        assert_eq!(location(&response), "/athlete/dashboard");
    }
}

#[tokio::test]
async fn test_application_receives_canonical_path() {
    let router = app(gatekeeper(&configured(), sessions()));
    let response = router
        .oneshot(
            request("/%62rand//deals/./7/?tab=offers")
                .header(header::COOKIE, "session=brand-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"/brand/deals/7");
}

#[tokio::test]
async fn test_undecodable_path_is_rejected() {
    let router = app(gatekeeper(&configured(), sessions()));
    for path in ["/%FF/dashboard", "/brand%00/dashboard", "/%5Cbrand/dashboard"] {
        let response = router
            .clone()
            .oneshot(request(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{path}");
        let body = body_json(response).await;
        assert_eq!(body["error"], "Bad Request");
    }
}
