//! Vendor balance probes against wiremock billing endpoints.
//!
//! Covers each registered vendor's request shape and normalization, plus the
//! shared failure classes:
//! - non-2xx -> transport error
//! - unparseable body -> decode error
//! - vendor-reported failure -> upstream error

mod common;

use std::sync::Arc;

use chrono::{TimeZone, Utc};

use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use relaybill::core::ExchangeRate;
use relaybill::core::models::{ChannelStatus, ChannelType};
use relaybill::core::store::MemoryChannelStore;
use relaybill::core::{BalanceService, SweepSettings};
use relaybill::error::RelayError;
use relaybill::providers::aiproxy::AIProxyProbe;
use relaybill::providers::deepseek::DeepSeekProbe;
use relaybill::providers::moonshot::MoonshotProbe;
use relaybill::providers::openai::{CreditGrantsProbe, OpenAISBProbe, SubscriptionProbe};
use relaybill::providers::openrouter::OpenRouterProbe;
use relaybill::providers::siliconflow::SiliconFlowProbe;
use relaybill::providers::{BalanceProbe, ProbeRegistry};
use relaybill::test_utils::{
    ManualClock, RecordingHealth, make_test_channel, make_test_channel_at, make_test_probe_context,
};

use common::logger::TestLogger;

// =============================================================================
// OpenAI two-step
// =============================================================================

#[tokio::test]
async fn openai_subtracts_month_to_date_usage_from_hard_limit() {
    let log = TestLogger::new("openai_subtracts_month_to_date_usage_from_hard_limit");
    log.phase("setup");

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/dashboard/billing/subscription"))
        .and(header("authorization", "Bearer sk-test-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "object": "billing_subscription",
            "has_payment_method": true,
            "hard_limit_usd": 100.0,
            "soft_limit_usd": 80.0,
            "system_hard_limit_usd": 120.0
        })))
        .expect(1)
        .mount(&server)
        .await;
    // ManualClock is frozen on 2026-10-16.
    Mock::given(method("GET"))
        .and(path("/v1/dashboard/billing/usage"))
        .and(query_param("start_date", "2026-10-01"))
        .and(query_param("end_date", "2026-10-16"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"total_usage": 2500.0})),
        )
        .expect(1)
        .mount(&server)
        .await;

    log.phase("execute");
    let channel = make_test_channel_at(1, ChannelType::OpenAI, &server.uri());
    let balance = SubscriptionProbe::openai()
        .probe(&make_test_probe_context(), &channel)
        .await
        .unwrap();

    log.phase("verify");
    assert!((balance - 75.0).abs() < 1e-9);
    log.finish_ok();
}

#[tokio::test]
async fn openai_free_tier_uses_hundred_day_window() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/dashboard/billing/subscription"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "has_payment_method": false,
            "hard_limit_usd": 18.0
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/dashboard/billing/usage"))
        .and(query_param("start_date", "2026-07-08"))
        .and(query_param("end_date", "2026-10-16"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"total_usage": 300.0})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let channel = make_test_channel_at(1, ChannelType::OpenAI, &server.uri());
    let balance = SubscriptionProbe::openai()
        .probe(&make_test_probe_context(), &channel)
        .await
        .unwrap();
    assert!((balance - 15.0).abs() < 1e-9);
}

#[tokio::test]
async fn openai_usage_window_follows_utc_date() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/dashboard/billing/subscription"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "has_payment_method": true,
            "hard_limit_usd": 10.0
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/dashboard/billing/usage"))
        .and(query_param("start_date", "2026-11-01"))
        .and(query_param("end_date", "2026-11-01"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"total_usage": 100.0})),
        )
        .expect(1)
        .mount(&server)
        .await;

    // Just past midnight UTC, the month has already rolled over.
    let clock = ManualClock::at(Utc.with_ymd_and_hms(2026, 11, 1, 0, 30, 0).unwrap());
    let ctx = make_test_probe_context().with_clock(Arc::new(clock));
    let channel = make_test_channel_at(1, ChannelType::OpenAI, &server.uri());
    let balance = SubscriptionProbe::openai().probe(&ctx, &channel).await.unwrap();
    assert!((balance - 9.0).abs() < 1e-9);
}

#[tokio::test]
async fn custom_channel_uses_its_own_base_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/dashboard/billing/subscription"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "has_payment_method": true,
            "hard_limit_usd": 10.0
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/dashboard/billing/usage"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"total_usage": 0})),
        )
        .mount(&server)
        .await;

    let channel = make_test_channel_at(4, ChannelType::Custom, &server.uri());
    let balance = SubscriptionProbe::custom()
        .probe(&make_test_probe_context(), &channel)
        .await
        .unwrap();
    assert!((balance - 10.0).abs() < 1e-9);
}

#[tokio::test]
async fn openai_usage_failure_is_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/dashboard/billing/subscription"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "has_payment_method": true,
            "hard_limit_usd": 10.0
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/dashboard/billing/usage"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let channel = make_test_channel_at(1, ChannelType::OpenAI, &server.uri());
    let err = SubscriptionProbe::openai()
        .probe(&make_test_probe_context(), &channel)
        .await
        .unwrap_err();
    assert!(
        matches!(err, RelayError::Transport { status: Some(503), .. }),
        "got {err:?}"
    );
}

// =============================================================================
// Credit grants and OpenAI-SB
// =============================================================================

#[tokio::test]
async fn credit_grant_vendors_read_their_field() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dashboard/billing/credit_grants"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "total_granted": 50.0,
            "total_used": 8.0,
            "total_available": 42.0,
            "total_remaining": 41.5
        })))
        .mount(&server)
        .await;
    let ctx = make_test_probe_context();

    let closeai = make_test_channel_at(1, ChannelType::CloseAI, &server.uri());
    let available = CreditGrantsProbe::closeai()
        .probe(&ctx, &closeai)
        .await
        .unwrap();
    assert!((available - 42.0).abs() < 1e-9);

    let api2gpt = make_test_channel(2, ChannelType::API2GPT);
    let remaining = CreditGrantsProbe::api2gpt()
        .with_base_url(server.uri())
        .probe(&ctx, &api2gpt)
        .await
        .unwrap();
    assert!((remaining - 41.5).abs() < 1e-9);

    let aigc2d = make_test_channel(3, ChannelType::AIGC2D);
    let available = CreditGrantsProbe::aigc2d()
        .with_base_url(server.uri())
        .probe(&ctx, &aigc2d)
        .await
        .unwrap();
    assert!((available - 42.0).abs() < 1e-9);
}

#[tokio::test]
async fn openaisb_parses_string_credit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sb-api/user/status"))
        .and(query_param("api_key", "sk-test-5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "msg": "ok",
            "data": {"credit": "12.75"}
        })))
        .mount(&server)
        .await;

    let balance = OpenAISBProbe::with_base_url(server.uri())
        .probe(
            &make_test_probe_context(),
            &make_test_channel(5, ChannelType::OpenAISB),
        )
        .await
        .unwrap();
    assert!((balance - 12.75).abs() < 1e-9);
}

#[tokio::test]
async fn openaisb_key_is_query_escaped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sb-api/user/status"))
        .and(query_param("api_key", "sk-a&b#c"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "msg": "ok",
            "data": {"credit": "3"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut channel = make_test_channel(5, ChannelType::OpenAISB);
    channel.key = "sk-a&b#c".to_string();
    let balance = OpenAISBProbe::with_base_url(server.uri())
        .probe(&make_test_probe_context(), &channel)
        .await
        .unwrap();
    assert!((balance - 3.0).abs() < 1e-9);
}

#[tokio::test]
async fn openaisb_without_data_is_upstream_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sb-api/user/status"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"msg": "invalid key", "data": null})),
        )
        .mount(&server)
        .await;

    let err = OpenAISBProbe::with_base_url(server.uri())
        .probe(
            &make_test_probe_context(),
            &make_test_channel(5, ChannelType::OpenAISB),
        )
        .await
        .unwrap_err();
    assert!(
        matches!(&err, RelayError::Upstream { message, .. } if message == "invalid key"),
        "got {err:?}"
    );
}

// =============================================================================
// Single-call vendors
// =============================================================================

#[tokio::test]
async fn aiproxy_sends_api_key_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/report/getUserOverview"))
        .and(header("api-key", "sk-test-6"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "message": "",
            "errorCode": 0,
            "data": {"totalPoints": 33.5}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let balance = AIProxyProbe::with_base_url(server.uri())
        .probe(
            &make_test_probe_context(),
            &make_test_channel(6, ChannelType::AIProxy),
        )
        .await
        .unwrap();
    assert!((balance - 33.5).abs() < 1e-9);
}

#[tokio::test]
async fn aiproxy_failure_carries_vendor_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/report/getUserOverview"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": false,
            "message": "bad key",
            "error_code": 401
        })))
        .mount(&server)
        .await;

    let err = AIProxyProbe::with_base_url(server.uri())
        .probe(
            &make_test_probe_context(),
            &make_test_channel(6, ChannelType::AIProxy),
        )
        .await
        .unwrap_err();
    match err {
        RelayError::Upstream {
            vendor,
            code,
            message,
        } => {
            assert_eq!(vendor, "aiproxy");
            assert_eq!(code, "401");
            assert_eq!(message, "bad key");
        }
        other => panic!("expected upstream error, got {other:?}"),
    }
}

#[tokio::test]
async fn siliconflow_parses_string_balance() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/user/info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": 20000,
            "message": "OK",
            "status": true,
            "data": {"id": "u1", "balance": "1.0", "chargeBalance": "8.0", "totalBalance": "9.00"}
        })))
        .mount(&server)
        .await;

    let balance = SiliconFlowProbe::with_base_url(server.uri())
        .probe(
            &make_test_probe_context(),
            &make_test_channel(7, ChannelType::SiliconFlow),
        )
        .await
        .unwrap();
    assert!((balance - 9.0).abs() < 1e-9);
}

#[tokio::test]
async fn siliconflow_rejects_non_success_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/user/info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": 30001,
            "message": "unauthorized"
        })))
        .mount(&server)
        .await;

    let err = SiliconFlowProbe::with_base_url(server.uri())
        .probe(
            &make_test_probe_context(),
            &make_test_channel(7, ChannelType::SiliconFlow),
        )
        .await
        .unwrap_err();
    assert!(
        matches!(&err, RelayError::Upstream { code, .. } if code == "30001"),
        "got {err:?}"
    );
}

#[tokio::test]
async fn deepseek_reads_cny_row() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user/balance"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "is_available": true,
            "balance_infos": [
                {
                    "currency": "USD",
                    "total_balance": "3.00",
                    "granted_balance": "0",
                    "topped_up_balance": "3.00"
                },
                {
                    "currency": "CNY",
                    "total_balance": "110.00",
                    "granted_balance": "10.00",
                    "topped_up_balance": "100.00"
                }
            ]
        })))
        .mount(&server)
        .await;

    let balance = DeepSeekProbe::with_base_url(server.uri())
        .probe(
            &make_test_probe_context(),
            &make_test_channel(8, ChannelType::DeepSeek),
        )
        .await
        .unwrap();
    assert!((balance - 110.0).abs() < 1e-9);
}

#[tokio::test]
async fn deepseek_without_cny_row_leaves_stored_balance() {
    let log = TestLogger::new("deepseek_without_cny_row_leaves_stored_balance");
    log.phase("setup");

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user/balance"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "is_available": true,
            "balance_infos": [{"currency": "USD", "total_balance": "3.00"}]
        })))
        .mount(&server)
        .await;

    let mut channel = make_test_channel(8, ChannelType::DeepSeek);
    channel.balance = 4.5;
    let store = Arc::new(MemoryChannelStore::new(vec![channel]));
    let mut registry = ProbeRegistry::empty();
    registry.register(
        ChannelType::DeepSeek,
        DeepSeekProbe::with_base_url(server.uri()),
    );
    let service = BalanceService::new(
        store.clone(),
        Arc::new(RecordingHealth::default()),
        registry,
        make_test_probe_context(),
        SweepSettings::default(),
    );

    log.phase("execute");
    let err = service.refresh(8).await.unwrap_err();

    log.phase("verify");
    assert!(matches!(err, RelayError::NotFound { .. }), "got {err:?}");
    assert!((common::balance_of(&store, 8) - 4.5).abs() < f64::EPSILON);
    assert_eq!(common::status_of(&store, 8), ChannelStatus::Enabled);
    log.finish_ok();
}

#[tokio::test]
async fn openrouter_subtracts_usage_from_credits() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/credits"))
        .and(header("authorization", "Bearer sk-test-9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {"total_credits": 20.0, "total_usage": 7.25}
        })))
        .mount(&server)
        .await;

    let balance = OpenRouterProbe::with_base_url(server.uri())
        .probe(
            &make_test_probe_context(),
            &make_test_channel(9, ChannelType::OpenRouter),
        )
        .await
        .unwrap();
    assert!((balance - 12.75).abs() < 1e-9);
}

#[tokio::test]
async fn moonshot_converts_local_currency() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/users/me/balance"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": 0,
            "data": {"available_balance": 100.0, "voucher_balance": 0.0, "cash_balance": 100.0},
            "scode": "0x0",
            "status": true
        })))
        .mount(&server)
        .await;

    let mut ctx = make_test_probe_context();
    ctx.exchange_rate = ExchangeRate::new(7.0).unwrap();
    let balance = MoonshotProbe::with_base_url(server.uri())
        .probe(&ctx, &make_test_channel(10, ChannelType::Moonshot))
        .await
        .unwrap();
    assert!((balance - 100.0 / 7.0).abs() < 1e-6, "got {balance}");
}

#[tokio::test]
async fn moonshot_status_false_is_upstream_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/users/me/balance"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": 0,
            "data": {"available_balance": 100.0},
            "scode": "0x1",
            "status": false
        })))
        .mount(&server)
        .await;

    let err = MoonshotProbe::with_base_url(server.uri())
        .probe(
            &make_test_probe_context(),
            &make_test_channel(10, ChannelType::Moonshot),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::Upstream { .. }), "got {err:?}");
}

// =============================================================================
// Shared failure classes
// =============================================================================

#[tokio::test]
async fn malformed_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/credits"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = OpenRouterProbe::with_base_url(server.uri())
        .probe(
            &make_test_probe_context(),
            &make_test_channel(9, ChannelType::OpenRouter),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::Decode { .. }), "got {err:?}");
}

#[tokio::test]
async fn unreachable_vendor_is_transport_error() {
    // Reserve a port and release it so nothing is listening there.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    let uri = format!("http://127.0.0.1:{port}");

    let err = DeepSeekProbe::with_base_url(uri)
        .probe(
            &make_test_probe_context(),
            &make_test_channel(8, ChannelType::DeepSeek),
        )
        .await
        .unwrap_err();
    assert!(
        matches!(err, RelayError::Transport { status: None, .. }),
        "got {err:?}"
    );
}

#[tokio::test]
async fn registry_reports_unknown_types_as_not_implemented() {
    let registry = ProbeRegistry::with_defaults();
    let ctx = make_test_probe_context();

    for channel_type in [ChannelType::Azure, ChannelType::Anthropic, ChannelType::Ali] {
        let err = registry
            .probe(&ctx, &make_test_channel(1, channel_type))
            .await
            .unwrap_err();
        assert!(
            matches!(err, RelayError::NotImplemented { .. }),
            "{channel_type}: {err:?}"
        );
    }
}

#[tokio::test]
async fn repeated_probe_of_unchanged_account_is_stable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/users/me/balance"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": 0,
            "data": {"available_balance": 73.0},
            "scode": "0x0",
            "status": true
        })))
        .expect(2)
        .mount(&server)
        .await;

    let probe = MoonshotProbe::with_base_url(server.uri());
    let ctx = make_test_probe_context();
    let channel = make_test_channel(10, ChannelType::Moonshot);

    let first = probe.probe(&ctx, &channel).await.unwrap();
    let second = probe.probe(&ctx, &channel).await.unwrap();
    assert!((first - 10.0).abs() < 1e-9, "got {first}");
    assert_eq!(first.to_bits(), second.to_bits());
}
