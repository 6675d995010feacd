use abisrelay_tests::{IpaConnection, framework::*};
use ipa::MsgType;
use ipa::net::LinkLimits;
use std::time::Duration;

fn short_limits() -> LinkLimits {
    LinkLimits {
        ping_interval: Duration::from_secs(1),
        pong_timeout: Duration::from_secs(1),
        ..LinkLimits::default()
    }
}

#[async_std::test]
async fn silent_bts_is_pinged_then_dropped() -> anyhow::Result<()> {
    let (proxy, logger) = init_proxy_with_limits(50000, 52000, short_limits()).await?;

    let mut conn = IpaConnection::connect(proxy.oml_addr(), &logger).await?;
    conn.recv_ipa(MsgType::IdGet).await?;

    // Stay silent.  The proxy pings, then gives up.
    conn.recv_ipa(MsgType::Ping).await?;
    conn.expect_closed().await?;
    wait_for_proxy(&proxy, "keepalive teardown", |s| s.counter("closed") == 1).await?;

    proxy.graceful_shutdown().await;
    Ok(())
}

#[async_std::test]
async fn answered_ping_keeps_the_link() -> anyhow::Result<()> {
    let (proxy, logger) = init_proxy_with_limits(50100, 52100, short_limits()).await?;

    let mut conn = IpaConnection::connect(proxy.oml_addr(), &logger).await?;
    conn.recv_ipa(MsgType::IdGet).await?;

    for _ in 0..3 {
        conn.recv_ipa(MsgType::Ping).await?;
        conn.send(&ipa::build::pong()).await?;
    }
    let status = proxy.status().await?;
    assert_eq!(status.counter("closed"), 0);

    proxy.graceful_shutdown().await;
    Ok(())
}
