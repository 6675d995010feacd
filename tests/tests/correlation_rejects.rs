use abisrelay_tests::{IpaConnection, MockBts, framework::*, send_identity};
use ipa::{MsgType, UnitId};

#[async_std::test]
async fn rsl_before_oml_is_closed() -> anyhow::Result<()> {
    let (proxy, logger) = init_proxy(44000, 46000).await?;

    let mut rsl = IpaConnection::connect(proxy.rsl_addr(), &logger).await?;
    rsl.recv_ipa(MsgType::IdGet).await?;
    send_identity(&mut rsl, UnitId::new(12, 0, 0)).await?;
    rsl.expect_closed().await?;

    let status = wait_for_proxy(&proxy, "rejection", |s| s.counter("rejected") == 1).await?;
    assert!(status.bts.is_empty());

    // Once the OML leg exists the same unit's RSL is accepted.
    let mut bts = MockBts::connect_oml(proxy.oml_addr(), UnitId::new(12, 0, 0), &logger).await?;
    bts.connect_rsl(proxy.rsl_addr()).await?;

    proxy.graceful_shutdown().await;
    Ok(())
}

#[async_std::test]
async fn second_oml_for_a_unit_is_closed() -> anyhow::Result<()> {
    let (proxy, logger) = init_proxy(44100, 46100).await?;

    let unit = UnitId::new(33, 2, 0);
    let mut first = MockBts::connect_oml(proxy.oml_addr(), unit, &logger).await?;

    let mut second = IpaConnection::connect(proxy.oml_addr(), &logger).await?;
    second.recv_ipa(MsgType::IdGet).await?;
    send_identity(&mut second, unit).await?;
    second.expect_closed().await?;

    // The original BTS is untouched.
    let status = wait_for_proxy(&proxy, "rejection", |s| s.counter("rejected") == 1).await?;
    assert_eq!(status.bts.len(), 1);
    first.oml.send(&ipa::build::ping()).await?;
    first.oml.recv_ipa(MsgType::Pong).await?;

    proxy.graceful_shutdown().await;
    Ok(())
}

#[async_std::test]
async fn oversize_frame_closes_the_connection() -> anyhow::Result<()> {
    let (proxy, logger) = init_proxy(44200, 46200).await?;

    let mut bts = MockBts::connect_oml(proxy.oml_addr(), UnitId::new(4, 0, 0), &logger).await?;

    // A header announcing 5000 bytes, over the 3968 byte limit.
    bts.oml.send_raw(&[0x13, 0x88, 0xff]).await?;
    bts.oml.expect_closed().await?;
    wait_for_proxy(&proxy, "BTS to be released", |s| s.bts.is_empty()).await?;

    proxy.graceful_shutdown().await;
    Ok(())
}
