use abisrelay_tests::{MockBts, framework::*};
use anyhow::ensure;
use async_std::future;
use async_std::net::UdpSocket;
use hex_literal::hex;
use ipa::protocol::DEFAULT_MAX_PAYLOAD;
use ipa::{Frame, Protocol, UnitId};
use std::time::Duration;

async fn recv_datagram(socket: &UdpSocket) -> anyhow::Result<Frame> {
    let mut buf = [0u8; 4096];
    let (n, _) = future::timeout(Duration::from_secs(5), socket.recv_from(&mut buf)).await??;
    Ok(Frame::decode_datagram(&buf[..n], DEFAULT_MAX_PAYLOAD)?)
}

#[async_std::test]
async fn injection_in_both_directions() -> anyhow::Result<()> {
    let (proxy, logger) = init_proxy(47000, 49000).await?;

    let unit = UnitId::new(20, 3, 0);
    let mut bts = MockBts::connect_oml(proxy.oml_addr(), unit, &logger).await?;
    bts.connect_rsl(proxy.rsl_addr()).await?;
    let status = wait_for_proxy(&proxy, "BTS 20/3", |s| s.find(20, 3).is_some()).await?;
    let entry = status.find(20, 3).unwrap().clone();
    assert_eq!(entry.udp_bts.port(), 47023);
    assert_eq!(entry.udp_bsc.port(), 49023);

    let observer = UdpSocket::bind("127.0.0.1:0").await?;

    // An OML frame injected at the BTS socket goes out on the OML leg, and the sender becomes
    // the observer for that socket.
    let oml = Frame::new(Protocol::Oml, hex!("80 80 00 0d 61 01 ff ff ff").to_vec());
    observer.send_to(&oml.encode()?, entry.udp_bts).await?;
    assert_eq!(bts.oml.recv().await?, oml);

    // What the BTS now sends on OML is copied to the observer.
    let reply = hex!("80 80 00 0d 62 01 ff ff ff");
    bts.send_oml(&reply).await?;
    let copy = recv_datagram(&observer).await?;
    assert_eq!(copy, Frame::new(Protocol::Oml, reply.to_vec()));

    // RSL injected at the controller socket goes out on the RSL leg.
    let rsl = Frame::new(Protocol::Rsl, hex!("08 01 01 11").to_vec());
    observer.send_to(&rsl.encode()?, entry.udp_bsc).await?;
    assert_eq!(bts.rsl()?.recv().await?, rsl);

    let rsl_reply = hex!("08 02 01 11");
    bts.send_rsl(&rsl_reply).await?;
    let copy = recv_datagram(&observer).await?;
    assert_eq!(copy, Frame::new(Protocol::Rsl, rsl_reply.to_vec()));

    // A datagram that is not exactly one frame is dropped.
    observer.send_to(&hex!("00 05 ff 01"), entry.udp_bts).await?;
    wait_for_proxy(&proxy, "bad datagram", |s| s.counter("bad_datagram") == 1).await?;
    bts.oml.expect_nothing().await?;

    proxy.graceful_shutdown().await;
    Ok(())
}

#[async_std::test]
async fn rsl_injection_without_rsl_leg_is_dropped() -> anyhow::Result<()> {
    let (proxy, logger) = init_proxy(47100, 49100).await?;

    let mut bts = MockBts::connect_oml(proxy.oml_addr(), UnitId::new(5, 0, 0), &logger).await?;
    let status = wait_for_proxy(&proxy, "BTS 5/0", |s| s.find(5, 0).is_some()).await?;
    let udp_bsc = status.find(5, 0).unwrap().udp_bsc;

    let observer = UdpSocket::bind("127.0.0.1:0").await?;
    let rsl = Frame::new(Protocol::Rsl, hex!("08 01").to_vec());
    observer.send_to(&rsl.encode()?, udp_bsc).await?;
    wait_for_proxy(&proxy, "drop", |s| s.counter("no_rsl") == 1).await?;
    bts.oml.expect_nothing().await?;

    proxy.graceful_shutdown().await;
    Ok(())
}

#[async_std::test]
async fn oml_teardown_releases_the_bts() -> anyhow::Result<()> {
    let (proxy, logger) = init_proxy(47200, 49200).await?;

    let unit = UnitId::new(9, 1, 0);
    let mut bts = MockBts::connect_oml(proxy.oml_addr(), unit, &logger).await?;
    bts.connect_rsl(proxy.rsl_addr()).await?;
    wait_for_proxy(&proxy, "BTS 9/1", |s| {
        s.find(9, 1).is_some_and(|b| b.rsl_peer.is_some())
    })
    .await?;

    // Losing OML takes RSL with it.
    bts.oml.close()?;
    bts.rsl()?.expect_closed().await?;
    let status = wait_for_proxy(&proxy, "BTS to be released", |s| s.bts.is_empty()).await?;
    ensure!(status.connections == 0, "connections left: {}", status.connections);

    // The unit can come back, which needs its UDP ports again.
    let mut bts = MockBts::connect_oml(proxy.oml_addr(), unit, &logger).await?;
    bts.connect_rsl(proxy.rsl_addr()).await?;
    let status = wait_for_proxy(&proxy, "BTS 9/1 again", |s| s.find(9, 1).is_some()).await?;
    assert_eq!(status.find(9, 1).unwrap().udp_bts.port(), 47210);

    proxy.graceful_shutdown().await;
    Ok(())
}
