use abisrelay_tests::{MockBsc, framework::*, recv_sccp, send_sccp};
use hex_literal::hex;
use ipa::{IdTag, IdentityTags, MsgType, Protocol, build};
use sccp::{LocalRef, MessageType, build as sccp_build};
use std::time::Duration;

const BSCS: &str = r#"
[token-bsc1]
lac = 100

[token-bsc2]
lac = 200
"#;

fn r(v: u32) -> LocalRef {
    LocalRef::new(v).unwrap()
}

const COMPLETE_L3: [u8; 6] = hex!("00 04 57 05 08 00");

#[async_std::test]
async fn two_controllers_share_a_local_reference() -> anyhow::Result<()> {
    let (nat, msc, logger) = init_nat(BSCS, Duration::from_secs(2)).await?;
    let mut core = msc.accept().await?;
    wait_for_nat(&nat, "MSC connection", |s| s.msc_connected).await?;

    let mut bsc1 = MockBsc::authenticated(nat.local_addr(), "bsc1", &logger).await?;
    let mut bsc2 = MockBsc::authenticated(nat.local_addr(), "bsc2", &logger).await?;

    // Both open a connection with reference 1.
    bsc1.send_sccp(sccp_build::cr(r(1), &COMPLETE_L3)).await?;
    let (cr1, _) = recv_sccp(&mut core, MessageType::Cr).await?;
    bsc2.send_sccp(sccp_build::cr(r(1), &COMPLETE_L3)).await?;
    let (cr2, _) = recv_sccp(&mut core, MessageType::Cr).await?;
    let (nat1, nat2) = (cr1.src_ref.unwrap(), cr2.src_ref.unwrap());
    assert_ne!(nat1, nat2);
    assert_ne!(nat1.value(), 0);

    // The MSC confirms each with its own reference.
    send_sccp(&mut core, sccp_build::cc(nat1, r(0x100))).await?;
    let (cc, _) = bsc1.recv_sccp(MessageType::Cc).await?;
    assert_eq!(cc.dst_ref, Some(r(1)));
    assert_eq!(cc.src_ref, Some(r(0x100)));
    send_sccp(&mut core, sccp_build::cc(nat2, r(0x200))).await?;
    let (cc, _) = bsc2.recv_sccp(MessageType::Cc).await?;
    assert_eq!(cc.dst_ref, Some(r(1)));

    // Data toward the MSC already carries the MSC's reference and passes unchanged.
    let dt1 = sccp_build::dt1(r(0x100), &hex!("00 02 55 00"));
    bsc1.send_sccp(dt1.clone()).await?;
    let (_, received) = recv_sccp(&mut core, MessageType::Dt1).await?;
    assert_eq!(received, dt1);

    // A controller cannot address the MSC end of another controller's connection.
    bsc2.send_sccp(sccp_build::dt1(r(0x100), &hex!("00 02 55 00"))).await?;
    wait_for_nat(&nat, "foreign reference", |s| s.counter("unknown_ref") == 1).await?;
    core.expect_nothing().await?;

    // Data from the MSC is renumbered for the owning controller only.
    send_sccp(&mut core, sccp_build::dt1(nat2, &hex!("00 02 56 00"))).await?;
    let (dt1, payload) = bsc2.recv_sccp(MessageType::Dt1).await?;
    assert_eq!(dt1.dst_ref, Some(r(1)));
    assert_eq!(&payload[4..], &hex!("00 01 04 00 02 56 00"));
    bsc1.conn.expect_nothing().await?;

    // Controller release, MSC release complete.
    bsc1.send_sccp(sccp_build::rlsd(r(0x100), r(1), 0x00)).await?;
    let (rlsd, _) = recv_sccp(&mut core, MessageType::Rlsd).await?;
    assert_eq!(rlsd.src_ref, Some(nat1));
    send_sccp(&mut core, sccp_build::rlc(nat1, r(0x100))).await?;
    let (rlc, _) = bsc1.recv_sccp(MessageType::Rlc).await?;
    assert_eq!(rlc.dst_ref, Some(r(1)));

    let status = wait_for_nat(&nat, "release", |s| s.live_references == 1).await?;
    assert_eq!(status.counter("sccp_opened"), 2);

    // The released reference is unknown from now on.
    send_sccp(&mut core, sccp_build::dt1(nat1, &hex!("00 02 57 00"))).await?;
    wait_for_nat(&nat, "drop", |s| s.counter("unknown_ref") == 2).await?;
    bsc1.conn.expect_nothing().await?;

    nat.graceful_shutdown().await;
    Ok(())
}

#[async_std::test]
async fn controller_loss_releases_its_connections() -> anyhow::Result<()> {
    let (nat, msc, logger) = init_nat(BSCS, Duration::from_secs(2)).await?;
    let mut core = msc.accept().await?;
    wait_for_nat(&nat, "MSC connection", |s| s.msc_connected).await?;

    let mut bsc = MockBsc::authenticated(nat.local_addr(), "bsc1", &logger).await?;

    // One confirmed connection and one the MSC has not answered yet.
    bsc.send_sccp(sccp_build::cr(r(7), &COMPLETE_L3)).await?;
    let (confirmed, _) = recv_sccp(&mut core, MessageType::Cr).await?;
    let nat_ref = confirmed.src_ref.unwrap();
    send_sccp(&mut core, sccp_build::cc(nat_ref, r(0x4242))).await?;
    bsc.recv_sccp(MessageType::Cc).await?;
    bsc.send_sccp(sccp_build::cr(r(8), &COMPLETE_L3)).await?;
    recv_sccp(&mut core, MessageType::Cr).await?;
    wait_for_nat(&nat, "two references", |s| s.live_references == 2).await?;

    bsc.conn.close()?;

    // The MSC is told about the confirmed connection only.
    let (rlsd, payload) = recv_sccp(&mut core, MessageType::Rlsd).await?;
    assert_eq!(rlsd.dst_ref, Some(r(0x4242)));
    assert_eq!(rlsd.src_ref, Some(nat_ref));
    assert_eq!(payload[7], 0x10);
    core.expect_nothing().await?;

    let status = wait_for_nat(&nat, "cleanup", |s| s.live_references == 0).await?;
    assert!(status.controllers.is_empty());

    nat.graceful_shutdown().await;
    Ok(())
}

#[async_std::test]
async fn msc_identity_and_reconnect() -> anyhow::Result<()> {
    let (nat, msc, logger) = init_nat(BSCS, Duration::from_secs(2)).await?;
    let mut core = msc.accept().await?;
    wait_for_nat(&nat, "MSC connection", |s| s.msc_connected).await?;

    // The MSC asks who the NAT is.
    core.send(&build::id_get(&[IdTag::UnitName])).await?;
    let entries = core.recv_ipa(MsgType::IdResp).await?;
    let tags = IdentityTags::parse(&entries)?;
    assert_eq!(tags.text(IdTag::UnitName).transpose()?, Some("abisrelay"));

    // One confirmed connection and one still waiting for the MSC.
    let mut bsc = MockBsc::authenticated(nat.local_addr(), "bsc2", &logger).await?;
    bsc.send_sccp(sccp_build::cr(r(1), &COMPLETE_L3)).await?;
    let (cr, _) = recv_sccp(&mut core, MessageType::Cr).await?;
    send_sccp(&mut core, sccp_build::cc(cr.src_ref.unwrap(), r(0x300))).await?;
    bsc.recv_sccp(MessageType::Cc).await?;
    bsc.send_sccp(sccp_build::cr(r(4), &COMPLETE_L3)).await?;
    recv_sccp(&mut core, MessageType::Cr).await?;

    // Losing the MSC forgets every reference but keeps the controller.
    core.close()?;
    let status = wait_for_nat(&nat, "MSC loss", |s| s.counter("msc_lost") == 1).await?;
    assert_eq!(status.live_references, 0);
    assert_eq!(status.controllers.len(), 1);

    // The controller is told about both: released if confirmed, refused otherwise.
    let mut notices = vec![];
    for _ in 0..2 {
        let payload = bsc.conn.recv_payload(Protocol::Sccp).await?;
        notices.push((sccp::parse(&payload)?, payload));
    }
    notices.sort_by_key(|(header, _)| header.raw_type);
    let (cref, payload) = &notices[0];
    assert_eq!(cref.message_type, Some(MessageType::Cref));
    assert_eq!(cref.dst_ref, Some(r(4)));
    assert_eq!(payload[4], 0x11);
    let (rlsd, payload) = &notices[1];
    assert_eq!(rlsd.message_type, Some(MessageType::Rlsd));
    assert_eq!(rlsd.dst_ref, Some(r(1)));
    assert_eq!(rlsd.src_ref, Some(r(0x300)));
    assert_eq!(payload[7], 0x10);

    // While the MSC is away controller traffic is dropped.
    bsc.send_sccp(sccp_build::cr(r(2), &COMPLETE_L3)).await?;
    wait_for_nat(&nat, "drop", |s| s.counter("msc_down") >= 1).await?;

    // The NAT reconnects by itself.
    let mut core = msc.accept().await?;
    wait_for_nat(&nat, "MSC reconnection", |s| s.msc_connected).await?;
    bsc.conn.send(&build::ping()).await?;
    bsc.conn.recv_ipa(MsgType::Pong).await?;
    bsc.send_sccp(sccp_build::cr(r(3), &COMPLETE_L3)).await?;
    let (cr, _) = recv_sccp(&mut core, MessageType::Cr).await?;
    assert!(cr.src_ref.is_some());

    nat.graceful_shutdown().await;
    Ok(())
}
