use abisrelay_tests::{MockBsc, framework::*, send_sccp};
use hex_literal::hex;
use sccp::{MessageType, build as sccp_build};
use std::time::Duration;

const BSCS: &str = r#"
[token-north]
lac = 200

[token-south]
lac = 100
"#;

const IMSI: [u8; 8] = hex!("29 80 03 00 00 00 00 f1");

#[async_std::test]
async fn paging_goes_to_the_first_listed_lac() -> anyhow::Result<()> {
    let (nat, msc, logger) = init_nat(BSCS, Duration::from_secs(2)).await?;
    let mut core = msc.accept().await?;
    wait_for_nat(&nat, "MSC connection", |s| s.msc_connected).await?;

    // LAC 200 registers before LAC 100.
    let mut north = MockBsc::authenticated(nat.local_addr(), "north", &logger).await?;
    let mut south = MockBsc::authenticated(nat.local_addr(), "south", &logger).await?;
    wait_for_nat(&nat, "two controllers", |s| s.controllers.len() == 2).await?;

    let paging = sccp_build::udt(&sccp_build::paging(&IMSI, &[100, 200]));
    send_sccp(&mut core, paging.clone()).await?;
    let (_, received) = south.recv_sccp(MessageType::Udt).await?;
    assert_eq!(received, paging);
    north.conn.expect_nothing().await?;

    let paging = sccp_build::udt(&sccp_build::paging(&IMSI, &[200]));
    send_sccp(&mut core, paging).await?;
    north.recv_sccp(MessageType::Udt).await?;

    let status = wait_for_nat(&nat, "routing", |s| s.counter("paging_routed") == 2).await?;
    assert_eq!(status.counter("paging_no_match"), 0);

    nat.graceful_shutdown().await;
    Ok(())
}

#[async_std::test]
async fn unroutable_paging_is_dropped() -> anyhow::Result<()> {
    let (nat, msc, logger) = init_nat(BSCS, Duration::from_secs(2)).await?;
    let mut core = msc.accept().await?;
    wait_for_nat(&nat, "MSC connection", |s| s.msc_connected).await?;
    let mut north = MockBsc::authenticated(nat.local_addr(), "north", &logger).await?;

    // Whole-BSS paging is never broadcast.
    let bss_wide = sccp_build::udt(&hex!("00 07 52 08 01 99 1a 01 06"));
    send_sccp(&mut core, bss_wide).await?;
    wait_for_nat(&nat, "BSS-wide drop", |s| s.counter("paging_bss_wide") == 1).await?;

    // No controller serves LAC 300.
    send_sccp(&mut core, sccp_build::udt(&sccp_build::paging(&IMSI, &[300]))).await?;
    wait_for_nat(&nat, "no match", |s| s.counter("paging_no_match") == 1).await?;

    // A connection request from the MSC is not something the NAT relays.
    send_sccp(&mut core, sccp_build::cr(sccp::LocalRef::new(5).unwrap(), &[])).await?;
    wait_for_nat(&nat, "CR drop", |s| s.counter("msc_unroutable") == 1).await?;

    // A BSSMAP length octet of zero is malformed, and the NAT keeps running.
    send_sccp(&mut core, sccp_build::udt(&hex!("00 00 52"))).await?;
    wait_for_nat(&nat, "malformed drop", |s| s.counter("paging_malformed") == 1).await?;

    north.conn.expect_nothing().await?;

    // Routable paging still gets through afterwards.
    send_sccp(&mut core, sccp_build::udt(&sccp_build::paging(&IMSI, &[200]))).await?;
    north.recv_sccp(MessageType::Udt).await?;
    let status = nat.status().await?;
    assert_eq!(status.counter("paging_routed"), 1);
    assert!(status.msc_connected);

    nat.graceful_shutdown().await;
    Ok(())
}
