//! End-to-end pipeline tests: scripted sensor bytes through handshake,
//! framing, decoding and classification, out over TCP to consumers.

use drishti_io::transport::MockTransport;
use drishti_io::{AppConfig, OverallZone, ScanClient, ScanServer, WireFormat};
use std::net::TcpStream;
use std::time::{Duration, Instant};

/// STX/ETX scan telegram at 1.0° resolution (270 samples), distances in mm
fn scan_telegram(distances_mm: &[u32]) -> Vec<u8> {
    let mut tokens = vec!["sSN".to_string(), "LMDscandata".to_string()];
    tokens.extend(std::iter::repeat("0".to_string()).take(22));
    tokens.push("2710".to_string()); // 1.0° angular step in 1/10000°
    tokens.push(format!("{:X}", distances_mm.len()));
    tokens.extend(distances_mm.iter().map(|d| format!("{:X}", d)));

    let mut telegram = vec![0x02];
    telegram.extend_from_slice(tokens.join(" ").as_bytes());
    telegram.push(0x03);
    telegram
}

fn script_handshake(mock: &MockTransport) {
    mock.push_read(b"\x02sAN SetAccessMode 1\x03");
    mock.push_read(b"\x02sAN mLMPsetscancfg 0 1 2710 FFF92230 36EE80\x03");
}

fn test_config() -> AppConfig {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut config = AppConfig::tim561_defaults();
    config.streaming.bind_address = "127.0.0.1:0".to_string();
    config.sensor.handshake_timeout_ms = 200;
    config.sensor.read_timeout_ms = 100;
    config
}

#[test]
fn full_pipeline_delivers_classified_scans_in_order() {
    let mock = MockTransport::new();
    script_handshake(&mock);

    let config = test_config();
    let server = ScanServer::start(mock.clone(), &config).expect("server start");

    let mut client =
        ScanClient::connect(server.local_addr(), WireFormat::Postcard).expect("client connect");
    client
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();

    // Feed scans after the consumer is attached; nearest return 0.35 m.
    let mut distances = vec![1500u32; 270];
    distances[42] = 350;
    let telegram = scan_telegram(&distances);
    std::thread::spawn({
        let mock = mock.clone();
        let telegram = telegram.clone();
        move || {
            for _ in 0..50 {
                // Split mid-telegram to exercise reassembly on the live path.
                mock.push_read_chunked(&telegram, 113);
                std::thread::sleep(Duration::from_millis(5));
            }
        }
    });

    let mut last_sequence = None;
    for _ in 0..5 {
        let frame = client.recv().expect("recv").expect("stream open");

        assert_eq!(frame.samples.len(), 270);
        assert_eq!(frame.sample_zones.len(), 270);
        assert!((frame.angular_resolution_deg - 1.0).abs() < 1e-9);
        assert!((frame.nearest_distance() - 0.35).abs() < 1e-9);
        assert_eq!(frame.overall, OverallZone::Danger);

        if let Some(last) = last_sequence {
            assert!(frame.sequence > last, "sequence must increase");
        }
        last_sequence = Some(frame.sequence);
    }
    assert_eq!(client.dropped(), 0, "client kept up, no gaps expected");

    server.stop();
}

#[test]
fn slow_consumer_is_dropped_without_stalling_healthy_one() {
    let mock = MockTransport::new();
    script_handshake(&mock);

    let mut config = test_config();
    config.streaming.consumer_send_timeout_ms = 100;
    config.streaming.consumer_queue_scans = 64;
    let server = ScanServer::start(mock.clone(), &config).expect("server start");

    // A consumer that connects and never reads.
    let slow = TcpStream::connect(server.local_addr()).expect("slow connect");

    let mut healthy =
        ScanClient::connect(server.local_addr(), WireFormat::Postcard).expect("healthy connect");
    healthy
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();

    // Wait until both consumers are registered before flooding.
    let deadline = Instant::now() + Duration::from_secs(5);
    while server.consumer_count() < 2 {
        assert!(Instant::now() < deadline, "consumers never registered");
        std::thread::sleep(Duration::from_millis(5));
    }

    // Enough traffic to fill the slow consumer's socket buffers and trip
    // either its send timeout or its bounded queue.
    let telegram = scan_telegram(&vec![1500u32; 270]);
    let feeder = std::thread::spawn({
        let mock = mock.clone();
        move || {
            for _ in 0..800 {
                mock.push_read(&telegram);
                std::thread::sleep(Duration::from_millis(2));
            }
        }
    });

    let mut received = 0u32;
    let mut last_sequence = None;
    let deadline = Instant::now() + Duration::from_secs(30);
    while !(received >= 50 && server.consumer_count() == 1) {
        assert!(
            Instant::now() < deadline,
            "slow consumer never dropped (received {}, consumers {})",
            received,
            server.consumer_count()
        );
        let frame = healthy.recv().expect("healthy recv").expect("stream open");
        if let Some(last) = last_sequence {
            assert!(frame.sequence > last, "delivery must stay in capture order");
        }
        last_sequence = Some(frame.sequence);
        received += 1;
    }

    feeder.join().unwrap();
    drop(slow);
    server.stop();
}

#[test]
fn handshake_timeout_surfaces_from_join() {
    let mock = MockTransport::new(); // sensor never acknowledges

    let mut config = test_config();
    config.sensor.handshake_timeout_ms = 100;
    let server = ScanServer::start(mock, &config).expect("server start");

    let err = server.join().expect_err("handshake must fail");
    assert!(
        matches!(err, drishti_io::Error::Handshake(_)),
        "got {:?}",
        err
    );
}

#[test]
fn json_wire_format_roundtrips_over_socket() {
    let mock = MockTransport::new();
    script_handshake(&mock);

    let mut config = test_config();
    config.streaming.wire_format = "json".to_string();
    let server = ScanServer::start(mock.clone(), &config).expect("server start");

    let mut client =
        ScanClient::connect(server.local_addr(), WireFormat::Json).expect("client connect");
    client
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();

    std::thread::spawn({
        let mock = mock.clone();
        move || {
            let telegram = scan_telegram(&vec![2500u32; 270]);
            for _ in 0..20 {
                mock.push_read(&telegram);
                std::thread::sleep(Duration::from_millis(10));
            }
        }
    });

    let frame = client.recv().expect("recv").expect("stream open");
    assert_eq!(frame.samples.len(), 270);
    assert_eq!(frame.overall, OverallZone::Clear);
    assert!((frame.nearest_distance() - 2.5).abs() < 1e-9);

    server.stop();
}

#[test]
fn server_shutdown_unblocks_client_with_eof() {
    let mock = MockTransport::new();
    script_handshake(&mock);

    let config = test_config();
    let server = ScanServer::start(mock.clone(), &config).expect("server start");

    let mut client =
        ScanClient::connect(server.local_addr(), WireFormat::Postcard).expect("client connect");
    client
        .set_read_timeout(Some(Duration::from_secs(10)))
        .unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while server.consumer_count() < 1 {
        assert!(Instant::now() < deadline, "consumer never registered");
        std::thread::sleep(Duration::from_millis(5));
    }

    server.stop();
    drop(server); // joins worker threads, closing consumer sockets

    // The client sees a clean end of stream, not a hang.
    assert!(client.frames().next().is_none());
}
