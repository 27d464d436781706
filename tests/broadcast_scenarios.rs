//! End-to-end broadcast scenarios over the loopback transport

use std::sync::Arc;

use bytes::{BufMut, Bytes, BytesMut};

use auracast_source::codec::ContainerHeader;
use auracast_source::config::{AppConfig, SubgroupSettings};
use auracast_source::engine::{BroadcastEngine, SendOutcome};
use auracast_source::source::setup_broadcast_source;
use auracast_source::transport::loopback::{DeliveredSdu, IsoLoopback};
use auracast_source::transport::{event_channel, EventReceiver, StreamHandle, StreamObserver, TxBufferPool};
use auracast_source::StreamState;

/// 16 kHz, 10 ms frames, 1600 samples: ten 40-byte frames filled with their index
fn container() -> Bytes {
    let mut buf = BytesMut::new();
    buf.put_slice(&ContainerHeader::new(16_000, 32_000, 2, 10_000, 1600).encode());
    for i in 0..10u8 {
        buf.put_u16_le(40);
        buf.put_bytes(i, 40);
    }
    buf.freeze()
}

fn config(streams: usize) -> AppConfig {
    let mut config = AppConfig::demo();
    config.broadcast.stream_count = streams;
    config.broadcast.tx_buf_count = 3 * streams;
    config.subgroups = (0..streams)
        .map(|i| SubgroupSettings {
            language: Some("eng".into()),
            broadcast_name: Some(format!("Subgroup_Audio_{}", i + 1)),
            ..Default::default()
        })
        .collect();
    config
}

struct Harness {
    loopback: Arc<IsoLoopback>,
    engine: BroadcastEngine<Arc<IsoLoopback>>,
    events: EventReceiver,
}

impl Harness {
    fn new(streams: usize, pool_size: usize) -> Self {
        let setup = setup_broadcast_source(&config(streams), vec![container(); streams]).unwrap();
        let (tx, rx) = event_channel();
        let loopback = Arc::new(IsoLoopback::new(streams, TxBufferPool::new(pool_size, 40), tx).with_recording());
        let engine = setup.into_engine(loopback.clone());
        Self {
            loopback,
            engine,
            events: rx,
        }
    }

    fn start(&mut self) {
        self.loopback.start_all();
        self.engine.wait_for_all_started(&self.events).unwrap();
        self.engine.prime();
    }

    /// One ISO interval, then handle the resulting events
    fn step(&mut self) {
        self.loopback.tick();
        for event in self.events.try_iter().collect::<Vec<_>>() {
            self.engine.dispatch(event);
        }
    }

    fn delivered(&self, stream: u8) -> Vec<DeliveredSdu> {
        self.loopback
            .take_delivered()
            .into_iter()
            .filter(|d| d.stream == StreamHandle(stream))
            .collect()
    }
}

#[test]
fn test_ten_frames_then_wrap() {
    let mut h = Harness::new(1, 3);
    h.start();
    for _ in 0..11 {
        h.step();
    }

    let delivered = h.delivered(0);
    assert_eq!(delivered.len(), 11);
    for (i, sdu) in delivered.iter().enumerate() {
        assert_eq!(sdu.seq, i as u32);
        assert_eq!(sdu.payload.len(), 40);
        assert!(sdu.payload.iter().all(|&b| b == (i % 10) as u8));
    }

    let cursor = h.engine.cursor(StreamHandle(0)).unwrap();
    assert_eq!(cursor.header().samples_per_frame(), 160);
    assert_eq!(cursor.wraps(), 1);
}

#[test]
fn test_sequence_has_no_gaps_per_stream() {
    let mut h = Harness::new(3, 9);
    h.start();
    for _ in 0..50 {
        h.step();
    }

    let all = h.loopback.take_delivered();
    for stream in 0..3u8 {
        let seqs: Vec<u32> = all
            .iter()
            .filter(|d| d.stream == StreamHandle(stream))
            .map(|d| d.seq)
            .collect();
        assert_eq!(seqs, (0..50).collect::<Vec<_>>());
    }
    // pipeline stays primed
    assert_eq!(h.loopback.in_flight(StreamHandle(1)), 3);
}

#[test]
fn test_exhausted_pool_does_not_advance() {
    // Two streams primed with three buffers each need six; only four exist
    let mut h = Harness::new(2, 4);
    h.start();

    let s1 = StreamHandle(1);
    assert_eq!(h.loopback.in_flight(StreamHandle(0)), 3);
    assert_eq!(h.loopback.in_flight(s1), 1);

    let cursor = h.engine.cursor(s1).unwrap().clone();
    assert_eq!(h.engine.send_frame(s1), SendOutcome::PoolExhausted);
    h.engine.on_sent(s1);

    let after = h.engine.cursor(s1).unwrap();
    assert_eq!(after.position(), cursor.position());
    assert_eq!(after.sequence_number(), 1);
    assert_eq!(h.engine.state(s1), Some(StreamState::Streaming));
    assert!(h.loopback.pool().exhausted_count() >= 4);
}

#[test]
fn test_submit_failure_stalls_stream() {
    let mut h = Harness::new(1, 3);
    h.start();
    h.loopback.set_fail_submits(true);

    // The three queued SDUs drain, each refill fails
    for _ in 0..3 {
        h.step();
    }
    assert_eq!(h.loopback.in_flight(StreamHandle(0)), 0);
    assert_eq!(h.loopback.pool().available(), 3);

    // Nothing is left to trigger another send
    h.loopback.set_fail_submits(false);
    for _ in 0..5 {
        h.step();
    }
    assert_eq!(h.delivered(0).len(), 3);
    let summary = h.engine.summary();
    assert_eq!(summary.streams[0].sequence_number, 3);
    assert_eq!(summary.streams[0].submit_failures, 3);
}

#[test]
fn test_run_on_engine_thread() {
    let setup = setup_broadcast_source(&config(2), vec![container(); 2]).unwrap();
    let (tx, rx) = event_channel();
    let loopback = Arc::new(IsoLoopback::new(2, setup.tx_pool(), tx));
    let mut engine = setup.into_engine(loopback.clone());

    let handle = std::thread::spawn(move || engine.run(&rx));

    loopback.start_all();
    let mut delivered = 0;
    while delivered < 40 {
        delivered += loopback.tick();
        std::thread::yield_now();
    }
    loopback.stop_all(0x16);

    let summary = handle.join().unwrap().unwrap();
    assert!(summary.streams.iter().all(|s| s.state == StreamState::Stopped));
    assert!(summary.frames_sent() >= 40);
}
