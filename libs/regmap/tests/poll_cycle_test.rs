//! Poll cycle against the in-memory transport

#![allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable

use std::time::Duration;

use regmap::devices::energy_meter::{blocks, STATUS_PHASE_LOSS};
use regmap::devices::{EnergyMeter, MeterField, Phase};
use regmap::testing::MemoryTransport;
use regmap::{
    BitFlags16, DevicePoller, PollConfig, RegisterCodec, RegisterOrder, SharedModel, StatusCode,
    TransportError,
};

/// Meter bank with L1 at 230 V / 10 A / 2300 W and 42 kWh imported
fn loaded_meter() -> MemoryTransport {
    let transport = MemoryTransport::new();
    let mut inst = Vec::new();
    for value in [230.0f32, 231.0, 229.0, 10.0, 0.0, 0.0, 2300.0, 0.0, 0.0, 50.0] {
        inst.extend(value.encode(RegisterOrder::CDAB));
    }
    transport.load(0, &inst);
    transport.load(256, &42_000u64.encode(RegisterOrder::ABCD));
    transport.load(512, &regmap::bytes::encode_text("SN-0001", 8, RegisterOrder::ABCD));
    transport.load(528, &[BitFlags16::from_bits(1 << STATUS_PHASE_LOSS).bits()]);
    transport.load(768, &[5]);
    transport
}

fn poller(transport: &MemoryTransport) -> DevicePoller<EnergyMeter, MemoryTransport> {
    let config = PollConfig {
        poll_interval_ms: 100,
        request_timeout_ms: 50,
    };
    DevicePoller::new(SharedModel::new().unwrap(), transport.clone(), config).unwrap()
}

#[tokio::test]
async fn test_full_cycle_publishes_good_snapshot() {
    let transport = loaded_meter();
    let mut poller = poller(&transport);
    assert!(poller.model().status().is_uncertain());

    assert_eq!(poller.poll_once().await.unwrap(), StatusCode::Good);

    let model = poller.model().clone();
    model.read(|m| {
        assert!(m.is_good());
        assert_eq!(m.voltage(Phase::L2), 231.0);
        assert_eq!(m.power(Phase::L1), 2300.0);
        assert_eq!(m.import_kwh(), 42.0);
        assert_eq!(m.serial_number(), "SN-0001");
        assert!(m.status_flags().get(STATUS_PHASE_LOSS));
    });

    let snapshot = model.snapshot();
    assert_eq!(snapshot.status, StatusCode::Good);
    assert!(snapshot.refreshed_at.is_some());
    let frequency = snapshot.field("Frequency").unwrap();
    assert_eq!(frequency.display, "50.00");
    assert_eq!(frequency.unit, "Hz");
}

#[tokio::test]
async fn test_read_plan_is_one_request_per_block() {
    let transport = loaded_meter();
    let poller = poller(&transport);
    let plan: Vec<_> = poller.read_plan().iter().map(|r| r.block).collect();
    assert_eq!(
        plan,
        vec![
            blocks::INSTANTANEOUS,
            blocks::ENERGY,
            blocks::IDENTIFICATION,
            blocks::CONFIG
        ]
    );
}

#[tokio::test]
async fn test_failure_mid_cycle_keeps_previous_values() {
    let transport = loaded_meter();
    let mut poller = poller(&transport);
    poller.poll_once().await.unwrap();

    // New voltages land in the bank, but the cycle's first read fails
    let mut inst = Vec::new();
    for value in [240.0f32, 240.0, 240.0] {
        inst.extend(value.encode(RegisterOrder::CDAB));
    }
    transport.load(0, &inst);
    transport.fail_next(TransportError::communication("connection reset"));
    transport.fail_next(TransportError::DeviceException(4));

    let code = poller.poll_once().await.unwrap();
    assert_eq!(code, StatusCode::BadCommunicationError);
    poller.model().read(|m| {
        assert!(m.is_bad());
        assert_eq!(m.voltage(Phase::L1), 230.0);
    });

    // The queued device exception fails the following cycle
    assert_eq!(poller.poll_once().await.unwrap(), StatusCode::BadDeviceFailure);

    assert_eq!(poller.poll_once().await.unwrap(), StatusCode::Good);
    assert_eq!(poller.model().read(|m| m.voltage(Phase::L1)), 240.0);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_marks_bad_timeout() {
    let transport = loaded_meter();
    let mut poller = poller(&transport);
    transport.stall_next();

    assert_eq!(poller.poll_once().await.unwrap(), StatusCode::BadTimeout);
    assert_eq!(poller.model().status().code(), StatusCode::BadTimeout);
}

#[tokio::test]
async fn test_write_then_read_back() {
    let transport = loaded_meter();
    let mut poller = poller(&transport);

    poller.model().write(|m| m.set_ct_ratio(40)).unwrap();
    assert_eq!(
        poller.write(&[MeterField::CtRatio]).await.unwrap(),
        StatusCode::Good
    );
    assert_eq!(transport.registers(768, 1), vec![40]);

    poller.poll_once().await.unwrap();
    assert_eq!(
        poller.model().read(|m| m.display(MeterField::CtRatio)),
        "40"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_readers_see_whole_cycles() {
    let transport = loaded_meter();
    let mut poller = poller(&transport);
    let model = poller.model().clone();

    let reader = tokio::spawn(async move {
        for _ in 0..500 {
            let (l1, l3) = model.read(|m| (m.voltage(Phase::L1), m.voltage(Phase::L3)));
            // Both phases are always written together below
            assert!(l1 == 0.0 || l3 == l1 - 1.0 || (l1 == 230.0 && l3 == 229.0));
            tokio::task::yield_now().await;
        }
    });

    for step in 0..50u16 {
        let v = 300.0 + f32::from(step);
        let mut inst = Vec::new();
        for value in [v, v, v - 1.0] {
            inst.extend(value.encode(RegisterOrder::CDAB));
        }
        transport.load(0, &inst);
        poller.poll_once().await.unwrap();
        tokio::time::sleep(Duration::from_micros(50)).await;
    }

    reader.await.unwrap();
    assert!(poller.model().status().is_good());
}
