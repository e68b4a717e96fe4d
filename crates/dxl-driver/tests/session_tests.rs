//! 会话层集成测试
//!
//! 串口后端跑在内存链路上，代理后端跑在模拟远端上，两者共用同一组语义检查。

mod common;

use common::{FakeProxy, FakeServoBus, id};
use dxl_driver::{DriverConfig, DriverError, DriverSession, ErrorStatus, Instruction, StatusError};
use dxl_protocol::control_table::{GOAL_POSITION, TORQUE_ENABLE};
use proptest::prelude::*;
use std::sync::Arc;
use std::thread;

fn both_backends(online: &[u8]) -> Vec<DriverSession> {
    vec![FakeServoBus::new(online).session(), FakeProxy::new(online).session()]
}

// ============================================================
// 寄存器读写
// ============================================================

#[test]
fn test_set_then_get_torque_enable() {
    for session in both_backends(&[5]) {
        let status = session.set_reg(id(5), 24, &[1]).unwrap();
        assert_eq!(status, ErrorStatus::Ok);

        let values = session.get_reg(id(5), 24, 1).unwrap();
        assert_eq!(values, vec![1], "backend {}", session.kind());
        assert_eq!(session.last_error(), ErrorStatus::Ok);
    }
}

#[test]
fn test_get_reg_returns_requested_length() {
    for session in both_backends(&[1]) {
        session.set_reg(id(1), 36, &[0x00, 0x02]).unwrap();
        let values = session.get_reg(id(1), 36, 2).unwrap();
        assert_eq!(values, vec![0x00, 0x02]);

        let values = session.get_reg(id(1), 0, 8).unwrap();
        assert_eq!(values.len(), 8);
    }
}

#[test]
fn test_short_read_reply_is_frame_corrupt() {
    let proxy = FakeProxy::new(&[1]);
    let session = proxy.session();
    proxy.state.lock().unwrap().truncate_next_read = true;

    let err = session.get_reg(id(1), 36, 2).unwrap_err();
    assert!(matches!(err, DriverError::FrameCorrupt(_)));
    assert_eq!(session.last_error(), ErrorStatus::FrameCorrupt);

    // 下一次成功的操作覆盖粘滞状态
    session.get_reg(id(1), 36, 2).unwrap();
    assert_eq!(session.last_error(), ErrorStatus::Ok);
}

#[test]
fn test_corrupt_serial_reply() {
    let bus = FakeServoBus::new(&[1]);
    let session = bus.session();
    bus.corrupt_next_reply();

    let err = session.get_reg(id(1), 43, 1).unwrap_err();
    assert!(matches!(err, DriverError::FrameCorrupt(_)));
    assert_eq!(session.last_error(), ErrorStatus::FrameCorrupt);
}

#[test]
fn test_actuator_error_is_recorded() {
    let bus = FakeServoBus::new(&[3]);
    let proxy = FakeProxy::new(&[3]);
    bus.set_error_byte(0x04);
    proxy.set_error_byte(0x04);

    for session in [bus.session(), proxy.session()] {
        let overheating = StatusError::from_byte(0x04);

        let status = session.set_reg(id(3), 30, &[0, 2]).unwrap();
        assert_eq!(status, ErrorStatus::Actuator(overheating));

        let err = session.get_reg(id(3), 43, 1).unwrap_err();
        match err {
            DriverError::Actuator { id: failed, status } => {
                assert_eq!(failed, id(3));
                assert_eq!(status, overheating);
            },
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(session.last_error(), ErrorStatus::Actuator(overheating));
    }
}

#[test]
fn test_missing_actuator_times_out() {
    for session in both_backends(&[1]) {
        let err = session.get_reg(id(9), 36, 2).unwrap_err();
        assert!(matches!(err, DriverError::Timeout));
        assert_eq!(session.last_error(), ErrorStatus::Timeout);
    }
}

#[test]
fn test_broadcast_write_has_no_reply() {
    let bus = FakeServoBus::new(&[1, 2]);
    let session = bus.session();

    let status = session.set_reg(dxl_driver::ActuatorId::BROADCAST, 24, &[1]).unwrap();
    assert_eq!(status, ErrorStatus::Ok);
    assert_eq!(bus.frames()[0], vec![0xFF, 0xFF, 0xFE, 0x04, 0x03, 0x18, 0x01, 0xE1]);
    assert_eq!(bus.register(1, 24), 1);
    assert_eq!(bus.register(2, 24), 1);
}

// ============================================================
// SYNC_WRITE
// ============================================================

#[test]
fn test_sync_write_proxy_request() {
    let proxy = FakeProxy::new(&[1, 2]);
    let session = proxy.session();

    let status = session
        .sync_write(30, vec![(id(1), vec![100, 0]), (id(2), vec![150, 0])])
        .unwrap();
    assert_eq!(status, ErrorStatus::Ok);

    let requests = proxy.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0], vec![0x83, 30, 1, 100, 0, 2, 150, 0]);
    assert_eq!(proxy.register(2, 30), 150);
}

#[test]
fn test_sync_write_serial_frame() {
    let bus = FakeServoBus::new(&[1, 2]);
    let session = bus.session();

    session
        .sync_write(GOAL_POSITION.address, [(id(1), [100u8, 0]), (id(2), [150u8, 0])])
        .unwrap();

    assert_eq!(
        bus.frames(),
        vec![vec![
            0xFF, 0xFF, 0xFE, 0x0A, 0x83, 0x1E, 0x02, 0x01, 0x64, 0x00, 0x02, 0x96, 0x00, 0x57
        ]]
    );
    assert_eq!(bus.register(1, 30), 100);
    assert_eq!(bus.register(2, 30), 150);
}

#[test]
fn test_non_uniform_batch_does_no_io() {
    let bus = FakeServoBus::new(&[1, 2]);
    let proxy = FakeProxy::new(&[1, 2]);
    let serial_session = bus.session();
    let proxy_session = proxy.session();

    for session in [&serial_session, &proxy_session] {
        // 先制造一个非 Ok 的粘滞状态，确认批量校验失败不会覆盖它
        session.get_reg(id(7), 0, 1).unwrap_err();

        let err = session
            .sync_write(30, vec![(id(1), vec![100, 0]), (id(2), vec![150])])
            .unwrap_err();
        assert!(matches!(err, DriverError::MalformedBatch(_)));
        assert_eq!(session.last_error(), ErrorStatus::Timeout);
    }

    // 只有用来制造超时的那一次读
    assert_eq!(bus.frames().len(), 1);
    assert_eq!(proxy.requests().len(), 1);
}

#[test]
fn test_empty_batch_rejected() {
    let session = FakeProxy::new(&[]).session();
    let err = session
        .sync_write(30, Vec::<(dxl_driver::ActuatorId, Vec<u8>)>::new())
        .unwrap_err();
    assert!(matches!(err, DriverError::MalformedBatch(_)));
}

proptest! {
    #[test]
    fn prop_sync_write_request_length(
        count in 1usize..8,
        values in prop::collection::vec(any::<u8>(), 2),
    ) {
        let proxy = FakeProxy::new(&[]);
        let session = proxy.session();
        let entries: Vec<_> = (1..=count as u8).map(|raw| (id(raw), values.clone())).collect();

        session.sync_write(30, entries).unwrap();

        let requests = proxy.requests();
        // [0x83, address] + count * (id + width)
        prop_assert_eq!(requests[0].len(), 2 + count * (1 + 2));
    }

    #[test]
    fn prop_read_length_matches(length in 1u8..=32) {
        let session = FakeServoBus::new(&[4]).session();
        let values = session.get_reg(id(4), 0, length).unwrap();
        prop_assert_eq!(values.len(), length as usize);
    }
}

// ============================================================
// 交换顺序与并发
// ============================================================

#[test]
fn test_sequential_set_reg_two_exchanges_in_order() {
    let proxy = FakeProxy::new(&[5]);
    let session = proxy.session();

    session.set_reg(id(5), 30, &[0, 2]).unwrap();
    session.set_reg(id(5), 24, &[1]).unwrap();

    let requests = proxy.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0], vec![0x03, 5, 30, 2, 0, 2]);
    assert_eq!(requests[1], vec![0x03, 5, 24, 1, 1]);
}

#[test]
fn test_concurrent_callers_are_serialized() {
    let bus = FakeServoBus::new(&[1, 2, 3, 4]);
    let session = Arc::new(bus.session());

    let handles: Vec<_> = (1..=4u8)
        .map(|raw| {
            let session = Arc::clone(&session);
            thread::spawn(move || {
                for value in 0..20u8 {
                    session.set_reg(id(raw), 30, &[value, raw]).unwrap();
                    let read = session.get_reg(id(raw), 30, 2).unwrap();
                    assert_eq!(read, vec![value, raw]);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(bus.frames().len(), 4 * 20 * 2);
}

// ============================================================
// 便捷指令
// ============================================================

#[test]
fn test_ping_and_scan() {
    for session in both_backends(&[1, 4]) {
        assert!(session.ping(id(1)).unwrap());
        assert!(!session.ping(id(2)).unwrap());
        assert_eq!(session.last_error(), ErrorStatus::Timeout);

        let found = session.scan((1..=5).map(id)).unwrap();
        assert_eq!(found, vec![id(1), id(4)]);
    }
}

#[test]
fn test_reg_write_applies_on_action() {
    let bus = FakeServoBus::new(&[1, 2]);
    let session = bus.session();

    session.reg_write(id(1), 30, &[0x00, 0x01]).unwrap();
    session.reg_write(id(2), 30, &[0x00, 0x03]).unwrap();
    assert_eq!(bus.register(1, 31), 0);

    session.action(dxl_driver::ActuatorId::BROADCAST).unwrap();
    assert_eq!(bus.register(1, 31), 0x01);
    assert_eq!(bus.register(2, 31), 0x03);
    assert_eq!(bus.frames().last().unwrap(), &vec![0xFF, 0xFF, 0xFE, 0x02, 0x05, 0xFA]);
}

#[test]
fn test_relax_disables_torque() {
    for session in both_backends(&[1, 2, 3]) {
        for raw in 1..=3 {
            session.set_reg(id(raw), TORQUE_ENABLE.address, &[1]).unwrap();
        }
        let status = session.relax((1..=3).map(id)).unwrap();
        assert_eq!(status, ErrorStatus::Ok);
        for raw in 1..=3 {
            assert_eq!(session.get_reg(id(raw), TORQUE_ENABLE.address, 1).unwrap(), vec![0]);
        }
    }
}

#[test]
fn test_reset_and_raw_execute() {
    let proxy = FakeProxy::new(&[7]);
    let session = proxy.session();

    session.set_reg(id(7), 25, &[1]).unwrap();
    session.reset(id(7)).unwrap();
    assert_eq!(proxy.register(7, 25), 0);

    let reply = session.execute(id(7), Instruction::Ping, &[]).unwrap();
    assert!(reply.status.is_ok());
    assert_eq!(proxy.requests().last().unwrap(), &vec![0x01, 7]);
}

// ============================================================
// 生命周期
// ============================================================

#[test]
fn test_close_twice_keeps_last_error() {
    let proxy = FakeProxy::new(&[1]);
    let session = proxy.session();

    assert!(!session.ping(id(2)).unwrap());
    assert_eq!(session.last_error(), ErrorStatus::Timeout);

    session.close().unwrap();
    session.close().unwrap();
    assert!(!session.is_open());
    assert_eq!(session.last_error(), ErrorStatus::Timeout);
    assert_eq!(proxy.state.lock().unwrap().closed, 1);
}

#[test]
fn test_operations_after_close_fail() {
    for session in both_backends(&[1]) {
        session.set_reg(id(1), 24, &[1]).unwrap();
        session.close().unwrap();

        assert!(matches!(session.set_reg(id(1), 24, &[0]), Err(DriverError::SessionClosed)));
        assert!(matches!(session.get_reg(id(1), 24, 1), Err(DriverError::SessionClosed)));
        assert!(matches!(
            session.sync_write(30, [(id(1), [0u8, 0])]),
            Err(DriverError::SessionClosed)
        ));
        assert!(matches!(session.ping(id(1)), Err(DriverError::SessionClosed)));
        assert_eq!(session.last_error(), ErrorStatus::Ok);
    }
}

#[test]
fn test_drop_closes_endpoint() {
    let proxy = FakeProxy::new(&[1]);
    {
        let _session = proxy.session();
    }
    assert_eq!(proxy.state.lock().unwrap().closed, 1);
}

#[test]
fn test_descriptions() {
    let serial = FakeServoBus::new(&[]).session();
    assert_eq!(serial.description(), "fake @ 1000000");
    assert!(serial.capabilities().direct);

    let proxy = FakeProxy::new(&[]).session();
    assert_eq!(proxy.description(), "tcp://fake:5000");
    assert!(proxy.capabilities().interpolation);
}

// ============================================================
// 打开真实端点
// ============================================================

#[cfg(feature = "serial")]
#[test]
fn test_open_missing_serial_port() {
    let config = DriverConfig::serial("/dev/dxl-test-missing-port", 1_000_000);
    let err = dxl_driver::open(&config).unwrap_err();
    assert!(matches!(err, DriverError::Connection(_)));
}

#[cfg(feature = "zmq")]
#[test]
fn test_open_unreachable_proxy() {
    let mut config = DriverConfig::queue_proxy("tcp://127.0.0.1:1");
    config.queue_proxy.timeout_ms = 200;
    let err = dxl_driver::open(&config).unwrap_err();
    assert!(matches!(err, DriverError::Connection(_)));
}

#[test]
fn test_open_rejects_invalid_config() {
    let config = DriverConfig::serial("", 1_000_000);
    assert!(matches!(dxl_driver::open(&config), Err(DriverError::Config(_))));
}
