//! End-to-end host sessions: framed requests in, framed responses out, packets
//! on the simulated radio.

use rc_rf_bridge::controls::{CHAN_MAX_VALUE, CHAN_MIN_VALUE, NUM_CONTROLS};
use rc_rf_bridge::engine::Engine;
use rc_rf_bridge::hostlink::decoder::{decode_response, Response};
use rc_rf_bridge::hostlink::encoder::{encode_request, encode_response};
use rc_rf_bridge::hostlink::protocol::Opcode;
use rc_rf_bridge::hostlink::HostLink;
use rc_rf_bridge::protocol::v2x2::V2x2State;
use rc_rf_bridge::protocol::{INFO_CHANNEL, INFO_PACKET_CTR, INFO_STATE};
use rc_rf_bridge::radio::simulated::{RadioMonitor, SimulatedRadio};
use rc_rf_bridge::serial::HostSerial;
use tokio_test::io::Builder;

const CONTROLLER_ID: u32 = 0x1234_5678;
const V2X2_WITH_BIND: u32 = 0x0000_0001;

struct Session {
    link: HostLink<Engine<SimulatedRadio>>,
    monitor: RadioMonitor,
    now: u64,
}

impl Session {
    fn new(ack: bool) -> Self {
        let radio = SimulatedRadio::new(ack);
        let monitor = radio.monitor();
        Self {
            link: HostLink::new(Engine::new(radio, CONTROLLER_ID)),
            monitor,
            now: 0,
        }
    }

    /// Send one request and return its single response.
    fn request(&mut self, opcode: Opcode, payload: &[u8]) -> Response {
        self.link.handler_mut().sync_clock(self.now);
        let responses = self.link.feed_all(&encode_request(opcode as u8, payload));
        assert_eq!(responses.len(), 1, "one response per request");
        decode_response(&responses[0]).unwrap()
    }

    fn info(&mut self, field: u8) -> Vec<u8> {
        let response = self.request(Opcode::GetInfo, &[field]);
        assert!(response.ok, "GET_INFO({}) rejected", field);
        response.payload
    }

    /// Run every scheduled protocol step up to and including `until`.
    fn run_until(&mut self, until: u64) {
        while let Some(deadline) = self.link.handler().next_deadline() {
            if deadline > until {
                break;
            }
            self.now = deadline;
            self.link.handler_mut().poll(self.now);
        }
        self.now = self.now.max(until);
    }

    fn inject_throttle(&mut self, throttle: i32) {
        let mut payload = [0u8; NUM_CONTROLS * 2];
        payload[0..2].copy_from_slice(&(throttle as i16).to_be_bytes());
        assert!(self.request(Opcode::InjectControls, &payload).ok);
    }
}

#[test]
fn test_bind_then_data_session() {
    let mut session = Session::new(true);

    let ready = session.request(Opcode::Ready, &[]);
    assert!(ready.ok);
    assert_eq!(ready.payload, vec![NUM_CONTROLS as u8]);

    assert!(session.request(Opcode::SetRfProtocol, &V2X2_WITH_BIND.to_be_bytes()).ok);
    assert!(session.request(Opcode::StartRf, &[]).ok);
    assert_eq!(session.info(INFO_STATE), vec![V2x2State::Init as u8]);

    // Initial wait plus the bootstrap step
    session.run_until(50);
    assert_eq!(session.info(INFO_STATE), vec![V2x2State::Bind as u8]);
    assert_eq!(session.monitor.sent_count(), 0);

    // 1000 acknowledged bind packets, 4ms apart
    session.run_until(50 + 1 + 1000 * 4);
    assert_eq!(session.info(INFO_STATE), vec![V2x2State::Data as u8]);

    let counter = session.info(INFO_PACKET_CTR);
    assert_eq!(counter.len(), 4);
    let counter = u32::from_be_bytes([counter[0], counter[1], counter[2], counter[3]]);
    assert!(counter >= 1000, "packet counter {}", counter);

    let channel = session.info(INFO_CHANNEL);
    assert_eq!(channel.len(), 1);
    assert_ne!(channel[0] % 16, 0);
}

#[test]
fn test_injected_throttle_reaches_packets() {
    let mut session = Session::new(true);
    assert!(session.request(Opcode::SetRfProtocol, &0u32.to_be_bytes()).ok);
    assert!(session.request(Opcode::StartRf, &[]).ok);
    session.run_until(51);
    assert_eq!(session.info(INFO_STATE), vec![V2x2State::Data as u8]);

    session.inject_throttle(CHAN_MAX_VALUE);
    session.run_until(session.now + 8);
    assert_eq!(session.monitor.last_packet().unwrap().payload[0], 0xFF);

    session.inject_throttle(CHAN_MIN_VALUE);
    session.run_until(session.now + 8);
    assert_eq!(session.monitor.last_packet().unwrap().payload[0], 0x00);
}

#[test]
fn test_info_channel_matches_last_packet() {
    let mut session = Session::new(true);
    assert!(session.request(Opcode::SetRfProtocol, &0u32.to_be_bytes()).ok);
    assert!(session.request(Opcode::StartRf, &[]).ok);

    // Bootstrap at 50ms, then one packet every 4ms from 51ms
    for sent in 1..=4u64 {
        session.run_until(51 + (sent - 1) * 4);
        assert_eq!(session.monitor.sent_count() as u64, sent);
        let last = session.monitor.last_packet().unwrap();
        assert_eq!(session.info(INFO_CHANNEL), vec![last.rf_channel], "after {} packets", sent);
    }
}

#[test]
fn test_unacknowledged_radio_holds_bind() {
    let mut session = Session::new(false);
    assert!(session.request(Opcode::SetRfProtocol, &V2X2_WITH_BIND.to_be_bytes()).ok);
    assert!(session.request(Opcode::StartRf, &[]).ok);

    session.run_until(5000);
    assert_eq!(session.info(INFO_STATE), vec![V2x2State::Bind as u8]);
    assert_eq!(session.monitor.sent_count(), 1);

    session.monitor.set_ack(true);
    session.run_until(5000 + 2 * 4);
    assert!(session.monitor.sent_count() > 1);
}

#[test]
fn test_corrupted_header_then_valid_frame() {
    let mut session = Session::new(true);

    let mut stream = vec![b'$', b'M', b'X', 0x00, b'$', b'M', b'<', 40, b'<'];
    stream.extend_from_slice(&encode_request(Opcode::Ready as u8, &[]));

    let responses = session.link.feed_all(&stream);
    assert_eq!(responses.len(), 1);
    let response = decode_response(&responses[0]).unwrap();
    assert!(response.ok);
    assert_eq!(response.opcode, Opcode::Ready as u8);
    assert_eq!(session.link.stats().acked, 1);
}

#[test]
fn test_bad_checksum_is_nak_and_not_dispatched() {
    let mut session = Session::new(true);
    assert!(session.request(Opcode::SetRfProtocol, &V2X2_WITH_BIND.to_be_bytes()).ok);

    let mut frame = encode_request(Opcode::StartRf as u8, &[]).to_vec();
    let last = frame.len() - 1;
    frame[last] ^= 0x55;

    let responses = session.link.feed_all(&frame);
    assert_eq!(responses.len(), 1);
    let response = decode_response(&responses[0]).unwrap();
    assert!(!response.ok);
    assert_eq!(response.opcode, Opcode::StartRf as u8);
    assert!(!session.link.handler().is_running());
}

#[test]
fn test_rejected_commands() {
    let mut session = Session::new(true);

    // Nothing selected yet
    assert!(!session.request(Opcode::StartRf, &[]).ok);
    // Not running
    assert!(!session.request(Opcode::GetInfo, &[INFO_STATE]).ok);
    assert!(!session.request(Opcode::Test, &[]).ok);
    // Unsupported protocol
    assert!(!session.request(Opcode::SetRfProtocol, &0x0000_0500u32.to_be_bytes()).ok);
    // Wrong payload length
    assert!(!session.request(Opcode::InjectControls, &[0; 4]).ok);

    let responses = session.link.feed_all(&encode_request(77, &[]));
    assert!(!decode_response(&responses[0]).unwrap().ok);

    assert!(session.request(Opcode::SetRfProtocol, &V2X2_WITH_BIND.to_be_bytes()).ok);
    assert!(session.request(Opcode::StartRf, &[]).ok);
    assert!(!session.request(Opcode::GetInfo, &[9]).ok);
    assert!(session.request(Opcode::Test, &[3]).ok);

    assert!(session.request(Opcode::StopRf, &[]).ok);
    assert!(!session.request(Opcode::GetInfo, &[INFO_STATE]).ok);
    assert_eq!(session.monitor.reset_count(), 1);
}

#[test]
fn test_restart_begins_new_bind() {
    let mut session = Session::new(true);
    assert!(session.request(Opcode::SetRfProtocol, &V2X2_WITH_BIND.to_be_bytes()).ok);
    assert!(session.request(Opcode::StartRf, &[]).ok);
    session.run_until(200);

    assert!(session.request(Opcode::StartRf, &[]).ok);
    assert_eq!(session.info(INFO_STATE), vec![V2x2State::Init as u8]);
    assert_eq!(session.info(INFO_PACKET_CTR), vec![0, 0, 0, 0]);
}

#[tokio::test]
async fn test_session_over_serial_stream() {
    let mut session = Session::new(true);
    let ready = encode_request(Opcode::Ready as u8, &[]);
    let ack = encode_response(true, Opcode::Ready as u8, &[NUM_CONTROLS as u8]);

    let stream = Builder::new().read(&ready).write(&ack).build();
    let mut serial = HostSerial::from_stream(stream, "mock");

    let mut buf = [0u8; 64];
    let n = serial.read_bytes(&mut buf).await.unwrap();
    for response in session.link.feed_all(&buf[..n]) {
        serial.send_response(&response).await.unwrap();
    }
}
