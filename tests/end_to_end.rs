//! End-to-end wire tests: raw bytes in, delimited JSON lines out, through
//! the full framer → decoder → dispatcher → encoder path against the
//! simulated board.

use picobridge::bridge::{run_bridge, ByteTransport};
use picobridge::config::BridgeConfig;
use picobridge::dispatch::Dispatcher;
use picobridge::hardware::SimBoard;
use serde_json::Value;
use std::collections::VecDeque;
use std::io;
use tokio_util::sync::CancellationToken;

/// Transport fed from a script of read chunks; writes are captured.
/// Reads return one chunk per poll pass, then end-of-stream.
struct ScriptedTransport {
    chunks: VecDeque<Vec<u8>>,
    out: Vec<u8>,
}

impl ScriptedTransport {
    fn new(chunks: Vec<Vec<u8>>) -> Self {
        Self {
            chunks: chunks.into(),
            out: Vec::new(),
        }
    }
}

impl ByteTransport for ScriptedTransport {
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.chunks.pop_front() {
            Some(mut chunk) => {
                let n = chunk.len().min(buf.len());
                buf[..n].copy_from_slice(&chunk[..n]);
                if chunk.len() > n {
                    self.chunks.push_front(chunk.split_off(n));
                }
                Ok(n)
            }
            None => Err(io::Error::new(io::ErrorKind::UnexpectedEof, "script done")),
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.out.extend_from_slice(bytes);
        Ok(())
    }
}

/// Run the bridge over the scripted chunks and return every emitted line
/// (the leading `ready` event included) as parsed JSON.
fn run_wire(chunks: Vec<Vec<u8>>, config: BridgeConfig) -> Vec<Value> {
    let board = SimBoard::new(&config.board_name);
    let mut dispatcher = Dispatcher::new(Box::new(board), config).expect("dispatcher builds");
    let mut transport = ScriptedTransport::new(chunks);
    run_bridge(&mut transport, &mut dispatcher, CancellationToken::new())
        .expect("bridge loop runs to end-of-script");

    transport
        .out
        .split(|&b| b == b'\n')
        .filter(|line| !line.is_empty())
        .map(|line| serde_json::from_slice(line).expect("output lines are JSON"))
        .collect()
}

fn run_lines(lines: &[&str]) -> Vec<Value> {
    let wire = lines
        .iter()
        .map(|l| format!("{l}\n").into_bytes())
        .collect();
    run_wire(wire, BridgeConfig::default())
}

#[test]
fn ready_event_announces_board_and_tools() {
    let lines = run_lines(&[]);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["event"], "ready");
    assert_eq!(lines[0]["data"]["board"], "pico-sim");
    let tools = lines[0]["data"]["tools"].as_array().unwrap();
    assert!(tools.iter().any(|t| t == "gpio_write"));
}

#[test]
fn gpio_write_scenario() {
    let lines = run_lines(&[r#"{"type":"exec","tool":"gpio_write","params":{"pin":25,"value":1}}"#]);
    assert_eq!(
        lines[1],
        serde_json::json!({"status":"ok","data":{"result":{"pin":25,"value":1}}})
    );
}

#[test]
fn gpio_write_missing_value_scenario() {
    let lines = run_lines(&[r#"{"type":"exec","tool":"gpio_write","params":{"pin":25}}"#]);
    assert_eq!(lines[1]["status"], "error");
    assert_eq!(lines[1]["error"]["code"], "InvalidParams");
    assert!(lines[1]["error"]["message"]
        .as_str()
        .unwrap()
        .contains("value"));
}

#[test]
fn adc_read_voltage_scenario() {
    let lines = run_lines(&[r#"{"type":"read","tool":"adc_read_voltage","params":{"channel":0}}"#]);
    assert_eq!(lines[1]["status"], "ok");
    let voltage = lines[1]["data"]["result"]["voltage"].as_f64().unwrap();
    assert!((0.0..=3.3).contains(&voltage), "voltage {voltage} off-scale");
}

#[test]
fn nonexistent_tool_scenario() {
    let lines = run_lines(&[r#"{"type":"exec","tool":"nonexistent_tool","params":{}}"#]);
    assert_eq!(lines[1]["status"], "error");
    assert_eq!(lines[1]["error"]["code"], "ToolNotFound");
}

#[test]
fn split_reads_match_single_read() {
    let request = br#"{"type":"exec","tool":"gpio_write","params":{"pin":25,"value":1}}"#;
    let mut wire = request.to_vec();
    wire.push(b'\n');

    let whole = run_wire(vec![wire.clone()], BridgeConfig::default());
    let halves = run_wire(
        vec![wire[..20].to_vec(), wire[20..].to_vec()],
        BridgeConfig::default(),
    );
    assert_eq!(whole, halves);
}

#[test]
fn one_response_per_request_in_order() {
    let lines = run_lines(&[
        r#"{"type":"status","id":1}"#,
        r#"{"type":"exec","tool":"gpio_write","params":{"pin":2,"value":1},"id":2}"#,
        r#"{"type":"exec","tool":"bogus","params":{},"id":3}"#,
        r#"{"type":"status","id":4}"#,
    ]);
    // ready + 4 responses, correlation tokens in request order.
    assert_eq!(lines.len(), 5);
    for (i, expected) in [1, 2, 3, 4].iter().enumerate() {
        assert_eq!(lines[i + 1]["id"], serde_json::json!(expected));
    }
}

#[test]
fn oversize_line_reports_and_stream_recovers() {
    let mut config = BridgeConfig::default();
    config.max_frame_bytes = 64;

    let mut wire = vec![b'x'; 200];
    wire.push(b'\n');
    wire.extend_from_slice(br#"{"type":"status"}"#);
    wire.push(b'\n');

    let lines = run_wire(vec![wire], config);
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[1]["status"], "error");
    assert_eq!(lines[1]["error"]["code"], "FrameTooLarge");
    assert_eq!(lines[2]["status"], "ok");
}

#[test]
fn malformed_frame_gets_decode_error_and_next_request_works() {
    let lines = run_lines(&[
        "this is not json",
        r#"{"type":"exec","tool":"gpio_read","params":{"pin":7}}"#,
    ]);
    assert_eq!(lines[1]["error"]["code"], "DecodeError");
    assert_eq!(lines[2]["status"], "ok");
    assert_eq!(lines[2]["data"]["result"]["pin"], 7);
}

#[test]
fn huge_transfer_length_is_rejected_and_loop_survives() {
    let lines = run_lines(&[
        r#"{"type":"read","tool":"i2c_read","params":{"address":80,"length":50000000}}"#,
        r#"{"type":"status"}"#,
    ]);
    assert_eq!(lines[1]["status"], "error");
    assert_eq!(lines[1]["error"]["code"], "OutOfRange");
    assert_eq!(lines[2]["status"], "ok");
}

#[test]
fn register_alias_over_the_wire() {
    let lines = run_lines(&[
        r#"{"type":"register","tool":"led_on","params":{"target":"gpio_write","defaults":{"pin":25,"value":1}}}"#,
        r#"{"type":"exec","tool":"led_on","params":{}}"#,
        r#"{"type":"status"}"#,
    ]);
    assert_eq!(lines[1]["status"], "ok");
    assert_eq!(lines[1]["data"]["result"]["registered"], "led_on");
    assert_eq!(
        lines[2]["data"]["result"],
        serde_json::json!({"pin": 25, "value": 1})
    );
    let tools = lines[3]["data"]["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.last().unwrap(), "led_on");
}

#[test]
fn status_is_side_effect_free() {
    let before = run_lines(&[r#"{"type":"status"}"#]);
    let after = run_lines(&[
        r#"{"type":"exec","tool":"gpio_write","params":{"pin":5,"value":1}}"#,
        r#"{"type":"status"}"#,
    ]);
    assert_eq!(
        before[1]["data"]["result"]["tools"],
        after[2]["data"]["result"]["tools"]
    );
}
