//! Built-in workloads for the local executor.
//!
//! Both simulate CPU-bound request handling: `hello` greets a name,
//! `process-data` scales its work with the size of the payload.

use std::hint::black_box;
use std::sync::Arc;
use std::time::Instant;

use serde_json::{Value, json};

use crate::error::{ExecutorError, ExecutorResult};

/// A synchronous unit of work. Runs on the blocking pool.
pub type Workload = Arc<dyn Fn(&Value) -> ExecutorResult<String> + Send + Sync>;

pub const HELLO: &str = "hello";
pub const PROCESS_DATA: &str = "process-data";

const HELLO_ITERATIONS: u64 = 1_000_000;
const PROCESS_ITERATIONS_PER_BYTE: u64 = 10_000;
const PROCESS_MAX_ITERATIONS: u64 = 10_000_000;

/// Greets `payload` (a string, or an object with a `name` field).
pub fn hello(payload: &Value) -> ExecutorResult<String> {
    let name = match payload {
        Value::String(s) if !s.is_empty() => s.as_str(),
        Value::Object(map) => map.get("name").and_then(Value::as_str).unwrap_or("world"),
        Value::Null => "world",
        Value::String(_) => "world",
        other => {
            return Err(ExecutorError::InvalidPayload(format!(
                "hello expects a name, got {other}"
            )));
        }
    };

    let start = Instant::now();
    spin(HELLO_ITERATIONS);
    Ok(format!(
        "Hello, {name}! (Processed in {}ms)",
        start.elapsed().as_millis()
    ))
}

/// Burns CPU proportional to the serialized payload size.
pub fn process_data(payload: &Value) -> ExecutorResult<String> {
    let start = Instant::now();
    let complexity = match payload {
        Value::String(s) => s.len(),
        other => other.to_string().len(),
    } as u64;

    spin((complexity * PROCESS_ITERATIONS_PER_BYTE).min(PROCESS_MAX_ITERATIONS));

    let result = json!({
        "processed": true,
        "originalData": payload,
        "processingTime": start.elapsed().as_millis() as u64,
    });
    Ok(result.to_string())
}

fn spin(iterations: u64) -> u64 {
    let mut counter: u64 = 0;
    for i in 0..iterations {
        counter = black_box(counter.wrapping_add(i));
    }
    counter
}
