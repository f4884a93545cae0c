//! Domain-specific assertion macros for tfv harnesses.
//!
//! These add context-rich failure messages that make it clear which record
//! and which field broke, rather than a bare `left != right`.

// ---------------------------------------------------------------------------
// Record assertions
// ---------------------------------------------------------------------------

/// Assert that a normalized record has a specific level.
///
/// ```rust
/// assert_level!(record, Level::Error);
/// ```
#[macro_export]
macro_rules! assert_level {
    ($record:expr, $level:expr) => {{
        let record: &tfv::NormalizedLogRecord = &$record;
        let expected: tfv::Level = $level;
        if record.level != expected {
            panic!(
                "assert_level! failed:\n  message:  {:?}\n  expected: {}\n  actual:   {}",
                record.message, expected, record.level
            );
        }
    }};
}

/// Assert that a normalized record carries a specific embedded payload.
///
/// ```rust
/// assert_payload!(record, "tf_http_req_body", json!({"a": 1}));
/// ```
#[macro_export]
macro_rules! assert_payload {
    ($record:expr, $key:expr, $value:expr) => {{
        let record: &tfv::NormalizedLogRecord = &$record;
        let key: &str = $key;
        let expected: serde_json::Value = $value;
        match record.embedded_payloads.get(key) {
            Some(Some(actual)) if *actual == expected => {}
            Some(actual) => panic!(
                "assert_payload! failed:\n  embedded_payloads[{:?}]\n  expected: {}\n  actual:   {:?}",
                key, expected, actual
            ),
            None => panic!(
                "assert_payload! failed: key {:?} absent.\n  Present: {:?}",
                key,
                record.embedded_payloads.keys().collect::<Vec<_>>()
            ),
        }
    }};
}

// ---------------------------------------------------------------------------
// Result-set assertions
// ---------------------------------------------------------------------------

/// Assert that a slice of stored logs contains exactly these messages, in
/// order.
#[macro_export]
macro_rules! assert_messages {
    ($logs:expr, [$($msg:expr),* $(,)?]) => {{
        let actual: Vec<&str> = $logs.iter().map(|l: &tfv::StoredLog| l.record.message.as_str()).collect();
        let expected: Vec<&str> = vec![$($msg),*];
        pretty_assertions::assert_eq!(actual, expected, "assert_messages! failed");
    }};
}

/// Assert that every stored log satisfies a predicate, naming the first
/// offender.
#[macro_export]
macro_rules! assert_all {
    ($logs:expr, |$l:ident| $pred:expr) => {{
        for $l in $logs.iter() {
            let $l: &tfv::StoredLog = $l;
            if !($pred) {
                panic!(
                    "assert_all! failed on id={} message={:?}: {}",
                    $l.id,
                    $l.record.message,
                    stringify!($pred)
                );
            }
        }
    }};
}
