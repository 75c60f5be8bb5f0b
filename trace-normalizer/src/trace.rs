//! Data structures for backend trace lines

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

use crate::error::TraceError;

/// Opcode value of STOP
pub const OP_STOP: u8 = 0x00;

/// One structured log line as emitted by a backend
///
/// Every field defaults when absent. Summary lines such as
/// `{"output":"","gasUsed":"0x5208","time":120}` and result lines such as
/// `{"stateRoot":"0x..."}` therefore decode too, with `depth == 0`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StructLog {
    /// Program counter
    #[serde(deserialize_with = "de_u64")]
    pub pc: u64,
    /// Raw opcode
    #[serde(deserialize_with = "de_u8")]
    pub op: u8,
    /// Gas remaining before the step
    #[serde(deserialize_with = "de_u64")]
    pub gas: u64,
    /// Gas cost of the step
    #[serde(alias = "gasCost", deserialize_with = "de_u64")]
    pub cost: u64,
    /// Call depth, 1 for the outermost frame
    #[serde(deserialize_with = "de_u64")]
    pub depth: u64,
    /// Error reported for the step
    #[serde(deserialize_with = "de_error")]
    pub error: Option<String>,
    /// Stack items, bottom first, as minimal lowercase hex quantities
    #[serde(deserialize_with = "de_stack")]
    pub stack: Option<Vec<String>>,
    /// Memory snapshot
    #[serde(deserialize_with = "de_bytes")]
    pub memory: Option<Vec<u8>>,
    /// Return data of the last call
    #[serde(rename = "returnData", deserialize_with = "de_bytes")]
    pub return_data: Option<Vec<u8>>,
}

impl StructLog {
    /// Decode one raw trace line.
    ///
    /// Only JSON objects are accepted, arrays are not read positionally.
    pub fn parse(line: &[u8]) -> Result<Self, TraceError> {
        match line.iter().find(|b| !b.is_ascii_whitespace()) {
            Some(b'{') => Ok(serde_json::from_slice(line)?),
            _ => Err(TraceError::NotAnObject),
        }
    }

    /// Whether this line is a genuine instruction step
    pub fn is_step(&self) -> bool {
        self.depth > 0
    }

    /// Whether this is a step on a STOP opcode
    pub fn is_stop(&self) -> bool {
        self.is_step() && self.op == OP_STOP
    }
}

/// Trailer carrying the final state root of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateRoot {
    #[serde(rename = "stateRoot", default)]
    pub state_root: String,
}

impl StateRoot {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            state_root: root.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.state_root.is_empty()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Quantity {
    Number(u64),
    Text(String),
}

/// Parse a `0x`-prefixed hex or plain decimal quantity.
pub(crate) fn parse_quantity(text: &str) -> Option<u64> {
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some("") => Some(0),
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}

fn de_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    match Quantity::deserialize(deserializer)? {
        Quantity::Number(n) => Ok(n),
        Quantity::Text(text) => parse_quantity(&text)
            .ok_or_else(|| de::Error::custom(format!("invalid quantity {text:?}"))),
    }
}

fn de_u8<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let value = de_u64(deserializer)?;
    u8::try_from(value).map_err(|_| de::Error::custom(format!("opcode {value} out of range")))
}

fn de_error<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let error = Option::<String>::deserialize(deserializer)?;
    Ok(error.filter(|e| !e.is_empty()))
}

fn de_stack<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Vec<String>>, D::Error> {
    let Some(items) = Option::<Vec<String>>::deserialize(deserializer)? else {
        return Ok(None);
    };
    items
        .iter()
        .map(|item| {
            normalize_word(item)
                .ok_or_else(|| de::Error::custom(format!("invalid stack item {item:?}")))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

fn de_bytes<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error> {
    let Some(text) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let digits = text.strip_prefix("0x").unwrap_or(&text);
    hex::decode(digits).map(Some).map_err(de::Error::custom)
}

/// Normalize a 256-bit hex word to minimal lowercase form, `0x0` for zero.
pub(crate) fn normalize_word(word: &str) -> Option<String> {
    let digits = word
        .strip_prefix("0x")
        .or_else(|| word.strip_prefix("0X"))?;
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let significant = digits.trim_start_matches('0');
    if significant.len() > 64 {
        return None;
    }
    if significant.is_empty() {
        return Some("0x0".to_string());
    }
    Some(format!("0x{}", significant.to_ascii_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_hex_and_decimal_fields() {
        let log: StructLog = serde_json::from_str(
            r#"{"pc":"0x10","op":96,"gas":"21000","gasCost":3,"depth":"1"}"#,
        )
        .unwrap();

        assert_eq!(log.pc, 16);
        assert_eq!(log.op, 0x60);
        assert_eq!(log.gas, 21000);
        assert_eq!(log.cost, 3);
        assert_eq!(log.depth, 1);
        assert!(log.error.is_none());
        assert!(log.stack.is_none());
    }

    #[test]
    fn test_summary_line_has_zero_depth() {
        let log: StructLog = serde_json::from_str(
            r#"{"output":"","gasUsed":"0x2d1cc4","time":233624,"error":"gas uint64 overflow"}"#,
        )
        .unwrap();

        assert!(!log.is_step());
        assert_eq!(log.error.as_deref(), Some("gas uint64 overflow"));
    }

    #[test]
    fn test_state_root_line() {
        let line = r#"{"stateRoot": "0xa2b3391f7a85bf1ad08dc541a1b99da3c591c156351391f26ec88c557ff12134"}"#;
        let log: StructLog = serde_json::from_str(line).unwrap();
        assert_eq!(log.depth, 0);

        let root: StateRoot = serde_json::from_str(line).unwrap();
        assert_eq!(
            root.state_root,
            "0xa2b3391f7a85bf1ad08dc541a1b99da3c591c156351391f26ec88c557ff12134"
        );
    }

    #[test]
    fn test_stack_items_are_normalized() {
        let log: StructLog =
            serde_json::from_str(r#"{"depth":1,"stack":["0x0000","0x00AbC","0x1"]}"#).unwrap();
        assert_eq!(
            log.stack,
            Some(vec!["0x0".to_string(), "0xabc".to_string(), "0x1".to_string()])
        );
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(serde_json::from_str::<StructLog>(r#"{"pc":"zz","depth":1}"#).is_err());
        assert!(serde_json::from_str::<StructLog>(r#"{"op":256,"depth":1}"#).is_err());
        assert!(serde_json::from_str::<StructLog>(r#"{"stack":["12"],"depth":1}"#).is_err());
        assert!(serde_json::from_str::<StructLog>(r#"{"memory":"0xabc","depth":1}"#).is_err());
        assert!(serde_json::from_str::<StructLog>("not json").is_err());
    }

    #[test]
    fn test_parse_accepts_objects_only() {
        let log = StructLog::parse(br#" {"pc":7,"op":96,"depth":1}"#).unwrap();
        assert_eq!(log.pc, 7);

        assert!(matches!(
            StructLog::parse(b"[7,96,100,3,1]"),
            Err(TraceError::NotAnObject)
        ));
        assert!(matches!(StructLog::parse(b"42"), Err(TraceError::NotAnObject)));
        assert!(matches!(
            StructLog::parse(br#"{"pc":"zz","depth":1}"#),
            Err(TraceError::Decode(_))
        ));
    }

    #[test]
    fn test_empty_error_is_dropped() {
        let log: StructLog = serde_json::from_str(r#"{"depth":1,"error":""}"#).unwrap();
        assert!(log.error.is_none());
    }

    #[test]
    fn test_is_stop() {
        let stop = StructLog {
            depth: 1,
            op: OP_STOP,
            ..Default::default()
        };
        assert!(stop.is_stop());

        let summary = StructLog::default();
        assert!(!summary.is_stop());
    }
}
