//! Schema-driven response decoding.

use super::frame;
use super::registry::{CommandRegistry, ERROR_CODE, OPERATOR};
use super::values::{self, DeviceProfile, Mode, SubMode, Value};
use crate::error::{DeviceError, KkmError, Result};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use tracing::trace;

/// Named fields of one response, in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedResponse {
    command: u16,
    fields: Vec<(&'static str, Value)>,
}

impl DecodedResponse {
    pub fn command(&self) -> u16 {
        self.command
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| *k == name).map(|(_, v)| v)
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_int)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_text)
    }

    pub fn error_code(&self) -> Option<u8> {
        self.int(ERROR_CODE).and_then(|c| u8::try_from(c).ok())
    }

    pub fn operator(&self) -> Option<u8> {
        self.int(OPERATOR).and_then(|c| u8::try_from(c).ok())
    }

    pub fn mode(&self) -> Option<Mode> {
        self.get("mode").and_then(Value::as_mode)
    }

    pub fn submode(&self) -> Option<SubMode> {
        self.get("submode").and_then(Value::as_submode)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.fields.iter().map(|(k, v)| (*k, v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn insert(&mut self, name: &'static str, value: Value) {
        match self.fields.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }
}

impl Serialize for DecodedResponse {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = s.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Result of decoding one response payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Fields(DecodedResponse),
    /// Command code missing from the registry; bytes after the code as-is.
    Raw { command: u16, data: Vec<u8> },
}

impl Response {
    pub fn command(&self) -> u16 {
        match self {
            Response::Fields(r) => r.command,
            Response::Raw { command, .. } => *command,
        }
    }

    pub fn fields(&self) -> Option<&DecodedResponse> {
        match self {
            Response::Fields(r) => Some(r),
            Response::Raw { .. } => None,
        }
    }

    /// The decoded fields, or `ProtocolViolation` for a raw passthrough.
    pub fn into_fields(self) -> Result<DecodedResponse> {
        match self {
            Response::Fields(r) => Ok(r),
            Response::Raw { command, .. } => Err(KkmError::ProtocolViolation(format!(
                "no response schema for command 0x{command:02X}"
            ))),
        }
    }
}

/// Decode a response payload (`LEN` bytes: command code and data).
///
/// Raises `DeviceError` exactly when the error-code field is present and
/// nonzero.
pub fn decode_payload(
    registry: &CommandRegistry,
    profile: &DeviceProfile,
    payload: &[u8],
) -> Result<Response> {
    let (command, data) = frame::decode_command(payload)?;
    let Some(spec) = registry.get(command) else {
        trace!("No schema for 0x{:02X}, returning raw bytes", command);
        return Ok(Response::Raw {
            command,
            data: data.to_vec(),
        });
    };

    let mut response = DecodedResponse {
        command,
        fields: Vec::with_capacity(spec.fields.len() + 1),
    };
    if spec.error_byte {
        response.insert(ERROR_CODE, values::u8_value(data.get(..1).unwrap_or(&[]), profile)?);
    }

    for field in &spec.fields {
        let chunk = field.extract(data);
        let value = if chunk.is_empty() {
            Value::Null
        } else {
            match field.decode {
                Some(decode) => decode(&chunk, profile)?,
                None => Value::Bytes(chunk),
            }
        };
        match (field.name, value) {
            (Some(name), value) => response.insert(name, value),
            (None, Value::Map(entries)) => {
                for (k, v) in entries {
                    response.insert(k, v);
                }
            }
            // no name to store Null under; absent trailing data adds no keys
            (None, Value::Null) => {}
            (None, other) => {
                return Err(KkmError::ProtocolViolation(format!(
                    "unnamed field of 0x{command:02X} decoded to {other:?}, expected a map"
                )))
            }
        }
    }

    match response.error_code() {
        Some(code) if code != 0 => Err(DeviceError::new(code, command).into()),
        _ => Ok(Response::Fields(response)),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecr::registry::{ByteRange, CommandSpec, FieldSpec};
    use crate::ecr::values::TableFieldType;

    fn decode(payload: &[u8]) -> Result<Response> {
        decode_payload(CommandRegistry::builtin(), &DeviceProfile::default(), payload)
    }

    #[test]
    fn test_short_status() {
        let payload = [
            0x10, 0x00, 0x01, 0x00, 0x00, 0x04, 0x00, 0x02, 0x9A, 0xA0, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00,
        ];
        let r = decode(&payload).unwrap().into_fields().unwrap();
        assert_eq!(r.command(), 0x10);
        assert_eq!(r.error_code(), Some(0));
        assert_eq!(r.operator(), Some(1));
        assert_eq!(r.mode().unwrap().state(), (4, 0));
        assert_eq!(r.submode().unwrap().state, 0);
        assert_eq!(r.submode().unwrap().description, "Paper present");
        assert_eq!(r.int("check_operations"), Some(2 << 8));
        assert_eq!(r.int("battery_voltage"), Some(0x9A));
        assert_eq!(
            r.get("reserved"),
            Some(&Value::Bytes(vec![0x00, 0x00, 0x00]))
        );
    }

    #[test]
    fn test_short_status_truncated_fields_are_null() {
        let r = decode(&[0x10, 0x00, 0x1E, 0x00, 0x00, 0x04, 0x00, 0x03])
            .unwrap()
            .into_fields()
            .unwrap();
        assert_eq!(r.operator(), Some(30));
        assert_eq!(r.get("battery_voltage"), Some(&Value::Null));
        assert_eq!(r.get("reserved"), Some(&Value::Null));
        // only one of the two split bytes is present
        assert_eq!(r.get("check_operations"), Some(&Value::Null));
    }

    #[test]
    fn test_nonzero_error_raises_device_error() {
        let err = decode(&[0x51, 0x46, 0x1E]).unwrap_err();
        let dev = err.device_error().unwrap();
        assert_eq!(dev.code, 0x46);
        assert_eq!(dev.command, 0x51);
        assert!(dev.message.to_lowercase().contains("not enough cash"));
    }

    #[test]
    fn test_zero_error_never_raises() {
        let r = decode(&[0x51, 0x00, 0x1E, 0x07, 0x00]).unwrap();
        assert_eq!(r.fields().unwrap().int("document_number"), Some(7));
    }

    #[test]
    fn test_unknown_command_is_raw() {
        let r = decode(&[0x77, 0x01, 0x02]).unwrap();
        assert_eq!(
            r,
            Response::Raw {
                command: 0x77,
                data: vec![0x01, 0x02]
            }
        );
        assert!(r.into_fields().is_err());
    }

    #[test]
    fn test_extended_command() {
        let r = decode(&[0xFF, 0x40, 0x00, 0x01, 0x05, 0x00, 0x0C, 0x00])
            .unwrap()
            .into_fields()
            .unwrap();
        assert_eq!(r.command(), 0xFF40);
        assert_eq!(r.get("shift_state"), Some(&Value::Label("shift open")));
        assert_eq!(r.int("shift_number"), Some(5));
        assert_eq!(r.int("check_number"), Some(12));
    }

    #[test]
    fn test_unnamed_field_merges_map() {
        let mut payload = vec![0x2E, 0x00];
        let mut name = crate::text::pad_text("Пароль", 40);
        payload.append(&mut name);
        payload.extend_from_slice(&[0x00, 0x02, 0x00, 0x00, 0x0F, 0x27]);
        let r = decode(&payload).unwrap().into_fields().unwrap();
        assert_eq!(r.text("field_name"), Some("Пароль"));
        assert_eq!(
            r.get("field_type"),
            Some(&Value::FieldType(TableFieldType::Int))
        );
        assert_eq!(r.int("byte_count"), Some(2));
        assert_eq!(r.int("min_value"), Some(0));
        assert_eq!(r.int("max_value"), Some(9999));
    }

    #[test]
    fn test_truncated_merge_adds_no_keys() {
        let mut payload = vec![0x2E, 0x00];
        payload.append(&mut crate::text::pad_text("Пароль", 40));
        payload.push(0x00);
        let r = decode(&payload).unwrap().into_fields().unwrap();
        assert_eq!(
            r.get("field_type"),
            Some(&Value::FieldType(TableFieldType::Int))
        );
        assert_eq!(r.get("byte_count"), None);
        assert_eq!(r.get("min_value"), None);
        assert_eq!(r.get("max_value"), None);
    }

    #[test]
    fn test_out_of_range_byte_fields() {
        let r = DecodedResponse {
            command: 0x10,
            fields: vec![(ERROR_CODE, Value::Int(0)), (OPERATOR, Value::Int(300))],
        };
        assert_eq!(r.error_code(), Some(0));
        assert_eq!(r.operator(), None);
    }

    #[test]
    fn test_device_name_text() {
        let mut payload = vec![0xFC, 0x00, 0x00, 0x00, 0x01, 0x0B, 0x04, 0x00];
        payload.extend(crate::text::encode_cp1251("ШТРИХ-ФР-К"));
        let r = decode(&payload).unwrap().into_fields().unwrap();
        assert_eq!(r.int("model"), Some(4));
        assert_eq!(r.text("device_name"), Some("ШТРИХ-ФР-К"));
    }

    #[test]
    fn test_command_without_error_byte() {
        let mut reg = CommandRegistry::new();
        reg.register(CommandSpec::without_error_byte(
            0xE0,
            "Open shift",
            vec![FieldSpec::new("shift", 0, 2, values::u16_value)],
        ));
        let r = decode_payload(&reg, &DeviceProfile::default(), &[0xE0, 0x46, 0x00])
            .unwrap()
            .into_fields()
            .unwrap();
        assert_eq!(r.error_code(), None);
        assert_eq!(r.int("shift"), Some(0x46));
    }

    #[test]
    fn test_unnamed_non_map_is_violation() {
        let mut reg = CommandRegistry::new();
        reg.register(CommandSpec::new(
            0x99,
            "Broken",
            vec![FieldSpec {
                ranges: vec![ByteRange::from(1)],
                decode: Some(values::u8_value),
                name: None,
            }],
        ));
        let err = decode_payload(&reg, &DeviceProfile::default(), &[0x99, 0x00, 0x01])
            .unwrap_err();
        assert!(matches!(err, KkmError::ProtocolViolation(_)));
    }

    #[test]
    fn test_serializes_in_schema_order() {
        let r = decode(&[0x1B, 0x00, 0x01, 0x10, 0x00])
            .unwrap()
            .into_fields()
            .unwrap();
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, r#"{"error_code":0,"operator":1,"value":16}"#);
    }
}
