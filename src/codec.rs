use serde_json::{Map, Value};

use crate::{
    error::CodecError,
    message::{Reply, Request},
};

fn require_str<'a>(map: &'a Map<String, Value>, field: &'static str) -> Result<&'a str, CodecError> {
    map.get(field)
        .ok_or(CodecError::MissingField(field))?
        .as_str()
        .ok_or(CodecError::WrongType { field })
}

// localTime/time/delta travel as decimal strings, not JSON numbers, so a
// wire i64 survives without touching JSON's f64 range limit
fn require_int(map: &Map<String, Value>, field: &'static str) -> Result<i64, CodecError> {
    let value = map.get(field).ok_or(CodecError::MissingField(field))?;
    match value {
        Value::String(text) => text
            .parse::<i64>()
            .map_err(|_| CodecError::BadInteger {
                field,
                text: text.clone(),
            }),
        Value::Number(n) => n.as_i64().ok_or(CodecError::WrongType { field }),
        _ => Err(CodecError::WrongType { field }),
    }
}

pub fn encode_request(request: &Request) -> Vec<u8> {
    let mut map = Map::new();
    map.insert(
        "operation".into(),
        Value::String(request.operation().into()),
    );
    match request {
        Request::GetTime {
            message,
            t0_ms,
            leader_address,
        } => {
            map.insert("message".into(), Value::String(message.clone()));
            map.insert("time".into(), Value::String(t0_ms.to_string()));
            map.insert(
                "leader_address".into(),
                Value::String(leader_address.clone()),
            );
        }
        Request::UpdateTime {
            message,
            delta_ms,
            leader_address,
        } => {
            map.insert("message".into(), Value::String(message.clone()));
            map.insert("delta".into(), Value::String(delta_ms.to_string()));
            map.insert(
                "leader_address".into(),
                Value::String(leader_address.clone()),
            );
        }
        Request::Close {
            message,
            leader_address,
        } => {
            map.insert("message".into(), Value::String(message.clone()));
            map.insert(
                "leader_address".into(),
                Value::String(leader_address.clone()),
            );
        }
    }
    serde_json::to_vec(&Value::Object(map)).expect("a Map<String, Value> always serializes")
}

pub fn decode_request(bytes: &[u8]) -> Result<Request, CodecError> {
    let value: Value = serde_json::from_slice(bytes)?;
    let map = value.as_object().ok_or(CodecError::WrongType {
        field: "<root>",
    })?;
    let operation = require_str(map, "operation")?;
    match operation {
        "GET_TIME" => Ok(Request::GetTime {
            message: require_str(map, "message")?.to_owned(),
            t0_ms: require_int(map, "time")?,
            leader_address: require_str(map, "leader_address")?.to_owned(),
        }),
        "UPDATE_TIME" => Ok(Request::UpdateTime {
            message: require_str(map, "message")?.to_owned(),
            delta_ms: require_int(map, "delta")?,
            leader_address: require_str(map, "leader_address")?.to_owned(),
        }),
        "CLOSE" => Ok(Request::Close {
            message: require_str(map, "message")?.to_owned(),
            leader_address: require_str(map, "leader_address")?.to_owned(),
        }),
        _ => Err(CodecError::WrongType {
            field: "operation",
        }),
    }
}

pub fn encode_reply(reply: &Reply) -> Vec<u8> {
    let mut map = Map::new();
    match reply {
        Reply::Poll {
            follower_name,
            local_time_ms,
            address_follower,
        } => {
            map.insert(
                "followerName".into(),
                Value::String(follower_name.clone()),
            );
            map.insert(
                "localTime".into(),
                Value::String(local_time_ms.to_string()),
            );
            map.insert(
                "addressFollower".into(),
                Value::String(address_follower.clone()),
            );
        }
        Reply::Updated {
            follower_name,
            local_time_ms,
        } => {
            map.insert(
                "followerName".into(),
                Value::String(follower_name.clone()),
            );
            map.insert(
                "localTime".into(),
                Value::String(local_time_ms.to_string()),
            );
            map.insert("operation".into(), Value::String("OK_MOD_TIME".into()));
        }
        Reply::Closed { follower_name } => {
            map.insert(
                "followerName".into(),
                Value::String(follower_name.clone()),
            );
            map.insert("operation".into(), Value::String("CLOSE".into()));
        }
        Reply::Error { error } => {
            map.insert("error".into(), Value::String(error.clone()));
        }
    }
    serde_json::to_vec(&Value::Object(map)).expect("a Map<String, Value> always serializes")
}

pub fn decode_reply(bytes: &[u8]) -> Result<Reply, CodecError> {
    let value: Value = serde_json::from_slice(bytes)?;
    let map = value.as_object().ok_or(CodecError::WrongType {
        field: "<root>",
    })?;
    if let Some(error) = map.get("error") {
        let error = error.as_str().ok_or(CodecError::WrongType { field: "error" })?;
        return Ok(Reply::Error {
            error: error.to_owned(),
        });
    }
    let follower_name = require_str(map, "followerName")?.to_owned();
    match map.get("operation").and_then(Value::as_str) {
        Some("OK_MOD_TIME") => Ok(Reply::Updated {
            follower_name,
            local_time_ms: require_int(map, "localTime")?,
        }),
        Some("CLOSE") => Ok(Reply::Closed { follower_name }),
        _ if map.contains_key("addressFollower") => Ok(Reply::Poll {
            follower_name,
            local_time_ms: require_int(map, "localTime")?,
            address_follower: require_str(map, "addressFollower")?.to_owned(),
        }),
        _ => Err(CodecError::MissingField("operation")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_get_time() {
        let request = Request::GetTime {
            message: "hi".into(),
            t0_ms: 10_000,
            leader_address: "127.0.0.1:9000".into(),
        };
        let decoded = decode_request(&encode_request(&request)).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn round_trips_update_time_with_negative_delta() {
        let request = Request::UpdateTime {
            message: "mod".into(),
            delta_ms: -42,
            leader_address: "127.0.0.1:9000".into(),
        };
        let decoded = decode_request(&encode_request(&request)).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn round_trips_close() {
        let request = Request::Close {
            message: "bye".into(),
            leader_address: "127.0.0.1:9000".into(),
        };
        assert_eq!(decode_request(&encode_request(&request)).unwrap(), request);
    }

    #[test]
    fn round_trips_poll_reply() {
        let reply = Reply::Poll {
            follower_name: "p1".into(),
            local_time_ms: 12_345,
            address_follower: "127.0.0.1:9001".into(),
        };
        assert_eq!(decode_reply(&encode_reply(&reply)).unwrap(), reply);
    }

    #[test]
    fn round_trips_updated_reply() {
        let reply = Reply::Updated {
            follower_name: "p1".into(),
            local_time_ms: 12_345,
        };
        assert_eq!(decode_reply(&encode_reply(&reply)).unwrap(), reply);
    }

    #[test]
    fn round_trips_closed_reply() {
        let reply = Reply::Closed {
            follower_name: "p1".into(),
        };
        assert_eq!(decode_reply(&encode_reply(&reply)).unwrap(), reply);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let mut map = Map::new();
        map.insert("operation".into(), Value::String("GET_TIME".into()));
        map.insert("message".into(), Value::String("hi".into()));
        map.insert("time".into(), Value::String("10".into()));
        map.insert(
            "leader_address".into(),
            Value::String("127.0.0.1:9000".into()),
        );
        map.insert("unexpected".into(), Value::Bool(true));
        let bytes = serde_json::to_vec(&Value::Object(map)).unwrap();
        assert!(decode_request(&bytes).is_ok());
    }

    #[test]
    fn missing_field_is_a_codec_error() {
        let mut map = Map::new();
        map.insert("operation".into(), Value::String("GET_TIME".into()));
        let bytes = serde_json::to_vec(&Value::Object(map)).unwrap();
        assert!(matches!(
            decode_request(&bytes),
            Err(CodecError::MissingField("message") | CodecError::MissingField("time"))
        ));
    }

    #[test]
    fn non_decimal_integer_field_is_a_codec_error() {
        let mut map = Map::new();
        map.insert("operation".into(), Value::String("GET_TIME".into()));
        map.insert("message".into(), Value::String("hi".into()));
        map.insert("time".into(), Value::String("not-a-number".into()));
        map.insert(
            "leader_address".into(),
            Value::String("127.0.0.1:9000".into()),
        );
        let bytes = serde_json::to_vec(&Value::Object(map)).unwrap();
        assert!(matches!(
            decode_request(&bytes),
            Err(CodecError::BadInteger { field: "time", .. })
        ));
    }

    #[test]
    fn malformed_json_is_a_codec_error() {
        assert!(decode_request(b"not json").is_err());
    }
}
