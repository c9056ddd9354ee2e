use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtocolError;

/// Absolute bound for positions carried on the wire.
pub const POSITION_LIMIT: f32 = 10_000.0;
/// Absolute bound for velocities carried on the wire.
pub const VELOCITY_LIMIT: f32 = 1_000.0;
pub const SCORE_LIMIT: u32 = 999;

/// Coerces a loosely typed JSON value into a bounded float.
///
/// Numbers, numeric strings and booleans are accepted. Anything non-finite,
/// outside `[-max, max]` or non-numeric becomes `0.0`, so the result is always
/// safe to feed into the simulation.
pub fn validate(value: &Value, max: f32) -> f32 {
    match coerce(value) {
        Some(v) => validate_f32(v as f32, max),
        None => 0.0,
    }
}

/// Same rule as [`validate`] for an already numeric value.
pub fn validate_f32(value: f32, max: f32) -> f32 {
    if value.is_finite() && value.abs() <= max {
        value
    } else {
        0.0
    }
}

/// Truncates toward zero and clamps into `[0, SCORE_LIMIT]`. Non-numeric input
/// gives 0.
pub fn validate_score(value: &Value) -> u32 {
    match coerce(value) {
        Some(v) if v.is_finite() => v.trunc().clamp(0.0, SCORE_LIMIT as f64) as u32,
        _ => 0,
    }
}

fn coerce(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Authoritative host state mirrored by the client. `score_p` belongs to the
/// host (left) side, `score_a` to the client (right) side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StateUpdate {
    pub paddle_y: f32,
    pub ball_x: f32,
    pub ball_y: f32,
    pub ball_vx: f32,
    pub ball_vy: f32,
    pub score_p: u32,
    pub score_a: u32,
}

impl StateUpdate {
    /// Applies the wire bounds; used before sending.
    pub fn sanitized(self) -> Self {
        Self {
            paddle_y: validate_f32(self.paddle_y, POSITION_LIMIT),
            ball_x: validate_f32(self.ball_x, POSITION_LIMIT),
            ball_y: validate_f32(self.ball_y, POSITION_LIMIT),
            ball_vx: validate_f32(self.ball_vx, VELOCITY_LIMIT),
            ball_vy: validate_f32(self.ball_vy, VELOCITY_LIMIT),
            score_p: self.score_p.min(SCORE_LIMIT),
            score_a: self.score_a.min(SCORE_LIMIT),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WireMessage {
    /// Client to host: the client's own paddle position.
    #[serde(rename = "paddle")]
    PaddleUpdate { y: f32 },
    /// Host to client: the full authoritative state.
    #[serde(rename = "state")]
    StateUpdate(StateUpdate),
}

/// Decode shape for incoming lines. Fields are kept as raw JSON so that bad
/// values can be coerced, while a missing field still fails the decode.
#[derive(Deserialize)]
#[serde(tag = "type")]
enum RawMessage {
    #[serde(rename = "paddle")]
    Paddle { y: Value },
    #[serde(rename = "state")]
    State {
        paddle_y: Value,
        ball_x: Value,
        ball_y: Value,
        ball_vx: Value,
        ball_vy: Value,
        score_p: Value,
        score_a: Value,
    },
}

impl WireMessage {
    pub fn paddle(y: f32) -> Self {
        WireMessage::PaddleUpdate { y }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            WireMessage::PaddleUpdate { .. } => "paddle",
            WireMessage::StateUpdate(_) => "state",
        }
    }

    /// Validates every field and serialises to a single line with its
    /// trailing newline.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        let sanitized = match *self {
            WireMessage::PaddleUpdate { y } => WireMessage::PaddleUpdate {
                y: validate_f32(y, POSITION_LIMIT),
            },
            WireMessage::StateUpdate(state) => WireMessage::StateUpdate(state.sanitized()),
        };
        let mut line = serde_json::to_string(&sanitized)?;
        line.push('\n');
        Ok(line)
    }

    /// Parses one line without its terminator. Returns `None` for invalid JSON,
    /// an unknown `type` or a missing field.
    pub fn decode(line: &str) -> Option<Self> {
        let raw: RawMessage = serde_json::from_str(line.trim()).ok()?;
        Some(match raw {
            RawMessage::Paddle { y } => WireMessage::PaddleUpdate {
                y: validate(&y, POSITION_LIMIT),
            },
            RawMessage::State {
                paddle_y,
                ball_x,
                ball_y,
                ball_vx,
                ball_vy,
                score_p,
                score_a,
            } => WireMessage::StateUpdate(StateUpdate {
                paddle_y: validate(&paddle_y, POSITION_LIMIT),
                ball_x: validate(&ball_x, POSITION_LIMIT),
                ball_y: validate(&ball_y, POSITION_LIMIT),
                ball_vx: validate(&ball_vx, VELOCITY_LIMIT),
                ball_vy: validate(&ball_vy, VELOCITY_LIMIT),
                score_p: validate_score(&score_p),
                score_a: validate_score(&score_a),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn validate_coercions() {
        assert_eq!(validate(&json!(12.5), POSITION_LIMIT), 12.5);
        assert_eq!(validate(&json!("  -7.25 "), POSITION_LIMIT), -7.25);
        assert_eq!(validate(&json!(true), POSITION_LIMIT), 1.0);
        assert_eq!(validate(&json!(false), POSITION_LIMIT), 0.0);
        assert_eq!(validate(&json!(1000.0), VELOCITY_LIMIT), 1000.0);
        assert_eq!(validate(&json!(1000.5), VELOCITY_LIMIT), 0.0);
        assert_eq!(validate(&json!(-20000), POSITION_LIMIT), 0.0);
        assert_eq!(validate(&json!("nan"), POSITION_LIMIT), 0.0);
        assert_eq!(validate(&json!("inf"), POSITION_LIMIT), 0.0);
        assert_eq!(validate(&json!("abc"), POSITION_LIMIT), 0.0);
        assert_eq!(validate(&json!(null), POSITION_LIMIT), 0.0);
        assert_eq!(validate(&json!([1]), POSITION_LIMIT), 0.0);
        assert_eq!(validate(&json!({"v": 1}), POSITION_LIMIT), 0.0);
    }

    #[test]
    fn validate_is_idempotent() {
        let inputs = [
            json!(0),
            json!(9999.9),
            json!(-10000),
            json!(10000.1),
            json!("42"),
            json!(true),
            json!("x"),
            json!(1e300),
        ];
        for input in &inputs {
            for max in [POSITION_LIMIT, VELOCITY_LIMIT] {
                let once = validate(input, max);
                let twice = validate(&json!(once), max);
                assert_eq!(once, twice, "input {}", input);
                assert_eq!(validate_f32(once, max), once);
            }
        }
    }

    #[test]
    fn score_validation() {
        assert_eq!(validate_score(&json!(5)), 5);
        assert_eq!(validate_score(&json!(5.9)), 5);
        assert_eq!(validate_score(&json!(-3)), 0);
        assert_eq!(validate_score(&json!(5000)), 999);
        assert_eq!(validate_score(&json!("7")), 7);
        assert_eq!(validate_score(&json!(true)), 1);
        assert_eq!(validate_score(&json!("seven")), 0);
        assert_eq!(validate_score(&json!(null)), 0);
    }

    #[test]
    fn encode_wire_shape() {
        let line = WireMessage::paddle(245.0).encode().unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);

        let value: Value = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(value["type"], "paddle");
        assert_eq!(value["y"], 245.0);

        let state = StateUpdate {
            paddle_y: 100.0,
            ball_x: 400.0,
            ball_y: 300.0,
            ball_vx: 5000.0,
            ball_vy: -231.0,
            score_p: 3,
            score_a: 1200,
        };
        let line = WireMessage::StateUpdate(state).encode().unwrap();
        let value: Value = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(value["type"], "state");
        assert_eq!(value["ball_vx"], 0.0);
        assert_eq!(value["ball_vy"], -231.0);
        assert_eq!(value["score_a"], 999);
    }

    #[test]
    fn decode_accepts_known_messages() {
        assert_eq!(
            WireMessage::decode(r#"{"type":"paddle","y":"120.5"}"#),
            Some(WireMessage::PaddleUpdate { y: 120.5 })
        );

        let decoded = WireMessage::decode(
            r#"{"type":"state","paddle_y":10,"ball_x":400,"ball_y":300,"ball_vx":2000,"ball_vy":-5,"score_p":2.7,"score_a":"x","extra":1}"#,
        );
        assert_eq!(
            decoded,
            Some(WireMessage::StateUpdate(StateUpdate {
                paddle_y: 10.0,
                ball_x: 400.0,
                ball_y: 300.0,
                ball_vx: 0.0,
                ball_vy: -5.0,
                score_p: 2,
                score_a: 0,
            }))
        );
    }

    #[test]
    fn decode_rejects_malformed_lines() {
        assert_eq!(WireMessage::decode(""), None);
        assert_eq!(WireMessage::decode("not json"), None);
        assert_eq!(WireMessage::decode(r#"{"y":1}"#), None);
        assert_eq!(WireMessage::decode(r#"{"type":"chat","y":1}"#), None);
        assert_eq!(WireMessage::decode(r#"{"type":"paddle"}"#), None);
        assert_eq!(
            WireMessage::decode(r#"{"type":"state","paddle_y":1,"ball_x":1}"#),
            None
        );
        assert_eq!(WireMessage::decode("[1,2,3]"), None);
    }

    #[test]
    fn decode_of_null_field_is_zero() {
        assert_eq!(
            WireMessage::decode(r#"{"type":"paddle","y":null}"#),
            Some(WireMessage::PaddleUpdate { y: 0.0 })
        );
    }
}
