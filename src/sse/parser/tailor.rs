//! Typed interpretation of tailoring frames.

use crate::models::InstructionBlock;
use crate::sse::events::{Frame, FrameParseError, TailorFrame};
use crate::sse::payloads::{ErrorPayload, MetaPayload, StatusPayload};

fn invalid_json(event_type: &str, err: serde_json::Error) -> FrameParseError {
    FrameParseError::InvalidJson {
        event_type: event_type.to_string(),
        reason: err.to_string(),
    }
}

/// Interpret a raw frame as a tailoring frame.
///
/// `status` and `error` never fail: an unparseable payload falls back to the
/// raw text as the message. `meta` and `block` return an error for malformed
/// payloads, which the caller drops. Unknown event names pass through as
/// [`TailorFrame::Unknown`].
pub fn parse_tailor_frame(frame: Frame) -> Result<TailorFrame, FrameParseError> {
    match frame.event.as_str() {
        "status" => {
            let message = serde_json::from_str::<StatusPayload>(&frame.data)
                .map(|payload| payload.message)
                .unwrap_or(frame.data);
            Ok(TailorFrame::Status { message })
        }
        "meta" => {
            let payload: MetaPayload =
                serde_json::from_str(&frame.data).map_err(|e| invalid_json("meta", e))?;
            Ok(TailorFrame::Meta {
                summary: payload.summary,
                recommended_appliances: payload.recommended_appliances,
            })
        }
        "block" => {
            let block: InstructionBlock =
                serde_json::from_str(&frame.data).map_err(|e| invalid_json("block", e))?;
            Ok(TailorFrame::Block(block))
        }
        "error" => match serde_json::from_str::<ErrorPayload>(&frame.data) {
            Ok(payload) => Ok(TailorFrame::Error {
                message: payload.message,
                retryable: payload.retryable,
            }),
            Err(_) => Ok(TailorFrame::Error {
                message: frame.data,
                retryable: false,
            }),
        },
        // The payload (e.g. {"message":"Tailoring complete"}) carries nothing the run needs
        "complete" => Ok(TailorFrame::Complete),
        _ => Ok(TailorFrame::Unknown(frame)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_json() {
        let frame = Frame::new("status", r#"{"message":"Reading manuals"}"#);
        assert_eq!(
            parse_tailor_frame(frame).unwrap(),
            TailorFrame::Status {
                message: "Reading manuals".to_string()
            }
        );
    }

    #[test]
    fn test_status_malformed_uses_raw_text() {
        let frame = Frame::new("status", "whoops");
        assert_eq!(
            parse_tailor_frame(frame).unwrap(),
            TailorFrame::Status {
                message: "whoops".to_string()
            }
        );
    }

    #[test]
    fn test_meta() {
        let frame = Frame::new(
            "meta",
            r#"{"summary":"Tailored run ready","recommendedAppliances":["Steam oven"]}"#,
        );
        assert_eq!(
            parse_tailor_frame(frame).unwrap(),
            TailorFrame::Meta {
                summary: Some("Tailored run ready".to_string()),
                recommended_appliances: Some(vec!["Steam oven".to_string()]),
            }
        );
    }

    #[test]
    fn test_meta_malformed_is_error() {
        let frame = Frame::new("meta", "{not json");
        assert!(matches!(
            parse_tailor_frame(frame),
            Err(FrameParseError::InvalidJson { .. })
        ));
    }

    #[test]
    fn test_block() {
        let frame = Frame::new(
            "block",
            r#"{"id":"block-1","title":"Steam oven prep","content":"Preheat","applianceContext":"Steam oven","order":1,"durationMinutes":20}"#,
        );
        match parse_tailor_frame(frame).unwrap() {
            TailorFrame::Block(block) => {
                assert_eq!(block.id, "block-1");
                assert_eq!(block.order, 1);
                assert_eq!(block.appliance_context.as_deref(), Some("Steam oven"));
                assert_eq!(block.duration_minutes, Some(20));
            }
            other => panic!("Expected Block frame, got {:?}", other),
        }
    }

    #[test]
    fn test_block_missing_order_is_error() {
        let frame = Frame::new("block", r#"{"id":"block-1"}"#);
        assert!(parse_tailor_frame(frame).is_err());
    }

    #[test]
    fn test_error_structured() {
        let frame = Frame::new("error", r#"{"message":"Model overloaded","retryable":true}"#);
        assert_eq!(
            parse_tailor_frame(frame).unwrap(),
            TailorFrame::Error {
                message: "Model overloaded".to_string(),
                retryable: true
            }
        );
    }

    #[test]
    fn test_error_raw_text_is_fatal() {
        let frame = Frame::new("error", "upstream exploded");
        assert_eq!(
            parse_tailor_frame(frame).unwrap(),
            TailorFrame::Error {
                message: "upstream exploded".to_string(),
                retryable: false
            }
        );
    }

    #[test]
    fn test_complete_ignores_payload() {
        assert_eq!(
            parse_tailor_frame(Frame::new("complete", "")).unwrap(),
            TailorFrame::Complete
        );
        assert_eq!(
            parse_tailor_frame(Frame::new("complete", r#"{"message":"done"}"#)).unwrap(),
            TailorFrame::Complete
        );
    }

    #[test]
    fn test_unknown_passes_through() {
        let frame = Frame::new("heartbeat", "{}");
        assert_eq!(
            parse_tailor_frame(frame.clone()).unwrap(),
            TailorFrame::Unknown(frame)
        );
    }
}
