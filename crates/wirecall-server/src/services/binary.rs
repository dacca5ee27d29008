use async_trait::async_trait;
use bytes::Bytes;
use serde_json::json;

use wirecall_core::RpcError;

use crate::dispatch::{Action, ActionCall, ActionOutput};

fn attachment(call: &ActionCall, action: &str) -> Result<Bytes, RpcError> {
    call.binary
        .clone()
        .ok_or_else(|| RpcError::generic(format!("{action} requires a binary attachment")))
}

/// FNV-1a, 64 bit.
fn fnv1a(data: &[u8]) -> u64 {
    data.iter().fold(0xcbf2_9ce4_8422_2325, |h, b| {
        (h ^ u64::from(*b)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

/// Summarizes an uploaded attachment.
pub struct UploadAction;

#[async_trait]
impl Action for UploadAction {
    fn name(&self) -> &str {
        "upload"
    }

    async fn run(&self, call: ActionCall) -> Result<ActionOutput, RpcError> {
        let body = attachment(&call, "upload")?;
        ActionOutput::json(json!({
            "size": body.len(),
            "checksum": format!("{:016x}", fnv1a(&body)),
        }))
    }
}

/// Sends the attachment back byte-reversed, as an attachment.
pub struct ReverseAction;

#[async_trait]
impl Action for ReverseAction {
    fn name(&self) -> &str {
        "reverse"
    }

    async fn run(&self, call: ActionCall) -> Result<ActionOutput, RpcError> {
        let body = attachment(&call, "reverse")?;
        let reversed: Vec<u8> = body.iter().rev().copied().collect();
        Ok(ActionOutput::binary(reversed))
    }
}

#[cfg(test)]
mod tests {
    use super::fnv1a;

    #[test]
    fn fnv1a_known_vectors() {
        assert_eq!(fnv1a(b""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(fnv1a(b"a"), 0xaf63_dc4c_8601_ec8c);
    }
}
