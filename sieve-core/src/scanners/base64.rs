//! Decodes a whole file as base64 and extracts the result as a child file,
//! mirroring the reference implementation's `ScanBase64PE`.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::Result;
use crate::model::File;
use crate::scanner::{Options, ScanContext, Scanner};

pub struct Base64Extract;

#[async_trait]
impl Scanner for Base64Extract {
    fn name(&self) -> &str {
        "ScanBase64Extract"
    }

    async fn scan(&self, data: &[u8], _file: &File, _options: &Options, ctx: &mut ScanContext) -> Result<()> {
        match STANDARD.decode(data) {
            Ok(decoded) if !decoded.is_empty() => {
                ctx.set("decoded_len", decoded.len());
                let mut child = File::child(self.name());
                child.add_flavors("external", vec!["base64".to_string()]);
                ctx.extract_child(child, &decoded).await?;
            }
            Ok(_) => {}
            Err(_) => {
                ctx.flag("not_decodable_from_base64");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::InMemoryBlobStore;
    use crate::deadline::Deadline;
    use std::sync::Arc;

    fn fresh_context() -> ScanContext {
        ScanContext::new(
            "ScanBase64Extract".to_string(),
            Arc::new(InMemoryBlobStore::new()),
            Deadline::from_now(60.0),
        )
    }

    #[tokio::test]
    async fn valid_base64_extracts_one_child() {
        let mut ctx = fresh_context();
        let file = File::root("p");
        let encoded = STANDARD.encode(b"hidden payload");
        Base64Extract
            .scan(encoded.as_bytes(), &file, &Options::new(), &mut ctx)
            .await
            .unwrap();
        assert_eq!(ctx.children.len(), 1);
        assert_eq!(ctx.children[0].flavors["external"], vec!["base64".to_string()]);
        assert!(ctx.flags.is_empty());
    }

    #[tokio::test]
    async fn invalid_base64_flags_and_emits_no_child() {
        let mut ctx = fresh_context();
        let file = File::root("p");
        Base64Extract
            .scan(b"not base64!!! @@@", &file, &Options::new(), &mut ctx)
            .await
            .unwrap();
        assert!(ctx.children.is_empty());
        assert!(ctx.flags.contains(&"not_decodable_from_base64".to_string()));
    }
}
