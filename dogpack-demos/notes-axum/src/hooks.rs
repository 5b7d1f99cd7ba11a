use anyhow::Result;
use async_trait::async_trait;
use dogpack_core::{TenancyError, WriteContext, WriteHook, WriteStage};
use serde_json::json;
use tracing::info;

use crate::services::notes::Note;

/// Rejects blank or oversized note bodies on insert and update.
pub struct ValidateNoteBody {
    pub max_len: usize,
}

#[async_trait]
impl WriteHook<Note> for ValidateNoteBody {
    async fn run(&self, ctx: &mut WriteContext<'_, Note>) -> Result<()> {
        if ctx.stage == WriteStage::BeforeDelete {
            return Ok(());
        }

        let body = ctx.record.body.trim();
        let problem = if body.is_empty() {
            Some("must not be empty")
        } else if body.chars().count() > self.max_len {
            Some("is too long")
        } else {
            None
        };

        if let Some(problem) = problem {
            return Err(TenancyError::unprocessable("Note validation failed")
                .with_data(json!({"body": [problem]}))
                .into_anyhow());
        }

        ctx.record.body = body.to_string();
        Ok(())
    }
}

/// Logs every accepted write with its tenant.
pub struct LogWrite;

#[async_trait]
impl WriteHook<Note> for LogWrite {
    async fn run(&self, ctx: &mut WriteContext<'_, Note>) -> Result<()> {
        info!(
            operation = ctx.stage.operation(),
            note = %ctx.record.id,
            tenant_id = ctx.tenant.tenant_id().map(|t| t.0),
            "Note write"
        );
        Ok(())
    }
}
