use std::sync::Arc;

use dogpack_core::{GuardedStore, MemoryStore, TenancyConfigSnapshot, TenantId, TenantOwned};
use serde::{Deserialize, Serialize};

use crate::hooks::{LogWrite, ValidateNoteBody};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    #[serde(default)]
    pub tenant_id: Option<TenantId>,
    pub body: String,
}

impl TenantOwned for Note {
    fn record_id(&self) -> &str {
        &self.id
    }

    fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    fn set_tenant_id(&mut self, tenant: TenantId) {
        self.tenant_id = Some(tenant);
    }
}

pub fn configure(config: &TenancyConfigSnapshot) -> GuardedStore<Note> {
    let max_len = config.get_usize("notes.max_body_len").unwrap_or(2000);

    GuardedStore::new(Arc::new(MemoryStore::<Note>::new()))
        .with_hook(Arc::new(ValidateNoteBody { max_len }))
        .with_hook(Arc::new(LogWrite))
}
