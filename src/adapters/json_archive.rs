use crate::core::archive::ArchivedObject;
use crate::domain::ports::ArchiveFormat;
use crate::utils::error::{IrError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const FORMAT_TAG: &str = "pipeline-ir/json";

/// 封存檔的外層文件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveDocument<R> {
    pub format: String,
    pub created_at: DateTime<Utc>,
    pub root: R,
}

/// JSON 封存格式，浮點數可無損往返
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonArchive {
    pretty: bool,
}

impl JsonArchive {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    pub fn pretty() -> Self {
        Self::new(true)
    }

    pub fn read_document(&self, data: &[u8]) -> Result<ArchiveDocument<ArchivedObject>> {
        let document: ArchiveDocument<ArchivedObject> = serde_json::from_slice(data)?;
        if document.format != FORMAT_TAG {
            return Err(IrError::type_mismatch(FORMAT_TAG, document.format.as_str()));
        }
        Ok(document)
    }
}

impl ArchiveFormat for JsonArchive {
    fn encode(&self, root: &ArchivedObject) -> Result<Vec<u8>> {
        let document = ArchiveDocument {
            format: FORMAT_TAG.to_string(),
            created_at: Utc::now(),
            root,
        };
        let data = if self.pretty {
            serde_json::to_vec_pretty(&document)?
        } else {
            serde_json::to_vec(&document)?
        };
        Ok(data)
    }

    fn decode(&self, data: &[u8]) -> Result<ArchivedObject> {
        Ok(self.read_document(data)?.root)
    }
}
