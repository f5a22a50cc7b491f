use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use gallery_core::Item;
use gallery_logging::gallery_info;
use serde_json::{json, Value};

use crate::persist::write_atomic;
use crate::ports::Exporter;
use crate::ExportError;

const DEFAULT_MANIFEST: &str = "gallery-export.json";

/// Writes `export/json` manifests into the download directory.
///
/// `options.filename` overrides the manifest name. The result is
/// `{"path": ..., "count": n}`.
#[derive(Debug, Clone)]
pub struct JsonExporter {
    output_dir: PathBuf,
}

impl JsonExporter {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }
}

#[async_trait]
impl Exporter for JsonExporter {
    async fn export(
        &self,
        format: &str,
        items: &[Item],
        options: &Value,
    ) -> Result<Value, ExportError> {
        if !format.eq_ignore_ascii_case("json") {
            return Err(ExportError::UnsupportedFormat(format.to_string()));
        }

        let name = options
            .get("filename")
            .and_then(Value::as_str)
            .filter(|name| !name.contains(['/', '\\']) && !name.starts_with('.'))
            .unwrap_or(DEFAULT_MANIFEST)
            .to_string();
        let manifest = json!({
            "exported_utc": Utc::now().to_rfc3339(),
            "count": items.len(),
            "items": items,
        });
        let content = serde_json::to_vec_pretty(&manifest)?;

        let dir = self.output_dir.clone();
        let path = tokio::task::spawn_blocking(move || write_atomic(&dir, &name, &content))
            .await
            .map_err(|err| ExportError::Io(std::io::Error::new(std::io::ErrorKind::Other, err)))??;

        gallery_info!("Exported {} items to {:?}", items.len(), path);
        Ok(json!({
            "path": path.to_string_lossy(),
            "count": items.len(),
        }))
    }
}
