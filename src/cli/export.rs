//! Export command handler.

use std::path::Path;

use color_eyre::eyre::WrapErr;
use color_eyre::Result;

use super::App;

impl App {
    /// Run the export command: write every stored record as dataset JSON.
    pub async fn run_export(&self, output: &Path) -> Result<()> {
        let datastore = self.open().await?;
        let result = datastore.export_data().await;
        datastore.close().await;
        let dataset = result.wrap_err("Failed to export datastore")?;

        let json = serde_json::to_string_pretty(&dataset)?;
        std::fs::write(output, json)
            .wrap_err_with(|| format!("Failed to write {}", output.display()))?;

        tracing::info!("Exported {} records to {}", dataset.len(), output.display());
        Ok(())
    }
}
