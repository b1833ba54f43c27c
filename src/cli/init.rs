//! Init command handler.

use std::path::Path;

use color_eyre::eyre::WrapErr;
use color_eyre::Result;

use crate::models::Dataset;

use super::App;

impl App {
    /// Run the init command: full-replace load of a dataset file.
    pub async fn run_init(&self, dataset: &Path) -> Result<()> {
        let text = std::fs::read_to_string(dataset)
            .wrap_err_with(|| format!("Failed to read {}", dataset.display()))?;
        let dataset: Dataset = serde_json::from_str(&text).wrap_err("Invalid dataset file")?;
        tracing::info!(
            "Loaded dataset: {} airports, {} amenities, {} flights, {} policies",
            dataset.airports.len(),
            dataset.amenities.len(),
            dataset.flights.len(),
            dataset.policies.len()
        );

        let datastore = self.open().await?;
        let result = datastore.initialize_data(&dataset).await;
        // Release the backend whether or not the load succeeded.
        datastore.close().await;
        result.wrap_err("Failed to initialize datastore")?;

        tracing::info!("Datastore initialized");
        Ok(())
    }
}
