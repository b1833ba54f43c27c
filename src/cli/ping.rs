//! Ping command handler.

use color_eyre::Result;

use super::App;
use crate::datastore::Capabilities;

/// Comma-separated family names, or `-` when there are none.
fn family_list(families: impl Iterator<Item = impl std::fmt::Display>) -> String {
    let names: Vec<String> = families.map(|f| f.to_string()).collect();
    if names.is_empty() {
        "-".to_string()
    } else {
        names.join(", ")
    }
}

fn capability_report(capabilities: Capabilities) -> (String, String) {
    (
        family_list(capabilities.iter()),
        family_list(capabilities.missing()),
    )
}

impl App {
    /// Run the ping command.
    pub async fn run_ping(&self) -> Result<()> {
        let datastore = self.open().await?;
        let (supported, unsupported) = capability_report(datastore.capabilities());
        println!("kind:        {}", datastore.kind());
        println!("supported:   {}", supported);
        println!("unsupported: {}", unsupported);
        datastore.close().await;
        Ok(())
    }
}
