//! `confab tasks` command.

use crate::config::EngineConfig;
use crate::registry::TaskBinding;

/// Execute the `tasks` command.
///
/// Displays a table of registered tasks showing ID, binding, required
/// fields, and description.
///
/// # Errors
///
/// Returns an error string if the registry cannot be built.
pub fn run(config: &EngineConfig) -> Result<(), String> {
    let registry = super::build_registry(config)?;

    if registry.is_empty() {
        println!("No tasks registered.");
        return Ok(());
    }

    // Collect rows for column-width calculation.
    let mut rows: Vec<(String, String, String, String)> = Vec::new();
    for schema in registry.schemas().values() {
        let binding = match &schema.binding {
            TaskBinding::Backend { endpoint, method } => {
                format!("{} {endpoint}", method.as_str())
            }
            TaskBinding::Internal => "internal".to_string(),
        };
        let required =
            schema.required.iter().map(|f| f.name.as_str()).collect::<Vec<_>>().join(", ");
        rows.push((schema.id.clone(), binding, required, schema.description.clone()));
    }

    let id_width = rows.iter().map(|r| r.0.len()).max().unwrap_or(2).max(2);
    let binding_width = rows.iter().map(|r| r.1.len()).max().unwrap_or(7).max(7);
    let required_width = rows.iter().map(|r| r.2.len()).max().unwrap_or(8).max(8);

    println!(
        "{:<id_width$}  {:<binding_width$}  {:<required_width$}  DESCRIPTION",
        "ID", "BINDING", "REQUIRED",
    );
    println!("{:-<id_width$}  {:-<binding_width$}  {:-<required_width$}  -----------", "", "", "");

    for (id, binding, required, description) in &rows {
        println!(
            "{id:<id_width$}  {binding:<binding_width$}  {required:<required_width$}  {description}",
        );
    }

    println!("\n{} task(s) total.", rows.len());
    Ok(())
}
