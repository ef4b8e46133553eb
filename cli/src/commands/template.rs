use anyhow::Result;
use tabled::{Table, Tabled, settings::Style};

use mealbook_core::service::MealService;

use super::helpers::truncate;

pub(crate) fn cmd_template_add(
    service: &MealService,
    name: &str,
    description: &str,
    json: bool,
) -> Result<()> {
    let template = service.save_template(Some(name), Some(description))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&template)?);
    } else {
        println!("Saved template '{}': {}", template.name, template.description);
    }
    Ok(())
}

pub(crate) fn cmd_template_list(service: &MealService, json: bool) -> Result<()> {
    let record = service.list_templates()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    if record.templates.is_empty() {
        println!("No templates saved");
        return Ok(());
    }

    #[derive(Tabled)]
    struct TemplateRow {
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Description")]
        description: String,
        #[tabled(rename = "Uses")]
        uses: u64,
    }

    let mut rows: Vec<TemplateRow> = record
        .templates
        .iter()
        .map(|(name, description)| TemplateRow {
            name: name.clone(),
            description: truncate(description, 50),
            uses: record.usage.get(name).copied().unwrap_or(0),
        })
        .collect();
    rows.sort_by(|a, b| b.uses.cmp(&a.uses).then_with(|| a.name.cmp(&b.name)));

    println!("{}", Table::new(&rows).with(Style::rounded()));
    Ok(())
}
