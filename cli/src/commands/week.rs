use anyhow::Result;

use mealbook_core::service::MealService;
use mealbook_core::week::{format_date, parse_date as parse_iso_date, start_of_week, end_of_week};

use super::helpers::{parse_date, print_entries_table};

pub(crate) fn cmd_week(service: &MealService, date: Option<&str>, json: bool) -> Result<()> {
    let date = parse_date(date)?;
    let week = service.list_week(date)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&week)?);
        return Ok(());
    }

    let start = format_date(start_of_week(date));
    let end = format_date(end_of_week(date));
    if week.is_empty() {
        println!("No meals logged for the week {start} to {end}");
        return Ok(());
    }

    println!("Week {start} to {end}");
    for (day, entries) in week.iter() {
        let heading = parse_iso_date(day)
            .map(|d| d.format("%A %Y-%m-%d").to_string())
            .unwrap_or_else(|_| day.to_string());
        println!("\n{heading}");
        print_entries_table(entries);
    }
    Ok(())
}
