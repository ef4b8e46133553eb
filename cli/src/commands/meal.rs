use anyhow::Result;
use chrono::NaiveDate;

use mealbook_core::MealError;
use mealbook_core::service::{MealInput, MealService};
use mealbook_core::week::format_date;

use super::helpers::{exit_not_found, parse_date, print_entries_table};

fn meal_input(date: NaiveDate, time: &str, description: &str) -> MealInput {
    MealInput {
        date: Some(format_date(date)),
        time: Some(time.to_string()),
        description: Some(description.to_string()),
    }
}

pub(crate) fn cmd_log(
    service: &MealService,
    time: &str,
    description: &str,
    date: Option<&str>,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let meal = service.create_meal(&meal_input(date, time, description))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&meal)?);
    } else {
        println!("Logged {} at {} on {}", meal.description, meal.time, meal.date);
    }
    Ok(())
}

pub(crate) fn cmd_day(service: &MealService, date: Option<&str>, json: bool) -> Result<()> {
    let date = parse_date(date)?;
    let entries = service.list_day(date)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else if entries.is_empty() {
        println!("No meals logged on {}", format_date(date));
    } else {
        println!("{}", date.format("%A %Y-%m-%d"));
        print_entries_table(&entries);
    }
    Ok(())
}

pub(crate) fn cmd_edit(
    service: &MealService,
    date: &str,
    index: usize,
    time: &str,
    description: &str,
    to: Option<&str>,
    json: bool,
) -> Result<()> {
    let date = parse_date(Some(date))?;
    let new_date = match to {
        Some(d) => parse_date(Some(d))?,
        None => date,
    };

    match service.update_meal(date, index, &meal_input(new_date, time, description)) {
        Ok(meal) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&meal)?);
            } else {
                println!(
                    "Updated meal: {} at {} on {}",
                    meal.description, meal.time, meal.date
                );
            }
            Ok(())
        }
        Err(MealError::NotFound(msg)) => exit_not_found(&msg, json),
        Err(e) => Err(e.into()),
    }
}

pub(crate) fn cmd_delete(service: &MealService, date: &str, index: usize, json: bool) -> Result<()> {
    let date = parse_date(Some(date))?;

    match service.delete_meal(date, index) {
        Ok(removed) => {
            if json {
                println!("{}", serde_json::json!({ "success": true, "deleted": removed }));
            } else {
                println!(
                    "Deleted {} at {} on {}",
                    removed.description,
                    removed.time,
                    format_date(date)
                );
            }
            Ok(())
        }
        Err(MealError::NotFound(msg)) => exit_not_found(&msg, json),
        Err(e) => Err(e.into()),
    }
}
