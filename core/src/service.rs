use std::path::Path;

use chrono::NaiveDate;

use crate::db::Database;
use crate::error::{MealError, Result};
use crate::models::{MealEntry, MealRef, Template, TemplateRecord, WeekBucket, require};
use crate::week::{format_date, parse_date, same_week};

/// Fields of a meal write as they arrive from a client. Any of them may be
/// missing; validation happens in the service.
#[derive(Debug, Clone, Default)]
pub struct MealInput {
    pub date: Option<String>,
    pub time: Option<String>,
    pub description: Option<String>,
}

struct ValidMeal {
    date: NaiveDate,
    time: String,
    description: String,
}

impl MealInput {
    /// Check the fields of an update body without touching storage, so a
    /// bad body is reported ahead of a bad target position.
    pub fn validate_update(&self) -> Result<()> {
        self.validate("newDate").map(drop)
    }

    fn validate(&self, date_field: &str) -> Result<ValidMeal> {
        let date = require(date_field, self.date.as_deref())?;
        let time = require("time", self.time.as_deref())?;
        let description = require("description", self.description.as_deref())?;
        Ok(ValidMeal {
            date: parse_date(date)?,
            time: time.trim().to_string(),
            description: description.to_string(),
        })
    }
}

/// Meal log operations over week buckets and templates.
///
/// Every write is load, mutate, save on whole buckets. Callers sharing one
/// data directory must serialize access themselves.
pub struct MealService {
    db: Database,
}

impl MealService {
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn open(dir: &Path) -> Result<Self> {
        Ok(Self::new(Database::open(dir)?))
    }

    #[must_use]
    pub fn new_in_memory() -> Self {
        Self::new(Database::open_in_memory())
    }

    // --- Reads ---

    pub fn list_week(&self, date: NaiveDate) -> Result<WeekBucket> {
        self.db.load_week(date)
    }

    pub fn list_day(&self, date: NaiveDate) -> Result<Vec<MealEntry>> {
        Ok(self.db.load_week(date)?.day(date).to_vec())
    }

    // --- Writes ---

    pub fn create_meal(&self, input: &MealInput) -> Result<MealRef> {
        let meal = input.validate("date")?;
        let entry = MealEntry::new(meal.date, &meal.time, &meal.description)?;

        let mut bucket = self.db.load_week(meal.date)?;
        bucket.insert(meal.date, entry);
        self.db.save_week(meal.date, &bucket)?;

        Ok(meal.into_ref())
    }

    /// Replace the entry at `index` on `date` with `input`, which may move it
    /// to another date or week.
    ///
    /// The old week is saved before the new one. A failure between the two
    /// saves leaves the entry removed from its old week only.
    pub fn update_meal(&self, date: NaiveDate, index: usize, input: &MealInput) -> Result<MealRef> {
        let meal = input.validate("newDate")?;
        let entry = MealEntry::new(meal.date, &meal.time, &meal.description)?;

        let mut old_bucket = self.db.load_week(date)?;
        remove_or_not_found(&mut old_bucket, date, index)?;
        self.db.save_week(date, &old_bucket)?;

        if same_week(date, meal.date) {
            old_bucket.insert(meal.date, entry);
            self.db.save_week(meal.date, &old_bucket)?;
        } else {
            let mut new_bucket = self.db.load_week(meal.date)?;
            new_bucket.insert(meal.date, entry);
            self.db.save_week(meal.date, &new_bucket)?;
        }

        Ok(meal.into_ref())
    }

    pub fn delete_meal(&self, date: NaiveDate, index: usize) -> Result<MealEntry> {
        let mut bucket = self.db.load_week(date)?;
        let removed = remove_or_not_found(&mut bucket, date, index)?;
        self.db.save_week(date, &bucket)?;
        Ok(removed)
    }

    // --- Templates ---

    pub fn list_templates(&self) -> Result<TemplateRecord> {
        self.db.load_templates()
    }

    pub fn save_template(&self, name: Option<&str>, description: Option<&str>) -> Result<Template> {
        let name = require("name", name)?;
        let description = require("description", description)?;
        self.db.upsert_template(name, description)?;
        Ok(Template {
            name: name.to_string(),
            description: description.to_string(),
        })
    }
}

impl ValidMeal {
    fn into_ref(self) -> MealRef {
        MealRef {
            date: format_date(self.date),
            time: self.time,
            description: self.description,
        }
    }
}

fn remove_or_not_found(bucket: &mut WeekBucket, date: NaiveDate, index: usize) -> Result<MealEntry> {
    bucket.remove(date, index).ok_or_else(|| {
        MealError::not_found(format!("No meal at index {index} on {}", format_date(date)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn input(date: &str, time: &str, description: &str) -> MealInput {
        MealInput {
            date: Some(date.to_string()),
            time: Some(time.to_string()),
            description: Some(description.to_string()),
        }
    }

    fn descriptions(entries: &[MealEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.description.as_str()).collect()
    }

    #[test]
    fn test_create_sorts_day() {
        let svc = MealService::new_in_memory();
        svc.create_meal(&input("2024-06-10", "08:00", "oats")).unwrap();
        let meal = svc
            .create_meal(&input("2024-06-10", "07:30", "coffee"))
            .unwrap();
        assert_eq!(meal.date, "2024-06-10");
        assert_eq!(meal.time, "07:30");

        let day = svc.list_day(d(2024, 6, 10)).unwrap();
        assert_eq!(descriptions(&day), ["coffee", "oats"]);
        assert!(day[0].timestamp < day[1].timestamp);
    }

    #[test]
    fn test_create_requires_all_fields() {
        let svc = MealService::new_in_memory();
        let mut missing_time = input("2024-06-10", "08:00", "oats");
        missing_time.time = None;
        assert!(matches!(
            svc.create_meal(&missing_time),
            Err(MealError::Validation(_))
        ));

        let mut blank_description = input("2024-06-10", "08:00", "oats");
        blank_description.description = Some(String::new());
        assert!(matches!(
            svc.create_meal(&blank_description),
            Err(MealError::Validation(_))
        ));

        assert!(matches!(
            svc.create_meal(&MealInput::default()),
            Err(MealError::Validation(_))
        ));
        assert!(svc.list_week(d(2024, 6, 10)).unwrap().is_empty());
    }

    #[test]
    fn test_create_rejects_bad_time() {
        let svc = MealService::new_in_memory();
        assert!(matches!(
            svc.create_meal(&input("2024-06-10", "lunchtime", "soup")),
            Err(MealError::Validation(_))
        ));
    }

    #[test]
    fn test_list_day_empty() {
        let svc = MealService::new_in_memory();
        assert!(svc.list_day(d(2024, 6, 10)).unwrap().is_empty());
    }

    #[test]
    fn test_list_week_groups_days() {
        let svc = MealService::new_in_memory();
        svc.create_meal(&input("2024-06-10", "08:00", "oats")).unwrap();
        svc.create_meal(&input("2024-06-16", "20:00", "pizza")).unwrap();
        svc.create_meal(&input("2024-06-17", "08:00", "toast")).unwrap();

        let week = svc.list_week(d(2024, 6, 12)).unwrap();
        let dates: Vec<&str> = week.iter().map(|(date, _)| date).collect();
        assert_eq!(dates, ["2024-06-10", "2024-06-16"]);
    }

    #[test]
    fn test_update_moves_across_weeks() {
        let svc = MealService::new_in_memory();
        svc.create_meal(&input("2024-06-10", "08:00", "oats")).unwrap();

        let meal = svc
            .update_meal(d(2024, 6, 10), 0, &input("2024-06-17", "09:00", "oats"))
            .unwrap();
        assert_eq!(meal.date, "2024-06-17");

        let old_week = svc.list_week(d(2024, 6, 10)).unwrap();
        assert!(old_week.is_empty());

        let new_day = svc.list_day(d(2024, 6, 17)).unwrap();
        assert_eq!(descriptions(&new_day), ["oats"]);
        assert_eq!(new_day[0].time, "09:00");
    }

    #[test]
    fn test_update_cross_week_inserts_sorted() {
        let svc = MealService::new_in_memory();
        svc.create_meal(&input("2024-06-17", "07:00", "coffee")).unwrap();
        svc.create_meal(&input("2024-06-17", "12:00", "lunch")).unwrap();
        svc.create_meal(&input("2024-06-10", "08:00", "oats")).unwrap();

        svc.update_meal(d(2024, 6, 10), 0, &input("2024-06-17", "09:00", "oats"))
            .unwrap();

        let day = svc.list_day(d(2024, 6, 17)).unwrap();
        assert_eq!(descriptions(&day), ["coffee", "oats", "lunch"]);
    }

    #[test]
    fn test_update_within_same_week() {
        let svc = MealService::new_in_memory();
        svc.create_meal(&input("2024-06-10", "08:00", "oats")).unwrap();
        svc.create_meal(&input("2024-06-10", "13:00", "soup")).unwrap();

        svc.update_meal(d(2024, 6, 10), 1, &input("2024-06-12", "12:30", "soup"))
            .unwrap();

        let week = svc.list_week(d(2024, 6, 10)).unwrap();
        assert_eq!(descriptions(week.day(d(2024, 6, 10))), ["oats"]);
        assert_eq!(descriptions(week.day(d(2024, 6, 12))), ["soup"]);
    }

    #[test]
    fn test_update_same_date_reorders() {
        let svc = MealService::new_in_memory();
        svc.create_meal(&input("2024-06-10", "08:00", "oats")).unwrap();
        svc.create_meal(&input("2024-06-10", "09:00", "coffee")).unwrap();

        // Move coffee before oats; removal applies before the insert
        svc.update_meal(d(2024, 6, 10), 1, &input("2024-06-10", "07:00", "coffee"))
            .unwrap();

        let day = svc.list_day(d(2024, 6, 10)).unwrap();
        assert_eq!(descriptions(&day), ["coffee", "oats"]);
    }

    #[test]
    fn test_update_not_found() {
        let svc = MealService::new_in_memory();
        let err = svc
            .update_meal(d(2024, 6, 10), 0, &input("2024-06-10", "08:00", "x"))
            .unwrap_err();
        assert!(matches!(err, MealError::NotFound(_)));

        svc.create_meal(&input("2024-06-10", "08:00", "oats")).unwrap();
        let err = svc
            .update_meal(d(2024, 6, 10), 1, &input("2024-06-10", "08:00", "x"))
            .unwrap_err();
        assert!(matches!(err, MealError::NotFound(_)));
        assert_eq!(svc.list_day(d(2024, 6, 10)).unwrap().len(), 1);
    }

    #[test]
    fn test_update_validates_before_removing() {
        let svc = MealService::new_in_memory();
        svc.create_meal(&input("2024-06-10", "08:00", "oats")).unwrap();

        let mut partial = input("2024-06-11", "08:00", "oats");
        partial.date = None;
        assert!(matches!(
            svc.update_meal(d(2024, 6, 10), 0, &partial),
            Err(MealError::Validation(msg)) if msg.contains("newDate")
        ));
        assert_eq!(svc.list_day(d(2024, 6, 10)).unwrap().len(), 1);
    }

    #[test]
    fn test_delete_only_entry_removes_date() {
        let svc = MealService::new_in_memory();
        svc.create_meal(&input("2024-06-10", "08:00", "oats")).unwrap();
        svc.create_meal(&input("2024-06-11", "08:00", "toast")).unwrap();

        let removed = svc.delete_meal(d(2024, 6, 10), 0).unwrap();
        assert_eq!(removed.description, "oats");

        assert!(svc.list_day(d(2024, 6, 10)).unwrap().is_empty());
        let week = svc.list_week(d(2024, 6, 10)).unwrap();
        let dates: Vec<&str> = week.iter().map(|(date, _)| date).collect();
        assert_eq!(dates, ["2024-06-11"]);
    }

    #[test]
    fn test_delete_shifts_indices() {
        let svc = MealService::new_in_memory();
        svc.create_meal(&input("2024-06-10", "07:00", "a")).unwrap();
        svc.create_meal(&input("2024-06-10", "08:00", "b")).unwrap();
        svc.create_meal(&input("2024-06-10", "09:00", "c")).unwrap();

        svc.delete_meal(d(2024, 6, 10), 0).unwrap();
        // "c" moved from index 2 to index 1
        let removed = svc.delete_meal(d(2024, 6, 10), 1).unwrap();
        assert_eq!(removed.description, "c");
        assert!(matches!(
            svc.delete_meal(d(2024, 6, 10), 1),
            Err(MealError::NotFound(_))
        ));
    }

    #[test]
    fn test_templates() {
        let svc = MealService::new_in_memory();
        assert!(svc.list_templates().unwrap().templates.is_empty());

        svc.save_template(Some("breakfast"), Some("eggs")).unwrap();
        let t = svc.save_template(Some("breakfast"), Some("eggs")).unwrap();
        assert_eq!(t.name, "breakfast");

        let record = svc.list_templates().unwrap();
        assert_eq!(record.templates["breakfast"], "eggs");
        assert_eq!(record.usage["breakfast"], 2);
    }

    #[test]
    fn test_template_requires_fields() {
        let svc = MealService::new_in_memory();
        assert!(matches!(
            svc.save_template(Some("breakfast"), None),
            Err(MealError::Validation(_))
        ));
        assert!(matches!(
            svc.save_template(None, Some("eggs")),
            Err(MealError::Validation(_))
        ));
        assert!(svc.list_templates().unwrap().usage.is_empty());
    }

    #[test]
    fn test_create_echoes_trimmed_time() {
        let svc = MealService::new_in_memory();
        let meal = svc.create_meal(&input("2024-06-10", " 08:00 ", "oats")).unwrap();
        assert_eq!(meal.time, "08:00");
        assert_eq!(svc.list_day(d(2024, 6, 10)).unwrap()[0].time, "08:00");
    }

    #[test]
    fn test_validate_update() {
        assert!(input("2024-06-10", "09:00", "eggs").validate_update().is_ok());

        let mut missing_date = input("2024-06-10", "09:00", "eggs");
        missing_date.date = None;
        assert!(matches!(
            missing_date.validate_update(),
            Err(MealError::Validation(msg)) if msg.contains("newDate")
        ));
        assert!(input("2024-06-10", "late", "eggs").validate_update().is_err());
    }
}
