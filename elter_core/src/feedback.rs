//! # Field Feedback
//!
//! Ground observations sent back by site staff: one formatted line per
//! submission appended to a shared `validation_data.txt`, plus an optional
//! CSV attachment copied next to it under a dated name.
//!
//! ## Example
//!
//! ```rust
//! use elter_core::feedback::FeedbackForm;
//!
//! let mut form = FeedbackForm::default();
//! form.collector_name = "Ana".to_string();
//! form.collector_email = "ana@example.org".to_string();
//! form.site = "Doñana".to_string();
//! assert!(form.validate().is_ok());
//! assert!(form.record_line().contains("for Doñana eLTER Site:"));
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::errors::{ToolbarError, ToolbarResult};
use crate::file_io;

/// Shared file every submission is appended to
pub const VALIDATION_FILE: &str = "validation_data.txt";

pub const NO_CSV_MESSAGE: &str = "No csv file to upload, but thanks for your data and time";
pub const UPLOADED_MESSAGE: &str = "The data has been uploaded, thank you.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackForm {
    pub collector_name: String,
    pub collector_email: String,
    pub site: String,
    pub year: i32,
    /// SOS, MOS or EOS; unset when not observed
    pub phenometric: Option<String>,
    pub day_of_year: u16,
    pub water_presence: bool,
    /// Observed water depth range
    pub depth: (f64, f64),
    pub temperature: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub attachment: Option<PathBuf>,
    /// Base name of the copied CSV
    pub file_base_name: String,
}

impl Default for FeedbackForm {
    fn default() -> Self {
        FeedbackForm {
            collector_name: String::new(),
            collector_email: String::new(),
            site: String::new(),
            year: 2017,
            phenometric: None,
            day_of_year: 162,
            water_presence: false,
            depth: (5.0, 7.5),
            temperature: 25.5,
            latitude: 37.8756,
            longitude: -6.8756,
            attachment: None,
            file_base_name: String::new(),
        }
    }
}

/// Outcome of a submission
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackReceipt {
    pub record_path: PathBuf,
    pub csv_copy: Option<PathBuf>,
    pub message: String,
}

impl FeedbackForm {
    pub const YEARS: std::ops::RangeInclusive<i32> = 2001..=2022;
    pub const PHENOMETRICS: [&'static str; 3] = ["SOS", "MOS", "EOS"];

    pub fn validate(&self) -> ToolbarResult<()> {
        if self.collector_name.trim().is_empty() {
            return Err(ToolbarError::missing_selection("a collector name"));
        }
        if self.site.trim().is_empty() {
            return Err(ToolbarError::missing_selection("an eLTER site"));
        }
        if !Self::YEARS.contains(&self.year) {
            return Err(ToolbarError::invalid_input(
                "Year",
                self.year.to_string(),
                "Must be between 2001 and 2022",
            ));
        }
        if let Some(metric) = &self.phenometric {
            if !Self::PHENOMETRICS.contains(&metric.as_str()) {
                return Err(ToolbarError::invalid_input("Metrics", metric.clone(), "Expected SOS, MOS or EOS"));
            }
        }
        if !(1..=365).contains(&self.day_of_year) {
            return Err(ToolbarError::invalid_input(
                "DOY",
                self.day_of_year.to_string(),
                "Must be between 1 and 365",
            ));
        }
        let (low, high) = self.depth;
        if !(0.0..=10.0).contains(&low) || !(0.0..=10.0).contains(&high) || low > high {
            return Err(ToolbarError::invalid_input(
                "Depth levels",
                format!("{:.1}-{:.1}", low, high),
                "Expected an increasing range within 0..10",
            ));
        }
        if !(-50.0..=50.0).contains(&self.temperature) {
            return Err(ToolbarError::invalid_input(
                "Temperature ºC",
                self.temperature.to_string(),
                "Must be between -50 and 50",
            ));
        }
        if !(-90.0..=90.0).contains(&self.latitude) || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(ToolbarError::invalid_input(
                "Coords",
                format!("{} {}", self.latitude, self.longitude),
                "Not a valid latitude/longitude",
            ));
        }
        if let Some(path) = &self.attachment {
            let is_csv = path.extension().map(|e| e.eq_ignore_ascii_case("csv")).unwrap_or(false);
            if !is_csv {
                return Err(ToolbarError::invalid_input(
                    "Attached file",
                    path.display().to_string(),
                    "Only .csv files can be attached",
                ));
            }
        }
        Ok(())
    }

    /// The line appended to the validation file
    pub fn record_line(&self) -> String {
        let attached = self
            .attachment
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "None".to_string());
        format!(
            "Collector {} with email {} have upload some data for {} eLTER Site: \
             Year: {} Metrics: {} DOY: {} Flood: {} Depth: ({:.1}, {:.1}) LST: {} \
             Coords: {} {} Attached file: {}\n",
            self.collector_name.trim(),
            self.collector_email.trim(),
            self.site.trim(),
            self.year,
            self.phenometric.as_deref().unwrap_or("None"),
            self.day_of_year,
            self.water_presence,
            self.depth.0,
            self.depth.1,
            self.temperature,
            self.latitude,
            self.longitude,
            attached,
        )
    }

    fn csv_name(&self, today: NaiveDate) -> String {
        let base = match self.file_base_name.trim() {
            "" => self.site.trim().replace(' ', "_"),
            typed => typed.to_string(),
        };
        format!("{}_{}.csv", base, today.format("%Y-%m-%d"))
    }

    /// Append the record and copy the attachment into `data_dir`.
    pub fn submit(&self, data_dir: &Path, user_id: &str) -> ToolbarResult<FeedbackReceipt> {
        self.submit_on(data_dir, user_id, Local::now().date_naive())
    }

    /// [`FeedbackForm::submit`] with an explicit date for the CSV name
    pub fn submit_on(&self, data_dir: &Path, user_id: &str, today: NaiveDate) -> ToolbarResult<FeedbackReceipt> {
        self.validate()?;
        fs::create_dir_all(data_dir)
            .map_err(|e| ToolbarError::file_error("create directory", data_dir.display().to_string(), e.to_string()))?;

        let record_path = data_dir.join(VALIDATION_FILE);
        file_io::append_locked(&record_path, user_id, &self.record_line())?;
        log::info!("Feedback from {} for {} recorded", self.collector_name, self.site);

        let source = match &self.attachment {
            Some(path) => path,
            None => {
                return Ok(FeedbackReceipt {
                    record_path,
                    csv_copy: None,
                    message: NO_CSV_MESSAGE.to_string(),
                })
            }
        };
        let target = data_dir.join(self.csv_name(today));
        fs::copy(source, &target).map_err(|e| {
            ToolbarError::file_error("copy", source.display().to_string(), e.to_string())
        })?;
        log::info!("Copied {} to {}", source.display(), target.display());

        Ok(FeedbackReceipt {
            record_path,
            csv_copy: Some(target),
            message: UPLOADED_MESSAGE.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = env::temp_dir().join(format!("elter_feedback_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn form() -> FeedbackForm {
        FeedbackForm {
            collector_name: "Ana".to_string(),
            collector_email: "ana@example.org".to_string(),
            site: "Doñana".to_string(),
            phenometric: Some("SOS".to_string()),
            water_presence: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_record_line_format() {
        let line = form().record_line();
        assert!(line.starts_with("Collector Ana with email ana@example.org have upload some data for Doñana eLTER Site:"));
        assert!(line.contains("Year: 2017 Metrics: SOS DOY: 162 Flood: true Depth: (5.0, 7.5) LST: 25.5"));
        assert!(line.contains("Coords: 37.8756 -6.8756 Attached file: None"));
        assert!(line.ends_with('\n'));
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let mut f = form();
        f.year = 2030;
        assert_eq!(f.validate().unwrap_err().error_code(), "INVALID_INPUT");

        let mut f = form();
        f.depth = (8.0, 2.0);
        assert!(f.validate().is_err());

        let mut f = form();
        f.collector_name = "  ".to_string();
        assert_eq!(f.validate().unwrap_err().error_code(), "MISSING_SELECTION");
    }

    #[test]
    fn test_submit_without_csv_appends_record() {
        let dir = scratch_dir("no_csv");
        let first = form().submit(&dir, "ana").unwrap();
        assert_eq!(first.message, NO_CSV_MESSAGE);
        assert!(first.csv_copy.is_none());
        form().submit(&dir, "ana").unwrap();

        let text = fs::read_to_string(dir.join(VALIDATION_FILE)).unwrap();
        assert_eq!(text.lines().count(), 2);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_submit_copies_csv_with_date() {
        let dir = scratch_dir("csv");
        fs::create_dir_all(&dir).unwrap();
        let source = dir.join("field.csv");
        fs::write(&source, "lat,lon,depth\n37.1,-6.4,0.5\n").unwrap();

        let mut f = form();
        f.attachment = Some(source);
        f.file_base_name = "donana_plots".to_string();
        let today = NaiveDate::from_ymd_opt(2023, 5, 4).unwrap();
        let receipt = f.submit_on(&dir, "ana", today).unwrap();

        let copy = receipt.csv_copy.unwrap();
        assert_eq!(copy, dir.join("donana_plots_2023-05-04.csv"));
        assert_eq!(fs::read_to_string(copy).unwrap(), "lat,lon,depth\n37.1,-6.4,0.5\n");
        assert_eq!(receipt.message, UPLOADED_MESSAGE);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_submit_rejects_non_csv() {
        let dir = scratch_dir("non_csv");
        fs::create_dir_all(&dir).unwrap();
        let source = dir.join("photo.jpg");
        fs::write(&source, [0u8, 1, 2]).unwrap();

        let mut f = form();
        f.attachment = Some(source);
        assert!(f.submit(&dir, "ana").is_err());
        assert!(!dir.join(VALIDATION_FILE).exists());
        let _ = fs::remove_dir_all(&dir);
    }
}
