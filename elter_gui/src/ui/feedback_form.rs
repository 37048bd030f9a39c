//! Field feedback form
//!
//! Collector details, the observation itself and an optional CSV picked
//! with the native file dialog.

use iced::widget::{button, checkbox, column, container, pick_list, row, slider, text, text_input, Space};
use iced::{Alignment, Element, Length, Padding};

use elter_core::feedback::FeedbackForm;

use crate::Message;

/// The form plus the raw text of its numeric fields
#[derive(Debug, Clone)]
pub struct FeedbackDraft {
    pub form: FeedbackForm,
    pub temperature: String,
    pub latitude: String,
    pub longitude: String,
}

impl FeedbackDraft {
    pub fn new(collector_name: String) -> Self {
        let form = FeedbackForm {
            collector_name,
            ..FeedbackForm::default()
        };
        FeedbackDraft {
            temperature: form.temperature.to_string(),
            latitude: form.latitude.to_string(),
            longitude: form.longitude.to_string(),
            form,
        }
    }

    /// Copy the typed numbers into the form. Unreadable fields keep their
    /// previous value and are named in the returned list.
    pub fn commit_numbers(&mut self) -> Vec<&'static str> {
        let mut rejected = Vec::new();
        match self.temperature.trim().parse() {
            Ok(v) => self.form.temperature = v,
            Err(_) => rejected.push("Temperature ºC"),
        }
        match self.latitude.trim().parse() {
            Ok(v) => self.form.latitude = v,
            Err(_) => rejected.push("Latitude"),
        }
        match self.longitude.trim().parse() {
            Ok(v) => self.form.longitude = v,
            Err(_) => rejected.push("Longitude"),
        }
        rejected
    }
}

const METRICS: [&str; 3] = FeedbackForm::PHENOMETRICS;

pub fn view_feedback_form(draft: &FeedbackDraft) -> Element<'_, Message> {
    let form = &draft.form;
    let attached = form
        .attachment
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "No file".to_string());

    let content = column![
        text("📋 Field Feedback").size(14),
        labeled_input("Collector:", &form.collector_name, Message::FeedbackName),
        labeled_input("Email:", &form.collector_email, Message::FeedbackEmail),
        labeled_input("eLTER Site:", &form.site, Message::FeedbackSite),
        row![
            text("Year:").size(11).width(Length::Fixed(90.0)),
            slider(FeedbackForm::YEARS, form.year, Message::FeedbackYear).width(Length::Fill),
            Space::new().width(6),
            text(form.year.to_string()).size(11).width(Length::Fixed(36.0)),
        ]
        .align_y(Alignment::Center),
        row![
            text("Metrics:").size(11).width(Length::Fixed(90.0)),
            pick_list(&METRICS[..], form.phenometric.as_deref(), |m: &str| Message::FeedbackMetric(
                m.to_string()
            ))
            .placeholder("None")
            .text_size(11),
        ]
        .align_y(Alignment::Center),
        row![
            text("DOY:").size(11).width(Length::Fixed(90.0)),
            slider(1..=365, form.day_of_year, Message::FeedbackDoy).width(Length::Fill),
            Space::new().width(6),
            text(form.day_of_year.to_string()).size(11).width(Length::Fixed(36.0)),
        ]
        .align_y(Alignment::Center),
        checkbox(form.water_presence)
            .label("Water presence")
            .on_toggle(Message::FeedbackWater)
            .text_size(11),
        row![
            text("Depth levels:").size(11).width(Length::Fixed(90.0)),
            slider(0.0..=10.0, form.depth.0, Message::FeedbackDepthLow)
                .step(0.1)
                .width(Length::Fill),
            slider(0.0..=10.0, form.depth.1, Message::FeedbackDepthHigh)
                .step(0.1)
                .width(Length::Fill),
            Space::new().width(6),
            text(format!("{:.1}-{:.1}", form.depth.0, form.depth.1)).size(11),
        ]
        .spacing(4)
        .align_y(Alignment::Center),
        labeled_input("Temperature ºC:", &draft.temperature, Message::FeedbackTemperature),
        labeled_input("Latitude:", &draft.latitude, Message::FeedbackLatitude),
        labeled_input("Longitude:", &draft.longitude, Message::FeedbackLongitude),
        labeled_input("CSV name:", &form.file_base_name, Message::FeedbackBaseName),
        row![
            button(text("Attach CSV").size(11))
                .on_press(Message::FeedbackPickCsv)
                .padding(Padding::from([4, 10]))
                .style(button::secondary),
            Space::new().width(6),
            text(attached).size(10),
        ]
        .align_y(Alignment::Center),
        row![
            button(text("Apply").size(11))
                .on_press(Message::FeedbackSubmit)
                .padding(Padding::from([4, 16]))
                .style(button::primary),
            Space::new().width(6),
            button(text("Close").size(11))
                .on_press(Message::ToggleFeedback)
                .padding(Padding::from([4, 16]))
                .style(button::secondary),
        ],
    ]
    .spacing(6);

    container(content)
        .padding(8)
        .width(Length::Fixed(340.0))
        .style(container::bordered_box)
        .into()
}

fn labeled_input<'a>(
    label: &'a str,
    value: &'a str,
    on_change: impl Fn(String) -> Message + 'a,
) -> Element<'a, Message> {
    row![
        text(label).size(11).width(Length::Fixed(90.0)),
        text_input("", value)
            .on_input(on_change)
            .width(Length::Fill)
            .padding(4)
            .size(11),
    ]
    .align_y(Alignment::Center)
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_numbers_keeps_bad_fields() {
        let mut draft = FeedbackDraft::new("Ana".to_string());
        draft.temperature = "18.5".to_string();
        draft.latitude = "north".to_string();
        let rejected = draft.commit_numbers();
        assert_eq!(draft.form.temperature, 18.5);
        assert_eq!(draft.form.latitude, 37.8756);
        assert_eq!(rejected, vec!["Latitude"]);
    }
}
