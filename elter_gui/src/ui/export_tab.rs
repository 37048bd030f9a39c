//! Export tab: pick a raster added by Apply and send it to the compute
//! service as a background export.

use iced::widget::{button, column, pick_list, row, slider, text, text_input, Column, Space};
use iced::{Alignment, Element, Length, Padding};

use elter_core::compute::ExportState;
use elter_core::config::ExportDefaults;
use elter_core::{ExportOptions, PanelController};

use crate::Message;

pub const SCALE_RANGE: std::ops::RangeInclusive<f64> = 10.0..=1000.0;

/// Values typed into the export tab
#[derive(Debug, Clone, PartialEq)]
pub struct ExportForm {
    pub raster: Option<String>,
    pub scale: f64,
    pub crs: String,
    pub file_name: String,
}

impl ExportForm {
    pub fn from_defaults(defaults: &ExportDefaults) -> Self {
        ExportForm {
            raster: None,
            scale: defaults.scale.clamp(*SCALE_RANGE.start(), *SCALE_RANGE.end()),
            crs: defaults.crs.clone(),
            file_name: String::new(),
        }
    }

    pub fn options(&self) -> ExportOptions {
        ExportOptions {
            raster: self.raster.clone(),
            scale: self.scale.to_string(),
            crs: self.crs.clone(),
            file_name: self.file_name.clone(),
        }
    }
}

pub fn view<'a>(panel: &'a PanelController, form: &'a ExportForm) -> Column<'a, Message> {
    let rasters: Vec<String> = panel.registry().names().into_iter().map(str::to_string).collect();

    let mut content = column![
        row![
            text("Raster:").size(11).width(Length::Fixed(80.0)),
            pick_list(rasters, form.raster.clone(), Message::ExportRasterSelected)
                .placeholder("Apply a product first")
                .width(Length::Fill)
                .text_size(11),
        ]
        .align_y(Alignment::Center),
        row![
            text("Scale (m):").size(11).width(Length::Fixed(80.0)),
            slider(SCALE_RANGE, form.scale, Message::ExportScaleChanged)
                .step(10.0)
                .width(Length::Fill),
            Space::new().width(6),
            text(format!("{:.0}", form.scale)).size(11).width(Length::Fixed(40.0)),
        ]
        .align_y(Alignment::Center),
        row![
            text("CRS (EPSG):").size(11).width(Length::Fixed(80.0)),
            text_input("4326", &form.crs)
                .on_input(Message::ExportCrsChanged)
                .padding(4)
                .size(11),
        ]
        .align_y(Alignment::Center),
        row![
            text("Output:").size(11).width(Length::Fixed(80.0)),
            text_input("Insert the name", &form.file_name)
                .on_input(Message::ExportFileNameChanged)
                .padding(4)
                .size(11),
        ]
        .align_y(Alignment::Center),
        row![
            button(text("Download").size(11))
                .on_press(Message::Export)
                .padding(Padding::from([4, 12]))
                .style(button::primary),
            Space::new().width(6),
            button(text("Check exports").size(11))
                .on_press(Message::RefreshExports)
                .padding(Padding::from([4, 12]))
                .style(button::secondary),
        ],
    ]
    .spacing(6);

    for ticket in panel.exports() {
        let (label, color) = match ticket.state {
            ExportState::Queued => ("queued", [0.5, 0.5, 0.5]),
            ExportState::Running => ("running", [0.2, 0.4, 0.7]),
            ExportState::Completed => ("done", [0.1, 0.5, 0.2]),
            ExportState::Failed => ("failed", [0.7, 0.1, 0.1]),
        };
        content = content.push(
            text(format!(
                "{} - {}{}",
                ticket.task_id,
                label,
                ticket.destination.as_deref().map(|d| format!(" ({})", d)).unwrap_or_default()
            ))
            .size(10)
            .color(color),
        );
    }

    content
}
