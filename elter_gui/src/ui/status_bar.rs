//! Status Bar (Bottom)
//!
//! Displays:
//! - Compute service in use
//! - Phase of the open panel
//! - Status messages

use iced::widget::{row, text, Space};
use iced::{Element, Length, Padding};

use elter_core::PanelPhase;

use crate::Message;

/// Render the status bar
pub fn view_status_bar<'a>(
    compute_url: Option<&'a str>,
    phase: Option<PanelPhase>,
    status: &'a str,
) -> Element<'a, Message> {
    let service = match compute_url {
        Some(url) => format!("Compute: {}", url),
        None => "Offline".to_string(),
    };
    let phase = match phase {
        Some(phase) => format!("  [{}]", phase.display_name()),
        None => String::new(),
    };

    row![
        text(service).size(10),
        text(phase).size(10).color([0.3, 0.4, 0.6]),
        Space::new().width(Length::Fill),
        text(status).size(10),
    ]
    .padding(Padding::from([4, 0]))
    .into()
}
