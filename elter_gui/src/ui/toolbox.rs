//! Toolbox launcher (top of the map)
//!
//! One button per product panel plus the feedback form. The active panel's
//! button is highlighted.

use iced::widget::{button, row, text, Row, Space};
use iced::{Alignment, Element, Length, Padding};

use elter_core::products::strategy_for;
use elter_core::ProductKind;

use crate::Message;

pub fn view_toolbox(open: bool, active: Option<ProductKind>, feedback_open: bool) -> Element<'static, Message> {
    let wrench = button(text(if open { "🔧 ◀" } else { "🔧" }).size(13))
        .on_press(Message::ToggleToolbox)
        .padding(Padding::from([4, 8]))
        .style(if open { button::primary } else { button::secondary });

    let mut tools: Row<'static, Message> = row![wrench].spacing(4).align_y(Alignment::Center);

    if open {
        for kind in ProductKind::ALL {
            let spec = strategy_for(kind).panel_spec();
            let style = if active == Some(kind) { button::primary } else { button::secondary };
            tools = tools.push(
                button(text(format!("{} {}", spec.icon, kind.display_name())).size(11))
                    .on_press(Message::OpenPanel(kind))
                    .padding(Padding::from([4, 8]))
                    .style(style),
            );
        }
        tools = tools.push(
            button(text("📋 Feedback").size(11))
                .on_press(Message::ToggleFeedback)
                .padding(Padding::from([4, 8]))
                .style(if feedback_open { button::primary } else { button::secondary }),
        );
    }

    row![
        tools,
        Space::new().width(Length::Fill),
        button(text("Home view").size(11))
            .on_press(Message::ResetView)
            .padding(Padding::from([4, 8]))
            .style(button::text),
    ]
    .align_y(Alignment::Center)
    .into()
}
