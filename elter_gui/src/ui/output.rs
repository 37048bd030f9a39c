//! Output area at the bottom of a panel

use iced::widget::{column, container, scrollable, text, Column};
use iced::{Element, Length};

use elter_core::panel::{OutputLevel, OutputLog};

use crate::Message;

pub fn view_output(log: &OutputLog) -> Element<'_, Message> {
    let mut lines: Column<'_, Message> = column![].spacing(2);
    for line in log.lines() {
        let color = match line.level {
            OutputLevel::Info => [0.2, 0.2, 0.2],
            OutputLevel::Warning => [0.6, 0.4, 0.0],
            OutputLevel::Error => [0.7, 0.1, 0.1],
        };
        lines = lines.push(text(line.to_string()).size(10).color(color));
    }
    if log.is_empty() {
        lines = lines.push(text("").size(10));
    }

    container(scrollable(lines).height(Length::Fixed(90.0)))
        .padding(4)
        .width(Length::Fill)
        .style(container::bordered_box)
        .into()
}
