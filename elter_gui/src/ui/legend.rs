//! Legend box shown over the map while a panel's legend flag is on

use iced::widget::{column, container, row, text, Column, Space};
use iced::{Alignment, Element, Length};

use elter_core::map::LegendSpec;

use super::map_canvas::hex_to_color;
use crate::Message;

pub fn view_legend(legend: &LegendSpec) -> Element<'_, Message> {
    let mut entries: Column<'_, Message> = column![].spacing(2);
    for (label, hex) in &legend.entries {
        let color = hex_to_color(hex);
        let swatch = container(Space::new().width(14).height(10))
            .style(move |_| container::Style::default().background(color));
        entries = entries.push(
            row![swatch, Space::new().width(6), text(label).size(10)].align_y(Alignment::Center),
        );
    }

    container(column![text(&legend.title).size(12), entries].spacing(4))
        .padding(6)
        .width(Length::Shrink)
        .style(container::bordered_box)
        .into()
}
