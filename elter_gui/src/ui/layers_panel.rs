//! Layer list (right sidebar): visibility and opacity per raster layer

use iced::widget::{checkbox, column, container, row, slider, text, Column, Space};
use iced::{Alignment, Element, Length, Padding};

use crate::ui::map_canvas::MapView;
use crate::Message;

pub fn view_layers_panel(map: &MapView) -> Element<'_, Message> {
    let mut list: Column<'_, Message> = column![text("Layers").size(12)].spacing(6);

    if map.layers().is_empty() {
        list = list.push(text("(none)").size(10).color([0.5, 0.5, 0.5]));
    }

    for layer in map.layers().iter().rev() {
        let name = layer.name.clone();
        let toggle_name = layer.name.clone();
        let visible = checkbox(layer.visible)
            .label(layer.name.clone())
            .on_toggle(move |on| Message::LayerVisibility(toggle_name.clone(), on))
            .text_size(10);
        let opacity = row![
            Space::new().width(20),
            slider(0.0..=1.0, layer.opacity, move |v| Message::LayerOpacity(name.clone(), v))
                .step(0.05)
                .width(Length::Fixed(110.0)),
            Space::new().width(6),
            text(format!("{:.0}%", layer.opacity * 100.0)).size(9),
        ]
        .align_y(Alignment::Center);
        list = list.push(column![visible, opacity].spacing(2));
    }

    container(list)
        .padding(Padding::from([6, 8]))
        .width(Length::Fixed(200.0))
        .style(container::bordered_box)
        .into()
}
