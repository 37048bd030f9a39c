//! Toolbar Panel
//!
//! Draws any product panel from its `PanelSpec`:
//! - Network and site dropdowns
//! - One widget per parameter
//! - Apply / Reset / Close buttons
//! - Parameters and Export tabs
//! - Output area
//!
//! The body collapses to the header when the pointer leaves an unpinned
//! panel.

use std::collections::BTreeMap;

use iced::widget::{
    button, checkbox, column, container, mouse_area, pick_list, radio, row, rule, slider, text, text_input, Column,
    Row, Space,
};
use iced::{Alignment, Element, Length, Padding};

use elter_core::products::{ParamSpec, ParamValue, ParamWidget};
use elter_core::PanelController;

use super::export_tab::{self, ExportForm};
use super::map_canvas::hex_to_color;
use super::output::view_output;
use crate::{Message, PanelTab};

pub fn view_panel<'a>(
    panel: &'a PanelController,
    tab: PanelTab,
    date_text: &'a BTreeMap<String, String>,
    export_form: &'a ExportForm,
) -> Element<'a, Message> {
    let spec = panel.spec();
    let accent = hex_to_color(&spec.accent);

    let pin_label = if panel.visibility().is_pinned() { "📌" } else { "📍" };
    let header = row![
        text(format!("{} {}", spec.icon, spec.title)).size(14).color(accent),
        Space::new().width(Length::Fill),
        button(text(pin_label).size(11))
            .on_press(Message::TogglePinned)
            .padding(Padding::from([2, 6]))
            .style(button::text),
        button(text("✕").size(11))
            .on_press(Message::ClosePanel)
            .padding(Padding::from([2, 6]))
            .style(button::text),
    ]
    .align_y(Alignment::Center);

    let mut content: Column<'a, Message> = column![header].spacing(6);

    if panel.is_expanded() {
        let tabs = row![
            tab_button("Parameters", PanelTab::Parameters, tab),
            tab_button("Export", PanelTab::Export, tab),
        ]
        .spacing(4);

        let body: Column<'a, Message> = match tab {
            PanelTab::Parameters => view_parameters(panel, date_text),
            PanelTab::Export => export_tab::view(panel, export_form),
        };

        content = content
            .push(tabs)
            .push(rule::horizontal(1))
            .push(body)
            .push(view_output(panel.output()));
    }

    let framed = container(content)
        .padding(8)
        .width(Length::Fixed(340.0))
        .style(container::bordered_box);

    mouse_area(framed)
        .on_enter(Message::PointerEntered)
        .on_exit(Message::PointerLeft)
        .into()
}

fn tab_button(label: &'static str, target: PanelTab, current: PanelTab) -> Element<'static, Message> {
    button(text(label).size(11))
        .on_press(Message::TabSelected(target))
        .padding(Padding::from([3, 10]))
        .style(if target == current { button::primary } else { button::secondary })
        .into()
}

fn view_parameters<'a>(panel: &'a PanelController, date_text: &'a BTreeMap<String, String>) -> Column<'a, Message> {
    let networks: Vec<String> = panel.network_names().into_iter().map(str::to_string).collect();
    let sites: Vec<String> = panel.site_names().into_iter().map(str::to_string).collect();
    let state = panel.state();

    let mut params: Column<'a, Message> = column![
        labeled(
            "eLTER Network",
            pick_list(networks, state.network.as_ref().map(|n| n.name.clone()), Message::NetworkSelected)
                .placeholder("Select a network")
                .width(Length::Fill)
                .text_size(11)
                .into(),
        ),
        labeled(
            "eLTER Site",
            pick_list(sites, state.site.as_ref().map(|s| s.name.clone()), Message::SiteSelected)
                .placeholder("Select a site")
                .width(Length::Fill)
                .text_size(11)
                .into(),
        ),
    ]
    .spacing(6);

    for spec in &panel.spec().params {
        params = params.push(view_param(spec, panel.params().get(&spec.key), date_text));
    }

    params.push(
        row![
            button(text("Apply").size(11))
                .on_press(Message::Apply)
                .padding(Padding::from([4, 16]))
                .style(button::primary),
            Space::new().width(6),
            button(text("Reset").size(11))
                .on_press(Message::Reset)
                .padding(Padding::from([4, 16]))
                .style(button::secondary),
        ]
        .padding(Padding::from([4, 0])),
    )
}

fn view_param<'a>(
    spec: &'a ParamSpec,
    value: Option<&'a ParamValue>,
    date_text: &'a BTreeMap<String, String>,
) -> Element<'a, Message> {
    let key = spec.key.clone();

    match &spec.widget {
        ParamWidget::Choice { options, .. } => {
            let selected = match value {
                Some(ParamValue::Text(Some(v))) => Some(v.clone()),
                _ => None,
            };
            labeled(
                &spec.label,
                pick_list(options.as_slice(), selected, move |v: String| {
                    Message::ParamChanged(key.clone(), ParamValue::Text(Some(v)))
                })
                .placeholder("None")
                .width(Length::Fill)
                .text_size(11)
                .into(),
            )
        }
        ParamWidget::Radio { options, .. } => {
            let selected = match value {
                Some(ParamValue::Text(Some(v))) => options.iter().position(|o| o == v),
                _ => None,
            };
            let mut buttons: Row<'a, Message> = row![].spacing(10);
            for (i, option) in options.iter().enumerate() {
                let key = key.clone();
                let picked = option.clone();
                buttons = buttons.push(
                    radio(option.as_str(), i, selected, move |_| {
                        Message::ParamChanged(key.clone(), ParamValue::Text(Some(picked.clone())))
                    })
                    .size(12)
                    .text_size(11),
                );
            }
            labeled(&spec.label, buttons.into())
        }
        ParamWidget::IntSlider { min, max, default } => {
            let current = match value {
                Some(ParamValue::Int(v)) => *v,
                _ => *default,
            };
            labeled(
                &spec.label,
                row![
                    slider(*min..=*max, current, move |v| Message::ParamChanged(key.clone(), ParamValue::Int(v)))
                        .width(Length::Fill),
                    Space::new().width(6),
                    text(current.to_string()).size(11).width(Length::Fixed(36.0)),
                ]
                .align_y(Alignment::Center)
                .into(),
            )
        }
        ParamWidget::FloatSlider {
            min,
            max,
            step,
            default,
        } => {
            let current = match value {
                Some(ParamValue::Float(v)) => *v,
                _ => *default,
            };
            labeled(
                &spec.label,
                row![
                    slider(*min..=*max, current, move |v| Message::ParamChanged(
                        key.clone(),
                        ParamValue::Float(v)
                    ))
                    .step(*step)
                    .width(Length::Fill),
                    Space::new().width(6),
                    text(format!("{:.2}", current)).size(11).width(Length::Fixed(36.0)),
                ]
                .align_y(Alignment::Center)
                .into(),
            )
        }
        ParamWidget::Date => {
            let typed = date_text.get(&spec.key).map(String::as_str).unwrap_or("");
            let commit_key = key.clone();
            labeled(
                &spec.label,
                text_input("YYYY-MM-DD", typed)
                    .on_input(move |s| Message::DateTyped(key.clone(), s))
                    .on_submit(Message::DateCommitted(commit_key))
                    .padding(4)
                    .size(11)
                    .into(),
            )
        }
        ParamWidget::Flag { default } => {
            let on = match value {
                Some(ParamValue::Flag(v)) => *v,
                _ => *default,
            };
            checkbox(on)
                .label(spec.label.as_str())
                .on_toggle(move |b| Message::ParamChanged(key.clone(), ParamValue::Flag(b)))
                .text_size(11)
                .into()
        }
    }
}

fn labeled<'a>(label: &'a str, widget: Element<'a, Message>) -> Element<'a, Message> {
    row![text(label).size(11).width(Length::Fixed(110.0)), widget]
        .align_y(Alignment::Center)
        .into()
}
