use warp::reply::Html;

use crate::models::{Accommodation, Budget, Interest, Pace, TravelStyle, DEFAULT_DAYS, MAX_DAYS, MIN_DAYS};

const TEMPLATE: &str = include_str!("../../static/index.html");

pub fn index() -> Html<String> {
    warp::reply::html(render())
}

fn render() -> String {
    TEMPLATE
        .replace("{{MIN_DAYS}}", &MIN_DAYS.to_string())
        .replace("{{MAX_DAYS}}", &MAX_DAYS.to_string())
        .replace("{{DEFAULT_DAYS}}", &DEFAULT_DAYS.to_string())
        .replace("{{BUDGET_OPTIONS}}", &options(Budget::ALL.iter().map(|b| b.label())))
        .replace("{{STYLE_OPTIONS}}", &options(TravelStyle::ALL.iter().map(|s| s.label())))
        .replace(
            "{{ACCOMMODATION_OPTIONS}}",
            &options(Accommodation::ALL.iter().map(|a| a.label())),
        )
        .replace(
            "{{INTEREST_CHECKBOXES}}",
            &choices("checkbox", "interests", Interest::ALL.iter().map(|i| i.label()), false),
        )
        .replace(
            "{{PACE_RADIOS}}",
            &choices("radio", "pace", Pace::ALL.iter().map(|p| p.label()), true),
        )
}

fn options<'a>(labels: impl Iterator<Item = &'a str>) -> String {
    labels
        .map(|label| format!("<option value=\"{0}\">{0}</option>", escape(label)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn choices<'a>(
    kind: &str,
    name: &str,
    labels: impl Iterator<Item = &'a str>,
    check_first: bool,
) -> String {
    labels
        .enumerate()
        .map(|(i, label)| {
            format!(
                "<label><input type=\"{}\" name=\"{}\" value=\"{}\"{}> {}</label>",
                kind,
                name,
                escape(label),
                if check_first && i == 0 { " checked" } else { "" },
                escape(label),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
