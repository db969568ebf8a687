use citycast_core::{
    ScreenView,
    view::{DayView, WeatherView},
};

/// Text block for the whole screen.
pub fn screen(view: &ScreenView) -> String {
    let mut out = String::new();

    if let Some(notice) = &view.notice {
        out.push_str(&format!("! {notice}\n"));
    }

    if view.search_open {
        for row in &view.candidate_rows {
            out.push_str(&format!("  > {row}\n"));
        }
    }

    match &view.weather {
        Some(weather) => out.push_str(&self::weather(weather)),
        None if view.loading => out.push_str("Loading forecast...\n"),
        None => out.push_str("No city selected yet.\n"),
    }

    out
}

pub fn weather(w: &WeatherView) -> String {
    let mut out = format!(
        "{}\n\n  [{}]  {}  {}\n\n  wind {}   humidity {}   sunrise {}\n",
        w.location, w.icon, w.temperature, w.condition, w.wind, w.humidity, w.sunrise,
    );

    if !w.days.is_empty() {
        out.push_str("\nDaily forecast\n");
        for day in &w.days {
            out.push_str(&day_row(day));
        }
    }

    out
}

fn day_row(day: &DayView) -> String {
    format!("  {:<10} {:>7}  [{}]\n", day.weekday, day.temperature, day.icon)
}
