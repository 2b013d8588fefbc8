//! Spoken alert wording

use cane_events::Event;

/// Localized name for an event label; unknown labels pass through
pub fn translate_label(label: &str) -> &str {
    match label {
        "person" => "行人",
        "car" => "車輛",
        "bike" => "腳踏車",
        "drop" => "落差",
        "step" => "台階",
        "step_down" => "下台階",
        "background" => "背景",
        other => other,
    }
}

/// Template sentence for an event with a known distance
pub fn alert_sentence(event: &Event) -> Option<String> {
    let distance = event.distance_m()?;
    Some(format!(
        "前方有 {}，距離約 {:.1} 公尺，請注意",
        translate_label(event.label()),
        distance
    ))
}
