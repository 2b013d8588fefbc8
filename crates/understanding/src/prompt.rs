//! Prompt construction and plain-text fallbacks

use cane_events::Event;

pub(crate) const VOICE_SYSTEM_PROMPT: &str = "你是溫柔貼心的導盲志工。\
請用溫暖、關懷的語氣，像朋友一樣提醒使用者注意前方的狀況。\
規則：1. 不要使用任何 Markdown (如 **粗體**)。 2. 不要解釋原因。 3. 不要列點。 4. 直接輸出要唸出的句子。\
例如：『小心喔，前方三公尺有下樓階梯，請慢慢走。』";

pub(crate) const CAREGIVER_SYSTEM_PROMPT: &str = "你是視障者的安全回報系統。\
請將收到的事件資訊整理成給『家屬/照護者』的LINE通知訊息。\
規則：1. 語氣要客觀、精確、專業。 2. 讓家屬清楚知道發生什麼危險，但不要過度恐慌。 3. 不要使用 Markdown。 4. 直接輸出訊息內容。\
格式範例：『【安全回報】使用者前方 2.5 公尺偵測到台階，系統已發出語音提醒。』";

fn distance_text(event: &Event) -> String {
    match event.distance_m() {
        Some(d) => format!("{:.1} 公尺", d),
        None => "距離未知".to_string(),
    }
}

/// User prompt for spoken rewording; `None` when there are no events
pub(crate) fn voice_prompt(events: &[Event], original: &str) -> Option<String> {
    if events.is_empty() {
        return None;
    }
    let details: Vec<String> = events
        .iter()
        .map(|e| {
            let direction = e.direction().map_or("方向未知", |d| d.as_str());
            format!(
                "事件：{}，{}，{}，等級 {}。",
                e.label(),
                distance_text(e),
                direction,
                e.severity()
            )
        })
        .collect();
    Some(format!("原始播報：{}\n事件細節：{}", original, details.join("；")))
}

/// User prompt for the caregiver report; `None` when there are no events
pub(crate) fn caregiver_prompt(events: &[Event], original: &str) -> Option<String> {
    if events.is_empty() {
        return None;
    }
    let details: Vec<String> = events
        .iter()
        .map(|e| {
            format!(
                "物件：{} | 距離：{} | 等級：{}",
                e.label(),
                distance_text(e),
                e.severity()
            )
        })
        .collect();
    Some(format!("系統語音內容：{}\n感測器數據：{}", original, details.join("；")))
}

/// Caregiver message used when the model cannot help
pub fn caregiver_fallback(original: &str, model_reachable: bool) -> String {
    if model_reachable {
        format!("[系統自動回報] {}", original)
    } else {
        format!("[系統自動回報] {} (AI 未連線)", original)
    }
}

/// Deterministic digest: `type@source (severity)` joined by `；`
pub fn summary_line(base_url: &str, model: &str, events: &[Event]) -> String {
    if events.is_empty() {
        return String::new();
    }
    let items: Vec<String> = events
        .iter()
        .map(|e| format!("{}@{} ({})", e.kind(), e.source(), e.severity()))
        .collect();
    format!("Ollama summary [{}/{}]: {}", base_url, model, items.join("；"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cane_events::{Direction, EventSource, Severity};

    fn events() -> Vec<Event> {
        vec![
            Event::builder("vision.person", EventSource::Camera, Severity::High)
                .distance_m(1.84)
                .direction(Direction::Left)
                .object_label("person")
                .build()
                .unwrap(),
            Event::builder("tof.step", EventSource::Tof, Severity::Mid)
                .build()
                .unwrap(),
        ]
    }

    #[test]
    fn test_voice_prompt_details() {
        let prompt = voice_prompt(&events(), "前方有 行人").unwrap();
        assert_eq!(
            prompt,
            "原始播報：前方有 行人\n事件細節：事件：person，1.8 公尺，left，等級 high。；事件：step，距離未知，方向未知，等級 mid。"
        );
        assert!(voice_prompt(&[], "x").is_none());
    }

    #[test]
    fn test_caregiver_prompt_details() {
        let prompt = caregiver_prompt(&events(), "前方有 行人").unwrap();
        assert!(prompt.starts_with("系統語音內容：前方有 行人\n感測器數據："));
        assert!(prompt.contains("物件：person | 距離：1.8 公尺 | 等級：high"));
    }

    #[test]
    fn test_summary_line() {
        assert_eq!(
            summary_line("http://localhost:11434", "gemma2:9b", &events()),
            "Ollama summary [http://localhost:11434/gemma2:9b]: vision.person@camera (high)；tof.step@tof (mid)"
        );
        assert_eq!(summary_line("u", "m", &[]), "");
    }

    #[test]
    fn test_caregiver_fallback() {
        assert_eq!(caregiver_fallback("有落差", true), "[系統自動回報] 有落差");
        assert_eq!(caregiver_fallback("有落差", false), "[系統自動回報] 有落差 (AI 未連線)");
    }
}
