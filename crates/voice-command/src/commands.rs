//! Phrase table

use std::fmt;

/// Recognized voice command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    StartSafety,
    StopSafety,
    ReportDeparture,
    ReportArrival,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::StartSafety => "start_safety",
            Command::StopSafety => "stop_safety",
            Command::ReportDeparture => "report_departure",
            Command::ReportArrival => "report_arrival",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Checked in order; the first command with a matching phrase wins
const PHRASES: &[(Command, &[&str])] = &[
    (
        Command::StartSafety,
        &["啟動行人輔助", "開始行人輔助", "開啟行人輔助", "start safety", "safety support"],
    ),
    (
        Command::StopSafety,
        &["關閉行人輔助", "停止行人輔助", "停止 safety", "stop safety"],
    ),
    (Command::ReportDeparture, &["我出發了", "出發", "開始旅程", "departure"]),
    (Command::ReportArrival, &["我已經安全到達", "我到了", "安全抵達", "arrival"]),
];

/// Lowercase, trim and strip wake words (longest first)
fn normalize(text: &str, wake_words: &[String]) -> String {
    let mut wakes: Vec<String> = wake_words.iter().map(|w| w.to_lowercase()).collect();
    wakes.sort_by_key(|w| std::cmp::Reverse(w.chars().count()));

    let mut normalized = text.trim().to_lowercase();
    for wake in wakes.iter().filter(|w| !w.is_empty()) {
        normalized = normalized.replace(wake.as_str(), "").trim().to_string();
    }
    normalized
}

/// Map recognized text to a command
pub fn match_command(text: &str, wake_words: &[String]) -> Option<Command> {
    let normalized = normalize(text, wake_words);
    if normalized.is_empty() {
        return None;
    }
    PHRASES
        .iter()
        .find(|(_, phrases)| phrases.iter().any(|p| normalized.contains(p)))
        .map(|(command, _)| *command)
}
