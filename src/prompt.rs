//! Prompt construction
//!
//! Every call to the model is a system instruction, an optional window of
//! prior messages, and the new input. The builders here own those
//! instructions and the window sizes.

use crate::db::ChatMessage;
use crate::llm::PromptMessage;

/// Prior solo messages kept in context
pub const SOLO_HISTORY_WINDOW: usize = 19;

/// Prior room messages kept in context
pub const ROOM_HISTORY_WINDOW: usize = 9;

/// Marker placed before the message a room model must rewrite
pub const CURRENT_MESSAGE_MARKER: &str = "[CURRENT USER MESSAGE TO TRANSLATE]: ";

const TUTOR_INSTRUCTION: &str = "You are an AI English conversation tutor.
Always format responses using markdown for readability.
In every response, mix English and Japanese sentences so the user can learn English.
First, suggest a more beautiful version of the user's English, then continue the conversation.";

const TITLE_INSTRUCTION: &str = "Generate a short, descriptive chat title (max 8 words) \
based on the following user message. Respond ONLY with the title.";

const ROOM_PREAMBLE: &str = "You are an AI English group conversation assistant.
This is a group chat room for collaborative English learning.
Below is the conversation history for context. At the end, you will see the CURRENT USER MESSAGE to translate.";

const ROOM_TRANSLATE_TASK: &str = "Translate the user's message into natural, fluent English. \
Do NOT reply with anything else. Do NOT add any explanation, commentary, or extra words. \
ONLY output the English translation.";

const ROOM_ENHANCE_TASK: &str = "Your task: Aggressively and boldly enhance, expand, and transform \
ONLY the CURRENT USER MESSAGE. Be creative, powerful, and even a little crazy. Add wild ideas, \
dramatic flair, humor, or unexpected twists. Make the message as expressive, engaging, and \
memorable as possible.
IMPORTANT: Do NOT reply with anything except the enhanced English version of the CURRENT USER \
MESSAGE. Do NOT add any explanation, commentary, or extra words. Do NOT continue the conversation. \
ONLY output the enhanced English version.";

const JAPANESE_INSTRUCTION: &str =
    "Translate the following English into natural Japanese. Respond ONLY with the Japanese translation.";

/// How a room rewrites what its members post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoomMode {
    /// Faithful English translation
    #[default]
    Translate,
    /// Expressive, exaggerated English rewrite
    Enhance,
}

impl RoomMode {
    /// Read the mode from a room's settings bag (`settings.mode`)
    pub fn from_settings(settings: &serde_json::Map<String, serde_json::Value>) -> Self {
        match settings.get("mode").and_then(|v| v.as_str()) {
            Some("enhance") => RoomMode::Enhance,
            _ => RoomMode::Translate,
        }
    }

    fn instruction(self) -> String {
        let task = match self {
            RoomMode::Translate => ROOM_TRANSLATE_TASK,
            RoomMode::Enhance => ROOM_ENHANCE_TASK,
        };
        format!("{}\n{}", ROOM_PREAMBLE, task)
    }
}

/// Keep only the most recent `window` messages, stripped to role and content
fn history_window(history: &[ChatMessage], window: usize) -> impl Iterator<Item = PromptMessage> + '_ {
    let start = history.len().saturating_sub(window);
    history[start..].iter().map(|m| PromptMessage {
        role: m.role.into(),
        content: m.content.clone(),
    })
}

/// Tutor context for a solo chat turn
pub fn solo_context(history: &[ChatMessage], message: &str) -> Vec<PromptMessage> {
    let mut context = vec![PromptMessage::system(TUTOR_INSTRUCTION)];
    context.extend(history_window(history, SOLO_HISTORY_WINDOW));
    context.push(PromptMessage::user(message));
    context
}

/// Context asking for a title for a brand-new chat
pub fn title_context(first_message: &str) -> Vec<PromptMessage> {
    vec![
        PromptMessage::system(TITLE_INSTRUCTION),
        PromptMessage::user(first_message),
    ]
}

/// Context asking the model to rewrite a room post
pub fn room_context(history: &[ChatMessage], content: &str, mode: RoomMode) -> Vec<PromptMessage> {
    let mut context = vec![PromptMessage::system(mode.instruction())];
    context.extend(history_window(history, ROOM_HISTORY_WINDOW));
    context.push(PromptMessage::user(format!("{}{}", CURRENT_MESSAGE_MARKER, content)));
    context
}

/// Context asking for three continuations of a half-typed message
pub fn suggestion_context(last_message: &str, input: &str) -> Vec<PromptMessage> {
    let instruction = format!(
        "You are an autocomplete engine for a chat app. \
         This is the last message from the chat: \"{}\". \
         This is the user's unfinished input: \"{}\". \
         Suggest ONLY 3 possible next words or short phrases (in English) that could follow \
         the user's input, based on the chat context. Respond ONLY with the suggestions, \
         comma separated. Do NOT generate a full sentence, reply, or explanation.",
        last_message, input
    );
    vec![PromptMessage::system(instruction)]
}

/// Context asking for a Japanese translation
pub fn japanese_context(text: &str) -> Vec<PromptMessage> {
    vec![
        PromptMessage::system(JAPANESE_INSTRUCTION),
        PromptMessage::user(text),
    ]
}

/// Split a comma-separated suggestion reply into trimmed, non-empty phrases
pub fn parse_suggestions(reply: &str) -> Vec<String> {
    reply
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
