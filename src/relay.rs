//! The relay step: greeting short-circuit, prompt templating, one backend call.

use crate::backends::{OllamaClient, RelayResult};

/// Reply to a bare greeting. Never reaches the model.
pub const GREETING_REPLY: &str = "Hello! I'm TravelMate. Where would you like to go today?";

const GREETINGS: [&str; 3] = ["hi", "hello", "hey"];

const TRAVEL_PROMPT: &str = "[INST] <<SYS>>
You are TravelMate, a friendly travel assistant. Respond to greetings naturally,\x20
and for travel requests provide:
1. 1-3 location suggestions
2. Each as a bullet point with:
   - **Place**: Brief highlight
   - Best for: [type of travelers]
   - When: [best season]
<</SYS>>

{user_input} [/INST]";

/// True if `input` is a bare greeting (case-insensitive, surrounding whitespace ignored).
pub fn is_greeting(input: &str) -> bool {
    let input = input.trim();
    GREETINGS.iter().any(|g| g.eq_ignore_ascii_case(input))
}

/// Wrap raw user text in the TravelMate instruction template.
pub fn build_prompt(user_input: &str) -> String {
    TRAVEL_PROMPT.replace("{user_input}", user_input)
}

/// Relay `user_input` to the model and return its answer.
pub async fn relay(backend: &OllamaClient, user_input: &str) -> RelayResult {
    if is_greeting(user_input) {
        return Ok(GREETING_REPLY.to_owned());
    }
    backend.generate(&build_prompt(user_input)).await
}
