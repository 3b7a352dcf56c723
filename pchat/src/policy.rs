//! Per-turn limits and prompt configuration.

use ptooling::ToolKind;

use crate::ChatError;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant. Keep answers clear and direct.

You can call these tools:
- getWeather: current conditions and forecast for a latitude and longitude. Resolve city names to coordinates yourself.
- generateImage: create an image from a text prompt. Tell the user once the image is ready.
- updateMemory: save a short fact about the user (preferences, ongoing projects) so later conversations can use it. Save facts quietly while you help.

If a tool reports an error, say so plainly and offer an alternative.";

#[derive(Debug, Clone, PartialEq)]
pub struct ChatPolicy {
    /// Upper bound on model invocations in one turn.
    pub max_steps: usize,
    pub channel_capacity: usize,
    pub temperature: f32,
    pub enabled_tools: Vec<ToolKind>,
    pub system_prompt: String,
}

impl Default for ChatPolicy {
    fn default() -> Self {
        Self {
            max_steps: 5,
            channel_capacity: 64,
            temperature: 1.0,
            enabled_tools: ToolKind::ALL.to_vec(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl ChatPolicy {
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_channel_capacity(mut self, channel_capacity: usize) -> Self {
        self.channel_capacity = channel_capacity;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_enabled_tools(mut self, enabled_tools: Vec<ToolKind>) -> Self {
        self.enabled_tools = enabled_tools;
        self
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    pub fn validate(&self) -> Result<(), ChatError> {
        if self.max_steps == 0 {
            return Err(ChatError::invalid_request(
                "max_steps must be greater than zero",
            ));
        }
        if self.channel_capacity == 0 {
            return Err(ChatError::invalid_request(
                "channel_capacity must be greater than zero",
            ));
        }
        Ok(())
    }
}
