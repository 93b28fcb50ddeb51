//! Event formatters
//!
//! Formatters turn host events into profiles this module can render. The
//! only profile is [`TextToSpeechProfile`], spoken with the configured
//! default language.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Event emitted by the host
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostEvent {
    /// Event type, e.g. `system.time.sunrise`
    pub name: String,
    /// Event payload
    #[serde(default)]
    pub params: serde_json::Value,
}

impl HostEvent {
    /// Event without payload
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: serde_json::Value::Null,
        }
    }
}

/// Text to be spoken
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextToSpeechProfile {
    /// Text to speak
    pub text: String,
}

/// Maps one host event type to a speech profile
pub trait ProfileFormatter: Send + Sync {
    /// The event type handled (e.g. "system.time.sunrise")
    fn event_name(&self) -> &'static str;

    /// Build the profile for an event of this type
    fn format(&self, event: &HostEvent) -> TextToSpeechProfile;
}

/// Sunrise event to speech
pub struct SunriseFormatter;

impl ProfileFormatter for SunriseFormatter {
    fn event_name(&self) -> &'static str {
        "system.time.sunrise"
    }

    fn format(&self, _event: &HostEvent) -> TextToSpeechProfile {
        TextToSpeechProfile {
            text: "It's sunrise!".to_string(),
        }
    }
}

/// Sunset event to speech
pub struct SunsetFormatter;

impl ProfileFormatter for SunsetFormatter {
    fn event_name(&self) -> &'static str {
        "system.time.sunset"
    }

    fn format(&self, _event: &HostEvent) -> TextToSpeechProfile {
        TextToSpeechProfile {
            text: "It's sunset!".to_string(),
        }
    }
}

/// Formatters indexed by event type
pub struct FormatterRegistry {
    formatters: HashMap<&'static str, Arc<dyn ProfileFormatter>>,
}

impl FormatterRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            formatters: HashMap::new(),
        }
    }

    /// Registry with the sunrise and sunset formatters
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(SunriseFormatter);
        registry.register(SunsetFormatter);

        info!(
            events = ?registry.formatters.keys().collect::<Vec<_>>(),
            "Formatter registry initialized"
        );

        registry
    }

    /// Register a formatter, replacing any for the same event
    pub fn register<F: ProfileFormatter + 'static>(&mut self, formatter: F) {
        let event_name = formatter.event_name();
        debug!(event = %event_name, "Registering formatter");
        self.formatters.insert(event_name, Arc::new(formatter));
    }

    /// Event types with a formatter
    pub fn event_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.formatters.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Format an event, if a formatter handles it
    pub fn format(&self, event: &HostEvent) -> Option<TextToSpeechProfile> {
        self.formatters
            .get(event.name.as_str())
            .map(|formatter| formatter.format(event))
    }
}

impl Default for FormatterRegistry {
    fn default() -> Self {
        Self::new()
    }
}
