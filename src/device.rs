use serde::{Deserialize, Serialize};

/// Placeholder replaced by the device's display name in message templates.
const NAME_PLACEHOLDER: &str = "{name}";

/// A monitored network device.
///
/// Devices are declared in the configuration file and never change while the
/// process is running. Declaration order is the probing order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Device {
    /// Network address used for probing, e.g. an IPv4 literal
    pub address: String,
    /// Display name; the address is shown when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Optional message templates for transitions
    #[serde(default, skip_serializing_if = "MessageTemplates::is_empty")]
    pub messages: MessageTemplates,
    /// Re-notify on repeated identical readings (heartbeat devices)
    #[serde(default)]
    pub notify_on_same_status: bool,
}

/// Per-status message templates, each may contain a `{name}` placeholder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct MessageTemplates {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub online: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offline: Option<String>,
}

impl MessageTemplates {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.online.is_none() && self.offline.is_none()
    }
}

impl Device {
    /// Create a device with no name and no templates.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: None,
            messages: MessageTemplates::default(),
            notify_on_same_status: false,
        }
    }

    /// Display name, falling back to the address.
    #[must_use]
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.address,
        }
    }

    /// Build the notification text for a reading.
    ///
    /// Uses the status-specific template when configured, otherwise a generic
    /// "is now ONLINE/OFFLINE" message.
    #[must_use]
    pub fn build_message(&self, is_alive: bool) -> String {
        let template = if is_alive {
            self.messages.online.as_deref()
        } else {
            self.messages.offline.as_deref()
        };

        match template {
            Some(template) => render_template(template, self.display_name()),
            None => {
                let (icon, label) = if is_alive {
                    ("✅", "ONLINE")
                } else {
                    ("❌", "OFFLINE")
                };
                format!("{icon} {} is now {label}", self.display_name())
            }
        }
    }
}

/// Replace every `{name}` occurrence in `template` with `name`.
#[must_use]
pub fn render_template(template: &str, name: &str) -> String {
    template.replace(NAME_PLACEHOLDER, name)
}
