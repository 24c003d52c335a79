use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;

use crate::Theme;
use crate::ThemeId;

pub const PROTOCOL_VERSION: u32 = 1;

pub const GET_THEMES: &str = "get-themes";
pub const RELOAD_THEMES: &str = "reload-themes";
pub const ACTIVATE_THEME: &str = "activate-theme";

pub const REPLY_NAMESPACE: &str = "reply";
pub const UI_NAMESPACE: &str = "ui";
pub const HOST_NAMESPACE: &str = "lpt";

const ADD_PAGES: &str = "add-pages";
const PLUGIN_STATUS_CHANGE: &str = "plugin-status-change";

fn default_version() -> u32 {
    PROTOCOL_VERSION
}

/// Header present on every bus message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EventMeta {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default = "default_version")]
    pub version: u32,
    /// Event type under which the receiver must publish its answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
}

impl EventMeta {
    pub fn new(event_type: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            namespace: namespace.into(),
            version: PROTOCOL_VERSION,
            reply: None,
        }
    }
}

/// Raw inbound envelope as delivered by the bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct InboundEvent {
    pub meta: EventMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<ThemeId>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("{event_type} request has no meta.reply to answer on")]
    MissingReply { event_type: String },
    #[error("activate-theme request does not name a theme")]
    MissingTheme,
}

/// A request the theme service knows how to answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThemeRequest {
    GetThemes { reply: String },
    ReloadThemes { reply: String },
    ActivateTheme { reply: String, theme: ThemeId },
}

impl ThemeRequest {
    /// Interprets an inbound event addressed to `namespace`.
    ///
    /// Returns `Ok(None)` for events that belong to another namespace or that
    /// name an event type this service does not subscribe to.
    pub fn from_event(namespace: &str, event: InboundEvent) -> Result<Option<Self>, ProtocolError> {
        let InboundEvent { meta, theme } = event;
        if meta.namespace != namespace {
            return Ok(None);
        }
        let kind = meta.event_type.as_str();
        if ![GET_THEMES, RELOAD_THEMES, ACTIVATE_THEME].contains(&kind) {
            return Ok(None);
        }
        let Some(reply) = meta.reply else {
            return Err(ProtocolError::MissingReply {
                event_type: meta.event_type,
            });
        };

        let request = match kind {
            GET_THEMES => Self::GetThemes { reply },
            RELOAD_THEMES => Self::ReloadThemes { reply },
            _ => Self::ActivateTheme {
                reply,
                theme: theme.ok_or(ProtocolError::MissingTheme)?,
            },
        };
        Ok(Some(request))
    }

    pub fn reply(&self) -> &str {
        match self {
            Self::GetThemes { reply }
            | Self::ReloadThemes { reply }
            | Self::ActivateTheme { reply, .. } => reply,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            Self::GetThemes { .. } => GET_THEMES,
            Self::ReloadThemes { .. } => RELOAD_THEMES,
            Self::ActivateTheme { .. } => ACTIVATE_THEME,
        }
    }
}

/// Answer to every theme request: the service's cached state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ThemesReply {
    pub meta: EventMeta,
    pub themes: Vec<Theme>,
    #[serde(rename = "activeTheme")]
    pub active_theme: Option<ThemeId>,
}

impl ThemesReply {
    pub fn new(reply: &str, themes: Vec<Theme>, active_theme: Option<ThemeId>) -> Self {
        Self {
            meta: EventMeta::new(reply, REPLY_NAMESPACE),
            themes,
            active_theme,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct UiPage {
    pub name: String,
    pub frontend: String,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AddPagesEvent {
    pub meta: EventMeta,
    pub pages: Vec<UiPage>,
}

impl AddPagesEvent {
    /// Registers the theme management page of the service owning `namespace`.
    pub fn theming_page(namespace: &str) -> Self {
        Self {
            meta: EventMeta::new(ADD_PAGES, UI_NAMESPACE),
            pages: vec![UiPage {
                name: "Theming".to_string(),
                frontend: "frontend".to_string(),
                id: format!("op-{namespace}"),
            }],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PluginStatus {
    Running,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PluginStatusChangeEvent {
    pub meta: EventMeta,
    pub status: PluginStatus,
}

impl PluginStatusChangeEvent {
    pub fn running() -> Self {
        Self {
            meta: EventMeta::new(PLUGIN_STATUS_CHANGE, HOST_NAMESPACE),
            status: PluginStatus::Running,
        }
    }
}

/// Everything the service publishes on the bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum OutboundEvent {
    ThemesReply(ThemesReply),
    AddPages(AddPagesEvent),
    PluginStatusChange(PluginStatusChangeEvent),
}

impl OutboundEvent {
    pub fn meta(&self) -> &EventMeta {
        match self {
            Self::ThemesReply(event) => &event.meta,
            Self::AddPages(event) => &event.meta,
            Self::PluginStatusChange(event) => &event.meta,
        }
    }
}

impl From<ThemesReply> for OutboundEvent {
    fn from(event: ThemesReply) -> Self {
        Self::ThemesReply(event)
    }
}

impl From<AddPagesEvent> for OutboundEvent {
    fn from(event: AddPagesEvent) -> Self {
        Self::AddPages(event)
    }
}

impl From<PluginStatusChangeEvent> for OutboundEvent {
    fn from(event: PluginStatusChangeEvent) -> Self {
        Self::PluginStatusChange(event)
    }
}
