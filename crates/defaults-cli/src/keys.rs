use defaults_core::conversion::{Dictionary, Json, OrDefault, Passthrough, RawEnum, RawRepresentable};
use defaults_core::policy::{AlwaysOverwrite, EquatablePolicy};
use defaults_core::{defaults_key, Key};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

defaults_key! {
    /// Whether the welcome banner is shown.
    pub struct ShowWelcome: bool = true, name = "show_welcome";
}

defaults_key! {
    pub struct Greeting: Option<String> = None, name = "greeting";
}

/// Number of launches. Never goes down, and writing zero does not delete it.
#[derive(Clone, Copy, Debug, Default)]
pub struct LaunchCount;

impl Key for LaunchCount {
    type Value = i64;
    type Conversion = Passthrough<i64>;
    type Policy = AlwaysOverwrite;

    fn name() -> &'static str {
        "launch_count"
    }

    fn default_value() -> i64 {
        0
    }

    fn should_overwrite(old: &i64, new: &i64) -> bool {
        new > old
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    System,
    Light,
    Dark,
}

impl RawRepresentable for Theme {
    type Raw = String;

    fn raw_value(&self) -> String {
        match self {
            Theme::System => "system",
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
        .to_string()
    }

    fn from_raw_value(raw: String) -> Option<Self> {
        match raw.as_str() {
            "system" => Some(Theme::System),
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }
}

defaults_key! {
    /// A hand-edited file with an unknown theme falls back to `system`.
    pub struct ThemeKey: Theme = Theme::System,
        name = "theme",
        conversion = OrDefault<RawEnum<Theme>>,
        policy = EquatablePolicy;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WindowFrame {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowFrame {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            width: 800,
            height: 600,
        }
    }
}

defaults_key! {
    pub struct WindowFrameKey: WindowFrame = WindowFrame::default(),
        name = "window_frame",
        conversion = Json<WindowFrame>,
        policy = EquatablePolicy;
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

defaults_key! {
    pub struct ProfileKey: Profile = Profile::default(),
        name = "profile",
        conversion = Dictionary<Profile>,
        policy = EquatablePolicy;
}

/// Something done with one key, whatever its value type.
pub trait KeyVisitor {
    type Output;

    fn visit<K>(self) -> Self::Output
    where
        K: Key,
        K::Value: Serialize + DeserializeOwned;
}

/// The keys reachable from the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum KeyName {
    ShowWelcome,
    Greeting,
    LaunchCount,
    Theme,
    WindowFrame,
    Profile,
}

impl KeyName {
    pub const ALL: [KeyName; 6] = [
        KeyName::ShowWelcome,
        KeyName::Greeting,
        KeyName::LaunchCount,
        KeyName::Theme,
        KeyName::WindowFrame,
        KeyName::Profile,
    ];

    pub fn accept<V: KeyVisitor>(self, visitor: V) -> V::Output {
        match self {
            KeyName::ShowWelcome => visitor.visit::<ShowWelcome>(),
            KeyName::Greeting => visitor.visit::<Greeting>(),
            KeyName::LaunchCount => visitor.visit::<LaunchCount>(),
            KeyName::Theme => visitor.visit::<ThemeKey>(),
            KeyName::WindowFrame => visitor.visit::<WindowFrameKey>(),
            KeyName::Profile => visitor.visit::<ProfileKey>(),
        }
    }
}
