#![deny(warnings)]

//! Typed studio configuration with per-content-type partial overrides.
//!
//! A [`StudioConfig`] holds one settings block per [`ContentType`]. Partial
//! overrides ([`ConfigPatch`]) come from JSON form state or from YAML preset
//! files and are merged field by field: the override wins where present and
//! defaults are retained elsewhere.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use studio_core::ContentType;
use thiserror::Error;
use tracing::{info, warn};

pub mod template;

pub use template::substitute_placeholders;

#[derive(Debug, Error)]
pub enum FormError {
    #[error("invalid json: {0}")]
    Json(String),
    #[error("invalid preset file: {0}")]
    Yaml(String),
    #[error("unknown preset: {0}")]
    UnknownPreset(String),
}

impl From<serde_json::Error> for FormError {
    fn from(e: serde_json::Error) -> Self {
        FormError::Json(e.to_string())
    }
}

impl From<serde_yaml::Error> for FormError {
    fn from(e: serde_yaml::Error) -> Self {
        FormError::Yaml(e.to_string())
    }
}

/// Patch fields of the wrong shape read as absent instead of failing the
/// whole patch.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    match serde_json::from_value(value) {
        Ok(v) => Ok(Some(v)),
        Err(e) => {
            warn!(
                error = %e,
                expected = std::any::type_name::<T>(),
                "ignoring malformed override"
            );
            Ok(None)
        }
    }
}

/// Declares a settings block together with its all-optional patch type and
/// the field-wise merge between them.
macro_rules! specifics {
    (
        $(#[$doc:meta])*
        $name:ident, $patch:ident {
            $($(#[$fdoc:meta])* $field:ident : $ty:ty,)*
        }
    ) => {
        $(#[$doc])*
        #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
        #[serde(rename_all = "camelCase", default)]
        pub struct $name {
            $($(#[$fdoc])* pub $field: $ty,)*
        }

        #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
        #[serde(rename_all = "camelCase")]
        pub struct $patch {
            $(
                #[serde(
                    default,
                    deserialize_with = "lenient",
                    skip_serializing_if = "Option::is_none"
                )]
                pub $field: Option<$ty>,
            )*
        }

        impl $name {
            /// Overwrite every field present in `patch`.
            pub fn merge(&mut self, patch: &$patch) {
                $(
                    if let Some(v) = &patch.$field {
                        self.$field = v.clone();
                    }
                )*
            }
        }
    };
}

specifics!(
    /// Settings for text generation.
    TextSpecifics, TextSpecificsPatch {
        length: String,
        format: String,
        audience: String,
    }
);

specifics!(
    /// Settings for image generation.
    ImageSpecifics, ImageSpecificsPatch {
        /// e.g. "1:1", "16:9".
        aspect_ratio: String,
        /// Spread between candidates, 0-100.
        variety: u32,
        /// Strength of the house style, 0-1000.
        stylization: u32,
        style: String,
    }
);

specifics!(
    /// Settings for video generation.
    VideoSpecifics, VideoSpecificsPatch {
        duration_s: u32,
        resolution: String,
        aspect_ratio: String,
        camera_motion: String,
    }
);

specifics!(
    /// Settings for audio generation.
    AudioSpecifics, AudioSpecificsPatch {
        duration_s: u32,
        genre: String,
        voice: String,
        tempo_bpm: u32,
    }
);

specifics!(
    /// Settings for code generation.
    CodeSpecifics, CodeSpecificsPatch {
        language: String,
        framework: String,
        include_tests: bool,
    }
);

impl Default for TextSpecifics {
    fn default() -> Self {
        Self {
            length: "medio".into(),
            format: "articulo".into(),
            audience: "general".into(),
        }
    }
}

impl Default for ImageSpecifics {
    fn default() -> Self {
        Self {
            aspect_ratio: "1:1".into(),
            variety: 50,
            stylization: 100,
            style: "fotorrealista".into(),
        }
    }
}

impl Default for VideoSpecifics {
    fn default() -> Self {
        Self {
            duration_s: 15,
            resolution: "1080p".into(),
            aspect_ratio: "16:9".into(),
            camera_motion: "estatica".into(),
        }
    }
}

impl Default for AudioSpecifics {
    fn default() -> Self {
        Self {
            duration_s: 30,
            genre: "ambiental".into(),
            voice: "ninguna".into(),
            tempo_bpm: 90,
        }
    }
}

impl Default for CodeSpecifics {
    fn default() -> Self {
        Self {
            language: "rust".into(),
            framework: String::new(),
            include_tests: true,
        }
    }
}

/// One settings block per content type, keyed by the content type name.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Specifics {
    #[serde(rename = "Texto")]
    pub text: TextSpecifics,
    #[serde(rename = "Imagen")]
    pub image: ImageSpecifics,
    #[serde(rename = "Video")]
    pub video: VideoSpecifics,
    #[serde(rename = "Audio")]
    pub audio: AudioSpecifics,
    #[serde(rename = "Codigo")]
    pub code: CodeSpecifics,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SpecificsPatch {
    #[serde(
        rename = "Texto",
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub text: Option<TextSpecificsPatch>,
    #[serde(
        rename = "Imagen",
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub image: Option<ImageSpecificsPatch>,
    #[serde(
        rename = "Video",
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub video: Option<VideoSpecificsPatch>,
    #[serde(
        rename = "Audio",
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub audio: Option<AudioSpecificsPatch>,
    #[serde(
        rename = "Codigo",
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub code: Option<CodeSpecificsPatch>,
}

/// Borrowed view of the settings block for one content type.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ActiveSpecifics<'a> {
    Text(&'a TextSpecifics),
    Image(&'a ImageSpecifics),
    Video(&'a VideoSpecifics),
    Audio(&'a AudioSpecifics),
    Code(&'a CodeSpecifics),
}

impl ActiveSpecifics<'_> {
    /// The block as a JSON object.
    pub fn to_value(&self) -> Value {
        let v = match self {
            ActiveSpecifics::Text(s) => serde_json::to_value(s),
            ActiveSpecifics::Image(s) => serde_json::to_value(s),
            ActiveSpecifics::Video(s) => serde_json::to_value(s),
            ActiveSpecifics::Audio(s) => serde_json::to_value(s),
            ActiveSpecifics::Code(s) => serde_json::to_value(s),
        };
        // Plain structs of strings and integers always serialize.
        v.unwrap_or(Value::Null)
    }
}

impl Specifics {
    pub fn merge(&mut self, patch: &SpecificsPatch) {
        if let Some(p) = &patch.text {
            self.text.merge(p);
        }
        if let Some(p) = &patch.image {
            self.image.merge(p);
        }
        if let Some(p) = &patch.video {
            self.video.merge(p);
        }
        if let Some(p) = &patch.audio {
            self.audio.merge(p);
        }
        if let Some(p) = &patch.code {
            self.code.merge(p);
        }
    }

    pub fn get(&self, content_type: ContentType) -> ActiveSpecifics<'_> {
        match content_type {
            ContentType::Texto => ActiveSpecifics::Text(&self.text),
            ContentType::Imagen => ActiveSpecifics::Image(&self.image),
            ContentType::Video => ActiveSpecifics::Video(&self.video),
            ContentType::Audio => ActiveSpecifics::Audio(&self.audio),
            ContentType::Codigo => ActiveSpecifics::Code(&self.code),
        }
    }
}

/// Full form state of a generation request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StudioConfig {
    pub content_type: ContentType,
    pub title: String,
    pub prompt: String,
    pub tone: String,
    /// Free-text template; `{token}` placeholders are filled from a payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_template: Option<String>,
    pub specifics: Specifics,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            content_type: ContentType::Texto,
            title: String::new(),
            prompt: String::new(),
            tone: "neutral".into(),
            raw_template: None,
            specifics: Specifics::default(),
        }
    }
}

impl StudioConfig {
    /// Settings block of the selected content type.
    pub fn active_specifics(&self) -> ActiveSpecifics<'_> {
        self.specifics.get(self.content_type)
    }
}

/// Partial override of a [`StudioConfig`]. Unknown keys and values of the
/// wrong shape are ignored; only unparseable input is an error.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigPatch {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub content_type: Option<ContentType>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub raw_template: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub specifics: Option<SpecificsPatch>,
}

impl ConfigPatch {
    pub fn from_json(text: &str) -> Result<Self, FormError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_value(value: Value) -> Result<Self, FormError> {
        Ok(serde_json::from_value(value)?)
    }
}

/// Merge `patch` over `defaults`.
///
/// Scalars present in the patch replace the defaults, each content type's
/// block is merged field by field, and `{token}` placeholders in the
/// resulting template are filled with numbers from `payload`.
pub fn merge(
    defaults: &StudioConfig,
    patch: &ConfigPatch,
    payload: Option<&Value>,
) -> StudioConfig {
    let mut out = defaults.clone();
    if let Some(ct) = patch.content_type {
        out.content_type = ct;
    }
    if let Some(v) = &patch.title {
        out.title = v.clone();
    }
    if let Some(v) = &patch.prompt {
        out.prompt = v.clone();
    }
    if let Some(v) = &patch.tone {
        out.tone = v.clone();
    }
    if let Some(v) = &patch.raw_template {
        out.raw_template = Some(v.clone());
    }
    if let Some(s) = &patch.specifics {
        out.specifics.merge(s);
    }
    if let (Some(t), Some(p)) = (&out.raw_template, payload) {
        out.raw_template = Some(substitute_placeholders(t, p));
    }
    out
}

/// Named presets loaded from YAML.
#[derive(Clone, Debug, Default)]
pub struct PresetLibrary {
    presets: BTreeMap<String, ConfigPatch>,
}

impl PresetLibrary {
    /// Parse a YAML mapping of preset name to partial config.
    pub fn from_yaml_str(text: &str) -> Result<Self, FormError> {
        let presets: BTreeMap<String, ConfigPatch> = serde_yaml::from_str(text)?;
        info!(count = presets.len(), "loaded presets");
        Ok(Self { presets })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.presets.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Option<&ConfigPatch> {
        self.presets.get(name)
    }

    /// Merge the named preset over `defaults`.
    pub fn apply(
        &self,
        name: &str,
        defaults: &StudioConfig,
        payload: Option<&Value>,
    ) -> Result<StudioConfig, FormError> {
        let patch = self
            .get(name)
            .ok_or_else(|| FormError::UnknownPreset(name.to_string()))?;
        Ok(merge(defaults, patch, payload))
    }
}
