//! Wire payloads exchanged with the embedded editor frame.
//!
//! Both directions keep the caller's (or the frame's) JSON object as the
//! source of truth. The typed accessors are read-only views: a field the views
//! cannot interpret is still forwarded as-is, and never makes the whole
//! payload unusable.
//!
//! Outbound: [`InitConfig`] plus a derived `locationHost` ([`HandshakePayload`]).
//! Inbound: [`ExportResult`], recognised by a non-empty `mockupsExport` field.

use crate::{Error, Result};
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Key of the website identity token
pub const WEBSITE_KEY: &str = "x-website-key";
/// Key added to the handshake
pub const LOCATION_HOST: &str = "locationHost";
/// Key that marks a message as an export result
pub const MOCKUPS_EXPORT: &str = "mockupsExport";

/// Image format of exported mockups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Webp,
    Png,
    Jpg,
}

/// Typed view of `mockupExportOptions`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportOptions {
    pub image_format: ImageFormat,
    /// Size of the exported image in pixels
    pub image_size: u32,
}

/// Theme appearance override
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeAppearance {
    Dark,
    Light,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Default,
    Adjustments,
}

/// Boolean feature flags understood by the editor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    ShowCollectionsWidget,
    ShowColorPicker,
    ShowColorPresets,
    OneColorPerSmartObject,
    /// Exporting one mockup of a collection exports the whole collection
    EnableCollectionExport,
    EnableDesignFileUpload,
}

impl Flag {
    /// Wire key of the flag
    pub fn key(self) -> &'static str {
        match self {
            Flag::ShowCollectionsWidget => "showCollectionsWidget",
            Flag::ShowColorPicker => "showColorPicker",
            Flag::ShowColorPresets => "showColorPresets",
            Flag::OneColorPerSmartObject => "oneColorPerSmartObject",
            Flag::EnableCollectionExport => "enableCollectionExport",
            Flag::EnableDesignFileUpload => "enableDesignFileUpload",
        }
    }
}

/// Configuration pushed into the frame on every `load`.
///
/// Holds the caller's JSON object verbatim. Absent keys let the editor apply
/// its own defaults; present keys (even `null` or shapes this crate does not
/// know) are forwarded unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InitConfig {
    fields: Map<String, Value>,
}

impl InitConfig {
    /// Config carrying only the website key
    pub fn new(website_key: impl Into<String>) -> Self {
        Self::default().with(WEBSITE_KEY, Value::String(website_key.into()))
    }

    /// Wrap a caller-supplied JSON object
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(Error::InvalidConfig(format!(
                "init config must be a JSON object, got {}",
                other
            ))),
        }
    }

    /// Set any key, replacing a previous value
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    pub fn with_flag(self, flag: Flag, on: bool) -> Self {
        self.with(flag.key(), Value::Bool(on))
    }

    pub fn with_export_options(self, options: &ExportOptions) -> Self {
        let value = serde_json::to_value(options).unwrap_or(Value::Null);
        self.with("mockupExportOptions", value)
    }

    pub fn with_theme(self, theme: Theme) -> Self {
        self.with("theme", serde_json::to_value(theme).unwrap_or(Value::Null))
    }

    pub fn with_theme_appearance(self, appearance: ThemeAppearance) -> Self {
        self.with(
            "themeAppearance",
            serde_json::to_value(appearance).unwrap_or(Value::Null),
        )
    }

    /// Design file applied to every smart object
    pub fn with_design_url(self, url: impl Into<String>) -> Self {
        self.with("designUrl", Value::String(url.into()))
    }

    /// Opaque caller data, echoed back verbatim with exports
    pub fn with_custom_fields(self, fields: impl Into<String>) -> Self {
        self.with("customFields", Value::String(fields.into()))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn website_key(&self) -> Option<&str> {
        self.fields.get(WEBSITE_KEY).and_then(Value::as_str)
    }

    /// `Some` only when the flag is present and a boolean
    pub fn flag(&self, flag: Flag) -> Option<bool> {
        self.fields.get(flag.key()).and_then(Value::as_bool)
    }

    pub fn design_url(&self) -> Option<&str> {
        self.fields.get("designUrl").and_then(Value::as_str)
    }

    pub fn custom_fields(&self) -> Option<&Value> {
        self.fields.get("customFields")
    }

    /// `None` when absent or not in the documented shape
    pub fn export_options(&self) -> Option<ExportOptions> {
        self.typed("mockupExportOptions")
    }

    pub fn theme(&self) -> Option<Theme> {
        self.typed("theme")
    }

    pub fn theme_appearance(&self) -> Option<ThemeAppearance> {
        self.typed("themeAppearance")
    }

    fn typed<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.fields
            .get(key)
            .and_then(|v| T::deserialize(v).ok())
    }

    /// The website key is the only field the bridge insists on.
    pub fn validate(&self) -> Result<()> {
        match self.fields.get(WEBSITE_KEY) {
            Some(Value::String(key)) if !key.trim().is_empty() => Ok(()),
            Some(Value::String(_)) => Err(Error::InvalidConfig(format!(
                "{} must not be empty",
                WEBSITE_KEY
            ))),
            Some(_) => Err(Error::InvalidConfig(format!(
                "{} must be a string",
                WEBSITE_KEY
            ))),
            None => Err(Error::InvalidConfig(format!("{} is required", WEBSITE_KEY))),
        }
    }
}

/// Outbound handshake: the caller's config plus the derived `locationHost`.
#[derive(Debug, Clone, PartialEq)]
pub struct HandshakePayload {
    pub config: InitConfig,
    pub location_host: String,
}

impl HandshakePayload {
    pub fn new(config: &InitConfig, location_host: impl Into<String>) -> Self {
        Self {
            config: config.clone(),
            location_host: location_host.into(),
        }
    }

    /// The JSON object that gets posted to the frame.
    ///
    /// `locationHost` overrides a caller key of the same name.
    pub fn to_value(&self) -> Value {
        let mut fields = self.config.fields.clone();
        fields.insert(
            LOCATION_HOST.to_string(),
            Value::String(self.location_host.clone()),
        );
        Value::Object(fields)
    }
}

/// Lenient view of one `mockupsExport` entry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MockupExport<'a> {
    pub index: usize,
    pub export_label: Option<&'a str>,
    pub export_path: Option<&'a str>,
    /// The entry exactly as received
    pub raw: &'a Value,
}

/// Placement geometry of an artwork on its smart object
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Placement {
    pub width: f64,
    pub height: f64,
    pub rotate: f64,
    pub left: f64,
    pub top: f64,
}

/// Typed view of an artwork placed on a smart object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artwork {
    #[serde(rename = "smartObjectUUID")]
    pub smart_object_uuid: String,
    /// Host-specific file handle, kept opaque
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_base64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_data: Option<Placement>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Where an artwork's bytes come from
#[derive(Debug, Clone, PartialEq)]
pub enum ArtworkSource<'a> {
    File(&'a Value),
    Url(&'a str),
    Base64(&'a str),
    Missing,
}

impl Artwork {
    pub fn source(&self) -> ArtworkSource<'_> {
        if let Some(file) = &self.file {
            ArtworkSource::File(file)
        } else if let Some(url) = &self.url {
            ArtworkSource::Url(url)
        } else if let Some(data) = &self.file_base64 {
            ArtworkSource::Base64(data)
        } else {
            ArtworkSource::Missing
        }
    }

    /// Decode `fileBase64`, accepting an optional `data:<mime>;base64,` prefix.
    ///
    /// Returns `Ok(None)` when the artwork carries no base64 payload.
    pub fn decode_base64(&self) -> Result<Option<Vec<u8>>> {
        let Some(raw) = self.file_base64.as_deref() else {
            return Ok(None);
        };
        let data = match raw.find(";base64,") {
            Some(pos) if raw.starts_with("data:") => &raw[pos + ";base64,".len()..],
            _ => raw,
        };
        base64::engine::general_purpose::STANDARD
            .decode(data.trim())
            .map(Some)
            .map_err(|e| {
                Error::Decode(format!(
                    "artwork {} has invalid base64: {}",
                    self.smart_object_uuid, e
                ))
            })
    }
}

/// Export response posted back by the editor, kept exactly as received.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ExportResult {
    raw: Value,
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}

impl ExportResult {
    /// Classify an inbound message payload.
    ///
    /// Only `mockupsExport` decides: the payload must be an object whose
    /// `mockupsExport` is present and non-empty. Nothing else in the payload
    /// is inspected.
    pub fn from_message(data: &Value) -> Option<Self> {
        let marker = data.as_object()?.get(MOCKUPS_EXPORT)?;
        is_truthy(marker).then(|| Self { raw: data.clone() })
    }

    /// The full payload, unmodified
    pub fn as_value(&self) -> &Value {
        &self.raw
    }

    pub fn into_value(self) -> Value {
        self.raw
    }

    /// Entries of `mockupsExport`; empty when it is not an array
    pub fn mockups_export(&self) -> Vec<MockupExport<'_>> {
        let Some(items) = self.raw.get(MOCKUPS_EXPORT).and_then(Value::as_array) else {
            return Vec::new();
        };
        items
            .iter()
            .enumerate()
            .map(|(index, raw)| MockupExport {
                index,
                export_label: raw.get("export_label").and_then(Value::as_str),
                export_path: raw.get("export_path").and_then(Value::as_str),
                raw,
            })
            .collect()
    }

    pub fn custom_fields(&self) -> Option<&Value> {
        self.raw.get("customFields")
    }

    /// Typed views of `artworks`, one result per entry
    pub fn artworks(&self) -> Vec<Result<Artwork>> {
        self.raw
            .get("artworks")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .map(|item| Artwork::deserialize(item).map_err(Error::from))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// How export results are handled, fixed for the lifetime of a bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Fetch each exported file and save it
    Download,
    /// Hand each export result to caller logic
    Custom,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Download => f.write_str("download"),
            Mode::Custom => f.write_str("custom"),
        }
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "download" => Ok(Mode::Download),
            "custom" => Ok(Mode::Custom),
            other => Err(Error::InvalidConfig(format!(
                "unknown mode '{}', expected 'download' or 'custom'",
                other
            ))),
        }
    }
}
