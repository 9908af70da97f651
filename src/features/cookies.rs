//! Authentication cookies: parse browser-extension exports and normalize
//! them into descriptors the CDP session can inject before navigation.
//!
//! Accepted shapes:
//! * a bare JSON array of cookie objects
//! * `{"cookies": [...]}` (the format most cookie-export extensions write)
//!
//! Individual cookies missing `name`, `value` or `domain` are skipped with a
//! warning so one malformed entry never blocks a harvest.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    Lax,
    Strict,
    None,
}

impl SameSite {
    /// `lax`/`strict` in any case map to themselves; `none`,
    /// `no_restriction`, `unspecified`, missing or unknown values map to `None`.
    pub fn normalize(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("lax") => SameSite::Lax,
            Some("strict") => SameSite::Strict,
            _ => SameSite::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Lax => "Lax",
            SameSite::Strict => "Strict",
            SameSite::None => "None",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CookieDescriptor {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    /// Unix seconds; `None` for session cookies.
    pub expires: Option<f64>,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: SameSite,
}

fn str_field<'a>(obj: &'a Value, key: &str) -> Option<&'a str> {
    obj.get(key).and_then(Value::as_str)
}

/// Epoch seconds from a number or a numeric string such as `"1893456000"`.
fn expiry_seconds(v: &Value) -> Option<f64> {
    match v {
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|e| e.is_finite()),
        other => other.as_f64(),
    }
}

impl CookieDescriptor {
    /// Normalize one exported cookie object. `None` when a required field is
    /// missing.
    pub fn from_export(obj: &Value) -> Option<Self> {
        let name = str_field(obj, "name")?;
        let value = str_field(obj, "value")?;
        let domain = str_field(obj, "domain")?;
        let path = str_field(obj, "path")
            .filter(|p| !p.is_empty())
            .unwrap_or("/");
        let expires = obj
            .get("expires")
            .or_else(|| obj.get("expirationDate"))
            .and_then(expiry_seconds)
            .filter(|e| *e > 0.0);
        Some(Self {
            name: name.to_string(),
            value: value.to_string(),
            domain: domain.to_string(),
            path: path.to_string(),
            expires,
            http_only: obj.get("httpOnly").and_then(Value::as_bool).unwrap_or(false),
            secure: obj.get("secure").and_then(Value::as_bool).unwrap_or(false),
            same_site: SameSite::normalize(str_field(obj, "sameSite")),
        })
    }

    /// CDP `Network.CookieParam` JSON shape.
    pub fn to_cdp_json(&self) -> Value {
        let mut v = serde_json::json!({
            "name": self.name,
            "value": self.value,
            "domain": self.domain,
            "path": self.path,
            "httpOnly": self.http_only,
            "secure": self.secure,
            "sameSite": self.same_site.as_str(),
        });
        if let Some(exp) = self.expires {
            v["expires"] = serde_json::json!(exp);
        }
        v
    }
}

/// Normalize an already-decoded cookie export.
pub fn cookies_from_value(value: &Value) -> Result<Vec<CookieDescriptor>> {
    let entries = match value {
        Value::Array(items) => items,
        Value::Object(map) => match map.get("cookies") {
            Some(Value::Array(items)) => items,
            Some(_) => return Err(anyhow!("`cookies` must be an array")),
            None => return Err(anyhow!("cookie export has no `cookies` array")),
        },
        Value::Null => return Ok(Vec::new()),
        _ => return Err(anyhow!("cookie export must be an array or an object")),
    };

    let mut cookies = Vec::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        match CookieDescriptor::from_export(entry) {
            Some(c) => cookies.push(c),
            None => warn!("cookies: entry #{} lacks name/value/domain, skipped", i),
        }
    }
    Ok(cookies)
}

/// Parse a cookie export file's contents.
pub fn parse_cookie_jar(json: &str) -> Result<Vec<CookieDescriptor>> {
    let value: Value =
        serde_json::from_str(json).map_err(|e| anyhow!("cookie file is not valid JSON: {}", e))?;
    cookies_from_value(&value)
}

pub fn load_cookie_file(path: &std::path::Path) -> Result<Vec<CookieDescriptor>> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read cookie file {}: {}", path.display(), e))?;
    let cookies = parse_cookie_jar(&raw)?;
    info!("cookies: 🍪 loaded {} cookies from {}", cookies.len(), path.display());
    Ok(cookies)
}
