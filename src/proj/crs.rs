//! Coordinate reference system identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::errors::{ProjError, ProjResult};

const WGS84: &str = "+proj=longlat +datum=WGS84 +no_defs";
const NAD83: &str = "+proj=longlat +datum=NAD83 +no_defs";
const WEB_MERCATOR: &str =
    "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +no_defs";

/// A coordinate reference system: a display name plus, when known, the
/// proj definition used to build transforms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Crs {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    definition: Option<String>,
}

impl Crs {
    /// CRS for an EPSG code. Codes without a built-in definition are still
    /// representable; resolving a transform for them fails.
    pub fn epsg(code: u32) -> Self {
        let code = if code == 900913 { 3857 } else { code };
        Self {
            name: format!("EPSG:{}", code),
            definition: builtin_definition(code),
        }
    }

    /// CRS from a raw proj definition
    pub fn from_proj(name: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            definition: Some(definition.into()),
        }
    }

    /// Parses `EPSG:<code>` (case-insensitive) or a raw `+proj=` string.
    ///
    /// Fails for EPSG codes without a known definition.
    pub fn parse(srs: &str) -> ProjResult<Self> {
        let srs = srs.trim();
        if srs.starts_with("+proj=") {
            return Ok(Self::from_proj(srs, srs));
        }

        let code = srs
            .split_once(':')
            .filter(|(auth, _)| auth.eq_ignore_ascii_case("epsg"))
            .map(|(_, code)| code)
            .unwrap_or(srs)
            .parse::<u32>()
            .map_err(|_| ProjError::UnknownCrs(srs.to_string()))?;

        let crs = Self::epsg(code);
        if crs.definition.is_none() {
            return Err(ProjError::UnknownCrs(srs.to_string()));
        }
        Ok(crs)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn definition(&self) -> Option<&str> {
        self.definition.as_deref()
    }

    /// The EPSG code, if the name carries one
    pub fn epsg_code(&self) -> Option<u32> {
        self.name.strip_prefix("EPSG:").and_then(|c| c.parse().ok())
    }

    /// True for longitude/latitude systems
    pub fn is_geographic(&self) -> bool {
        self.definition
            .as_deref()
            .map(|d| d.contains("+proj=longlat") || d.contains("+proj=latlong"))
            .unwrap_or(false)
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

fn builtin_definition(code: u32) -> Option<String> {
    match code {
        4326 => Some(WGS84.to_string()),
        4269 => Some(NAD83.to_string()),
        3857 => Some(WEB_MERCATOR.to_string()),
        32601..=32660 => Some(format!(
            "+proj=utm +zone={} +datum=WGS84 +units=m +no_defs",
            code - 32600
        )),
        32701..=32760 => Some(format!(
            "+proj=utm +zone={} +south +datum=WGS84 +units=m +no_defs",
            code - 32700
        )),
        _ => None,
    }
}
