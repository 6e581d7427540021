use crate::ScanError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Category of input being evaluated. Determines the extractor/scorer/explainer triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ScanKind {
    #[serde(rename = "URL")]
    Url,
    #[serde(rename = "Text")]
    Text,
    #[serde(rename = "Profile")]
    Profile,
    #[serde(rename = "IDS")]
    IdsEvent,
    #[serde(rename = "IP")]
    IpReputation,
}

impl ScanKind {
    pub const ALL: [ScanKind; 5] = [
        ScanKind::Url,
        ScanKind::Text,
        ScanKind::Profile,
        ScanKind::IdsEvent,
        ScanKind::IpReputation,
    ];

    /// Value stored in the `type` column.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ScanKind::Url => "URL",
            ScanKind::Text => "Text",
            ScanKind::Profile => "Profile",
            ScanKind::IdsEvent => "IDS",
            ScanKind::IpReputation => "IP",
        }
    }

    pub const fn has_explainer(&self) -> bool {
        matches!(self, ScanKind::Url | ScanKind::Text)
    }
}

impl fmt::Display for ScanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScanKind {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "url" => Ok(ScanKind::Url),
            "text" => Ok(ScanKind::Text),
            "profile" => Ok(ScanKind::Profile),
            "ids" | "ids-event" | "idsevent" => Ok(ScanKind::IdsEvent),
            "ip" | "ip-reputation" | "ipreputation" => Ok(ScanKind::IpReputation),
            other => Err(ScanError::invalid(format!("unknown scan kind: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_names_parse_back() {
        for k in ScanKind::ALL {
            assert_eq!(k.as_str().parse::<ScanKind>().unwrap(), k);
        }
        assert!("PortScan".parse::<ScanKind>().is_err());
    }

    #[test]
    fn serde_uses_column_names() {
        assert_eq!(serde_json::to_string(&ScanKind::IdsEvent).unwrap(), "\"IDS\"");
    }
}
