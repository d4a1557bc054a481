//! Element locators: an addressing scheme plus an expression.

use harvest_catalog::{HarvestError, HarvestResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported addressing schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocatorKind {
    /// Attribute-path style (`//*[@id="holdings"]/div[2]/a`).
    XPath,
    /// Single CSS class name (`product-data-item`).
    ClassName,
}

impl FromStr for LocatorKind {
    type Err = HarvestError;

    fn from_str(s: &str) -> HarvestResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xpath" => Ok(LocatorKind::XPath),
            "classname" | "class_name" | "class" => Ok(LocatorKind::ClassName),
            other => {
                tracing::error!(
                    kind = "unsupported_locator_kind",
                    locator_kind = other,
                    "Locator not implemented"
                );
                Err(HarvestError::UnsupportedLocatorKind(other.to_string()))
            }
        }
    }
}

impl fmt::Display for LocatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocatorKind::XPath => f.write_str("xpath"),
            LocatorKind::ClassName => f.write_str("classname"),
        }
    }
}

/// A selector for one element on the rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    pub kind: LocatorKind,
    pub expression: String,
}

impl Locator {
    pub fn xpath(expression: impl Into<String>) -> Self {
        Self {
            kind: LocatorKind::XPath,
            expression: expression.into(),
        }
    }

    pub fn class_name(expression: impl Into<String>) -> Self {
        Self {
            kind: LocatorKind::ClassName,
            expression: expression.into(),
        }
    }

    /// Parse a locator from a scheme name and an expression.
    pub fn parse(kind: &str, expression: impl Into<String>) -> HarvestResult<Self> {
        Ok(Self {
            kind: kind.parse()?,
            expression: expression.into(),
        })
    }

    /// Descend into a relative path below this element (`{self}/{relative}`).
    ///
    /// Only XPath locators compose; class-name locators have no notion of a
    /// path.
    pub fn join(&self, relative: &str) -> HarvestResult<Self> {
        match self.kind {
            LocatorKind::XPath => {
                let base = self.expression.trim_end_matches('/');
                let rel = relative.trim_start_matches("./").trim_start_matches('/');
                let sep = if relative.starts_with(".//") || relative.starts_with("//") {
                    "//"
                } else {
                    "/"
                };
                Ok(Locator::xpath(format!("{base}{sep}{rel}")))
            }
            LocatorKind::ClassName => Err(HarvestError::UnsupportedLocatorKind(format!(
                "classname locator {:?} cannot be joined with {relative:?}",
                self.expression
            ))),
        }
    }

    /// The `index`-th (1-based) match of a relative path below this element.
    pub fn nth(&self, relative: &str, index: usize) -> HarvestResult<Self> {
        self.join(&format!("{relative}[{index}]"))
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.kind, self.expression)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_supported_kinds() {
        assert_eq!("xpath".parse::<LocatorKind>().unwrap(), LocatorKind::XPath);
        assert_eq!("ClassName".parse::<LocatorKind>().unwrap(), LocatorKind::ClassName);
    }

    #[test]
    fn test_parse_unsupported_kind_is_fatal() {
        let err = Locator::parse("css", "div.data").unwrap_err();
        assert!(matches!(err, HarvestError::UnsupportedLocatorKind(ref k) if k == "css"));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_join_relative_paths() {
        let body = Locator::xpath("//*[@id=\"screener-funds\"]/screener-table/table/tbody");
        let row = body.nth("tr", 3).unwrap();
        assert_eq!(
            row.expression,
            "//*[@id=\"screener-funds\"]/screener-table/table/tbody/tr[3]"
        );
        assert_eq!(row.join("./td[1]").unwrap().expression, format!("{}/td[1]", row.expression));
        assert_eq!(row.join(".//a").unwrap().expression, format!("{}//a", row.expression));
        assert_eq!(row.join("th//a").unwrap().expression, format!("{}/th//a", row.expression));
    }

    #[test]
    fn test_class_name_does_not_join() {
        let loc = Locator::class_name("product-data-item");
        assert!(loc.join("div").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Locator::class_name("data").to_string(), "classname=data");
    }
}
