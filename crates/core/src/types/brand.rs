//! Platform branding.

use serde::{Deserialize, Serialize};

/// Errors produced by brand configuration input.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BrandError {
    /// Fee is not a whole number.
    #[error("fee percentage must be a whole number")]
    NotANumber,
    /// Fee is outside 0-100.
    #[error("fee percentage must be between 0 and 100")]
    OutOfRange,
}

/// Singleton branding and fee configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BrandConfig {
    pub platform_name: String,
    pub logo_url: String,
    pub primary_color: String,
    /// Platform fee, 0-100.
    pub fee_percentage: u8,
}

impl BrandConfig {
    /// Parse a fee percentage from form input.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not an integer in 0-100.
    pub fn parse_fee(input: &str) -> Result<u8, BrandError> {
        let fee: i64 = input.trim().parse().map_err(|_| BrandError::NotANumber)?;
        u8::try_from(fee)
            .ok()
            .filter(|fee| *fee <= 100)
            .ok_or(BrandError::OutOfRange)
    }

    /// Share of a sale kept by the creator, in percent.
    #[must_use]
    pub const fn creator_share(&self) -> u8 {
        100_u8.saturating_sub(self.fee_percentage)
    }

    /// Copy with new branding fields and the current fee.
    #[must_use]
    pub fn with_branding(&self, platform_name: String, logo_url: String, primary_color: String) -> Self {
        Self {
            platform_name,
            logo_url,
            primary_color,
            fee_percentage: self.fee_percentage,
        }
    }

    /// Copy with a new fee and the current branding.
    #[must_use]
    pub fn with_fee(&self, fee_percentage: u8) -> Self {
        Self {
            fee_percentage,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fee() {
        assert_eq!(BrandConfig::parse_fee("10"), Ok(10));
        assert_eq!(BrandConfig::parse_fee(" 0 "), Ok(0));
        assert_eq!(BrandConfig::parse_fee("100"), Ok(100));
        assert_eq!(BrandConfig::parse_fee("101"), Err(BrandError::OutOfRange));
        assert_eq!(BrandConfig::parse_fee("-1"), Err(BrandError::OutOfRange));
        assert_eq!(BrandConfig::parse_fee("ten"), Err(BrandError::NotANumber));
    }

    #[test]
    fn test_partial_updates_preserve_other_fields() {
        let config = BrandConfig {
            platform_name: "Atelier".to_string(),
            logo_url: "/logo.png".to_string(),
            primary_color: "#112233".to_string(),
            fee_percentage: 12,
        };

        let rebranded =
            config.with_branding("Gallery".to_string(), String::new(), "#000000".to_string());
        assert_eq!(rebranded.fee_percentage, 12);
        assert_eq!(rebranded.platform_name, "Gallery");

        let refeed = config.with_fee(5);
        assert_eq!(refeed.platform_name, "Atelier");
        assert_eq!(refeed.creator_share(), 95);
    }

    #[test]
    fn test_wire_names() {
        let json = serde_json::to_value(BrandConfig::default()).unwrap_or_default();
        assert!(json.get("platformName").is_some());
        assert!(json.get("feePercentage").is_some());
    }
}
