use rust_decimal::Decimal;
use serde::Deserialize;

use dividend_tax_core::tax::TaxRates;
use dividend_tax_core::DEFAULT_CURRENCY;

use crate::input::file;

/// Optional YAML settings file (`--config`).
///
/// ```yaml
/// pit_rate: 0.09
/// military_rate: 0.05
/// currency: USD
/// rates_endpoint: https://bank.gov.ua/NBU_Exchange/exchange_site
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CliConfig {
    pub pit_rate: Option<Decimal>,
    pub military_rate: Option<Decimal>,
    pub currency: Option<String>,
    pub rates_endpoint: Option<String>,
}

impl CliConfig {
    pub fn load(path: Option<&str>) -> Result<Self, Box<dyn std::error::Error>> {
        match path {
            Some(path) => file::read_yaml(path),
            None => Ok(Self::default()),
        }
    }

    /// Flags win over file values, file values over the statutory defaults.
    pub fn tax_rates(
        &self,
        pit_flag: Option<Decimal>,
        military_flag: Option<Decimal>,
    ) -> Result<TaxRates, Box<dyn std::error::Error>> {
        let defaults = TaxRates::default();
        let rates = TaxRates {
            pit: pit_flag.or(self.pit_rate).unwrap_or(defaults.pit),
            military: military_flag.or(self.military_rate).unwrap_or(defaults.military),
        };
        rates.validate()?;
        Ok(rates)
    }

    pub fn currency(&self, flag: Option<String>) -> String {
        flag.or_else(|| self.currency.clone())
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string())
            .to_uppercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_flags_override_file() {
        let yaml = "pit_rate: \"0.18\"\nmilitary_rate: \"0.015\"\ncurrency: eur\n";
        let config: CliConfig = serde_yaml::from_str(yaml).unwrap();

        let rates = config.tax_rates(None, Some(dec!(0.05))).unwrap();
        assert_eq!(rates.pit, dec!(0.18));
        assert_eq!(rates.military, dec!(0.05));
        assert_eq!(config.currency(None), "EUR");
        assert_eq!(config.currency(Some("usd".into())), "USD");
    }

    #[test]
    fn test_defaults_without_file() {
        let config = CliConfig::load(None).unwrap();
        assert_eq!(config.tax_rates(None, None).unwrap(), TaxRates::default());
        assert_eq!(config.currency(None), "USD");
    }

    #[test]
    fn test_out_of_range_rate_is_rejected() {
        let config = CliConfig::default();
        assert!(config.tax_rates(Some(dec!(9)), None).is_err());
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(serde_yaml::from_str::<CliConfig>("pit: 0.1\n").is_err());
    }
}
