//! QuerySpec implementations: Istio presets, the API gateway preset and
//! TOML-defined generic queries.

pub mod gateway;
pub mod generic;
pub mod istio;

pub use gateway::GatewayQuery;
pub use generic::{GenericQuery, QueryDefinition, QueryFile};
pub use istio::{IstioRelationshipQuery, IstioServiceQuery};

use crate::domain::errors::CorrelationMiss;
use crate::domain::sample::RawSeries;

/// Range window used by the preset rate queries.
pub const RATE_WINDOW: &str = "3m";

/// Sample value usable as a commodity reading.
pub(crate) fn checked_value(series: &RawSeries) -> Result<f64, CorrelationMiss> {
    if series.value.is_finite() && series.value >= 0.0 {
        Ok(series.value)
    } else {
        Err(CorrelationMiss::InvalidValue {
            value: series.value.to_string(),
        })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::domain::sample::RawSeries;
    use chrono::{DateTime, Utc};

    pub fn series(pairs: &[(&str, &str)], value: f64) -> RawSeries {
        RawSeries {
            labels: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            value,
            timestamp: DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::series;
    use super::*;

    #[test]
    fn test_checked_value() {
        assert_eq!(checked_value(&series(&[], 2.5)), Ok(2.5));
        assert!(matches!(
            checked_value(&series(&[], f64::NAN)),
            Err(CorrelationMiss::InvalidValue { .. })
        ));
        assert!(checked_value(&series(&[], f64::INFINITY)).is_err());
        assert!(checked_value(&series(&[], -1.0)).is_err());
    }
}
