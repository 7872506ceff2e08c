//! Composite correlation keys built from raw labels, and the exact-match
//! policy used by gateway-routed queries.

use crate::domain::errors::CorrelationMiss;
use std::collections::{BTreeSet, HashMap};

pub const KEY_SEPARATOR: &str = "/";
/// Label gateway-routed series are allow-listed on.
pub const GATEWAY_NAMESPACE_LABEL: &str = "destination_workload_namespace";

/// Value of a label that must be present and non-empty.
pub fn required_label<'a>(
    labels: &'a HashMap<String, String>,
    name: &str,
) -> Result<&'a str, CorrelationMiss> {
    match labels.get(name) {
        Some(value) if !value.is_empty() => Ok(value.as_str()),
        _ => Err(CorrelationMiss::MissingLabel {
            label: name.to_string(),
        }),
    }
}

/// Joins the values of `names` with `/`, e.g. `namespace/app`.
pub fn composite_key<S: AsRef<str>>(
    labels: &HashMap<String, String>,
    names: &[S],
) -> Result<String, CorrelationMiss> {
    let parts = names
        .iter()
        .map(|name| required_label(labels, name.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(parts.join(KEY_SEPARATOR))
}

/// Keeps only series whose `label` value is one of an allow-list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExactMatchPolicy {
    label: String,
    allowed: BTreeSet<String>,
}

impl ExactMatchPolicy {
    pub fn new<I, S>(label: impl Into<String>, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            label: label.into(),
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn allowed(&self) -> &BTreeSet<String> {
        &self.allowed
    }

    pub fn check(&self, labels: &HashMap<String, String>) -> Result<(), CorrelationMiss> {
        let value = required_label(labels, &self.label)?;
        if self.allowed.contains(value) {
            Ok(())
        } else {
            Err(CorrelationMiss::PolicyRejected {
                label: self.label.clone(),
                value: value.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_composite_key_joins_in_order() {
        let l = labels(&[("ns", "shop"), ("app", "cart")]);
        assert_eq!(composite_key(&l, &["ns", "app"]).unwrap(), "shop/cart");
    }

    #[test]
    fn test_composite_key_reports_first_missing_label() {
        let l = labels(&[("ns", "shop"), ("app", "")]);
        assert_eq!(
            composite_key(&l, &["ns", "app", "version"]),
            Err(CorrelationMiss::MissingLabel {
                label: "app".to_string()
            })
        );
    }

    #[test]
    fn test_exact_match_policy() {
        let policy = ExactMatchPolicy::new("destination_workload_namespace", ["openfaas"]);

        assert!(policy
            .check(&labels(&[("destination_workload_namespace", "openfaas")]))
            .is_ok());
        assert_eq!(
            policy.check(&labels(&[("destination_workload_namespace", "openfaas-fn")])),
            Err(CorrelationMiss::PolicyRejected {
                label: "destination_workload_namespace".to_string(),
                value: "openfaas-fn".to_string()
            })
        );
        assert!(matches!(
            policy.check(&labels(&[])),
            Err(CorrelationMiss::MissingLabel { .. })
        ));
    }
}
