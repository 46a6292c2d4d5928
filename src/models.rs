use bigdecimal::BigDecimal;
use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque fee-term identifier, unique within one student's term list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TermId(pub String);

impl TermId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TermId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TermId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// One billable line item inside a fee term, already concession-adjusted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeHead {
    pub id: String,
    pub name: String,
    #[serde(deserialize_with = "amount")]
    pub original_amount: BigDecimal,
    #[serde(default = "zero", deserialize_with = "amount")]
    pub concession_amount: BigDecimal,
    #[serde(deserialize_with = "amount")]
    pub final_amount: BigDecimal,
    #[serde(deserialize_with = "amount")]
    pub outstanding_amount: BigDecimal,
}

/// One billing period for a student, as handed over by the fee data provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeTerm {
    pub id: TermId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    // Final amount due, net of concessions
    #[serde(deserialize_with = "amount")]
    pub total_amount: BigDecimal,
    #[serde(default)]
    pub is_paid: bool,
    #[serde(default)]
    pub fee_heads: Vec<FeeHead>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "optional_amount")]
    pub concession_amount: Option<BigDecimal>,
}

impl FeeTerm {
    /// Term-level concession, absent treated as zero.
    pub fn concession_or_zero(&self) -> BigDecimal {
        self.concession_amount.clone().unwrap_or_else(zero)
    }
}

pub(crate) fn zero() -> BigDecimal {
    BigDecimal::from(0)
}

/// Money as sent by the provider: a decimal string or a JSON number.
/// Fractional numbers are taken at their shortest decimal spelling
/// (0.1 stays 0.1), never at the binary value of the float.
struct Amount(BigDecimal);

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AmountVisitor;

        impl<'de> de::Visitor<'de> for AmountVisitor {
            type Value = Amount;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a decimal amount as a number or string")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
                Ok(Amount(BigDecimal::from(v)))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
                Ok(Amount(BigDecimal::from(v)))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Amount, E> {
                if !v.is_finite() {
                    return Err(E::custom(format!("amount is not finite: {}", v)));
                }
                // f64 Display is the shortest text that round-trips
                BigDecimal::from_str(&v.to_string())
                    .map(Amount)
                    .map_err(E::custom)
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
                BigDecimal::from_str(v.trim()).map(Amount).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(AmountVisitor)
    }
}

fn amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigDecimal, D::Error> {
    Amount::deserialize(deserializer).map(|a| a.0)
}

fn optional_amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<BigDecimal>, D::Error> {
    Ok(Option::<Amount>::deserialize(deserializer)?.map(|a| a.0))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_provider_record() {
        let raw = serde_json::json!({
            "id": "t2",
            "name": "Term 2",
            "totalAmount": "4500",
            "isPaid": false,
            "feeHeads": [{
                "id": "fh1",
                "name": "Tuition",
                "originalAmount": 5000,
                "concessionAmount": 500,
                "finalAmount": 4500,
                "outstandingAmount": 4500
            }]
        });
        let term: FeeTerm = serde_json::from_value(raw).expect("parse term");
        assert_eq!(term.id, TermId::new("t2"));
        assert_eq!(term.order, None);
        assert_eq!(term.total_amount, BigDecimal::from(4500));
        assert_eq!(term.concession_amount, None);
        assert_eq!(term.fee_heads[0].concession_amount, BigDecimal::from(500));
        assert_eq!(term.concession_or_zero(), BigDecimal::from(0));
    }

    #[test]
    fn fractional_numbers_keep_their_decimal_value() {
        let raw = serde_json::json!({
            "id": "t1",
            "name": "Term 1",
            "totalAmount": 750.50,
            "concessionAmount": 0.1,
            "feeHeads": [{
                "id": "fh1",
                "name": "Tuition",
                "originalAmount": 0.2,
                "finalAmount": "0.2",
                "outstandingAmount": 0.2
            }]
        });
        let term: FeeTerm = serde_json::from_value(raw).expect("parse term");
        assert_eq!(term.total_amount, BigDecimal::from_str("750.5").unwrap());
        assert_eq!(term.concession_amount, Some(BigDecimal::from_str("0.1").unwrap()));
        assert_eq!(term.fee_heads[0].concession_amount, BigDecimal::from(0));
        assert_eq!(term.fee_heads[0].outstanding_amount.to_string(), "0.2");
    }

    #[test]
    fn explicit_null_concession_is_absent() {
        let raw = serde_json::json!({
            "id": "t1", "name": "Term 1", "totalAmount": 10, "concessionAmount": null
        });
        let term: FeeTerm = serde_json::from_value(raw).expect("parse term");
        assert_eq!(term.concession_amount, None);
    }

    #[test]
    fn rejects_non_numeric_amount() {
        let raw = serde_json::json!({ "id": "t1", "name": "Term 1", "totalAmount": "ten" });
        assert!(serde_json::from_value::<FeeTerm>(raw).is_err());
    }
}
