use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDecimal {
    Text(String),
    Number(serde_json::Number),
}

/// Accept a money amount sent either as a decimal string or as a JSON number.
/// Computed totals come back as numbers, stored amounts as strings.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawDecimal::deserialize(deserializer)? {
        RawDecimal::Text(text) => text,
        RawDecimal::Number(number) => number.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Amount {
        #[serde(deserialize_with = "super::string_or_number")]
        value: String,
    }

    #[test]
    fn test_accepts_string_and_number() {
        let text: Amount = serde_json::from_str(r#"{"value": "19.80"}"#).unwrap();
        assert_eq!(text.value, "19.80");

        let float: Amount = serde_json::from_str(r#"{"value": 19.8}"#).unwrap();
        assert_eq!(float.value, "19.8");

        let int: Amount = serde_json::from_str(r#"{"value": 0}"#).unwrap();
        assert_eq!(int.value, "0");
    }

    #[test]
    fn test_rejects_other_types() {
        assert!(serde_json::from_str::<Amount>(r#"{"value": null}"#).is_err());
        assert!(serde_json::from_str::<Amount>(r#"{"value": [1]}"#).is_err());
    }
}
