pub fn mask_api_key(key: &str) -> String {
    let visible: String = key.chars().take(5).collect();
    let hidden = key.chars().count().saturating_sub(5);
    if hidden > 0 {
        format!("{}{}", visible, "*".repeat(hidden))
    } else {
        key.to_string()
    }
}

/// Mask every variable whose name looks like a credential.
pub fn masked_env<I>(vars: I) -> std::collections::BTreeMap<String, String>
where
    I: IntoIterator<Item = (String, String)>,
{
    vars.into_iter()
        .map(|(key, value)| {
            let upper = key.to_uppercase();
            let value = if key == "FOURSQUARE_API_KEY" {
                mask_api_key(&value)
            } else if upper.contains("KEY") || upper.contains("TOKEN") || upper.contains("SECRET") {
                "*".repeat(8)
            } else {
                value
            };
            (key, value)
        })
        .collect()
}

pub fn request_id() -> String {
    chrono::Utc::now().format("%Y%m%d%H%M%S%f").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_all_but_prefix() {
        assert_eq!(mask_api_key("fsq3abcdefgh"), "fsq3a*******");
        assert_eq!(mask_api_key("abc"), "abc");
    }

    #[test]
    fn masks_credential_like_variables() {
        let vars = vec![
            ("FOURSQUARE_API_KEY".to_string(), "fsq3secretvalue".to_string()),
            ("HF_TOKEN".to_string(), "hf_abc".to_string()),
            ("BIND_ADDR".to_string(), "0.0.0.0:9999".to_string()),
        ];
        let masked = masked_env(vars);

        assert_eq!(masked["FOURSQUARE_API_KEY"], "fsq3s**********");
        assert_eq!(masked["HF_TOKEN"], "********");
        assert_eq!(masked["BIND_ADDR"], "0.0.0.0:9999");
    }

    #[test]
    fn request_ids_are_timestamps() {
        let id = request_id();
        assert!(id.len() >= 20);
        assert!(id.chars().all(|c| c.is_ascii_digit()));
    }
}
