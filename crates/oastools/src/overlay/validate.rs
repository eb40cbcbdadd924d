//! Overlay document validation. All violations are collected and reported
//! together rather than failing on the first.

use url::Url;

use crate::error::Error;

use super::{Overlay, SUPPORTED_VERSIONS};

pub fn validate(overlay: &Overlay) -> Result<(), Error> {
    let mut errors = Vec::new();

    match semver::Version::parse(&overlay.version) {
        Err(_) => errors.push(format!(
            "overlay version \"{}\" is not a valid semver",
            overlay.version
        )),
        Ok(_) => {
            if !SUPPORTED_VERSIONS.contains(&overlay.version.as_str()) {
                errors.push(format!(
                    "overlay version {} is not supported, expected one of: {}",
                    overlay.version,
                    SUPPORTED_VERSIONS.join(", ")
                ));
            }
        }
    }

    if overlay.info.title.is_empty() {
        errors.push("info.title must not be empty".to_string());
    }

    if overlay.info.version.is_empty() {
        errors.push("info.version must not be empty".to_string());
    }

    if let Some(extends) = &overlay.extends {
        if let Err(e) = Url::parse(extends) {
            errors.push(format!("extends must be a well-formed uri: {}", e));
        }
    }

    if overlay.actions.is_empty() {
        errors.push("overlay must define at least one action".to_string());
    }

    for (i, action) in overlay.actions.iter().enumerate() {
        if action.target.is_empty() {
            errors.push(format!("action {}: target must not be empty", i + 1));
        }

        if action.remove && action.update.is_some() {
            errors.push(format!(
                "action {}: remove cannot be combined with update",
                i + 1
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(Error::OverlayValidation(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Tree;
    use serde_json::json;

    fn overlay(value: serde_json::Value) -> Overlay {
        Overlay::from_tree(Tree::from_json_value(&value)).unwrap()
    }

    fn errors_of(value: serde_json::Value) -> Vec<String> {
        match validate(&overlay(value)) {
            Err(Error::OverlayValidation(errors)) => errors,
            other => panic!("expected validation errors, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_overlay_passes() {
        let overlay = overlay(json!({
            "overlay": "1.1.0",
            "info": { "title": "t", "version": "1" },
            "actions": [ { "target": "$.info", "update": {} } ]
        }));

        assert!(validate(&overlay).is_ok());
    }

    #[test]
    fn test_all_violations_are_aggregated() {
        let errors = errors_of(json!({
            "overlay": "9.9.9",
            "info": { "title": "", "version": "" },
            "extends": "::not a uri::"
        }));

        assert_eq!(errors.len(), 5);
        assert!(errors[0].contains("not supported"));
        assert!(errors.iter().any(|e| e == "info.title must not be empty"));
        assert!(errors.iter().any(|e| e == "info.version must not be empty"));
        assert!(errors.iter().any(|e| e.starts_with("extends must be")));
        assert!(errors
            .iter()
            .any(|e| e == "overlay must define at least one action"));
    }

    #[test]
    fn test_unparsable_version_is_reported() {
        let errors = errors_of(json!({
            "overlay": "latest",
            "info": { "title": "t", "version": "1" },
            "actions": [ { "target": "$" } ]
        }));

        assert_eq!(
            errors,
            vec!["overlay version \"latest\" is not a valid semver".to_string()]
        );
    }

    #[test]
    fn test_empty_target_and_remove_update_conflict() {
        let errors = errors_of(json!({
            "overlay": "1.0.0",
            "info": { "title": "t", "version": "1" },
            "actions": [
                { "target": "" },
                { "target": "$.x", "remove": true, "update": { "a": 1 } }
            ]
        }));

        assert_eq!(
            errors,
            vec![
                "action 1: target must not be empty".to_string(),
                "action 2: remove cannot be combined with update".to_string(),
            ]
        );
    }
}
