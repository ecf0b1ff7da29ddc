use std::collections::HashMap;

/// Substitutes `{{name}}` placeholder tokens in raw message text.
///
/// Unknown placeholders are left untouched so host-specific tokens survive
/// for the transform hook downstream.
pub struct MacroExpander {
    variables: HashMap<String, String>,
}

impl MacroExpander {
    pub fn new(user_name: &str, character_name: &str) -> Self {
        let mut variables = HashMap::new();
        variables.insert("user".to_string(), user_name.to_string());
        variables.insert("char".to_string(), character_name.to_string());
        MacroExpander { variables }
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.variables.insert(key.to_string(), value.to_string());
    }

    pub fn expand(&self, text: &str) -> String {
        let mut result = text.to_string();
        for (key, value) in &self.variables {
            let placeholder = format!("{{{{{}}}}}", key);
            result = result.replace(&placeholder, value);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_and_char_substitution() {
        let expander = MacroExpander::new("Alice", "Bob");
        assert_eq!(
            expander.expand("{{char}} waves at {{user}}."),
            "Bob waves at Alice."
        );
    }

    #[test]
    fn test_repeated_placeholder() {
        let expander = MacroExpander::new("Alice", "Bob");
        assert_eq!(expander.expand("{{user}} and {{user}}"), "Alice and Alice");
    }

    #[test]
    fn test_unknown_placeholder_kept() {
        let expander = MacroExpander::new("Alice", "Bob");
        assert_eq!(expander.expand("{{idle_timer}}"), "{{idle_timer}}");
    }

    #[test]
    fn test_extra_variable() {
        let mut expander = MacroExpander::new("Alice", "Bob");
        expander.set("scenario", "tavern");
        assert_eq!(expander.expand("at the {{scenario}}"), "at the tavern");
    }
}
