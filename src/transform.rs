use crate::error::ChatError;
use log::warn;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Per-message context handed to the external transform hook.
pub struct TransformContext<'a> {
    pub is_user: bool,
    pub user_name: &'a str,
    pub character_name: &'a str,
    pub character_key: &'a str,
}

/// Host-supplied text transform applied between macro substitution and
/// embedded-document extraction. The pipeline treats it as an opaque pure
/// function; a failing hook is logged and the text passes through unmodified
/// for that message only.
pub trait TextTransform {
    fn apply(&self, text: &str, ctx: &TransformContext) -> Result<String, ChatError>;
}

/// Identity transform used when the host supplies no rules.
pub struct NoopTransform;

impl TextTransform for NoopTransform {
    fn apply(&self, text: &str, _ctx: &TransformContext) -> Result<String, ChatError> {
        Ok(text.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RuleScope {
    #[default]
    All,
    UserOnly,
    CharacterOnly,
}

/// One find/replace rule as stored by the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformRule {
    pub find: String,
    pub replace: String,
    #[serde(default)]
    pub scope: RuleScope,
    /// Treat `find` as a literal string instead of a regex pattern.
    #[serde(default)]
    pub literal: bool,
}

struct CompiledRule {
    pattern: Regex,
    replace: String,
    scope: RuleScope,
}

/// Regex-rule implementation of [`TextTransform`].
///
/// Rules that fail to compile are skipped at load time with a warning; one
/// bad rule never blocks the rest of the set.
pub struct RegexRuleSet {
    rules: Vec<CompiledRule>,
}

impl RegexRuleSet {
    pub fn from_rules(rules: Vec<TransformRule>) -> Self {
        let mut compiled = Vec::new();
        for rule in rules {
            let pattern_source = if rule.literal {
                crate::text_utils::escape_regex(&rule.find)
            } else {
                rule.find.clone()
            };
            match Regex::new(&pattern_source) {
                Ok(pattern) => compiled.push(CompiledRule {
                    pattern,
                    replace: rule.replace,
                    scope: rule.scope,
                }),
                Err(e) => {
                    warn!("Skipping malformed transform rule '{}': {e}", rule.find);
                }
            }
        }
        RegexRuleSet { rules: compiled }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let rules: Vec<TransformRule> = serde_json::from_str(json)?;
        Ok(Self::from_rules(rules))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl TextTransform for RegexRuleSet {
    fn apply(&self, text: &str, ctx: &TransformContext) -> Result<String, ChatError> {
        let mut result = text.to_string();
        for rule in &self.rules {
            let applies = match rule.scope {
                RuleScope::All => true,
                RuleScope::UserOnly => ctx.is_user,
                RuleScope::CharacterOnly => !ctx.is_user,
            };
            if !applies {
                continue;
            }
            let replacement = rule
                .replace
                .replace("{{user}}", ctx.user_name)
                .replace("{{char}}", ctx.character_name);
            result = rule
                .pattern
                .replace_all(&result, replacement.as_str())
                .into_owned();
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx<'a>() -> TransformContext<'a> {
        TransformContext {
            is_user: false,
            user_name: "Alice",
            character_name: "Bob",
            character_key: "bob",
        }
    }

    fn rule(find: &str, replace: &str) -> TransformRule {
        TransformRule {
            find: find.to_string(),
            replace: replace.to_string(),
            scope: RuleScope::All,
            literal: false,
        }
    }

    #[test]
    fn test_rule_application() {
        let set = RegexRuleSet::from_rules(vec![rule(r"\*sighs\*", "<em>sighs</em>")]);
        let out = set.apply("he *sighs* loudly", &ctx()).unwrap();
        assert_eq!(out, "he <em>sighs</em> loudly");
    }

    #[test]
    fn test_malformed_rule_skipped() {
        let set = RegexRuleSet::from_rules(vec![rule("[unclosed", "x"), rule("ok", "fine")]);
        assert_eq!(set.len(), 1);
        assert_eq!(set.apply("ok then", &ctx()).unwrap(), "fine then");
    }

    #[test]
    fn test_literal_rule_escapes_metacharacters() {
        let set = RegexRuleSet::from_rules(vec![TransformRule {
            literal: true,
            ..rule("(sighs)", "[sighs]")
        }]);
        assert_eq!(set.apply("he (sighs) loudly", &ctx()).unwrap(), "he [sighs] loudly");
    }

    #[test]
    fn test_scope_filtering() {
        let set = RegexRuleSet::from_rules(vec![TransformRule {
            scope: RuleScope::UserOnly,
            ..rule("hello", "hi")
        }]);
        // Context is a character message, so the user-only rule is inert.
        assert_eq!(set.apply("hello", &ctx()).unwrap(), "hello");
    }

    #[test]
    fn test_macro_in_replacement() {
        let set = RegexRuleSet::from_rules(vec![rule("the hero", "{{char}}")]);
        assert_eq!(set.apply("the hero arrives", &ctx()).unwrap(), "Bob arrives");
    }
}
