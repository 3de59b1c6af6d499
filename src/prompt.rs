//! Prompt building for the generation step
//!
//! Renders the generation prompt from a handlebars template. The built-in
//! template asks for per-method API documentation with input/output
//! parameter tables; callers can swap in their own template via the
//! `prompt` config section.
//!
//! Template variables: `entry_class_fqn`, `entry_method`,
//! `entry_method_base`, `http_method`, `context`.

use eyre::{Context, Result};
use handlebars::Handlebars;
use serde_json::json;
use tracing::debug;

use crate::config::PromptConfig;
use crate::domain::{CrudPatterns, EntryPoint, classify_method_name};

/// Built-in generation prompt
const DEFAULT_TEMPLATE: &str = r#"You are an API documentation generator.

Read the code below and document every public method of the entry class as
an external interface. For each method output exactly three sections:

1. Interface name / description / HTTP method
   - Name: ClassName.methodName (mark inferred values with "(inferred)")
   - Description: one sentence; if no comment exists, infer one from the
     method name and domain vocabulary and mark it "(inferred)"
   - HTTP method: infer from the method name prefix
     (find/get/query/list -> GET, create/add/save -> POST,
     update/modify/enable/disable -> PUT, delete/remove/clear -> DELETE,
     otherwise POST). Suggested for {{entry_method_base}}: {{http_method}}

2. Input parameter table
   - Plain parameters listed directly; DTO/VO fields expanded one level as
     obj.field; map keys expanded with inferred types
   - Required: "yes" when used unchecked or enforced by validation,
     "no" when defaulted or null-checked (state the default)

3. Output parameter table
   - Expand wrapper types (code/message/success), pagination structures
     (total/pageNo/pageSize/records[]) and VO/DTO fields one level
   - Describe the business meaning of each field

Output format (strict Markdown, one block per method, pipe-delimited
tables, no code fences around the result):

Interface: {{entry_class_fqn}}.{{entry_method_base}} (inferred)
Description: one sentence (inferred)
HTTP method: GET/POST/PUT/DELETE (inferred)

Input parameters:

|Name|Type|Required|Description|
|---|---|---|---|

Output parameters:

|Name|Type|Required|Description|
|---|---|---|---|

Code paste area:

```java
{{context}}
```

Notes:
- Only infer from the pasted code; do not invent behavior.
- When a type or requiredness cannot be determined, give a reasonable
  inference and mark it "(inferred)".
"#;

/// Renders generation prompts for entry points
pub struct PromptBuilder {
    template: String,
    patterns: CrudPatterns,
}

impl PromptBuilder {
    pub fn new(config: &PromptConfig, patterns: CrudPatterns) -> Self {
        let template = if config.custom_enabled && !config.custom_template.trim().is_empty() {
            config.custom_template.clone()
        } else {
            DEFAULT_TEMPLATE.to_string()
        };
        Self { template, patterns }
    }

    /// Render the prompt for one entry point and its context bundle
    pub fn build(&self, entry: &EntryPoint, context_text: &str) -> Result<String> {
        debug!(class_fqn = %entry.class_fqn, method = %entry.method, "PromptBuilder::build: called");
        let category = classify_method_name(entry.method_base(), &self.patterns);

        let mut handlebars = Handlebars::new();
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars
            .render_template(
                &self.template,
                &json!({
                    "entry_class_fqn": entry.class_fqn,
                    "entry_method": entry.method,
                    "entry_method_base": entry.method_base(),
                    "http_method": category.http_method(),
                    "context": context_text,
                }),
            )
            .context("Failed to render prompt template")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> EntryPoint {
        EntryPoint {
            class_fqn: "com.example.UserService".to_string(),
            method: "findUser(java.lang.String)".to_string(),
            file: "/src/UserService.java".to_string(),
            line: 10,
            annotation: "@RpcService".to_string(),
        }
    }

    #[test]
    fn test_default_template_renders_context() {
        let builder = PromptBuilder::new(&PromptConfig::default(), CrudPatterns::default());
        let prompt = builder.build(&entry(), "class UserService {}").unwrap();

        assert!(prompt.contains("class UserService {}"));
        assert!(prompt.contains("com.example.UserService.findUser"));
        // "find" prefix classifies as read
        assert!(prompt.contains("Suggested for findUser: GET"));
    }

    #[test]
    fn test_custom_template() {
        let config = PromptConfig {
            custom_enabled: true,
            custom_template: "Document {{entry_class_fqn}}#{{entry_method}} via {{http_method}}:\n{{context}}"
                .to_string(),
        };
        let builder = PromptBuilder::new(&config, CrudPatterns::default());
        let prompt = builder.build(&entry(), "CTX").unwrap();

        assert_eq!(
            prompt,
            "Document com.example.UserService#findUser(java.lang.String) via GET:\nCTX"
        );
    }

    #[test]
    fn test_blank_custom_template_falls_back() {
        let config = PromptConfig {
            custom_enabled: true,
            custom_template: "   ".to_string(),
        };
        let builder = PromptBuilder::new(&config, CrudPatterns::default());
        let prompt = builder.build(&entry(), "CTX").unwrap();
        assert!(prompt.contains("API documentation generator"));
    }

    #[test]
    fn test_context_is_not_html_escaped() {
        let builder = PromptBuilder::new(&PromptConfig::default(), CrudPatterns::default());
        let prompt = builder.build(&entry(), "List<String> names").unwrap();
        assert!(prompt.contains("List<String> names"));
    }
}
