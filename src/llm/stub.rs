//! Stub generation client
//!
//! Deterministic offline documents: a placeholder interface description
//! with the HTTP verb inferred from the method name. Useful for pipeline
//! testing and dry runs without a model endpoint.

use async_trait::async_trait;

use crate::analysis::AnalysisResult;
use crate::domain::{CrudPatterns, EntryPoint, classify_method_name};

use super::{DocClient, GeneratedDoc, LlmError};

pub struct StubDocClient {
    patterns: CrudPatterns,
}

impl StubDocClient {
    pub fn new(patterns: CrudPatterns) -> Self {
        Self { patterns }
    }
}

#[async_trait]
impl DocClient for StubDocClient {
    async fn generate(
        &self,
        entry: &EntryPoint,
        _analysis: &AnalysisResult,
        _context_text: &str,
    ) -> Result<GeneratedDoc, LlmError> {
        let http = classify_method_name(entry.method_base(), &self.patterns).http_method();
        let mut md = String::new();
        md.push_str(&format!(
            "Interface: {}.{} (inferred)\n",
            entry.class_fqn,
            entry.method_base()
        ));
        md.push_str("Description: placeholder generated by the stub client (inferred)\n");
        md.push_str(&format!("HTTP method: {http} (inferred)\n"));
        md.push('\n');
        md.push_str("Input parameters:\n\n");
        md.push_str("|Name|Type|Required|Description|\n");
        md.push_str("|---|---|---|---|\n");
        md.push_str("|param|Object|no|placeholder|\n");
        md.push('\n');
        md.push_str("Output parameters:\n\n");
        md.push_str("|Name|Type|Required|Description|\n");
        md.push_str("|---|---|---|---|\n");
        md.push_str("|code|int|yes|status code|\n");
        md.push_str("|message|String|yes|status message|\n");

        // Stub returns markdown only; JSON stays empty
        Ok(GeneratedDoc {
            json: String::new(),
            markdown: md,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(method: &str) -> EntryPoint {
        EntryPoint {
            class_fqn: "com.example.UserService".to_string(),
            method: method.to_string(),
            file: "/src/UserService.java".to_string(),
            line: 10,
            annotation: "@RpcService".to_string(),
        }
    }

    fn analysis() -> AnalysisResult {
        AnalysisResult {
            summary: "[stub]".to_string(),
            anchors: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_stub_doc_structure() {
        let client = StubDocClient::new(CrudPatterns::default());
        let doc = client
            .generate(&entry("findUser(java.lang.String)"), &analysis(), "")
            .await
            .unwrap();

        assert!(doc.json.is_empty());
        assert!(doc.markdown.contains("Interface: com.example.UserService.findUser"));
        assert!(doc.markdown.contains("HTTP method: GET (inferred)"));
        assert!(doc.markdown.contains("|Name|Type|Required|Description|"));
    }

    #[tokio::test]
    async fn test_stub_verb_follows_method_name() {
        let client = StubDocClient::new(CrudPatterns::default());
        let doc = client
            .generate(&entry("deleteUser(long)"), &analysis(), "")
            .await
            .unwrap();
        assert!(doc.markdown.contains("HTTP method: DELETE (inferred)"));
    }
}
