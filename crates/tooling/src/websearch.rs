use crate::json_text::{extract_json, truncate_chars};
use crate::schema::{summarize, validate};
use crate::tool::{HandlerFailure, ToolDescriptor, ToolHandler};
use async_trait::async_trait;
use llm::{ContentGenerator, GenerateRequest, GenerateResponse};
use log::{info, warn};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

pub const WEBSEARCH_TOOL_NAME: &str = "gemini_websearch";

const FALLBACK_DESCRIPTION_CHARS: usize = 200;

#[derive(Debug, Deserialize)]
struct WebSearchArguments {
    query: String,
    language: Option<String>,
    #[serde(rename = "extraFieldsProperties")]
    extra_fields_properties: Option<Map<String, Value>>,
}

/// Grounded web search: asks Gemini, with Google Search attached, for a list
/// of attributed results.
pub struct GeminiWebSearchTool {
    generator: Arc<dyn ContentGenerator>,
}

impl GeminiWebSearchTool {
    pub fn new(generator: Arc<dyn ContentGenerator>) -> Self {
        Self { generator }
    }

    pub fn descriptor(self) -> ToolDescriptor {
        ToolDescriptor::new(
            WEBSEARCH_TOOL_NAME,
            "Search the web with Google Search grounding and return attributed results.",
            Arc::new(self),
        )
        .with_input_schema(Self::input_schema())
        .with_output_schema(Self::output_schema())
    }

    pub fn input_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "minLength": 1,
                    "description": "What to search for"
                },
                "language": {
                    "type": "string",
                    "description": "Language to translate the results into"
                },
                "extraFieldsProperties": {
                    "type": "object",
                    "description":
                        "Additional fields to include in each result, keyed by field name"
                }
            },
            "required": ["query"],
            "additionalProperties": false
        })
    }

    pub fn output_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "results": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "source": {"type": "string"},
                            "publisher": {"type": ["string", "null"]},
                            "title": {"type": "string"},
                            "description": {"type": "string"},
                            "image": {"type": "string"},
                            "url": {"type": "string"}
                        },
                        "required": ["title"]
                    }
                }
            },
            "required": ["results"]
        })
    }

    fn build_prompt(arguments: &WebSearchArguments) -> String {
        let mut prompt = format!(
            r#"Search for information about: "{}"

Return the search results as JSON in exactly this shape:
{{
    "results": [
        {{
            "source": "URL or domain identifier",
            "publisher": "Publisher name or null",
            "title": "Result title",
            "description": "Brief description",
            "image": "Image URL or empty string",
            "url": "Direct link to result"
        }}
    ]
}}

Guidelines:
- Base every result on the grounded search results so the information is current and factual
- Attribute each result to its real source URL
- Return between 5 and 10 relevant, high-quality results
- Use null for publisher when it is unknown
- Use an empty string for image when there is no image
- Keep descriptions informative but concise"#,
            arguments.query
        );

        if let Some(language) = arguments.language.as_deref().filter(|l| !l.is_empty()) {
            prompt.push_str(&format!("\n- Translate the results into: {}", language));
        }

        if let Some(extra) = arguments.extra_fields_properties.as_ref().filter(|e| !e.is_empty()) {
            let names: Vec<&str> = extra.keys().map(String::as_str).collect();
            prompt.push_str(&format!(
                "\n- Include these additional fields where possible: {}",
                names.join(", ")
            ));
        }

        prompt
    }

    /// Result list used when the model answers in prose instead of JSON.
    fn fallback_results(query: &str, response: &GenerateResponse) -> Value {
        let mut results = vec![json!({
            "source": "gemini-search",
            "publisher": "Google Gemini",
            "title": format!("Search results for: {}", query),
            "description": truncate_chars(&response.text, FALLBACK_DESCRIPTION_CHARS),
            "image": "",
            "url": ""
        })];

        results.extend(response.sources.iter().map(|source| {
            let title = source.title.clone().unwrap_or_else(|| source.uri.clone());
            json!({
                "source": source.uri,
                "publisher": source.title,
                "title": title,
                "description": "",
                "image": "",
                "url": source.uri
            })
        }));

        json!({ "results": results })
    }
}

#[async_trait]
impl ToolHandler for GeminiWebSearchTool {
    async fn invoke(&self, arguments: Value) -> Result<Value, HandlerFailure> {
        let arguments: WebSearchArguments = serde_json::from_value(arguments)
            .map_err(|e| HandlerFailure::InvalidArguments(e.to_string()))?;
        if arguments.query.trim().is_empty() {
            return Err(HandlerFailure::InvalidArguments(
                "query parameter is required".to_string(),
            ));
        }

        info!("Running grounded search for '{}'", arguments.query);
        let request = GenerateRequest::new(Self::build_prompt(&arguments)).with_grounding();
        let response = self.generator.generate(request).await?;

        let parsed = match extract_json(&response.text) {
            Ok(parsed) => parsed,
            Err(reason) => {
                warn!(
                    "Search response for '{}' was not JSON ({}), using fallback results",
                    arguments.query, reason
                );
                return Ok(Self::fallback_results(&arguments.query, &response));
            }
        };

        if parsed.get("results").is_none() {
            return Err(HandlerFailure::MalformedResponse {
                reason: "missing 'results' field".to_string(),
                raw: response.text,
            });
        }

        let violations = validate(&parsed, &Self::output_schema());
        if !violations.is_empty() {
            return Err(HandlerFailure::MalformedResponse {
                reason: summarize(&violations),
                raw: response.text,
            });
        }

        Ok(parsed)
    }
}
