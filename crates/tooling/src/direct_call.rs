use crate::json_text::extract_json;
use crate::schema::CompiledSchema;
use crate::tool::{HandlerFailure, ToolDescriptor, ToolHandler};
use async_trait::async_trait;
use llm::{ContentGenerator, GenerateRequest};
use log::{error, info};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

pub const CALL_TOOL_NAME: &str = "gemini_call";

#[derive(Debug, Deserialize)]
struct CallArguments {
    prompt: String,
    args: Option<Value>,
    #[serde(rename = "outputSchema")]
    output_schema: Value,
}

/// Ungrounded model call whose answer must follow a caller-supplied schema.
///
/// The schema is sent to Gemini inside the prompt and the parsed answer is
/// checked against it again here before it is returned.
pub struct GeminiCallTool {
    generator: Arc<dyn ContentGenerator>,
}

impl GeminiCallTool {
    pub fn new(generator: Arc<dyn ContentGenerator>) -> Self {
        Self { generator }
    }

    pub fn descriptor(self) -> ToolDescriptor {
        ToolDescriptor::new(
            CALL_TOOL_NAME,
            "Call Gemini directly (no grounding) and get a JSON answer \
             that follows the given outputSchema.",
            Arc::new(self),
        )
        .with_input_schema(Self::input_schema())
        .with_output_schema(Self::output_schema())
    }

    pub fn input_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "prompt": {
                    "type": "string",
                    "minLength": 1,
                    "description": "Instruction for the model"
                },
                "args": {
                    "type": "object",
                    "description": "Input data appended to the prompt as JSON"
                },
                "outputSchema": {
                    "type": "object",
                    "description": "JSON Schema the answer must satisfy"
                }
            },
            "required": ["prompt", "outputSchema"],
            "additionalProperties": false
        })
    }

    pub fn output_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "output": {}
            },
            "required": ["output"],
            "additionalProperties": false
        })
    }

    fn build_prompt(arguments: &CallArguments) -> String {
        let mut prompt = arguments.prompt.clone();

        if let Some(args) = arguments.args.as_ref().filter(|a| !is_empty(a)) {
            prompt.push_str("\n\nInput data: ");
            prompt.push_str(&pretty(args));
        }

        prompt.push_str(&format!(
            "\n\nRespond with JSON that strictly adheres to this schema:\n{}\n\n\
             The response must be valid JSON that validates against the schema above. \
             Do not include any text outside the JSON.\n",
            pretty(&arguments.output_schema)
        ));

        prompt
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

#[async_trait]
impl ToolHandler for GeminiCallTool {
    async fn invoke(&self, arguments: Value) -> Result<Value, HandlerFailure> {
        let arguments: CallArguments = serde_json::from_value(arguments)
            .map_err(|e| HandlerFailure::InvalidArguments(e.to_string()))?;
        if arguments.prompt.trim().is_empty() {
            return Err(HandlerFailure::InvalidArguments(
                "prompt parameter is required".to_string(),
            ));
        }
        if !arguments.output_schema.is_object() {
            return Err(HandlerFailure::InvalidArguments(
                "outputSchema must be a JSON Schema object".to_string(),
            ));
        }
        let contract = CompiledSchema::compile(&arguments.output_schema).map_err(|violation| {
            HandlerFailure::InvalidArguments(format!("outputSchema {}", violation.message))
        })?;

        let request = GenerateRequest::new(Self::build_prompt(&arguments)).with_json_response();
        let response = self.generator.generate(request).await?;
        let text = response.text.trim().to_string();

        let output = extract_json(&text).map_err(|reason| {
            error!("Failed to parse JSON from Gemini response: {}", reason);
            HandlerFailure::MalformedResponse {
                reason,
                raw: text.clone(),
            }
        })?;

        let violations = contract.validate(&output);
        if !violations.is_empty() {
            return Err(HandlerFailure::SchemaMismatch { violations });
        }

        info!("gemini_call produced a schema-conformant answer");
        Ok(json!({ "output": output }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ViolationReason;
    use llm::{GenerateResponse, LlmError};
    use std::sync::Mutex;

    struct ScriptedGenerator {
        reply: Result<GenerateResponse, LlmError>,
        prompts: Mutex<Vec<GenerateRequest>>,
    }

    impl ScriptedGenerator {
        fn replying(text: &str) -> Arc<Self> {
            Self::with(Ok(GenerateResponse::text(text)))
        }

        fn with(reply: Result<GenerateResponse, LlmError>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ContentGenerator for ScriptedGenerator {
        async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, LlmError> {
            self.prompts.lock().unwrap().push(request);
            self.reply.clone()
        }
    }

    fn sentiment_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "sentiment": {"type": "string", "enum": ["positive", "negative"]},
                "score": {"type": "number"}
            },
            "required": ["sentiment", "score"]
        })
    }

    #[tokio::test]
    async fn should_wrap_parsed_answer_in_output() {
        let generator =
            ScriptedGenerator::replying("{\"sentiment\": \"positive\", \"score\": 0.9}");
        let tool = GeminiCallTool::new(generator.clone());

        let output = tool
            .invoke(json!({
                "prompt": "Classify the review",
                "args": {"review": "Loved it"},
                "outputSchema": sentiment_schema()
            }))
            .await
            .unwrap();

        assert_eq!(output, json!({"output": {"sentiment": "positive", "score": 0.9}}));

        let requests = generator.prompts.lock().unwrap();
        let request = &requests[0];
        assert!(!request.grounded);
        assert!(request.json_response);
        assert!(request.prompt.starts_with("Classify the review\n\nInput data: {"));
        assert!(request.prompt.contains("\"review\": \"Loved it\""));
        assert!(request.prompt.contains("\"sentiment\": {"));
    }

    #[tokio::test]
    async fn should_skip_input_data_when_args_are_empty() {
        let generator =
            ScriptedGenerator::replying("{\"sentiment\": \"negative\", \"score\": 0.1}");
        let tool = GeminiCallTool::new(generator.clone());

        tool.invoke(json!({"prompt": "p", "args": {}, "outputSchema": sentiment_schema()}))
            .await
            .unwrap();

        let prompt = generator.prompts.lock().unwrap()[0].prompt.clone();
        assert!(!prompt.contains("Input data"));
    }

    #[tokio::test]
    async fn should_extract_json_from_fenced_answer() {
        let generator = ScriptedGenerator::replying(
            "Sure!\n```json\n{\"sentiment\": \"negative\", \"score\": 0.2}\n```",
        );
        let tool = GeminiCallTool::new(generator);

        let output = tool
            .invoke(json!({"prompt": "p", "outputSchema": sentiment_schema()}))
            .await
            .unwrap();

        assert_eq!(output["output"]["score"], 0.2);
    }

    #[tokio::test]
    async fn should_reject_answer_violating_requested_schema() {
        let generator = ScriptedGenerator::replying("{\"sentiment\": \"meh\"}");
        let tool = GeminiCallTool::new(generator);

        let error = tool
            .invoke(json!({"prompt": "p", "outputSchema": sentiment_schema()}))
            .await
            .unwrap_err();

        match error {
            HandlerFailure::SchemaMismatch { violations } => {
                let reasons: Vec<(&str, ViolationReason)> = violations
                    .iter()
                    .map(|v| (v.path.as_str(), v.reason))
                    .collect();
                assert_eq!(
                    reasons,
                    vec![
                        ("sentiment", ViolationReason::EnumMismatch),
                        ("score", ViolationReason::MissingRequired),
                    ]
                );
            }
            other => panic!("expected schema mismatch, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn should_report_unparseable_answer_with_raw_text() {
        let generator = ScriptedGenerator::replying("I am not able to answer in JSON.");
        let tool = GeminiCallTool::new(generator);

        let error = tool
            .invoke(json!({"prompt": "p", "outputSchema": {"type": "object"}}))
            .await
            .unwrap_err();

        match error {
            HandlerFailure::MalformedResponse { raw, .. } => {
                assert_eq!(raw, "I am not able to answer in JSON.");
            }
            other => panic!("expected malformed response, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn should_surface_provider_timeout() {
        let generator = ScriptedGenerator::with(Err(LlmError::Timeout { timeout_secs: 60 }));
        let tool = GeminiCallTool::new(generator);

        let error = tool
            .invoke(json!({"prompt": "p", "outputSchema": {"type": "object"}}))
            .await
            .unwrap_err();

        assert_eq!(error, HandlerFailure::Timeout { timeout_secs: 60 });
    }

    #[tokio::test]
    async fn should_reject_missing_output_schema_when_called_directly() {
        let generator = ScriptedGenerator::replying("{}");
        let tool = GeminiCallTool::new(generator.clone());

        let error = tool.invoke(json!({"prompt": "p"})).await.unwrap_err();

        assert!(matches!(error, HandlerFailure::InvalidArguments(_)));
        assert!(generator.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_reject_unusable_output_schema_before_calling_gemini() {
        let schemas = [
            json!({"type": "text"}),
            json!({"type": "string", "pattern": "("}),
        ];

        for schema in schemas {
            let generator = ScriptedGenerator::replying("{}");
            let tool = GeminiCallTool::new(generator.clone());

            let error = tool
                .invoke(json!({"prompt": "p", "outputSchema": schema}))
                .await
                .unwrap_err();

            match error {
                HandlerFailure::InvalidArguments(message) => {
                    assert!(message.starts_with("outputSchema invalid schema"), "{}", message);
                }
                other => panic!("expected invalid arguments, got {:?}", other),
            }
            assert!(generator.prompts.lock().unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn should_enforce_references_in_requested_schema() {
        let generator = ScriptedGenerator::replying("{\"score\": \"high\", \"label\": 42}");
        let tool = GeminiCallTool::new(generator);
        let schema = json!({
            "type": "object",
            "properties": {
                "score": {"$ref": "#/$defs/score"},
                "label": {"anyOf": [{"type": "string"}, {"type": "null"}]}
            },
            "$defs": {"score": {"type": "number"}}
        });

        let error = tool
            .invoke(json!({"prompt": "p", "outputSchema": schema}))
            .await
            .unwrap_err();

        match error {
            HandlerFailure::SchemaMismatch { violations } => {
                let reasons: Vec<(&str, ViolationReason)> = violations
                    .iter()
                    .map(|v| (v.path.as_str(), v.reason))
                    .collect();
                assert_eq!(
                    reasons,
                    vec![
                        ("score", ViolationReason::WrongType),
                        ("label", ViolationReason::CompositionMismatch),
                    ]
                );
            }
            other => panic!("expected schema mismatch, got {:?}", other),
        }
    }
}
