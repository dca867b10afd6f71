//! 新会话的种子上下文
//!
//! 输入问卷答案与可选图片。有图片时同步调用一次视觉模型（不重试，失败即整个请求失败），
//! 输出 system 指令 + 一条嵌入问卷 JSON 与图片分析（或占位文本）的 user 消息。

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::ImageInput;
use crate::core::AgentError;
use crate::llm::VisionModel;
use crate::memory::MessageBody;

/// 无图片时写入种子消息的占位文本
pub const NO_IMAGE_ANALYSIS: &str = "No image analysis available";

pub const DEFAULT_ADVISOR_PROMPT: &str = "You are a skincare advisor. Use the user's questionnaire answers and the image analysis (if any) to recommend a routine. Call product_lookup to find concrete products from the catalog before recommending them, and only recommend products the tool returned.";

pub const DEFAULT_VISION_SYSTEM_PROMPT: &str = "You are a dermatology assistant. Describe visible skin characteristics in the photo: skin type cues, texture, redness, blemishes, pigmentation. Do not diagnose medical conditions.";

const VISION_USER_PROMPT: &str = "Analyze the skin in this image.";

/// 问卷答案：自由形式的键值对，按键排序以保证序列化结果稳定
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserProfile(BTreeMap<String, Value>);

impl UserProfile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// 至少一个字段；键非空；值不为 null
    pub fn validate(&self) -> Result<(), AgentError> {
        if self.0.is_empty() {
            return Err(AgentError::InputValidation("profile has no fields".to_string()));
        }
        for (k, v) in &self.0 {
            if k.trim().is_empty() {
                return Err(AgentError::InputValidation("profile has an empty field name".to_string()));
            }
            if v.is_null() {
                return Err(AgentError::InputValidation(format!("profile field {} is null", k)));
            }
        }
        Ok(())
    }

    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(&self.0).unwrap_or_else(|_| "{}".to_string())
    }
}

/// 组装结果：种子消息，以及（若有图片）视觉模型的分析文本
#[derive(Clone, Debug, PartialEq)]
pub struct SeedContext {
    pub messages: Vec<MessageBody>,
    pub image_analysis: Option<String>,
}

pub struct ContextAssembler {
    vision: Option<Arc<dyn VisionModel>>,
    advisor_prompt: String,
    vision_system_prompt: String,
}

impl ContextAssembler {
    pub fn new(vision: Option<Arc<dyn VisionModel>>) -> Self {
        Self {
            vision,
            advisor_prompt: DEFAULT_ADVISOR_PROMPT.to_string(),
            vision_system_prompt: DEFAULT_VISION_SYSTEM_PROMPT.to_string(),
        }
    }

    pub fn with_advisor_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.advisor_prompt = prompt.into();
        self
    }

    pub fn with_vision_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.vision_system_prompt = prompt.into();
        self
    }

    pub async fn assemble(
        &self,
        profile: &UserProfile,
        image: Option<&ImageInput>,
    ) -> Result<SeedContext, AgentError> {
        profile.validate()?;

        let image_analysis = match image {
            None => None,
            Some(img) => Some(self.analyze_image(img).await?),
        };

        let user = format!(
            "User profile:\n{}\n\nImage analysis:\n{}",
            profile.to_pretty_json(),
            image_analysis.as_deref().unwrap_or(NO_IMAGE_ANALYSIS)
        );

        Ok(SeedContext {
            messages: vec![
                MessageBody::system(self.advisor_prompt.clone()),
                MessageBody::user(user),
            ],
            image_analysis,
        })
    }

    async fn analyze_image(&self, image: &ImageInput) -> Result<String, AgentError> {
        let vision = self.vision.as_ref().ok_or_else(|| {
            AgentError::ModelInvocation("image supplied but no vision model is configured".to_string())
        })?;
        tracing::info!(mime = image.mime(), bytes = image.len(), "analyzing image");
        vision
            .analyze(&self.vision_system_prompt, VISION_USER_PROMPT, image)
            .await
            .map_err(|e| AgentError::ModelInvocation(format!("vision: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::image::DEFAULT_MAX_IMAGE_BYTES;
    use crate::llm::MockVisionModel;
    use crate::memory::Role;

    fn profile() -> UserProfile {
        UserProfile::new()
            .with("skinType", "oily")
            .with("mainConcerns", "acne")
    }

    fn png() -> ImageInput {
        ImageInput::new(
            vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A],
            None,
            DEFAULT_MAX_IMAGE_BYTES,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_seed_without_image() {
        let vision = Arc::new(MockVisionModel::default());
        let assembler = ContextAssembler::new(Some(vision.clone()));
        let seed = assembler.assemble(&profile(), None).await.unwrap();

        assert_eq!(seed.messages.len(), 2);
        assert_eq!(seed.messages[0].role(), Role::System);
        let user = seed.messages[1].content();
        assert!(user.contains("\"skinType\": \"oily\""));
        assert!(user.contains("\"mainConcerns\": \"acne\""));
        assert!(user.contains(NO_IMAGE_ANALYSIS));
        assert!(seed.image_analysis.is_none());
        assert_eq!(vision.invocations(), 0);
    }

    #[tokio::test]
    async fn test_seed_with_image_calls_vision_once() {
        let vision = Arc::new(MockVisionModel::new("visible redness on cheeks"));
        let assembler = ContextAssembler::new(Some(vision.clone()));
        let seed = assembler.assemble(&profile(), Some(&png())).await.unwrap();

        assert_eq!(vision.invocations(), 1);
        assert_eq!(seed.image_analysis.as_deref(), Some("visible redness on cheeks"));
        assert!(seed.messages[1].content().contains("visible redness on cheeks"));
        assert!(!seed.messages[1].content().contains(NO_IMAGE_ANALYSIS));
    }

    #[tokio::test]
    async fn test_vision_failure_is_fatal_without_retry() {
        let vision = Arc::new(MockVisionModel::failing("503"));
        let assembler = ContextAssembler::new(Some(vision.clone()));
        let err = assembler.assemble(&profile(), Some(&png())).await.unwrap_err();
        assert!(matches!(err, AgentError::ModelInvocation(_)));
        assert_eq!(vision.invocations(), 1);
    }

    /// 记录收到的 system 指令
    #[derive(Default)]
    struct RecordingVision {
        systems: std::sync::Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl VisionModel for RecordingVision {
        async fn analyze(
            &self,
            system: &str,
            _prompt: &str,
            _image: &ImageInput,
        ) -> Result<String, String> {
            self.systems.lock().unwrap().push(system.to_string());
            Ok("dry patches".to_string())
        }
    }

    #[tokio::test]
    async fn test_vision_system_prompt_reaches_model() {
        let vision = Arc::new(RecordingVision::default());
        let assembler = ContextAssembler::new(Some(vision.clone() as Arc<dyn VisionModel>))
            .with_vision_system_prompt("Describe oiliness only.");
        assembler.assemble(&profile(), Some(&png())).await.unwrap();
        assert_eq!(*vision.systems.lock().unwrap(), vec!["Describe oiliness only."]);

        let vision = Arc::new(RecordingVision::default());
        let assembler = ContextAssembler::new(Some(vision.clone() as Arc<dyn VisionModel>));
        assembler.assemble(&profile(), Some(&png())).await.unwrap();
        assert_eq!(*vision.systems.lock().unwrap(), vec![DEFAULT_VISION_SYSTEM_PROMPT]);
    }

    #[tokio::test]
    async fn test_invalid_profile() {
        let assembler = ContextAssembler::new(None);
        let err = assembler.assemble(&UserProfile::new(), None).await.unwrap_err();
        assert!(matches!(err, AgentError::InputValidation(_)));

        let bad = UserProfile::new().with("skinType", Value::Null);
        assert!(assembler.assemble(&bad, None).await.is_err());
    }

    #[test]
    fn test_profile_deserializes_from_object() {
        let p: UserProfile =
            serde_json::from_str(r#"{"skinType":"oily","allergies":["fragrance"]}"#).unwrap();
        assert_eq!(p.get("skinType"), Some(&Value::from("oily")));
        assert!(p.validate().is_ok());
    }
}
