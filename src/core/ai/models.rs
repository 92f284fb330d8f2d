use std::collections::BTreeMap;

/// Harm axes the model provider can filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HarmCategory {
    HateSpeech,
    Harassment,
    SexuallyExplicit,
    DangerousContent,
}

impl HarmCategory {
    pub const ALL: [HarmCategory; 4] = [
        HarmCategory::HateSpeech,
        HarmCategory::Harassment,
        HarmCategory::SexuallyExplicit,
        HarmCategory::DangerousContent,
    ];
}

/// How aggressively the provider blocks content on one harm axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockThreshold {
    /// Never block. The model still answers and we get its judgment.
    BlockNone,
}

/// Per-category block thresholds sent with every model call.
///
/// Kept as a mapping here; providers convert it to whatever wire shape they need.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SafetySettings {
    thresholds: BTreeMap<HarmCategory, BlockThreshold>,
}

impl SafetySettings {
    /// Every category set to `BlockNone`.
    ///
    /// The moderation job is to surface and explain unsuitable content, so the
    /// provider must not swallow it before the model gets to judge it.
    pub fn permissive() -> Self {
        let thresholds = HarmCategory::ALL
            .iter()
            .map(|category| (*category, BlockThreshold::BlockNone))
            .collect();
        Self { thresholds }
    }

    pub fn iter(&self) -> impl Iterator<Item = (HarmCategory, BlockThreshold)> + '_ {
        self.thresholds.iter().map(|(c, t)| (*c, *t))
    }
}

/// Image bytes already encoded for inline transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    /// Standard-alphabet base64.
    pub data: String,
}

/// One element of the multimodal input sent to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    Text(String),
    InlineImage(InlineImage),
}

impl ContentPart {
    pub fn is_image(&self) -> bool {
        matches!(self, ContentPart::InlineImage(_))
    }
}

/// What came back from a generate call.
///
/// `text` is `None` when the provider refused, filtered every candidate, or
/// returned no text parts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelResponse {
    pub text: Option<String>,
    pub finish_reason: Option<String>,
    pub block_reason: Option<String>,
}

impl ModelResponse {
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permissive_covers_all_four_categories() {
        let settings: Vec<_> = SafetySettings::permissive().iter().collect();

        assert_eq!(
            settings,
            HarmCategory::ALL
                .iter()
                .map(|c| (*c, BlockThreshold::BlockNone))
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_default_settings_are_empty() {
        assert_eq!(SafetySettings::default().iter().count(), 0);
    }

    #[test]
    fn test_image_parts_are_detected() {
        assert!(!ContentPart::Text("hi".to_string()).is_image());
        assert!(ContentPart::InlineImage(InlineImage {
            mime_type: "image/png".to_string(),
            data: "aGVsbG8=".to_string(),
        })
        .is_image());
    }
}
