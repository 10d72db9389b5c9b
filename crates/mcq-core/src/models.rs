//! The model registry and credential-aware selection.

use std::fmt;

use mcq_llm::{mask_key, CompletionRequest, MaxTokens, Provider};
use serde::Serialize;

use crate::error::{McqError, Result};
use crate::prompter::{Choice, UserPrompter};

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelDescriptor {
    /// Short name used on the command line.
    pub key: &'static str,
    pub display_name: &'static str,
    pub provider: Provider,
    /// Identifier sent to the provider.
    pub wire_id: &'static str,
    pub description: &'static str,
    pub max_tokens: MaxTokens,
}

static MODELS: &[ModelDescriptor] = &[
    ModelDescriptor {
        key: "claude",
        display_name: "Claude Sonnet 4",
        provider: Provider::Anthropic,
        wire_id: "claude-sonnet-4-20250514",
        description: "Anthropic's balanced model; strong at structured writing",
        max_tokens: MaxTokens::Fixed(4096),
    },
    ModelDescriptor {
        key: "gpt-5",
        display_name: "GPT-5",
        provider: Provider::OpenAi,
        wire_id: "gpt-5",
        description: "OpenAI's flagship model",
        max_tokens: MaxTokens::Omit,
    },
    ModelDescriptor {
        key: "gpt-5-mini",
        display_name: "GPT-5 mini",
        provider: Provider::OpenAi,
        wire_id: "gpt-5-mini",
        description: "Faster, cheaper GPT-5 tier",
        max_tokens: MaxTokens::Omit,
    },
    ModelDescriptor {
        key: "gpt-5-nano",
        display_name: "GPT-5 nano",
        provider: Provider::OpenAi,
        wire_id: "gpt-5-nano",
        description: "Smallest GPT-5 tier, lowest latency",
        max_tokens: MaxTokens::Omit,
    },
    ModelDescriptor {
        key: "gpt-4o",
        display_name: "GPT-4o",
        provider: Provider::OpenAi,
        wire_id: "gpt-4o",
        description: "Previous-generation OpenAI model",
        max_tokens: MaxTokens::Fixed(mcq_llm::types::OPENAI_DEFAULT_MAX_TOKENS),
    },
];

/// All models, in display order.
pub fn list() -> &'static [ModelDescriptor] {
    MODELS
}

pub fn get(key: &str) -> Option<&'static ModelDescriptor> {
    MODELS.iter().find(|m| m.key == key)
}

/// The model picked automatically when only `provider` has a key.
pub fn default_for(provider: Provider) -> &'static ModelDescriptor {
    let key = match provider {
        Provider::Anthropic => "claude",
        Provider::OpenAi => "gpt-5",
    };
    // The registry is static and both keys are in it.
    MODELS
        .iter()
        .find(|m| m.key == key)
        .unwrap_or(&MODELS[0])
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct Credentials {
    pub anthropic: Option<String>,
    pub openai: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("anthropic", &self.anthropic.as_deref().map(mask_key))
            .field("openai", &self.openai.as_deref().map(mask_key))
            .finish()
    }
}

impl Credentials {
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |p: Provider| lookup(p.credential_env()).filter(|v| !v.trim().is_empty());
        Self {
            anthropic: get(Provider::Anthropic),
            openai: get(Provider::OpenAi),
        }
    }

    pub fn get(&self, provider: Provider) -> Option<&str> {
        match provider {
            Provider::Anthropic => self.anthropic.as_deref(),
            Provider::OpenAi => self.openai.as_deref(),
        }
    }

    pub fn has(&self, provider: Provider) -> bool {
        self.get(provider).is_some()
    }
}

// ---------------------------------------------------------------------------
// ResolvedModel
// ---------------------------------------------------------------------------

/// A model plus the key to call it with, valid for one invocation.
#[derive(Clone)]
pub struct ResolvedModel {
    pub descriptor: &'static ModelDescriptor,
    api_key: String,
}

impl fmt::Debug for ResolvedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedModel")
            .field("key", &self.descriptor.key)
            .field("provider", &self.descriptor.provider)
            .field("api_key", &mask_key(&self.api_key))
            .finish()
    }
}

impl ResolvedModel {
    pub fn new(descriptor: &'static ModelDescriptor, api_key: impl Into<String>) -> Self {
        Self {
            descriptor,
            api_key: api_key.into(),
        }
    }

    pub fn provider(&self) -> Provider {
        self.descriptor.provider
    }

    pub fn masked_key(&self) -> String {
        mask_key(&self.api_key)
    }

    pub fn request(&self, prompt: impl Into<String>) -> CompletionRequest {
        CompletionRequest {
            provider: self.descriptor.provider,
            model: self.descriptor.wire_id.to_string(),
            api_key: self.api_key.clone(),
            prompt: prompt.into(),
            max_tokens: self.descriptor.max_tokens,
        }
    }
}

// ---------------------------------------------------------------------------
// select
// ---------------------------------------------------------------------------

/// Resolve the model for this invocation.
///
/// An explicit key must exist and have its provider's credential. Without
/// one, a single available provider picks its default; with both, the user
/// chooses from a menu, and an unreadable answer falls back to the
/// Anthropic default.
pub fn select(
    explicit: Option<&str>,
    creds: &Credentials,
    prompter: &dyn UserPrompter,
) -> Result<ResolvedModel> {
    let resolved = match explicit {
        Some(key) => {
            let descriptor = get(key).ok_or_else(|| McqError::UnknownModel(key.to_string()))?;
            resolve(descriptor, creds)?
        }
        None => auto_select(creds, prompter)?,
    };
    tracing::info!(
        model = resolved.descriptor.key,
        provider = %resolved.provider(),
        api_key = %resolved.masked_key(),
        "selected model"
    );
    Ok(resolved)
}

fn resolve(descriptor: &'static ModelDescriptor, creds: &Credentials) -> Result<ResolvedModel> {
    let key = creds
        .get(descriptor.provider)
        .ok_or(McqError::MissingCredential {
            model: descriptor.key.to_string(),
            env: descriptor.provider.credential_env(),
        })?;
    Ok(ResolvedModel::new(descriptor, key))
}

fn auto_select(creds: &Credentials, prompter: &dyn UserPrompter) -> Result<ResolvedModel> {
    match (creds.has(Provider::Anthropic), creds.has(Provider::OpenAi)) {
        (false, false) => Err(McqError::NoCredentials),
        (true, false) => resolve(default_for(Provider::Anthropic), creds),
        (false, true) => resolve(default_for(Provider::OpenAi), creds),
        (true, true) => {
            let options: Vec<&'static ModelDescriptor> =
                list().iter().filter(|m| creds.has(m.provider)).collect();
            let labels: Vec<String> = options
                .iter()
                .map(|m| format!("{} ({}) - {}", m.display_name, m.key, m.description))
                .collect();

            let picked = match prompter.ask_choice("Select a model:", &labels) {
                Ok(Choice::Default) => options[0],
                Ok(Choice::Index(i)) => options
                    .get(i)
                    .copied()
                    .ok_or_else(|| McqError::InvalidChoice((i + 1).to_string()))?,
                Ok(Choice::Invalid(answer)) => return Err(McqError::InvalidChoice(answer)),
                Err(e) => {
                    tracing::debug!(error = %e, "no model choice read, using default");
                    default_for(Provider::Anthropic)
                }
            };
            resolve(picked, creds)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompter::ScriptedPrompter;

    fn creds(anthropic: bool, openai: bool) -> Credentials {
        Credentials {
            anthropic: anthropic.then(|| "sk-ant-abcd1234".to_string()),
            openai: openai.then(|| "sk-openai-wxyz9876".to_string()),
        }
    }

    #[test]
    fn registry_order_and_lookup() {
        let keys: Vec<&str> = list().iter().map(|m| m.key).collect();
        assert_eq!(keys, vec!["claude", "gpt-5", "gpt-5-mini", "gpt-5-nano", "gpt-4o"]);
        assert_eq!(get("gpt-4o").unwrap().max_tokens, MaxTokens::Fixed(4000));
        assert!(get("gpt-3").is_none());
    }

    #[test]
    fn openai_policies_follow_wire_prefix() {
        for m in list().iter().filter(|m| m.provider == Provider::OpenAi) {
            assert_eq!(m.max_tokens, MaxTokens::for_openai(m.wire_id), "{}", m.key);
        }
    }

    #[test]
    fn explicit_unknown_key_fails() {
        let err = select(Some("llama"), &creds(true, true), &ScriptedPrompter::closed()).unwrap_err();
        assert!(matches!(err, McqError::UnknownModel(k) if k == "llama"));
    }

    #[test]
    fn explicit_key_without_credential_fails() {
        let err = select(Some("gpt-5"), &creds(true, false), &ScriptedPrompter::closed()).unwrap_err();
        assert!(matches!(err, McqError::MissingCredential { env: "OPENAI_API_KEY", .. }));
    }

    #[test]
    fn no_credentials_fails() {
        let err = select(None, &creds(false, false), &ScriptedPrompter::closed()).unwrap_err();
        assert!(matches!(err, McqError::NoCredentials));
    }

    #[test]
    fn single_provider_uses_its_default() {
        let p = ScriptedPrompter::closed();
        assert_eq!(select(None, &creds(true, false), &p).unwrap().descriptor.key, "claude");
        assert_eq!(select(None, &creds(false, true), &p).unwrap().descriptor.key, "gpt-5");
        assert!(p.asked().is_empty());
    }

    #[test]
    fn both_providers_prompt_for_choice() {
        let p = ScriptedPrompter::new([Some("3")]);
        let m = select(None, &creds(true, true), &p).unwrap();
        assert_eq!(m.descriptor.key, "gpt-5-mini");
        assert_eq!(p.asked().len(), 1);
    }

    #[test]
    fn empty_choice_takes_first() {
        let p = ScriptedPrompter::new([Some("")]);
        assert_eq!(select(None, &creds(true, true), &p).unwrap().descriptor.key, "claude");
    }

    #[test]
    fn out_of_range_choice_fails() {
        let p = ScriptedPrompter::new([Some("9")]);
        assert!(matches!(
            select(None, &creds(true, true), &p).unwrap_err(),
            McqError::InvalidChoice(_)
        ));
    }

    #[test]
    fn unreadable_choice_falls_back_to_anthropic() {
        let m = select(None, &creds(true, true), &ScriptedPrompter::closed()).unwrap();
        assert_eq!(m.descriptor.key, "claude");
    }

    #[test]
    fn debug_output_masks_key() {
        let m = select(Some("claude"), &creds(true, false), &ScriptedPrompter::closed()).unwrap();
        let dbg = format!("{m:?}");
        assert!(dbg.contains("***1234"));
        assert!(!dbg.contains("sk-ant"));
        assert_eq!(m.request("hi").max_tokens, MaxTokens::Fixed(4096));
    }

    #[test]
    fn credentials_ignore_blank_values() {
        let c = Credentials::from_lookup(|k| match k {
            "ANTHROPIC_API_KEY" => Some("  ".into()),
            "OPENAI_API_KEY" => Some("sk-1".into()),
            _ => None,
        });
        assert!(!c.has(Provider::Anthropic));
        assert!(c.has(Provider::OpenAi));
    }
}
