//! End-to-end tests of the fallback/rotation algorithm using mock adapters.

use std::sync::Arc;
use std::time::Duration;
use vaultgen::providers::mock::MockProvider;
use vaultgen::{
    CredentialSet, CredentialStore, GenerateError, GenerationClient, GenerationOptions,
    GenerationRequest, ProviderId,
};

/// A reply comfortably above the default acceptance threshold.
fn long_reply() -> String {
    "Question 1: Tell me about a project where you used Rust in production. \
     Answer: Talk through the design, the tradeoffs, and what you would change."
        .to_string()
}

fn store(entries: &[(ProviderId, &[&str])]) -> CredentialStore {
    let mut store = CredentialStore::new();
    for (provider, creds) in entries {
        store.set(
            *provider,
            CredentialSet::new(creds.iter().map(|c| c.to_string()).collect()),
        );
    }
    store
}

#[tokio::test]
async fn first_success_wins_with_one_attempt_per_provider() {
    let p1 = Arc::new(MockProvider::always_fails(ProviderId::Perplexity));
    let p2 = Arc::new(MockProvider::always_succeeds(
        ProviderId::Gemini,
        &long_reply(),
    ));

    let client = GenerationClient::builder()
        .with_shared_provider(p1.clone())
        .with_shared_provider(p2.clone())
        .with_credentials(store(&[
            (ProviderId::Perplexity, &["pplx-key-000000000001"]),
            (ProviderId::Gemini, &["AIzaGeminiKey000000000001"]),
        ]))
        .build();

    let request = GenerationRequest::new("prompt")
        .with_priority(vec![ProviderId::Perplexity, ProviderId::Gemini]);
    let result = client.generate(&request).await.unwrap();

    assert_eq!(result.provider, ProviderId::Gemini);
    assert_eq!(result.credential_index, 0);
    assert_eq!(p1.call_count(), 1);
    assert_eq!(p2.call_count(), 1);
}

#[tokio::test]
async fn exhaustion_attempt_count_is_sum_of_credentials_times_models() {
    let perplexity = Arc::new(MockProvider::always_fails(ProviderId::Perplexity));
    let gemini = Arc::new(MockProvider::always_fails(ProviderId::Gemini));
    let hf = Arc::new(
        MockProvider::always_fails(ProviderId::HuggingFace).with_models(&["hf-m1", "hf-m2"]),
    );

    let client = GenerationClient::builder()
        .with_shared_provider(perplexity)
        .with_shared_provider(gemini)
        .with_shared_provider(hf)
        .with_credentials(store(&[
            (ProviderId::Perplexity, &["pplx-key-000000000001", "pplx-key-000000000002"]),
            (ProviderId::Gemini, &["AIzaGeminiKey000000000001"]),
            (ProviderId::HuggingFace, &["hf_key_00000000000001", "hf_key_00000000000002"]),
        ]))
        .build();

    let request = GenerationRequest::new("prompt");
    let err = client.generate(&request).await.unwrap_err();
    let GenerateError::Exhausted(failure) = err else {
        panic!("expected exhaustion");
    };

    // 2x1 perplexity + 1x1 gemini + 2x2 huggingface
    assert_eq!(failure.attempts.len(), 7);
    assert_eq!(failure.attempts_for(ProviderId::Perplexity), 2);
    assert_eq!(failure.attempts_for(ProviderId::Gemini), 1);
    assert_eq!(failure.attempts_for(ProviderId::HuggingFace), 4);
    assert!(!failure.override_used);
    assert!(!failure.last_error.is_empty());
}

#[tokio::test]
async fn override_credential_bypasses_the_priority_chain() {
    let perplexity = Arc::new(MockProvider::always_succeeds(
        ProviderId::Perplexity,
        &long_reply(),
    ));
    // Groq is not in the priority list at all.
    let groq = Arc::new(MockProvider::always_succeeds(ProviderId::Groq, &long_reply()));

    let client = GenerationClient::builder()
        .with_shared_provider(perplexity.clone())
        .with_shared_provider(groq.clone())
        .with_credentials(store(&[(ProviderId::Perplexity, &["pplx-key-000000000001"])]))
        .build();

    let request = GenerationRequest::new("prompt")
        .with_priority(vec![ProviderId::Perplexity])
        .with_override(ProviderId::Groq, "gsk_user_supplied_key_0001");
    let result = client.generate(&request).await.unwrap();

    assert_eq!(result.provider, ProviderId::Groq);
    assert_eq!(groq.call_count(), 1);
    assert_eq!(perplexity.call_count(), 0);
}

#[tokio::test]
async fn override_failure_does_not_fall_through() {
    let perplexity = Arc::new(MockProvider::always_succeeds(
        ProviderId::Perplexity,
        &long_reply(),
    ));
    let groq = Arc::new(MockProvider::always_fails(ProviderId::Groq));

    let client = GenerationClient::builder()
        .with_shared_provider(perplexity.clone())
        .with_shared_provider(groq)
        .with_credentials(store(&[(ProviderId::Perplexity, &["pplx-key-000000000001"])]))
        .build();

    let request =
        GenerationRequest::new("prompt").with_override(ProviderId::Groq, "gsk_user_supplied_key_0001");
    let err = client.generate(&request).await.unwrap_err();

    let GenerateError::Exhausted(failure) = err else {
        panic!("expected exhaustion");
    };
    assert!(failure.override_used);
    assert_eq!(failure.attempts.len(), 1);
    // The shared pool was never touched.
    assert_eq!(perplexity.call_count(), 0);
}

#[tokio::test]
async fn short_replies_are_rejected_and_fallback_proceeds() {
    let short = Arc::new(MockProvider::always_succeeds(ProviderId::Perplexity, "too short"));
    let good = Arc::new(MockProvider::always_succeeds(ProviderId::Gemini, &long_reply()));

    let client = GenerationClient::builder()
        .with_shared_provider(short)
        .with_shared_provider(good)
        .with_credentials(store(&[
            (ProviderId::Perplexity, &["pplx-key-000000000001"]),
            (ProviderId::Gemini, &["AIzaGeminiKey000000000001"]),
        ]))
        .build();

    let request = GenerationRequest::new("prompt");
    let result = client.generate(&request).await.unwrap();

    assert_eq!(result.provider, ProviderId::Gemini);
}

#[tokio::test]
async fn models_rotate_within_each_credential() {
    let hf = Arc::new(
        MockProvider::succeeds_only_for(ProviderId::HuggingFace, "hf_key_2", "m1", &long_reply())
            .with_models(&["m1", "m2"]),
    );

    let client = GenerationClient::builder()
        .with_shared_provider(hf.clone())
        .with_credentials(store(&[(ProviderId::HuggingFace, &["hf_key_1", "hf_key_2"])]))
        .build();

    let request =
        GenerationRequest::new("prompt").with_priority(vec![ProviderId::HuggingFace]);
    let result = client.generate(&request).await.unwrap();

    assert_eq!(result.model.as_deref(), Some("m1"));
    assert_eq!(result.credential_index, 1);
    // Credential is the outer loop, model the inner; the loop stops at the
    // first success, so (hf_key_2, m2) is never attempted.
    assert_eq!(
        hf.calls(),
        vec![
            ("hf_key_1".into(), "m1".into()),
            ("hf_key_1".into(), "m2".into()),
            ("hf_key_2".into(), "m1".into()),
        ]
    );
}

#[tokio::test]
async fn hung_adapter_is_recorded_as_transport_failure() {
    let slow = Arc::new(
        MockProvider::always_succeeds(ProviderId::Perplexity, &long_reply())
            .with_delay(Duration::from_millis(200)),
    );
    let fast = Arc::new(MockProvider::always_succeeds(ProviderId::Gemini, &long_reply()));

    let client = GenerationClient::builder()
        .with_shared_provider(slow)
        .with_shared_provider(fast)
        .with_credentials(store(&[
            (ProviderId::Perplexity, &["pplx-key-000000000001"]),
            (ProviderId::Gemini, &["AIzaGeminiKey000000000001"]),
        ]))
        .with_options(GenerationOptions {
            timeout: Duration::from_millis(50),
            ..GenerationOptions::default()
        })
        .build();

    let request = GenerationRequest::new("prompt");
    let result = client.generate(&request).await.unwrap();

    // The timeout did not surface to the caller; the loop moved on.
    assert_eq!(result.provider, ProviderId::Gemini);
}

#[tokio::test]
async fn timeout_attempt_appears_in_the_failure_log() {
    let slow = Arc::new(
        MockProvider::always_fails(ProviderId::Perplexity).with_delay(Duration::from_millis(200)),
    );

    let client = GenerationClient::builder()
        .with_shared_provider(slow)
        .with_credentials(store(&[(ProviderId::Perplexity, &["pplx-key-000000000001"])]))
        .with_options(GenerationOptions {
            timeout: Duration::from_millis(50),
            ..GenerationOptions::default()
        })
        .build();

    let request =
        GenerationRequest::new("prompt").with_priority(vec![ProviderId::Perplexity]);
    let err = client.generate(&request).await.unwrap_err();

    let GenerateError::Exhausted(failure) = err else {
        panic!("expected exhaustion");
    };
    assert_eq!(failure.attempts.len(), 1);
    assert!(failure.attempts[0].transport);
    assert!(failure.attempts[0].error.contains("timed out"));
}

#[tokio::test]
async fn overall_deadline_bounds_the_whole_chain() {
    let slow = Arc::new(
        MockProvider::always_fails(ProviderId::Perplexity).with_delay(Duration::from_millis(60)),
    );

    let client = GenerationClient::builder()
        .with_shared_provider(slow.clone())
        .with_credentials(store(&[(
            ProviderId::Perplexity,
            &["pplx-key-000000000001", "pplx-key-000000000002", "pplx-key-000000000003"],
        )]))
        .with_options(GenerationOptions {
            overall_timeout: Some(Duration::from_millis(100)),
            ..GenerationOptions::default()
        })
        .build();

    let request =
        GenerationRequest::new("prompt").with_priority(vec![ProviderId::Perplexity]);
    let err = client.generate(&request).await.unwrap_err();

    let GenerateError::Exhausted(failure) = err else {
        panic!("expected exhaustion");
    };
    // Three credentials are configured but the budget cuts the chain short.
    assert!(failure.attempts.len() < 3);
    assert!(slow.call_count() < 3);
}

#[tokio::test]
async fn not_configured_fails_fast_without_network_calls() {
    let perplexity = Arc::new(MockProvider::always_succeeds(
        ProviderId::Perplexity,
        &long_reply(),
    ));

    let client = GenerationClient::builder()
        .with_shared_provider(perplexity.clone())
        .build();

    let request = GenerationRequest::new("prompt");
    let err = client.generate(&request).await.unwrap_err();

    assert!(matches!(err, GenerateError::NotConfigured));
    assert_eq!(perplexity.call_count(), 0);
}

#[tokio::test]
async fn serialized_outcomes_never_leak_raw_credentials() {
    let secret = "pplx-verysecretcredential0123456789";
    let good = Arc::new(MockProvider::always_succeeds(ProviderId::Perplexity, &long_reply()));
    let bad = Arc::new(MockProvider::always_fails(ProviderId::Gemini));

    let client = GenerationClient::builder()
        .with_shared_provider(good)
        .with_shared_provider(bad)
        .with_credentials(store(&[
            (ProviderId::Perplexity, &[secret]),
            (ProviderId::Gemini, &[secret]),
        ]))
        .build();

    let ok = client
        .generate(&GenerationRequest::new("p").with_priority(vec![ProviderId::Perplexity]))
        .await
        .unwrap();
    let ok_json = serde_json::to_string(&ok).unwrap();
    assert!(!ok_json.contains(secret));
    assert!(ok_json.contains("pplx-ver"));
    assert!(ok_json.contains("6789"));

    let err = client
        .generate(&GenerationRequest::new("p").with_priority(vec![ProviderId::Gemini]))
        .await
        .unwrap_err();
    let GenerateError::Exhausted(failure) = err else {
        panic!("expected exhaustion");
    };
    let err_json = serde_json::to_string(&failure).unwrap();
    assert!(!err_json.contains(secret));
}
