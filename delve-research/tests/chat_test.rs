//! Dual-model and single-model chat against scripted models

mod common;

use common::{test_config, Call, ScriptedFactory};
use delve_core::{llm_error, ConfigOverrides, Message, Provider, Stage};
use delve_research::{DualModelChat, ProcessingStage, SingleModelChat};
use std::sync::Arc;
use std::time::Duration;

fn is_merge(call: &Call) -> bool {
    call.prompt.starts_with("You are an expert at synthesizing answers")
}

#[tokio::test]
async fn test_dual_chat_merges_both_answers() {
    let factory = Arc::new(ScriptedFactory::new(|call: &Call| {
        if is_merge(call) {
            return Ok("merged answer".to_string());
        }
        Ok(match call.provider {
            Provider::Gemini => "gemini says hi".to_string(),
            Provider::SiliconFlow => "qwen says hi".to_string(),
        })
    }));
    let chat = DualModelChat::with_factory(test_config(), factory.clone());

    let history = vec![Message::user("earlier"), Message::assistant("reply")];
    let outcome = chat.chat("What is ownership?", &history).await;

    assert!(outcome.success);
    assert_eq!(outcome.processing_stage, ProcessingStage::Completed);
    assert_eq!(outcome.gemini_response, "gemini says hi");
    assert_eq!(outcome.siliconflow_response, "qwen says hi");
    assert_eq!(outcome.integrated_response, "merged answer");

    let calls = factory.calls();
    assert_eq!(calls.len(), 3);

    let branches: Vec<&Call> = calls.iter().filter(|c| !is_merge(c)).collect();
    assert_eq!(branches.len(), 2);
    for branch in branches {
        assert_eq!(branch.stage, Stage::Chat);
        assert_eq!(branch.temperature, 0.7);
        assert_eq!(branch.message_count, 3);
        assert_eq!(branch.prompt, "What is ownership?");
    }

    let merge = calls.iter().find(|c| is_merge(c)).unwrap();
    assert_eq!(merge.provider, Provider::SiliconFlow);
    assert_eq!(merge.model, "Qwen/Qwen2.5-7B-Instruct");
    assert_eq!(merge.temperature, 0.3);
    assert!(merge.prompt.contains("Original question: What is ownership?"));
    assert!(merge.prompt.contains("gemini says hi"));
    assert!(merge.prompt.contains("qwen says hi"));
}

#[tokio::test]
async fn test_dual_chat_slow_branch_times_out() {
    let factory = Arc::new(
        ScriptedFactory::new(|call: &Call| {
            if is_merge(call) {
                return Ok("merged without gemini".to_string());
            }
            Ok(format!("{} answer", call.provider))
        })
        .with_stall(Provider::Gemini, Duration::from_secs(30)),
    );
    let mut config = test_config();
    config.llm.dual_branch_timeout_secs = 1;
    let chat = DualModelChat::with_factory(config, factory.clone());

    let started = std::time::Instant::now();
    let outcome = chat.chat("question", &[]).await;

    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(outcome.success);
    assert_eq!(outcome.processing_stage, ProcessingStage::Completed);
    assert!(outcome
        .gemini_response
        .starts_with("Gemini model call failed: "));
    assert!(outcome.gemini_response.contains("timeout"));
    assert_eq!(outcome.siliconflow_response, "siliconflow answer");
    assert_eq!(outcome.integrated_response, "merged without gemini");

    let merge = factory.calls().into_iter().find(is_merge).unwrap();
    assert!(merge.prompt.contains("Gemini model call failed"));
}

#[tokio::test]
async fn test_dual_chat_one_branch_failing_still_merges() {
    let factory = Arc::new(ScriptedFactory::new(|call: &Call| {
        if is_merge(call) {
            return Ok("merged from one side".to_string());
        }
        match call.provider {
            Provider::Gemini => Err(llm_error!("quota exceeded", "gemini", call.model, "test")),
            Provider::SiliconFlow => Ok("qwen answer".to_string()),
        }
    }));
    let chat = DualModelChat::with_factory(test_config(), factory.clone());

    let outcome = chat.chat("question", &[]).await;

    assert!(outcome.success);
    assert_eq!(outcome.processing_stage, ProcessingStage::Completed);
    assert!(outcome
        .gemini_response
        .starts_with("Gemini model call failed: "));
    assert!(outcome.gemini_response.contains("quota exceeded"));
    assert_eq!(outcome.integrated_response, "merged from one side");

    let merge = factory.calls().into_iter().find(is_merge).unwrap();
    assert!(merge.prompt.contains("Gemini model call failed"));
}

#[tokio::test]
async fn test_dual_chat_both_branches_failing_is_error() {
    let factory = Arc::new(ScriptedFactory::new(|call: &Call| {
        Err(llm_error!("down", call.provider, call.model, "test"))
    }));
    let chat = DualModelChat::with_factory(test_config(), factory.clone());

    let outcome = chat.chat("question", &[]).await;

    assert!(!outcome.success);
    assert_eq!(outcome.processing_stage, ProcessingStage::Error);
    assert!(outcome.gemini_response.starts_with("Gemini model call failed"));
    assert!(outcome
        .siliconflow_response
        .starts_with("SiliconFlow model call failed"));
    // Merge skipped
    assert_eq!(factory.calls().len(), 2);
}

#[tokio::test]
async fn test_dual_chat_merge_failure_is_error() {
    let factory = Arc::new(ScriptedFactory::new(|call: &Call| {
        if is_merge(call) {
            Err(llm_error!("merge broke", call.provider, call.model, "test"))
        } else {
            Ok("fine".to_string())
        }
    }));
    let chat = DualModelChat::with_factory(test_config(), factory);

    let outcome = chat.chat("question", &[]).await;

    assert!(!outcome.success);
    assert_eq!(outcome.processing_stage, ProcessingStage::Error);
    assert_eq!(outcome.gemini_response, "fine");
    assert!(outcome.integrated_response.contains("merge broke"));
}

#[tokio::test]
async fn test_dual_chat_validates_before_calling() {
    let factory = Arc::new(ScriptedFactory::new(|_: &Call| Ok("x".to_string())));

    let mut config = test_config();
    config.api.siliconflow_api_key = Some(String::new());
    let chat = DualModelChat::with_factory(config, factory.clone());
    let outcome = chat.chat("question", &[]).await;
    assert_eq!(outcome.processing_stage, ProcessingStage::Error);
    assert!(outcome
        .error_message
        .as_deref()
        .is_some_and(|m| m.contains("SILICONFLOW_API_KEY")));

    let chat = DualModelChat::with_factory(test_config(), factory.clone());
    let outcome = chat.chat("   ", &[]).await;
    assert_eq!(outcome.processing_stage, ProcessingStage::Error);
    assert!(outcome.integrated_response.contains("no message"));

    assert!(factory.calls().is_empty());
}

#[tokio::test]
async fn test_single_chat_uses_chat_stage_model() {
    let factory = Arc::new(ScriptedFactory::new(|call: &Call| {
        Ok(format!("{} answered {}", call.model, call.prompt))
    }));
    let chat = SingleModelChat::with_factory(test_config(), factory.clone());

    let reply = chat
        .chat("hello", &[], &ConfigOverrides::default())
        .await;
    assert!(reply.success);
    assert_eq!(reply.provider, "gemini");
    assert_eq!(reply.model, "gemini-2.0-flash");
    assert_eq!(reply.response, "gemini-2.0-flash answered hello");

    let overrides = ConfigOverrides {
        chat_provider: Some(Provider::SiliconFlow),
        ..Default::default()
    };
    let reply = chat.chat("hello", &[], &overrides).await;
    assert_eq!(reply.provider, "siliconflow");
    assert_eq!(reply.model, "Qwen/Qwen2.5-7B-Instruct");
    assert_eq!(factory.calls()[1].temperature, 0.7);
}

#[tokio::test]
async fn test_single_chat_errors_become_reply_text() {
    let factory = Arc::new(ScriptedFactory::new(|call: &Call| {
        Err(llm_error!("timeout upstream", call.provider, call.model, "test"))
    }));
    let chat = SingleModelChat::with_factory(test_config(), factory);

    let reply = chat.chat("hello", &[], &ConfigOverrides::default()).await;
    assert!(!reply.success);
    assert!(reply.response.starts_with("Sorry"));
    assert!(reply.response.contains("timeout upstream"));

    let mut config = test_config();
    config.api.gemini_api_key = None;
    let factory = Arc::new(ScriptedFactory::new(|_: &Call| Ok("x".to_string())));
    let chat = SingleModelChat::with_factory(config, factory.clone());
    let reply = chat.chat("hello", &[], &ConfigOverrides::default()).await;
    assert!(!reply.success);
    assert!(reply.response.contains("GEMINI_API_KEY"));
    assert!(factory.calls().is_empty());
}
